//! Income aggregation
//!
//! Selects positive-amount transactions, classifies each by platform, and
//! rolls them up into the per-user income snapshot that gets persisted and
//! served. Pure functions over their inputs.

use chrono::{DateTime, NaiveDate, Utc};

use crate::models::{IncomeItem, IncomeSnapshot, PlatformIncome, Transaction};
use crate::platforms::classify;

use super::stability::{assess, weekly_buckets};

/// Number of whole weeks covered by the date window, never less than one.
///
/// Derived from the actual span rather than assuming a fixed batch length,
/// so weekly averages stay honest for short or long imports alike. The day
/// count is inclusive of both endpoints, so weekly payouts on days 0, 7, 14,
/// and 21 land in four buckets, not three.
pub fn week_span(start: NaiveDate, end: NaiveDate) -> usize {
    let days = (end - start).num_days().max(0) + 1;
    ((days as f64 / 7.0).ceil() as usize).max(1)
}

/// Group classified income items by platform, preserving the order in which
/// platforms first appear
pub fn group_by_platform(items: &[IncomeItem]) -> Vec<PlatformIncome> {
    let mut groups: Vec<PlatformIncome> = Vec::new();

    for item in items {
        match groups.iter_mut().find(|g| g.platform == item.platform) {
            Some(group) => {
                group.total += item.amount;
                group.count += 1;
                group.items.push(item.clone());
            }
            None => groups.push(PlatformIncome {
                platform: item.platform.clone(),
                total: item.amount,
                count: 1,
                items: vec![item.clone()],
            }),
        }
    }

    groups
}

/// Build the full income snapshot for a user from raw transaction history.
///
/// Only positive amounts count as income. When no income exists the window
/// collapses to `now` on both ends and the stability block reports zeros.
pub fn build_snapshot(
    user_id: &str,
    transactions: &[Transaction],
    now: DateTime<Utc>,
) -> IncomeSnapshot {
    let items: Vec<IncomeItem> = transactions
        .iter()
        .filter(|t| t.amount > 0.0)
        .map(|t| IncomeItem {
            date: t.date,
            amount: t.amount,
            platform: classify(&t.description).to_string(),
        })
        .collect();

    let total_income: f64 = items.iter().map(|i| i.amount).sum();

    let today = now.date_naive();
    let start_date = items.iter().map(|i| i.date).min().unwrap_or(today);
    let end_date = items.iter().map(|i| i.date).max().unwrap_or(today);

    let by_platform = group_by_platform(&items);

    let weeks = week_span(start_date, end_date);
    let buckets = weekly_buckets(&items, start_date, weeks);
    let stability = assess(&buckets);

    IncomeSnapshot {
        user_id: user_id.to_string(),
        total_income,
        start_date,
        end_date,
        by_platform,
        stability,
        items,
        computed_at: now,
    }
}
