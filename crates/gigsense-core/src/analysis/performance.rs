//! Per-platform performance analytics
//!
//! For each platform with income: per-trip average, a consistency score over
//! individual payout amounts, a 14-day trend against the preceding 14 days,
//! and the top earning weekdays and hours. Recomputed from scratch on every
//! request, nothing cached.

use chrono::{Duration, NaiveDate, Timelike};

use crate::models::{PerformanceReport, PlatformMetrics, Transaction, TrendDirection};
use crate::platforms::classify;

use super::stability::stability_score;

/// Sum amounts into named buckets, keeping first-appearance order so ties
/// rank by when the bucket was first seen
fn bucket_totals(pairs: impl Iterator<Item = (String, f64)>) -> Vec<(String, f64)> {
    let mut buckets: Vec<(String, f64)> = Vec::new();

    for (name, amount) in pairs {
        match buckets.iter_mut().find(|(n, _)| *n == name) {
            Some((_, total)) => *total += amount,
            None => buckets.push((name, amount)),
        }
    }

    buckets
}

/// Top bucket names by summed amount descending; stable sort keeps
/// insertion order on ties
fn top_buckets(mut buckets: Vec<(String, f64)>, take: usize) -> Vec<String> {
    buckets.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    buckets.into_iter().take(take).map(|(name, _)| name).collect()
}

/// Trend direction from the percentage change between windows
fn classify_trend(recent: f64, previous: f64) -> (TrendDirection, f64) {
    if previous == 0.0 {
        return (TrendDirection::Stable, 0.0);
    }

    let pct = (recent - previous) / previous * 100.0;
    let direction = if pct > 10.0 {
        TrendDirection::Up
    } else if pct < -10.0 {
        TrendDirection::Down
    } else {
        TrendDirection::Stable
    };

    (direction, pct)
}

fn metrics_for(platform: &str, txns: &[&Transaction], now: NaiveDate) -> PlatformMetrics {
    let total_earnings: f64 = txns.iter().map(|t| t.amount).sum();
    let transaction_count = txns.len();
    let avg_per_transaction = if transaction_count > 0 {
        total_earnings / transaction_count as f64
    } else {
        0.0
    };

    let amounts: Vec<f64> = txns.iter().map(|t| t.amount).collect();
    let consistency_score = stability_score(&amounts);

    let recent_cutoff = now - Duration::days(14);
    let previous_cutoff = now - Duration::days(28);
    let recent: f64 = txns
        .iter()
        .filter(|t| t.date > recent_cutoff)
        .map(|t| t.amount)
        .sum();
    let previous: f64 = txns
        .iter()
        .filter(|t| t.date > previous_cutoff && t.date <= recent_cutoff)
        .map(|t| t.amount)
        .sum();
    let (trend, trend_pct) = classify_trend(recent, previous);

    let day_buckets = bucket_totals(
        txns.iter()
            .map(|t| (t.date.format("%A").to_string(), t.amount)),
    );
    let best_days = top_buckets(day_buckets, 3);

    // Hours come from the feed's posted timestamp; CSV rows carry none
    let hour_buckets = bucket_totals(txns.iter().filter_map(|t| {
        t.posted_at
            .map(|ts| (format!("{:02}:00", ts.hour()), t.amount))
    }));
    let best_hours = top_buckets(hour_buckets, 3);

    PlatformMetrics {
        platform: platform.to_string(),
        total_earnings,
        avg_per_transaction,
        transaction_count,
        consistency_score,
        trend,
        trend_pct,
        best_days,
        best_hours,
    }
}

/// Analyze income transactions into per-platform metrics.
///
/// The returned platform list is sorted by total earnings descending; the
/// headline picks re-sort private copies so the caller's list keeps its
/// earnings order.
pub fn analyze_performance(transactions: &[Transaction], now: NaiveDate) -> PerformanceReport {
    let income: Vec<&Transaction> = transactions.iter().filter(|t| t.amount > 0.0).collect();

    let mut order: Vec<&'static str> = Vec::new();
    for txn in &income {
        let platform = classify(&txn.description);
        if !order.contains(&platform) {
            order.push(platform);
        }
    }

    let mut platforms: Vec<PlatformMetrics> = order
        .iter()
        .map(|platform| {
            let txns: Vec<&Transaction> = income
                .iter()
                .filter(|t| classify(&t.description) == *platform)
                .copied()
                .collect();
            metrics_for(platform, &txns, now)
        })
        .collect();

    platforms.sort_by(|a, b| {
        b.total_earnings
            .partial_cmp(&a.total_earnings)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let top_earner = platforms.first().map(|p| p.platform.clone());

    let mut by_consistency = platforms.clone();
    by_consistency.sort_by(|a, b| {
        b.consistency_score
            .partial_cmp(&a.consistency_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let most_consistent = by_consistency.first().map(|p| p.platform.clone());

    let mut by_avg = platforms.clone();
    by_avg.sort_by(|a, b| {
        b.avg_per_transaction
            .partial_cmp(&a.avg_per_transaction)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let best_per_trip = by_avg.first().map(|p| p.platform.clone());

    PerformanceReport {
        platforms,
        top_earner,
        most_consistent,
        best_per_trip,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionSource;
    use chrono::{NaiveDateTime, Utc};

    fn txn(date: NaiveDate, description: &str, amount: f64) -> Transaction {
        Transaction {
            id: 0,
            external_id: format!("{}-{}-{}", date, description, amount),
            user_id: "user-1".to_string(),
            account_id: None,
            date,
            posted_at: None,
            description: description.to_string(),
            amount,
            merchant_name: None,
            category: None,
            pending: false,
            source: TransactionSource::Feed,
            created_at: Utc::now(),
        }
    }

    fn txn_at(date: NaiveDate, hour: u32, description: &str, amount: f64) -> Transaction {
        let mut t = txn(date, description, amount);
        t.posted_at = Some(NaiveDateTime::new(
            date,
            chrono::NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
        ));
        t
    }

    fn now() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()
    }

    #[test]
    fn test_trend_up() {
        let mut transactions = Vec::new();
        // prior 14-day window
        for i in 15..=20 {
            transactions.push(txn(now() - Duration::days(i), "UBER PAYOUT", 100.0));
        }
        // recent 14-day window, noticeably higher
        for i in 1..=6 {
            transactions.push(txn(now() - Duration::days(i), "UBER PAYOUT", 150.0));
        }

        let report = analyze_performance(&transactions, now());
        let uber = &report.platforms[0];
        assert_eq!(uber.trend, TrendDirection::Up);
        assert!((uber.trend_pct - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_trend_down() {
        let mut transactions = Vec::new();
        for i in 15..=18 {
            transactions.push(txn(now() - Duration::days(i), "LYFT PAYOUT", 200.0));
        }
        for i in 1..=4 {
            transactions.push(txn(now() - Duration::days(i), "LYFT PAYOUT", 100.0));
        }

        let report = analyze_performance(&transactions, now());
        assert_eq!(report.platforms[0].trend, TrendDirection::Down);
        assert!((report.platforms[0].trend_pct + 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_trend_zero_previous_is_stable() {
        // all income inside the recent window: previous is 0, trend must be
        // stable with 0% rather than a divide-by-zero blowup
        let transactions = vec![
            txn(now() - Duration::days(2), "UBER PAYOUT", 400.0),
            txn(now() - Duration::days(5), "UBER PAYOUT", 300.0),
        ];

        let report = analyze_performance(&transactions, now());
        assert_eq!(report.platforms[0].trend, TrendDirection::Stable);
        assert_eq!(report.platforms[0].trend_pct, 0.0);
    }

    #[test]
    fn test_small_change_is_stable() {
        let transactions = vec![
            txn(now() - Duration::days(16), "UBER PAYOUT", 100.0),
            txn(now() - Duration::days(3), "UBER PAYOUT", 105.0),
        ];

        let report = analyze_performance(&transactions, now());
        assert_eq!(report.platforms[0].trend, TrendDirection::Stable);
        assert!((report.platforms[0].trend_pct - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_platforms_sorted_by_earnings() {
        let d = now() - Duration::days(3);
        let transactions = vec![
            txn(d, "LYFT PAYOUT", 100.0),
            txn(d, "UBER PAYOUT", 900.0),
            txn(d, "DOORDASH PAY", 400.0),
        ];

        let report = analyze_performance(&transactions, now());
        let order: Vec<&str> = report
            .platforms
            .iter()
            .map(|p| p.platform.as_str())
            .collect();
        assert_eq!(order, vec!["Uber", "DoorDash", "Lyft"]);
        assert_eq!(report.top_earner.as_deref(), Some("Uber"));
    }

    #[test]
    fn test_headline_picks_do_not_reorder_platform_list() {
        let d = now() - Duration::days(3);
        let transactions = vec![
            // Uber: highest total, erratic per-trip amounts
            txn(d, "UBER PAYOUT", 500.0),
            txn(d, "UBER PAYOUT", 20.0),
            txn(d, "UBER PAYOUT", 480.0),
            // Lyft: lower total, perfectly consistent, higher per-trip
            txn(d, "LYFT PAYOUT", 300.0),
            txn(d, "LYFT PAYOUT", 300.0),
        ];

        let report = analyze_performance(&transactions, now());

        assert_eq!(report.top_earner.as_deref(), Some("Uber"));
        assert_eq!(report.most_consistent.as_deref(), Some("Lyft"));
        assert_eq!(report.best_per_trip.as_deref(), Some("Uber"));

        // earnings order survives the headline computations
        assert_eq!(report.platforms[0].platform, "Uber");
        assert_eq!(report.platforms[1].platform, "Lyft");
    }

    #[test]
    fn test_consistency_constant_amounts() {
        let d = now() - Duration::days(3);
        let transactions = vec![
            txn(d, "DOORDASH PAY", 50.0),
            txn(d, "DOORDASH PAY", 50.0),
            txn(d, "DOORDASH PAY", 50.0),
        ];

        let report = analyze_performance(&transactions, now());
        assert_eq!(report.platforms[0].consistency_score, 100.0);
        assert_eq!(report.platforms[0].avg_per_transaction, 50.0);
    }

    #[test]
    fn test_best_days_top_three_with_insertion_ties() {
        // Monday 2024-06-03; weekdays seen in order Mon, Tue, Wed, Thu
        let mon = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let transactions = vec![
            txn(mon, "UBER PAYOUT", 100.0),
            txn(mon + Duration::days(1), "UBER PAYOUT", 300.0),
            txn(mon + Duration::days(2), "UBER PAYOUT", 100.0),
            txn(mon + Duration::days(3), "UBER PAYOUT", 50.0),
        ];

        let report = analyze_performance(&transactions, now());
        // Monday and Wednesday tie at 100; Monday was seen first
        assert_eq!(
            report.platforms[0].best_days,
            vec!["Tuesday", "Monday", "Wednesday"]
        );
    }

    #[test]
    fn test_best_hours_from_posted_timestamps() {
        let d = now() - Duration::days(3);
        let transactions = vec![
            txn_at(d, 17, "UBER PAYOUT", 80.0),
            txn_at(d, 17, "UBER PAYOUT", 90.0),
            txn_at(d, 9, "UBER PAYOUT", 40.0),
            txn_at(d, 22, "UBER PAYOUT", 60.0),
            // no timestamp: contributes to days but not hours
            txn(d, "UBER PAYOUT", 500.0),
        ];

        let report = analyze_performance(&transactions, now());
        assert_eq!(
            report.platforms[0].best_hours,
            vec!["17:00", "22:00", "09:00"]
        );
    }

    #[test]
    fn test_empty_input() {
        let report = analyze_performance(&[], now());
        assert!(report.platforms.is_empty());
        assert!(report.top_earner.is_none());
        assert!(report.most_consistent.is_none());
        assert!(report.best_per_trip.is_none());
    }
}
