//! Weekly earnings report
//!
//! Compares the last 7 days of income against the 7 before that and mails
//! a short summary to every opted-in user. One user's bad address or
//! missing data never stops the rest of the batch.

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use crate::db::Database;
use crate::error::Result;
use crate::notify::{MailClient, Mailer};
use crate::platforms::classify;

/// One user's week-over-week comparison
#[derive(Debug, Clone, serde::Serialize)]
pub struct WeeklySummary {
    pub user_id: String,
    /// Income over the last 7 calendar days
    pub total: f64,
    /// Income over the 7 days before that
    pub previous_total: f64,
    /// Percent change vs the prior week; None when there was no prior income
    pub change_pct: Option<f64>,
    /// Highest-earning platform of the current week
    pub top_platform: Option<String>,
    pub payouts: usize,
}

/// Outcome counters for one report run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ReportRunSummary {
    pub sent: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Build the week-over-week summary for one user.
///
/// Returns None when the current week has no income, which the run
/// treats as a skip rather than an empty email.
pub fn build_weekly_summary(
    db: &Database,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<Option<WeeklySummary>> {
    let today = now.date_naive();
    let week_start = today - Duration::days(6);
    let prior_start = today - Duration::days(13);
    let prior_end = today - Duration::days(7);

    let current = db.transactions_in_range(user_id, week_start, today)?;
    let prior = db.transactions_in_range(user_id, prior_start, prior_end)?;

    let mut total = 0.0;
    let mut payouts = 0;
    let mut platform_totals: Vec<(&'static str, f64)> = Vec::new();
    for txn in current.iter().filter(|t| t.amount > 0.0) {
        total += txn.amount;
        payouts += 1;
        let platform = classify(&txn.description);
        match platform_totals.iter_mut().find(|(p, _)| *p == platform) {
            Some((_, sum)) => *sum += txn.amount,
            None => platform_totals.push((platform, txn.amount)),
        }
    }

    if payouts == 0 {
        return Ok(None);
    }

    let previous_total: f64 = prior
        .iter()
        .filter(|t| t.amount > 0.0)
        .map(|t| t.amount)
        .sum();
    let change_pct = if previous_total > 0.0 {
        Some((total - previous_total) / previous_total * 100.0)
    } else {
        None
    };

    let top_platform = platform_totals
        .iter()
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(p, _)| p.to_string());

    Ok(Some(WeeklySummary {
        user_id: user_id.to_string(),
        total,
        previous_total,
        change_pct,
        top_platform,
        payouts,
    }))
}

/// Render the summary as a plain-text email body
pub fn render_email(summary: &WeeklySummary) -> (String, String) {
    let subject = format!("Your week in earnings: ${:.2}", summary.total);

    let mut body = format!(
        "You earned ${:.2} across {} payout(s) this week.\n",
        summary.total, summary.payouts
    );
    match summary.change_pct {
        Some(change) if change >= 0.0 => {
            body.push_str(&format!(
                "That's up {:.1}% from last week (${:.2}).\n",
                change, summary.previous_total
            ));
        }
        Some(change) => {
            body.push_str(&format!(
                "That's down {:.1}% from last week (${:.2}).\n",
                change.abs(),
                summary.previous_total
            ));
        }
        None => {
            body.push_str("No income was recorded the week before.\n");
        }
    }
    if let Some(platform) = &summary.top_platform {
        body.push_str(&format!("Top platform: {}.\n", platform));
    }

    (subject, body)
}

/// Send the weekly summary to every opted-in user.
///
/// Settle-all: each user resolves to sent, skipped, or failed, and the
/// loop always reaches the end of the list.
pub async fn run_weekly_reports(
    db: &Database,
    mailer: &MailClient,
    now: DateTime<Utc>,
) -> Result<ReportRunSummary> {
    let profiles = db.list_report_optins()?;
    let mut run = ReportRunSummary::default();

    for profile in profiles {
        let Some(email) = profile.email.as_deref() else {
            run.skipped += 1;
            continue;
        };

        match build_weekly_summary(db, &profile.user_id, now) {
            Ok(None) => {
                run.skipped += 1;
            }
            Ok(Some(summary)) => {
                let (subject, body) = render_email(&summary);
                match mailer.send(email, &subject, &body).await {
                    Ok(()) => run.sent += 1,
                    Err(e) => {
                        warn!(user_id = %profile.user_id, "Report delivery failed: {}", e);
                        run.failed += 1;
                    }
                }
            }
            Err(e) => {
                warn!(user_id = %profile.user_id, "Report computation failed: {}", e);
                run.failed += 1;
            }
        }
    }

    info!(
        sent = run.sent,
        skipped = run.skipped,
        failed = run.failed,
        "Weekly report run finished"
    );

    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewTransaction, TransactionSource};
    use crate::notify::MockMailer;
    use chrono::NaiveDate;

    fn seed_txn(db: &Database, user_id: &str, id: &str, date: &str, desc: &str, amount: f64) {
        let txn = NewTransaction {
            external_id: id.into(),
            date: date.parse().unwrap(),
            posted_at: None,
            description: desc.into(),
            amount,
            merchant_name: None,
            category: None,
            pending: false,
            source: TransactionSource::Csv,
        };
        db.insert_transaction(user_id, None, &txn).unwrap();
    }

    fn fixed_now() -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(2024, 6, 14)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
            .and_utc()
    }

    #[test]
    fn test_summary_compares_weeks() {
        let db = Database::in_memory().unwrap();
        // Current week: Jun 8-14. Prior week: Jun 1-7.
        seed_txn(&db, "u1", "t1", "2024-06-10", "UBER WEEKLY PAY", 600.0);
        seed_txn(&db, "u1", "t2", "2024-06-12", "DOORDASH PAY", 150.0);
        seed_txn(&db, "u1", "t3", "2024-06-03", "UBER WEEKLY PAY", 500.0);

        let summary = build_weekly_summary(&db, "u1", fixed_now())
            .unwrap()
            .unwrap();
        assert!((summary.total - 750.0).abs() < 1e-9);
        assert!((summary.previous_total - 500.0).abs() < 1e-9);
        assert!((summary.change_pct.unwrap() - 50.0).abs() < 1e-9);
        assert_eq!(summary.top_platform.as_deref(), Some("Uber"));
        assert_eq!(summary.payouts, 2);
    }

    #[test]
    fn test_summary_window_boundaries() {
        let db = Database::in_memory().unwrap();
        // Jun 8 is the first day of the current week; Jun 7 the last of prior
        seed_txn(&db, "u1", "t1", "2024-06-08", "UBER PAY", 100.0);
        seed_txn(&db, "u1", "t2", "2024-06-07", "UBER PAY", 40.0);
        // Before both windows entirely
        seed_txn(&db, "u1", "t3", "2024-05-31", "UBER PAY", 999.0);

        let summary = build_weekly_summary(&db, "u1", fixed_now())
            .unwrap()
            .unwrap();
        assert!((summary.total - 100.0).abs() < 1e-9);
        assert!((summary.previous_total - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_summary_none_when_no_income() {
        let db = Database::in_memory().unwrap();
        // Only an expense in the window
        seed_txn(&db, "u1", "t1", "2024-06-10", "SHELL GAS", -45.0);

        assert!(build_weekly_summary(&db, "u1", fixed_now())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_summary_no_prior_income() {
        let db = Database::in_memory().unwrap();
        seed_txn(&db, "u1", "t1", "2024-06-10", "UBER PAY", 300.0);

        let summary = build_weekly_summary(&db, "u1", fixed_now())
            .unwrap()
            .unwrap();
        assert!(summary.change_pct.is_none());
        assert_eq!(summary.previous_total, 0.0);
    }

    #[test]
    fn test_render_email_up_week() {
        let summary = WeeklySummary {
            user_id: "u1".into(),
            total: 750.0,
            previous_total: 500.0,
            change_pct: Some(50.0),
            top_platform: Some("Uber".into()),
            payouts: 2,
        };

        let (subject, body) = render_email(&summary);
        assert_eq!(subject, "Your week in earnings: $750.00");
        assert!(body.contains("up 50.0%"));
        assert!(body.contains("Top platform: Uber."));
    }

    #[test]
    fn test_render_email_down_week() {
        let summary = WeeklySummary {
            user_id: "u1".into(),
            total: 400.0,
            previous_total: 500.0,
            change_pct: Some(-20.0),
            top_platform: None,
            payouts: 1,
        };

        let (_, body) = render_email(&summary);
        assert!(body.contains("down 20.0%"));
    }

    #[tokio::test]
    async fn test_run_sends_skips_and_fails() {
        let db = Database::in_memory().unwrap();

        // u1: opted in, has income -> sent
        db.ensure_profile("u1", Some("u1@example.com")).unwrap();
        db.update_profile("u1", None, None, Some(true), None, None)
            .unwrap();
        seed_txn(&db, "u1", "t1", "2024-06-10", "UBER PAY", 300.0);

        // u2: opted in, no income this week -> skipped
        db.ensure_profile("u2", Some("u2@example.com")).unwrap();
        db.update_profile("u2", None, None, Some(true), None, None)
            .unwrap();

        // u3: opted in, income, but delivery fails -> failed
        db.ensure_profile("u3", Some("u3@example.com")).unwrap();
        db.update_profile("u3", None, None, Some(true), None, None)
            .unwrap();
        seed_txn(&db, "u3", "t2", "2024-06-11", "LYFT PAYOUT", 200.0);

        // u4: never opted in -> not even considered
        db.ensure_profile("u4", Some("u4@example.com")).unwrap();
        seed_txn(&db, "u4", "t3", "2024-06-11", "UBER PAY", 100.0);

        let mock = MockMailer::new();
        mock.fail_for("u3@example.com");
        let mailer = MailClient::mock(mock.clone());

        let run = run_weekly_reports(&db, &mailer, fixed_now()).await.unwrap();
        assert_eq!(
            run,
            ReportRunSummary {
                sent: 1,
                skipped: 1,
                failed: 1
            }
        );

        let sent = mock.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "u1@example.com");
        assert!(sent[0].body.contains("$300.00"));
    }

    #[tokio::test]
    async fn test_run_skips_optin_without_email() {
        let db = Database::in_memory().unwrap();
        db.ensure_profile("u1", None).unwrap();
        db.update_profile("u1", None, None, Some(true), None, None)
            .unwrap();
        seed_txn(&db, "u1", "t1", "2024-06-10", "UBER PAY", 300.0);

        let mailer = MailClient::mock(MockMailer::new());
        let run = run_weekly_reports(&db, &mailer, fixed_now()).await.unwrap();
        assert_eq!(run.skipped, 1);
        assert_eq!(run.sent, 0);
    }
}
