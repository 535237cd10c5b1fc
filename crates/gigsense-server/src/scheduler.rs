//! Background task scheduler for weekly report delivery
//!
//! Provides optional in-process scheduling of the weekly summary email,
//! enabled via environment variables:
//!
//! - `GIGSENSE_REPORT_INTERVAL_HOURS`: Interval in hours (e.g., "168" for weekly)
//!
//! When unset, nothing runs in-process; the `/jobs/weekly-report` endpoint
//! remains available for an external cron.

use std::time::Duration;

use chrono::Utc;
use tokio::time::interval;
use tracing::{error, info, warn};

use gigsense_core::notify::MailClient;
use gigsense_core::report::run_weekly_reports;
use gigsense_core::Database;

/// Configuration for scheduled weekly reports
#[derive(Debug, Clone)]
pub struct ReportScheduleConfig {
    /// Interval between report runs in hours
    pub interval_hours: u64,
}

impl ReportScheduleConfig {
    /// Parse configuration from environment variables
    ///
    /// Returns None if scheduling is not configured
    /// (GIGSENSE_REPORT_INTERVAL_HOURS not set)
    pub fn from_env() -> Option<Self> {
        let interval_hours: u64 = std::env::var("GIGSENSE_REPORT_INTERVAL_HOURS")
            .ok()
            .and_then(|s| s.parse().ok())?;

        if interval_hours == 0 {
            warn!("GIGSENSE_REPORT_INTERVAL_HOURS is 0, scheduled reports disabled");
            return None;
        }

        Some(Self { interval_hours })
    }
}

/// Start the report scheduler as a background task
///
/// This function spawns a tokio task that runs indefinitely, sending the
/// weekly summary at the configured interval.
pub fn start_report_scheduler(db: Database, mailer: MailClient, config: ReportScheduleConfig) {
    info!(
        "Starting report scheduler: every {} hours",
        config.interval_hours
    );

    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(config.interval_hours * 3600));

        // Skip the first immediate tick - we don't want to mail on startup
        ticker.tick().await;

        loop {
            ticker.tick().await;

            info!("Running scheduled weekly report...");

            match run_weekly_reports(&db, &mailer, Utc::now()).await {
                Ok(run) => {
                    info!(
                        sent = run.sent,
                        skipped = run.skipped,
                        failed = run.failed,
                        "Scheduled weekly report completed"
                    );
                }
                Err(e) => {
                    error!("Scheduled weekly report failed: {}", e);
                }
            }
        }
    });
}
