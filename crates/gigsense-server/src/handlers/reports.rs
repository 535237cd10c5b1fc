//! Scheduled weekly-report job endpoint

use std::sync::Arc;

use axum::{extract::State, http::HeaderMap, Json};
use chrono::Utc;
use tracing::info;

use crate::{bearer_matches, AppError, AppState};
use gigsense_core::report::{run_weekly_reports, ReportRunSummary};

/// POST /jobs/weekly-report - Send the weekly summary email to opted-in users
///
/// Authenticated by a shared-secret bearer token so an external cron can
/// drive it. Per-user failures are settled into the summary counts; the
/// batch itself only fails when the datastore is unreachable.
pub async fn weekly_report_job(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ReportRunSummary>, AppError> {
    let Some(secret) = state.config.report_secret.as_deref() else {
        return Err(AppError::service_unavailable(
            "Report job is not configured (set GIGSENSE_REPORT_SECRET)",
        ));
    };

    if !bearer_matches(&headers, secret) {
        return Err(AppError::unauthorized("Invalid job secret"));
    }

    let Some(mailer) = state.mailer.as_ref() else {
        return Err(AppError::service_unavailable(
            "Mail delivery is not configured (set GIGSENSE_MAIL_HOST)",
        ));
    };

    let run = run_weekly_reports(&state.db, mailer, Utc::now()).await?;

    info!(
        sent = run.sent,
        skipped = run.skipped,
        failed = run.failed,
        "Weekly report job complete"
    );

    Ok(Json(run))
}
