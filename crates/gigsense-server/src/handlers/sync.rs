//! On-demand feed sync handler

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    Json,
};
use tracing::info;

use crate::{get_user_id, AppError, AppState};
use gigsense_core::sync::{sync_user, SyncSummary};

/// POST /api/sync - Pull the delta feed for all of the caller's accounts
///
/// Per-account failures land in the summary rather than failing the
/// request; only an unreachable datastore returns an error.
pub async fn run_sync(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<SyncSummary>, AppError> {
    let user_id = get_user_id(request.headers());

    let feed = state.feed.as_ref().ok_or_else(|| {
        AppError::service_unavailable("Bank feed is not configured (set GIGSENSE_FEED_HOST)")
    })?;

    let summary = sync_user(&state.db, feed, &user_id, None).await?;

    // Reconciled rows invalidate the stored snapshot
    if !summary.totals.is_empty() {
        super::income::rebuild_snapshot(&state.db, &user_id)?;
    }

    info!(
        user = %user_id,
        accounts = summary.accounts.len(),
        failed = summary.failed(),
        added = summary.totals.added,
        modified = summary.totals.modified,
        removed = summary.totals.removed,
        "Sync complete"
    );

    Ok(Json(summary))
}
