//! Income analysis handlers: snapshot, performance, and tips

use std::sync::Arc;

use axum::{
    extract::{Query, Request, State},
    http::HeaderMap,
    Json,
};
use chrono::Utc;
use rand::{rngs::StdRng, SeedableRng};
use serde::Deserialize;
use tracing::info;

use crate::{get_user_id, AppError, AppState};
use gigsense_core::analysis::{analyze_performance, build_snapshot};
use gigsense_core::db::Database;
use gigsense_core::models::{IncomeSnapshot, PerformanceReport, Tip};
use gigsense_core::tips::{generate_tips, TipContext};

/// Recompute the user's snapshot from stored transactions and persist it.
///
/// Shared by the refresh endpoint and the write paths (import, sync,
/// webhook-triggered sync) so a successful write is always followed by a
/// snapshot the read endpoints can serve.
pub(crate) fn rebuild_snapshot(
    db: &Database,
    user_id: &str,
) -> Result<IncomeSnapshot, gigsense_core::Error> {
    let transactions = db.transactions_for_user(user_id)?;
    let snapshot = build_snapshot(user_id, &transactions, Utc::now());
    db.save_snapshot(&snapshot)?;
    Ok(snapshot)
}

/// GET /api/income - Return the stored income snapshot
pub async fn get_income(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<IncomeSnapshot>, AppError> {
    let user_id = get_user_id(request.headers());

    let snapshot = state.db.get_snapshot(&user_id)?.ok_or_else(|| {
        AppError::not_found("No income snapshot yet; POST /api/income/refresh to compute one")
    })?;

    Ok(Json(snapshot))
}

/// POST /api/income/refresh - Recompute the snapshot from stored transactions
pub async fn refresh_income(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<IncomeSnapshot>, AppError> {
    let user_id = get_user_id(request.headers());

    let snapshot = rebuild_snapshot(&state.db, &user_id)?;

    info!(
        user = %user_id,
        total = snapshot.total_income,
        platforms = snapshot.by_platform.len(),
        "Income snapshot refreshed"
    );

    Ok(Json(snapshot))
}

/// GET /api/performance - Per-platform performance report
pub async fn get_performance(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<PerformanceReport>, AppError> {
    let user_id = get_user_id(request.headers());

    let transactions = state.db.transactions_for_user(&user_id)?;
    let report = analyze_performance(&transactions, Utc::now().date_naive());

    Ok(Json(report))
}

/// Query parameters for the tips endpoint
#[derive(Debug, Deserialize)]
pub struct TipParams {
    /// Optional RNG seed for a reproducible city tip draw
    pub seed: Option<u64>,
}

/// GET /api/tips - Prioritized recommendations for the caller
///
/// Uses the stored snapshot when one exists, otherwise computes one on the
/// fly without persisting it.
pub async fn get_tips(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TipParams>,
    headers: HeaderMap,
) -> Result<Json<Vec<Tip>>, AppError> {
    let user_id = get_user_id(&headers);

    let profile = state.db.ensure_profile(&user_id, None)?;
    let snapshot = match state.db.get_snapshot(&user_id)? {
        Some(snapshot) => snapshot,
        None => {
            let transactions = state.db.transactions_for_user(&user_id)?;
            build_snapshot(&user_id, &transactions, Utc::now())
        }
    };

    let platforms: Vec<String> = snapshot
        .by_platform
        .iter()
        .map(|p| p.platform.clone())
        .collect();

    let ctx = TipContext {
        total_income: snapshot.total_income,
        platforms: &platforms,
        stability: &snapshot.stability,
        has_tax_profile: profile.has_tax_profile,
        has_benefits: profile.has_benefits,
        city: profile.city.as_deref(),
    };

    let mut rng = match params.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let tips = generate_tips(&ctx, &mut rng);

    Ok(Json(tips))
}
