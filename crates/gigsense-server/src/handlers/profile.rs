//! User profile handlers

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    Json,
};
use serde::Deserialize;

use crate::{get_user_id, AppError, AppState};
use gigsense_core::models::UserProfile;

/// Request body for updating a profile; absent fields keep their value
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub email: Option<String>,
    pub city: Option<String>,
    pub weekly_report: Option<bool>,
    pub has_tax_profile: Option<bool>,
    pub has_benefits: Option<bool>,
}

/// GET /api/profile - The caller's profile, created on first access
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<UserProfile>, AppError> {
    let user_id = get_user_id(request.headers());
    let profile = state.db.ensure_profile(&user_id, None)?;
    Ok(Json(profile))
}

/// PUT /api/profile - Update profile fields
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<UserProfile>, AppError> {
    let user_id = get_user_id(request.headers());

    let bytes = axum::body::to_bytes(request.into_body(), 1024 * 10)
        .await
        .map_err(|_| AppError::bad_request("Invalid request body"))?;
    let req: UpdateProfileRequest =
        serde_json::from_slice(&bytes).map_err(|_| AppError::bad_request("Invalid JSON"))?;

    state.db.ensure_profile(&user_id, None)?;
    let profile = state.db.update_profile(
        &user_id,
        req.email.as_deref(),
        req.city.as_deref(),
        req.weekly_report,
        req.has_tax_profile,
        req.has_benefits,
    )?;

    Ok(Json(profile))
}
