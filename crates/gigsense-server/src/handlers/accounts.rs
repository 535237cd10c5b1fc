//! Linked account management handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    Json,
};
use serde::Deserialize;

use crate::{get_user_id, AppError, AppState, SuccessResponse};
use gigsense_core::models::LinkedAccount;

/// Request body for linking an account
#[derive(Debug, Deserialize)]
pub struct LinkAccountRequest {
    /// Aggregator item id; the webhook routing key
    pub item_id: String,
    /// Aggregator account id, unique per user
    pub account_id: String,
    pub institution: Option<String>,
    pub access_token: String,
}

/// Request body for re-linking an account with a fresh token
#[derive(Debug, Deserialize)]
pub struct RelinkAccountRequest {
    pub access_token: String,
}

/// GET /api/accounts - List the caller's linked accounts
pub async fn list_accounts(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<Vec<LinkedAccount>>, AppError> {
    let user_id = get_user_id(request.headers());
    let accounts = state.db.list_linked_accounts(&user_id)?;
    Ok(Json(accounts))
}

/// POST /api/accounts/link - Link a bank account through the aggregator
pub async fn link_account(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<LinkedAccount>, AppError> {
    let user_id = get_user_id(request.headers());

    let bytes = axum::body::to_bytes(request.into_body(), 1024 * 10)
        .await
        .map_err(|_| AppError::bad_request("Invalid request body"))?;
    let req: LinkAccountRequest =
        serde_json::from_slice(&bytes).map_err(|_| AppError::bad_request("Invalid JSON"))?;

    if req.item_id.is_empty() || req.account_id.is_empty() || req.access_token.is_empty() {
        return Err(AppError::bad_request(
            "item_id, account_id, and access_token are required",
        ));
    }

    state.db.ensure_profile(&user_id, None)?;
    let account = state.db.link_account(
        &user_id,
        &req.item_id,
        &req.account_id,
        req.institution.as_deref(),
        &req.access_token,
    )?;

    Ok(Json(account))
}

/// POST /api/accounts/:id/relink - Refresh the access token for a linked account
///
/// Re-linking resets the sync cursor, so the next sync re-pulls history from
/// the beginning; the reconciler's upsert keeps that from duplicating rows.
pub async fn relink_account(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<LinkedAccount>, AppError> {
    let user_id = get_user_id(request.headers());

    let existing = state
        .db
        .get_linked_account(id)?
        .filter(|a| a.user_id == user_id)
        .ok_or_else(|| AppError::not_found(&format!("Account {} not found", id)))?;

    let bytes = axum::body::to_bytes(request.into_body(), 1024 * 10)
        .await
        .map_err(|_| AppError::bad_request("Invalid request body"))?;
    let req: RelinkAccountRequest =
        serde_json::from_slice(&bytes).map_err(|_| AppError::bad_request("Invalid JSON"))?;

    if req.access_token.is_empty() {
        return Err(AppError::bad_request("access_token is required"));
    }

    let account = state.db.link_account(
        &user_id,
        &existing.item_id,
        &existing.account_id,
        existing.institution.as_deref(),
        &req.access_token,
    )?;

    Ok(Json(account))
}

/// DELETE /api/accounts/:id - Unlink an account
///
/// Synced transactions stay; they lose their account association but keep
/// their history in the analysis.
pub async fn unlink_account(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<SuccessResponse>, AppError> {
    let user_id = get_user_id(request.headers());

    let removed = state.db.unlink_account(&user_id, id)?;
    if !removed {
        return Err(AppError::not_found(&format!("Account {} not found", id)));
    }

    Ok(Json(SuccessResponse { success: true }))
}
