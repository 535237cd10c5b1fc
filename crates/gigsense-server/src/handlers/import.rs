//! CSV statement import handler

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::HeaderMap,
    Json,
};
use serde::Serialize;
use tracing::info;

use crate::{get_user_id, AppError, AppState, MAX_UPLOAD_SIZE};
use gigsense_core::import::parse_csv;

/// Response for the import endpoint
#[derive(Serialize)]
pub struct ImportResponse {
    /// Rows inserted
    pub imported: usize,
    /// Rows already present (same content hash), left untouched
    pub duplicates: usize,
    /// Malformed rows dropped during parsing
    pub skipped: usize,
}

/// POST /api/import - Import transactions from a statement CSV
///
/// Expects multipart form with:
/// - file: CSV file (required, max 10MB), columns Date, Description, Amount, Type
pub async fn import_csv(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<ImportResponse>, AppError> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut total_size: usize = 0;

    // Extract fields from multipart form
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(&format!("Failed to read form field: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name == "file" {
            let bytes = field
                .bytes()
                .await
                .map_err(|_| AppError::bad_request("Failed to read file data"))?;
            total_size += bytes.len();

            // Check file size limit
            if total_size > MAX_UPLOAD_SIZE {
                return Err(AppError::bad_request(&format!(
                    "File too large. Maximum size is {} MB",
                    MAX_UPLOAD_SIZE / 1024 / 1024
                )));
            }

            file_data = Some(bytes.to_vec());
        }
    }

    let file_data = file_data.ok_or_else(|| AppError::bad_request("Missing file field"))?;
    let user_id = get_user_id(&headers);

    state.db.ensure_profile(&user_id, None)?;

    let batch = parse_csv(file_data.as_slice())?;

    let mut imported = 0;
    let mut duplicates = 0;
    for tx in &batch.transactions {
        match state.db.insert_transaction(&user_id, None, tx)? {
            Some(_) => imported += 1,
            None => duplicates += 1,
        }
    }

    // New rows change the analysis, so the stored snapshot follows the
    // import instead of waiting for an explicit refresh
    if imported > 0 {
        super::income::rebuild_snapshot(&state.db, &user_id)?;
    }

    info!(
        user = %user_id,
        imported,
        duplicates,
        skipped = batch.skipped,
        "CSV import complete"
    );

    Ok(Json(ImportResponse {
        imported,
        duplicates,
        skipped: batch.skipped,
    }))
}
