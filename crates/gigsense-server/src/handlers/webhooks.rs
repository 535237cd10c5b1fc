//! Aggregator webhook receiver

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{AppError, AppState};
use gigsense_core::models::AccountStatus;
use gigsense_core::sync::{sync_item, SyncSummary};

/// Webhook payload from the bank-data aggregator
#[derive(Debug, Deserialize)]
pub struct FeedWebhook {
    pub webhook_type: String,
    pub webhook_code: String,
    pub item_id: String,
}

/// What the receiver did with the webhook
#[derive(Serialize)]
pub struct WebhookResponse {
    pub acknowledged: bool,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync: Option<SyncSummary>,
}

impl WebhookResponse {
    fn action(action: &str) -> Self {
        Self {
            acknowledged: true,
            action: action.to_string(),
            sync: None,
        }
    }
}

/// POST /webhooks/feed - Receive an aggregator webhook
///
/// The webhook is a hint, not a data carrier: a sync-updates notification
/// triggers a pull of the item's accounts through the normal cursor loop.
/// Unrecognized type/code combinations are logged and acknowledged with 200
/// so the aggregator does not keep retrying them.
pub async fn feed_webhook(
    State(state): State<Arc<AppState>>,
    Json(webhook): Json<FeedWebhook>,
) -> Result<Json<WebhookResponse>, AppError> {
    info!(
        webhook_type = %webhook.webhook_type,
        webhook_code = %webhook.webhook_code,
        item_id = %webhook.item_id,
        "Webhook received"
    );

    match (webhook.webhook_type.as_str(), webhook.webhook_code.as_str()) {
        ("TRANSACTIONS", "SYNC_UPDATES_AVAILABLE") => {
            let Some(feed) = state.feed.as_ref() else {
                warn!(
                    item_id = %webhook.item_id,
                    "Sync-updates webhook received but no bank feed is configured"
                );
                return Ok(Json(WebhookResponse::action("sync_unavailable")));
            };

            let summary = sync_item(&state.db, feed, &webhook.item_id, None).await?;

            // An item's accounts can belong to more than one user; every
            // owner whose data changed gets a fresh snapshot
            if !summary.totals.is_empty() {
                let mut users: Vec<String> = state
                    .db
                    .list_accounts_for_item(&webhook.item_id)?
                    .into_iter()
                    .map(|a| a.user_id)
                    .collect();
                users.sort();
                users.dedup();
                for user_id in &users {
                    super::income::rebuild_snapshot(&state.db, user_id)?;
                }
            }

            Ok(Json(WebhookResponse {
                acknowledged: true,
                action: "synced".to_string(),
                sync: Some(summary),
            }))
        }
        ("ITEM", "ERROR") => {
            let changed = state
                .db
                .set_item_status(&webhook.item_id, AccountStatus::Error)?;
            warn!(
                item_id = %webhook.item_id,
                accounts = changed,
                "Item reported an error; accounts need re-link"
            );
            Ok(Json(WebhookResponse::action("item_marked_error")))
        }
        ("ITEM", "PENDING_EXPIRATION") => {
            let changed = state
                .db
                .set_item_status(&webhook.item_id, AccountStatus::PendingExpiration)?;
            info!(
                item_id = %webhook.item_id,
                accounts = changed,
                "Item access is expiring soon"
            );
            Ok(Json(WebhookResponse::action("item_marked_pending_expiration")))
        }
        _ => {
            info!(
                webhook_type = %webhook.webhook_type,
                webhook_code = %webhook.webhook_code,
                "Ignoring unhandled webhook"
            );
            Ok(Json(WebhookResponse::action("ignored")))
        }
    }
}
