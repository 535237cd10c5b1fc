//! Test utilities for gigsense-core
//!
//! Provides a mock aggregator feed server speaking the real wire protocol
//! (outflow-positive amounts, cursor paging) for development and
//! integration tests of the HTTP feed backend.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

/// A sync request as received by the mock server
#[derive(Debug, Clone, Deserialize)]
pub struct ReceivedSync {
    pub client_id: String,
    pub secret: String,
    pub access_token: String,
    pub cursor: Option<String>,
}

type RequestLog = Arc<Mutex<Vec<ReceivedSync>>>;

/// Mock aggregator server for testing and development
///
/// Serves a fixed two-page script: the first page adds two payouts, the
/// second amends one and removes the other. The cursor "boom" answers 500
/// for error-path tests; unknown cursors return an empty final page.
pub struct MockFeedServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    requests: RequestLog,
}

impl MockFeedServer {
    /// Start the mock server on an available port
    pub async fn start() -> Self {
        let requests: RequestLog = Arc::new(Mutex::new(Vec::new()));

        let app = Router::new()
            .route("/transactions/sync", post(handle_sync))
            .with_state(requests.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
            requests,
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Every sync request received so far, in order
    pub fn requests(&self) -> Vec<ReceivedSync> {
        self.requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockFeedServer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn handle_sync(
    State(requests): State<RequestLog>,
    Json(request): Json<ReceivedSync>,
) -> Response {
    let cursor = request.cursor.clone();
    requests
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .push(request);

    match cursor.as_deref() {
        None | Some("") => Json(first_page()).into_response(),
        Some("srv-cur-1") => Json(second_page()).into_response(),
        Some("boom") => (StatusCode::INTERNAL_SERVER_ERROR, "aggregator down").into_response(),
        Some(other) => Json(WirePage {
            added: vec![],
            modified: vec![],
            removed: vec![],
            next_cursor: other.to_string(),
            has_more: false,
        })
        .into_response(),
    }
}

fn first_page() -> WirePage {
    WirePage {
        added: vec![
            WireTxn {
                transaction_id: "wire-t1".into(),
                account_id: "wire-acct-1".into(),
                date: "2024-06-03".into(),
                datetime: Some("2024-06-03T17:30:00Z".into()),
                name: "UBER BV WEEKLY EARNINGS".into(),
                merchant_name: Some("Uber".into()),
                category: Some("Transfer".into()),
                // aggregator wire convention: inflows are negative
                amount: -450.0,
                pending: false,
            },
            WireTxn {
                transaction_id: "wire-t2".into(),
                account_id: "wire-acct-1".into(),
                date: "2024-06-05".into(),
                datetime: None,
                name: "DOORDASH DASHER PAY".into(),
                merchant_name: Some("DoorDash".into()),
                category: Some("Transfer".into()),
                amount: -212.5,
                pending: false,
            },
        ],
        modified: vec![],
        removed: vec![],
        next_cursor: "srv-cur-1".into(),
        has_more: true,
    }
}

fn second_page() -> WirePage {
    WirePage {
        added: vec![],
        modified: vec![WireTxn {
            transaction_id: "wire-t1".into(),
            account_id: "wire-acct-1".into(),
            date: "2024-06-03".into(),
            datetime: Some("2024-06-03T17:30:00Z".into()),
            name: "UBER BV WEEKLY EARNINGS".into(),
            merchant_name: Some("Uber".into()),
            category: Some("Transfer".into()),
            amount: -475.0,
            pending: false,
        }],
        removed: vec![WireRemoved {
            transaction_id: "wire-t2".into(),
        }],
        next_cursor: "srv-cur-2".into(),
        has_more: false,
    }
}

// Wire types for the mock server responses

#[derive(Debug, Serialize)]
struct WirePage {
    added: Vec<WireTxn>,
    modified: Vec<WireTxn>,
    removed: Vec<WireRemoved>,
    next_cursor: String,
    has_more: bool,
}

#[derive(Debug, Serialize)]
struct WireTxn {
    transaction_id: String,
    account_id: String,
    date: String,
    datetime: Option<String>,
    name: String,
    merchant_name: Option<String>,
    category: Option<String>,
    amount: f64,
    pending: bool,
}

#[derive(Debug, Serialize)]
struct WireRemoved {
    transaction_id: String,
}
