//! GigSense Web Server
//!
//! Axum-based REST API for the GigSense gig-income analytics application.
//!
//! Security features:
//! - Reverse-proxy identity authentication (secure by default, use --no-auth for local dev)
//! - API key authentication with constant-time comparison
//! - Restrictive CORS policy
//! - Input validation (file size limits)
//! - Sanitized error responses

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use gigsense_core::db::Database;
use gigsense_core::feed::{BankFeed, FeedClient};
use gigsense_core::notify::MailClient;

mod handlers;
mod scheduler;

pub use scheduler::{start_report_scheduler, ReportScheduleConfig};

/// Maximum file upload size (10 MB)
pub const MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

/// Identity header stamped by the authenticating reverse proxy
const PROXY_USER_HEADER: &str = "x-gigsense-user";

/// Authorization header for API key and job secret auth
const AUTHORIZATION_HEADER: &str = "authorization";

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    /// Whether authentication is required (secure by default)
    pub require_auth: bool,
    /// Allowed CORS origins (empty = same-origin only in production)
    pub allowed_origins: Vec<String>,
    /// API keys for internal service authentication (alternative to the proxy header)
    /// Format: "Bearer <key>" in Authorization header
    pub api_keys: Vec<String>,
    /// Shared secret for the weekly-report job endpoint; None disables it
    pub report_secret: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            require_auth: true,
            allowed_origins: vec![],
            api_keys: vec![],
            report_secret: None,
        }
    }
}

impl ServerConfig {
    /// Read configuration from `GIGSENSE_API_KEYS`, `GIGSENSE_REPORT_SECRET`,
    /// and `GIGSENSE_ALLOWED_ORIGINS`. Auth stays on; the serve command's
    /// `--no-auth` flag is the only way to turn it off.
    pub fn from_env() -> Self {
        let api_keys = std::env::var("GIGSENSE_API_KEYS")
            .map(|v| parse_api_keys(&v))
            .unwrap_or_default();

        let report_secret = std::env::var("GIGSENSE_REPORT_SECRET")
            .ok()
            .filter(|s| !s.is_empty());

        let allowed_origins = std::env::var("GIGSENSE_ALLOWED_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            require_auth: true,
            allowed_origins,
            api_keys,
            report_secret,
        }
    }
}

/// Parse a comma-separated list of API keys, dropping empty entries
pub fn parse_api_keys(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub config: ServerConfig,
    /// Aggregator feed client; None disables sync and webhook-triggered syncs
    pub feed: Option<FeedClient>,
    /// Outbound mail client; None disables weekly report delivery
    pub mailer: Option<MailClient>,
}

/// Authentication middleware - validates the proxy identity header or API keys
///
/// # Security Notes
///
/// **Proxy identity header**: `X-GigSense-User` is trusted as-is. This is safe
/// behind an authenticating reverse proxy that strips and rewrites the header,
/// but can be spoofed if the server is exposed directly to the internet.
///
/// **API keys**: Compared using constant-time comparison to prevent timing
/// attacks.
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if !state.config.require_auth {
        return next.run(request).await;
    }

    let proxy_user = request
        .headers()
        .get(PROXY_USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim())
        .filter(|s| !s.is_empty());

    if let Some(user) = proxy_user {
        info!(user = %user, path = %request.uri().path(), "Authenticated via proxy header");
        return next.run(request).await;
    }

    // Check for API key in Authorization header (Bearer token)
    let api_key_valid = request
        .headers()
        .get(AUTHORIZATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(|key| validate_api_key(key, &state.config.api_keys))
        .unwrap_or(false);

    if api_key_valid {
        info!(user = "api-key", path = %request.uri().path(), "Authenticated via API key");
        return next.run(request).await;
    }

    warn!(path = %request.uri().path(), "Unauthorized request - no valid auth");
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": "Authentication required"
        })),
    )
        .into_response()
}

/// Validate an API key against the configured keys using constant-time
/// comparison to prevent timing attacks.
fn validate_api_key(provided: &str, valid_keys: &[String]) -> bool {
    use subtle::ConstantTimeEq;

    let provided_bytes = provided.as_bytes();

    for key in valid_keys {
        let key_bytes = key.as_bytes();
        // Only compare if lengths match (constant-time for same-length keys)
        if provided_bytes.len() == key_bytes.len() {
            if provided_bytes.ct_eq(key_bytes).into() {
                return true;
            }
        }
    }
    false
}

/// Check a `Bearer <secret>` Authorization header against a shared secret
/// in constant time. Used by the weekly-report job endpoint.
pub(crate) fn bearer_matches(headers: &axum::http::HeaderMap, secret: &str) -> bool {
    use subtle::ConstantTimeEq;

    headers
        .get(AUTHORIZATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(|token| {
            token.len() == secret.len() && bool::from(token.as_bytes().ct_eq(secret.as_bytes()))
        })
        .unwrap_or(false)
}

/// Extract the acting user id from request headers.
///
/// Returns the proxy identity header value, or "local" when the header is
/// absent (local dev with --no-auth, or API-key callers acting for the
/// default user).
pub fn get_user_id(headers: &axum::http::HeaderMap) -> String {
    headers
        .get(PROXY_USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| "local".to_string())
}

/// Success response
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// GET /health - liveness probe, no auth
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Create the application router
pub fn create_router(db: Database, config: ServerConfig) -> Router {
    let feed = FeedClient::from_env();
    match &feed {
        Some(client) => info!("Bank feed configured: {}", client.host()),
        None => info!("ℹ️  Bank feed not configured (set GIGSENSE_FEED_HOST to enable sync)"),
    }

    let mailer = MailClient::from_env();
    if mailer.is_some() {
        info!("Mail delivery configured");
    } else {
        info!("ℹ️  Mail delivery not configured (set GIGSENSE_MAIL_HOST to enable weekly reports)");
    }

    create_router_with_clients(db, config, feed, mailer)
}

/// Create the application router with injected clients (for testing)
pub fn create_router_with_clients(
    db: Database,
    config: ServerConfig,
    feed: Option<FeedClient>,
    mailer: Option<MailClient>,
) -> Router {
    let state = Arc::new(AppState {
        db,
        config: config.clone(),
        feed,
        mailer,
    });

    let api_routes = Router::new()
        // Import; raise axum's default body cap so the handler's own size
        // check is the one that decides
        .route(
            "/import",
            post(handlers::import_csv).layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE)),
        )
        // Income analysis
        .route("/income", get(handlers::get_income))
        .route("/income/refresh", post(handlers::refresh_income))
        .route("/performance", get(handlers::get_performance))
        .route("/tips", get(handlers::get_tips))
        // Sync
        .route("/sync", post(handlers::run_sync))
        // Linked accounts
        .route("/accounts", get(handlers::list_accounts))
        .route("/accounts/link", post(handlers::link_account))
        .route("/accounts/:id/relink", post(handlers::relink_account))
        .route("/accounts/:id", delete(handlers::unlink_account))
        // Profile
        .route(
            "/profile",
            get(handlers::get_profile).put(handlers::update_profile),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Build CORS layer
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    } else {
        // Allow specified origins
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    };

    // Security headers; this server is API-only, so the CSP allows nothing
    let csp_value = HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'");

    Router::new()
        // Public surface: liveness, aggregator webhooks, external cron
        .route("/health", get(health))
        .route("/webhooks/feed", post(handlers::feed_webhook))
        .route("/jobs/weekly-report", post(handlers::weekly_report_job))
        .nest("/api", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            csp_value,
        ))
}

/// Start the server
pub async fn serve(db: Database, host: &str, port: u16) -> anyhow::Result<()> {
    serve_with_config(db, host, port, ServerConfig::from_env()).await
}

/// Start the server with custom configuration
pub async fn serve_with_config(
    db: Database,
    host: &str,
    port: u16,
    config: ServerConfig,
) -> anyhow::Result<()> {
    if !config.require_auth {
        warn!("⚠️  Authentication disabled - do not expose to network!");
    }
    if config.report_secret.is_none() {
        info!("ℹ️  Report job endpoint disabled (set GIGSENSE_REPORT_SECRET to enable)");
    }

    let feed = FeedClient::from_env();
    match &feed {
        Some(client) => info!("Bank feed configured: {}", client.host()),
        None => info!("ℹ️  Bank feed not configured (set GIGSENSE_FEED_HOST to enable sync)"),
    }

    let mailer = MailClient::from_env();
    if mailer.is_some() {
        info!("Mail delivery configured");
    } else {
        info!("ℹ️  Mail delivery not configured (set GIGSENSE_MAIL_HOST to enable weekly reports)");
    }

    // Start the in-process report scheduler if configured
    if let Some(schedule) = ReportScheduleConfig::from_env() {
        match &mailer {
            Some(mail) => start_report_scheduler(db.clone(), mail.clone(), schedule),
            None => warn!(
                "⚠️  GIGSENSE_REPORT_INTERVAL_HOURS is set but mail delivery is not configured; \
                 scheduler disabled"
            ),
        }
    }

    let app = create_router_with_clients(db, config, feed, mailer);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn unauthorized(msg: &str) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn not_found(msg: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn internal(msg: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn service_unavailable(msg: &str) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: msg.to_string(),
            internal: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            // Keep full error for logging
            internal: Some(err),
        }
    }
}
