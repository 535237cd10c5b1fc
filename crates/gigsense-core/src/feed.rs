//! Bank aggregator feed client
//!
//! Pull-model delta feed: each call takes an access token plus the account's
//! resume cursor and returns one page of adds/modifies/removes with the next
//! cursor. Callers loop while `has_more` is set.
//!
//! # Architecture
//!
//! - `BankFeed` trait: the sync-page interface the reconciler depends on
//! - `FeedClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backends: `HttpFeed` (real aggregator), `MockFeed` (canned pages for tests)
//!
//! # Configuration
//!
//! Environment variables:
//! - `GIGSENSE_FEED_HOST`: aggregator base URL (required)
//! - `GIGSENSE_FEED_CLIENT_ID`: API client id (required)
//! - `GIGSENSE_FEED_SECRET`: API secret (required)

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{NewTransaction, TransactionSource};

/// One transaction delivered by the feed, in local sign convention
/// (positive = money in)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedTransaction {
    pub transaction_id: String,
    pub account_id: String,
    pub date: NaiveDate,
    pub datetime: Option<NaiveDateTime>,
    pub name: String,
    pub merchant_name: Option<String>,
    pub category: Option<String>,
    pub amount: f64,
    pub pending: bool,
}

impl FeedTransaction {
    pub fn to_new_transaction(&self) -> NewTransaction {
        NewTransaction {
            external_id: self.transaction_id.clone(),
            date: self.date,
            posted_at: self.datetime,
            description: self.name.clone(),
            amount: self.amount,
            merchant_name: self.merchant_name.clone(),
            category: self.category.clone(),
            pending: self.pending,
            source: TransactionSource::Feed,
        }
    }
}

/// A removal notice: only the identifier is supplied
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemovedTransaction {
    pub transaction_id: String,
}

/// One page of the delta feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncPage {
    pub added: Vec<FeedTransaction>,
    pub modified: Vec<FeedTransaction>,
    pub removed: Vec<RemovedTransaction>,
    pub next_cursor: String,
    pub has_more: bool,
}

impl SyncPage {
    /// A page with no changes, used when staging mock feeds
    pub fn empty(next_cursor: &str, has_more: bool) -> Self {
        Self {
            added: Vec::new(),
            modified: Vec::new(),
            removed: Vec::new(),
            next_cursor: next_cursor.to_string(),
            has_more,
        }
    }
}

/// Trait defining the feed interface
///
/// Implementations must be Send + Sync so the reconciler can fan out one
/// task per account.
#[async_trait]
pub trait BankFeed: Send + Sync {
    /// Fetch one page of transaction deltas for an access token,
    /// starting from `cursor` (None = beginning of history)
    async fn sync_page(&self, access_token: &str, cursor: Option<&str>) -> Result<SyncPage>;

    /// Feed host (for logging)
    fn host(&self) -> &str;
}

/// Concrete feed client enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
#[derive(Clone)]
pub enum FeedClient {
    /// Real aggregator over HTTP
    Http(HttpFeed),
    /// Canned pages for testing
    Mock(MockFeed),
}

impl FeedClient {
    /// Create a feed client from environment variables.
    ///
    /// Returns None when the aggregator credentials are not configured,
    /// which disables sync but leaves CSV import working.
    pub fn from_env() -> Option<Self> {
        HttpFeed::from_env().map(FeedClient::Http)
    }

    /// Create an HTTP client directly
    pub fn http(host: &str, client_id: &str, secret: &str) -> Self {
        FeedClient::Http(HttpFeed::new(host, client_id, secret))
    }

    /// Wrap a mock feed for testing. MockFeed clones share state, so the
    /// caller can keep one handle for staging and inspection.
    pub fn mock(feed: MockFeed) -> Self {
        FeedClient::Mock(feed)
    }
}

#[async_trait]
impl BankFeed for FeedClient {
    async fn sync_page(&self, access_token: &str, cursor: Option<&str>) -> Result<SyncPage> {
        match self {
            FeedClient::Http(f) => f.sync_page(access_token, cursor).await,
            FeedClient::Mock(f) => f.sync_page(access_token, cursor).await,
        }
    }

    fn host(&self) -> &str {
        match self {
            FeedClient::Http(f) => f.host(),
            FeedClient::Mock(f) => f.host(),
        }
    }
}

/// HTTP feed backend
///
/// Talks to the aggregator's `/transactions/sync` endpoint. The wire format
/// signs amounts outflow-positive; this backend flips them to the local
/// inflow-positive convention so nothing downstream has to care.
pub struct HttpFeed {
    http_client: Client,
    base_url: String,
    client_id: String,
    secret: String,
}

impl Clone for HttpFeed {
    fn clone(&self) -> Self {
        Self {
            http_client: self.http_client.clone(),
            base_url: self.base_url.clone(),
            client_id: self.client_id.clone(),
            secret: self.secret.clone(),
        }
    }
}

impl HttpFeed {
    pub fn new(base_url: &str, client_id: &str, secret: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client_id: client_id.to_string(),
            secret: secret.to_string(),
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("GIGSENSE_FEED_HOST").ok()?;
        let client_id = std::env::var("GIGSENSE_FEED_CLIENT_ID").ok()?;
        let secret = std::env::var("GIGSENSE_FEED_SECRET").ok()?;
        Some(Self::new(&host, &client_id, &secret))
    }
}

/// Request to the aggregator sync endpoint
#[derive(Debug, Serialize)]
struct SyncRequest<'a> {
    client_id: &'a str,
    secret: &'a str,
    access_token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    cursor: Option<&'a str>,
}

/// Transaction as the aggregator sends it (outflow-positive amounts)
#[derive(Debug, Deserialize)]
struct WireTransaction {
    transaction_id: String,
    account_id: String,
    date: NaiveDate,
    datetime: Option<DateTime<Utc>>,
    name: String,
    merchant_name: Option<String>,
    category: Option<String>,
    amount: f64,
    #[serde(default)]
    pending: bool,
}

impl WireTransaction {
    fn into_feed_transaction(self) -> FeedTransaction {
        FeedTransaction {
            transaction_id: self.transaction_id,
            account_id: self.account_id,
            date: self.date,
            datetime: self.datetime.map(|dt| dt.naive_utc()),
            name: self.name,
            merchant_name: self.merchant_name,
            category: self.category,
            // aggregator signs outflows positive; local convention is inflow-positive
            amount: -self.amount,
            pending: self.pending,
        }
    }
}

/// Response from the aggregator sync endpoint
#[derive(Debug, Deserialize)]
struct WireSyncResponse {
    added: Vec<WireTransaction>,
    modified: Vec<WireTransaction>,
    removed: Vec<RemovedTransaction>,
    next_cursor: String,
    has_more: bool,
}

#[async_trait]
impl BankFeed for HttpFeed {
    async fn sync_page(&self, access_token: &str, cursor: Option<&str>) -> Result<SyncPage> {
        let request = SyncRequest {
            client_id: &self.client_id,
            secret: &self.secret,
            access_token,
            cursor,
        };

        let response = self
            .http_client
            .post(format!("{}/transactions/sync", self.base_url))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Feed(format!(
                "sync request failed with status {}",
                response.status()
            )));
        }

        let wire: WireSyncResponse = response.json().await?;
        debug!(
            "Feed page: {} added, {} modified, {} removed, has_more={}",
            wire.added.len(),
            wire.modified.len(),
            wire.removed.len(),
            wire.has_more
        );

        Ok(SyncPage {
            added: wire
                .added
                .into_iter()
                .map(WireTransaction::into_feed_transaction)
                .collect(),
            modified: wire
                .modified
                .into_iter()
                .map(WireTransaction::into_feed_transaction)
                .collect(),
            removed: wire.removed,
            next_cursor: wire.next_cursor,
            has_more: wire.has_more,
        })
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}

type MockKey = (Option<String>, String);

#[derive(Default)]
struct MockFeedState {
    /// Pages keyed by (access token, cursor); a None token matches any
    /// request, the empty cursor is the start of history
    pages: HashMap<MockKey, SyncPage>,
    /// Keys at which the next request fails
    errors: HashMap<MockKey, String>,
    /// Cursor of every request received, in order
    requests: Vec<Option<String>>,
}

/// Mock feed backend for testing
///
/// Pages are staged per cursor, optionally scoped to one access token, so
/// multi-page loops, multi-account runs, and mid-run failures replay
/// deterministically without a server.
#[derive(Clone, Default)]
pub struct MockFeed {
    state: Arc<Mutex<MockFeedState>>,
}

impl MockFeed {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(token: Option<&str>, cursor: Option<&str>) -> MockKey {
        (
            token.map(|t| t.to_string()),
            cursor.unwrap_or("").to_string(),
        )
    }

    fn locked(&self) -> std::sync::MutexGuard<'_, MockFeedState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Stage the page returned when a request arrives with `cursor`,
    /// whatever its token
    pub fn stage_page(&self, cursor: Option<&str>, page: SyncPage) {
        self.locked().pages.insert(Self::key(None, cursor), page);
    }

    /// Stage a page only for requests carrying a specific access token
    pub fn stage_page_for_token(&self, token: &str, cursor: Option<&str>, page: SyncPage) {
        self.locked()
            .pages
            .insert(Self::key(Some(token), cursor), page);
    }

    /// Stage a failure for requests arriving with `cursor`
    pub fn stage_error(&self, cursor: Option<&str>, message: &str) {
        self.locked()
            .errors
            .insert(Self::key(None, cursor), message.to_string());
    }

    /// Stage a failure only for requests carrying a specific access token
    pub fn stage_error_for_token(&self, token: &str, cursor: Option<&str>, message: &str) {
        self.locked()
            .errors
            .insert(Self::key(Some(token), cursor), message.to_string());
    }

    /// Cursors of every request this mock has served, in order
    pub fn requests(&self) -> Vec<Option<String>> {
        self.locked().requests.clone()
    }
}

#[async_trait]
impl BankFeed for MockFeed {
    async fn sync_page(&self, access_token: &str, cursor: Option<&str>) -> Result<SyncPage> {
        let mut state = self.locked();
        state.requests.push(cursor.map(|c| c.to_string()));

        let scoped = Self::key(Some(access_token), cursor);
        let wildcard = Self::key(None, cursor);

        if let Some(message) = state.errors.get(&scoped).or(state.errors.get(&wildcard)) {
            return Err(Error::Feed(message.clone()));
        }

        state
            .pages
            .get(&scoped)
            .or(state.pages.get(&wildcard))
            .cloned()
            .ok_or_else(|| Error::Feed(format!("no page staged for cursor {:?}", cursor)))
    }

    fn host(&self) -> &str {
        "mock://feed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_replays_staged_pages() {
        let feed = MockFeed::new();
        feed.stage_page(None, SyncPage::empty("c1", true));
        feed.stage_page(Some("c1"), SyncPage::empty("c2", false));

        let first = feed.sync_page("token", None).await.unwrap();
        assert_eq!(first.next_cursor, "c1");
        assert!(first.has_more);

        let second = feed.sync_page("token", Some("c1")).await.unwrap();
        assert_eq!(second.next_cursor, "c2");
        assert!(!second.has_more);

        assert_eq!(feed.requests(), vec![None, Some("c1".to_string())]);
    }

    #[tokio::test]
    async fn test_mock_injected_error() {
        let feed = MockFeed::new();
        feed.stage_error(Some("c1"), "aggregator down");

        let err = feed.sync_page("token", Some("c1")).await.unwrap_err();
        assert!(matches!(err, Error::Feed(_)));
    }

    #[tokio::test]
    async fn test_mock_unstaged_cursor_is_an_error() {
        let feed = MockFeed::new();
        assert!(feed.sync_page("token", Some("nowhere")).await.is_err());
    }

    #[test]
    fn test_wire_amounts_flip_to_inflow_positive() {
        let wire = WireTransaction {
            transaction_id: "t1".to_string(),
            account_id: "a1".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            datetime: None,
            name: "UBER DRIVER PARTNER PAYMENT".to_string(),
            merchant_name: Some("Uber".to_string()),
            category: None,
            // a payout is an inflow, so the aggregator signs it negative
            amount: -450.0,
            pending: false,
        };

        let local = wire.into_feed_transaction();
        assert_eq!(local.amount, 450.0);
    }

    #[test]
    fn test_feed_transaction_conversion() {
        let feed_txn = FeedTransaction {
            transaction_id: "t1".to_string(),
            account_id: "a1".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            datetime: None,
            name: "LYFT PAYOUT".to_string(),
            merchant_name: Some("Lyft".to_string()),
            category: Some("Transfer".to_string()),
            amount: 300.0,
            pending: false,
        };

        let new_txn = feed_txn.to_new_transaction();
        assert_eq!(new_txn.external_id, "t1");
        assert_eq!(new_txn.amount, 300.0);
        assert_eq!(new_txn.source, TransactionSource::Feed);
        assert_eq!(new_txn.description, "LYFT PAYOUT");
    }

    #[test]
    fn test_client_hosts() {
        let mock = FeedClient::mock(MockFeed::new());
        assert_eq!(mock.host(), "mock://feed");

        let http = FeedClient::http("https://feed.example.com/", "id", "secret");
        assert_eq!(http.host(), "https://feed.example.com");
    }

    #[tokio::test]
    async fn test_mock_token_scoped_pages() {
        let feed = MockFeed::new();
        feed.stage_page_for_token("tok-a", None, SyncPage::empty("a1", false));
        feed.stage_page_for_token("tok-b", None, SyncPage::empty("b1", false));
        feed.stage_error_for_token("tok-c", None, "login required");

        let page = feed.sync_page("tok-a", None).await.unwrap();
        assert_eq!(page.next_cursor, "a1");

        let page = feed.sync_page("tok-b", None).await.unwrap();
        assert_eq!(page.next_cursor, "b1");

        assert!(feed.sync_page("tok-c", None).await.is_err());
    }

    #[tokio::test]
    async fn test_mock_token_page_beats_wildcard() {
        let feed = MockFeed::new();
        feed.stage_page(None, SyncPage::empty("any", false));
        feed.stage_page_for_token("tok-a", None, SyncPage::empty("scoped", false));

        let page = feed.sync_page("tok-a", None).await.unwrap();
        assert_eq!(page.next_cursor, "scoped");

        let page = feed.sync_page("tok-other", None).await.unwrap();
        assert_eq!(page.next_cursor, "any");
    }
}
