//! Bank feed reconciliation
//!
//! Pulls the incremental transaction feed for each linked account and
//! applies it to local storage. Pages commit atomically with the cursor
//! they produce, so an interrupted run always resumes from the last
//! committed page instead of starting over.

use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::db::{Database, SyncCounts};
use crate::error::Result;
use crate::feed::{BankFeed, FeedClient};
use crate::models::{AccountStatus, LinkedAccount};

/// How many accounts sync at once in a single run
pub const MAX_CONCURRENT_ACCOUNTS: usize = 4;

/// Page cap per account per run, in case the feed never stops
/// reporting more
pub const MAX_PAGES_PER_ACCOUNT: usize = 100;

/// What happened to one account during a sync run
#[derive(Debug, Clone, serde::Serialize)]
pub struct AccountSyncOutcome {
    /// Local row id of the linked account
    pub account_id: i64,
    /// Aggregator-side account identifier
    pub account_ref: String,
    pub pages: usize,
    pub counts: SyncCounts,
    /// Set when the account's cycle aborted; the cursor keeps its last
    /// committed value so the next run resumes
    pub error: Option<String>,
}

/// Combined result of syncing all of a user's accounts
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct SyncSummary {
    pub accounts: Vec<AccountSyncOutcome>,
    pub totals: SyncCounts,
}

impl SyncSummary {
    pub fn failed(&self) -> usize {
        self.accounts.iter().filter(|a| a.error.is_some()).count()
    }

    fn push(&mut self, outcome: AccountSyncOutcome) {
        if outcome.error.is_none() {
            self.totals.merge(outcome.counts);
        }
        self.accounts.push(outcome);
    }
}

/// Pull and apply the delta feed for one account.
///
/// Sequential within the account: each page's cursor feeds the next fetch.
/// The optional deadline is checked between pages only, never mid-page, so
/// a cursor can never commit without the page it belongs to.
pub async fn sync_account(
    db: &Database,
    feed: &FeedClient,
    account: &LinkedAccount,
    deadline: Option<Instant>,
) -> Result<(SyncCounts, usize)> {
    let mut counts = SyncCounts::default();
    let mut cursor = account.sync_cursor.clone();
    let mut pages = 0;

    loop {
        if pages >= MAX_PAGES_PER_ACCOUNT {
            warn!(
                account_id = account.id,
                pages, "Feed still reports more pages, stopping this run"
            );
            break;
        }

        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                info!(
                    account_id = account.id,
                    pages, "Sync deadline reached, will resume next run"
                );
                break;
            }
        }

        let page = feed
            .sync_page(&account.access_token, cursor.as_deref())
            .await?;
        let has_more = page.has_more;
        let next_cursor = page.next_cursor.clone();

        counts.merge(db.apply_sync_page(account, &page)?);
        pages += 1;
        cursor = Some(next_cursor);

        if !has_more {
            break;
        }
    }

    Ok((counts, pages))
}

/// Sync every linked account for a user, isolating failures per account.
///
/// Accounts run as parallel tasks with a bounded fan-out; one account's
/// feed error shows up in its own outcome and leaves the others untouched.
pub async fn sync_user(
    db: &Database,
    feed: &FeedClient,
    user_id: &str,
    deadline: Option<Instant>,
) -> Result<SyncSummary> {
    let accounts = db.list_linked_accounts(user_id)?;
    sync_accounts(db, feed, accounts, deadline).await
}

/// Sync the accounts attached to one aggregator item. Webhook-triggered
/// syncs arrive keyed by item, not by user.
pub async fn sync_item(
    db: &Database,
    feed: &FeedClient,
    item_id: &str,
    deadline: Option<Instant>,
) -> Result<SyncSummary> {
    let accounts = db.list_accounts_for_item(item_id)?;
    sync_accounts(db, feed, accounts, deadline).await
}

async fn sync_accounts(
    db: &Database,
    feed: &FeedClient,
    accounts: Vec<LinkedAccount>,
    deadline: Option<Instant>,
) -> Result<SyncSummary> {
    let mut summary = SyncSummary::default();
    let mut tasks: JoinSet<AccountSyncOutcome> = JoinSet::new();

    for account in accounts {
        // Errored items need a re-link before the feed will talk to us
        if account.status == AccountStatus::Error {
            summary.push(AccountSyncOutcome {
                account_id: account.id,
                account_ref: account.account_id.clone(),
                pages: 0,
                counts: SyncCounts::default(),
                error: Some("account needs re-link before syncing".into()),
            });
            continue;
        }

        while tasks.len() >= MAX_CONCURRENT_ACCOUNTS {
            if let Some(joined) = tasks.join_next().await {
                summary.push(resolve_task(joined));
            }
        }

        let db = db.clone();
        let feed = feed.clone();
        tasks.spawn(async move {
            let account_ref = account.account_id.clone();
            match sync_account(&db, &feed, &account, deadline).await {
                Ok((counts, pages)) => AccountSyncOutcome {
                    account_id: account.id,
                    account_ref,
                    pages,
                    counts,
                    error: None,
                },
                Err(e) => {
                    error!(account_id = account.id, "Account sync failed: {}", e);
                    AccountSyncOutcome {
                        account_id: account.id,
                        account_ref,
                        pages: 0,
                        counts: SyncCounts::default(),
                        error: Some(e.to_string()),
                    }
                }
            }
        });
    }

    while let Some(joined) = tasks.join_next().await {
        summary.push(resolve_task(joined));
    }

    summary.accounts.sort_by_key(|outcome| outcome.account_id);

    info!(
        accounts = summary.accounts.len(),
        failed = summary.failed(),
        added = summary.totals.added,
        modified = summary.totals.modified,
        removed = summary.totals.removed,
        "Sync run finished"
    );

    Ok(summary)
}

fn resolve_task(
    joined: std::result::Result<AccountSyncOutcome, tokio::task::JoinError>,
) -> AccountSyncOutcome {
    match joined {
        Ok(outcome) => outcome,
        Err(e) => {
            // A panicked task still gets an isolated outcome row
            error!("Sync task panicked: {}", e);
            AccountSyncOutcome {
                account_id: -1,
                account_ref: String::new(),
                pages: 0,
                counts: SyncCounts::default(),
                error: Some(format!("sync task failed: {e}")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{FeedTransaction, MockFeed, SyncPage};

    fn feed_txn(id: &str, date: &str, amount: f64) -> FeedTransaction {
        FeedTransaction {
            transaction_id: id.into(),
            account_id: "acct-ext".into(),
            date: date.parse().unwrap(),
            datetime: None,
            name: "Uber payout".into(),
            merchant_name: Some("Uber".into()),
            category: None,
            amount,
            pending: false,
        }
    }

    fn page(ids: &[(&str, f64)], next_cursor: &str, has_more: bool) -> SyncPage {
        SyncPage {
            added: ids
                .iter()
                .map(|(id, amount)| feed_txn(id, "2024-06-03", *amount))
                .collect(),
            modified: vec![],
            removed: vec![],
            next_cursor: next_cursor.into(),
            has_more,
        }
    }

    #[tokio::test]
    async fn test_sync_account_single_page() {
        let db = Database::in_memory().unwrap();
        let account = db
            .link_account("user-1", "item-1", "acct-1", None, "tok")
            .unwrap();

        let mock = MockFeed::new();
        mock.stage_page(None, page(&[("t1", 450.0), ("t2", 320.0)], "cur-1", false));
        let feed = FeedClient::mock(mock);

        let (counts, pages) = sync_account(&db, &feed, &account, None).await.unwrap();
        assert_eq!(counts.added, 2);
        assert_eq!(pages, 1);

        let account = db.get_linked_account(account.id).unwrap().unwrap();
        assert_eq!(account.sync_cursor.as_deref(), Some("cur-1"));
    }

    #[tokio::test]
    async fn test_sync_account_follows_pages() {
        let db = Database::in_memory().unwrap();
        let account = db
            .link_account("user-1", "item-1", "acct-1", None, "tok")
            .unwrap();

        let mock = MockFeed::new();
        mock.stage_page(None, page(&[("t1", 450.0)], "cur-1", true));
        mock.stage_page(Some("cur-1"), page(&[("t2", 320.0)], "cur-2", true));
        mock.stage_page(Some("cur-2"), page(&[("t3", 150.0)], "cur-3", false));
        let feed = FeedClient::mock(mock);

        let (counts, pages) = sync_account(&db, &feed, &account, None).await.unwrap();
        assert_eq!(counts.added, 3);
        assert_eq!(pages, 3);

        let account = db.get_linked_account(account.id).unwrap().unwrap();
        assert_eq!(account.sync_cursor.as_deref(), Some("cur-3"));
        assert_eq!(db.count_transactions("user-1").unwrap(), 3);
    }

    #[tokio::test]
    async fn test_sync_account_resumes_from_stored_cursor() {
        let db = Database::in_memory().unwrap();
        let account = db
            .link_account("user-1", "item-1", "acct-1", None, "tok")
            .unwrap();

        let mock = MockFeed::new();
        mock.stage_page(None, page(&[("t1", 450.0)], "cur-1", false));
        let feed = FeedClient::mock(mock.clone());
        sync_account(&db, &feed, &account, None).await.unwrap();

        // Next run starts from cur-1, not the beginning
        mock.stage_page(Some("cur-1"), page(&[("t2", 320.0)], "cur-2", false));
        let account = db.get_linked_account(account.id).unwrap().unwrap();
        let (counts, _) = sync_account(&db, &feed, &account, None).await.unwrap();

        assert_eq!(counts.added, 1);
        assert_eq!(mock.requests(), vec![None, Some("cur-1".to_string())]);
    }

    #[tokio::test]
    async fn test_sync_account_error_mid_run_keeps_cursor() {
        let db = Database::in_memory().unwrap();
        let account = db
            .link_account("user-1", "item-1", "acct-1", None, "tok")
            .unwrap();

        let mock = MockFeed::new();
        mock.stage_page(None, page(&[("t1", 450.0)], "cur-1", true));
        mock.stage_error(Some("cur-1"), "aggregator 500");
        let feed = FeedClient::mock(mock);

        let result = sync_account(&db, &feed, &account, None).await;
        assert!(result.is_err());

        // First page committed with its cursor before the failure
        let account = db.get_linked_account(account.id).unwrap().unwrap();
        assert_eq!(account.sync_cursor.as_deref(), Some("cur-1"));
        assert_eq!(db.count_transactions("user-1").unwrap(), 1);
    }

    #[tokio::test]
    async fn test_sync_account_deadline_between_pages() {
        let db = Database::in_memory().unwrap();
        let account = db
            .link_account("user-1", "item-1", "acct-1", None, "tok")
            .unwrap();

        let mock = MockFeed::new();
        mock.stage_page(None, page(&[("t1", 450.0)], "cur-1", true));
        mock.stage_page(Some("cur-1"), page(&[("t2", 320.0)], "cur-2", false));
        let feed = FeedClient::mock(mock.clone());

        // Deadline already passed: the loop stops before fetching anything
        let deadline = Instant::now() - tokio::time::Duration::from_secs(1);
        let (counts, pages) = sync_account(&db, &feed, &account, Some(deadline))
            .await
            .unwrap();
        assert_eq!(counts.added, 0);
        assert_eq!(pages, 0);
        assert!(mock.requests().is_empty());

        // The stored cursor is untouched, so the next run picks it all up
        let account = db.get_linked_account(account.id).unwrap().unwrap();
        assert!(account.sync_cursor.is_none());
        let (counts, pages) = sync_account(&db, &feed, &account, None).await.unwrap();
        assert_eq!(counts.added, 2);
        assert_eq!(pages, 2);
    }

    #[tokio::test]
    async fn test_sync_user_isolates_account_failures() {
        let db = Database::in_memory().unwrap();
        db.link_account("user-1", "item-1", "acct-good", None, "tok-good")
            .unwrap();
        db.link_account("user-1", "item-1", "acct-bad", None, "tok-bad")
            .unwrap();

        let mock = MockFeed::new();
        // Both accounts start from None; route by token instead of cursor
        mock.stage_page_for_token("tok-good", None, page(&[("t1", 450.0)], "cur-1", false));
        mock.stage_error_for_token("tok-bad", None, "item login required");
        let feed = FeedClient::mock(mock);

        let summary = sync_user(&db, &feed, "user-1", None).await.unwrap();
        assert_eq!(summary.accounts.len(), 2);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.totals.added, 1);

        let good = summary
            .accounts
            .iter()
            .find(|a| a.account_ref == "acct-good")
            .unwrap();
        assert!(good.error.is_none());
        assert_eq!(good.counts.added, 1);

        let bad = summary
            .accounts
            .iter()
            .find(|a| a.account_ref == "acct-bad")
            .unwrap();
        assert!(bad.error.as_deref().unwrap().contains("item login required"));
    }

    #[tokio::test]
    async fn test_sync_user_skips_errored_accounts() {
        let db = Database::in_memory().unwrap();
        let account = db
            .link_account("user-1", "item-1", "acct-1", None, "tok")
            .unwrap();
        db.set_item_status("item-1", AccountStatus::Error).unwrap();

        let mock = MockFeed::new();
        let feed = FeedClient::mock(mock.clone());

        let summary = sync_user(&db, &feed, "user-1", None).await.unwrap();
        assert_eq!(summary.accounts.len(), 1);
        assert_eq!(summary.accounts[0].account_id, account.id);
        assert!(summary.accounts[0]
            .error
            .as_deref()
            .unwrap()
            .contains("re-link"));
        // No feed traffic for an account that cannot sync
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_sync_item_scopes_to_item_accounts() {
        let db = Database::in_memory().unwrap();
        db.link_account("user-1", "item-1", "acct-1", None, "tok-1")
            .unwrap();
        db.link_account("user-1", "item-2", "acct-2", None, "tok-2")
            .unwrap();

        let mock = MockFeed::new();
        mock.stage_page_for_token("tok-1", None, page(&[("t1", 450.0)], "cur-1", false));
        let feed = FeedClient::mock(mock.clone());

        let summary = sync_item(&db, &feed, "item-1", None).await.unwrap();
        assert_eq!(summary.accounts.len(), 1);
        assert_eq!(summary.accounts[0].account_ref, "acct-1");
        assert_eq!(mock.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_sync_user_no_accounts() {
        let db = Database::in_memory().unwrap();
        let feed = FeedClient::mock(MockFeed::new());

        let summary = sync_user(&db, &feed, "user-1", None).await.unwrap();
        assert!(summary.accounts.is_empty());
        assert_eq!(summary.totals, SyncCounts::default());
    }
}
