//! GigSense Core Library
//!
//! Shared functionality for the GigSense gig-income tool:
//! - Database access and migrations (SQLCipher at rest)
//! - CSV statement import with dedup hashing
//! - Platform classification from transaction descriptors
//! - Income aggregation, stability scoring, and per-platform performance
//! - Actionable tip generation
//! - Bank feed sync with resumable per-account cursors
//! - Weekly earnings report delivery

pub mod analysis;
pub mod db;
pub mod error;
pub mod feed;
pub mod import;
pub mod models;
pub mod notify;
pub mod platforms;
pub mod report;
pub mod sync;
pub mod tips;

/// Test utilities including a canned aggregator feed server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use analysis::{analyze_performance, assess, build_snapshot, stability_score};
pub use db::{Database, SyncCounts};
pub use error::{Error, Result};
pub use feed::{
    BankFeed, FeedClient, FeedTransaction, HttpFeed, MockFeed, RemovedTransaction, SyncPage,
};
pub use import::{parse_csv, CsvBatch};
pub use models::{
    AccountStatus, IncomeItem, IncomeSnapshot, LinkedAccount, NewTransaction, PerformanceReport,
    PlatformIncome, PlatformMetrics, StabilityRating, StabilityReport, Tip, TipCategory,
    TipPriority, Transaction, TransactionSource, TrendDirection, UserProfile,
};
pub use notify::{HttpMailer, MailClient, Mailer, MockMailer, SentMail};
pub use platforms::{classify, OTHER_PLATFORM};
pub use report::{run_weekly_reports, ReportRunSummary, WeeklySummary};
pub use sync::{sync_account, sync_item, sync_user, AccountSyncOutcome, SyncSummary};
pub use tips::{generate_tips, TipContext, MAX_TIPS};
