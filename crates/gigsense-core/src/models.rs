//! Domain models for GigSense

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// A gig worker's profile, keyed by user id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub user_id: String,
    pub email: Option<String>,
    /// Home market for local benchmark tips (e.g. "Austin")
    pub city: Option<String>,
    /// Opted in to the weekly earnings email
    pub weekly_report: bool,
    /// Tax documents are on file, enabling the quarterly set-aside estimate
    pub has_tax_profile: bool,
    /// Enrolled in a health/benefits plan
    pub has_benefits: bool,
    pub created_at: DateTime<Utc>,
}

/// A bank account connected through the data aggregator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedAccount {
    pub id: i64,
    pub user_id: String,
    /// Aggregator item identifier; webhooks are routed by this key
    pub item_id: String,
    /// Aggregator account identifier, unique per user
    pub account_id: String,
    pub institution: Option<String>,
    /// Access token for the aggregator feed; never serialized out
    #[serde(skip_serializing)]
    pub access_token: String,
    /// Resume token for the delta feed; None = fetch from the beginning
    pub sync_cursor: Option<String>,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
}

/// Linked account health, driven by aggregator webhooks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    #[default]
    Active,
    /// The aggregator reported an item error; sync will fail until re-link
    Error,
    /// The access token is about to expire; user should re-link soon
    PendingExpiration,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Error => "error",
            Self::PendingExpiration => "pending_expiration",
        }
    }
}

impl std::str::FromStr for AccountStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "error" => Ok(Self::Error),
            "pending_expiration" => Ok(Self::PendingExpiration),
            _ => Err(format!("Unknown account status: {}", s)),
        }
    }
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Transaction source - how it was created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransactionSource {
    /// Imported from a bank statement CSV
    #[default]
    Csv,
    /// Delivered by the aggregator sync feed
    Feed,
}

impl TransactionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Feed => "feed",
        }
    }
}

impl std::str::FromStr for TransactionSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "feed" => Ok(Self::Feed),
            _ => Err(format!("Unknown transaction source: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A financial transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    /// Feed transaction id for synced rows, content hash for CSV rows.
    /// Unique per user; the reconciler's upsert/modify/remove key.
    pub external_id: String,
    pub user_id: String,
    /// Owning linked account; None for CSV imports
    pub account_id: Option<i64>,
    pub date: NaiveDate,
    /// Posted timestamp when the feed supplies time-of-day
    pub posted_at: Option<NaiveDateTime>,
    pub description: String,
    /// Positive = inflow, negative = outflow
    pub amount: f64,
    pub merchant_name: Option<String>,
    pub category: Option<String>,
    pub pending: bool,
    pub source: TransactionSource,
    pub created_at: DateTime<Utc>,
}

/// A new transaction before DB insertion
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub external_id: String,
    pub date: NaiveDate,
    pub posted_at: Option<NaiveDateTime>,
    pub description: String,
    pub amount: f64,
    pub merchant_name: Option<String>,
    pub category: Option<String>,
    pub pending: bool,
    pub source: TransactionSource,
}

/// One classified income event: a positive transaction tagged with its platform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomeItem {
    pub date: NaiveDate,
    pub amount: f64,
    pub platform: String,
}

/// Per-platform income rollup inside a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformIncome {
    pub platform: String,
    pub total: f64,
    pub count: usize,
    pub items: Vec<IncomeItem>,
}

/// Three-tier stability rating, cut at scores 50 and 75
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StabilityRating {
    Stable,
    Moderate,
    Variable,
}

impl StabilityRating {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stable => "stable",
            Self::Moderate => "moderate",
            Self::Variable => "variable",
        }
    }
}

impl std::str::FromStr for StabilityRating {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stable" => Ok(Self::Stable),
            "moderate" => Ok(Self::Moderate),
            "variable" => Ok(Self::Variable),
            _ => Err(format!("Unknown stability rating: {}", s)),
        }
    }
}

impl std::fmt::Display for StabilityRating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Stability block of an income snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StabilityReport {
    /// 0-100, higher = more uniform weekly income
    pub score: f64,
    pub rating: StabilityRating,
    pub weekly_average: f64,
    /// Coefficient of variation over weekly totals, as a percentage
    pub variability_pct: f64,
}

/// The materialized result of income analysis for one user.
///
/// Replaced wholesale on each recomputation; `total_income` always equals
/// the sum of `by_platform` totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomeSnapshot {
    pub user_id: String,
    pub total_income: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub by_platform: Vec<PlatformIncome>,
    pub stability: StabilityReport,
    pub items: Vec<IncomeItem>,
    pub computed_at: DateTime<Utc>,
}

/// Income trend over the last 14 days vs the 14 before that
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Stable => "stable",
        }
    }
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Derived per-platform analytics; recomputed on every request, never stored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformMetrics {
    pub platform: String,
    pub total_earnings: f64,
    pub avg_per_transaction: f64,
    pub transaction_count: usize,
    /// Stability-style score over individual transaction amounts
    pub consistency_score: f64,
    pub trend: TrendDirection,
    pub trend_pct: f64,
    /// Top 3 weekday names by summed earnings
    pub best_days: Vec<String>,
    /// Top 3 hours by summed earnings; empty when the feed gave no timestamps
    pub best_hours: Vec<String>,
}

/// Cross-platform comparison, ordered by total earnings descending
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub platforms: Vec<PlatformMetrics>,
    pub top_earner: Option<String>,
    pub most_consistent: Option<String>,
    pub best_per_trip: Option<String>,
}

/// Tip priority; the final list is stably sorted high -> medium -> low
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TipPriority {
    High,
    Medium,
    Low,
}

impl TipPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// Sort rank; lower sorts first
    pub fn rank(&self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }
}

impl std::fmt::Display for TipPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What part of gig life a tip speaks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TipCategory {
    Earnings,
    Taxes,
    Benefits,
    Local,
    Milestone,
    Stability,
    Deductions,
}

impl TipCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Earnings => "earnings",
            Self::Taxes => "taxes",
            Self::Benefits => "benefits",
            Self::Local => "local",
            Self::Milestone => "milestone",
            Self::Stability => "stability",
            Self::Deductions => "deductions",
        }
    }
}

impl std::fmt::Display for TipCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One actionable recommendation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tip {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: TipCategory,
    pub priority: TipPriority,
    pub action: Option<String>,
    pub link: Option<String>,
}
