//! Income analytics
//!
//! Pure computation over transaction history, no storage access:
//!
//! - **Aggregate** - classified income totals per platform with date window
//! - **Stability** - 0-100 score from weekly income variability
//! - **Performance** - per-platform trend, consistency, and hot-spots
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gigsense_core::analysis;
//!
//! let snapshot = analysis::build_snapshot("user-1", &transactions, Utc::now());
//! let report = analysis::analyze_performance(&transactions, Utc::now().date_naive());
//! ```

pub mod aggregate;
pub mod performance;
pub mod stability;

pub use aggregate::{build_snapshot, group_by_platform, week_span};
pub use performance::analyze_performance;
pub use stability::{assess, coefficient_of_variation, rating_for, stability_score};
