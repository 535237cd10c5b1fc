//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod accounts;
pub mod import;
pub mod income;
pub mod profile;
pub mod reports;
pub mod sync;
pub mod webhooks;

// Re-export all handlers for use in router
pub use accounts::*;
pub use import::*;
pub use income::*;
pub use profile::*;
pub use reports::*;
pub use sync::*;
pub use webhooks::*;
