//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `accounts` - Linked bank account commands (list, link, relink, unlink)
//! - `analyze` - Income snapshot, performance, and tips commands
//! - `core` - Core commands (init, sync) and shared utilities (open_db)
//! - `import` - CSV statement import command
//! - `profile` - User profile commands (show, set)
//! - `serve` - Web server command
//! - `status` - Database status command

pub mod accounts;
pub mod analyze;
pub mod core;
pub mod import;
pub mod profile;
pub mod serve;
pub mod status;

// Re-export command functions for main.rs
pub use accounts::*;
pub use analyze::*;
pub use core::*;
pub use import::*;
pub use profile::*;
pub use serve::*;
pub use status::*;
