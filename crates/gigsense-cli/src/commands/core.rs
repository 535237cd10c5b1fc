//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `resolve_db_path` / `open_db` - Shared database utilities
//! - `cmd_init` - Initialize the database
//! - `cmd_sync` - Pull the bank feed for all linked accounts

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use gigsense_core::analysis::build_snapshot;
use gigsense_core::db::Database;
use gigsense_core::feed::FeedClient;
use gigsense_core::sync::sync_user;

/// Resolve the database path: an explicit --db wins, otherwise the
/// platform data directory (~/.local/share/gigsense/gigsense.db on Linux)
pub fn resolve_db_path(arg: Option<PathBuf>) -> PathBuf {
    match arg {
        Some(path) => path,
        None => match dirs::data_dir() {
            Some(dir) => dir.join("gigsense").join("gigsense.db"),
            None => PathBuf::from("gigsense.db"),
        },
    }
}

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    let path_str = db_path
        .to_str()
        .context("Database path must be valid UTF-8")?;
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

pub fn cmd_init(db_path: &Path, user_id: &str, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let db = open_db(db_path, no_encrypt)?;

    db.ensure_profile(user_id, None)
        .context("Failed to create profile")?;
    println!("   Created profile for '{}'", user_id);

    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else {
        println!("   🔒 Encryption: ENABLED");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Import a statement: gigsense import --file statement.csv");
    println!("  2. See your numbers: gigsense analyze");

    Ok(())
}

pub async fn cmd_sync(db: &Database, user_id: &str, feed: Option<FeedClient>) -> Result<()> {
    let Some(feed) = feed else {
        anyhow::bail!(
            "Bank feed is not configured.\n   \
             Set GIGSENSE_FEED_HOST, GIGSENSE_FEED_CLIENT_ID, and GIGSENSE_FEED_SECRET,\n   \
             or import statements with: gigsense import --file statement.csv"
        );
    };

    let accounts = db.list_linked_accounts(user_id)?;
    if accounts.is_empty() {
        println!("No linked accounts. Link one with:");
        println!("  gigsense accounts link --item <item> --account <account> --token <token>");
        return Ok(());
    }

    println!("🔄 Syncing {} account(s)...", accounts.len());

    let summary = sync_user(db, &feed, user_id, None).await?;

    println!("✅ Sync complete");
    println!("   Added: {}", summary.totals.added);
    println!("   Modified: {}", summary.totals.modified);
    println!("   Removed: {}", summary.totals.removed);

    // Reconciled rows feed straight into a fresh snapshot, same as import
    if !summary.totals.is_empty() {
        let transactions = db.transactions_for_user(user_id)?;
        let snapshot = build_snapshot(user_id, &transactions, Utc::now());
        db.save_snapshot(&snapshot)?;
    }

    let failed = summary.failed();
    if failed > 0 {
        println!();
        println!("⚠️  {} account(s) failed:", failed);
        for outcome in summary.accounts.iter().filter(|a| a.error.is_some()) {
            if let Some(ref err) = outcome.error {
                println!("   {} - {}", outcome.account_ref, err);
            }
        }
        println!("   Their cursors are unchanged; the next sync will resume.");
    }

    Ok(())
}
