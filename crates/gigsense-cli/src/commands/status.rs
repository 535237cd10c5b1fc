//! Database status command

use std::path::Path;

use anyhow::Result;

use super::open_db;

pub fn cmd_status(db_path: &Path, user_id: &str, no_encrypt: bool) -> Result<()> {
    use gigsense_core::db::DB_KEY_ENV;
    use std::fs;

    println!();
    println!("📊 GigSense Status");
    println!("   ─────────────────────────────────────────────────────────────");

    // Database path
    println!("   Database: {}", db_path.display());

    // Check if database file exists and get size
    if db_path.exists() {
        if let Ok(metadata) = fs::metadata(db_path) {
            let size_kb = metadata.len() as f64 / 1024.0;
            if size_kb < 1024.0 {
                println!("   Size: {:.1} KB", size_kb);
            } else {
                println!("   Size: {:.1} MB", size_kb / 1024.0);
            }
        }
    } else {
        println!("   Size: (database not initialized)");
    }

    // Check encryption status
    let has_key = std::env::var(DB_KEY_ENV).is_ok();
    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else if has_key {
        println!("   🔒 Encryption: ENABLED ({}=***)", DB_KEY_ENV);
    } else {
        println!("   ❌ Encryption: REQUIRED but {} not set", DB_KEY_ENV);
    }

    // Try to open the database and show stats
    if db_path.exists() {
        match open_db(db_path, no_encrypt) {
            Ok(db) => {
                println!();
                println!("   User: {}", user_id);
                if let Ok(accounts) = db.list_linked_accounts(user_id) {
                    println!("   Linked accounts: {}", accounts.len());
                }
                if let Ok(count) = db.count_transactions(user_id) {
                    println!("   Transactions: {}", count);
                }
                match db.get_snapshot(user_id) {
                    Ok(Some(snapshot)) => {
                        println!(
                            "   Last analysis: {} (${:.2} total)",
                            snapshot.computed_at.format("%Y-%m-%d %H:%M"),
                            snapshot.total_income
                        );
                    }
                    Ok(None) => {
                        println!("   Last analysis: (none - run 'gigsense analyze')");
                    }
                    Err(_) => {}
                }
            }
            Err(e) => {
                println!();
                println!("   ❌ Error opening database: {}", e);
                if !no_encrypt && !has_key {
                    println!("      Set {} or use --no-encrypt", DB_KEY_ENV);
                } else if has_key {
                    println!("      (Check if {} is correct)", DB_KEY_ENV);
                }
            }
        }
    }

    println!();
    Ok(())
}
