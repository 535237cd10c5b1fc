//! CSV statement import command

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use gigsense_core::analysis::build_snapshot;
use gigsense_core::import::parse_csv;

use super::open_db;

pub fn cmd_import(db_path: &Path, user_id: &str, file: &Path, no_encrypt: bool) -> Result<()> {
    let csv_file =
        File::open(file).with_context(|| format!("Failed to open file: {}", file.display()))?;

    println!("📥 Importing {}...", file.display());

    let db = open_db(db_path, no_encrypt)?;
    db.ensure_profile(user_id, None)?;

    let batch = parse_csv(csv_file)?;
    println!("   Found {} transactions", batch.transactions.len());

    let mut imported = 0;
    let mut skipped = 0;

    for tx in &batch.transactions {
        match db.insert_transaction(user_id, None, tx)? {
            Some(_) => imported += 1,
            None => skipped += 1,
        }
    }

    println!("✅ Import complete!");
    println!("   Imported: {}", imported);
    println!("   Skipped (duplicates): {}", skipped);
    if batch.skipped > 0 {
        println!("   Skipped (malformed rows): {}", batch.skipped);
    }

    // Refresh the snapshot so analyze/tips see the new data right away
    if imported > 0 {
        let transactions = db.transactions_for_user(user_id)?;
        let snapshot = build_snapshot(user_id, &transactions, Utc::now());
        db.save_snapshot(&snapshot)?;

        println!();
        println!(
            "📊 ${:.2} income across {} platform(s). Run 'gigsense analyze' for the breakdown.",
            snapshot.total_income,
            snapshot.by_platform.len()
        );
    }

    Ok(())
}
