//! Linked bank account commands

use anyhow::Result;
use gigsense_core::db::Database;
use gigsense_core::models::AccountStatus;

pub fn cmd_accounts_list(db: &Database, user_id: &str) -> Result<()> {
    let accounts = db.list_linked_accounts(user_id)?;

    if accounts.is_empty() {
        println!("No linked accounts. Link one with:");
        println!("  gigsense accounts link --item <item> --account <account> --token <token>");
        return Ok(());
    }

    println!("🏦 Linked Accounts ({})", accounts.len());
    println!("   ─────────────────────────────");
    for account in &accounts {
        let icon = match account.status {
            AccountStatus::Active => "🟢",
            AccountStatus::Error => "🔴",
            AccountStatus::PendingExpiration => "🟡",
        };
        let institution = account
            .institution
            .as_deref()
            .unwrap_or("Unknown institution");
        let synced = if account.sync_cursor.is_some() {
            "synced"
        } else {
            "never synced"
        };
        println!(
            "   [{}] {} {} ({}) - {}",
            account.id, icon, institution, account.account_id, synced
        );
    }

    Ok(())
}

pub fn cmd_accounts_link(
    db: &Database,
    user_id: &str,
    item_id: &str,
    account_id: &str,
    institution: Option<&str>,
    access_token: &str,
) -> Result<()> {
    db.ensure_profile(user_id, None)?;
    let account = db.link_account(user_id, item_id, account_id, institution, access_token)?;

    println!(
        "✅ Linked {} ({})",
        account.institution.as_deref().unwrap_or("account"),
        account.account_id
    );
    println!("   Next: gigsense sync");

    Ok(())
}

pub fn cmd_accounts_relink(
    db: &Database,
    user_id: &str,
    id: i64,
    access_token: &str,
) -> Result<()> {
    let existing = db
        .get_linked_account(id)?
        .filter(|a| a.user_id == user_id)
        .ok_or_else(|| anyhow::anyhow!("Account {} not found", id))?;

    let account = db.link_account(
        user_id,
        &existing.item_id,
        &existing.account_id,
        existing.institution.as_deref(),
        access_token,
    )?;

    println!("✅ Relinked account {}", account.account_id);
    println!("   Cursor reset; the next sync re-pulls full history (duplicates are skipped).");

    Ok(())
}

pub fn cmd_accounts_unlink(db: &Database, user_id: &str, id: i64) -> Result<()> {
    if !db.unlink_account(user_id, id)? {
        anyhow::bail!("Account {} not found", id);
    }

    println!("✅ Account unlinked. Existing transactions were kept.");

    Ok(())
}
