//! Linked account operations
//!
//! Each row carries the aggregator access token and the account's sync
//! cursor. The cursor is only advanced inside `apply_sync_page`, in the same
//! transaction as the page's data; the helpers here cover linking, status
//! changes, and the explicit relink reset.

use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::{AccountStatus, LinkedAccount};

fn row_to_account(row: &rusqlite::Row) -> rusqlite::Result<LinkedAccount> {
    let status_str: String = row.get(7)?;
    let created_at_str: String = row.get(8)?;

    Ok(LinkedAccount {
        id: row.get(0)?,
        user_id: row.get(1)?,
        item_id: row.get(2)?,
        account_id: row.get(3)?,
        institution: row.get(4)?,
        access_token: row.get(5)?,
        sync_cursor: row.get(6)?,
        status: status_str.parse().unwrap_or_default(),
        created_at: parse_datetime(&created_at_str),
    })
}

const ACCOUNT_COLUMNS: &str =
    "id, user_id, item_id, account_id, institution, access_token, sync_cursor, status, created_at";

impl Database {
    /// Link an account, or refresh its token if the same aggregator account
    /// is linked again. Relinking resets the cursor to the start of history.
    pub fn link_account(
        &self,
        user_id: &str,
        item_id: &str,
        account_id: &str,
        institution: Option<&str>,
        access_token: &str,
    ) -> Result<LinkedAccount> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO linked_accounts (user_id, item_id, account_id, institution, access_token)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(user_id, account_id) DO UPDATE SET
                access_token = excluded.access_token,
                institution = excluded.institution,
                item_id = excluded.item_id,
                sync_cursor = NULL,
                status = 'active'",
            params![user_id, item_id, account_id, institution, access_token],
        )?;

        let account = conn.query_row(
            &format!(
                "SELECT {} FROM linked_accounts WHERE user_id = ? AND account_id = ?",
                ACCOUNT_COLUMNS
            ),
            params![user_id, account_id],
            row_to_account,
        )?;

        Ok(account)
    }

    /// List a user's linked accounts
    pub fn list_linked_accounts(&self, user_id: &str) -> Result<Vec<LinkedAccount>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM linked_accounts WHERE user_id = ? ORDER BY id",
            ACCOUNT_COLUMNS
        ))?;

        let accounts = stmt
            .query_map(params![user_id], row_to_account)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(accounts)
    }

    /// List every account under an aggregator item (webhooks are item-scoped)
    pub fn list_accounts_for_item(&self, item_id: &str) -> Result<Vec<LinkedAccount>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM linked_accounts WHERE item_id = ? ORDER BY id",
            ACCOUNT_COLUMNS
        ))?;

        let accounts = stmt
            .query_map(params![item_id], row_to_account)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(accounts)
    }

    /// Get a linked account by row id
    pub fn get_linked_account(&self, id: i64) -> Result<Option<LinkedAccount>> {
        let conn = self.conn()?;
        let account = conn
            .query_row(
                &format!("SELECT {} FROM linked_accounts WHERE id = ?", ACCOUNT_COLUMNS),
                params![id],
                row_to_account,
            )
            .optional()?;

        Ok(account)
    }

    /// Set the status of every account under an item
    pub fn set_item_status(&self, item_id: &str, status: AccountStatus) -> Result<usize> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE linked_accounts SET status = ? WHERE item_id = ?",
            params![status.as_str(), item_id],
        )?;
        Ok(changed)
    }

    /// Remove a linked account. Its transactions stay, detached from the
    /// account row.
    pub fn unlink_account(&self, user_id: &str, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM linked_accounts WHERE id = ? AND user_id = ?",
            params![id, user_id],
        )?;
        Ok(deleted > 0)
    }
}
