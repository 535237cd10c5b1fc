//! Transaction operations

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, OptionalExtension};
use tracing::debug;

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::feed::SyncPage;
use crate::models::{LinkedAccount, NewTransaction, Transaction, TransactionSource};

/// Change counters for one applied sync page.
///
/// Additive and commutative, so per-account results roll up into a run
/// total in any order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct SyncCounts {
    pub added: usize,
    pub modified: usize,
    pub removed: usize,
}

impl SyncCounts {
    /// True when the page or run touched nothing
    pub fn is_empty(&self) -> bool {
        self.added == 0 && self.modified == 0 && self.removed == 0
    }

    pub fn merge(&mut self, other: SyncCounts) {
        self.added += other.added;
        self.modified += other.modified;
        self.removed += other.removed;
    }
}

const TXN_COLUMNS: &str = "id, external_id, user_id, account_id, date, posted_at, description, \
                           amount, merchant_name, category, pending, source, created_at";

fn row_to_transaction(row: &rusqlite::Row) -> rusqlite::Result<Transaction> {
    let date_str: String = row.get(4)?;
    let posted_at_str: Option<String> = row.get(5)?;
    let pending_int: i64 = row.get(10)?;
    let source_str: String = row.get(11)?;
    let created_at_str: String = row.get(12)?;

    Ok(Transaction {
        id: row.get(0)?,
        external_id: row.get(1)?,
        user_id: row.get(2)?,
        account_id: row.get(3)?,
        date: NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").unwrap_or_default(),
        posted_at: posted_at_str
            .and_then(|s| NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S").ok()),
        description: row.get(6)?,
        amount: row.get(7)?,
        merchant_name: row.get(8)?,
        category: row.get(9)?,
        pending: pending_int != 0,
        source: source_str.parse().unwrap_or(TransactionSource::Csv),
        created_at: parse_datetime(&created_at_str),
    })
}

fn posted_at_string(posted_at: Option<NaiveDateTime>) -> Option<String> {
    posted_at.map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
}

impl Database {
    /// Insert a transaction, skipping duplicates by external id.
    ///
    /// Returns the new row id, or None when the user already has a row with
    /// the same external id.
    pub fn insert_transaction(
        &self,
        user_id: &str,
        account_id: Option<i64>,
        tx: &NewTransaction,
    ) -> Result<Option<i64>> {
        let conn = self.conn()?;

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM transactions WHERE user_id = ? AND external_id = ?",
                params![user_id, tx.external_id],
                |row| row.get(0),
            )
            .optional()?;

        if existing.is_some() {
            return Ok(None); // Duplicate, skip
        }

        conn.execute(
            r#"
            INSERT INTO transactions (external_id, user_id, account_id, date, posted_at, description, amount, merchant_name, category, pending, source)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                tx.external_id,
                user_id,
                account_id,
                tx.date.to_string(),
                posted_at_string(tx.posted_at),
                tx.description,
                tx.amount,
                tx.merchant_name,
                tx.category,
                tx.pending as i64,
                tx.source.as_str(),
            ],
        )?;

        Ok(Some(conn.last_insert_rowid()))
    }

    /// Apply one feed page for an account: adds as idempotent upserts,
    /// modifies as targeted updates, removes as deletes, then the cursor.
    ///
    /// Everything happens in a single transaction so a crash can never
    /// commit the cursor without its page or the page without its cursor.
    pub fn apply_sync_page(&self, account: &LinkedAccount, page: &SyncPage) -> Result<SyncCounts> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut counts = SyncCounts::default();

        for feed_txn in &page.added {
            let new_txn = feed_txn.to_new_transaction();

            let existing: Option<i64> = tx
                .query_row(
                    "SELECT id FROM transactions WHERE user_id = ? AND external_id = ?",
                    params![account.user_id, new_txn.external_id],
                    |row| row.get(0),
                )
                .optional()?;

            match existing {
                // Duplicate delivery: refresh fields, leave the count alone
                Some(id) => {
                    tx.execute(
                        "UPDATE transactions SET date = ?, posted_at = ?, description = ?, amount = ?,
                                merchant_name = ?, category = ?, pending = ?
                         WHERE id = ?",
                        params![
                            new_txn.date.to_string(),
                            posted_at_string(new_txn.posted_at),
                            new_txn.description,
                            new_txn.amount,
                            new_txn.merchant_name,
                            new_txn.category,
                            new_txn.pending as i64,
                            id,
                        ],
                    )?;
                }
                None => {
                    tx.execute(
                        r#"
                        INSERT INTO transactions (external_id, user_id, account_id, date, posted_at, description, amount, merchant_name, category, pending, source)
                        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                        "#,
                        params![
                            new_txn.external_id,
                            account.user_id,
                            account.id,
                            new_txn.date.to_string(),
                            posted_at_string(new_txn.posted_at),
                            new_txn.description,
                            new_txn.amount,
                            new_txn.merchant_name,
                            new_txn.category,
                            new_txn.pending as i64,
                            new_txn.source.as_str(),
                        ],
                    )?;
                    counts.added += 1;
                }
            }
        }

        for feed_txn in &page.modified {
            let new_txn = feed_txn.to_new_transaction();
            // Unknown ids update zero rows; that is not an error
            let changed = tx.execute(
                "UPDATE transactions SET date = ?, posted_at = ?, description = ?, amount = ?,
                        merchant_name = ?, category = ?, pending = ?
                 WHERE user_id = ? AND external_id = ?",
                params![
                    new_txn.date.to_string(),
                    posted_at_string(new_txn.posted_at),
                    new_txn.description,
                    new_txn.amount,
                    new_txn.merchant_name,
                    new_txn.category,
                    new_txn.pending as i64,
                    account.user_id,
                    new_txn.external_id,
                ],
            )?;
            counts.modified += changed;
        }

        for removed in &page.removed {
            let deleted = tx.execute(
                "DELETE FROM transactions WHERE user_id = ? AND external_id = ?",
                params![account.user_id, removed.transaction_id],
            )?;
            counts.removed += deleted;
        }

        tx.execute(
            "UPDATE linked_accounts SET sync_cursor = ? WHERE id = ?",
            params![page.next_cursor, account.id],
        )?;

        tx.commit()?;

        debug!(
            account_id = account.id,
            added = counts.added,
            modified = counts.modified,
            removed = counts.removed,
            "Applied sync page"
        );

        Ok(counts)
    }

    /// All of a user's transactions in chronological order, for analysis
    pub fn transactions_for_user(&self, user_id: &str) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM transactions WHERE user_id = ? ORDER BY date ASC, id ASC",
            TXN_COLUMNS
        ))?;

        let transactions = stmt
            .query_map(params![user_id], row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(transactions)
    }

    /// Page through a user's transactions, newest first
    pub fn list_transactions(
        &self,
        user_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM transactions WHERE user_id = ? ORDER BY date DESC, id DESC LIMIT ? OFFSET ?",
            TXN_COLUMNS
        ))?;

        let transactions = stmt
            .query_map(params![user_id, limit, offset], row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(transactions)
    }

    /// Transactions within an inclusive date range, chronological
    pub fn transactions_in_range(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM transactions WHERE user_id = ? AND date >= ? AND date <= ? ORDER BY date ASC, id ASC",
            TXN_COLUMNS
        ))?;

        let transactions = stmt
            .query_map(
                params![user_id, start.to_string(), end.to_string()],
                row_to_transaction,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(transactions)
    }

    /// Look up a user's transaction by its external (feed or import hash) id
    pub fn get_transaction_by_external_id(
        &self,
        user_id: &str,
        external_id: &str,
    ) -> Result<Option<Transaction>> {
        let conn = self.conn()?;
        let transaction = conn
            .query_row(
                &format!(
                    "SELECT {} FROM transactions WHERE user_id = ? AND external_id = ?",
                    TXN_COLUMNS
                ),
                params![user_id, external_id],
                row_to_transaction,
            )
            .optional()?;

        Ok(transaction)
    }

    /// Count a user's transactions
    pub fn count_transactions(&self, user_id: &str) -> Result<i64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM transactions WHERE user_id = ?",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
