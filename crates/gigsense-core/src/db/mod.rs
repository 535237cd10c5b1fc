//! Database access layer with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `profiles` - User profile operations
//! - `accounts` - Linked bank account and sync cursor operations
//! - `transactions` - Transaction CRUD and transactional sync-page apply
//! - `snapshots` - Persisted income snapshot (one row per user)

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::info;

use crate::error::{Error, Result};

mod accounts;
mod profiles;
mod snapshots;
mod transactions;

pub use transactions::SyncCounts;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Environment variable for database encryption key
pub const DB_KEY_ENV: &str = "GIGSENSE_DB_KEY";

/// Derive an encryption key from a passphrase using Argon2
///
/// Uses a fixed application salt so the same passphrase always produces the same key,
/// regardless of database path. This allows moving/renaming/restoring the database freely.
fn derive_key(passphrase: &str) -> Result<String> {
    use argon2::{password_hash::SaltString, Argon2, PasswordHasher};

    // Fixed application salt - changing this would invalidate all existing encrypted databases
    const APP_SALT: &[u8; 16] = b"gigsense-salt-v1";

    let salt = SaltString::encode_b64(APP_SALT)
        .map_err(|e| Error::Encryption(format!("Failed to create salt: {}", e)))?;

    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(passphrase.as_bytes(), &salt)
        .map_err(|e| Error::Encryption(format!("Failed to derive key: {}", e)))?;

    // Extract the hash portion for use as SQLCipher key (hex encoded)
    let hash_str = hash
        .hash
        .ok_or_else(|| Error::Encryption("No hash output".to_string()))?;
    Ok(hex::encode(hash_str.as_bytes()))
}

/// Parse a SQLite datetime string into a DateTime<Utc>
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    // SQLite stores as "YYYY-MM-DD HH:MM:SS" format
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Path to the database file
    db_path: String,
}

impl Database {
    /// Create a new database connection pool with encryption
    ///
    /// Requires `GIGSENSE_DB_KEY` environment variable to be set.
    /// The database will be encrypted using SQLCipher with a key derived
    /// from the passphrase via Argon2.
    ///
    /// Returns an error if `GIGSENSE_DB_KEY` is not set. Use `new_unencrypted()`
    /// for development/testing without encryption.
    pub fn new(path: &str) -> Result<Self> {
        let encryption_key = std::env::var(DB_KEY_ENV).ok();
        match encryption_key {
            Some(key) => Self::new_with_key(path, Some(&key)),
            None => Err(Error::Encryption(format!(
                "Database encryption required. Set {} environment variable with your passphrase, \
                or use --no-encrypt for unencrypted databases (not recommended for production).",
                DB_KEY_ENV
            ))),
        }
    }

    /// Create a new unencrypted database connection pool
    ///
    /// WARNING: This creates an unencrypted database. Only use for development
    /// or testing. For production, use `new()` with `GIGSENSE_DB_KEY` set.
    pub fn new_unencrypted(path: &str) -> Result<Self> {
        Self::new_with_key(path, None)
    }

    /// Create a new database with an explicit encryption key
    pub fn new_with_key(path: &str, passphrase: Option<&str>) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path);

        let pool = if let Some(pass) = passphrase {
            let key = derive_key(pass)?;
            let key_pragma = format!("PRAGMA key = 'x\"{}\"';", key);

            // Use with_init to set the key on every new connection
            let manager = manager.with_init(move |conn| {
                conn.execute_batch(&key_pragma)?;
                Ok(())
            });

            Pool::builder().max_size(10).build(manager)?
        } else {
            Pool::builder().max_size(10).build(manager)?
        };

        let db = Self {
            pool,
            db_path: path.to_string(),
        };
        db.run_migrations()?;

        Ok(db)
    }

    /// Get the path to the database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create an in-memory database (for testing)
    ///
    /// Note: Uses a temporary file rather than `:memory:` because SQLCipher
    /// has issues with in-memory databases in the connection pool.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = format!("/tmp/gigsense_test_{}_{}.db", std::process::id(), id);

        // Remove any existing file
        let _ = std::fs::remove_file(&path);

        Self::new_unencrypted(&path)
    }

    /// Check if the database is encrypted
    pub fn is_encrypted(&self) -> Result<bool> {
        let conn = self.conn()?;
        // SQLCipher sets cipher_version if encryption is active
        let result: rusqlite::Result<String> =
            conn.query_row("PRAGMA cipher_version;", [], |row| row.get(0));
        Ok(result.is_ok() && std::env::var(DB_KEY_ENV).is_ok())
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- Enable foreign keys
            PRAGMA foreign_keys = ON;

            -- Performance pragmas for local storage
            -- WAL mode: better concurrency, readers don't block writers
            PRAGMA journal_mode = WAL;
            PRAGMA cache_size = 2000;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;

            -- User profiles (one row per user)
            CREATE TABLE IF NOT EXISTS profiles (
                id INTEGER PRIMARY KEY,
                user_id TEXT NOT NULL UNIQUE,
                email TEXT,
                city TEXT,
                weekly_report BOOLEAN DEFAULT 0,
                has_tax_profile BOOLEAN DEFAULT 0,
                has_benefits BOOLEAN DEFAULT 0,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- Linked bank accounts with their sync cursors
            CREATE TABLE IF NOT EXISTS linked_accounts (
                id INTEGER PRIMARY KEY,
                user_id TEXT NOT NULL,
                item_id TEXT NOT NULL,
                account_id TEXT NOT NULL,
                institution TEXT,
                access_token TEXT NOT NULL,
                sync_cursor TEXT,                          -- NULL = start of history
                status TEXT DEFAULT 'active',              -- active, error, pending_expiration
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(user_id, account_id)
            );

            CREATE INDEX IF NOT EXISTS idx_linked_accounts_user ON linked_accounts(user_id);
            CREATE INDEX IF NOT EXISTS idx_linked_accounts_item ON linked_accounts(item_id);

            -- Transactions
            CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY,
                external_id TEXT NOT NULL,                 -- feed txn id or CSV content hash
                user_id TEXT NOT NULL,
                account_id INTEGER REFERENCES linked_accounts(id) ON DELETE SET NULL,
                date DATE NOT NULL,
                posted_at DATETIME,                        -- time-of-day when the feed supplies it
                description TEXT NOT NULL,
                amount REAL NOT NULL,                      -- positive = inflow
                merchant_name TEXT,
                category TEXT,
                pending BOOLEAN DEFAULT 0,
                source TEXT DEFAULT 'csv',                 -- csv, feed
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(user_id, external_id)
            );

            CREATE INDEX IF NOT EXISTS idx_transactions_user_date ON transactions(user_id, date);
            CREATE INDEX IF NOT EXISTS idx_transactions_account ON transactions(account_id);

            -- Income snapshots (one row per user, replaced wholesale)
            CREATE TABLE IF NOT EXISTS income_snapshots (
                user_id TEXT PRIMARY KEY,
                total_income REAL NOT NULL,
                start_date DATE NOT NULL,
                end_date DATE NOT NULL,
                by_platform TEXT NOT NULL,                 -- JSON
                stability TEXT NOT NULL,                   -- JSON
                items TEXT NOT NULL,                       -- JSON
                computed_at DATETIME NOT NULL
            );
            "#,
        )?;

        info!("Database schema initialized");
        Ok(())
    }
}
