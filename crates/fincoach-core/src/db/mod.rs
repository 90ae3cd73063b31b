//! Database access layer with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `transactions` - Transaction CRUD, stats and category rollups
//! - `budgets` - Budget CRUD and monthly progress
//! - `goals` - Goal CRUD, contributions and summaries
//! - `conversations` - Coaching chat transcripts
//! - `linked_items` - Persistent aggregator access-token store

use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::Type;
use rusqlite::Connection;
use tracing::info;

use crate::error::{Error, Result};

mod budgets;
mod conversations;
mod goals;
mod linked_items;
mod transaction_filter;
mod transactions;

pub use budgets::compute_budget_progress;
pub use goals::compute_goal_progress;
pub use transaction_filter::{FilterResult, TransactionFilter};
pub use transactions::TransactionInsertResult;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Environment variable for database encryption key
pub const DB_KEY_ENV: &str = "FINCOACH_DB_KEY";

/// Outcome of an update or delete addressed by id.
///
/// A missing record is an expected answer, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome<T> {
    /// The record existed and the write was applied
    Applied(T),
    /// No record with that id
    NotFound,
}

impl<T> WriteOutcome<T> {
    pub fn applied(self) -> Option<T> {
        match self {
            Self::Applied(v) => Some(v),
            Self::NotFound => None,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// Derive an encryption key from a passphrase using Argon2
///
/// Uses a fixed application salt so the same passphrase always produces the same key,
/// regardless of database path.
fn derive_key(passphrase: &str) -> Result<String> {
    use argon2::{password_hash::SaltString, Argon2, PasswordHasher};

    // Changing this would invalidate all existing encrypted databases
    const APP_SALT: &[u8; 16] = b"fincoach-salt-v1";

    let salt = SaltString::encode_b64(APP_SALT)
        .map_err(|e| Error::Encryption(format!("Failed to create salt: {}", e)))?;

    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(passphrase.as_bytes(), &salt)
        .map_err(|e| Error::Encryption(format!("Failed to derive key: {}", e)))?;

    let hash_str = hash
        .hash
        .ok_or_else(|| Error::Encryption("No hash output".to_string()))?;
    Ok(hex::encode(hash_str.as_bytes()))
}

fn conversion_failure(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

/// Parse the SQLite datetime stored in column `idx`
pub(crate) fn parse_datetime(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    // SQLite stores as "YYYY-MM-DD HH:MM:SS" format
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .map_err(|e| conversion_failure(idx, e))
}

/// Format a timestamp the way SQLite's CURRENT_TIMESTAMP does
pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Current time truncated to whole seconds, so stored and returned values match
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

/// Parse the calendar date stored in column `idx`
pub(crate) fn parse_date(idx: usize, s: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| conversion_failure(idx, e))
}

/// Decode a JSON string-list column
pub(crate) fn parse_string_list(s: &str) -> Vec<String> {
    serde_json::from_str(s).unwrap_or_default()
}

/// True when a rusqlite error is a UNIQUE/constraint violation
pub(crate) fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Per-connection setup: foreign keys, plus a `unicode_lower()` SQL function
/// for case-insensitive matching beyond ASCII
fn init_connection(conn: &mut Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.create_scalar_function(
        "unicode_lower",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: Option<String> = ctx.get(0)?;
            Ok(text.map(|t| t.to_lowercase()))
        },
    )
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Path to the database file
    db_path: String,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.db_path)
            .finish_non_exhaustive()
    }
}

impl Database {
    /// Open a database, encrypting it when `FINCOACH_DB_KEY` is set
    pub fn new(path: &str) -> Result<Self> {
        let key = std::env::var(DB_KEY_ENV).ok();
        Self::new_with_key(path, key.as_deref())
    }

    /// Create a new unencrypted database connection pool
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
                init_connection(conn)
            });

            Pool::builder().max_size(10).build(manager)?
        } else {
            let manager = manager.with_init(init_connection);
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

    /// Create a throwaway database (for testing)
    ///
    /// Note: Uses a temporary file rather than `:memory:` because each pooled
    /// connection to `:memory:` would see its own empty database.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "fincoach_test_{}_{}.db",
            std::process::id(),
            id
        ));
        let path = path.to_string_lossy().to_string();

        // Remove any existing file
        let _ = std::fs::remove_file(&path);

        Self::new_unencrypted(&path)
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Run a synchronous query on the blocking thread pool.
    ///
    /// The closure gets its own handle; the pool hands it a separate connection.
    pub async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || f(&db)).await?
    }

    /// Remove every transaction, budget, goal and conversation.
    ///
    /// Linked bank items are kept; they belong to the proxy, not the user data.
    pub fn clear_all(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            BEGIN;
            DELETE FROM messages;
            DELETE FROM conversations;
            DELETE FROM goals;
            DELETE FROM budgets;
            DELETE FROM transactions;
            COMMIT;
            "#,
        )?;

        info!("All user data cleared");
        Ok(())
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- WAL mode: readers don't block writers
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;

            -- Transactions (manual entries and bank imports)
            CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY,
                amount REAL NOT NULL CHECK (amount > 0),   -- direction lives in transaction_type
                transaction_type TEXT NOT NULL,            -- expense, income
                category TEXT NOT NULL,                    -- key into the static category table
                subcategory TEXT,
                merchant TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                date DATE NOT NULL,
                payment_method TEXT,                       -- cash, credit_card, debit_card, ...
                tags TEXT NOT NULL DEFAULT '[]',           -- JSON array of strings
                notes TEXT,
                external_id TEXT UNIQUE,                   -- aggregator transaction id (dedup)
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date);
            CREATE INDEX IF NOT EXISTS idx_transactions_category ON transactions(category);
            CREATE INDEX IF NOT EXISTS idx_transactions_type ON transactions(transaction_type);

            -- Budgets (one per category, enforced by the UNIQUE constraint)
            CREATE TABLE IF NOT EXISTS budgets (
                id INTEGER PRIMARY KEY,
                category TEXT NOT NULL UNIQUE,
                monthly_limit REAL NOT NULL,
                alert_threshold REAL NOT NULL DEFAULT 75,  -- percent
                rollover BOOLEAN NOT NULL DEFAULT 0,       -- stored only
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
            );

            -- Savings goals
            CREATE TABLE IF NOT EXISTS goals (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT,
                target_amount REAL NOT NULL,
                current_amount REAL NOT NULL DEFAULT 0,
                deadline DATE NOT NULL,
                priority TEXT NOT NULL DEFAULT 'medium',   -- high, medium, low
                category TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL DEFAULT 'active',     -- active, completed, paused, cancelled
                motivations TEXT NOT NULL DEFAULT '[]',    -- JSON array of strings
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_goals_status ON goals(status);

            -- Coaching conversations
            CREATE TABLE IF NOT EXISTS conversations (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
            );

            -- Messages are owned by their conversation and append-only
            CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY,
                conversation_id INTEGER NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
                role TEXT NOT NULL,                        -- user, assistant
                content TEXT NOT NULL,
                metadata TEXT,                             -- JSON MessageMetadata
                timestamp DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_messages_conversation ON messages(conversation_id, id);

            -- Aggregator items linked through the proxy (item id -> access token)
            CREATE TABLE IF NOT EXISTS linked_items (
                item_id TEXT PRIMARY KEY,
                access_token TEXT NOT NULL,
                institution TEXT NOT NULL DEFAULT 'null',  -- JSON institution metadata
                connected_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            "#,
        )?;

        info!("Database schema initialized");
        Ok(())
    }
}

#[cfg(test)]
mod tests;
