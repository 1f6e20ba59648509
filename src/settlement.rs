//! Settlement ledger collaborator.
//!
//! The pipeline's only contract with persistence is "mark transaction T for
//! user U as settled". The write is fire-and-forget: the redirect decision
//! never blocks on it. At-most-once application is the ledger's own
//! guarantee, via a compare-and-set insert keyed on the transaction id.

use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection};

use crate::error::{AppError, Result};

pub type SettlementPool = Pool<SqliteConnectionManager>;

pub trait SettlementStore: Send + Sync {
    /// Record the transaction as settled. Returns `true` when this call
    /// applied the record, `false` when it was already present.
    fn mark_settled(&self, user_id: &str, transaction_id: &str) -> Result<bool>;
}

pub struct SqliteSettlementStore {
    pool: SettlementPool,
}

impl SqliteSettlementStore {
    pub fn open(database_path: &str) -> Result<Self> {
        let manager = SqliteConnectionManager::file(database_path);
        Self::from_manager(manager, 10)
    }

    /// In-memory ledger for tests. A single pooled connection keeps every
    /// call on the same database.
    pub fn in_memory() -> Result<Self> {
        Self::from_manager(SqliteConnectionManager::memory(), 1)
    }

    fn from_manager(manager: SqliteConnectionManager, max_size: u32) -> Result<Self> {
        let pool = Pool::builder()
            .max_size(max_size)
            .build(manager)
            .map_err(|e| AppError::Internal(format!("settlement pool: {}", e)))?;

        {
            let conn = pool
                .get()
                .map_err(|e| AppError::Internal(format!("settlement pool: {}", e)))?;
            init_ledger(&conn)?;
        }

        Ok(Self { pool })
    }
}

fn init_ledger(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS settled_transactions (
            transaction_id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            settled_at INTEGER NOT NULL
        )",
        [],
    )
    .map_err(|e| AppError::Internal(format!("settlement schema: {}", e)))?;
    Ok(())
}

impl SettlementStore for SqliteSettlementStore {
    fn mark_settled(&self, user_id: &str, transaction_id: &str) -> Result<bool> {
        let conn = self
            .pool
            .get()
            .map_err(|e| AppError::Internal(format!("settlement pool: {}", e)))?;

        let changed = conn
            .execute(
                "INSERT INTO settled_transactions (transaction_id, user_id, settled_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(transaction_id) DO NOTHING",
                params![transaction_id, user_id, chrono::Utc::now().timestamp()],
            )
            .map_err(|e| AppError::Internal(format!("settlement write: {}", e)))?;

        Ok(changed == 1)
    }
}

/// Fire-and-forget settlement write. Failures are logged, never surfaced to
/// the request that triggered them.
pub fn spawn_mark_settled(
    store: Arc<dyn SettlementStore>,
    user_id: String,
    transaction_id: String,
) {
    tokio::spawn(async move {
        match store.mark_settled(&user_id, &transaction_id) {
            Ok(true) => {
                tracing::debug!(user_id = %user_id, transaction_id = %transaction_id, "settlement recorded");
            }
            Ok(false) => {
                tracing::debug!(user_id = %user_id, transaction_id = %transaction_id, "settlement already recorded");
            }
            Err(e) => {
                tracing::warn!(
                    user_id = %user_id,
                    transaction_id = %transaction_id,
                    "failed to record settlement: {}",
                    e
                );
            }
        }
    });
}
