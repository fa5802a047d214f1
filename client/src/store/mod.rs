//! On-device persistence: transactions, the account profile and sync
//! bookkeeping.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::{SqliteStore, StoredTransaction};

use async_trait::async_trait;
use lumen_engine::{AccountConfig, Transaction, UserId};
use thiserror::Error;

/// Local store failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored row could not be turned back into a domain value
    #[error("corrupt row {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

/// Transaction store contract.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Insert, replacing any row with the same unique id. Returns the stored
    /// copy with its local id.
    async fn insert(&self, tx: &Transaction) -> Result<Transaction, StoreError>;

    /// Every stored transaction, newest first.
    async fn select_all(&self) -> Result<Vec<Transaction>, StoreError>;

    async fn find(&self, unique_id: &str) -> Result<Option<Transaction>, StoreError>;

    /// Overwrite fields, remote ref and synced flag of the row with the same
    /// unique id. A missing row is left missing.
    async fn update(&self, tx: &Transaction) -> Result<(), StoreError>;

    /// Mark the row of `planned` synced, but only while it still holds the
    /// fields of `planned`. The remote ref, when given, is recorded either
    /// way. Returns whether the row was marked.
    async fn set_synced(
        &self,
        planned: &Transaction,
        remote_ref: Option<&str>,
    ) -> Result<bool, StoreError>;

    /// Delete by unique id. Deleting a missing row succeeds.
    async fn delete_by_unique_id(&self, unique_id: &str) -> Result<(), StoreError>;

    async fn delete_all(&self) -> Result<(), StoreError>;

    /// The user whose local set was wiped on purpose while their remote
    /// copies have not caught up yet.
    async fn erasure_pending(&self) -> Result<Option<UserId>, StoreError>;

    /// Record the pending erasure owner, or clear it with `None`.
    async fn set_erasure_pending(&self, user_id: Option<&str>) -> Result<(), StoreError>;
}

/// Account profile store contract. At most one profile exists.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn load_account(&self) -> Result<Option<AccountConfig>, StoreError>;

    /// Insert or replace the singleton row.
    async fn save_account(&self, config: &AccountConfig) -> Result<(), StoreError>;

    async fn delete_account(&self) -> Result<(), StoreError>;
}
