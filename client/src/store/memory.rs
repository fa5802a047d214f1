//! In-process store for ephemeral sessions and tests.

use super::{AccountStore, StoreError, TransactionStore};
use async_trait::async_trait;
use lumen_engine::{AccountConfig, LocalId, Transaction, UniqueId, UserId};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct State {
    rows: BTreeMap<UniqueId, Transaction>,
    next_local_id: LocalId,
    account: Option<AccountConfig>,
    erasure_pending: Option<UserId>,
}

/// Store that keeps everything in memory. Never fails.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `transactions`, keeping their synced flags.
    pub async fn with_transactions(
        transactions: impl IntoIterator<Item = Transaction>,
    ) -> Result<Self, StoreError> {
        let store = Self::new();
        for tx in transactions {
            store.insert(&tx).await?;
        }
        Ok(store)
    }
}

/// Newest first, ties by unique id, matching the SQLite ordering.
fn sort_newest_first(list: &mut [Transaction]) {
    list.sort_by(|a, b| {
        b.fields
            .occurred_at
            .cmp(&a.fields.occurred_at)
            .then_with(|| a.unique_id.cmp(&b.unique_id))
    });
}

#[async_trait]
impl TransactionStore for MemoryStore {
    async fn insert(&self, tx: &Transaction) -> Result<Transaction, StoreError> {
        let mut state = self.state.write().await;
        let local_id = match state.rows.get(&tx.unique_id).and_then(|t| t.local_id) {
            Some(id) => id,
            None => {
                state.next_local_id += 1;
                state.next_local_id
            }
        };

        let mut stored = tx.clone();
        stored.local_id = Some(local_id);
        state.rows.insert(stored.unique_id.clone(), stored.clone());
        Ok(stored)
    }

    async fn select_all(&self) -> Result<Vec<Transaction>, StoreError> {
        let mut list: Vec<Transaction> = self.state.read().await.rows.values().cloned().collect();
        sort_newest_first(&mut list);
        Ok(list)
    }

    async fn find(&self, unique_id: &str) -> Result<Option<Transaction>, StoreError> {
        Ok(self.state.read().await.rows.get(unique_id).cloned())
    }

    async fn update(&self, tx: &Transaction) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if let Some(row) = state.rows.get_mut(&tx.unique_id) {
            row.fields = tx.fields.clone();
            row.synced = tx.synced;
            if tx.remote_ref.is_some() {
                row.remote_ref = tx.remote_ref.clone();
            }
        }
        Ok(())
    }

    async fn set_synced(
        &self,
        planned: &Transaction,
        remote_ref: Option<&str>,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        let Some(row) = state.rows.get_mut(&planned.unique_id) else {
            return Ok(false);
        };

        if row.fields != planned.fields {
            if let Some(remote_ref) = remote_ref {
                row.remote_ref = Some(remote_ref.to_string());
            }
            return Ok(false);
        }
        row.mark_synced(remote_ref.map(str::to_string));
        Ok(true)
    }

    async fn delete_by_unique_id(&self, unique_id: &str) -> Result<(), StoreError> {
        self.state.write().await.rows.remove(unique_id);
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), StoreError> {
        self.state.write().await.rows.clear();
        Ok(())
    }

    async fn erasure_pending(&self) -> Result<Option<UserId>, StoreError> {
        Ok(self.state.read().await.erasure_pending.clone())
    }

    async fn set_erasure_pending(&self, user_id: Option<&str>) -> Result<(), StoreError> {
        self.state.write().await.erasure_pending = user_id.map(str::to_string);
        Ok(())
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn load_account(&self) -> Result<Option<AccountConfig>, StoreError> {
        Ok(self.state.read().await.account.clone())
    }

    async fn save_account(&self, config: &AccountConfig) -> Result<(), StoreError> {
        self.state.write().await.account = Some(config.clone());
        Ok(())
    }

    async fn delete_account(&self) -> Result<(), StoreError> {
        self.state.write().await.account = None;
        Ok(())
    }
}
