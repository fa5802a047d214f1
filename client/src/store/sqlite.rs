//! SQLite-backed store.

use super::{AccountStore, StoreError, TransactionStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lumen_engine::{AccountConfig, Transaction, TransactionFields, UserId, ACCOUNT_ROW_ID};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

/// A stored transaction row.
#[derive(Debug)]
pub struct StoredTransaction {
    pub local_id: i64,
    pub unique_id: String,
    pub remote_ref: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub amount: String,
    pub occurred_at: DateTime<Utc>,
    pub kind: String,
    pub category: String,
    pub synced: bool,
}

impl<'r> sqlx::FromRow<'r, SqliteRow> for StoredTransaction {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(StoredTransaction {
            local_id: row.try_get("local_id")?,
            unique_id: row.try_get("unique_id")?,
            remote_ref: row.try_get("remote_ref")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            amount: row.try_get("amount")?,
            occurred_at: row.try_get("occurred_at")?,
            kind: row.try_get("kind")?,
            category: row.try_get("category")?,
            synced: row.try_get("synced")?,
        })
    }
}

impl StoredTransaction {
    /// Convert a row into a domain transaction.
    pub fn to_transaction(&self) -> Result<Transaction, StoreError> {
        let corrupt = |reason: String| StoreError::Corrupt {
            key: self.unique_id.clone(),
            reason,
        };

        let fields = TransactionFields {
            title: self.title.clone(),
            description: self.description.clone(),
            amount: self
                .amount
                .parse()
                .map_err(|e| corrupt(format!("amount {:?}: {e}", self.amount)))?,
            occurred_at: self.occurred_at,
            kind: self.kind.parse().map_err(|e| corrupt(format!("{e}")))?,
            category: self.category.parse().map_err(|e| corrupt(format!("{e}")))?,
        };

        Ok(Transaction {
            local_id: Some(self.local_id),
            unique_id: self.unique_id.clone(),
            remote_ref: self.remote_ref.clone(),
            fields,
            synced: self.synced,
        })
    }
}

const SELECT_TRANSACTIONS: &str = r#"
    SELECT local_id, unique_id, remote_ref, title, description, amount,
           occurred_at, kind, category, synced
    FROM transactions
"#;

/// Store over a SQLite database with embedded migrations.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `url` and run migrations.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every connection to `:memory:` is a separate database.
        let max_connections = if url.contains(":memory:") { 1 } else { 4 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!(url = %url, "Local store ready");
        Ok(store)
    }

    /// Private in-memory database, mostly for tests.
    pub async fn in_memory() -> Result<Self, StoreError> {
        Self::connect("sqlite::memory:").await
    }

    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl TransactionStore for SqliteStore {
    async fn insert(&self, tx: &Transaction) -> Result<Transaction, StoreError> {
        let fields = &tx.fields;
        let local_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO transactions (
                unique_id, remote_ref, title, description, amount,
                occurred_at, kind, category, synced
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (unique_id) DO UPDATE SET
                remote_ref = excluded.remote_ref,
                title = excluded.title,
                description = excluded.description,
                amount = excluded.amount,
                occurred_at = excluded.occurred_at,
                kind = excluded.kind,
                category = excluded.category,
                synced = excluded.synced
            RETURNING local_id
            "#,
        )
        .bind(&tx.unique_id)
        .bind(&tx.remote_ref)
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(fields.amount.to_string())
        .bind(fields.occurred_at)
        .bind(fields.kind.as_str())
        .bind(fields.category.as_str())
        .bind(tx.synced)
        .fetch_one(&self.pool)
        .await?;

        debug!(unique_id = %tx.unique_id, local_id, synced = tx.synced, "Stored transaction");

        let mut stored = tx.clone();
        stored.local_id = Some(local_id);
        Ok(stored)
    }

    async fn select_all(&self) -> Result<Vec<Transaction>, StoreError> {
        let rows = sqlx::query_as::<_, StoredTransaction>(&format!(
            "{SELECT_TRANSACTIONS} ORDER BY occurred_at DESC, unique_id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(StoredTransaction::to_transaction).collect()
    }

    async fn find(&self, unique_id: &str) -> Result<Option<Transaction>, StoreError> {
        let row = sqlx::query_as::<_, StoredTransaction>(&format!(
            "{SELECT_TRANSACTIONS} WHERE unique_id = ?"
        ))
        .bind(unique_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(StoredTransaction::to_transaction).transpose()
    }

    async fn update(&self, tx: &Transaction) -> Result<(), StoreError> {
        let fields = &tx.fields;
        sqlx::query(
            r#"
            UPDATE transactions SET
                remote_ref = COALESCE(?, remote_ref),
                title = ?,
                description = ?,
                amount = ?,
                occurred_at = ?,
                kind = ?,
                category = ?,
                synced = ?
            WHERE unique_id = ?
            "#,
        )
        .bind(&tx.remote_ref)
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(fields.amount.to_string())
        .bind(fields.occurred_at)
        .bind(fields.kind.as_str())
        .bind(fields.category.as_str())
        .bind(tx.synced)
        .bind(&tx.unique_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_synced(
        &self,
        planned: &Transaction,
        remote_ref: Option<&str>,
    ) -> Result<bool, StoreError> {
        let fields = &planned.fields;
        let mut db_tx = self.pool.begin().await?;

        let marked = sqlx::query(
            r#"
            UPDATE transactions
            SET synced = 1, remote_ref = COALESCE(?, remote_ref)
            WHERE unique_id = ?
              AND title = ?
              AND description IS ?
              AND amount = ?
              AND occurred_at = ?
              AND kind = ?
              AND category = ?
            "#,
        )
        .bind(remote_ref)
        .bind(&planned.unique_id)
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(fields.amount.to_string())
        .bind(fields.occurred_at)
        .bind(fields.kind.as_str())
        .bind(fields.category.as_str())
        .execute(&mut *db_tx)
        .await?
        .rows_affected()
            > 0;

        if !marked && remote_ref.is_some() {
            sqlx::query("UPDATE transactions SET remote_ref = ? WHERE unique_id = ?")
                .bind(remote_ref)
                .bind(&planned.unique_id)
                .execute(&mut *db_tx)
                .await?;
        }

        db_tx.commit().await?;
        Ok(marked)
    }

    async fn delete_by_unique_id(&self, unique_id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM transactions WHERE unique_id = ?")
            .bind(unique_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM transactions")
            .execute(&self.pool)
            .await?;
        info!(deleted = result.rows_affected(), "Cleared local transactions");
        Ok(())
    }

    async fn erasure_pending(&self) -> Result<Option<UserId>, StoreError> {
        let owner: Option<Option<String>> =
            sqlx::query_scalar("SELECT erasure_pending_user FROM sync_state WHERE id = 1")
                .fetch_optional(&self.pool)
                .await?;
        Ok(owner.flatten())
    }

    async fn set_erasure_pending(&self, user_id: Option<&str>) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO sync_state (id, erasure_pending_user) VALUES (1, ?)
            ON CONFLICT (id) DO UPDATE SET erasure_pending_user = excluded.erasure_pending_user
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl AccountStore for SqliteStore {
    async fn load_account(&self) -> Result<Option<AccountConfig>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, display_name, language, currency, is_logged_in, avatar_path
            FROM account_config
            WHERE id = ?
            "#,
        )
        .bind(ACCOUNT_ROW_ID)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let corrupt = |reason: String| StoreError::Corrupt {
            key: "account_config".to_string(),
            reason,
        };
        let language: String = row.try_get("language")?;
        let currency: String = row.try_get("currency")?;

        Ok(Some(AccountConfig {
            id: row.try_get("id")?,
            display_name: row.try_get("display_name")?,
            language: language.parse().map_err(|e| corrupt(format!("{e}")))?,
            currency: currency.parse().map_err(|e| corrupt(format!("{e}")))?,
            is_logged_in: row.try_get("is_logged_in")?,
            avatar_path: row.try_get("avatar_path")?,
        }))
    }

    async fn save_account(&self, config: &AccountConfig) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO account_config (
                id, display_name, language, currency, is_logged_in, avatar_path
            )
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(ACCOUNT_ROW_ID)
        .bind(&config.display_name)
        .bind(config.language.as_str())
        .bind(config.currency.as_str())
        .bind(config.is_logged_in)
        .bind(&config.avatar_path)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_account(&self) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM account_config")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
