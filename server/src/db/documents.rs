//! Database operations for the transaction_documents table.

use chrono::{DateTime, Utc};
use lumen_engine::{DocumentBody, RemoteDoc, TransactionFields};
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// A stored document row from the database.
#[derive(Debug)]
pub struct StoredDocument {
    pub remote_ref: Uuid,
    pub user_id: String,
    pub unique_id: String,
    pub title: String,
    pub description: Option<String>,
    pub amount: Decimal,
    pub occurred_at: DateTime<Utc>,
    pub kind: String,
    pub category: String,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredDocument {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(StoredDocument {
            remote_ref: row.try_get("remote_ref")?,
            user_id: row.try_get("user_id")?,
            unique_id: row.try_get("unique_id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            amount: row.try_get("amount")?,
            occurred_at: row.try_get("occurred_at")?,
            kind: row.try_get("kind")?,
            category: row.try_get("category")?,
        })
    }
}

impl StoredDocument {
    /// Convert database row to an engine document.
    pub fn to_remote_doc(&self) -> Result<RemoteDoc, lumen_engine::Error> {
        Ok(RemoteDoc {
            remote_ref: self.remote_ref.to_string(),
            user_id: self.user_id.clone(),
            unique_id: self.unique_id.clone(),
            fields: TransactionFields {
                title: self.title.clone(),
                description: self.description.clone(),
                amount: self.amount,
                occurred_at: self.occurred_at,
                kind: self.kind.parse()?,
                category: self.category.parse()?,
            },
        })
    }
}

/// All documents owned by a user.
pub async fn list_documents(pool: &PgPool, user_id: &str) -> Result<Vec<StoredDocument>, sqlx::Error> {
    sqlx::query_as::<_, StoredDocument>(
        r#"
        SELECT remote_ref, user_id, unique_id, title, description, amount,
               occurred_at, kind, category
        FROM transaction_documents
        WHERE user_id = $1
        ORDER BY unique_id, remote_ref
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Insert a new document and return its handle.
pub async fn insert_document(
    pool: &PgPool,
    user_id: &str,
    body: &DocumentBody,
) -> Result<Uuid, sqlx::Error> {
    let remote_ref = Uuid::new_v4();
    let fields = &body.fields;

    sqlx::query(
        r#"
        INSERT INTO transaction_documents (
            remote_ref, user_id, unique_id, title, description, amount,
            occurred_at, kind, category
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(remote_ref)
    .bind(user_id)
    .bind(&body.unique_id)
    .bind(&fields.title)
    .bind(&fields.description)
    .bind(fields.amount)
    .bind(fields.occurred_at)
    .bind(fields.kind.as_str())
    .bind(fields.category.as_str())
    .execute(pool)
    .await?;

    Ok(remote_ref)
}

/// Replace the fields of a document. Returns false if the user owns no
/// document with that handle.
pub async fn update_document(
    pool: &PgPool,
    user_id: &str,
    remote_ref: Uuid,
    body: &DocumentBody,
) -> Result<bool, sqlx::Error> {
    let fields = &body.fields;

    let result = sqlx::query(
        r#"
        UPDATE transaction_documents SET
            unique_id = $3,
            title = $4,
            description = $5,
            amount = $6,
            occurred_at = $7,
            kind = $8,
            category = $9,
            updated_at = now()
        WHERE remote_ref = $1 AND user_id = $2
        "#,
    )
    .bind(remote_ref)
    .bind(user_id)
    .bind(&body.unique_id)
    .bind(&fields.title)
    .bind(&fields.description)
    .bind(fields.amount)
    .bind(fields.occurred_at)
    .bind(fields.kind.as_str())
    .bind(fields.category.as_str())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete a document. Returns false if there was nothing to delete.
pub async fn delete_document(pool: &PgPool, user_id: &str, remote_ref: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        DELETE FROM transaction_documents
        WHERE remote_ref = $1 AND user_id = $2
        "#,
    )
    .bind(remote_ref)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Handle of the oldest document carrying `unique_id`.
pub async fn find_by_unique_id(
    pool: &PgPool,
    user_id: &str,
    unique_id: &str,
) -> Result<Option<Uuid>, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT remote_ref
        FROM transaction_documents
        WHERE user_id = $1 AND unique_id = $2
        ORDER BY created_at, remote_ref
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .bind(unique_id)
    .fetch_optional(pool)
    .await
}
