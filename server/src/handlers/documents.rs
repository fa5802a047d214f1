//! Document handlers - the mirror contract over the database.

use crate::db;
use crate::error::{AppError, Result};
use lumen_engine::{validate_fields, DocumentBody, RemoteDoc, RemoteRef};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Response carrying a document handle.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RefResponse {
    pub remote_ref: RemoteRef,
}

/// Reject a body before it reaches the database.
pub fn validate_body(body: &DocumentBody) -> Result<()> {
    if body.unique_id.trim().is_empty() {
        return Err(AppError::BadRequest("uniqueId must not be empty".to_string()));
    }
    validate_fields(&body.fields)?;
    Ok(())
}

/// Document handles are UUIDs; anything else names no document.
fn parse_ref(remote_ref: &str) -> Option<Uuid> {
    Uuid::parse_str(remote_ref).ok()
}

/// All documents owned by `user_id`.
pub async fn handle_list(pool: &PgPool, user_id: &str) -> Result<Vec<RemoteDoc>> {
    let stored = db::list_documents(pool, user_id).await?;

    // A partial list would make clients delete the missing documents.
    let docs = stored
        .iter()
        .map(|row| {
            row.to_remote_doc().map_err(|e| AppError::CorruptDocument {
                remote_ref: row.remote_ref.to_string(),
                reason: e.to_string(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    tracing::debug!(user_id = %user_id, count = docs.len(), "Listed documents");
    Ok(docs)
}

/// Create a document.
pub async fn handle_add(pool: &PgPool, user_id: &str, body: DocumentBody) -> Result<RefResponse> {
    validate_body(&body)?;
    let remote_ref = db::insert_document(pool, user_id, &body).await?;

    tracing::debug!(user_id = %user_id, unique_id = %body.unique_id, %remote_ref, "Added document");
    Ok(RefResponse {
        remote_ref: remote_ref.to_string(),
    })
}

/// Replace the fields of an existing document.
pub async fn handle_update(
    pool: &PgPool,
    user_id: &str,
    remote_ref: &str,
    body: DocumentBody,
) -> Result<()> {
    validate_body(&body)?;
    let not_found = || AppError::NotFound(format!("document {remote_ref}"));

    let id = parse_ref(remote_ref).ok_or_else(not_found)?;
    if !db::update_document(pool, user_id, id, &body).await? {
        return Err(not_found());
    }

    tracing::debug!(user_id = %user_id, unique_id = %body.unique_id, %remote_ref, "Updated document");
    Ok(())
}

/// Delete a document. Deleting a missing document succeeds.
pub async fn handle_delete(pool: &PgPool, user_id: &str, remote_ref: &str) -> Result<()> {
    let Some(id) = parse_ref(remote_ref) else {
        return Ok(());
    };

    let deleted = db::delete_document(pool, user_id, id).await?;
    tracing::debug!(user_id = %user_id, %remote_ref, deleted, "Deleted document");
    Ok(())
}

/// Handle of the document carrying `unique_id`.
pub async fn handle_find(pool: &PgPool, user_id: &str, unique_id: &str) -> Result<RefResponse> {
    db::find_by_unique_id(pool, user_id, unique_id)
        .await?
        .map(|id| RefResponse {
            remote_ref: id.to_string(),
        })
        .ok_or_else(|| AppError::NotFound(format!("no document with unique id {unique_id}")))
}
