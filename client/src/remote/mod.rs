//! The remote mirror: a per-user document collection plus one shared
//! profile per user.

mod http;

pub use http::HttpMirror;

use async_trait::async_trait;
use lumen_engine::{DocumentBody, RemoteDoc, RemoteRef, UserProfile};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single remote call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    /// The mirror answered with a non-success status
    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("remote call timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("{0}")]
    Transport(String),

    #[error("no network connection")]
    Offline,
}

impl RemoteError {
    /// Collaborator-supplied message, possibly blank.
    pub fn message(&self) -> String {
        match self {
            RemoteError::Rejected { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::Rejected { status: 404, .. })
    }
}

/// Remote collection contract. Every call is scoped to `user_id`.
#[async_trait]
pub trait RemoteMirror: Send + Sync {
    /// All documents owned by the user.
    async fn query_by_user(&self, user_id: &str) -> Result<Vec<RemoteDoc>, RemoteError>;

    /// Create a document and return its handle.
    async fn add(&self, user_id: &str, body: &DocumentBody) -> Result<RemoteRef, RemoteError>;

    /// Replace the fields of an existing document.
    async fn update(
        &self,
        user_id: &str,
        remote_ref: &str,
        body: &DocumentBody,
    ) -> Result<(), RemoteError>;

    /// Delete a document. Deleting a missing document succeeds.
    async fn delete(&self, user_id: &str, remote_ref: &str) -> Result<(), RemoteError>;

    /// Handle of the document carrying `unique_id`, if any.
    async fn find_by_unique_id(
        &self,
        user_id: &str,
        unique_id: &str,
    ) -> Result<Option<RemoteRef>, RemoteError>;
}

/// Remote profile contract. Every call is scoped to `user_id`.
#[async_trait]
pub trait ProfileMirror: Send + Sync {
    /// The stored profile, if the user has one.
    async fn fetch_profile(&self, user_id: &str) -> Result<Option<UserProfile>, RemoteError>;

    /// Store `profile` unless the user already has one. Returns the stored
    /// profile, which may differ from `profile`.
    async fn ensure_profile(
        &self,
        user_id: &str,
        profile: &UserProfile,
    ) -> Result<UserProfile, RemoteError>;

    /// Overwrite the stored profile. A missing profile is a 404 rejection.
    async fn save_profile(&self, user_id: &str, profile: &UserProfile) -> Result<(), RemoteError>;

    /// Delete the stored profile. Deleting a missing profile succeeds.
    async fn delete_profile(&self, user_id: &str) -> Result<(), RemoteError>;
}

/// Run one remote call under a deadline. A timeout is an ordinary failure
/// of that call.
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, RemoteError>
where
    F: Future<Output = Result<T, RemoteError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(RemoteError::Timeout(limit)),
    }
}
