//! Error types for the Lumen client runtime.

use crate::config::ConfigError;
use crate::remote::RemoteError;
use crate::store::StoreError;
use lumen_engine::UniqueId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shown when a failure carries no usable message of its own.
pub const DEFAULT_ERROR_MESSAGE: &str = "Something went wrong. Please try again.";

/// A remote write that failed for one record during a sync pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordFailure {
    pub unique_id: UniqueId,
    pub message: String,
}

/// All possible errors from the client runtime.
#[derive(Debug, Error)]
pub enum Error {
    /// Local store failure; fatal for the current operation
    #[error("local store failure: {0}")]
    Store(#[from] StoreError),

    /// Remote mirror rejected the call, timed out, or was unreachable
    #[error("remote mirror failure: {0}")]
    Remote(#[from] RemoteError),

    /// Some per-record operations of a sync pass failed; the rest completed
    #[error("{} of {attempted} sync operations failed", .failures.len())]
    PartialSync {
        attempted: usize,
        failures: Vec<RecordFailure>,
    },

    /// Rejected before any store was contacted
    #[error(transparent)]
    Invalid(#[from] lumen_engine::Error),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("not signed in")]
    NotAuthenticated,

    #[error("transaction not found: {0}")]
    NotFound(UniqueId),

    #[error("account session closed")]
    SessionClosed,
}

impl Error {
    /// Message suitable for direct display. Falls back to a default when
    /// the failing collaborator gave nothing useful.
    pub fn user_message(&self) -> String {
        let message = match self {
            Error::Remote(e) => e.message(),
            Error::PartialSync { failures, .. } => failures
                .iter()
                .map(|f| f.message.trim())
                .find(|m| !m.is_empty())
                .unwrap_or_default()
                .to_string(),
            other => other.to_string(),
        };

        if message.trim().is_empty() {
            DEFAULT_ERROR_MESSAGE.to_string()
        } else {
            message
        }
    }

    /// Whether the failure came from the remote side only.
    pub fn is_remote(&self) -> bool {
        matches!(self, Error::Remote(_) | Error::PartialSync { .. })
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;
