//! Error types for the Lumen engine.

use crate::UniqueId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single rejected field, reported back to the form that submitted it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldError {
    /// Name of the offending field (`title`, `amount`, ...)
    pub field: String,
    /// Human-readable reason
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// All possible errors from the Lumen engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Input errors
    #[error("invalid transaction: {}", join_fields(.0))]
    Validation(Vec<FieldError>),

    #[error("unknown transaction kind: {0}")]
    UnknownKind(String),

    #[error("unknown category: {0}")]
    UnknownCategory(String),

    #[error("unknown language: {0}")]
    UnknownLanguage(String),

    #[error("unknown currency: {0}")]
    UnknownCurrency(String),

    #[error("'ALL' is a filter value and cannot be stored on a transaction")]
    FilterKindNotStorable,

    // Filter errors
    #[error("inverted {field} range: lower bound is above upper bound")]
    InvertedRange { field: &'static str },

    // Reconciliation input errors
    #[error("duplicate unique id in local set: {0}")]
    DuplicateLocalId(UniqueId),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    // Aggregation errors
    #[error("amount total out of range at transaction {0}")]
    AmountOverflow(UniqueId),
}

impl Error {
    /// Field errors carried by a validation failure, empty otherwise.
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            Error::Validation(fields) => fields,
            _ => &[],
        }
    }
}

fn join_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
