//! Field validation for user-submitted transactions.
//!
//! Runs before any store is touched. Every failing field is reported, not
//! only the first one, so a form can highlight all of them at once.

use crate::{error::Result, Error, FieldError, Transaction, TransactionFields};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Longest accepted title, in characters.
pub const MAX_TITLE_LEN: usize = 120;

/// Longest accepted description, in characters.
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// Validate the mirrored field set.
pub fn validate_fields(fields: &TransactionFields) -> Result<()> {
    let errors = field_errors(fields);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(Error::Validation(errors))
    }
}

/// Validate a whole transaction, including its join key.
pub fn validate_transaction(tx: &Transaction) -> Result<()> {
    let mut errors = Vec::new();
    if tx.unique_id.trim().is_empty() {
        errors.push(FieldError::new("uniqueId", "must not be empty"));
    }
    errors.extend(field_errors(&tx.fields));

    if errors.is_empty() {
        Ok(())
    } else {
        Err(Error::Validation(errors))
    }
}

fn field_errors(fields: &TransactionFields) -> Vec<FieldError> {
    let mut errors = Vec::new();

    let title = fields.title.trim();
    if title.is_empty() {
        errors.push(FieldError::new("title", "must not be blank"));
    } else if title.chars().count() > MAX_TITLE_LEN {
        errors.push(FieldError::new(
            "title",
            format!("must be at most {MAX_TITLE_LEN} characters"),
        ));
    }

    if let Some(description) = &fields.description {
        if description.chars().count() > MAX_DESCRIPTION_LEN {
            errors.push(FieldError::new(
                "description",
                format!("must be at most {MAX_DESCRIPTION_LEN} characters"),
            ));
        }
    }

    if fields.amount == Decimal::ZERO {
        errors.push(FieldError::new("amount", "must not be zero"));
    }

    if fields.occurred_at <= DateTime::<Utc>::UNIX_EPOCH {
        errors.push(FieldError::new("occurredAt", "must be a real date"));
    }

    errors
}
