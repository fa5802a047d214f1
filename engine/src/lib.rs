//! # Lumen Engine
//!
//! The domain core of Lumen, an offline-first personal finance tracker.
//!
//! This crate owns the transaction model and the logic that keeps the
//! on-device store and the remote mirror of a signed-in user in agreement.
//! It performs no IO: stores, network and clocks belong to the caller.
//!
//! ## Design Principles
//!
//! - **No IO**: the engine only sees values handed to it
//! - **Deterministic**: the same local and remote sets always produce the
//!   same plan, in the same order
//! - **Strict storage types**: values that only make sense in a UI (the
//!   `ALL` kind filter) cannot reach a stored record
//!
//! ## Core Concepts
//!
//! ### Transactions
//!
//! A [`Transaction`] carries a client-generated `unique_id`, the join key
//! between its local and remote copies, plus a `synced` flag that is true
//! iff the local copy is believed to match the remote one. The remote copy
//! is a [`RemoteDoc`] tagged with the owning user.
//!
//! ### Reconciliation
//!
//! The [`Reconciler`] diffs the two sets by unique id and returns a
//! [`ReconcilePlan`]:
//! - [`SyncAction::PushAdd`] / [`SyncAction::PushUpdate`] for local records
//!   that are missing remotely or carry unsynced edits
//! - [`SyncAction::DeleteRemote`] for remote documents gone locally
//! - [`SyncAction::Hydrate`] when an empty local store meets a populated
//!   remote (never treated as a mass delete)
//!
//! ## Quick Start
//!
//! ```rust
//! use lumen_engine::{
//!     Category, Reconciler, SyncAction, Transaction, TransactionFields, TransactionKind,
//! };
//! use chrono::{TimeZone, Utc};
//! use rust_decimal::Decimal;
//!
//! let fields = TransactionFields::new(
//!     "Groceries",
//!     Decimal::new(4_250, 2),
//!     Utc.with_ymd_and_hms(2024, 3, 1, 18, 0, 0).unwrap(),
//!     TransactionKind::Expense,
//!     Category::Food,
//! );
//! let local = vec![Transaction::new(fields)];
//!
//! let plan = Reconciler::new(&local, &[]).plan().unwrap();
//! assert!(!plan.is_converged());
//! assert!(matches!(plan.actions[0], SyncAction::PushAdd { .. }));
//! ```
//!
//! ## FFI
//!
//! The [`ffi`] module exposes the planner, filtering, summaries and
//! validation to the mobile shell. All data is exchanged as JSON strings.

pub mod account;
pub mod error;
pub mod ffi;
pub mod filter;
pub mod reconcile;
pub mod summary;
pub mod transaction;
pub mod validate;

// Re-export main types at crate root
pub use account::{AccountConfig, AccountPatch, Currency, Language, UserProfile, ACCOUNT_ROW_ID};
pub use error::{Error, FieldError};
pub use filter::{Bounds, KindFilter, TransactionFilter};
pub use reconcile::{PassKind, ReconcilePlan, Reconciler, SyncAction};
pub use summary::{Month, Summary};
pub use transaction::{
    stored_precision, Category, DocumentBody, RemoteDoc, Transaction, TransactionFields, TransactionKind,
    TIMESTAMP_SUBSEC_DIGITS,
};
pub use validate::{validate_fields, validate_transaction};

/// Type aliases for clarity
pub type UniqueId = String;
pub type RemoteRef = String;
pub type UserId = String;
pub type LocalId = i64;

/// Engine version, reported by the mirror's health endpoint.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
