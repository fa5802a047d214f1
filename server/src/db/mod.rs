//! Database module for PostgreSQL persistence.

mod documents;
mod pool;
mod profiles;

pub use documents::*;
pub use pool::*;
pub use profiles::*;
