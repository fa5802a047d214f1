//! Request handlers for the document collection and user profiles.

mod documents;
mod profiles;

pub use documents::*;
pub use profiles::*;
