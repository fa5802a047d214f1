//! Request state published to the UI for each async operation.

use crate::error::Error;

/// `Idle → Loading → {Success | Error}` for one kind of request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RequestState<T> {
    #[default]
    Idle,
    Loading,
    Success(T),
    /// Display-ready message
    Error(String),
}

impl<T> RequestState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, RequestState::Loading)
    }

    pub fn success(&self) -> Option<&T> {
        match self {
            RequestState::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            RequestState::Error(message) => Some(message),
            _ => None,
        }
    }

    /// Terminal state for a finished request.
    pub fn from_result(result: &Result<T, Error>) -> Self
    where
        T: Clone,
    {
        match result {
            Ok(value) => RequestState::Success(value.clone()),
            Err(e) => RequestState::Error(e.user_message()),
        }
    }
}
