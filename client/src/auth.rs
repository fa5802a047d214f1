//! Signed-in state as seen by the coordinator.

use lumen_engine::UserId;

/// Account/auth collaborator. Implemented by
/// [`AccountSession`](crate::session::AccountSession).
pub trait AuthState: Send + Sync {
    fn current_user_id(&self) -> Option<UserId>;

    fn is_logged_in(&self) -> bool {
        self.current_user_id().is_some()
    }
}
