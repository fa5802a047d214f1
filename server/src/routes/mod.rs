//! HTTP route definitions.

mod health;
mod profile;
mod transactions;

use crate::AppState;
use axum::Router;

/// Create all application routes.
pub fn create_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(transactions::routes())
        .merge(profile::routes())
}
