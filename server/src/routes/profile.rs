//! Shared profile routes.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use lumen_engine::UserProfile;

use crate::auth::AuthUser;
use crate::error::Result;
use crate::handlers::{handle_delete_profile, handle_ensure_profile, handle_get_profile, handle_update_profile};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/profile",
        get(get_handler)
            .post(ensure_handler)
            .put(update_handler)
            .delete(delete_handler),
    )
}

/// GET /profile - The caller's profile, 404 if there is none.
async fn get_handler(State(state): State<AppState>, auth: AuthUser) -> Result<Json<UserProfile>> {
    Ok(Json(handle_get_profile(&state.pool, &auth.user_id).await?))
}

/// POST /profile - Create the profile if missing; answers with the stored one.
async fn ensure_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(profile): Json<UserProfile>,
) -> Result<Json<UserProfile>> {
    Ok(Json(handle_ensure_profile(&state.pool, &auth.user_id, profile).await?))
}

/// PUT /profile - Overwrite an existing profile.
async fn update_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(profile): Json<UserProfile>,
) -> Result<StatusCode> {
    handle_update_profile(&state.pool, &auth.user_id, profile).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /profile
async fn delete_handler(State(state): State<AppState>, auth: AuthUser) -> Result<StatusCode> {
    handle_delete_profile(&state.pool, &auth.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
