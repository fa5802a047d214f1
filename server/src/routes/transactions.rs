//! Transaction document routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use lumen_engine::{DocumentBody, RemoteDoc};

use crate::auth::AuthUser;
use crate::error::Result;
use crate::handlers::{
    handle_add, handle_delete, handle_find, handle_list, handle_update, RefResponse,
};
use crate::AppState;

/// Create document routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/transactions", get(list_handler).post(add_handler))
        .route(
            "/transactions/{remote_ref}",
            axum::routing::put(update_handler).delete(delete_handler),
        )
        .route("/transactions/by-unique-id/{unique_id}", get(find_handler))
}

/// GET /transactions - Every document of the caller.
async fn list_handler(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Vec<RemoteDoc>>> {
    let docs = handle_list(&state.pool, &auth.user_id).await?;
    Ok(Json(docs))
}

/// POST /transactions - Create a document.
async fn add_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<DocumentBody>,
) -> Result<(StatusCode, Json<RefResponse>)> {
    let created = handle_add(&state.pool, &auth.user_id, body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /transactions/{remote_ref} - Replace a document's fields.
async fn update_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(remote_ref): Path<String>,
    Json(body): Json<DocumentBody>,
) -> Result<StatusCode> {
    handle_update(&state.pool, &auth.user_id, &remote_ref, body).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /transactions/{remote_ref} - Delete a document.
async fn delete_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(remote_ref): Path<String>,
) -> Result<StatusCode> {
    handle_delete(&state.pool, &auth.user_id, &remote_ref).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /transactions/by-unique-id/{unique_id} - Look up a handle.
async fn find_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(unique_id): Path<String>,
) -> Result<Json<RefResponse>> {
    let found = handle_find(&state.pool, &auth.user_id, &unique_id).await?;
    Ok(Json(found))
}
