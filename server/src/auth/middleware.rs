//! Request authentication.
//!
//! The bearer token is the user id that scopes every document operation.
//! When `AUTH_SECRET` is configured, callers must also present it in the
//! `x-mirror-key` header.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::error::AppError;
use crate::AppState;

/// Header carrying the shared mirror key.
pub const MIRROR_KEY_HEADER: &str = "x-mirror-key";

/// Authenticated user extracted from request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    /// Owner of every document the request touches
    pub user_id: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(secret) = &state.config.auth_secret {
            let presented = parts
                .headers
                .get(MIRROR_KEY_HEADER)
                .and_then(|value| value.to_str().ok());
            if presented != Some(secret.as_str()) {
                return Err(AppError::Unauthorized("Missing or invalid mirror key"));
            }
        }

        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        match auth_header {
            Some(header) if header.starts_with("Bearer ") => {
                let user_id = header.trim_start_matches("Bearer ").trim();
                if user_id.is_empty() {
                    return Err(AppError::Unauthorized("Empty bearer token"));
                }
                Ok(AuthUser {
                    user_id: user_id.to_string(),
                })
            }
            Some(_) => Err(AppError::Unauthorized(
                "Invalid authorization header format",
            )),
            None => Err(AppError::Unauthorized("Missing authorization header")),
        }
    }
}
