//! Profile handlers - one shared profile per user.

use crate::db;
use crate::error::{AppError, Result};
use lumen_engine::UserProfile;
use sqlx::PgPool;

pub fn validate_profile(profile: &UserProfile) -> Result<()> {
    match &profile.display_name {
        Some(name) if name.trim().is_empty() => Err(AppError::BadRequest(
            "displayName must not be blank".to_string(),
        )),
        _ => Ok(()),
    }
}

fn read_profile(stored: &db::StoredProfile) -> Result<UserProfile> {
    stored.to_profile().map_err(|e| AppError::CorruptProfile {
        user_id: stored.user_id.clone(),
        reason: e.to_string(),
    })
}

/// The caller's profile.
pub async fn handle_get_profile(pool: &PgPool, user_id: &str) -> Result<UserProfile> {
    let stored = db::get_profile(pool, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("profile of {user_id}")))?;
    read_profile(&stored)
}

/// Create the caller's profile from `profile` if it has none. Answers with
/// the stored profile, which wins over the submitted one.
pub async fn handle_ensure_profile(pool: &PgPool, user_id: &str, profile: UserProfile) -> Result<UserProfile> {
    validate_profile(&profile)?;
    let stored = db::insert_profile_if_missing(pool, user_id, &profile).await?;

    tracing::debug!(user_id = %user_id, "Ensured profile");
    read_profile(&stored)
}

/// Overwrite the caller's existing profile.
pub async fn handle_update_profile(pool: &PgPool, user_id: &str, profile: UserProfile) -> Result<()> {
    validate_profile(&profile)?;
    if !db::update_profile(pool, user_id, &profile).await? {
        return Err(AppError::NotFound(format!("profile of {user_id}")));
    }

    tracing::debug!(user_id = %user_id, "Updated profile");
    Ok(())
}

/// Delete the caller's profile. Deleting a missing profile succeeds.
pub async fn handle_delete_profile(pool: &PgPool, user_id: &str) -> Result<()> {
    let deleted = db::delete_profile(pool, user_id).await?;
    tracing::debug!(user_id = %user_id, deleted, "Deleted profile");
    Ok(())
}
