//! Database operations for the user_profiles table.

use lumen_engine::UserProfile;
use sqlx::{PgPool, Row};

/// A stored profile row.
#[derive(Debug)]
pub struct StoredProfile {
    pub user_id: String,
    pub display_name: Option<String>,
    pub language: String,
    pub currency: String,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredProfile {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(StoredProfile {
            user_id: row.try_get("user_id")?,
            display_name: row.try_get("display_name")?,
            language: row.try_get("language")?,
            currency: row.try_get("currency")?,
        })
    }
}

impl StoredProfile {
    pub fn to_profile(&self) -> Result<UserProfile, lumen_engine::Error> {
        Ok(UserProfile {
            display_name: self.display_name.clone(),
            language: self.language.parse()?,
            currency: self.currency.parse()?,
        })
    }
}

pub async fn get_profile(pool: &PgPool, user_id: &str) -> Result<Option<StoredProfile>, sqlx::Error> {
    sqlx::query_as::<_, StoredProfile>(
        r#"
        SELECT user_id, display_name, language, currency
        FROM user_profiles
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Store `profile` unless the user already has one, then return whichever
/// profile is stored.
pub async fn insert_profile_if_missing(
    pool: &PgPool,
    user_id: &str,
    profile: &UserProfile,
) -> Result<StoredProfile, sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO user_profiles (user_id, display_name, language, currency)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (user_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(&profile.display_name)
    .bind(profile.language.as_str())
    .bind(profile.currency.as_str())
    .execute(pool)
    .await?;

    get_profile(pool, user_id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}

/// Overwrite a profile. Returns false if the user has none.
pub async fn update_profile(pool: &PgPool, user_id: &str, profile: &UserProfile) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE user_profiles SET
            display_name = $2,
            language = $3,
            currency = $4,
            updated_at = now()
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .bind(&profile.display_name)
    .bind(profile.language.as_str())
    .bind(profile.currency.as_str())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete a profile. Returns false if there was nothing to delete.
pub async fn delete_profile(pool: &PgPool, user_id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM user_profiles WHERE user_id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
