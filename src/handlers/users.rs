// src/handlers/users.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::user::{UpdateProfileRequest, User},
    utils::jwt::Claims,
};

/// Updates the current user's profile.
/// Fields are applied sequentially if present.
pub async fn update_profile(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user_id = claims.user_id();

    // Check existence
    sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    if let Some(name) = payload.name {
        sqlx::query("UPDATE users SET name = $1 WHERE id = $2")
            .bind(name)
            .bind(user_id)
            .execute(&pool)
            .await?;
    }

    if let Some(phone) = payload.phone {
        sqlx::query("UPDATE users SET phone = $1 WHERE id = $2")
            .bind(phone)
            .bind(user_id)
            .execute(&pool)
            .await?;
    }

    if let Some(location) = payload.location {
        sqlx::query("UPDATE users SET location = $1 WHERE id = $2")
            .bind(location)
            .bind(user_id)
            .execute(&pool)
            .await?;
    }

    if let Some(preferences) = payload.preferences {
        sqlx::query("UPDATE users SET preferences = $1 WHERE id = $2")
            .bind(preferences)
            .bind(user_id)
            .execute(&pool)
            .await?;
    }

    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, name, email, password, phone, location, role, preferences, created_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .fetch_one(&pool)
    .await?;

    Ok(Json(json!({
        "message": "Profile updated successfully",
        "user": user,
    })))
}
