// src/handlers/dashboard.rs

use axum::{Json, extract::State, response::IntoResponse};
use serde::Serialize;
use sqlx::PgPool;

use crate::error::AppError;

/// Home dashboard counters. Keys are camelCase on the wire.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub active_alerts: i64,
    pub pending_questions: i64,
    pub active_crops: i64,
    pub total_tasks: i64,
}

/// Assembles the four dashboard counters.
///
/// The alert counter propagates failure; the remaining three degrade to 0
/// with a warning, preserving the original's per-model fallback.
pub async fn stats(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let active_alerts = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM pest_alerts WHERE status IN ('active', 'critical')",
    )
    .fetch_one(&pool)
    .await?;

    let pending_questions =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM questions WHERE status = 'pending'")
            .fetch_one(&pool)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("Pending question count failed: {}", e);
                0
            });

    let active_crops = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(DISTINCT crop) FROM farming_tasks WHERE NOT completed",
    )
    .fetch_one(&pool)
    .await
    .unwrap_or_else(|e| {
        tracing::warn!("Active crop count failed: {}", e);
        0
    });

    let total_tasks =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM farming_tasks WHERE NOT completed")
            .fetch_one(&pool)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("Task count failed: {}", e);
                0
            });

    Ok(Json(DashboardStats {
        active_alerts,
        pending_questions,
        active_crops,
        total_tasks,
    }))
}
