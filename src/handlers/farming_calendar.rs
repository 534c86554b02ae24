// src/handlers/farming_calendar.rs

use std::sync::LazyLock;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use regex::Regex;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::farming_task::{
        CreateTaskRequest, FarmingTask, TaskListParams, TaskStats, TaskTypeCount,
        UpdateTaskRequest,
    },
    utils::jwt::Claims,
};

const TASK_COLUMNS: &str = "id, user_id, title, description, date, task_type, crop, priority, \
                            completed, completed_at, created_at, updated_at";

/// date ascending, high priority first within a day.
const TASK_ORDER: &str =
    "ORDER BY date ASC, CASE priority WHEN 'high' THEN 0 WHEN 'medium' THEN 1 ELSE 2 END";

static MONTH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{2})$").expect("month regex"));

/// Resolves `YYYY-MM` to the UTC interval `[first of month, first of next month)`.
fn parse_month(month: &str) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let caps = MONTH_RE.captures(month)?;
    let year: i32 = caps[1].parse().ok()?;
    let month_num: u32 = caps[2].parse().ok()?;

    let start = NaiveDate::from_ymd_opt(year, month_num, 1)?;
    let end = if month_num == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month_num + 1, 1)?
    };

    Some((
        start.and_time(NaiveTime::MIN).and_utc(),
        end.and_time(NaiveTime::MIN).and_utc(),
    ))
}

/// List the current user's tasks, optionally restricted to one month.
pub async fn list_tasks(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<TaskListParams>,
) -> Result<impl IntoResponse, AppError> {
    let range = match params.month.as_deref() {
        Some(month) => Some(parse_month(month).ok_or_else(|| {
            AppError::BadRequest("Invalid month format, expected YYYY-MM".to_string())
        })?),
        None => None,
    };

    let sql = format!(
        "SELECT {TASK_COLUMNS} FROM farming_tasks \
         WHERE user_id = $1 \
           AND ($2::TIMESTAMPTZ IS NULL OR date >= $2) \
           AND ($3::TIMESTAMPTZ IS NULL OR date < $3) \
         {TASK_ORDER}"
    );

    let tasks = sqlx::query_as::<_, FarmingTask>(&sql)
        .bind(claims.user_id())
        .bind(range.map(|r| r.0))
        .bind(range.map(|r| r.1))
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list farming tasks: {:?}", e);
            AppError::from(e)
        })?;

    Ok(Json(tasks))
}

/// The next 10 incomplete tasks from today onwards.
pub async fn upcoming_tasks(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let today = Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc();

    let sql = format!(
        "SELECT {TASK_COLUMNS} FROM farming_tasks \
         WHERE user_id = $1 AND date >= $2 AND NOT completed \
         {TASK_ORDER} \
         LIMIT 10"
    );

    let tasks = sqlx::query_as::<_, FarmingTask>(&sql)
        .bind(claims.user_id())
        .bind(today)
        .fetch_all(&pool)
        .await?;

    Ok(Json(tasks))
}

/// Create a new farming task.
pub async fn create_task(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateTaskRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let sql = format!(
        "INSERT INTO farming_tasks (user_id, title, description, date, task_type, crop, priority) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING {TASK_COLUMNS}"
    );

    let task = sqlx::query_as::<_, FarmingTask>(&sql)
        .bind(claims.user_id())
        .bind(&payload.title)
        .bind(&payload.description)
        .bind(payload.date)
        .bind(payload.task_type.as_deref().unwrap_or("planting"))
        .bind(&payload.crop)
        .bind(payload.priority.as_deref().unwrap_or("medium"))
        .fetch_one(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create farming task: {:?}", e);
            AppError::from(e)
        })?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": "Farming task created successfully",
            "task": task,
        })),
    ))
}

/// Partial update of an owned task.
pub async fn update_task(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateTaskRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let sql = format!(
        "UPDATE farming_tasks SET \
            title = COALESCE($1, title), \
            description = COALESCE($2, description), \
            date = COALESCE($3, date), \
            task_type = COALESCE($4, task_type), \
            crop = COALESCE($5, crop), \
            priority = COALESCE($6, priority), \
            updated_at = now() \
         WHERE id = $7 AND user_id = $8 \
         RETURNING {TASK_COLUMNS}"
    );

    let task = sqlx::query_as::<_, FarmingTask>(&sql)
        .bind(&payload.title)
        .bind(&payload.description)
        .bind(payload.date)
        .bind(&payload.task_type)
        .bind(&payload.crop)
        .bind(&payload.priority)
        .bind(id)
        .bind(claims.user_id())
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Task not found".to_string()))?;

    Ok(Json(serde_json::json!({
        "message": "Task updated successfully",
        "task": task,
    })))
}

/// Delete an owned task.
pub async fn delete_task(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM farming_tasks WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(claims.user_id())
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Task not found".to_string()));
    }

    Ok(Json(serde_json::json!({
        "message": "Task deleted successfully",
    })))
}

/// Flip completion. `completed_at` is stamped on completion and cleared
/// when the task is reopened.
pub async fn toggle_task(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let sql = format!(
        "UPDATE farming_tasks SET \
            completed = NOT completed, \
            completed_at = CASE WHEN completed THEN NULL ELSE now() END, \
            updated_at = now() \
         WHERE id = $1 AND user_id = $2 \
         RETURNING {TASK_COLUMNS}"
    );

    let task = sqlx::query_as::<_, FarmingTask>(&sql)
        .bind(id)
        .bind(claims.user_id())
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Task not found".to_string()))?;

    Ok(Json(serde_json::json!({
        "message": "Task status updated successfully",
        "task": task,
    })))
}

#[derive(Debug, sqlx::FromRow)]
struct TaskCountsRow {
    total_tasks: i64,
    completed_tasks: i64,
    high_priority_tasks: i64,
}

/// Current-month statistics for the user's tasks.
pub async fn task_stats(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let now = Utc::now();
    let month = format!("{:04}-{:02}", now.year(), now.month());
    let (start, end) = parse_month(&month)
        .ok_or_else(|| AppError::InternalServerError("Failed to compute month bounds".into()))?;

    let counts = sqlx::query_as::<_, TaskCountsRow>(
        "SELECT COUNT(*) AS total_tasks, \
                COUNT(*) FILTER (WHERE completed) AS completed_tasks, \
                COUNT(*) FILTER (WHERE priority = 'high') AS high_priority_tasks \
         FROM farming_tasks \
         WHERE user_id = $1 AND date >= $2 AND date < $3",
    )
    .bind(claims.user_id())
    .bind(start)
    .bind(end)
    .fetch_one(&pool)
    .await?;

    let tasks_by_type = sqlx::query_as::<_, TaskTypeCount>(
        "SELECT task_type, COUNT(*) AS count \
         FROM farming_tasks \
         WHERE user_id = $1 AND date >= $2 AND date < $3 \
         GROUP BY task_type \
         ORDER BY task_type",
    )
    .bind(claims.user_id())
    .bind(start)
    .bind(end)
    .fetch_all(&pool)
    .await?;

    Ok(Json(TaskStats {
        total_tasks: counts.total_tasks,
        completed_tasks: counts.completed_tasks,
        high_priority_tasks: counts.high_priority_tasks,
        tasks_by_type,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_parses_to_utc_interval() {
        let (start, end) = parse_month("2025-06").unwrap();
        assert_eq!(start.to_rfc3339(), "2025-06-01T00:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2025-07-01T00:00:00+00:00");
    }

    #[test]
    fn december_rolls_into_next_year() {
        let (_, end) = parse_month("2024-12").unwrap();
        assert_eq!(end.to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }

    #[test]
    fn month_rejects_garbage() {
        assert!(parse_month("2025-13").is_none());
        assert!(parse_month("2025-00").is_none());
        assert!(parse_month("last-june").is_none());
        assert!(parse_month("2025-6").is_none());
    }
}
