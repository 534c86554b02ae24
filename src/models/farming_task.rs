// src/models/farming_task.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'farming_tasks' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct FarmingTask {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub date: chrono::DateTime<chrono::Utc>,
    pub task_type: String,
    pub crop: String,
    pub priority: String,
    pub completed: bool,

    /// Stamped when the task is toggled complete, cleared when toggled back.
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,

    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for creating a new farming task.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 100, message = "Title cannot exceed 100 characters"))]
    pub title: String,

    #[validate(length(max = 500, message = "Description cannot exceed 500 characters"))]
    pub description: Option<String>,

    pub date: chrono::DateTime<chrono::Utc>,

    #[validate(custom(function = validate_task_type))]
    pub task_type: Option<String>,

    #[validate(length(min = 1, message = "Crop name is required"))]
    pub crop: String,

    #[validate(custom(function = validate_priority))]
    pub priority: Option<String>,
}

/// DTO for updating a task. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 100, message = "Title cannot exceed 100 characters"))]
    pub title: Option<String>,

    #[validate(length(max = 500, message = "Description cannot exceed 500 characters"))]
    pub description: Option<String>,

    pub date: Option<chrono::DateTime<chrono::Utc>>,

    #[validate(custom(function = validate_task_type))]
    pub task_type: Option<String>,

    #[validate(length(min = 1, message = "Crop name is required"))]
    pub crop: Option<String>,

    #[validate(custom(function = validate_priority))]
    pub priority: Option<String>,
}

/// Query parameters for listing tasks.
#[derive(Debug, Deserialize)]
pub struct TaskListParams {
    /// Restrict to a calendar month, format `YYYY-MM`.
    pub month: Option<String>,
}

/// Per-type count bucket for the stats endpoint.
#[derive(Debug, Serialize, FromRow)]
pub struct TaskTypeCount {
    pub task_type: String,
    pub count: i64,
}

/// Aggregated current-month task statistics.
#[derive(Debug, Serialize)]
pub struct TaskStats {
    pub total_tasks: i64,
    pub completed_tasks: i64,
    pub high_priority_tasks: i64,
    pub tasks_by_type: Vec<TaskTypeCount>,
}

pub const TASK_TYPES: [&str; 6] = [
    "planting",
    "irrigation",
    "fertilization",
    "pest_control",
    "harvesting",
    "soil_preparation",
];

fn validate_task_type(task_type: &str) -> Result<(), validator::ValidationError> {
    if !TASK_TYPES.contains(&task_type) {
        return Err(validator::ValidationError::new("invalid_task_type")
            .with_message("Unknown task type".into()));
    }
    Ok(())
}

fn validate_priority(priority: &str) -> Result<(), validator::ValidationError> {
    if !["low", "medium", "high"].contains(&priority) {
        return Err(validator::ValidationError::new("invalid_priority")
            .with_message("Priority must be low, medium or high".into()));
    }
    Ok(())
}
