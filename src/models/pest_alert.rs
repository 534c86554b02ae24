// src/models/pest_alert.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A 'pest_alerts' row as served: poster info and comment count joined in.
#[derive(Debug, Serialize, FromRow)]
pub struct AlertSummary {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub severity: String,
    pub crop: String,
    pub location: String,
    pub symptoms: Vec<String>,
    pub control_measures: Vec<String>,
    pub status: String,
    pub image: Option<String>,
    pub posted_by: i64,
    pub posted_by_name: String,
    pub posted_by_email: String,
    pub comments_count: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Comment row with its author's name joined in.
#[derive(Debug, Serialize, FromRow)]
pub struct AlertComment {
    pub id: i64,
    pub alert_id: i64,
    pub user_id: i64,
    pub user_name: String,
    pub text: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Detail view: the alert plus its comments.
#[derive(Debug, Serialize)]
pub struct AlertDetail {
    #[serde(flatten)]
    pub alert: AlertSummary,
    pub comments: Vec<AlertComment>,
}

/// Text fields of an alert, collected from the multipart form.
/// `symptoms` / `control_measures` arrive as JSON-encoded arrays.
#[derive(Debug, Default, Validate)]
pub struct AlertForm {
    #[validate(length(min = 1, max = 100, message = "Title cannot exceed 100 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 500, message = "Description cannot exceed 500 characters"))]
    pub description: Option<String>,
    #[validate(custom(function = validate_severity))]
    pub severity: Option<String>,
    #[validate(length(min = 1, message = "Crop is required"))]
    pub crop: Option<String>,
    #[validate(length(min = 1, message = "Location is required"))]
    pub location: Option<String>,
    pub symptoms: Option<String>,
    pub control_measures: Option<String>,
    #[validate(custom(function = validate_alert_status))]
    pub status: Option<String>,
}

/// DTO for commenting on an alert.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAlertCommentRequest {
    #[validate(length(min = 1, max = 1000, message = "Comment text is required"))]
    pub text: String,
}

/// DTO for the status sub-resource.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateAlertStatusRequest {
    #[validate(custom(function = validate_alert_status))]
    pub status: String,
}

pub fn validate_severity(severity: &str) -> Result<(), validator::ValidationError> {
    if !["info", "warning", "error"].contains(&severity) {
        return Err(validator::ValidationError::new("invalid_severity")
            .with_message("Severity must be info, warning or error".into()));
    }
    Ok(())
}

pub fn validate_alert_status(status: &str) -> Result<(), validator::ValidationError> {
    if !["active", "monitoring", "resolved", "critical"].contains(&status) {
        return Err(validator::ValidationError::new("invalid_status")
            .with_message("Status must be active, monitoring, resolved or critical".into()));
    }
    Ok(())
}
