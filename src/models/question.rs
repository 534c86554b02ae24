// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Question row with asker/expert info and interaction counts joined in.
#[derive(Debug, Serialize, FromRow)]
pub struct QuestionSummary {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category: String,
    pub crop: String,
    pub urgency: String,
    pub status: String,
    pub asked_by: i64,
    pub asked_by_name: String,
    pub asked_by_location: Option<String>,
    pub expert_id: Option<i64>,
    pub expert_name: Option<String>,
    pub expert_role: Option<String>,
    pub answer: Option<String>,
    pub answer_date: Option<chrono::DateTime<chrono::Utc>>,
    pub images: Vec<String>,
    pub tags: Vec<String>,
    pub views: i32,
    pub likes_count: i64,
    pub comments_count: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Comment row with author info and like count joined in.
#[derive(Debug, Serialize, FromRow)]
pub struct QuestionComment {
    pub id: i64,
    pub question_id: i64,
    pub author_id: i64,
    pub author_name: String,
    pub author_role: String,
    pub text: String,
    pub is_expert_response: bool,
    pub likes_count: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Detail view: the question plus its comment thread.
#[derive(Debug, Serialize)]
pub struct QuestionDetail {
    #[serde(flatten)]
    pub question: QuestionSummary,
    pub comments: Vec<QuestionComment>,
}

/// DTO for asking a new question.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 200, message = "Title cannot exceed 200 characters"))]
    pub title: String,

    #[validate(length(min = 1, max = 2000, message = "Description cannot exceed 2000 characters"))]
    pub description: String,

    #[validate(custom(function = validate_question_category))]
    pub category: Option<String>,

    #[validate(length(min = 1, message = "Crop type is required"))]
    pub crop: String,

    #[validate(custom(function = validate_urgency))]
    pub urgency: Option<String>,

    pub tags: Option<Vec<String>>,
}

/// DTO for editing a question. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuestionRequest {
    #[validate(length(min = 1, max = 200, message = "Title cannot exceed 200 characters"))]
    pub title: Option<String>,

    #[validate(length(min = 1, max = 2000, message = "Description cannot exceed 2000 characters"))]
    pub description: Option<String>,

    #[validate(custom(function = validate_question_category))]
    pub category: Option<String>,

    #[validate(length(min = 1, message = "Crop type is required"))]
    pub crop: Option<String>,

    #[validate(custom(function = validate_urgency))]
    pub urgency: Option<String>,
}

/// Query parameters for listing questions.
#[derive(Debug, Deserialize)]
pub struct QuestionListParams {
    pub category: Option<String>,
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// DTO for the official expert answer.
#[derive(Debug, Deserialize, Validate)]
pub struct AnswerRequest {
    #[validate(length(min = 1, max = 3000, message = "Answer cannot exceed 3000 characters"))]
    pub answer: String,
}

/// DTO for the status sub-resource.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuestionStatusRequest {
    #[validate(custom(function = validate_question_status))]
    pub status: String,
}

/// DTO for posting or editing a comment.
#[derive(Debug, Deserialize, Validate)]
pub struct QuestionCommentRequest {
    #[validate(length(min = 1, max = 1000, message = "Comment cannot exceed 1000 characters"))]
    pub text: String,
}

/// Aggregated statistics for an expert's dashboard.
#[derive(Debug, Serialize)]
pub struct ExpertStats {
    pub total_answered: i64,
    pub average_likes: f64,
    pub categories_answered: Vec<String>,
    pub pending_questions: i64,
}

pub const QUESTION_CATEGORIES: [&str; 6] = [
    "disease",
    "pest_control",
    "cultivation",
    "soil",
    "irrigation",
    "fertilization",
];

pub fn validate_question_category(category: &str) -> Result<(), validator::ValidationError> {
    if !QUESTION_CATEGORIES.contains(&category) {
        return Err(validator::ValidationError::new("invalid_category")
            .with_message("Unknown question category".into()));
    }
    Ok(())
}

fn validate_urgency(urgency: &str) -> Result<(), validator::ValidationError> {
    if !["low", "medium", "high"].contains(&urgency) {
        return Err(validator::ValidationError::new("invalid_urgency")
            .with_message("Urgency must be low, medium or high".into()));
    }
    Ok(())
}

pub fn validate_question_status(status: &str) -> Result<(), validator::ValidationError> {
    if !["pending", "in_progress", "answered", "closed"].contains(&status) {
        return Err(validator::ValidationError::new("invalid_status")
            .with_message("Status must be pending, in_progress, answered or closed".into()));
    }
    Ok(())
}
