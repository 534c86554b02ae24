// src/models/news.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'news' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct News {
    pub id: i64,
    pub title: String,
    pub summary: String,
    pub content: String,
    pub category: String,
    pub author: String,
    pub location: Option<String>,

    /// URL path of the uploaded image, e.g. `/uploads/news/<file>`.
    pub image: Option<String>,

    pub tags: Vec<String>,
    pub likes_count: i32,
    pub date: chrono::DateTime<chrono::Utc>,
}

/// News row as listed, with its comment count joined in.
#[derive(Debug, Serialize, FromRow)]
pub struct NewsSummary {
    pub id: i64,
    pub title: String,
    pub summary: String,
    pub content: String,
    pub category: String,
    pub author: String,
    pub location: Option<String>,
    pub image: Option<String>,
    pub tags: Vec<String>,
    pub likes_count: i32,
    pub date: chrono::DateTime<chrono::Utc>,
    pub comments_count: i64,
}

/// Represents the 'news_comments' child table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct NewsComment {
    pub id: i64,
    pub news_id: i64,
    pub author: String,
    pub content: String,
    pub likes_count: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Detail view: the article plus its comments.
#[derive(Debug, Serialize)]
pub struct NewsDetail {
    #[serde(flatten)]
    pub news: News,
    pub comments: Vec<NewsComment>,
}

/// Text fields of a news article, collected from the multipart form.
#[derive(Debug, Default, Validate)]
pub struct NewsForm {
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 500, message = "Summary is required"))]
    pub summary: Option<String>,
    #[validate(length(min = 1, message = "Content is required"))]
    pub content: Option<String>,
    #[validate(custom(function = validate_news_category))]
    pub category: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Author is required"))]
    pub author: Option<String>,
    pub location: Option<String>,
    /// Comma-separated on the wire, split before storage.
    pub tags: Option<String>,
}

/// DTO for posting a comment on an article.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateNewsCommentRequest {
    #[validate(length(min = 1, max = 100, message = "Comment author is required"))]
    pub author: String,
    #[validate(length(min = 1, max = 1000, message = "Comment content is required"))]
    pub content: String,
}

pub const NEWS_CATEGORIES: [&str; 4] = ["Government", "Market", "Technology", "Weather"];

fn validate_news_category(category: &str) -> Result<(), validator::ValidationError> {
    if !NEWS_CATEGORIES.contains(&category) {
        return Err(validator::ValidationError::new("invalid_category")
            .with_message("Category must be Government, Market, Technology or Weather".into()));
    }
    Ok(())
}
