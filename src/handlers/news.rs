// src/handlers/news.rs

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::news::{CreateNewsCommentRequest, News, NewsComment, NewsDetail, NewsForm, NewsSummary},
    utils::{
        html::clean_html,
        upload::{UploadedImage, remove_image, store_image},
    },
};

const NEWS_COLUMNS: &str =
    "id, title, summary, content, category, author, location, image, tags, likes_count, date";

fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Pulls the text fields and the optional `image` file out of the form.
async fn read_news_form(
    multipart: &mut Multipart,
) -> Result<(NewsForm, Option<UploadedImage>), AppError> {
    let mut form = NewsForm::default();
    let mut image = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                image = Some(UploadedImage {
                    filename: field.file_name().map(str::to_string),
                    content_type: field.content_type().map(str::to_string),
                    data: field.bytes().await?,
                });
            }
            "title" => form.title = Some(field.text().await?),
            "summary" => form.summary = Some(field.text().await?),
            "content" => form.content = Some(field.text().await?),
            "category" => form.category = Some(field.text().await?),
            "author" => form.author = Some(field.text().await?),
            "location" => form.location = Some(field.text().await?),
            "tags" => form.tags = Some(field.text().await?),
            _ => {}
        }
    }

    Ok((form, image))
}

async fn fetch_news_detail(pool: &PgPool, id: i64) -> Result<NewsDetail, AppError> {
    let sql = format!("SELECT {NEWS_COLUMNS} FROM news WHERE id = $1");
    let news = sqlx::query_as::<_, News>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("News not found".to_string()))?;

    let comments = sqlx::query_as::<_, NewsComment>(
        "SELECT id, news_id, author, content, likes_count, created_at \
         FROM news_comments \
         WHERE news_id = $1 \
         ORDER BY created_at ASC",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    Ok(NewsDetail { news, comments })
}

/// List all articles, newest first.
pub async fn list_news(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let news = sqlx::query_as::<_, NewsSummary>(
        "SELECT n.id, n.title, n.summary, n.content, n.category, n.author, n.location, \
                n.image, n.tags, n.likes_count, n.date, \
                (SELECT COUNT(*) FROM news_comments c WHERE c.news_id = n.id) AS comments_count \
         FROM news n \
         ORDER BY n.date DESC",
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list news: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(news))
}

/// Single article with its comments.
pub async fn get_news(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(fetch_news_detail(&pool, id).await?))
}

/// Create an article from a multipart form with an optional image.
pub async fn create_news(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let (form, image) = read_news_form(&mut multipart).await?;
    form.validate()?;

    let (Some(title), Some(summary), Some(content), Some(category), Some(author)) = (
        &form.title,
        &form.summary,
        &form.content,
        &form.category,
        &form.author,
    ) else {
        return Err(AppError::BadRequest(
            "Title, summary, content, category and author are required".to_string(),
        ));
    };

    let image_path = match image {
        Some(file) => Some(store_image(&config.upload_dir, "news", "news", file).await?),
        None => None,
    };

    let tags = form.tags.as_deref().map(split_tags).unwrap_or_default();

    let sql = format!(
        "INSERT INTO news (title, summary, content, category, author, location, image, tags) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING {NEWS_COLUMNS}"
    );

    let result = sqlx::query_as::<_, News>(&sql)
        .bind(title)
        .bind(summary)
        .bind(clean_html(content))
        .bind(category)
        .bind(author)
        .bind(&form.location)
        .bind(&image_path)
        .bind(&tags)
        .fetch_one(&pool)
        .await;

    match result {
        Ok(news) => Ok((StatusCode::CREATED, Json(news))),
        Err(e) => {
            // Roll back the file written just above.
            if let Some(path) = &image_path {
                remove_image(&config.upload_dir, path).await;
            }
            tracing::error!("Failed to create news: {:?}", e);
            Err(AppError::from(e))
        }
    }
}

/// Partial update with optional image replacement. A replaced image's old
/// file is unlinked after the row update succeeds.
pub async fn update_news(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let (form, image) = read_news_form(&mut multipart).await?;
    form.validate()?;

    let sql = format!("SELECT {NEWS_COLUMNS} FROM news WHERE id = $1");
    let existing = sqlx::query_as::<_, News>(&sql)
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("News not found".to_string()))?;

    let new_image = match image {
        Some(file) => Some(store_image(&config.upload_dir, "news", "news", file).await?),
        None => None,
    };

    let tags = form.tags.as_deref().map(split_tags);
    let content = form.content.as_deref().map(clean_html);

    let sql = format!(
        "UPDATE news SET \
            title = COALESCE($1, title), \
            summary = COALESCE($2, summary), \
            content = COALESCE($3, content), \
            category = COALESCE($4, category), \
            author = COALESCE($5, author), \
            location = COALESCE($6, location), \
            tags = COALESCE($7, tags), \
            image = COALESCE($8, image) \
         WHERE id = $9 \
         RETURNING {NEWS_COLUMNS}"
    );

    let result = sqlx::query_as::<_, News>(&sql)
        .bind(&form.title)
        .bind(&form.summary)
        .bind(&content)
        .bind(&form.category)
        .bind(&form.author)
        .bind(&form.location)
        .bind(&tags)
        .bind(&new_image)
        .bind(id)
        .fetch_one(&pool)
        .await;

    match result {
        Ok(news) => {
            if new_image.is_some() {
                if let Some(old) = &existing.image {
                    remove_image(&config.upload_dir, old).await;
                }
            }
            Ok(Json(news))
        }
        Err(e) => {
            if let Some(path) = &new_image {
                remove_image(&config.upload_dir, path).await;
            }
            tracing::error!("Failed to update news: {:?}", e);
            Err(AppError::from(e))
        }
    }
}

/// Delete an article and its stored image.
pub async fn delete_news(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let image = sqlx::query_scalar::<_, Option<String>>("SELECT image FROM news WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("News not found".to_string()))?;

    sqlx::query("DELETE FROM news WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if let Some(path) = image {
        remove_image(&config.upload_dir, &path).await;
    }

    Ok(Json(serde_json::json!({
        "message": "News deleted successfully",
    })))
}

/// Add a comment to an article.
pub async fn create_comment(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<CreateNewsCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    sqlx::query_scalar::<_, i64>("SELECT id FROM news WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("News not found".to_string()))?;

    sqlx::query("INSERT INTO news_comments (news_id, author, content) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(&payload.author)
        .bind(clean_html(&payload.content))
        .execute(&pool)
        .await?;

    Ok(Json(fetch_news_detail(&pool, id).await?))
}

/// Bump the article's like counter.
pub async fn like_news(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let sql = format!(
        "UPDATE news SET likes_count = likes_count + 1 WHERE id = $1 RETURNING {NEWS_COLUMNS}"
    );
    let news = sqlx::query_as::<_, News>(&sql)
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("News not found".to_string()))?;

    Ok(Json(news))
}

/// Bump a comment's like counter.
pub async fn like_comment(
    State(pool): State<PgPool>,
    Path((id, comment_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let comment = sqlx::query_as::<_, NewsComment>(
        "UPDATE news_comments SET likes_count = likes_count + 1 \
         WHERE id = $1 AND news_id = $2 \
         RETURNING id, news_id, author, content, likes_count, created_at",
    )
    .bind(comment_id)
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Comment not found".to_string()))?;

    Ok(Json(comment))
}
