// src/handlers/expert_support.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::question::{
        AnswerRequest, CreateQuestionRequest, ExpertStats, QuestionComment,
        QuestionCommentRequest, QuestionDetail, QuestionListParams, QuestionSummary,
        UpdateQuestionRequest, UpdateQuestionStatusRequest,
    },
    utils::{
        html::clean_html,
        jwt::{Claims, require_expert},
    },
};

const QUESTION_SELECT: &str = "SELECT q.id, q.title, q.description, q.category, q.crop, q.urgency, q.status, \
        q.asked_by, au.name AS asked_by_name, au.location AS asked_by_location, \
        q.expert_id, eu.name AS expert_name, eu.role AS expert_role, \
        q.answer, q.answer_date, q.images, q.tags, q.views, \
        (SELECT COUNT(*) FROM question_likes ql WHERE ql.question_id = q.id) AS likes_count, \
        (SELECT COUNT(*) FROM question_comments qc WHERE qc.question_id = q.id) AS comments_count, \
        q.created_at, q.updated_at \
     FROM questions q \
     JOIN users au ON q.asked_by = au.id \
     LEFT JOIN users eu ON q.expert_id = eu.id";

const COMMENT_SELECT: &str = "SELECT c.id, c.question_id, c.author_id, u.name AS author_name, u.role AS author_role, \
        c.text, c.is_expert_response, \
        (SELECT COUNT(*) FROM question_comment_likes l WHERE l.comment_id = c.id) AS likes_count, \
        c.created_at, c.updated_at \
     FROM question_comments c \
     JOIN users u ON c.author_id = u.id";

async fn fetch_question(pool: &PgPool, id: i64) -> Result<QuestionSummary, AppError> {
    let sql = format!("{QUESTION_SELECT} WHERE q.id = $1");
    sqlx::query_as::<_, QuestionSummary>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Question not found".to_string()))
}

async fn fetch_question_detail(pool: &PgPool, id: i64) -> Result<QuestionDetail, AppError> {
    let question = fetch_question(pool, id).await?;

    let sql = format!("{COMMENT_SELECT} WHERE c.question_id = $1 ORDER BY c.created_at ASC");
    let comments = sqlx::query_as::<_, QuestionComment>(&sql)
        .bind(id)
        .fetch_all(pool)
        .await?;

    Ok(QuestionDetail { question, comments })
}

async fn fetch_comment(pool: &PgPool, question_id: i64, id: i64) -> Result<QuestionComment, AppError> {
    let sql = format!("{COMMENT_SELECT} WHERE c.id = $1 AND c.question_id = $2");
    sqlx::query_as::<_, QuestionComment>(&sql)
        .bind(id)
        .bind(question_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Comment not found".to_string()))
}

/// List questions with optional category/status filters and pagination.
pub async fn list_questions(
    State(pool): State<PgPool>,
    Query(params): Query<QuestionListParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params.limit.unwrap_or(20).clamp(1, 100);
    let page = params.page.unwrap_or(1).max(1);
    let offset = (page - 1) * limit;

    let sql = format!(
        "{QUESTION_SELECT} \
         WHERE ($1::TEXT IS NULL OR q.category = $1) \
           AND ($2::TEXT IS NULL OR q.status = $2) \
         ORDER BY q.created_at DESC \
         LIMIT $3 OFFSET $4"
    );

    let questions = sqlx::query_as::<_, QuestionSummary>(&sql)
        .bind(&params.category)
        .bind(&params.status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list questions: {:?}", e);
            AppError::from(e)
        })?;

    Ok(Json(questions))
}

/// Questions asked by the current user.
pub async fn my_questions(
    State(pool): State<PgPool>,
    claims: Claims,
) -> Result<impl IntoResponse, AppError> {
    let sql = format!("{QUESTION_SELECT} WHERE q.asked_by = $1 ORDER BY q.created_at DESC");
    let questions = sqlx::query_as::<_, QuestionSummary>(&sql)
        .bind(claims.user_id())
        .fetch_all(&pool)
        .await?;

    Ok(Json(questions))
}

/// Submit a new question.
pub async fn create_question(
    State(pool): State<PgPool>,
    claims: Claims,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO questions (title, description, category, crop, urgency, tags, asked_by) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING id",
    )
    .bind(payload.title.trim())
    .bind(clean_html(payload.description.trim()))
    .bind(payload.category.as_deref().unwrap_or("cultivation"))
    .bind(payload.crop.trim())
    .bind(payload.urgency.as_deref().unwrap_or("medium"))
    .bind(payload.tags.unwrap_or_default())
    .bind(claims.user_id())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create question: {:?}", e);
        AppError::from(e)
    })?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": "Question submitted successfully",
            "question": fetch_question(&pool, id).await?,
        })),
    ))
}

/// Edit an owned question. Fields are optional.
pub async fn update_question(
    State(pool): State<PgPool>,
    claims: Claims,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let asked_by = sqlx::query_scalar::<_, i64>("SELECT asked_by FROM questions WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Question not found".to_string()))?;

    if asked_by != claims.user_id() {
        return Err(AppError::Forbidden(
            "You can only edit your own questions".to_string(),
        ));
    }

    let description = payload.description.as_deref().map(clean_html);

    sqlx::query(
        "UPDATE questions SET \
            title = COALESCE($1, title), \
            description = COALESCE($2, description), \
            category = COALESCE($3, category), \
            crop = COALESCE($4, crop), \
            urgency = COALESCE($5, urgency), \
            updated_at = now() \
         WHERE id = $6",
    )
    .bind(&payload.title)
    .bind(&description)
    .bind(&payload.category)
    .bind(&payload.crop)
    .bind(&payload.urgency)
    .bind(id)
    .execute(&pool)
    .await?;

    Ok(Json(serde_json::json!({
        "message": "Question updated successfully",
        "question": fetch_question(&pool, id).await?,
    })))
}

/// Single question with its comment thread. Each view bumps the counter.
pub async fn get_question(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("UPDATE questions SET views = views + 1 WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(Json(fetch_question_detail(&pool, id).await?))
}

/// Post the official answer. Experts only. Sets status to 'answered' and
/// stamps the answer date.
pub async fn answer_question(
    State(pool): State<PgPool>,
    claims: Claims,
    Path(id): Path<i64>,
    Json(payload): Json<AnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_expert(&claims)?;
    payload.validate()?;

    let result = sqlx::query(
        "UPDATE questions SET \
            answer = $1, expert_id = $2, status = 'answered', answer_date = now(), \
            updated_at = now() \
         WHERE id = $3",
    )
    .bind(clean_html(payload.answer.trim()))
    .bind(claims.user_id())
    .bind(id)
    .execute(&pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(Json(serde_json::json!({
        "message": "Answer submitted successfully",
        "question": fetch_question(&pool, id).await?,
    })))
}

/// Status transitions by experts. Moving to 'in_progress' with no expert
/// assigned claims the question.
pub async fn update_status(
    State(pool): State<PgPool>,
    claims: Claims,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuestionStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_expert(&claims)?;
    payload.validate()?;

    let result = sqlx::query(
        "UPDATE questions SET \
            status = $1, \
            expert_id = CASE \
                WHEN $1 = 'in_progress' AND expert_id IS NULL THEN $2 \
                ELSE expert_id \
            END, \
            updated_at = now() \
         WHERE id = $3",
    )
    .bind(&payload.status)
    .bind(claims.user_id())
    .bind(id)
    .execute(&pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(Json(serde_json::json!({
        "message": "Question status updated successfully",
        "question": fetch_question(&pool, id).await?,
    })))
}

/// Anyone logged in can comment; expert/admin comments are flagged as
/// expert responses.
pub async fn create_comment(
    State(pool): State<PgPool>,
    claims: Claims,
    Path(id): Path<i64>,
    Json(payload): Json<QuestionCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    sqlx::query_scalar::<_, i64>("SELECT id FROM questions WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Question not found".to_string()))?;

    let comment_id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO question_comments (question_id, author_id, text, is_expert_response) \
         VALUES ($1, $2, $3, $4) \
         RETURNING id",
    )
    .bind(id)
    .bind(claims.user_id())
    .bind(clean_html(payload.text.trim()))
    .bind(claims.role().can_answer())
    .fetch_one(&pool)
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": "Comment added successfully",
            "comment": fetch_comment(&pool, id, comment_id).await?,
        })),
    ))
}

/// Edit an owned comment.
pub async fn update_comment(
    State(pool): State<PgPool>,
    claims: Claims,
    Path((question_id, comment_id)): Path<(i64, i64)>,
    Json(payload): Json<QuestionCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let comment = fetch_comment(&pool, question_id, comment_id).await?;

    if comment.author_id != claims.user_id() {
        return Err(AppError::Forbidden(
            "You can only edit your own comments".to_string(),
        ));
    }

    sqlx::query("UPDATE question_comments SET text = $1, updated_at = now() WHERE id = $2")
        .bind(clean_html(payload.text.trim()))
        .bind(comment_id)
        .execute(&pool)
        .await?;

    Ok(Json(serde_json::json!({
        "message": "Comment updated successfully",
        "comment": fetch_comment(&pool, question_id, comment_id).await?,
    })))
}

/// Remove an owned comment. Admins may remove any comment.
pub async fn delete_comment(
    State(pool): State<PgPool>,
    claims: Claims,
    Path((question_id, comment_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let comment = fetch_comment(&pool, question_id, comment_id).await?;

    if comment.author_id != claims.user_id() && !claims.role().can_moderate() {
        return Err(AppError::Forbidden(
            "You can only delete your own comments".to_string(),
        ));
    }

    sqlx::query("DELETE FROM question_comments WHERE id = $1")
        .bind(comment_id)
        .execute(&pool)
        .await?;

    Ok(Json(serde_json::json!({
        "message": "Comment deleted successfully",
    })))
}

/// Toggle the current user's like on a question. A second call by the same
/// user undoes the first.
pub async fn toggle_question_like(
    State(pool): State<PgPool>,
    claims: Claims,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();

    let mut tx = pool.begin().await?;

    sqlx::query_scalar::<_, i64>("SELECT id FROM questions WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("Question not found".to_string()))?;

    let existing = sqlx::query_scalar::<_, i64>(
        "SELECT question_id FROM question_likes WHERE question_id = $1 AND user_id = $2",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    let is_liked = existing.is_some();

    if is_liked {
        sqlx::query("DELETE FROM question_likes WHERE question_id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
    } else {
        sqlx::query("INSERT INTO question_likes (question_id, user_id) VALUES ($1, $2)")
            .bind(id)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if e.to_string().contains("unique constraint") {
                    // Concurrent request handled gracefully
                    return AppError::Conflict("Already liked".to_string());
                }
                AppError::from(e)
            })?;
    }

    let likes = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM question_likes WHERE question_id = $1",
    )
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(Json(serde_json::json!({
        "message": if is_liked { "Like removed" } else { "Question liked" },
        "likes": likes,
        "liked": !is_liked,
    })))
}

/// Toggle the current user's like on a comment.
pub async fn toggle_comment_like(
    State(pool): State<PgPool>,
    claims: Claims,
    Path((question_id, comment_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();

    let mut tx = pool.begin().await?;

    sqlx::query_scalar::<_, i64>(
        "SELECT id FROM question_comments WHERE id = $1 AND question_id = $2",
    )
    .bind(comment_id)
    .bind(question_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("Comment not found".to_string()))?;

    let existing = sqlx::query_scalar::<_, i64>(
        "SELECT comment_id FROM question_comment_likes WHERE comment_id = $1 AND user_id = $2",
    )
    .bind(comment_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    let is_liked = existing.is_some();

    if is_liked {
        sqlx::query("DELETE FROM question_comment_likes WHERE comment_id = $1 AND user_id = $2")
            .bind(comment_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
    } else {
        sqlx::query("INSERT INTO question_comment_likes (comment_id, user_id) VALUES ($1, $2)")
            .bind(comment_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
    }

    let likes = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM question_comment_likes WHERE comment_id = $1",
    )
    .bind(comment_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(Json(serde_json::json!({
        "message": if is_liked { "Like removed from comment" } else { "Comment liked" },
        "likes": likes,
        "liked": !is_liked,
    })))
}

#[derive(Debug, sqlx::FromRow)]
struct ExpertStatsRow {
    total_answered: i64,
    average_likes: f64,
    categories_answered: Vec<String>,
}

/// Aggregated statistics for the calling expert.
pub async fn expert_stats(
    State(pool): State<PgPool>,
    claims: Claims,
) -> Result<impl IntoResponse, AppError> {
    require_expert(&claims)?;

    let row = sqlx::query_as::<_, ExpertStatsRow>(
        "SELECT COUNT(*) AS total_answered, \
                COALESCE(AVG(likes.cnt), 0)::FLOAT8 AS average_likes, \
                COALESCE(ARRAY_AGG(DISTINCT q.category) FILTER (WHERE q.category IS NOT NULL), \
                         ARRAY[]::TEXT[]) AS categories_answered \
         FROM questions q \
         LEFT JOIN LATERAL ( \
             SELECT COUNT(*) AS cnt FROM question_likes ql WHERE ql.question_id = q.id \
         ) likes ON TRUE \
         WHERE q.expert_id = $1",
    )
    .bind(claims.user_id())
    .fetch_one(&pool)
    .await?;

    let pending_questions =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM questions WHERE status = 'pending'")
            .fetch_one(&pool)
            .await?;

    Ok(Json(ExpertStats {
        total_answered: row.total_answered,
        average_likes: row.average_likes,
        categories_answered: row.categories_answered,
        pending_questions,
    }))
}

/// Remove an owned question. Admins may remove any question.
pub async fn delete_question(
    State(pool): State<PgPool>,
    claims: Claims,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let asked_by = sqlx::query_scalar::<_, i64>("SELECT asked_by FROM questions WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Question not found".to_string()))?;

    if asked_by != claims.user_id() && !claims.role().can_moderate() {
        return Err(AppError::Forbidden(
            "You can only delete your own questions".to_string(),
        ));
    }

    sqlx::query("DELETE FROM questions WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    Ok(Json(serde_json::json!({
        "message": "Question deleted successfully",
    })))
}
