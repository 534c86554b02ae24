// src/handlers/pest_alerts.rs

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
    models::pest_alert::{
        AlertComment, AlertDetail, AlertForm, AlertSummary, CreateAlertCommentRequest,
        UpdateAlertStatusRequest,
    },
    utils::{
        jwt::Claims,
        upload::{UploadedImage, remove_image, store_image},
    },
};

const ALERT_SELECT: &str = "SELECT a.id, a.title, a.description, a.severity, a.crop, a.location, \
        a.symptoms, a.control_measures, a.status, a.image, a.posted_by, \
        u.name AS posted_by_name, u.email AS posted_by_email, \
        (SELECT COUNT(*) FROM pest_alert_comments c WHERE c.alert_id = a.id) AS comments_count, \
        a.created_at, a.updated_at \
     FROM pest_alerts a \
     JOIN users u ON a.posted_by = u.id";

/// The original clients send these as JSON-encoded arrays inside the
/// multipart form. Unparseable input degrades to empty, blank entries are
/// dropped.
fn parse_string_array(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    let parsed: Vec<String> = serde_json::from_str(raw).unwrap_or_default();
    parsed
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

async fn read_alert_form(
    multipart: &mut Multipart,
) -> Result<(AlertForm, Option<UploadedImage>), AppError> {
    let mut form = AlertForm::default();
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
            "description" => form.description = Some(field.text().await?),
            "severity" => form.severity = Some(field.text().await?),
            "crop" => form.crop = Some(field.text().await?),
            "location" => form.location = Some(field.text().await?),
            "symptoms" => form.symptoms = Some(field.text().await?),
            "controlMeasures" | "control_measures" => {
                form.control_measures = Some(field.text().await?)
            }
            "status" => form.status = Some(field.text().await?),
            _ => {}
        }
    }

    Ok((form, image))
}

async fn fetch_alert_detail(pool: &PgPool, id: i64) -> Result<AlertDetail, AppError> {
    let sql = format!("{ALERT_SELECT} WHERE a.id = $1");
    let alert = sqlx::query_as::<_, AlertSummary>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Pest alert not found".to_string()))?;

    let comments = sqlx::query_as::<_, AlertComment>(
        "SELECT c.id, c.alert_id, c.user_id, u.name AS user_name, c.text, c.created_at \
         FROM pest_alert_comments c \
         JOIN users u ON c.user_id = u.id \
         WHERE c.alert_id = $1 \
         ORDER BY c.created_at ASC",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    Ok(AlertDetail { alert, comments })
}

/// List all alerts, newest first, with poster info joined in.
pub async fn list_alerts(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let sql = format!("{ALERT_SELECT} ORDER BY a.created_at DESC");
    let alerts = sqlx::query_as::<_, AlertSummary>(&sql)
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list pest alerts: {:?}", e);
            AppError::from(e)
        })?;

    Ok(Json(alerts))
}

/// Single alert with its comment thread.
pub async fn get_alert(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(fetch_alert_detail(&pool, id).await?))
}

/// Create a new alert from a multipart form with an optional image.
pub async fn create_alert(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    claims: Claims,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let (form, image) = read_alert_form(&mut multipart).await?;
    form.validate()?;

    let (Some(title), Some(description), Some(crop), Some(location)) =
        (&form.title, &form.description, &form.crop, &form.location)
    else {
        return Err(AppError::BadRequest(
            "Title, description, crop, and location are required".to_string(),
        ));
    };

    let symptoms = parse_string_array(form.symptoms.as_deref());
    let control_measures = parse_string_array(form.control_measures.as_deref());

    let image_path = match image {
        Some(file) => {
            Some(store_image(&config.upload_dir, "pest-alerts", "pest-alert", file).await?)
        }
        None => None,
    };

    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO pest_alerts \
            (title, description, severity, crop, location, symptoms, control_measures, status, image, posted_by) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         RETURNING id",
    )
    .bind(title.trim())
    .bind(description.trim())
    .bind(form.severity.as_deref().unwrap_or("warning"))
    .bind(crop.trim())
    .bind(location.trim())
    .bind(&symptoms)
    .bind(&control_measures)
    .bind(form.status.as_deref().unwrap_or("active"))
    .bind(&image_path)
    .bind(claims.user_id())
    .fetch_one(&pool)
    .await;

    let id = match id {
        Ok(id) => id,
        Err(e) => {
            if let Some(path) = &image_path {
                remove_image(&config.upload_dir, path).await;
            }
            tracing::error!("Failed to create pest alert: {:?}", e);
            return Err(AppError::from(e));
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(fetch_alert_detail(&pool, id).await?),
    ))
}

/// Full update of an owned alert. Admins may update any alert.
pub async fn update_alert(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    claims: Claims,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let (form, image) = read_alert_form(&mut multipart).await?;
    form.validate()?;

    #[derive(sqlx::FromRow)]
    struct AlertOwnerRow {
        posted_by: i64,
        image: Option<String>,
    }

    let existing =
        sqlx::query_as::<_, AlertOwnerRow>("SELECT posted_by, image FROM pest_alerts WHERE id = $1")
            .bind(id)
            .fetch_optional(&pool)
            .await?
            .ok_or(AppError::NotFound("Pest alert not found".to_string()))?;

    if existing.posted_by != claims.user_id() && !claims.role().can_moderate() {
        return Err(AppError::Forbidden(
            "Not authorized to update this alert".to_string(),
        ));
    }

    let (Some(title), Some(description), Some(crop), Some(location)) =
        (&form.title, &form.description, &form.crop, &form.location)
    else {
        return Err(AppError::BadRequest(
            "Title, description, crop, and location are required".to_string(),
        ));
    };

    let symptoms = parse_string_array(form.symptoms.as_deref());
    let control_measures = parse_string_array(form.control_measures.as_deref());

    let new_image = match image {
        Some(file) => {
            Some(store_image(&config.upload_dir, "pest-alerts", "pest-alert", file).await?)
        }
        None => None,
    };

    let result = sqlx::query(
        "UPDATE pest_alerts SET \
            title = $1, description = $2, severity = $3, crop = $4, location = $5, \
            symptoms = $6, control_measures = $7, status = $8, \
            image = COALESCE($9, image), updated_at = now() \
         WHERE id = $10",
    )
    .bind(title.trim())
    .bind(description.trim())
    .bind(form.severity.as_deref().unwrap_or("warning"))
    .bind(crop.trim())
    .bind(location.trim())
    .bind(&symptoms)
    .bind(&control_measures)
    .bind(form.status.as_deref().unwrap_or("active"))
    .bind(&new_image)
    .bind(id)
    .execute(&pool)
    .await;

    match result {
        Ok(_) => {
            if new_image.is_some() {
                if let Some(old) = &existing.image {
                    remove_image(&config.upload_dir, old).await;
                }
            }
            Ok(Json(fetch_alert_detail(&pool, id).await?))
        }
        Err(e) => {
            if let Some(path) = &new_image {
                remove_image(&config.upload_dir, path).await;
            }
            tracing::error!("Failed to update pest alert: {:?}", e);
            Err(AppError::from(e))
        }
    }
}

/// Delete an owned alert along with its stored image.
pub async fn delete_alert(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    claims: Claims,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    #[derive(sqlx::FromRow)]
    struct AlertOwnerRow {
        posted_by: i64,
        image: Option<String>,
    }

    let existing =
        sqlx::query_as::<_, AlertOwnerRow>("SELECT posted_by, image FROM pest_alerts WHERE id = $1")
            .bind(id)
            .fetch_optional(&pool)
            .await?
            .ok_or(AppError::NotFound("Pest alert not found".to_string()))?;

    if existing.posted_by != claims.user_id() && !claims.role().can_moderate() {
        return Err(AppError::Forbidden(
            "Not authorized to delete this alert".to_string(),
        ));
    }

    sqlx::query("DELETE FROM pest_alerts WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if let Some(path) = &existing.image {
        remove_image(&config.upload_dir, path).await;
    }

    Ok(Json(serde_json::json!({
        "message": "Pest alert deleted successfully",
    })))
}

/// Add a comment and return the refreshed alert detail.
pub async fn create_comment(
    State(pool): State<PgPool>,
    claims: Claims,
    Path(id): Path<i64>,
    Json(payload): Json<CreateAlertCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    sqlx::query_scalar::<_, i64>("SELECT id FROM pest_alerts WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Pest alert not found".to_string()))?;

    sqlx::query("INSERT INTO pest_alert_comments (alert_id, user_id, text) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(claims.user_id())
        .bind(payload.text.trim())
        .execute(&pool)
        .await?;

    Ok(Json(fetch_alert_detail(&pool, id).await?))
}

/// Update the alert status with enum validation. Any logged-in user may
/// move an alert between states, as in the original tracker.
pub async fn update_status(
    State(pool): State<PgPool>,
    _claims: Claims,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateAlertStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let result = sqlx::query("UPDATE pest_alerts SET status = $1, updated_at = now() WHERE id = $2")
        .bind(&payload.status)
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Pest alert not found".to_string()));
    }

    Ok(Json(fetch_alert_detail(&pool, id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_arrays_drop_blanks_and_bad_json() {
        assert_eq!(
            parse_string_array(Some(r#"["wilting", " spots ", ""]"#)),
            vec!["wilting", "spots"]
        );
        assert!(parse_string_array(Some("not json")).is_empty());
        assert!(parse_string_array(None).is_empty());
    }
}
