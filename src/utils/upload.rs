// src/utils/upload.rs

use std::path::{Component, Path, PathBuf};

use axum::body::Bytes;
use uuid::Uuid;

use crate::error::AppError;

/// Upper bound for a single uploaded image.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// A single `image` field pulled out of a multipart form.
#[derive(Debug)]
pub struct UploadedImage {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Writes an uploaded image under `<upload_root>/<bucket>/` and returns the
/// URL path it will be served from (`/uploads/<bucket>/<file>`).
///
/// Enforces the image-only MIME filter and the 5MB cap before any disk I/O.
pub async fn store_image(
    upload_root: &Path,
    bucket: &str,
    prefix: &str,
    image: UploadedImage,
) -> Result<String, AppError> {
    let is_image = image
        .content_type
        .as_deref()
        .map(|ct| ct.starts_with("image/"))
        .unwrap_or(false);
    if !is_image {
        return Err(AppError::BadRequest(
            "Only image files are allowed!".to_string(),
        ));
    }

    if image.data.len() > MAX_IMAGE_BYTES {
        return Err(AppError::BadRequest(
            "File too large. Maximum size is 5MB.".to_string(),
        ));
    }

    let ext = image
        .filename
        .as_deref()
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default();

    let file_name = format!("{}-{}{}", prefix, Uuid::new_v4(), ext);

    let dir = upload_root.join(bucket);
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    tokio::fs::write(dir.join(&file_name), &image.data)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok(format!("/uploads/{}/{}", bucket, file_name))
}

/// Best-effort removal of a previously stored image. A missing file or a
/// path outside the upload root is a no-op; failures are logged, never
/// propagated (the database write has already happened or will happen).
pub async fn remove_image(upload_root: &Path, url_path: &str) {
    let Some(path) = disk_path(upload_root, url_path) else {
        tracing::warn!("Refusing to delete suspicious upload path: {}", url_path);
        return;
    };

    match tokio::fs::remove_file(&path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to delete upload {}: {}", path.display(), e),
    }
}

/// Maps a stored `/uploads/...` URL path back to its location on disk.
/// Rejects anything that escapes the upload root.
fn disk_path(upload_root: &Path, url_path: &str) -> Option<PathBuf> {
    let relative = url_path.strip_prefix("/uploads/")?;
    let relative = Path::new(relative);

    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return None;
    }

    Some(upload_root.join(relative))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disk_path_maps_under_root() {
        let root = Path::new("/srv/uploads");
        let path = disk_path(root, "/uploads/news/news-abc.png").unwrap();
        assert_eq!(path, PathBuf::from("/srv/uploads/news/news-abc.png"));
    }

    #[test]
    fn disk_path_rejects_traversal() {
        let root = Path::new("/srv/uploads");
        assert!(disk_path(root, "/uploads/../etc/passwd").is_none());
        assert!(disk_path(root, "/etc/passwd").is_none());
    }

    #[tokio::test]
    async fn store_rejects_non_images() {
        let tmp = std::env::temp_dir();
        let err = store_image(
            &tmp,
            "news",
            "news",
            UploadedImage {
                filename: Some("notes.txt".to_string()),
                content_type: Some("text/plain".to_string()),
                data: Bytes::from_static(b"hello"),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn store_then_remove_roundtrip() {
        let root = std::env::temp_dir().join(format!("uploads-{}", Uuid::new_v4()));
        let url = store_image(
            &root,
            "pest-alerts",
            "pest-alert",
            UploadedImage {
                filename: Some("leaf.png".to_string()),
                content_type: Some("image/png".to_string()),
                data: Bytes::from_static(&[0x89, 0x50, 0x4e, 0x47]),
            },
        )
        .await
        .unwrap();

        let on_disk = disk_path(&root, &url).unwrap();
        assert!(on_disk.exists());

        remove_image(&root, &url).await;
        assert!(!on_disk.exists());
    }
}
