use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    middleware,
    routing::post,
    Json, Router,
};
use serde::Serialize;
use std::path::Path;
use uuid::Uuid;

use crate::api::middleware::auth;
use crate::api::middleware::session::AppState;
use crate::error::{AppError, Result};

const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];
const MAX_FILES_PER_REQUEST: usize = 8;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub urls: Vec<String>,
}

fn file_extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Multipart ad-image upload. Files land on disk under the configured
/// upload directory and are served back under `/uploads`.
async fn upload_images(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>)> {
    let upload_dir = Path::new(&state.config.upload_dir);

    tokio::fs::create_dir_all(upload_dir)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;

    let mut urls = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation("images", &e.to_string()))?
    {
        let Some(filename) = field.file_name().map(|f| f.to_string()) else {
            continue;
        };

        if urls.len() >= MAX_FILES_PER_REQUEST {
            return Err(AppError::validation("images", "too many files"));
        }

        let extension = file_extension(&filename)
            .filter(|e| ALLOWED_EXTENSIONS.contains(&e.as_str()))
            .ok_or_else(|| {
                AppError::validation("images", "only jpg, jpeg, png and webp are accepted")
            })?;

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::validation("images", &e.to_string()))?;

        if data.is_empty() {
            return Err(AppError::validation("images", "empty file"));
        }

        let stored_name = format!("{}.{}", Uuid::new_v4(), extension);

        tokio::fs::write(upload_dir.join(&stored_name), &data)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;

        tracing::debug!(file = %stored_name, bytes = data.len(), "Image stored");

        urls.push(format!(
            "{}/uploads/{}",
            state.config.base_url.trim_end_matches('/'),
            stored_name
        ));
    }

    if urls.is_empty() {
        return Err(AppError::validation("images", "no files in request"));
    }

    Ok((StatusCode::CREATED, Json(UploadResponse { urls })))
}

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/uploads", post(upload_images))
        .route_layer(middleware::from_fn_with_state(state, auth::require_user))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_extension_normalized() {
        assert_eq!(file_extension("photo.JPG").as_deref(), Some("jpg"));
        assert_eq!(file_extension("a.b.webp").as_deref(), Some("webp"));
        assert_eq!(file_extension("noextension"), None);
    }
}
