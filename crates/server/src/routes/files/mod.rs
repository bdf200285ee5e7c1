use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use crate::error::AppError;
use crate::models::AuthUser;
use crate::services::media::StoredMedia;
use crate::AppState;

/// POST /api/upload
///
/// Takes the first multipart field and returns the URL to put in `mediaUrl`.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<StoredMedia>), AppError> {
    let field = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Invalid upload: {}", e)))?
        .ok_or_else(|| AppError::validation("No file provided"))?;

    let original_name = field.file_name().map(str::to_string);
    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();

    let data = field
        .bytes()
        .await
        .map_err(|_| AppError::validation("Failed to read file"))?;

    if data.len() as u64 > state.config.max_upload_bytes {
        return Err(AppError::TooLarge {
            max_mb: state.config.max_upload_bytes / 1_048_576,
        });
    }
    if data.is_empty() {
        return Err(AppError::validation("File is empty"));
    }

    let stored = state
        .media
        .upload(&data, &content_type, original_name.as_deref())
        .await?;

    tracing::info!(
        "User {} uploaded {} ({} bytes)",
        user.id,
        stored.file_name,
        stored.size
    );
    Ok((StatusCode::CREATED, Json(stored)))
}

/// GET /media/{file}
pub async fn serve_media(
    State(state): State<Arc<AppState>>,
    Path(file_name): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let (file, content_type) = state.media.open(&file_name).await?;
    let body = Body::from_stream(ReaderStream::new(file));

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (
                header::CACHE_CONTROL,
                "public, max-age=31536000, immutable".to_string(),
            ),
        ],
        body,
    ))
}
