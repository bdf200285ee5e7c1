use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::AppError;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMedia {
    pub url: String,
    pub file_name: String,
    pub content_type: String,
    pub size: u64,
}

/// Where uploaded media bytes live. The server only hands back URLs.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn upload(
        &self,
        bytes: &[u8],
        content_type: &str,
        original_name: Option<&str>,
    ) -> Result<StoredMedia, AppError>;

    /// Opens a stored file for streaming.
    async fn open(&self, file_name: &str) -> Result<(tokio::fs::File, String), AppError>;
}

pub struct LocalMediaStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalMediaStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }
}

fn extension_for(content_type: &str, original_name: Option<&str>) -> String {
    let from_type = match content_type {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "video/mp4" => Some("mp4"),
        "video/webm" => Some("webm"),
        "audio/mpeg" => Some("mp3"),
        "audio/ogg" => Some("ogg"),
        "audio/aac" => Some("aac"),
        "audio/mp4" => Some("m4a"),
        "application/pdf" => Some("pdf"),
        _ => None,
    };
    if let Some(ext) = from_type {
        return ext.to_string();
    }
    original_name
        .and_then(|n| n.rsplit_once('.').map(|(_, ext)| ext))
        .filter(|e| e.len() <= 10 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| "bin".into())
}

fn content_type_for(file_name: &str) -> &'static str {
    match file_name.rsplit('.').next().unwrap_or("") {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mp3" => "audio/mpeg",
        "ogg" => "audio/ogg",
        "aac" => "audio/aac",
        "m4a" => "audio/mp4",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// Stored names are `{uuid}.{ext}`; anything else never touches the disk.
fn is_safe_name(file_name: &str) -> bool {
    !file_name.is_empty()
        && file_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
        && !file_name.starts_with('.')
        && !file_name.contains("..")
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    async fn upload(
        &self,
        bytes: &[u8],
        content_type: &str,
        original_name: Option<&str>,
    ) -> Result<StoredMedia, AppError> {
        let file_name = format!(
            "{}.{}",
            uuid::Uuid::new_v4(),
            extension_for(content_type, original_name)
        );

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| AppError::Media(e.to_string()))?;
        tokio::fs::write(self.root.join(&file_name), bytes)
            .await
            .map_err(|e| AppError::Media(e.to_string()))?;

        Ok(StoredMedia {
            url: format!("{}/media/{}", self.public_base_url, file_name),
            file_name,
            content_type: content_type.to_string(),
            size: bytes.len() as u64,
        })
    }

    async fn open(&self, file_name: &str) -> Result<(tokio::fs::File, String), AppError> {
        if !is_safe_name(file_name) {
            return Err(AppError::not_found("File not found"));
        }
        let file = tokio::fs::File::open(self.root.join(file_name))
            .await
            .map_err(|_| AppError::not_found("File not found"))?;
        Ok((file, content_type_for(file_name).to_string()))
    }
}

/// Media references on messages and statuses must be absolute http(s) URLs.
pub fn validate_media_url(raw: &str) -> Result<(), AppError> {
    match url::Url::parse(raw) {
        Ok(u) if u.scheme() == "http" || u.scheme() == "https" => Ok(()),
        _ => Err(AppError::validation("mediaUrl must be an absolute http(s) URL")),
    }
}
