use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum StatusMediaType {
    #[default]
    Text,
    Image,
    Video,
}

/// A 24-hour story.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub id: String,
    pub user_id: String,
    pub content: Option<String>,
    pub media_url: Option<String>,
    pub media_type: StatusMediaType,
    pub background_color: Option<String>,
    pub font_style: Option<String>,
    #[sqlx(skip)]
    #[serde(default)]
    pub viewed_by: Vec<String>,
    #[sqlx(skip)]
    #[serde(default)]
    pub reactions: BTreeMap<String, String>,
    pub created_at: i64,
    pub expires_at: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStatusRequest {
    pub content: Option<String>,
    pub media_url: Option<String>,
    #[serde(default)]
    pub media_type: StatusMediaType,
    pub background_color: Option<String>,
    pub font_style: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusReactionRequest {
    pub emoji: String,
}

/// One user's live statuses, for the contacts feed.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusFeedEntry {
    pub user_id: String,
    pub username: String,
    pub profile_image: Option<String>,
    pub statuses: Vec<Status>,
    pub all_viewed: bool,
}
