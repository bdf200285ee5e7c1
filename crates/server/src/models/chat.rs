use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::MessageType;

/// A conversation between participants. Per-user settings are keyed by user id.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: String,
    pub participants: Vec<String>,
    pub last_message: Option<String>,
    pub last_message_type: MessageType,
    pub last_message_time: i64,
    #[serde(skip)]
    pub last_message_expires_at: Option<i64>,
    pub unread_count: HashMap<String, i64>,
    pub is_pinned: HashMap<String, bool>,
    pub is_muted: HashMap<String, bool>,
    pub is_archived: HashMap<String, bool>,
    pub disappearing_mode: bool,
    pub disappear_after: i64,
    pub created_at: i64,
}

impl Chat {
    pub fn is_participant(&self, user_id: &str) -> bool {
        self.participants.iter().any(|p| p == user_id)
    }

    pub fn others<'a>(&'a self, user_id: &'a str) -> impl Iterator<Item = &'a String> + 'a {
        self.participants.iter().filter(move |p| p.as_str() != user_id)
    }

    /// Disappear-after applied to messages that don't choose their own.
    pub fn ghost_default(&self) -> Option<i64> {
        (self.disappearing_mode && self.disappear_after > 0).then_some(self.disappear_after)
    }

    pub fn unread_for(&self, user_id: &str) -> i64 {
        self.unread_count.get(user_id).copied().unwrap_or(0)
    }
}

/// Chat list entry from one participant's point of view.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSummary {
    pub id: String,
    pub participant_id: String,
    pub participant_name: String,
    pub participant_image: Option<String>,
    pub is_online: bool,
    pub last_message: Option<String>,
    pub last_message_type: MessageType,
    pub last_message_time: i64,
    pub unread_count: i64,
    pub disappearing_mode: bool,
    pub disappear_after: i64,
    pub is_pinned: bool,
    pub is_muted: bool,
    pub is_archived: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantFlag {
    Pinned,
    Muted,
    Archived,
}

impl ParticipantFlag {
    pub fn column(self) -> &'static str {
        match self {
            ParticipantFlag::Pinned => "is_pinned",
            ParticipantFlag::Muted => "is_muted",
            ParticipantFlag::Archived => "is_archived",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChatRequest {
    pub participant_id: String,
    #[serde(default)]
    pub disappearing_mode: bool,
    pub disappear_after: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisappearingSettingsRequest {
    pub duration: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GhostModeRequest {
    pub enabled: bool,
    pub disappear_after: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct PinChatRequest {
    pub pinned: bool,
}

#[derive(Debug, Deserialize)]
pub struct MuteChatRequest {
    pub muted: bool,
}

#[derive(Debug, Deserialize)]
pub struct ArchiveChatRequest {
    pub archived: bool,
}
