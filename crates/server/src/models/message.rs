use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum MessageType {
    #[default]
    Text,
    Image,
    Video,
    Audio,
    Voice,
    Document,
    Location,
    Contact,
    Sticker,
}

impl MessageType {
    /// Types whose payload is a `mediaUrl` rather than `content`.
    pub fn needs_media(self) -> bool {
        matches!(
            self,
            MessageType::Image
                | MessageType::Video
                | MessageType::Audio
                | MessageType::Voice
                | MessageType::Document
                | MessageType::Sticker
        )
    }

    fn label(self) -> &'static str {
        match self {
            MessageType::Text => "Message",
            MessageType::Image => "Photo",
            MessageType::Video => "Video",
            MessageType::Audio => "Audio",
            MessageType::Voice => "Voice message",
            MessageType::Document => "Document",
            MessageType::Location => "Location",
            MessageType::Contact => "Contact",
            MessageType::Sticker => "Sticker",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub chat_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub media_url: Option<String>,
    pub media_thumbnail: Option<String>,
    pub media_duration: Option<i64>,
    pub media_size: Option<i64>,
    pub reply_to_id: Option<String>,
    pub reply_to_content: Option<String>,
    pub is_forwarded: bool,
    pub forwarded_from_id: Option<String>,
    #[sqlx(skip)]
    #[serde(default)]
    pub reactions: BTreeMap<String, Vec<String>>,
    pub is_read: bool,
    pub is_delivered: bool,
    pub is_deleted: bool,
    #[sqlx(skip)]
    #[serde(default)]
    pub deleted_for: Vec<String>,
    pub is_edited: bool,
    pub edited_at: Option<i64>,
    pub disappear_after: Option<i64>,
    pub expires_at: Option<i64>,
    pub is_encrypted: bool,
    pub encrypted_content: Option<String>,
    pub timestamp: i64,
}

impl Message {
    pub fn is_expired(&self, now: i64) -> bool {
        matches!(self.expires_at, Some(at) if at <= now)
    }

    /// Hidden from `user_id`: deleted for everyone, deleted for them, or expired.
    pub fn is_hidden_from(&self, user_id: &str, now: i64) -> bool {
        self.is_deleted || self.is_expired(now) || self.deleted_for.iter().any(|u| u == user_id)
    }

    /// Text shown in the chat list.
    pub fn preview(&self) -> String {
        if self.is_encrypted {
            return "Encrypted message".into();
        }
        if self.content.trim().is_empty() {
            return self.message_type.label().into();
        }
        self.content.chars().take(100).collect()
    }
}

/// A persisted message plus whether it reached a live session of the receiver.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveredMessage {
    #[serde(flatten)]
    pub message: Message,
    pub delivered: bool,
}

/// Body of a send, over the socket (`message` envelope) or `POST /api/messages`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub id: Option<String>,
    pub chat_id: String,
    pub receiver_id: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "type", default)]
    pub message_type: MessageType,
    pub media_url: Option<String>,
    pub media_thumbnail: Option<String>,
    pub media_duration: Option<i64>,
    pub media_size: Option<i64>,
    pub reply_to_id: Option<String>,
    pub disappear_after: Option<i64>,
    #[serde(default)]
    pub is_encrypted: bool,
    pub encrypted_content: Option<String>,
    #[serde(skip)]
    pub forwarded_from_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardMessageRequest {
    pub message_id: String,
    pub to_chat_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct EditMessageRequest {
    pub content: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteMessageQuery {
    #[serde(default)]
    pub for_everyone: bool,
    #[serde(default)]
    pub permanent: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub before: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingSignal {
    pub chat_id: String,
    #[serde(default = "default_true")]
    pub is_typing: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadReceipt {
    pub chat_id: String,
    pub message_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionAction {
    #[default]
    Add,
    Remove,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionRequest {
    pub message_id: String,
    pub emoji: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionSignal {
    pub message_id: String,
    pub emoji: String,
    #[serde(default)]
    pub action: ReactionAction,
}

/// Reaction change as relayed to the other participants.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionUpdate {
    pub message_id: String,
    pub chat_id: String,
    pub user_id: String,
    pub emoji: String,
    pub action: ReactionAction,
    pub reactions: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[serde(default)]
    pub query: String,
    pub chat_id: Option<String>,
    #[serde(rename = "type")]
    pub message_type: Option<MessageType>,
}

#[derive(Debug, Deserialize)]
pub struct ChatSearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    pub messages: Vec<Message>,
    pub users: Vec<crate::models::PublicUser>,
    pub chats: Vec<crate::models::ChatSummary>,
}
