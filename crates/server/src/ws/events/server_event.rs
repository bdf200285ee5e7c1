use serde::Serialize;

use crate::models::{Call, CallSession, DeliveredMessage, Message, ReactionUpdate};

// ── Server → Client Events ──

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// A new message for the receiver.
    Message(Message),
    /// Ack to the sending session.
    MessageSent(DeliveredMessage),
    MessageEdited {
        #[serde(rename = "messageId")]
        message_id: String,
        #[serde(rename = "chatId")]
        chat_id: String,
        content: String,
        #[serde(rename = "editedAt")]
        edited_at: i64,
    },
    MessageDeleted {
        #[serde(rename = "messageId")]
        message_id: String,
        #[serde(rename = "chatId")]
        chat_id: String,
    },
    Typing {
        #[serde(rename = "chatId")]
        chat_id: String,
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(rename = "isTyping")]
        is_typing: bool,
    },
    Read {
        #[serde(rename = "chatId")]
        chat_id: String,
        #[serde(rename = "messageId")]
        message_id: String,
        #[serde(rename = "readerId")]
        reader_id: String,
        #[serde(rename = "readAt")]
        read_at: i64,
    },
    OnlineStatus {
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(rename = "isOnline")]
        is_online: bool,
        #[serde(rename = "lastSeen")]
        last_seen: Option<i64>,
    },
    Reaction(ReactionUpdate),
    IncomingCall {
        call: Call,
        #[serde(rename = "callerName")]
        caller_name: String,
        #[serde(rename = "roomId")]
        room_id: String,
    },
    CallSession(CallSession),
    CallAccepted {
        #[serde(rename = "callId")]
        call_id: String,
        #[serde(rename = "roomId")]
        room_id: String,
    },
    CallDeclined {
        #[serde(rename = "callId")]
        call_id: String,
    },
    CallEnded {
        #[serde(rename = "callId")]
        call_id: String,
        duration: i64,
    },
    CallMissed {
        #[serde(rename = "callId")]
        call_id: String,
    },
    ChatSettings {
        #[serde(rename = "chatId")]
        chat_id: String,
        #[serde(rename = "disappearingMode")]
        disappearing_mode: bool,
        #[serde(rename = "disappearAfter")]
        disappear_after: i64,
    },
    Error {
        code: &'static str,
        message: String,
    },
}

impl From<&crate::error::AppError> for ServerEvent {
    fn from(err: &crate::error::AppError) -> Self {
        ServerEvent::Error {
            code: err.code(),
            message: err.to_string(),
        }
    }
}
