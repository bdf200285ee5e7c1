mod server_event;

pub use server_event::ServerEvent;

use serde::Deserialize;

use crate::models::{CallSignal, ReactionSignal, ReadReceipt, SendMessageRequest, TypingSignal};

// ── Client → Server Events ──

/// Every frame a client sends is `{"type": ..., "data": ...}`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientEnvelope {
    Message(SendMessageRequest),
    Typing(TypingSignal),
    Read(ReadReceipt),
    Call(CallSignal),
    Reaction(ReactionSignal),
    Ping,
}

impl ClientEnvelope {
    pub fn decode(frame: &str) -> Result<Self, String> {
        serde_json::from_str(frame).map_err(|e| format!("Invalid envelope: {}", e))
    }
}
