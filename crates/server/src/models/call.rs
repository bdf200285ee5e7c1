use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum CallType {
    #[default]
    Voice,
    Video,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum CallStatus {
    Initiated,
    Ringing,
    Ongoing,
    Ended,
    Declined,
    Missed,
}

impl CallStatus {
    pub const PENDING: &'static [CallStatus] = &[CallStatus::Initiated, CallStatus::Ringing];
    pub const LIVE: &'static [CallStatus] = &[
        CallStatus::Initiated,
        CallStatus::Ringing,
        CallStatus::Ongoing,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CallStatus::Initiated => "INITIATED",
            CallStatus::Ringing => "RINGING",
            CallStatus::Ongoing => "ONGOING",
            CallStatus::Ended => "ENDED",
            CallStatus::Declined => "DECLINED",
            CallStatus::Missed => "MISSED",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            CallStatus::Ended | CallStatus::Declined | CallStatus::Missed
        )
    }
}

impl std::fmt::Display for CallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Call {
    pub id: String,
    pub caller_id: String,
    pub receiver_id: String,
    pub group_id: Option<String>,
    #[serde(rename = "type")]
    pub call_type: CallType,
    pub status: CallStatus,
    pub started_at: Option<i64>,
    pub ended_at: Option<i64>,
    /// Seconds between accept and end; 0 if never accepted.
    pub duration: i64,
    pub created_at: i64,
}

impl Call {
    pub fn is_party(&self, user_id: &str) -> bool {
        self.caller_id == user_id || self.receiver_id == user_id
    }

    pub fn counterpart(&self, user_id: &str) -> &str {
        if self.caller_id == user_id {
            &self.receiver_id
        } else {
            &self.caller_id
        }
    }

    pub fn room_id(&self) -> String {
        format!("room_{}", self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IceServer {
    pub urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

/// Returned to the caller on initiate.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallSession {
    pub call_id: String,
    pub room_id: String,
    pub status: CallStatus,
    pub ice_servers: Vec<IceServer>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateCallRequest {
    pub receiver_id: String,
    #[serde(rename = "type", default)]
    pub call_type: CallType,
    pub group_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallAction {
    Initiate,
    Accept,
    Decline,
    End,
    Missed,
}

/// `call` envelope payload from a client.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallSignal {
    pub action: CallAction,
    pub call_id: Option<String>,
    pub receiver_id: Option<String>,
    #[serde(default)]
    pub call_type: CallType,
    pub group_id: Option<String>,
}
