mod call;
mod chat;
mod group;
mod message;
mod status;
mod user;

pub use call::*;
pub use chat::*;
pub use group::*;
pub use message::*;
pub use status::*;
pub use user::*;

use std::sync::atomic::{AtomicI64, Ordering};

use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse<T: Serialize> {
    pub items: Vec<T>,
    pub cursor: Option<String>,
    pub has_more: bool,
}

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub username: String,
}

static LAST_MILLIS: AtomicI64 = AtomicI64::new(0);

/// Wall-clock epoch milliseconds, strictly greater than any previously
/// returned value. History cursors rely on timestamps being unique.
pub fn now_millis() -> i64 {
    let now = chrono::Utc::now().timestamp_millis();
    let prev = match LAST_MILLIS.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |prev| {
        Some(now.max(prev + 1))
    }) {
        Ok(prev) | Err(prev) => prev,
    };
    now.max(prev + 1)
}
