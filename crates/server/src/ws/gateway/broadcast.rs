use dashmap::mapref::entry::Entry;

use super::{ConnectionRegistry, SessionId};
use crate::ws::events::ServerEvent;

impl ConnectionRegistry {
    /// Queues `event` on every session of `user_id`. True if at least one took it.
    pub fn send(&self, user_id: &str, event: &ServerEvent) -> bool {
        match serde_json::to_string(event) {
            Ok(frame) => self.send_frame(user_id, frame),
            Err(e) => {
                tracing::error!("Failed to encode event: {:?}", e);
                false
            }
        }
    }

    /// Same as [`send`](Self::send) for several users; returns how many were reached.
    pub fn send_many<'a, I>(&self, user_ids: I, event: &ServerEvent) -> usize
    where
        I: IntoIterator<Item = &'a String>,
    {
        let frame = match serde_json::to_string(event) {
            Ok(f) => f,
            Err(e) => {
                tracing::error!("Failed to encode event: {:?}", e);
                return 0;
            }
        };
        user_ids
            .into_iter()
            .filter(|user_id| self.send_frame(user_id, frame.clone()))
            .count()
    }

    /// Only the given session, e.g. an ack or an error for the sender.
    pub fn send_to_session(&self, user_id: &str, session_id: SessionId, event: &ServerEvent) -> bool {
        let frame = match serde_json::to_string(event) {
            Ok(f) => f,
            Err(_) => return false,
        };
        self.sessions
            .get(user_id)
            .and_then(|sessions| sessions.get(&session_id).map(|tx| tx.send(frame).is_ok()))
            .unwrap_or(false)
    }

    /// Sessions whose queue is closed are dropped on the way.
    fn send_frame(&self, user_id: &str, frame: String) -> bool {
        let Entry::Occupied(mut entry) = self.sessions.entry(user_id.to_string()) else {
            return false;
        };

        let mut delivered = false;
        entry.get_mut().retain(|session_id, tx| {
            if tx.send(frame.clone()).is_ok() {
                delivered = true;
                true
            } else {
                tracing::debug!("Dropping dead session {} of user {}", session_id, user_id);
                false
            }
        });

        if entry.get().is_empty() {
            self.emit(user_id, false);
            entry.remove();
        }
        delivered
    }
}
