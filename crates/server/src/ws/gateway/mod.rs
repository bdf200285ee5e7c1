mod broadcast;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::mpsc;

pub type SessionId = u64;

/// One live socket belonging to a user.
pub struct Session {
    pub id: SessionId,
    pub tx: mpsc::UnboundedSender<String>,
}

/// A user's first session arrived or their last one left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceChange {
    pub user_id: String,
    pub online: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The user had no other session.
    First,
    Additional,
    /// The session was already registered; nothing changed.
    Duplicate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// That was the user's last session.
    Last,
    Remaining,
    /// Unknown session; nothing changed.
    Absent,
}

/// Who is connected right now, across every device.
///
/// Admit, remove and send for one user all go through that user's map entry,
/// so they are linearised; different users don't wait on each other beyond
/// the shard lock. Presence transitions are pushed onto the feed while that
/// entry is still held, which keeps the feed in mutation order.
pub struct ConnectionRegistry {
    next_id: AtomicU64,
    sessions: DashMap<String, HashMap<SessionId, mpsc::UnboundedSender<String>>>,
    presence_feed: Option<mpsc::UnboundedSender<PresenceChange>>,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRegistry {
    /// A registry nobody listens to for presence changes.
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            sessions: DashMap::new(),
            presence_feed: None,
        }
    }

    pub fn with_presence_feed() -> (Self, mpsc::UnboundedReceiver<PresenceChange>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let registry = Self {
            presence_feed: Some(tx),
            ..Self::new()
        };
        (registry, rx)
    }

    pub fn next_session_id(&self) -> SessionId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn admit(&self, user_id: &str, session: Session) -> Admission {
        let mut entry = self.sessions.entry(user_id.to_string()).or_default();
        if entry.contains_key(&session.id) {
            return Admission::Duplicate;
        }

        let first = entry.is_empty();
        entry.insert(session.id, session.tx);
        if first {
            self.emit(user_id, true);
            tracing::debug!("User {} is online (session {})", user_id, session.id);
            Admission::First
        } else {
            Admission::Additional
        }
    }

    pub fn remove(&self, user_id: &str, session_id: SessionId) -> Removal {
        match self.sessions.entry(user_id.to_string()) {
            Entry::Occupied(mut entry) => {
                if entry.get_mut().remove(&session_id).is_none() {
                    return Removal::Absent;
                }
                if entry.get().is_empty() {
                    self.emit(user_id, false);
                    entry.remove();
                    tracing::debug!("User {} is offline", user_id);
                    Removal::Last
                } else {
                    Removal::Remaining
                }
            }
            Entry::Vacant(_) => Removal::Absent,
        }
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.sessions.contains_key(user_id)
    }

    pub fn session_count(&self, user_id: &str) -> usize {
        self.sessions.get(user_id).map(|s| s.len()).unwrap_or(0)
    }

    fn emit(&self, user_id: &str, online: bool) {
        if let Some(feed) = &self.presence_feed {
            let _ = feed.send(PresenceChange {
                user_id: user_id.to_string(),
                online,
            });
        }
    }
}
