use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::AppError;
use crate::models::now_millis;
use crate::repo::{ChatRepository, UserRepository};
use crate::ws::events::ServerEvent;
use crate::ws::gateway::{ConnectionRegistry, PresenceChange, SessionId};

/// Turns first-session / last-session transitions into persisted
/// `is_online` + `last_seen` and an `online_status` fan-out to everyone the
/// user shares a chat with.
pub struct PresenceTracker {
    registry: Arc<ConnectionRegistry>,
    users: Arc<dyn UserRepository>,
    chats: Arc<dyn ChatRepository>,
}

impl PresenceTracker {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        users: Arc<dyn UserRepository>,
        chats: Arc<dyn ChatRepository>,
    ) -> Self {
        Self {
            registry,
            users,
            chats,
        }
    }

    /// Applies the registry's feed in order until the registry is dropped.
    pub fn spawn(self: Arc<Self>, mut feed: mpsc::UnboundedReceiver<PresenceChange>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(change) = feed.recv().await {
                self.apply(&change).await;
            }
            tracing::debug!("Presence feed closed");
        })
    }

    pub async fn apply(&self, change: &PresenceChange) {
        let result = if change.online {
            self.on_admit(&change.user_id).await
        } else {
            self.on_remove(&change.user_id).await
        };
        if let Err(e) = result {
            tracing::error!("Presence update for {} failed: {:?}", change.user_id, e);
        }
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.registry.is_online(user_id)
    }

    /// Returns how many contacts were told.
    pub async fn on_admit(&self, user_id: &str) -> Result<usize, AppError> {
        self.announce(user_id, true, None).await
    }

    pub async fn on_remove(&self, user_id: &str) -> Result<usize, AppError> {
        self.announce(user_id, false, Some(now_millis())).await
    }

    async fn announce(
        &self,
        user_id: &str,
        online: bool,
        last_seen: Option<i64>,
    ) -> Result<usize, AppError> {
        // Fan-out still happens if the write fails; live state wins.
        if let Err(e) = self
            .users
            .set_online(user_id, online, last_seen.unwrap_or_else(now_millis))
            .await
        {
            tracing::error!("Failed to persist presence for {}: {:?}", user_id, e);
        }

        let contacts = self.chats.contact_ids(user_id).await?;
        let event = ServerEvent::OnlineStatus {
            user_id: user_id.to_string(),
            is_online: online,
            last_seen,
        };
        let notified = self.registry.send_many(&contacts, &event);

        tracing::info!(
            "{} is {}; notified {} contact(s)",
            user_id,
            if online { "online" } else { "offline" },
            notified
        );
        Ok(notified)
    }

    /// One `online_status` per currently online contact, sent to a fresh session.
    pub async fn send_snapshot(&self, user_id: &str, session_id: SessionId) -> Result<(), AppError> {
        for contact in self.chats.contact_ids(user_id).await? {
            if self.registry.is_online(&contact) {
                self.registry.send_to_session(
                    user_id,
                    session_id,
                    &ServerEvent::OnlineStatus {
                        user_id: contact,
                        is_online: true,
                        last_seen: None,
                    },
                );
            }
        }
        Ok(())
    }
}
