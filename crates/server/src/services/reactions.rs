use std::sync::Arc;

use ghost_shared::validation::validate_emoji;

use crate::error::AppError;
use crate::models::{now_millis, AuthUser, ReactionAction, ReactionUpdate};
use crate::repo::{ChatRepository, MessageRepository};
use crate::ws::events::ServerEvent;
use crate::ws::gateway::ConnectionRegistry;

/// Reactions are a set per `(message, emoji)`: adding twice or removing
/// something absent changes nothing and relays nothing.
pub struct ReactionFanout {
    messages: Arc<dyn MessageRepository>,
    chats: Arc<dyn ChatRepository>,
    registry: Arc<ConnectionRegistry>,
}

impl ReactionFanout {
    pub fn new(
        messages: Arc<dyn MessageRepository>,
        chats: Arc<dyn ChatRepository>,
        registry: Arc<ConnectionRegistry>,
    ) -> Self {
        Self {
            messages,
            chats,
            registry,
        }
    }

    pub async fn add(&self, user: &AuthUser, message_id: &str, emoji: &str) -> Result<ReactionUpdate, AppError> {
        self.apply(user, message_id, emoji, ReactionAction::Add).await
    }

    pub async fn remove(&self, user: &AuthUser, message_id: &str, emoji: &str) -> Result<ReactionUpdate, AppError> {
        self.apply(user, message_id, emoji, ReactionAction::Remove).await
    }

    pub async fn apply(
        &self,
        user: &AuthUser,
        message_id: &str,
        emoji: &str,
        action: ReactionAction,
    ) -> Result<ReactionUpdate, AppError> {
        validate_emoji(emoji).map_err(AppError::Validation)?;
        let emoji = emoji.trim();
        let now = now_millis();

        let message = match self.messages.get(message_id).await? {
            Some(m) if !m.is_hidden_from(&user.id, now) => m,
            _ => return Err(AppError::not_found("Message not found")),
        };
        let chat = self
            .chats
            .get(&message.chat_id)
            .await?
            .ok_or_else(|| AppError::not_found("Chat not found"))?;
        if !chat.is_participant(&user.id) {
            return Err(AppError::forbidden("Not a participant of this chat"));
        }

        let changed = match action {
            ReactionAction::Add => self.messages.add_reaction(&message.id, &user.id, emoji, now).await?,
            ReactionAction::Remove => self.messages.remove_reaction(&message.id, &user.id, emoji).await?,
        };

        let reactions = self
            .messages
            .get(&message.id)
            .await?
            .map(|m| m.reactions)
            .unwrap_or_default();

        let update = ReactionUpdate {
            message_id: message.id,
            chat_id: chat.id.clone(),
            user_id: user.id.clone(),
            emoji: emoji.to_string(),
            action,
            reactions,
        };

        if changed {
            self.registry
                .send_many(chat.others(&user.id), &ServerEvent::Reaction(update.clone()));
        }
        Ok(update)
    }
}
