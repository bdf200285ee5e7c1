use std::sync::Arc;

use ghost_shared::constants::{MAX_MESSAGE_PAGE_SIZE, MESSAGE_PAGE_SIZE};
use ghost_shared::validation::validate_message_content;

use crate::error::AppError;
use crate::models::{
    now_millis, AuthUser, Chat, DeleteMessageQuery, DeliveredMessage, ForwardMessageRequest,
    HistoryQuery, Message, PaginatedResponse, SendMessageRequest,
};
use crate::repo::Repositories;
use crate::services::expiry::resolve_expiry;
use crate::services::media::validate_media_url;
use crate::services::push::{PushDispatcher, PushKind, PushPayload};
use crate::ws::events::ServerEvent;
use crate::ws::gateway::ConnectionRegistry;

/// The single send path. Socket `message` envelopes and `POST /api/messages`
/// both end up in [`MessageRouter::send`]: validate, apply expiry, persist,
/// relay, and report whether a live session of the receiver got it.
pub struct MessageRouter {
    repos: Repositories,
    registry: Arc<ConnectionRegistry>,
    push: Arc<PushDispatcher>,
}

impl MessageRouter {
    pub fn new(
        repos: Repositories,
        registry: Arc<ConnectionRegistry>,
        push: Arc<PushDispatcher>,
    ) -> Self {
        Self {
            repos,
            registry,
            push,
        }
    }

    /// The chat, if `user_id` is in it.
    pub async fn chat_for(&self, user_id: &str, chat_id: &str) -> Result<Chat, AppError> {
        let chat = self
            .repos
            .chats
            .get(chat_id)
            .await?
            .ok_or_else(|| AppError::not_found("Chat not found"))?;
        if !chat.is_participant(user_id) {
            return Err(AppError::forbidden("Not a participant of this chat"));
        }
        Ok(chat)
    }

    pub async fn send(
        &self,
        sender: &AuthUser,
        req: SendMessageRequest,
    ) -> Result<DeliveredMessage, AppError> {
        validate_send(&req)?;

        let chat = self.chat_for(&sender.id, &req.chat_id).await?;
        let receiver_id = resolve_receiver(&chat, &sender.id, req.receiver_id.as_deref())?;

        if self.repos.users.has_blocked(&receiver_id, &sender.id).await? {
            return Err(AppError::forbidden("You cannot message this user"));
        }

        // A client retrying with the same id gets the original back.
        if let Some(id) = req.id.as_deref() {
            if let Some(existing) = self.repos.messages.get(id).await? {
                return replay(sender, existing);
            }
        }

        let now = now_millis();
        let expiry = resolve_expiry(req.disappear_after, chat.ghost_default(), now)?;

        let reply_to_content = match req.reply_to_id.as_deref() {
            Some(reply_id) => Some(self.reply_snippet(&chat, &sender.id, reply_id, now).await?),
            None => None,
        };

        let message = Message {
            id: req
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            chat_id: chat.id.clone(),
            sender_id: sender.id.clone(),
            receiver_id,
            content: req.content,
            message_type: req.message_type,
            media_url: req.media_url,
            media_thumbnail: req.media_thumbnail,
            media_duration: req.media_duration,
            media_size: req.media_size,
            reply_to_id: req.reply_to_id,
            reply_to_content,
            is_forwarded: req.forwarded_from_id.is_some(),
            forwarded_from_id: req.forwarded_from_id,
            reactions: Default::default(),
            is_read: false,
            is_delivered: false,
            is_deleted: false,
            deleted_for: Vec::new(),
            is_edited: false,
            edited_at: None,
            disappear_after: expiry.disappear_after,
            expires_at: expiry.expires_at,
            is_encrypted: req.is_encrypted,
            encrypted_content: req.encrypted_content,
            timestamp: now,
        };

        if !self.repos.messages.append(&message).await? {
            // Lost a race with a concurrent retry of the same id.
            let existing = self
                .repos
                .messages
                .get(&message.id)
                .await?
                .ok_or_else(|| AppError::not_found("Message not found"))?;
            return replay(sender, existing);
        }

        Ok(self.relay_new(sender, &chat, message).await)
    }

    async fn relay_new(&self, sender: &AuthUser, chat: &Chat, mut message: Message) -> DeliveredMessage {
        let delivered = self
            .registry
            .send(&message.receiver_id, &ServerEvent::Message(message.clone()));

        if delivered {
            message.is_delivered = true;
            if let Err(e) = self.repos.messages.set_delivered(&message.id, true).await {
                tracing::error!("Failed to flag message {} delivered: {:?}", message.id, e);
            }
        } else if !chat.is_muted.get(&message.receiver_id).copied().unwrap_or(false) {
            self.push.dispatch(PushPayload {
                user_id: message.receiver_id.clone(),
                kind: PushKind::Message,
                title: sender.username.clone(),
                body: message.preview(),
                chat_id: Some(message.chat_id.clone()),
                device_token: None,
            });
        }

        tracing::debug!(
            "Message {} in chat {} delivered={}",
            message.id,
            message.chat_id,
            delivered
        );
        DeliveredMessage { message, delivered }
    }

    async fn reply_snippet(
        &self,
        chat: &Chat,
        user_id: &str,
        reply_id: &str,
        now: i64,
    ) -> Result<String, AppError> {
        match self.repos.messages.get(reply_id).await? {
            Some(target) if target.chat_id == chat.id && !target.is_hidden_from(user_id, now) => {
                Ok(target.preview())
            }
            _ => Err(AppError::not_found("Reply target not found")),
        }
    }

    /// Relays a typing indicator; returns how many participants were reached.
    pub async fn typing(&self, user: &AuthUser, chat_id: &str, is_typing: bool) -> Result<usize, AppError> {
        let chat = self.chat_for(&user.id, chat_id).await?;
        Ok(self.registry.send_many(
            chat.others(&user.id),
            &ServerEvent::Typing {
                chat_id: chat.id.clone(),
                user_id: user.id.clone(),
                is_typing,
            },
        ))
    }

    /// Marks the message read, clears the reader's unread count and tells the
    /// other participants.
    pub async fn mark_read(
        &self,
        reader: &AuthUser,
        chat_id: &str,
        message_id: &str,
    ) -> Result<usize, AppError> {
        let chat = self.chat_for(&reader.id, chat_id).await?;
        let now = now_millis();

        let message = match self.repos.messages.get(message_id).await? {
            Some(m) if m.chat_id == chat.id && !m.is_hidden_from(&reader.id, now) => m,
            _ => return Err(AppError::not_found("Message not found")),
        };
        if message.sender_id == reader.id {
            return Err(AppError::validation("Cannot mark your own message as read"));
        }

        self.repos.messages.mark_read(&message.id).await?;
        self.repos.chats.reset_unread(&chat.id, &reader.id).await?;

        Ok(self.registry.send_many(
            chat.others(&reader.id),
            &ServerEvent::Read {
                chat_id: chat.id.clone(),
                message_id: message.id,
                reader_id: reader.id.clone(),
                read_at: now,
            },
        ))
    }

    /// A page of history, oldest first. Opening a chat clears its unread count.
    pub async fn history(
        &self,
        viewer: &AuthUser,
        chat_id: &str,
        query: &HistoryQuery,
    ) -> Result<PaginatedResponse<Message>, AppError> {
        let chat = self.chat_for(&viewer.id, chat_id).await?;
        let limit = query
            .limit
            .unwrap_or(MESSAGE_PAGE_SIZE)
            .clamp(1, MAX_MESSAGE_PAGE_SIZE);

        let mut items = self
            .repos
            .messages
            .history(&chat.id, &viewer.id, query.before, limit + 1, now_millis())
            .await?;

        let has_more = items.len() as i64 > limit;
        if has_more {
            items.pop();
        }
        items.reverse();

        let cursor = if has_more {
            items.first().map(|m| m.timestamp.to_string())
        } else {
            None
        };

        self.repos.chats.reset_unread(&chat.id, &viewer.id).await?;

        Ok(PaginatedResponse {
            items,
            cursor,
            has_more,
        })
    }

    /// Copies a message into each target chat through the normal send path.
    pub async fn forward(
        &self,
        user: &AuthUser,
        req: ForwardMessageRequest,
    ) -> Result<Vec<DeliveredMessage>, AppError> {
        if req.to_chat_ids.is_empty() {
            return Err(AppError::validation("No target chats"));
        }

        let original = self.visible_message(&user.id, &req.message_id).await?;
        if original.is_encrypted {
            return Err(AppError::validation("Encrypted messages cannot be forwarded"));
        }

        let mut targets: Vec<Chat> = Vec::new();
        for chat_id in &req.to_chat_ids {
            if targets.iter().any(|c| &c.id == chat_id) {
                continue;
            }
            targets.push(self.chat_for(&user.id, chat_id).await?);
        }

        let mut sent = Vec::with_capacity(targets.len());
        for chat in targets {
            let copy = SendMessageRequest {
                chat_id: chat.id,
                content: original.content.clone(),
                message_type: original.message_type,
                media_url: original.media_url.clone(),
                media_thumbnail: original.media_thumbnail.clone(),
                media_duration: original.media_duration,
                media_size: original.media_size,
                forwarded_from_id: Some(original.id.clone()),
                ..Default::default()
            };
            sent.push(self.send(user, copy).await?);
        }
        Ok(sent)
    }

    pub async fn edit(&self, user: &AuthUser, message_id: &str, content: &str) -> Result<Message, AppError> {
        let message = self.visible_message(&user.id, message_id).await?;
        if message.sender_id != user.id {
            return Err(AppError::forbidden("Only the sender can edit a message"));
        }
        if message.is_encrypted {
            return Err(AppError::validation("Encrypted messages cannot be edited"));
        }
        validate_message_content(content, message.media_url.is_some())
            .map_err(AppError::Validation)?;

        let now = now_millis();
        self.repos.messages.edit(&message.id, content, now).await?;

        let chat = self.chat_for(&user.id, &message.chat_id).await?;
        self.registry.send_many(
            chat.others(&user.id),
            &ServerEvent::MessageEdited {
                message_id: message.id.clone(),
                chat_id: chat.id.clone(),
                content: content.to_string(),
                edited_at: now,
            },
        );

        Ok(Message {
            content: content.to_string(),
            is_edited: true,
            edited_at: Some(now),
            ..message
        })
    }

    /// Hide for the caller only, hide for everyone, or remove outright.
    /// The last two are sender-only.
    pub async fn delete(
        &self,
        user: &AuthUser,
        message_id: &str,
        mode: &DeleteMessageQuery,
    ) -> Result<(), AppError> {
        let message = self
            .repos
            .messages
            .get(message_id)
            .await?
            .ok_or_else(|| AppError::not_found("Message not found"))?;
        let chat = self.chat_for(&user.id, &message.chat_id).await?;

        if !mode.for_everyone && !mode.permanent {
            return self.repos.messages.delete_for_user(&message.id, &user.id).await;
        }

        if message.sender_id != user.id {
            return Err(AppError::forbidden("Only the sender can delete for everyone"));
        }
        let now = now_millis();
        if mode.permanent {
            self.repos.messages.delete_permanently(&message.id, now).await?;
        } else {
            self.repos.messages.delete_for_everyone(&message.id, now).await?;
        }

        self.registry.send_many(
            chat.others(&user.id),
            &ServerEvent::MessageDeleted {
                message_id: message.id,
                chat_id: chat.id.clone(),
            },
        );
        Ok(())
    }

    /// A message the user can see, in a chat they belong to.
    async fn visible_message(&self, user_id: &str, message_id: &str) -> Result<Message, AppError> {
        let message = match self.repos.messages.get(message_id).await? {
            Some(m) if !m.is_hidden_from(user_id, now_millis()) => m,
            _ => return Err(AppError::not_found("Message not found")),
        };
        self.chat_for(user_id, &message.chat_id).await?;
        Ok(message)
    }
}

fn validate_send(req: &SendMessageRequest) -> Result<(), AppError> {
    if req.chat_id.trim().is_empty() {
        return Err(AppError::validation("chatId is required"));
    }
    if req.message_type.needs_media() && req.media_url.is_none() {
        return Err(AppError::validation("mediaUrl is required for this message type"));
    }
    if let Some(url) = req.media_url.as_deref() {
        validate_media_url(url)?;
    }
    if req.is_encrypted {
        match req.encrypted_content.as_deref() {
            Some(c) if !c.is_empty() => {}
            _ => return Err(AppError::validation("encryptedContent is required")),
        }
    }
    if req.media_duration.is_some_and(|d| d < 0) || req.media_size.is_some_and(|s| s < 0) {
        return Err(AppError::validation("Media duration and size cannot be negative"));
    }

    let has_payload = req.media_url.is_some() || req.is_encrypted;
    validate_message_content(&req.content, has_payload).map_err(AppError::Validation)
}

/// The named receiver, or the other side of a 1:1 chat.
fn resolve_receiver(chat: &Chat, sender_id: &str, requested: Option<&str>) -> Result<String, AppError> {
    match requested {
        Some(r) if r == sender_id => Err(AppError::validation("Cannot send a message to yourself")),
        Some(r) if !chat.is_participant(r) => {
            Err(AppError::forbidden("Receiver is not a participant of this chat"))
        }
        Some(r) => Ok(r.to_string()),
        None => chat
            .others(sender_id)
            .next()
            .cloned()
            .ok_or_else(|| AppError::validation("Chat has no other participant")),
    }
}

fn replay(sender: &AuthUser, existing: Message) -> Result<DeliveredMessage, AppError> {
    if existing.sender_id != sender.id {
        return Err(AppError::validation("Message id already in use"));
    }
    let delivered = existing.is_delivered;
    Ok(DeliveredMessage {
        message: existing,
        delivered,
    })
}
