//! Storage seams. Each entity gets an object-safe trait so the services can be
//! handed any backing store; [`SqliteStore`] is the one that ships.

mod calls;
mod channels;
mod chats;
mod groups;
mod messages;
mod statuses;
mod users;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::error::AppError;
use crate::models::{
    Call, CallStatus, Channel, Chat, Group, Message, MessageType, ParticipantFlag, Status,
    UpdateProfileRequest, User,
};

pub type RepoResult<T> = Result<T, AppError>;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> RepoResult<Option<User>>;
    async fn find_by_ids(&self, ids: &[String]) -> RepoResult<Vec<User>>;
    async fn find_by_username(&self, username: &str) -> RepoResult<Option<User>>;
    /// Writes the fields that are present; the rest keep their values.
    async fn update_profile(&self, id: &str, update: &UpdateProfileRequest) -> RepoResult<()>;
    async fn set_push_token(&self, id: &str, token: Option<&str>) -> RepoResult<()>;
    async fn push_token(&self, id: &str) -> RepoResult<Option<String>>;
    /// Username, email or phone substring match.
    async fn search(&self, query: &str, limit: i64) -> RepoResult<Vec<User>>;
    /// Online clears `last_seen`; offline stamps it with `now`.
    async fn set_online(&self, id: &str, online: bool, now: i64) -> RepoResult<()>;
    async fn add_contact(&self, user_id: &str, contact_id: &str) -> RepoResult<()>;
    async fn block(&self, user_id: &str, blocked_id: &str) -> RepoResult<()>;
    async fn unblock(&self, user_id: &str, blocked_id: &str) -> RepoResult<()>;
    /// Whether `user_id` has blocked `other_id`.
    async fn has_blocked(&self, user_id: &str, other_id: &str) -> RepoResult<bool>;
}

#[async_trait]
pub trait ChatRepository: Send + Sync {
    async fn get(&self, id: &str) -> RepoResult<Option<Chat>>;
    async fn find_direct(&self, a: &str, b: &str) -> RepoResult<Option<Chat>>;
    /// Exactly one chat per unordered pair, even under concurrent calls.
    /// The flag is true when this call created it.
    async fn get_or_create_direct(
        &self,
        a: &str,
        b: &str,
        disappearing_mode: bool,
        disappear_after: i64,
    ) -> RepoResult<(Chat, bool)>;
    /// Newest activity first.
    async fn list_for_user(&self, user_id: &str) -> RepoResult<Vec<Chat>>;
    /// Everyone sharing at least one chat with `user_id`.
    async fn contact_ids(&self, user_id: &str) -> RepoResult<Vec<String>>;
    async fn reset_unread(&self, chat_id: &str, user_id: &str) -> RepoResult<()>;
    async fn set_flag(
        &self,
        chat_id: &str,
        user_id: &str,
        flag: ParticipantFlag,
        value: bool,
    ) -> RepoResult<()>;
    async fn set_disappearing(
        &self,
        chat_id: &str,
        enabled: bool,
        disappear_after: Option<i64>,
    ) -> RepoResult<Chat>;
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Inserts the message, refreshes the chat preview and bumps the
    /// receiver's unread count in one transaction. Returns false (and changes
    /// nothing) when a message with the same id already exists.
    async fn append(&self, message: &Message) -> RepoResult<bool>;
    async fn get(&self, id: &str) -> RepoResult<Option<Message>>;
    /// Newest first, strictly older than `before`. Skips what `viewer` can't see
    /// and quotes reply targets as they currently stand.
    async fn history(
        &self,
        chat_id: &str,
        viewer: &str,
        before: Option<i64>,
        limit: i64,
        now: i64,
    ) -> RepoResult<Vec<Message>>;
    async fn mark_read(&self, id: &str) -> RepoResult<()>;
    async fn set_delivered(&self, id: &str, delivered: bool) -> RepoResult<()>;
    /// Also refreshes the chat preview.
    async fn edit(&self, id: &str, content: &str, now: i64) -> RepoResult<()>;
    /// Soft delete. Undoes the message's unread bump and moves the chat
    /// preview back to the newest remaining message.
    async fn delete_for_everyone(&self, id: &str, now: i64) -> RepoResult<()>;
    async fn delete_for_user(&self, id: &str, user_id: &str) -> RepoResult<()>;
    /// Hard delete with the same bookkeeping as [`Self::delete_for_everyone`].
    async fn delete_permanently(&self, id: &str, now: i64) -> RepoResult<()>;
    /// Set insert; false when the user already had that reaction.
    async fn add_reaction(&self, id: &str, user_id: &str, emoji: &str, now: i64)
        -> RepoResult<bool>;
    /// Set delete; false when there was nothing to remove.
    async fn remove_reaction(&self, id: &str, user_id: &str, emoji: &str) -> RepoResult<bool>;
    async fn search(
        &self,
        viewer: &str,
        query: &str,
        chat_id: Option<&str>,
        message_type: Option<MessageType>,
        now: i64,
        limit: i64,
    ) -> RepoResult<Vec<Message>>;
    async fn purge_expired(&self, now: i64) -> RepoResult<u64>;
}

#[async_trait]
pub trait CallRepository: Send + Sync {
    async fn create(&self, call: &Call) -> RepoResult<()>;
    async fn get(&self, id: &str) -> RepoResult<Option<Call>>;
    /// Moves the call to `to` only if its status is currently in `from`.
    /// `None` means the guard failed and nothing was written.
    async fn transition(
        &self,
        id: &str,
        from: &[CallStatus],
        to: CallStatus,
        now: i64,
    ) -> RepoResult<Option<Call>>;
    async fn history(&self, user_id: &str, limit: i64) -> RepoResult<Vec<Call>>;
}

#[async_trait]
pub trait StatusRepository: Send + Sync {
    async fn create(&self, status: &Status) -> RepoResult<()>;
    /// Live statuses only.
    async fn get(&self, id: &str, now: i64) -> RepoResult<Option<Status>>;
    async fn list_for_users(&self, user_ids: &[String], now: i64) -> RepoResult<Vec<Status>>;
    async fn add_viewer(&self, id: &str, user_id: &str, now: i64) -> RepoResult<()>;
    /// One reaction per viewer; a second call replaces the first.
    async fn set_reaction(&self, id: &str, user_id: &str, emoji: &str) -> RepoResult<()>;
    async fn delete(&self, id: &str) -> RepoResult<()>;
    async fn purge_expired(&self, now: i64) -> RepoResult<u64>;
}

#[async_trait]
pub trait GroupRepository: Send + Sync {
    async fn create(&self, group: &Group) -> RepoResult<()>;
    async fn get(&self, id: &str) -> RepoResult<Option<Group>>;
    async fn list_for_user(&self, user_id: &str) -> RepoResult<Vec<Group>>;
    async fn add_member(&self, group_id: &str, user_id: &str, now: i64) -> RepoResult<bool>;
    async fn remove_member(&self, group_id: &str, user_id: &str) -> RepoResult<bool>;
}

#[async_trait]
pub trait ChannelRepository: Send + Sync {
    async fn create(&self, channel: &Channel) -> RepoResult<()>;
    async fn get(&self, id: &str) -> RepoResult<Option<Channel>>;
    async fn list_for_user(&self, user_id: &str) -> RepoResult<Vec<Channel>>;
    async fn search_public(&self, query: &str, limit: i64) -> RepoResult<Vec<Channel>>;
    async fn is_subscribed(&self, channel_id: &str, user_id: &str) -> RepoResult<bool>;
    async fn subscribe(&self, channel_id: &str, user_id: &str, now: i64) -> RepoResult<bool>;
    async fn unsubscribe(&self, channel_id: &str, user_id: &str) -> RepoResult<bool>;
}

/// One handle per entity, shared by the services.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub chats: Arc<dyn ChatRepository>,
    pub messages: Arc<dyn MessageRepository>,
    pub calls: Arc<dyn CallRepository>,
    pub statuses: Arc<dyn StatusRepository>,
    pub groups: Arc<dyn GroupRepository>,
    pub channels: Arc<dyn ChannelRepository>,
}

impl Repositories {
    pub fn sqlite(pool: SqlitePool) -> Self {
        let store = Arc::new(SqliteStore::new(pool));
        Self {
            users: store.clone(),
            chats: store.clone(),
            messages: store.clone(),
            calls: store.clone(),
            statuses: store.clone(),
            groups: store.clone(),
            channels: store,
        }
    }
}

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// `%query%` with LIKE wildcards escaped; pair with `ESCAPE '\'`.
pub(crate) fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}
