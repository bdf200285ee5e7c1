use std::collections::HashMap;

use async_trait::async_trait;

use super::{ChatRepository, RepoResult, SqliteStore};
use crate::db::placeholders;
use crate::error::AppError;
use crate::models::{now_millis, Chat, MessageType, ParticipantFlag};

#[derive(sqlx::FromRow)]
struct ChatRow {
    id: String,
    last_message: Option<String>,
    last_message_type: MessageType,
    last_message_time: i64,
    last_message_expires_at: Option<i64>,
    disappearing_mode: bool,
    disappear_after: i64,
    created_at: i64,
}

#[derive(sqlx::FromRow)]
struct ParticipantRow {
    chat_id: String,
    user_id: String,
    unread_count: i64,
    is_pinned: bool,
    is_muted: bool,
    is_archived: bool,
}

/// Order-independent key for a 1:1 chat.
fn pair_key(a: &str, b: &str) -> String {
    let mut ids = [a, b];
    ids.sort();
    format!("{}:{}", ids[0], ids[1])
}

impl SqliteStore {
    async fn hydrate_chats(&self, rows: Vec<ChatRow>) -> RepoResult<Vec<Chat>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT chat_id, user_id, unread_count, is_pinned, is_muted, is_archived
             FROM chat_participants WHERE chat_id IN ({}) ORDER BY position",
            placeholders(rows.len())
        );
        let mut query = sqlx::query_as::<_, ParticipantRow>(&sql);
        for row in &rows {
            query = query.bind(&row.id);
        }
        let participants = query.fetch_all(&self.pool).await?;

        let mut by_chat: HashMap<String, Vec<ParticipantRow>> = HashMap::new();
        for p in participants {
            by_chat.entry(p.chat_id.clone()).or_default().push(p);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let members = by_chat.remove(&row.id).unwrap_or_default();
                let mut chat = Chat {
                    id: row.id,
                    participants: Vec::with_capacity(members.len()),
                    last_message: row.last_message,
                    last_message_type: row.last_message_type,
                    last_message_time: row.last_message_time,
                    last_message_expires_at: row.last_message_expires_at,
                    unread_count: HashMap::new(),
                    is_pinned: HashMap::new(),
                    is_muted: HashMap::new(),
                    is_archived: HashMap::new(),
                    disappearing_mode: row.disappearing_mode,
                    disappear_after: row.disappear_after,
                    created_at: row.created_at,
                };
                for m in members {
                    chat.unread_count.insert(m.user_id.clone(), m.unread_count);
                    chat.is_pinned.insert(m.user_id.clone(), m.is_pinned);
                    chat.is_muted.insert(m.user_id.clone(), m.is_muted);
                    chat.is_archived.insert(m.user_id.clone(), m.is_archived);
                    chat.participants.push(m.user_id);
                }
                chat
            })
            .collect())
    }

    async fn one_chat(&self, row: Option<ChatRow>) -> RepoResult<Option<Chat>> {
        match row {
            Some(row) => Ok(self.hydrate_chats(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ChatRepository for SqliteStore {
    async fn get(&self, id: &str) -> RepoResult<Option<Chat>> {
        let row = sqlx::query_as::<_, ChatRow>("SELECT * FROM chats WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        self.one_chat(row).await
    }

    async fn find_direct(&self, a: &str, b: &str) -> RepoResult<Option<Chat>> {
        let row = sqlx::query_as::<_, ChatRow>("SELECT * FROM chats WHERE pair_key = ?")
            .bind(pair_key(a, b))
            .fetch_optional(&self.pool)
            .await?;
        self.one_chat(row).await
    }

    async fn get_or_create_direct(
        &self,
        a: &str,
        b: &str,
        disappearing_mode: bool,
        disappear_after: i64,
    ) -> RepoResult<(Chat, bool)> {
        if a == b {
            return Err(AppError::validation("Cannot start a chat with yourself"));
        }

        let now = now_millis();
        let chat_id = uuid::Uuid::new_v4().to_string();

        let mut tx = self.pool.begin().await?;

        // The UNIQUE pair_key makes the loser of a concurrent create a no-op.
        let created = sqlx::query(
            "INSERT OR IGNORE INTO chats
                (id, pair_key, last_message_time, disappearing_mode, disappear_after, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&chat_id)
        .bind(pair_key(a, b))
        .bind(now)
        .bind(disappearing_mode)
        .bind(disappear_after)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            == 1;

        if created {
            for (position, user_id) in [a, b].iter().enumerate() {
                sqlx::query(
                    "INSERT INTO chat_participants (chat_id, user_id, position) VALUES (?, ?, ?)",
                )
                .bind(&chat_id)
                .bind(user_id)
                .bind(position as i64)
                .execute(&mut *tx)
                .await?;
            }
            for (owner, contact) in [(a, b), (b, a)] {
                sqlx::query(
                    "INSERT OR IGNORE INTO user_contacts (user_id, contact_id, created_at)
                     VALUES (?, ?, ?)",
                )
                .bind(owner)
                .bind(contact)
                .bind(now)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;

        let chat = self
            .find_direct(a, b)
            .await?
            .ok_or_else(|| AppError::not_found("Chat not found"))?;
        Ok((chat, created))
    }

    async fn list_for_user(&self, user_id: &str) -> RepoResult<Vec<Chat>> {
        let rows = sqlx::query_as::<_, ChatRow>(
            "SELECT c.* FROM chats c
             JOIN chat_participants p ON p.chat_id = c.id
             WHERE p.user_id = ?
             ORDER BY c.last_message_time DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        self.hydrate_chats(rows).await
    }

    async fn contact_ids(&self, user_id: &str) -> RepoResult<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT other.user_id
             FROM chat_participants me
             JOIN chat_participants other ON other.chat_id = me.chat_id
             WHERE me.user_id = ?1 AND other.user_id != ?1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn reset_unread(&self, chat_id: &str, user_id: &str) -> RepoResult<()> {
        sqlx::query(
            "UPDATE chat_participants SET unread_count = 0 WHERE chat_id = ? AND user_id = ?",
        )
        .bind(chat_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_flag(
        &self,
        chat_id: &str,
        user_id: &str,
        flag: ParticipantFlag,
        value: bool,
    ) -> RepoResult<()> {
        let sql = format!(
            "UPDATE chat_participants SET {} = ? WHERE chat_id = ? AND user_id = ?",
            flag.column()
        );
        sqlx::query(&sql)
            .bind(value)
            .bind(chat_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_disappearing(
        &self,
        chat_id: &str,
        enabled: bool,
        disappear_after: Option<i64>,
    ) -> RepoResult<Chat> {
        sqlx::query(
            "UPDATE chats
             SET disappearing_mode = ?, disappear_after = COALESCE(?, disappear_after)
             WHERE id = ?",
        )
        .bind(enabled)
        .bind(disappear_after)
        .bind(chat_id)
        .execute(&self.pool)
        .await?;

        ChatRepository::get(self, chat_id)
            .await?
            .ok_or_else(|| AppError::not_found("Chat not found"))
    }
}
