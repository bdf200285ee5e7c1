use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::SqliteConnection;

use super::{like_pattern, MessageRepository, RepoResult, SqliteStore};
use crate::db::placeholders;
use crate::models::{Message, MessageType};

const VISIBLE_TO_VIEWER: &str = "m.is_deleted = 0
      AND (m.expires_at IS NULL OR m.expires_at > ?)
      AND NOT EXISTS (
          SELECT 1 FROM message_deletions d WHERE d.message_id = m.id AND d.user_id = ?
      )";

impl SqliteStore {
    /// Fills `reactions` and `deleted_for`, which live in side tables.
    async fn hydrate_messages(&self, messages: &mut [Message]) -> RepoResult<()> {
        if messages.is_empty() {
            return Ok(());
        }
        let ids = placeholders(messages.len());

        let sql = format!(
            "SELECT message_id, emoji, user_id FROM message_reactions
             WHERE message_id IN ({}) ORDER BY created_at",
            ids
        );
        let mut query = sqlx::query_as::<_, (String, String, String)>(&sql);
        for m in messages.iter() {
            query = query.bind(&m.id);
        }
        let reactions = query.fetch_all(&self.pool).await?;

        let sql = format!(
            "SELECT message_id, user_id FROM message_deletions WHERE message_id IN ({})",
            ids
        );
        let mut query = sqlx::query_as::<_, (String, String)>(&sql);
        for m in messages.iter() {
            query = query.bind(&m.id);
        }
        let deletions = query.fetch_all(&self.pool).await?;

        let index: HashMap<String, usize> = messages
            .iter()
            .enumerate()
            .map(|(i, m)| (m.id.clone(), i))
            .collect();

        for (message_id, emoji, user_id) in reactions {
            if let Some(&i) = index.get(&message_id) {
                messages[i].reactions.entry(emoji).or_default().push(user_id);
            }
        }
        for (message_id, user_id) in deletions {
            if let Some(&i) = index.get(&message_id) {
                messages[i].deleted_for.push(user_id);
            }
        }
        Ok(())
    }

    /// Re-reads each quoted message so a reply never shows text its target
    /// no longer has: edited, deleted, expired or hidden from `viewer`.
    async fn refresh_reply_snippets(
        &self,
        messages: &mut [Message],
        viewer: &str,
        now: i64,
    ) -> RepoResult<()> {
        let targets: Vec<String> = messages
            .iter()
            .filter_map(|m| m.reply_to_id.clone())
            .collect();
        if targets.is_empty() {
            return Ok(());
        }

        let sql = format!(
            "SELECT m.* FROM messages m WHERE m.id IN ({}) AND {}",
            placeholders(targets.len()),
            VISIBLE_TO_VIEWER
        );
        let mut query = sqlx::query_as::<_, Message>(&sql);
        for id in &targets {
            query = query.bind(id);
        }
        let visible: HashMap<String, String> = query
            .bind(now)
            .bind(viewer)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|m| (m.id.clone(), m.preview()))
            .collect();

        for m in messages.iter_mut() {
            if let Some(target) = m.reply_to_id.as_deref() {
                m.reply_to_content = visible.get(target).cloned();
            }
        }
        Ok(())
    }
}

/// Points the chat preview at the newest message everyone can still see, or
/// clears it when there is none. The activity time is left alone.
async fn refresh_preview(conn: &mut SqliteConnection, chat_id: &str, now: i64) -> RepoResult<()> {
    let newest = sqlx::query_as::<_, Message>(
        "SELECT * FROM messages
         WHERE chat_id = ? AND is_deleted = 0 AND (expires_at IS NULL OR expires_at > ?)
         ORDER BY timestamp DESC, rowid DESC
         LIMIT 1",
    )
    .bind(chat_id)
    .bind(now)
    .fetch_optional(&mut *conn)
    .await?;

    match newest {
        Some(m) => {
            sqlx::query(
                "UPDATE chats
                 SET last_message = ?, last_message_type = ?, last_message_expires_at = ?
                 WHERE id = ?",
            )
            .bind(m.preview())
            .bind(m.message_type)
            .bind(m.expires_at)
            .bind(chat_id)
            .execute(&mut *conn)
            .await?;
        }
        None => {
            sqlx::query(
                "UPDATE chats SET last_message = NULL, last_message_expires_at = NULL WHERE id = ?",
            )
            .bind(chat_id)
            .execute(&mut *conn)
            .await?;
        }
    }
    Ok(())
}

/// Takes a retracted message out of the receiver's unread count and out of
/// any reply quoting it.
async fn retract(conn: &mut SqliteConnection, message: &Message) -> RepoResult<()> {
    if !message.is_read {
        sqlx::query(
            "UPDATE chat_participants SET unread_count = MAX(unread_count - 1, 0)
             WHERE chat_id = ? AND user_id = ?",
        )
        .bind(&message.chat_id)
        .bind(&message.receiver_id)
        .execute(&mut *conn)
        .await?;
    }

    sqlx::query("UPDATE messages SET reply_to_content = NULL WHERE reply_to_id = ?")
        .bind(&message.id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

#[async_trait]
impl MessageRepository for SqliteStore {
    async fn append(&self, message: &Message) -> RepoResult<bool> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO messages
                (id, chat_id, sender_id, receiver_id, content, message_type,
                 media_url, media_thumbnail, media_duration, media_size,
                 reply_to_id, reply_to_content, is_forwarded, forwarded_from_id,
                 is_read, is_delivered, is_deleted, is_edited, edited_at,
                 disappear_after, expires_at, is_encrypted, encrypted_content, timestamp)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO NOTHING",
        )
        .bind(&message.id)
        .bind(&message.chat_id)
        .bind(&message.sender_id)
        .bind(&message.receiver_id)
        .bind(&message.content)
        .bind(message.message_type)
        .bind(&message.media_url)
        .bind(&message.media_thumbnail)
        .bind(message.media_duration)
        .bind(message.media_size)
        .bind(&message.reply_to_id)
        .bind(&message.reply_to_content)
        .bind(message.is_forwarded)
        .bind(&message.forwarded_from_id)
        .bind(message.is_read)
        .bind(message.is_delivered)
        .bind(message.is_deleted)
        .bind(message.is_edited)
        .bind(message.edited_at)
        .bind(message.disappear_after)
        .bind(message.expires_at)
        .bind(message.is_encrypted)
        .bind(&message.encrypted_content)
        .bind(message.timestamp)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            == 1;

        if !inserted {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            "UPDATE chats
             SET last_message = ?, last_message_type = ?, last_message_time = ?,
                 last_message_expires_at = ?
             WHERE id = ?",
        )
        .bind(message.preview())
        .bind(message.message_type)
        .bind(message.timestamp)
        .bind(message.expires_at)
        .bind(&message.chat_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE chat_participants SET unread_count = unread_count + 1
             WHERE chat_id = ? AND user_id = ?",
        )
        .bind(&message.chat_id)
        .bind(&message.receiver_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn get(&self, id: &str) -> RepoResult<Option<Message>> {
        let message = sqlx::query_as::<_, Message>("SELECT * FROM messages WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match message {
            Some(message) => {
                let mut one = [message];
                self.hydrate_messages(&mut one).await?;
                let [message] = one;
                Ok(Some(message))
            }
            None => Ok(None),
        }
    }

    async fn history(
        &self,
        chat_id: &str,
        viewer: &str,
        before: Option<i64>,
        limit: i64,
        now: i64,
    ) -> RepoResult<Vec<Message>> {
        let sql = format!(
            "SELECT m.* FROM messages m
             WHERE m.chat_id = ? AND m.timestamp < ? AND {}
             ORDER BY m.timestamp DESC, m.rowid DESC
             LIMIT ?",
            VISIBLE_TO_VIEWER
        );
        let mut messages = sqlx::query_as::<_, Message>(&sql)
            .bind(chat_id)
            .bind(before.unwrap_or(i64::MAX))
            .bind(now)
            .bind(viewer)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        self.hydrate_messages(&mut messages).await?;
        self.refresh_reply_snippets(&mut messages, viewer, now).await?;
        Ok(messages)
    }

    async fn mark_read(&self, id: &str) -> RepoResult<()> {
        sqlx::query("UPDATE messages SET is_read = 1, is_delivered = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_delivered(&self, id: &str, delivered: bool) -> RepoResult<()> {
        sqlx::query("UPDATE messages SET is_delivered = ? WHERE id = ?")
            .bind(delivered)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn edit(&self, id: &str, content: &str, now: i64) -> RepoResult<()> {
        let mut tx = self.pool.begin().await?;

        let chat_id: Option<String> = sqlx::query_scalar(
            "UPDATE messages SET content = ?, is_edited = 1, edited_at = ? WHERE id = ?
             RETURNING chat_id",
        )
        .bind(content)
        .bind(now)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(chat_id) = chat_id {
            refresh_preview(&mut *tx, &chat_id, now).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn delete_for_everyone(&self, id: &str, now: i64) -> RepoResult<()> {
        let mut tx = self.pool.begin().await?;

        let message = sqlx::query_as::<_, Message>(
            "UPDATE messages SET is_deleted = 1 WHERE id = ? AND is_deleted = 0 RETURNING *",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(message) = message {
            retract(&mut *tx, &message).await?;
            refresh_preview(&mut *tx, &message.chat_id, now).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn delete_for_user(&self, id: &str, user_id: &str) -> RepoResult<()> {
        sqlx::query("INSERT OR IGNORE INTO message_deletions (message_id, user_id) VALUES (?, ?)")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_permanently(&self, id: &str, now: i64) -> RepoResult<()> {
        let mut tx = self.pool.begin().await?;

        let message = sqlx::query_as::<_, Message>("DELETE FROM messages WHERE id = ? RETURNING *")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        if let Some(message) = message {
            // A message already deleted for everyone was retracted then.
            if !message.is_deleted {
                retract(&mut *tx, &message).await?;
            }
            refresh_preview(&mut *tx, &message.chat_id, now).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn add_reaction(
        &self,
        id: &str,
        user_id: &str,
        emoji: &str,
        now: i64,
    ) -> RepoResult<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO message_reactions (message_id, emoji, user_id, created_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(id)
        .bind(emoji)
        .bind(user_id)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn remove_reaction(&self, id: &str, user_id: &str, emoji: &str) -> RepoResult<bool> {
        let result = sqlx::query(
            "DELETE FROM message_reactions WHERE message_id = ? AND emoji = ? AND user_id = ?",
        )
        .bind(id)
        .bind(emoji)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn search(
        &self,
        viewer: &str,
        query: &str,
        chat_id: Option<&str>,
        message_type: Option<MessageType>,
        now: i64,
        limit: i64,
    ) -> RepoResult<Vec<Message>> {
        let sql = format!(
            r#"SELECT m.* FROM messages m
               JOIN chat_participants p ON p.chat_id = m.chat_id AND p.user_id = ?
               WHERE m.content LIKE ? ESCAPE '\'
                 AND m.is_encrypted = 0
                 AND (? IS NULL OR m.chat_id = ?)
                 AND (? IS NULL OR m.message_type = ?)
                 AND {}
               ORDER BY m.timestamp DESC
               LIMIT ?"#,
            VISIBLE_TO_VIEWER
        );
        let mut messages = sqlx::query_as::<_, Message>(&sql)
            .bind(viewer)
            .bind(like_pattern(query))
            .bind(chat_id)
            .bind(chat_id)
            .bind(message_type)
            .bind(message_type)
            .bind(now)
            .bind(viewer)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        self.hydrate_messages(&mut messages).await?;
        self.refresh_reply_snippets(&mut messages, viewer, now).await?;
        Ok(messages)
    }

    async fn purge_expired(&self, now: i64) -> RepoResult<u64> {
        let mut tx = self.pool.begin().await?;

        // Chat previews must not outlive the message they show.
        sqlx::query(
            "UPDATE chats SET last_message = NULL, last_message_expires_at = NULL
             WHERE last_message_expires_at IS NOT NULL AND last_message_expires_at <= ?",
        )
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE chat_participants SET unread_count = MAX(unread_count - (
                 SELECT COUNT(*) FROM messages m
                 WHERE m.chat_id = chat_participants.chat_id
                   AND m.receiver_id = chat_participants.user_id
                   AND m.is_read = 0 AND m.is_deleted = 0
                   AND m.expires_at IS NOT NULL AND m.expires_at <= ?
             ), 0)",
        )
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE messages SET reply_to_content = NULL
             WHERE reply_to_id IN (
                 SELECT id FROM messages WHERE expires_at IS NOT NULL AND expires_at <= ?
             )",
        )
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let result =
            sqlx::query("DELETE FROM messages WHERE expires_at IS NOT NULL AND expires_at <= ?")
                .bind(now)
                .execute(&mut *tx)
                .await?;

        tx.commit().await?;
        Ok(result.rows_affected())
    }
}
