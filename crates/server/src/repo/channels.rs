use async_trait::async_trait;

use super::{like_pattern, ChannelRepository, RepoResult, SqliteStore};
use crate::models::Channel;

const CHANNEL_COLUMNS: &str = "c.*,
    (SELECT COUNT(*) FROM channel_members cm WHERE cm.channel_id = c.id) AS subscriber_count";

impl SqliteStore {
    async fn load_admins(&self, channel: &mut Channel) -> RepoResult<()> {
        channel.admins = sqlx::query_scalar::<_, String>(
            "SELECT user_id FROM channel_members WHERE channel_id = ? AND is_admin = 1",
        )
        .bind(&channel.id)
        .fetch_all(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ChannelRepository for SqliteStore {
    async fn create(&self, channel: &Channel) -> RepoResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO channels (id, name, description, image, creator_id, is_public, invite_link, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&channel.id)
        .bind(&channel.name)
        .bind(&channel.description)
        .bind(&channel.image)
        .bind(&channel.creator_id)
        .bind(channel.is_public)
        .bind(&channel.invite_link)
        .bind(channel.created_at)
        .execute(&mut *tx)
        .await?;

        // The creator is the first subscriber and an admin.
        sqlx::query(
            "INSERT INTO channel_members (channel_id, user_id, is_admin, joined_at) VALUES (?, ?, 1, ?)",
        )
        .bind(&channel.id)
        .bind(&channel.creator_id)
        .bind(channel.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, id: &str) -> RepoResult<Option<Channel>> {
        let sql = format!("SELECT {} FROM channels c WHERE c.id = ?", CHANNEL_COLUMNS);
        let channel = sqlx::query_as::<_, Channel>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match channel {
            Some(mut channel) => {
                self.load_admins(&mut channel).await?;
                Ok(Some(channel))
            }
            None => Ok(None),
        }
    }

    async fn list_for_user(&self, user_id: &str) -> RepoResult<Vec<Channel>> {
        let sql = format!(
            "SELECT {} FROM channels c
             JOIN channel_members me ON me.channel_id = c.id AND me.user_id = ?
             ORDER BY c.created_at DESC",
            CHANNEL_COLUMNS
        );
        let mut channels = sqlx::query_as::<_, Channel>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        for channel in &mut channels {
            self.load_admins(channel).await?;
        }
        Ok(channels)
    }

    async fn search_public(&self, query: &str, limit: i64) -> RepoResult<Vec<Channel>> {
        let sql = format!(
            r#"SELECT {} FROM channels c
               WHERE c.is_public = 1
                 AND (c.name LIKE ?1 ESCAPE '\' OR c.description LIKE ?1 ESCAPE '\')
               ORDER BY subscriber_count DESC
               LIMIT ?2"#,
            CHANNEL_COLUMNS
        );
        let mut channels = sqlx::query_as::<_, Channel>(&sql)
            .bind(like_pattern(query))
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        for channel in &mut channels {
            self.load_admins(channel).await?;
        }
        Ok(channels)
    }

    async fn is_subscribed(&self, channel_id: &str, user_id: &str) -> RepoResult<bool> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM channel_members WHERE channel_id = ? AND user_id = ?",
        )
        .bind(channel_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    async fn subscribe(&self, channel_id: &str, user_id: &str, now: i64) -> RepoResult<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO channel_members (channel_id, user_id, is_admin, joined_at)
             VALUES (?, ?, 0, ?)",
        )
        .bind(channel_id)
        .bind(user_id)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn unsubscribe(&self, channel_id: &str, user_id: &str) -> RepoResult<bool> {
        let result =
            sqlx::query("DELETE FROM channel_members WHERE channel_id = ? AND user_id = ?")
                .bind(channel_id)
                .bind(user_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() == 1)
    }
}
