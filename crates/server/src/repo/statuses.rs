use std::collections::HashMap;

use async_trait::async_trait;

use super::{RepoResult, SqliteStore, StatusRepository};
use crate::db::placeholders;
use crate::models::Status;

impl SqliteStore {
    async fn hydrate_statuses(&self, statuses: &mut [Status]) -> RepoResult<()> {
        if statuses.is_empty() {
            return Ok(());
        }
        let ids = placeholders(statuses.len());
        let index: HashMap<String, usize> = statuses
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id.clone(), i))
            .collect();

        let sql = format!(
            "SELECT status_id, user_id FROM status_views WHERE status_id IN ({}) ORDER BY viewed_at",
            ids
        );
        let mut query = sqlx::query_as::<_, (String, String)>(&sql);
        for s in statuses.iter() {
            query = query.bind(&s.id);
        }
        for (status_id, user_id) in query.fetch_all(&self.pool).await? {
            if let Some(&i) = index.get(&status_id) {
                statuses[i].viewed_by.push(user_id);
            }
        }

        let sql = format!(
            "SELECT status_id, user_id, emoji FROM status_reactions WHERE status_id IN ({})",
            ids
        );
        let mut query = sqlx::query_as::<_, (String, String, String)>(&sql);
        for s in statuses.iter() {
            query = query.bind(&s.id);
        }
        for (status_id, user_id, emoji) in query.fetch_all(&self.pool).await? {
            if let Some(&i) = index.get(&status_id) {
                statuses[i].reactions.insert(user_id, emoji);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl StatusRepository for SqliteStore {
    async fn create(&self, status: &Status) -> RepoResult<()> {
        sqlx::query(
            "INSERT INTO statuses
                (id, user_id, content, media_url, media_type, background_color, font_style,
                 created_at, expires_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&status.id)
        .bind(&status.user_id)
        .bind(&status.content)
        .bind(&status.media_url)
        .bind(status.media_type)
        .bind(&status.background_color)
        .bind(&status.font_style)
        .bind(status.created_at)
        .bind(status.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: &str, now: i64) -> RepoResult<Option<Status>> {
        let status = sqlx::query_as::<_, Status>(
            "SELECT * FROM statuses WHERE id = ? AND expires_at > ?",
        )
        .bind(id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        match status {
            Some(status) => {
                let mut one = [status];
                self.hydrate_statuses(&mut one).await?;
                let [status] = one;
                Ok(Some(status))
            }
            None => Ok(None),
        }
    }

    async fn list_for_users(&self, user_ids: &[String], now: i64) -> RepoResult<Vec<Status>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT * FROM statuses
             WHERE user_id IN ({}) AND expires_at > ?
             ORDER BY created_at",
            placeholders(user_ids.len())
        );
        let mut query = sqlx::query_as::<_, Status>(&sql);
        for id in user_ids {
            query = query.bind(id);
        }
        let mut statuses = query.bind(now).fetch_all(&self.pool).await?;
        self.hydrate_statuses(&mut statuses).await?;
        Ok(statuses)
    }

    async fn add_viewer(&self, id: &str, user_id: &str, now: i64) -> RepoResult<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO status_views (status_id, user_id, viewed_at) VALUES (?, ?, ?)",
        )
        .bind(id)
        .bind(user_id)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_reaction(&self, id: &str, user_id: &str, emoji: &str) -> RepoResult<()> {
        sqlx::query(
            "INSERT INTO status_reactions (status_id, user_id, emoji) VALUES (?, ?, ?)
             ON CONFLICT(status_id, user_id) DO UPDATE SET emoji = excluded.emoji",
        )
        .bind(id)
        .bind(user_id)
        .bind(emoji)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> RepoResult<()> {
        sqlx::query("DELETE FROM statuses WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn purge_expired(&self, now: i64) -> RepoResult<u64> {
        let result = sqlx::query("DELETE FROM statuses WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
