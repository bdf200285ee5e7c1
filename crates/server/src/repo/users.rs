use async_trait::async_trait;

use super::{like_pattern, RepoResult, SqliteStore, UserRepository};
use crate::db::placeholders;
use crate::models::{UpdateProfileRequest, User};

impl SqliteStore {
    async fn load_user_links(&self, user: &mut User) -> RepoResult<()> {
        user.contacts = sqlx::query_scalar::<_, String>(
            "SELECT contact_id FROM user_contacts WHERE user_id = ? ORDER BY created_at",
        )
        .bind(&user.id)
        .fetch_all(&self.pool)
        .await?;

        user.blocked_users = sqlx::query_scalar::<_, String>(
            "SELECT blocked_id FROM user_blocks WHERE user_id = ? ORDER BY created_at",
        )
        .bind(&user.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl UserRepository for SqliteStore {
    async fn find_by_id(&self, id: &str) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(r#"SELECT * FROM "user" WHERE id = ?"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match user {
            Some(mut user) => {
                self.load_user_links(&mut user).await?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    async fn find_by_ids(&self, ids: &[String]) -> RepoResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            r#"SELECT * FROM "user" WHERE id IN ({})"#,
            placeholders(ids.len())
        );
        let mut query = sqlx::query_as::<_, User>(&sql);
        for id in ids {
            query = query.bind(id);
        }
        Ok(query.fetch_all(&self.pool).await?)
    }

    async fn find_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        Ok(
            sqlx::query_as::<_, User>(r#"SELECT * FROM "user" WHERE username = ?"#)
                .bind(username)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn update_profile(&self, id: &str, update: &UpdateProfileRequest) -> RepoResult<()> {
        sqlx::query(
            r#"UPDATE "user"
               SET username = COALESCE(?, username),
                   bio = COALESCE(?, bio),
                   profile_image = COALESCE(?, profile_image),
                   phone = COALESCE(?, phone),
                   public_key = COALESCE(?, public_key)
               WHERE id = ?"#,
        )
        .bind(&update.username)
        .bind(&update.bio)
        .bind(&update.profile_image)
        .bind(&update.phone)
        .bind(&update.public_key)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_push_token(&self, id: &str, token: Option<&str>) -> RepoResult<()> {
        sqlx::query(r#"UPDATE "user" SET push_token = ? WHERE id = ?"#)
            .bind(token)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn push_token(&self, id: &str) -> RepoResult<Option<String>> {
        let token = sqlx::query_scalar::<_, Option<String>>(
            r#"SELECT push_token FROM "user" WHERE id = ?"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(token.flatten())
    }

    async fn search(&self, query: &str, limit: i64) -> RepoResult<Vec<User>> {
        let pattern = like_pattern(query);
        let users = sqlx::query_as::<_, User>(
            r#"SELECT * FROM "user"
               WHERE username LIKE ?1 ESCAPE '\'
                  OR email LIKE ?1 ESCAPE '\'
                  OR phone LIKE ?1 ESCAPE '\'
               ORDER BY username
               LIMIT ?2"#,
        )
        .bind(&pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn set_online(&self, id: &str, online: bool, now: i64) -> RepoResult<()> {
        let last_seen = if online { None } else { Some(now) };
        sqlx::query(r#"UPDATE "user" SET is_online = ?, last_seen = ? WHERE id = ?"#)
            .bind(online)
            .bind(last_seen)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn add_contact(&self, user_id: &str, contact_id: &str) -> RepoResult<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO user_contacts (user_id, contact_id, created_at) VALUES (?, ?, ?)",
        )
        .bind(user_id)
        .bind(contact_id)
        .bind(crate::models::now_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn block(&self, user_id: &str, blocked_id: &str) -> RepoResult<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO user_blocks (user_id, blocked_id, created_at) VALUES (?, ?, ?)",
        )
        .bind(user_id)
        .bind(blocked_id)
        .bind(crate::models::now_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn unblock(&self, user_id: &str, blocked_id: &str) -> RepoResult<()> {
        sqlx::query("DELETE FROM user_blocks WHERE user_id = ? AND blocked_id = ?")
            .bind(user_id)
            .bind(blocked_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn has_blocked(&self, user_id: &str, other_id: &str) -> RepoResult<bool> {
        let found = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM user_blocks WHERE user_id = ? AND blocked_id = ?",
        )
        .bind(user_id)
        .bind(other_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(found > 0)
    }
}
