use async_trait::async_trait;

use super::{GroupRepository, RepoResult, SqliteStore};
use crate::models::Group;

impl SqliteStore {
    async fn load_members(&self, group: &mut Group) -> RepoResult<()> {
        let rows = sqlx::query_as::<_, (String, bool)>(
            "SELECT user_id, is_admin FROM group_members WHERE group_id = ? ORDER BY joined_at",
        )
        .bind(&group.id)
        .fetch_all(&self.pool)
        .await?;

        for (user_id, is_admin) in rows {
            if is_admin {
                group.admins.push(user_id.clone());
            }
            group.members.push(user_id);
        }
        Ok(())
    }
}

#[async_trait]
impl GroupRepository for SqliteStore {
    async fn create(&self, group: &Group) -> RepoResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO groups (id, name, description, image, creator_id, only_admins_can_post, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&group.id)
        .bind(&group.name)
        .bind(&group.description)
        .bind(&group.image)
        .bind(&group.creator_id)
        .bind(group.only_admins_can_post)
        .bind(group.created_at)
        .execute(&mut *tx)
        .await?;

        for member in &group.members {
            sqlx::query(
                "INSERT OR IGNORE INTO group_members (group_id, user_id, is_admin, joined_at)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(&group.id)
            .bind(member)
            .bind(group.is_admin(member))
            .bind(group.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, id: &str) -> RepoResult<Option<Group>> {
        let group = sqlx::query_as::<_, Group>("SELECT * FROM groups WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match group {
            Some(mut group) => {
                self.load_members(&mut group).await?;
                Ok(Some(group))
            }
            None => Ok(None),
        }
    }

    async fn list_for_user(&self, user_id: &str) -> RepoResult<Vec<Group>> {
        let mut groups = sqlx::query_as::<_, Group>(
            "SELECT g.* FROM groups g
             JOIN group_members m ON m.group_id = g.id
             WHERE m.user_id = ?
             ORDER BY g.created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        for group in &mut groups {
            self.load_members(group).await?;
        }
        Ok(groups)
    }

    async fn add_member(&self, group_id: &str, user_id: &str, now: i64) -> RepoResult<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO group_members (group_id, user_id, is_admin, joined_at)
             VALUES (?, ?, 0, ?)",
        )
        .bind(group_id)
        .bind(user_id)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn remove_member(&self, group_id: &str, user_id: &str) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM group_members WHERE group_id = ? AND user_id = ?")
            .bind(group_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}
