use async_trait::async_trait;

use super::{CallRepository, RepoResult, SqliteStore};
use crate::models::{Call, CallStatus};

#[async_trait]
impl CallRepository for SqliteStore {
    async fn create(&self, call: &Call) -> RepoResult<()> {
        sqlx::query(
            "INSERT INTO calls
                (id, caller_id, receiver_id, group_id, call_type, status,
                 started_at, ended_at, duration, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&call.id)
        .bind(&call.caller_id)
        .bind(&call.receiver_id)
        .bind(&call.group_id)
        .bind(call.call_type)
        .bind(call.status)
        .bind(call.started_at)
        .bind(call.ended_at)
        .bind(call.duration)
        .bind(call.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: &str) -> RepoResult<Option<Call>> {
        let call = sqlx::query_as::<_, Call>("SELECT * FROM calls WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(call)
    }

    async fn transition(
        &self,
        id: &str,
        from: &[CallStatus],
        to: CallStatus,
        now: i64,
    ) -> RepoResult<Option<Call>> {
        if from.is_empty() {
            return Ok(None);
        }

        // Accept stamps the start; every terminal state stamps the end and
        // settles the duration in whole seconds.
        let stamps = match to {
            CallStatus::Ongoing => ", started_at = ?1",
            CallStatus::Ended | CallStatus::Declined | CallStatus::Missed => {
                ", ended_at = ?1,
                 duration = CASE WHEN started_at IS NULL THEN 0
                                 ELSE MAX(0, (?1 - started_at) / 1000) END"
            }
            CallStatus::Initiated | CallStatus::Ringing => "",
        };

        let guard: Vec<String> = (0..from.len()).map(|i| format!("?{}", i + 4)).collect();
        let sql = format!(
            "UPDATE calls SET status = ?2{}
             WHERE id = ?3 AND status IN ({})
             RETURNING *",
            stamps,
            guard.join(", ")
        );

        let mut query = sqlx::query_as::<_, Call>(&sql).bind(now).bind(to).bind(id);
        for status in from {
            query = query.bind(*status);
        }
        Ok(query.fetch_optional(&self.pool).await?)
    }

    async fn history(&self, user_id: &str, limit: i64) -> RepoResult<Vec<Call>> {
        let calls = sqlx::query_as::<_, Call>(
            "SELECT * FROM calls
             WHERE caller_id = ?1 OR receiver_id = ?1
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(calls)
    }
}
