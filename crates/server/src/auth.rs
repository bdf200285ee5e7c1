use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::error::AppError;
use crate::models::{now_millis, AuthUser};

/// Resolves an opaque bearer token to the user it was issued for.
/// Tokens are minted elsewhere; this side only checks them.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, token: &str) -> Result<AuthUser, AppError>;
}

/// Looks tokens up in the `session` table.
pub struct SessionAuthenticator {
    pool: SqlitePool,
}

impl SessionAuthenticator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Authenticator for SessionAuthenticator {
    async fn authenticate(&self, token: &str) -> Result<AuthUser, AppError> {
        if token.is_empty() {
            return Err(AppError::NotAuthenticated);
        }

        let row = sqlx::query_as::<_, (String, String, i64)>(
            r#"SELECT u.id, u.username, s.expires_at
               FROM "session" s
               JOIN "user" u ON u.id = s.user_id
               WHERE s.token = ?"#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((id, username, expires_at)) if expires_at > now_millis() => {
                Ok(AuthUser { id, username })
            }
            Some(_) => {
                tracing::debug!("Rejected expired session token");
                Err(AppError::NotAuthenticated)
            }
            None => Err(AppError::NotAuthenticated),
        }
    }
}
