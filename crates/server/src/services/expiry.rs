use std::sync::Arc;
use std::time::Duration;

use ghost_shared::constants::STATUS_TTL_MS;
use ghost_shared::validation::validate_disappear_after;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::error::AppError;
use crate::models::now_millis;
use crate::repo::{MessageRepository, StatusRepository};

/// How long a message lives and when it stops existing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expiry {
    pub disappear_after: Option<i64>,
    pub expires_at: Option<i64>,
}

impl Expiry {
    pub const NEVER: Expiry = Expiry {
        disappear_after: None,
        expires_at: None,
    };
}

/// The message's own setting wins over the chat's ghost default.
/// `Some(0)` on the message opts out even when the chat is in ghost mode.
pub fn resolve_expiry(
    explicit: Option<i64>,
    chat_default: Option<i64>,
    now: i64,
) -> Result<Expiry, AppError> {
    if let Some(ms) = explicit {
        validate_disappear_after(ms).map_err(AppError::Validation)?;
    }

    match explicit.or(chat_default) {
        Some(ms) if ms > 0 => Ok(Expiry {
            disappear_after: Some(ms),
            expires_at: Some(now.saturating_add(ms)),
        }),
        _ => Ok(Expiry::NEVER),
    }
}

pub fn status_expires_at(created_at: i64) -> i64 {
    created_at + STATUS_TTL_MS
}

/// Physically removes expired messages and statuses. Readers already filter
/// on `expires_at`, so this only reclaims storage.
pub struct ExpirySweeper {
    messages: Arc<dyn MessageRepository>,
    statuses: Arc<dyn StatusRepository>,
    running: Mutex<()>,
}

impl ExpirySweeper {
    pub fn new(messages: Arc<dyn MessageRepository>, statuses: Arc<dyn StatusRepository>) -> Self {
        Self {
            messages,
            statuses,
            running: Mutex::new(()),
        }
    }

    /// Deletes everything expired as of now. `None` when another purge is
    /// still running.
    pub async fn purge_expired(&self) -> Result<Option<u64>, AppError> {
        let Ok(_guard) = self.running.try_lock() else {
            tracing::debug!("Expiry sweep already running, skipping");
            return Ok(None);
        };

        let now = now_millis();
        let messages = self.messages.purge_expired(now).await?;
        let statuses = self.statuses.purge_expired(now).await?;
        Ok(Some(messages + statuses))
    }

    pub fn spawn(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                match self.purge_expired().await {
                    Ok(Some(0)) | Ok(None) => {}
                    Ok(Some(n)) => tracing::info!("Expiry sweep removed {} item(s)", n),
                    Err(e) => tracing::warn!("Expiry sweep failed: {}", e),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000_000;

    #[test]
    fn explicit_duration_wins_over_chat_default() {
        let e = resolve_expiry(Some(5_000), Some(86_400_000), NOW).unwrap();
        assert_eq!(e.disappear_after, Some(5_000));
        assert_eq!(e.expires_at, Some(NOW + 5_000));
    }

    #[test]
    fn chat_default_applies_when_message_is_silent() {
        let e = resolve_expiry(None, Some(60_000), NOW).unwrap();
        assert_eq!(e.expires_at, Some(NOW + 60_000));
    }

    #[test]
    fn zero_opts_out_of_ghost_mode() {
        assert_eq!(resolve_expiry(Some(0), Some(60_000), NOW).unwrap(), Expiry::NEVER);
    }

    #[test]
    fn no_setting_means_no_expiry() {
        assert_eq!(resolve_expiry(None, None, NOW).unwrap(), Expiry::NEVER);
    }

    #[test]
    fn negative_duration_is_rejected() {
        assert!(matches!(
            resolve_expiry(Some(-1), None, NOW),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn statuses_live_a_day() {
        assert_eq!(status_expires_at(NOW) - NOW, 24 * 60 * 60 * 1000);
    }
}
