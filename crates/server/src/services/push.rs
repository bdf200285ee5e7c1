use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::AppError;
use crate::repo::UserRepository;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PushKind {
    Message,
    IncomingCall,
}

/// What a device push needs to show something useful.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushPayload {
    pub user_id: String,
    pub kind: PushKind,
    pub title: String,
    pub body: String,
    pub chat_id: Option<String>,
    /// Filled in from the receiver's registered token at dispatch time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_token: Option<String>,
}

/// Out-of-band delivery for users with no live session.
#[async_trait]
pub trait PushNotifier: Send + Sync {
    async fn notify(&self, payload: &PushPayload) -> Result<(), AppError>;
}

/// Logs instead of pushing. Used when no webhook is configured.
pub struct LogNotifier;

#[async_trait]
impl PushNotifier for LogNotifier {
    async fn notify(&self, payload: &PushPayload) -> Result<(), AppError> {
        tracing::info!(
            "Push ({:?}) for offline user {}: {}",
            payload.kind,
            payload.user_id,
            payload.title
        );
        Ok(())
    }
}

/// POSTs the payload as JSON to a push gateway.
pub struct WebhookNotifier {
    client: reqwest::Client,
    endpoint: url::Url,
}

impl WebhookNotifier {
    pub fn new(endpoint: &str) -> Result<Self, AppError> {
        let endpoint = url::Url::parse(endpoint)
            .map_err(|e| AppError::validation(format!("Invalid push webhook url: {}", e)))?;
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
        })
    }
}

#[async_trait]
impl PushNotifier for WebhookNotifier {
    async fn notify(&self, payload: &PushPayload) -> Result<(), AppError> {
        if payload.device_token.is_none() {
            tracing::debug!("No push token for {}; skipping", payload.user_id);
            return Ok(());
        }

        let res = self
            .client
            .post(self.endpoint.clone())
            .json(payload)
            .send()
            .await
            .map_err(|e| AppError::Push(e.to_string()))?;

        if !res.status().is_success() {
            return Err(AppError::Push(format!("webhook returned {}", res.status())));
        }
        Ok(())
    }
}

/// Addresses pushes to the receiver's registered device.
pub struct PushDispatcher {
    notifier: Arc<dyn PushNotifier>,
    users: Arc<dyn UserRepository>,
}

impl PushDispatcher {
    pub fn new(notifier: Arc<dyn PushNotifier>, users: Arc<dyn UserRepository>) -> Self {
        Self { notifier, users }
    }

    /// Hands the payload off without waiting; failures only get logged.
    pub fn dispatch(&self, mut payload: PushPayload) {
        let notifier = self.notifier.clone();
        let users = self.users.clone();
        tokio::spawn(async move {
            match users.push_token(&payload.user_id).await {
                Ok(token) => payload.device_token = token,
                Err(e) => tracing::warn!("Push token lookup for {} failed: {}", payload.user_id, e),
            }
            if let Err(e) = notifier.notify(&payload).await {
                tracing::warn!("Push to {} failed: {}", payload.user_id, e);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(device_token: Option<&str>) -> PushPayload {
        PushPayload {
            user_id: "u1".into(),
            kind: PushKind::Message,
            title: "alice".into(),
            body: "hi".into(),
            chat_id: None,
            device_token: device_token.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn webhook_skips_users_without_a_device() {
        // Nothing listens on the discard port, so any request would fail.
        let notifier = WebhookNotifier::new("http://127.0.0.1:9/push").unwrap();
        assert!(notifier.notify(&payload(None)).await.is_ok());
        assert!(notifier.notify(&payload(Some("tok"))).await.is_err());
    }

    #[test]
    fn token_is_only_serialized_when_known() {
        let json = serde_json::to_value(payload(None)).unwrap();
        assert!(json.get("deviceToken").is_none());
        let json = serde_json::to_value(payload(Some("tok"))).unwrap();
        assert_eq!(json["deviceToken"], "tok");
        assert_eq!(json["kind"], "message");
    }
}
