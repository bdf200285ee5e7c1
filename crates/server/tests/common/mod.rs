#![allow(dead_code)]

pub mod ws_helpers;

use async_trait::async_trait;
use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use ghost_server::{
    auth::SessionAuthenticator,
    config::Config,
    db,
    error::AppError,
    models::now_millis,
    repo::Repositories,
    routes,
    services::{
        media::LocalMediaStore,
        push::{PushNotifier, PushPayload},
    },
    AppState,
};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::sync::{Arc, Mutex};

/// Create an in-memory SQLite pool with schema applied.
pub async fn setup_test_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory SQLite pool");

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await
        .unwrap();

    db::apply_schema(&pool).await.unwrap();
    pool
}

pub fn test_config() -> Config {
    Config {
        host: "127.0.0.1".into(),
        port: 0,
        database_path: ":memory:".into(),
        upload_dir: std::env::temp_dir()
            .join(format!("ghost-test-uploads-{}", uuid::Uuid::new_v4()))
            .to_string_lossy()
            .into_owned(),
        public_base_url: "http://localhost:8080".into(),
        max_upload_bytes: 1_048_576,
        sweep_interval_secs: 60,
        ice_urls: vec!["stun:stun.example.org:3478".into()],
        turn_username: None,
        turn_credential: None,
        push_webhook_url: None,
    }
}

/// Push notifier that keeps every payload it is handed.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<PushPayload>>,
}

impl RecordingNotifier {
    pub fn payloads(&self) -> Vec<PushPayload> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl PushNotifier for RecordingNotifier {
    async fn notify(&self, payload: &PushPayload) -> Result<(), AppError> {
        self.sent.lock().unwrap().push(payload.clone());
        Ok(())
    }
}

/// State wired to the pool, with push payloads captured.
pub fn create_test_state_with_push(pool: SqlitePool) -> (Arc<AppState>, Arc<RecordingNotifier>) {
    let config = test_config();
    let notifier = Arc::new(RecordingNotifier::default());
    let media = Arc::new(LocalMediaStore::new(
        &config.upload_dir,
        &config.public_base_url,
    ));
    let auth = Arc::new(SessionAuthenticator::new(pool.clone()));
    let state = AppState::with_collaborators(
        Repositories::sqlite(pool),
        config,
        auth,
        media,
        notifier.clone(),
    );
    (state, notifier)
}

pub fn create_test_state(pool: SqlitePool) -> Arc<AppState> {
    create_test_state_with_push(pool).0
}

/// Build a test Axum app with the given pool.
pub fn create_test_app(pool: SqlitePool) -> Router {
    routes::build_router(create_test_state(pool))
}

pub fn auth_header(token: &str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("authorization"),
        format!("Bearer {}", token).parse().unwrap(),
    )
}

/// Create a test user directly in the database. Returns (user_id, session_token).
pub async fn create_test_user(pool: &SqlitePool, username: &str) -> (String, String) {
    let user_id = uuid::Uuid::new_v4().to_string();
    let now = now_millis();

    sqlx::query(
        r#"INSERT INTO "user" (id, username, email, created_at) VALUES (?, ?, ?, ?)"#,
    )
    .bind(&user_id)
    .bind(username)
    .bind(format!("{}@test.com", username))
    .bind(now)
    .execute(pool)
    .await
    .unwrap();

    let token = uuid::Uuid::new_v4().to_string();
    sqlx::query(
        r#"INSERT INTO "session" (id, user_id, token, expires_at, created_at) VALUES (?, ?, ?, ?, ?)"#,
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(&user_id)
    .bind(&token)
    .bind(now + 30 * 24 * 60 * 60 * 1000)
    .bind(now)
    .execute(pool)
    .await
    .unwrap();

    (user_id, token)
}

/// A session row that has already expired.
pub async fn create_expired_session(pool: &SqlitePool, user_id: &str) -> String {
    let token = uuid::Uuid::new_v4().to_string();
    let now = now_millis();
    sqlx::query(
        r#"INSERT INTO "session" (id, user_id, token, expires_at, created_at) VALUES (?, ?, ?, ?, ?)"#,
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(&token)
    .bind(now - 1000)
    .bind(now - 2000)
    .execute(pool)
    .await
    .unwrap();
    token
}

/// The 1:1 chat between two users, created through the repository.
pub async fn create_test_chat(state: &AppState, a: &str, b: &str) -> String {
    let (chat, _) = state
        .repos
        .chats
        .get_or_create_direct(a, b, false, 24 * 60 * 60 * 1000)
        .await
        .unwrap();
    chat.id
}

/// Registers an in-process session for `user_id`, standing in for a socket.
pub fn attach_session(
    state: &AppState,
    user_id: &str,
) -> tokio::sync::mpsc::UnboundedReceiver<String> {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    state.registry.admit(
        user_id,
        ghost_server::ws::gateway::Session {
            id: state.registry.next_session_id(),
            tx,
        },
    );
    rx
}

/// Every queued frame of the given event type, decoded.
pub fn queued_events(
    rx: &mut tokio::sync::mpsc::UnboundedReceiver<String>,
    kind: &str,
) -> Vec<serde_json::Value> {
    std::iter::from_fn(|| rx.try_recv().ok())
        .filter_map(|frame| serde_json::from_str::<serde_json::Value>(&frame).ok())
        .filter(|event| event["type"] == kind)
        .collect()
}
