#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use ghost_server::{routes, AppState};
use serde_json::Value;
use tokio_tungstenite::tungstenite::Message;

pub type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Start the test app on a random TCP port and return the base URL.
pub async fn start_server() -> (String, sqlx::SqlitePool, Arc<AppState>) {
    let pool = super::setup_test_db().await;
    let state = super::create_test_state(pool.clone());
    let base = serve(state.clone()).await;
    (base, pool, state)
}

/// Serve an existing state on a random port.
pub async fn serve(state: Arc<AppState>) -> String {
    let app = routes::build_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base = format!("http://127.0.0.1:{}", addr.port());

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start
    tokio::time::sleep(Duration::from_millis(50)).await;

    base
}

/// Connect a WebSocket with a session token.
pub async fn ws_connect(base: &str, token: &str) -> WsStream {
    let ws_url = format!(
        "{}/gateway?token={}",
        base.replace("http://", "ws://"),
        token
    );
    let (ws, _) = tokio_tungstenite::connect_async(&ws_url).await.unwrap();
    ws
}

/// Read next text message parsed as JSON, with timeout.
pub async fn recv_json(ws: &mut WsStream) -> Option<Value> {
    let timeout = tokio::time::timeout(Duration::from_secs(3), ws.next()).await;
    match timeout {
        Ok(Some(Ok(Message::Text(text)))) => serde_json::from_str(&text).ok(),
        _ => None,
    }
}

/// Next event of the given type, skipping anything else.
pub async fn recv_event(ws: &mut WsStream, kind: &str) -> Option<Value> {
    loop {
        let event = recv_json(ws).await?;
        if event["type"] == kind {
            return Some(event);
        }
    }
}

/// Drain all pending messages until timeout.
pub async fn drain_messages(ws: &mut WsStream) -> Vec<Value> {
    let mut messages = Vec::new();
    loop {
        let timeout = tokio::time::timeout(Duration::from_millis(200), ws.next()).await;
        match timeout {
            Ok(Some(Ok(Message::Text(text)))) => {
                if let Ok(v) = serde_json::from_str::<Value>(&text) {
                    messages.push(v);
                }
            }
            _ => break,
        }
    }
    messages
}

/// Send a JSON message over WebSocket.
pub async fn send_json(ws: &mut WsStream, value: &Value) {
    ws.send(Message::Text(serde_json::to_string(value).unwrap().into()))
        .await
        .unwrap();
}

/// Waits until the registry agrees on `user_id`'s presence.
pub async fn wait_online(state: &AppState, user_id: &str, online: bool) {
    for _ in 0..100 {
        if state.registry.is_online(user_id) == online {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("{} never became online={}", user_id, online);
}

/// Waits until `user_id` has exactly `count` live sessions.
pub async fn wait_sessions(state: &AppState, user_id: &str, count: usize) {
    for _ in 0..100 {
        if state.registry.session_count(user_id) == count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("{} never reached {} session(s)", user_id, count);
}
