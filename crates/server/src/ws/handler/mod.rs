mod call;
mod chat;
mod chat_ext;
mod lifecycle;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::AppError;
use crate::middleware::auth::gateway_token;
use crate::models::AuthUser;
use crate::ws::events::{ClientEnvelope, ServerEvent};
use crate::ws::gateway::{Session, SessionId};
use crate::AppState;

/// WebSocket upgrade handler. Unauthenticated upgrades are refused with 401
/// before any session is admitted.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let token = match gateway_token(query.get("token").map(String::as_str), &headers) {
        Some(t) => t.to_string(),
        None => return AppError::NotAuthenticated.into_response(),
    };
    let user = match state.auth.authenticate(&token).await {
        Ok(u) => u,
        Err(e) => return e.into_response(),
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, user))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, user: AuthUser) {
    let session_id = state.registry.next_session_id();
    let (mut ws_tx, mut ws_rx) = socket.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    state.registry.admit(
        &user.id,
        Session {
            id: session_id,
            tx,
        },
    );

    lifecycle::send_initial_state(&state, session_id, &user).await;

    // Task to forward queued frames to the socket
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_tx.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    });

    // Receive loop. Envelopes are handled one at a time, in arrival order.
    let state_clone = state.clone();
    let user_clone = user.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_rx.next().await {
            match msg {
                Message::Text(text) => {
                    let text_str: &str = &text;
                    match ClientEnvelope::decode(text_str) {
                        Ok(envelope) => {
                            handle_client_event(&state_clone, session_id, &user_clone, envelope)
                                .await;
                        }
                        Err(message) => {
                            state_clone.registry.send_to_session(
                                &user_clone.id,
                                session_id,
                                &ServerEvent::Error {
                                    code: "validation",
                                    message,
                                },
                            );
                        }
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    lifecycle::handle_disconnect(&state, session_id, &user);
}

async fn handle_client_event(
    state: &AppState,
    session_id: SessionId,
    user: &AuthUser,
    envelope: ClientEnvelope,
) {
    let result = match envelope {
        ClientEnvelope::Message(req) => chat::handle_send_message(state, session_id, user, req).await,
        ClientEnvelope::Typing(signal) => chat::handle_typing(state, user, signal).await,
        ClientEnvelope::Read(receipt) => chat::handle_read(state, user, receipt).await,
        ClientEnvelope::Reaction(signal) => chat_ext::handle_reaction(state, user, signal).await,
        ClientEnvelope::Call(signal) => call::handle_call_signal(state, session_id, user, signal).await,
        ClientEnvelope::Ping => Ok(()),
    };

    if let Err(e) = result {
        if let AppError::Persistence(ref inner) = e {
            tracing::error!("Socket event from {} failed: {:?}", user.id, inner);
        }
        state
            .registry
            .send_to_session(&user.id, session_id, &ServerEvent::from(&e));
    }
}
