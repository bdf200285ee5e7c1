mod search;

pub use search::*;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::error::AppError;
use crate::models::{
    AuthUser, DeleteMessageQuery, DeliveredMessage, EditMessageRequest, ForwardMessageRequest,
    HistoryQuery, Message, PaginatedResponse, SendMessageRequest,
};
use crate::AppState;

/// GET /api/chats/{chatId}/messages
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(chat_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<PaginatedResponse<Message>>, AppError> {
    Ok(Json(state.router.history(&user, &chat_id, &query).await?))
}

/// POST /api/messages
///
/// Same path as a socket `message` envelope; the response says whether a live
/// session of the receiver got it.
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<DeliveredMessage>), AppError> {
    let sent = state.router.send(&user, body).await?;
    Ok((StatusCode::CREATED, Json(sent)))
}

/// POST /api/messages/forward
pub async fn forward_message(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<ForwardMessageRequest>,
) -> Result<(StatusCode, Json<Vec<DeliveredMessage>>), AppError> {
    let sent = state.router.forward(&user, body).await?;
    Ok((StatusCode::CREATED, Json(sent)))
}

/// PATCH /api/messages/{messageId}
pub async fn edit_message(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(message_id): Path<String>,
    Json(body): Json<EditMessageRequest>,
) -> Result<Json<Message>, AppError> {
    Ok(Json(state.router.edit(&user, &message_id, &body.content).await?))
}

/// DELETE /api/messages/{messageId}?forEveryone=&permanent=
pub async fn delete_message(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(message_id): Path<String>,
    Query(mode): Query<DeleteMessageQuery>,
) -> Result<StatusCode, AppError> {
    state.router.delete(&user, &message_id, &mode).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/chats/{chatId}/messages/{messageId}/read
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path((chat_id, message_id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    state.router.mark_read(&user, &chat_id, &message_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
