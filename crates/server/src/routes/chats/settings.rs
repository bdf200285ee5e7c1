use axum::{
    extract::{Path, State},
    Json,
};
use ghost_shared::validation::validate_disappear_after;
use std::sync::Arc;

use super::summarize_all;
use crate::error::AppError;
use crate::models::{
    ArchiveChatRequest, AuthUser, Chat, ChatSummary, DisappearingSettingsRequest,
    GhostModeRequest, MuteChatRequest, ParticipantFlag, PinChatRequest,
};
use crate::ws::events::ServerEvent;
use crate::AppState;

async fn set_flag(
    state: &AppState,
    user: &AuthUser,
    chat_id: &str,
    flag: ParticipantFlag,
    value: bool,
) -> Result<Json<ChatSummary>, AppError> {
    let chat = state.router.chat_for(&user.id, chat_id).await?;
    state
        .repos
        .chats
        .set_flag(&chat.id, &user.id, flag, value)
        .await?;
    fresh_summary(state, user, &chat.id).await
}

async fn fresh_summary(
    state: &AppState,
    user: &AuthUser,
    chat_id: &str,
) -> Result<Json<ChatSummary>, AppError> {
    let chat = state.router.chat_for(&user.id, chat_id).await?;
    summarize_all(state, std::slice::from_ref(&chat), &user.id)
        .await?
        .pop()
        .map(Json)
        .ok_or_else(|| AppError::not_found("Chat not found"))
}

/// Tells the other participants about new ghost settings.
fn relay_settings(state: &AppState, user: &AuthUser, chat: &Chat) {
    state.registry.send_many(
        chat.others(&user.id),
        &ServerEvent::ChatSettings {
            chat_id: chat.id.clone(),
            disappearing_mode: chat.disappearing_mode,
            disappear_after: chat.disappear_after,
        },
    );
}

/// PUT /api/chats/{chatId}/pin
pub async fn pin_chat(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(chat_id): Path<String>,
    Json(body): Json<PinChatRequest>,
) -> Result<Json<ChatSummary>, AppError> {
    set_flag(&state, &user, &chat_id, ParticipantFlag::Pinned, body.pinned).await
}

/// PUT /api/chats/{chatId}/mute
pub async fn mute_chat(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(chat_id): Path<String>,
    Json(body): Json<MuteChatRequest>,
) -> Result<Json<ChatSummary>, AppError> {
    set_flag(&state, &user, &chat_id, ParticipantFlag::Muted, body.muted).await
}

/// PUT /api/chats/{chatId}/archive
pub async fn archive_chat(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(chat_id): Path<String>,
    Json(body): Json<ArchiveChatRequest>,
) -> Result<Json<ChatSummary>, AppError> {
    set_flag(&state, &user, &chat_id, ParticipantFlag::Archived, body.archived).await
}

/// PUT /api/chats/{chatId}/disappearing
///
/// A positive duration turns ghost mode on with that duration; zero turns it off.
pub async fn set_disappearing(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(chat_id): Path<String>,
    Json(body): Json<DisappearingSettingsRequest>,
) -> Result<Json<ChatSummary>, AppError> {
    let chat = state.router.chat_for(&user.id, &chat_id).await?;
    let duration = body.duration.unwrap_or(0);
    validate_disappear_after(duration).map_err(AppError::Validation)?;

    let updated = if duration > 0 {
        state
            .repos
            .chats
            .set_disappearing(&chat.id, true, Some(duration))
            .await?
    } else {
        state.repos.chats.set_disappearing(&chat.id, false, None).await?
    };

    relay_settings(&state, &user, &updated);
    fresh_summary(&state, &user, &updated.id).await
}

/// PUT /api/chats/{chatId}/ghost-mode
pub async fn set_ghost_mode(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(chat_id): Path<String>,
    Json(body): Json<GhostModeRequest>,
) -> Result<Json<ChatSummary>, AppError> {
    let chat = state.router.chat_for(&user.id, &chat_id).await?;
    if let Some(ms) = body.disappear_after {
        validate_disappear_after(ms).map_err(AppError::Validation)?;
        if body.enabled && ms == 0 {
            return Err(AppError::validation("Ghost mode needs a positive duration"));
        }
    }

    let updated = state
        .repos
        .chats
        .set_disappearing(&chat.id, body.enabled, body.disappear_after)
        .await?;

    tracing::info!(
        "Ghost mode {} for chat {} by {}",
        if updated.disappearing_mode { "on" } else { "off" },
        updated.id,
        user.id
    );
    relay_settings(&state, &user, &updated);
    fresh_summary(&state, &user, &updated.id).await
}
