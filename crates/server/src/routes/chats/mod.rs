mod settings;

pub use settings::*;

use axum::{extract::State, http::StatusCode, Json};
use ghost_shared::constants::DEFAULT_DISAPPEAR_AFTER_MS;
use ghost_shared::validation::validate_disappear_after;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::AppError;
use crate::models::{now_millis, AuthUser, Chat, ChatSummary, CreateChatRequest, User};
use crate::AppState;

/// One chat as `viewer` sees it.
pub(crate) fn summarize(state: &AppState, chat: &Chat, viewer: &str, other: Option<&User>, now: i64) -> ChatSummary {
    let participant_id = chat.others(viewer).next().cloned().unwrap_or_default();
    let preview_live = chat.last_message_expires_at.map_or(true, |at| at > now);

    ChatSummary {
        id: chat.id.clone(),
        is_online: state.presence.is_online(&participant_id),
        participant_name: other.map(|u| u.username.clone()).unwrap_or_default(),
        participant_image: other.and_then(|u| u.profile_image.clone()),
        participant_id,
        last_message: chat.last_message.clone().filter(|_| preview_live),
        last_message_type: chat.last_message_type,
        last_message_time: chat.last_message_time,
        unread_count: chat.unread_for(viewer),
        disappearing_mode: chat.disappearing_mode,
        disappear_after: chat.disappear_after,
        is_pinned: chat.is_pinned.get(viewer).copied().unwrap_or(false),
        is_muted: chat.is_muted.get(viewer).copied().unwrap_or(false),
        is_archived: chat.is_archived.get(viewer).copied().unwrap_or(false),
    }
}

pub(crate) async fn summarize_all(
    state: &AppState,
    chats: &[Chat],
    viewer: &str,
) -> Result<Vec<ChatSummary>, AppError> {
    let mut other_ids: Vec<String> = chats
        .iter()
        .filter_map(|c| c.others(viewer).next().cloned())
        .collect();
    other_ids.sort();
    other_ids.dedup();

    let users: HashMap<String, User> = state
        .repos
        .users
        .find_by_ids(&other_ids)
        .await?
        .into_iter()
        .map(|u| (u.id.clone(), u))
        .collect();

    let now = now_millis();
    Ok(chats
        .iter()
        .map(|chat| {
            let other = chat.others(viewer).next().and_then(|id| users.get(id));
            summarize(state, chat, viewer, other, now)
        })
        .collect())
}

/// GET /api/chats
pub async fn list_chats(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<Vec<ChatSummary>>, AppError> {
    let chats = state.repos.chats.list_for_user(&user.id).await?;
    Ok(Json(summarize_all(&state, &chats, &user.id).await?))
}

/// POST /api/chats
pub async fn create_chat(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<CreateChatRequest>,
) -> Result<(StatusCode, Json<ChatSummary>), AppError> {
    if body.participant_id == user.id {
        return Err(AppError::validation("Cannot start a chat with yourself"));
    }
    let other = state
        .repos
        .users
        .find_by_id(&body.participant_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    let disappear_after = body.disappear_after.unwrap_or(DEFAULT_DISAPPEAR_AFTER_MS);
    validate_disappear_after(disappear_after).map_err(AppError::Validation)?;

    let (chat, created) = state
        .repos
        .chats
        .get_or_create_direct(&user.id, &other.id, body.disappearing_mode, disappear_after)
        .await?;

    if created {
        tracing::info!("Chat {} created between {} and {}", chat.id, user.id, other.id);
    }

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(summarize(&state, &chat, &user.id, Some(&other), now_millis())),
    ))
}
