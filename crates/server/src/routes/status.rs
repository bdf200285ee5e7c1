use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use ghost_shared::validation::{validate_emoji, validate_status};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::AppError;
use crate::models::{
    now_millis, AuthUser, CreateStatusRequest, PublicUser, Status, StatusFeedEntry,
    StatusMediaType, StatusReactionRequest,
};
use crate::services::expiry::status_expires_at;
use crate::services::media::validate_media_url;
use crate::AppState;

/// A live status the caller is allowed to see: their own, or a contact's.
async fn visible_status(state: &AppState, user: &AuthUser, status_id: &str) -> Result<Status, AppError> {
    let status = state
        .repos
        .statuses
        .get(status_id, now_millis())
        .await?
        .ok_or_else(|| AppError::not_found("Status not found"))?;

    if status.user_id != user.id {
        let contacts = state.repos.chats.contact_ids(&user.id).await?;
        if !contacts.contains(&status.user_id) {
            return Err(AppError::not_found("Status not found"));
        }
    }
    Ok(status)
}

async fn owned_status(state: &AppState, user: &AuthUser, status_id: &str) -> Result<Status, AppError> {
    let status = visible_status(state, user, status_id).await?;
    if status.user_id != user.id {
        return Err(AppError::forbidden("Not your status"));
    }
    Ok(status)
}

/// GET /api/status/me
pub async fn my_statuses(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<Vec<Status>>, AppError> {
    let statuses = state
        .repos
        .statuses
        .list_for_users(std::slice::from_ref(&user.id), now_millis())
        .await?;
    Ok(Json(statuses))
}

/// GET /api/status
///
/// Live statuses of everyone the caller shares a chat with, grouped per user.
pub async fn status_feed(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<Vec<StatusFeedEntry>>, AppError> {
    let contacts = state.repos.chats.contact_ids(&user.id).await?;
    let statuses = state
        .repos
        .statuses
        .list_for_users(&contacts, now_millis())
        .await?;

    let mut by_owner: HashMap<String, Vec<Status>> = HashMap::new();
    for status in statuses {
        by_owner.entry(status.user_id.clone()).or_default().push(status);
    }
    let owner_ids: Vec<String> = by_owner.keys().cloned().collect();
    let owners = state.repos.users.find_by_ids(&owner_ids).await?;

    let mut feed: Vec<StatusFeedEntry> = owners
        .into_iter()
        .filter_map(|owner| {
            let statuses = by_owner.remove(&owner.id)?;
            let all_viewed = statuses.iter().all(|s| s.viewed_by.contains(&user.id));
            Some(StatusFeedEntry {
                user_id: owner.id,
                username: owner.username,
                profile_image: owner.profile_image,
                statuses,
                all_viewed,
            })
        })
        .collect();

    // Unseen first, then most recent.
    feed.sort_by_key(|e| {
        let latest = e.statuses.last().map(|s| s.created_at).unwrap_or(0);
        (e.all_viewed, std::cmp::Reverse(latest))
    });
    Ok(Json(feed))
}

/// POST /api/status
pub async fn create_status(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<CreateStatusRequest>,
) -> Result<(StatusCode, Json<Status>), AppError> {
    if body.media_type != StatusMediaType::Text && body.media_url.is_none() {
        return Err(AppError::validation("mediaUrl is required for this status type"));
    }
    if let Some(url) = body.media_url.as_deref() {
        validate_media_url(url)?;
    }
    validate_status(body.content.as_deref(), body.media_url.is_some())
        .map_err(AppError::Validation)?;

    let now = now_millis();
    let status = Status {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user.id.clone(),
        content: body.content,
        media_url: body.media_url,
        media_type: body.media_type,
        background_color: body.background_color,
        font_style: body.font_style,
        viewed_by: Vec::new(),
        reactions: Default::default(),
        created_at: now,
        expires_at: status_expires_at(now),
    };
    state.repos.statuses.create(&status).await?;

    tracing::debug!("Status {} posted by {}", status.id, user.id);
    Ok((StatusCode::CREATED, Json(status)))
}

/// POST /api/status/{statusId}/view
pub async fn view_status(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(status_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let status = visible_status(&state, &user, &status_id).await?;
    if status.user_id != user.id {
        state
            .repos
            .statuses
            .add_viewer(&status.id, &user.id, now_millis())
            .await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/status/{statusId}/react
pub async fn react_to_status(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(status_id): Path<String>,
    Json(body): Json<StatusReactionRequest>,
) -> Result<StatusCode, AppError> {
    validate_emoji(&body.emoji).map_err(AppError::Validation)?;
    let status = visible_status(&state, &user, &status_id).await?;
    if status.user_id == user.id {
        return Err(AppError::validation("Cannot react to your own status"));
    }
    state
        .repos
        .statuses
        .set_reaction(&status.id, &user.id, &body.emoji)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/status/{statusId}
pub async fn delete_status(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(status_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let status = owned_status(&state, &user, &status_id).await?;
    state.repos.statuses.delete(&status.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/status/{statusId}/viewers
pub async fn status_viewers(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(status_id): Path<String>,
) -> Result<Json<Vec<PublicUser>>, AppError> {
    let status = owned_status(&state, &user, &status_id).await?;
    let mut viewers = state.repos.users.find_by_ids(&status.viewed_by).await?;
    // Keep view order.
    viewers.sort_by_key(|u| status.viewed_by.iter().position(|v| v == &u.id));
    Ok(Json(viewers.into_iter().map(PublicUser::from).collect()))
}
