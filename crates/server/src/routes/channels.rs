use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use ghost_shared::constants::SEARCH_RESULT_LIMIT;
use ghost_shared::validation::{is_searchable, validate_channel_name};
use std::sync::Arc;

use crate::error::AppError;
use crate::models::{now_millis, AuthUser, Channel, ChannelSearchQuery, CreateChannelRequest};
use crate::AppState;

/// Public channels, or private ones the user already follows.
async fn visible_channel(state: &AppState, user: &AuthUser, channel_id: &str) -> Result<Channel, AppError> {
    let channel = state
        .repos
        .channels
        .get(channel_id)
        .await?
        .ok_or_else(|| AppError::not_found("Channel not found"))?;
    if !channel.is_public && !state.repos.channels.is_subscribed(&channel.id, &user.id).await? {
        return Err(AppError::forbidden("This channel is private"));
    }
    Ok(channel)
}

/// POST /api/channels
pub async fn create_channel(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<CreateChannelRequest>,
) -> Result<(StatusCode, Json<Channel>), AppError> {
    validate_channel_name(&body.name).map_err(AppError::Validation)?;

    let channel = Channel {
        id: uuid::Uuid::new_v4().to_string(),
        name: body.name.trim().to_string(),
        description: body.description,
        image: body.image,
        creator_id: user.id.clone(),
        admins: vec![user.id.clone()],
        subscriber_count: 1,
        is_public: body.is_public,
        invite_link: nanoid::nanoid!(12),
        created_at: now_millis(),
    };
    state.repos.channels.create(&channel).await?;

    tracing::info!("Channel {} created by {}", channel.id, user.id);
    Ok((StatusCode::CREATED, Json(channel)))
}

/// GET /api/channels
pub async fn list_channels(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<Vec<Channel>>, AppError> {
    Ok(Json(state.repos.channels.list_for_user(&user.id).await?))
}

/// GET /api/channels/search?q=
pub async fn search_channels(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Query(params): Query<ChannelSearchQuery>,
) -> Result<Json<Vec<Channel>>, AppError> {
    let query = params.q.trim();
    if !is_searchable(query) {
        return Ok(Json(Vec::new()));
    }
    Ok(Json(
        state
            .repos
            .channels
            .search_public(query, SEARCH_RESULT_LIMIT)
            .await?,
    ))
}

/// GET /api/channels/{channelId}
pub async fn get_channel(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(channel_id): Path<String>,
) -> Result<Json<Channel>, AppError> {
    Ok(Json(visible_channel(&state, &user, &channel_id).await?))
}

/// POST /api/channels/{channelId}/subscribe
pub async fn subscribe(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(channel_id): Path<String>,
) -> Result<Json<Channel>, AppError> {
    let channel = visible_channel(&state, &user, &channel_id).await?;
    state
        .repos
        .channels
        .subscribe(&channel.id, &user.id, now_millis())
        .await?;
    Ok(Json(visible_channel(&state, &user, &channel.id).await?))
}

/// POST /api/channels/{channelId}/unsubscribe
pub async fn unsubscribe(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(channel_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let channel = state
        .repos
        .channels
        .get(&channel_id)
        .await?
        .ok_or_else(|| AppError::not_found("Channel not found"))?;
    if channel.creator_id == user.id {
        return Err(AppError::forbidden("The creator cannot unsubscribe"));
    }
    state.repos.channels.unsubscribe(&channel.id, &user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
