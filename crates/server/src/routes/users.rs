use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use ghost_shared::constants::{MAX_PUSH_TOKEN_LENGTH, USER_SEARCH_LIMIT};
use ghost_shared::validation::{is_searchable, validate_bio, validate_username_length};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::AppError;
use crate::models::{AuthUser, PublicUser, PushTokenRequest, UpdateProfileRequest, User};
use crate::services::media::validate_media_url;
use crate::AppState;

#[derive(Deserialize)]
pub struct UserSearchQuery {
    #[serde(default)]
    pub q: String,
}

fn with_live_presence(state: &AppState, user: User) -> PublicUser {
    let mut public = PublicUser::from(user);
    public.is_online = state.presence.is_online(&public.id);
    public
}

/// GET /api/users/me
pub async fn get_me(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<User>, AppError> {
    let mut me = state
        .repos
        .users
        .find_by_id(&user.id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    me.is_online = state.presence.is_online(&me.id);
    Ok(Json(me))
}

/// PUT /api/users/profile
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(mut body): Json<UpdateProfileRequest>,
) -> Result<Json<User>, AppError> {
    if let Some(username) = body.username.take() {
        let trimmed = username.trim();
        validate_username_length(trimmed).map_err(AppError::Validation)?;

        let re = regex_lite::Regex::new(r"^[a-zA-Z0-9_-]+$")
            .map_err(|e| AppError::validation(e.to_string()))?;
        if !re.is_match(trimmed) {
            return Err(AppError::validation(
                "Username can only contain letters, numbers, hyphens, and underscores",
            ));
        }

        if let Some(existing) = state.repos.users.find_by_username(trimmed).await? {
            if existing.id != user.id {
                return Err(AppError::Conflict("Username already taken".into()));
            }
        }
        body.username = Some(trimmed.to_string());
    }
    if let Some(bio) = body.bio.as_deref() {
        validate_bio(bio).map_err(AppError::Validation)?;
    }
    if let Some(image) = body.profile_image.as_deref() {
        validate_media_url(image)?;
    }

    state.repos.users.update_profile(&user.id, &body).await?;
    tracing::info!("User {} updated their profile", user.id);
    get_me(State(state), user).await
}

/// PUT /api/users/push-token
pub async fn set_push_token(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<PushTokenRequest>,
) -> Result<StatusCode, AppError> {
    let token = body.token.as_deref().map(str::trim).filter(|t| !t.is_empty());
    if token.is_some_and(|t| t.len() > MAX_PUSH_TOKEN_LENGTH) {
        return Err(AppError::validation("Push token is too long"));
    }
    state.repos.users.set_push_token(&user.id, token).await?;
    tracing::debug!("Push token for {} set={}", user.id, token.is_some());
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/users/search?q=
pub async fn search_users(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(params): Query<UserSearchQuery>,
) -> Result<Json<Vec<PublicUser>>, AppError> {
    let query = params.q.trim();
    if !is_searchable(query) {
        return Ok(Json(Vec::new()));
    }
    let found = state.repos.users.search(query, USER_SEARCH_LIMIT).await?;
    Ok(Json(
        found
            .into_iter()
            .filter(|u| u.id != user.id)
            .map(|u| with_live_presence(&state, u))
            .collect(),
    ))
}

/// GET /api/users/{userId}
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(user_id): Path<String>,
) -> Result<Json<PublicUser>, AppError> {
    let found = state
        .repos
        .users
        .find_by_id(&user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(Json(with_live_presence(&state, found)))
}

/// POST /api/users/{userId}/block
pub async fn block_user(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(user_id): Path<String>,
) -> Result<StatusCode, AppError> {
    if user_id == user.id {
        return Err(AppError::validation("Cannot block yourself"));
    }
    if state.repos.users.find_by_id(&user_id).await?.is_none() {
        return Err(AppError::not_found("User not found"));
    }
    state.repos.users.block(&user.id, &user_id).await?;
    tracing::info!("User {} blocked {}", user.id, user_id);
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/users/{userId}/block
pub async fn unblock_user(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(user_id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.repos.users.unblock(&user.id, &user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
