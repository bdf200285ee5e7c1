use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use ghost_shared::validation::validate_group_name;
use std::sync::Arc;

use crate::error::AppError;
use crate::models::{now_millis, AuthUser, CreateGroupRequest, Group, MemberRequest};
use crate::AppState;

async fn member_group(state: &AppState, user: &AuthUser, group_id: &str) -> Result<Group, AppError> {
    let group = state
        .repos
        .groups
        .get(group_id)
        .await?
        .ok_or_else(|| AppError::not_found("Group not found"))?;
    if !group.is_member(&user.id) {
        return Err(AppError::forbidden("Not a member of this group"));
    }
    Ok(group)
}

/// POST /api/groups
pub async fn create_group(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<Group>), AppError> {
    validate_group_name(&body.name).map_err(AppError::Validation)?;

    let mut members = vec![user.id.clone()];
    for id in body.member_ids {
        if !members.contains(&id) {
            members.push(id);
        }
    }
    let found = state.repos.users.find_by_ids(&members).await?;
    if found.len() != members.len() {
        return Err(AppError::not_found("User not found"));
    }

    let group = Group {
        id: uuid::Uuid::new_v4().to_string(),
        name: body.name.trim().to_string(),
        description: body.description,
        image: body.image,
        creator_id: user.id.clone(),
        admins: vec![user.id.clone()],
        members,
        only_admins_can_post: body.only_admins_can_post,
        created_at: now_millis(),
    };
    state.repos.groups.create(&group).await?;

    tracing::info!("Group {} created by {} with {} members", group.id, user.id, group.members.len());
    Ok((StatusCode::CREATED, Json(group)))
}

/// GET /api/groups
pub async fn list_groups(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<Vec<Group>>, AppError> {
    Ok(Json(state.repos.groups.list_for_user(&user.id).await?))
}

/// GET /api/groups/{groupId}
pub async fn get_group(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(group_id): Path<String>,
) -> Result<Json<Group>, AppError> {
    Ok(Json(member_group(&state, &user, &group_id).await?))
}

/// POST /api/groups/{groupId}/members
pub async fn add_member(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(group_id): Path<String>,
    Json(body): Json<MemberRequest>,
) -> Result<Json<Group>, AppError> {
    let group = member_group(&state, &user, &group_id).await?;
    if !group.is_admin(&user.id) {
        return Err(AppError::forbidden("Only admins can add members"));
    }
    if state.repos.users.find_by_id(&body.user_id).await?.is_none() {
        return Err(AppError::not_found("User not found"));
    }

    state
        .repos
        .groups
        .add_member(&group.id, &body.user_id, now_millis())
        .await?;
    Ok(Json(member_group(&state, &user, &group.id).await?))
}

/// DELETE /api/groups/{groupId}/members/{userId}
///
/// Admins remove others; anyone may remove themselves. The creator stays.
pub async fn remove_member(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path((group_id, member_id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    let group = member_group(&state, &user, &group_id).await?;
    if member_id != user.id && !group.is_admin(&user.id) {
        return Err(AppError::forbidden("Only admins can remove members"));
    }
    if member_id == group.creator_id {
        return Err(AppError::forbidden("The creator cannot be removed"));
    }
    if !state.repos.groups.remove_member(&group.id, &member_id).await? {
        return Err(AppError::not_found("Not a member of this group"));
    }
    Ok(StatusCode::NO_CONTENT)
}
