use axum::{extract::State, Json};
use std::sync::Arc;

use crate::error::AppError;
use crate::models::{AuthUser, ReactionRequest, ReactionUpdate};
use crate::AppState;

/// POST /api/reactions
pub async fn add_reaction(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<ReactionRequest>,
) -> Result<Json<ReactionUpdate>, AppError> {
    Ok(Json(
        state.reactions.add(&user, &body.message_id, &body.emoji).await?,
    ))
}

/// DELETE /api/reactions
pub async fn remove_reaction(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<ReactionRequest>,
) -> Result<Json<ReactionUpdate>, AppError> {
    Ok(Json(
        state.reactions.remove(&user, &body.message_id, &body.emoji).await?,
    ))
}
