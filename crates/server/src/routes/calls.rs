use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::error::AppError;
use crate::models::{AuthUser, Call, CallSession, InitiateCallRequest};
use crate::AppState;

/// POST /api/calls/initiate
pub async fn initiate_call(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<InitiateCallRequest>,
) -> Result<(StatusCode, Json<CallSession>), AppError> {
    let session = state.calls.initiate(&user, body).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// POST /api/calls/{callId}/accept
pub async fn accept_call(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(call_id): Path<String>,
) -> Result<Json<Call>, AppError> {
    Ok(Json(state.calls.accept(&user, &call_id).await?))
}

/// POST /api/calls/{callId}/decline
pub async fn decline_call(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(call_id): Path<String>,
) -> Result<Json<Call>, AppError> {
    Ok(Json(state.calls.decline(&user, &call_id).await?))
}

/// POST /api/calls/{callId}/end
pub async fn end_call(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(call_id): Path<String>,
) -> Result<Json<Call>, AppError> {
    Ok(Json(state.calls.end(&user, &call_id).await?))
}

/// POST /api/calls/{callId}/missed
pub async fn miss_call(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(call_id): Path<String>,
) -> Result<Json<Call>, AppError> {
    Ok(Json(state.calls.miss(&user, &call_id).await?))
}

/// GET /api/calls/history
pub async fn call_history(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<Vec<Call>>, AppError> {
    Ok(Json(state.calls.history(&user).await?))
}
