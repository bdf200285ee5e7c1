use crate::models::AuthUser;
use crate::ws::gateway::{Removal, SessionId};
use crate::AppState;

/// Online contacts, so a fresh session starts with a correct roster.
pub async fn send_initial_state(state: &AppState, session_id: SessionId, user: &AuthUser) {
    if let Err(e) = state.presence.send_snapshot(&user.id, session_id).await {
        tracing::error!("Failed to send presence snapshot to {}: {:?}", user.id, e);
    }
}

/// Drops the session. In-flight sends from it have already been persisted
/// or rejected; nothing is rolled back.
pub fn handle_disconnect(state: &AppState, session_id: SessionId, user: &AuthUser) {
    if state.registry.remove(&user.id, session_id) == Removal::Absent {
        tracing::debug!("Session {} of {} was already gone", session_id, user.id);
    }
}
