use crate::error::AppError;
use crate::models::{AuthUser, CallAction, CallSignal, InitiateCallRequest};
use crate::ws::events::ServerEvent;
use crate::ws::gateway::SessionId;
use crate::AppState;

pub async fn handle_call_signal(
    state: &AppState,
    session_id: SessionId,
    user: &AuthUser,
    signal: CallSignal,
) -> Result<(), AppError> {
    match signal.action {
        CallAction::Initiate => {
            let receiver_id = signal
                .receiver_id
                .ok_or_else(|| AppError::validation("receiverId is required"))?;
            let session = state
                .calls
                .initiate(
                    user,
                    InitiateCallRequest {
                        receiver_id,
                        call_type: signal.call_type,
                        group_id: signal.group_id,
                    },
                )
                .await?;
            state
                .registry
                .send_to_session(&user.id, session_id, &ServerEvent::CallSession(session));
        }
        CallAction::Accept => {
            state.calls.accept(user, call_id(&signal)?).await?;
        }
        CallAction::Decline => {
            state.calls.decline(user, call_id(&signal)?).await?;
        }
        CallAction::End => {
            state.calls.end(user, call_id(&signal)?).await?;
        }
        CallAction::Missed => {
            state.calls.miss(user, call_id(&signal)?).await?;
        }
    }
    Ok(())
}

fn call_id(signal: &CallSignal) -> Result<&str, AppError> {
    signal
        .call_id
        .as_deref()
        .ok_or_else(|| AppError::validation("callId is required"))
}
