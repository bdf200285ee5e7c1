use crate::error::AppError;
use crate::models::{AuthUser, ReadReceipt, SendMessageRequest, TypingSignal};
use crate::ws::events::ServerEvent;
use crate::ws::gateway::SessionId;
use crate::AppState;

pub async fn handle_send_message(
    state: &AppState,
    session_id: SessionId,
    user: &AuthUser,
    req: SendMessageRequest,
) -> Result<(), AppError> {
    let sent = state.router.send(user, req).await?;
    state
        .registry
        .send_to_session(&user.id, session_id, &ServerEvent::MessageSent(sent));
    Ok(())
}

pub async fn handle_typing(
    state: &AppState,
    user: &AuthUser,
    signal: TypingSignal,
) -> Result<(), AppError> {
    state
        .router
        .typing(user, &signal.chat_id, signal.is_typing)
        .await?;
    Ok(())
}

pub async fn handle_read(
    state: &AppState,
    user: &AuthUser,
    receipt: ReadReceipt,
) -> Result<(), AppError> {
    state
        .router
        .mark_read(user, &receipt.chat_id, &receipt.message_id)
        .await?;
    Ok(())
}
