use crate::error::AppError;
use crate::models::{AuthUser, ReactionSignal};
use crate::AppState;

pub async fn handle_reaction(
    state: &AppState,
    user: &AuthUser,
    signal: ReactionSignal,
) -> Result<(), AppError> {
    state
        .reactions
        .apply(user, &signal.message_id, &signal.emoji, signal.action)
        .await?;
    Ok(())
}
