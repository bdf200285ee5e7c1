use std::sync::Arc;

use ghost_shared::constants::CALL_HISTORY_LIMIT;

use crate::error::AppError;
use crate::models::{
    now_millis, AuthUser, Call, CallAction, CallSession, CallStatus, IceServer, InitiateCallRequest,
};
use crate::repo::Repositories;
use crate::services::push::{PushDispatcher, PushKind, PushPayload};
use crate::ws::events::ServerEvent;
use crate::ws::gateway::ConnectionRegistry;

/// Which statuses an action may start from, and where it lands.
pub fn transition_for(action: CallAction) -> Option<(&'static [CallStatus], CallStatus)> {
    match action {
        CallAction::Initiate => None,
        CallAction::Accept => Some((CallStatus::PENDING, CallStatus::Ongoing)),
        CallAction::Decline => Some((CallStatus::PENDING, CallStatus::Declined)),
        CallAction::Missed => Some((CallStatus::PENDING, CallStatus::Missed)),
        CallAction::End => Some((CallStatus::LIVE, CallStatus::Ended)),
    }
}

fn action_name(action: CallAction) -> &'static str {
    match action {
        CallAction::Initiate => "initiate",
        CallAction::Accept => "accept",
        CallAction::Decline => "decline",
        CallAction::Missed => "miss",
        CallAction::End => "end",
    }
}

/// Call signaling. The server tracks call state and relays the handshake;
/// media goes peer to peer with the returned ICE servers.
pub struct CallRelay {
    repos: Repositories,
    registry: Arc<ConnectionRegistry>,
    push: Arc<PushDispatcher>,
    ice_servers: Vec<IceServer>,
}

impl CallRelay {
    pub fn new(
        repos: Repositories,
        registry: Arc<ConnectionRegistry>,
        push: Arc<PushDispatcher>,
        ice_servers: Vec<IceServer>,
    ) -> Self {
        Self {
            repos,
            registry,
            push,
            ice_servers,
        }
    }

    pub async fn initiate(
        &self,
        caller: &AuthUser,
        req: InitiateCallRequest,
    ) -> Result<CallSession, AppError> {
        if req.receiver_id == caller.id {
            return Err(AppError::validation("Cannot call yourself"));
        }
        if self.repos.users.find_by_id(&req.receiver_id).await?.is_none() {
            return Err(AppError::not_found("User not found"));
        }
        if self.repos.users.has_blocked(&req.receiver_id, &caller.id).await? {
            return Err(AppError::forbidden("You cannot call this user"));
        }
        if let Some(group_id) = req.group_id.as_deref() {
            let group = self
                .repos
                .groups
                .get(group_id)
                .await?
                .ok_or_else(|| AppError::not_found("Group not found"))?;
            if !group.is_member(&caller.id) || !group.is_member(&req.receiver_id) {
                return Err(AppError::forbidden("Both parties must be in the group"));
            }
        }

        let now = now_millis();
        let mut call = Call {
            id: uuid::Uuid::new_v4().to_string(),
            caller_id: caller.id.clone(),
            receiver_id: req.receiver_id,
            group_id: req.group_id,
            call_type: req.call_type,
            status: CallStatus::Initiated,
            started_at: None,
            ended_at: None,
            duration: 0,
            created_at: now,
        };
        self.repos.calls.create(&call).await?;

        let delivered = self.registry.send(
            &call.receiver_id,
            &ServerEvent::IncomingCall {
                call: call.clone(),
                caller_name: caller.username.clone(),
                room_id: call.room_id(),
            },
        );

        if delivered {
            if let Some(ringing) = self
                .repos
                .calls
                .transition(&call.id, &[CallStatus::Initiated], CallStatus::Ringing, now_millis())
                .await?
            {
                call = ringing;
            }
        } else {
            self.push.dispatch(PushPayload {
                user_id: call.receiver_id.clone(),
                kind: PushKind::IncomingCall,
                title: caller.username.clone(),
                body: format!("Incoming {:?} call", call.call_type).to_lowercase(),
                chat_id: None,
                device_token: None,
            });
        }

        tracing::info!(
            "Call {} from {} to {} is {}",
            call.id,
            call.caller_id,
            call.receiver_id,
            call.status
        );

        Ok(CallSession {
            call_id: call.id.clone(),
            room_id: call.room_id(),
            status: call.status,
            ice_servers: self.ice_servers.clone(),
        })
    }

    pub async fn accept(&self, user: &AuthUser, call_id: &str) -> Result<Call, AppError> {
        let call = self.advance(user, call_id, CallAction::Accept).await?;
        self.registry.send(
            &call.caller_id,
            &ServerEvent::CallAccepted {
                call_id: call.id.clone(),
                room_id: call.room_id(),
            },
        );
        Ok(call)
    }

    pub async fn decline(&self, user: &AuthUser, call_id: &str) -> Result<Call, AppError> {
        let call = self.advance(user, call_id, CallAction::Decline).await?;
        self.registry.send(
            &call.caller_id,
            &ServerEvent::CallDeclined {
                call_id: call.id.clone(),
            },
        );
        Ok(call)
    }

    pub async fn end(&self, user: &AuthUser, call_id: &str) -> Result<Call, AppError> {
        let call = self.advance(user, call_id, CallAction::End).await?;
        self.registry.send(
            call.counterpart(&user.id),
            &ServerEvent::CallEnded {
                call_id: call.id.clone(),
                duration: call.duration,
            },
        );
        Ok(call)
    }

    /// For whatever decides an unanswered call has timed out.
    pub async fn miss(&self, user: &AuthUser, call_id: &str) -> Result<Call, AppError> {
        let call = self.advance(user, call_id, CallAction::Missed).await?;
        self.registry.send(
            call.counterpart(&user.id),
            &ServerEvent::CallMissed {
                call_id: call.id.clone(),
            },
        );
        Ok(call)
    }

    pub async fn history(&self, user: &AuthUser) -> Result<Vec<Call>, AppError> {
        self.repos.calls.history(&user.id, CALL_HISTORY_LIMIT).await
    }

    async fn advance(&self, user: &AuthUser, call_id: &str, action: CallAction) -> Result<Call, AppError> {
        let call = self
            .repos
            .calls
            .get(call_id)
            .await?
            .ok_or_else(|| AppError::not_found("Call not found"))?;

        if !call.is_party(&user.id) {
            return Err(AppError::forbidden("Not a party to this call"));
        }
        // Only the callee answers or turns a call down.
        if matches!(action, CallAction::Accept | CallAction::Decline) && call.receiver_id != user.id {
            return Err(AppError::forbidden("Only the receiver can do that"));
        }

        let Some((from, to)) = transition_for(action) else {
            return Err(AppError::validation("Use initiate to start a call"));
        };

        match self.repos.calls.transition(&call.id, from, to, now_millis()).await? {
            Some(updated) => Ok(updated),
            None => {
                // Re-read: the status may have moved since the first load.
                let current = self
                    .repos
                    .calls
                    .get(&call.id)
                    .await?
                    .map(|c| c.status)
                    .unwrap_or(call.status);
                Err(AppError::InvalidCallState {
                    from: current,
                    action: action_name(action),
                })
            }
        }
    }
}
