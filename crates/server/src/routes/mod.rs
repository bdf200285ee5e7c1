pub mod calls;
pub mod channels;
pub mod chats;
pub mod files;
pub mod groups;
pub mod messages;
pub mod reactions;
pub mod status;
pub mod users;

use crate::ws;
use crate::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
struct Health {
    status: &'static str,
    version: &'static str,
}

/// GET /health
async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub fn build_router(state: Arc<AppState>) -> Router {
    // Multipart overhead on top of the file itself.
    let upload_limit = state.config.max_upload_bytes as usize + 64 * 1024;

    let api_routes = Router::new()
        // Chats
        .route("/chats", get(chats::list_chats))
        .route("/chats", post(chats::create_chat))
        .route("/chats/{chatId}/pin", put(chats::pin_chat))
        .route("/chats/{chatId}/mute", put(chats::mute_chat))
        .route("/chats/{chatId}/archive", put(chats::archive_chat))
        .route("/chats/{chatId}/disappearing", put(chats::set_disappearing))
        .route("/chats/{chatId}/ghost-mode", put(chats::set_ghost_mode))
        // Messages
        .route("/chats/{chatId}/messages", get(messages::list_messages))
        .route("/chats/{chatId}/messages/{messageId}/read", post(messages::mark_read))
        .route("/messages", post(messages::send_message))
        .route("/messages/forward", post(messages::forward_message))
        .route("/messages/{messageId}", patch(messages::edit_message))
        .route("/messages/{messageId}", delete(messages::delete_message))
        // Search
        .route("/search", post(messages::search))
        .route("/search/chat/{chatId}", get(messages::search_in_chat))
        // Reactions
        .route("/reactions", post(reactions::add_reaction))
        .route("/reactions", delete(reactions::remove_reaction))
        // Calls
        .route("/calls/initiate", post(calls::initiate_call))
        .route("/calls/history", get(calls::call_history))
        .route("/calls/{callId}/accept", post(calls::accept_call))
        .route("/calls/{callId}/decline", post(calls::decline_call))
        .route("/calls/{callId}/end", post(calls::end_call))
        .route("/calls/{callId}/missed", post(calls::miss_call))
        // Statuses
        .route("/status", get(status::status_feed))
        .route("/status", post(status::create_status))
        .route("/status/me", get(status::my_statuses))
        .route("/status/{statusId}", delete(status::delete_status))
        .route("/status/{statusId}/view", post(status::view_status))
        .route("/status/{statusId}/react", post(status::react_to_status))
        .route("/status/{statusId}/viewers", get(status::status_viewers))
        // Users
        .route("/users/me", get(users::get_me))
        .route("/users/profile", put(users::update_profile))
        .route("/users/push-token", put(users::set_push_token))
        .route("/users/search", get(users::search_users))
        .route("/users/{userId}", get(users::get_user))
        .route("/users/{userId}/block", post(users::block_user))
        .route("/users/{userId}/block", delete(users::unblock_user))
        // Groups
        .route("/groups", get(groups::list_groups))
        .route("/groups", post(groups::create_group))
        .route("/groups/{groupId}", get(groups::get_group))
        .route("/groups/{groupId}/members", post(groups::add_member))
        .route("/groups/{groupId}/members/{userId}", delete(groups::remove_member))
        // Channels
        .route("/channels", get(channels::list_channels))
        .route("/channels", post(channels::create_channel))
        .route("/channels/search", get(channels::search_channels))
        .route("/channels/{channelId}", get(channels::get_channel))
        .route("/channels/{channelId}/subscribe", post(channels::subscribe))
        .route("/channels/{channelId}/unsubscribe", post(channels::unsubscribe))
        // Files
        .route(
            "/upload",
            post(files::upload).layer(DefaultBodyLimit::max(upload_limit)),
        );

    Router::new()
        .nest("/api", api_routes)
        .route("/health", get(health))
        .route("/gateway", get(ws::handler::ws_handler))
        .route("/media/{file}", get(files::serve_media))
        .with_state(state)
}
