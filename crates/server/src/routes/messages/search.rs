use axum::{
    extract::{Path, Query, State},
    Json,
};
use ghost_shared::constants::{SEARCH_RESULT_LIMIT, USER_SEARCH_LIMIT};
use ghost_shared::validation::is_searchable;
use std::sync::Arc;

use crate::error::AppError;
use crate::models::{
    now_millis, AuthUser, ChatSearchQuery, Message, PublicUser, SearchRequest, SearchResults,
};
use crate::routes::chats::summarize_all;
use crate::AppState;

/// POST /api/search
///
/// Messages the caller can see, users by name, and chats whose other
/// participant matches. Queries under the minimum length come back empty.
pub async fn search(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<SearchRequest>,
) -> Result<Json<SearchResults>, AppError> {
    let query = body.query.trim();
    if !is_searchable(query) {
        return Ok(Json(SearchResults::default()));
    }

    if let Some(chat_id) = body.chat_id.as_deref() {
        state.router.chat_for(&user.id, chat_id).await?;
    }

    let messages = state
        .repos
        .messages
        .search(
            &user.id,
            query,
            body.chat_id.as_deref(),
            body.message_type,
            now_millis(),
            SEARCH_RESULT_LIMIT,
        )
        .await?;

    let users: Vec<PublicUser> = state
        .repos
        .users
        .search(query, USER_SEARCH_LIMIT)
        .await?
        .into_iter()
        .filter(|u| u.id != user.id)
        .map(|u| {
            let mut public = PublicUser::from(u);
            public.is_online = state.presence.is_online(&public.id);
            public
        })
        .collect();

    let needle = query.to_lowercase();
    let chats = state.repos.chats.list_for_user(&user.id).await?;
    let chats = summarize_all(&state, &chats, &user.id)
        .await?
        .into_iter()
        .filter(|c| c.participant_name.to_lowercase().contains(&needle))
        .collect();

    Ok(Json(SearchResults {
        messages,
        users,
        chats,
    }))
}

/// GET /api/search/chat/{chatId}?q=
pub async fn search_in_chat(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(chat_id): Path<String>,
    Query(params): Query<ChatSearchQuery>,
) -> Result<Json<Vec<Message>>, AppError> {
    let chat = state.router.chat_for(&user.id, &chat_id).await?;
    let query = params.q.trim();
    if !is_searchable(query) {
        return Ok(Json(Vec::new()));
    }

    let messages = state
        .repos
        .messages
        .search(
            &user.id,
            query,
            Some(&chat.id),
            None,
            now_millis(),
            SEARCH_RESULT_LIMIT,
        )
        .await?;
    Ok(Json(messages))
}
