mod common;

use axum::http::StatusCode;
use axum_test::TestServer;
use ghost_server::{routes, AppState};
use serde_json::{json, Value};
use std::sync::Arc;

use common::auth_header;

async fn setup() -> (TestServer, sqlx::SqlitePool, Arc<AppState>) {
    let pool = common::setup_test_db().await;
    let state = common::create_test_state(pool.clone());
    let server = TestServer::new(routes::build_router(state.clone())).unwrap();
    (server, pool, state)
}

async fn list_chats(server: &TestServer, token: &str) -> Vec<Value> {
    let (h, v) = auth_header(token);
    let res = server.get("/api/chats").add_header(h, v).await;
    res.assert_status_ok();
    res.json::<Vec<Value>>()
}

#[tokio::test]
async fn create_chat_is_idempotent_per_pair() {
    let (server, pool, _state) = setup().await;
    let (alice_id, alice_token) = common::create_test_user(&pool, "alice").await;
    let (bob_id, bob_token) = common::create_test_user(&pool, "bob").await;

    let (h, v) = auth_header(&alice_token);
    let first = server
        .post("/api/chats")
        .add_header(h, v)
        .json(&json!({"participantId": bob_id}))
        .await;
    first.assert_status(StatusCode::CREATED);
    let first: Value = first.json();
    assert_eq!(first["participantId"], bob_id);
    assert_eq!(first["participantName"], "bob");
    assert_eq!(first["disappearingMode"], false);

    // Same pair from the other side.
    let (h, v) = auth_header(&bob_token);
    let second = server
        .post("/api/chats")
        .add_header(h, v)
        .json(&json!({"participantId": alice_id}))
        .await;
    second.assert_status_ok();
    assert_eq!(second.json::<Value>()["id"], first["id"]);

    let contacts: Vec<(String, String)> =
        sqlx::query_as("SELECT user_id, contact_id FROM user_contacts ORDER BY user_id")
            .fetch_all(&pool)
            .await
            .unwrap();
    assert_eq!(contacts.len(), 2);
    assert!(contacts.contains(&(alice_id.clone(), bob_id.clone())));
    assert!(contacts.contains(&(bob_id, alice_id)));
}

#[tokio::test]
async fn concurrent_creates_yield_one_chat() {
    let (_server, pool, state) = setup().await;
    let (alice_id, _) = common::create_test_user(&pool, "alice").await;
    let (bob_id, _) = common::create_test_user(&pool, "bob").await;

    let (a, b) = tokio::join!(
        state.repos.chats.get_or_create_direct(&alice_id, &bob_id, false, 0),
        state.repos.chats.get_or_create_direct(&bob_id, &alice_id, false, 0),
    );
    let (a, a_created) = a.unwrap();
    let (b, b_created) = b.unwrap();

    assert_eq!(a.id, b.id);
    assert!(a_created ^ b_created, "exactly one call creates the chat");

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chats")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn create_chat_rejects_self_and_unknown_users() {
    let (server, pool, _state) = setup().await;
    let (alice_id, alice_token) = common::create_test_user(&pool, "alice").await;

    let (h, v) = auth_header(&alice_token);
    server
        .post("/api/chats")
        .add_header(h, v)
        .json(&json!({"participantId": alice_id}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let (h, v) = auth_header(&alice_token);
    server
        .post("/api/chats")
        .add_header(h, v)
        .json(&json!({"participantId": "ghost"}))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    server
        .get("/api/chats")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn flags_are_per_participant() {
    let (server, pool, state) = setup().await;
    let (alice_id, alice_token) = common::create_test_user(&pool, "alice").await;
    let (bob_id, bob_token) = common::create_test_user(&pool, "bob").await;
    let chat_id = common::create_test_chat(&state, &alice_id, &bob_id).await;

    for (path, body) in [
        ("pin", json!({"pinned": true})),
        ("mute", json!({"muted": true})),
        ("archive", json!({"archived": true})),
    ] {
        let (h, v) = auth_header(&alice_token);
        server
            .put(&format!("/api/chats/{}/{}", chat_id, path))
            .add_header(h, v)
            .json(&body)
            .await
            .assert_status_ok();
    }

    let alice_view = &list_chats(&server, &alice_token).await[0];
    assert_eq!(alice_view["isPinned"], true);
    assert_eq!(alice_view["isMuted"], true);
    assert_eq!(alice_view["isArchived"], true);

    let bob_view = &list_chats(&server, &bob_token).await[0];
    assert_eq!(bob_view["isPinned"], false);
    assert_eq!(bob_view["isMuted"], false);
    assert_eq!(bob_view["isArchived"], false);
}

#[tokio::test]
async fn outsiders_cannot_touch_a_chat() {
    let (server, pool, state) = setup().await;
    let (alice_id, _) = common::create_test_user(&pool, "alice").await;
    let (bob_id, _) = common::create_test_user(&pool, "bob").await;
    let (_, eve_token) = common::create_test_user(&pool, "eve").await;
    let chat_id = common::create_test_chat(&state, &alice_id, &bob_id).await;

    let (h, v) = auth_header(&eve_token);
    server
        .put(&format!("/api/chats/{}/pin", chat_id))
        .add_header(h, v)
        .json(&json!({"pinned": true}))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let (h, v) = auth_header(&eve_token);
    server
        .get(&format!("/api/chats/{}/messages", chat_id))
        .add_header(h, v)
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn disappearing_duration_toggles_ghost_mode() {
    let (server, pool, state) = setup().await;
    let (alice_id, alice_token) = common::create_test_user(&pool, "alice").await;
    let (bob_id, _) = common::create_test_user(&pool, "bob").await;
    let chat_id = common::create_test_chat(&state, &alice_id, &bob_id).await;

    let (h, v) = auth_header(&alice_token);
    let on: Value = server
        .put(&format!("/api/chats/{}/disappearing", chat_id))
        .add_header(h, v)
        .json(&json!({"duration": 3_600_000}))
        .await
        .json();
    assert_eq!(on["disappearingMode"], true);
    assert_eq!(on["disappearAfter"], 3_600_000);

    let (h, v) = auth_header(&alice_token);
    let off: Value = server
        .put(&format!("/api/chats/{}/disappearing", chat_id))
        .add_header(h, v)
        .json(&json!({"duration": null}))
        .await
        .json();
    assert_eq!(off["disappearingMode"], false);

    let (h, v) = auth_header(&alice_token);
    server
        .put(&format!("/api/chats/{}/disappearing", chat_id))
        .add_header(h, v)
        .json(&json!({"duration": -5}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn ghost_mode_toggle_keeps_duration() {
    let (server, pool, _state) = setup().await;
    let (_, alice_token) = common::create_test_user(&pool, "alice").await;
    let (bob_id, _) = common::create_test_user(&pool, "bob").await;

    let (h, v) = auth_header(&alice_token);
    let chat: Value = server
        .post("/api/chats")
        .add_header(h, v)
        .json(&json!({"participantId": bob_id, "disappearingMode": true, "disappearAfter": 60_000}))
        .await
        .json();
    assert_eq!(chat["disappearingMode"], true);
    let chat_id = chat["id"].as_str().unwrap();

    let (h, v) = auth_header(&alice_token);
    let off: Value = server
        .put(&format!("/api/chats/{}/ghost-mode", chat_id))
        .add_header(h, v)
        .json(&json!({"enabled": false}))
        .await
        .json();
    assert_eq!(off["disappearingMode"], false);

    let (h, v) = auth_header(&alice_token);
    let on: Value = server
        .put(&format!("/api/chats/{}/ghost-mode", chat_id))
        .add_header(h, v)
        .json(&json!({"enabled": true}))
        .await
        .json();
    assert_eq!(on["disappearingMode"], true);
    assert_eq!(on["disappearAfter"], 60_000);
}

#[tokio::test]
async fn list_tracks_unread_and_hides_expired_preview() {
    let (server, pool, state) = setup().await;
    let (alice_id, alice_token) = common::create_test_user(&pool, "alice").await;
    let (bob_id, bob_token) = common::create_test_user(&pool, "bob").await;
    let chat_id = common::create_test_chat(&state, &alice_id, &bob_id).await;

    let (h, v) = auth_header(&alice_token);
    server
        .post("/api/messages")
        .add_header(h, v)
        .json(&json!({"chatId": chat_id, "content": "lasting"}))
        .await
        .assert_status(StatusCode::CREATED);

    let bob_view = &list_chats(&server, &bob_token).await[0];
    assert_eq!(bob_view["unreadCount"], 1);
    assert_eq!(bob_view["lastMessage"], "lasting");
    assert_eq!(list_chats(&server, &alice_token).await[0]["unreadCount"], 0);

    // Opening the chat clears unread.
    let (h, v) = auth_header(&bob_token);
    server
        .get(&format!("/api/chats/{}/messages", chat_id))
        .add_header(h, v)
        .await
        .assert_status_ok();
    assert_eq!(list_chats(&server, &bob_token).await[0]["unreadCount"], 0);

    let (h, v) = auth_header(&alice_token);
    server
        .post("/api/messages")
        .add_header(h, v)
        .json(&json!({"chatId": chat_id, "content": "fleeting", "disappearAfter": 1}))
        .await
        .assert_status(StatusCode::CREATED);
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    let bob_view = &list_chats(&server, &bob_token).await[0];
    assert!(bob_view["lastMessage"].is_null());
}

#[tokio::test]
async fn unread_counts_every_send_until_the_chat_is_opened() {
    let (server, pool, state) = setup().await;
    let (alice_id, alice_token) = common::create_test_user(&pool, "alice").await;
    let (bob_id, bob_token) = common::create_test_user(&pool, "bob").await;
    let chat_id = common::create_test_chat(&state, &alice_id, &bob_id).await;

    for (token, content) in [
        (&alice_token, "one"),
        (&alice_token, "two"),
        (&alice_token, "three"),
        (&bob_token, "back at you"),
    ] {
        let (h, v) = auth_header(token);
        server
            .post("/api/messages")
            .add_header(h, v)
            .json(&json!({"chatId": chat_id, "content": content}))
            .await
            .assert_status(StatusCode::CREATED);
    }

    assert_eq!(list_chats(&server, &bob_token).await[0]["unreadCount"], 3);
    assert_eq!(list_chats(&server, &alice_token).await[0]["unreadCount"], 1);

    let (h, v) = auth_header(&bob_token);
    server
        .get(&format!("/api/chats/{}/messages", chat_id))
        .add_header(h, v)
        .await
        .assert_status_ok();

    // Only the reader's count resets.
    assert_eq!(list_chats(&server, &bob_token).await[0]["unreadCount"], 0);
    assert_eq!(list_chats(&server, &alice_token).await[0]["unreadCount"], 1);
}
