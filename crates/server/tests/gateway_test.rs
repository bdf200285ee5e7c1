mod common;

use common::ws_helpers::*;
use serde_json::json;

#[tokio::test]
async fn upgrade_without_token_is_refused() {
    let (base, _pool, _state) = start_server().await;

    let ws_url = format!("{}/gateway", base.replace("http://", "ws://"));
    let result = tokio_tungstenite::connect_async(&ws_url).await;

    assert!(result.is_err(), "Upgrade should be refused without a token");
}

#[tokio::test]
async fn upgrade_with_expired_token_is_refused() {
    let (base, pool, state) = start_server().await;
    let (alice_id, _) = common::create_test_user(&pool, "alice").await;
    let expired = common::create_expired_session(&pool, &alice_id).await;

    let ws_url = format!(
        "{}/gateway?token={}",
        base.replace("http://", "ws://"),
        expired
    );
    assert!(tokio_tungstenite::connect_async(&ws_url).await.is_err());
    assert!(!state.registry.is_online(&alice_id));
}

#[tokio::test]
async fn every_device_receives_the_message() {
    let (base, pool, state) = start_server().await;
    let (alice_id, alice_token) = common::create_test_user(&pool, "alice").await;
    let (bob_id, bob_token) = common::create_test_user(&pool, "bob").await;
    let chat_id = common::create_test_chat(&state, &alice_id, &bob_id).await;

    let mut phone = ws_connect(&base, &bob_token).await;
    let mut laptop = ws_connect(&base, &bob_token).await;
    let mut alice = ws_connect(&base, &alice_token).await;
    wait_online(&state, &alice_id, true).await;
    wait_sessions(&state, &bob_id, 2).await;

    send_json(
        &mut alice,
        &json!({"type": "message", "data": {"chatId": chat_id, "content": "hello both"}}),
    )
    .await;

    let on_phone = recv_event(&mut phone, "message").await.expect("phone got nothing");
    let on_laptop = recv_event(&mut laptop, "message").await.expect("laptop got nothing");
    assert_eq!(on_phone["data"]["content"], "hello both");
    assert_eq!(on_phone["data"]["id"], on_laptop["data"]["id"]);

    let ack = recv_event(&mut alice, "message_sent").await.expect("no ack");
    assert_eq!(ack["data"]["delivered"], true);
    assert_eq!(ack["data"]["isDelivered"], true);
}

#[tokio::test]
async fn ack_goes_only_to_the_sending_session() {
    let (base, pool, state) = start_server().await;
    let (alice_id, alice_token) = common::create_test_user(&pool, "alice").await;
    let (bob_id, _) = common::create_test_user(&pool, "bob").await;
    let chat_id = common::create_test_chat(&state, &alice_id, &bob_id).await;

    let mut sender = ws_connect(&base, &alice_token).await;
    let mut other = ws_connect(&base, &alice_token).await;
    wait_sessions(&state, &alice_id, 2).await;

    send_json(
        &mut sender,
        &json!({"type": "message", "data": {"chatId": chat_id, "content": "offline bob"}}),
    )
    .await;

    let ack = recv_event(&mut sender, "message_sent").await.expect("no ack");
    assert_eq!(ack["data"]["delivered"], false);

    let leftovers = drain_messages(&mut other).await;
    assert!(leftovers.iter().all(|m| m["type"] != "message_sent"));
}

#[tokio::test]
async fn bad_envelope_gets_an_error_event() {
    let (base, pool, state) = start_server().await;
    let (alice_id, alice_token) = common::create_test_user(&pool, "alice").await;

    let mut ws = ws_connect(&base, &alice_token).await;
    wait_online(&state, &alice_id, true).await;

    send_json(&mut ws, &json!({"type": "teleport", "data": {}})).await;
    let err = recv_event(&mut ws, "error").await.expect("no error event");
    assert_eq!(err["data"]["code"], "validation");

    // The socket stays usable.
    send_json(&mut ws, &json!({"type": "ping"})).await;
    send_json(
        &mut ws,
        &json!({"type": "message", "data": {"chatId": "missing", "content": "x"}}),
    )
    .await;
    let err = recv_event(&mut ws, "error").await.expect("no error event");
    assert_eq!(err["data"]["code"], "not_found");
}

#[tokio::test]
async fn closing_one_of_two_sessions_keeps_user_online() {
    let (base, pool, state) = start_server().await;
    let (alice_id, alice_token) = common::create_test_user(&pool, "alice").await;

    let first = ws_connect(&base, &alice_token).await;
    let _second = ws_connect(&base, &alice_token).await;
    wait_sessions(&state, &alice_id, 2).await;

    drop(first);
    wait_sessions(&state, &alice_id, 1).await;
    assert!(state.registry.is_online(&alice_id));
}
