mod common;

use common::ws_helpers::*;

async fn stored_presence(pool: &sqlx::SqlitePool, user_id: &str) -> (bool, Option<i64>) {
    sqlx::query_as::<_, (bool, Option<i64>)>(r#"SELECT is_online, last_seen FROM "user" WHERE id = ?"#)
        .bind(user_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn contacts_see_user_come_online_and_leave() {
    let (base, pool, state) = start_server().await;
    let (alice_id, alice_token) = common::create_test_user(&pool, "alice").await;
    let (bob_id, bob_token) = common::create_test_user(&pool, "bob").await;
    common::create_test_chat(&state, &alice_id, &bob_id).await;

    let mut bob = ws_connect(&base, &bob_token).await;
    wait_online(&state, &bob_id, true).await;

    let alice = ws_connect(&base, &alice_token).await;
    let online = recv_event(&mut bob, "online_status").await.expect("no online event");
    assert_eq!(online["data"]["userId"], alice_id);
    assert_eq!(online["data"]["isOnline"], true);

    drop(alice);
    let offline = recv_event(&mut bob, "online_status").await.expect("no offline event");
    assert_eq!(offline["data"]["userId"], alice_id);
    assert_eq!(offline["data"]["isOnline"], false);
    assert!(offline["data"]["lastSeen"].as_i64().is_some());

    // The tracker persisted what it announced.
    let (is_online, last_seen) = stored_presence(&pool, &alice_id).await;
    assert!(!is_online);
    assert_eq!(last_seen, offline["data"]["lastSeen"].as_i64());
}

#[tokio::test]
async fn second_device_does_not_reannounce() {
    let (base, pool, state) = start_server().await;
    let (alice_id, alice_token) = common::create_test_user(&pool, "alice").await;
    let (bob_id, bob_token) = common::create_test_user(&pool, "bob").await;
    common::create_test_chat(&state, &alice_id, &bob_id).await;

    let mut bob = ws_connect(&base, &bob_token).await;
    wait_online(&state, &bob_id, true).await;

    let _phone = ws_connect(&base, &alice_token).await;
    recv_event(&mut bob, "online_status").await.expect("no online event");

    let laptop = ws_connect(&base, &alice_token).await;
    wait_sessions(&state, &alice_id, 2).await;
    drop(laptop);
    wait_sessions(&state, &alice_id, 1).await;

    let rest = drain_messages(&mut bob).await;
    assert!(
        rest.iter().all(|m| m["type"] != "online_status"),
        "Extra presence events: {:?}",
        rest
    );
}

#[tokio::test]
async fn new_session_gets_snapshot_of_online_contacts() {
    let (base, pool, state) = start_server().await;
    let (alice_id, alice_token) = common::create_test_user(&pool, "alice").await;
    let (bob_id, bob_token) = common::create_test_user(&pool, "bob").await;
    let (carol_id, _) = common::create_test_user(&pool, "carol").await;
    common::create_test_chat(&state, &alice_id, &bob_id).await;
    common::create_test_chat(&state, &carol_id, &bob_id).await;

    let _alice = ws_connect(&base, &alice_token).await;
    wait_online(&state, &alice_id, true).await;

    let mut bob = ws_connect(&base, &bob_token).await;
    let snapshot = drain_messages(&mut bob).await;
    let online: Vec<&str> = snapshot
        .iter()
        .filter(|m| m["type"] == "online_status" && m["data"]["isOnline"] == true)
        .filter_map(|m| m["data"]["userId"].as_str())
        .collect();

    assert_eq!(online, vec![alice_id.as_str()], "carol is offline");
}

#[tokio::test]
async fn strangers_are_not_told() {
    let (base, pool, state) = start_server().await;
    let (_alice_id, alice_token) = common::create_test_user(&pool, "alice").await;
    let (bob_id, bob_token) = common::create_test_user(&pool, "bob").await;

    let mut bob = ws_connect(&base, &bob_token).await;
    wait_online(&state, &bob_id, true).await;
    drain_messages(&mut bob).await;

    let _alice = ws_connect(&base, &alice_token).await;
    let seen = drain_messages(&mut bob).await;
    assert!(seen.iter().all(|m| m["type"] != "online_status"));
}

#[tokio::test]
async fn profile_reports_live_presence() {
    let (base, pool, state) = start_server().await;
    let (alice_id, alice_token) = common::create_test_user(&pool, "alice").await;
    let (_bob_id, bob_token) = common::create_test_user(&pool, "bob").await;

    let client = reqwest::Client::new();
    let profile = |token: String| {
        let client = client.clone();
        let url = format!("{}/api/users/{}", base, alice_id);
        async move {
            client
                .get(url)
                .bearer_auth(token)
                .send()
                .await
                .unwrap()
                .json::<serde_json::Value>()
                .await
                .unwrap()
        }
    };

    assert_eq!(profile(bob_token.clone()).await["isOnline"], false);

    let _alice = ws_connect(&base, &alice_token).await;
    wait_online(&state, &alice_id, true).await;
    assert_eq!(profile(bob_token).await["isOnline"], true);
}

#[tokio::test]
async fn fan_out_reaches_each_online_contact_once() {
    let pool = common::setup_test_db().await;
    let state = common::create_test_state(pool.clone());
    let (alice_id, _) = common::create_test_user(&pool, "alice").await;
    let (bob_id, _) = common::create_test_user(&pool, "bob").await;
    let (carol_id, _) = common::create_test_user(&pool, "carol").await;
    common::create_test_chat(&state, &alice_id, &bob_id).await;
    common::create_test_chat(&state, &alice_id, &carol_id).await;

    let mut bob_rx = common::attach_session(&state, &bob_id);

    // Carol is offline, so only bob is told.
    assert_eq!(state.presence.on_admit(&alice_id).await.unwrap(), 1);

    let about_alice = |events: Vec<serde_json::Value>| -> Vec<serde_json::Value> {
        events
            .into_iter()
            .filter(|e| e["data"]["userId"] == alice_id.as_str())
            .collect()
    };
    let told = about_alice(common::queued_events(&mut bob_rx, "online_status"));
    assert_eq!(told.len(), 1);
    assert_eq!(told[0]["data"]["isOnline"], true);

    // Nothing was queued up for carol to find later.
    let mut carol_rx = common::attach_session(&state, &carol_id);
    assert!(about_alice(common::queued_events(&mut carol_rx, "online_status")).is_empty());
}
