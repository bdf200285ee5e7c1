mod common;

use axum::http::StatusCode;
use axum_test::TestServer;
use ghost_server::{routes, AppState};
use serde_json::{json, Value};
use std::sync::Arc;

use common::{auth_header, RecordingNotifier};

struct Fixture {
    server: TestServer,
    pool: sqlx::SqlitePool,
    state: Arc<AppState>,
    push: Arc<RecordingNotifier>,
    alice: (String, String),
    bob: (String, String),
}

async fn setup() -> Fixture {
    let pool = common::setup_test_db().await;
    let (state, push) = common::create_test_state_with_push(pool.clone());
    let server = TestServer::new(routes::build_router(state.clone())).unwrap();
    let alice = common::create_test_user(&pool, "alice").await;
    let bob = common::create_test_user(&pool, "bob").await;
    Fixture {
        server,
        pool,
        state,
        push,
        alice,
        bob,
    }
}

async fn initiate(f: &Fixture) -> Value {
    let (h, v) = auth_header(&f.alice.1);
    let res = f
        .server
        .post("/api/calls/initiate")
        .add_header(h, v)
        .json(&json!({"receiverId": f.bob.0, "type": "VIDEO"}))
        .await;
    res.assert_status(StatusCode::CREATED);
    res.json()
}

async fn act(f: &Fixture, token: &str, call_id: &str, action: &str) -> axum_test::TestResponse {
    let (h, v) = auth_header(token);
    f.server
        .post(&format!("/api/calls/{}/{}", call_id, action))
        .add_header(h, v)
        .await
}

#[tokio::test]
async fn offline_callee_stays_initiated_and_gets_a_push() {
    let f = setup().await;
    let session = initiate(&f).await;

    assert_eq!(session["status"], "INITIATED");
    assert_eq!(
        session["roomId"],
        format!("room_{}", session["callId"].as_str().unwrap())
    );
    assert_eq!(session["iceServers"][0]["urls"][0], "stun:stun.example.org:3478");

    for _ in 0..50 {
        if !f.push.payloads().is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    let payloads = f.push.payloads();
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0].user_id, f.bob.0);
}

#[tokio::test]
async fn online_callee_rings_and_call_runs_to_the_end() {
    let f = setup().await;
    let mut alice_rx = common::attach_session(&f.state, &f.alice.0);
    let mut bob_rx = common::attach_session(&f.state, &f.bob.0);

    let session = initiate(&f).await;
    assert_eq!(session["status"], "RINGING");
    let call_id = session["callId"].as_str().unwrap();

    let incoming = common::queued_events(&mut bob_rx, "incoming_call");
    assert_eq!(incoming.len(), 1);
    assert_eq!(incoming[0]["data"]["callerName"], "alice");
    assert_eq!(incoming[0]["data"]["call"]["type"], "VIDEO");

    // Only the callee answers.
    act(&f, &f.alice.1, call_id, "accept")
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let accepted: Value = act(&f, &f.bob.1, call_id, "accept").await.json();
    assert_eq!(accepted["status"], "ONGOING");
    assert!(accepted["startedAt"].as_i64().is_some());
    assert_eq!(common::queued_events(&mut alice_rx, "call_accepted").len(), 1);

    let ended: Value = act(&f, &f.alice.1, call_id, "end").await.json();
    assert_eq!(ended["status"], "ENDED");
    assert!(ended["duration"].as_i64().unwrap() >= 0);
    let ended_events = common::queued_events(&mut bob_rx, "call_ended");
    assert_eq!(ended_events.len(), 1);
    assert_eq!(ended_events[0]["data"]["callId"], call_id);
}

#[tokio::test]
async fn terminal_calls_reject_further_actions() {
    let f = setup().await;
    let session = initiate(&f).await;
    let call_id = session["callId"].as_str().unwrap();

    let declined: Value = act(&f, &f.bob.1, call_id, "decline").await.json();
    assert_eq!(declined["status"], "DECLINED");
    assert!(declined["endedAt"].as_i64().is_some());
    assert_eq!(declined["duration"], 0);

    for (token, action) in [
        (&f.bob.1, "accept"),
        (&f.bob.1, "decline"),
        (&f.alice.1, "end"),
        (&f.alice.1, "missed"),
    ] {
        let res = act(&f, token, call_id, action).await;
        res.assert_status(StatusCode::CONFLICT);
        let body: Value = res.json();
        assert!(body["error"].as_str().unwrap().contains("DECLINED"));
    }
}

#[tokio::test]
async fn unanswered_call_can_be_marked_missed() {
    let f = setup().await;
    let mut bob_rx = common::attach_session(&f.state, &f.bob.0);
    let session = initiate(&f).await;
    let call_id = session["callId"].as_str().unwrap();

    let missed: Value = act(&f, &f.alice.1, call_id, "missed").await.json();
    assert_eq!(missed["status"], "MISSED");
    assert_eq!(common::queued_events(&mut bob_rx, "call_missed").len(), 1);
}

#[tokio::test]
async fn initiate_validation_and_outsiders() {
    let f = setup().await;

    let (h, v) = auth_header(&f.alice.1);
    f.server
        .post("/api/calls/initiate")
        .add_header(h, v)
        .json(&json!({"receiverId": f.alice.0}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let (h, v) = auth_header(&f.alice.1);
    f.server
        .post("/api/calls/initiate")
        .add_header(h, v)
        .json(&json!({"receiverId": "nobody"}))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let session = initiate(&f).await;
    let call_id = session["callId"].as_str().unwrap();
    let (_, eve_token) = common::create_test_user(&f.pool, "eve").await;
    act(&f, &eve_token, call_id, "end")
        .await
        .assert_status(StatusCode::FORBIDDEN);
    act(&f, &f.alice.1, "missing", "end")
        .await
        .assert_status(StatusCode::NOT_FOUND);
    act(&f, &f.bob.1, call_id, "end").await.assert_status_ok();
}

#[tokio::test]
async fn history_lists_both_sides_newest_first() {
    let f = setup().await;
    let first = initiate(&f).await;
    let second = initiate(&f).await;

    let (h, v) = auth_header(&f.bob.1);
    let history: Vec<Value> = f
        .server
        .get("/api/calls/history")
        .add_header(h, v)
        .await
        .json();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["id"], second["callId"]);
    assert_eq!(history[1]["id"], first["callId"]);
}
