mod common;

use axum::http::StatusCode;
use axum_test::TestServer;
use ghost_server::routes;
use serde_json::{json, Value};

use common::auth_header;

struct Fixture {
    server: TestServer,
    pool: sqlx::SqlitePool,
    alice: (String, String),
    bob: (String, String),
    carol: (String, String),
}

async fn setup() -> Fixture {
    let pool = common::setup_test_db().await;
    let state = common::create_test_state(pool.clone());
    let server = TestServer::new(routes::build_router(state)).unwrap();
    let alice = common::create_test_user(&pool, "alice").await;
    let bob = common::create_test_user(&pool, "bob").await;
    let carol = common::create_test_user(&pool, "carol").await;
    Fixture {
        server,
        pool,
        alice,
        bob,
        carol,
    }
}

async fn create_group(f: &Fixture, members: &[&String]) -> Value {
    let (h, v) = auth_header(&f.alice.1);
    let res = f
        .server
        .post("/api/groups")
        .add_header(h, v)
        .json(&json!({"name": "  Crew  ", "memberIds": members}))
        .await;
    res.assert_status(StatusCode::CREATED);
    res.json()
}

#[tokio::test]
async fn creator_is_admin_and_members_are_deduped() {
    let f = setup().await;

    let group = create_group(&f, &[&f.bob.0, &f.bob.0, &f.alice.0]).await;
    assert_eq!(group["name"], "Crew");
    assert_eq!(group["creatorId"], f.alice.0);
    assert_eq!(group["admins"], json!([f.alice.0]));
    let members = group["members"].as_array().unwrap();
    assert_eq!(members.len(), 2);

    let (h, v) = auth_header(&f.bob.1);
    let res = f.server.get("/api/groups").add_header(h, v).await;
    res.assert_status_ok();
    let groups: Vec<Value> = res.json();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0]["id"], group["id"]);
}

#[tokio::test]
async fn create_rejects_bad_name_and_unknown_members() {
    let f = setup().await;

    let (h, v) = auth_header(&f.alice.1);
    f.server
        .post("/api/groups")
        .add_header(h, v)
        .json(&json!({"name": "   "}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let (h, v) = auth_header(&f.alice.1);
    f.server
        .post("/api/groups")
        .add_header(h, v)
        .json(&json!({"name": "Crew", "memberIds": ["ghost"]}))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn only_members_can_read_a_group() {
    let f = setup().await;
    let group = create_group(&f, &[&f.bob.0]).await;
    let id = group["id"].as_str().unwrap();

    let (h, v) = auth_header(&f.carol.1);
    f.server
        .get(&format!("/api/groups/{}", id))
        .add_header(h, v)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let (h, v) = auth_header(&f.bob.1);
    f.server
        .get("/api/groups/missing")
        .add_header(h, v)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn only_admins_add_members() {
    let f = setup().await;
    let group = create_group(&f, &[&f.bob.0]).await;
    let id = group["id"].as_str().unwrap();

    let (h, v) = auth_header(&f.bob.1);
    f.server
        .post(&format!("/api/groups/{}/members", id))
        .add_header(h, v)
        .json(&json!({"userId": f.carol.0}))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let (h, v) = auth_header(&f.alice.1);
    let res = f
        .server
        .post(&format!("/api/groups/{}/members", id))
        .add_header(h, v)
        .json(&json!({"userId": f.carol.0}))
        .await;
    res.assert_status_ok();
    let updated: Value = res.json();
    assert_eq!(updated["members"].as_array().unwrap().len(), 3);

    let (h, v) = auth_header(&f.alice.1);
    f.server
        .post(&format!("/api/groups/{}/members", id))
        .add_header(h, v)
        .json(&json!({"userId": "ghost"}))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn members_leave_and_admins_remove() {
    let f = setup().await;
    let dave = common::create_test_user(&f.pool, "dave").await;
    let group = create_group(&f, &[&f.bob.0, &f.carol.0, &dave.0]).await;
    let id = group["id"].as_str().unwrap();

    // bob can't remove carol
    let (h, v) = auth_header(&f.bob.1);
    f.server
        .delete(&format!("/api/groups/{}/members/{}", id, f.carol.0))
        .add_header(h, v)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let (h, v) = auth_header(&f.bob.1);
    f.server
        .delete(&format!("/api/groups/{}/members/{}", id, f.bob.0))
        .add_header(h, v)
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let (h, v) = auth_header(&f.alice.1);
    f.server
        .delete(&format!("/api/groups/{}/members/{}", id, f.carol.0))
        .add_header(h, v)
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let (h, v) = auth_header(&f.alice.1);
    f.server
        .delete(&format!("/api/groups/{}/members/{}", id, f.carol.0))
        .add_header(h, v)
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let (h, v) = auth_header(&f.alice.1);
    let res = f.server.get(&format!("/api/groups/{}", id)).add_header(h, v).await;
    let remaining: Value = res.json();
    let mut members: Vec<&str> = remaining["members"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m.as_str().unwrap())
        .collect();
    members.sort();
    let mut expected = vec![f.alice.0.as_str(), dave.0.as_str()];
    expected.sort();
    assert_eq!(members, expected);
}

#[tokio::test]
async fn creator_cannot_be_removed() {
    let f = setup().await;
    let group = create_group(&f, &[&f.bob.0]).await;
    let id = group["id"].as_str().unwrap();

    let (h, v) = auth_header(&f.alice.1);
    f.server
        .delete(&format!("/api/groups/{}/members/{}", id, f.alice.0))
        .add_header(h, v)
        .await
        .assert_status(StatusCode::FORBIDDEN);
}
