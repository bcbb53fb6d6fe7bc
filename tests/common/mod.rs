//! Shared harness for endpoint tests: a router over a temp-file SQLite
//! database, driven with `tower::util::ServiceExt::oneshot`.
#![allow(dead_code)]

use axum::http::{Request, StatusCode};
use stakearena::api::{self, AppState};
use stakearena::config::Config;
use stakearena::db::init_db;
use stakearena::notify::NoopNotifier;
use stakearena::Repository;
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

pub const ADMIN_TOKEN: &str = "test-admin-token";

pub struct TestApp {
    pub app: axum::Router,
    pub repo: Arc<Repository>,
    pub _temp: TempDir,
}

pub async fn setup_test_app() -> TestApp {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    let repo = Arc::new(Repository::new(pool));

    let mut env = HashMap::new();
    env.insert("DATABASE_PATH".to_string(), db_path);
    env.insert("ADMIN_TOKEN".to_string(), ADMIN_TOKEN.to_string());
    let config = Config::from_env_map(env).unwrap();

    let state = AppState::new(repo.clone(), config, Arc::new(NoopNotifier));
    TestApp {
        app: api::create_router(state),
        repo,
        _temp: temp_dir,
    }
}

pub async fn get(app: &axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    send(app, req).await
}

pub async fn get_admin(app: &axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .header("x-admin-token", ADMIN_TOKEN)
        .body(axum::body::Body::empty())
        .unwrap();
    send(app, req).await
}

pub async fn post_json(
    app: &axum::Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(axum::body::Body::from(body.to_string()))
        .unwrap();
    send(app, req).await
}

pub async fn post_admin(
    app: &axum::Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-admin-token", ADMIN_TOKEN)
        .body(axum::body::Body::from(body.to_string()))
        .unwrap();
    send(app, req).await
}

async fn send(app: &axum::Router, req: Request<axum::body::Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };
    (status, value)
}

/// Create an account and fund it through the deposit-approval flow.
pub async fn funded_user(app: &axum::Router, user_id: &str, balance: i64) {
    let (status, _) = post_json(
        app,
        "/v1/accounts",
        serde_json::json!({"userId": user_id, "displayName": user_id.to_uppercase()}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    if balance > 0 {
        let (status, body) = post_json(
            app,
            "/v1/wallet/deposits",
            serde_json::json!({"userId": user_id, "amount": balance}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let request_id = body["requestId"].as_str().unwrap().to_string();

        let (status, _) = post_admin(
            app,
            &format!("/v1/admin/deposits/{}/approve", request_id),
            serde_json::json!({}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
}

/// Pair two funded users at the given stake; returns the match id.
pub async fn paired_match(app: &axum::Router, a: &str, b: &str, stake: i64) -> String {
    let (status, body) = post_json(
        app,
        "/v1/queue/join",
        serde_json::json!({"userId": a, "stakeTier": stake}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "queued");

    let (status, body) = post_json(
        app,
        "/v1/queue/join",
        serde_json::json!({"userId": b, "stakeTier": stake}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "paired");
    body["matchInfo"]["id"].as_str().unwrap().to_string()
}
