use super::*;
use crate::api::routes::is_valid_username;
use crate::store::MemoryReplyStore;
use crate::types::ItemId;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use std::time::Duration;
use tower::ServiceExt; // for oneshot()

fn server_config(max_replies: usize) -> ServerConfig {
    ServerConfig {
        max_replies,
        ..ServerConfig::default()
    }
}

async fn seeded_store() -> Arc<MemoryReplyStore> {
    let store = Arc::new(MemoryReplyStore::new());
    store
        .put("bob", ItemId(100), r#"{"by":"alice","id":100,"parent":50,"type":"comment"}"#)
        .await
        .unwrap();
    store
        .put("bob", ItemId(120), r#"{"by":"carol","id":120,"parent":50,"type":"comment"}"#)
        .await
        .unwrap();
    store.put("bob", ItemId(110), "not json {").await.unwrap();
    store
}

async fn get(app: Router, uri: &str) -> (StatusCode, Option<String>, String) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();

    let status = response.status();
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, content_type, String::from_utf8(body.to_vec()).unwrap())
}

#[test]
fn username_rules() {
    for good in ["pg", "dang", "some_user", "a-b-c", "tptacek", "ab", "fifteen_chars_x", "ünïcödé"] {
        assert!(is_valid_username(good), "{good:?} should be valid");
    }
    for bad in ["", "a", "sixteen_chars_xx", "../etc", "a b", "a/b", "a.b", "x;rm"] {
        assert!(!is_valid_username(bad), "{bad:?} should be invalid");
    }
}

#[tokio::test]
async fn test_get_replies_newest_first() {
    let store = seeded_store().await;
    let app = create_router(store, &server_config(100));

    let (status, content_type, body) = get(app, "/get?u=bob").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("application/json"));

    let value: Value = serde_json::from_str(&body).unwrap();
    let ids: Vec<i64> = value["replies"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![120, 100], "invalid JSON bodies are skipped");
}

#[tokio::test]
async fn test_get_replies_respects_limit() {
    let store = seeded_store().await;
    let app = create_router(store, &server_config(1));

    let (_, _, body) = get(app, "/get?u=bob").await;

    let value: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(value["replies"].as_array().unwrap().len(), 1);
    assert_eq!(value["replies"][0]["id"], 120);
}

#[tokio::test]
async fn test_unknown_user_has_empty_replies() {
    let app = create_router(seeded_store().await, &server_config(100));

    let (status, _, body) = get(app, "/get?u=nobody").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_str::<Value>(&body).unwrap(), json!({ "replies": [] }));
}

#[tokio::test]
async fn test_invalid_user_answers_null() {
    for uri in ["/get", "/get?u=x", "/get?u=..%2Fetc", "/get?u=sixteen_chars_xx"] {
        let app = create_router(seeded_store().await, &server_config(100));
        let (status, _, body) = get(app, uri).await;

        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(body, "null", "{uri}");
    }
}

#[tokio::test]
async fn test_pretty_print() {
    let app = create_router(seeded_store().await, &server_config(100));

    let (_, _, body) = get(app, "/get?u=bob&print=pretty").await;

    assert!(body.contains('\n'), "pretty output is indented: {body}");
    let value: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(value["replies"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_health_check() {
    let app = create_router(Arc::new(MemoryReplyStore::new()), &server_config(100));

    let (status, _, body) = get(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    let value: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(value["status"], "ok");
}

#[tokio::test]
async fn test_cors_enabled() {
    let app = create_router(Arc::new(MemoryReplyStore::new()), &server_config(100));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS headers should be present"
    );
}

#[tokio::test]
async fn test_query_server_spawns() {
    let config = ServerConfig {
        enabled: true,
        bind_address: "127.0.0.1:0".parse().unwrap(), // Port 0 = OS assigns a free port
        ..ServerConfig::default()
    };

    let handle = tokio::spawn(async move {
        start_query_server(Arc::new(MemoryReplyStore::new()), &config).await
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!handle.is_finished(), "server should still be running");
    handle.abort();
}
