//! Common utilities for hnreplies integration tests

use hnreplies::Config;
use std::path::Path;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Base URL of the mock API, in the same shape as the real one
pub fn api_base(server: &MockServer) -> String {
    format!("{}/v0/", server.uri())
}

/// Config pointing at `server` and `data_dir`, with short waits
pub fn test_config(server: &MockServer, data_dir: &Path) -> Config {
    let mut config = Config::default();
    config.api.base_url = api_base(server);
    config.api.request_timeout = Duration::from_secs(5);
    config.fetch.max_parallel = 8;
    config.fetch.item_retries = 20;
    config.fetch.item_retry_delay = Duration::from_millis(10);
    config.poll.poll_interval = Duration::from_millis(10);
    config.poll.idle_interval = Duration::from_millis(20);
    config.store.data_dir = data_dir.to_path_buf();
    config
}

/// Serve `body` for `GET /v0/item/{id}.json`
pub async fn mount_item(server: &MockServer, id: i64, body: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/v0/item/{}.json", id)))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Answer `GET /v0/item/{id}.json` with `status` and an HTML error page
#[allow(dead_code)]
pub async fn mount_item_status(server: &MockServer, id: i64, status: u16) {
    Mock::given(method("GET"))
        .and(path(format!("/v0/item/{}.json", id)))
        .respond_with(ResponseTemplate::new(status).set_body_string("<html>error</html>"))
        .mount(server)
        .await;
}

/// Serve `{"items": ids}` for `GET /v0/updates.json`
#[allow(dead_code)]
pub async fn mount_updates(server: &MockServer, ids: &[i64]) {
    let body = serde_json::json!({ "items": ids, "profiles": [] }).to_string();
    Mock::given(method("GET"))
        .and(path("/v0/updates.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}
