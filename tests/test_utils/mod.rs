//! Shared fixtures for integration tests: a mocked AREA backend and an
//! orchestrator wired against it.

#![allow(dead_code)]

use std::sync::Arc;

use area_blueprint::blueprint::{GraphOrchestrator, NoticeLog};
use area_blueprint::client::ApiClient;
use area_blueprint::config::AppConfig;
use area_blueprint::connectors::Registry;
use area_blueprint::models::ServiceKind;
use serde_json::{Value, json};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

/// Configuration pointing at the mock backend.
pub fn test_config(server: &MockServer) -> AppConfig {
    AppConfig {
        profile: "test".to_string(),
        api_base_url: server.uri(),
        api_token: Some("test-token".to_string()),
        request_timeout_ms: 2_000,
        github_webhook_url: "https://hooks.example.com/github".to_string(),
        ..AppConfig::default()
    }
}

pub fn client(server: &MockServer) -> Arc<ApiClient> {
    Arc::new(ApiClient::from_config(&test_config(server)).expect("client builds"))
}

pub fn registry(server: &MockServer) -> Arc<Registry> {
    Arc::new(Registry::with_defaults(client(server), &test_config(server)))
}

/// Orchestrator plus the notice log it reports into.
pub fn orchestrator(server: &MockServer) -> (GraphOrchestrator, Arc<NoticeLog>) {
    let notices = Arc::new(NoticeLog::new());
    let orchestrator = GraphOrchestrator::from_config(&test_config(server), notices.clone())
        .expect("orchestrator builds");
    (orchestrator, notices)
}

/// Report `service` as linked. Unmocked services answer 404 and count as unlinked.
pub async fn mount_connected(server: &MockServer, service: ServiceKind) {
    Mock::given(method("GET"))
        .and(path("/users/connection"))
        .and(query_param("provider", service.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "connected": true })))
        .mount(server)
        .await;
}

pub async fn mount_hooks(server: &MockServer, list_path: &str, hooks: Value) {
    Mock::given(method("GET"))
        .and(path(list_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(hooks))
        .mount(server)
        .await;
}

pub async fn mount_reactions(server: &MockServer, reactions: Value) {
    Mock::given(method("GET"))
        .and(path("/reactions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(reactions))
        .mount(server)
        .await;
}

pub fn github_hook(id: i64, repo: &str) -> Value {
    json!({
        "id": id,
        "service": "github",
        "additionalInfos": { "repo": repo, "events": ["push"] }
    })
}

pub fn reaction(id: i64, hook_id: i64, reaction_type: i64, name: &str) -> Value {
    json!({
        "id": id,
        "hookId": hook_id,
        "reactionType": reaction_type,
        "config": { "name": name }
    })
}

/// Backend with one linked github repository hook and the given reactions.
pub async fn github_backend(reactions: Value) -> MockServer {
    let server = MockServer::start().await;
    mount_connected(&server, ServiceKind::Github).await;
    mount_hooks(&server, "/github/webhook", json!([github_hook(1, "octo/hello")])).await;
    mount_reactions(&server, reactions).await;
    server
}
