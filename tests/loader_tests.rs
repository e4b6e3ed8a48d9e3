use std::collections::{BTreeMap, BTreeSet};

use area_blueprint::blueprint::{Collection, LoadedSnapshot, SnapshotLoader};
use area_blueprint::models::ServiceKind;
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};
mod test_utils;
use test_utils::{client, github_hook, mount_connected, mount_reactions, reaction, registry};

fn loader(server: &MockServer) -> SnapshotLoader {
    SnapshotLoader::new(client(server), registry(server))
}

#[tokio::test]
async fn hook_lists_of_unlinked_services_are_skipped() {
    let server = MockServer::start().await;
    mount_connected(&server, ServiceKind::Github).await;
    Mock::given(method("GET"))
        .and(path("/github/webhook"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([github_hook(1, "octo/hello")])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gmail/webhook"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;
    mount_reactions(&server, json!([reaction(9, 1, 2, "Ping")])).await;

    let loaded = loader(&server).load().await;

    assert!(loaded.is_connected(ServiceKind::Github));
    assert!(!loaded.is_connected(ServiceKind::Gmail));
    assert_eq!(loaded.connections.len(), ServiceKind::ALL.len());
    assert_eq!(loaded.snapshot.hooks[&ServiceKind::Github].len(), 1);
    assert!(loaded.snapshot.hooks[&ServiceKind::Gmail].is_empty());
    assert_eq!(loaded.snapshot.reactions.len(), 1);
    assert!(!loaded.loading.is_loading());
}

#[tokio::test]
async fn failed_fetches_contribute_empty_collections() {
    let server = MockServer::start().await;
    mount_connected(&server, ServiceKind::Github).await;
    Mock::given(method("GET"))
        .and(path("/github/webhook"))
        .respond_with(ResponseTemplate::new(502))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/reactions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .expect(1)
        .mount(&server)
        .await;

    let loaded = loader(&server).load().await;

    assert!(loaded.snapshot.hooks[&ServiceKind::Github].is_empty());
    assert!(loaded.snapshot.reactions.is_empty());
    assert!(loaded.snapshot.all_hooks().is_empty());
    assert!(!loaded.loading.is_loading());
}

#[tokio::test]
async fn refetch_only_touches_stale_collections() {
    let server = MockServer::start().await;
    mount_connected(&server, ServiceKind::Github).await;
    Mock::given(method("GET"))
        .and(path("/github/webhook"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([github_hook(1, "octo/hello")])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/reactions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([reaction(9, 1, 2, "Ping")])))
        .expect(2)
        .mount(&server)
        .await;

    let loader = loader(&server);
    let first = loader.load().await;
    let stale: BTreeSet<Collection> = [Collection::Reactions].into_iter().collect();
    let second = loader.refetch(&first, &stale).await;

    assert_eq!(second.snapshot, first.snapshot);
    assert_eq!(second.connections, first.connections);
}

#[tokio::test]
async fn fetch_covers_only_requested_collections() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/connection"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "connected": true })))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/github/webhook"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([github_hook(2, "octo/world")])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/reactions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let stale: BTreeSet<Collection> = [Collection::Hooks(ServiceKind::Github)].into_iter().collect();
    let known = BTreeMap::from([(ServiceKind::Github, true)]);
    let fetched = loader(&server).fetch(&stale, &known).await;

    assert_eq!(fetched.collections(), stale);
    assert!(fetched.connections.is_empty());
    assert!(fetched.reactions.is_none());

    let mut current = LoadedSnapshot::default();
    current.connections.insert(ServiceKind::Github, true);
    current
        .snapshot
        .reactions
        .push(serde_json::from_value(reaction(9, 1, 2, "Ping")).unwrap());
    fetched.apply_to(&mut current);
    assert_eq!(current.snapshot.hooks[&ServiceKind::Github][0].id, 2);
    assert_eq!(current.snapshot.reactions.len(), 1);
    assert!(current.is_connected(ServiceKind::Github));
}

#[tokio::test]
async fn about_lists_advertised_services() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/about.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "server": {
                "services": [
                    { "name": "gmail", "actions": [], "reactions": [{ "name": "send_email", "description": "Send" }] }
                ]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let about = loader(&server).about().await.unwrap();
    assert_eq!(about.services().len(), 1);
    assert_eq!(about.services()[0].name, "gmail");
}
