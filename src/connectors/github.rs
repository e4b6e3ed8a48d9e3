//! GitHub adapter
//!
//! Repository webhooks created through the backend. The node config carries
//! the repository as `"owner/repo"` (or separate `owner` and `repo` keys).

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};

use crate::client::ApiClient;
use crate::connectors::{Registry, ServiceAdapter, ServiceMetadata};
use crate::error::RemoteError;
use crate::models::{
    ConfigMap, CreatedTrigger, Hook, ServiceKind, TriggerRef, config_str, config_str_list,
};

pub const GITHUB_LIST_PATH: &str = "/github/webhook";
const DEFAULT_EVENTS: &[&str] = &["push"];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateWebhookBody {
    owner: String,
    repo: String,
    webhook_url: String,
    events: Vec<String>,
}

pub struct GithubAdapter {
    client: Arc<ApiClient>,
    webhook_url: String,
}

impl GithubAdapter {
    pub fn new(client: Arc<ApiClient>, webhook_url: String) -> Self {
        Self {
            client,
            webhook_url,
        }
    }

    /// Split the configured repository into `(owner, repo)`.
    pub fn repository(config: &ConfigMap) -> Option<(String, String)> {
        let repo = config_str(config, "repo")?;
        match repo.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() => {
                Some((owner.to_string(), name.to_string()))
            }
            Some(_) => None,
            None => config_str(config, "owner").map(|owner| (owner.to_string(), repo.to_string())),
        }
    }
}

#[async_trait]
impl ServiceAdapter for GithubAdapter {
    fn service(&self) -> ServiceKind {
        ServiceKind::Github
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &["repo"]
    }

    fn missing_fields(&self, config: &ConfigMap) -> Vec<&'static str> {
        if config_str(config, "repo").is_none() {
            vec!["repo"]
        } else if Self::repository(config).is_none() {
            vec!["owner"]
        } else {
            Vec::new()
        }
    }

    async fn list_triggers(&self) -> Result<Vec<Hook>, RemoteError> {
        self.client.get_json(GITHUB_LIST_PATH).await
    }

    async fn create_trigger(&self, config: &ConfigMap) -> Result<TriggerRef, RemoteError> {
        let (owner, repo) = Self::repository(config).ok_or_else(|| {
            RemoteError::MalformedResponse("repository must be given as owner/repo".to_string())
        })?;

        let mut events = config_str_list(config, "events");
        if events.is_empty() {
            events = DEFAULT_EVENTS.iter().map(|event| event.to_string()).collect();
        }

        let body = CreateWebhookBody {
            owner,
            repo,
            webhook_url: config_str(config, "webhookUrl")
                .map(str::to_string)
                .unwrap_or_else(|| self.webhook_url.clone()),
            events,
        };
        debug!(owner = %body.owner, repo = %body.repo, "Creating GitHub webhook");

        let created: CreatedTrigger = self.client.post_json("/github/create-webhook", &body).await?;
        let trigger = created.into_trigger_ref().ok_or_else(|| {
            RemoteError::MalformedResponse("create-webhook response carried no hook id".to_string())
        })?;
        info!(hook = %trigger, "GitHub webhook created");
        Ok(trigger)
    }

    async fn delete_trigger(&self, trigger: &TriggerRef) -> Result<(), RemoteError> {
        let body = json!({ "id": trigger });
        self.client
            .delete(&format!("/github/webhook/{trigger}"), Some(&body))
            .await
    }

    /// Nodes created in this session may only carry the provider's hook id;
    /// the backend deletes by row id, so look the row up first.
    fn resolve_delete_key(&self, trigger: &TriggerRef, hooks: &[Hook]) -> Option<TriggerRef> {
        if let Some(row) = trigger.resolve_row(ServiceKind::Github, hooks) {
            return Some(TriggerRef::Row(row));
        }
        match trigger {
            TriggerRef::Row(id) if *id != 0 => Some(TriggerRef::Row(*id)),
            TriggerRef::External(external) => external
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|id| *id != 0)
                .map(TriggerRef::Row),
            _ => None,
        }
    }
}

/// Register the GitHub adapter with the registry
pub fn register_github_adapter(registry: &mut Registry, adapter: Arc<GithubAdapter>) {
    let metadata = ServiceMetadata::new(ServiceKind::Github, GITHUB_LIST_PATH, &["repo", "owner"]);
    registry.register(adapter, metadata);
}
