//! Jira adapter
//!
//! Project-scoped issue webhooks.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::client::ApiClient;
use crate::connectors::{Registry, ServiceAdapter, ServiceMetadata};
use crate::error::RemoteError;
use crate::models::{
    ConfigMap, CreatedTrigger, Hook, ServiceKind, TriggerRef, config_str, config_str_list,
};

pub const JIRA_LIST_PATH: &str = "/jira/webhook";
const DEFAULT_EVENTS: &[&str] = &["jira:issue_created"];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateWebhookBody<'a> {
    project_key: &'a str,
    events: Vec<String>,
}

pub struct JiraAdapter {
    client: Arc<ApiClient>,
}

impl JiraAdapter {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ServiceAdapter for JiraAdapter {
    fn service(&self) -> ServiceKind {
        ServiceKind::Jira
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &["projectKey"]
    }

    async fn list_triggers(&self) -> Result<Vec<Hook>, RemoteError> {
        self.client.get_json(JIRA_LIST_PATH).await
    }

    async fn create_trigger(&self, config: &ConfigMap) -> Result<TriggerRef, RemoteError> {
        let project_key = config_str(config, "projectKey").ok_or_else(|| {
            RemoteError::MalformedResponse("projectKey is required".to_string())
        })?;

        let mut events = config_str_list(config, "events");
        if events.is_empty() {
            events = DEFAULT_EVENTS.iter().map(|event| event.to_string()).collect();
        }

        let body = CreateWebhookBody {
            project_key,
            events,
        };
        let created: CreatedTrigger = self.client.post_json("/jira/create-webhook", &body).await?;
        let trigger = created.into_trigger_ref().ok_or_else(|| {
            RemoteError::MalformedResponse("create-webhook response carried no id".to_string())
        })?;
        info!(hook = %trigger, project_key, "Jira webhook created");
        Ok(trigger)
    }

    async fn delete_trigger(&self, trigger: &TriggerRef) -> Result<(), RemoteError> {
        self.client
            .delete(&format!("/jira/webhook/{trigger}"), None)
            .await
    }
}

/// Register the Jira adapter with the registry
pub fn register_jira_adapter(registry: &mut Registry, adapter: Arc<JiraAdapter>) {
    let metadata = ServiceMetadata::new(ServiceKind::Jira, JIRA_LIST_PATH, adapter.required_fields());
    registry.register(adapter, metadata);
}
