//! Microsoft Graph adapter
//!
//! Mail subscriptions. The backend answers a create with the Graph
//! subscription id rather than its own row id.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::client::ApiClient;
use crate::connectors::{Registry, ServiceAdapter, ServiceMetadata};
use crate::error::RemoteError;
use crate::models::{ConfigMap, CreatedTrigger, Hook, ServiceKind, TriggerRef, config_str};

pub const MICROSOFT_LIST_PATH: &str = "/microsoft/webhook";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateSubscriptionBody<'a> {
    resource: &'a str,
    change_type: &'a str,
}

pub struct MicrosoftAdapter {
    client: Arc<ApiClient>,
    default_resource: String,
    default_change_type: String,
}

impl MicrosoftAdapter {
    pub fn new(client: Arc<ApiClient>, default_resource: String, default_change_type: String) -> Self {
        Self {
            client,
            default_resource,
            default_change_type,
        }
    }
}

#[async_trait]
impl ServiceAdapter for MicrosoftAdapter {
    fn service(&self) -> ServiceKind {
        ServiceKind::Microsoft
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &[]
    }

    async fn list_triggers(&self) -> Result<Vec<Hook>, RemoteError> {
        self.client.get_json(MICROSOFT_LIST_PATH).await
    }

    async fn create_trigger(&self, config: &ConfigMap) -> Result<TriggerRef, RemoteError> {
        let body = CreateSubscriptionBody {
            resource: config_str(config, "resource").unwrap_or(&self.default_resource),
            change_type: config_str(config, "changeType").unwrap_or(&self.default_change_type),
        };

        let created: CreatedTrigger = self
            .client
            .post_json("/microsoft/create-webhook", &body)
            .await?;
        let trigger = created.into_trigger_ref().ok_or_else(|| {
            RemoteError::MalformedResponse("subscription response carried no id".to_string())
        })?;
        info!(subscription = %trigger, resource = body.resource, "Microsoft subscription created");
        Ok(trigger)
    }

    async fn delete_trigger(&self, trigger: &TriggerRef) -> Result<(), RemoteError> {
        let id = trigger.to_string();
        self.client
            .delete(&format!("/microsoft/webhook/{id}"), Some(&json!({ "id": id })))
            .await
    }
}

/// Register the Microsoft adapter with the registry
pub fn register_microsoft_adapter(registry: &mut Registry, adapter: Arc<MicrosoftAdapter>) {
    let metadata = ServiceMetadata::new(ServiceKind::Microsoft, MICROSOFT_LIST_PATH, &[]);
    registry.register(adapter, metadata);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use url::Url;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter_for(server: &MockServer) -> MicrosoftAdapter {
        let client = ApiClient::new(Url::parse(&server.uri()).unwrap(), None, Duration::from_secs(5))
            .unwrap();
        MicrosoftAdapter::new(Arc::new(client), "me/messages".to_string(), "created".to_string())
    }

    #[tokio::test]
    async fn test_create_uses_defaults_and_returns_external_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/microsoft/create-webhook"))
            .and(body_json(json!({ "resource": "me/messages", "changeType": "created" })))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({ "id": "6f1c-graph-sub", "resource": "me/messages" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let trigger = adapter_for(&server)
            .create_trigger(&ConfigMap::new())
            .await
            .unwrap();
        assert_eq!(trigger, TriggerRef::External("6f1c-graph-sub".to_string()));
    }

    #[tokio::test]
    async fn test_delete_passes_id_in_path_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/microsoft/webhook/6f1c-graph-sub"))
            .and(body_json(json!({ "id": "6f1c-graph-sub" })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        adapter_for(&server)
            .delete_trigger(&TriggerRef::External("6f1c-graph-sub".to_string()))
            .await
            .unwrap();
    }
}
