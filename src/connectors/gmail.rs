//! Gmail adapter
//!
//! Pub/Sub watch subscriptions. `eventType` is numeric on this service.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use crate::client::ApiClient;
use crate::connectors::{Registry, ServiceAdapter, ServiceMetadata};
use crate::error::RemoteError;
use crate::models::{ConfigMap, CreatedTrigger, Hook, ServiceKind, TriggerRef};

pub const GMAIL_LIST_PATH: &str = "/gmail/webhook";
const DEFAULT_EVENT_TYPE: i64 = 1;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateSubscriptionBody<'a> {
    event_type: i64,
    topic_name: &'a str,
}

#[derive(Debug, Default, serde::Deserialize)]
struct CreatedSubscription {
    #[serde(flatten)]
    trigger: CreatedTrigger,
    #[serde(default)]
    valid: Option<bool>,
}

pub struct GmailAdapter {
    client: Arc<ApiClient>,
    topic_name: String,
}

impl GmailAdapter {
    pub fn new(client: Arc<ApiClient>, topic_name: String) -> Self {
        Self { client, topic_name }
    }

    /// Event type from config; zero, missing or unparseable falls back to 1.
    pub fn event_type(config: &ConfigMap) -> i64 {
        config
            .get("eventType")
            .and_then(|value| {
                value
                    .as_i64()
                    .or_else(|| value.as_str().and_then(|text| text.trim().parse().ok()))
            })
            .filter(|event_type| *event_type != 0)
            .unwrap_or(DEFAULT_EVENT_TYPE)
    }
}

#[async_trait]
impl ServiceAdapter for GmailAdapter {
    fn service(&self) -> ServiceKind {
        ServiceKind::Gmail
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &[]
    }

    async fn list_triggers(&self) -> Result<Vec<Hook>, RemoteError> {
        self.client.get_json(GMAIL_LIST_PATH).await
    }

    async fn create_trigger(&self, config: &ConfigMap) -> Result<TriggerRef, RemoteError> {
        let body = CreateSubscriptionBody {
            event_type: Self::event_type(config),
            topic_name: &self.topic_name,
        };

        let created: CreatedSubscription =
            self.client.post_json("/gmail/create-webhook", &body).await?;
        if created.valid == Some(false) {
            warn!(event_type = body.event_type, "Gmail watch reported as not valid");
        }
        let trigger = created.trigger.into_trigger_ref().ok_or_else(|| {
            RemoteError::MalformedResponse("subscription response carried no hook id".to_string())
        })?;
        info!(hook = %trigger, event_type = body.event_type, "Gmail subscription created");
        Ok(trigger)
    }

    async fn delete_trigger(&self, trigger: &TriggerRef) -> Result<(), RemoteError> {
        self.client
            .delete(&format!("/gmail/webhook/{trigger}"), None)
            .await
    }
}

/// Register the Gmail adapter with the registry
pub fn register_gmail_adapter(registry: &mut Registry, adapter: Arc<GmailAdapter>) {
    let metadata = ServiceMetadata::new(ServiceKind::Gmail, GMAIL_LIST_PATH, &[]);
    registry.register(adapter, metadata);
}
