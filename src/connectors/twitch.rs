//! Twitch adapter
//!
//! EventSub subscriptions scoped to a broadcaster.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::client::ApiClient;
use crate::connectors::{Registry, ServiceAdapter, ServiceMetadata};
use crate::error::RemoteError;
use crate::models::{
    ConfigMap, CreatedTrigger, Hook, ServiceKind, TriggerRef, config_str, config_str_list,
    config_text,
};

pub const TWITCH_LIST_PATH: &str = "/twitch/webhooks/user";
pub const DEFAULT_TWITCH_EVENT: &str = "stream.online";

#[derive(Debug, Serialize)]
struct Condition {
    broadcaster_user_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubscribeBody {
    event_type: String,
    condition: Condition,
}

pub struct TwitchAdapter {
    client: Arc<ApiClient>,
}

impl TwitchAdapter {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// `eventType`, else the first of `events`, else `stream.online`.
    pub fn event_type(config: &ConfigMap) -> String {
        config_str(config, "eventType")
            .map(str::to_string)
            .or_else(|| config_str_list(config, "events").into_iter().next())
            .unwrap_or_else(|| DEFAULT_TWITCH_EVENT.to_string())
    }
}

#[async_trait]
impl ServiceAdapter for TwitchAdapter {
    fn service(&self) -> ServiceKind {
        ServiceKind::Twitch
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &["broadcasterUserId"]
    }

    async fn list_triggers(&self) -> Result<Vec<Hook>, RemoteError> {
        self.client.get_json(TWITCH_LIST_PATH).await
    }

    async fn create_trigger(&self, config: &ConfigMap) -> Result<TriggerRef, RemoteError> {
        let broadcaster_user_id = config_text(config, "broadcasterUserId").ok_or_else(|| {
            RemoteError::MalformedResponse("broadcasterUserId is required".to_string())
        })?;

        let body = SubscribeBody {
            event_type: Self::event_type(config),
            condition: Condition {
                broadcaster_user_id,
            },
        };
        let created: CreatedTrigger = self.client.post_json("/twitch/webhooks/subscribe", &body).await?;
        let trigger = created.into_trigger_ref().ok_or_else(|| {
            RemoteError::MalformedResponse("subscribe response carried no id".to_string())
        })?;
        info!(hook = %trigger, event_type = %body.event_type, "Twitch subscription created");
        Ok(trigger)
    }

    async fn delete_trigger(&self, trigger: &TriggerRef) -> Result<(), RemoteError> {
        self.client
            .delete(&format!("/twitch/webhooks/{trigger}"), None)
            .await
    }
}

/// Register the Twitch adapter with the registry
pub fn register_twitch_adapter(registry: &mut Registry, adapter: Arc<TwitchAdapter>) {
    let metadata = ServiceMetadata::new(ServiceKind::Twitch, TWITCH_LIST_PATH, adapter.required_fields());
    registry.register(adapter, metadata);
}
