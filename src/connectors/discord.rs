//! Discord adapter
//!
//! Channel webhooks watched by the backend's bot.

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

pub const DISCORD_LIST_PATH: &str = "/discord/webhook";
const DEFAULT_EVENT: &str = "new_message_in_channel";
const DEFAULT_NAME: &str = "AREA";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateWebhookBody<'a> {
    guild_id: String,
    channel_id: String,
    name: &'a str,
    events: Vec<String>,
}

pub struct DiscordAdapter {
    client: Arc<ApiClient>,
}

impl DiscordAdapter {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ServiceAdapter for DiscordAdapter {
    fn service(&self) -> ServiceKind {
        ServiceKind::Discord
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &["guildId", "channelId"]
    }

    async fn list_triggers(&self) -> Result<Vec<Hook>, RemoteError> {
        self.client.get_json(DISCORD_LIST_PATH).await
    }

    async fn create_trigger(&self, config: &ConfigMap) -> Result<TriggerRef, RemoteError> {
        let (Some(guild_id), Some(channel_id)) =
            (config_text(config, "guildId"), config_text(config, "channelId"))
        else {
            return Err(RemoteError::MalformedResponse(
                "guildId and channelId are required".to_string(),
            ));
        };

        let mut events = config_str_list(config, "events");
        if events.is_empty() {
            events.push(DEFAULT_EVENT.to_string());
        }

        let body = CreateWebhookBody {
            guild_id,
            channel_id,
            name: config_str(config, "name").unwrap_or(DEFAULT_NAME),
            events,
        };
        let created: CreatedTrigger = self.client.post_json("/discord/create-webhook", &body).await?;
        let trigger = created.into_trigger_ref().ok_or_else(|| {
            RemoteError::MalformedResponse("create-webhook response carried no hook id".to_string())
        })?;
        info!(hook = %trigger, guild_id = %body.guild_id, channel_id = %body.channel_id, "Discord webhook created");
        Ok(trigger)
    }

    async fn delete_trigger(&self, trigger: &TriggerRef) -> Result<(), RemoteError> {
        self.client
            .delete(&format!("/discord/webhooks/{trigger}"), None)
            .await
    }
}

/// Register the Discord adapter with the registry
pub fn register_discord_adapter(registry: &mut Registry, adapter: Arc<DiscordAdapter>) {
    let metadata = ServiceMetadata::new(
        ServiceKind::Discord,
        DISCORD_LIST_PATH,
        adapter.required_fields(),
    );
    registry.register(adapter, metadata);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use url::Url;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter_for(server: &MockServer) -> DiscordAdapter {
        let client = ApiClient::new(Url::parse(&server.uri()).unwrap(), None, Duration::from_secs(5))
            .unwrap();
        DiscordAdapter::new(Arc::new(client))
    }

    #[tokio::test]
    async fn test_missing_guild_and_channel() {
        let server = MockServer::start().await;
        let config = json!({ "guildId": "g1" }).as_object().cloned().unwrap();
        assert_eq!(adapter_for(&server).missing_fields(&config), vec!["channelId"]);
    }

    #[tokio::test]
    async fn test_create_webhook() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/discord/create-webhook"))
            .and(body_json(json!({
                "guildId": "g1",
                "channelId": "c1",
                "name": "AREA",
                "events": ["reaction_added"]
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "hookId": 3 })))
            .expect(1)
            .mount(&server)
            .await;

        let config = json!({ "guildId": "g1", "channelId": "c1", "events": ["reaction_added"] })
            .as_object()
            .cloned()
            .unwrap();
        let trigger = adapter_for(&server).create_trigger(&config).await.unwrap();
        assert_eq!(trigger, TriggerRef::Row(3));
    }

    #[tokio::test]
    async fn test_delete_uses_plural_path() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/discord/webhooks/3"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        adapter_for(&server)
            .delete_trigger(&TriggerRef::Row(3))
            .await
            .unwrap();
    }
}
