//! Service registry
//!
//! In-memory registry mapping each [`ServiceKind`] to its adapter and
//! metadata. Built explicitly at composition time and passed to its users.

use std::collections::HashMap;
use std::sync::Arc;

use crate::client::ApiClient;
use crate::config::AppConfig;
use crate::connectors::{
    DiscordAdapter, GithubAdapter, GmailAdapter, JiraAdapter, MicrosoftAdapter, ServiceAdapter,
    ServiceMetadata, TwitchAdapter,
};
use crate::models::ServiceKind;

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Service '{name}' is not registered")]
    ServiceNotRegistered { name: String },
}

/// Registry that stores service adapters and their metadata
#[derive(Clone, Default)]
pub struct Registry {
    adapters: HashMap<ServiceKind, Arc<dyn ServiceAdapter>>,
    metadata: HashMap<ServiceKind, ServiceMetadata>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with an adapter for every supported service.
    pub fn with_defaults(client: Arc<ApiClient>, config: &AppConfig) -> Self {
        let mut registry = Self::new();

        crate::connectors::register_github_adapter(
            &mut registry,
            Arc::new(GithubAdapter::new(
                client.clone(),
                config.github_webhook_url.clone(),
            )),
        );
        crate::connectors::register_microsoft_adapter(
            &mut registry,
            Arc::new(MicrosoftAdapter::new(
                client.clone(),
                config.microsoft_resource.clone(),
                config.microsoft_change_type.clone(),
            )),
        );
        crate::connectors::register_gmail_adapter(
            &mut registry,
            Arc::new(GmailAdapter::new(client.clone(), config.gmail_topic_name.clone())),
        );
        crate::connectors::register_discord_adapter(
            &mut registry,
            Arc::new(DiscordAdapter::new(client.clone())),
        );
        crate::connectors::register_jira_adapter(
            &mut registry,
            Arc::new(JiraAdapter::new(client.clone())),
        );
        crate::connectors::register_twitch_adapter(&mut registry, Arc::new(TwitchAdapter::new(client)));

        registry
    }

    /// Register an adapter with its metadata, replacing any previous one.
    pub fn register(&mut self, adapter: Arc<dyn ServiceAdapter>, metadata: ServiceMetadata) {
        let service = adapter.service();
        self.adapters.insert(service, adapter);
        self.metadata.insert(service, metadata);
    }

    pub fn get(&self, service: ServiceKind) -> Result<Arc<dyn ServiceAdapter>, RegistryError> {
        self.adapters
            .get(&service)
            .cloned()
            .ok_or_else(|| RegistryError::ServiceNotRegistered {
                name: service.to_string(),
            })
    }

    pub fn get_metadata(&self, service: ServiceKind) -> Result<&ServiceMetadata, RegistryError> {
        self.metadata
            .get(&service)
            .ok_or_else(|| RegistryError::ServiceNotRegistered {
                name: service.to_string(),
            })
    }

    /// Registered services in fetch order.
    pub fn services(&self) -> Vec<ServiceKind> {
        let mut services: Vec<_> = self.adapters.keys().copied().collect();
        services.sort();
        services
    }

    /// Metadata for all services, in fetch order.
    pub fn list_metadata(&self) -> Vec<ServiceMetadata> {
        let mut metadata: Vec<_> = self.metadata.values().cloned().collect();
        metadata.sort_by_key(|entry| entry.service);
        metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use url::Url;

    fn client() -> Arc<ApiClient> {
        Arc::new(
            ApiClient::new(
                Url::parse("http://localhost:8080").unwrap(),
                None,
                Duration::from_secs(1),
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_registry_unknown_service() {
        let registry = Registry::new();

        let result = registry.get(ServiceKind::Github);
        match result {
            Err(RegistryError::ServiceNotRegistered { name }) => assert_eq!(name, "github"),
            _ => panic!("Expected ServiceNotRegistered error"),
        }
        assert!(registry.get_metadata(ServiceKind::Jira).is_err());
    }

    #[test]
    fn test_registry_defaults_cover_every_service() {
        let registry = Registry::with_defaults(client(), &AppConfig::default());

        assert_eq!(registry.services(), ServiceKind::ALL.to_vec());
        for service in ServiceKind::ALL {
            let adapter = registry.get(service).unwrap();
            assert_eq!(adapter.service(), service);
        }
    }

    #[test]
    fn test_registry_list_ordering() {
        let mut registry = Registry::new();
        crate::connectors::register_twitch_adapter(&mut registry, Arc::new(TwitchAdapter::new(client())));
        crate::connectors::register_github_adapter(
            &mut registry,
            Arc::new(GithubAdapter::new(client(), String::new())),
        );

        let metadata = registry.list_metadata();
        assert_eq!(metadata.len(), 2);
        assert_eq!(metadata[0].service, ServiceKind::Github);
        assert_eq!(metadata[1].service, ServiceKind::Twitch);
        assert_eq!(metadata[1].required_fields, vec!["broadcasterUserId".to_string()]);
    }
}
