//! # Data Models
//!
//! Wire records exchanged with the AREA backend: hooks (webhook or
//! subscription rows), reactions, and the small status/about responses.

use serde::{Deserialize, Serialize};

pub mod hook;
pub mod reaction;
pub mod service;

pub use hook::{CreatedTrigger, EventType, Hook, TriggerRef};
pub use reaction::{CreateReactionRequest, Reaction, UpdateReactionRequest};
pub use service::{AboutResponse, AboutServer, AboutService, ServiceCapability, ServiceKind};

/// Open, service-specific configuration map.
pub type ConfigMap = serde_json::Map<String, serde_json::Value>;

/// Response of the per-provider connection status query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    #[serde(default)]
    pub connected: bool,
}

/// Read a non-empty string field from a config map.
pub fn config_str<'a>(config: &'a ConfigMap, key: &str) -> Option<&'a str> {
    config
        .get(key)
        .and_then(|value| value.as_str())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Read a string or numeric field as text. Blank strings count as absent.
pub fn config_text(config: &ConfigMap, key: &str) -> Option<String> {
    match config.get(key)? {
        serde_json::Value::Number(value) => Some(value.to_string()),
        value => value
            .as_str()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string),
    }
}

/// Read a list of strings from a config map; non-string entries are skipped.
pub fn config_str_list(config: &ConfigMap, key: &str) -> Vec<String> {
    config
        .get(key)
        .and_then(|value| value.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
