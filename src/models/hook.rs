//! Webhook / subscription records backing action nodes.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ConfigMap, ServiceKind};

/// Secondary discriminator of a hook: numeric for gmail, a name elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventType {
    Number(i64),
    Name(String),
}

impl EventType {
    /// Numeric value, coercing numeric strings. Unparseable names yield `None`.
    pub fn as_number(&self) -> Option<i64> {
        match self {
            EventType::Number(value) => Some(*value),
            EventType::Name(name) => name.trim().parse().ok(),
        }
    }
}

/// One registered trigger as returned by a service's list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawHook", rename_all = "camelCase")]
pub struct Hook {
    /// Row id, unique per service only.
    pub id: i64,
    pub service: ServiceKind,
    pub config: ConfigMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<EventType>,
    /// External identifier when the provider's key differs from the row id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_id: Option<String>,
}

impl Hook {
    pub fn new(id: i64, service: ServiceKind) -> Self {
        Self {
            id,
            service,
            config: ConfigMap::new(),
            event_type: None,
            webhook_id: None,
        }
    }

    pub fn with_config(mut self, config: ConfigMap) -> Self {
        self.config = config;
        self
    }

    pub fn with_event_type(mut self, event_type: EventType) -> Self {
        self.event_type = Some(event_type);
        self
    }

    pub fn with_webhook_id<S: Into<String>>(mut self, webhook_id: S) -> Self {
        self.webhook_id = Some(webhook_id.into());
        self
    }
}

/// Wire shape; some list endpoints carry the config as `additionalInfos`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawHook {
    id: i64,
    service: ServiceKind,
    #[serde(default)]
    config: Option<ConfigMap>,
    #[serde(default)]
    additional_infos: Option<ConfigMap>,
    #[serde(default)]
    event_type: Option<EventType>,
    #[serde(default)]
    webhook_id: Option<Value>,
}

impl From<RawHook> for Hook {
    fn from(raw: RawHook) -> Self {
        let webhook_id = match raw.webhook_id {
            Some(Value::String(text)) if !text.is_empty() => Some(text),
            Some(Value::Number(number)) => Some(number.to_string()),
            _ => None,
        };
        Hook {
            id: raw.id,
            service: raw.service,
            config: raw.config.or(raw.additional_infos).unwrap_or_default(),
            event_type: raw.event_type,
            webhook_id,
        }
    }
}

/// Remote identifier attached to a durable action node.
///
/// Most services hand back their row id; microsoft returns the provider's
/// subscription id instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TriggerRef {
    Row(i64),
    External(String),
}

impl TriggerRef {
    pub fn as_row(&self) -> Option<i64> {
        match self {
            TriggerRef::Row(id) => Some(*id),
            TriggerRef::External(_) => None,
        }
    }

    /// Find the row this reference points at among `hooks` of `service`.
    ///
    /// Row refs match on `id`; external refs match on `webhook_id`, and a
    /// numeric external ref also matches a row id.
    pub fn resolve_row(&self, service: ServiceKind, hooks: &[Hook]) -> Option<i64> {
        let candidates = hooks.iter().filter(|hook| hook.service == service);
        match self {
            TriggerRef::Row(id) => candidates
                .into_iter()
                .find(|hook| hook.id == *id)
                .map(|hook| hook.id),
            TriggerRef::External(external) => {
                let numeric = external.trim().parse::<i64>().ok();
                candidates
                    .into_iter()
                    .find(|hook| {
                        hook.webhook_id.as_deref() == Some(external.as_str())
                            || numeric == Some(hook.id)
                    })
                    .map(|hook| hook.id)
            }
        }
    }
}

impl fmt::Display for TriggerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerRef::Row(id) => write!(f, "{id}"),
            TriggerRef::External(id) => f.write_str(id),
        }
    }
}

/// Response of a create-webhook / subscribe call.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedTrigger {
    #[serde(default)]
    pub hook_id: Option<Value>,
    #[serde(default)]
    pub id: Option<Value>,
}

impl CreatedTrigger {
    /// `hookId` wins over `id`; numbers become row refs, strings external refs.
    pub fn into_trigger_ref(self) -> Option<TriggerRef> {
        [self.hook_id, self.id]
            .into_iter()
            .flatten()
            .find_map(|value| match value {
                Value::Number(number) => number.as_i64().map(TriggerRef::Row),
                Value::String(text) if !text.is_empty() => Some(TriggerRef::External(text)),
                _ => None,
            })
    }
}
