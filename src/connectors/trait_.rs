//! Service adapter trait definition
//!
//! Defines the interface every per-service trigger integration implements.
//! The orchestrator only ever talks to services through this trait.

use async_trait::async_trait;

use crate::error::RemoteError;
use crate::models::{ConfigMap, Hook, ServiceKind, TriggerRef, config_text};

/// Remote lifecycle of one service's triggers (webhooks or subscriptions).
#[async_trait]
pub trait ServiceAdapter: Send + Sync {
    fn service(&self) -> ServiceKind;

    /// Config keys that must be present before a trigger can be created.
    fn required_fields(&self) -> &'static [&'static str];

    /// Required keys absent (or blank) in `config`. Numbers count as present.
    fn missing_fields(&self, config: &ConfigMap) -> Vec<&'static str> {
        self.required_fields()
            .iter()
            .copied()
            .filter(|field| config_text(config, field).is_none())
            .collect()
    }

    async fn list_triggers(&self) -> Result<Vec<Hook>, RemoteError>;

    /// Register a trigger on the backend and return the key it was stored under.
    async fn create_trigger(&self, config: &ConfigMap) -> Result<TriggerRef, RemoteError>;

    async fn delete_trigger(&self, trigger: &TriggerRef) -> Result<(), RemoteError>;

    /// Key to pass to [`ServiceAdapter::delete_trigger`] for a node's reference.
    ///
    /// `None` means there is nothing to delete remotely.
    fn resolve_delete_key(&self, trigger: &TriggerRef, _hooks: &[Hook]) -> Option<TriggerRef> {
        Some(trigger.clone())
    }

    /// Row id a new reaction must reference as its `hookId`.
    fn reaction_hook_id(&self, trigger: &TriggerRef, hooks: &[Hook]) -> Option<i64> {
        trigger
            .resolve_row(self.service(), hooks)
            .or_else(|| trigger.as_row())
            .or_else(|| match trigger {
                TriggerRef::External(external) => external.trim().parse().ok(),
                TriggerRef::Row(_) => None,
            })
    }
}
