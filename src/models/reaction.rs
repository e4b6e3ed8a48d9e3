//! Reaction records and their request bodies.

use serde::{Deserialize, Serialize};

use super::ConfigMap;

/// A reaction linked to a hook row by `hook_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reaction {
    pub id: i64,
    pub hook_id: i64,
    pub reaction_type: i64,
    #[serde(default)]
    pub config: ConfigMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Reaction {
    /// Display name: the stored `config.name`, then the record's own name.
    pub fn display_name(&self) -> Option<&str> {
        self.config
            .get("name")
            .and_then(|value| value.as_str())
            .or(self.name.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReactionRequest {
    pub hook_id: i64,
    pub reaction_type: i64,
    pub config: ConfigMap,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateReactionRequest {
    pub id: i64,
    pub config: ConfigMap,
}
