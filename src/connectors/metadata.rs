//! Service metadata types

use serde::{Deserialize, Serialize};

use crate::models::ServiceKind;

/// Static description of a registered service adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceMetadata {
    pub service: ServiceKind,
    pub display_name: String,
    /// Backend path listing this service's triggers.
    pub list_path: String,
    /// Config keys required before a trigger can be created.
    pub required_fields: Vec<String>,
}

impl ServiceMetadata {
    pub fn new(service: ServiceKind, list_path: &str, required_fields: &[&str]) -> Self {
        Self {
            service,
            display_name: service.display_name().to_string(),
            list_path: list_path.to_string(),
            required_fields: required_fields.iter().map(|field| field.to_string()).collect(),
        }
    }
}
