//! Static reaction-type table.

use tracing::warn;

use crate::models::ServiceKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReactionType {
    pub service: ServiceKind,
    pub name: &'static str,
    pub id: i64,
}

pub const REACTION_TYPES: &[ReactionType] = &[
    ReactionType { service: ServiceKind::Microsoft, name: "send_email", id: 1 },
    ReactionType { service: ServiceKind::Discord, name: "send_message", id: 2 },
    ReactionType { service: ServiceKind::Discord, name: "create_private_channel", id: 3 },
    ReactionType { service: ServiceKind::Discord, name: "add_role_to_user", id: 4 },
    ReactionType { service: ServiceKind::Gmail, name: "send_email", id: 5 },
    ReactionType { service: ServiceKind::Jira, name: "create_issue", id: 6 },
    ReactionType { service: ServiceKind::Jira, name: "add_comment", id: 7 },
    ReactionType { service: ServiceKind::Jira, name: "update_status", id: 8 },
];

/// Linear scan for the entry with numeric id `reaction_type`.
pub fn lookup(reaction_type: i64) -> Option<&'static ReactionType> {
    REACTION_TYPES.iter().find(|entry| entry.id == reaction_type)
}

/// Numeric id of a service's named reaction; unknown pairs map to 0.
pub fn reaction_type_id(service: &str, name: &str) -> i64 {
    REACTION_TYPES
        .iter()
        .find(|entry| entry.service.as_str() == service && entry.name == name)
        .map(|entry| entry.id)
        .unwrap_or_else(|| {
            warn!(service, reaction = name, "Unknown reaction type, defaulting to 0");
            0
        })
}
