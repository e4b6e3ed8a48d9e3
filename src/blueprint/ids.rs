//! Graph identifier scheme.
//!
//! Fetched records map to deterministic node ids; nodes dropped onto the
//! canvas get ids from a session counter that starts above the persisted range.

use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use regex::Regex;

use crate::models::ServiceKind;

static REACTION_NODE_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^reaction_(\d+)$").expect("reaction node id pattern is valid")
});

/// Node id of a fetched hook. Every service except github carries its own
/// prefix, so ids never collide across services.
pub fn action_node_id(service: ServiceKind, hook_id: i64) -> String {
    match service {
        ServiceKind::Github => format!("action_{hook_id}"),
        ServiceKind::Microsoft => format!("action_ms_{hook_id}"),
        ServiceKind::Gmail => format!("action_gmail_{hook_id}"),
        ServiceKind::Jira => format!("action_jira_{hook_id}"),
        ServiceKind::Discord => format!("action_discord_{hook_id}"),
        ServiceKind::Twitch => format!("action_twitch_{hook_id}"),
    }
}

pub fn reaction_node_id(reaction_id: i64) -> String {
    format!("reaction_{reaction_id}")
}

/// Inverse of [`reaction_node_id`]. Minted ids yield `None`.
pub fn parse_reaction_node_id(node_id: &str) -> Option<i64> {
    REACTION_NODE_ID
        .captures(node_id)
        .and_then(|captures| captures.get(1))
        .and_then(|digits| digits.as_str().parse().ok())
}

pub fn edge_id(source: impl std::fmt::Display, target: impl std::fmt::Display) -> String {
    format!("edge_{source}_{target}")
}

/// Edge id for a locally synthesized connection; replaced on the next refetch.
pub fn connect_edge_id(source: impl std::fmt::Display, target: impl std::fmt::Display) -> String {
    format!("edge_{source}_{target}_{}", Utc::now().timestamp_millis())
}

/// Mints `node_<n>` ids for nodes that have no backing record yet.
#[derive(Debug)]
pub struct NodeIdGenerator {
    next: AtomicU64,
}

impl NodeIdGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            next: AtomicU64::new(seed),
        }
    }

    pub fn fresh(&self) -> String {
        format!("node_{}", self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for NodeIdGenerator {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn action_ids_are_injective_across_services() {
        let mut seen = HashSet::new();
        for service in ServiceKind::ALL {
            for hook_id in [1, 2, 10, 11] {
                assert!(seen.insert(action_node_id(service, hook_id)));
            }
        }
    }

    #[test]
    fn reaction_ids_round_trip() {
        assert_eq!(reaction_node_id(9), "reaction_9");
        assert_eq!(parse_reaction_node_id("reaction_9"), Some(9));
        assert_eq!(parse_reaction_node_id("node_1000"), None);
        assert_eq!(parse_reaction_node_id("reaction_"), None);
        assert_eq!(parse_reaction_node_id("xreaction_9"), None);
    }

    #[test]
    fn generator_is_monotonic() {
        let ids = NodeIdGenerator::default();
        assert_eq!(ids.fresh(), "node_1000");
        assert_eq!(ids.fresh(), "node_1001");
    }

    #[test]
    fn edge_ids() {
        assert_eq!(edge_id(1, 9), "edge_1_9");
        assert!(connect_edge_id(1, 9).starts_with("edge_1_9_"));
    }
}
