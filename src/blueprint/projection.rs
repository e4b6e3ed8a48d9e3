//! Graph projection.
//!
//! Derives the visual graph from one fetch batch of hooks and reactions.
//! [`project`] is pure; [`ProjectionCache`] skips recomputation when the
//! snapshot is value-equal to the previous one.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde_json::Value;
use tracing::warn;

use crate::blueprint::catalog;
use crate::blueprint::ids::{action_node_id, edge_id, reaction_node_id};
use crate::blueprint::node::{
    ActionNodeData, Graph, GraphEdge, GraphNode, NodeData, Position, ReactionNodeData,
};
use crate::connectors::twitch::DEFAULT_TWITCH_EVENT;
use crate::models::{ConfigMap, Hook, Reaction, ServiceKind, TriggerRef, config_text};

const ACTION_COLUMN_X: f64 = 100.0;
const REACTION_COLUMN_X: f64 = 500.0;
const ROW_ORIGIN_Y: f64 = 100.0;
const ROW_SPACING: f64 = 150.0;

/// One fetch batch: hooks per service plus all reactions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub hooks: BTreeMap<ServiceKind, Vec<Hook>>,
    pub reactions: Vec<Reaction>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hooks(mut self, service: ServiceKind, hooks: Vec<Hook>) -> Self {
        self.hooks.insert(service, hooks);
        self
    }

    pub fn with_reactions(mut self, reactions: Vec<Reaction>) -> Self {
        self.reactions = reactions;
        self
    }

    /// All hooks concatenated in fetch order.
    pub fn all_hooks(&self) -> Vec<Hook> {
        self.hooks.values().flatten().cloned().collect()
    }
}

/// Build `{nodes, edges}` from a snapshot.
pub fn project(snapshot: &Snapshot) -> Graph {
    let hooks: Vec<&Hook> = snapshot.hooks.values().flatten().collect();
    if hooks.is_empty() && snapshot.reactions.is_empty() {
        return Graph::default();
    }

    // Reactions reference hooks by row id only; first hook in fetch order wins.
    let mut hook_by_id: HashMap<i64, &Hook> = HashMap::with_capacity(hooks.len());
    for hook in &hooks {
        if let Some(existing) = hook_by_id.get(&hook.id) {
            if existing.service != hook.service {
                warn!(
                    hook_id = hook.id,
                    kept = %existing.service,
                    ignored = %hook.service,
                    "Hook id shared across services; reactions resolve to the first"
                );
            }
            continue;
        }
        hook_by_id.insert(hook.id, *hook);
    }

    let mut nodes = Vec::with_capacity(hooks.len() + snapshot.reactions.len());
    let mut action_ids = HashSet::with_capacity(hooks.len());

    for (row, hook) in hooks.iter().enumerate() {
        let id = action_node_id(hook.service, hook.id);
        action_ids.insert(id.clone());
        nodes.push(GraphNode::new(
            id,
            Position::new(ACTION_COLUMN_X, ROW_ORIGIN_Y + ROW_SPACING * row as f64),
            NodeData::Action(action_data(hook)),
        ));
    }

    let mut edges = Vec::new();
    for (index, reaction) in snapshot.reactions.iter().enumerate() {
        let target = reaction_node_id(reaction.id);
        nodes.push(GraphNode::new(
            target.clone(),
            Position::new(REACTION_COLUMN_X, ROW_ORIGIN_Y + ROW_SPACING * index as f64),
            NodeData::Reaction(reaction_data(reaction)),
        ));

        let Some(hook) = hook_by_id.get(&reaction.hook_id) else {
            continue;
        };
        let source = action_node_id(hook.service, hook.id);
        if action_ids.contains(&source) {
            edges.push(GraphEdge::new(
                edge_id(reaction.hook_id, reaction.id),
                source,
                target,
            ));
        }
    }

    Graph { nodes, edges }
}

fn action_data(hook: &Hook) -> ActionNodeData {
    let config = &hook.config;
    let mut data = ActionNodeData {
        label: String::new(),
        service: hook.service,
        event_type: String::new(),
        webhook_id: Some(TriggerRef::Row(hook.id)),
        config: config.clone(),
        is_configured: true,
    };

    match hook.service {
        ServiceKind::Github => {
            let repo = config_text(config, "repo").unwrap_or_default();
            let owner = config_text(config, "owner");
            data.label = if repo.is_empty() {
                format!("GitHub Webhook #{}", hook.id)
            } else {
                match owner {
                    Some(owner) => format!("GitHub: {owner}/{repo}"),
                    None => format!("GitHub: {repo}"),
                }
            };
            data.event_type = first_event(config).unwrap_or_else(|| "push".to_string());
            data.is_configured = !repo.is_empty();
        }
        ServiceKind::Microsoft => {
            let resource = config_text(config, "resource").unwrap_or_else(|| "Email".to_string());
            data.label = format!("Microsoft: {resource}");
            data.event_type = "email_received".to_string();
        }
        ServiceKind::Gmail => {
            let event_type = hook.event_type.as_ref().and_then(|event| event.as_number());
            let event_label = match event_type {
                Some(2) => "Any Email",
                Some(3) => "Email Deleted",
                Some(value) if value != 0 => "Inbox Email",
                _ => "New Email",
            };
            data.label = format!("Gmail: {event_label}");
            data.event_type = "email_received".to_string();
            if data.config.is_empty()
                && let Some(event_type) = &hook.event_type
            {
                data.config.insert(
                    "eventType".to_string(),
                    serde_json::to_value(event_type).unwrap_or(Value::Null),
                );
            }
        }
        ServiceKind::Discord => {
            let event = first_event(config).unwrap_or_else(|| "new_message_in_channel".to_string());
            let channel = config_text(config, "channelName");
            data.label = match event.as_str() {
                "reaction_added" => format!(
                    "Discord: Reaction in {}",
                    channel.as_deref().unwrap_or("Channel")
                ),
                "new_message_in_channel" => format!(
                    "Discord: Message in {}",
                    channel.as_deref().unwrap_or("Channel")
                ),
                _ => format!(
                    "Discord: {}",
                    channel
                        .or_else(|| config_text(config, "guildName"))
                        .unwrap_or_else(|| "Unknown".to_string())
                ),
            };
            data.event_type = event;
        }
        ServiceKind::Jira => {
            data.label = match config_text(config, "projectKey") {
                Some(key) => format!("Jira: {key}"),
                None => "Jira Webhook".to_string(),
            };
            data.event_type = "issue_created".to_string();
        }
        ServiceKind::Twitch => {
            let event = first_event(config).unwrap_or_else(|| DEFAULT_TWITCH_EVENT.to_string());
            let broadcaster = config_text(config, "broadcasterName")
                .or_else(|| config_text(config, "broadcasterUserId"))
                .unwrap_or_else(|| "Channel".to_string());
            data.label = format!("Twitch: {} ({broadcaster})", event.replace('.', " "));
            data.event_type = event;
        }
    }

    data
}

fn reaction_data(reaction: &Reaction) -> ReactionNodeData {
    let entry = catalog::lookup(reaction.reaction_type);
    let display_name = reaction.display_name().map(str::to_string);

    ReactionNodeData {
        label: display_name.clone().unwrap_or_default(),
        reaction_type: reaction.reaction_type,
        reaction_name: entry.map(|entry| entry.name.to_string()).or(display_name),
        service_name: entry.map(|entry| entry.service.to_string()),
        reaction_id: Some(reaction.id),
        config: reaction.config.clone(),
        is_configured: true,
    }
}

fn first_event(config: &ConfigMap) -> Option<String> {
    config
        .get("events")?
        .as_array()?
        .first()?
        .as_str()
        .filter(|event| !event.is_empty())
        .map(str::to_string)
}

/// Change-detection gate in front of [`project`].
#[derive(Debug, Default)]
pub struct ProjectionCache {
    last: Option<(Snapshot, Graph)>,
}

impl ProjectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute only when `snapshot` differs from the last one seen.
    /// Returns the current graph and whether it was recomputed.
    pub fn update(&mut self, snapshot: &Snapshot) -> (&Graph, bool) {
        let stale = self
            .last
            .as_ref()
            .is_none_or(|(previous, _)| previous != snapshot);
        if stale {
            self.last = None;
        }
        let (_, graph) = self
            .last
            .get_or_insert_with(|| (snapshot.clone(), project(snapshot)));
        (&*graph, stale)
    }

    pub fn graph(&self) -> Option<&Graph> {
        self.last.as_ref().map(|(_, graph)| graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EventType;
    use serde_json::json;

    fn config(value: Value) -> ConfigMap {
        value.as_object().cloned().unwrap_or_default()
    }

    fn reaction(id: i64, hook_id: i64, reaction_type: i64, cfg: Value) -> Reaction {
        Reaction {
            id,
            hook_id,
            reaction_type,
            config: config(cfg),
            name: None,
        }
    }

    fn scenario() -> Snapshot {
        Snapshot::new()
            .with_hooks(
                ServiceKind::Github,
                vec![Hook::new(1, ServiceKind::Github).with_config(config(json!({
                    "repo": "r",
                    "owner": "o",
                    "events": ["push"]
                })))],
            )
            .with_reactions(vec![reaction(9, 1, 2, json!({ "channelId": "c" }))])
    }

    #[test]
    fn empty_snapshot_projects_to_empty_graph() {
        let graph = project(&Snapshot::new());
        assert!(graph.nodes.is_empty());
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn github_hook_and_reaction_are_connected() {
        let graph = project(&scenario());

        assert_eq!(graph.nodes.len(), 2);
        let action = graph.node("action_1").unwrap();
        let data = action.as_action().unwrap();
        assert_eq!(data.label, "GitHub: o/r");
        assert_eq!(data.event_type, "push");
        assert_eq!(data.webhook_id, Some(TriggerRef::Row(1)));
        assert!(data.is_configured);
        assert_eq!(action.position, Position::new(100.0, 100.0));

        let reaction = graph.node("reaction_9").unwrap().as_reaction().unwrap();
        assert_eq!(reaction.reaction_name.as_deref(), Some("send_message"));
        assert_eq!(reaction.service_name.as_deref(), Some("discord"));
        assert_eq!(reaction.reaction_id, Some(9));

        assert_eq!(graph.edges, vec![GraphEdge::new("edge_1_9", "action_1", "reaction_9")]);
    }

    #[test]
    fn projection_is_idempotent() {
        let snapshot = scenario();
        assert_eq!(project(&snapshot), project(&snapshot));
    }

    #[test]
    fn reaction_without_hook_has_no_edge() {
        let snapshot = scenario().with_reactions(vec![reaction(4, 77, 5, json!({}))]);
        let graph = project(&snapshot);
        assert!(graph.node("reaction_4").is_some());
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn no_orphan_edges() {
        let snapshot = Snapshot::new()
            .with_hooks(
                ServiceKind::Gmail,
                vec![Hook::new(2, ServiceKind::Gmail).with_event_type(EventType::Number(3))],
            )
            .with_hooks(ServiceKind::Jira, vec![Hook::new(5, ServiceKind::Jira)])
            .with_reactions(vec![
                reaction(1, 2, 5, json!({})),
                reaction(2, 5, 6, json!({})),
                reaction(3, 6, 7, json!({})),
            ]);
        let graph = project(&snapshot);
        assert_eq!(graph.edges.len(), 2);
        for edge in &graph.edges {
            assert!(graph.node(&edge.source).is_some());
            assert!(graph.node(&edge.target).is_some());
        }
    }

    #[test]
    fn github_without_repo_is_unconfigured() {
        let snapshot = Snapshot::new().with_hooks(ServiceKind::Github, vec![Hook::new(3, ServiceKind::Github)]);
        let graph = project(&snapshot);
        let data = graph.nodes[0].as_action().unwrap();
        assert_eq!(data.label, "GitHub Webhook #3");
        assert!(!data.is_configured);
    }

    #[test]
    fn service_labels() {
        let snapshot = Snapshot::new()
            .with_hooks(
                ServiceKind::Gmail,
                vec![
                    Hook::new(1, ServiceKind::Gmail).with_event_type(EventType::Number(2)),
                    Hook::new(2, ServiceKind::Gmail),
                ],
            )
            .with_hooks(
                ServiceKind::Microsoft,
                vec![Hook::new(3, ServiceKind::Microsoft)],
            )
            .with_hooks(
                ServiceKind::Discord,
                vec![Hook::new(4, ServiceKind::Discord).with_config(config(json!({
                    "events": ["reaction_added"],
                    "channelName": "general"
                })))],
            )
            .with_hooks(
                ServiceKind::Twitch,
                vec![Hook::new(5, ServiceKind::Twitch).with_config(config(json!({
                    "events": ["channel.follow"],
                    "broadcasterUserId": 1234
                })))],
            );
        let projection = project(&snapshot);
        let labels: Vec<&str> = projection
            .nodes
            .iter()
            .map(|node| node.data.label())
            .collect();
        assert_eq!(
            labels,
            vec![
                "Gmail: Any Email",
                "Gmail: New Email",
                "Microsoft: Email",
                "Discord: Reaction in general",
                "Twitch: channel follow (1234)",
            ]
        );
    }

    #[test]
    fn gmail_event_type_is_copied_into_empty_config() {
        let snapshot = Snapshot::new().with_hooks(
            ServiceKind::Gmail,
            vec![Hook::new(1, ServiceKind::Gmail).with_event_type(EventType::Number(3))],
        );
        let graph = project(&snapshot);
        let data = graph.nodes[0].as_action().unwrap();
        assert_eq!(data.config.get("eventType"), Some(&json!(3)));
        assert_eq!(data.label, "Gmail: Email Deleted");
    }

    #[test]
    fn shared_row_id_resolves_to_first_service() {
        let snapshot = Snapshot::new()
            .with_hooks(ServiceKind::Github, vec![Hook::new(1, ServiceKind::Github).with_config(config(json!({ "repo": "o/r" })))])
            .with_hooks(ServiceKind::Discord, vec![Hook::new(1, ServiceKind::Discord)])
            .with_reactions(vec![reaction(9, 1, 2, json!({}))]);
        let graph = project(&snapshot);
        assert!(graph.node("action_1").is_some());
        assert!(graph.node("action_discord_1").is_some());
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].source, "action_1");
    }

    #[test]
    fn reactions_are_laid_out_in_their_own_column() {
        let snapshot = Snapshot::new().with_reactions(vec![
            reaction(1, 0, 1, json!({ "name": "Mail me" })),
            reaction(2, 0, 8, json!({})),
        ]);
        let graph = project(&snapshot);
        assert_eq!(graph.nodes[0].position, Position::new(500.0, 100.0));
        assert_eq!(graph.nodes[1].position, Position::new(500.0, 250.0));
        assert_eq!(graph.nodes[0].data.label(), "Mail me");
    }

    #[test]
    fn cache_skips_equal_snapshots() {
        let mut cache = ProjectionCache::new();
        let snapshot = scenario();

        let (_, changed) = cache.update(&snapshot);
        assert!(changed);
        let (graph, changed) = cache.update(&snapshot.clone());
        assert!(!changed);
        assert_eq!(graph.nodes.len(), 2);

        let (graph, changed) = cache.update(&Snapshot::new());
        assert!(changed);
        assert!(graph.is_empty());
    }
}
