//! Visual graph model: nodes, edges and their payloads.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::{ConfigMap, ServiceKind, TriggerRef};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Action,
    Reaction,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Action => "action",
            NodeKind::Reaction => "reaction",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "action" => Ok(NodeKind::Action),
            "reaction" => Ok(NodeKind::Reaction),
            other => Err(format!("unknown node type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionNodeData {
    pub label: String,
    pub service: ServiceKind,
    #[serde(default)]
    pub event_type: String,
    /// Set once the trigger exists remotely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_id: Option<TriggerRef>,
    #[serde(default)]
    pub config: ConfigMap,
    #[serde(default)]
    pub is_configured: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionNodeData {
    #[serde(default)]
    pub label: String,
    pub reaction_type: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reaction_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reaction_id: Option<i64>,
    #[serde(default)]
    pub config: ConfigMap,
    #[serde(default)]
    pub is_configured: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NodeData {
    Action(ActionNodeData),
    Reaction(ReactionNodeData),
}

impl NodeData {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeData::Action(_) => NodeKind::Action,
            NodeData::Reaction(_) => NodeKind::Reaction,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            NodeData::Action(data) => &data.label,
            NodeData::Reaction(data) => &data.label,
        }
    }

    pub fn is_configured(&self) -> bool {
        match self {
            NodeData::Action(data) => data.is_configured,
            NodeData::Reaction(data) => data.is_configured,
        }
    }

    /// Decode a template payload of the given kind.
    pub fn from_template(kind: NodeKind, payload: &str) -> serde_json::Result<Self> {
        Ok(match kind {
            NodeKind::Action => NodeData::Action(serde_json::from_str(payload)?),
            NodeKind::Reaction => NodeData::Reaction(serde_json::from_str(payload)?),
        })
    }

    /// Encode the payload without the kind tag.
    pub fn to_template(&self) -> serde_json::Result<String> {
        match self {
            NodeData::Action(data) => serde_json::to_string(data),
            NodeData::Reaction(data) => serde_json::to_string(data),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub position: Position,
    #[serde(default)]
    pub selected: bool,
    pub data: NodeData,
}

impl GraphNode {
    pub fn new(id: impl Into<String>, position: Position, data: NodeData) -> Self {
        Self {
            id: id.into(),
            position,
            selected: false,
            data,
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.data.kind()
    }

    pub fn as_action(&self) -> Option<&ActionNodeData> {
        match &self.data {
            NodeData::Action(data) => Some(data),
            NodeData::Reaction(_) => None,
        }
    }

    pub fn as_reaction(&self) -> Option<&ReactionNodeData> {
        match &self.data {
            NodeData::Reaction(data) => Some(data),
            NodeData::Action(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub selected: bool,
}

impl GraphEdge {
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            selected: false,
        }
    }

    pub fn touches(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl Graph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&GraphEdge> {
        self.edges.iter().find(|edge| edge.id == id)
    }

    pub fn has_edge_between(&self, source: &str, target: &str) -> bool {
        self.edges
            .iter()
            .any(|edge| edge.source == source && edge.target == target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn node_data_is_tagged_by_kind() {
        let node = GraphNode::new(
            "action_1",
            Position::new(100.0, 100.0),
            NodeData::Action(ActionNodeData {
                label: "GitHub: o/r".to_string(),
                service: ServiceKind::Github,
                event_type: "push".to_string(),
                webhook_id: Some(TriggerRef::Row(1)),
                config: ConfigMap::new(),
                is_configured: true,
            }),
        );
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["data"]["kind"], json!("action"));
        assert_eq!(value["data"]["webhookId"], json!(1));
        assert_eq!(value["data"]["isConfigured"], json!(true));
    }

    #[test]
    fn template_payload_decodes_with_defaults() {
        let data = NodeData::from_template(
            NodeKind::Reaction,
            r#"{"label":"Send message","reactionType":2,"serviceName":"discord"}"#,
        )
        .unwrap();
        let reaction = match data {
            NodeData::Reaction(reaction) => reaction,
            NodeData::Action(_) => panic!("expected reaction"),
        };
        assert_eq!(reaction.reaction_type, 2);
        assert!(!reaction.is_configured);
        assert!(reaction.config.is_empty());
    }

    #[test]
    fn node_kind_parses() {
        assert_eq!("action".parse::<NodeKind>(), Ok(NodeKind::Action));
        assert!("comment".parse::<NodeKind>().is_err());
    }
}
