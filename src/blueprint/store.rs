//! Live graph store.
//!
//! Mutable editor state seeded from the projection. Editing-surface changes
//! are applied verbatim; a projection only replaces the state while no fetch
//! is in flight.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::blueprint::node::{Graph, GraphEdge, GraphNode, NodeData, Position};
use crate::models::ServiceKind;

/// A remotely fetched collection feeding the projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "collection", content = "service", rename_all = "snake_case")]
pub enum Collection {
    Connection(ServiceKind),
    Hooks(ServiceKind),
    Reactions,
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Collection::Connection(service) => write!(f, "connection:{service}"),
            Collection::Hooks(service) => write!(f, "hooks:{service}"),
            Collection::Reactions => f.write_str("reactions"),
        }
    }
}

/// Per-collection fetch flags; loading is their logical OR.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadingState {
    flags: BTreeMap<Collection, bool>,
}

impl LoadingState {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn set(&mut self, collection: Collection, loading: bool) {
        self.flags.insert(collection, loading);
    }

    pub fn with(mut self, collection: Collection, loading: bool) -> Self {
        self.set(collection, loading);
        self
    }

    pub fn is_loading(&self) -> bool {
        self.flags.values().any(|loading| *loading)
    }

    /// Collections still in flight.
    pub fn pending(&self) -> Vec<Collection> {
        self.flags
            .iter()
            .filter(|(_, loading)| **loading)
            .map(|(collection, _)| *collection)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeChange {
    Add(GraphNode),
    Position { id: String, position: Position },
    Select { id: String, selected: bool },
    Remove { id: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum EdgeChange {
    Add(GraphEdge),
    Select { id: String, selected: bool },
    Remove { id: String },
}

#[derive(Debug, Default)]
pub struct LiveGraphStore {
    graph: Graph,
    seeded: bool,
    pending_creates: HashSet<String>,
}

impl LiveGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.graph.node(id)
    }

    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    /// Replace local state with `projected` unless a fetch is in flight.
    pub fn sync_from_projection(&mut self, projected: &Graph, loading: &LoadingState) -> bool {
        if loading.is_loading() {
            debug!(pending = ?loading.pending(), "Projection sync suppressed while loading");
            return false;
        }
        self.graph = projected.clone();
        self.seeded = true;
        true
    }

    pub fn apply_node_changes(&mut self, changes: impl IntoIterator<Item = NodeChange>) {
        for change in changes {
            match change {
                NodeChange::Add(node) => self.insert_node(node),
                NodeChange::Position { id, position } => {
                    if let Some(node) = self.node_mut(&id) {
                        node.position = position;
                    }
                }
                NodeChange::Select { id, selected } => {
                    if let Some(node) = self.node_mut(&id) {
                        node.selected = selected;
                    }
                }
                NodeChange::Remove { id } => self.graph.nodes.retain(|node| node.id != id),
            }
        }
    }

    pub fn apply_edge_changes(&mut self, changes: impl IntoIterator<Item = EdgeChange>) {
        for change in changes {
            match change {
                EdgeChange::Add(edge) => {
                    self.add_edge(edge);
                }
                EdgeChange::Select { id, selected } => {
                    if let Some(edge) = self.graph.edges.iter_mut().find(|edge| edge.id == id) {
                        edge.selected = selected;
                    }
                }
                EdgeChange::Remove { id } => {
                    self.remove_edge(&id);
                }
            }
        }
    }

    pub fn insert_node(&mut self, node: GraphNode) {
        match self.node_mut(&node.id) {
            Some(existing) => *existing = node,
            None => self.graph.nodes.push(node),
        }
    }

    /// Remove a node together with every edge touching it.
    pub fn remove_node(&mut self, id: &str) -> Option<GraphNode> {
        let index = self.graph.nodes.iter().position(|node| node.id == id)?;
        let removed = self.graph.nodes.remove(index);
        self.graph.edges.retain(|edge| !edge.touches(id));
        self.pending_creates.remove(id);
        Some(removed)
    }

    /// Add an edge unless one already links the same pair.
    pub fn add_edge(&mut self, edge: GraphEdge) -> bool {
        if self.graph.has_edge_between(&edge.source, &edge.target)
            || self.graph.edge(&edge.id).is_some()
        {
            return false;
        }
        self.graph.edges.push(edge);
        true
    }

    pub fn remove_edge(&mut self, id: &str) -> Option<GraphEdge> {
        let index = self.graph.edges.iter().position(|edge| edge.id == id)?;
        Some(self.graph.edges.remove(index))
    }

    pub fn update_node_data(&mut self, id: &str, data: NodeData) -> bool {
        match self.node_mut(id) {
            Some(node) => {
                node.data = data;
                true
            }
            None => false,
        }
    }

    /// Rename a node and every edge endpoint referring to it.
    pub fn rekey_node(&mut self, old_id: &str, new_id: &str) -> bool {
        let Some(node) = self.node_mut(old_id) else {
            return false;
        };
        node.id = new_id.to_string();
        for edge in &mut self.graph.edges {
            if edge.source == old_id {
                edge.source = new_id.to_string();
            }
            if edge.target == old_id {
                edge.target = new_id.to_string();
            }
        }
        if self.pending_creates.remove(old_id) {
            self.pending_creates.insert(new_id.to_string());
        }
        true
    }

    pub fn selected_nodes(&self) -> Vec<GraphNode> {
        self.graph
            .nodes
            .iter()
            .filter(|node| node.selected)
            .cloned()
            .collect()
    }

    pub fn selected_edges(&self) -> Vec<GraphEdge> {
        self.graph
            .edges
            .iter()
            .filter(|edge| edge.selected)
            .cloned()
            .collect()
    }

    /// Mark a node's create call as in flight. Returns false if one already is.
    pub fn begin_create(&mut self, id: &str) -> bool {
        self.pending_creates.insert(id.to_string())
    }

    pub fn finish_create(&mut self, id: &str) {
        self.pending_creates.remove(id);
    }

    pub fn is_create_pending(&self, id: &str) -> bool {
        self.pending_creates.contains(id)
    }

    fn node_mut(&mut self, id: &str) -> Option<&mut GraphNode> {
        self.graph.nodes.iter_mut().find(|node| node.id == id)
    }
}
