//! Drag/drop transport for node templates.
//!
//! A drag carries two string fields: the node kind and the JSON-encoded
//! template data. A drop with either field missing or undecodable is a no-op.

use std::collections::HashMap;

use tracing::debug;

use crate::blueprint::node::{NodeData, NodeKind, Position};

pub const NODE_TYPE_FORMAT: &str = "application/reactflow-type";
pub const NODE_DATA_FORMAT: &str = "application/reactflow-data";

/// Offset from the pointer to a node's top-left corner.
const DROP_OFFSET: Position = Position { x: 100.0, y: 40.0 };

/// Platform drag payload, keyed by format string.
pub trait DataTransfer {
    fn set_data(&mut self, format: &str, data: &str);
    /// Empty string when the format is absent.
    fn get_data(&self, format: &str) -> String;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryTransfer {
    entries: HashMap<String, String>,
}

impl MemoryTransfer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DataTransfer for MemoryTransfer {
    fn set_data(&mut self, format: &str, data: &str) {
        self.entries.insert(format.to_string(), data.to_string());
    }

    fn get_data(&self, format: &str) -> String {
        self.entries.get(format).cloned().unwrap_or_default()
    }
}

/// Pointer location and canvas bounds at drop time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DropTarget {
    pub client_x: f64,
    pub client_y: f64,
    pub bounds_left: f64,
    pub bounds_top: f64,
}

pub fn start_drag(transfer: &mut dyn DataTransfer, data: &NodeData) -> serde_json::Result<()> {
    let payload = data.to_template()?;
    transfer.set_data(NODE_TYPE_FORMAT, data.kind().as_str());
    transfer.set_data(NODE_DATA_FORMAT, &payload);
    Ok(())
}

pub fn read_drop(transfer: &dyn DataTransfer) -> Option<(NodeKind, NodeData)> {
    let kind = transfer.get_data(NODE_TYPE_FORMAT);
    let payload = transfer.get_data(NODE_DATA_FORMAT);
    if kind.is_empty() || payload.is_empty() {
        return None;
    }

    let kind = kind.parse::<NodeKind>().ok()?;
    match NodeData::from_template(kind, &payload) {
        Ok(data) => Some((kind, data)),
        Err(err) => {
            debug!(error = %err, "Discarding malformed drag payload");
            None
        }
    }
}

pub fn drop_position(target: &DropTarget) -> Position {
    Position::new(
        target.client_x - target.bounds_left - DROP_OFFSET.x,
        target.client_y - target.bounds_top - DROP_OFFSET.y,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint::node::ActionNodeData;
    use crate::models::{ConfigMap, ServiceKind};

    fn github_template() -> NodeData {
        NodeData::Action(ActionNodeData {
            label: "GitHub: push".to_string(),
            service: ServiceKind::Github,
            event_type: "push".to_string(),
            webhook_id: None,
            config: ConfigMap::new(),
            is_configured: false,
        })
    }

    #[test]
    fn drag_then_drop_restores_template() {
        let mut transfer = MemoryTransfer::new();
        start_drag(&mut transfer, &github_template()).unwrap();

        assert_eq!(transfer.get_data(NODE_TYPE_FORMAT), "action");
        let (kind, data) = read_drop(&transfer).unwrap();
        assert_eq!(kind, NodeKind::Action);
        assert_eq!(data, github_template());
    }

    #[test]
    fn missing_field_aborts_drop() {
        let mut transfer = MemoryTransfer::new();
        transfer.set_data(NODE_TYPE_FORMAT, "action");
        assert!(read_drop(&transfer).is_none());

        let mut transfer = MemoryTransfer::new();
        transfer.set_data(NODE_DATA_FORMAT, "{}");
        assert!(read_drop(&transfer).is_none());
    }

    #[test]
    fn malformed_payload_aborts_drop() {
        let mut transfer = MemoryTransfer::new();
        transfer.set_data(NODE_TYPE_FORMAT, "action");
        transfer.set_data(NODE_DATA_FORMAT, "{not json");
        assert!(read_drop(&transfer).is_none());

        transfer.set_data(NODE_TYPE_FORMAT, "sticky-note");
        transfer.set_data(NODE_DATA_FORMAT, "{}");
        assert!(read_drop(&transfer).is_none());
    }

    #[test]
    fn drop_position_subtracts_bounds_and_offset() {
        let target = DropTarget {
            client_x: 450.0,
            client_y: 300.0,
            bounds_left: 50.0,
            bounds_top: 60.0,
        };
        assert_eq!(drop_position(&target), Position::new(300.0, 200.0));
    }
}
