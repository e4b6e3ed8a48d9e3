//! # Blueprint Editor Engine
//!
//! Reconciles remotely stored hooks and reactions with the locally edited
//! automation graph:
//! - `projection` turns a fetched snapshot into a graph
//! - `store` holds the live, user-edited graph
//! - `orchestrator` drives connect/delete/save against the backend
//! - `sidebar` and `transfer` cover template palettes and drag/drop

pub mod catalog;
pub mod ids;
pub mod loader;
pub mod node;
pub mod notice;
pub mod orchestrator;
pub mod projection;
pub mod sidebar;
pub mod store;
pub mod transfer;

pub use loader::{FetchedCollections, LoadedSnapshot, SnapshotLoader};
pub use node::{
    ActionNodeData, Graph, GraphEdge, GraphNode, NodeData, NodeKind, Position, ReactionNodeData,
};
pub use notice::{Notice, NoticeLevel, NoticeLog, Notifier, TracingNotifier};
pub use orchestrator::{BatchDeleteReport, GraphOrchestrator};
pub use projection::{ProjectionCache, Snapshot, project};
pub use sidebar::{Sidebar, SidebarSection, SidebarTemplate, availability, build_sidebar};
pub use store::{Collection, EdgeChange, LiveGraphStore, LoadingState, NodeChange};
pub use transfer::{DataTransfer, DropTarget, MemoryTransfer};
