//! Sidebar templates and their availability gate.
//!
//! Templates come from `/about.json`. A template is draggable only while its
//! service is linked; disabled templates stay listed with a hint instead.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::blueprint::catalog;
use crate::blueprint::node::{ActionNodeData, GraphNode, NodeData, NodeKind, Position, ReactionNodeData};
use crate::blueprint::orchestrator::GraphOrchestrator;
use crate::blueprint::transfer::{self, DataTransfer};
use crate::models::{AboutResponse, ConfigMap, ServiceKind};

/// Connection flags for every known service; absent flags count as unlinked.
pub fn availability(connections: &BTreeMap<ServiceKind, bool>) -> BTreeMap<ServiceKind, bool> {
    ServiceKind::ALL
        .into_iter()
        .map(|service| (service, connections.get(&service).copied().unwrap_or(false)))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SidebarTemplate {
    pub kind: NodeKind,
    pub service: String,
    pub name: String,
    /// Block caption, e.g. `issue created`.
    pub caption: String,
    /// Tooltip: the description, or a link hint while disabled.
    pub title: String,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<NodeData>,
}

impl SidebarTemplate {
    /// Write the template into a drag payload. No-op when disabled.
    pub fn start_drag(&self, transfer: &mut dyn DataTransfer) -> bool {
        match (&self.data, self.enabled) {
            (Some(data), true) => transfer::start_drag(transfer, data).is_ok(),
            _ => false,
        }
    }

    /// Insert the template at the canvas centre. No-op when disabled.
    pub fn double_click(&self, orchestrator: &GraphOrchestrator, centre: Position) -> Option<GraphNode> {
        let data = self.data.clone().filter(|_| self.enabled)?;
        match orchestrator.create_node_from_template(self.kind, data, centre) {
            Ok(node) => Some(node),
            Err(err) => {
                debug!(error = %err, template = %self.name, "Template insert rejected");
                None
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SidebarSection {
    pub service: String,
    pub heading: String,
    pub templates: Vec<SidebarTemplate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Sidebar {
    pub actions: Vec<SidebarSection>,
    pub reactions: Vec<SidebarSection>,
}

impl Sidebar {
    pub fn templates(&self) -> impl Iterator<Item = &SidebarTemplate> {
        self.actions
            .iter()
            .chain(self.reactions.iter())
            .flat_map(|section| section.templates.iter())
    }
}

/// Action sections for every advertised service, reaction sections only for
/// services that advertise reactions.
pub fn build_sidebar(about: &AboutResponse, available: &BTreeMap<ServiceKind, bool>) -> Sidebar {
    let mut sidebar = Sidebar::default();

    for service in about.services() {
        let kind = service.name.parse::<ServiceKind>().ok();
        let enabled = kind
            .and_then(|kind| available.get(&kind).copied())
            .unwrap_or(false);
        let title = |description: &str| {
            if enabled {
                description.to_string()
            } else {
                format!("Link {} in Profile", service.name)
            }
        };

        let actions = service
            .actions
            .iter()
            .map(|action| {
                let data = kind.map(|service_kind| {
                    NodeData::Action(ActionNodeData {
                        label: action.description.clone(),
                        service: service_kind,
                        event_type: action.name.clone(),
                        webhook_id: None,
                        config: ConfigMap::new(),
                        is_configured: false,
                    })
                });
                SidebarTemplate {
                    kind: NodeKind::Action,
                    service: service.name.clone(),
                    name: action.name.clone(),
                    caption: action.name.replace(['_', '.'], " "),
                    title: title(&action.description),
                    enabled: enabled && data.is_some(),
                    data,
                }
            })
            .collect();
        sidebar.actions.push(SidebarSection {
            service: service.name.clone(),
            heading: heading(&service.name),
            templates: actions,
        });

        if service.reactions.is_empty() {
            continue;
        }
        let reactions = service
            .reactions
            .iter()
            .map(|reaction| {
                let label = if reaction.description.is_empty() {
                    reaction.name.replace('_', " ")
                } else {
                    reaction.description.clone()
                };
                SidebarTemplate {
                    kind: NodeKind::Reaction,
                    service: service.name.clone(),
                    name: reaction.name.clone(),
                    caption: reaction.name.replace('_', " "),
                    title: title(&reaction.description),
                    enabled,
                    data: Some(NodeData::Reaction(ReactionNodeData {
                        label,
                        reaction_type: catalog::reaction_type_id(&service.name, &reaction.name),
                        reaction_name: Some(reaction.name.clone()),
                        service_name: Some(service.name.clone()),
                        reaction_id: None,
                        config: ConfigMap::new(),
                        is_configured: false,
                    })),
                }
            })
            .collect();
        sidebar.reactions.push(SidebarSection {
            service: service.name.clone(),
            heading: heading(&service.name),
            templates: reactions,
        });
    }

    sidebar
}

fn heading(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
