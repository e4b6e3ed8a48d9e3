//! # Graph Mutation Orchestrator
//!
//! Turns editor intents (connect, delete, save, drop) into remote calls
//! against the right service and folds the results back into the live
//! graph store. Failures become user notices and leave local state as it was.
//!
//! All methods take `&self`. The editor state sits behind a mutex that is
//! never held across an `.await`, so concurrently polled operations
//! interleave exactly like callbacks on a single event loop.
//!
//! Refreshes may overlap. Each one marks its collections as loading until it
//! lands, and merges only what it fetched into the current snapshot; a result
//! older than one already applied for the same collection is dropped.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::blueprint::ids::{NodeIdGenerator, connect_edge_id, parse_reaction_node_id, reaction_node_id};
use crate::blueprint::loader::{FetchedCollections, LoadedSnapshot, SnapshotLoader};
use crate::blueprint::node::{Graph, GraphEdge, GraphNode, NodeData, NodeKind, Position};
use crate::blueprint::notice::{Notice, Notifier};
use crate::blueprint::projection::ProjectionCache;
use crate::blueprint::store::{Collection, EdgeChange, LiveGraphStore, NodeChange};
use crate::blueprint::transfer::{self, DataTransfer, DropTarget};
use crate::client::ApiClient;
use crate::config::AppConfig;
use crate::connectors::{Registry, ServiceAdapter};
use crate::error::BlueprintError;
use crate::models::{CreateReactionRequest, Hook, TriggerRef, UpdateReactionRequest};

pub const CONFIGURE_ACTION_FIRST: &str = "Please configure the action first (double-click to set up)";
pub const CONFIGURE_REACTION_FIRST: &str =
    "Please configure the reaction first (double-click to set up)";
pub const STILL_SAVING: &str = "This node is still being saved. Try again in a moment.";
const UNRESOLVED_ACTION: &str = "Could not find this action on the server. Refresh and try again.";

const CREATED_AUTOMATION: &str = "Automation created successfully!";
const CREATE_AUTOMATION_FAILED: &str = "Failed to create automation. Please try again.";
const DELETED: &str = "Deleted successfully";
const DELETE_FAILED: &str = "Failed to delete";
const DELETED_SELECTED: &str = "Deleted selected nodes";
const AUTOMATION_REMOVED: &str = "Automation removed";
const CONFIGURE_ACTION_FAILED: &str = "Failed to configure action";
const SAVE_REACTION_FAILED: &str = "Failed to save reaction";

/// Outcome of a multi-select delete. Only nodes in `deleted` left the graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchDeleteReport {
    pub deleted: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl BatchDeleteReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Remote call needed before a node may leave the graph.
enum RemoteDelete {
    Reaction(i64),
    Trigger(Arc<dyn ServiceAdapter>, TriggerRef),
}

#[derive(Default)]
struct EditorState {
    store: LiveGraphStore,
    cache: ProjectionCache,
    loaded: LoadedSnapshot,
    stale: BTreeSet<Collection>,
    /// Set while a changed snapshot is waiting for loading to clear.
    pending_sync: bool,
    in_flight: BTreeMap<Collection, usize>,
    /// Generation of the newest result merged per collection.
    applied: BTreeMap<Collection, u64>,
    generation: u64,
}

impl EditorState {
    fn hooks(&self) -> Vec<Hook> {
        self.loaded.snapshot.all_hooks()
    }

    /// Overwrite the store when the snapshot changed, when an earlier
    /// overwrite was held back, or when the store was never seeded.
    fn reconcile(&mut self) -> bool {
        let Self {
            store,
            cache,
            loaded,
            pending_sync,
            ..
        } = self;
        let (graph, changed) = cache.update(&loaded.snapshot);
        if !(changed || *pending_sync || !store.is_seeded()) {
            return false;
        }
        let synced = store.sync_from_projection(graph, &loaded.loading);
        *pending_sync = !synced;
        debug!(changed, synced, "Reconciled store with snapshot");
        synced
    }

    fn begin_fetch(&mut self, collections: &BTreeSet<Collection>) -> u64 {
        self.generation += 1;
        for collection in collections {
            *self.in_flight.entry(*collection).or_default() += 1;
            self.loaded.loading.set(*collection, true);
        }
        self.generation
    }

    fn finish_fetch(
        &mut self,
        collections: &BTreeSet<Collection>,
        generation: u64,
        mut fetched: FetchedCollections,
    ) {
        for collection in collections {
            let remaining = match self.in_flight.get_mut(collection) {
                Some(count) => {
                    *count = count.saturating_sub(1);
                    *count
                }
                None => 0,
            };
            if remaining == 0 {
                self.in_flight.remove(collection);
                self.loaded.loading.set(*collection, false);
            }
        }

        let applied = &mut self.applied;
        fetched.retain(|collection| {
            let newer = applied
                .get(&collection)
                .is_none_or(|last| *last < generation);
            if newer {
                applied.insert(collection, generation);
            } else {
                debug!(%collection, generation, "Dropping superseded fetch result");
            }
            newer
        });
        fetched.apply_to(&mut self.loaded);
    }
}

pub struct GraphOrchestrator {
    client: Arc<ApiClient>,
    registry: Arc<Registry>,
    loader: SnapshotLoader,
    notifier: Arc<dyn Notifier>,
    ids: NodeIdGenerator,
    state: Mutex<EditorState>,
}

impl GraphOrchestrator {
    pub fn new(
        client: Arc<ApiClient>,
        registry: Arc<Registry>,
        notifier: Arc<dyn Notifier>,
        id_seed: u64,
    ) -> Self {
        Self {
            loader: SnapshotLoader::new(client.clone(), registry.clone()),
            client,
            registry,
            notifier,
            ids: NodeIdGenerator::new(id_seed),
            state: Mutex::new(EditorState::default()),
        }
    }

    /// Wire a client and the default adapters from configuration.
    pub fn from_config(
        config: &AppConfig,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, BlueprintError> {
        let client = Arc::new(ApiClient::from_config(config)?);
        let registry = Arc::new(Registry::with_defaults(client.clone(), config));
        Ok(Self::new(client, registry, notifier, config.node_id_seed))
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn loader(&self) -> &SnapshotLoader {
        &self.loader
    }

    fn state(&self) -> MutexGuard<'_, EditorState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn fail(&self, err: BlueprintError, fallback: &str) -> BlueprintError {
        self.notifier.notify(Notice::error(err.user_message(fallback)));
        err
    }

    fn precondition(&self, message: &str) -> BlueprintError {
        self.fail(BlueprintError::precondition(message), message)
    }

    /// Current live graph.
    pub fn graph(&self) -> Graph {
        self.state().store.graph().clone()
    }

    pub fn node(&self, id: &str) -> Option<GraphNode> {
        self.state().store.node(id).cloned()
    }

    /// Collections marked stale by mutations and not yet being refetched.
    pub fn invalidated(&self) -> BTreeSet<Collection> {
        self.state().stale.clone()
    }

    /// Collections with a fetch in flight.
    pub fn loading(&self) -> Vec<Collection> {
        self.state().loaded.loading.pending()
    }

    /// Feed a fetch result through the projection gate into the store.
    /// Collections this orchestrator is still fetching stay loading.
    /// Returns whether the store was overwritten.
    pub fn ingest(&self, loaded: LoadedSnapshot) -> bool {
        let mut state = self.state();
        state.loaded = loaded;
        let in_flight: Vec<Collection> = state.in_flight.keys().copied().collect();
        for collection in in_flight {
            state.loaded.loading.set(collection, true);
        }
        state.reconcile()
    }

    /// Refetch stale collections (everything on first use) and merge them
    /// into the current snapshot.
    pub async fn refresh(&self) -> bool {
        let (stale, known, generation) = {
            let mut state = self.state();
            let mut stale = std::mem::take(&mut state.stale);
            if !state.store.is_seeded() {
                stale.extend(self.loader.all_collections());
            }
            if stale.is_empty() {
                return state.reconcile();
            }
            let generation = state.begin_fetch(&stale);
            (stale, state.loaded.connections.clone(), generation)
        };
        debug!(generation, collections = stale.len(), "Refresh started");

        let fetched = self.loader.fetch(&stale, &known).await;

        let mut state = self.state();
        state.finish_fetch(&stale, generation, fetched);
        state.reconcile()
    }

    pub fn apply_node_changes(&self, changes: impl IntoIterator<Item = NodeChange>) {
        self.state().store.apply_node_changes(changes);
    }

    pub fn apply_edge_changes(&self, changes: impl IntoIterator<Item = EdgeChange>) {
        self.state().store.apply_edge_changes(changes);
    }

    /// Link an action to a reaction by creating the reaction remotely.
    ///
    /// Pairings other than action to reaction are ignored (`Ok(None)`).
    pub async fn connect(&self, source: &str, target: &str) -> Result<Option<GraphEdge>, BlueprintError> {
        let (action, reaction, hooks) = {
            let state = self.state();
            let (Some(source_node), Some(target_node)) =
                (state.store.node(source), state.store.node(target))
            else {
                return Ok(None);
            };
            let (Some(action), Some(reaction)) =
                (source_node.as_action(), target_node.as_reaction())
            else {
                return Ok(None);
            };
            (action.clone(), reaction.clone(), state.hooks())
        };

        let Some(webhook_id) = action.webhook_id.as_ref() else {
            return Err(self.precondition(CONFIGURE_ACTION_FIRST));
        };
        if !reaction.is_configured {
            return Err(self.precondition(CONFIGURE_REACTION_FIRST));
        }

        let adapter = self
            .registry
            .get(action.service)
            .map_err(|err| self.fail(err.into(), CREATE_AUTOMATION_FAILED))?;
        let Some(hook_id) = adapter.reaction_hook_id(webhook_id, &hooks) else {
            return Err(self.precondition(UNRESOLVED_ACTION));
        };

        if !self.state().store.begin_create(target) {
            return Err(self.precondition(STILL_SAVING));
        }

        let request = CreateReactionRequest {
            hook_id,
            reaction_type: reaction.reaction_type,
            config: reaction.config.clone(),
            name: if reaction.label.is_empty() {
                format!("Reaction {}", reaction.reaction_type)
            } else {
                reaction.label.clone()
            },
        };
        debug!(source, target, hook_id, "Creating reaction");
        let result = self.client.create_reaction(&request).await;

        let mut state = self.state();
        state.store.finish_create(target);
        let created = match result {
            Ok(created) => created,
            Err(err) => {
                drop(state);
                return Err(self.fail(err.into(), CREATE_AUTOMATION_FAILED));
            }
        };
        state.stale.insert(Collection::Reactions);

        let Some(mut data) = state.store.node(target).and_then(|node| node.as_reaction()).cloned()
        else {
            warn!(
                node_id = target,
                reaction_id = created.id,
                "Reaction created for a node that is gone; result not applied"
            );
            drop(state);
            self.notifier.notify(Notice::success(CREATED_AUTOMATION));
            return Ok(None);
        };

        let node_id = reaction_node_id(created.id);
        data.reaction_id = Some(created.id);
        data.is_configured = true;
        state.store.update_node_data(target, NodeData::Reaction(data));
        state.store.rekey_node(target, &node_id);

        let edge = GraphEdge::new(connect_edge_id(hook_id, created.id), source, node_id);
        state.store.add_edge(edge.clone());
        drop(state);

        info!(source, reaction_id = created.id, "Automation created");
        self.notifier.notify(Notice::success(CREATED_AUTOMATION));
        Ok(Some(edge))
    }

    /// Remote call (if any) required before `node` may be removed.
    fn remote_delete_for(&self, node: &GraphNode, hooks: &[Hook]) -> Result<Option<RemoteDelete>, BlueprintError> {
        match &node.data {
            NodeData::Reaction(data) => Ok(parse_reaction_node_id(&node.id)
                .or(data.reaction_id)
                .map(RemoteDelete::Reaction)),
            NodeData::Action(data) => {
                let Some(webhook_id) = data.webhook_id.as_ref() else {
                    return Ok(None);
                };
                let adapter = self.registry.get(data.service)?;
                Ok(adapter
                    .resolve_delete_key(webhook_id, hooks)
                    .map(|key| RemoteDelete::Trigger(adapter, key)))
            }
        }
    }

    /// Delete remotely first, then drop the node and its edges locally.
    async fn delete_node_quietly(&self, node_id: &str) -> Result<(), BlueprintError> {
        let (node, hooks) = {
            let state = self.state();
            let node = state
                .store
                .node(node_id)
                .cloned()
                .ok_or_else(|| BlueprintError::NodeNotFound(node_id.to_string()))?;
            if state.store.is_create_pending(node_id) {
                return Err(BlueprintError::precondition(STILL_SAVING));
            }
            (node, state.hooks())
        };

        let mut invalidate = Vec::new();
        match self.remote_delete_for(&node, &hooks)? {
            Some(RemoteDelete::Reaction(reaction_id)) => {
                debug!(node_id, reaction_id, "Deleting reaction");
                self.client.delete_reaction(reaction_id).await?;
                invalidate.push(Collection::Reactions);
            }
            Some(RemoteDelete::Trigger(adapter, key)) => {
                let service = adapter.service();
                debug!(node_id, %service, trigger = %key, "Deleting trigger");
                adapter.delete_trigger(&key).await?;
                invalidate.extend([Collection::Hooks(service), Collection::Reactions]);
            }
            None => debug!(node_id, "Node has no remote record; removing locally"),
        }

        let mut state = self.state();
        state.store.remove_node(node_id);
        state.stale.extend(invalidate);
        Ok(())
    }

    pub async fn delete_node(&self, node_id: &str) -> Result<(), BlueprintError> {
        match self.delete_node_quietly(node_id).await {
            Ok(()) => {
                info!(node_id, "Node deleted");
                self.notifier.notify(Notice::success(DELETED));
                Ok(())
            }
            Err(err) => {
                warn!(node_id, error = %err, "Node delete failed");
                Err(self.fail(err, DELETE_FAILED))
            }
        }
    }

    /// Delete every selected node, and the reaction behind every selected
    /// link, continuing past individual failures. Selected links that do not
    /// lead to a reaction are only removed locally.
    pub async fn delete_selected(&self) -> BatchDeleteReport {
        let targets = {
            let mut state = self.state();
            let mut targets: Vec<String> = state
                .store
                .selected_nodes()
                .into_iter()
                .map(|node| node.id)
                .collect();
            for edge in state.store.selected_edges() {
                let to_reaction = state
                    .store
                    .node(&edge.target)
                    .is_some_and(|node| node.kind() == NodeKind::Reaction);
                if !to_reaction {
                    state.store.remove_edge(&edge.id);
                } else if !targets.contains(&edge.target) {
                    targets.push(edge.target);
                }
            }
            targets
        };
        self.delete_nodes(&targets).await
    }

    /// Delete `node_ids` one by one. Only nodes whose remote delete
    /// succeeded (or needed none) leave the graph.
    pub async fn delete_nodes(&self, node_ids: &[String]) -> BatchDeleteReport {
        let mut report = BatchDeleteReport::default();

        for node_id in node_ids {
            match self.delete_node_quietly(node_id).await {
                Ok(()) => report.deleted.push(node_id.clone()),
                Err(err) => {
                    warn!(%node_id, error = %err, "Batch delete skipped node");
                    report.failed.push((node_id.clone(), err.user_message(DELETE_FAILED)));
                }
            }
        }

        if report.is_complete() {
            self.notifier.notify(Notice::success(DELETED_SELECTED));
        } else {
            self.notifier.notify(Notice::error(format!(
                "Failed to delete {} of {} nodes",
                report.failed.len(),
                report.failed.len() + report.deleted.len()
            )));
        }
        report
    }

    /// Removing a link deletes the reaction it leads to.
    pub async fn delete_edge(&self, edge_id: &str) -> Result<(), BlueprintError> {
        let target = {
            let state = self.state();
            let edge = state
                .store
                .graph()
                .edge(edge_id)
                .ok_or_else(|| BlueprintError::EdgeNotFound(edge_id.to_string()))?;
            state
                .store
                .node(&edge.target)
                .filter(|node| node.kind() == NodeKind::Reaction)
                .map(|node| node.id.clone())
        };

        let Some(target) = target else {
            self.state().store.remove_edge(edge_id);
            return Ok(());
        };

        match self.delete_node_quietly(&target).await {
            Ok(()) => {
                self.notifier.notify(Notice::success(AUTOMATION_REMOVED));
                Ok(())
            }
            Err(err) => {
                warn!(edge_id, error = %err, "Edge delete failed");
                Err(self.fail(err, DELETE_FAILED))
            }
        }
    }

    /// Save edited node data; creates the remote trigger for an action that
    /// has none yet, and updates durable reactions.
    pub async fn save_node_config(&self, node_id: &str, updated: NodeData) -> Result<NodeData, BlueprintError> {
        let existing = self
            .node(node_id)
            .ok_or_else(|| BlueprintError::NodeNotFound(node_id.to_string()))
            .map_err(|err| self.fail(err, CONFIGURE_ACTION_FAILED))?;

        match (existing.data, updated) {
            (NodeData::Action(current), NodeData::Action(mut data)) => {
                data.service = current.service;
                data.webhook_id = current.webhook_id;
                if data.webhook_id.is_some() {
                    // Live registrations cannot be edited remotely.
                    data.is_configured = true;
                    return Ok(self.patch_local(node_id, NodeData::Action(data)));
                }

                let adapter = self
                    .registry
                    .get(data.service)
                    .map_err(|err| self.fail(err.into(), CONFIGURE_ACTION_FAILED))?;
                let missing = adapter.missing_fields(&data.config);
                if !missing.is_empty() {
                    debug!(node_id, service = %data.service, ?missing, "Deferring trigger creation");
                    data.is_configured = false;
                    return Ok(self.patch_local(node_id, NodeData::Action(data)));
                }

                if !self.state().store.begin_create(node_id) {
                    return Err(self.precondition(STILL_SAVING));
                }
                let result = adapter.create_trigger(&data.config).await;

                let mut state = self.state();
                state.store.finish_create(node_id);
                let trigger = match result {
                    Ok(trigger) => trigger,
                    Err(err) => {
                        drop(state);
                        return Err(self.fail(err.into(), CONFIGURE_ACTION_FAILED));
                    }
                };
                state.stale.insert(Collection::Hooks(data.service));

                data.webhook_id = Some(trigger);
                data.is_configured = true;
                let saved = NodeData::Action(data);
                if !state.store.update_node_data(node_id, saved.clone()) {
                    warn!(node_id, "Trigger created for a node that is gone; result not applied");
                }
                let service = adapter.service();
                drop(state);

                info!(node_id, %service, "Trigger created");
                self.notifier.notify(Notice::success(format!(
                    "{} trigger created!",
                    service.display_name()
                )));
                Ok(saved)
            }
            (NodeData::Reaction(current), NodeData::Reaction(mut data)) => {
                data.reaction_id = current
                    .reaction_id
                    .or_else(|| parse_reaction_node_id(node_id));
                data.is_configured = true;

                if let Some(reaction_id) = data.reaction_id {
                    let request = UpdateReactionRequest {
                        id: reaction_id,
                        config: data.config.clone(),
                    };
                    self.client
                        .update_reaction(&request)
                        .await
                        .map_err(|err| self.fail(err.into(), SAVE_REACTION_FAILED))?;
                    self.state().stale.insert(Collection::Reactions);
                    info!(node_id, reaction_id, "Reaction updated");
                }
                Ok(self.patch_local(node_id, NodeData::Reaction(data)))
            }
            _ => Err(self.fail(
                BlueprintError::InvalidTemplate("node kind cannot change".to_string()),
                CONFIGURE_ACTION_FAILED,
            )),
        }
    }

    fn patch_local(&self, node_id: &str, data: NodeData) -> NodeData {
        if !self.state().store.update_node_data(node_id, data.clone()) {
            warn!(node_id, "Saved config for a node that is gone");
        }
        data
    }

    /// Insert a fresh, unsaved node. No remote call is made.
    pub fn create_node_from_template(
        &self,
        kind: NodeKind,
        data: NodeData,
        position: Position,
    ) -> Result<GraphNode, BlueprintError> {
        if data.kind() != kind {
            return Err(BlueprintError::InvalidTemplate(format!(
                "{} template carries {} data",
                kind,
                data.kind()
            )));
        }

        let data = match data {
            NodeData::Action(mut action) => {
                action.webhook_id = None;
                action.is_configured = false;
                NodeData::Action(action)
            }
            NodeData::Reaction(mut reaction) => {
                reaction.reaction_id = None;
                reaction.is_configured = false;
                NodeData::Reaction(reaction)
            }
        };

        let node = GraphNode::new(self.ids.fresh(), position, data);
        debug!(node_id = %node.id, %kind, "Node created from template");
        self.state().store.insert_node(node.clone());
        Ok(node)
    }

    /// Handle a drop on the canvas. Missing or malformed payloads are ignored.
    pub fn drop_template(&self, transfer: &dyn DataTransfer, target: &DropTarget) -> Option<GraphNode> {
        let (kind, data) = transfer::read_drop(transfer)?;
        let position = transfer::drop_position(target);
        match self.create_node_from_template(kind, data, position) {
            Ok(node) => Some(node),
            Err(err) => {
                debug!(error = %err, "Ignoring drop");
                None
            }
        }
    }
}
