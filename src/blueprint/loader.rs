//! Snapshot loader.
//!
//! Fetches connection status, per-service hook lists and reactions, and
//! assembles them into a [`Snapshot`]. Fetch failures never abort the load:
//! the affected collection is logged and left empty.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::blueprint::projection::Snapshot;
use crate::blueprint::store::{Collection, LoadingState};
use crate::client::ApiClient;
use crate::connectors::Registry;
use crate::error::RemoteError;
use crate::models::{AboutResponse, Hook, Reaction, ServiceKind};

/// Result of a load: the snapshot plus the state it was fetched in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedSnapshot {
    pub snapshot: Snapshot,
    pub connections: BTreeMap<ServiceKind, bool>,
    pub loading: LoadingState,
}

impl LoadedSnapshot {
    pub fn is_connected(&self, service: ServiceKind) -> bool {
        self.connections.get(&service).copied().unwrap_or(false)
    }
}

pub struct SnapshotLoader {
    client: Arc<ApiClient>,
    registry: Arc<Registry>,
}

impl SnapshotLoader {
    pub fn new(client: Arc<ApiClient>, registry: Arc<Registry>) -> Self {
        Self { client, registry }
    }

    /// Connection flag for every registered service. Failures count as unlinked.
    pub async fn connections(&self) -> BTreeMap<ServiceKind, bool> {
        self.connections_for(self.registry.services()).await
    }

    async fn connections_for(&self, services: Vec<ServiceKind>) -> BTreeMap<ServiceKind, bool> {
        let mut tasks = JoinSet::new();
        for service in services {
            let client = self.client.clone();
            tasks.spawn(async move { (service, client.connection_status(service).await) });
        }

        let mut connections = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((service, Ok(connected))) => {
                    connections.insert(service, connected);
                }
                Ok((service, Err(err))) => {
                    warn!(%service, error = %err, "Connection status unavailable");
                    connections.insert(service, false);
                }
                Err(err) => warn!(error = %err, "Connection status task failed"),
            }
        }
        connections
    }

    pub async fn fetch_hooks(&self, service: ServiceKind) -> Vec<Hook> {
        let adapter = match self.registry.get(service) {
            Ok(adapter) => adapter,
            Err(err) => {
                warn!(%service, error = %err, "No adapter for hook list");
                return Vec::new();
            }
        };
        match adapter.list_triggers().await {
            Ok(hooks) => {
                debug!(%service, count = hooks.len(), "Fetched hooks");
                hooks
            }
            Err(err) => {
                warn!(%service, error = %err, "Failed to list hooks");
                Vec::new()
            }
        }
    }

    pub async fn fetch_reactions(&self) -> Vec<Reaction> {
        match self.client.list_reactions().await {
            Ok(reactions) => reactions,
            Err(err) => {
                warn!(error = %err, "Failed to list reactions");
                Vec::new()
            }
        }
    }

    /// Services, actions and reactions advertised by the backend.
    pub async fn about(&self) -> Result<AboutResponse, RemoteError> {
        self.client.about().await
    }

    /// Every collection a full load fetches.
    pub fn all_collections(&self) -> BTreeSet<Collection> {
        let services = self.registry.services();
        services
            .iter()
            .map(|service| Collection::Connection(*service))
            .chain(services.iter().map(|service| Collection::Hooks(*service)))
            .chain([Collection::Reactions])
            .collect()
    }

    /// Fetch everything: connection flags first, then hook lists of linked
    /// services alongside the reaction list.
    pub async fn load(&self) -> LoadedSnapshot {
        self.refetch(&LoadedSnapshot::default(), &self.all_collections())
            .await
    }

    /// Refetch only `stale` collections, keeping the rest of `previous`.
    pub async fn refetch(
        &self,
        previous: &LoadedSnapshot,
        stale: &BTreeSet<Collection>,
    ) -> LoadedSnapshot {
        let mut loaded = LoadedSnapshot {
            loading: LoadingState::idle(),
            ..previous.clone()
        };
        self.fetch(stale, &previous.connections)
            .await
            .apply_to(&mut loaded);
        loaded
    }

    /// Fetch `stale` collections. Connection flags come first; hook lists of
    /// services that are not linked (per `known` overlaid with the fresh
    /// flags) are skipped and come back empty.
    pub async fn fetch(
        &self,
        stale: &BTreeSet<Collection>,
        known: &BTreeMap<ServiceKind, bool>,
    ) -> FetchedCollections {
        let connection_services: Vec<ServiceKind> = stale
            .iter()
            .filter_map(|collection| match collection {
                Collection::Connection(service) => Some(*service),
                _ => None,
            })
            .collect();
        let connections = if connection_services.is_empty() {
            BTreeMap::new()
        } else {
            self.connections_for(connection_services).await
        };
        let linked = |service: &ServiceKind| {
            connections
                .get(service)
                .or_else(|| known.get(service))
                .copied()
                .unwrap_or(false)
        };

        let hook_services: Vec<ServiceKind> = stale
            .iter()
            .filter_map(|collection| match collection {
                Collection::Hooks(service) => Some(*service),
                _ => None,
            })
            .collect();

        let reactions = async {
            if stale.contains(&Collection::Reactions) {
                Some(self.fetch_reactions().await)
            } else {
                None
            }
        };
        let hooks = async {
            let mut fetched = BTreeMap::new();
            for service in &hook_services {
                if linked(service) {
                    fetched.insert(*service, self.fetch_hooks(*service).await);
                } else {
                    debug!(%service, "Skipping hook list for unlinked service");
                    fetched.insert(*service, Vec::new());
                }
            }
            fetched
        };
        let (reactions, hooks) = tokio::join!(reactions, hooks);

        info!(
            hooks = hooks.values().map(Vec::len).sum::<usize>(),
            reactions = reactions.as_ref().map(Vec::len),
            refetched = stale.len(),
            "Collections fetched"
        );

        FetchedCollections {
            connections,
            hooks,
            reactions,
        }
    }
}

/// Fresh data for the collections one fetch covered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchedCollections {
    pub connections: BTreeMap<ServiceKind, bool>,
    pub hooks: BTreeMap<ServiceKind, Vec<Hook>>,
    pub reactions: Option<Vec<Reaction>>,
}

impl FetchedCollections {
    pub fn collections(&self) -> BTreeSet<Collection> {
        self.connections
            .keys()
            .map(|service| Collection::Connection(*service))
            .chain(self.hooks.keys().map(|service| Collection::Hooks(*service)))
            .chain(self.reactions.iter().map(|_| Collection::Reactions))
            .collect()
    }

    /// Drop every collection `keep` rejects.
    pub fn retain(&mut self, mut keep: impl FnMut(Collection) -> bool) {
        self.connections
            .retain(|service, _| keep(Collection::Connection(*service)));
        self.hooks.retain(|service, _| keep(Collection::Hooks(*service)));
        if self.reactions.is_some() && !keep(Collection::Reactions) {
            self.reactions = None;
        }
    }

    /// Overwrite the covered collections of `loaded`, leaving the rest.
    pub fn apply_to(self, loaded: &mut LoadedSnapshot) {
        loaded.connections.extend(self.connections);
        loaded.snapshot.hooks.extend(self.hooks);
        if let Some(reactions) = self.reactions {
            loaded.snapshot.reactions = reactions;
        }
    }
}
