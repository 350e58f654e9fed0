// Open workspaces, one store per project, shared by HTTP handlers and
// WebSocket subscribers.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::{
    Clock, ProjectWorkspaceStore, Result, SystemClock, WorkspaceError, WorkspaceSnapshot,
    WorkspaceState,
};
use crate::gateway::PersistenceGateway;

pub struct WorkspaceRegistry {
    gateway: Arc<dyn PersistenceGateway>,
    clock: Arc<dyn Clock>,
    stores: RwLock<HashMap<String, Arc<ProjectWorkspaceStore>>>,
}

impl WorkspaceRegistry {
    pub fn new(gateway: Arc<dyn PersistenceGateway>) -> Self {
        Self::with_clock(gateway, Arc::new(SystemClock))
    }

    pub fn with_clock(gateway: Arc<dyn PersistenceGateway>, clock: Arc<dyn Clock>) -> Self {
        Self {
            gateway,
            clock,
            stores: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, project_id: &str) -> Option<Arc<ProjectWorkspaceStore>> {
        self.stores.read().await.get(project_id).cloned()
    }

    pub async fn get_or_create(&self, project_id: &str) -> Arc<ProjectWorkspaceStore> {
        if let Some(store) = self.get(project_id).await {
            return store;
        }

        let mut stores = self.stores.write().await;
        let store = stores.entry(project_id.to_string()).or_insert_with(|| {
            Arc::new(ProjectWorkspaceStore::with_clock(
                Arc::clone(&self.gateway),
                Arc::clone(&self.clock),
            ))
        });
        Arc::clone(store)
    }

    pub async fn remove(&self, project_id: &str) -> Option<Arc<ProjectWorkspaceStore>> {
        self.stores.write().await.remove(project_id)
    }

    /// Returns the project's store with a snapshot installed, loading it
    /// first if it has never loaded or its last load failed.
    pub async fn ensure_loaded(
        &self,
        project_id: &str,
    ) -> Result<(Arc<ProjectWorkspaceStore>, Arc<WorkspaceSnapshot>)> {
        let store = self.get_or_create(project_id).await;
        let view = store.view().await;
        let snapshot = match (view.state, view.snapshot) {
            (WorkspaceState::Ready | WorkspaceState::Loading, Some(snapshot)) => snapshot,
            _ => self.load(project_id, &store).await?,
        };
        Ok((store, snapshot))
    }

    /// Loads `store` and drops it from the registry if the project does not
    /// exist. A store that replaced it in the meantime is left alone.
    pub async fn load(
        &self,
        project_id: &str,
        store: &Arc<ProjectWorkspaceStore>,
    ) -> Result<Arc<WorkspaceSnapshot>> {
        match store.load(project_id).await {
            Err(err @ WorkspaceError::NotFound { entity: "project", .. }) => {
                let mut stores = self.stores.write().await;
                if stores
                    .get(project_id)
                    .is_some_and(|current| Arc::ptr_eq(current, store))
                {
                    stores.remove(project_id);
                }
                Err(err)
            }
            other => other,
        }
    }

    pub async fn open_count(&self) -> usize {
        self.stores.read().await.len()
    }

    /// Reloads the project's workspace if one is open, so subscribers pick
    /// up a write made outside the store.
    pub async fn refresh_if_open(&self, project_id: &str) {
        let Some(store) = self.get(project_id).await else {
            return;
        };
        if store.state().await == WorkspaceState::Uninitialized {
            return;
        }
        if let Err(err) = store.refresh().await {
            tracing::warn!(project_id, error = %err, "Workspace refresh after write failed");
        }
    }
}
