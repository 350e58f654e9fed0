// Per-project workspace: one consistent, versioned snapshot of a project and
// its tasks, RFIs, submittals and milestones, shared by every view that
// renders them.

pub mod registry;
pub mod stats;
pub mod status;
pub mod views;

#[cfg(test)]
pub(crate) mod fixtures;

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tokio::sync::{watch, Mutex, MutexGuard};

use crate::db::models::{Milestone, Project, Rfi, Submittal, Task, TaskStatus};
use crate::gateway::{GatewayError, PersistenceGateway};

pub use registry::WorkspaceRegistry;
pub use stats::WorkspaceStats;
pub use status::{is_overdue, terminal_statuses, EntityKind, Tracked};

/// Source of "today" for overdue calculations.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceState {
    Uninitialized,
    Loading,
    Ready,
    Failed,
}

impl fmt::Display for WorkspaceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WorkspaceState::Uninitialized => "uninitialized",
            WorkspaceState::Loading => "loading",
            WorkspaceState::Ready => "ready",
            WorkspaceState::Failed => "failed",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("failed to load project {project_id}: {source}")]
    LoadFailed {
        project_id: String,
        #[source]
        source: GatewayError,
    },

    #[error("failed to move task {task_id} to {attempted}: {source}")]
    MutationFailed {
        task_id: String,
        /// The status the task had before the attempt, for rolling back.
        prior_status: TaskStatus,
        attempted: TaskStatus,
        #[source]
        source: GatewayError,
    },

    #[error("{operation} is not allowed while the workspace is {state}")]
    InvalidState {
        operation: &'static str,
        state: WorkspaceState,
    },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("load for snapshot version {version} was overtaken by a newer load")]
    Superseded { version: u64 },
}

pub type Result<T> = std::result::Result<T, WorkspaceError>;

/// Immutable view of one project's records. A new version is installed by
/// every completed load; status patches modify a copy of the current version.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkspaceSnapshot {
    pub version: u64,
    pub project: Project,
    pub tasks: Vec<Task>,
    pub rfis: Vec<Rfi>,
    pub submittals: Vec<Submittal>,
    pub milestones: Vec<Milestone>,
    pub loaded_at: DateTime<Utc>,
}

impl WorkspaceSnapshot {
    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    fn task_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    pub fn stats(&self, today: NaiveDate) -> WorkspaceStats {
        WorkspaceStats::compute(self, today)
    }
}

/// What subscribers see: the lifecycle state plus the latest snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceView {
    pub state: WorkspaceState,
    pub project_id: Option<String>,
    pub snapshot: Option<Arc<WorkspaceSnapshot>>,
    /// Why the last load failed, while in `Failed`.
    pub error: Option<String>,
}

struct Inner {
    state: WorkspaceState,
    project_id: Option<String>,
    snapshot: Option<Arc<WorkspaceSnapshot>>,
    latest_ticket: u64,
    last_error: Option<String>,
}

impl Inner {
    fn view(&self) -> WorkspaceView {
        WorkspaceView {
            state: self.state,
            project_id: self.project_id.clone(),
            snapshot: self.snapshot.clone(),
            error: self.last_error.clone(),
        }
    }
}

pub struct ProjectWorkspaceStore {
    gateway: Arc<dyn PersistenceGateway>,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner>,
    views: watch::Sender<WorkspaceView>,
}

impl fmt::Debug for ProjectWorkspaceStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectWorkspaceStore").finish_non_exhaustive()
    }
}

impl ProjectWorkspaceStore {
    pub fn new(gateway: Arc<dyn PersistenceGateway>) -> Self {
        Self::with_clock(gateway, Arc::new(SystemClock))
    }

    pub fn with_clock(gateway: Arc<dyn PersistenceGateway>, clock: Arc<dyn Clock>) -> Self {
        let inner = Inner {
            state: WorkspaceState::Uninitialized,
            project_id: None,
            snapshot: None,
            latest_ticket: 0,
            last_error: None,
        };
        let (views, _) = watch::channel(inner.view());
        Self {
            gateway,
            clock,
            inner: Mutex::new(inner),
            views,
        }
    }

    /// Receives a new [`WorkspaceView`] on every state or snapshot change.
    pub fn subscribe(&self) -> watch::Receiver<WorkspaceView> {
        self.views.subscribe()
    }

    pub async fn view(&self) -> WorkspaceView {
        self.inner.lock().await.view()
    }

    pub async fn state(&self) -> WorkspaceState {
        self.inner.lock().await.state
    }

    pub async fn snapshot(&self) -> Option<Arc<WorkspaceSnapshot>> {
        self.inner.lock().await.snapshot.clone()
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    fn publish(&self, inner: &MutexGuard<'_, Inner>) {
        self.views.send_replace(inner.view());
    }

    /// Fetches the project and all of its child records concurrently and
    /// installs them as a new snapshot version. Any failed fetch fails the
    /// whole load; nothing partial is ever installed.
    #[tracing::instrument(skip(self))]
    pub async fn load(&self, project_id: &str) -> Result<Arc<WorkspaceSnapshot>> {
        let ticket = {
            let mut inner = self.inner.lock().await;
            inner.latest_ticket += 1;
            if inner.project_id.as_deref() != Some(project_id) {
                inner.project_id = Some(project_id.to_string());
                inner.snapshot = None;
            }
            inner.state = WorkspaceState::Loading;
            inner.last_error = None;
            self.publish(&inner);
            inner.latest_ticket
        };

        let outcome = self.fetch(project_id, ticket).await;

        let mut inner = self.inner.lock().await;
        if inner.latest_ticket != ticket {
            tracing::debug!(version = ticket, "Discarding superseded load");
            return Err(WorkspaceError::Superseded { version: ticket });
        }

        match outcome {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                tracing::info!(
                    version = ticket,
                    tasks = snapshot.tasks.len(),
                    rfis = snapshot.rfis.len(),
                    submittals = snapshot.submittals.len(),
                    milestones = snapshot.milestones.len(),
                    "Workspace loaded"
                );
                inner.snapshot = Some(Arc::clone(&snapshot));
                inner.state = WorkspaceState::Ready;
                self.publish(&inner);
                Ok(snapshot)
            }
            Err(err) => {
                tracing::warn!(error = %err, "Workspace load failed");
                inner.state = WorkspaceState::Failed;
                inner.last_error = Some(err.to_string());
                self.publish(&inner);
                Err(err)
            }
        }
    }

    async fn fetch(&self, project_id: &str, version: u64) -> Result<WorkspaceSnapshot> {
        let gateway = &self.gateway;
        let (project, tasks, rfis, submittals, milestones) = tokio::try_join!(
            gateway.get_project(project_id),
            gateway.list_tasks(project_id),
            gateway.list_rfis(project_id),
            gateway.list_submittals(project_id),
            gateway.list_milestones(project_id),
        )
        .map_err(|source| WorkspaceError::LoadFailed {
            project_id: project_id.to_string(),
            source,
        })?;

        let project = project.ok_or_else(|| WorkspaceError::NotFound {
            entity: "project",
            id: project_id.to_string(),
        })?;

        Ok(WorkspaceSnapshot {
            version,
            project,
            tasks,
            rfis,
            submittals,
            milestones,
            loaded_at: Utc::now(),
        })
    }

    /// Reloads the project currently held by the workspace.
    pub async fn refresh(&self) -> Result<Arc<WorkspaceSnapshot>> {
        let project_id = {
            let inner = self.inner.lock().await;
            inner
                .project_id
                .clone()
                .ok_or(WorkspaceError::InvalidState {
                    operation: "refresh",
                    state: inner.state,
                })?
        };
        self.load(&project_id).await
    }

    /// Moves a task to `status`. The snapshot is patched before the write so
    /// that drag-and-drop feels immediate; a failed write rolls the patch back.
    /// If a newer snapshot has been installed by the time the write returns,
    /// the result is not applied: the newer snapshot already reflects the
    /// server.
    #[tracing::instrument(skip(self))]
    pub async fn update_task_status(&self, task_id: &str, status: TaskStatus) -> Result<()> {
        let (version, prior_status) = {
            let mut inner = self.inner.lock().await;
            if inner.state != WorkspaceState::Ready {
                return Err(WorkspaceError::InvalidState {
                    operation: "update_task_status",
                    state: inner.state,
                });
            }
            let Some(current) = inner.snapshot.as_mut() else {
                return Err(WorkspaceError::InvalidState {
                    operation: "update_task_status",
                    state: WorkspaceState::Uninitialized,
                });
            };
            let prior_status = current
                .task(task_id)
                .map(|task| task.status)
                .ok_or_else(|| WorkspaceError::NotFound {
                    entity: "task",
                    id: task_id.to_string(),
                })?;
            if prior_status == status {
                return Ok(());
            }

            let snapshot = Arc::make_mut(current);
            if let Some(task) = snapshot.task_mut(task_id) {
                task.status = status;
            }
            let version = snapshot.version;
            self.publish(&inner);
            (version, prior_status)
        };

        let outcome = self.gateway.update_task_status(task_id, status).await;

        let mut inner = self.inner.lock().await;
        let is_current = inner
            .snapshot
            .as_ref()
            .is_some_and(|snapshot| snapshot.version == version);

        match outcome {
            Ok(updated) if is_current => {
                if let Some(task) = inner
                    .snapshot
                    .as_mut()
                    .map(Arc::make_mut)
                    .and_then(|snapshot| snapshot.task_mut(task_id))
                {
                    task.status = updated.status;
                    task.updated_at = updated.updated_at;
                }
                self.publish(&inner);
                Ok(())
            }
            Ok(_) => {
                tracing::debug!(version, "Status write landed after a newer snapshot");
                Ok(())
            }
            Err(source) => {
                tracing::warn!(error = %source, "Task status write failed");
                if is_current {
                    if let Some(task) = inner
                        .snapshot
                        .as_mut()
                        .map(Arc::make_mut)
                        .and_then(|snapshot| snapshot.task_mut(task_id))
                    {
                        if task.status == status {
                            task.status = prior_status;
                        }
                    }
                    self.publish(&inner);
                }
                Err(WorkspaceError::MutationFailed {
                    task_id: task_id.to_string(),
                    prior_status,
                    attempted: status,
                    source,
                })
            }
        }
    }

    /// Overview counters over the current snapshot.
    pub async fn compute_stats(&self) -> Result<WorkspaceStats> {
        let inner = self.inner.lock().await;
        let snapshot = inner
            .snapshot
            .as_ref()
            .ok_or(WorkspaceError::InvalidState {
                operation: "compute_stats",
                state: inner.state,
            })?;
        Ok(snapshot.stats(self.clock.today()))
    }

    pub fn is_overdue<T: Tracked>(&self, entity: &T) -> bool {
        entity.is_overdue(self.clock.today())
    }
}
