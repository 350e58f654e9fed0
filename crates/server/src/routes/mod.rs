use std::sync::Arc;

use axum::Router;

use crate::{
    error::{AppError, Result},
    workspace::{ProjectWorkspaceStore, Tracked, WorkspaceSnapshot},
    AppState,
};

pub mod export;
pub mod milestones;
pub mod projects;
pub mod rfis;
pub mod submittals;
pub mod tasks;
pub mod workspace;

/// Everything mounted under `/api/projects`.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(projects::router())
        .merge(workspace::router())
        .merge(tasks::router())
        .merge(rfis::router())
        .merge(submittals::router())
        .merge(milestones::router())
        .merge(export::router())
}

// Loads the project's workspace on first use.
async fn open_workspace(
    state: &AppState,
    project_id: &str,
) -> Result<(Arc<ProjectWorkspaceStore>, Arc<WorkspaceSnapshot>)> {
    Ok(state.workspaces.ensure_loaded(project_id).await?)
}

// Child records are addressed by id; this keeps them scoped to the project in
// the path.
fn require_item<'a, T: Tracked>(items: &'a [T], id: &str) -> Result<&'a T> {
    items
        .iter()
        .find(|item| item.id() == id)
        .ok_or_else(|| AppError::NotFound(format!("{} {id} not found", T::KIND.as_str())))
}
