use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{patch, post, put},
    Json, Router,
};
use serde::Deserialize;

use super::{open_workspace, require_item};
use crate::{
    db::{
        drafts::TaskDraft,
        models::{Task, TaskStatus},
    },
    error::{AppError, Result},
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:id/tasks", post(create_task))
        .route("/:id/tasks/:item_id", put(update_task).delete(delete_task))
        .route("/:id/tasks/:item_id/status", patch(update_task_status))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: TaskStatus,
}

async fn create_task(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Json(body): Json<TaskDraft>,
) -> Result<(StatusCode, Json<Task>)> {
    body.validate().map_err(AppError::Validation)?;

    let task = state.gateway.insert_task(&project_id, body).await?;
    state.workspaces.refresh_if_open(&project_id).await;

    Ok((StatusCode::CREATED, Json(task)))
}

async fn update_task(
    State(state): State<AppState>,
    Path((project_id, task_id)): Path<(String, String)>,
    Json(body): Json<TaskDraft>,
) -> Result<Json<Task>> {
    body.validate().map_err(AppError::Validation)?;

    let (_, snapshot) = open_workspace(&state, &project_id).await?;
    require_item(&snapshot.tasks, &task_id)?;

    let task = state.gateway.update_task(&task_id, body).await?;
    state.workspaces.refresh_if_open(&project_id).await;

    Ok(Json(task))
}

/// Kanban drag-and-drop. Goes through the workspace store so every
/// subscriber sees the move immediately and sees it undone if the write
/// fails.
async fn update_task_status(
    State(state): State<AppState>,
    Path((project_id, task_id)): Path<(String, String)>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<Task>> {
    let (store, _) = open_workspace(&state, &project_id).await?;
    store.update_task_status(&task_id, body.status).await?;

    let snapshot = store
        .snapshot()
        .await
        .ok_or_else(|| AppError::NotFound(format!("task {task_id} not found")))?;
    let task = require_item(&snapshot.tasks, &task_id)?;

    Ok(Json(task.clone()))
}

async fn delete_task(
    State(state): State<AppState>,
    Path((project_id, task_id)): Path<(String, String)>,
) -> Result<StatusCode> {
    let (_, snapshot) = open_workspace(&state, &project_id).await?;
    require_item(&snapshot.tasks, &task_id)?;

    state.gateway.delete_task(&task_id).await?;
    state.workspaces.refresh_if_open(&project_id).await;

    Ok(StatusCode::NO_CONTENT)
}
