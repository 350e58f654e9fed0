use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::{
    db::{drafts::ProjectDraft, models::Project},
    error::{AppError, Result},
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_projects).post(create_project))
        .route(
            "/:id",
            get(get_project).put(update_project).delete(delete_project),
        )
}

#[derive(Debug, Serialize)]
pub struct ProjectListResponse {
    pub projects: Vec<Project>,
}

async fn list_projects(State(state): State<AppState>) -> Result<Json<ProjectListResponse>> {
    let projects = state.gateway.list_projects().await?;
    Ok(Json(ProjectListResponse { projects }))
}

async fn create_project(
    State(state): State<AppState>,
    Json(body): Json<ProjectDraft>,
) -> Result<(StatusCode, Json<Project>)> {
    body.validate().map_err(AppError::Validation)?;

    let project = state.gateway.insert_project(body).await?;
    tracing::info!(project_id = %project.id, number = %project.number, "Project created");

    Ok((StatusCode::CREATED, Json(project)))
}

async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Project>> {
    let project = state
        .gateway
        .get_project(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;

    Ok(Json(project))
}

async fn update_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ProjectDraft>,
) -> Result<Json<Project>> {
    body.validate().map_err(AppError::Validation)?;

    let project = state.gateway.update_project(&id, body).await?;
    state.workspaces.refresh_if_open(&id).await;

    Ok(Json(project))
}

async fn delete_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    // Cascades to every child record
    state.gateway.delete_project(&id).await?;
    state.workspaces.remove(&id).await;
    // The rows are gone; leftover files only cost disk space
    if let Err(e) = state.storage.delete_project_dir(&id).await {
        tracing::warn!(project_id = %id, error = %e, "Failed to remove project attachments");
    }

    tracing::info!(project_id = %id, "Project deleted");
    Ok(StatusCode::NO_CONTENT)
}
