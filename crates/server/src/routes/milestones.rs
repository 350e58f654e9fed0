use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{post, put},
    Json, Router,
};

use super::{open_workspace, require_item};
use crate::{
    db::{drafts::MilestoneDraft, models::Milestone},
    error::{AppError, Result},
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:id/milestones", post(create_milestone))
        .route(
            "/:id/milestones/:item_id",
            put(update_milestone).delete(delete_milestone),
        )
}

async fn create_milestone(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Json(body): Json<MilestoneDraft>,
) -> Result<(StatusCode, Json<Milestone>)> {
    body.validate().map_err(AppError::Validation)?;

    let milestone = state.gateway.insert_milestone(&project_id, body).await?;
    state.workspaces.refresh_if_open(&project_id).await;

    Ok((StatusCode::CREATED, Json(milestone)))
}

async fn update_milestone(
    State(state): State<AppState>,
    Path((project_id, milestone_id)): Path<(String, String)>,
    Json(body): Json<MilestoneDraft>,
) -> Result<Json<Milestone>> {
    body.validate().map_err(AppError::Validation)?;

    let (_, snapshot) = open_workspace(&state, &project_id).await?;
    require_item(&snapshot.milestones, &milestone_id)?;

    let milestone = state.gateway.update_milestone(&milestone_id, body).await?;
    state.workspaces.refresh_if_open(&project_id).await;

    Ok(Json(milestone))
}

async fn delete_milestone(
    State(state): State<AppState>,
    Path((project_id, milestone_id)): Path<(String, String)>,
) -> Result<StatusCode> {
    let (_, snapshot) = open_workspace(&state, &project_id).await?;
    require_item(&snapshot.milestones, &milestone_id)?;

    state.gateway.delete_milestone(&milestone_id).await?;
    state.workspaces.refresh_if_open(&project_id).await;

    Ok(StatusCode::NO_CONTENT)
}
