use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{post, put},
    Json, Router,
};

use super::{open_workspace, require_item};
use crate::{
    db::{drafts::SubmittalDraft, models::Submittal},
    error::{AppError, Result},
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:id/submittals", post(create_submittal))
        .route(
            "/:id/submittals/:item_id",
            put(update_submittal).delete(delete_submittal),
        )
        .route("/:id/submittals/:item_id/revise", post(revise_submittal))
}

async fn create_submittal(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Json(body): Json<SubmittalDraft>,
) -> Result<(StatusCode, Json<Submittal>)> {
    body.validate().map_err(AppError::Validation)?;

    let submittal = state.gateway.insert_submittal(&project_id, body).await?;
    state.workspaces.refresh_if_open(&project_id).await;

    Ok((StatusCode::CREATED, Json(submittal)))
}

async fn update_submittal(
    State(state): State<AppState>,
    Path((project_id, submittal_id)): Path<(String, String)>,
    Json(body): Json<SubmittalDraft>,
) -> Result<Json<Submittal>> {
    body.validate().map_err(AppError::Validation)?;

    let (_, snapshot) = open_workspace(&state, &project_id).await?;
    require_item(&snapshot.submittals, &submittal_id)?;

    let submittal = state.gateway.update_submittal(&submittal_id, body).await?;
    state.workspaces.refresh_if_open(&project_id).await;

    Ok(Json(submittal))
}

/// Resubmission after "Revise and Resubmit" or "Rejected".
async fn revise_submittal(
    State(state): State<AppState>,
    Path((project_id, submittal_id)): Path<(String, String)>,
) -> Result<Json<Submittal>> {
    let (_, snapshot) = open_workspace(&state, &project_id).await?;
    require_item(&snapshot.submittals, &submittal_id)?;

    let submittal = state.gateway.revise_submittal(&submittal_id).await?;
    tracing::info!(
        submittal_id = %submittal.id,
        revision = submittal.revision,
        "Submittal revised"
    );
    state.workspaces.refresh_if_open(&project_id).await;

    Ok(Json(submittal))
}

async fn delete_submittal(
    State(state): State<AppState>,
    Path((project_id, submittal_id)): Path<(String, String)>,
) -> Result<StatusCode> {
    let (_, snapshot) = open_workspace(&state, &project_id).await?;
    require_item(&snapshot.submittals, &submittal_id)?;

    state.gateway.delete_submittal(&submittal_id).await?;
    state.workspaces.refresh_if_open(&project_id).await;

    Ok(StatusCode::NO_CONTENT)
}
