use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use super::open_workspace;
use crate::{error::Result, services::csv_export, AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:id/export/tasks.csv", get(export_tasks))
        .route("/:id/export/rfis.csv", get(export_rfis))
        .route("/:id/export/submittals.csv", get(export_submittals))
}

fn csv_response(project_number: &str, list: &str, body: String) -> Response {
    let stem: String = project_number
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        .collect();
    let disposition = format!("attachment; filename=\"{stem}-{list}.csv\"");
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response()
}

async fn export_tasks(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response> {
    let (_, snapshot) = open_workspace(&state, &id).await?;
    let body = csv_export::tasks_csv(&snapshot.tasks);
    Ok(csv_response(&snapshot.project.number, "tasks", body))
}

async fn export_rfis(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response> {
    let (_, snapshot) = open_workspace(&state, &id).await?;
    let body = csv_export::rfis_csv(&snapshot.rfis);
    Ok(csv_response(&snapshot.project.number, "rfis", body))
}

async fn export_submittals(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response> {
    let (_, snapshot) = open_workspace(&state, &id).await?;
    let body = csv_export::submittals_csv(&snapshot.submittals);
    Ok(csv_response(&snapshot.project.number, "submittals", body))
}
