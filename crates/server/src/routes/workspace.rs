use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{Datelike, Months, NaiveDate};
use serde::Deserialize;

use super::open_workspace;
use crate::{
    error::{AppError, Result},
    workspace::{
        views::{self, CalendarEntry, KanbanColumn, RfiAging},
        WorkspaceStats, WorkspaceView,
    },
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:id/workspace", get(get_workspace))
        .route("/:id/workspace/refresh", post(refresh_workspace))
        .route("/:id/workspace/stats", get(get_stats))
        .route("/:id/workspace/kanban", get(get_kanban))
        .route("/:id/workspace/calendar", get(get_calendar))
        .route("/:id/workspace/rfi-aging", get(get_rfi_aging))
}

async fn get_workspace(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<WorkspaceView>> {
    let (store, _) = open_workspace(&state, &id).await?;
    Ok(Json(store.view().await))
}

async fn refresh_workspace(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<WorkspaceView>> {
    let store = state.workspaces.get_or_create(&id).await;
    state.workspaces.load(&id, &store).await?;
    Ok(Json(store.view().await))
}

async fn get_stats(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<WorkspaceStats>> {
    let (store, _) = open_workspace(&state, &id).await?;
    Ok(Json(store.compute_stats().await?))
}

async fn get_kanban(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<KanbanColumn>>> {
    let (store, snapshot) = open_workspace(&state, &id).await?;
    Ok(Json(views::kanban_board(&snapshot, store.today())))
}

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// First and last day of the month containing `day`.
fn month_of(day: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    let first = day.with_day(1)?;
    let last = first.checked_add_months(Months::new(1))?.pred_opt()?;
    Some((first, last))
}

async fn get_calendar(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<Vec<CalendarEntry>>> {
    let (store, snapshot) = open_workspace(&state, &id).await?;
    let today = store.today();

    let (month_start, month_end) = month_of(today)
        .ok_or_else(|| AppError::Internal(format!("No calendar month for {today}")))?;
    let from = query.from.unwrap_or(month_start);
    let to = query.to.unwrap_or(month_end);
    if to < from {
        return Err(AppError::BadRequest(format!(
            "Calendar range ends ({to}) before it starts ({from})"
        )));
    }

    Ok(Json(views::calendar(&snapshot, from, to, today)))
}

async fn get_rfi_aging(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<RfiAging>>> {
    let (store, snapshot) = open_workspace(&state, &id).await?;
    Ok(Json(views::rfi_aging(&snapshot, store.today())))
}
