use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use super::{open_workspace, require_item};
use crate::{
    db::{
        drafts::{NewAttachment, RfiDraft},
        models::{Attachment, Rfi},
    },
    error::{AppError, Result},
    services::storage::{sanitize_file_name, StorageService},
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:id/rfis", post(create_rfi))
        .route("/:id/rfis/:item_id", put(update_rfi).delete(delete_rfi))
        .route("/:id/rfis/:item_id/attachments", post(upload_attachments))
        .route(
            "/:id/rfis/:item_id/attachments/:attachment_id",
            get(download_attachment).delete(delete_attachment),
        )
}

async fn create_rfi(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Json(body): Json<RfiDraft>,
) -> Result<(StatusCode, Json<Rfi>)> {
    body.validate().map_err(AppError::Validation)?;

    let rfi = state.gateway.insert_rfi(&project_id, body).await?;
    tracing::info!(rfi_id = %rfi.id, number = rfi.number, "RFI created");
    state.workspaces.refresh_if_open(&project_id).await;

    Ok((StatusCode::CREATED, Json(rfi)))
}

async fn update_rfi(
    State(state): State<AppState>,
    Path((project_id, rfi_id)): Path<(String, String)>,
    Json(body): Json<RfiDraft>,
) -> Result<Json<Rfi>> {
    body.validate().map_err(AppError::Validation)?;

    let (_, snapshot) = open_workspace(&state, &project_id).await?;
    require_item(&snapshot.rfis, &rfi_id)?;

    let rfi = state.gateway.update_rfi(&rfi_id, body).await?;
    state.workspaces.refresh_if_open(&project_id).await;

    Ok(Json(rfi))
}

async fn delete_rfi(
    State(state): State<AppState>,
    Path((project_id, rfi_id)): Path<(String, String)>,
) -> Result<StatusCode> {
    let (_, snapshot) = open_workspace(&state, &project_id).await?;
    require_item(&snapshot.rfis, &rfi_id)?;

    state.gateway.delete_rfi(&rfi_id).await?;
    if let Err(e) = state.storage.delete_rfi_dir(&project_id, &rfi_id).await {
        tracing::warn!(rfi_id = %rfi_id, error = %e, "Failed to remove RFI attachments");
    }
    state.workspaces.refresh_if_open(&project_id).await;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub uploaded: Vec<Attachment>,
    pub errors: Vec<String>,
}

async fn upload_attachments(
    State(state): State<AppState>,
    Path((project_id, rfi_id)): Path<(String, String)>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let (_, snapshot) = open_workspace(&state, &project_id).await?;
    require_item(&snapshot.rfis, &rfi_id)?;

    let mut uploaded = Vec::new();
    let mut errors = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read multipart field: {e}")))?
    {
        let file_name = match field.file_name() {
            Some(name) => sanitize_file_name(name),
            None => {
                errors.push("File field missing filename".to_string());
                continue;
            }
        };
        let content_type = field.content_type().map(str::to_string);

        let data = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                errors.push(format!("Failed to read file {file_name}: {e}"));
                continue;
            }
        };

        let attachment_id = Uuid::new_v4().to_string();
        let key = StorageService::attachment_key(&project_id, &rfi_id, &attachment_id, &file_name);

        if let Err(e) = state.storage.write(&key, &data).await {
            errors.push(format!("Failed to store {file_name}: {e}"));
            continue;
        }

        let record = NewAttachment {
            id: attachment_id,
            file_name: file_name.clone(),
            storage_path: key.clone(),
            content_type,
            size_bytes: data.len() as i64,
        };
        match state.gateway.add_rfi_attachment(&rfi_id, record).await {
            Ok(attachment) => uploaded.push(attachment),
            Err(e) => {
                errors.push(format!("Failed to record {file_name}: {e}"));
                // Don't leave an orphaned file behind
                let _ = state.storage.delete(&key).await;
            }
        }
    }

    if !uploaded.is_empty() {
        state.workspaces.refresh_if_open(&project_id).await;
    }

    Ok(Json(UploadResponse { uploaded, errors }))
}

async fn download_attachment(
    State(state): State<AppState>,
    Path((project_id, rfi_id, attachment_id)): Path<(String, String, String)>,
) -> Result<Response> {
    let (_, snapshot) = open_workspace(&state, &project_id).await?;
    let rfi = require_item(&snapshot.rfis, &rfi_id)?;
    let attachment = find_attachment(rfi, &attachment_id)?;

    let data = state.storage.read(&attachment.storage_path).await?;
    let content_type = attachment
        .content_type
        .clone()
        .unwrap_or_else(|| "application/octet-stream".to_string());
    let file_name: String = attachment
        .file_name
        .chars()
        .map(|c| if (c.is_ascii_graphic() && c != '"') || c == ' ' { c } else { '_' })
        .collect();
    let disposition = format!("attachment; filename=\"{file_name}\"");

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        data,
    )
        .into_response())
}

fn find_attachment<'a>(rfi: &'a Rfi, attachment_id: &str) -> Result<&'a Attachment> {
    rfi.attachments
        .iter()
        .find(|a| a.id == attachment_id)
        .ok_or_else(|| AppError::NotFound(format!("attachment {attachment_id} not found")))
}

async fn delete_attachment(
    State(state): State<AppState>,
    Path((project_id, rfi_id, attachment_id)): Path<(String, String, String)>,
) -> Result<StatusCode> {
    let (_, snapshot) = open_workspace(&state, &project_id).await?;
    let rfi = require_item(&snapshot.rfis, &rfi_id)?;
    find_attachment(rfi, &attachment_id)?;

    let attachment = state.gateway.delete_rfi_attachment(&attachment_id).await?;
    if let Err(e) = state.storage.delete(&attachment.storage_path).await {
        tracing::warn!(
            attachment_id = %attachment.id,
            error = %e,
            "Failed to remove attachment file"
        );
    }
    state.workspaces.refresh_if_open(&project_id).await;

    Ok(StatusCode::NO_CONTENT)
}
