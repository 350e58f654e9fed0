use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::gateway::GatewayError;
use crate::workspace::WorkspaceError;

/// Error type for HTTP handlers. Renders as `{"error", "code"}` JSON.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

fn internal(error: &dyn std::fmt::Display) -> (StatusCode, &'static str, String) {
    tracing::error!(error = %error, "Internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

fn classify_gateway_error(err: &GatewayError) -> (StatusCode, &'static str, String) {
    match err {
        GatewayError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string()),
        GatewayError::Rejected(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
        GatewayError::Unavailable(msg) => {
            tracing::warn!(error = %msg, "Persistence unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "UNAVAILABLE",
                "Storage is temporarily unavailable".to_string(),
            )
        }
        GatewayError::Corrupt { .. } => internal(err),
        GatewayError::Database(db) => classify_sqlx_error(db),
    }
}

/// SQLite reports uniqueness violations as extended codes 2067 (UNIQUE) and
/// 1555 (PRIMARY KEY).
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err)
            if matches!(db_err.code().as_deref(), Some("2067") | Some("1555")) =>
        {
            (
                StatusCode::CONFLICT,
                "CONFLICT",
                "A record with the same number already exists".to_string(),
            )
        }
        other => internal(other),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut prior_status = None;
        let (status, code, message) = match &self {
            AppError::Workspace(err) => match err {
                WorkspaceError::NotFound { .. } => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string())
                }
                WorkspaceError::InvalidState { .. } => {
                    (StatusCode::CONFLICT, "INVALID_STATE", err.to_string())
                }
                WorkspaceError::Superseded { .. } => {
                    (StatusCode::CONFLICT, "SUPERSEDED", err.to_string())
                }
                WorkspaceError::LoadFailed { .. } => {
                    tracing::warn!(error = %err, "Workspace load failed");
                    (StatusCode::BAD_GATEWAY, "LOAD_FAILED", err.to_string())
                }
                WorkspaceError::MutationFailed {
                    prior_status: prior,
                    ..
                } => {
                    prior_status = Some(*prior);
                    (StatusCode::BAD_GATEWAY, "MUTATION_FAILED", err.to_string())
                }
            },
            AppError::Gateway(err) => classify_gateway_error(err),
            AppError::Validation(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "VALIDATION_ERROR",
                msg.clone(),
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Internal(msg) => internal(msg),
        };

        let mut body = json!({
            "error": message,
            "code": code,
        });
        if let Some(prior) = prior_status {
            body["prior_status"] = json!(prior);
        }

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::TaskStatus;
    use crate::workspace::WorkspaceState;
    use http_body_util::BodyExt;

    async fn render(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn mutation_failures_report_the_prior_status() {
        let err = AppError::from(WorkspaceError::MutationFailed {
            task_id: "t-1".into(),
            prior_status: TaskStatus::InProgress,
            attempted: TaskStatus::Completed,
            source: GatewayError::Unavailable("disk gone".into()),
        });
        let (status, body) = render(err).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["code"], "MUTATION_FAILED");
        assert_eq!(body["prior_status"], "In Progress");
    }

    #[tokio::test]
    async fn invalid_state_is_a_conflict() {
        let err = AppError::from(WorkspaceError::InvalidState {
            operation: "update_task_status",
            state: WorkspaceState::Loading,
        });
        let (status, body) = render(err).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "INVALID_STATE");
        assert!(body.get("prior_status").is_none());
    }

    #[tokio::test]
    async fn internal_details_are_not_leaked() {
        let (status, body) = render(AppError::Internal("secret path /srv/x".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "An internal error occurred");
    }
}
