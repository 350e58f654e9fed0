use std::path::Path;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    response::{IntoResponse, Response},
};
use tower::util::ServiceExt;
use tower_http::services::ServeDir;

use crate::AppState;

/// Serves built frontend assets, falling back to `index.html` for client-side
/// routes.
pub async fn serve_spa(State(state): State<AppState>, req: Request<Body>) -> Response {
    let static_dir = Path::new(&state.config.static_dir);
    let requested = req.uri().path().trim_start_matches('/');

    if !requested.is_empty() && static_dir.join(requested).is_file() {
        return match ServeDir::new(static_dir).oneshot(req).await {
            Ok(res) => res.into_response(),
            Err(never) => match never {},
        };
    }

    match tokio::fs::read(static_dir.join("index.html")).await {
        Ok(contents) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/html")],
            contents,
        )
            .into_response(),
        Err(_) => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}
