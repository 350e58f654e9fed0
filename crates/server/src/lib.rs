use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod routes;
pub mod services;
pub mod workspace;

use config::Config;
use gateway::PersistenceGateway;
use services::storage::StorageService;
use workspace::WorkspaceRegistry;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub gateway: Arc<dyn PersistenceGateway>,
    pub workspaces: Arc<WorkspaceRegistry>,
    pub storage: StorageService,
}

impl AppState {
    pub fn new(config: Config, gateway: Arc<dyn PersistenceGateway>) -> Self {
        let storage = StorageService::new(&config.storage_path);
        Self::with_workspaces(
            config,
            Arc::clone(&gateway),
            Arc::new(WorkspaceRegistry::new(gateway)),
            storage,
        )
    }

    pub fn with_workspaces(
        config: Config,
        gateway: Arc<dyn PersistenceGateway>,
        workspaces: Arc<WorkspaceRegistry>,
        storage: StorageService,
    ) -> Self {
        Self {
            config,
            gateway,
            workspaces,
            storage,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ws/projects/:id", get(handlers::ws::ws_handler))
        .nest("/api/projects", routes::router())
        .fallback(handlers::spa::serve_spa)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

async fn health_check() -> &'static str {
    "OK"
}
