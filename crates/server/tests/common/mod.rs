#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use sitebook_server::{
    build_router,
    config::Config,
    db::drafts::{ProjectDraft, TaskDraft},
    db::models::{Priority, TaskStatus},
    gateway::{MemoryGateway, PersistenceGateway},
    services::storage::StorageService,
    workspace::{FixedClock, WorkspaceRegistry},
    AppState,
};

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// "Today" for every test that depends on overdue calculations.
pub fn today() -> NaiveDate {
    day(2026, 3, 10)
}

pub fn project_draft(number: &str) -> ProjectDraft {
    ProjectDraft {
        number: number.into(),
        name: format!("Project {number}"),
        ..ProjectDraft::default()
    }
}

pub fn task_draft(title: &str, status: TaskStatus, due: Option<NaiveDate>) -> TaskDraft {
    TaskDraft {
        title: title.into(),
        status,
        priority: Priority::Medium,
        due_date: due,
        ..TaskDraft::default()
    }
}

pub struct Seeded {
    pub project_id: String,
    pub task_ids: Vec<String>,
}

/// Project SNB-0001 with a completed task, an in-progress task and an
/// in-progress task that was due yesterday.
pub async fn seed_snb_0001(gateway: &dyn PersistenceGateway) -> Seeded {
    let project = gateway.insert_project(project_draft("SNB-0001")).await.unwrap();
    let yesterday = today().pred_opt().unwrap();

    let mut task_ids = Vec::new();
    for draft in [
        task_draft("Order storefront glass", TaskStatus::Completed, Some(yesterday)),
        task_draft("Frame partitions", TaskStatus::InProgress, None),
        task_draft("Submit door hardware", TaskStatus::InProgress, Some(yesterday)),
    ] {
        task_ids.push(gateway.insert_task(&project.id, draft).await.unwrap().id);
    }

    Seeded {
        project_id: project.id,
        task_ids,
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub gateway: Arc<dyn PersistenceGateway>,
    pub storage_dir: TempDir,
}

impl TestApp {
    pub fn new(gateway: Arc<dyn PersistenceGateway>) -> Self {
        let storage_dir = tempfile::tempdir().unwrap();
        let config = Config {
            port: 0,
            database_url: "sqlite::memory:".into(),
            db_max_connections: 1,
            storage_path: storage_dir.path().to_string_lossy().into_owned(),
            static_dir: storage_dir.path().join("static").to_string_lossy().into_owned(),
        };
        let workspaces = Arc::new(WorkspaceRegistry::with_clock(
            Arc::clone(&gateway),
            Arc::new(FixedClock(today())),
        ));
        let storage = StorageService::new(storage_dir.path());
        let state = AppState::with_workspaces(config, Arc::clone(&gateway), workspaces, storage);

        Self {
            router: build_router(state.clone()),
            state,
            gateway,
            storage_dir,
        }
    }

    pub fn in_memory() -> (Self, Arc<MemoryGateway>) {
        let gateway = Arc::new(MemoryGateway::new());
        (Self::new(gateway.clone()), gateway)
    }

    pub async fn request(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, body.to_vec())
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let (status, body) = self.request(request).await;
        (status, parse(&body))
    }

    pub async fn send_json(&self, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, body) = self.request(request).await;
        (status, parse(&body))
    }

    pub async fn delete(&self, uri: &str) -> StatusCode {
        let request = Request::builder()
            .method("DELETE")
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        self.request(request).await.0
    }
}

fn parse(body: &[u8]) -> Value {
    if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(body)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
    }
}
