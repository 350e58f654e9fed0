mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{seed_snb_0001, TestApp};

#[tokio::test]
async fn missing_project_is_a_json_404() {
    let (app, _) = TestApp::in_memory();

    let (status, body) = app.get("/api/projects/nope/workspace").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
    assert!(body["error"].as_str().unwrap().contains("nope"));

    let (status, _) = app.get("/api/projects/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn requests_for_missing_projects_leave_no_open_workspaces() {
    let (app, _) = TestApp::in_memory();

    for i in 0..50 {
        let (status, _) = app.get(&format!("/api/projects/bogus-{i}/workspace")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
    let (status, _) = app
        .send_json("POST", "/api/projects/bogus-0/workspace/refresh", json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(app.state.workspaces.open_count().await, 0);
    assert!(app.state.workspaces.get("bogus-0").await.is_none());
}

#[tokio::test]
async fn invalid_drafts_are_unprocessable() {
    let (app, gateway) = TestApp::in_memory();
    let seeded = seed_snb_0001(gateway.as_ref()).await;

    let (status, body) = app
        .send_json("POST", "/api/projects", json!({ "number": "", "name": "No number" }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = app
        .send_json(
            "POST",
            &format!("/api/projects/{}/tasks", seeded.project_id),
            json!({
                "title": "Call supplier",
                "assignee": { "kind": "external", "name": "Pat", "email": "not-an-email" }
            }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn failed_load_is_a_bad_gateway_and_recovers() {
    let (app, gateway) = TestApp::in_memory();
    let seeded = seed_snb_0001(gateway.as_ref()).await;
    let uri = format!("/api/projects/{}/workspace", seeded.project_id);

    gateway.fail("list_submittals").await;
    let (status, body) = app.get(&uri).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "LOAD_FAILED");

    gateway.recover("list_submittals").await;
    let (status, view) = app.get(&uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["state"], "ready");
}

#[tokio::test]
async fn unknown_task_in_a_loaded_workspace() {
    let (app, gateway) = TestApp::in_memory();
    let seeded = seed_snb_0001(gateway.as_ref()).await;

    let (status, body) = app
        .send_json(
            "PATCH",
            &format!("/api/projects/{}/tasks/ghost/status", seeded.project_id),
            json!({ "status": "Completed" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn unknown_api_paths_fall_through_to_the_spa() {
    let (app, _) = TestApp::in_memory();
    // No static bundle in the test storage dir
    let (status, _) = app.get("/projects/123/kanban").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
