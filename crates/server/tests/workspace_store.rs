mod common;

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;

use common::{seed_snb_0001, today};
use sitebook_server::db::drafts::TaskDraft;
use sitebook_server::db::models::TaskStatus;
use sitebook_server::gateway::{GatewayError, MemoryGateway, PersistenceGateway};
use sitebook_server::workspace::{
    FixedClock, ProjectWorkspaceStore, WorkspaceError, WorkspaceState, WorkspaceStats,
};

fn store_for(gateway: &Arc<MemoryGateway>) -> Arc<ProjectWorkspaceStore> {
    Arc::new(ProjectWorkspaceStore::with_clock(
        gateway.clone(),
        Arc::new(FixedClock(today())),
    ))
}

async fn task_status(store: &ProjectWorkspaceStore, task_id: &str) -> Option<TaskStatus> {
    let snapshot = store.snapshot().await?;
    snapshot.task(task_id).map(|t| t.status)
}

#[tokio::test]
async fn snb_0001_stats() {
    let gateway = Arc::new(MemoryGateway::new());
    let seeded = seed_snb_0001(gateway.as_ref()).await;
    let store = store_for(&gateway);

    let snapshot = store.load(&seeded.project_id).await.unwrap();
    let stats = store.compute_stats().await.unwrap();

    assert_eq!(stats.task_completed, 1);
    assert_eq!(stats.task_total, 3);
    assert_eq!(stats.task_overdue, 1);
    assert_eq!(stats.task_total, snapshot.tasks.len());
    assert_eq!(stats.rfi_total, snapshot.rfis.len());
    assert_eq!(stats.submittal_total, snapshot.submittals.len());

    let completed = snapshot
        .tasks
        .iter()
        .find(|t| t.status == TaskStatus::Completed)
        .unwrap();
    assert!(!store.is_overdue(completed));
}

#[tokio::test]
async fn stats_before_load_are_invalid() {
    let gateway = Arc::new(MemoryGateway::new());
    let store = store_for(&gateway);
    assert_matches!(
        store.compute_stats().await,
        Err(WorkspaceError::InvalidState { .. })
    );
}

#[tokio::test]
async fn failed_fetch_fails_the_whole_load_and_retry_recovers() {
    let gateway = Arc::new(MemoryGateway::new());
    let seeded = seed_snb_0001(gateway.as_ref()).await;
    let store = store_for(&gateway);

    gateway.fail("list_rfis").await;
    assert_matches!(
        store.load(&seeded.project_id).await,
        Err(WorkspaceError::LoadFailed {
            source: GatewayError::Unavailable(_),
            ..
        })
    );
    let view = store.view().await;
    assert_eq!(view.state, WorkspaceState::Failed);
    assert!(view.snapshot.is_none());
    assert!(view.error.is_some());

    gateway.recover("list_rfis").await;
    let snapshot = store.load(&seeded.project_id).await.unwrap();
    assert_eq!(snapshot.tasks.len(), 3);
    let view = store.view().await;
    assert_eq!(view.state, WorkspaceState::Ready);
    assert!(view.error.is_none());
}

#[tokio::test]
async fn unknown_project_is_not_found() {
    let gateway = Arc::new(MemoryGateway::new());
    let store = store_for(&gateway);

    assert_matches!(
        store.load("no-such-project").await,
        Err(WorkspaceError::NotFound { entity: "project", .. })
    );
    assert_eq!(store.state().await, WorkspaceState::Failed);
}

#[tokio::test]
async fn status_patch_only_touches_the_target_task() {
    let gateway = Arc::new(MemoryGateway::new());
    let seeded = seed_snb_0001(gateway.as_ref()).await;
    let store = store_for(&gateway);
    let before = store.load(&seeded.project_id).await.unwrap();

    let target = &seeded.task_ids[1];
    store
        .update_task_status(target, TaskStatus::AwaitingResponse)
        .await
        .unwrap();

    let after = store.snapshot().await.unwrap();
    assert_eq!(after.version, before.version);
    assert_eq!(after.tasks.len(), before.tasks.len());
    for (old, new) in before.tasks.iter().zip(after.tasks.iter()) {
        if &old.id == target {
            assert_eq!(new.status, TaskStatus::AwaitingResponse);
            assert_eq!(new.title, old.title);
            assert_eq!(new.due_date, old.due_date);
            assert_eq!(new.created_at, old.created_at);
        } else {
            assert_eq!(old, new);
        }
    }
    assert_eq!(after.rfis, before.rfis);
    assert_eq!(after.project, before.project);
}

#[tokio::test]
async fn failed_write_rolls_back_and_reports_prior_status() {
    let gateway = Arc::new(MemoryGateway::new());
    let seeded = seed_snb_0001(gateway.as_ref()).await;
    let store = store_for(&gateway);
    let before = store.load(&seeded.project_id).await.unwrap();

    gateway.fail("update_task_status").await;
    let target = &seeded.task_ids[1];
    let err = store
        .update_task_status(target, TaskStatus::Completed)
        .await
        .unwrap_err();

    assert_matches!(
        err,
        WorkspaceError::MutationFailed {
            prior_status: TaskStatus::InProgress,
            attempted: TaskStatus::Completed,
            ..
        }
    );
    assert_eq!(store.state().await, WorkspaceState::Ready);
    let after = store.snapshot().await.unwrap();
    assert_eq!(after.tasks, before.tasks);
}

#[tokio::test]
async fn refresh_after_a_stale_write_wins() {
    let gateway = Arc::new(MemoryGateway::new());
    let seeded = seed_snb_0001(gateway.as_ref()).await;
    let project_id = seeded.project_id.clone();
    let target = seeded.task_ids[1].clone();
    let store = store_for(&gateway);
    store.load(&project_id).await.unwrap();

    let release = gateway.hold("update_task_status").await;
    let write = tokio::spawn({
        let store = Arc::clone(&store);
        let target = target.clone();
        async move { store.update_task_status(&target, TaskStatus::Completed).await }
    });

    // Wait until the write has reached the backend and is parked there
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let tasks = gateway.list_tasks(&project_id).await.unwrap();
            if tasks.iter().any(|t| t.id == target && t.status == TaskStatus::Completed) {
                break;
            }
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();
    assert_eq!(task_status(&store, &target).await, Some(TaskStatus::Completed));

    // Another client moves the task; our refresh sees the server's value
    gateway
        .force_task_status(&target, TaskStatus::AwaitingResponse)
        .await
        .unwrap();
    let refreshed = store.refresh().await.unwrap();
    assert_eq!(
        refreshed.task(&target).map(|t| t.status),
        Some(TaskStatus::AwaitingResponse)
    );

    release.notify_one();
    write.await.unwrap().unwrap();

    assert_eq!(
        task_status(&store, &target).await,
        Some(TaskStatus::AwaitingResponse)
    );
}

#[tokio::test]
async fn refresh_wins_over_a_stale_failed_write() {
    let gateway = Arc::new(MemoryGateway::new());
    let seeded = seed_snb_0001(gateway.as_ref()).await;
    let project_id = seeded.project_id.clone();
    let target = seeded.task_ids[1].clone();
    let store = store_for(&gateway);
    store.load(&project_id).await.unwrap();
    let original = task_status(&store, &target).await.unwrap();

    let release = gateway.hold("update_task_status").await;
    let write = tokio::spawn({
        let store = Arc::clone(&store);
        let target = target.clone();
        async move { store.update_task_status(&target, TaskStatus::Completed).await }
    });

    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let tasks = gateway.list_tasks(&project_id).await.unwrap();
            if tasks.iter().any(|t| t.id == target && t.status == TaskStatus::Completed) {
                break;
            }
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();

    gateway
        .force_task_status(&target, TaskStatus::AwaitingResponse)
        .await
        .unwrap();
    let refreshed = store.refresh().await.unwrap();

    // The parked write now reports failure against an outdated snapshot
    gateway.fail("update_task_status").await;
    release.notify_one();
    assert_matches!(
        write.await.unwrap(),
        Err(WorkspaceError::MutationFailed { prior_status, attempted: TaskStatus::Completed, .. })
            if prior_status == original
    );

    let current = store.snapshot().await.unwrap();
    assert_eq!(current.version, refreshed.version);
    assert_eq!(
        current.task(&target).map(|t| t.status),
        Some(TaskStatus::AwaitingResponse)
    );
    assert_eq!(store.state().await, WorkspaceState::Ready);
}

#[tokio::test]
async fn mutation_during_load_is_rejected() {
    let gateway = Arc::new(MemoryGateway::new());
    let seeded = seed_snb_0001(gateway.as_ref()).await;
    let store = store_for(&gateway);
    let mut views = store.subscribe();

    let release = gateway.hold("list_tasks").await;
    let load = tokio::spawn({
        let store = Arc::clone(&store);
        let project_id = seeded.project_id.clone();
        async move { store.load(&project_id).await }
    });

    views
        .wait_for(|view| view.state == WorkspaceState::Loading)
        .await
        .unwrap();
    assert_matches!(
        store
            .update_task_status(&seeded.task_ids[0], TaskStatus::Cancelled)
            .await,
        Err(WorkspaceError::InvalidState {
            state: WorkspaceState::Loading,
            ..
        })
    );

    release.notify_one();
    load.await.unwrap().unwrap();
    assert_eq!(store.state().await, WorkspaceState::Ready);
}

#[tokio::test]
async fn overtaken_load_is_superseded() {
    let gateway = Arc::new(MemoryGateway::new());
    let seeded = seed_snb_0001(gateway.as_ref()).await;
    let store = store_for(&gateway);
    let mut views = store.subscribe();

    let release = gateway.hold("list_milestones").await;
    let first = tokio::spawn({
        let store = Arc::clone(&store);
        let project_id = seeded.project_id.clone();
        async move { store.load(&project_id).await }
    });
    views
        .wait_for(|view| view.state == WorkspaceState::Loading)
        .await
        .unwrap();

    let second = store.load(&seeded.project_id).await.unwrap();
    release.notify_one();

    assert_matches!(
        first.await.unwrap(),
        Err(WorkspaceError::Superseded { version }) if version < second.version
    );
    assert_eq!(store.snapshot().await.unwrap().version, second.version);
}

#[tokio::test]
async fn insert_then_reload_adds_exactly_one_record() {
    let gateway = Arc::new(MemoryGateway::new());
    let seeded = seed_snb_0001(gateway.as_ref()).await;
    let store = store_for(&gateway);
    let before = store.load(&seeded.project_id).await.unwrap();

    let created = gateway
        .insert_task(
            &seeded.project_id,
            TaskDraft {
                title: "Punch walk".into(),
                ..TaskDraft::default()
            },
        )
        .await
        .unwrap();
    let after = store.refresh().await.unwrap();

    assert_eq!(after.tasks.len(), before.tasks.len() + 1);
    assert!(after.version > before.version);
    let reloaded = after.task(&created.id).unwrap();
    assert_eq!(reloaded.title, "Punch walk");
    assert_eq!(reloaded.status, TaskStatus::NotStarted);
}

#[tokio::test]
async fn subscribers_see_every_transition() {
    let gateway = Arc::new(MemoryGateway::new());
    let seeded = seed_snb_0001(gateway.as_ref()).await;
    let store = store_for(&gateway);
    let views = store.subscribe();
    assert_eq!(views.borrow().state, WorkspaceState::Uninitialized);

    store.load(&seeded.project_id).await.unwrap();
    let view = views.borrow().clone();
    assert_eq!(view.state, WorkspaceState::Ready);
    assert_eq!(view.project_id.as_deref(), Some(seeded.project_id.as_str()));
    let stats = WorkspaceStats::compute(view.snapshot.as_ref().unwrap(), today());
    assert_eq!(stats.task_total, 3);
}
