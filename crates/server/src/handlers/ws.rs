// WebSocket push of workspace views
// Every state or snapshot change of the project's store is sent as JSON text

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio_stream::wrappers::WatchStream;

use crate::{
    workspace::{ProjectWorkspaceStore, WorkspaceRegistry, WorkspaceState},
    AppState,
};

/// Messages a client may send.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum ClientMessage {
    Refresh,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(project_id): Path<String>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, project_id, state))
}

async fn handle_socket(socket: WebSocket, project_id: String, state: AppState) {
    let (sender, mut receiver) = socket.split();
    let store = state.workspaces.get_or_create(&project_id).await;

    // Subscribe before loading so the Loading -> Ready transition is seen
    let mut views = WatchStream::new(store.subscribe());

    if store.state().await == WorkspaceState::Uninitialized {
        spawn_load(&state.workspaces, &store, &project_id);
    }

    let sender = Arc::new(tokio::sync::Mutex::new(sender));
    let sender_clone = Arc::clone(&sender);

    let push_task = tokio::spawn(async move {
        while let Some(view) = views.next().await {
            let text = match serde_json::to_string(&view) {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize workspace view");
                    continue;
                }
            };
            let mut sender = sender_clone.lock().await;
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::Refresh) => {
                    spawn_load(&state.workspaces, &store, &project_id)
                }
                Err(e) => tracing::debug!(error = %e, "Ignoring unknown client message"),
            },
            Message::Close(_) => break,
            Message::Ping(data) => {
                let mut sender = sender.lock().await;
                let _ = sender.send(Message::Pong(data)).await;
            }
            _ => {}
        }
    }

    push_task.abort();
}

// Failures are published to subscribers through the view itself. A missing
// project is also dropped from the registry.
fn spawn_load(
    registry: &Arc<WorkspaceRegistry>,
    store: &Arc<ProjectWorkspaceStore>,
    project_id: &str,
) {
    let registry = Arc::clone(registry);
    let store = Arc::clone(store);
    let project_id = project_id.to_string();
    tokio::spawn(async move {
        if let Err(e) = registry.load(&project_id, &store).await {
            tracing::debug!(
                project_id = %project_id,
                error = %e,
                "Workspace load from socket failed"
            );
        }
    });
}
