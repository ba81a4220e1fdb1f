use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::Json;
use futures::{Stream, StreamExt};
use tracing::{error, info, warn};

use plaint_core::error::PlaintError;
use plaint_core::types::{StoredComplaint, TaskId, TaskMetadata};
use plaint_flow::{is_complete, SharedState};

use crate::bridge;
use crate::protocol::{ChatRequest, ChatResponse};
use crate::runner;
use crate::state::AppState;

fn status_for(e: &PlaintError) -> StatusCode {
    match e {
        PlaintError::DuplicateTask(_) | PlaintError::StreamAttached(_) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// GET /api/health
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// POST /api/chat: registers the task and starts its run in the background
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, StatusCode> {
    let metadata: TaskMetadata = body.thread_metadata.unwrap_or_default().into();
    let requested = body.task_id.as_deref().map(TaskId::from_string);

    // A thread whose metadata is already complete was concluded on an
    // earlier turn
    let concluded = is_complete(&metadata, state.settings.quality_threshold);

    let slot = state
        .registry
        .register_producer(requested, metadata)
        .map_err(|e| {
            warn!(error = %e, "Task creation refused");
            status_for(&e)
        })?;

    info!(
        task_id = %slot.task_id,
        turns = body.messages.len(),
        concluded,
        "Chat turn received"
    );

    let run_state = SharedState::new(body.messages, slot.metadata)
        .with_queue(slot.sender.clone())
        .with_task_id(slot.task_id.clone())
        .summarized(concluded);
    runner::spawn_run(state.flow.clone(), run_state, slot.sender);

    Ok(Json(ChatResponse {
        task_id: slot.task_id.to_string(),
    }))
}

// GET /api/chat/stream/{task_id}: server-sent events for one task
pub async fn chat_stream(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, StatusCode> {
    let task_id = TaskId::from_string(&task_id);
    let (receiver, metadata) = state.registry.attach(&task_id).map_err(|e| {
        warn!(task_id = %task_id, error = %e, "Stream attach refused");
        status_for(&e)
    })?;

    let events = bridge::task_events(state.registry.clone(), task_id, receiver, metadata)
        .map(|event| Event::default().json_data(event));
    Ok(Sse::new(events))
}

// GET /api/complaints/{id}
pub async fn get_complaint(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<StoredComplaint>, StatusCode> {
    match state.store.get_complaint(&id).await {
        Ok(Some(complaint)) => Ok(Json(complaint)),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            error!(complaint_id = %id, error = %e, "Failed to load complaint");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
