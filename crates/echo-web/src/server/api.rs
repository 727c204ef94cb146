//! REST API endpoints over the journal store.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use echo_core::error::StoreError;
use echo_core::ids::EntryId;
use echo_core::ingest;
use echo_core::prompts;

use super::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/entries",
            get(list_entries).post(create_entry).delete(clear_entries),
        )
        .route(
            "/api/entries/{id}",
            get(get_entry).put(edit_entry).delete(delete_entry),
        )
        .route("/api/jobs", get(get_jobs))
        .route("/api/highlight", get(get_highlight))
        .route("/api/prompt", get(get_prompt))
        .route("/api/status", get(get_status))
}

fn parse_id(raw: &str) -> Result<EntryId, (StatusCode, Json<Value>)> {
    raw.parse().map_err(|e: echo_core::ids::InvalidEntryId| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"ok": false, "error": e.to_string()})),
        )
    })
}

// --- List / get ---

async fn list_entries(State(state): State<Arc<AppState>>) -> Json<Value> {
    let entries = state.pipeline.entries().await;
    Json(json!(entries.as_ref()))
}

async fn get_entry(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let id = parse_id(&raw_id)?;
    match state.pipeline.cache().get(id).await {
        Some(entry) => Ok(Json(json!(entry))),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(json!({"ok": false, "error": format!("entry {} not found", id)})),
        )),
    }
}

// --- Create ---

#[derive(Deserialize)]
struct CreateBody {
    description: Option<String>,
    recording_path: Option<String>,
}

async fn create_entry(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateBody>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let requested = match body.recording_path.as_deref().map(|s| s.trim()) {
        Some(p) if !p.is_empty() => p.to_string(),
        _ => {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(json!({"ok": false, "error": "recording_path is required"})),
            ))
        }
    };

    // Only files staged in the upload directory may be moved into the store.
    let upload_dir = state.config.resolve_upload_dir();
    let recording = ingest::staged_source(&upload_dir, std::path::Path::new(&requested))
        .await
        .map_err(|e| {
            warn!("Rejected recording_path {:?}: {}", requested, e);
            (
                StatusCode::BAD_REQUEST,
                Json(json!({"ok": false, "error": e.to_string()})),
            )
        })?;
    let description = body.description.unwrap_or_default();

    match state.pipeline.save_entry(&description, &recording).await {
        Ok(receipt) => {
            info!("Entry {} saved, analysis pending", receipt.id);
            Ok(Json(json!({"ok": true, "id": receipt.id})))
        }
        Err(e) => {
            warn!("Save failed: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"ok": false, "error": e.to_string()})),
            ))
        }
    }
}

// --- Edit ---

#[derive(Deserialize)]
struct EditBody {
    title: String,
    description: String,
}

async fn edit_entry(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
    Json(body): Json<EditBody>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let id = parse_id(&raw_id)?;
    match state
        .pipeline
        .edit_entry(id, &body.title, &body.description)
        .await
    {
        Ok(entry) => Ok(Json(json!({"ok": true, "entry": entry}))),
        Err(e @ StoreError::NotFound(_)) => Err((
            StatusCode::NOT_FOUND,
            Json(json!({"ok": false, "error": e.to_string()})),
        )),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"ok": false, "error": e.to_string()})),
        )),
    }
}

// --- Delete ---

async fn delete_entry(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let id = parse_id(&raw_id)?;
    let ok = state.pipeline.delete_entry(id).await;
    Ok(Json(json!({"ok": ok})))
}

async fn clear_entries(State(state): State<Arc<AppState>>) -> Json<Value> {
    let ok = state.pipeline.clear_entries().await;
    Json(json!({"ok": ok}))
}

// --- Jobs ---

async fn get_jobs(State(state): State<Arc<AppState>>) -> Json<Value> {
    let jobs = state.pipeline.jobs();
    Json(json!({
        "in_flight": jobs.in_flight_count(),
        "ids": jobs.snapshot(),
    }))
}

// --- Highlight ---

async fn get_highlight(State(state): State<Arc<AppState>>) -> Json<Value> {
    match state.pipeline.highlight().await {
        Ok(highlight) => Json(json!(highlight)),
        Err(e) => {
            warn!("Highlight failed: {}", e);
            Json(json!({"summary": null, "quote": null, "error": e.to_string()}))
        }
    }
}

// --- Prompt ---

async fn get_prompt() -> Json<Value> {
    Json(json!({"prompt": prompts::random_prompt()}))
}

// --- Status ---

async fn get_status(State(state): State<Arc<AppState>>) -> Json<Value> {
    let entries = state.pipeline.entries().await;
    Json(json!({
        "storage_root": state.config.resolve_storage_root(),
        "upload_dir": state.config.resolve_upload_dir(),
        "backend_host": state.config.backend_host,
        "entries": entries.len(),
        "in_flight": state.pipeline.jobs().in_flight_count(),
    }))
}
