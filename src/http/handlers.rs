//! Route handlers
//!
//! Each handler parses its path, runs one engine call and renders JSON.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;

use crate::compaction::CompactionOutcome;
use crate::engine::{Engine, EngineStats};
use crate::error::Result;

use super::response::{ApiError, CompactResponse, GetResponse, MessageResponse, PutResponse};

/// Run a blocking engine call on the blocking pool
async fn with_engine<T, F>(engine: Arc<Engine>, call: F) -> std::result::Result<T, ApiError>
where
    F: FnOnce(&Engine) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || call(&engine))
        .await
        .map_err(|e| ApiError::internal(format!("engine task failed: {}", e)))?
        .map_err(ApiError::from)
}

pub async fn health_handler() -> &'static str {
    "ok"
}

pub async fn stats_handler(
    State(engine): State<Arc<Engine>>,
) -> std::result::Result<Json<EngineStats>, ApiError> {
    let stats = with_engine(engine, |e| Ok(e.stats())).await?;
    Ok(Json(stats))
}

pub async fn put_handler(
    State(engine): State<Arc<Engine>>,
    Path(key_value): Path<String>,
) -> std::result::Result<Json<PutResponse>, ApiError> {
    let (key, value) = key_value
        .split_once(':')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| ApiError::bad_request("Invalid input format. Expected /put/{KEY}:{VALUE}"))?;

    let (k, v) = (key.clone(), value.clone());
    with_engine(engine, move |e| e.put(k.as_bytes(), v.as_bytes())).await?;

    Ok(Json(PutResponse {
        message: "Successfully stored",
        key,
        value,
    }))
}

pub async fn get_handler(
    State(engine): State<Arc<Engine>>,
    Path(key): Path<String>,
) -> std::result::Result<Json<GetResponse>, ApiError> {
    // No disk I/O, but the read lock can wait out a whole compaction
    let lookup = key.clone();
    let value = with_engine(engine, move |e| e.get(lookup.as_bytes())).await?;
    let value = String::from_utf8_lossy(&value).into_owned();
    Ok(Json(GetResponse { key, value }))
}

pub async fn delete_handler(
    State(engine): State<Arc<Engine>>,
    Path(key): Path<String>,
) -> std::result::Result<Json<MessageResponse>, ApiError> {
    with_engine(engine, move |e| e.delete(key.as_bytes())).await?;
    Ok(Json(MessageResponse {
        message: "Successfully deleted",
    }))
}

pub async fn compact_handler(
    State(engine): State<Arc<Engine>>,
) -> std::result::Result<Json<CompactResponse>, ApiError> {
    let outcome = with_engine(engine, |e| e.compact()).await?;
    Ok(Json(match outcome {
        CompactionOutcome::Completed(stats) => CompactResponse::completed(&stats),
        CompactionOutcome::Skipped => CompactResponse::skipped(),
    }))
}
