use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

use crate::config::DirectoryConfig;
use crate::error::DirectoryError;
use crate::gate::IdentityGate;
use crate::service::DirectoryService;
use keydir_types::KeydirError;

/// Media type for compact signed tokens.
pub const JWS_CONTENT_TYPE: &str = "application/jws";

/// Shared state passed to all handlers.
pub struct AppState {
    pub service: DirectoryService,
    pub gate: Arc<dyn IdentityGate>,
    pub config: DirectoryConfig,
}

// --- POST /v1/k/{user_id}/{device_id} ---

pub async fn register_key(
    State(state): State<Arc<AppState>>,
    Path((user_id, device_id)): Path<(String, String)>,
    headers: HeaderMap,
    body: Body,
) -> Result<impl IntoResponse, DirectoryError> {
    if !state.gate.admit(&user_id, true) {
        return Err(KeydirError::Unauthorized.into());
    }

    // Bail before polling the body if the declared length is implausible.
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    match declared {
        Some(n) if n > 0 && n <= state.config.max_key_len as u64 => {}
        _ => {
            warn!(user_id, device_id, ?declared, "upload length invalid");
            return Err(KeydirError::InvalidLength.into());
        }
    }

    let body = axum::body::to_bytes(body, state.config.max_key_len)
        .await
        .map_err(|_| KeydirError::InvalidLength)?;

    let token = state.service.register_key(&user_id, &device_id, &body).await?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, JWS_CONTENT_TYPE)],
        token,
    ))
}

// --- GET /v1/k/{user_id} ---

pub async fn fetch_keys(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, DirectoryError> {
    if !state.gate.admit(&user_id, false) {
        return Err(KeydirError::Unauthorized.into());
    }

    let token = state.service.fetch_keys(&user_id).await?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, JWS_CONTENT_TYPE)],
        token,
    ))
}

// --- Health check ---

pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "keydir",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
