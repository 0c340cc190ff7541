// GET handlers: metrics snapshot, version, health and readiness (OPTIONS is answered by the CORS layer)

use axum::{
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde::Serialize;

use super::AppState;
use crate::version::{NAME, VERSION};

/// GET /api/metrics: latest snapshot, or 503 until the first successful collection.
pub(super) async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.store.read() {
        Some(snapshot) => render_json(&*snapshot),
        None => (StatusCode::SERVICE_UNAVAILABLE, "Service not ready").into_response(),
    }
}

/// GET /version: service name and version from Cargo.toml.
pub(super) async fn version_handler() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

pub(super) async fn healthz_handler() -> &'static str {
    "ok"
}

pub(super) async fn readyz_handler(State(state): State<AppState>) -> (StatusCode, &'static str) {
    if state.store.is_ready() {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready")
    }
}

/// Serializes before writing anything, so an encoding error becomes a clean 500.
fn render_json<T: Serialize + ?Sized>(value: &T) -> Response {
    match serde_json::to_vec(value) {
        Ok(body) => (
            [(header::CONTENT_TYPE, "application/json")],
            Bytes::from(body),
        )
            .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, operation = "serialize_snapshot", "snapshot encoding failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
