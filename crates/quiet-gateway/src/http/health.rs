use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::AppState;

/// GET /health: liveness probe with a DB ping.
///
/// 200 when everything answers, 503 with `status: "degraded"` otherwise so
/// external monitors can alert on the body-free status code alone.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let database = match state.store.ping() {
        Ok(()) => "healthy",
        Err(_) => "unhealthy",
    };
    let status = if database == "healthy" {
        "healthy"
    } else {
        "degraded"
    };
    let code = if status == "healthy" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        code,
        Json(json!({
            "status": status,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "version": env!("CARGO_PKG_VERSION"),
            "services": { "database": database },
        })),
    )
}
