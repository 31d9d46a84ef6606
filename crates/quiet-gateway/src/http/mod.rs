use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use quiet_core::error::StoreError;

pub mod blocks;
pub mod dispatch;
pub mod health;

/// JSON error body shared by every route.
#[derive(Serialize)]
pub struct ApiError {
    pub error: String,
}

/// Map store errors onto HTTP statuses.
///
/// Database failures deliberately don't leak driver detail to clients; the
/// full error goes to the log at the call site.
pub(crate) fn store_error_response(e: StoreError) -> (StatusCode, Json<ApiError>) {
    let (status, message) = match &e {
        StoreError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        StoreError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
        StoreError::NotFound { id } => {
            (StatusCode::NOT_FOUND, format!("quiet block not found: {id}"))
        }
        StoreError::Database(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        ),
    };
    (status, Json(ApiError { error: message }))
}
