use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use tracing::warn;

use quiet_users::User;

use crate::app::AppState;
use crate::http::ApiError;

/// Resolve the request's bearer token to a user, or produce the 401/500
/// response the handler should return.
pub fn require_user(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<User, (StatusCode, Json<ApiError>)> {
    let token = extract_bearer(headers).ok_or_else(|| {
        (
            StatusCode::UNAUTHORIZED,
            Json(ApiError {
                error: "Unauthorized. Set 'Authorization: Bearer <your-token>' header."
                    .to_string(),
            }),
        )
    })?;

    match state.users.authenticate(token) {
        Ok(Some(user)) => Ok(user),
        Ok(None) => Err((
            StatusCode::UNAUTHORIZED,
            Json(ApiError {
                error: "Unauthorized".to_string(),
            }),
        )),
        Err(e) => {
            warn!(error = %e, "token lookup failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError {
                    error: "Internal server error".to_string(),
                }),
            ))
        }
    }
}

pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}
