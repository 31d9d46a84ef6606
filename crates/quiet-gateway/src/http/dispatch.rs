//! Manual dispatch trigger and email plumbing test.
//!
//! `/api/dispatch` is what an external cron hits when the built-in engine is
//! disabled (or to force an immediate run); it is gated by the configured
//! `notify.cron_secret`, not by a user token.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use tracing::{error, info};

use quiet_core::types::DispatchReport;

use crate::app::AppState;
use crate::auth::{extract_bearer, require_user};
use crate::http::ApiError;

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

/// POST /api/dispatch: run one dispatch pass now, returning the report.
pub async fn trigger_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<DispatchReport>> {
    let secret = state.config.notify.cron_secret.as_deref().ok_or((
        StatusCode::NOT_FOUND,
        Json(ApiError {
            error: "manual dispatch is not enabled".to_string(),
        }),
    ))?;
    if extract_bearer(&headers) != Some(secret) {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(ApiError {
                error: "Unauthorized".to_string(),
            }),
        ));
    }

    match state.dispatcher.dispatch(Utc::now()).await {
        Ok(report) => {
            info!(
                attempted = report.attempted,
                sent = report.sent,
                "manual dispatch run complete"
            );
            Ok(Json(report))
        }
        Err(e) => {
            error!("manual dispatch failed: {e}");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError {
                    error: e.to_string(),
                }),
            ))
        }
    }
}

/// POST /api/email-test: send a test reminder to the caller's own address
/// through the real provider chain. Verifies credentials end to end without
/// waiting for a block to come due.
pub async fn email_test_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    let user = require_user(&state, &headers)?;

    let now = Utc::now();
    match state.dispatcher.send_test_email(&user.email, now).await {
        Ok(provider) => Ok(Json(serde_json::json!({
            "message": "test email sent",
            "provider": provider,
        }))),
        Err(reason) => Err((
            StatusCode::BAD_GATEWAY,
            Json(ApiError { error: reason }),
        )),
    }
}
