//! Quiet-block CRUD under `/api/blocks`.
//!
//! All routes require `Authorization: Bearer <api-token>`; every query is
//! scoped to the authenticated owner, so one user can never see or touch
//! another's blocks.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use tracing::warn;

use quiet_core::types::{CreateBlockRequest, QuietBlock, UpdateBlockRequest};

use crate::app::AppState;
use crate::auth::require_user;
use crate::http::{store_error_response, ApiError};

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

/// GET /api/blocks: the caller's blocks, ascending by start.
pub async fn list_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<QuietBlock>>> {
    let user = require_user(&state, &headers)?;
    let blocks = state.store.list_blocks(&user.id).map_err(|e| {
        warn!(error = %e, "GET /api/blocks failed");
        store_error_response(e)
    })?;
    Ok(Json(blocks))
}

/// POST /api/blocks: create a block for the caller.
pub async fn create_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateBlockRequest>,
) -> ApiResult<(StatusCode, Json<QuietBlock>)> {
    let user = require_user(&state, &headers)?;
    let block = state
        .store
        .create_block(&user.id, &req, Utc::now())
        .map_err(store_error_response)?;
    Ok((StatusCode::CREATED, Json(block)))
}

/// PUT /api/blocks/{id}: update one of the caller's blocks.
pub async fn update_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<UpdateBlockRequest>,
) -> ApiResult<Json<QuietBlock>> {
    let user = require_user(&state, &headers)?;
    let block = state
        .store
        .update_block(&user.id, &id, &req, Utc::now())
        .map_err(store_error_response)?;
    Ok(Json(block))
}

/// DELETE /api/blocks/{id}.
pub async fn delete_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<StatusCode> {
    let user = require_user(&state, &headers)?;
    state
        .store
        .delete_block(&user.id, &id)
        .map_err(store_error_response)?;
    Ok(StatusCode::NO_CONTENT)
}
