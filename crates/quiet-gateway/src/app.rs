use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use quiet_core::config::QuietConfig;
use quiet_notify::Dispatcher;
use quiet_store::BlockStore;
use quiet_users::UserDirectory;

/// Central shared state, passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: QuietConfig,
    pub store: Arc<BlockStore>,
    pub users: Arc<UserDirectory>,
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    pub fn new(
        config: QuietConfig,
        store: Arc<BlockStore>,
        users: Arc<UserDirectory>,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        Self {
            config,
            store,
            users,
            dispatcher,
        }
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route(
            "/api/blocks",
            get(crate::http::blocks::list_handler).post(crate::http::blocks::create_handler),
        )
        .route(
            "/api/blocks/{id}",
            axum::routing::put(crate::http::blocks::update_handler)
                .delete(crate::http::blocks::delete_handler),
        )
        .route("/api/dispatch", post(crate::http::dispatch::trigger_handler))
        .route(
            "/api/email-test",
            post(crate::http::dispatch::email_test_handler),
        )
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
