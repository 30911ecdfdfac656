//! API route definitions and shared application state.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::api::handlers;
use crate::db::Database;
use crate::dispatch::Dispatcher;
use crate::registry::WorkflowRegistry;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub registry: WorkflowRegistry,
    pub db: Arc<Database>,
    pub max_page_size: i64,
}

/// Build the complete API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/workflows/:workflow_type/run",
            post(handlers::run_workflow),
        )
        .route("/workflows/:id", get(handlers::get_workflow))
        .route("/workflows", get(handlers::list_workflows))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
