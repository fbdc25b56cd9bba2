use crate::handlers;
use crate::middleware;
use crate::AppState;
use axum::{routing::get, Router};
use std::sync::Arc;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health::health_check))
        // Reports which tenant database served the request
        .route("/api/tenant/current", get(handlers::tenant::current_tenant))
        .layer(axum::middleware::from_fn(middleware::tenant_context))
        .with_state(state)
}
