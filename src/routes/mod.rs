use std::sync::Arc;

use axum::{
    http::StatusCode,
    middleware as axum_middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    db::{store::FeedStore, Cache},
    middleware::request_id_middleware,
    services::feed::FeedService,
};

pub mod feed;
pub mod popularity;
pub mod preferences;

/// Shared application state
pub struct AppState {
    pub store: Arc<dyn FeedStore>,
    pub feed_service: FeedService,
}

impl AppState {
    pub fn new(store: Arc<dyn FeedStore>, cache: Cache) -> Self {
        Self {
            feed_service: FeedService::new(store.clone(), cache),
            store,
        }
    }
}

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .layer(axum_middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/feed", get(feed::feed))
        .route("/items/popularity", get(popularity::batch_popularity))
        .route("/items/:item_id/views", post(popularity::record_view))
        .route("/users/:user_id/preferences", get(preferences::preferences))
        .route("/admin/popularity/refresh", post(popularity::refresh_stats))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
