use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::AppResult, middleware::RequestId, models::FeedItem, routes::AppState,
};

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    /// Personalizes the feed when present; anonymous discover feed otherwise
    pub user_id: Option<Uuid>,
    pub limit: Option<usize>,
}

/// Handler for the mixed feed endpoint
pub async fn feed(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Query(params): Query<FeedQuery>,
) -> AppResult<Json<Vec<FeedItem>>> {
    tracing::info!(
        request_id = %request_id,
        user_id = ?params.user_id,
        limit = ?params.limit,
        "Processing feed request"
    );

    let items = state
        .feed_service
        .build_feed(params.user_id, params.limit)
        .await?;

    tracing::info!(
        request_id = %request_id,
        item_count = items.len(),
        "Feed assembled"
    );

    Ok(Json(items))
}
