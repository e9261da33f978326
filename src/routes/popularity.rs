use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{PopularitySnapshot, ViewOutcome, Viewer},
    routes::AppState,
};

#[derive(Debug, Deserialize)]
pub struct BatchPopularityQuery {
    /// Comma-separated item ids
    pub ids: String,
}

/// Handler for the batch popularity endpoint.
///
/// Items with no recorded engagement are omitted from the response; clients
/// default missing entries to zero counts and zero score.
pub async fn batch_popularity(
    State(state): State<Arc<AppState>>,
    Query(params): Query<BatchPopularityQuery>,
) -> AppResult<Json<HashMap<String, PopularitySnapshot>>> {
    let ids: Vec<String> = params
        .ids
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect();

    if ids.is_empty() {
        return Err(AppError::InvalidInput(
            "Provide at least one item id".to_string(),
        ));
    }

    let snapshots = state.feed_service.popularity_snapshots(&ids).await?;
    Ok(Json(snapshots))
}

#[derive(Debug, Default, Deserialize)]
pub struct RecordViewRequest {
    /// Omitted for anonymous views
    pub user_id: Option<Uuid>,
}

/// Handler for recording an item view.
///
/// Views are capped at one per calendar day per (item, viewer); a same-day
/// duplicate responds with `recorded: false` and is not an error.
pub async fn record_view(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<String>,
    body: Option<Json<RecordViewRequest>>,
) -> AppResult<Json<ViewOutcome>> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let viewer = Viewer::from(request.user_id);

    let outcome = state.store.record_view(&item_id, viewer).await?;

    tracing::debug!(
        item_id = %item_id,
        recorded = outcome.recorded,
        "View tracked"
    );

    Ok(Json(outcome))
}

/// Handler for the aggregate refresh hook, driven by an external scheduler
pub async fn refresh_stats(State(state): State<Arc<AppState>>) -> AppResult<StatusCode> {
    state.store.refresh_engagement_stats().await?;
    Ok(StatusCode::NO_CONTENT)
}
