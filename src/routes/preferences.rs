use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::{error::AppResult, models::CategoryPreference, routes::AppState};

/// Handler for a user's inferred category preferences.
///
/// A user with no likes or bookmarks gets an empty list, not an error.
pub async fn preferences(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<Vec<CategoryPreference>>> {
    let preferences = state.feed_service.user_preferences(user_id).await?;
    Ok(Json(preferences))
}
