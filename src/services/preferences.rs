use uuid::Uuid;

use crate::{
    db::store::FeedStore,
    error::AppResult,
    models::{CategoryInteraction, CategoryPreference, InteractionKind},
};

/// Interaction weights for preference inference.
///
/// A bookmark indicates stronger commitment than a like, mirroring the
/// popularity weighting.
pub const LIKE_POINTS: f64 = 1.0;
pub const BOOKMARK_POINTS: f64 = 2.0;

/// Accumulates per-category preference scores from a user's interactions.
///
/// Each like contributes 1 point, each bookmark 2. Interactions without a
/// resolvable category are excluded from the tally. The result is sorted
/// descending by score; equal scores keep first-seen order (accumulation
/// preserves insertion order and the sort is stable), which callers may rely
/// on for deterministic output.
pub fn tally_category_preferences(
    interactions: &[CategoryInteraction],
) -> Vec<CategoryPreference> {
    let mut preferences: Vec<CategoryPreference> = Vec::new();

    for interaction in interactions {
        let Some(category) = interaction.category.as_deref() else {
            continue;
        };

        let points = match interaction.kind {
            InteractionKind::Like => LIKE_POINTS,
            InteractionKind::Bookmark => BOOKMARK_POINTS,
        };

        match preferences.iter_mut().find(|p| p.category == category) {
            Some(existing) => existing.score += points,
            None => preferences.push(CategoryPreference {
                category: category.to_string(),
                score: points,
            }),
        }
    }

    preferences.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    preferences
}

/// Derives a user's category preferences from their likes and bookmarks.
///
/// A user with no interaction history gets an empty list, not an error.
/// Truncation to the top-K categories is the caller's responsibility.
pub async fn get_user_preferences(
    store: &dyn FeedStore,
    user_id: Uuid,
) -> AppResult<Vec<CategoryPreference>> {
    let history = store.interaction_history(user_id).await?;

    tracing::debug!(
        %user_id,
        interaction_count = history.len(),
        "Tallying category preferences"
    );

    Ok(tally_category_preferences(&history))
}
