use chrono::{DateTime, Utc};

/// Popularity scoring weights.
///
/// Bookmarks signal stronger intent than likes (save-for-later vs. passive
/// approval); views are weak signals individually but accumulate. The recency
/// bonus gives new items a fighting chance against older, more-engaged items
/// and fully fades after 30 days.
pub const LIKE_WEIGHT: f64 = 3.0;
pub const BOOKMARK_WEIGHT: f64 = 5.0;
pub const VIEW_WEIGHT: f64 = 0.1;
pub const MAX_RECENCY_BONUS: f64 = 10.0;
pub const RECENCY_WINDOW_DAYS: f64 = 30.0;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Computes the popularity score of an item.
///
/// score = likes * 3 + bookmarks * 5 + views * 0.1 + recency bonus
///
/// Counts are unsigned at this boundary, so negative inputs are
/// unrepresentable; the store layer guards the conversion from the database's
/// signed aggregates. A `created_at` in the future caps the bonus at its
/// maximum and logs the anomaly rather than inflating the score.
pub fn popularity_score(
    likes: u64,
    bookmarks: u64,
    views: u64,
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> f64 {
    let age_days = (now - created_at).num_milliseconds() as f64 / MILLIS_PER_DAY;

    if age_days < 0.0 {
        tracing::warn!(
            %created_at,
            "Item created in the future, capping recency bonus"
        );
    }

    likes as f64 * LIKE_WEIGHT
        + bookmarks as f64 * BOOKMARK_WEIGHT
        + views as f64 * VIEW_WEIGHT
        + recency_bonus(age_days)
}

/// Time-decaying additive term favoring newer items.
///
/// Starts at `MAX_RECENCY_BONUS` for a brand-new item and decays linearly to
/// 0 at `RECENCY_WINDOW_DAYS`. Bounded to [0, MAX_RECENCY_BONUS] for any
/// input, including negative ages.
pub fn recency_bonus(age_days: f64) -> f64 {
    (MAX_RECENCY_BONUS - (age_days / RECENCY_WINDOW_DAYS) * MAX_RECENCY_BONUS)
        .clamp(0.0, MAX_RECENCY_BONUS)
}

/// Access to the popularity score of an already-annotated record
pub trait Scored {
    fn score(&self) -> f64;
}

impl Scored for crate::models::FeedItem {
    fn score(&self) -> f64 {
        self.popularity_score
    }
}

/// Sorts items by popularity score, descending by default.
///
/// The sort is stable: items with equal scores keep their relative input
/// order. Callers rely on this for deterministic feeds.
pub fn sort_by_popularity<T: Scored>(items: &mut [T], descending: bool) {
    items.sort_by(|a, b| {
        let ordering = a
            .score()
            .partial_cmp(&b.score())
            .unwrap_or(std::cmp::Ordering::Equal);
        if descending {
            ordering.reverse()
        } else {
            ordering
        }
    });
}
