use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        CategoryInteraction, EngagementStats, FeedItem, InteractionKind, ViewOutcome, Viewer,
    },
};

/// Persistence reads and writes the feed service depends on.
///
/// Handlers and services depend on this trait rather than on a concrete
/// database so tests can substitute mock or in-memory stores. The production
/// implementation is [`PostgresFeedStore`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FeedStore: Send + Sync {
    /// Latest items across all public wishlists, most recent first
    async fn recent_items(&self, limit: i64) -> AppResult<Vec<FeedItem>>;

    /// Items with recorded engagement, ranked by the aggregate's persisted
    /// score. The aggregate score is recall ordering only; fresh scores are
    /// computed from the counts at read time.
    async fn popular_items(&self, limit: i64) -> AppResult<Vec<FeedItem>>;

    /// Latest items whose parent wishlist falls in one of the given
    /// categories, most recent first
    async fn items_in_categories(
        &self,
        categories: &[String],
        limit: i64,
    ) -> AppResult<Vec<FeedItem>>;

    /// Engagement counts for the given items.
    ///
    /// Items with no recorded engagement are absent from the map, not
    /// zero-filled; callers default missing entries to zero counts.
    async fn engagement_stats(
        &self,
        item_ids: &[String],
    ) -> AppResult<HashMap<String, EngagementStats>>;

    /// The user's likes and bookmarks, each joined to the category of the
    /// item's parent wishlist
    async fn interaction_history(&self, user_id: Uuid) -> AppResult<Vec<CategoryInteraction>>;

    /// Records a view for (item, viewer), at most once per calendar day.
    ///
    /// A same-day duplicate returns `recorded: false` and is not an error.
    async fn record_view(&self, item_id: &str, viewer: Viewer) -> AppResult<ViewOutcome>;

    /// Recomputes the engagement aggregate. Driven by an external scheduler.
    async fn refresh_engagement_stats(&self) -> AppResult<()>;
}

/// sqlx-backed [`FeedStore`] over the product's Postgres schema
pub struct PostgresFeedStore {
    pool: PgPool,
}

impl PostgresFeedStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Shared projection for item queries
const ITEM_COLUMNS: &str = "
    SELECT i.id, i.wishlist_id, w.category, i.name, i.image_url, i.created_at
    FROM wishlist_items i
    JOIN wishlists w ON w.id = i.wishlist_id
";

#[derive(sqlx::FromRow)]
struct ItemRow {
    id: String,
    wishlist_id: String,
    category: Option<String>,
    name: String,
    image_url: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<ItemRow> for FeedItem {
    fn from(row: ItemRow) -> Self {
        FeedItem {
            id: row.id,
            wishlist_id: row.wishlist_id,
            name: row.name,
            image_url: row.image_url,
            category: row.category,
            created_at: row.created_at,
            popularity_score: 0.0,
        }
    }
}

#[derive(sqlx::FromRow)]
struct StatsRow {
    item_id: String,
    likes_count: i64,
    bookmarks_count: i64,
    views_count: i64,
    created_at: DateTime<Utc>,
    last_updated: DateTime<Utc>,
}

impl From<StatsRow> for EngagementStats {
    fn from(row: StatsRow) -> Self {
        EngagementStats {
            likes_count: guarded_count(row.likes_count, "likes_count", &row.item_id),
            bookmarks_count: guarded_count(row.bookmarks_count, "bookmarks_count", &row.item_id),
            views_count: guarded_count(row.views_count, "views_count", &row.item_id),
            item_id: row.item_id,
            created_at: row.created_at,
            last_updated: row.last_updated,
        }
    }
}

/// Converts a signed database count into the unsigned count the scorer takes.
///
/// The aggregate can never legitimately go negative; if it does, the row is
/// corrupt and the count is clamped to zero rather than poisoning the score.
fn guarded_count(raw: i64, field: &str, item_id: &str) -> u64 {
    if raw < 0 {
        tracing::warn!(item_id, field, value = raw, "Negative engagement count, clamping to 0");
        0
    } else {
        raw as u64
    }
}

#[derive(sqlx::FromRow)]
struct InteractionRow {
    category: Option<String>,
    kind: String,
}

#[async_trait]
impl FeedStore for PostgresFeedStore {
    async fn recent_items(&self, limit: i64) -> AppResult<Vec<FeedItem>> {
        let sql = format!("{} ORDER BY i.created_at DESC LIMIT $1", ITEM_COLUMNS);
        let rows = sqlx::query_as::<_, ItemRow>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(FeedItem::from).collect())
    }

    async fn popular_items(&self, limit: i64) -> AppResult<Vec<FeedItem>> {
        let sql = format!(
            "{} JOIN item_popularity_stats s ON s.item_id = i.id
             ORDER BY s.popularity_score DESC, i.created_at DESC LIMIT $1",
            ITEM_COLUMNS
        );
        let rows = sqlx::query_as::<_, ItemRow>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(FeedItem::from).collect())
    }

    async fn items_in_categories(
        &self,
        categories: &[String],
        limit: i64,
    ) -> AppResult<Vec<FeedItem>> {
        if categories.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "{} WHERE w.category = ANY($1) ORDER BY i.created_at DESC LIMIT $2",
            ITEM_COLUMNS
        );
        let rows = sqlx::query_as::<_, ItemRow>(&sql)
            .bind(categories)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(FeedItem::from).collect())
    }

    async fn engagement_stats(
        &self,
        item_ids: &[String],
    ) -> AppResult<HashMap<String, EngagementStats>> {
        if item_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, StatsRow>(
            "SELECT item_id, likes_count, bookmarks_count, views_count,
                    created_at, last_updated
             FROM item_popularity_stats
             WHERE item_id = ANY($1)",
        )
        .bind(item_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(EngagementStats::from)
            .map(|stats| (stats.item_id.clone(), stats))
            .collect())
    }

    async fn interaction_history(&self, user_id: Uuid) -> AppResult<Vec<CategoryInteraction>> {
        let rows = sqlx::query_as::<_, InteractionRow>(
            "SELECT w.category, 'like' AS kind
             FROM likes l
             JOIN wishlist_items i ON i.id = l.entity_id
             JOIN wishlists w ON w.id = i.wishlist_id
             WHERE l.user_id = $1 AND l.entity_type = 'item'
             UNION ALL
             SELECT w.category, 'bookmark' AS kind
             FROM bookmarks b
             JOIN wishlist_items i ON i.id = b.item_id
             JOIN wishlists w ON w.id = i.wishlist_id
             WHERE b.user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let interactions = rows
            .into_iter()
            .filter_map(|row| {
                let kind = match row.kind.as_str() {
                    "like" => InteractionKind::Like,
                    "bookmark" => InteractionKind::Bookmark,
                    other => {
                        tracing::warn!(kind = other, "Unknown interaction kind, skipping");
                        return None;
                    }
                };
                Some(CategoryInteraction {
                    category: row.category,
                    kind,
                })
            })
            .collect();

        Ok(interactions)
    }

    async fn record_view(&self, item_id: &str, viewer: Viewer) -> AppResult<ViewOutcome> {
        // The unique index on (item, viewer-or-anonymous, view_date) makes
        // the insert a no-op for a same-day duplicate.
        let result = sqlx::query(
            "INSERT INTO item_views (item_id, viewer_id)
             VALUES ($1, $2)
             ON CONFLICT DO NOTHING",
        )
        .bind(item_id)
        .bind(viewer.user_id())
        .execute(&self.pool)
        .await?;

        let recorded = result.rows_affected() > 0;

        if !recorded {
            tracing::debug!(item_id, "View already recorded today");
        }

        Ok(ViewOutcome { recorded })
    }

    async fn refresh_engagement_stats(&self) -> AppResult<()> {
        sqlx::query("REFRESH MATERIALIZED VIEW CONCURRENTLY item_popularity_stats")
            .execute(&self.pool)
            .await?;

        tracing::info!("Engagement aggregate refreshed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guarded_count_passes_non_negative() {
        assert_eq!(guarded_count(0, "likes_count", "item-1"), 0);
        assert_eq!(guarded_count(42, "likes_count", "item-1"), 42);
    }

    #[test]
    fn test_guarded_count_clamps_negative() {
        assert_eq!(guarded_count(-7, "views_count", "item-1"), 0);
    }

    #[test]
    fn test_stats_row_conversion() {
        let now = Utc::now();
        let row = StatsRow {
            item_id: "item-9".to_string(),
            likes_count: 3,
            bookmarks_count: -1,
            views_count: 120,
            created_at: now,
            last_updated: now,
        };

        let stats = EngagementStats::from(row);
        assert_eq!(stats.item_id, "item-9");
        assert_eq!(stats.likes_count, 3);
        assert_eq!(stats.bookmarks_count, 0);
        assert_eq!(stats.views_count, 120);
    }
}
