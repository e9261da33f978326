use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    cached,
    db::{store::FeedStore, Cache, CacheKey},
    error::AppResult,
    models::{CategoryPreference, FeedItem, PopularitySnapshot},
    services::{mixer, popularity, preferences},
};

/// Source weights for the personalized feed blend.
///
/// Personalized content leads, popular fills the middle, and a recent slice
/// keeps brand-new items discoverable before they accumulate engagement.
pub const PERSONALIZED_WEIGHT: f64 = 0.5;
pub const POPULAR_WEIGHT: f64 = 0.3;
pub const RECENT_WEIGHT: f64 = 0.2;

/// Source weights for the anonymous discover feed (no history to draw on)
pub const ANONYMOUS_POPULAR_WEIGHT: f64 = 0.6;
pub const ANONYMOUS_RECENT_WEIGHT: f64 = 0.4;

/// How many top categories from the preference profile feed personalization
pub const PREFERRED_CATEGORY_COUNT: usize = 3;

pub const DEFAULT_FEED_SIZE: usize = 30;
pub const MAX_FEED_SIZE: usize = 100;

/// Candidate pools are oversized so de-duplication across overlapping
/// sources still leaves enough distinct items to fill the feed
const CANDIDATE_POOL_MULTIPLIER: usize = 3;

const PREFERENCES_CACHE_TTL: u64 = 300; // 5 minutes
const ANONYMOUS_FEED_CACHE_TTL: u64 = 60; // 1 minute

/// Assembles ranked feeds from the store's candidate pools.
///
/// The ranking itself is pure ([`popularity`], [`preferences`], [`mixer`]);
/// this service owns the I/O around it: fetching candidates, annotating
/// fresh scores, and caching what is safe to cache.
pub struct FeedService {
    store: Arc<dyn FeedStore>,
    cache: Cache,
}

impl FeedService {
    pub fn new(store: Arc<dyn FeedStore>, cache: Cache) -> Self {
        Self { store, cache }
    }

    /// Builds a feed of `limit` items for the given user, or the anonymous
    /// discover feed when no user is supplied.
    pub async fn build_feed(
        &self,
        user_id: Option<Uuid>,
        limit: Option<usize>,
    ) -> AppResult<Vec<FeedItem>> {
        let limit = limit.unwrap_or(DEFAULT_FEED_SIZE).clamp(1, MAX_FEED_SIZE);

        match user_id {
            Some(user_id) => self.personalized_feed(user_id, limit).await,
            None => self.discover_feed(limit).await,
        }
    }

    /// A user's category preferences, cached briefly since the underlying
    /// history changes slowly
    pub async fn user_preferences(&self, user_id: Uuid) -> AppResult<Vec<CategoryPreference>> {
        let store = self.store.clone();
        cached!(
            self.cache,
            CacheKey::UserPreferences(user_id),
            PREFERENCES_CACHE_TTL,
            async move { preferences::get_user_preferences(store.as_ref(), user_id).await }
        )
    }

    /// Engagement counts plus freshly computed scores for the given items.
    ///
    /// Items with no recorded engagement are absent from the result.
    pub async fn popularity_snapshots(
        &self,
        item_ids: &[String],
    ) -> AppResult<HashMap<String, PopularitySnapshot>> {
        let stats = self.store.engagement_stats(item_ids).await?;
        let now = Utc::now();

        Ok(stats
            .into_iter()
            .map(|(item_id, stats)| {
                let score = popularity::popularity_score(
                    stats.likes_count,
                    stats.bookmarks_count,
                    stats.views_count,
                    stats.created_at,
                    now,
                );
                let snapshot = PopularitySnapshot {
                    likes_count: stats.likes_count,
                    bookmarks_count: stats.bookmarks_count,
                    views_count: stats.views_count,
                    popularity_score: score,
                    last_updated: stats.last_updated,
                };
                (item_id, snapshot)
            })
            .collect())
    }

    async fn personalized_feed(&self, user_id: Uuid, limit: usize) -> AppResult<Vec<FeedItem>> {
        let pool_size = (limit * CANDIDATE_POOL_MULTIPLIER) as i64;

        let profile = self.user_preferences(user_id).await?;
        let top_categories: Vec<String> = profile
            .into_iter()
            .take(PREFERRED_CATEGORY_COUNT)
            .map(|p| p.category)
            .collect();

        // A user with no history simply gets an empty personalized source;
        // the mixer's backfill hands its budget to the other sources.
        let personalized = if top_categories.is_empty() {
            Vec::new()
        } else {
            self.store
                .items_in_categories(&top_categories, pool_size)
                .await?
        };
        let popular = self.store.popular_items(pool_size).await?;
        let recent = self.store.recent_items(pool_size).await?;

        let [personalized, mut popular, recent] =
            self.annotate_scores([personalized, popular, recent]).await?;
        popularity::sort_by_popularity(&mut popular, true);

        tracing::info!(
            %user_id,
            personalized = personalized.len(),
            popular = popular.len(),
            recent = recent.len(),
            limit,
            "Mixing personalized feed"
        );

        mixer::mix_sources(
            vec![personalized, popular, recent],
            &[PERSONALIZED_WEIGHT, POPULAR_WEIGHT, RECENT_WEIGHT],
            limit,
        )
    }

    /// The discover feed is identical for every anonymous visitor, so it is
    /// cached whole for a short window
    async fn discover_feed(&self, limit: usize) -> AppResult<Vec<FeedItem>> {
        cached!(
            self.cache,
            CacheKey::AnonymousFeed(limit),
            ANONYMOUS_FEED_CACHE_TTL,
            async move { self.assemble_discover_feed(limit).await }
        )
    }

    async fn assemble_discover_feed(&self, limit: usize) -> AppResult<Vec<FeedItem>> {
        let pool_size = (limit * CANDIDATE_POOL_MULTIPLIER) as i64;

        let popular = self.store.popular_items(pool_size).await?;
        let recent = self.store.recent_items(pool_size).await?;

        let [mut popular, recent] = self.annotate_scores([popular, recent]).await?;
        popularity::sort_by_popularity(&mut popular, true);

        tracing::info!(
            popular = popular.len(),
            recent = recent.len(),
            limit,
            "Mixing discover feed"
        );

        mixer::mix_sources(
            vec![popular, recent],
            &[ANONYMOUS_POPULAR_WEIGHT, ANONYMOUS_RECENT_WEIGHT],
            limit,
        )
    }

    /// Annotates every candidate with a fresh popularity score, using one
    /// batch stats read across all lists. Candidates without recorded
    /// engagement score on recency alone. List order is left untouched;
    /// callers re-sort the pools that rank on score.
    async fn annotate_scores<const N: usize>(
        &self,
        mut lists: [Vec<FeedItem>; N],
    ) -> AppResult<[Vec<FeedItem>; N]> {
        let now = Utc::now();

        let unique_ids: HashSet<String> = lists
            .iter()
            .flat_map(|list| list.iter().map(|item| item.id.clone()))
            .collect();
        let ids: Vec<String> = unique_ids.into_iter().collect();

        let stats = self.store.engagement_stats(&ids).await?;

        for list in lists.iter_mut() {
            for item in list.iter_mut() {
                let (likes, bookmarks, views) = stats
                    .get(&item.id)
                    .map(|s| (s.likes_count, s.bookmarks_count, s.views_count))
                    .unwrap_or((0, 0, 0));

                item.popularity_score =
                    popularity::popularity_score(likes, bookmarks, views, item.created_at, now);
            }
        }

        Ok(lists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::MockFeedStore;
    use crate::models::{CategoryInteraction, EngagementStats, InteractionKind};
    use chrono::{DateTime, Duration};

    /// Cache pointed at a port nothing listens on: every read fails and the
    /// service recomputes, keeping these tests deterministic.
    async fn unreachable_cache() -> Cache {
        let client = crate::db::create_redis_client("redis://127.0.0.1:6399").unwrap();
        let (cache, _handle) = Cache::new(client).await;
        cache
    }

    fn item(id: &str, category: Option<&str>, created_at: DateTime<Utc>) -> FeedItem {
        FeedItem {
            id: id.to_string(),
            wishlist_id: "wl-1".to_string(),
            name: format!("Item {}", id),
            image_url: None,
            category: category.map(str::to_string),
            created_at,
            popularity_score: 0.0,
        }
    }

    fn stats(item_id: &str, likes: u64, created_at: DateTime<Utc>) -> EngagementStats {
        EngagementStats {
            item_id: item_id.to_string(),
            likes_count: likes,
            bookmarks_count: 0,
            views_count: 0,
            created_at,
            last_updated: created_at,
        }
    }

    #[tokio::test]
    async fn test_personalized_feed_orders_sources_by_weight() {
        let now = Utc::now();
        let old = now - Duration::days(60);

        let mut store = MockFeedStore::new();
        store.expect_interaction_history().returning(|_| {
            Ok(vec![
                CategoryInteraction {
                    category: Some("Tech".to_string()),
                    kind: InteractionKind::Bookmark,
                },
                CategoryInteraction {
                    category: Some("Mode".to_string()),
                    kind: InteractionKind::Like,
                },
            ])
        });
        store
            .expect_items_in_categories()
            .withf(|categories, _| {
                categories.len() == 2 && categories[0] == "Tech" && categories[1] == "Mode"
            })
            .returning(move |_, _| Ok(vec![item("t-1", Some("Tech"), old), item("t-2", Some("Mode"), old)]));
        store
            .expect_popular_items()
            .returning(move |_| Ok(vec![item("p-1", None, old)]));
        store
            .expect_recent_items()
            .returning(move |_| Ok(vec![item("r-1", None, now)]));
        store
            .expect_engagement_stats()
            .returning(move |_| Ok(HashMap::from([("p-1".to_string(), stats("p-1", 10, old))])));

        let service = FeedService::new(Arc::new(store), unreachable_cache().await);
        let feed = service.build_feed(Some(Uuid::new_v4()), Some(10)).await.unwrap();

        let ids: Vec<&str> = feed.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["t-1", "t-2", "p-1", "r-1"]);
    }

    #[tokio::test]
    async fn test_popular_pool_is_resorted_on_fresh_scores() {
        let now = Utc::now();
        let old = now - Duration::days(90);

        let mut store = MockFeedStore::new();
        // Aggregate order is stale: the store returns p-cold first even
        // though p-hot now has far more engagement.
        store.expect_popular_items().returning(move |_| {
            Ok(vec![item("p-cold", None, old), item("p-hot", None, old)])
        });
        store
            .expect_recent_items()
            .returning(|_| Ok(Vec::new()));
        store.expect_engagement_stats().returning(move |_| {
            Ok(HashMap::from([
                ("p-cold".to_string(), stats("p-cold", 1, old)),
                ("p-hot".to_string(), stats("p-hot", 50, old)),
            ]))
        });

        let service = FeedService::new(Arc::new(store), unreachable_cache().await);
        let feed = service.build_feed(None, Some(10)).await.unwrap();

        let ids: Vec<&str> = feed.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["p-hot", "p-cold"]);
        assert!(feed[0].popularity_score > feed[1].popularity_score);
    }

    #[tokio::test]
    async fn test_user_without_history_falls_back_to_popular_and_recent() {
        let now = Utc::now();

        let mut store = MockFeedStore::new();
        store
            .expect_interaction_history()
            .returning(|_| Ok(Vec::new()));
        // No items_in_categories expectation: an empty profile must not
        // trigger a category query at all.
        store
            .expect_popular_items()
            .returning(move |_| Ok(vec![item("p-1", None, now)]));
        store
            .expect_recent_items()
            .returning(move |_| Ok(vec![item("r-1", None, now)]));
        store
            .expect_engagement_stats()
            .returning(|_| Ok(HashMap::new()));

        let service = FeedService::new(Arc::new(store), unreachable_cache().await);
        let feed = service.build_feed(Some(Uuid::new_v4()), Some(10)).await.unwrap();

        let ids: Vec<&str> = feed.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["p-1", "r-1"]);
    }

    #[tokio::test]
    async fn test_empty_store_yields_empty_feed() {
        let mut store = MockFeedStore::new();
        store.expect_popular_items().returning(|_| Ok(Vec::new()));
        store.expect_recent_items().returning(|_| Ok(Vec::new()));
        store
            .expect_engagement_stats()
            .returning(|_| Ok(HashMap::new()));

        let service = FeedService::new(Arc::new(store), unreachable_cache().await);
        let feed = service.build_feed(None, None).await.unwrap();

        assert!(feed.is_empty());
    }

    #[tokio::test]
    async fn test_overlapping_sources_are_deduplicated() {
        let now = Utc::now();
        let shared = move || item("x-1", None, now);

        let mut store = MockFeedStore::new();
        store
            .expect_popular_items()
            .returning(move |_| Ok(vec![shared()]));
        store
            .expect_recent_items()
            .returning(move |_| Ok(vec![shared(), item("r-2", None, now)]));
        store
            .expect_engagement_stats()
            .returning(|_| Ok(HashMap::new()));

        let service = FeedService::new(Arc::new(store), unreachable_cache().await);
        let feed = service.build_feed(None, Some(10)).await.unwrap();

        let ids: Vec<&str> = feed.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["x-1", "r-2"]);
    }

    #[tokio::test]
    async fn test_popularity_snapshots_default_missing_to_absent() {
        let now = Utc::now();

        let mut store = MockFeedStore::new();
        store.expect_engagement_stats().returning(move |_| {
            Ok(HashMap::from([("a".to_string(), stats("a", 2, now))]))
        });

        let service = FeedService::new(Arc::new(store), unreachable_cache().await);
        let snapshots = service
            .popularity_snapshots(&["a".to_string(), "ghost".to_string()])
            .await
            .unwrap();

        assert!(snapshots.contains_key("a"));
        assert!(!snapshots.contains_key("ghost"));
        // 2 likes * 3 + full recency bonus
        assert!((snapshots["a"].popularity_score - 16.0).abs() < 0.1);
    }
}
