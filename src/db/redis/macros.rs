/// Read-through caching with an explicit TTL.
///
/// Checks the cache first and returns the hit if present. On a miss the
/// provided async block computes the value, which is queued for a background
/// cache write and returned. A cache *read* failure is downgraded to a miss
/// with a warning: an unreachable Redis degrades performance, never
/// correctness.
///
/// # Arguments
/// * `$cache`: the [`Cache`](crate::db::Cache) instance
/// * `$key`: the [`CacheKey`](crate::db::CacheKey) for the value
/// * `$ttl`: time-to-live for the cached value in seconds
/// * `$block`: async block producing an `AppResult<T>` on a miss
///
/// # Example
/// ```rust,ignore
/// let preferences = cached!(cache, CacheKey::UserPreferences(user_id), 300, async move {
///     get_user_preferences(store.as_ref(), user_id).await
/// })?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        match $cache.get_from_cache(&$key).await {
            Ok(Some(cached)) => Ok(cached),
            Ok(None) => {
                let value = $block.await?;
                $cache.set_in_background(&$key, &value, $ttl);
                Ok(value)
            }
            Err(e) => {
                tracing::warn!(error = %e, key = %$key, "Cache read failed, recomputing");
                let value = $block.await?;
                $cache.set_in_background(&$key, &value, $ttl);
                Ok(value)
            }
        }
    }};
}
