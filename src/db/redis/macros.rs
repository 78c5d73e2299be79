/// Read-through caching against Redis.
///
/// Returns the cached value for `$key` when present. Otherwise awaits
/// `$block`, queues the result for a background write with `$ttl` seconds to
/// live, and returns it. Errors from the cache read or from `$block` are
/// propagated with `?`.
///
/// # Example
/// ```rust,ignore
/// let artists: Vec<PopularArtist> = cached!(
///     self.cache,
///     CacheKey::PopularArtists(limit),
///     self.ttl,
///     self.inner.get_popular_artists(limit)
/// )?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        if let Some(cached) = $cache.get_from_cache(&$key).await? {
            Ok(cached)
        } else {
            let value = $block.await?;
            $cache.set_in_background(&$key, &value, $ttl);
            Ok(value)
        }
    }};
}
