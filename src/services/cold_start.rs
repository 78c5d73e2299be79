use std::collections::HashSet;
use std::sync::Arc;

use crate::{
    error::AppResult,
    models::{ArtistId, PopularArtist, Recommendation},
    services::graph::GraphGateway,
};

/// Default length of the shared popularity ranking
pub const DEFAULT_POPULAR_POOL: usize = 200;

/// Popularity-ranked recommendations for users without an embedding
///
/// Uses no personalization signal and never touches the embedding store, so
/// it keeps working when the store is empty.
///
/// Every request reads the same fixed-length ranking (`pool_size`), so a
/// cached ranking is shared across users. Only when a user's exclusions eat
/// through the whole pool is a longer ranking requested.
#[derive(Clone)]
pub struct ColdStartFallback {
    gateway: Arc<dyn GraphGateway>,
    pool_size: usize,
}

impl ColdStartFallback {
    pub fn new(gateway: Arc<dyn GraphGateway>, pool_size: usize) -> Self {
        Self { gateway, pool_size }
    }

    /// The `top_k` most listened artists, skipping any in `excluded`
    pub async fn recommend_popular(
        &self,
        top_k: usize,
        excluded: &HashSet<ArtistId>,
    ) -> AppResult<Vec<Recommendation>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let pool = self.pool_size.max(top_k);
        let popular = self.gateway.get_popular_artists(pool).await?;
        let exhausted = popular.len() == pool;
        let picks = Self::pick(popular, top_k, excluded);

        let needed = top_k + excluded.len();
        if picks.len() < top_k && exhausted && needed > pool {
            tracing::debug!(pool, needed, "Popularity pool exhausted by exclusions");
            let popular = self.gateway.get_popular_artists(needed).await?;
            return Ok(Self::pick(popular, top_k, excluded));
        }

        Ok(picks)
    }

    fn pick(
        popular: Vec<PopularArtist>,
        top_k: usize,
        excluded: &HashSet<ArtistId>,
    ) -> Vec<Recommendation> {
        popular
            .into_iter()
            .filter(|artist| !excluded.contains(&artist.artist_id))
            .take(top_k)
            .map(Recommendation::from)
            .collect()
    }
}
