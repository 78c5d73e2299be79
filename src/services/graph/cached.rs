use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::{
    cached,
    db::{Cache, CacheKey},
    error::AppResult,
    models::{
        ArtistEmbedding, ArtistId, ArtistMetadata, EmbeddingNeighbor, PopularArtist,
        TagFrequency, TagNeighbor, UserId,
    },
    services::graph::GraphGateway,
};

/// Gateway decorator that caches the popularity ranking in Redis
///
/// The ranking aggregates every listening edge in the graph, so it is the one
/// expensive, user-independent query. Everything else passes straight through.
pub struct CachedGateway {
    inner: Arc<dyn GraphGateway>,
    cache: Cache,
    popular_ttl: u64,
}

impl CachedGateway {
    pub fn new(inner: Arc<dyn GraphGateway>, cache: Cache, popular_ttl: u64) -> Self {
        Self {
            inner,
            cache,
            popular_ttl,
        }
    }
}

#[async_trait::async_trait]
impl GraphGateway for CachedGateway {
    async fn get_all_artist_embeddings(&self) -> AppResult<Vec<ArtistEmbedding>> {
        self.inner.get_all_artist_embeddings().await
    }

    async fn get_user_embedding(&self, user_id: UserId) -> AppResult<Option<Vec<f32>>> {
        self.inner.get_user_embedding(user_id).await
    }

    async fn get_consumed_artists(&self, user_id: UserId) -> AppResult<HashSet<ArtistId>> {
        self.inner.get_consumed_artists(user_id).await
    }

    async fn get_artist_metadata_bulk(
        &self,
        artist_ids: &[ArtistId],
    ) -> AppResult<HashMap<ArtistId, ArtistMetadata>> {
        self.inner.get_artist_metadata_bulk(artist_ids).await
    }

    async fn get_popular_artists(&self, limit: usize) -> AppResult<Vec<PopularArtist>> {
        cached!(
            self.cache,
            CacheKey::PopularArtists(limit),
            self.popular_ttl,
            async move {
                tracing::debug!(limit, "Popularity cache miss");
                self.inner.get_popular_artists(limit).await
            }
        )
    }

    async fn get_user_top_tags(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> AppResult<Vec<TagFrequency>> {
        self.inner.get_user_top_tags(user_id, limit).await
    }

    async fn get_artist_tags(&self, artist_id: ArtistId) -> AppResult<Vec<String>> {
        self.inner.get_artist_tags(artist_id).await
    }

    async fn get_friends_who_consumed(
        &self,
        user_id: UserId,
        artist_id: ArtistId,
    ) -> AppResult<Vec<UserId>> {
        self.inner.get_friends_who_consumed(user_id, artist_id).await
    }

    async fn get_tag_shared_neighbors(
        &self,
        user_id: UserId,
        artist_id: ArtistId,
        limit: usize,
    ) -> AppResult<Vec<TagNeighbor>> {
        self.inner
            .get_tag_shared_neighbors(user_id, artist_id, limit)
            .await
    }

    async fn get_embedding_neighbors(
        &self,
        artist_id: ArtistId,
        limit: usize,
    ) -> AppResult<Vec<EmbeddingNeighbor>> {
        self.inner.get_embedding_neighbors(artist_id, limit).await
    }

    fn name(&self) -> &'static str {
        "cached"
    }
}
