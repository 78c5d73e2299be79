//! Graph store abstraction
//!
//! Narrow, read-only accessors against the listening/social graph. The
//! recommender and the explainer only ever talk to the graph through this
//! trait, so the store can be swapped (Neo4j over HTTP, a cached decorator,
//! an in-memory fixture in tests).
use std::collections::{HashMap, HashSet};

use crate::{
    error::AppResult,
    models::{
        ArtistEmbedding, ArtistId, ArtistMetadata, EmbeddingNeighbor, PopularArtist,
        TagFrequency, TagNeighbor, UserId,
    },
};

pub mod cached;
pub mod neo4j;

pub use cached::CachedGateway;
pub use neo4j::Neo4jGateway;

/// Trait for graph query gateways
///
/// Methods that take a set of ids are batch accessors: implementations must
/// answer them with a single round trip, never one query per id.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait GraphGateway: Send + Sync {
    /// Every artist that has a stored embedding
    async fn get_all_artist_embeddings(&self) -> AppResult<Vec<ArtistEmbedding>>;

    /// The user's embedding, or `None` when the user has not been embedded yet
    async fn get_user_embedding(&self, user_id: UserId) -> AppResult<Option<Vec<f32>>>;

    /// Artists the user has already listened to
    async fn get_consumed_artists(&self, user_id: UserId) -> AppResult<HashSet<ArtistId>>;

    /// Display metadata for many artists in one lookup
    ///
    /// Ids unknown to the store are missing from the returned map.
    async fn get_artist_metadata_bulk(
        &self,
        artist_ids: &[ArtistId],
    ) -> AppResult<HashMap<ArtistId, ArtistMetadata>>;

    /// Artists by summed listening weight across all users, heaviest first
    async fn get_popular_artists(&self, limit: usize) -> AppResult<Vec<PopularArtist>>;

    /// Tags on the user's listened artists, most frequent first
    async fn get_user_top_tags(&self, user_id: UserId, limit: usize)
        -> AppResult<Vec<TagFrequency>>;

    async fn get_artist_tags(&self, artist_id: ArtistId) -> AppResult<Vec<String>>;

    /// Direct friends of the user who also listened to the artist
    async fn get_friends_who_consumed(
        &self,
        user_id: UserId,
        artist_id: ArtistId,
    ) -> AppResult<Vec<UserId>>;

    /// Artists in the user's history ranked by tags shared with `artist_id`
    async fn get_tag_shared_neighbors(
        &self,
        user_id: UserId,
        artist_id: ArtistId,
        limit: usize,
    ) -> AppResult<Vec<TagNeighbor>>;

    /// Embedded artists ranked by cosine similarity to `artist_id`, excluding itself
    async fn get_embedding_neighbors(
        &self,
        artist_id: ArtistId,
        limit: usize,
    ) -> AppResult<Vec<EmbeddingNeighbor>>;

    /// Gateway name for logging and debugging
    fn name(&self) -> &'static str;
}
