use serde::{Deserialize, Serialize};

use super::ArtistId;

/// Learned vector for one artist, as stored on the graph
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ArtistEmbedding {
    pub artist_id: ArtistId,
    pub embedding: Vec<f32>,
}

/// Display metadata for an artist
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ArtistMetadata {
    pub name: Option<String>,
}

/// Tag on a user's listened artists with its occurrence count
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TagFrequency {
    pub tag: String,
    pub frequency: u64,
}

/// Artist ranked by aggregate listening weight across all users
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PopularArtist {
    pub artist_id: ArtistId,
    pub name: Option<String>,
    pub aggregate_weight: f64,
}

/// Artist from a user's history that shares tags with a target artist
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TagNeighbor {
    pub artist_id: ArtistId,
    pub name: Option<String>,
    pub shared_tag_count: u32,
}

/// Artist close to a target artist by cosine similarity of embeddings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingNeighbor {
    pub artist_id: ArtistId,
    pub name: Option<String>,
    pub similarity: f32,
}
