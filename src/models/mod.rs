use serde::{Deserialize, Serialize};

pub mod artist;
pub mod explanation;

pub use artist::{
    ArtistEmbedding, ArtistMetadata, EmbeddingNeighbor, PopularArtist, TagFrequency, TagNeighbor,
};
pub use explanation::{
    ExplanationBundle, ExplanationSection, Explanations, FriendActivity, TagOverlap,
};

pub type ArtistId = i64;
pub type UserId = i64;

/// Which path produced a recommendation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationSource {
    /// Scored by the classifier against the user's embedding
    Personalized,
    /// Popularity ranking for users without an embedding
    ColdStart,
    /// Shares tags with an explained artist
    TagSimilarity,
    /// Close to an explained artist in embedding space
    EmbeddingSimilarity,
}

/// A single recommended artist
///
/// `score` and `tag_count` are only populated by the paths that compute them;
/// absence means "not computed here", never zero.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub artist_id: ArtistId,
    pub artist_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_count: Option<u32>,
    pub source: RecommendationSource,
}

impl Recommendation {
    pub fn personalized(artist_id: ArtistId, artist_name: Option<String>, score: f32) -> Self {
        Self {
            artist_id,
            artist_name,
            score: Some(score),
            tag_count: None,
            source: RecommendationSource::Personalized,
        }
    }

    pub fn cold_start(artist_id: ArtistId, artist_name: Option<String>) -> Self {
        Self {
            artist_id,
            artist_name,
            score: None,
            tag_count: None,
            source: RecommendationSource::ColdStart,
        }
    }
}

impl From<PopularArtist> for Recommendation {
    fn from(artist: PopularArtist) -> Self {
        Recommendation::cold_start(artist.artist_id, artist.name)
    }
}

impl From<TagNeighbor> for Recommendation {
    fn from(neighbor: TagNeighbor) -> Self {
        Self {
            artist_id: neighbor.artist_id,
            artist_name: neighbor.name,
            score: None,
            tag_count: Some(neighbor.shared_tag_count),
            source: RecommendationSource::TagSimilarity,
        }
    }
}

impl From<EmbeddingNeighbor> for Recommendation {
    fn from(neighbor: EmbeddingNeighbor) -> Self {
        Self {
            artist_id: neighbor.artist_id,
            artist_name: neighbor.name,
            score: Some(neighbor.similarity),
            tag_count: None,
            source: RecommendationSource::EmbeddingSimilarity,
        }
    }
}

/// Response body for a user's recommendations
#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub user_id: UserId,
    pub top_k: usize,
    pub items: Vec<Recommendation>,
}
