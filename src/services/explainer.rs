use std::sync::Arc;

use tracing::instrument;

use crate::{
    error::{AppError, AppResult},
    models::{
        ArtistId, ExplanationBundle, ExplanationSection, Explanations, FriendActivity,
        Recommendation, TagOverlap, UserId,
    },
    services::graph::GraphGateway,
};

const SECTION_COUNT: usize = 4;

/// Reconstructs why an artist fits a user
///
/// Independent of the recommender: four graph sub-queries (tag overlap,
/// friend activity, tag-similar artists, embedding-similar artists) run
/// concurrently. A failed sub-query leaves its section empty and is listed in
/// `unavailable`; only when all four fail does the call fail.
pub struct Explainer {
    gateway: Arc<dyn GraphGateway>,
    user_tag_limit: usize,
    neighbor_limit: usize,
}

/// Collects sub-query outcomes, remembering which sections failed
struct Sections {
    user_id: UserId,
    artist_id: ArtistId,
    unavailable: Vec<ExplanationSection>,
    first_error: Option<AppError>,
}

impl Sections {
    fn settle<T: Default>(&mut self, section: ExplanationSection, result: AppResult<T>) -> T {
        match result {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(
                    user_id = self.user_id,
                    artist_id = self.artist_id,
                    section = ?section,
                    error = %e,
                    "Explanation sub-query failed"
                );
                self.unavailable.push(section);
                self.first_error.get_or_insert(e);
                T::default()
            }
        }
    }
}

impl Explainer {
    pub fn new(gateway: Arc<dyn GraphGateway>, user_tag_limit: usize, neighbor_limit: usize) -> Self {
        Self {
            gateway,
            user_tag_limit,
            neighbor_limit,
        }
    }

    #[instrument(skip(self))]
    pub async fn explain(&self, user_id: UserId, artist_id: ArtistId) -> AppResult<ExplanationBundle> {
        let tag_overlap = async {
            let (user_tags, artist_tags) = tokio::try_join!(
                self.gateway.get_user_top_tags(user_id, self.user_tag_limit),
                self.gateway.get_artist_tags(artist_id),
            )?;
            let user_tags = user_tags.into_iter().map(|t| t.tag).collect();
            Ok::<_, AppError>(TagOverlap::new(user_tags, artist_tags))
        };

        let friends = async {
            let friends = self
                .gateway
                .get_friends_who_consumed(user_id, artist_id)
                .await?;
            Ok::<_, AppError>(FriendActivity {
                friends_who_listened: friends,
            })
        };

        let similar_artists = async {
            let neighbors = self
                .gateway
                .get_tag_shared_neighbors(user_id, artist_id, self.neighbor_limit)
                .await?;
            Ok::<_, AppError>(neighbors.into_iter().map(Recommendation::from).collect::<Vec<_>>())
        };

        let embedding_similarity = async {
            let neighbors = self
                .gateway
                .get_embedding_neighbors(artist_id, self.neighbor_limit)
                .await?;
            Ok::<_, AppError>(neighbors.into_iter().map(Recommendation::from).collect::<Vec<_>>())
        };

        let (tag_overlap, friends, similar_artists, embedding_similarity) =
            tokio::join!(tag_overlap, friends, similar_artists, embedding_similarity);

        let mut sections = Sections {
            user_id,
            artist_id,
            unavailable: Vec::new(),
            first_error: None,
        };

        let explanations = Explanations {
            tag_overlap: sections.settle(ExplanationSection::TagOverlap, tag_overlap),
            friend_activity: sections.settle(ExplanationSection::FriendActivity, friends),
            similar_artists: sections.settle(ExplanationSection::SimilarArtists, similar_artists),
            embedding_similarity: sections
                .settle(ExplanationSection::EmbeddingSimilarity, embedding_similarity),
        };

        if sections.unavailable.len() == SECTION_COUNT {
            if let Some(err) = sections.first_error {
                tracing::error!(user_id, artist_id, "Every explanation sub-query failed");
                return Err(err);
            }
        }

        Ok(ExplanationBundle {
            user_id,
            artist_id,
            explanations,
            unavailable: sections.unavailable,
        })
    }
}
