use std::sync::Arc;

use tracing::instrument;

use crate::{
    error::{AppError, AppResult},
    models::{ArtistId, Recommendation, UserId},
    services::{
        cold_start::{ColdStartFallback, DEFAULT_POPULAR_POOL},
        embedding_store::EmbeddingStore,
        features::FeatureMatrix,
        graph::GraphGateway,
        scorer::Scorer,
    },
};

/// Personalized artist ranking
///
/// For a user with an embedding:
/// 1. Every stored artist the user has not listened to becomes a candidate.
/// 2. Each candidate gets the Hadamard feature row against the user vector.
/// 3. The whole batch is scored in one classifier call.
/// 4. The `top_k` rows by probability win; equal probabilities keep store
///    order, i.e. artist id ascending.
/// 5. Names for the winners come from one bulk metadata lookup.
///
/// Users without an embedding go to [`ColdStartFallback`] instead. Store
/// failures are returned as errors and never downgraded to cold start.
pub struct Recommender {
    gateway: Arc<dyn GraphGateway>,
    store: Arc<EmbeddingStore>,
    scorer: Scorer,
    cold_start: ColdStartFallback,
}

impl Recommender {
    /// Wires the recommender, checking the store against the classifier
    ///
    /// A store whose vectors do not match the classifier's row width cannot
    /// produce valid features, so this fails instead of serving.
    pub fn new(
        gateway: Arc<dyn GraphGateway>,
        store: Arc<EmbeddingStore>,
        scorer: Scorer,
    ) -> AppResult<Self> {
        if let Some(dimension) = store.dimension() {
            if dimension != scorer.num_features() {
                return Err(AppError::DimensionMismatch {
                    expected: scorer.num_features(),
                    actual: dimension,
                });
            }
        }

        Ok(Self {
            cold_start: ColdStartFallback::new(gateway.clone(), DEFAULT_POPULAR_POOL),
            gateway,
            store,
            scorer,
        })
    }

    /// Length of the popularity ranking shared by cold-start requests
    pub fn with_popular_pool(mut self, pool_size: usize) -> Self {
        self.cold_start = ColdStartFallback::new(self.gateway.clone(), pool_size);
        self
    }

    pub fn store(&self) -> &EmbeddingStore {
        &self.store
    }

    /// Up to `top_k` artists for `user_id`, best first
    #[instrument(skip(self))]
    pub async fn recommend(&self, user_id: UserId, top_k: usize) -> AppResult<Vec<Recommendation>> {
        let (user_vector, excluded) = tokio::try_join!(
            self.gateway.get_user_embedding(user_id),
            self.gateway.get_consumed_artists(user_id),
        )?;

        let Some(user_vector) = user_vector else {
            tracing::info!(user_id, "User has no embedding, serving popular artists");
            return self.cold_start.recommend_popular(top_k, &excluded).await;
        };

        if top_k == 0 {
            return Ok(Vec::new());
        }

        let capacity = self.store.len().saturating_sub(excluded.len());
        let mut candidate_ids: Vec<ArtistId> = Vec::with_capacity(capacity);
        let mut features = FeatureMatrix::with_capacity(user_vector.len(), capacity);

        for (artist_id, artist_vector) in self.store.iter() {
            if excluded.contains(&artist_id) {
                continue;
            }
            features.push_pair(&user_vector, artist_vector)?;
            candidate_ids.push(artist_id);
        }

        if candidate_ids.is_empty() {
            tracing::info!(
                user_id,
                excluded = excluded.len(),
                "No unheard artists left to recommend"
            );
            return Ok(Vec::new());
        }

        tracing::debug!(
            user_id,
            candidates = candidate_ids.len(),
            excluded = excluded.len(),
            "Scoring candidates"
        );

        let probabilities = self.scorer.score_batch(features).await?;
        let winners = select_top_k(&probabilities, top_k);

        let winner_ids: Vec<ArtistId> = winners.iter().map(|&row| candidate_ids[row]).collect();
        let mut metadata = self.gateway.get_artist_metadata_bulk(&winner_ids).await?;

        let recommendations = winners
            .iter()
            .map(|&row| {
                let artist_id = candidate_ids[row];
                let name = metadata.remove(&artist_id).and_then(|m| m.name);
                Recommendation::personalized(artist_id, name, probabilities[row])
            })
            .collect::<Vec<_>>();

        tracing::info!(
            user_id,
            candidates = candidate_ids.len(),
            returned = recommendations.len(),
            "Personalized recommendations ready"
        );

        Ok(recommendations)
    }
}

/// Row indices of the `k` highest probabilities, best first
///
/// Ordering is probability descending, then row index ascending, so equal
/// probabilities keep candidate order.
fn select_top_k(probabilities: &[f32], k: usize) -> Vec<usize> {
    let k = k.min(probabilities.len());
    if k == 0 {
        return Vec::new();
    }

    let by_rank = |a: &usize, b: &usize| {
        probabilities[*b]
            .total_cmp(&probabilities[*a])
            .then(a.cmp(b))
    };

    let mut rows: Vec<usize> = (0..probabilities.len()).collect();
    if k < rows.len() {
        rows.select_nth_unstable_by(k - 1, by_rank);
        rows.truncate(k);
    }
    rows.sort_unstable_by(by_rank);
    rows
}
