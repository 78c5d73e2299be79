use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::{
    error::{AppError, AppResult},
    models::{ArtistEmbedding, ArtistId},
    services::graph::GraphGateway,
};

/// In-memory artist embeddings, loaded once at startup
///
/// Immutable after construction and shared behind an `Arc`, so any number of
/// requests can read it without locking. Iteration order is artist id
/// ascending; the recommender relies on this for deterministic tie-breaks.
/// Artists without an embedding are simply absent.
#[derive(Debug)]
pub struct EmbeddingStore {
    artist_ids: Vec<ArtistId>,
    vectors: Vec<Vec<f32>>,
    index: HashMap<ArtistId, usize>,
    dimension: Option<usize>,
    loaded_at: DateTime<Utc>,
}

impl EmbeddingStore {
    /// Loads every stored artist embedding from the graph
    ///
    /// Must complete before the service accepts traffic.
    pub async fn load(gateway: &dyn GraphGateway) -> AppResult<Self> {
        let entries = gateway.get_all_artist_embeddings().await?;
        let store = Self::from_entries(entries)?;

        tracing::info!(
            gateway = gateway.name(),
            artists = store.len(),
            dimension = ?store.dimension(),
            "Loaded artist embeddings"
        );

        Ok(store)
    }

    /// Builds a store from raw entries
    ///
    /// All vectors must share one length. Duplicate ids keep the first entry.
    pub fn from_entries(mut entries: Vec<ArtistEmbedding>) -> AppResult<Self> {
        entries.sort_by_key(|e| e.artist_id);

        let mut artist_ids = Vec::with_capacity(entries.len());
        let mut vectors = Vec::with_capacity(entries.len());
        let mut index = HashMap::with_capacity(entries.len());
        let mut dimension = None;

        for entry in entries {
            let expected = *dimension.get_or_insert(entry.embedding.len());
            if entry.embedding.len() != expected {
                return Err(AppError::DimensionMismatch {
                    expected,
                    actual: entry.embedding.len(),
                });
            }

            if index.contains_key(&entry.artist_id) {
                tracing::warn!(artist_id = entry.artist_id, "Duplicate artist embedding ignored");
                continue;
            }

            index.insert(entry.artist_id, artist_ids.len());
            artist_ids.push(entry.artist_id);
            vectors.push(entry.embedding);
        }

        Ok(Self {
            artist_ids,
            vectors,
            index,
            dimension,
            loaded_at: Utc::now(),
        })
    }

    pub fn get(&self, artist_id: ArtistId) -> Option<&[f32]> {
        self.index
            .get(&artist_id)
            .map(|&i| self.vectors[i].as_slice())
    }

    /// Entries in artist id ascending order
    pub fn iter(&self) -> impl Iterator<Item = (ArtistId, &[f32])> + '_ {
        self.artist_ids
            .iter()
            .copied()
            .zip(self.vectors.iter().map(Vec::as_slice))
    }

    pub fn len(&self) -> usize {
        self.artist_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artist_ids.is_empty()
    }

    /// Shared vector length, `None` for an empty store
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}
