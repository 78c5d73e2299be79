use std::sync::Arc;

use crate::services::{Explainer, Recommender};

/// Shared application state
///
/// Everything behind it is immutable after startup, so handlers share it
/// without locking.
#[derive(Clone)]
pub struct AppState {
    pub recommender: Arc<Recommender>,
    pub explainer: Arc<Explainer>,
    pub default_top_k: usize,
    pub max_top_k: usize,
}

impl AppState {
    pub fn new(
        recommender: Recommender,
        explainer: Explainer,
        default_top_k: usize,
        max_top_k: usize,
    ) -> Self {
        Self {
            recommender: Arc::new(recommender),
            explainer: Arc::new(explainer),
            default_top_k,
            max_top_k,
        }
    }
}
