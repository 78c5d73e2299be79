use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    services::{classifier::Classifier, features::FeatureMatrix},
};

/// Runs the classifier over a whole candidate batch in one call
///
/// Probabilities come back in row order; callers zip them with their candidate
/// ids by index.
#[derive(Clone)]
pub struct Scorer {
    classifier: Arc<dyn Classifier>,
}

impl Scorer {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self { classifier }
    }

    /// Row width the underlying classifier expects
    pub fn num_features(&self) -> usize {
        self.classifier.num_features()
    }

    /// Scores every row of `features`
    ///
    /// Inference runs on the blocking pool so large batches do not stall the
    /// async workers.
    pub async fn score_batch(&self, features: FeatureMatrix) -> AppResult<Vec<f32>> {
        let expected = self.classifier.num_features();
        if features.width() != expected {
            return Err(AppError::DimensionMismatch {
                expected,
                actual: features.width(),
            });
        }

        let rows = features.rows();
        if rows == 0 {
            return Ok(Vec::new());
        }

        let classifier = self.classifier.clone();
        let probabilities = tokio::task::spawn_blocking(move || classifier.predict_proba(&features))
            .await
            .map_err(|e| AppError::Internal(format!("Scoring task failed: {}", e)))??;

        if probabilities.len() != rows {
            return Err(AppError::Model(format!(
                "{} returned {} probabilities for {} rows",
                self.classifier.name(),
                probabilities.len(),
                rows
            )));
        }

        if probabilities.iter().any(|p| !p.is_finite()) {
            return Err(AppError::Model(format!(
                "{} returned a non-finite probability",
                self.classifier.name()
            )));
        }

        tracing::debug!(
            classifier = self.classifier.name(),
            rows,
            "Scored candidate batch"
        );

        Ok(probabilities)
    }
}
