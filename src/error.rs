use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Graph store error: {0}")]
    Graph(#[from] neo4rs::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    /// User and artist embeddings disagree on length. This is a data/model
    /// contract break and is never retried.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Model error: {0}")]
    Model(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// True when the error means a backing store could not serve the request
    pub fn is_dependency_unavailable(&self) -> bool {
        matches!(
            self,
            AppError::Graph(_) | AppError::Cache(_)
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Graph(_) | AppError::Cache(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, self.to_string())
            }
            AppError::DimensionMismatch { .. } => {
                tracing::error!(error = %self, "Embedding contract violated");
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::Model(_) | AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
