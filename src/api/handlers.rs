use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::Uri,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    models::{ArtistId, ExplanationBundle, RecommendationResponse, UserId},
};

use super::AppState;

// Request/Response types

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub artist_embeddings: usize,
    pub embeddings_loaded_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    pub k: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ExplainQuery {
    pub user_id: UserId,
    pub artist_id: ArtistId,
}

// Handlers

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        artist_embeddings: state.recommender.store().len(),
        embeddings_loaded_at: state.recommender.store().loaded_at(),
    })
}

pub async fn get_recommendations(
    State(state): State<AppState>,
    user_id: Result<Path<UserId>, PathRejection>,
    query: Result<Query<RecommendationQuery>, QueryRejection>,
) -> AppResult<Json<RecommendationResponse>> {
    let Path(user_id) = user_id.map_err(|e| AppError::InvalidInput(e.body_text()))?;
    let Query(query) = query.map_err(|e| AppError::InvalidInput(e.body_text()))?;
    let top_k = query.k.unwrap_or(state.default_top_k);
    if top_k > state.max_top_k {
        return Err(AppError::InvalidInput(format!(
            "k must be at most {}, got {}",
            state.max_top_k, top_k
        )));
    }

    let items = state.recommender.recommend(user_id, top_k).await?;

    Ok(Json(RecommendationResponse {
        user_id,
        top_k,
        items,
    }))
}

pub async fn explain(
    State(state): State<AppState>,
    query: Result<Query<ExplainQuery>, QueryRejection>,
) -> AppResult<Json<ExplanationBundle>> {
    let Query(query) = query.map_err(|e| AppError::InvalidInput(e.body_text()))?;
    let bundle = state
        .explainer
        .explain(query.user_id, query.artist_id)
        .await?;
    Ok(Json(bundle))
}

pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}
