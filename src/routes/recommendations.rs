use std::sync::Arc;

use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    Extension, Json,
};
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    middleware::RequestId,
    models::Recommendation,
    routes::{parse_id, AppState},
    services::recommendations::DEFAULT_LIMIT,
};

#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    limit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TitleRecommendationQuery {
    title: Option<String>,
    limit: Option<String>,
}

/// Absent or empty means the default; range checks happen in the service
fn parse_limit(raw: Option<&str>) -> AppResult<i64> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(DEFAULT_LIMIT),
        Some(s) => s
            .parse::<i64>()
            .map_err(|_| AppError::BadRequest("limit must be an integer".to_string())),
    }
}

/// Handler for `GET /api/titles/{id}/recommendations?limit=N`
pub async fn recommend_by_id(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<RecommendationQuery>, QueryRejection>,
) -> AppResult<Json<Arc<Vec<Recommendation>>>> {
    let Path(id) = path?;
    let Query(params) = query?;
    let base_id = parse_id(&id)?;
    let limit = parse_limit(params.limit.as_deref())?;

    tracing::info!(request_id = %request_id, base_id, limit, "Processing recommendation request");

    let recommendations = state
        .recommendations
        .recommend_by_id(base_id, limit)
        .await?;

    Ok(Json(recommendations))
}

/// Handler for `GET /api/titles/recommendations?title=...&limit=N`
pub async fn recommend_by_title(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    query: Result<Query<TitleRecommendationQuery>, QueryRejection>,
) -> AppResult<Json<Arc<Vec<Recommendation>>>> {
    let Query(params) = query?;
    let title = params
        .title
        .ok_or_else(|| AppError::BadRequest("title query parameter is required".to_string()))?;
    let limit = parse_limit(params.limit.as_deref())?;

    tracing::info!(request_id = %request_id, title = %title, limit, "Processing recommendation request");

    let recommendations = state
        .recommendations
        .recommend_by_title(&title, limit)
        .await?;

    Ok(Json(recommendations))
}
