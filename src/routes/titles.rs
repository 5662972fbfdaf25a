use std::sync::Arc;

use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    models::{TitleDetail, TitleLookup},
    routes::{parse_id, AppState},
};

#[derive(Debug, Deserialize)]
pub struct LookupQuery {
    title: Option<String>,
}

/// Handler for `GET /api/titles/{id}`
pub async fn get_title(
    State(state): State<Arc<AppState>>,
    path: Result<Path<String>, PathRejection>,
) -> AppResult<Json<TitleDetail>> {
    let Path(id) = path?;
    let id = parse_id(&id)?;
    Ok(Json(state.titles.get_by_id(id).await?))
}

/// Handler for `GET /api/titles/lookup?title=...`
pub async fn lookup(
    State(state): State<Arc<AppState>>,
    query: Result<Query<LookupQuery>, QueryRejection>,
) -> AppResult<Json<TitleLookup>> {
    let Query(params) = query?;
    let title = params
        .title
        .ok_or_else(|| AppError::BadRequest("title query parameter is required".to_string()))?;

    let found = state.titles.lookup(&title).await?;
    tracing::debug!(query = %title, id = found.id, "Title lookup matched");
    Ok(Json(found))
}
