use std::sync::Arc;

use axum::{extract::State, http::StatusCode, middleware, routing::get, Json, Router};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::{
    db::{RecommendationCache, TitleRepository},
    error::{AppError, AppResult},
    middleware::{
        make_span_with_request_id, rate_limit_middleware, request_id_middleware, RateLimiter,
    },
    models::StorageHealth,
    services::{RecommendationService, TitleService},
};

pub mod recommendations;
pub mod titles;

/// Shared handler state
pub struct AppState {
    pub titles: TitleService,
    pub recommendations: RecommendationService,
}

impl AppState {
    /// Wires both services to the same repository
    pub fn new(repository: Arc<dyn TitleRepository>, cache: RecommendationCache) -> Self {
        Self {
            titles: TitleService::new(repository.clone()),
            recommendations: RecommendationService::new(repository, cache),
        }
    }
}

/// Creates the application router with all routes and middleware
///
/// Layers run outermost first: request id, tracing, then rate limiting.
pub fn create_router(state: Arc<AppState>, limiter: Arc<RateLimiter>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(middleware::from_fn_with_state(limiter, rate_limit_middleware)),
        )
}

/// API routes under /api
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(storage_health))
        .route("/titles/lookup", get(titles::lookup))
        .route(
            "/titles/recommendations",
            get(recommendations::recommend_by_title),
        )
        .route("/titles/:id", get(titles::get_title))
        .route(
            "/titles/:id/recommendations",
            get(recommendations::recommend_by_id),
        )
}

/// Liveness; touches nothing but the process
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Database reachability and pgvector presence
async fn storage_health(State(state): State<Arc<AppState>>) -> AppResult<Json<StorageHealth>> {
    Ok(Json(state.titles.health().await?))
}

/// Parses a path id, rejecting anything that is not a positive integer
pub(crate) fn parse_id(raw: &str) -> AppResult<i32> {
    raw.trim()
        .parse::<i32>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::BadRequest("id must be a positive integer".to_string()))
}
