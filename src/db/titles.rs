//! Read-only access to the `titles` and `embeddings` tables.
use std::future::Future;
use std::time::Duration;

use sqlx::PgPool;
use tracing::instrument;

use crate::{
    error::{AppError, AppResult},
    models::{RecommendationRow, StorageHealth, Title},
};

const TITLE_COLUMNS: &str = r#"
    t.id, t.title, t.year, t.type, t.poster_url, t.plot,
    t.directors, t.actors, t.genres, t.imdb_rating
"#;

/// Nearest neighbors of `$1` by cosine distance (`<=>`), excluding the base
/// itself and any title without an embedding. The base embedding is
/// subselected once; if it is null every distance is null and the result is empty.
const RECOMMENDATIONS_SQL: &str = r#"
    WITH base AS (
        SELECT combined_embedding
        FROM embeddings
        WHERE title_id = $1
    )
    SELECT
        t.id          AS id,
        t.title       AS title,
        t.year        AS year,
        t.type        AS type,
        t.genres      AS genres,
        t.plot        AS plot,
        t.poster_url  AS poster_url,
        t.imdb_rating AS imdb_rating,
        t.actors      AS actors,
        t.directors   AS directors,
        (e.combined_embedding <=> base.combined_embedding)::float8 AS distance
    FROM embeddings e
    JOIN titles t ON t.id = e.title_id
    CROSS JOIN base
    WHERE t.id <> $1
      AND base.combined_embedding IS NOT NULL
      AND e.combined_embedding IS NOT NULL
    ORDER BY distance ASC, t.id ASC
    LIMIT $2
"#;

/// Storage adapter for the catalog
///
/// Every method is a single read-only statement. Connectivity and query
/// failures surface as infrastructure errors; nothing is retried here.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait TitleRepository: Send + Sync {
    /// Fetch one title by primary key
    async fn find_title_by_id(&self, id: i32) -> AppResult<Option<Title>>;

    /// Case-insensitive name match
    ///
    /// An exact (case-folded) match wins; otherwise the first title whose name
    /// contains `name`. Ties resolve to the lowest id.
    async fn find_title_by_name_fuzzy(&self, name: &str) -> AppResult<Option<Title>>;

    /// Up to `limit` nearest neighbors of `base_id`, ascending by distance then id
    async fn find_recommendations(
        &self,
        base_id: i32,
        limit: u32,
    ) -> AppResult<Vec<RecommendationRow>>;

    /// Connectivity probe plus a check for the vector extension
    async fn health(&self) -> AppResult<StorageHealth>;
}

/// `TitleRepository` backed by PostgreSQL + pgvector
#[derive(Clone)]
pub struct PgTitleRepository {
    pool: PgPool,
    lookup_timeout: Duration,
    recommendation_timeout: Duration,
}

impl PgTitleRepository {
    pub fn new(pool: PgPool, lookup_timeout: Duration, recommendation_timeout: Duration) -> Self {
        Self {
            pool,
            lookup_timeout,
            recommendation_timeout,
        }
    }
}

/// Bounds a query by `limit`; the query future is dropped (and the statement
/// abandoned) on expiry.
async fn with_timeout<T, F>(limit: Duration, operation: &'static str, query: F) -> AppResult<T>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(limit, query).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(AppError::Timeout(operation)),
    }
}

#[async_trait::async_trait]
impl TitleRepository for PgTitleRepository {
    #[instrument(skip(self))]
    async fn find_title_by_id(&self, id: i32) -> AppResult<Option<Title>> {
        let sql = format!("SELECT {TITLE_COLUMNS} FROM titles t WHERE t.id = $1");

        with_timeout(
            self.lookup_timeout,
            "find_title_by_id",
            sqlx::query_as::<_, Title>(&sql).bind(id).fetch_optional(&self.pool),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn find_title_by_name_fuzzy(&self, name: &str) -> AppResult<Option<Title>> {
        let sql = format!(
            r#"
            SELECT {TITLE_COLUMNS}
            FROM titles t
            WHERE lower(t.title) = lower($1)
               OR strpos(lower(t.title), lower($1)) > 0
            ORDER BY (lower(t.title) = lower($1)) DESC, t.id ASC
            LIMIT 1
            "#
        );

        with_timeout(
            self.lookup_timeout,
            "find_title_by_name_fuzzy",
            sqlx::query_as::<_, Title>(&sql).bind(name).fetch_optional(&self.pool),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn find_recommendations(
        &self,
        base_id: i32,
        limit: u32,
    ) -> AppResult<Vec<RecommendationRow>> {
        let rows = with_timeout(
            self.recommendation_timeout,
            "find_recommendations",
            sqlx::query_as::<_, RecommendationRow>(RECOMMENDATIONS_SQL)
                .bind(base_id)
                .bind(i64::from(limit))
                .fetch_all(&self.pool),
        )
        .await?;

        tracing::debug!(base_id, limit, returned = rows.len(), "Nearest-neighbor query done");

        Ok(rows)
    }

    #[instrument(skip(self))]
    async fn health(&self) -> AppResult<StorageHealth> {
        let db: i32 = with_timeout(
            self.lookup_timeout,
            "health_select_one",
            sqlx::query_scalar("SELECT 1").fetch_one(&self.pool),
        )
        .await?;

        let pgvector: bool = with_timeout(
            self.lookup_timeout,
            "health_pgvector",
            sqlx::query_scalar(
                "SELECT EXISTS (SELECT 1 FROM pg_extension WHERE extname = 'vector')",
            )
            .fetch_one(&self.pool),
        )
        .await?;

        Ok(StorageHealth {
            status: "ok".to_string(),
            db,
            pgvector,
        })
    }
}
