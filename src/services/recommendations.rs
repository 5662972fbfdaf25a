use std::sync::Arc;

use tracing::instrument;

use crate::{
    db::{RecommendationCache, RecommendationKey, TitleRepository},
    error::{AppError, AppResult},
    models::Recommendation,
};

pub const DEFAULT_LIMIT: i64 = 5;
pub const MAX_LIMIT: i64 = 50;

/// Checks `1 <= limit <= MAX_LIMIT`
pub fn normalize_limit(limit: i64) -> AppResult<u32> {
    if (1..=MAX_LIMIT).contains(&limit) {
        Ok(limit as u32)
    } else {
        Err(AppError::BadRequest(format!(
            "limit must be between 1 and {}",
            MAX_LIMIT
        )))
    }
}

/// Nearest-neighbor recommendations with memoization
///
/// Collaborators are passed in explicitly: the repository issues the vector
/// query, the cache memoizes fully shaped responses per `(base_id, limit)`.
/// Concurrent misses for the same key may both query; the later put wins.
#[derive(Clone)]
pub struct RecommendationService {
    repository: Arc<dyn TitleRepository>,
    cache: RecommendationCache,
}

impl RecommendationService {
    pub fn new(repository: Arc<dyn TitleRepository>, cache: RecommendationCache) -> Self {
        Self { repository, cache }
    }

    /// Neighbors of `base_id`, ascending by distance (ties by id)
    #[instrument(skip(self))]
    pub async fn recommend_by_id(
        &self,
        base_id: i32,
        limit: i64,
    ) -> AppResult<Arc<Vec<Recommendation>>> {
        if base_id <= 0 {
            return Err(AppError::BadRequest(
                "id must be a positive integer".to_string(),
            ));
        }
        let limit = normalize_limit(limit)?;
        let key = RecommendationKey::new(base_id, limit);

        if let Some(cached) = self.cache.get(&key).await {
            tracing::debug!(key = %key, "Cache hit");
            return Ok(cached);
        }
        tracing::debug!(key = %key, "Cache miss");

        let rows = self.repository.find_recommendations(base_id, limit).await?;

        // Missing title and missing embedding both land here
        if rows.is_empty() {
            return Err(AppError::NotFound(format!(
                "No combined embedding available for title id: {}",
                base_id
            )));
        }

        let recommendations: Arc<Vec<Recommendation>> =
            Arc::new(rows.into_iter().map(Recommendation::from).collect());

        self.cache.put(key, recommendations.clone()).await;

        tracing::info!(
            base_id,
            limit,
            count = recommendations.len(),
            "Computed recommendations"
        );

        Ok(recommendations)
    }

    /// Resolves `name` with the fuzzy lookup, then delegates to `recommend_by_id`
    #[instrument(skip(self))]
    pub async fn recommend_by_title(
        &self,
        name: &str,
        limit: i64,
    ) -> AppResult<Arc<Vec<Recommendation>>> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::BadRequest("title must not be blank".to_string()));
        }
        normalize_limit(limit)?;

        let base = self
            .repository
            .find_title_by_name_fuzzy(name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Title not found: {}", name)))?;

        self.recommend_by_id(base.id, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::titles::MockTitleRepository;
    use crate::models::{RecommendationRow, Title};
    use mockall::predicate::eq;
    use std::num::NonZeroUsize;
    use std::time::Duration;

    fn row(id: i32, distance: f64) -> RecommendationRow {
        RecommendationRow {
            id,
            title: format!("Title {id}"),
            year: Some(2000 + id),
            title_type: "movie".to_string(),
            genres: Some(vec!["Drama".to_string()]),
            plot: None,
            poster_url: None,
            imdb_rating: Some(7.5),
            actors: None,
            directors: None,
            distance,
        }
    }

    fn title(id: i32, name: &str) -> Title {
        Title {
            id,
            title: name.to_string(),
            year: None,
            title_type: "movie".to_string(),
            poster_url: None,
            plot: None,
            directors: None,
            actors: None,
            genres: None,
            imdb_rating: None,
        }
    }

    fn service(repository: MockTitleRepository) -> RecommendationService {
        let cache =
            RecommendationCache::new(NonZeroUsize::new(100).unwrap(), Duration::from_secs(600));
        RecommendationService::new(Arc::new(repository), cache)
    }

    #[test]
    fn test_normalize_limit_bounds() {
        assert_eq!(normalize_limit(1).unwrap(), 1);
        assert_eq!(normalize_limit(50).unwrap(), 50);
        assert!(matches!(normalize_limit(0), Err(AppError::BadRequest(_))));
        assert!(matches!(normalize_limit(51), Err(AppError::BadRequest(_))));
        assert!(matches!(normalize_limit(-3), Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_shapes_rows_in_storage_order() {
        let mut repo = MockTitleRepository::new();
        repo.expect_find_recommendations()
            .with(eq(42), eq(3))
            .times(1)
            .returning(|_, _| Ok(vec![row(7, 0.1), row(9, 0.2), row(11, 0.3)]));

        let result = service(repo).recommend_by_id(42, 3).await.unwrap();

        let ids: Vec<i32> = result.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![7, 9, 11]);
        assert!((result[0].similarity - 0.9).abs() < 1e-9);
        for rec in result.iter() {
            assert!((rec.similarity + rec.distance - 1.0).abs() < 1e-9);
        }
        assert_eq!(result[0].genres, Some(vec!["Drama".to_string()]));
    }

    #[tokio::test]
    async fn test_second_call_served_from_cache() {
        let mut repo = MockTitleRepository::new();
        repo.expect_find_recommendations()
            .times(1)
            .returning(|_, _| Ok(vec![row(7, 0.1)]));

        let service = service(repo);
        let first = service.recommend_by_id(42, 5).await.unwrap();
        let second = service.recommend_by_id(42, 5).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_different_limit_is_a_different_entry() {
        let mut repo = MockTitleRepository::new();
        repo.expect_find_recommendations()
            .times(2)
            .returning(|_, limit| Ok((1..=limit as i32).map(|i| row(i + 1, i as f64 / 10.0)).collect()));

        let service = service(repo);
        assert_eq!(service.recommend_by_id(1, 2).await.unwrap().len(), 2);
        assert_eq!(service.recommend_by_id(1, 3).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_empty_result_is_not_found() {
        let mut repo = MockTitleRepository::new();
        repo.expect_find_recommendations()
            .times(2)
            .returning(|_, _| Ok(vec![]));

        let service = service(repo);
        let err = service.recommend_by_id(999, 5).await.unwrap_err();
        match err {
            AppError::NotFound(msg) => {
                assert_eq!(msg, "No combined embedding available for title id: 999")
            }
            other => panic!("unexpected error: {other:?}"),
        }

        // Failures are not memoized
        assert!(service.recommend_by_id(999, 5).await.is_err());
    }

    #[tokio::test]
    async fn test_invalid_input_never_reaches_storage() {
        let mut repo = MockTitleRepository::new();
        repo.expect_find_recommendations().never();

        let service = service(repo);
        for (id, limit) in [(0, 5), (-5, 5), (42, 0), (42, 51)] {
            let err = service.recommend_by_id(id, limit).await.unwrap_err();
            assert!(matches!(err, AppError::BadRequest(_)), "({id}, {limit})");
        }
    }

    #[tokio::test]
    async fn test_storage_error_propagates() {
        let mut repo = MockTitleRepository::new();
        repo.expect_find_recommendations()
            .returning(|_, _| Err(AppError::Timeout("find_recommendations")));

        let err = service(repo).recommend_by_id(42, 5).await.unwrap_err();
        assert!(err.is_infrastructure());
    }

    #[tokio::test]
    async fn test_recommend_by_title_resolves_id() {
        let mut repo = MockTitleRepository::new();
        repo.expect_find_title_by_name_fuzzy()
            .withf(|name| name == "inception")
            .times(1)
            .returning(|_| Ok(Some(title(12, "Inception"))));
        repo.expect_find_recommendations()
            .with(eq(12), eq(5))
            .times(1)
            .returning(|_, _| Ok(vec![row(7, 0.2)]));

        let result = service(repo).recommend_by_title(" inception ", 5).await.unwrap();
        assert_eq!(result[0].id, 7);
    }

    #[tokio::test]
    async fn test_recommend_by_unknown_title() {
        let mut repo = MockTitleRepository::new();
        repo.expect_find_title_by_name_fuzzy()
            .returning(|_| Ok(None));
        repo.expect_find_recommendations().never();

        let err = service(repo).recommend_by_title("Nope", 5).await.unwrap_err();
        match err {
            AppError::NotFound(msg) => assert_eq!(msg, "Title not found: Nope"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
