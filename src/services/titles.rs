use std::sync::Arc;

use crate::{
    db::TitleRepository,
    error::{AppError, AppResult},
    models::{StorageHealth, TitleDetail, TitleLookup},
};

/// Plain catalog reads: by id, by name, and the storage probe
#[derive(Clone)]
pub struct TitleService {
    repository: Arc<dyn TitleRepository>,
}

impl TitleService {
    pub fn new(repository: Arc<dyn TitleRepository>) -> Self {
        Self { repository }
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<TitleDetail> {
        if id <= 0 {
            return Err(AppError::BadRequest(
                "id must be a positive integer".to_string(),
            ));
        }

        self.repository
            .find_title_by_id(id)
            .await?
            .map(TitleDetail::from)
            .ok_or_else(|| AppError::NotFound(format!("Title not found: {}", id)))
    }

    pub async fn lookup(&self, name: &str) -> AppResult<TitleLookup> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::BadRequest("title must not be blank".to_string()));
        }

        let title = self
            .repository
            .find_title_by_name_fuzzy(name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Title not found: {}", name)))?;

        Ok(TitleLookup::from(&title))
    }

    pub async fn health(&self) -> AppResult<StorageHealth> {
        self.repository.health().await
    }
}
