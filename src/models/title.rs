use serde::{Deserialize, Serialize};

/// A row of the `titles` table
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Title {
    pub id: i32,
    pub title: String,
    pub year: Option<i32>,
    #[sqlx(rename = "type")]
    pub title_type: String,
    pub poster_url: Option<String>,
    pub plot: Option<String>,
    pub directors: Option<Vec<String>>,
    pub actors: Option<Vec<String>>,
    pub genres: Option<Vec<String>>,
    pub imdb_rating: Option<f64>,
}

/// Full title record returned by `GET /api/titles/{id}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TitleDetail {
    pub id: i32,
    pub title: String,
    pub year: Option<i32>,
    #[serde(rename = "type")]
    pub title_type: String,
    pub genres: Option<Vec<String>>,
    pub plot: Option<String>,
    pub directors: Option<Vec<String>>,
    pub actors: Option<Vec<String>>,
    pub imdb_rating: Option<f64>,
    pub poster_url: Option<String>,
}

impl From<Title> for TitleDetail {
    fn from(title: Title) -> Self {
        Self {
            id: title.id,
            title: title.title,
            year: title.year,
            title_type: title.title_type,
            genres: title.genres,
            plot: title.plot,
            directors: title.directors,
            actors: title.actors,
            imdb_rating: title.imdb_rating,
            poster_url: title.poster_url,
        }
    }
}

/// Result of `GET /api/titles/lookup`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TitleLookup {
    pub id: i32,
    pub title: String,
}

impl From<&Title> for TitleLookup {
    fn from(title: &Title) -> Self {
        Self {
            id: title.id,
            title: title.title.clone(),
        }
    }
}

/// Outcome of the database health probe
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageHealth {
    pub status: String,
    pub db: i32,
    pub pgvector: bool,
}
