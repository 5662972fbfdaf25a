use serde::{Deserialize, Serialize};

/// Projection produced by the nearest-neighbor query
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct RecommendationRow {
    pub id: i32,
    pub title: String,
    pub year: Option<i32>,
    #[sqlx(rename = "type")]
    pub title_type: String,
    pub genres: Option<Vec<String>>,
    pub plot: Option<String>,
    pub poster_url: Option<String>,
    pub imdb_rating: Option<f64>,
    pub actors: Option<Vec<String>>,
    pub directors: Option<Vec<String>>,
    /// Cosine distance to the base title, in [0, 2]
    pub distance: f64,
}

/// A single neighbor as returned to the client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub id: i32,
    pub title: String,
    pub year: Option<i32>,
    #[serde(rename = "type")]
    pub title_type: String,
    pub genres: Option<Vec<String>>,
    pub plot: Option<String>,
    pub distance: f64,
    pub similarity: f64,
    pub poster_url: Option<String>,
    pub imdb_rating: Option<f64>,
    pub actors: Option<Vec<String>>,
    pub directors: Option<Vec<String>>,
}

impl From<RecommendationRow> for Recommendation {
    fn from(row: RecommendationRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            year: row.year,
            title_type: row.title_type,
            genres: row.genres,
            plot: row.plot,
            distance: row.distance,
            similarity: 1.0 - row.distance,
            poster_url: row.poster_url,
            imdb_rating: row.imdb_rating,
            actors: row.actors,
            directors: row.directors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(distance: f64) -> RecommendationRow {
        RecommendationRow {
            id: 7,
            title: "Interstellar".to_string(),
            year: Some(2014),
            title_type: "movie".to_string(),
            genres: Some(vec!["Sci-Fi".to_string()]),
            plot: None,
            poster_url: None,
            imdb_rating: Some(8.7),
            actors: None,
            directors: Some(vec!["Christopher Nolan".to_string()]),
            distance,
        }
    }

    #[test]
    fn test_similarity_is_one_minus_distance() {
        for distance in [0.0, 0.1, 0.5, 1.3, 2.0] {
            let rec = Recommendation::from(row(distance));
            assert!((rec.similarity + rec.distance - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_recommendation_field_names() {
        let json = serde_json::to_value(Recommendation::from(row(0.25))).unwrap();
        let obj = json.as_object().unwrap();

        for key in [
            "id", "title", "year", "type", "genres", "plot", "distance", "similarity",
            "posterUrl", "imdbRating", "actors", "directors",
        ] {
            assert!(obj.contains_key(key), "missing field {key}");
        }
        assert_eq!(obj.len(), 12);
        assert_eq!(json["similarity"], 0.75);
        assert!(json["posterUrl"].is_null());
    }
}
