pub mod cache;
pub mod postgres;
pub mod titles;

pub use cache::{RecommendationCache, RecommendationKey};
pub use postgres::create_pool;
pub use titles::{PgTitleRepository, TitleRepository};
