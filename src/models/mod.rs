pub mod recommendation;
pub mod title;

pub use recommendation::{Recommendation, RecommendationRow};
pub use title::{StorageHealth, Title, TitleDetail, TitleLookup};
