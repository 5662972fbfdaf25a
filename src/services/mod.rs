pub mod recommendations;
pub mod titles;

pub use recommendations::RecommendationService;
pub use titles::TitleService;
