pub mod providers;
pub mod recommendations;
pub mod scoring;

pub use providers::CatalogService;
pub use recommendations::Recommender;
