//! App Store access: data models and the scraper subprocess boundary.

pub mod models;
pub mod scraper;

pub use models::{category_name, rank_of, App, ChartEntry, ChartKind, Suggestion};
pub use scraper::{NodeScraper, ScrapeError, StoreSearch};
