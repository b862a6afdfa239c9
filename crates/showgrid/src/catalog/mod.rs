mod parser;
pub mod scraper;

use async_trait::async_trait;

use crate::types::Show;

pub use parser::parse_shows;
pub use scraper::WebCatalog;

/// The catalog could not be loaded. Callers never get a partial show list.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Could not find the shows array in the page source")]
    ShowsArrayNotFound,
    #[error("Malformed shows array: {0}")]
    Json(#[from] serde_json::Error),
}

/// Source of the bookable shows and their performance date ranges.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn load_shows(&self) -> Result<Vec<Show>, CatalogError>;
}
