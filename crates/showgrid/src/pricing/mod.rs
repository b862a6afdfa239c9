mod parser;
pub mod scraper;

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{PriceRow, Show};

pub use parser::parse_pricing_grid;
pub use scraper::WebPricingFetcher;

/// Why the pricing grid of one date could not be fetched.
///
/// Recorded on the date's result instead of being raised, so it only carries
/// owned, serializable details.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(String),
    #[error("Unexpected HTTP status {0}")]
    Status(u16),
    #[error("Pricing grid layout mismatch: {0}")]
    ParseMismatch(String),
    #[error("Fetch timed out after {0:?}")]
    Timeout(Duration),
    #[error("Cancelled before dispatch")]
    Cancelled,
    #[error("Fetch failed: {0}")]
    Failed(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => FetchError::Status(status.as_u16()),
            None => FetchError::Http(err.to_string()),
        }
    }
}

/// Retrieves the pricing grid of a show for a single performance date.
///
/// Implementations return rows in the order the grid lists them. An empty
/// grid (no performance, sold out) is `Ok(vec![])`, not an error.
#[async_trait]
pub trait PricingFetcher: Send + Sync {
    async fn fetch(&self, show: &Show, date: NaiveDate) -> Result<Vec<PriceRow>, FetchError>;
}
