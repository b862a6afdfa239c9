use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;

use super::{FetchError, PricingFetcher, parse_pricing_grid};
use crate::types::{PriceRow, Show};

/// Reads the pricing grid straight from a show's page.
#[derive(Debug, Clone)]
pub struct WebPricingFetcher {
    client: Client,
}

impl WebPricingFetcher {
    pub fn new() -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: crate::utils::http_client()?,
        })
    }

    async fn get_html(&self, url: &str) -> Result<String, FetchError> {
        Ok(self
            .client
            .get(url)
            .send()
            .await
            .inspect_err(|e| log::error!("HTTP error: {e:?}"))?
            .error_for_status()?
            .text()
            .await
            .inspect_err(|e| log::error!("Decode error: {e:?}"))?)
    }
}

#[async_trait]
impl PricingFetcher for WebPricingFetcher {
    async fn fetch(&self, show: &Show, date: NaiveDate) -> Result<Vec<PriceRow>, FetchError> {
        log::info!("Fetching pricing grid for {} on {}", show.name, date);
        let html = self.get_html(&show.url).await?;
        let rows = parse_pricing_grid(&html, date)?;
        log::debug!("{} row(s) for {} on {}", rows.len(), show.name, date);
        Ok(rows)
    }
}
