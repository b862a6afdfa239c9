use async_trait::async_trait;
use reqwest::Client;

use super::{CatalogError, CatalogSource, parse_shows};
use crate::types::Show;

#[derive(Debug, Clone)]
pub struct WebCatalog {
    client: Client,
    base_url: String,
}

impl WebCatalog {
    pub fn new() -> Result<Self, CatalogError> {
        Ok(Self {
            client: crate::utils::http_client()?,
            base_url: crate::BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl CatalogSource for WebCatalog {
    async fn load_shows(&self) -> Result<Vec<Show>, CatalogError> {
        let url = format!("{}/shows", self.base_url.trim_end_matches('/'));
        log::info!("Fetching show catalog from {}...", url);
        let html = self
            .client
            .get(&url)
            .send()
            .await
            .inspect_err(|e| log::error!("HTTP error: {e:?}"))?
            .error_for_status()?
            .text()
            .await?;

        let shows = parse_shows(&html, &self.base_url)?;
        log::info!("Found {} show(s) with group pricing", shows.len());
        Ok(shows)
    }
}
