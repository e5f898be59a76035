use crate::config::RetailerConfig;
use crate::model::{ScrapeRequest, ScraperError};
use crate::scraper::traits::Scraper;
use crate::utils::has_thai;

use rand::seq::IndexedRandom;
use reqwest::{Client, Url};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
];

pub struct ScraperImpl {
    client: Client,
    retailers: HashMap<String, RetailerConfig>,
}

impl ScraperImpl {
    pub fn new(retailers: &[RetailerConfig], timeout_seconds: u64) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| ScraperError::HttpError(e.to_string()))?;

        let retailers = retailers
            .iter()
            .map(|r| (r.name.clone(), r.clone()))
            .collect();

        Ok(Self { client, retailers })
    }

    fn build_url(&self, req: &ScrapeRequest) -> Result<Url, ScraperError> {
        let retailer = self
            .retailers
            .get(&req.retailer)
            .ok_or_else(|| ScraperError::InvalidUrl(format!("unknown retailer {}", req.retailer)))?;
        search_url(retailer, &req.query)
    }
}

/// Retailer search URL for `query`, switching to the Thai storefront when the
/// query is written in Thai and one is configured.
pub fn search_url(retailer: &RetailerConfig, query: &str) -> Result<Url, ScraperError> {
    let base = match &retailer.thai_search_url {
        Some(thai) if has_thai(query) => thai,
        _ => &retailer.search_url,
    };
    Url::parse_with_params(base, &[(retailer.query_param.as_str(), query)])
        .map_err(|e| ScraperError::InvalidUrl(format!("{base}: {e}")))
}

fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

#[async_trait::async_trait]
impl Scraper for ScraperImpl {
    async fn fetch(&self, req: &ScrapeRequest) -> Result<String, ScraperError> {
        let url = self.build_url(req)?;
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, random_user_agent())
            .send()
            .await
            .map_err(map_reqwest_error)?;

        if !response.status().is_success() {
            return Err(ScraperError::InvalidResponse(response.status().as_u16()));
        }

        response.text().await.map_err(map_reqwest_error)
    }
}

fn map_reqwest_error(e: reqwest::Error) -> ScraperError {
    if e.is_timeout() {
        ScraperError::Timeout
    } else {
        ScraperError::HttpError(e.to_string())
    }
}
