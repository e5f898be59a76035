use crate::model::{ScrapeRequest, ScraperError};

/// Fetches the raw search page of one retailer for one query.
#[async_trait::async_trait]
pub trait Scraper: Send + Sync {
    async fn fetch(&self, req: &ScrapeRequest) -> Result<String, ScraperError>;
}
