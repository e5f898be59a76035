// Core structs: RawCandidate, NormalizedCandidate, ScoredCandidate, Deal
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Unit price used when a record carries no usable number, so it sorts last.
pub const MISSING_UNIT_PRICE: f64 = 999_999.0;

/// One product card as scraped from a retailer search page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCandidate {
    pub retailer_id: String,
    pub product_name: String,
    pub raw_quantity_text: String,
    pub price: f64,
    pub original_price: Option<f64>,
}

/// Canonical denominator used to compare differently packaged products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BaseUnit {
    #[serde(rename = "kg")]
    Kg,
    #[serde(rename = "L")]
    L,
    #[serde(rename = "pcs")]
    Pcs,
    #[serde(rename = "egg")]
    Egg,
}

impl BaseUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            BaseUnit::Kg => "kg",
            BaseUnit::L => "L",
            BaseUnit::Pcs => "pcs",
            BaseUnit::Egg => "egg",
        }
    }
}

impl fmt::Display for BaseUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of the unit normalizer. `base_quantity` is always > 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitMeasure {
    pub base_quantity: f64,
    pub base_unit: BaseUnit,
    pub unit_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedCandidate {
    pub raw: RawCandidate,
    pub measure: UnitMeasure,
}

impl NormalizedCandidate {
    pub fn name(&self) -> &str {
        &self.raw.product_name
    }

    pub fn retailer(&self) -> &str {
        &self.raw.retailer_id
    }

    /// Unit price with malformed values replaced by [`MISSING_UNIT_PRICE`].
    pub fn sortable_unit_price(&self) -> f64 {
        let up = self.measure.unit_price;
        if up.is_finite() && up >= 0.0 {
            up
        } else {
            MISSING_UNIT_PRICE
        }
    }
}

/// A candidate that survived matching. `final_score >= similarity_score`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub candidate: NormalizedCandidate,
    pub similarity_score: f64,
    pub final_score: f64,
}

/// Best offer of one retailer for one requested item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    pub retailer: String,
    pub product_name: String,
    pub price: f64,
    pub unit_price: f64,
    pub base_quantity: f64,
    pub base_unit: BaseUnit,
    pub score: f64,
    pub query_item: String,
}

#[derive(Debug, Clone)]
pub struct ScrapeRequest {
    pub query: String,
    pub retailer: String,
}

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("http error: {0}")]
    HttpError(String),
    #[error("request timed out")]
    Timeout,
    #[error("invalid response: status {0}")]
    InvalidResponse(u16),
    #[error("bad search url: {0}")]
    InvalidUrl(String),
}

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("html parse error: {0}")]
    HtmlParseError(String),
    #[error("missing field: {0}")]
    MissingField(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),
    #[error("cached payload is not valid json: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("bad timestamp in cache: {0}")]
    Timestamp(String),
}

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding request failed: {0}")]
    Request(String),
    #[error("unexpected embedding response: {0}")]
    Response(String),
    #[error("provider returned {got} vectors for {expected} texts")]
    CountMismatch { expected: usize, got: usize },
    #[error("embedding provider not configured: {0}")]
    NotConfigured(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("embedding provider: {0}")]
    Embedding(#[from] EmbeddingError),
}
