use crate::analyzer::similarity::MatchMode;
use crate::model::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

// Empirically tuned on Thai retailer catalogs; re-tune for other catalogs.
pub const DEFAULT_LEXICAL_THRESHOLD: f64 = 0.25;
pub const DEFAULT_SEMANTIC_THRESHOLD: f64 = 0.42;
pub const DEFAULT_SUBSTRING_BONUS: f64 = 0.4;
pub const DEFAULT_CONCEPT_BONUS: f64 = 0.3;
pub const DEFAULT_START_MATCH_BOOST: f64 = 0.2;
pub const DEFAULT_SHORT_NAME_BOOST: f64 = 0.25;
pub const DEFAULT_SHORT_NAME_DELTA: usize = 10;
pub const DEFAULT_PREFILTER_LIMIT: usize = 35;
pub const DEFAULT_MAX_RESULTS: usize = 20;
pub const DEFAULT_CACHE_MAX_AGE_SECONDS: u64 = 4 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectorConfig {
    pub product_card: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetailerConfig {
    pub name: String,
    /// Search page URL; the query is appended as `query_param`.
    pub search_url: String,
    #[serde(default = "default_query_param")]
    pub query_param: String,
    /// Used instead of `search_url` when the query contains Thai script.
    #[serde(default)]
    pub thai_search_url: Option<String>,
    pub selectors: SelectorConfig,
    #[serde(default = "default_max_cards")]
    pub max_cards: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    Ngram,
    Api,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingBackend,
    pub dimensions: usize,
    pub api_url: Option<String>,
    pub api_auth_header: Option<String>,
    pub api_model: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingBackend::Ngram,
            dimensions: 256,
            api_url: None,
            api_auth_header: None,
            api_model: None,
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub mode: MatchMode,
    pub lexical_threshold: f64,
    pub semantic_threshold: f64,
    pub prefilter_limit: usize,
    pub max_results: usize,
    pub substring_bonus: f64,
    pub concept_bonus: f64,
    pub start_match_boost: f64,
    pub short_name_boost: f64,
    pub short_name_delta: usize,
    /// Reject names with no size number when the query names one.
    pub require_size_in_name: bool,
    /// JSON file replacing the built-in keyword tables.
    pub knowledge_path: Option<PathBuf>,
    pub embedding: EmbeddingConfig,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            mode: MatchMode::Lexical,
            lexical_threshold: DEFAULT_LEXICAL_THRESHOLD,
            semantic_threshold: DEFAULT_SEMANTIC_THRESHOLD,
            prefilter_limit: DEFAULT_PREFILTER_LIMIT,
            max_results: DEFAULT_MAX_RESULTS,
            substring_bonus: DEFAULT_SUBSTRING_BONUS,
            concept_bonus: DEFAULT_CONCEPT_BONUS,
            start_match_boost: DEFAULT_START_MATCH_BOOST,
            short_name_boost: DEFAULT_SHORT_NAME_BOOST,
            short_name_delta: DEFAULT_SHORT_NAME_DELTA,
            require_size_in_name: false,
            knowledge_path: None,
            embedding: EmbeddingConfig::default(),
        }
    }
}

impl MatchConfig {
    /// Threshold for the configured mode; the two score scales differ.
    pub fn threshold(&self) -> f64 {
        match self.mode {
            MatchMode::Lexical => self.lexical_threshold,
            MatchMode::Semantic => self.semantic_threshold,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub path: PathBuf,
    pub max_age_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from("grocery_cache.db"),
            max_age_seconds: DEFAULT_CACHE_MAX_AGE_SECONDS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub retailers: Vec<RetailerConfig>,
    pub matching: MatchConfig,
    pub cache: CacheConfig,
    pub request_timeout_seconds: u64,
    /// Ranked matches handed to per-retailer deal selection.
    pub match_limit: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            retailers: Vec::new(),
            matching: MatchConfig::default(),
            cache: CacheConfig::default(),
            request_timeout_seconds: 60,
            match_limit: 25,
        }
    }
}

fn default_query_param() -> String {
    "q".into()
}

fn default_max_cards() -> usize {
    30
}

pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: AppConfig = serde_json::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let m = &self.matching;
        let weights = [
            ("lexical_threshold", m.lexical_threshold),
            ("semantic_threshold", m.semantic_threshold),
            ("substring_bonus", m.substring_bonus),
            ("concept_bonus", m.concept_bonus),
            ("start_match_boost", m.start_match_boost),
            ("short_name_boost", m.short_name_boost),
        ];
        for (name, value) in weights {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        if m.prefilter_limit == 0 || m.max_results == 0 {
            return Err(ConfigError::Invalid(
                "prefilter_limit and max_results must be positive".into(),
            ));
        }
        if m.mode == MatchMode::Semantic
            && m.embedding.provider == EmbeddingBackend::Api
            && m.embedding.api_url.is_none()
        {
            return Err(ConfigError::Invalid(
                "semantic api provider needs embedding.api_url".into(),
            ));
        }
        for r in &self.retailers {
            if r.name.trim().is_empty() || r.search_url.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "every retailer needs a name and search_url".into(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_object_gives_defaults() {
        let cfg: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.matching.threshold(), DEFAULT_LEXICAL_THRESHOLD);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn semantic_mode_uses_semantic_threshold() {
        let cfg: AppConfig =
            serde_json::from_str(r#"{ "matching": { "mode": "semantic", "semantic_threshold": 0.5 } }"#)
                .unwrap();
        assert_eq!(cfg.matching.mode, MatchMode::Semantic);
        assert_eq!(cfg.matching.threshold(), 0.5);
        assert_eq!(cfg.matching.prefilter_limit, DEFAULT_PREFILTER_LIMIT);
    }

    #[test]
    fn negative_boost_is_rejected() {
        let mut cfg = AppConfig::default();
        cfg.matching.start_match_boost = -0.1;
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn api_embeddings_need_url() {
        let mut cfg = AppConfig::default();
        cfg.matching.mode = MatchMode::Semantic;
        cfg.matching.embedding.provider = EmbeddingBackend::Api;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn loads_retailers_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "retailers": [{{
                    "name": "Makro",
                    "search_url": "https://www.makro.pro/en/search",
                    "selectors": {{ "product_card": "div.product", "name": "h3" }}
                }}],
                "cache": {{ "enabled": false }}
            }}"#
        )
        .unwrap();

        let cfg = load_config(file.path().to_str().unwrap()).unwrap();
        assert_eq!(cfg.retailers.len(), 1);
        assert_eq!(cfg.retailers[0].query_param, "q");
        assert_eq!(cfg.retailers[0].max_cards, 30);
        assert!(!cfg.cache.enabled);
        assert_eq!(cfg.cache.max_age_seconds, DEFAULT_CACHE_MAX_AGE_SECONDS);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(
            load_config("/definitely/not/here.json"),
            Err(ConfigError::Io(_))
        ));
    }
}
