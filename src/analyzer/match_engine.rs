use crate::analyzer::embedding::{ApiEmbedder, EmbeddingProvider, NgramHashEmbedder};
use crate::analyzer::knowledge::KnowledgeBase;
use crate::analyzer::similarity::{LexicalScorer, MatchMode, Scorer, SemanticScorer};
use crate::analyzer::traps::TrapFilter;
use crate::config::{EmbeddingBackend, MatchConfig};
use crate::model::{ConfigError, NormalizedCandidate, ScoredCandidate};
use crate::utils::normalize_text;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Post-filter knobs shared by both scoring modes.
#[derive(Debug, Clone, PartialEq)]
pub struct RankSettings {
    pub prefilter_limit: usize,
    pub max_results: usize,
    pub start_match_boost: f64,
    pub short_name_boost: f64,
    pub short_name_delta: usize,
}

impl RankSettings {
    pub fn from_config(cfg: &MatchConfig) -> Self {
        Self {
            prefilter_limit: cfg.prefilter_limit,
            max_results: cfg.max_results,
            start_match_boost: cfg.start_match_boost,
            short_name_boost: cfg.short_name_boost,
            short_name_delta: cfg.short_name_delta,
        }
    }
}

impl Default for RankSettings {
    fn default() -> Self {
        Self::from_config(&MatchConfig::default())
    }
}

/// Filters and ranks scraped candidates against a free-text query.
///
/// Stateless between calls; the knowledge base and scorer are read-only, so
/// one engine can be shared across threads.
pub struct MatchEngine {
    scorer: Box<dyn Scorer>,
    traps: TrapFilter,
    settings: RankSettings,
}

impl MatchEngine {
    pub fn new(scorer: Box<dyn Scorer>, traps: TrapFilter, settings: RankSettings) -> Self {
        Self {
            scorer,
            traps,
            settings,
        }
    }

    /// Lexical engine over the built-in tables with default settings.
    pub fn lexical() -> Self {
        Self::from_parts(&MatchConfig::default(), Arc::new(KnowledgeBase::builtin()), None)
    }

    /// Semantic engine over the built-in tables with default settings.
    pub fn semantic(provider: Arc<dyn EmbeddingProvider>) -> Self {
        let cfg = MatchConfig {
            mode: MatchMode::Semantic,
            ..MatchConfig::default()
        };
        Self::from_parts(&cfg, Arc::new(KnowledgeBase::builtin()), Some(provider))
    }

    /// Builds the engine described by `cfg`, loading the keyword tables and
    /// embedding provider it names.
    pub fn from_config(cfg: &MatchConfig) -> Result<Self, ConfigError> {
        let kb = match &cfg.knowledge_path {
            Some(path) => {
                info!("Loading knowledge base from {}", path.display());
                KnowledgeBase::load(path)?
            }
            None => KnowledgeBase::builtin(),
        };
        let provider: Option<Arc<dyn EmbeddingProvider>> = match cfg.mode {
            MatchMode::Lexical => None,
            MatchMode::Semantic => Some(match cfg.embedding.provider {
                EmbeddingBackend::Ngram => Arc::new(NgramHashEmbedder::new(cfg.embedding.dimensions)),
                EmbeddingBackend::Api => Arc::new(ApiEmbedder::from_config(&cfg.embedding)?),
            }),
        };
        Ok(Self::from_parts(cfg, Arc::new(kb), provider))
    }

    fn from_parts(
        cfg: &MatchConfig,
        kb: Arc<KnowledgeBase>,
        provider: Option<Arc<dyn EmbeddingProvider>>,
    ) -> Self {
        let scorer: Box<dyn Scorer> = match provider {
            Some(p) => Box::new(SemanticScorer::new(p)),
            None => Box::new(LexicalScorer::new(
                kb.clone(),
                cfg.substring_bonus,
                cfg.concept_bonus,
            )),
        };
        let traps = TrapFilter::new(kb, cfg.require_size_in_name);
        Self::new(scorer, traps, RankSettings::from_config(cfg))
    }

    pub fn mode(&self) -> MatchMode {
        self.scorer.mode()
    }

    /// Ranked true matches for `query`, best first.
    ///
    /// Never fails: an empty query, no candidates or an embedding failure all
    /// give an empty list.
    pub fn find_matches(
        &self,
        query: &str,
        candidates: &[NormalizedCandidate],
        threshold: f64,
    ) -> Vec<ScoredCandidate> {
        let query = normalize_text(query);
        if query.is_empty() || candidates.is_empty() {
            return Vec::new();
        }

        let names: Vec<String> = candidates.iter().map(|c| normalize_text(c.name())).collect();
        let scores = match self.scorer.score(&query, &names) {
            Ok(scores) if scores.len() == names.len() => scores,
            Ok(scores) => {
                warn!(
                    "Scorer returned {} scores for {} candidates, no matches for '{}'",
                    scores.len(),
                    names.len(),
                    query
                );
                return Vec::new();
            }
            Err(e) => {
                warn!("Similarity scoring failed for '{}': {}", query, e);
                return Vec::new();
            }
        };

        let mut passed: Vec<(usize, f64)> = scores
            .into_iter()
            .enumerate()
            .filter(|(_, score)| *score >= threshold)
            .collect();
        passed.sort_by(|a, b| b.1.total_cmp(&a.1));
        passed.truncate(self.settings.prefilter_limit);

        let profile = self.traps.profile(&query);
        let query_len = query.chars().count();
        let mut ranked: Vec<ScoredCandidate> = Vec::with_capacity(passed.len());

        for (idx, similarity) in passed {
            let name = &names[idx];
            if let Some(trap) = self.traps.first_trap(&profile, name) {
                debug!("Rejected '{}' ({})", candidates[idx].name(), trap);
                continue;
            }
            let final_score = similarity + self.boost(&query, query_len, name);
            ranked.push(ScoredCandidate {
                candidate: candidates[idx].clone(),
                similarity_score: similarity,
                final_score,
            });
        }

        ranked.sort_by(compare_ranked);
        ranked.truncate(self.settings.max_results);
        debug!(
            "'{}': {} of {} candidates matched ({:?} mode)",
            query,
            ranked.len(),
            candidates.len(),
            self.mode()
        );
        ranked
    }

    /// Rewards names that start with the query and names about as short as it.
    fn boost(&self, query: &str, query_len: usize, name: &str) -> f64 {
        let mut boost = 0.0;
        if name.starts_with(query) {
            boost += self.settings.start_match_boost.max(0.0);
        }
        if name.chars().count().abs_diff(query_len) <= self.settings.short_name_delta {
            boost += self.settings.short_name_boost.max(0.0);
        }
        boost
    }
}

/// Best score first; among equal scores the cheaper unit price wins.
fn compare_ranked(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    b.final_score.total_cmp(&a.final_score).then_with(|| {
        a.candidate
            .sortable_unit_price()
            .total_cmp(&b.candidate.sortable_unit_price())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EmbeddingError, RawCandidate};
    use crate::normalizer::normalize_candidate;

    fn candidate(retailer: &str, name: &str, price: f64) -> NormalizedCandidate {
        normalize_candidate(RawCandidate {
            retailer_id: retailer.into(),
            product_name: name.into(),
            raw_quantity_text: String::new(),
            price,
            original_price: None,
        })
    }

    fn names(matches: &[ScoredCandidate]) -> Vec<&str> {
        matches.iter().map(|m| m.candidate.name()).collect()
    }

    #[test]
    fn empty_inputs_give_empty_results() {
        let engine = MatchEngine::lexical();
        assert!(engine.find_matches("coke", &[], 0.25).is_empty());
        let cands = vec![candidate("A", "Coke 325ml", 15.0)];
        assert!(engine.find_matches("   ", &cands, 0.25).is_empty());
    }

    #[test]
    fn coke_keeps_cola_and_drops_cat_food() {
        let engine = MatchEngine::lexical();
        let cands = vec![
            candidate("Lotus", "Whiskas Cat Food 1kg", 159.0),
            candidate("BigC", "Coca-Cola Can 325ml", 16.0),
        ];
        let out = engine.find_matches("Coke", &cands, 0.25);
        assert_eq!(names(&out), vec!["Coca-Cola Can 325ml"]);
    }

    #[test]
    fn collar_query_drops_loin() {
        let engine = MatchEngine::lexical();
        let cands = vec![
            candidate("Makro", "Pork Collar Slice 500g", 95.0),
            candidate("Makro", "Pork Loin Steak 300g", 80.0),
        ];
        let out = engine.find_matches("Pork Collar", &cands, 0.25);
        assert_eq!(names(&out), vec!["Pork Collar Slice 500g"]);
    }

    #[test]
    fn boosts_only_add() {
        let engine = MatchEngine::lexical();
        let cands = vec![
            candidate("A", "Coke", 15.0),
            candidate("A", "Coke Zero Sugar Value Pack 12 Cans 325ml", 150.0),
        ];
        let out = engine.find_matches("coke", &cands, 0.25);
        assert_eq!(out.len(), 2);
        for m in &out {
            assert!(m.final_score >= m.similarity_score);
        }
        assert_eq!(out[0].candidate.name(), "Coke");
        // starts-with and short-name both apply to the exact name
        assert!((out[0].final_score - out[0].similarity_score - 0.45).abs() < 1e-9);
    }

    #[test]
    fn threshold_filters_weak_matches() {
        let engine = MatchEngine::lexical();
        let cands = vec![candidate("A", "Dishwashing Liquid 500ml", 45.0)];
        assert!(engine.find_matches("pork", &cands, 0.25).is_empty());
    }

    #[test]
    fn equal_scores_prefer_cheaper_unit_price() {
        let engine = MatchEngine::lexical();
        let cands = vec![
            candidate("A", "Pork Belly 1kg", 180.0),
            candidate("B", "Pork Belly 1kg", 160.0),
        ];
        let out = engine.find_matches("pork belly", &cands, 0.25);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].candidate.retailer(), "B");
    }

    #[test]
    fn malformed_unit_price_sorts_last() {
        let engine = MatchEngine::lexical();
        let mut broken = candidate("A", "Pork Belly 1kg", 180.0);
        broken.measure.unit_price = f64::NAN;
        let cands = vec![broken, candidate("B", "Pork Belly 1kg", 200.0)];
        let out = engine.find_matches("pork belly", &cands, 0.25);
        assert_eq!(out[0].candidate.retailer(), "B");
        assert_eq!(out[1].candidate.retailer(), "A");
    }

    #[test]
    fn results_are_capped() {
        let cfg = MatchConfig {
            max_results: 3,
            ..MatchConfig::default()
        };
        let engine = MatchEngine::from_config(&cfg).unwrap();
        let cands: Vec<_> = (0..10)
            .map(|i| candidate("A", &format!("Jasmine Rice {}kg", i + 1), 50.0 * (i + 1) as f64))
            .collect();
        assert_eq!(engine.find_matches("jasmine rice", &cands, 0.25).len(), 3);
    }

    #[test]
    fn traps_only_see_the_prefiltered_top() {
        let cands = vec![
            candidate("A", "Chicken Breast 1kg", 99.0),
            candidate("A", "Chicken Nuggets", 79.0),
        ];
        let narrow = MatchEngine::from_config(&MatchConfig {
            prefilter_limit: 1,
            ..MatchConfig::default()
        })
        .unwrap();
        assert!(narrow.find_matches("chicken", &cands, 0.25).is_empty());

        let out = MatchEngine::lexical().find_matches("chicken", &cands, 0.25);
        assert_eq!(names(&out), vec!["Chicken Breast 1kg"]);
    }

    #[test]
    fn milk_query_skips_thai_milk_bread() {
        let engine = MatchEngine::lexical();
        let cands = vec![
            candidate("A", "Fresh Milk 1L", 55.0),
            candidate("A", "ขนมปังนมสด", 25.0),
        ];
        let out = engine.find_matches("milk", &cands, 0.25);
        assert_eq!(names(&out), vec!["Fresh Milk 1L"]);
    }

    #[test]
    fn identical_calls_give_identical_rankings() {
        let engine = MatchEngine::lexical();
        let cands = vec![
            candidate("A", "Chicken Breast 1kg", 99.0),
            candidate("B", "Chicken Breast Skinless 500g", 60.0),
            candidate("C", "Chicken Wing 1kg", 89.0),
        ];
        let first = engine.find_matches("chicken breast", &cands, 0.25);
        let second = engine.find_matches("chicken breast", &cands, 0.25);
        assert_eq!(first, second);
        assert!(names(&first).iter().all(|n| !n.contains("Wing")));
    }

    #[test]
    fn semantic_mode_shares_the_trap_pipeline() {
        let engine = MatchEngine::semantic(Arc::new(NgramHashEmbedder::new(256)));
        assert_eq!(engine.mode(), MatchMode::Semantic);
        let cands = vec![
            candidate("A", "Pork Collar Slice 500g", 95.0),
            candidate("A", "Pork Collar Dog Treats", 60.0),
        ];
        let out = engine.find_matches("pork collar", &cands, 0.3);
        assert_eq!(names(&out), vec!["Pork Collar Slice 500g"]);
    }

    struct FailingProvider;

    impl EmbeddingProvider for FailingProvider {
        fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Err(EmbeddingError::Request("model offline".into()))
        }
    }

    #[test]
    fn embedding_failure_degrades_to_no_matches() {
        let engine = MatchEngine::semantic(Arc::new(FailingProvider));
        let cands = vec![candidate("A", "Coke 325ml", 15.0)];
        assert!(engine.find_matches("coke", &cands, 0.42).is_empty());
    }
}
