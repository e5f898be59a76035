//! Base similarity between the query and candidate names.
//!
//! Two strategies share one filtering pipeline: lexical (sequence ratio plus
//! substring/concept bonuses) and semantic (embedding cosine).

use crate::analyzer::embedding::{EmbeddingProvider, cosine_similarity};
use crate::analyzer::knowledge::KnowledgeBase;
use crate::model::EmbeddingError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    Lexical,
    Semantic,
}

/// Scores every name against the query. Inputs are already lowercased and
/// whitespace-collapsed; the output has one score per name.
pub trait Scorer: Send + Sync {
    fn mode(&self) -> MatchMode;
    fn score(&self, query: &str, names: &[String]) -> Result<Vec<f64>, EmbeddingError>;
}

/// Ratcliff/Obershelp similarity in 0..=1 over characters: `2 * M / T` where
/// `M` counts characters in recursively found longest common blocks.
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_chars(&a, &b) as f64 / total as f64
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, size) = longest_match(a, b, alo, ahi, blo, bhi);
        if size == 0 {
            continue;
        }
        matched += size;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + size < ahi && j + size < bhi {
            pending.push((i + size, ahi, j + size, bhi));
        }
    }
    matched
}

/// Longest common block in `a[alo..ahi]` / `b[blo..bhi]`; ties go to the
/// earliest block in `a`, then in `b`.
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
    // run[j + 1] = length of the common run ending at a[i], b[j]
    let mut prev = vec![0usize; bhi - blo + 1];
    let mut curr = vec![0usize; bhi - blo + 1];
    for i in alo..ahi {
        for j in blo..bhi {
            let k = j - blo + 1;
            curr[k] = if a[i] == b[j] { prev[k - 1] + 1 } else { 0 };
            if curr[k] > best_size {
                best_size = curr[k];
                best_i = i + 1 - best_size;
                best_j = j + 1 - best_size;
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    (best_i, best_j, best_size)
}

pub struct LexicalScorer {
    knowledge: Arc<KnowledgeBase>,
    substring_bonus: f64,
    concept_bonus: f64,
}

impl LexicalScorer {
    pub fn new(knowledge: Arc<KnowledgeBase>, substring_bonus: f64, concept_bonus: f64) -> Self {
        Self {
            knowledge,
            substring_bonus: substring_bonus.max(0.0),
            concept_bonus: concept_bonus.max(0.0),
        }
    }

    fn score_one(&self, query: &str, name: &str) -> f64 {
        let ratio = sequence_ratio(query, name);
        if name.contains(query) {
            ratio + self.substring_bonus
        } else if !self.knowledge.shared_concepts(query, name).is_empty() {
            ratio + self.concept_bonus
        } else {
            ratio
        }
    }
}

impl Scorer for LexicalScorer {
    fn mode(&self) -> MatchMode {
        MatchMode::Lexical
    }

    fn score(&self, query: &str, names: &[String]) -> Result<Vec<f64>, EmbeddingError> {
        Ok(names.iter().map(|n| self.score_one(query, n)).collect())
    }
}

pub struct SemanticScorer {
    provider: Arc<dyn EmbeddingProvider>,
}

impl SemanticScorer {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { provider }
    }
}

impl Scorer for SemanticScorer {
    fn mode(&self) -> MatchMode {
        MatchMode::Semantic
    }

    fn score(&self, query: &str, names: &[String]) -> Result<Vec<f64>, EmbeddingError> {
        let name_vectors = self.provider.embed(names)?;
        if name_vectors.len() != names.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: names.len(),
                got: name_vectors.len(),
            });
        }
        let query_vector = self
            .provider
            .embed(&[query.to_string()])?
            .into_iter()
            .next()
            .ok_or(EmbeddingError::CountMismatch {
                expected: 1,
                got: 0,
            })?;
        Ok(name_vectors
            .iter()
            .map(|v| cosine_similarity(&query_vector, v))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::embedding::NgramHashEmbedder;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn ratio_matches_difflib_values() {
        // difflib.SequenceMatcher(None, a, b).ratio()
        assert!(close(sequence_ratio("abcd", "bcde"), 0.75));
        assert!(close(sequence_ratio("coke", "coke can"), 2.0 * 4.0 / 12.0));
        assert!(close(sequence_ratio("coke", "coca-cola can 325ml"), 4.0 / 23.0));
        assert!(close(sequence_ratio("", ""), 1.0));
        assert!(close(sequence_ratio("abc", ""), 0.0));
    }

    #[test]
    fn ratio_handles_thai() {
        assert!(close(sequence_ratio("หมูสับ", "หมูสับ"), 1.0));
        assert!(sequence_ratio("หมูสับ", "หมูสับ 500 กรัม") > 0.5);
    }

    #[test]
    fn lexical_substring_bonus() {
        let s = LexicalScorer::new(Arc::new(KnowledgeBase::builtin()), 0.4, 0.3);
        let scores = s.score("coke", &["coke zero 1.5l".into()]).unwrap();
        let expected = sequence_ratio("coke", "coke zero 1.5l") + 0.4;
        assert!(close(scores[0], expected));
    }

    #[test]
    fn lexical_concept_bonus_bridges_spellings() {
        let s = LexicalScorer::new(Arc::new(KnowledgeBase::builtin()), 0.4, 0.3);
        let scores = s
            .score("coke", &["coca-cola can 325ml".into(), "whiskas cat food 1kg".into()])
            .unwrap();
        assert!(close(scores[0], 4.0 / 23.0 + 0.3));
        // "c", "o", "k" only: 2 * 3 / 24, no bonus
        assert!(close(scores[1], 0.25));
    }

    #[test]
    fn semantic_scores_through_provider() {
        let s = SemanticScorer::new(Arc::new(NgramHashEmbedder::new(256)));
        let scores = s
            .score("pork collar", &["pork collar".into(), "washing powder".into()])
            .unwrap();
        assert!(close(scores[0], 1.0) || (scores[0] - 1.0).abs() < 1e-5);
        assert!(scores[0] > scores[1]);
        assert_eq!(s.mode(), MatchMode::Semantic);
    }

    struct BrokenProvider;

    impl EmbeddingProvider for BrokenProvider {
        fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn semantic_rejects_short_batches() {
        let s = SemanticScorer::new(Arc::new(BrokenProvider));
        assert!(matches!(
            s.score("x", &["a".into()]),
            Err(EmbeddingError::CountMismatch { expected: 1, got: 0 })
        ));
    }
}
