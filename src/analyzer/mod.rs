// Analyzer module: similarity scoring, trap rules and ranking of scraped candidates.

pub mod deals;
pub mod embedding;
pub mod knowledge;
pub mod match_engine;
pub mod similarity;
pub mod traps;

// Re-export the main engine for ease of use.
pub use deals::best_per_retailer;
pub use match_engine::{MatchEngine, RankSettings};
pub use similarity::MatchMode;
