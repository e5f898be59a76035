//! Veto rules that reject look-alike products: pet food for a human-food
//! query, toys, baby food, drinks, the wrong meat cut, offal, or the wrong
//! size grade.

use crate::analyzer::knowledge::{KnowledgeBase, MeatCutRule};
use crate::utils::{contains_any, contains_term};
use regex::Regex;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trap {
    PetFood,
    NonFood,
    ProcessedFood,
    Liquid,
    MeatCut,
    LowQualityPart,
    SizeMismatch,
}

impl fmt::Display for Trap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Trap::PetFood => "pet food",
            Trap::NonFood => "non-food",
            Trap::ProcessedFood => "processed/baby food",
            Trap::Liquid => "liquid",
            Trap::MeatCut => "meat cut mismatch",
            Trap::LowQualityPart => "low-quality part",
            Trap::SizeMismatch => "size number mismatch",
        };
        f.write_str(label)
    }
}

/// What the query itself asks for, computed once per `find_matches` call.
#[derive(Debug)]
pub struct QueryProfile<'a> {
    pub pet_related: bool,
    pub processed_related: bool,
    pub liquid_related: bool,
    pub wants_low_quality_part: bool,
    pub cut_rules: Vec<&'a MeatCutRule>,
    pub size_number: Option<u32>,
}

pub struct TrapFilter {
    kb: Arc<KnowledgeBase>,
    size_re: Option<Regex>,
    require_size_in_name: bool,
}

impl TrapFilter {
    /// `require_size_in_name` makes a name without any size number fail when
    /// the query names one; by default such names pass.
    pub fn new(kb: Arc<KnowledgeBase>, require_size_in_name: bool) -> Self {
        let size_re = build_size_regex(&kb.size_markers);
        Self {
            kb,
            size_re,
            require_size_in_name,
        }
    }

    /// `query` must already be lowercased and whitespace-collapsed.
    pub fn profile(&self, query: &str) -> QueryProfile<'_> {
        let kb = &self.kb;
        QueryProfile {
            pet_related: contains_any(query, &kb.pet_query_terms) || contains_any(query, &kb.pet_food),
            processed_related: contains_any(query, &kb.processed_food),
            liquid_related: contains_any(query, &kb.liquids) || contains_any(query, &kb.safe_liquids),
            wants_low_quality_part: contains_any(query, &kb.low_quality_parts),
            cut_rules: kb
                .meat_cut_rules
                .iter()
                .filter(|rule| contains_any(query, &rule.triggers))
                .collect(),
            size_number: self.size_numbers(query).into_iter().next(),
        }
    }

    /// First rule that vetoes `name` (lowercased) for this query, if any.
    pub fn first_trap(&self, profile: &QueryProfile<'_>, name: &str) -> Option<Trap> {
        let kb = &self.kb;

        if !profile.pet_related && contains_any(name, &kb.pet_food) {
            return Some(Trap::PetFood);
        }
        if contains_any(name, &kb.non_food) {
            return Some(Trap::NonFood);
        }
        if !profile.processed_related && contains_any(name, &kb.processed_food) {
            return Some(Trap::ProcessedFood);
        }
        if !profile.liquid_related
            && contains_any(name, &kb.liquids)
            && !contains_any(name, &kb.safe_liquids)
        {
            return Some(Trap::Liquid);
        }
        if profile
            .cut_rules
            .iter()
            .any(|rule| rule.avoid.iter().any(|term| contains_term(name, term)))
        {
            return Some(Trap::MeatCut);
        }
        if !profile.wants_low_quality_part && contains_any(name, &kb.low_quality_parts) {
            return Some(Trap::LowQualityPart);
        }
        if let Some(wanted) = profile.size_number {
            let found = self.size_numbers(name);
            let mismatch = if found.is_empty() {
                self.require_size_in_name
            } else {
                !found.contains(&wanted)
            };
            if mismatch {
                return Some(Trap::SizeMismatch);
            }
        }
        None
    }

    fn size_numbers(&self, text: &str) -> Vec<u32> {
        let Some(re) = &self.size_re else {
            return Vec::new();
        };
        re.captures_iter(text)
            .filter_map(|cap| cap[1].parse::<u32>().ok())
            .collect()
    }
}

fn build_size_regex(markers: &[String]) -> Option<Regex> {
    if markers.is_empty() {
        return None;
    }
    let mut sorted: Vec<&String> = markers.iter().collect();
    sorted.sort_by(|a, b| b.len().cmp(&a.len()));
    let alternation = sorted
        .iter()
        .map(|m| regex::escape(m))
        .collect::<Vec<_>>()
        .join("|");
    let pattern = format!(r"(?:^|[^a-z0-9])(?:{alternation})\s*(\d+)");
    match Regex::new(&pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!("Size rule disabled, bad marker pattern: {}", e);
            None
        }
    }
}
