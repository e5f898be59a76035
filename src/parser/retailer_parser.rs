// Retailer search-page parsing driven by configured CSS selectors
use crate::config::RetailerConfig;
use crate::model::{ParserError, RawCandidate};
use crate::parser::price_text::{
    MIN_PLAUSIBLE_PRICE, clean_product_name, clean_text, extract_original_price, extract_price,
    mentions_currency,
};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::debug;

/// Card prices at or below this are badges or counters, not prices.
const MIN_CARD_PRICE: f64 = 4.0;
/// Heuristic blocks shorter than this are widened to their parent.
const MIN_BLOCK_CHARS: usize = 40;
const MAX_BLOCK_CLIMB: usize = 5;

pub trait Parser {
    fn parse(&self, html: &str) -> Result<Vec<RawCandidate>, ParserError>;
}

pub struct RetailerParser {
    retailer: String,
    card_selector: Selector,
    name_selector: Selector,
    max_cards: usize,
}

impl RetailerParser {
    pub fn new(cfg: &RetailerConfig) -> Result<Self, ParserError> {
        let card_selector = Selector::parse(&cfg.selectors.product_card)
            .map_err(|e| ParserError::HtmlParseError(e.to_string()))?;
        let name_selector = Selector::parse(&cfg.selectors.name)
            .map_err(|e| ParserError::HtmlParseError(e.to_string()))?;
        Ok(Self {
            retailer: cfg.name.clone(),
            card_selector,
            name_selector,
            max_cards: cfg.max_cards,
        })
    }

    fn parse_cards(&self, document: &Html) -> Vec<RawCandidate> {
        let mut candidates = Vec::new();

        for card in document.select(&self.card_selector).take(self.max_cards) {
            let Some(name_node) = card.select(&self.name_selector).next() else {
                continue;
            };
            let raw_name = element_text(&name_node);
            let card_text = element_text(&card);
            let price = extract_price(&card_text);
            if price <= MIN_CARD_PRICE {
                continue;
            }
            let product_name = clean_product_name(&raw_name);
            if product_name.is_empty() {
                continue;
            }

            candidates.push(RawCandidate {
                retailer_id: self.retailer.clone(),
                product_name,
                original_price: extract_original_price(&card_text, price),
                raw_quantity_text: card_text,
                price,
            });
        }

        candidates
    }

    /// Fallback for pages whose markup does not match the selectors: walk every
    /// text node that mentions a currency and widen it to a product-sized block.
    fn heuristic_scan(&self, document: &Html) -> Vec<RawCandidate> {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        for node in document.tree.nodes() {
            let Some(text) = node.value().as_text() else {
                continue;
            };
            if !mentions_currency(text) {
                continue;
            }
            let Some(mut block) = node.parent().and_then(ElementRef::wrap) else {
                continue;
            };
            if matches!(block.value().name(), "script" | "style") {
                continue;
            }
            for _ in 0..MAX_BLOCK_CLIMB {
                if element_text(&block).chars().count() >= MIN_BLOCK_CHARS {
                    break;
                }
                match block.parent().and_then(ElementRef::wrap) {
                    Some(parent) => block = parent,
                    None => break,
                }
            }

            let block_text = element_text(&block);
            if !seen.insert(block_text.clone()) {
                continue;
            }
            let price = extract_price(&block_text);
            if price < MIN_PLAUSIBLE_PRICE {
                continue;
            }
            let product_name = clean_product_name(&block_text);
            if product_name.is_empty() {
                continue;
            }

            candidates.push(RawCandidate {
                retailer_id: self.retailer.clone(),
                product_name,
                original_price: extract_original_price(&block_text, price),
                raw_quantity_text: block_text,
                price,
            });
        }

        candidates
    }
}

impl Parser for RetailerParser {
    fn parse(&self, html: &str) -> Result<Vec<RawCandidate>, ParserError> {
        if html.trim().is_empty() {
            return Err(ParserError::MissingField("page body".into()));
        }
        let document = Html::parse_document(html);

        let candidates = self.parse_cards(&document);
        if !candidates.is_empty() {
            return Ok(candidates);
        }

        debug!("{}: no product cards matched, scanning price text", self.retailer);
        Ok(self.heuristic_scan(&document))
    }
}

fn element_text(element: &ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<Vec<_>>().join(" "))
}
