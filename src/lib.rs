//! Grocery price comparison across Thai retailers: scrape search pages,
//! normalize pack sizes to a common unit, keep only true matches and pick the
//! cheapest offer per retailer.

pub mod analyzer;
pub mod config;
pub mod model;
pub mod normalizer;
pub mod parser;
pub mod scraper;
pub mod storage;
pub mod utils;
