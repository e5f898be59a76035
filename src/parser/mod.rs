// Parser module: search-page HTML to raw product candidates.

pub mod price_text;
pub mod retailer_parser;

pub use retailer_parser::{Parser, RetailerParser};
