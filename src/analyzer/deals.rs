use crate::model::{Deal, ScoredCandidate};
use std::collections::HashMap;

/// Keeps the cheapest unit price per retailer among ranked matches, cheapest
/// deal first.
///
/// Ties keep the earlier (better ranked) match.
pub fn best_per_retailer(item: &str, matches: &[ScoredCandidate]) -> Vec<Deal> {
    let mut best: HashMap<&str, &ScoredCandidate> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();

    for m in matches {
        let retailer = m.candidate.retailer();
        match best.get(retailer) {
            Some(current)
                if current.candidate.sortable_unit_price() <= m.candidate.sortable_unit_price() => {}
            Some(_) => {
                best.insert(retailer, m);
            }
            None => {
                order.push(retailer);
                best.insert(retailer, m);
            }
        }
    }

    let mut deals: Vec<Deal> = order
        .into_iter()
        .filter_map(|r| best.get(r))
        .map(|m| to_deal(item, m))
        .collect();
    deals.sort_by(|a, b| a.unit_price.total_cmp(&b.unit_price));
    deals
}

fn to_deal(item: &str, m: &ScoredCandidate) -> Deal {
    let c = &m.candidate;
    Deal {
        retailer: c.raw.retailer_id.clone(),
        product_name: c.raw.product_name.clone(),
        price: if c.raw.price.is_finite() { c.raw.price } else { 0.0 },
        unit_price: c.sortable_unit_price(),
        base_quantity: c.measure.base_quantity,
        base_unit: c.measure.base_unit,
        score: m.final_score,
        query_item: item.to_string(),
    }
}
