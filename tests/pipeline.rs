use grocery_compare::analyzer::embedding::NgramHashEmbedder;
use grocery_compare::analyzer::{MatchEngine, best_per_retailer};
use grocery_compare::config::{RetailerConfig, SelectorConfig};
use grocery_compare::model::{BaseUnit, NormalizedCandidate, RawCandidate};
use grocery_compare::normalizer::{normalize_all, normalize_unit_data};
use grocery_compare::parser::{Parser, RetailerParser};
use std::sync::Arc;

fn raw(retailer: &str, name: &str, qty: &str, price: f64) -> RawCandidate {
    RawCandidate {
        retailer_id: retailer.into(),
        product_name: name.into(),
        raw_quantity_text: qty.into(),
        price,
        original_price: None,
    }
}

fn candidates(items: &[(&str, &str, &str, f64)]) -> Vec<NormalizedCandidate> {
    normalize_all(
        items
            .iter()
            .map(|(r, n, q, p)| raw(r, n, q, *p))
            .collect(),
    )
}

fn names(engine: &MatchEngine, query: &str, pool: &[NormalizedCandidate], threshold: f64) -> Vec<String> {
    engine
        .find_matches(query, pool, threshold)
        .into_iter()
        .map(|m| m.candidate.raw.product_name)
        .collect()
}

#[test]
fn normalized_measures_are_always_positive() {
    let cases = [
        ("Fresh Pork Belly /kg", "", 120.0),
        ("Eggs 10 pcs", "10 eggs", 45.0),
        ("Milk 1L", "1L", 55.0),
        ("Mystery item", "", 0.0),
        ("Rice 0kg", "0kg", 10.0),
        ("", "", -3.0),
        ("Water 6 x 1.5L", "", 69.0),
    ];
    for (name, qty, price) in cases {
        let m = normalize_unit_data(name, qty, price);
        assert!(m.base_quantity > 0.0, "{name}: {m:?}");
        assert!(m.unit_price >= 0.0, "{name}: {m:?}");
    }
}

#[test]
fn reference_normalizations() {
    let pork = normalize_unit_data("Fresh Pork Belly /kg", "", 120.0);
    assert_eq!((pork.base_unit, pork.base_quantity, pork.unit_price), (BaseUnit::Kg, 1.0, 120.0));

    let eggs = normalize_unit_data("Eggs 10 pcs", "10 eggs", 45.0);
    assert_eq!((eggs.base_unit, eggs.base_quantity, eggs.unit_price), (BaseUnit::Egg, 10.0, 4.5));

    let milk = normalize_unit_data("Milk 1L", "1L", 55.0);
    assert_eq!((milk.base_unit, milk.base_quantity, milk.unit_price), (BaseUnit::L, 1.0, 55.0));
}

#[test]
fn coke_keeps_coca_cola_and_drops_cat_food() {
    let pool = candidates(&[
        ("Lotus's", "Coca-Cola Can 325ml", "325ml", 16.0),
        ("Lotus's", "Whiskas Cat Food 1kg", "1kg", 189.0),
    ]);
    let found = names(&MatchEngine::lexical(), "Coke", &pool, 0.25);
    assert_eq!(found, vec!["Coca-Cola Can 325ml".to_string()]);
}

#[test]
fn pork_collar_drops_loin() {
    let pool = candidates(&[
        ("Big C", "Pork Collar Slice 500g", "500g", 89.0),
        ("Big C", "Pork Loin Steak 300g", "300g", 79.0),
    ]);
    let found = names(&MatchEngine::lexical(), "Pork Collar", &pool, 0.25);
    assert_eq!(found, vec!["Pork Collar Slice 500g".to_string()]);
}

#[test]
fn matching_is_repeatable_in_both_modes() {
    let pool = candidates(&[
        ("Lotus's", "Fresh Milk 1L", "1L", 55.0),
        ("Big C", "Fresh Milk 2L", "2L", 98.0),
        ("Makro", "Milk Tea 450ml", "450ml", 25.0),
        ("Makro", "UHT Milk Plain 1L", "1L", 49.0),
    ]);
    let lexical = MatchEngine::lexical();
    let semantic = MatchEngine::semantic(Arc::new(NgramHashEmbedder::new(256)));

    for (engine, threshold) in [(&lexical, 0.25), (&semantic, 0.1)] {
        let first = engine.find_matches("fresh milk", &pool, threshold);
        let second = engine.find_matches("fresh milk", &pool, threshold);
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }
}

#[test]
fn boosts_never_lower_the_score() {
    let pool = candidates(&[
        ("Lotus's", "Jasmine Rice 5kg", "5kg", 159.0),
        ("Big C", "Jasmine Rice Premium Grade Hom Mali 5kg Bag", "5kg", 189.0),
        ("Makro", "Rice Crackers Seaweed", "", 35.0),
    ]);
    for m in MatchEngine::lexical().find_matches("jasmine rice", &pool, 0.0) {
        assert!(m.final_score >= m.similarity_score, "{m:?}");
    }
}

#[test]
fn html_to_deals() {
    let retailer = |name: &str| RetailerConfig {
        name: name.into(),
        search_url: "https://shop.test/search".into(),
        query_param: "q".into(),
        thai_search_url: None,
        selectors: SelectorConfig {
            product_card: "div.item".into(),
            name: "span.name".into(),
        },
        max_cards: 30,
    };
    let lotus = r#"
        <div class="item"><span class="name">Fresh Milk 1L</span><b>฿55.00</b></div>
        <div class="item"><span class="name">Fresh Milk 2L</span><b>฿90.00</b></div>
        <div class="item"><span class="name">Whiskas Cat Milk 200ml</span><b>฿39.00</b></div>"#;
    let bigc = r#"
        <div class="item"><span class="name">Fresh Milk 1L</span><b>฿52.00</b></div>"#;

    let mut raw = RetailerParser::new(&retailer("Lotus's")).unwrap().parse(lotus).unwrap();
    raw.extend(RetailerParser::new(&retailer("Big C")).unwrap().parse(bigc).unwrap());
    assert_eq!(raw.len(), 4);

    let pool = normalize_all(raw);
    let matches = MatchEngine::lexical().find_matches("fresh milk", &pool, 0.25);
    assert!(matches.iter().all(|m| !m.candidate.raw.product_name.contains("Whiskas")));

    let deals = best_per_retailer("fresh milk", &matches);
    assert_eq!(deals.len(), 2);
    assert_eq!(deals[0].retailer, "Lotus's");
    assert_eq!(deals[0].product_name, "Fresh Milk 2L");
    assert_eq!(deals[0].unit_price, 45.0);
    assert_eq!(deals[1].retailer, "Big C");
    assert_eq!(deals[1].unit_price, 52.0);
}
