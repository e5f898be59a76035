//! Unit normalization: turns scraped name/quantity/price text into a price per
//! base unit (kg, L, pcs or egg).
//!
//! Best effort over unstructured Thai/English text. It never fails and never
//! returns a non-positive quantity; anything it cannot read degrades to
//! `1 pcs` at the listed price.

use crate::model::{BaseUnit, NormalizedCandidate, RawCandidate, UnitMeasure};
use crate::utils::round2;
use regex::Regex;

const FRESH_FOOD_TERMS: &[&str] = &[
    "pork", "chicken", "salmon", "fish", "meat", "beef", "หมู", "ไก่", "ปลา", "เนื้อ", "แซลมอน",
];

const KG_HINTS: &[&str] = &["kg", "kilo", "กก", "กิโล", "/kg", "ต่อกก"];

lazy_static::lazy_static! {
    // "egg", "eggs", "eggs10pcs" or Thai "ไข่"; not "eggplant"
    static ref EGG_NAME_RE: Regex = Regex::new(r"(?:^|[^a-z0-9])eggs?(?:[^a-z]|$)|ไข่").unwrap();
    static ref EGG_COUNT_RE: Regex = Regex::new(r"(\d+)(?:ฟอง|eggs|egg|pcs|ใบ)").unwrap();
    static ref EGG_PACK_RE: Regex = Regex::new(r"(?:pack|แพ็ค|x)(\d+)").unwrap();
}

const NUM: &str = r"(\d+(?:\.\d+)?)";
const TIMES: &str = r"[x\*×]";
const UNIT: &str = r"(กิโลกรัม|กิโล|ก\.ก\.?|กก\.?|kgs|kg|kilo|กรัม|ก\.|gm|g|มล\.?|ml|ลิตร|liter|litre|ล\.|l|pieces|piece|packs|pack|pcs|ขวด|แพ็ค|แพค|ชิ้น|กระป๋อง|กล่อง)";

lazy_static::lazy_static! {
    // "3x100g"
    static ref MULTI_PACK_FIRST_RE: Regex = Regex::new(&format!("{NUM}{TIMES}{NUM}{UNIT}")).unwrap();
    // "100gx3"
    static ref MULTI_PACK_LAST_RE: Regex = Regex::new(&format!("{NUM}{UNIT}{TIMES}{NUM}")).unwrap();
    // "100g"
    static ref SINGLE_RE: Regex = Regex::new(&format!("{NUM}{UNIT}")).unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnitFamily {
    Gram,
    Millilitre,
    Kilogram,
    Litre,
    Count,
}

impl UnitFamily {
    fn of(token: &str) -> Self {
        match token.trim_end_matches('.') {
            "g" | "gm" | "กรัม" | "ก" => UnitFamily::Gram,
            "ml" | "มล" => UnitFamily::Millilitre,
            "kg" | "kgs" | "kilo" | "กิโล" | "กิโลกรัม" | "กก" | "ก.ก" => UnitFamily::Kilogram,
            "l" | "liter" | "litre" | "ลิตร" | "ล" => UnitFamily::Litre,
            _ => UnitFamily::Count,
        }
    }

    fn to_base(self, quantity: f64) -> (f64, BaseUnit) {
        match self {
            UnitFamily::Gram => (quantity / 1000.0, BaseUnit::Kg),
            UnitFamily::Millilitre => (quantity / 1000.0, BaseUnit::L),
            UnitFamily::Kilogram => (quantity, BaseUnit::Kg),
            UnitFamily::Litre => (quantity, BaseUnit::L),
            UnitFamily::Count => (quantity, BaseUnit::Pcs),
        }
    }
}

/// Normalizes one scraped listing into a [`UnitMeasure`].
pub fn normalize_unit_data(name: &str, raw_quantity_text: &str, price: f64) -> UnitMeasure {
    let price = if price.is_finite() && price > 0.0 { price } else { 0.0 };
    let quantity_text = clean_quantity_text(raw_quantity_text);
    let name_lower = name.to_lowercase();

    if EGG_NAME_RE.is_match(&name_lower) {
        let count = extract_egg_quantity(&format!("{} {}", name_lower, quantity_text));
        return UnitMeasure {
            base_quantity: count,
            base_unit: BaseUnit::Egg,
            unit_price: round2(price / count),
        };
    }

    let (quantity, family) = find_quantity(&quantity_text)
        .or_else(|| find_quantity(&clean_quantity_text(&name_lower)))
        .unwrap_or((1.0, UnitFamily::Count));
    let (mut base_quantity, mut base_unit) = family.to_base(quantity);

    // Fresh meat and fish listed "per kg" without a number are priced per kilogram.
    if base_unit == BaseUnit::Pcs {
        let is_fresh_food = FRESH_FOOD_TERMS.iter().any(|w| name_lower.contains(w));
        let has_kg_hint = KG_HINTS
            .iter()
            .any(|w| name_lower.contains(w) || quantity_text.contains(w));
        if is_fresh_food && has_kg_hint {
            base_unit = BaseUnit::Kg;
            base_quantity = 1.0;
        }
    }

    if !base_quantity.is_finite() || base_quantity <= 0.0 {
        base_quantity = 1.0;
    }

    UnitMeasure {
        base_quantity,
        base_unit,
        unit_price: round2(price / base_quantity),
    }
}

pub fn normalize_candidate(raw: RawCandidate) -> NormalizedCandidate {
    let measure = normalize_unit_data(&raw.product_name, &raw.raw_quantity_text, raw.price);
    NormalizedCandidate { raw, measure }
}

pub fn normalize_all(raws: Vec<RawCandidate>) -> Vec<NormalizedCandidate> {
    raws.into_iter().map(normalize_candidate).collect()
}

/// Lowercases, drops markup-duplicated integers ("12 12" -> "12") and
/// thousands separators, then removes all whitespace.
fn clean_quantity_text(text: &str) -> String {
    let lower = text.to_lowercase();
    let mut kept: Vec<&str> = Vec::new();
    for token in lower.split_whitespace() {
        let is_int = token.chars().all(|c| c.is_ascii_digit());
        if is_int && kept.last() == Some(&token) {
            continue;
        }
        kept.push(token);
    }
    kept.concat().replace(',', "")
}

fn extract_egg_quantity(text: &str) -> f64 {
    let compact: String = text.split_whitespace().collect();
    let count = EGG_COUNT_RE
        .captures(&compact)
        .or_else(|| EGG_PACK_RE.captures(&compact))
        .and_then(|cap| cap[1].parse::<f64>().ok())
        .unwrap_or(1.0);
    if count > 0.0 { count } else { 1.0 }
}

fn find_quantity(text: &str) -> Option<(f64, UnitFamily)> {
    if text.is_empty() {
        return None;
    }
    if let Some(cap) = MULTI_PACK_FIRST_RE.captures(text) {
        let n: f64 = cap[1].parse().ok()?;
        let m: f64 = cap[2].parse().ok()?;
        return Some((n * m, UnitFamily::of(&cap[3])));
    }
    if let Some(cap) = MULTI_PACK_LAST_RE.captures(text) {
        let n: f64 = cap[1].parse().ok()?;
        let m: f64 = cap[3].parse().ok()?;
        return Some((n * m, UnitFamily::of(&cap[2])));
    }
    let cap = SINGLE_RE.captures(text)?;
    let n: f64 = cap[1].parse().ok()?;
    Some((n, UnitFamily::of(&cap[2])))
}
