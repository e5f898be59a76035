// Price and product-name extraction from scraped card text
use regex::Regex;

lazy_static::lazy_static! {
    static ref PROMO_RES: Vec<Regex> = vec![
        Regex::new(r"(?i)(?:promo|promotion|special|ลดเหลือ|เหลือเพียง)\s*฿?\s*(\d+(?:\.\d+)?)").unwrap(),
        Regex::new(r"(?i)฿\s*(\d+(?:\.\d+)?)\s*(?:from|แทน)").unwrap(),
    ];
    static ref CURRENCY_PRICE_RE: Regex = Regex::new(r"(?i)(?:฿|บาท|THB)\s*(\d+(?:\.\d{1,2})?)").unwrap();
    static ref ANY_NUMBER_RE: Regex = Regex::new(r"\d+(?:\.\d{1,2})?").unwrap();

    static ref NAME_NOISE_RES: Vec<Regex> = vec![
        // "Buy 99฿ +1"
        Regex::new(r"(?i)(?:buy|ซื้อ)\s*[\d,.]+\s*(?:B|฿|บาท)\s*(?:\+\d+)?").unwrap(),
        // "Get 10 points"
        Regex::new(r"(?i)(?:get|รับ|earn|ฟรี)\s*[\d,.]+\s*(?:points|pts|คะแนน)").unwrap(),
        Regex::new(r"(?i)\bToday\s*[\d,.]*").unwrap(),
        Regex::new(r"(?i)\d+\+\s*units\s*-\d+%").unwrap(),
        // leading "35.00 / pack"
        Regex::new(r"(?i)^[\d,.]+\s*(?:/|-|บาท|THB|B)\s*(?:pack|pcs|ชิ้น|แพ็ค|kg|g|ขวด|กระป๋อง)?\s*").unwrap(),
    ];
    static ref TRAILING_NUMBERS_RE: Regex = Regex::new(r"\s+\d{2,}\s*\d*\s*$").unwrap();
    static ref CURRENCY_RE: Regex = Regex::new(r"(?i)(฿|THB|บาท)").unwrap();
    static ref LEADING_JUNK_RE: Regex = Regex::new("^[^a-zA-Z0-9\u{0E01}-\u{0E59}\"'(]+").unwrap();
}

const MAX_NAME_CHARS: usize = 120;

/// Prices below this are usually quantities or badges, not prices.
pub(crate) const MIN_PLAUSIBLE_PRICE: f64 = 5.0;

pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn mentions_currency(text: &str) -> bool {
    CURRENCY_RE.is_match(text)
}

/// Selling price from card text: promo price first, then the first
/// currency-anchored number, then the smallest plausible number. 0.0 when
/// nothing looks like a price.
pub fn extract_price(text: &str) -> f64 {
    let t = text.replace(',', "");
    let t = t.trim();
    if t.is_empty() {
        return 0.0;
    }

    for re in PROMO_RES.iter() {
        if let Some(price) = first_capture(re, t) {
            return price;
        }
    }
    if let Some(price) = first_capture(&CURRENCY_PRICE_RE, t) {
        return price;
    }

    ANY_NUMBER_RE
        .find_iter(t)
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .filter(|n| *n >= MIN_PLAUSIBLE_PRICE)
        .min_by(|a, b| a.total_cmp(b))
        .unwrap_or(0.0)
}

/// Crossed-out price: the largest currency-anchored number above `price`.
pub fn extract_original_price(text: &str, price: f64) -> Option<f64> {
    let t = text.replace(',', "");
    CURRENCY_PRICE_RE
        .captures_iter(&t)
        .filter_map(|cap| cap[1].parse::<f64>().ok())
        .filter(|p| *p > price)
        .max_by(|a, b| a.total_cmp(b))
}

/// Strips promo badges, points, leading price fragments, trailing counters
/// and currency marks from a scraped name.
pub fn clean_product_name(text: &str) -> String {
    let mut x = text.to_string();
    for re in NAME_NOISE_RES.iter() {
        x = re.replace_all(&x, " ").into_owned();
    }
    x = TRAILING_NUMBERS_RE.replace(&x, "").into_owned();
    x = CURRENCY_RE.replace_all(&x, "").into_owned();
    x = clean_text(&x);
    x = LEADING_JUNK_RE.replace(&x, "").into_owned();
    x.chars().take(MAX_NAME_CHARS).collect::<String>().trim().to_string()
}

fn first_capture(re: &Regex, text: &str) -> Option<f64> {
    re.captures(text).and_then(|cap| cap[1].parse::<f64>().ok())
}
