//! Free-text price/probability parsing.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::config::{DEFAULT_PRICE, MAX_PRICE, MIN_PRICE};

static NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+\.?\d*").unwrap());

/// Characters stripped before looking for a number.
const PRICE_MARKERS: &[char] = &['$', '¢', '%'];

/// True if the text carries a currency, cent or percent marker.
pub fn has_price_marker(text: &str) -> bool {
    text.contains(PRICE_MARKERS)
}

/// True if the text holds at least one digit run `parse_price` can read.
pub fn has_number(text: &str) -> bool {
    NUMBER.is_match(text)
}

/// Parse a scraped price such as `"$0.65"`, `"65%"` or `"65¢"` into `[MIN_PRICE, MAX_PRICE]`.
///
/// The first number in the text wins. Percent inputs and anything above 1 are
/// read as percentages. Text without a number yields `DEFAULT_PRICE`. Never fails.
pub fn parse_price(text: &str) -> f64 {
    let stripped: String = text.chars().filter(|c| !PRICE_MARKERS.contains(c)).collect();

    let Some(m) = NUMBER.find(&stripped) else {
        debug!(input = text, "[PRICE] no number found, using default");
        return DEFAULT_PRICE;
    };
    let Ok(mut price) = m.as_str().parse::<f64>() else {
        debug!(input = text, "[PRICE] unparseable number, using default");
        return DEFAULT_PRICE;
    };

    if text.contains('%') || price > 1.0 {
        price /= 100.0;
    }

    price.clamp(MIN_PRICE, MAX_PRICE)
}
