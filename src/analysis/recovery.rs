//! Best-effort extraction of the matcher's cluster list from text that is
//! supposed to be JSON but may be prose-wrapped, truncated or garbled.
//!
//! Two tiers:
//! 1. Find the `"unified_products"` key, back up to the nearest `{`, and scan
//!    forward to the matching `}`. The candidate is parsed with serde_json.
//! 2. If that fails, scrape `unified_name`, `average_price` and
//!    `confidence_level` occurrences with regexes and zip them by index.
//!
//! Tier 2 is lossy: fields are paired by position only, so one missing field
//! shifts every later pairing. Its results are returned as
//! [`Recovered::Extracted`] so callers can tell them apart.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Key holding the cluster list in matcher output.
pub const CLUSTER_LIST_KEY: &str = "unified_products";

/// Key of the carrier field some callers wrap raw matcher text in.
pub const RAW_CARRIER_KEY: &str = "raw";

static NAME_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""unified_name":\s*"([^"]*)""#).unwrap());
static PRICE_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""average_price":\s*([\d.]+)"#).unwrap());
static CONFIDENCE_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""confidence_level":\s*([\d.]+)"#).unwrap());

/// A cluster rebuilt from scraped fields. Carries no members of its own.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedCluster {
    pub unified_name: String,
    pub average_price: f64,
    pub confidence_level: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Recovered {
    /// Raw cluster records from a payload that parsed as JSON.
    Structured(Vec<Value>),
    /// Degraded-mode clusters from regex field scraping.
    Extracted(Vec<ExtractedCluster>),
}

impl Recovered {
    pub fn len(&self) -> usize {
        match self {
            Recovered::Structured(records) => records.len(),
            Recovered::Extracted(clusters) => clusters.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Recovered::Extracted(_))
    }
}

/// Recover cluster records from raw matcher text. Never fails; an unusable
/// payload yields an empty [`Recovered::Extracted`].
pub fn recover(raw: &str) -> Recovered {
    match balanced_object(raw) {
        Some(candidate) => match parse_cluster_list(candidate) {
            Ok(records) => {
                info!(records = records.len(), "[RECOVERY] parsed cluster list");
                return Recovered::Structured(records);
            }
            Err(reason) => warn!("[RECOVERY] candidate object rejected: {reason}"),
        },
        None => debug!(len = raw.len(), "[RECOVERY] no balanced object around cluster list"),
    }

    let extracted = scrape_fields(raw);
    warn!(
        clusters = extracted.len(),
        "[RECOVERY] falling back to field scraping; pairings are positional"
    );
    Recovered::Extracted(extracted)
}

/// Recover from a payload that may already be parsed: a bare string, an
/// object holding the cluster list (itself possibly raw text), an object
/// wrapping raw text in a `raw` field, or a bare list of records.
pub fn recover_value(payload: &Value) -> Recovered {
    match payload {
        Value::String(raw) => recover(raw),
        Value::Array(records) => Recovered::Structured(records.clone()),
        Value::Object(map) => match (map.get(CLUSTER_LIST_KEY), map.get(RAW_CARRIER_KEY)) {
            (Some(Value::Array(records)), _) => Recovered::Structured(records.clone()),
            (Some(Value::String(raw)), _) => recover(raw),
            (_, Some(Value::String(raw))) => recover(raw),
            _ => {
                warn!("[RECOVERY] object payload has neither a cluster list nor raw text");
                Recovered::Structured(Vec::new())
            }
        },
        other => {
            warn!(payload = %other, "[RECOVERY] unsupported payload shape");
            Recovered::Structured(Vec::new())
        }
    }
}

/// The object enclosing the first cluster-list key, braces balanced.
/// Braces inside string literals are not counted.
fn balanced_object(raw: &str) -> Option<&str> {
    let marker = raw.find(&format!("\"{CLUSTER_LIST_KEY}\""))?;
    let start = raw[..marker].rfind('{')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, b) in raw.bytes().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&raw[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_cluster_list(candidate: &str) -> std::result::Result<Vec<Value>, String> {
    let data: Value = serde_json::from_str(candidate).map_err(|e| e.to_string())?;
    match data.get(CLUSTER_LIST_KEY) {
        Some(Value::Array(records)) => Ok(records.clone()),
        Some(_) => Err(format!("{CLUSTER_LIST_KEY} is not a list")),
        None => Err(format!("{CLUSTER_LIST_KEY} missing")),
    }
}

fn scrape_fields(raw: &str) -> Vec<ExtractedCluster> {
    let names: Vec<&str> = captures(&NAME_FIELD, raw).collect();
    let prices: Vec<f64> = captures(&PRICE_FIELD, raw).map(parse_or_zero).collect();
    let confidences: Vec<f64> = captures(&CONFIDENCE_FIELD, raw).map(parse_or_zero).collect();

    debug!(
        names = names.len(),
        prices = prices.len(),
        confidences = confidences.len(),
        "[RECOVERY] field scrape counts"
    );

    names
        .into_iter()
        .enumerate()
        .map(|(i, name)| ExtractedCluster {
            unified_name: name.to_string(),
            average_price: prices.get(i).copied().unwrap_or(0.0),
            confidence_level: confidences.get(i).copied().unwrap_or(0.0),
        })
        .collect()
}

fn captures<'a>(re: &'a Regex, text: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    re.captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
}

/// `[\d.]+` can match things like `1.2.3`.
fn parse_or_zero(s: &str) -> f64 {
    s.parse::<f64>().unwrap_or(0.0)
}
