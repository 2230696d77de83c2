use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::analysis::recovery::{ExtractedCluster, Recovered};
use crate::config::{EXTRACTED_SOURCE, UNKNOWN_NAME};
use crate::pricing::{has_number, has_price_marker, parse_price};
use crate::types::{Cluster, ClusterOrigin, ProductRef};

/// Why a raw record did not become a cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Top-level record was a string, number, list, etc.
    NotAMapping(&'static str),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NotAMapping(kind) => write!(f, "record is a {kind}, not a mapping"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    /// Position in the recovered record list.
    pub index: usize,
    pub reason: SkipReason,
}

/// Result of normalizing every recovered record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedBatch {
    pub clusters: Vec<Cluster>,
    pub skipped: Vec<SkippedRecord>,
}

/// Canonicalize one matcher record into a [`Cluster`].
pub fn normalize(record: &Value) -> Result<Cluster, SkipReason> {
    let Value::Object(map) = record else {
        return Err(SkipReason::NotAMapping(json_kind(record)));
    };

    let unified_name = display_string(map.get("unified_name"));
    let members = match map.get("products") {
        Some(Value::Array(items)) => items.iter().map(member_ref).collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => vec![member_ref(other)],
    };

    let group_average_price = map.get("average_price").and_then(coerce_f64).unwrap_or(0.0);
    let confidence_level = map
        .get("confidence_level")
        .and_then(coerce_f64)
        .unwrap_or(0.0)
        .clamp(0.0, 100.0);

    Ok(Cluster {
        unified_name,
        members,
        group_average_price,
        confidence_level,
        sources: distinct_sources(map),
        origin: ClusterOrigin::Matched,
    })
}

/// A degraded-mode cluster: its own name is the only member.
pub fn from_extracted(extracted: &ExtractedCluster) -> Cluster {
    let unified_name = non_empty_or_unknown(extracted.unified_name.trim());
    Cluster {
        members: vec![ProductRef::BareName(unified_name.clone())],
        unified_name,
        group_average_price: extracted.average_price,
        confidence_level: extracted.confidence_level.clamp(0.0, 100.0),
        sources: vec![EXTRACTED_SOURCE.to_string()],
        origin: ClusterOrigin::Extracted,
    }
}

/// Normalize everything recovered from a payload, collecting skipped records.
pub fn normalize_batch(recovered: &Recovered) -> NormalizedBatch {
    let mut batch = NormalizedBatch::default();

    match recovered {
        Recovered::Structured(records) => {
            for (index, record) in records.iter().enumerate() {
                match normalize(record) {
                    Ok(cluster) => {
                        debug!(
                            index,
                            name = %cluster.unified_name,
                            members = cluster.members.len(),
                            origin = ?cluster.origin,
                            "[NORMALIZE] cluster ready"
                        );
                        batch.clusters.push(cluster);
                    }
                    Err(reason) => {
                        warn!(index, "[NORMALIZE] skipping record: {reason}");
                        batch.skipped.push(SkippedRecord { index, reason });
                    }
                }
            }
        }
        Recovered::Extracted(extracted) => {
            batch.clusters.extend(extracted.iter().map(from_extracted));
        }
    }

    info!(
        clusters = batch.clusters.len(),
        skipped = batch.skipped.len(),
        degraded = recovered.is_degraded(),
        "[NORMALIZE] batch complete"
    );
    batch
}

fn member_ref(entry: &Value) -> ProductRef {
    match entry {
        Value::String(name) => ProductRef::BareName(non_empty_or_unknown(name.trim())),
        Value::Object(fields) => {
            let name = match fields.get("name") {
                Some(v) if !v.is_null() => display_string(Some(v)),
                _ => entry.to_string(),
            };
            let price = fields.get("price").and_then(|raw| {
                let parsed = member_price(raw);
                if parsed.is_none() {
                    debug!(member = %name, price = %raw, "[NORMALIZE] member price not numeric, skipped");
                }
                parsed
            });
            ProductRef::Structured { name, price }
        }
        other => ProductRef::BareName(other.to_string()),
    }
}

/// Numbers are taken as-is; numeric strings are parsed; strings quoted like
/// market prices (`$`, `%`, `¢`) go through the price parser. A marker with
/// no digits (`"N/A%"`) leaves the member unpriced.
fn member_price(raw: &Value) -> Option<f64> {
    match raw {
        Value::String(s) if has_price_marker(s) && coerce_f64(raw).is_none() => {
            has_number(s).then(|| parse_price(s))
        }
        _ => coerce_f64(raw),
    }
}

/// Numeric coercion: JSON numbers and strings that parse as finite floats.
fn coerce_f64(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

fn display_string(v: Option<&Value>) -> String {
    match v {
        Some(Value::String(s)) => non_empty_or_unknown(s.trim()),
        Some(Value::Null) | None => UNKNOWN_NAME.to_string(),
        Some(other) => other.to_string(),
    }
}

fn non_empty_or_unknown(s: &str) -> String {
    if s.is_empty() {
        UNKNOWN_NAME.to_string()
    } else {
        s.to_string()
    }
}

fn distinct_sources(map: &Map<String, Value>) -> Vec<String> {
    let Some(Value::Array(items)) = map.get("sources") else {
        return Vec::new();
    };
    let mut sources: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let source = match item {
            Value::String(s) => s.trim().to_string(),
            other => other.to_string(),
        };
        if !source.is_empty() && !sources.contains(&source) {
            sources.push(source);
        }
    }
    sources
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn structured_record_with_mixed_members() {
        let record = json!({
            "unified_name": "2024 Presidential Election Winner",
            "products": [
                "Who wins the presidency?",
                {"name": "Presidential winner", "price": 0.55, "site": "Kalshi"},
                {"name": "Election 2024", "price": "0.6"},
                {"name": "No price here"},
                {"name": "Garbled", "price": "soon"}
            ],
            "average_price": 0.57,
            "confidence_level": "92.5",
            "sources": ["Polymarket", "Kalshi", "Polymarket"]
        });
        let cluster = normalize(&record).unwrap();
        assert_eq!(cluster.unified_name, "2024 Presidential Election Winner");
        assert_eq!(cluster.members.len(), 5);
        assert_eq!(cluster.members[0], ProductRef::BareName("Who wins the presidency?".to_string()));
        assert_eq!(cluster.members[1].price(), Some(0.55));
        assert_eq!(cluster.members[2].price(), Some(0.6));
        assert_eq!(cluster.members[3].price(), None);
        assert_eq!(cluster.members[4].price(), None);
        assert_eq!(cluster.members[4].display_name(), "Garbled");
        assert!((cluster.confidence_level - 92.5).abs() < 1e-9);
        assert_eq!(cluster.sources, vec!["Polymarket", "Kalshi"]);
        assert_eq!(cluster.origin, ClusterOrigin::Matched);
    }

    #[test]
    fn missing_fields_get_defaults() {
        let cluster = normalize(&json!({})).unwrap();
        assert_eq!(cluster.unified_name, UNKNOWN_NAME);
        assert!(cluster.members.is_empty());
        assert_eq!(cluster.group_average_price, 0.0);
        assert_eq!(cluster.confidence_level, 0.0);
        assert!(cluster.sources.is_empty());
    }

    #[test]
    fn empty_or_non_string_names() {
        assert_eq!(normalize(&json!({"unified_name": "  "})).unwrap().unified_name, UNKNOWN_NAME);
        assert_eq!(normalize(&json!({"unified_name": 2024})).unwrap().unified_name, "2024");
    }

    #[test]
    fn member_without_name_uses_its_own_text() {
        let cluster = normalize(&json!({"products": [{"price": 0.3}]})).unwrap();
        assert_eq!(cluster.members[0].display_name(), r#"{"price":0.3}"#);
        assert_eq!(cluster.members[0].price(), Some(0.3));
    }

    #[test]
    fn quoted_market_price_goes_through_parser() {
        let cluster = normalize(&json!({"products": [{"name": "A", "price": "65¢"}]})).unwrap();
        let price = cluster.members[0].price().unwrap();
        assert!((price - 0.65).abs() < 1e-9);
    }

    #[test]
    fn marker_without_digits_leaves_member_unpriced() {
        let record = json!({"products": [
            {"name": "A", "price": "N/A%"},
            {"name": "B", "price": "$--"},
            {"name": "C", "price": 0.2}
        ]});
        let cluster = normalize(&record).unwrap();
        let prices: Vec<_> = cluster.members.iter().map(ProductRef::price).collect();
        assert_eq!(prices, vec![None, None, Some(0.2)]);

        let stats = crate::analysis::aggregation::compute_stats(&cluster);
        assert!((stats.average_price - 0.2).abs() < 1e-9);
        assert!((stats.min_price - 0.2).abs() < 1e-9);
        assert!((stats.max_price - 0.2).abs() < 1e-9);
    }

    #[test]
    fn confidence_is_clamped() {
        assert_eq!(normalize(&json!({"confidence_level": 140})).unwrap().confidence_level, 100.0);
        assert_eq!(normalize(&json!({"confidence_level": -3})).unwrap().confidence_level, 0.0);
        assert_eq!(normalize(&json!({"confidence_level": "high"})).unwrap().confidence_level, 0.0);
    }

    #[test]
    fn non_mapping_is_skipped() {
        assert_eq!(normalize(&json!("just text")), Err(SkipReason::NotAMapping("string")));
        assert_eq!(normalize(&json!([1, 2])), Err(SkipReason::NotAMapping("list")));
    }

    #[test]
    fn batch_records_skips_with_index() {
        let recovered = Recovered::Structured(vec![
            json!({"unified_name": "A"}),
            json!(7),
            json!({"unified_name": "B"}),
        ]);
        let batch = normalize_batch(&recovered);
        assert_eq!(batch.clusters.len(), 2);
        assert_eq!(batch.skipped, vec![SkippedRecord { index: 1, reason: SkipReason::NotAMapping("number") }]);
    }

    #[test]
    fn extracted_clusters_are_tagged() {
        let recovered = Recovered::Extracted(vec![ExtractedCluster {
            unified_name: "Nobel Peace Prize".to_string(),
            average_price: 0.2,
            confidence_level: 65.0,
        }]);
        let batch = normalize_batch(&recovered);
        let cluster = &batch.clusters[0];
        assert_eq!(cluster.origin, ClusterOrigin::Extracted);
        assert_eq!(cluster.sources, vec![EXTRACTED_SOURCE]);
        assert_eq!(cluster.members, vec![ProductRef::BareName("Nobel Peace Prize".to_string())]);
        assert_eq!(cluster.group_average_price, 0.2);
    }
}
