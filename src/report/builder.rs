use crate::config::{ERROR_CSV, FALLBACK_CSV, HIGH_CONFIDENCE_THRESHOLD, OUTPUT_CSV};
use crate::types::{AnalyzedCluster, Category};

/// Which artifact a report becomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    /// At least one cluster survived normalization.
    Unified,
    /// Processing finished but produced no clusters.
    Fallback,
    /// The pipeline itself failed.
    Error,
}

impl ReportKind {
    pub fn file_name(&self) -> &'static str {
        match self {
            ReportKind::Unified => OUTPUT_CSV,
            ReportKind::Fallback => FALLBACK_CSV,
            ReportKind::Error => ERROR_CSV,
        }
    }
}

/// One CSV data row. Prices are rounded to 4 places, confidence to 2.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub unified_name: String,
    pub source_products: Vec<String>,
    pub average_price: f64,
    pub price_variance: f64,
    pub confidence_level: f64,
    pub source_count: usize,
    pub sources: Vec<String>,
    pub category: Category,
    pub min_price: f64,
    pub max_price: f64,
}

impl ReportRow {
    fn from_analyzed(entry: &AnalyzedCluster) -> Self {
        let AnalyzedCluster { cluster, stats, category } = entry;
        Self {
            unified_name: cluster.unified_name.clone(),
            source_products: cluster.members.iter().map(|m| m.display_name().to_string()).collect(),
            average_price: round_to(stats.average_price, 4),
            price_variance: round_to(stats.price_variance, 4),
            confidence_level: round_to(cluster.confidence_level, 2),
            source_count: stats.source_count,
            sources: cluster.sources.clone(),
            category: *category,
            min_price: round_to(stats.min_price, 4),
            max_price: round_to(stats.max_price, 4),
        }
    }

    /// Zero-filled row flagged with [`Category::Error`].
    fn placeholder(unified_name: &str, source_products: &str, sources: &str) -> Self {
        Self {
            unified_name: unified_name.to_string(),
            source_products: vec![source_products.to_string()],
            average_price: 0.0,
            price_variance: 0.0,
            confidence_level: 0.0,
            source_count: 0,
            sources: vec![sources.to_string()],
            category: Category::Error,
            min_price: 0.0,
            max_price: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReportSummary {
    pub total_products: usize,
    pub average_confidence: f64,
    /// Rows with confidence strictly above 80.
    pub high_confidence_count: usize,
    /// Rows with more than one member.
    pub multi_source_count: usize,
}

impl ReportSummary {
    fn from_rows(rows: &[ReportRow]) -> Self {
        if rows.is_empty() {
            return Self::default();
        }
        let total: f64 = rows.iter().map(|r| r.confidence_level).sum();
        Self {
            total_products: rows.len(),
            average_confidence: total / rows.len() as f64,
            high_confidence_count: rows
                .iter()
                .filter(|r| r.confidence_level > HIGH_CONFIDENCE_THRESHOLD)
                .count(),
            multi_source_count: rows.iter().filter(|r| r.source_count > 1).count(),
        }
    }
}

/// Final, sorted report. Never has zero rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub kind: ReportKind,
    pub rows: Vec<ReportRow>,
    pub summary: ReportSummary,
}

impl Report {
    /// Single-row report for a run that produced no clusters.
    pub fn fallback() -> Self {
        Self {
            kind: ReportKind::Fallback,
            rows: vec![ReportRow::placeholder("Error in processing", "N/A", "N/A")],
            summary: ReportSummary::default(),
        }
    }

    /// Single-row report for a run that failed before reaching the analysis stage.
    pub fn error(reason: &str) -> Self {
        Self {
            kind: ReportKind::Error,
            rows: vec![ReportRow::placeholder("Flow execution failed", reason, "Error")],
            summary: ReportSummary::default(),
        }
    }

    /// Highest-ranked rows, at most `n`.
    pub fn top(&self, n: usize) -> &[ReportRow] {
        &self.rows[..n.min(self.rows.len())]
    }
}

/// Sort analyzed clusters and compute summary statistics.
///
/// Rows are ordered by confidence, then member count, both descending; any
/// remaining ties keep input order. An empty input gives [`Report::fallback`].
pub fn build_report(entries: Vec<AnalyzedCluster>) -> Report {
    if entries.is_empty() {
        return Report::fallback();
    }

    let mut rows: Vec<ReportRow> = entries.iter().map(ReportRow::from_analyzed).collect();
    rows.sort_by(|a, b| {
        b.confidence_level
            .total_cmp(&a.confidence_level)
            .then(b.source_count.cmp(&a.source_count))
    });

    let summary = ReportSummary::from_rows(&rows);
    Report { kind: ReportKind::Unified, rows, summary }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Cluster, ClusterOrigin, ClusterStats, ProductRef};

    fn entry(name: &str, confidence: f64, members: usize) -> AnalyzedCluster {
        AnalyzedCluster {
            cluster: Cluster {
                unified_name: name.to_string(),
                members: (0..members).map(|i| ProductRef::BareName(format!("{name}-{i}"))).collect(),
                group_average_price: 0.0,
                confidence_level: confidence,
                sources: vec!["Kalshi".to_string()],
                origin: ClusterOrigin::Matched,
            },
            stats: ClusterStats { source_count: members, ..ClusterStats::default() },
            category: Category::Other,
        }
    }

    #[test]
    fn empty_input_gives_fallback_row() {
        let report = build_report(vec![]);
        assert_eq!(report.kind, ReportKind::Fallback);
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].category, Category::Error);
        assert_eq!(report.rows[0].average_price, 0.0);
        assert_eq!(report.rows[0].source_count, 0);
    }

    #[test]
    fn sorts_by_confidence_then_member_count() {
        let report = build_report(vec![
            entry("a", 90.0, 1),
            entry("b", 70.0, 1),
            entry("c", 70.0, 3),
        ]);
        let order: Vec<(f64, usize)> = report
            .rows
            .iter()
            .map(|r| (r.confidence_level, r.source_count))
            .collect();
        assert_eq!(order, vec![(90.0, 1), (70.0, 3), (70.0, 1)]);
    }

    #[test]
    fn full_ties_keep_input_order() {
        let report = build_report(vec![entry("first", 60.0, 2), entry("second", 60.0, 2)]);
        assert_eq!(report.rows[0].unified_name, "first");
        assert_eq!(report.rows[1].unified_name, "second");
    }

    #[test]
    fn summary_counts() {
        let report = build_report(vec![
            entry("a", 95.0, 2),
            entry("b", 80.0, 3),
            entry("c", 45.0, 1),
        ]);
        let s = report.summary;
        assert_eq!(s.total_products, 3);
        assert!((s.average_confidence - 73.333_333).abs() < 1e-4);
        assert_eq!(s.high_confidence_count, 1);
        assert_eq!(s.multi_source_count, 2);
    }

    #[test]
    fn rows_are_rounded_for_display() {
        let mut e = entry("a", 85.556, 2);
        e.stats.average_price = 0.123_456;
        e.stats.price_variance = 0.141_421_356;
        let report = build_report(vec![e]);
        let row = &report.rows[0];
        assert_eq!(row.confidence_level, 85.56);
        assert_eq!(row.average_price, 0.1235);
        assert_eq!(row.price_variance, 0.1414);
        assert_eq!(row.source_products, vec!["a-0", "a-1"]);
    }

    #[test]
    fn error_report_carries_reason() {
        let report = Report::error("matcher unreachable");
        assert_eq!(report.kind, ReportKind::Error);
        assert_eq!(report.rows[0].source_products, vec!["matcher unreachable"]);
        assert_eq!(report.rows[0].sources, vec!["Error"]);
        assert_eq!(report.kind.file_name(), ERROR_CSV);
    }

    #[test]
    fn top_is_bounded() {
        let report = build_report(vec![entry("a", 50.0, 1), entry("b", 40.0, 1)]);
        assert_eq!(report.top(5).len(), 2);
        assert_eq!(report.top(1)[0].unified_name, "a");
    }
}
