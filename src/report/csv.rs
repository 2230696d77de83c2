//! CSV rendering: comment-prefixed summary block, header row, data rows.

use std::io::{self, Write};

use crate::report::builder::{Report, ReportRow, ReportSummary};

pub const DELIMITER: char = ',';

/// Separator for multi-valued text fields.
pub const LIST_SEPARATOR: &str = "; ";

pub const HEADER: [&str; 10] = [
    "unified_name",
    "source_products",
    "average_price",
    "price_variance",
    "confidence_level",
    "source_count",
    "sources",
    "category",
    "min_price",
    "max_price",
];

fn needs_quotes(field: &str, sep: char) -> bool {
    field.contains(sep) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Write one delimited row, quoting fields per RFC 4180.
pub fn write_row<W: Write, S: AsRef<str>>(mut w: W, row: &[S], sep: char) -> io::Result<()> {
    let mut first = true;
    for cell in row {
        let cell = cell.as_ref();
        if !first { write!(w, "{sep}")?; } else { first = false; }
        if needs_quotes(cell, sep) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            write!(w, "{cell}")?;
        }
    }
    writeln!(w)
}

/// `#`-prefixed summary lines, terminated by a bare `#` line.
pub fn write_summary<W: Write>(mut w: W, summary: &ReportSummary) -> io::Result<()> {
    writeln!(w, "# Summary Statistics")?;
    writeln!(w, "# Total Products: {}", summary.total_products)?;
    writeln!(w, "# Average Confidence: {:.2}%", summary.average_confidence)?;
    writeln!(w, "# High Confidence Products (>80%): {}", summary.high_confidence_count)?;
    writeln!(w, "# Multi-source Products: {}", summary.multi_source_count)?;
    writeln!(w, "#")
}

fn row_cells(row: &ReportRow) -> [String; 10] {
    [
        row.unified_name.clone(),
        row.source_products.join(LIST_SEPARATOR),
        row.average_price.to_string(),
        row.price_variance.to_string(),
        row.confidence_level.to_string(),
        row.source_count.to_string(),
        row.sources.join(LIST_SEPARATOR),
        row.category.to_string(),
        row.min_price.to_string(),
        row.max_price.to_string(),
    ]
}

/// Render the whole artifact.
pub fn render(report: &Report) -> String {
    let mut buf: Vec<u8> = Vec::new();

    // Writing into a Vec<u8> cannot fail.
    let _ = write_summary(&mut buf, &report.summary);
    let _ = write_row(&mut buf, &HEADER, DELIMITER);
    for row in &report.rows {
        let _ = write_row(&mut buf, &row_cells(row), DELIMITER);
    }

    // Every cell started as a String, so the bytes are valid UTF-8.
    String::from_utf8(buf).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::builder::build_report;
    use crate::types::{AnalyzedCluster, Category, Cluster, ClusterOrigin, ClusterStats, ProductRef};

    fn write_to_string(row: &[&str]) -> String {
        let mut buf = Vec::new();
        write_row(&mut buf, row, ',').unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn plain_fields_are_not_quoted() {
        assert_eq!(write_to_string(&["a", "b c", "0.5"]), "a,b c,0.5\n");
    }

    #[test]
    fn delimiters_and_quotes_are_escaped() {
        assert_eq!(
            write_to_string(&["Fed cut, March", "say \"yes\"", "x"]),
            "\"Fed cut, March\",\"say \"\"yes\"\"\",x\n"
        );
    }

    #[test]
    fn non_ascii_text_survives_rendering() {
        let report = crate::report::builder::Report::error("Präsidentschaft: 65¢ ungültig");
        let text = render(&report);
        assert!(text.contains("Flow execution failed,Präsidentschaft: 65¢ ungültig,0,0,0,0,Error,Error,0,0"));
    }

    #[test]
    fn renders_summary_header_and_rows() {
        let report = build_report(vec![AnalyzedCluster {
            cluster: Cluster {
                unified_name: "Bitcoin above 100k, end of year".to_string(),
                members: vec![
                    ProductRef::Structured { name: "BTC 100k".to_string(), price: Some(0.6) },
                    ProductRef::Structured { name: "Bitcoin 100k".to_string(), price: Some(0.4) },
                ],
                group_average_price: 0.0,
                confidence_level: 85.5,
                sources: vec!["Polymarket".to_string(), "Kalshi".to_string()],
                origin: ClusterOrigin::Matched,
            },
            stats: ClusterStats {
                average_price: 0.5,
                price_variance: 0.141_421_356,
                min_price: 0.4,
                max_price: 0.6,
                source_count: 2,
            },
            category: Category::FinancialMarkets,
        }]);

        let text = render(&report);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "# Summary Statistics");
        assert_eq!(lines[1], "# Total Products: 1");
        assert_eq!(lines[2], "# Average Confidence: 85.50%");
        assert_eq!(lines[3], "# High Confidence Products (>80%): 1");
        assert_eq!(lines[4], "# Multi-source Products: 1");
        assert_eq!(lines[5], "#");
        assert_eq!(lines[6], HEADER.join(","));
        assert_eq!(
            lines[7],
            "\"Bitcoin above 100k, end of year\",BTC 100k; Bitcoin 100k,0.5,0.1414,85.5,2,Polymarket; Kalshi,Financial Markets,0.4,0.6"
        );
        assert_eq!(lines.len(), 8);
    }

    #[test]
    fn fallback_renders_one_error_row() {
        let text = render(&build_report(vec![]));
        let data: Vec<&str> = text.lines().filter(|l| !l.starts_with('#')).collect();
        assert_eq!(data.len(), 2);
        assert_eq!(data[1], "Error in processing,N/A,0,0,0,0,N/A,Error,0,0");
        assert!(text.contains("# Total Products: 0"));
    }
}
