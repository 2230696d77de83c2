mod analysis;
mod collect;
mod config;
mod error;
mod matcher;
mod pipeline;
mod pricing;
mod report;
mod types;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::collect::HtmlCollector;
use crate::config::{output_dir_from_env, Config};
use crate::error::Result;
use crate::matcher::OllamaMatcher;
use crate::pipeline::{write_error_artifact, Pipeline, PipelineOutcome};
use crate::report::ReportRow;

/// Rows echoed to the log after a run.
const TOP_ROWS: usize = 5;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            let path = write_error_artifact(&output_dir_from_env(), &e.to_string());
            eprintln!("Output CSV: {}", path.display());
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    let pipeline = match build_pipeline(&cfg) {
        Ok(p) => p,
        Err(e) => {
            error!("Pipeline setup failed: {e}");
            let path = write_error_artifact(&cfg.output_dir, &e.to_string());
            info!("Output CSV: {}", path.display());
            std::process::exit(1);
        }
    };

    info!(
        sites = cfg.sites.len(),
        model = %cfg.model_name,
        min_confidence = cfg.min_confidence_threshold,
        "Starting prediction market unification"
    );
    let outcome = pipeline.run().await;
    log_outcome(&outcome);
}

fn build_pipeline(cfg: &Config) -> Result<Pipeline<HtmlCollector, OllamaMatcher>> {
    let collector = HtmlCollector::new(cfg)?;
    let matcher = OllamaMatcher::new(cfg)?;
    Ok(Pipeline::new(cfg.clone(), collector, matcher))
}

fn log_outcome(outcome: &PipelineOutcome) {
    info!(
        collection = %outcome.collection,
        analysis = %outcome.analysis,
        kind = ?outcome.report.kind,
        "Run complete"
    );
    if !outcome.analysis.is_success() {
        warn!("No unified report produced; fallback artifact written");
    }

    let s = &outcome.report.summary;
    info!(
        "Output CSV: {} | products: {} | avg confidence: {:.2}% | high confidence: {} | multi-source: {}",
        outcome.csv_path.display(),
        s.total_products,
        s.average_confidence,
        s.high_confidence_count,
        s.multi_source_count,
    );

    for (i, row) in outcome.report.top(TOP_ROWS).iter().enumerate() {
        log_row(i + 1, row);
    }
}

fn log_row(rank: usize, row: &ReportRow) {
    info!(
        rank,
        category = %row.category,
        "#{rank} {} | avg: {:.4} | range: {:.4}-{:.4} | confidence: {:.2} | members: {} | sources: {}",
        row.unified_name,
        row.average_price,
        row.min_price,
        row.max_price,
        row.confidence_level,
        row.source_count,
        row.sources.join(", "),
    );
}
