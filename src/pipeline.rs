use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{error, info, warn};

use crate::analysis::normalizer::{normalize_batch, SkippedRecord};
use crate::analysis::recovery::{recover_value, Recovered};
use crate::analysis::analyze;
use crate::collect::{collect_all, ListingCollector};
use crate::config::Config;
use crate::matcher::ProductMatcher;
use crate::report::{build_report, write_report, Report};
use crate::types::SiteListings;

/// How a pipeline stage ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageStatus {
    Success,
    Failed(String),
    /// Not attempted because an earlier stage did not succeed.
    Skipped(String),
}

impl StageStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, StageStatus::Success)
    }
}

impl std::fmt::Display for StageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageStatus::Success => write!(f, "success"),
            StageStatus::Failed(reason) => write!(f, "failed ({reason})"),
            StageStatus::Skipped(reason) => write!(f, "skipped ({reason})"),
        }
    }
}

/// Result of turning one matcher payload into a report.
#[derive(Debug, Clone, PartialEq)]
pub struct UnifyOutcome {
    pub report: Report,
    /// Records dropped during normalization, with their position.
    pub skipped: Vec<SkippedRecord>,
    /// True when clusters came from regex field scraping.
    pub degraded: bool,
}

/// Recover, normalize, classify and aggregate a matcher payload.
/// Synchronous and infallible; an unusable payload gives a fallback report.
pub fn unify_payload(payload: &Value) -> UnifyOutcome {
    unify_recovered(recover_value(payload))
}

#[cfg(test)]
fn unify_text(raw: &str) -> UnifyOutcome {
    unify_recovered(crate::analysis::recovery::recover(raw))
}

fn unify_recovered(recovered: Recovered) -> UnifyOutcome {
    let degraded = recovered.is_degraded();
    if recovered.is_empty() {
        warn!("[RECOVERY] payload held no clusters");
    }
    let batch = normalize_batch(&recovered);
    let analyzed = batch.clusters.into_iter().map(analyze).collect();
    UnifyOutcome {
        report: build_report(analyzed),
        skipped: batch.skipped,
        degraded,
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// Artifact that was written.
    pub csv_path: PathBuf,
    pub report: Report,
    pub collection: StageStatus,
    pub analysis: StageStatus,
}

/// Collect → analyze → report. Each stage runs only if the previous one succeeded.
pub struct Pipeline<C, M> {
    cfg: Config,
    collector: C,
    matcher: M,
}

impl<C: ListingCollector, M: ProductMatcher> Pipeline<C, M> {
    pub fn new(cfg: Config, collector: C, matcher: M) -> Self {
        Self { cfg, collector, matcher }
    }

    /// Run every stage. Always writes an artifact and returns its path.
    pub async fn run(&self) -> PipelineOutcome {
        let (collection, listings) = self.collect_stage().await;

        let (analysis, raw) = if collection.is_success() {
            self.analyze_stage(&listings).await
        } else {
            warn!("[ANALYZE] skipping analysis: collection {collection}");
            (StageStatus::Skipped(format!("collection {collection}")), None)
        };

        let report = match raw {
            Some(raw) => {
                let outcome = unify_payload(&Value::String(raw));
                for skipped in &outcome.skipped {
                    warn!(index = skipped.index, "[REPORT] record left out: {}", skipped.reason);
                }
                if outcome.degraded {
                    warn!("[REPORT] report built from degraded payload recovery");
                }
                outcome.report
            }
            None => {
                warn!("[REPORT] writing fallback report: analysis {analysis}");
                Report::fallback()
            }
        };

        let csv_path = write_with_fallback(&report, &self.cfg.output_dir);
        PipelineOutcome { csv_path, report, collection, analysis }
    }

    async fn collect_stage(&self) -> (StageStatus, Vec<SiteListings>) {
        info!(sites = self.cfg.sites.len(), "[COLLECT] starting data collection");
        let listings = collect_all(&self.collector, &self.cfg.sites).await;

        let failed = listings.iter().filter(|l| l.is_error()).count();
        let products: usize = listings.iter().map(|l| l.products.len()).sum();

        if listings.is_empty() || failed == listings.len() {
            error!(failed, "[COLLECT] no site could be scraped");
            return (StageStatus::Failed(format!("{failed} of {} sites failed", listings.len())), listings);
        }

        info!(products, failed, "[COLLECT] data collection complete");
        (StageStatus::Success, listings)
    }

    async fn analyze_stage(&self, listings: &[SiteListings]) -> (StageStatus, Option<String>) {
        let usable: Vec<SiteListings> = listings.iter().filter(|l| !l.is_error()).cloned().collect();
        info!(sites = usable.len(), "[ANALYZE] starting product analysis");

        match self
            .matcher
            .match_products(&usable, self.cfg.min_confidence_threshold)
            .await
        {
            Ok(raw) => {
                info!(len = raw.len(), "[ANALYZE] product analysis complete");
                (StageStatus::Success, Some(raw))
            }
            Err(e) => {
                error!("[ANALYZE] product analysis failed: {e}");
                (StageStatus::Failed(e.to_string()), None)
            }
        }
    }
}

/// Write `report`; if that fails, try an error report in the same directory,
/// then in the working directory. Returns the last path attempted.
pub fn write_with_fallback(report: &Report, output_dir: &Path) -> PathBuf {
    let err = match write_report(report, output_dir) {
        Ok(path) => return path,
        Err(e) => e,
    };
    error!("[REPORT] failed to write {}: {err}", report.kind.file_name());

    let error_report = Report::error(&err.to_string());
    let mut last = output_dir.join(error_report.kind.file_name());
    for dir in [output_dir, Path::new(".")] {
        match write_report(&error_report, dir) {
            Ok(path) => return path,
            Err(e) => {
                error!(dir = %dir.display(), "[REPORT] failed to write error artifact: {e}");
                last = dir.join(error_report.kind.file_name());
            }
        }
    }
    last
}

/// Write the artifact for a run that failed before any stage could start.
pub fn write_error_artifact(output_dir: &Path, reason: &str) -> PathBuf {
    write_with_fallback(&Report::error(reason), output_dir)
}
