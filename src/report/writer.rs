use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::Result;
use crate::report::builder::Report;
use crate::report::csv::render;

/// Write the report into `output_dir` under the file name for its kind.
/// Creates the directory if needed and overwrites any previous artifact.
pub fn write_report(report: &Report, output_dir: &Path) -> Result<PathBuf> {
    if !output_dir.as_os_str().is_empty() {
        fs::create_dir_all(output_dir)?;
    }
    let path = output_dir.join(report.kind.file_name());
    fs::write(&path, render(report))?;

    info!(
        path = %path.display(),
        rows = report.rows.len(),
        kind = ?report.kind,
        "[REPORT] artifact written"
    );
    Ok(path)
}
