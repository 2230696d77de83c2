pub mod builder;
pub mod csv;
pub mod writer;

pub use builder::{build_report, Report, ReportRow};
pub use writer::write_report;
