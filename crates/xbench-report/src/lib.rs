#![deny(missing_docs)]
//! Report writing: per-case canonical JSON, CSV tables and console lines.

mod console;
mod model;
mod writer;

pub use console::{case_lines, pair_line, skipped_line};
pub use model::{CaseReport, RunEntry};
pub use writer::{write_case_report, ReportSink, RESULTS_FILE, SUMMARY_FILE, VALUES_FILE};
