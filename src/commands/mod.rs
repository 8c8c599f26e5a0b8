// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Command implementations

pub mod commits;
pub mod completions;
pub mod config;
pub mod emails;

use crate::export::ExportFormat;
use crate::graph::GraphSummary;
use crate::parser::RowError;
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Outcome of one ingest-build-export run
#[derive(Debug)]
pub struct PipelineReport {
    /// Sizes of the graph that was written
    pub summary: GraphSummary,
    /// Rows that could not be parsed, in file order
    pub skipped: Vec<RowError>,
    /// Where the graph was written
    pub output: PathBuf,
    /// Format it was written in
    pub format: ExportFormat,
    /// Wall-clock time of the export step
    pub export_time: Duration,
}

/// Run `f`, returning its result with the time it took
pub fn timed<T>(f: impl FnOnce() -> T) -> (T, Duration) {
    let start = Instant::now();
    let result = f();
    (result, start.elapsed())
}

/// Pick the output path, swapping the extension to match `format` when it is a default
pub(crate) fn output_path(explicit: Option<PathBuf>, default: &Path, format: ExportFormat) -> PathBuf {
    explicit.unwrap_or_else(|| default.with_extension(format.extension()))
}

/// Print the run summary to stdout
pub fn print_report(report: &PipelineReport, color: bool) {
    println!("{}", report.summary);

    if !report.skipped.is_empty() {
        let line = format!("Skipped {} malformed row(s)", report.skipped.len());
        if color {
            println!("{}", line.yellow());
        } else {
            println!("{line}");
        }
    }

    let line = format!(
        "Wrote {} to {} in {:0.2} seconds",
        report.format.display_name(),
        report.output.display(),
        report.export_time.as_secs_f64()
    );
    if color {
        println!("{}", line.green());
    } else {
        println!("{line}");
    }
}
