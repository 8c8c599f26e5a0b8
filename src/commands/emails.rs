// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Emails command - builds the sender/recipient multigraph from an email log

use super::{output_path, print_report, timed, PipelineReport};
use crate::config::Config;
use crate::email::{build_email_graph, open_email_log};
use crate::export::{write_graph, ExportFormat};
use crate::parser::skip_malformed;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// Name given to email graphs
pub const EMAIL_GRAPH_NAME: &str = "Email Multigraph";

/// Parse, build and export an email log
pub fn run_pipeline(
    input: &Path,
    output: &Path,
    format: ExportFormat,
    has_headers: bool,
) -> Result<PipelineReport> {
    info!("Reading email log: {}", input.display());

    let mut reader = open_email_log(input, has_headers)
        .with_context(|| format!("Failed to open {}", input.display()))?;

    let mut skipped = Vec::new();
    let graph = build_email_graph(EMAIL_GRAPH_NAME, skip_malformed(reader.by_ref(), &mut skipped));
    reader
        .finish()
        .with_context(|| format!("Failed to read {}", input.display()))?;

    let (written, export_time) = timed(|| write_graph(&graph, format, output));
    written.with_context(|| format!("Failed to write {}", output.display()))?;

    Ok(PipelineReport {
        summary: graph.summary(),
        skipped,
        output: output.to_path_buf(),
        format,
        export_time,
    })
}

/// Run the emails command
pub fn run(
    config: &Config,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    format: ExportFormat,
    headers: bool,
    color: bool,
) -> Result<()> {
    let input = input.unwrap_or_else(|| config.resolve(&config.email_log));
    let output = output_path(output, &config.resolve(&config.email_graph), format);

    let report = run_pipeline(&input, &output, format, headers || config.has_headers)?;
    print_report(&report, color);

    Ok(())
}
