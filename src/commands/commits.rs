// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Commits command - builds the commit/contributor graph from a commit log

use super::{output_path, print_report, timed, PipelineReport};
use crate::config::Config;
use crate::export::{write_graph, ExportFormat};
use crate::graph::build_graph;
use crate::parser::{open_commit_log, skip_malformed};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// Parse, build, weight and export in one pass over `input`
pub fn run_pipeline(
    input: &Path,
    output: &Path,
    format: ExportFormat,
    has_headers: bool,
    graph_name: &str,
) -> Result<PipelineReport> {
    info!("Reading commit log: {}", input.display());

    let mut reader = open_commit_log(input, has_headers)
        .with_context(|| format!("Failed to open {}", input.display()))?;

    let mut skipped = Vec::new();
    let mut graph = build_graph(graph_name, skip_malformed(reader.by_ref(), &mut skipped));
    reader
        .finish()
        .with_context(|| format!("Failed to read {}", input.display()))?;

    // Parent timestamps may arrive after their children, so weight last
    graph.annotate_elapsed();

    if graph.is_empty() {
        eprintln!("Warning: no commits parsed from {}", input.display());
    }

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

/// Run the commits command
pub fn run(
    config: &Config,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    format: ExportFormat,
    headers: bool,
    color: bool,
) -> Result<()> {
    let input = input.unwrap_or_else(|| config.resolve(&config.commit_log));
    let output = output_path(output, &config.resolve(&config.commit_graph), format);

    let report = run_pipeline(
        &input,
        &output,
        format,
        headers || config.has_headers,
        &config.graph_name,
    )?;
    print_report(&report, color);

    Ok(())
}
