// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Loggraph CLI - contributor and ancestry graphs from commit and email logs

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use loggraph::commands;
use loggraph::export::ExportFormat;

#[derive(Parser)]
#[command(name = "loggraph")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Configuration file path (TOML)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the commit/contributor graph from a commit log
    Commits {
        /// Commit log (defaults to the configured log under the data directory)
        #[arg(short, long)]
        input: Option<std::path::PathBuf>,

        /// Output file (defaults to the configured graph under the data directory)
        #[arg(short, long)]
        output: Option<std::path::PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "graphml")]
        format: ExportFormat,

        /// Skip a header row
        #[arg(long)]
        headers: bool,
    },

    /// Build the sender/recipient multigraph from an email log
    Emails {
        /// Email log (defaults to the configured log under the data directory)
        #[arg(short, long)]
        input: Option<std::path::PathBuf>,

        /// Output file (defaults to the configured graph under the data directory)
        #[arg(short, long)]
        output: Option<std::path::PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "graphml")]
        format: ExportFormat,

        /// Skip a header row
        #[arg(long)]
        headers: bool,
    },

    /// Show the effective configuration
    Config {
        /// Configuration key (omit to print everything)
        key: Option<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: clap_complete::Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 if cli.quiet => tracing::Level::ERROR,
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = loggraph::config::load(cli.config.as_deref())?;
    let color = !cli.no_color;

    // Execute command
    match cli.command {
        Commands::Commits { input, output, format, headers } => {
            commands::commits::run(&config, input, output, format, headers, color)
        }
        Commands::Emails { input, output, format, headers } => {
            commands::emails::run(&config, input, output, format, headers, color)
        }
        Commands::Config { key } => {
            commands::config::run(&config, key.as_deref())
        }
        Commands::Completions { shell } => {
            commands::completions::run(shell, &mut Cli::command())
        }
    }
}
