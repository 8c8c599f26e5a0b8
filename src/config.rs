// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Configuration management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding input logs and written graphs
    pub data_dir: PathBuf,
    /// Commit log, relative to `data_dir` unless absolute
    pub commit_log: PathBuf,
    /// Commit graph output, relative to `data_dir` unless absolute
    pub commit_graph: PathBuf,
    /// Email log, relative to `data_dir` unless absolute
    pub email_log: PathBuf,
    /// Email graph output, relative to `data_dir` unless absolute
    pub email_graph: PathBuf,
    /// Skip the first row of every log
    pub has_headers: bool,
    /// Name written into the commit graph
    pub graph_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            commit_log: PathBuf::from("sklearncommits.txt"),
            commit_graph: PathBuf::from("sklearngraph.graphml"),
            email_log: PathBuf::from("email_series.csv"),
            email_graph: PathBuf::from("email_multigraph.graphml"),
            has_headers: false,
            graph_name: crate::graph::DEFAULT_GRAPH_NAME.to_string(),
        }
    }
}

impl Config {
    /// Resolve a configured file name against `data_dir`
    #[must_use]
    pub fn resolve(&self, file: &Path) -> PathBuf {
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.data_dir.join(file)
        }
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }

    /// Look up a single key, rendered as TOML
    pub fn get(&self, key: &str) -> Result<String> {
        let table = toml::Value::try_from(self).context("Failed to serialize configuration")?;
        let value = table
            .get(key)
            .ok_or_else(|| anyhow::anyhow!("Unknown configuration key: {}", key))?;
        Ok(match value {
            toml::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

/// Load configuration from `path`, or use defaults when no path is given
pub fn load(path: Option<&Path>) -> Result<Config> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(
            config::File::from(path)
                .format(config::FileFormat::Toml)
                .required(true),
        );
    }

    builder
        .build()
        .and_then(|built| built.try_deserialize::<Config>())
        .with_context(|| match path {
            Some(p) => format!("Failed to load configuration from {}", p.display()),
            None => "Failed to build default configuration".to_string(),
        })
}
