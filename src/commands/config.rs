// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell

use crate::config::Config;
use anyhow::Result;

/// Print the effective configuration, or a single key of it
pub fn run(config: &Config, key: Option<&str>) -> Result<()> {
    match key {
        Some(key) => {
            tracing::debug!("Getting {}", key);
            println!("{}", config.get(key)?);
        }
        None => print!("{}", config.to_toml()?),
    }
    Ok(())
}
