//! `veil config init|show`

use std::path::Path;

use anyhow::{bail, Result};
use colored::Colorize;
use veil_core::EngineConfig;

use crate::config::{load_config, resolve_config_path, save_config};

/// Write the default configuration
pub fn init(explicit: Option<&Path>, force: bool) -> Result<()> {
    let path = resolve_config_path(explicit)?;
    if path.exists() && !force {
        bail!("Config already exists at {}. Use --force to overwrite.", path.display());
    }

    save_config(&path, &EngineConfig::default())?;
    println!("{} {}", "Wrote default config to".green(), path.display());
    Ok(())
}

/// Print the effective configuration
pub fn show(explicit: Option<&Path>) -> Result<()> {
    let config = load_config(explicit)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
