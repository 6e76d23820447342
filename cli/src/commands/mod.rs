//! Subcommand handlers

pub mod address;
pub mod config;
pub mod export;
pub mod export_view_key;
pub mod gas;
pub mod keygen;
pub mod prove;
pub mod scan;
pub mod send;
pub mod verify;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use veil_core::Proof;

/// Read a JSON proof export from disk
pub(crate) fn read_proof(path: &Path) -> Result<Proof> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read proof file {}", path.display()))?;
    veil_core::export::import_json(&json)
        .with_context(|| format!("{} is not a proof export", path.display()))
}
