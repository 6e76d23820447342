//! Configuration and file locations for the Veil CLI

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use veil_core::EngineConfig;

/// Default directory for keys and configuration
const VEIL_DIR: &str = ".veil";
const CONFIG_FILE: &str = "config.json";
const KEYS_FILE: &str = "keys.enc";

/// Get the veil directory path
pub fn veil_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(VEIL_DIR))
        .context("Could not find home directory")
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(veil_dir()?.join(CONFIG_FILE))
}

pub fn default_keys_path() -> Result<PathBuf> {
    Ok(veil_dir()?.join(KEYS_FILE))
}

/// `--config` if given, else `~/.veil/config.json`
pub fn resolve_config_path(path: Option<&Path>) -> Result<PathBuf> {
    match path {
        Some(path) => Ok(path.to_path_buf()),
        None => default_config_path(),
    }
}

/// Load the engine configuration. A missing file means defaults; an explicit
/// `--config` that does not exist is an error.
pub fn load_config(explicit: Option<&Path>) -> Result<EngineConfig> {
    let path = resolve_config_path(explicit)?;
    if !path.exists() {
        if explicit.is_some() {
            bail!("Config file not found: {}", path.display());
        }
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(EngineConfig::default());
    }

    let json = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}

pub fn save_config(path: &Path, config: &EngineConfig) -> Result<()> {
    let json = serde_json::to_string_pretty(config)?;
    write_private(path, json.as_bytes())
}

/// Write a file readable only by the owner, creating parent directories
pub fn write_private(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    // Set restrictive permissions on Unix
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::write(path, contents)?;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }

    #[cfg(not(unix))]
    {
        fs::write(path, contents)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use veil_core::ProofSystem;

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("absent.json"))).is_err());
    }

    #[test]
    fn test_config_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = EngineConfig {
            default_proof_system: ProofSystem::Plonk,
            scan_interval_ms: 5_000,
            ..EngineConfig::default()
        };
        save_config(&path, &config).unwrap();

        assert_eq!(load_config(Some(&path)).unwrap(), config);
    }

    #[test]
    fn test_partial_config_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"ttl": {"balanceSecs": 60}}"#).unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.ttl.balance_secs, 60);
        assert_eq!(config.ttl.identity_secs, 15 * 60);
        assert_eq!(config.default_proof_system, ProofSystem::Groth16);
    }

    #[cfg(unix)]
    #[test]
    fn test_private_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("secret");
        write_private(&path, b"x").unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
