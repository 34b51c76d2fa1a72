//! CLI command handling

pub mod brief;
pub mod brief_handlers;
pub mod handlers;
pub mod workflow;
pub mod workflow_handlers;

use anyhow::{Context, Result};
use briefloop_core::models::Configuration;
use std::path::{Path, PathBuf};

/// Explicit config path, or the XDG default
pub fn resolve_config_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(expand_home(path)),
        None => Configuration::default_config_path(),
    }
}

fn expand_home(path: PathBuf) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path,
    }
}

/// Load and validate configuration, applying the `--data-dir` override
pub fn load_configuration(path: &Path, data_dir: Option<PathBuf>) -> Result<Configuration> {
    let mut config = Configuration::load_from_file(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;

    if let Some(dir) = data_dir {
        config.data_dir = expand_home(dir);
    }

    config
        .validate()
        .map_err(|errors| anyhow::anyhow!("Invalid configuration:\n  {}", errors.join("\n  ")))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use briefloop_core::models::{ControlLevel, LogLevel};
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = load_configuration(&dir.path().join("absent.toml"), None).unwrap();
        assert_eq!(config, Configuration::default());
    }

    #[test]
    fn test_data_dir_override() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "log_level = \"debug\"\ndefault_control_level = \"autopilot\"\n",
        )
        .unwrap();

        let config = load_configuration(&path, Some(dir.path().join("data"))).unwrap();
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.default_control_level, ControlLevel::Autopilot);
        assert_eq!(config.data_dir, dir.path().join("data"));
    }

    #[test]
    fn test_invalid_configuration_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "server_port = 80\n").unwrap();

        let err = load_configuration(&path, None).unwrap_err();
        assert!(err.to_string().contains("server_port"));
    }

    #[test]
    fn test_home_expansion() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(
                resolve_config_path(Some(PathBuf::from("~/briefloop.toml"))).unwrap(),
                home.join("briefloop.toml")
            );
        }
        assert_eq!(
            resolve_config_path(Some(PathBuf::from("/etc/briefloop.toml"))).unwrap(),
            PathBuf::from("/etc/briefloop.toml")
        );
    }
}
