//! Run-wide settings from `config.toml` or `config.json`.
//!
//! TOML files are preferred over JSON when both exist. Command-line flags
//! override file values.

use crate::paths;
use anyhow::{Context, Result};
use cmdrun::RunSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Base name of the settings file.
pub const CONFIG_NAME: &str = "config";

/// Supported config file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// File extension for this format
    pub fn extension(self) -> &'static str {
        match self {
            Self::Toml => "toml",
            Self::Json => "json",
        }
    }
}

/// Find `<name>.toml` or `<name>.json` in `dir`, TOML first.
pub fn find_config_file(dir: &Path, name: &str) -> Option<(PathBuf, ConfigFormat)> {
    [ConfigFormat::Toml, ConfigFormat::Json]
        .into_iter()
        .map(|format| (dir.join(format!("{name}.{}", format.extension())), format))
        .find(|(path, _)| path.is_file())
}

/// Settings shared by every command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Show child stdout instead of logging it.
    pub debug: bool,
    /// Attach every command to the terminal.
    pub interactive: bool,
    /// Run package commands elevated even when the provider does not ask for it.
    pub elevate: bool,
    /// Command log; defaults to `<state dir>/outfit.log`.
    pub log_file: Option<String>,
    /// Deadline for each command, in seconds.
    pub command_timeout_secs: Option<u64>,
    /// Deadline for each download, in seconds.
    pub download_timeout_secs: Option<u64>,
    /// Extra provider directories, searched after the standard ones.
    pub provider_dirs: Vec<String>,
}

impl Settings {
    /// Load settings from `config_dir`, or defaults when there is no file.
    pub fn load(config_dir: &Path) -> Result<Self> {
        let Some((path, format)) = find_config_file(config_dir, CONFIG_NAME) else {
            log::debug!("No config file in {}", config_dir.display());
            return Ok(Self::default());
        };
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        Self::parse(&content, format).with_context(|| format!("Invalid {}", path.display()))
    }

    /// Parse settings in a given format.
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self> {
        let settings: Self = match format {
            ConfigFormat::Toml => toml::from_str(content)?,
            ConfigFormat::Json => serde_json::from_str(content)?,
        };
        Ok(settings)
    }

    /// Command log path.
    pub fn log_path(&self) -> Result<PathBuf> {
        match &self.log_file {
            Some(file) => Ok(paths::expand(file)),
            None => paths::default_log_file(),
        }
    }

    /// Extra provider directories, expanded.
    pub fn provider_dirs(&self) -> Vec<PathBuf> {
        self.provider_dirs.iter().map(|d| paths::expand(d)).collect()
    }

    /// Download deadline.
    pub fn download_timeout(&self) -> Option<Duration> {
        self.download_timeout_secs.map(Duration::from_secs)
    }

    /// Settings for the command runner.
    pub fn run_settings(&self) -> Result<RunSettings> {
        Ok(RunSettings {
            debug: self.debug,
            interactive: self.interactive,
            elevate_by_default: self.elevate,
            log_file: Some(self.log_path()?),
            default_timeout: self.command_timeout_secs.map(Duration::from_secs),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        assert_eq!(Settings::load(dir.path()).unwrap(), Settings::default());
    }

    #[test]
    fn test_toml_preferred_over_json() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("config.toml"), "debug = true\n").unwrap();
        fs::write(dir.path().join("config.json"), r#"{"interactive": true}"#).unwrap();

        let (path, format) = find_config_file(dir.path(), CONFIG_NAME).unwrap();
        assert_eq!(format, ConfigFormat::Toml);
        assert!(path.ends_with("config.toml"));

        let settings = Settings::load(dir.path()).unwrap();
        assert!(settings.debug);
        assert!(!settings.interactive);
    }

    #[test]
    fn test_json_settings() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("config.json"),
            r#"{"elevate": true, "command_timeout_secs": 600, "provider_dirs": ["/srv/providers"]}"#,
        )
        .unwrap();

        let settings = Settings::load(dir.path()).unwrap();
        assert!(settings.elevate);
        assert_eq!(settings.provider_dirs(), vec![PathBuf::from("/srv/providers")]);

        let run = settings.run_settings().unwrap();
        assert!(run.elevate_by_default);
        assert_eq!(run.default_timeout, Some(Duration::from_secs(600)));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("config.toml"), "debgu = true\n").unwrap();
        let err = Settings::load(dir.path()).unwrap_err();
        assert!(format!("{err:#}").contains("config.toml"));
    }

    #[test]
    fn test_explicit_log_file() {
        let settings = Settings::parse(
            "log_file = \"/var/log/outfit.log\"\ndownload_timeout_secs = 30\n",
            ConfigFormat::Toml,
        )
        .unwrap();
        assert_eq!(settings.log_path().unwrap(), PathBuf::from("/var/log/outfit.log"));
        assert_eq!(settings.download_timeout(), Some(Duration::from_secs(30)));
    }
}
