//! Configuration management for cachemine CLI

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Defaults for `cachemine run`, overridden by command-line arguments
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Game client installation folder
    pub client: Option<PathBuf>,
    /// Folder of pre-decoded JSON dumps
    pub dumps: Option<PathBuf>,
    /// Output folder for JSON files
    pub output: Option<PathBuf>,
    /// Translation language, or `multi`
    pub language: Option<String>,
    /// Fallback language for missing translations
    pub fallback_language: Option<String>,
    /// JSON indentation width
    pub indent: Option<usize>,
}

impl Config {
    /// Get the path to the config file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("cachemine");

        Ok(config_dir.join("config.toml"))
    }

    /// Load configuration from file, or default if it doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&contents).context("Failed to parse config file")
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory at {}", parent.display())
            })?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, contents)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;

        Ok(())
    }

    /// Apply every `Some` field of `update`
    pub fn merge(&mut self, update: Config) {
        let Config {
            client,
            dumps,
            output,
            language,
            fallback_language,
            indent,
        } = update;
        if client.is_some() {
            self.client = client;
        }
        if dumps.is_some() {
            self.dumps = dumps;
        }
        if output.is_some() {
            self.output = output;
        }
        if language.is_some() {
            self.language = language;
        }
        if fallback_language.is_some() {
            self.fallback_language = fallback_language;
        }
        if indent.is_some() {
            self.indent = indent;
        }
    }
}
