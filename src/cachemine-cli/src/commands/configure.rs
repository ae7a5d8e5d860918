//! Configuration command handlers
//!
//! Handles the `configure` subcommand for setting up cachemine defaults.

use crate::config::Config;
use anyhow::Result;
use std::path::Path;

/// Handle the configure command
///
/// Every `Some` field of `update` is stored; with `show` the current
/// configuration is printed instead.
pub fn handle(update: Config, show: bool) -> Result<()> {
    let path = Config::config_path()?;
    let mut config = Config::load_from(&path)?;

    if show {
        show_config(&config, &path);
        return Ok(());
    }

    if update == Config::default() {
        show_usage();
        return Ok(());
    }

    apply(&mut config, update, &path)?;
    println!("Config saved to: {}", path.display());
    Ok(())
}

fn apply(config: &mut Config, update: Config, path: &Path) -> Result<()> {
    config.merge(update);
    config.save_to(path)
}

fn display(value: Option<impl std::fmt::Display>) -> String {
    value.map_or_else(|| "(not set)".to_string(), |v| v.to_string())
}

/// Display current configuration
fn show_config(config: &Config, path: &Path) {
    println!("Client:            {}", display(config.client.as_ref().map(|p| p.display())));
    println!("Dumps:             {}", display(config.dumps.as_ref().map(|p| p.display())));
    println!("Output:            {}", display(config.output.as_ref().map(|p| p.display())));
    println!("Language:          {}", display(config.language.as_deref()));
    println!("Fallback language: {}", display(config.fallback_language.as_deref()));
    println!("Indent:            {}", display(config.indent));
    println!("Config file:       {}", path.display());
}

/// Show usage help for the configure command
fn show_usage() {
    println!("Usage: cachemine configure --client PATH --output PATH [--language LANG]");
    println!("   or: cachemine configure --show");
    println!();
    println!("Stored values are used by `cachemine run` when the matching");
    println!("argument is not given.");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_show_usage_does_not_panic() {
        show_usage();
    }

    #[test]
    fn test_apply_merges_and_saves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config {
            output: Some(PathBuf::from("/out")),
            ..Config::default()
        };

        apply(
            &mut config,
            Config {
                language: Some("de".to_string()),
                ..Config::default()
            },
            &path,
        )
        .unwrap();

        let saved = Config::load_from(&path).unwrap();
        assert_eq!(saved.output, Some(PathBuf::from("/out")));
        assert_eq!(saved.language.as_deref(), Some("de"));
    }

    #[test]
    fn test_display_unset() {
        assert_eq!(display(None::<usize>), "(not set)");
        assert_eq!(display(Some(4)), "4");
    }
}
