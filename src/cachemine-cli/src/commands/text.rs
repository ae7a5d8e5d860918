//! `text` command: look up one localized message

use crate::config::Config;
use crate::sources::DumpSource;
use anyhow::{bail, Context, Result};
use cachemine::{Language, LocalizationEngine, SourceCatalog};
use std::path::PathBuf;

/// Command-line arguments of `text`; unset values come from the config file
#[derive(Debug, Default)]
pub struct TextArgs {
    /// Label path, or a message id when it parses as an integer
    pub target: String,
    pub dumps: Option<PathBuf>,
    pub language: Option<String>,
    pub fallback_language: Option<String>,
    pub catalog_prefix: String,
    /// `variable=value` placeholder substitutions
    pub args: Vec<String>,
}

pub fn handle(args: &TextArgs, config: Config) -> Result<()> {
    println!("{}", lookup(args, config)?);
    Ok(())
}

fn lookup(args: &TextArgs, config: Config) -> Result<String> {
    let Some(dumps) = args.dumps.clone().or(config.dumps) else {
        bail!("Text lookup needs localization catalogs. Pass --dumps.");
    };

    let catalogs = SourceCatalog::new(DumpSource::new(dumps)).with_prefix(&args.catalog_prefix);
    let mut localizer = LocalizationEngine::new(catalogs);
    if let Some(fallback) = args.fallback_language.clone().or(config.fallback_language) {
        localizer = localizer.with_fallback(fallback);
    }

    let language = match args.language.clone().or(config.language) {
        Some(language) => match Language::new(&language) {
            Language::Single(language) => language,
            Language::FanOut => bail!("Text lookup needs a single language, not \"{}\"", language),
        },
        None => localizer.fallback().to_string(),
    };

    let substitutions = args
        .args
        .iter()
        .map(|arg| {
            arg.split_once('=')
                .with_context(|| format!("Invalid argument \"{}\", expected VARIABLE=VALUE", arg))
        })
        .collect::<Result<Vec<_>>>()?;

    let text = match args.target.parse::<i64>() {
        Ok(id) => localizer.text_by_message(id, &language, &substitutions),
        Err(_) => localizer.text_by_label(&args.target, &language, &substitutions),
    };
    text.with_context(|| format!("Failed to look up \"{}\"", args.target))
}
