//! CLI argument definitions for cachemine

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cachemine")]
#[command(about = "Extract game client cache data to JSON", long_about = None)]
pub struct Cli {
    /// Log per-container progress and translation statistics
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract containers from every configured source into JSON files
    #[command(visible_alias = "r")]
    Run {
        /// Path to the game client folder (start.ini, bundled SQLite databases)
        #[arg(short, long, env = "CACHEMINE_CLIENT")]
        client: Option<PathBuf>,

        /// Path to a folder of pre-decoded JSON dumps
        #[arg(short, long, env = "CACHEMINE_DUMPS")]
        dumps: Option<PathBuf>,

        /// Output folder for JSON files
        #[arg(short, long, env = "CACHEMINE_OUTPUT")]
        output: Option<PathBuf>,

        /// Translate text fields into this language, or "multi" for all languages
        #[arg(short, long)]
        translate: Option<String>,

        /// Language used when a message has no text in the requested one
        #[arg(long)]
        fallback_language: Option<String>,

        /// Container name prefix of localization catalogs inside the dumps
        #[arg(long, default_value = "localizationfsd/localization_fsd_")]
        catalog_prefix: String,

        /// Comma-separated list of container names to extract
        #[arg(short, long, default_value = "")]
        list: String,

        /// JSON indentation width (0 for compact output)
        #[arg(long)]
        indent: Option<usize>,
    },

    /// List container names every source provides
    #[command(visible_alias = "ls")]
    Containers {
        /// Path to the game client folder
        #[arg(short, long, env = "CACHEMINE_CLIENT")]
        client: Option<PathBuf>,

        /// Path to a folder of pre-decoded JSON dumps
        #[arg(short, long, env = "CACHEMINE_DUMPS")]
        dumps: Option<PathBuf>,
    },

    /// Look up one localized message by label path or message id
    #[command(visible_alias = "t")]
    Text {
        /// Label path (`UI/Generic/Cancel`) or numeric message id
        target: String,

        /// Path to a folder of pre-decoded JSON dumps
        #[arg(short, long, env = "CACHEMINE_DUMPS")]
        dumps: Option<PathBuf>,

        /// Language of the text
        #[arg(short, long)]
        language: Option<String>,

        /// Language used when the message has no text in the requested one
        #[arg(long)]
        fallback_language: Option<String>,

        /// Container name prefix of localization catalogs inside the dumps
        #[arg(long, default_value = "localizationfsd/localization_fsd_")]
        catalog_prefix: String,

        /// Placeholder value as `variable=value`, may repeat
        #[arg(short, long = "arg", value_name = "VARIABLE=VALUE")]
        args: Vec<String>,
    },

    /// Configure default settings
    #[command(visible_alias = "c")]
    Configure {
        /// Set default client folder
        #[arg(long)]
        client: Option<PathBuf>,

        /// Set default dumps folder
        #[arg(long)]
        dumps: Option<PathBuf>,

        /// Set default output folder
        #[arg(long)]
        output: Option<PathBuf>,

        /// Set default translation language
        #[arg(long)]
        language: Option<String>,

        /// Set default fallback language
        #[arg(long)]
        fallback_language: Option<String>,

        /// Set default JSON indentation width
        #[arg(long)]
        indent: Option<usize>,

        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_arguments() {
        let cli = Cli::parse_from([
            "cachemine",
            "-v",
            "run",
            "--dumps",
            "/data/dumps",
            "-o",
            "/data/out",
            "-t",
            "multi",
            "-l",
            "invtypes,config.GetMap(1, 2)",
        ]);
        assert!(cli.verbose);
        let Commands::Run {
            dumps,
            output,
            translate,
            list,
            catalog_prefix,
            ..
        } = cli.command
        else {
            panic!("expected run");
        };
        assert_eq!(dumps, Some(PathBuf::from("/data/dumps")));
        assert_eq!(output, Some(PathBuf::from("/data/out")));
        assert_eq!(translate.as_deref(), Some("multi"));
        assert_eq!(list, "invtypes,config.GetMap(1, 2)");
        assert_eq!(catalog_prefix, "localizationfsd/localization_fsd_");
    }

    #[test]
    fn test_text_arguments() {
        let cli = Cli::parse_from([
            "cachemine",
            "t",
            "UI/Generic/Cancel",
            "-l",
            "de",
            "-a",
            "n=3",
            "--arg",
            "pilot=Ava",
        ]);
        let Commands::Text {
            target,
            language,
            args,
            ..
        } = cli.command
        else {
            panic!("expected text");
        };
        assert_eq!(target, "UI/Generic/Cancel");
        assert_eq!(language.as_deref(), Some("de"));
        assert_eq!(args, ["n=3", "pilot=Ava"]);
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
