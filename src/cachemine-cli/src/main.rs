mod cli;
mod commands;
mod config;
mod sink;
mod sources;

use anyhow::Result;
use clap::Parser;
use config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::*;

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "cachemine=debug,cachemine_cli=debug"
    } else {
        "cachemine=info,cachemine_cli=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            client,
            dumps,
            output,
            translate,
            fallback_language,
            catalog_prefix,
            list,
            indent,
        } => {
            let args = commands::run::RunArgs {
                client,
                dumps,
                output,
                translate,
                fallback_language,
                catalog_prefix,
                list,
                indent,
                verbose: cli.verbose,
            };
            commands::run::handle(args, Config::load()?)?;
        }

        Commands::Containers { client, dumps } => {
            let config = Config::load()?;
            let client = client.or(config.client);
            let dumps = dumps.or(config.dumps);
            commands::containers::handle(client.as_deref(), dumps.as_deref())?;
        }

        Commands::Text {
            target,
            dumps,
            language,
            fallback_language,
            catalog_prefix,
            args,
        } => {
            let args = commands::text::TextArgs {
                target,
                dumps,
                language,
                fallback_language,
                catalog_prefix,
                args,
            };
            commands::text::handle(&args, Config::load()?)?;
        }

        Commands::Configure {
            client,
            dumps,
            output,
            language,
            fallback_language,
            indent,
            show,
        } => {
            let update = Config {
                client,
                dumps,
                output,
                language,
                fallback_language,
                indent,
            };
            commands::configure::handle(update, show)?;
        }
    }

    Ok(())
}
