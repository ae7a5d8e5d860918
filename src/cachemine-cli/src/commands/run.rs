//! `run` command: extract every configured source into JSON files

use crate::config::Config;
use crate::sink::JsonSink;
use crate::sources::{self, DumpSource};
use anyhow::{bail, Context, Result};
use cachemine::{
    parse_filter, CancelToken, Flow, FlowOptions, Language, LocalizationEngine, RunReport,
    SourceCatalog,
};
use std::path::PathBuf;

/// Command-line arguments of `run`; unset values come from the config file
#[derive(Debug, Default)]
pub struct RunArgs {
    pub client: Option<PathBuf>,
    pub dumps: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub translate: Option<String>,
    pub fallback_language: Option<String>,
    pub catalog_prefix: String,
    pub list: String,
    pub indent: Option<usize>,
    pub verbose: bool,
}

impl RunArgs {
    /// Config values overridden by every argument that was given
    fn settings(&self, mut config: Config) -> Config {
        config.merge(Config {
            client: self.client.clone(),
            dumps: self.dumps.clone(),
            output: self.output.clone(),
            language: self.translate.clone(),
            fallback_language: self.fallback_language.clone(),
            indent: self.indent,
        });
        config
    }
}

pub fn handle(args: RunArgs, config: Config) -> Result<()> {
    let settings = args.settings(config);
    let output = settings
        .output
        .clone()
        .context("No output folder. Pass --output or run `cachemine configure --output PATH`.")?;

    let sources = sources::configured(settings.client.as_deref(), settings.dumps.as_deref());
    if sources.is_empty() {
        bail!("No sources configured. Pass --client and/or --dumps.");
    }

    let filter = parse_filter(&args.list).context("Invalid container list")?;
    let language = settings.language.as_deref().map(Language::new);

    let mut sink = JsonSink::new(&output);
    if let Some(width) = settings.indent {
        sink = sink.with_indent(width);
    }

    let cancel = CancelToken::new();
    cancel_on_interrupt(cancel.clone())?;

    let mut flow = Flow::new(sources, vec![Box::new(sink)]).with_cancel(cancel);
    if language.is_some() {
        let Some(dumps) = settings.dumps.as_deref() else {
            bail!("Translation needs localization catalogs. Pass --dumps.");
        };
        let catalogs = SourceCatalog::new(DumpSource::new(dumps)).with_prefix(&args.catalog_prefix);
        let mut localizer = LocalizationEngine::new(catalogs);
        if let Some(fallback) = &settings.fallback_language {
            localizer = localizer.with_fallback(fallback.as_str());
        }
        flow = flow.with_localizer(localizer);
    }

    let mut options = FlowOptions {
        verbose: args.verbose,
        ..FlowOptions::default()
    }
    .with_filter(filter);
    if let Some(language) = language {
        options = options.with_language(language);
    }

    let report = flow.run(&options).context("Extraction aborted")?;
    print_report(&report, &output);
    Ok(())
}

/// Raise `cancel` on Ctrl-C; the flow stops before its next step
fn cancel_on_interrupt(cancel: CancelToken) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start signal handler")?;

    std::thread::spawn(move || {
        runtime.block_on(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted, stopping after the current step");
                cancel.cancel();
            }
        });
    });
    Ok(())
}

fn print_report(report: &RunReport, output: &std::path::Path) {
    println!(
        "Extracted {} containers to {}",
        report.processed.len(),
        output.display()
    );

    if !report.failures.is_empty() {
        println!();
        println!("{} failures:", report.failures.len());
        for failure in &report.failures {
            println!("  {}", failure);
        }
    }

    if !report.unmatched.is_empty() {
        println!();
        println!("Not found:");
        for name in &report.unmatched {
            println!("  {}", name);
        }
    }
}
