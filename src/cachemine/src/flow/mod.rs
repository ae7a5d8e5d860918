//! Extraction flow
//!
//! One run walks every source in order and every container of a source in
//! resolved-name order:
//!
//! ```text
//! resolve names → for each source, container: fetch → canonicalize → localize → write to each sink
//! ```
//!
//! Failures of one container, or of one container at one sink, are logged,
//! recorded in the [`RunReport`] and skipped. Cancellation and run-level
//! errors abort the run.

mod filter;

pub use filter::parse_filter;

use crate::localize::{Language, LocalizationEngine};
use crate::naming::{sanitize, Charset, NameResolver, Position, Role};
use crate::normalize::Canonicalizer;
use crate::source::{Sink, Source};
use crate::{Error, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared abort flag
///
/// Clones share the flag, so it can be raised from a signal handler while
/// the flow checks it between steps.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once the flag is raised
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Pipeline step a failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    List,
    Fetch,
    Canonicalize,
    Localize,
    Write,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::List => "list",
            Self::Fetch => "fetch",
            Self::Canonicalize => "canonicalize",
            Self::Localize => "localize",
            Self::Write => "write",
        };
        write!(f, "{}", s)
    }
}

/// One isolated failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub source: String,
    /// Resolved container name; empty when listing the source failed
    pub container: String,
    /// Sink name for write failures
    pub sink: Option<String>,
    pub stage: Stage,
    pub kind: &'static str,
    pub message: String,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} {}", self.source, self.container, self.stage)?;
        if let Some(sink) = &self.sink {
            write!(f, " ({})", sink)?;
        }
        write!(f, " - {}: {}", self.kind, self.message)
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// `(source, resolved container)` pairs that went through every step
    pub processed: Vec<(String, String)>,
    pub failures: Vec<Failure>,
    /// Filter entries that matched no container
    pub unmatched: BTreeSet<String>,
}

impl RunReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.unmatched.is_empty()
    }

    pub fn failed(&self, container: &str) -> bool {
        self.failures.iter().any(|f| f.container == container)
    }
}

/// Per-run settings
#[derive(Debug, Clone, Default)]
pub struct FlowOptions {
    /// Resolved names to process; empty processes everything
    pub name_filter: BTreeSet<String>,
    /// Translation target; `None` leaves text untouched
    pub language: Option<Language>,
    pub verbose: bool,
}

impl FlowOptions {
    pub fn with_filter<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.name_filter = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = Some(language);
        self
    }
}

/// A container scheduled for processing
struct Planned {
    source: usize,
    raw: String,
    resolved: String,
}

/// Orchestrates sources, the core pipeline and sinks
pub struct Flow<'a> {
    sources: Vec<Box<dyn Source + 'a>>,
    sinks: Vec<Box<dyn Sink + 'a>>,
    canonicalizer: Canonicalizer,
    localizer: Option<LocalizationEngine>,
    cancel: CancelToken,
}

impl<'a> Flow<'a> {
    pub fn new(sources: Vec<Box<dyn Source + 'a>>, sinks: Vec<Box<dyn Sink + 'a>>) -> Self {
        Self {
            sources,
            sinks,
            canonicalizer: Canonicalizer::new(),
            localizer: None,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_localizer(mut self, localizer: LocalizationEngine) -> Self {
        self.localizer = Some(localizer);
        self
    }

    pub fn with_canonicalizer(mut self, canonicalizer: Canonicalizer) -> Self {
        self.canonicalizer = canonicalizer;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Execute one run
    ///
    /// Returns `Err` only for run-level failures: an unavailable language
    /// or cancellation.
    pub fn run(&mut self, options: &FlowOptions) -> Result<RunReport> {
        if let Some(language) = &options.language {
            match self.localizer.as_mut() {
                Some(localizer) => localizer.validate(language)?,
                None => return Err(Error::LanguageNotAvailable(language.to_string())),
            }
        }

        let mut report = RunReport::default();
        let (mut plan, known) = self.plan(&mut report)?;

        if !options.name_filter.is_empty() {
            let wanted: BTreeMap<String, &String> = options
                .name_filter
                .iter()
                .map(|name| (sanitize(name, Charset::Flow, Position::Name), name))
                .collect();
            report.unmatched = wanted
                .iter()
                .filter(|(name, _)| !known.contains(*name))
                .map(|(_, raw)| (*raw).clone())
                .collect();
            plan.retain(|p| wanted.contains_key(&p.resolved));
        }

        let sink_names = self.sink_names(&known);

        for (index, source) in self.sources.iter_mut().enumerate() {
            let planned: Vec<&Planned> = plan.iter().filter(|p| p.source == index).collect();
            if planned.is_empty() {
                continue;
            }
            tracing::info!(source = source.name(), containers = planned.len(), "processing source");

            for item in planned {
                self.cancel.check()?;
                let ok = process(
                    source.as_mut(),
                    &mut self.sinks,
                    &sink_names,
                    item,
                    &self.canonicalizer,
                    self.localizer.as_mut(),
                    options,
                    &self.cancel,
                    &mut report,
                )?;
                if ok {
                    report
                        .processed
                        .push((source.name().to_string(), item.resolved.clone()));
                }
            }
        }

        for name in &report.unmatched {
            tracing::warn!(name = name.as_str(), "filter entry matched no container");
        }
        tracing::info!(
            processed = report.processed.len(),
            failed = report.failures.len(),
            "run finished"
        );
        Ok(report)
    }

    /// Resolve names across all sources, in processing order
    fn plan(&mut self, report: &mut RunReport) -> Result<(Vec<Planned>, BTreeSet<String>)> {
        let mut declared = Vec::new();
        for (index, source) in self.sources.iter_mut().enumerate() {
            self.cancel.check()?;
            match source.list_container_names() {
                Ok(names) => declared.extend(names.into_iter().map(|name| (index, name))),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!(source = source.name(), error = %e, "failed to list containers");
                    report.failures.push(Failure {
                        source: source.name().to_string(),
                        container: String::new(),
                        sink: None,
                        stage: Stage::List,
                        kind: e.kind(),
                        message: e.to_string(),
                    });
                }
            }
        }

        let resolved = NameResolver::new(Role::Source)
            .with_charset(Charset::Flow)
            .resolve_keyed(declared);

        let known = resolved.values().cloned().collect();
        let mut plan: Vec<Planned> = resolved
            .into_iter()
            .map(|((source, raw), resolved)| Planned {
                source,
                raw,
                resolved,
            })
            .collect();
        plan.sort_by(|a, b| a.source.cmp(&b.source).then_with(|| a.resolved.cmp(&b.resolved)));
        Ok((plan, known))
    }

    /// Per sink: flow name → sink name
    fn sink_names(&self, known: &BTreeSet<String>) -> Vec<BTreeMap<String, String>> {
        self.sinks
            .iter()
            .map(|sink| sink.resolver().resolve(known))
            .collect()
    }
}

/// Run one container through the pipeline; `Ok(false)` when a step failed
#[allow(clippy::too_many_arguments)]
fn process(
    source: &mut dyn Source,
    sinks: &mut [Box<dyn Sink + '_>],
    sink_names: &[BTreeMap<String, String>],
    item: &Planned,
    canonicalizer: &Canonicalizer,
    localizer: Option<&mut LocalizationEngine>,
    options: &FlowOptions,
    cancel: &CancelToken,
    report: &mut RunReport,
) -> Result<bool> {
    let source_name = source.name().to_string();
    tracing::debug!(source = source_name.as_str(), container = item.resolved.as_str(), "processing");

    let mut fail = |stage: Stage, sink: Option<&str>, err: Error| -> Result<bool> {
        if err.is_fatal() {
            return Err(err);
        }
        tracing::warn!(
            source = source_name.as_str(),
            container = item.resolved.as_str(),
            sink,
            %stage,
            kind = err.kind(),
            "{}",
            err
        );
        report.failures.push(Failure {
            source: source_name.clone(),
            container: item.resolved.clone(),
            sink: sink.map(str::to_string),
            stage,
            kind: err.kind(),
            message: err.to_string(),
        });
        Ok(false)
    };

    let language = options.language.as_ref().map(ToString::to_string);
    let container = match source.fetch(&item.raw, language.as_deref(), options.verbose) {
        Ok(container) => container,
        Err(e) => return fail(Stage::Fetch, None, e),
    };

    let mut data = match canonicalizer.canonicalize_with(&container.value, container.session.as_ref()) {
        Ok(data) => data,
        Err(e) => return fail(Stage::Canonicalize, None, e),
    };

    if let (Some(localizer), Some(language)) = (localizer, &options.language) {
        let fields = source.translation_fields(&item.raw);
        match localizer.translate(data, language, fields.as_deref()) {
            Ok((translated, stats)) => {
                if options.verbose {
                    stats.log(&item.resolved);
                }
                data = translated;
            }
            Err(e) => return fail(Stage::Localize, None, e),
        }
    }

    let mut ok = true;
    for (sink, names) in sinks.iter_mut().zip(sink_names) {
        cancel.check()?;
        let name = names.get(&item.resolved).unwrap_or(&item.resolved);
        if let Err(e) = sink.write(&source_name, name, &data) {
            ok = fail(Stage::Write, Some(sink.name()), e)? && ok;
        }
    }
    Ok(ok)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::localize::{CatalogProvider, Message, MessageCatalog, SourceCatalog};
    use crate::raw::{Body, Object, Raw};
    use crate::source::mock::*;
    use crate::value::Value;
    use std::collections::HashMap;

    fn unrecognized() -> Error {
        Error::UnrecognizedShape {
            type_name: "Mystery".to_string(),
            tag: None,
        }
    }

    fn flow(sources: Vec<MockSource>, sinks: Vec<MockSink>) -> Flow<'static> {
        Flow::new(
            sources
                .into_iter()
                .map(|s| Box::new(s) as Box<dyn Source>)
                .collect(),
            sinks
                .into_iter()
                .map(|s| Box::new(s) as Box<dyn Sink>)
                .collect(),
        )
    }

    struct OneLanguage;

    impl CatalogProvider for OneLanguage {
        fn available_languages(&mut self) -> Result<Vec<String>> {
            Ok(vec!["en-us".to_string()])
        }

        fn load(&mut self, _language: &str) -> Result<MessageCatalog> {
            Ok(MessageCatalog::new().with_message(1, Message::new("Tritanium")))
        }

        fn labels(&mut self) -> Result<HashMap<String, i64>> {
            Ok(HashMap::new())
        }
    }

    #[test]
    fn test_failure_isolated_per_container() {
        let calls = Calls::default();
        let first = MockSource::new("first", &calls)
            .failing("A", unrecognized)
            .with("B", Raw::Int(2));
        let second = MockSource::new("second", &calls).with("C", Raw::Int(3));
        let sink = MockSink::new("mem", &calls);
        let written = sink.written.clone();

        let report = flow(vec![first, second], vec![sink])
            .run(&FlowOptions::default())
            .unwrap();

        assert!(report.failed("A"));
        assert_eq!(report.failures[0].stage, Stage::Fetch);
        assert_eq!(report.failures[0].kind, "UnrecognizedShape");
        assert_eq!(
            report.processed,
            [
                ("first".to_string(), "B".to_string()),
                ("second".to_string(), "C".to_string())
            ]
        );
        assert_eq!(written.borrow().len(), 2);
    }

    #[test]
    fn test_canonicalize_failure_isolated() {
        let calls = Calls::default();
        let source = MockSource::new("dump", &calls)
            .with("bad", Raw::object(Object::new("Mystery")))
            .with("good", Raw::Int(1));
        let report = flow(vec![source], vec![MockSink::new("mem", &calls)])
            .run(&FlowOptions::default())
            .unwrap();

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].stage, Stage::Canonicalize);
        assert_eq!(report.processed.len(), 1);
    }

    #[test]
    fn test_sink_failure_does_not_block_other_sinks() {
        let calls = Calls::default();
        let source = MockSource::new("dump", &calls)
            .with("a", Raw::Int(1))
            .with("b", Raw::Int(2));
        let mut broken = MockSink::new("broken", &calls);
        broken.fail_on = Some("a".to_string());
        let healthy = MockSink::new("healthy", &calls);
        let written = healthy.written.clone();

        let report = flow(vec![source], vec![broken, healthy])
            .run(&FlowOptions::default())
            .unwrap();

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].sink.as_deref(), Some("broken"));
        assert_eq!(report.failures[0].kind, "SinkWriteFailure");
        assert_eq!(written.borrow().len(), 2);
        assert_eq!(report.processed, [("dump".to_string(), "b".to_string())]);
    }

    #[test]
    fn test_cancellation_stops_immediately() {
        let calls = Calls::default();
        let cancel = CancelToken::new();
        let first = MockSource::new("first", &calls)
            .with("a", Raw::Int(1))
            .cancelling("b", &cancel)
            .with("c", Raw::Int(3));
        let second = MockSource::new("second", &calls).with("d", Raw::Int(4));

        let err = flow(vec![first, second], vec![MockSink::new("mem", &calls)])
            .with_cancel(cancel)
            .run(&FlowOptions::default())
            .unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        assert_eq!(
            *calls.borrow(),
            ["fetch first:a", "write mem:a", "fetch first:b"]
        );
    }

    #[test]
    fn test_cancelled_error_from_source_propagates() {
        let calls = Calls::default();
        let source = MockSource::new("dump", &calls)
            .failing("a", || Error::Cancelled)
            .with("b", Raw::Int(1));
        let err = flow(vec![source], vec![])
            .run(&FlowOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert_eq!(calls.borrow().len(), 1);
    }

    #[test]
    fn test_filter_reports_unmatched() {
        let calls = Calls::default();
        let source = MockSource::new("dump", &calls)
            .with("A", Raw::Int(1))
            .with("B", Raw::Int(2));
        let options = FlowOptions::default().with_filter(["A", "Z"]);

        let report = flow(vec![source], vec![MockSink::new("mem", &calls)])
            .run(&options)
            .unwrap();

        assert_eq!(report.unmatched, BTreeSet::from(["Z".to_string()]));
        assert_eq!(report.processed, [("dump".to_string(), "A".to_string())]);
        assert!(!calls.borrow().iter().any(|c| c.ends_with(":B")));
    }

    #[test]
    fn test_filter_matches_argument_names() {
        let calls = Calls::default();
        let source = MockSource::new("calls", &calls).with("config.GetMap(1, 2)", Raw::Int(1));
        let sink = MockSink::new("mem", &calls);
        let written = sink.written.clone();
        let options = FlowOptions::default().with_filter(["config.GetMap(1, 2)"]);

        let report = flow(vec![source], vec![sink]).run(&options).unwrap();

        assert!(report.unmatched.is_empty());
        assert!(written.borrow().contains_key("config.GetMap<1. 2>"));
        assert_eq!(*calls.borrow().first().unwrap(), "fetch calls:config.GetMap(1, 2)");
    }

    #[test]
    fn test_cross_source_collisions_use_source_marker() {
        let calls = Calls::default();
        let first = MockSource::new("first", &calls).with("types", Raw::Int(1));
        let second = MockSource::new("second", &calls).with("types", Raw::Int(2));
        let sink = MockSink::new("mem", &calls);
        let written = sink.written.clone();

        flow(vec![first, second], vec![sink])
            .run(&FlowOptions::default())
            .unwrap();

        let written = written.borrow();
        assert_eq!(written["types_m1"], Value::int(1));
        assert_eq!(written["types_m2"], Value::int(2));
    }

    #[test]
    fn test_language_validated_before_sources() {
        let calls = Calls::default();
        let source = MockSource::new("dump", &calls).with("a", Raw::Int(1));
        let options = FlowOptions::default().with_language(Language::Single("xx".to_string()));

        let err = flow(vec![source], vec![])
            .with_localizer(LocalizationEngine::new(OneLanguage))
            .run(&options)
            .unwrap_err();

        assert!(matches!(err, Error::LanguageNotAvailable(_)));
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn test_localized_before_write() {
        let calls = Calls::default();
        let row = Raw::object(Object::new("DBRow").with_tag("blue.DBRow").with_body(
            Body::Keyed {
                header: vec![Raw::text("typeName"), Raw::text("typeNameID")],
                cells: vec![
                    (Raw::text("typeName"), Raw::text("x")),
                    (Raw::text("typeNameID"), Raw::Int(1)),
                ],
            },
        ));
        let source = MockSource::new("dump", &calls).with("types", row);
        let sink = MockSink::new("mem", &calls);
        let written = sink.written.clone();
        let options = FlowOptions::default().with_language(Language::Single("en-us".to_string()));

        flow(vec![source], vec![sink])
            .with_localizer(LocalizationEngine::new(OneLanguage))
            .run(&options)
            .unwrap();

        let written = written.borrow();
        let row = written["types"].as_mapping().unwrap();
        assert_eq!(row.field("typeName"), Some(&Value::text("Tritanium")));
    }

    #[test]
    fn test_failure_display() {
        let failure = Failure {
            source: "dump".to_string(),
            container: "types".to_string(),
            sink: Some("json".to_string()),
            stage: Stage::Write,
            kind: "SinkWriteFailure",
            message: "disk full".to_string(),
        };
        assert_eq!(
            failure.to_string(),
            "dump:types write (json) - SinkWriteFailure: disk full"
        );
    }

    fn language_container(messages: &[(i64, &str)]) -> Raw {
        Raw::Tuple(vec![
            Raw::None,
            Raw::Dict(
                messages
                    .iter()
                    .map(|(id, text)| {
                        (
                            Raw::Int(*id),
                            Raw::Tuple(vec![Raw::text(*text), Raw::None, Raw::None]),
                        )
                    })
                    .collect(),
            ),
        ])
    }

    #[test]
    fn test_fan_out_with_missing_catalog_completes() {
        let calls = Calls::default();
        let named = Raw::Dict(vec![
            (Raw::text("name"), Raw::text("x")),
            (Raw::text("nameID"), Raw::Int(1)),
        ]);
        let source = MockSource::new("dump", &calls)
            .with("a_plain", Raw::Int(1))
            .with("b_types", Raw::List(vec![named]))
            .with("c_more", Raw::Int(3));
        let catalogs = MockSource::new("catalogs", &calls)
            .with(
                "loc_main",
                Raw::Dict(vec![(
                    Raw::text("languages"),
                    Raw::List(vec![Raw::text("de"), Raw::text("en-us")]),
                )]),
            )
            .with("loc_en-us", language_container(&[(1, "Tritanium")]));
        let sink = MockSink::new("mem", &calls);
        let written = sink.written.clone();
        let options = FlowOptions::default().with_language(Language::FanOut);

        let report = flow(vec![source], vec![sink])
            .with_localizer(LocalizationEngine::new(
                SourceCatalog::new(catalogs).with_prefix("loc_"),
            ))
            .run(&options)
            .unwrap();

        assert!(report.is_clean());
        assert_eq!(report.processed.len(), 3);
        let written = written.borrow();
        let row = written["b_types"].as_sequence().unwrap()[0]
            .as_mapping()
            .unwrap();
        assert_eq!(row.field("name_de"), Some(&Value::text("Tritanium")));
    }
}
