//! Extraction pipeline for game client cache data
//!
//! The upstream decoder hands over loosely shaped object graphs. This crate
//! turns them into a canonical tree and writes them out under stable names.
//!
//! # Pipeline
//!
//! ```text
//! Source ──fetch──▶ Raw ──Canonicalizer──▶ Value ──LocalizationEngine──▶ Value ──▶ Sink
//!                    ▲                                                          ▲
//!                    └──────────── NameResolver (source side / sink side) ──────┘
//! ```
//!
//! - [`normalize`]: shape recognition and conversion into [`Value`]
//! - [`naming`]: sanitization and collision-free resolution of container names
//! - [`localize`]: message catalogs and text field translation
//! - [`flow`]: the orchestrator tying sources and sinks together

pub mod flow;
pub mod localize;
pub mod naming;
pub mod normalize;
pub mod raw;
pub mod source;
pub mod value;

pub use flow::{parse_filter, CancelToken, Failure, Flow, FlowOptions, RunReport, Stage};
pub use localize::{
    CatalogProvider, Language, LocalizationEngine, MessageCatalog, SourceCatalog,
    TranslationStats,
};
pub use naming::{sanitize, Charset, NameResolver, Position, Role};
pub use normalize::Canonicalizer;
pub use raw::{Attribute, Body, DecoderSession, Object, Raw};
pub use source::{RawContainer, Sink, Source};
pub use value::{Mapping, Primitive, Value};

/// Errors raised anywhere in the pipeline
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Unrecognized shape: {}", describe_shape(.type_name, .tag.as_deref()))]
    UnrecognizedShape {
        type_name: String,
        tag: Option<String>,
    },

    #[error("Malformed {type_name}: expected {expected}")]
    MalformedShape {
        type_name: String,
        expected: &'static str,
    },

    #[error("Nesting deeper than {0} levels")]
    DepthExceeded(usize),

    #[error("Container \"{container}\" is not available in {origin}")]
    ContainerNotFound { origin: String, container: String },

    #[error("Language \"{0}\" is not available")]
    LanguageNotAvailable(String),

    #[error("Label {0} does not exist")]
    LabelNotFound(String),

    #[error("Malformed message catalog: {0}")]
    Catalog(String),

    #[error("Sink {sink} failed: {message}")]
    SinkWrite { sink: String, message: String },

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Cannot parse filter: {0}")]
    FilterParse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Cancelled")]
    Cancelled,
}

impl Error {
    /// Stable short name of the error kind, used in logs and run reports
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnrecognizedShape { .. } => "UnrecognizedShape",
            Self::MalformedShape { .. } => "MalformedShape",
            Self::DepthExceeded(_) => "DepthExceeded",
            Self::ContainerNotFound { .. } => "ContainerNotFound",
            Self::LanguageNotAvailable(_) => "LanguageNotAvailable",
            Self::LabelNotFound(_) => "LabelNotFound",
            Self::Catalog(_) => "Catalog",
            Self::SinkWrite { .. } => "SinkWriteFailure",
            Self::Provider(_) => "Provider",
            Self::FilterParse(_) => "FilterParse",
            Self::Io(_) => "Io",
            Self::Json(_) => "Json",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Errors that must abort the whole run instead of one container
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::LanguageNotAvailable(_))
    }

    /// [`Error::ContainerNotFound`] for `container` in `origin`
    pub fn not_found(origin: &str, container: &str) -> Self {
        Self::ContainerNotFound {
            origin: origin.to_string(),
            container: container.to_string(),
        }
    }
}

fn describe_shape(type_name: &str, tag: Option<&str>) -> String {
    match tag {
        Some(tag) if tag != type_name => format!("{} (tag {})", type_name, tag),
        _ => type_name.to_string(),
    }
}

pub type Result<T> = std::result::Result<T, Error>;
