//! Localization of canonical trees
//!
//! Text fields are paired with message id fields (`typeName` / `typeNameID`)
//! and their text is replaced with, or augmented by, catalog messages.
//!
//! Resolution order for one field: requested language, fallback language,
//! the field's original text, empty string. The first non-empty wins.

mod catalog;
mod stats;

pub use catalog::{CatalogProvider, Message, MessageCatalog, SourceCatalog, CATALOG_PREFIX};
pub use stats::{FieldStats, TranslationStats};

use crate::value::{Mapping, Value};
use crate::{Error, Result};
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Suffix marking message id fields
pub const ID_SUFFIX: &str = "ID";

/// Language used when the requested one has no text
pub const DEFAULT_FALLBACK: &str = "en-us";

/// Language token selecting fan-out mode
pub const FAN_OUT: &str = "multi";

/// Id fields without a text sibling are translated only when named like text
fn keyword() -> &'static Regex {
    static KEYWORD: OnceLock<Regex> = OnceLock::new();
    KEYWORD.get_or_init(|| Regex::new(r"(?i)description|name|text").expect("valid regex"))
}

/// Target of a translation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Language {
    /// Replace text fields in place
    Single(String),
    /// Add `<field>_<language>` for every available language
    FanOut,
}

impl Language {
    /// `multi` selects fan-out, anything else a single language
    pub fn new(s: &str) -> Self {
        if s == FAN_OUT {
            Self::FanOut
        } else {
            Self::Single(s.to_string())
        }
    }
}

impl FromStr for Language {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(lang) => write!(f, "{}", lang),
            Self::FanOut => write!(f, "{}", FAN_OUT),
        }
    }
}

/// One translatable field pair found in a mapping
struct Pair {
    text_field: String,
    message_id: Option<i64>,
}

/// Translates canonical trees against lazily loaded catalogs
///
/// Catalogs and the language list are loaded on first use and kept for the
/// lifetime of the engine.
pub struct LocalizationEngine {
    provider: Box<dyn CatalogProvider>,
    fallback: String,
    languages: Option<Vec<String>>,
    labels: Option<HashMap<String, i64>>,
    catalogs: HashMap<String, MessageCatalog>,
}

impl LocalizationEngine {
    pub fn new(provider: impl CatalogProvider + 'static) -> Self {
        Self {
            provider: Box::new(provider),
            fallback: DEFAULT_FALLBACK.to_string(),
            languages: None,
            labels: None,
            catalogs: HashMap::new(),
        }
    }

    pub fn with_fallback(mut self, language: impl Into<String>) -> Self {
        self.fallback = language.into();
        self
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// Sorted, deduplicated languages of the provider
    pub fn available_languages(&mut self) -> Result<&[String]> {
        if self.languages.is_none() {
            let mut languages = self.provider.available_languages()?;
            languages.sort();
            languages.dedup();
            tracing::debug!(count = languages.len(), "loaded language list");
            self.languages = Some(languages);
        }
        Ok(self.languages.as_deref().unwrap_or_default())
    }

    fn is_available(&mut self, language: &str) -> Result<bool> {
        Ok(self.available_languages()?.iter().any(|l| l == language))
    }

    /// Fail with [`Error::LanguageNotAvailable`] unless the target can be served
    ///
    /// Loads every catalog the target needs up front, so a run never stops
    /// halfway for a missing catalog. A requested single language must have
    /// one. Fan-out languages and the fallback without a catalog are served
    /// through the fallback chain.
    pub fn validate(&mut self, language: &Language) -> Result<()> {
        match language {
            Language::Single(lang) => {
                if !self.is_available(lang)? {
                    return Err(Error::LanguageNotAvailable(lang.clone()));
                }
                self.preload(lang, true)?;
            }
            Language::FanOut => {
                for lang in self.available_languages()?.to_vec() {
                    self.preload(&lang, false)?;
                }
            }
        }
        let fallback = self.fallback.clone();
        if self.is_available(&fallback)? {
            self.preload(&fallback, false)?;
        }
        Ok(())
    }

    fn preload(&mut self, language: &str, required: bool) -> Result<()> {
        match self.catalog(language).map(|_| ()) {
            Err(Error::LanguageNotAvailable(_)) if !required => {
                tracing::warn!(language, "listed language has no catalog, using fallback");
                self.catalogs
                    .insert(language.to_string(), MessageCatalog::new());
                Ok(())
            }
            other => other,
        }
    }

    fn catalog(&mut self, language: &str) -> Result<&MessageCatalog> {
        if !self.catalogs.contains_key(language) {
            let catalog = self.provider.load(language)?;
            tracing::debug!(language, messages = catalog.len(), "loaded message catalog");
            self.catalogs.insert(language.to_string(), catalog);
        }
        self.catalogs
            .get(language)
            .ok_or_else(|| Error::LanguageNotAvailable(language.to_string()))
    }

    fn lookup(&mut self, id: i64, language: &str, args: &[(&str, &str)]) -> Result<String> {
        Ok(self
            .catalog(language)?
            .get(id)
            .map(|m| m.format(args))
            .unwrap_or_default())
    }

    /// Message text in `language`, falling back to the fallback language
    ///
    /// Tokens whose variable is named in `args` are substituted. Unknown
    /// messages yield an empty string.
    pub fn text_by_message(
        &mut self,
        id: i64,
        language: &str,
        args: &[(&str, &str)],
    ) -> Result<String> {
        if !self.is_available(language)? {
            return Err(Error::LanguageNotAvailable(language.to_string()));
        }
        let text = self.lookup(id, language, args)?;
        if !text.is_empty() || language == self.fallback {
            return Ok(text);
        }
        let fallback = self.fallback.clone();
        if !self.is_available(&fallback)? {
            return Ok(text);
        }
        self.lookup(id, &fallback, args)
    }

    /// Message text addressed by label path (`Path/To/label`)
    pub fn text_by_label(
        &mut self,
        label: &str,
        language: &str,
        args: &[(&str, &str)],
    ) -> Result<String> {
        if self.labels.is_none() {
            self.labels = Some(self.provider.labels()?);
        }
        let id = self
            .labels
            .as_ref()
            .and_then(|labels| labels.get(label))
            .copied()
            .ok_or_else(|| Error::LabelNotFound(label.to_string()))?;
        self.text_by_message(id, language, args)
    }

    /// Translate every mapping in `tree`
    ///
    /// With `fields`, only `<field>` / `<field>ID` pairs for the listed
    /// names are considered; otherwise pairs are detected by convention.
    pub fn translate(
        &mut self,
        mut tree: Value,
        language: &Language,
        fields: Option<&[String]>,
    ) -> Result<(Value, TranslationStats)> {
        self.validate(language)?;
        let mut stats = TranslationStats::new();
        self.walk(&mut tree, language, fields, &mut stats)?;
        Ok((tree, stats))
    }

    fn walk(
        &mut self,
        value: &mut Value,
        language: &Language,
        fields: Option<&[String]>,
        stats: &mut TranslationStats,
    ) -> Result<()> {
        match value {
            Value::Sequence(items) => {
                for item in items {
                    self.walk(item, language, fields, stats)?;
                }
            }
            Value::Mapping(map) => {
                for value in map.values_mut() {
                    self.walk(value, language, fields, stats)?;
                }
                for pair in translatable_pairs(map, fields) {
                    stats.examine(&pair.text_field);
                    match language {
                        Language::Single(lang) => self.translate_single(map, &pair, lang, stats)?,
                        Language::FanOut => self.translate_fan_out(map, &pair, stats)?,
                    }
                }
            }
            Value::Primitive(_) => {}
        }
        Ok(())
    }

    fn resolve(&mut self, id: Option<i64>, language: &str, original: Option<&str>) -> Result<String> {
        let text = match id {
            Some(id) => self.text_by_message(id, language, &[])?,
            None => String::new(),
        };
        if !text.is_empty() {
            return Ok(text);
        }
        Ok(original.unwrap_or_default().to_string())
    }

    fn translate_single(
        &mut self,
        row: &mut Mapping,
        pair: &Pair,
        language: &str,
        stats: &mut TranslationStats,
    ) -> Result<()> {
        if pair.message_id.is_none() {
            return Ok(());
        }
        let original = row.field(&pair.text_field).cloned();
        let text = self.resolve(
            pair.message_id,
            language,
            original.as_ref().and_then(Value::as_text),
        )?;
        let text = Value::text(text);
        if original.unwrap_or_else(|| Value::text("")) != text {
            stats.translate(&pair.text_field);
        }
        row.set_field(&pair.text_field, text);
        Ok(())
    }

    /// Every row gets the same set of per-language fields, translated or not
    fn translate_fan_out(
        &mut self,
        row: &mut Mapping,
        pair: &Pair,
        stats: &mut TranslationStats,
    ) -> Result<()> {
        let original = row
            .field(&pair.text_field)
            .cloned()
            .unwrap_or_else(|| Value::text(""));
        let original_text = original.as_text();
        let languages = self.available_languages()?.to_vec();
        for language in &languages {
            let text = Value::text(self.resolve(pair.message_id, language, original_text)?);
            if original != text {
                stats.translate(&pair.text_field);
            }
            row.set_field(&format!("{}_{}", pair.text_field, language), text);
        }
        Ok(())
    }
}

/// Text/id field pairs of one mapping, in key order
fn translatable_pairs(row: &Mapping, fields: Option<&[String]>) -> Vec<Pair> {
    if let Some(fields) = fields {
        return fields
            .iter()
            .filter_map(|field| {
                let id = row.field(&format!("{}{}", field, ID_SUFFIX))?;
                Some(Pair {
                    text_field: field.clone(),
                    message_id: id.as_int(),
                })
            })
            .collect();
    }

    let mut pairs = Vec::new();
    for (key, id) in row.iter() {
        let Some(text_field) = key.as_text().and_then(|k| k.strip_suffix(ID_SUFFIX)) else {
            continue;
        };
        if !id.is_null() && id.as_int().is_none() {
            continue;
        }
        match row.field(text_field) {
            Some(text) if text.is_null() && id.is_null() => continue,
            Some(text) if !text.is_null() && text.as_text().is_none() => continue,
            Some(_) => {}
            None if keyword().is_match(text_field) => {}
            None => continue,
        }
        pairs.push(Pair {
            text_field: text_field.to_string(),
            message_id: id.as_int(),
        });
    }
    pairs
}
