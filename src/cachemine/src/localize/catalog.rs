//! Message catalogs and where they come from

use crate::normalize::Canonicalizer;
use crate::source::Source;
use crate::value::{Mapping, Value};
use crate::{Error, Result};
use std::collections::{BTreeMap, HashMap};

/// One message: template text plus placeholder token → variable name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    pub text: String,
    pub tokens: BTreeMap<String, String>,
}

impl Message {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tokens: BTreeMap::new(),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>, variable: impl Into<String>) -> Self {
        self.tokens.insert(token.into(), variable.into());
        self
    }

    /// Substitute every token whose variable is present in `args`
    pub fn format(&self, args: &[(&str, &str)]) -> String {
        let mut text = self.text.clone();
        for (token, variable) in &self.tokens {
            if let Some((_, value)) = args.iter().find(|(name, _)| *name == variable.as_str()) {
                text = text.replace(token.as_str(), value);
            }
        }
        text
    }
}

/// Messages of one language
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageCatalog {
    messages: HashMap<i64, Message>,
}

impl MessageCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_message(mut self, id: i64, message: Message) -> Self {
        self.insert(id, message);
        self
    }

    pub fn insert(&mut self, id: i64, message: Message) {
        self.messages.insert(id, message);
    }

    pub fn get(&self, id: i64) -> Option<&Message> {
        self.messages.get(&id)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Read a canonicalized language container
    ///
    /// Layout: a sequence whose second element maps message id to
    /// `[text, metadata, tokens]`, tokens mapping each placeholder to a
    /// mapping with a `variableName` entry.
    pub fn from_value(value: &Value) -> Result<Self> {
        let messages = value
            .as_sequence()
            .and_then(|items| items.get(1))
            .and_then(Value::as_mapping)
            .ok_or_else(|| Error::Catalog("expected message map at position 1".to_string()))?;

        let mut catalog = Self::new();
        for (id, data) in messages.iter() {
            let id = id
                .as_int()
                .ok_or_else(|| Error::Catalog(format!("non-integer message id {:?}", id)))?;
            catalog.insert(id, parse_message(id, data)?);
        }
        Ok(catalog)
    }
}

fn parse_message(id: i64, data: &Value) -> Result<Message> {
    let parts = data
        .as_sequence()
        .ok_or_else(|| Error::Catalog(format!("message {} is not a sequence", id)))?;

    let text = parts.first().and_then(Value::as_text).unwrap_or_default();
    let mut message = Message::new(text);

    if let Some(tokens) = parts.get(2).and_then(Value::as_mapping) {
        for (token, info) in tokens.iter() {
            let variable = info
                .as_mapping()
                .and_then(|m| m.field("variableName"))
                .and_then(Value::as_text);
            if let (Some(token), Some(variable)) = (token.as_text(), variable) {
                message.tokens.insert(token.to_string(), variable.to_string());
            }
        }
    }
    Ok(message)
}

/// Supplies message catalogs
pub trait CatalogProvider {
    /// Languages the provider has catalogs for
    fn available_languages(&mut self) -> Result<Vec<String>>;

    /// Load one language's catalog
    ///
    /// Fails with [`Error::LanguageNotAvailable`] for unknown languages.
    fn load(&mut self, language: &str) -> Result<MessageCatalog>;

    /// Label path → message id
    fn labels(&mut self) -> Result<HashMap<String, i64>> {
        Ok(HashMap::new())
    }
}

/// Default prefix of localization containers
pub const CATALOG_PREFIX: &str = "res:/localizationfsd/localization_fsd_";

/// Catalogs stored as regular containers of a [`Source`]
///
/// The shared `<prefix>main` container lists languages and labels; each
/// language lives in `<prefix><language>`.
pub struct SourceCatalog<S> {
    source: S,
    prefix: String,
    canonicalizer: Canonicalizer,
    main: Option<Mapping>,
}

impl<S: Source> SourceCatalog<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            prefix: CATALOG_PREFIX.to_string(),
            canonicalizer: Canonicalizer::new(),
            main: None,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    fn fetch(&mut self, suffix: &str) -> Result<Value> {
        let name = format!("{}{}", self.prefix, suffix);
        let container = self.source.fetch(&name, None, false)?;
        self.canonicalizer
            .canonicalize_with(&container.value, container.session.as_ref())
    }

    fn main(&mut self) -> Result<&Mapping> {
        if self.main.is_none() {
            match self.fetch("main")? {
                Value::Mapping(map) => self.main = Some(map),
                _ => return Err(Error::Catalog("main container is not a mapping".to_string())),
            }
        }
        self.main
            .as_ref()
            .ok_or_else(|| Error::Catalog("main container unavailable".to_string()))
    }
}

impl<S: Source> CatalogProvider for SourceCatalog<S> {
    fn available_languages(&mut self) -> Result<Vec<String>> {
        let languages = self
            .main()?
            .field("languages")
            .and_then(Value::as_sequence)
            .ok_or_else(|| Error::Catalog("no language list".to_string()))?;
        Ok(languages
            .iter()
            .filter_map(Value::as_text)
            .map(str::to_string)
            .collect())
    }

    fn load(&mut self, language: &str) -> Result<MessageCatalog> {
        match self.fetch(language) {
            Ok(value) => MessageCatalog::from_value(&value),
            Err(Error::ContainerNotFound { .. }) => {
                Err(Error::LanguageNotAvailable(language.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    fn labels(&mut self) -> Result<HashMap<String, i64>> {
        let mut labels = HashMap::new();
        let Some(entries) = self.main()?.field("labels").and_then(Value::as_mapping) else {
            return Ok(labels);
        };
        for (id, data) in entries.iter() {
            let (Some(id), Some(data)) = (id.as_int(), data.as_mapping()) else {
                continue;
            };
            let path: Vec<&str> = ["FullPath", "label"]
                .iter()
                .filter_map(|key| data.field(key).and_then(Value::as_text))
                .filter(|part| !part.is_empty())
                .collect();
            labels.insert(path.join("/"), id);
        }
        Ok(labels)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::raw::Raw;
    use crate::source::mock::{Calls, MockSource};

    /// In-memory provider
    #[derive(Default)]
    pub struct FakeProvider {
        pub catalogs: BTreeMap<String, MessageCatalog>,
        pub labels: HashMap<String, i64>,
        /// Listed as available without a catalog behind them
        pub listed_only: Vec<String>,
    }

    impl FakeProvider {
        pub fn with(mut self, language: &str, catalog: MessageCatalog) -> Self {
            self.catalogs.insert(language.to_string(), catalog);
            self
        }

        pub fn listing(mut self, language: &str) -> Self {
            self.listed_only.push(language.to_string());
            self
        }
    }

    impl CatalogProvider for FakeProvider {
        fn available_languages(&mut self) -> Result<Vec<String>> {
            Ok(self
                .catalogs
                .keys()
                .chain(&self.listed_only)
                .cloned()
                .collect())
        }

        fn load(&mut self, language: &str) -> Result<MessageCatalog> {
            self.catalogs
                .get(language)
                .cloned()
                .ok_or_else(|| Error::LanguageNotAvailable(language.to_string()))
        }

        fn labels(&mut self) -> Result<HashMap<String, i64>> {
            Ok(self.labels.clone())
        }
    }

    fn dict(pairs: Vec<(Raw, Raw)>) -> Raw {
        Raw::Dict(pairs)
    }

    fn language_container(messages: Vec<(i64, &str)>) -> Raw {
        Raw::Tuple(vec![
            Raw::None,
            dict(
                messages
                    .into_iter()
                    .map(|(id, text)| {
                        (
                            Raw::Int(id),
                            Raw::Tuple(vec![Raw::text(text), Raw::None, Raw::None]),
                        )
                    })
                    .collect(),
            ),
        ])
    }

    #[test]
    fn test_format_substitutes_known_variables() {
        let message = Message::new("{[character]pilot} flies {[item]ship}")
            .with_token("{[character]pilot}", "pilot")
            .with_token("{[item]ship}", "ship");
        assert_eq!(
            message.format(&[("pilot", "Kali"), ("other", "x")]),
            "Kali flies {[item]ship}"
        );
        assert_eq!(message.format(&[]), message.text);
    }

    #[test]
    fn test_catalog_from_value() {
        let tokens = Value::Mapping(
            [(
                Value::text("{n}"),
                Value::Mapping([(Value::text("variableName"), Value::text("n"))].into_iter().collect()),
            )]
            .into_iter()
            .collect(),
        );
        let value = Value::Sequence(vec![
            Value::NULL,
            Value::Mapping(
                [
                    (
                        Value::int(1),
                        Value::Sequence(vec![Value::text("Hello"), Value::NULL, Value::NULL]),
                    ),
                    (
                        Value::int(2),
                        Value::Sequence(vec![Value::text("{n} items"), Value::NULL, tokens]),
                    ),
                ]
                .into_iter()
                .collect(),
            ),
        ]);

        let catalog = MessageCatalog::from_value(&value).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get(1).unwrap().text, "Hello");
        assert_eq!(catalog.get(2).unwrap().format(&[("n", "3")]), "3 items");
    }

    #[test]
    fn test_catalog_from_value_rejects_other_layouts() {
        let err = MessageCatalog::from_value(&Value::text("x")).unwrap_err();
        assert_eq!(err.kind(), "Catalog");
    }

    #[test]
    fn test_source_catalog() {
        let calls = Calls::default();
        let main = dict(vec![
            (
                Raw::text("languages"),
                Raw::List(vec![Raw::text("de"), Raw::text("en-us")]),
            ),
            (
                Raw::text("labels"),
                dict(vec![(
                    Raw::Int(7),
                    dict(vec![
                        (Raw::text("FullPath"), Raw::text("UI/Generic")),
                        (Raw::text("label"), Raw::text("Cancel")),
                    ]),
                )]),
            ),
        ]);
        let source = MockSource::new("dump", &calls)
            .with("loc_main", main)
            .with("loc_de", language_container(vec![(7, "Abbrechen")]));
        let mut provider = SourceCatalog::new(source).with_prefix("loc_");

        assert_eq!(provider.available_languages().unwrap(), ["de", "en-us"]);
        assert_eq!(provider.labels().unwrap()["UI/Generic/Cancel"], 7);
        assert_eq!(provider.load("de").unwrap().get(7).unwrap().text, "Abbrechen");
        assert!(matches!(
            provider.load("en-us"),
            Err(Error::LanguageNotAvailable(ref l)) if l == "en-us"
        ));

        // Main container fetched once
        let fetches = calls
            .borrow()
            .iter()
            .filter(|c| c.ends_with("loc_main"))
            .count();
        assert_eq!(fetches, 1);
    }
}
