//! Pre-decoded JSON dumps
//!
//! Every `*.json` file under the root folder is one container, named by its
//! path relative to the root without the extension (`bulkdata/invtypes`).
//! A file holds either a bare raw value or an envelope:
//!
//! ```json
//! {"value": {...}, "session": {"module": "typesLoader"}, "translate": ["typeName"]}
//! ```

use cachemine::{DecoderSession, Error, Raw, RawContainer, Result, Source};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Deserialize)]
#[serde(untagged)]
enum DumpFile {
    Envelope {
        value: Raw,
        #[serde(default)]
        session: Option<DecoderSession>,
        #[serde(default)]
        translate: Option<Vec<String>>,
    },
    Bare(Raw),
}

pub struct DumpSource {
    root: PathBuf,
    /// Explicit translation fields seen in fetched envelopes
    fields: HashMap<String, Vec<String>>,
}

impl DumpSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            fields: HashMap::new(),
        }
    }

    fn container_name(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?.with_extension("");
        let parts: Vec<_> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect();
        Some(parts.join("/"))
    }

    fn path_for(&self, name: &str) -> PathBuf {
        let mut path = self.root.clone();
        path.extend(format!("{}.json", name).split('/'));
        path
    }
}

impl Source for DumpSource {
    fn name(&self) -> &str {
        "dump"
    }

    fn list_container_names(&mut self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in WalkDir::new(&self.root).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                if let Some(name) = self.container_name(path) {
                    names.push(name);
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn fetch(&mut self, name: &str, _language: Option<&str>, _verbose: bool) -> Result<RawContainer> {
        let path = self.path_for(name);
        if name.split('/').any(|part| part == "..") || !path.is_file() {
            return Err(Error::not_found(self.name(), name));
        }

        let contents = fs::read_to_string(&path)?;
        let file: DumpFile = serde_json::from_str(&contents)?;
        let container = match file {
            DumpFile::Envelope {
                value,
                session,
                translate,
            } => {
                if let Some(fields) = translate {
                    self.fields.insert(name.to_string(), fields);
                }
                RawContainer { value, session }
            }
            DumpFile::Bare(value) => RawContainer::new(value),
        };
        Ok(container)
    }

    fn translation_fields(&self, name: &str) -> Option<Vec<String>> {
        self.fields.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_lists_nested_json_files() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "bulkdata/invtypes.json", r#""none""#);
        write(dir.path(), "metadata.json", r#""none""#);
        write(dir.path(), "config.GetMap.json", r#""none""#);
        write(dir.path(), "notes.txt", "ignored");

        let mut source = DumpSource::new(dir.path());
        assert_eq!(
            source.list_container_names().unwrap(),
            ["bulkdata/invtypes", "config.GetMap", "metadata"]
        );
        assert_eq!(
            source.fetch("config.GetMap", None, false).unwrap().value,
            Raw::None
        );
    }

    #[test]
    fn test_fetch_bare_and_envelope() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "bare.json", r#"{"list":[{"int":1}]}"#);
        write(
            dir.path(),
            "sub/envelope.json",
            r#"{"value":{"int":2},"session":{"module":"typesLoader"},"translate":["typeName"]}"#,
        );
        let mut source = DumpSource::new(dir.path());

        let bare = source.fetch("bare", None, false).unwrap();
        assert_eq!(bare.value, Raw::List(vec![Raw::Int(1)]));
        assert!(bare.session.is_none());

        let envelope = source.fetch("sub/envelope", None, false).unwrap();
        assert_eq!(envelope.value, Raw::Int(2));
        assert_eq!(envelope.session.unwrap().module, "typesLoader");
        assert_eq!(
            source.translation_fields("sub/envelope"),
            Some(vec!["typeName".to_string()])
        );
        assert!(source.translation_fields("bare").is_none());
    }

    #[test]
    fn test_fetch_missing() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = DumpSource::new(dir.path());
        assert!(matches!(
            source.fetch("nope", None, false),
            Err(Error::ContainerNotFound { .. })
        ));
        assert!(matches!(
            source.fetch("../escape", None, false),
            Err(Error::ContainerNotFound { .. })
        ));
    }

    #[test]
    fn test_fetch_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "broken.json", "{");
        let mut source = DumpSource::new(dir.path());
        let err = source.fetch("broken", None, false).unwrap_err();
        assert_eq!(err.kind(), "Json");
    }
}
