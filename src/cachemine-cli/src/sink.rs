//! JSON file output

use cachemine::naming::Charset;
use cachemine::{Error, NameResolver, Result, Role, Sink, Value};
use serde::Serialize;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

/// Writes one `<name>.json` file per container into a folder
///
/// Names are resolved for a case-insensitive filesystem, so `Foo` and
/// `foo` never overwrite each other.
pub struct JsonSink {
    folder: PathBuf,
    indent: Option<usize>,
}

impl JsonSink {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
            indent: None,
        }
    }

    /// Pretty-print with `width` spaces; 0 writes compact JSON
    pub fn with_indent(mut self, width: usize) -> Self {
        self.indent = (width > 0).then_some(width);
        self
    }

    fn sink_error(&self, e: impl std::fmt::Display) -> Error {
        Error::SinkWrite {
            sink: self.name().to_string(),
            message: e.to_string(),
        }
    }

    fn encode(&self, data: &Value) -> serde_json::Result<Vec<u8>> {
        let Some(width) = self.indent else {
            return serde_json::to_vec(data);
        };
        let indent = " ".repeat(width);
        let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
        let mut out = Vec::new();
        let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
        data.serialize(&mut ser)?;
        Ok(out)
    }
}

impl Sink for JsonSink {
    fn name(&self) -> &str {
        "json"
    }

    fn resolver(&self) -> NameResolver {
        NameResolver::new(Role::Sink)
            .with_charset(Charset::Path)
            .case_insensitive(true)
    }

    fn write(&mut self, _source_name: &str, container_name: &str, data: &Value) -> Result<()> {
        fs::create_dir_all(&self.folder).map_err(|e| self.sink_error(e))?;
        let path = self.folder.join(format!("{}.json", container_name));

        let bytes = self.encode(data).map_err(|e| self.sink_error(e))?;
        let file = fs::File::create(&path).map_err(|e| self.sink_error(e))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(&bytes)
            .and_then(|()| writer.flush())
            .map_err(|e| self.sink_error(e))?;

        tracing::debug!(path = %path.display(), bytes = bytes.len(), "wrote container");
        Ok(())
    }
}
