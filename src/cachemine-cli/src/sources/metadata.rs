//! Dump metadata: which client build the data came from and when it was taken

use cachemine::{Error, Raw, RawContainer, Result, Source};
use std::fs;
use std::path::{Path, PathBuf};

const CONTAINER: &str = "metadata";

pub struct MetadataSource {
    client: PathBuf,
}

impl MetadataSource {
    pub fn new(client: impl Into<PathBuf>) -> Self {
        Self {
            client: client.into(),
        }
    }
}

/// `build` entry of the `[main]` section in the client's `start.ini`
fn client_build(client: &Path) -> Option<i64> {
    let contents = fs::read_to_string(client.join("start.ini")).ok()?;
    let mut in_main = false;
    for line in contents.lines().map(str::trim) {
        if line.starts_with('[') {
            in_main = line.eq_ignore_ascii_case("[main]");
            continue;
        }
        if !in_main {
            continue;
        }
        if let Some((key, value)) = line.split_once(['=', ':']) {
            if key.trim().eq_ignore_ascii_case("build") {
                return value.trim().parse().ok();
            }
        }
    }
    None
}

fn field(name: &str, value: Raw) -> Raw {
    Raw::Dict(vec![
        (Raw::text("field_name"), Raw::text(name)),
        (Raw::text("field_value"), value),
    ])
}

impl Source for MetadataSource {
    fn name(&self) -> &str {
        "metadata"
    }

    fn list_container_names(&mut self) -> Result<Vec<String>> {
        Ok(vec![CONTAINER.to_string()])
    }

    fn fetch(&mut self, name: &str, _language: Option<&str>, _verbose: bool) -> Result<RawContainer> {
        if name != CONTAINER {
            return Err(Error::not_found(self.name(), name));
        }

        let build = client_build(&self.client);
        if build.is_none() {
            tracing::warn!(client = %self.client.display(), "failed to detect client version");
        }
        let dump_time = chrono::Utc::now().timestamp();

        Ok(RawContainer::new(Raw::List(vec![
            field("client_build", build.map_or(Raw::None, Raw::Int)),
            field("dump_time", Raw::Int(dump_time)),
        ])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(source: &mut MetadataSource) -> Vec<Raw> {
        match source.fetch(CONTAINER, None, false).unwrap().value {
            Raw::List(rows) => rows,
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_client_build_from_start_ini() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("start.ini"),
            "[other]\nbuild = 1\n\n[main]\nserver = tranquility\nbuild = 2548611\n",
        )
        .unwrap();

        let mut source = MetadataSource::new(dir.path());
        let rows = rows(&mut source);
        assert_eq!(rows[0], field("client_build", Raw::Int(2548611)));
    }

    #[test]
    fn test_missing_start_ini() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = MetadataSource::new(dir.path());
        let rows = rows(&mut source);
        assert_eq!(rows[0], field("client_build", Raw::None));

        let Raw::Dict(cells) = &rows[1] else {
            panic!("expected dict");
        };
        assert_eq!(cells[0].1, Raw::text("dump_time"));
        assert!(matches!(cells[1].1, Raw::Int(t) if t > 1_600_000_000));
    }

    #[test]
    fn test_only_metadata_container() {
        let mut source = MetadataSource::new("/nonexistent");
        assert_eq!(source.list_container_names().unwrap(), ["metadata"]);
        assert!(source.fetch("other", None, false).is_err());
    }
}
