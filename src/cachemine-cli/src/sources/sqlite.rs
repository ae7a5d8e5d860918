//! SQLite databases bundled with the client
//!
//! Every table of every `*.db` file becomes a container named
//! `<database stem>_<table>`. Rows are handed over as dicts keyed by
//! column name.

use cachemine::naming::Charset;
use cachemine::{Error, NameResolver, Raw, RawContainer, Result, Role, Source};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

fn provider_error(e: rusqlite::Error) -> Error {
    Error::Provider(e.to_string())
}

pub struct SqliteSource {
    root: PathBuf,
    /// Resolved name → (database path, table)
    tables: Option<BTreeMap<String, (PathBuf, String)>>,
}

impl SqliteSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            tables: None,
        }
    }

    fn databases(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| e.into_path())
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "db"))
            .collect();
        paths.sort();
        paths
    }

    fn tables(&mut self) -> Result<&BTreeMap<String, (PathBuf, String)>> {
        if self.tables.is_none() {
            let mut declared = Vec::new();
            for path in self.databases() {
                let stem = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                for table in list_tables(&path)? {
                    let raw = format!("{}_{}", stem, table);
                    declared.push(((path.clone(), table), raw));
                }
            }

            let resolved = NameResolver::new(Role::Provider)
                .with_charset(Charset::Flow)
                .resolve_keyed(declared);
            self.tables = Some(
                resolved
                    .into_iter()
                    .map(|((location, _), name)| (name, location))
                    .collect(),
            );
        }
        Ok(&*self.tables.get_or_insert_with(BTreeMap::new))
    }
}

fn open(path: &Path) -> Result<Connection> {
    Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY).map_err(provider_error)
}

fn list_tables(path: &Path) -> Result<Vec<String>> {
    let conn = open(path)?;
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
        .map_err(provider_error)?;
    let names = stmt
        .query_map([], |row| row.get(0))
        .map_err(provider_error)?
        .collect::<rusqlite::Result<Vec<String>>>()
        .map_err(provider_error)?;
    Ok(names)
}

fn cell(value: ValueRef<'_>) -> Raw {
    match value {
        ValueRef::Null => Raw::None,
        ValueRef::Integer(v) => Raw::Int(v),
        ValueRef::Real(v) => Raw::Float(v),
        ValueRef::Text(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) => Raw::text(text),
            Err(_) => Raw::Bytes(bytes.to_vec()),
        },
        ValueRef::Blob(bytes) => Raw::Bytes(bytes.to_vec()),
    }
}

fn read_table(path: &Path, table: &str) -> Result<Raw> {
    let conn = open(path)?;
    let sql = format!("SELECT * FROM \"{}\"", table.replace('"', "\"\""));
    let mut stmt = conn.prepare(&sql).map_err(provider_error)?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();

    let mut rows = Vec::new();
    let mut cursor = stmt.query([]).map_err(provider_error)?;
    while let Some(row) = cursor.next().map_err(provider_error)? {
        let mut cells = Vec::with_capacity(columns.len());
        for (i, column) in columns.iter().enumerate() {
            let value = row.get_ref(i).map_err(provider_error)?;
            cells.push((Raw::text(column.as_str()), cell(value)));
        }
        rows.push(Raw::Dict(cells));
    }
    Ok(Raw::List(rows))
}

impl Source for SqliteSource {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn list_container_names(&mut self) -> Result<Vec<String>> {
        Ok(self.tables()?.keys().cloned().collect())
    }

    fn fetch(&mut self, name: &str, _language: Option<&str>, _verbose: bool) -> Result<RawContainer> {
        let (path, table) = self
            .tables()?
            .get(name)
            .cloned()
            .ok_or_else(|| Error::not_found("sqlite", name))?;
        tracing::debug!(db = %path.display(), table = table.as_str(), "reading table");
        Ok(RawContainer::new(read_table(&path, &table)?))
    }
}
