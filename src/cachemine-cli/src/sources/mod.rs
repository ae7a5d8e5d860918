//! Container sources backed by the client folder and dump folders

pub mod dump;
pub mod metadata;
pub mod sqlite;

pub use dump::DumpSource;
pub use metadata::MetadataSource;
pub use sqlite::SqliteSource;

use cachemine::Source;
use std::path::Path;

/// Sources in processing order: client metadata, client databases, dumps
pub fn configured<'a>(client: Option<&Path>, dumps: Option<&Path>) -> Vec<Box<dyn Source + 'a>> {
    let mut sources: Vec<Box<dyn Source + 'a>> = Vec::new();
    if let Some(client) = client {
        sources.push(Box::new(MetadataSource::new(client)));
        sources.push(Box::new(SqliteSource::new(client)));
    }
    if let Some(dumps) = dumps {
        sources.push(Box::new(DumpSource::new(dumps)));
    }
    sources
}
