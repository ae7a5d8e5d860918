//! `containers` command: list what every source provides

use crate::sources;
use anyhow::{bail, Context, Result};
use std::path::Path;

pub fn handle(client: Option<&Path>, dumps: Option<&Path>) -> Result<()> {
    let mut sources = sources::configured(client, dumps);
    if sources.is_empty() {
        bail!("No sources configured. Pass --client and/or --dumps.");
    }

    for source in &mut sources {
        let names = source
            .list_container_names()
            .with_context(|| format!("Failed to list containers of {}", source.name()))?;
        println!("{} ({} containers)", source.name(), names.len());
        for name in names {
            println!("  {}", name);
        }
    }

    Ok(())
}
