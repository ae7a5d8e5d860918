//! Container name filter parsing
//!
//! Names are comma-separated. Names may carry argument lists in
//! parentheses, and commas inside them belong to the name:
//! `types, config.GetMap(1, 2)` yields two names.

use crate::{Error, Result};

/// Split a filter string into container names
///
/// Names are trimmed and empty entries dropped.
pub fn parse_filter(filter: &str) -> Result<Vec<String>> {
    let mut names = Vec::new();
    let mut in_args = false;
    let mut start = 0;

    for (pos, c) in filter.char_indices() {
        match (c, in_args) {
            (',', false) => {
                names.push(filter[start..pos].trim());
                start = pos + 1;
            }
            (',', true) => {}
            ('(', false) => in_args = true,
            (')', true) => in_args = false,
            ('(' | ')', _) => {
                return Err(Error::FilterParse(format!(
                    "unexpected character \"{}\" at position {}",
                    c, pos
                )))
            }
            _ => {}
        }
    }
    if in_args {
        return Err(Error::FilterParse("parenthesis is not closed".to_string()));
    }
    names.push(filter[start..].trim());

    Ok(names
        .into_iter()
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .collect())
}
