//! Per-field translation counters

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldStats {
    pub examined: usize,
    pub translated: usize,
}

/// Counters for one container, keyed by text field name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationStats {
    fields: BTreeMap<String, FieldStats>,
}

impl TranslationStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn examine(&mut self, field: &str) {
        self.entry(field).examined += 1;
    }

    pub(crate) fn translate(&mut self, field: &str) {
        self.entry(field).translated += 1;
    }

    fn entry(&mut self, field: &str) -> &mut FieldStats {
        self.fields.entry(field.to_string()).or_default()
    }

    pub fn get(&self, field: &str) -> Option<FieldStats> {
        self.fields.get(field).copied()
    }

    /// Fields in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, FieldStats)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Log counters for fields that had at least one translation
    pub fn log(&self, container: &str) {
        for (field, stats) in self.iter().filter(|(_, s)| s.translated > 0) {
            tracing::debug!(
                container,
                field,
                examined = stats.examined,
                translated = stats.translated,
                "translated field"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_per_field() {
        let mut stats = TranslationStats::new();
        stats.examine("typeName");
        stats.examine("typeName");
        stats.translate("typeName");
        stats.examine("description");

        assert_eq!(
            stats.get("typeName"),
            Some(FieldStats {
                examined: 2,
                translated: 1
            })
        );
        assert_eq!(stats.get("description").unwrap().translated, 0);
        assert!(stats.get("groupName").is_none());

        let names: Vec<_> = stats.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["description", "typeName"]);
    }
}
