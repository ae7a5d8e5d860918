//! Conversion rules and the tables that select them

use super::Walker;
use crate::raw::{Body, Object, Raw};
use crate::value::{Mapping, Value};
use crate::{Error, Result};
use phf::phf_map;

/// How one recognized shape converts into a canonical value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Rule {
    /// Linear iteration → sequence
    Iterable,
    /// Key/value iteration → mapping
    Map,
    /// Header keys with per-key lookup → mapping
    KeyedRow,
    /// Sequence of sequences → one concatenated sequence
    Flatten,
    /// Index → rows, flattened across indices
    IndexedLists,
    /// Index → row, index dropped
    IndexedRows,
    /// Positional data with name aliases → mapping
    NamedVector,
    /// Object-declared attribute list → mapping
    DeclaredFields,
    /// Plain attribute storage → mapping
    AttributeMap,
    /// Specialized row wrapper, unwrapped to its backing row
    RowWrapper,
}

/// Symbolic tags shared by many concrete provider types
pub(crate) static TAG_RULES: phf::Map<&'static str, Rule> = phf_map! {
    // Cached call results
    "dbutil.CFilterRowset" => Rule::IndexedLists,
    "dbutil.CIndexedRowset" => Rule::IndexedRows,
    "dbutil.CRowset" => Rule::Iterable,
    "dbutil.RowDict" => Rule::IndexedRows,
    "dbutil.RowList" => Rule::Iterable,
    // Bulk data containers
    "util.FilterRowset" => Rule::Flatten,
    "util.IndexedRowLists" => Rule::IndexedLists,
    "util.IndexRowset" => Rule::Iterable,
    "util.KeyVal" => Rule::AttributeMap,
    "util.Rowset" => Rule::Iterable,
    // Static data storage
    "FSD_Dict" => Rule::Map,
    "FSD_MultiIndex" => Rule::Map,
    "FSD_NamedVector" => Rule::NamedVector,
    "FSD_Object" => Rule::DeclaredFields,
    "_FixedSizeList" => Rule::Iterable,
    "_VariableSizedList" => Rule::Iterable,
    // Binary static data
    "dict" => Rule::Map,
    "list" => Rule::Iterable,
    // Misc
    "blue.DBRow" => Rule::KeyedRow,
    "universe.SolarSystemWrapper" => Rule::AttributeMap,
};

/// Is-a tests, most specific first
pub(crate) const SUBCLASS_RULES: &[(&str, Rule)] = &[
    // Row subclasses add lookups on top of the raw row; only the row matters
    ("Row", Rule::RowWrapper),
    ("dict", Rule::Map),
];

/// Bookkeeping members of decoder-defined vector types
pub(crate) const VECTOR_BOOKKEEPING: &[&str] = &["n_fields", "n_sequence_fields", "n_unnamed_fields"];

/// Suffix of vector helper types the decoder defines outside its own module
pub(crate) const VECTOR_SUFFIX: &str = "_vector";

fn malformed(obj: &Object, expected: &'static str) -> Error {
    Error::MalformedShape {
        type_name: obj.type_name.clone(),
        expected,
    }
}

/// Items of an iterable object, following one level of indirection
fn items(obj: &Object) -> Result<&[Raw]> {
    match &obj.body {
        Body::Items(items) => Ok(items),
        Body::Wrapped { inner, .. } => match inner {
            Raw::List(items) | Raw::Tuple(items) => Ok(items),
            Raw::Object(inner) => items(inner),
            _ => Err(malformed(obj, "iterable payload")),
        },
        _ => Err(malformed(obj, "iterable items")),
    }
}

/// Key/value pairs of a map-like object, following one level of indirection
fn entries(obj: &Object) -> Result<&[(Raw, Raw)]> {
    match &obj.body {
        Body::Entries(pairs) => Ok(pairs),
        Body::Wrapped { inner, .. } => match inner {
            Raw::Dict(pairs) => Ok(pairs),
            Raw::Object(inner) => entries(inner),
            _ => Err(malformed(obj, "mapping payload")),
        },
        _ => Err(malformed(obj, "key/value entries")),
    }
}

impl Walker<'_> {
    pub(super) fn apply(&mut self, rule: Rule, obj: &Object) -> Result<Value> {
        match rule {
            Rule::Iterable => self.sequence(items(obj)?),
            Rule::Map => self.pairs(entries(obj)?),
            Rule::KeyedRow => self.keyed_row(obj),
            Rule::Flatten => self.flatten(obj, items(obj)?.iter()),
            Rule::IndexedLists => self.flatten(obj, entries(obj)?.iter().map(|(_, v)| v)),
            Rule::IndexedRows => {
                let rows = entries(obj)?
                    .iter()
                    .map(|(_, row)| self.route(row))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::Sequence(rows))
            }
            Rule::NamedVector => self.named_vector(obj),
            Rule::DeclaredFields => match &obj.body {
                Body::Declared(names) => self.fields(obj, names),
                _ => Err(malformed(obj, "declared attribute list")),
            },
            Rule::AttributeMap => self.attribute_bag(obj, None, &[]),
            Rule::RowWrapper => match &obj.body {
                Body::Wrapped {
                    inner: Raw::Object(line),
                    ..
                } => self.keyed_row(line),
                _ => Err(malformed(obj, "backing row")),
            },
        }
    }

    pub(super) fn sequence(&mut self, items: &[Raw]) -> Result<Value> {
        let items = items
            .iter()
            .map(|item| self.route(item))
            .collect::<Result<Vec<_>>>()?;
        Ok(Value::Sequence(items))
    }

    pub(super) fn pairs(&mut self, pairs: &[(Raw, Raw)]) -> Result<Value> {
        let mut map = Mapping::with_capacity(pairs.len());
        for (key, value) in pairs {
            let key = self.route(key)?;
            let value = self.route(value)?;
            map.insert(key, value);
        }
        Ok(Value::Mapping(map))
    }

    fn keyed_row(&mut self, obj: &Object) -> Result<Value> {
        let Body::Keyed { header, cells } = &obj.body else {
            return Err(malformed(obj, "header keys"));
        };
        let mut map = Mapping::with_capacity(header.len());
        for key in header {
            let (_, cell) = cells
                .iter()
                .find(|(k, _)| k == key)
                .ok_or_else(|| malformed(obj, "a cell for every header key"))?;
            let key = self.route(key)?;
            let value = self.route(cell)?;
            map.insert(key, value);
        }
        Ok(Value::Mapping(map))
    }

    fn flatten<'r>(&mut self, obj: &Object, groups: impl Iterator<Item = &'r Raw>) -> Result<Value> {
        let mut rows = Vec::new();
        for group in groups {
            match self.route(group)? {
                Value::Sequence(items) => rows.extend(items),
                _ => return Err(malformed(obj, "groups of rows")),
            }
        }
        Ok(Value::Sequence(rows))
    }

    fn named_vector(&mut self, obj: &Object) -> Result<Value> {
        let Body::NamedVector { aliases, data } = &obj.body else {
            return Err(malformed(obj, "aliased vector"));
        };
        let mut map = Mapping::with_capacity(aliases.len());
        for (name, index) in aliases {
            let raw = data
                .get(*index)
                .ok_or_else(|| malformed(obj, "alias positions within data"))?;
            map.insert(Value::text(name.as_str()), self.route(raw)?);
        }
        Ok(Value::Mapping(map))
    }

    /// Named fields read from attributes; missing ones become null
    fn fields(&mut self, obj: &Object, names: &[String]) -> Result<Value> {
        let mut map = Mapping::with_capacity(names.len());
        for name in names {
            let value = match obj.attribute(name) {
                Some(raw) => self.route(raw)?,
                None => Value::NULL,
            };
            map.insert(Value::text(name.as_str()), value);
        }
        Ok(Value::Mapping(map))
    }

    /// Attributes as mapping entries
    ///
    /// With a field list, exactly those fields are read. Without one, every
    /// public data attribute is taken in name order, minus `ignore`.
    pub(super) fn attribute_bag(
        &mut self,
        obj: &Object,
        fields: Option<&[String]>,
        ignore: &[&str],
    ) -> Result<Value> {
        if let Some(names) = fields {
            return self.fields(obj, names);
        }
        let mut public: Vec<_> = obj
            .attributes
            .iter()
            .filter(|a| !a.callable && !a.is_dunder() && !ignore.contains(&a.name.as_str()))
            .collect();
        public.sort_by(|a, b| a.name.cmp(&b.name));

        let mut map = Mapping::with_capacity(public.len());
        for attr in public {
            map.insert(Value::text(attr.name.as_str()), self.route(&attr.value)?);
        }
        Ok(Value::Mapping(map))
    }
}
