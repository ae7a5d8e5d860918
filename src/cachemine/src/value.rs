//! Canonical values
//!
//! Every recognized raw shape converges to one of three kinds: a primitive,
//! an ordered sequence, or an ordered mapping. Any serialization format can
//! represent these directly.

use crate::raw::Raw;
use indexmap::{Equivalent, IndexMap};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};

const TAG_NULL: u8 = 0;
const TAG_BOOL: u8 = 1;
const TAG_INT: u8 = 2;
const TAG_FLOAT: u8 = 3;
const TAG_TEXT: u8 = 4;
const TAG_SEQUENCE: u8 = 5;
const TAG_MAPPING: u8 = 6;

/// Scalar leaf of a canonical tree
///
/// Floats compare and hash by bit pattern so values can serve as mapping
/// keys.
#[derive(Debug, Clone)]
pub enum Primitive {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

/// Canonical value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Primitive(Primitive),
    Sequence(Vec<Value>),
    Mapping(Mapping),
}

impl Value {
    pub const NULL: Value = Value::Primitive(Primitive::Null);

    pub fn text(s: impl Into<String>) -> Self {
        Self::Primitive(Primitive::Text(s.into()))
    }

    pub fn int(v: i64) -> Self {
        Self::Primitive(Primitive::Int(v))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Primitive(Primitive::Null))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Primitive(Primitive::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Primitive(Primitive::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Self::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Self::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Map back onto builtin raw containers
    ///
    /// Canonicalizing the result yields this value again.
    pub fn into_raw(self) -> Raw {
        match self {
            Self::Primitive(Primitive::Null) => Raw::None,
            Self::Primitive(Primitive::Bool(b)) => Raw::Bool(b),
            Self::Primitive(Primitive::Int(v)) => Raw::Int(v),
            Self::Primitive(Primitive::Float(v)) => Raw::Float(v),
            Self::Primitive(Primitive::Text(s)) => Raw::Text(s),
            Self::Sequence(items) => Raw::Tuple(items.into_iter().map(Value::into_raw).collect()),
            Self::Mapping(map) => Raw::Dict(
                map.0
                    .into_iter()
                    .map(|(k, v)| (k.into_raw(), v.into_raw()))
                    .collect(),
            ),
        }
    }
}

impl PartialEq for Primitive {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Text(a), Self::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Primitive {}

impl Hash for Primitive {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::Null => state.write_u8(TAG_NULL),
            Self::Bool(b) => {
                state.write_u8(TAG_BOOL);
                b.hash(state);
            }
            Self::Int(v) => {
                state.write_u8(TAG_INT);
                v.hash(state);
            }
            Self::Float(v) => {
                state.write_u8(TAG_FLOAT);
                v.to_bits().hash(state);
            }
            Self::Text(s) => {
                state.write_u8(TAG_TEXT);
                s.hash(state);
            }
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::Primitive(p) => p.hash(state),
            Self::Sequence(items) => {
                state.write_u8(TAG_SEQUENCE);
                items.hash(state);
            }
            Self::Mapping(map) => {
                state.write_u8(TAG_MAPPING);
                map.hash(state);
            }
        }
    }
}

impl From<Primitive> for Value {
    fn from(p: Primitive) -> Self {
        Self::Primitive(p)
    }
}

impl From<Mapping> for Value {
    fn from(m: Mapping) -> Self {
        Self::Mapping(m)
    }
}

/// Ordered key/value pairs with unique keys
#[derive(Debug, Clone, Default)]
pub struct Mapping(IndexMap<Value, Value>);

/// Borrowed text key, hashing like the matching [`Value`]
struct TextKey<'a>(&'a str);

impl Hash for TextKey<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u8(TAG_TEXT);
        self.0.hash(state);
    }
}

impl Equivalent<Value> for TextKey<'_> {
    fn equivalent(&self, key: &Value) -> bool {
        key.as_text() == Some(self.0)
    }
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(n: usize) -> Self {
        Self(IndexMap::with_capacity(n))
    }

    /// Insert or replace, keeping the position of an existing key
    pub fn insert(&mut self, key: Value, value: Value) {
        self.0.insert(key, value);
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.0.get(key)
    }

    /// Lookup by text key
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.0.get(&TextKey(name))
    }

    pub fn contains_field(&self, name: &str) -> bool {
        self.0.contains_key(&TextKey(name))
    }

    pub fn set_field(&mut self, name: &str, value: Value) {
        match self.0.get_mut(&TextKey(name)) {
            Some(slot) => *slot = value,
            None => {
                self.0.insert(Value::text(name), value);
            }
        }
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, Value, Value> {
        self.0.iter()
    }

    pub fn values_mut(&mut self) -> indexmap::map::ValuesMut<'_, Value, Value> {
        self.0.values_mut()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Equality is order-sensitive: two mappings with the same entries in a
/// different order serialize differently.
impl PartialEq for Mapping {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl Eq for Mapping {}

impl Hash for Mapping {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.len());
        for (k, v) in self.iter() {
            k.hash(state);
            v.hash(state);
        }
    }
}

impl FromIterator<(Value, Value)> for Mapping {
    fn from_iter<I: IntoIterator<Item = (Value, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

impl Serialize for Primitive {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(v) => serializer.serialize_i64(*v),
            Self::Float(v) => serializer.serialize_f64(*v),
            Self::Text(s) => serializer.serialize_str(s),
        }
    }
}

/// Object keys must be strings in most formats, so non-text keys are
/// rendered through their display form.
struct KeyRepr<'a>(&'a Value);

impl Serialize for KeyRepr<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Value::Primitive(Primitive::Text(s)) => serializer.serialize_str(s),
            Value::Primitive(p) => serializer.collect_str(p),
            other => {
                let json = serde_json::to_string(other).map_err(serde::ser::Error::custom)?;
                serializer.serialize_str(&json)
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Primitive(p) => p.serialize(serializer),
            Self::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Mapping(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map.iter() {
                    out.serialize_entry(&KeyRepr(k), v)?;
                }
                out.end()
            }
        }
    }
}
