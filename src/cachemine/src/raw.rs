//! Raw values handed over by the upstream decoder
//!
//! The decoder exposes builtin primitives and containers alongside a large
//! family of provider objects. Provider objects are described by what they
//! expose rather than by what they are: a concrete type name, an optional
//! symbolic tag shared by many concrete types, the module that defined
//! them, their is-a lineage, and a [`Body`] telling how their contents are
//! reached.
//!
//! Everything here is serde-friendly so pre-decoded dumps can be stored as
//! JSON and replayed later.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A value as produced by the upstream decoder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Raw {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Legacy 8-bit string, encoded as cp1252
    Bytes(Vec<u8>),
    List(Vec<Raw>),
    Tuple(Vec<Raw>),
    /// Builtin dictionary, in iteration order
    Dict(Vec<(Raw, Raw)>),
    Object(Box<Object>),
}

impl Raw {
    /// Short type name used in diagnostics
    pub fn type_name(&self) -> &str {
        match self {
            Self::None => "NoneType",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "unicode",
            Self::Bytes(_) => "str",
            Self::List(_) => "list",
            Self::Tuple(_) => "tuple",
            Self::Dict(_) => "dict",
            Self::Object(obj) => &obj.type_name,
        }
    }

    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn object(obj: Object) -> Self {
        Self::Object(Box::new(obj))
    }
}

impl From<&str> for Raw {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<i64> for Raw {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

/// How a provider object exposes its contents
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Body {
    /// Nothing beyond attributes
    #[default]
    Empty,
    /// Linear iteration
    Items(Vec<Raw>),
    /// Payload hidden behind an indirection field (`lines`, `line`, ...)
    Wrapped { field: String, inner: Raw },
    /// Key/value iteration
    Entries(Vec<(Raw, Raw)>),
    /// Keys published by a header object, values looked up per key
    Keyed {
        header: Vec<Raw>,
        cells: Vec<(Raw, Raw)>,
    },
    /// Attribute names declared by the object itself, values read from
    /// its attributes
    Declared(Vec<String>),
    /// Fixed-position data plus name → position aliases
    NamedVector {
        aliases: Vec<(String, usize)>,
        data: Vec<Raw>,
    },
}

/// One attribute reachable on a provider object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: Raw,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub callable: bool,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: Raw) -> Self {
        Self {
            name: name.into(),
            value,
            callable: false,
        }
    }

    pub fn method(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Raw::None,
            callable: true,
        }
    }

    /// `__name__` style members belong to the object model, not the data
    pub fn is_dunder(&self) -> bool {
        self.name.len() > 4 && self.name.starts_with("__") && self.name.ends_with("__")
    }
}

/// A provider object
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Object {
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    /// Base type names, nearest first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lineage: Vec<String>,
    #[serde(default)]
    pub body: Body,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,
}

impl Object {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            ..Self::default()
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    pub fn with_lineage<I, S>(mut self, lineage: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lineage = lineage.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: Raw) -> Self {
        self.attributes.push(Attribute::new(name, value));
        self
    }

    /// Tag used for symbolic dispatch; falls back to the concrete type name
    pub fn dispatch_tag(&self) -> &str {
        self.tag.as_deref().unwrap_or(&self.type_name)
    }

    /// Whether this object is, or derives from, the named type
    pub fn is_a(&self, base: &str) -> bool {
        self.type_name == base || self.lineage.iter().any(|b| b == base)
    }

    pub fn attribute(&self, name: &str) -> Option<&Raw> {
        self.attributes
            .iter()
            .find(|a| a.name == name && !a.callable)
            .map(|a| &a.value)
    }
}

/// Context of the decoder that produced a container
///
/// Replaces runtime reflection: the caller states which module the
/// just-loaded decoder defines its types in, and optionally which fields
/// each of those types carries.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DecoderSession {
    pub module: String,
    /// type name → field names
    #[serde(default)]
    pub descriptors: HashMap<String, Vec<String>>,
}

impl DecoderSession {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            descriptors: HashMap::new(),
        }
    }

    pub fn with_descriptor<I, S>(mut self, type_name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.descriptors
            .insert(type_name.into(), fields.into_iter().map(Into::into).collect());
        self
    }

    /// Whether the object was defined by this session's decoder
    pub fn owns(&self, obj: &Object) -> bool {
        obj.module.as_deref() == Some(self.module.as_str())
    }

    pub fn fields_for(&self, type_name: &str) -> Option<&[String]> {
        self.descriptors.get(type_name).map(Vec::as_slice)
    }
}
