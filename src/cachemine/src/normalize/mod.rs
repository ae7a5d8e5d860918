//! Canonicalizer
//!
//! Converts one raw value into a canonical [`Value`]. Dispatch runs in a
//! fixed order, re-evaluated for every value:
//!
//! 1. Builtin raw variants (primitives, lists, tuples, dicts, legacy strings)
//! 2. Symbolic tag of a provider object (its concrete type name when untagged)
//! 3. Is-a tests against the object's lineage, most specific first
//! 4. Provenance: objects defined by the session's decoder module are read
//!    as attribute bags, as are the decoder's `*_vector` helper types
//! 5. Anything else fails with [`Error::UnrecognizedShape`]

mod cp1252;
mod rules;

use crate::raw::{DecoderSession, Object, Raw};
use crate::value::{Primitive, Value};
use crate::{Error, Result};
use rules::{SUBCLASS_RULES, TAG_RULES, VECTOR_BOOKKEEPING, VECTOR_SUFFIX};

/// Default nesting limit; real data stays far below it
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Stateless converter from raw values to canonical values
#[derive(Debug, Clone, Copy)]
pub struct Canonicalizer {
    max_depth: usize,
}

impl Default for Canonicalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Canonicalizer {
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Canonicalize a value that carries no decoder-defined objects
    pub fn canonicalize(&self, raw: &Raw) -> Result<Value> {
        self.canonicalize_with(raw, None)
    }

    /// Canonicalize a value produced within a decoder session
    pub fn canonicalize_with(&self, raw: &Raw, session: Option<&DecoderSession>) -> Result<Value> {
        Walker {
            session,
            max_depth: self.max_depth,
            depth: 0,
        }
        .route(raw)
    }
}

/// Per-call traversal state
pub(crate) struct Walker<'s> {
    session: Option<&'s DecoderSession>,
    max_depth: usize,
    depth: usize,
}

impl Walker<'_> {
    fn route(&mut self, raw: &Raw) -> Result<Value> {
        if self.depth >= self.max_depth {
            return Err(Error::DepthExceeded(self.max_depth));
        }
        self.depth += 1;
        let result = self.dispatch(raw);
        self.depth -= 1;
        result
    }

    fn dispatch(&mut self, raw: &Raw) -> Result<Value> {
        let primitive = match raw {
            Raw::None => Primitive::Null,
            Raw::Bool(b) => Primitive::Bool(*b),
            Raw::Int(v) => Primitive::Int(*v),
            Raw::Float(v) => Primitive::Float(*v),
            Raw::Text(s) => Primitive::Text(s.clone()),
            Raw::Bytes(bytes) => {
                let text = cp1252::decode(bytes).map_err(|_| Error::MalformedShape {
                    type_name: raw.type_name().to_string(),
                    expected: "cp1252 text",
                })?;
                Primitive::Text(text)
            }
            Raw::List(items) | Raw::Tuple(items) => return self.sequence(items),
            Raw::Dict(pairs) => return self.pairs(pairs),
            Raw::Object(obj) => return self.object(obj),
        };
        Ok(Value::Primitive(primitive))
    }

    fn object(&mut self, obj: &Object) -> Result<Value> {
        if let Some(rule) = TAG_RULES.get(obj.dispatch_tag()) {
            return self.apply(*rule, obj);
        }

        if let Some((_, rule)) = SUBCLASS_RULES.iter().find(|(base, _)| obj.is_a(base)) {
            return self.apply(*rule, obj);
        }

        if let Some(session) = self.session {
            if session.owns(obj) {
                return self.attribute_bag(obj, session.fields_for(&obj.type_name), &[]);
            }
            if obj.type_name.ends_with(VECTOR_SUFFIX) {
                return self.attribute_bag(obj, None, VECTOR_BOOKKEEPING);
            }
        }

        Err(Error::UnrecognizedShape {
            type_name: obj.type_name.clone(),
            tag: obj.tag.clone(),
        })
    }
}
