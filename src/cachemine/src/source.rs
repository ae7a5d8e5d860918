//! Source and Sink collaborator traits
//!
//! The pipeline knows nothing about where containers come from or where
//! they end up. Implementations live with the surrounding tooling; the
//! library only needs these seams.

use crate::naming::{Charset, NameResolver, Role};
use crate::raw::{DecoderSession, Raw};
use crate::value::Value;
use crate::Result;

/// A fetched container, possibly with the decoder session that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct RawContainer {
    pub value: Raw,
    pub session: Option<DecoderSession>,
}

impl RawContainer {
    pub fn new(value: Raw) -> Self {
        Self {
            value,
            session: None,
        }
    }

    pub fn with_session(mut self, session: DecoderSession) -> Self {
        self.session = Some(session);
        self
    }
}

impl From<Raw> for RawContainer {
    fn from(value: Raw) -> Self {
        Self::new(value)
    }
}

/// Provides raw containers by name
pub trait Source {
    /// Name used in logs and reports
    fn name(&self) -> &str;

    /// Every container this source can provide
    ///
    /// Must be restartable: calling it again yields the same names.
    fn list_container_names(&mut self) -> Result<Vec<String>>;

    /// Fetch one container
    ///
    /// Fails with [`crate::Error::ContainerNotFound`] when the name is unknown
    /// at fetch time, even if it was listed earlier.
    fn fetch(&mut self, name: &str, language: Option<&str>, verbose: bool) -> Result<RawContainer>;

    /// Explicit translatable field names for a container, when known
    ///
    /// `None` lets the localization engine detect fields by convention.
    fn translation_fields(&self, _name: &str) -> Option<Vec<String>> {
        None
    }
}

/// Persists canonical values
pub trait Sink {
    fn name(&self) -> &str;

    /// Resolver for this sink's namespace
    ///
    /// The default suits identifier-like namespaces; filesystem sinks
    /// should narrow it to paths and case-insensitive matching.
    fn resolver(&self) -> NameResolver {
        NameResolver::new(Role::Sink).with_charset(Charset::Flow)
    }

    fn write(&mut self, source_name: &str, container_name: &str, data: &Value) -> Result<()>;
}

impl<S: Source + ?Sized> Source for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn list_container_names(&mut self) -> Result<Vec<String>> {
        (**self).list_container_names()
    }

    fn fetch(&mut self, name: &str, language: Option<&str>, verbose: bool) -> Result<RawContainer> {
        (**self).fetch(name, language, verbose)
    }

    fn translation_fields(&self, name: &str) -> Option<Vec<String>> {
        (**self).translation_fields(name)
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn resolver(&self) -> NameResolver {
        (**self).resolver()
    }

    fn write(&mut self, source_name: &str, container_name: &str, data: &Value) -> Result<()> {
        (**self).write(source_name, container_name, data)
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! In-memory collaborators for tests

    use super::*;
    use crate::flow::CancelToken;
    use crate::Error;
    use std::cell::RefCell;
    use std::collections::BTreeMap;
    use std::rc::Rc;

    /// Call log shared between mocks, in call order
    pub type Calls = Rc<RefCell<Vec<String>>>;

    pub enum Entry {
        Ok(RawContainer),
        Fail(fn() -> Error),
        /// Raise the token while fetching, then succeed
        Cancel(CancelToken),
    }

    pub struct MockSource {
        pub name: String,
        pub entries: BTreeMap<String, Entry>,
        pub calls: Calls,
    }

    impl MockSource {
        pub fn new(name: &str, calls: &Calls) -> Self {
            Self {
                name: name.to_string(),
                entries: BTreeMap::new(),
                calls: calls.clone(),
            }
        }

        pub fn with(mut self, name: &str, raw: Raw) -> Self {
            self.entries
                .insert(name.to_string(), Entry::Ok(RawContainer::new(raw)));
            self
        }

        pub fn failing(mut self, name: &str, err: fn() -> Error) -> Self {
            self.entries.insert(name.to_string(), Entry::Fail(err));
            self
        }

        pub fn cancelling(mut self, name: &str, token: &CancelToken) -> Self {
            self.entries
                .insert(name.to_string(), Entry::Cancel(token.clone()));
            self
        }
    }

    impl Source for MockSource {
        fn name(&self) -> &str {
            &self.name
        }

        fn list_container_names(&mut self) -> Result<Vec<String>> {
            Ok(self.entries.keys().cloned().collect())
        }

        fn fetch(&mut self, name: &str, _language: Option<&str>, _verbose: bool) -> Result<RawContainer> {
            self.calls
                .borrow_mut()
                .push(format!("fetch {}:{}", self.name, name));
            match self.entries.get(name) {
                Some(Entry::Ok(raw)) => Ok(raw.clone()),
                Some(Entry::Fail(err)) => Err(err()),
                Some(Entry::Cancel(token)) => {
                    token.cancel();
                    Ok(RawContainer::new(Raw::None))
                }
                None => Err(Error::not_found(&self.name, name)),
            }
        }
    }

    pub type Written = Rc<RefCell<BTreeMap<String, Value>>>;

    pub struct MockSink {
        pub name: String,
        pub written: Written,
        pub fail_on: Option<String>,
        pub calls: Calls,
    }

    impl MockSink {
        pub fn new(name: &str, calls: &Calls) -> Self {
            Self {
                name: name.to_string(),
                written: Written::default(),
                fail_on: None,
                calls: calls.clone(),
            }
        }
    }

    impl Sink for MockSink {
        fn name(&self) -> &str {
            &self.name
        }

        fn write(&mut self, source_name: &str, container_name: &str, data: &Value) -> Result<()> {
            self.calls
                .borrow_mut()
                .push(format!("write {}:{}", self.name, container_name));
            if self.fail_on.as_deref() == Some(container_name) {
                return Err(Error::SinkWrite {
                    sink: self.name.clone(),
                    message: format!("refused {} from {}", container_name, source_name),
                });
            }
            self.written
                .borrow_mut()
                .insert(container_name.to_string(), data.clone());
            Ok(())
        }
    }
}
