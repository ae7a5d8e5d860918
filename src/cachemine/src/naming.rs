//! Container name sanitization and collision-free resolution
//!
//! Raw container names come from whatever the upstream data declares and may
//! contain anything. Resolution maps a whole set of them to safe names in
//! one pass so that collisions can be numbered deterministically.

use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Which layer performs a resolution pass
///
/// The role is encoded in collision suffixes, so stacked passes (provider,
/// then source, then sink) can never produce the same suffix twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Inside a single source, before the flow resolves across sources
    Provider,
    Source,
    Sink,
}

impl Role {
    pub fn marker(self) -> char {
        match self {
            Self::Provider => 'p',
            Self::Source => 'm',
            Self::Sink => 'w',
        }
    }
}

/// Character rules of the target namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Charset {
    /// Names flowing between pipeline stages: parentheses become angle
    /// brackets and commas become dots
    #[default]
    Flow,
    /// Filesystem path components: ASCII alphanumerics, `.`, `_`, `-`
    Path,
    /// Programming identifiers: ASCII alphanumerics and `_`
    Identifier,
}

/// Where the name sits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Position {
    /// Standalone name, surrounding whitespace trimmed
    #[default]
    Name,
    /// Value embedded in an argument list, whitespace kept
    Argument,
}

const SUBSTITUTE: char = '_';

/// Sanitize one raw name
pub fn sanitize(raw: &str, charset: Charset, position: Position) -> String {
    let raw = match position {
        Position::Name => raw.trim(),
        Position::Argument => raw,
    };
    raw.chars()
        .map(|c| match charset {
            Charset::Flow => match c {
                '(' => '<',
                ')' => '>',
                ',' => '.',
                c => c,
            },
            Charset::Path if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') => c,
            Charset::Identifier if c.is_ascii_alphanumeric() || c == '_' => c,
            _ => SUBSTITUTE,
        })
        .collect()
}

/// Resolves sets of raw names to unique safe names
#[derive(Debug, Clone, Copy)]
pub struct NameResolver {
    role: Role,
    charset: Charset,
    position: Position,
    case_insensitive: bool,
}

impl NameResolver {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            charset: Charset::default(),
            position: Position::default(),
            case_insensitive: false,
        }
    }

    pub fn with_charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    /// Treat names differing only in ASCII case as colliding
    pub fn case_insensitive(mut self, yes: bool) -> Self {
        self.case_insensitive = yes;
        self
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn sanitize(&self, raw: &str) -> String {
        sanitize(raw, self.charset, self.position)
    }

    /// Map every raw name to a unique resolved name
    pub fn resolve(&self, raw_names: &BTreeSet<String>) -> BTreeMap<String, String> {
        self.resolve_keyed(raw_names.iter().map(|name| ((), name.clone())))
            .into_iter()
            .map(|(((), raw), resolved)| (raw, resolved))
            .collect()
    }

    /// Resolve `(key, raw name)` pairs in one pass
    ///
    /// Used when several origins may declare the same raw name. Colliding
    /// members are numbered by raw name, then by key.
    pub fn resolve_keyed<K, I>(&self, names: I) -> BTreeMap<(K, String), String>
    where
        K: Ord + Clone,
        I: IntoIterator<Item = (K, String)>,
    {
        let names: BTreeSet<(K, String)> = names.into_iter().collect();

        let mut groups: BTreeMap<String, Vec<&(K, String)>> = BTreeMap::new();
        for entry in &names {
            groups.entry(self.group_key(&entry.1)).or_default().push(entry);
        }

        let mut resolved = BTreeMap::new();
        let mut taken: HashSet<String> = HashSet::new();

        // Singletons keep their sanitized form and claim it first
        for members in groups.values() {
            if let [entry] = members.as_slice() {
                let name = self.sanitize(&entry.1);
                taken.insert(self.fold(&name));
                resolved.insert((*entry).clone(), name);
            }
        }

        for (base, members) in &groups {
            if members.len() < 2 {
                continue;
            }
            let mut members = members.clone();
            members.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

            let mut n = 0usize;
            for entry in members {
                let name = loop {
                    n += 1;
                    let candidate = format!("{}_{}{}", base, self.role.marker(), n);
                    if taken.insert(self.fold(&candidate)) {
                        break candidate;
                    }
                };
                resolved.insert(entry.clone(), name);
            }
        }

        resolved
    }

    fn group_key(&self, raw: &str) -> String {
        self.fold(&self.sanitize(raw))
    }

    fn fold(&self, name: &str) -> String {
        if self.case_insensitive {
            name.to_ascii_lowercase()
        } else {
            name.to_string()
        }
    }
}
