//! PostgreSQL `hstore` key/value maps.

use core::fmt;
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::TypeError;

/// A string-to-nullable-string map mirroring PostgreSQL's `hstore`.
///
/// Keys are unique; values may be SQL NULL. The map is ordered for stable
/// rendering.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HStore {
    entries: BTreeMap<String, Option<String>>,
}

impl HStore {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a key/value pair, returning the previous value if present.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: Option<String>,
    ) -> Option<Option<String>> {
        self.entries.insert(key.into(), value)
    }

    /// Look up a key. The outer `Option` is presence; the inner is SQL NULL.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Option<String>> {
        self.entries.get(key)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_deref()))
    }
}

impl FromIterator<(String, Option<String>)> for HStore {
    fn from_iter<I: IntoIterator<Item = (String, Option<String>)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for HStore {
    /// Renders the canonical `"k"=>"v", "k2"=>NULL` form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (k, v) in &self.entries {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "\"{}\"=>", escape(k))?;
            match v {
                Some(v) => write!(f, "\"{}\"", escape(v))?,
                None => f.write_str("NULL")?,
            }
            first = false;
        }
        Ok(())
    }
}

impl FromStr for HStore {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut entries = BTreeMap::new();
        let mut rest = s.trim();
        while !rest.is_empty() {
            let (key, after_key) =
                read_quoted(rest).ok_or_else(|| TypeError::format("hstore", s))?;
            let after_arrow = after_key
                .trim_start()
                .strip_prefix("=>")
                .ok_or_else(|| TypeError::format("hstore", s))?
                .trim_start();
            let (value, after_value) = if let Some(tail) = strip_null(after_arrow) {
                (None, tail)
            } else {
                let (v, tail) =
                    read_quoted(after_arrow).ok_or_else(|| TypeError::format("hstore", s))?;
                (Some(v), tail)
            };
            entries.insert(key, value);
            rest = after_value.trim_start();
            if let Some(tail) = rest.strip_prefix(',') {
                rest = tail.trim_start();
            } else if !rest.is_empty() {
                return Err(TypeError::format("hstore", s));
            }
        }
        Ok(Self { entries })
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn strip_null(s: &str) -> Option<&str> {
    let upper = s.get(..4)?;
    if upper.eq_ignore_ascii_case("null") {
        Some(&s[4..])
    } else {
        None
    }
}

fn read_quoted(s: &str) -> Option<(String, &str)> {
    let rest = s.trim_start().strip_prefix('"')?;
    let mut out = String::new();
    let mut chars = rest.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                let (_, escaped) = chars.next()?;
                out.push(escaped);
            }
            '"' => return Some((out, &rest[i + 1..])),
            c => out.push(c),
        }
    }
    None
}
