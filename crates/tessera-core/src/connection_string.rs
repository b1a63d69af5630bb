//! Connection-string parsing and hygiene rewrites.
//!
//! The grammar is semicolon-delimited `key=value` pairs. Unknown keys are
//! preserved byte-for-byte and round-trip in their original order. Raw
//! file paths and in-memory markers are not key/value strings at all and
//! pass through every rewrite unchanged.

use crate::error::{Error, Result};

/// The conventional application-name key most providers accept.
pub const APPLICATION_NAME_KEY: &str = "Application Name";

/// A parsed connection string. Keys keep their original spelling and
/// order; lookups are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionString {
    entries: Vec<(String, String)>,
}

impl ConnectionString {
    /// Parse a `key=value;` string.
    ///
    /// # Errors
    ///
    /// Fails when a segment has no `=`. Raw strings (file paths, memory
    /// markers) should be detected with [`is_raw_connection_string`]
    /// before calling this.
    pub fn parse(input: &str) -> Result<Self> {
        let mut entries = Vec::new();
        for segment in input.split(';') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let (key, value) = segment.split_once('=').ok_or_else(|| {
                Error::InvalidConfiguration(format!(
                    "connection-string segment {segment:?} has no '='"
                ))
            })?;
            entries.push((key.trim().to_owned(), value.trim().to_owned()));
        }
        Ok(Self { entries })
    }

    /// Case-insensitive lookup.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Set a value, preserving the existing key spelling and position when
    /// present, appending otherwise.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        for (k, v) in &mut self.entries {
            if k.eq_ignore_ascii_case(key) {
                *v = value;
                return;
            }
        }
        self.entries.push((key.to_owned(), value));
    }

    /// Remove a key. Returns the removed value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let idx = self
            .entries
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(key))?;
        Some(self.entries.remove(idx).1)
    }

    /// Whether any value carries an in-memory database marker.
    #[must_use]
    pub fn is_memory(&self) -> bool {
        self.entries
            .iter()
            .any(|(_, v)| v.contains(":memory:") || v.contains("file::memory:"))
    }

    /// Render back to `key=value;...` form.
    #[must_use]
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(";")
    }
}

/// Whether the input is a raw connection target (a bare file path or
/// in-memory marker) rather than a key/value string. Raw targets are
/// returned unchanged by every rewrite helper.
#[must_use]
pub fn is_raw_connection_string(input: &str) -> bool {
    let trimmed = input.trim();
    trimmed == ":memory:"
        || trimmed.starts_with("file:")
        || (!trimmed.is_empty() && !trimmed.contains('='))
}

/// Apply a default application name, preserving any existing one.
#[must_use]
pub fn apply_default_application_name(input: &str, key: &str, name: &str) -> String {
    rewrite(input, |cs| {
        if cs.get(key).is_none() {
            cs.set(key, name);
        }
    })
}

/// Append a suffix to the application name. Idempotent: a name already
/// ending with the suffix is left alone.
#[must_use]
pub fn append_application_name_suffix(input: &str, key: &str, suffix: &str) -> String {
    rewrite(input, |cs| {
        let current = cs.get(key).unwrap_or_default().to_owned();
        if current.ends_with(suffix) {
            return;
        }
        cs.set(key, format!("{current}{suffix}"));
    })
}

/// Set or override the max-pool-size key. Zero and negative sizes are
/// ignored.
#[must_use]
pub fn set_max_pool_size(input: &str, key: &str, size: i64) -> String {
    if size <= 0 {
        return input.to_owned();
    }
    rewrite(input, |cs| cs.set(key, size.to_string()))
}

/// Strip a max-pool-size key for dialects without a pooling setting, and
/// leave memory-marker strings untouched (pooling rewrites would break
/// shared in-memory databases).
#[must_use]
pub fn strip_max_pool_size_if_unsupported(input: &str, pooling_key: Option<&str>, key_to_strip: &str) -> String {
    if pooling_key.is_some() {
        return input.to_owned();
    }
    rewrite(input, |cs| {
        if cs.is_memory() {
            return;
        }
        if cs.remove(key_to_strip).is_some() {
            tracing::debug!(key = key_to_strip, "stripped unsupported pooling key");
        }
    })
}

/// Re-merge credentials a provider builder silently dropped on round-trip
/// (`PersistSecurityInfo=false` behaviour). Any sensitive key present in
/// `original` but missing from `rewritten` is restored.
#[must_use]
pub fn remerge_credentials(original: &str, rewritten: &str) -> String {
    const SENSITIVE: [&str; 4] = ["Password", "Pwd", "User Id", "Uid"];
    if is_raw_connection_string(rewritten) {
        return rewritten.to_owned();
    }
    let (Ok(original), Ok(mut merged)) = (
        ConnectionString::parse(original),
        ConnectionString::parse(rewritten),
    ) else {
        return rewritten.to_owned();
    };
    for key in SENSITIVE {
        if merged.get(key).is_none() {
            if let Some(value) = original.get(key) {
                tracing::debug!(key, "re-merged credential dropped by provider round-trip");
                merged.set(key, value.to_owned());
            }
        }
    }
    merged.render()
}

fn rewrite(input: &str, apply: impl FnOnce(&mut ConnectionString)) -> String {
    if is_raw_connection_string(input) {
        return input.to_owned();
    }
    match ConnectionString::parse(input) {
        Ok(mut cs) => {
            apply(&mut cs);
            cs.render()
        }
        Err(_) => input.to_owned(),
    }
}
