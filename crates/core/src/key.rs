//! Namespaced content keys.
//!
//! Dungeon types and rewards are data-driven and identified by stable string
//! keys such as `delve:swamp` or `delve:rune/slimy`. Keys are ordered so that
//! catalogs and snapshots iterate deterministically.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Namespace used when a key omits one.
pub const DEFAULT_NAMESPACE: &str = "delve";

const MAX_NAMESPACE_LEN: usize = 64;
const MAX_PATH_LEN: usize = 128;

/// Reasons a [`ContentKey`] fails to parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContentKeyError {
    /// The input was empty or whitespace.
    #[error("content key cannot be empty")]
    Empty,
    /// Namespace segment is missing after trimming.
    #[error("content key namespace cannot be empty")]
    EmptyNamespace,
    /// Path segment is missing after trimming.
    #[error("content key path cannot be empty")]
    EmptyPath,
    /// A segment exceeds its length limit.
    #[error("content key {segment} too long (max {max})")]
    TooLong {
        /// Which segment overflowed.
        segment: &'static str,
        /// Maximum accepted length.
        max: usize,
    },
    /// A segment contains a character outside its allowed set.
    #[error("content key {segment} has invalid character {found:?}")]
    InvalidChar {
        /// Which segment was rejected.
        segment: &'static str,
        /// The offending character.
        found: char,
    },
}

/// A key of the form `namespace:path`.
///
/// Serializes as the canonical `namespace:path` string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentKey {
    namespace: String,
    path: String,
}

impl ContentKey {
    /// Parse `namespace:path`, or a bare `path` in [`DEFAULT_NAMESPACE`].
    pub fn parse(input: &str) -> Result<Self, ContentKeyError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ContentKeyError::Empty);
        }

        let (namespace, path) = input
            .split_once(':')
            .unwrap_or((DEFAULT_NAMESPACE, input));
        let namespace = namespace.trim();
        let path = path.trim();

        check_segment(namespace, "namespace", MAX_NAMESPACE_LEN, |c| {
            matches!(c, 'a'..='z' | '0'..='9' | '_' | '-' | '.')
        })?;
        check_segment(path, "path", MAX_PATH_LEN, |c| {
            matches!(c, 'a'..='z' | '0'..='9' | '_' | '-' | '.' | '/')
        })?;

        Ok(Self {
            namespace: namespace.to_string(),
            path: path.to_string(),
        })
    }

    /// Key in [`DEFAULT_NAMESPACE`] for static content tables.
    ///
    /// Panics on an invalid path; only use with literals.
    pub fn builtin(path: &str) -> Self {
        match Self::parse(path) {
            Ok(key) => key,
            Err(err) => panic!("invalid builtin content key {path:?}: {err}"),
        }
    }

    /// Key namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Key path.
    pub fn path(&self) -> &str {
        &self.path
    }
}

fn check_segment(
    segment: &str,
    name: &'static str,
    max: usize,
    allowed: impl Fn(char) -> bool,
) -> Result<(), ContentKeyError> {
    if segment.is_empty() {
        return Err(match name {
            "namespace" => ContentKeyError::EmptyNamespace,
            _ => ContentKeyError::EmptyPath,
        });
    }
    if segment.len() > max {
        return Err(ContentKeyError::TooLong { segment: name, max });
    }
    if let Some(found) = segment.chars().find(|c| !allowed(*c)) {
        return Err(ContentKeyError::InvalidChar {
            segment: name,
            found,
        });
    }
    Ok(())
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.path)
    }
}

impl FromStr for ContentKey {
    type Err = ContentKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ContentKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ContentKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_path_gets_default_namespace() {
        let key = ContentKey::parse("swamp").unwrap();
        assert_eq!(key.namespace(), DEFAULT_NAMESPACE);
        assert_eq!(key.path(), "swamp");
        assert_eq!(key.to_string(), "delve:swamp");
    }

    #[test]
    fn explicit_namespace_and_nested_path() {
        let key: ContentKey = "mods:rune/slimy".parse().unwrap();
        assert_eq!(key.namespace(), "mods");
        assert_eq!(key.path(), "rune/slimy");
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(ContentKey::parse("  "), Err(ContentKeyError::Empty));
        assert_eq!(ContentKey::parse(":x"), Err(ContentKeyError::EmptyNamespace));
        assert_eq!(ContentKey::parse("ns:"), Err(ContentKeyError::EmptyPath));
        assert!(matches!(
            ContentKey::parse("Swamp"),
            Err(ContentKeyError::InvalidChar { found: 'S', .. })
        ));
        assert!(matches!(
            ContentKey::parse("bad/ns:path"),
            Err(ContentKeyError::InvalidChar {
                segment: "namespace",
                ..
            })
        ));
    }

    #[test]
    fn ordering_is_namespace_then_path() {
        let mut keys = vec![
            ContentKey::parse("b:a").unwrap(),
            ContentKey::parse("a:z").unwrap(),
            ContentKey::parse("a:b").unwrap(),
        ];
        keys.sort();
        let rendered: Vec<String> = keys.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["a:b", "a:z", "b:a"]);
    }

    #[test]
    fn serde_uses_canonical_string() {
        let key = ContentKey::builtin("crypt");
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"delve:crypt\"");
        let back: ContentKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
        assert!(serde_json::from_str::<ContentKey>("\"Nope\"").is_err());
    }
}
