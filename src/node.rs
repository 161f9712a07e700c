//! Tree nodes and paths.
//!
//! A configuration tree is a [`serde_json::Value`] built with the
//! `preserve_order` feature, so mapping keys iterate in first-insertion
//! order and serialize back out the way they were written. Paths are
//! plain strings split on a separator; nothing is cached between
//! lookups, the tree is the single source of truth.

use crate::error::{ConfigError, Result};
use std::fmt;

/// A node of the configuration tree.
pub type ConfigNode = serde_json::Value;

/// An ordered mapping node.
pub type ConfigMap = serde_json::Map<String, ConfigNode>;

/// Separator used when nothing overrides it.
pub const DEFAULT_SEPARATOR: char = '.';

/// Check that a separator can split paths.
pub fn validate_separator(separator: char) -> Result<char> {
    if separator.is_whitespace() || separator.is_control() {
        return Err(ConfigError::InvalidSeparator(separator));
    }
    Ok(separator)
}

/// A validated sequence of non-empty path segments.
///
/// The empty path addresses the root of a tree; it is only produced by
/// [`ConfigPath::root`] and never by parsing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfigPath {
    segments: Vec<String>,
    separator: char,
}

impl ConfigPath {
    /// The root path.
    pub fn root(separator: char) -> Self {
        Self {
            segments: Vec::new(),
            separator,
        }
    }

    /// Parse a separator-delimited path.
    ///
    /// Empty input and empty segments (`"a..b"`, `".a"`, `"a."`) are rejected.
    pub fn parse(path: &str, separator: char) -> Result<Self> {
        validate_separator(separator)?;
        if path.is_empty() {
            return Err(ConfigError::invalid_path(path, "path is empty"));
        }
        let segments: Vec<String> = path.split(separator).map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(ConfigError::invalid_path(path, "empty segment"));
        }
        Ok(Self {
            segments,
            separator,
        })
    }

    /// Build a path from already-split segments.
    pub fn from_segments<I, S>(segments: I, separator: char) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        validate_separator(separator)?;
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(ConfigError::invalid_path("", "path is empty"));
        }
        if segments.iter().any(String::is_empty) {
            return Err(ConfigError::invalid_path(
                segments.join(&separator.to_string()),
                "empty segment",
            ));
        }
        Ok(Self {
            segments,
            separator,
        })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// The final segment, if any.
    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Append the segments of `other`, keeping this path's separator.
    pub fn join(&self, other: &ConfigPath) -> ConfigPath {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self {
            segments,
            separator: self.separator,
        }
    }

    /// Append a single relative path parsed with this path's separator.
    pub fn child(&self, relative: &str) -> Result<ConfigPath> {
        Ok(self.join(&ConfigPath::parse(relative, self.separator)?))
    }

    /// Re-render with a different separator.
    pub fn with_separator(mut self, separator: char) -> Result<ConfigPath> {
        self.separator = validate_separator(separator)?;
        Ok(self)
    }
}

impl fmt::Display for ConfigPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", self.separator)?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

/// Walk `segments` from `node`. Stops with `None` on a missing key or
/// when a non-mapping node would have to be descended through.
pub fn lookup<'a, S: AsRef<str>>(node: &'a ConfigNode, segments: &[S]) -> Option<&'a ConfigNode> {
    segments
        .iter()
        .try_fold(node, |current, segment| current.as_object()?.get(segment.as_ref()))
}

/// Mutable counterpart of [`lookup`].
pub fn lookup_mut<'a, S: AsRef<str>>(
    node: &'a mut ConfigNode,
    segments: &[S],
) -> Option<&'a mut ConfigNode> {
    segments.iter().try_fold(node, |current, segment| {
        current.as_object_mut()?.get_mut(segment.as_ref())
    })
}

/// Store `value` at `segments`, creating intermediate mappings.
///
/// Intermediate nodes that are not mappings are replaced by empty
/// mappings; the terminal node is overwritten whatever its kind was.
/// Siblings along the way are left untouched.
pub fn insert<S: AsRef<str>>(node: &mut ConfigNode, segments: &[S], value: ConfigNode) {
    let Some((last, parents)) = segments.split_last() else {
        *node = value;
        return;
    };
    let mut current = node;
    for segment in parents {
        current = ensure_object(current)
            .entry(segment.as_ref())
            .or_insert_with(|| ConfigNode::Object(ConfigMap::new()));
    }
    ensure_object(current).insert(last.as_ref().to_string(), value);
}

/// Remove the node at `segments`, keeping the order of the remaining keys.
pub fn remove<S: AsRef<str>>(node: &mut ConfigNode, segments: &[S]) -> Option<ConfigNode> {
    let (last, parents) = segments.split_last()?;
    lookup_mut(node, parents)?
        .as_object_mut()?
        .shift_remove(last.as_ref())
}

/// Keys of a mapping node in insertion order.
///
/// With `deep`, nested mapping keys are included as full paths joined by
/// `separator`, each parent listed before its children.
pub fn keys(node: &ConfigNode, deep: bool, separator: char) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(map) = node.as_object() {
        collect_keys(map, None, deep, separator, &mut out);
    }
    out
}

fn collect_keys(
    map: &ConfigMap,
    prefix: Option<&str>,
    deep: bool,
    separator: char,
    out: &mut Vec<String>,
) {
    for (key, value) in map {
        let full = match prefix {
            Some(prefix) => format!("{prefix}{separator}{key}"),
            None => key.clone(),
        };
        out.push(full.clone());
        if deep && let Some(child) = value.as_object() {
            collect_keys(child, Some(&full), deep, separator, out);
        }
    }
}

fn ensure_object(node: &mut ConfigNode) -> &mut ConfigMap {
    if !node.is_object() {
        *node = ConfigNode::Object(ConfigMap::new());
    }
    match node {
        ConfigNode::Object(map) => map,
        _ => unreachable!("node was just replaced with a mapping"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_rejects_empty_segments() {
        assert!(ConfigPath::parse("", '.').is_err());
        assert!(ConfigPath::parse("a..b", '.').is_err());
        assert!(ConfigPath::parse(".a", '.').is_err());
        assert!(ConfigPath::parse("a.", '.').is_err());
        assert!(ConfigPath::parse("a b", ' ').is_err());
    }

    #[test]
    fn test_parse_and_display() {
        let path = ConfigPath::parse("saving.mysql.port", '.').unwrap();
        assert_eq!(path.segments(), ["saving", "mysql", "port"]);
        assert_eq!(path.to_string(), "saving.mysql.port");
        assert_eq!(path.last(), Some("port"));

        let slashed = path.with_separator('/').unwrap();
        assert_eq!(slashed.to_string(), "saving/mysql/port");
    }

    #[test]
    fn test_join_keeps_own_separator() {
        let outer = ConfigPath::parse("a/b", '/').unwrap();
        let inner = ConfigPath::parse("c.d", '.').unwrap();
        assert_eq!(outer.join(&inner).to_string(), "a/b/c/d");
        assert_eq!(ConfigPath::root('.').child("x.y").unwrap().to_string(), "x.y");
    }

    #[test]
    fn test_lookup_through_scalar_is_none() {
        let tree = json!({"a": {"b": 1}, "s": "text"});
        assert_eq!(lookup(&tree, &["a", "b"]), Some(&json!(1)));
        assert_eq!(lookup(&tree, &["s", "x"]), None);
        assert_eq!(lookup(&tree, &["missing", "x"]), None);
    }

    #[test]
    fn test_insert_creates_and_overwrites() {
        let mut tree = json!({"keep": true, "a": "scalar"});
        insert(&mut tree, &["a", "b", "c"], json!(5));
        assert_eq!(tree, json!({"keep": true, "a": {"b": {"c": 5}}}));

        insert(&mut tree, &["a"], json!([1, 2]));
        assert_eq!(tree, json!({"keep": true, "a": [1, 2]}));
    }

    #[test]
    fn test_remove_preserves_order() {
        let mut tree = json!({"x": 1, "y": 2, "z": 3});
        assert_eq!(remove(&mut tree, &["x"]), Some(json!(1)));
        assert_eq!(keys(&tree, false, '.'), ["y", "z"]);
    }

    #[test]
    fn test_deep_keys() {
        let tree = json!({"a": {"b": 1, "c": {"d": 2}}, "e": 3});
        assert_eq!(keys(&tree, false, '.'), ["a", "e"]);
        assert_eq!(keys(&tree, true, '.'), ["a", "a.b", "a.c", "a.c.d", "e"]);
    }
}
