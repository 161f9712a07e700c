//! JSON text format.

use crate::error::{ConfigError, Result};
use crate::node::{ConfigMap, ConfigNode};
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

/// Parse JSON text into a mapping root. Blank input yields an empty mapping.
pub fn parse(text: &str) -> Result<ConfigNode> {
    if text.trim().is_empty() {
        return Ok(ConfigNode::Object(ConfigMap::new()));
    }
    match serde_json::from_str(text).map_err(ConfigError::ParseJson)? {
        node @ ConfigNode::Object(_) => Ok(node),
        _ => Err(ConfigError::RootNotMapping { format: "JSON" }),
    }
}

/// Pretty-print a root with `indent` spaces per level and a trailing newline.
///
/// JSON has no comment syntax, so headers are never written.
pub fn emit(root: &ConfigNode, indent: usize) -> Result<String> {
    let indent = " ".repeat(indent);
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(indent.as_bytes());
    let mut serializer = Serializer::with_formatter(&mut buf, formatter);
    root.serialize(&mut serializer)
        .map_err(|e| ConfigError::Serialize(e.to_string()))?;
    let mut text = String::from_utf8(buf).map_err(|e| ConfigError::Serialize(e.to_string()))?;
    text.push('\n');
    Ok(text)
}
