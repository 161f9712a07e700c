//! Text and file persistence for configuration trees.
//!
//! ## Formats
//! - YAML (`.yml`): optional commented header, configurable indent
//! - JSON (`.json`): pretty-printed with the same indent, no header
//!
//! An empty root always renders as the empty string, and blank text
//! always parses to an empty root, so untouched files stay empty.

pub mod json;
pub mod yaml;

use crate::error::{ConfigError, Result};
use crate::node::ConfigNode;
use std::path::Path;
use tracing::debug;

/// Smallest accepted indent width.
pub const MIN_INDENT: usize = 2;

/// Largest accepted indent width.
pub const MAX_INDENT: usize = 9;

/// Check an indent width against [`MIN_INDENT`]..=[`MAX_INDENT`].
pub fn validate_indent(indent: usize) -> Result<usize> {
    if (MIN_INDENT..=MAX_INDENT).contains(&indent) {
        Ok(indent)
    } else {
        Err(ConfigError::InvalidIndent {
            value: indent,
            min: MIN_INDENT,
            max: MAX_INDENT,
        })
    }
}

/// On-disk format of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FileType {
    #[default]
    Yaml,
    Json,
}

impl FileType {
    /// File name suffix, including the dot.
    pub fn suffix(&self) -> &'static str {
        match self {
            FileType::Yaml => ".yml",
            FileType::Json => ".json",
        }
    }

    /// Append the suffix to `name` unless it already ends with it.
    pub fn file_name(&self, name: &str) -> String {
        if name.ends_with(self.suffix()) {
            name.to_string()
        } else {
            format!("{}{}", name, self.suffix())
        }
    }

    /// Guess the format from a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "yml" | "yaml" => Some(FileType::Yaml),
            "json" => Some(FileType::Json),
            _ => None,
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileType::Yaml => write!(f, "yaml"),
            FileType::Json => write!(f, "json"),
        }
    }
}

/// Parse text of the given format into a mapping root.
pub fn load_from_text(text: &str, file_type: FileType) -> Result<ConfigNode> {
    match file_type {
        FileType::Yaml => yaml::parse(text),
        FileType::Json => json::parse(text),
    }
}

/// Render a root as text. Empty roots render as `""`.
pub fn save_to_text(
    root: &ConfigNode,
    file_type: FileType,
    header: Option<&str>,
    indent: usize,
) -> Result<String> {
    let indent = validate_indent(indent)?;
    if is_empty_root(root) {
        return Ok(String::new());
    }
    match file_type {
        FileType::Yaml => yaml::emit(root, header, indent),
        FileType::Json => json::emit(root, indent),
    }
}

/// Header carried by a document's text, if the format supports one.
pub fn header_from_text(text: &str, file_type: FileType) -> Option<String> {
    match file_type {
        FileType::Yaml => yaml::extract_header(text),
        FileType::Json => None,
    }
}

/// Read a file as UTF-8. A missing file is `Ok(None)`.
pub fn read_file(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ConfigError::read_file(path, e)),
    }
}

/// Write UTF-8 text, creating the parent directory first.
pub fn write_file(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
    }
    std::fs::write(path, text).map_err(|e| ConfigError::write_file(path, e))?;
    debug!(path = %path.display(), bytes = text.len(), "Wrote config file");
    Ok(())
}

fn is_empty_root(root: &ConfigNode) -> bool {
    match root {
        ConfigNode::Object(map) => map.is_empty(),
        ConfigNode::Null => true,
        _ => false,
    }
}
