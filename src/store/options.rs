//! Store options.
//!
//! Options are plain data so a host can embed them in its own settings
//! file; [`StoreOptions::validate`] runs when a store is built, before
//! any file is touched.

use crate::error::Result;
use crate::node::{DEFAULT_SEPARATOR, validate_separator};
use crate::persist::{MIN_INDENT, validate_indent};
use serde::{Deserialize, Serialize};

/// Behaviour switches for a [`super::ManagedStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreOptions {
    /// Separator used to split string paths.
    #[serde(default = "default_path_separator")]
    pub path_separator: char,

    /// Materialize default values into the primary store on first miss.
    #[serde(default)]
    pub copy_defaults: bool,

    /// Header written as a comment block at the top of YAML output.
    #[serde(default)]
    pub header: Option<String>,

    /// Prefer the defaults store's header over [`Self::header`] on save.
    #[serde(default = "default_copy_header")]
    pub copy_header: bool,

    /// Spaces per nesting level (2..=9).
    #[serde(default = "default_indent")]
    pub indent: usize,

    /// Save after every field write made through a resolver.
    #[serde(default)]
    pub auto_save: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            path_separator: default_path_separator(),
            copy_defaults: false,
            header: None,
            copy_header: default_copy_header(),
            indent: default_indent(),
            auto_save: false,
        }
    }
}

fn default_path_separator() -> char {
    DEFAULT_SEPARATOR
}

fn default_copy_header() -> bool {
    true
}

fn default_indent() -> usize {
    MIN_INDENT
}

impl StoreOptions {
    pub fn with_path_separator(mut self, separator: char) -> Self {
        self.path_separator = separator;
        self
    }

    pub fn with_copy_defaults(mut self, value: bool) -> Self {
        self.copy_defaults = value;
        self
    }

    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = Some(header.into());
        self
    }

    pub fn with_copy_header(mut self, value: bool) -> Self {
        self.copy_header = value;
        self
    }

    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    pub fn with_auto_save(mut self, value: bool) -> Self {
        self.auto_save = value;
        self
    }

    /// Reject an indent outside 2..=9 or a separator that cannot split paths.
    pub fn validate(&self) -> Result<()> {
        validate_indent(self.indent)?;
        validate_separator(self.path_separator)?;
        Ok(())
    }
}
