//! Error types for loading, saving and configuring stores.
//!
//! Lookups never fail with an error: a missing path or a type without a
//! conversion is reported through [`crate::resolver::Resolution`]. Only
//! parse failures, I/O failures and precondition violations land here.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration error type.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A path was empty or contained an empty segment.
    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: &'static str },

    /// Indent width outside the accepted range.
    #[error("indent must be between {min} and {max} spaces, got {value}")]
    InvalidIndent { value: usize, min: usize, max: usize },

    /// Path separator that cannot split a path.
    #[error("invalid path separator {0:?}")]
    InvalidSeparator(char),

    /// Attempt to register a provider over a built-in conversion.
    #[error("type '{0}' has a built-in conversion and cannot be re-registered")]
    BuiltinProvider(&'static str),

    /// Failed to read a config file.
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a config file.
    #[error("failed to write config file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create the parent directory of a config file.
    #[error("failed to create config directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed YAML text.
    #[error("failed to parse YAML: {0}")]
    ParseYaml(#[source] serde_yaml::Error),

    /// Parsed text whose top level is not a mapping.
    #[error("top level of {format} document is not a mapping")]
    RootNotMapping { format: &'static str },

    /// Malformed JSON text.
    #[error("failed to parse JSON: {0}")]
    ParseJson(#[source] serde_json::Error),

    /// Failed to render a tree as text.
    #[error("failed to serialize config: {0}")]
    Serialize(String),

    /// Save requested on a store that has no backing file.
    #[error("store has no backing file")]
    NoFile,
}

impl ConfigError {
    /// Creates an invalid path error.
    pub fn invalid_path(path: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason,
        }
    }

    /// Creates a read file error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// Creates a write file error.
    pub fn write_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::WriteFile {
            path: path.into(),
            source,
        }
    }

    /// Creates a create directory error.
    pub fn create_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::CreateDir {
            path: path.into(),
            source,
        }
    }

    /// Returns true for failures caused by the file system.
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            Self::ReadFile { .. } | Self::WriteFile { .. } | Self::CreateDir { .. }
        )
    }
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
