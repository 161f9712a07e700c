//! Managed root store.
//!
//! A [`ManagedStore`] owns one configuration tree together with its
//! backing file, format, options and an optional defaults store that
//! lookups fall back to. Sections and resolvers only ever borrow it.

mod options;

pub use options::StoreOptions;

use crate::error::{ConfigError, Result};
use crate::merge::fill_missing;
use crate::node::{self, ConfigMap, ConfigNode, ConfigPath};
use crate::persist::{self, FileType};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Top-level key holding the configuration version string.
pub const VERSION_KEY: &str = "version";

/// Root configuration store.
#[derive(Debug, Clone)]
pub struct ManagedStore {
    root: ConfigNode,
    options: StoreOptions,
    file_type: FileType,
    file: Option<PathBuf>,
    defaults: Option<Box<ManagedStore>>,
    /// Header found in the text this store was loaded from.
    loaded_header: Option<String>,
}

impl Default for ManagedStore {
    fn default() -> Self {
        Self {
            root: ConfigNode::Object(ConfigMap::new()),
            options: StoreOptions::default(),
            file_type: FileType::default(),
            file: None,
            defaults: None,
            loaded_header: None,
        }
    }
}

impl ManagedStore {
    /// Create an empty in-memory store.
    pub fn new(file_type: FileType, options: StoreOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            file_type,
            options,
            ..Self::default()
        })
    }

    /// Create a store from an already-resolved tree.
    ///
    /// A non-mapping root is replaced by an empty mapping.
    pub fn from_node(root: ConfigNode, file_type: FileType, options: StoreOptions) -> Result<Self> {
        let mut store = Self::new(file_type, options)?;
        if root.is_object() {
            store.root = root;
        }
        Ok(store)
    }

    /// Parse text of the store's format.
    pub fn from_text(text: &str, file_type: FileType, options: StoreOptions) -> Result<Self> {
        let mut store = Self::new(file_type, options)?;
        store.root = persist::load_from_text(text, file_type)?;
        store.loaded_header = persist::header_from_text(text, file_type);
        Ok(store)
    }

    /// Load a store from a file. A missing file yields an empty store that
    /// will create the file on its first save.
    pub fn open(path: impl Into<PathBuf>, file_type: FileType, options: StoreOptions) -> Result<Self> {
        let path = path.into();
        options.validate()?;
        let mut store = match persist::read_file(&path)? {
            Some(text) => Self::from_text(&text, file_type, options)?,
            None => {
                debug!(path = %path.display(), "Config file missing, starting empty");
                Self::new(file_type, options)?
            }
        };
        info!(path = %path.display(), format = %file_type, keys = store.keys(false).len(), "Loaded config");
        store.file = Some(path);
        Ok(store)
    }

    /// Load a store, picking the format from the file extension (YAML if unknown).
    pub fn open_path(path: impl Into<PathBuf>, options: StoreOptions) -> Result<Self> {
        let path = path.into();
        let file_type = FileType::from_path(&path).unwrap_or_default();
        Self::open(path, file_type, options)
    }

    /// Re-read the backing file, replacing the tree. Options and defaults are kept.
    ///
    /// Unlike [`Self::open`], a missing file is an error here; the tree is
    /// left as it was.
    pub fn reload(&mut self) -> Result<()> {
        let path = self.file.clone().ok_or(ConfigError::NoFile)?;
        let text = persist::read_file(&path)?.ok_or_else(|| {
            ConfigError::read_file(&path, std::io::Error::from(std::io::ErrorKind::NotFound))
        })?;
        self.root = persist::load_from_text(&text, self.file_type)?;
        self.loaded_header = persist::header_from_text(&text, self.file_type);
        info!(path = %path.display(), "Reloaded config");
        Ok(())
    }

    /// Attach a backing file without reading it.
    pub fn set_file(&mut self, path: impl Into<PathBuf>) {
        self.file = Some(path.into());
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    pub fn separator(&self) -> char {
        self.options.path_separator
    }

    pub fn root(&self) -> &ConfigNode {
        &self.root
    }

    pub fn is_auto_save(&self) -> bool {
        self.options.auto_save
    }

    pub fn set_auto_save(&mut self, value: bool) {
        self.options.auto_save = value;
    }

    /// Install the fallback store used on lookup misses.
    pub fn set_defaults(&mut self, defaults: ManagedStore) {
        self.defaults = Some(Box::new(defaults));
    }

    pub fn defaults(&self) -> Option<&ManagedStore> {
        self.defaults.as_deref()
    }

    /// Parse a string path with this store's separator.
    pub fn path(&self, path: &str) -> Result<ConfigPath> {
        ConfigPath::parse(path, self.separator())
    }

    /// Direct lookup in this store only. Malformed paths are simply absent.
    pub fn get(&self, path: &str) -> Option<&ConfigNode> {
        let path = self.path(path).ok()?;
        self.get_path(&path)
    }

    pub fn get_path(&self, path: &ConfigPath) -> Option<&ConfigNode> {
        node::lookup(&self.root, path.segments())
    }

    /// Lookup that falls back to the defaults store without modifying anything.
    pub fn get_or_fallback(&self, path: &ConfigPath) -> Option<&ConfigNode> {
        self.get_path(path)
            .or_else(|| self.defaults.as_ref()?.get_or_fallback(path))
    }

    /// Lookup with default overlay.
    ///
    /// On a miss the defaults store is consulted; with `copy_defaults`
    /// enabled the default value is also written into this store, so later
    /// reads see it even after the defaults store is gone.
    pub fn get_default(&mut self, path: &str) -> Option<ConfigNode> {
        let path = self.path(path).ok()?;
        self.get_default_path(&path)
    }

    pub fn get_default_path(&mut self, path: &ConfigPath) -> Option<ConfigNode> {
        if let Some(found) = self.get_path(path) {
            return Some(found.clone());
        }
        let fallback = self.defaults.as_ref()?.get_or_fallback(path)?.clone();
        if self.options.copy_defaults {
            debug!(path = %path, "Copying default value into store");
            node::insert(&mut self.root, path.segments(), fallback.clone());
        }
        Some(fallback)
    }

    /// Store a value, creating intermediate mappings.
    pub fn set(&mut self, path: &str, value: impl Into<ConfigNode>) -> Result<()> {
        let path = self.path(path)?;
        self.set_path(&path, value);
        Ok(())
    }

    pub fn set_path(&mut self, path: &ConfigPath, value: impl Into<ConfigNode>) {
        node::insert(&mut self.root, path.segments(), value.into());
    }

    pub fn remove(&mut self, path: &str) -> Option<ConfigNode> {
        let path = self.path(path).ok()?;
        self.remove_path(&path)
    }

    pub fn remove_path(&mut self, path: &ConfigPath) -> Option<ConfigNode> {
        node::remove(&mut self.root, path.segments())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Keys of the root in insertion order; with `deep`, full nested paths.
    pub fn keys(&self, deep: bool) -> Vec<String> {
        node::keys(&self.root, deep, self.separator())
    }

    /// Copy every default key missing from this store. Returns how many
    /// values were copied.
    pub fn copy_all_defaults(&mut self) -> usize {
        let Some(merged) = self.merged_defaults() else {
            return 0;
        };
        let copied = fill_missing(&mut self.root, &merged);
        debug!(copied, "Copied defaults into store");
        copied
    }

    /// The whole defaults chain folded into one tree, nearer stores winning.
    /// Matches what [`Self::get_or_fallback`] sees.
    pub fn merged_defaults(&self) -> Option<ConfigNode> {
        let mut current = self.defaults.as_deref()?;
        let mut merged = current.root.clone();
        while let Some(deeper) = current.defaults.as_deref() {
            fill_missing(&mut merged, &deeper.root);
            current = deeper;
        }
        Some(merged)
    }

    /// Configuration version stored under the top-level `version` key.
    pub fn version(&self) -> Option<&str> {
        self.root.get(VERSION_KEY)?.as_str()
    }

    pub fn set_version(&mut self, version: impl Into<String>) {
        node::insert(&mut self.root, &[VERSION_KEY], ConfigNode::String(version.into()));
    }

    /// Header that will be written on save.
    ///
    /// With `copy_header`, a header carried by the defaults store wins over
    /// this store's own; otherwise the configured header is used, then the
    /// one read from the file.
    pub fn header(&self) -> Option<&str> {
        if self.options.copy_header
            && let Some(header) = self.defaults.as_ref().and_then(|d| d.own_header())
        {
            return Some(header);
        }
        self.own_header()
    }

    fn own_header(&self) -> Option<&str> {
        self.options
            .header
            .as_deref()
            .or(self.loaded_header.as_deref())
            .filter(|h| !h.is_empty())
    }

    /// Render the tree in the store's format.
    pub fn save_to_text(&self) -> Result<String> {
        persist::save_to_text(&self.root, self.file_type, self.header(), self.options.indent)
    }

    /// Write the tree to the backing file.
    pub fn save(&self) -> Result<()> {
        let path = self.file.as_deref().ok_or(ConfigError::NoFile)?;
        let text = self.save_to_text()?;
        persist::write_file(path, &text)?;
        info!(path = %path.display(), "Saved config");
        Ok(())
    }

    /// Save if auto-save is on and a file is attached; otherwise do nothing.
    pub fn auto_save(&self) -> Result<()> {
        if self.options.auto_save && self.file.is_some() {
            self.save()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn yaml_store(options: StoreOptions) -> ManagedStore {
        ManagedStore::new(FileType::Yaml, options).unwrap()
    }

    #[test]
    fn test_set_then_get() {
        let mut store = ManagedStore::default();
        assert_eq!(store.get("a.b"), None);
        store.set("a.b", 5).unwrap();
        assert_eq!(store.get("a.b"), Some(&json!(5)));
        assert_eq!(store.root(), &json!({"a": {"b": 5}}));
    }

    #[test]
    fn test_malformed_paths() {
        let mut store = ManagedStore::default();
        store.set("s", "text").unwrap();
        assert_eq!(store.get("s.deeper"), None);
        assert_eq!(store.get("a..b"), None);
        assert!(store.set("a..b", 1).is_err());
        assert_eq!(store.root(), &json!({"s": "text"}));
    }

    #[test]
    fn test_custom_separator() {
        let mut store = yaml_store(StoreOptions::default().with_path_separator('/'));
        store.set("a/b.c", true).unwrap();
        assert_eq!(store.root(), &json!({"a": {"b.c": true}}));
        assert_eq!(store.keys(true), ["a", "a/b.c"]);
    }

    #[test]
    fn test_default_overlay_without_copy() {
        let mut defaults = ManagedStore::default();
        defaults.set("x.y", "fallback").unwrap();

        let mut store = ManagedStore::default();
        store.set_defaults(defaults);
        assert_eq!(store.get_default("x.y"), Some(json!("fallback")));
        assert_eq!(store.get("x.y"), None);
    }

    #[test]
    fn test_default_overlay_with_copy_materializes() {
        let mut defaults = ManagedStore::default();
        defaults.set("x.y", 10).unwrap();

        let mut store = yaml_store(StoreOptions::default().with_copy_defaults(true));
        store.set_defaults(defaults);
        assert_eq!(store.get_default("x.y"), Some(json!(10)));
        assert_eq!(store.get("x.y"), Some(&json!(10)));
    }

    #[test]
    fn test_copy_all_defaults_keeps_existing() {
        let mut defaults = ManagedStore::default();
        defaults.set("a", 1).unwrap();
        defaults.set("b.c", 2).unwrap();

        let mut store = ManagedStore::default();
        store.set("a", 100).unwrap();
        store.set_defaults(defaults);
        assert_eq!(store.copy_all_defaults(), 1);
        assert_eq!(store.root(), &json!({"a": 100, "b": {"c": 2}}));
    }

    #[test]
    fn test_copy_all_defaults_follows_whole_chain() {
        let mut deepest = ManagedStore::default();
        deepest.set("a.deep", 3).unwrap();
        deepest.set("b", "deepest").unwrap();

        let mut middle = ManagedStore::default();
        middle.set("b", "middle").unwrap();
        middle.set_defaults(deepest);

        let mut nearest = ManagedStore::default();
        nearest.set("a.near", 1).unwrap();
        nearest.set_defaults(middle);

        let mut store = ManagedStore::default();
        store.set_defaults(nearest);

        let deep = store.path("a.deep").unwrap();
        assert_eq!(store.get_or_fallback(&deep), Some(&json!(3)));
        assert_eq!(
            store.merged_defaults(),
            Some(json!({"a": {"near": 1, "deep": 3}, "b": "middle"}))
        );

        assert_eq!(store.copy_all_defaults(), 2);
        assert_eq!(store.get("a.deep"), Some(&json!(3)));
        assert_eq!(store.get("b"), Some(&json!("middle")));
    }

    #[test]
    fn test_remove_and_contains() {
        let mut store = ManagedStore::default();
        store.set("a.b", 1).unwrap();
        assert!(store.contains("a.b"));
        assert_eq!(store.remove("a.b"), Some(json!(1)));
        assert!(!store.contains("a.b"));
        assert!(store.contains("a"));
    }

    #[test]
    fn test_version() {
        let mut store = ManagedStore::default();
        assert_eq!(store.version(), None);
        store.set_version("1.1");
        assert_eq!(store.version(), Some("1.1"));
    }

    #[test]
    fn test_header_selection() {
        let mut defaults = yaml_store(StoreOptions::default().with_header("From template"));
        defaults.set("k", 1).unwrap();

        let mut store = yaml_store(StoreOptions::default().with_header("Local"));
        store.set("k", 1).unwrap();
        assert_eq!(store.header(), Some("Local"));

        store.set_defaults(defaults.clone());
        assert_eq!(store.header(), Some("From template"));
        assert!(store.save_to_text().unwrap().starts_with("# From template\n"));

        let mut no_copy = yaml_store(
            StoreOptions::default()
                .with_header("Local")
                .with_copy_header(false),
        );
        no_copy.set_defaults(defaults);
        assert_eq!(no_copy.header(), Some("Local"));
    }

    #[test]
    fn test_loaded_header_is_kept() {
        let store =
            ManagedStore::from_text("# Keep me\n\nk: 1\n", FileType::Yaml, StoreOptions::default())
                .unwrap();
        assert_eq!(store.header(), Some("Keep me"));
        assert_eq!(store.save_to_text().unwrap(), "# Keep me\n\nk: 1\n");
    }

    #[test]
    fn test_invalid_options_rejected_at_build() {
        assert!(ManagedStore::new(FileType::Yaml, StoreOptions::default().with_indent(1)).is_err());
    }

    #[test]
    fn test_save_without_file() {
        let store = ManagedStore::default();
        assert!(matches!(store.save(), Err(ConfigError::NoFile)));
        assert!(store.auto_save().is_ok());
    }
}
