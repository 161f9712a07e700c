//! Linked stores: one store per variant key, picked at access time.
//!
//! Typical use is one file per locale (`en.yml`, `tr.yml`, ...) with a
//! selector returning the current locale. Every variant is loaded up
//! front; the selector is re-evaluated on each access, and a key without
//! a store yields `None` instead of failing.

use crate::error::Result;
use crate::persist::FileType;
use crate::resolver::{FieldDescriptor, Resolution, Resolver};
use crate::store::{ManagedStore, StoreOptions};
use anyhow::Context;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Returns the key of the variant to use right now.
pub type Selector = Arc<dyn Fn() -> String + Send + Sync>;

/// Where the selector currently points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkedState {
    /// Variants are still being loaded.
    Uninitialized,
    /// The selector names a loaded variant.
    Active(String),
    /// The selector names a key with no store.
    Missing(String),
}

/// A set of alternate stores selected by key.
pub struct LinkedStore {
    variants: BTreeMap<String, ManagedStore>,
    selector: Selector,
    ready: bool,
}

impl std::fmt::Debug for LinkedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkedStore")
            .field("variants", &self.variants.keys().collect::<Vec<_>>())
            .field("ready", &self.ready)
            .finish()
    }
}

impl LinkedStore {
    /// Empty set; add variants with [`Self::insert`] then call [`Self::finish_loading`].
    pub fn new(selector: impl Fn() -> String + Send + Sync + 'static) -> Self {
        Self {
            variants: BTreeMap::new(),
            selector: Arc::new(selector),
            ready: false,
        }
    }

    /// Load `<dir>/<key><suffix>` for every key. Missing files start empty.
    pub fn open_all<I, S>(
        dir: &Path,
        keys: I,
        file_type: FileType,
        options: StoreOptions,
        selector: impl Fn() -> String + Send + Sync + 'static,
    ) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut linked = Self::new(selector);
        for key in keys {
            let key = key.into();
            let path = dir.join(file_type.file_name(&key));
            let store = ManagedStore::open(&path, file_type, options.clone())
                .with_context(|| format!("Failed to load variant '{}' from {}", key, path.display()))?;
            linked.insert(key, store);
        }
        linked.finish_loading();
        info!(dir = %dir.display(), variants = linked.variants.len(), "Loaded linked config");
        Ok(linked)
    }

    /// Add or replace a variant.
    pub fn insert(&mut self, key: impl Into<String>, store: ManagedStore) -> Option<ManagedStore> {
        self.variants.insert(key.into(), store)
    }

    /// Mark every variant as loaded. Until then nothing is active.
    pub fn finish_loading(&mut self) {
        self.ready = true;
    }

    pub fn set_selector(&mut self, selector: impl Fn() -> String + Send + Sync + 'static) {
        self.selector = Arc::new(selector);
    }

    /// Key the selector returns right now.
    pub fn chosen_key(&self) -> String {
        (self.selector)()
    }

    pub fn state(&self) -> LinkedState {
        if !self.ready {
            return LinkedState::Uninitialized;
        }
        let key = self.chosen_key();
        if self.variants.contains_key(&key) {
            LinkedState::Active(key)
        } else {
            LinkedState::Missing(key)
        }
    }

    /// Store for the chosen key, or `None` if it has none.
    pub fn resolve_active(&self) -> Option<&ManagedStore> {
        if !self.ready {
            return None;
        }
        let key = self.chosen_key();
        let store = self.variants.get(&key);
        if store.is_none() {
            debug!(key = %key, "No variant for selected key");
        }
        store
    }

    pub fn resolve_active_mut(&mut self) -> Option<&mut ManagedStore> {
        if !self.ready {
            return None;
        }
        let key = self.chosen_key();
        self.variants.get_mut(&key)
    }

    pub fn variant(&self, key: &str) -> Option<&ManagedStore> {
        self.variants.get(key)
    }

    pub fn variant_mut(&mut self, key: &str) -> Option<&mut ManagedStore> {
        self.variants.get_mut(key)
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<&str> {
        self.variants.keys().map(String::as_str).collect()
    }

    pub fn save_all(&self) -> Result<()> {
        for store in self.variants.values() {
            store.save()?;
        }
        Ok(())
    }

    /// Read one field from the active variant.
    pub fn read_active<T: 'static>(
        &mut self,
        resolver: &Resolver<'_>,
        field: &FieldDescriptor,
        default: Option<T>,
    ) -> Result<Resolution<T>> {
        match self.resolve_active_mut() {
            Some(store) => resolver.read_field(store, field, default),
            None => Ok(Resolution::Absent),
        }
    }

    /// Read one field from every variant.
    ///
    /// `default_for` supplies the per-key default. A variant where the
    /// field is absent keeps its default; without one it is left out.
    pub fn read_each<T: Clone + 'static>(
        &mut self,
        resolver: &Resolver<'_>,
        field: &FieldDescriptor,
        default_for: impl Fn(&str) -> Option<T>,
    ) -> Result<Resolution<LinkedValue<T>>> {
        let mut values = BTreeMap::new();
        for (key, store) in &mut self.variants {
            let default = default_for(key);
            match resolver.read_field(store, field, default.clone())? {
                Resolution::Found(value) => {
                    values.insert(key.clone(), value);
                }
                Resolution::Absent => {
                    if let Some(default) = default {
                        values.insert(key.clone(), default);
                    }
                }
                Resolution::NoProvider { type_name } => {
                    return Ok(Resolution::NoProvider { type_name });
                }
            }
        }
        Ok(Resolution::Found(LinkedValue {
            values,
            selector: Arc::clone(&self.selector),
        }))
    }
}

/// One value per variant key, resolved against the selector on access.
#[derive(Clone)]
pub struct LinkedValue<T> {
    values: BTreeMap<String, T>,
    selector: Selector,
}

impl<T: std::fmt::Debug> std::fmt::Debug for LinkedValue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkedValue")
            .field("values", &self.values)
            .finish()
    }
}

impl<T> LinkedValue<T> {
    /// Value for the currently selected key.
    pub fn current(&self) -> Option<&T> {
        self.values.get(&(self.selector)())
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
