//! Section views.
//!
//! A section is a path prefix plus a borrow of the root store. It owns no
//! data, so any number of read views can coexist, and a mutable view can
//! hand out nested mutable views one level at a time.

use crate::error::Result;
use crate::node::{self, ConfigNode, ConfigPath};
use crate::provider::{self, ProviderRegistry};
use crate::store::ManagedStore;

/// Read-only view of a subtree.
#[derive(Debug, Clone)]
pub struct Section<'a> {
    store: &'a ManagedStore,
    path: ConfigPath,
}

/// Mutable view of a subtree.
#[derive(Debug)]
pub struct SectionMut<'a> {
    store: &'a mut ManagedStore,
    path: ConfigPath,
}

impl ManagedStore {
    /// View of the whole tree.
    pub fn root_section(&self) -> Section<'_> {
        Section {
            path: ConfigPath::root(self.separator()),
            store: self,
        }
    }

    /// View of the subtree at `path`. The subtree need not exist yet.
    pub fn section(&self, path: &str) -> Result<Section<'_>> {
        Ok(Section {
            path: self.path(path)?,
            store: self,
        })
    }

    pub fn root_section_mut(&mut self) -> SectionMut<'_> {
        SectionMut {
            path: ConfigPath::root(self.separator()),
            store: self,
        }
    }

    pub fn section_mut(&mut self, path: &str) -> Result<SectionMut<'_>> {
        Ok(SectionMut {
            path: self.path(path)?,
            store: self,
        })
    }
}

impl<'a> Section<'a> {
    /// Absolute path of this section.
    pub fn path(&self) -> &ConfigPath {
        &self.path
    }

    /// Last segment of the path, empty for the root.
    pub fn name(&self) -> &str {
        self.path.last().unwrap_or("")
    }

    pub fn store(&self) -> &'a ManagedStore {
        self.store
    }

    /// The node this section points at, if it exists.
    pub fn node(&self) -> Option<&'a ConfigNode> {
        self.store.get_path(&self.path)
    }

    /// Absolute path of `relative` inside this section.
    pub fn resolve(&self, relative: &str) -> Result<ConfigPath> {
        self.path.child(relative)
    }

    pub fn get(&self, relative: &str) -> Option<&'a ConfigNode> {
        let path = self.resolve(relative).ok()?;
        self.store.get_path(&path)
    }

    pub fn contains(&self, relative: &str) -> bool {
        self.get(relative).is_some()
    }

    /// Nested view.
    pub fn section(&self, relative: &str) -> Result<Section<'a>> {
        Ok(Section {
            store: self.store,
            path: self.resolve(relative)?,
        })
    }

    /// Keys under this section, relative to it.
    pub fn keys(&self, deep: bool) -> Vec<String> {
        self.node()
            .map(|n| node::keys(n, deep, self.store.separator()))
            .unwrap_or_default()
    }

    pub fn get_string(&self, relative: &str) -> Option<String> {
        self.get(relative).and_then(provider::string_of)
    }

    pub fn get_i64(&self, relative: &str) -> Option<i64> {
        self.get(relative)?.as_i64()
    }

    pub fn get_f64(&self, relative: &str) -> Option<f64> {
        self.get(relative)?.as_f64()
    }

    pub fn get_bool(&self, relative: &str) -> Option<bool> {
        self.get(relative)?.as_bool()
    }

    pub fn get_string_list(&self, relative: &str) -> Option<Vec<String>> {
        self.get(relative)?
            .as_array()?
            .iter()
            .map(provider::string_of)
            .collect()
    }

    /// Typed lookup through the registry's conversion for `T`.
    pub fn get_as<T: 'static>(&self, registry: &ProviderRegistry, relative: &str) -> Option<T> {
        let entry = registry.resolve::<T>()?;
        entry.get(self.get(relative)?, None)
    }
}

impl<'a> SectionMut<'a> {
    pub fn path(&self) -> &ConfigPath {
        &self.path
    }

    pub fn resolve(&self, relative: &str) -> Result<ConfigPath> {
        self.path.child(relative)
    }

    /// Read-only view of the same subtree.
    pub fn as_section(&self) -> Section<'_> {
        Section {
            store: &*self.store,
            path: self.path.clone(),
        }
    }

    pub fn get(&self, relative: &str) -> Option<&ConfigNode> {
        let path = self.resolve(relative).ok()?;
        self.store.get_path(&path)
    }

    pub fn set(&mut self, relative: &str, value: impl Into<ConfigNode>) -> Result<()> {
        let path = self.resolve(relative)?;
        self.store.set_path(&path, value);
        Ok(())
    }

    /// Lookup with the store's default overlay applied.
    pub fn get_default(&mut self, relative: &str) -> Option<ConfigNode> {
        let path = self.resolve(relative).ok()?;
        self.store.get_default_path(&path)
    }

    pub fn remove(&mut self, relative: &str) -> Option<ConfigNode> {
        let path = self.resolve(relative).ok()?;
        self.store.remove_path(&path)
    }

    /// Nested mutable view, reborrowing this one.
    pub fn section_mut(&mut self, relative: &str) -> Result<SectionMut<'_>> {
        let path = self.resolve(relative)?;
        Ok(SectionMut {
            store: self.store,
            path,
        })
    }

    /// Typed write through the registry's conversion for `T`.
    /// Returns false when no conversion exists.
    pub fn set_as<T: 'static>(
        &mut self,
        registry: &ProviderRegistry,
        relative: &str,
        value: &T,
    ) -> Result<bool> {
        let Some(entry) = registry.resolve::<T>() else {
            return Ok(false);
        };
        self.set(relative, entry.set(value))?;
        Ok(true)
    }
}
