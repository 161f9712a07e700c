//! Field path resolution and typed reads/writes.
//!
//! The layer above describes each bound field with a [`FieldDescriptor`]:
//! its name, an optional explicit path, an optional separator and the
//! chain of enclosing sections. The resolver turns that into a
//! [`ConfigPath`] and moves values between the store and native types
//! through the [`ProviderRegistry`].
//!
//! ## Path rules
//! - Pieces are joined outer section → inner section → field
//! - Each piece is split with the closest enclosing separator override
//!   (its own, else the nearest outer one, else the store's)
//! - The canonical string uses the separator that applies to the field
//! - Two fields resolving to the same path simply overwrite each other

use crate::error::{ConfigError, Result};
use crate::node::{ConfigPath, validate_separator};
use crate::provider::ProviderRegistry;
use crate::store::ManagedStore;
use std::any::type_name;
use tracing::{debug, warn};

/// A section enclosing a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionDescriptor {
    pub path: String,
    pub separator: Option<char>,
}

impl SectionDescriptor {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            separator: None,
        }
    }

    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = Some(separator);
        self
    }
}

/// Where a field lives in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Field name, used as the path when no explicit path is given.
    pub name: String,
    /// Explicit path overriding the name.
    pub path: Option<String>,
    /// Separator override for this field's own path.
    pub separator: Option<char>,
    /// Enclosing sections, outermost first.
    pub sections: Vec<SectionDescriptor>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
            separator: None,
            sections: Vec::new(),
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = Some(separator);
        self
    }

    /// Nest inside one more section (innermost so far).
    pub fn in_section(mut self, section: SectionDescriptor) -> Self {
        self.sections.push(section);
        self
    }

    /// Canonical path of this field under a store using `default_separator`.
    ///
    /// Fails on empty pieces, empty segments or unusable separators; these
    /// are authoring mistakes caught when bindings are built.
    pub fn resolve_path(&self, default_separator: char) -> Result<ConfigPath> {
        let mut separator = validate_separator(default_separator)?;
        let mut segments: Vec<String> = Vec::new();

        for section in &self.sections {
            if let Some(own) = section.separator {
                separator = validate_separator(own)?;
            }
            segments.extend(ConfigPath::parse(&section.path, separator)?.segments().iter().cloned());
        }

        if let Some(own) = self.separator {
            separator = validate_separator(own)?;
        }
        let own_path = self.path.as_deref().unwrap_or(&self.name);
        if own_path.is_empty() {
            return Err(ConfigError::invalid_path(own_path, "field has no name or path"));
        }
        segments.extend(ConfigPath::parse(own_path, separator)?.segments().iter().cloned());

        ConfigPath::from_segments(segments, separator)
    }
}

/// Outcome of a typed read or write.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<T> {
    /// The value was read (or written).
    Found(T),
    /// Nothing usable at the path: missing, or stored with the wrong shape.
    Absent,
    /// No conversion is registered for the requested type.
    NoProvider { type_name: &'static str },
}

impl<T> Resolution<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found(_))
    }

    pub fn is_no_provider(&self) -> bool {
        matches!(self, Resolution::NoProvider { .. })
    }

    pub fn found(self) -> Option<T> {
        match self {
            Resolution::Found(value) => Some(value),
            _ => None,
        }
    }

    pub fn unwrap_or(self, default: T) -> T {
        self.found().unwrap_or(default)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Resolution<U> {
        match self {
            Resolution::Found(value) => Resolution::Found(f(value)),
            Resolution::Absent => Resolution::Absent,
            Resolution::NoProvider { type_name } => Resolution::NoProvider { type_name },
        }
    }
}

/// Typed access to stores through a provider registry.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'r> {
    registry: &'r ProviderRegistry,
}

impl<'r> Resolver<'r> {
    pub fn new(registry: &'r ProviderRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'r ProviderRegistry {
        self.registry
    }

    /// Read the value at `path` as `T`.
    ///
    /// The store's default overlay applies. When nothing is stored and a
    /// `default` is given, the default is written back if the store has
    /// `copy_defaults` enabled and returned as found; without
    /// `copy_defaults` the result is [`Resolution::Absent`] and the caller
    /// keeps its default.
    pub fn read<T: 'static>(
        &self,
        store: &mut ManagedStore,
        path: &ConfigPath,
        default: Option<T>,
    ) -> Resolution<T> {
        let Some(entry) = self.registry.resolve::<T>() else {
            warn!(path = %path, type_name = type_name::<T>(), "No provider for type");
            return Resolution::NoProvider {
                type_name: type_name::<T>(),
            };
        };

        if let Some(node) = store.get_default_path(path) {
            return match entry.get(&node, default.as_ref()) {
                Some(value) => Resolution::Found(value),
                None => {
                    debug!(path = %path, type_name = entry.type_name(), "Stored value has the wrong shape");
                    Resolution::Absent
                }
            };
        }

        match default {
            Some(default) if store.options().copy_defaults => {
                debug!(path = %path, "Materializing field default");
                store.set_path(path, entry.set(&default));
                Resolution::Found(default)
            }
            _ => Resolution::Absent,
        }
    }

    /// Read a described field. Errors only for a malformed descriptor.
    pub fn read_field<T: 'static>(
        &self,
        store: &mut ManagedStore,
        field: &FieldDescriptor,
        default: Option<T>,
    ) -> Result<Resolution<T>> {
        let path = field.resolve_path(store.separator())?;
        Ok(self.read(store, &path, default))
    }

    /// Convert `value` and store it at `path`, then auto-save if enabled.
    ///
    /// Returns [`Resolution::Found`] on success and
    /// [`Resolution::NoProvider`] without touching the store when `T` has
    /// no conversion. I/O errors come only from auto-save.
    pub fn write<T: 'static>(
        &self,
        store: &mut ManagedStore,
        path: &ConfigPath,
        value: &T,
    ) -> Result<Resolution<()>> {
        let Some(entry) = self.registry.resolve::<T>() else {
            warn!(path = %path, type_name = type_name::<T>(), "No provider for type");
            return Ok(Resolution::NoProvider {
                type_name: type_name::<T>(),
            });
        };
        store.set_path(path, entry.set(value));
        store.auto_save()?;
        Ok(Resolution::Found(()))
    }

    pub fn write_field<T: 'static>(
        &self,
        store: &mut ManagedStore,
        field: &FieldDescriptor,
        value: &T,
    ) -> Result<Resolution<()>> {
        let path = field.resolve_path(store.separator())?;
        self.write(store, &path, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::FileType;
    use crate::store::StoreOptions;
    use serde_json::json;

    #[test]
    fn test_path_from_sections() {
        let field = FieldDescriptor::new("port")
            .in_section(SectionDescriptor::new("saving"))
            .in_section(SectionDescriptor::new("mysql"));
        assert_eq!(field.resolve_path('.').unwrap().to_string(), "saving.mysql.port");
    }

    #[test]
    fn test_explicit_path_and_separator_overrides() {
        let field = FieldDescriptor::new("ignored")
            .with_path("a/b")
            .with_separator('/')
            .in_section(SectionDescriptor::new("outer.inner"));
        let path = field.resolve_path('.').unwrap();
        assert_eq!(path.segments(), ["outer", "inner", "a", "b"]);
        assert_eq!(path.to_string(), "outer/inner/a/b");
    }

    #[test]
    fn test_section_separator_applies_inward() {
        let field = FieldDescriptor::new("x-y")
            .in_section(SectionDescriptor::new("a-b").with_separator('-'))
            .in_section(SectionDescriptor::new("c"));
        let path = field.resolve_path('.').unwrap();
        assert_eq!(path.segments(), ["a", "b", "c", "x", "y"]);
    }

    #[test]
    fn test_malformed_descriptor_fails_fast() {
        assert!(FieldDescriptor::new("").resolve_path('.').is_err());
        assert!(FieldDescriptor::new("a..b").resolve_path('.').is_err());
        assert!(
            FieldDescriptor::new("a")
                .in_section(SectionDescriptor::new(""))
                .resolve_path('.')
                .is_err()
        );
    }

    #[test]
    fn test_read_write_round() {
        let registry = ProviderRegistry::new();
        let resolver = Resolver::new(&registry);
        let mut store = ManagedStore::default();
        let field = FieldDescriptor::new("b").in_section(SectionDescriptor::new("a"));

        assert_eq!(resolver.read_field::<i64>(&mut store, &field, None).unwrap(), Resolution::Absent);
        assert!(resolver.write_field(&mut store, &field, &5i64).unwrap().is_found());
        assert_eq!(
            resolver.read_field::<i64>(&mut store, &field, None).unwrap(),
            Resolution::Found(5)
        );
        assert_eq!(store.root(), &json!({"a": {"b": 5}}));
    }

    #[test]
    fn test_no_provider() {
        struct Opaque;
        let registry = ProviderRegistry::new();
        let resolver = Resolver::new(&registry);
        let mut store = ManagedStore::default();
        let path = store.path("x").unwrap();

        assert!(resolver.read::<Opaque>(&mut store, &path, None).is_no_provider());
        assert!(resolver.write(&mut store, &path, &Opaque).unwrap().is_no_provider());
        assert_eq!(store.root(), &json!({}));
    }

    #[test]
    fn test_wrong_shape_is_absent_and_untouched() {
        let registry = ProviderRegistry::new();
        let resolver = Resolver::new(&registry);
        let mut store = ManagedStore::new(
            FileType::Yaml,
            StoreOptions::default().with_copy_defaults(true),
        )
        .unwrap();
        store.set("count", "many").unwrap();
        let path = store.path("count").unwrap();

        assert_eq!(resolver.read(&mut store, &path, Some(3i32)), Resolution::Absent);
        assert_eq!(store.get("count"), Some(&json!("many")));
    }

    #[test]
    fn test_default_materialized_only_with_copy_defaults() {
        let registry = ProviderRegistry::new();
        let resolver = Resolver::new(&registry);

        let mut plain = ManagedStore::default();
        let path = plain.path("plugin_prefix").unwrap();
        assert_eq!(
            resolver.read(&mut plain, &path, Some("[Demo]".to_string())),
            Resolution::Absent
        );
        assert_eq!(plain.get("plugin_prefix"), None);

        let mut copying = ManagedStore::new(
            FileType::Yaml,
            StoreOptions::default().with_copy_defaults(true),
        )
        .unwrap();
        assert_eq!(
            resolver.read(&mut copying, &path, Some("[Demo]".to_string())),
            Resolution::Found("[Demo]".to_string())
        );
        assert_eq!(copying.get("plugin_prefix"), Some(&json!("[Demo]")));
    }

    #[test]
    fn test_colliding_fields_last_write_wins() {
        let registry = ProviderRegistry::new();
        let resolver = Resolver::new(&registry);
        let mut store = ManagedStore::default();
        let first = FieldDescriptor::new("first").with_path("shared.key");
        let second = FieldDescriptor::new("key").in_section(SectionDescriptor::new("shared"));

        resolver.write_field(&mut store, &first, &"one".to_string()).unwrap();
        resolver.write_field(&mut store, &second, &"two".to_string()).unwrap();
        assert_eq!(store.get("shared.key"), Some(&json!("two")));
    }

    #[test]
    fn test_resolution_helpers() {
        assert_eq!(Resolution::Found(2).map(|v| v * 2).found(), Some(4));
        assert_eq!(Resolution::<i32>::Absent.unwrap_or(7), 7);
        let missing: Resolution<i32> = Resolution::NoProvider { type_name: "x" };
        assert!(missing.map(|v| v + 1).is_no_provider());
    }
}
