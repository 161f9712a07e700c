//! Type provider registry.
//!
//! Maps a Rust type to a pair of conversions between that type and a
//! [`ConfigNode`]. Built-in conversions for strings, numbers, booleans,
//! lists, string sets and raw nodes exist from construction and can
//! never be replaced; everything else is registered by the host, with a
//! later registration for the same type shadowing the earlier one.
//!
//! Lookup is by exact [`TypeId`]. There is no fallback through traits or
//! wrappers, so `Vec<i64>` and `Vec<i32>` are separate entries.
//!
//! ## Concurrency
//! The registry itself is plain data. [`global`] wraps a process-wide
//! instance in a `RwLock`; register everything before the first load and
//! only take read locks afterwards.

use crate::error::{ConfigError, Result};
use crate::node::{ConfigMap, ConfigNode};
use crate::replaceable;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::any::{Any, TypeId, type_name};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, LazyLock, RwLock};
use tracing::{debug, warn};

type GetFn<T> = dyn Fn(&ConfigNode, Option<&T>) -> Option<T> + Send + Sync;
type SetFn<T> = dyn Fn(&T) -> ConfigNode + Send + Sync;

/// A pair of conversions for one type.
pub struct ProviderEntry<T> {
    type_name: &'static str,
    getter: Arc<GetFn<T>>,
    setter: Arc<SetFn<T>>,
    builtin: bool,
}

impl<T> Clone for ProviderEntry<T> {
    fn clone(&self) -> Self {
        Self {
            type_name: self.type_name,
            getter: Arc::clone(&self.getter),
            setter: Arc::clone(&self.setter),
            builtin: self.builtin,
        }
    }
}

impl<T> std::fmt::Debug for ProviderEntry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderEntry")
            .field("type_name", &self.type_name)
            .field("builtin", &self.builtin)
            .finish()
    }
}

impl<T: 'static> ProviderEntry<T> {
    /// Entry from a node→value and a value→node conversion.
    pub fn new<G, S>(getter: G, setter: S) -> Self
    where
        G: Fn(&ConfigNode) -> Option<T> + Send + Sync + 'static,
        S: Fn(&T) -> ConfigNode + Send + Sync + 'static,
    {
        Self::with_current(move |node, _| getter(node), setter)
    }

    /// Entry whose getter also sees the caller's current value, for types
    /// that carry settings the stored form does not.
    pub fn with_current<G, S>(getter: G, setter: S) -> Self
    where
        G: Fn(&ConfigNode, Option<&T>) -> Option<T> + Send + Sync + 'static,
        S: Fn(&T) -> ConfigNode + Send + Sync + 'static,
    {
        Self {
            type_name: type_name::<T>(),
            getter: Arc::new(getter),
            setter: Arc::new(setter),
            builtin: false,
        }
    }

    /// Stored form → native value. `None` when the node has the wrong shape.
    pub fn get(&self, node: &ConfigNode, current: Option<&T>) -> Option<T> {
        (self.getter)(node, current)
    }

    /// Native value → stored form.
    pub fn set(&self, value: &T) -> ConfigNode {
        (self.setter)(value)
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is_builtin(&self) -> bool {
        self.builtin
    }

    fn into_builtin(mut self) -> Self {
        self.builtin = true;
        self
    }
}

type Erased = Box<dyn Any + Send + Sync>;

/// Registry of conversions keyed by type.
pub struct ProviderRegistry {
    builtins: HashMap<TypeId, Erased>,
    providers: HashMap<TypeId, Erased>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("builtins", &self.builtins.len())
            .field("providers", &self.providers.len())
            .finish()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderRegistry {
    /// Registry holding the built-in conversions and the default
    /// [`crate::replaceable::Replaceable`] provider.
    pub fn new() -> Self {
        let mut registry = Self::builtins_only();
        registry
            .providers
            .insert(TypeId::of::<replaceable::Replaceable>(), Box::new(replaceable::provider()));
        registry
    }

    /// Registry with the built-in conversions only.
    pub fn builtins_only() -> Self {
        let mut registry = Self {
            builtins: HashMap::new(),
            providers: HashMap::new(),
        };
        registry.install_builtins();
        registry
    }

    /// Register conversions for `T`, replacing an earlier registration.
    ///
    /// Fails for types that have a built-in conversion.
    pub fn register<T: 'static>(&mut self, entry: ProviderEntry<T>) -> Result<()> {
        let id = TypeId::of::<T>();
        if self.builtins.contains_key(&id) {
            return Err(ConfigError::BuiltinProvider(type_name::<T>()));
        }
        let entry = ProviderEntry {
            builtin: false,
            ..entry
        };
        if self.providers.insert(id, Box::new(entry)).is_some() {
            debug!(type_name = type_name::<T>(), "Provider replaced");
        } else {
            debug!(type_name = type_name::<T>(), "Provider registered");
        }
        Ok(())
    }

    /// Shorthand for [`Self::register`] with plain closures.
    pub fn register_fn<T, G, S>(&mut self, getter: G, setter: S) -> Result<()>
    where
        T: 'static,
        G: Fn(&ConfigNode) -> Option<T> + Send + Sync + 'static,
        S: Fn(&T) -> ConfigNode + Send + Sync + 'static,
    {
        self.register(ProviderEntry::new(getter, setter))
    }

    /// Register a serde-backed conversion, used for nested objects.
    ///
    /// A value that fails to serialize is stored as `null` and logged.
    pub fn register_serde<T>(&mut self) -> Result<()>
    where
        T: Serialize + DeserializeOwned + 'static,
    {
        self.register_fn::<T, _, _>(
            |node| serde_json::from_value(node.clone()).ok(),
            |value| {
                serde_json::to_value(value).unwrap_or_else(|e| {
                    warn!(type_name = type_name::<T>(), error = %e, "Failed to serialize value");
                    ConfigNode::Null
                })
            },
        )
    }

    /// Conversion for `T`: a registered provider, else a built-in one.
    pub fn resolve<T: 'static>(&self) -> Option<ProviderEntry<T>> {
        let id = TypeId::of::<T>();
        self.providers
            .get(&id)
            .or_else(|| self.builtins.get(&id))?
            .downcast_ref::<ProviderEntry<T>>()
            .cloned()
    }

    /// Whether any conversion exists for the given type id.
    pub fn contains(&self, id: TypeId) -> bool {
        self.providers.contains_key(&id) || self.builtins.contains_key(&id)
    }

    pub fn is_builtin(&self, id: TypeId) -> bool {
        self.builtins.contains_key(&id)
    }

    /// Number of host-registered providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    fn builtin<T: 'static>(&mut self, entry: ProviderEntry<T>) {
        self.builtins
            .insert(TypeId::of::<T>(), Box::new(entry.into_builtin()));
    }

    fn install_builtins(&mut self) {
        self.builtin(ProviderEntry::new(string_of, |v: &String| {
            ConfigNode::String(v.clone())
        }));
        self.builtin(ProviderEntry::new(ConfigNode::as_bool, |v: &bool| {
            ConfigNode::Bool(*v)
        }));
        self.builtin(ProviderEntry::new(i32_of, |v: &i32| ConfigNode::from(*v)));
        self.builtin(ProviderEntry::new(ConfigNode::as_i64, |v: &i64| {
            ConfigNode::from(*v)
        }));
        self.builtin(ProviderEntry::new(ConfigNode::as_u64, |v: &u64| {
            ConfigNode::from(*v)
        }));
        self.builtin(ProviderEntry::new(f32_of, |v: &f32| ConfigNode::from(*v)));
        self.builtin(ProviderEntry::new(ConfigNode::as_f64, |v: &f64| {
            ConfigNode::from(*v)
        }));

        self.builtin(list_entry(string_of, |v: &String| ConfigNode::String(v.clone())));
        self.builtin(list_entry(ConfigNode::as_bool, |v: &bool| ConfigNode::Bool(*v)));
        self.builtin(list_entry(i32_of, |v: &i32| ConfigNode::from(*v)));
        self.builtin(list_entry(ConfigNode::as_i64, |v: &i64| ConfigNode::from(*v)));
        self.builtin(list_entry(ConfigNode::as_f64, |v: &f64| ConfigNode::from(*v)));

        self.builtin(ProviderEntry::new(
            |node: &ConfigNode| {
                node.as_array()?
                    .iter()
                    .map(string_of)
                    .collect::<Option<BTreeSet<String>>>()
            },
            |set: &BTreeSet<String>| {
                ConfigNode::Array(set.iter().cloned().map(ConfigNode::String).collect())
            },
        ));

        self.builtin(ProviderEntry::new(
            |node: &ConfigNode| Some(node.clone()),
            |v: &ConfigNode| v.clone(),
        ));
        self.builtin(ProviderEntry::new(
            |node: &ConfigNode| node.as_object().cloned(),
            |v: &ConfigMap| ConfigNode::Object(v.clone()),
        ));
    }
}

fn list_entry<T: 'static>(
    element_of: fn(&ConfigNode) -> Option<T>,
    element_to: fn(&T) -> ConfigNode,
) -> ProviderEntry<Vec<T>> {
    ProviderEntry::new(
        move |node: &ConfigNode| node.as_array()?.iter().map(element_of).collect(),
        move |items: &Vec<T>| ConfigNode::Array(items.iter().map(element_to).collect()),
    )
}

/// String form of a scalar node. Numbers and booleans are stringified;
/// null, sequences and mappings have none.
pub fn string_of(node: &ConfigNode) -> Option<String> {
    match node {
        ConfigNode::String(s) => Some(s.clone()),
        ConfigNode::Number(n) => Some(n.to_string()),
        ConfigNode::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn i32_of(node: &ConfigNode) -> Option<i32> {
    node.as_i64()?.try_into().ok()
}

fn f32_of(node: &ConfigNode) -> Option<f32> {
    node.as_f64().map(|v| v as f32)
}

static GLOBAL: LazyLock<RwLock<ProviderRegistry>> =
    LazyLock::new(|| RwLock::new(ProviderRegistry::new()));

/// Process-wide registry.
///
/// Platform adapters register their types here during start-up, before
/// any store is loaded.
pub fn global() -> &'static RwLock<ProviderRegistry> {
    &GLOBAL
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Location {
        world: String,
        x: f64,
        y: f64,
    }

    #[test]
    fn test_builtin_primitives() {
        let registry = ProviderRegistry::new();
        let int = registry.resolve::<i32>().unwrap();
        assert!(int.is_builtin());
        assert_eq!(int.get(&json!(42), None), Some(42));
        assert_eq!(int.get(&json!(1u64 << 40), None), None);
        assert_eq!(int.get(&json!("42"), None), None);
        assert_eq!(int.set(&7), json!(7));

        let text = registry.resolve::<String>().unwrap();
        assert_eq!(text.get(&json!(true), None).as_deref(), Some("true"));
        assert_eq!(text.get(&json!({"a": 1}), None), None);

        let float = registry.resolve::<f32>().unwrap();
        assert_eq!(float.get(&json!(-1), None), Some(-1.0));
    }

    #[test]
    fn test_builtin_lists_are_strict() {
        let registry = ProviderRegistry::new();
        let ints = registry.resolve::<Vec<i64>>().unwrap();
        assert_eq!(ints.get(&json!([1, 2, 3]), None), Some(vec![1, 2, 3]));
        assert_eq!(ints.get(&json!([1, "two"]), None), None);
        assert_eq!(ints.set(&vec![4, 5]), json!([4, 5]));
    }

    #[test]
    fn test_string_set_is_stored_as_sorted_list() {
        let registry = ProviderRegistry::new();
        let sets = registry.resolve::<BTreeSet<String>>().unwrap();
        let set: BTreeSet<String> = ["b", "a"].into_iter().map(String::from).collect();
        assert_eq!(sets.set(&set), json!(["a", "b"]));
        assert_eq!(sets.get(&json!(["b", "a", "b"]), None), Some(set));
    }

    #[test]
    fn test_unknown_type_has_no_provider() {
        let registry = ProviderRegistry::new();
        assert!(registry.resolve::<Location>().is_none());
        assert!(!registry.contains(TypeId::of::<Location>()));
        assert!(registry.resolve::<Vec<u8>>().is_none());
    }

    #[test]
    fn test_later_registration_shadows_earlier() {
        let mut registry = ProviderRegistry::builtins_only();
        registry
            .register_fn(|_: &ConfigNode| Some(1u8), |v: &u8| json!(*v))
            .unwrap();
        registry
            .register_fn(|_: &ConfigNode| Some(2u8), |v: &u8| json!(*v))
            .unwrap();
        let entry = registry.resolve::<u8>().unwrap();
        assert_eq!(entry.get(&json!(null), None), Some(2));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_builtins_cannot_be_replaced() {
        let mut registry = ProviderRegistry::new();
        let err = registry
            .register_fn(|_: &ConfigNode| Some(0i64), |v: &i64| json!(*v))
            .unwrap_err();
        assert!(matches!(err, ConfigError::BuiltinProvider(_)));
        assert_eq!(registry.resolve::<i64>().unwrap().get(&json!(9), None), Some(9));
    }

    #[test]
    fn test_serde_provider_for_nested_objects() {
        let mut registry = ProviderRegistry::new();
        registry.register_serde::<Location>().unwrap();
        let entry = registry.resolve::<Location>().unwrap();
        let spawn = Location {
            world: "world".into(),
            x: 1.5,
            y: 64.0,
        };
        let node = entry.set(&spawn);
        assert_eq!(node, json!({"world": "world", "x": 1.5, "y": 64.0}));
        assert_eq!(entry.get(&node, None), Some(spawn));
        assert_eq!(entry.get(&json!("nope"), None), None);
    }

    #[test]
    fn test_global_registry_is_shared() {
        #[derive(Debug, PartialEq)]
        struct Marker(u16);
        global()
            .write()
            .unwrap()
            .register_fn(
                |node: &ConfigNode| node.as_u64().map(|v| Marker(v as u16)),
                |m: &Marker| json!(m.0),
            )
            .unwrap();
        let registry = global().read().unwrap();
        assert_eq!(
            registry.resolve::<Marker>().unwrap().get(&json!(3), None),
            Some(Marker(3))
        );
    }
}
