//! Sectioned configuration library.
//!
//! Binds YAML/JSON configuration files to typed values through dotted
//! paths, nested sections, a registry of type conversions and optional
//! per-key variants (for instance one file per locale).

pub mod error;
pub mod linked;
pub mod logging;
pub mod merge;
pub mod node;
pub mod persist;
pub mod provider;
pub mod replaceable;
pub mod resolver;
pub mod section;
pub mod store;

pub use error::{ConfigError, Result};
pub use linked::{LinkedState, LinkedStore, LinkedValue};
pub use node::{ConfigMap, ConfigNode, ConfigPath};
pub use persist::FileType;
pub use provider::{ProviderEntry, ProviderRegistry};
pub use replaceable::Replaceable;
pub use resolver::{FieldDescriptor, Resolution, Resolver, SectionDescriptor};
pub use section::{Section, SectionMut};
pub use store::{ManagedStore, StoreOptions};
