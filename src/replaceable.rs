//! Strings with placeholders.
//!
//! A [`Replaceable`] keeps a message template together with the
//! placeholder tokens it expects at build time and a set of fixed
//! replacements (for instance a plugin prefix). Only the template is
//! stored in the configuration; tokens and fixed replacements live in
//! code and are carried over from the field's current value on load.

use crate::node::ConfigNode;
use crate::provider::{ProviderEntry, string_of};
use regex_lite::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"%[A-Za-z0-9_]+%").expect("placeholder pattern is valid")
});

/// A template string with placeholder tokens and fixed replacements.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Replaceable {
    value: String,
    placeholders: Vec<String>,
    replacements: BTreeMap<String, String>,
}

impl Replaceable {
    pub fn of(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..Self::default()
        }
    }

    /// Declare tokens that are substituted at build time.
    pub fn placeholders<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for token in tokens {
            let token = token.into();
            if !self.placeholders.contains(&token) {
                self.placeholders.push(token);
            }
        }
        self
    }

    /// Fixed replacement applied on every build.
    pub fn replace(mut self, token: impl Into<String>, with: impl Into<String>) -> Self {
        self.replacements.insert(token.into(), with.into());
        self
    }

    /// Same settings, different template.
    pub fn with_value(&self, value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..self.clone()
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn declared_placeholders(&self) -> &[String] {
        &self.placeholders
    }

    /// Tokens of the form `%name%` found in the template, in order of
    /// first appearance.
    pub fn detect_placeholders(&self) -> Vec<String> {
        let mut found: Vec<String> = Vec::new();
        for m in PLACEHOLDER.find_iter(&self.value) {
            if !found.iter().any(|t| t == m.as_str()) {
                found.push(m.as_str().to_string());
            }
        }
        found
    }

    /// Apply the fixed replacements, then `args` for declared tokens.
    /// Arguments for undeclared tokens are ignored.
    pub fn build(&self, args: &[(&str, &str)]) -> String {
        let mut out = self.value.clone();
        for (token, with) in &self.replacements {
            out = out.replace(token.as_str(), with);
        }
        for (token, with) in args {
            if self.placeholders.iter().any(|t| t == token) {
                out = out.replace(token, with);
            }
        }
        out
    }
}

impl std::fmt::Display for Replaceable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// Provider storing only the template string. On read, placeholders and
/// fixed replacements of the current value are kept.
pub fn provider() -> ProviderEntry<Replaceable> {
    ProviderEntry::with_current(
        |node: &ConfigNode, current: Option<&Replaceable>| {
            let stored = string_of(node)?;
            Some(match current {
                Some(current) => current.with_value(stored),
                None => Replaceable::of(stored),
            })
        },
        |value: &Replaceable| ConfigNode::String(value.value.clone()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_applies_fixed_then_args() {
        let message = Replaceable::of("%prefix% Reload complete! Took %ms%")
            .placeholders(["%ms%"])
            .replace("%prefix%", "[Demo]");
        assert_eq!(message.build(&[("%ms%", "12")]), "[Demo] Reload complete! Took 12");
        assert_eq!(
            message.build(&[("%other%", "x")]),
            "[Demo] Reload complete! Took %ms%"
        );
    }

    #[test]
    fn test_detect_placeholders() {
        let message = Replaceable::of("%a% and %b_2% and %a% but not % c %");
        assert_eq!(message.detect_placeholders(), ["%a%", "%b_2%"]);
    }

    #[test]
    fn test_provider_keeps_current_settings() {
        let entry = provider();
        let current = Replaceable::of("default %player%").placeholders(["%player%"]);
        let loaded = entry.get(&json!("hello %player%"), Some(&current)).unwrap();
        assert_eq!(loaded.value(), "hello %player%");
        assert_eq!(loaded.build(&[("%player%", "portlek")]), "hello portlek");
        assert_eq!(entry.set(&loaded), json!("hello %player%"));
        assert_eq!(entry.get(&json!([1]), Some(&current)), None);
    }
}
