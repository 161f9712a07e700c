//! YAML text format.
//!
//! Parsing goes through `serde_yaml::Value` so that non-string keys and
//! tagged values can be folded into the tree shape. Emitting is done by
//! hand so the indent width is configurable; scalars are rendered by
//! `serde_yaml` to get its quoting rules, falling back to JSON-style
//! double quotes for anything that would need a block scalar.

use crate::error::{ConfigError, Result};
use crate::node::{ConfigMap, ConfigNode};
use serde_yaml::Value as YamlValue;

/// Parse YAML text into a mapping root.
///
/// Blank input, or input holding nothing but comments, yields an empty
/// mapping.
pub fn parse(text: &str) -> Result<ConfigNode> {
    if text.trim().is_empty() {
        return Ok(ConfigNode::Object(ConfigMap::new()));
    }
    let value: YamlValue = serde_yaml::from_str(text).map_err(ConfigError::ParseYaml)?;
    match from_yaml(value) {
        ConfigNode::Null => Ok(ConfigNode::Object(ConfigMap::new())),
        node @ ConfigNode::Object(_) => Ok(node),
        _ => Err(ConfigError::RootNotMapping { format: "YAML" }),
    }
}

/// Leading comment block of a YAML document, without the `#` markers.
///
/// The block only counts as a header when a blank line (or the end of the
/// text) follows it, the way [`emit`] writes one. Comments directly above
/// the first key belong to the document.
pub fn extract_header(text: &str) -> Option<String> {
    let lines: Vec<&str> = text
        .lines()
        .take_while(|line| line.starts_with('#'))
        .map(|line| {
            let body = &line[1..];
            body.strip_prefix(' ').unwrap_or(body)
        })
        .collect();
    if lines.is_empty() {
        return None;
    }
    let separated = text
        .lines()
        .nth(lines.len())
        .is_none_or(|next| next.trim().is_empty());
    separated.then(|| lines.join("\n"))
}

/// Render a mapping root as YAML with `indent` spaces per nesting level.
pub fn emit(root: &ConfigNode, header: Option<&str>, indent: usize) -> Result<String> {
    let mut out = String::new();
    if let Some(header) = header.filter(|h| !h.is_empty()) {
        for line in header.lines() {
            if line.is_empty() {
                out.push_str("#\n");
            } else {
                out.push_str("# ");
                out.push_str(line);
                out.push('\n');
            }
        }
        out.push('\n');
    }
    match root {
        ConfigNode::Object(map) => write_mapping(&mut out, map, 0, indent)?,
        other => {
            out.push_str(&render_scalar(other)?);
            out.push('\n');
        }
    }
    Ok(out)
}

fn write_mapping(out: &mut String, map: &ConfigMap, pad: usize, indent: usize) -> Result<()> {
    for (key, value) in map {
        push_pad(out, pad);
        out.push_str(&render_string(key)?);
        out.push(':');
        match value {
            ConfigNode::Object(child) if !child.is_empty() => {
                out.push('\n');
                write_mapping(out, child, pad + indent, indent)?;
            }
            ConfigNode::Array(items) if !items.is_empty() => {
                out.push('\n');
                write_sequence(out, items, pad + indent, indent)?;
            }
            scalar => {
                out.push(' ');
                out.push_str(&render_scalar(scalar)?);
                out.push('\n');
            }
        }
    }
    Ok(())
}

fn write_sequence(out: &mut String, items: &[ConfigNode], pad: usize, indent: usize) -> Result<()> {
    for item in items {
        // Collections inside a sequence are rendered two columns in and the
        // first line is then re-prefixed with the dash.
        let mut block = String::new();
        match item {
            ConfigNode::Object(child) if !child.is_empty() => {
                write_mapping(&mut block, child, pad + 2, indent)?;
            }
            ConfigNode::Array(nested) if !nested.is_empty() => {
                write_sequence(&mut block, nested, pad + 2, indent)?;
            }
            scalar => {
                push_pad(out, pad);
                out.push_str("- ");
                out.push_str(&render_scalar(scalar)?);
                out.push('\n');
                continue;
            }
        }
        push_pad(out, pad);
        out.push_str("- ");
        out.push_str(&block[pad + 2..]);
    }
    Ok(())
}

fn render_scalar(node: &ConfigNode) -> Result<String> {
    Ok(match node {
        ConfigNode::Null => "null".to_string(),
        ConfigNode::Bool(b) => b.to_string(),
        ConfigNode::Number(n) => n.to_string(),
        ConfigNode::String(s) => render_string(s)?,
        ConfigNode::Array(_) => "[]".to_string(),
        ConfigNode::Object(_) => "{}".to_string(),
    })
}

fn render_string(s: &str) -> Result<String> {
    let rendered = serde_yaml::to_string(s).map_err(|e| ConfigError::Serialize(e.to_string()))?;
    let rendered = rendered.strip_suffix('\n').unwrap_or(&rendered);
    if rendered.contains('\n') {
        serde_json::to_string(s).map_err(|e| ConfigError::Serialize(e.to_string()))
    } else {
        Ok(rendered.to_string())
    }
}

fn push_pad(out: &mut String, pad: usize) {
    out.extend(std::iter::repeat_n(' ', pad));
}

fn from_yaml(value: YamlValue) -> ConfigNode {
    match value {
        YamlValue::Null => ConfigNode::Null,
        YamlValue::Bool(b) => ConfigNode::Bool(b),
        YamlValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                ConfigNode::from(i)
            } else if let Some(u) = n.as_u64() {
                ConfigNode::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(ConfigNode::Number)
                    .unwrap_or_else(|| ConfigNode::String(n.to_string()))
            }
        }
        YamlValue::String(s) => ConfigNode::String(s),
        YamlValue::Sequence(items) => ConfigNode::Array(items.into_iter().map(from_yaml).collect()),
        YamlValue::Mapping(mapping) => ConfigNode::Object(
            mapping
                .into_iter()
                .map(|(key, value)| (yaml_key(key), from_yaml(value)))
                .collect(),
        ),
        YamlValue::Tagged(tagged) => from_yaml(tagged.value),
    }
}

fn yaml_key(key: YamlValue) -> String {
    match key {
        YamlValue::String(s) => s,
        YamlValue::Null => "null".to_string(),
        YamlValue::Bool(b) => b.to_string(),
        YamlValue::Number(n) => n.to_string(),
        YamlValue::Tagged(tagged) => yaml_key(tagged.value),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}
