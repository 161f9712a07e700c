//! Default-filling merge for configuration trees.
//!
//! Used when defaults are copied into a primary store in bulk. Values
//! already present in the primary tree always win; defaults only fill
//! holes.

use crate::node::ConfigNode;

/// Fill keys missing from `target` with the corresponding values of `defaults`.
///
/// - Mappings are merged recursively: keys already in `target` keep their
///   value and position, missing keys are appended in the defaults' order
/// - Sequences and scalars in `target` are never touched
/// - A `null` in `target` counts as present
///
/// Returns the number of leaf or subtree values that were copied.
///
/// # Example
/// ```
/// use serde_json::json;
/// use sectioned_config::merge::fill_missing;
///
/// let mut target = json!({ "server": { "port": 9000 } });
/// let defaults = json!({ "server": { "port": 8080, "host": "localhost" }, "debug": false });
/// fill_missing(&mut target, &defaults);
/// assert_eq!(target, json!({ "server": { "port": 9000, "host": "localhost" }, "debug": false }));
/// ```
pub fn fill_missing(target: &mut ConfigNode, defaults: &ConfigNode) -> usize {
    let (Some(target_map), Some(default_map)) = (target.as_object_mut(), defaults.as_object())
    else {
        return 0;
    };

    let mut copied = 0;
    for (key, default_value) in default_map {
        match target_map.get_mut(key) {
            Some(existing) if existing.is_object() => {
                copied += fill_missing(existing, default_value);
            }
            Some(_) => {}
            None => {
                target_map.insert(key.clone(), default_value.clone());
                copied += 1;
            }
        }
    }
    copied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::keys;
    use serde_json::json;

    #[test]
    fn test_fill_simple_objects() {
        let mut target = json!({"a": 1, "b": 2});
        let copied = fill_missing(&mut target, &json!({"b": 3, "c": 4}));
        assert_eq!(copied, 1);
        assert_eq!(target, json!({"a": 1, "b": 2, "c": 4}));
    }

    #[test]
    fn test_fill_nested_objects() {
        let mut target = json!({"server": {"port": 9000}});
        fill_missing(
            &mut target,
            &json!({"server": {"host": "localhost", "port": 8080}, "debug": true}),
        );
        assert_eq!(
            target,
            json!({"server": {"port": 9000, "host": "localhost"}, "debug": true})
        );
    }

    #[test]
    fn test_existing_order_kept_and_defaults_appended() {
        let mut target = json!({"z": 1, "a": 2});
        fill_missing(&mut target, &json!({"m": 0, "a": 9, "b": 3}));
        assert_eq!(keys(&target, false, '.'), ["z", "a", "m", "b"]);
    }

    #[test]
    fn test_arrays_and_nulls_are_not_filled() {
        let mut target = json!({"items": [1], "gone": null});
        let copied = fill_missing(&mut target, &json!({"items": [4, 5], "gone": 7}));
        assert_eq!(copied, 0);
        assert_eq!(target, json!({"items": [1], "gone": null}));
    }

    #[test]
    fn test_scalar_target_not_replaced_by_default_object() {
        let mut target = json!({"value": 42});
        fill_missing(&mut target, &json!({"value": {"nested": true}}));
        assert_eq!(target, json!({"value": 42}));
    }
}
