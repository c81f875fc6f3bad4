// Ordered deep merge over JSON maps.
// Layers are applied left to right and the last writer wins per key. When both
// sides hold an object under the same key the two objects are merged key by key;
// any other value (arrays included) replaces what was there.

use serde_json::{Map, Value};

/// Merge `layers` in order into a fresh map.
#[must_use]
pub fn merge_layers<'a, I>(layers: I) -> Map<String, Value>
where
    I: IntoIterator<Item = &'a Map<String, Value>>,
{
    let mut out = Map::new();
    for layer in layers {
        merge_into(&mut out, layer);
    }
    out
}

/// Deep-merge `layer` into `target`.
pub fn merge_into(target: &mut Map<String, Value>, layer: &Map<String, Value>) {
    for (key, incoming) in layer {
        match (target.get_mut(key), incoming) {
            (Some(Value::Object(existing)), Value::Object(nested)) => {
                merge_into(existing, nested);
            }
            _ => {
                target.insert(key.clone(), incoming.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_later_layer_wins() {
        let a = obj(json!({"foo": 0, "bar": 2}));
        let b = obj(json!({"foo": 1}));
        let merged = merge_layers([&a, &b]);
        assert_eq!(Value::Object(merged), json!({"foo": 1, "bar": 2}));
    }

    #[test]
    fn test_nested_objects_merge_field_by_field() {
        let a = obj(json!({"status": {"code": 200, "message": "OK"}}));
        let b = obj(json!({"status": {"description": "custom"}}));
        let merged = merge_layers([&a, &b]);
        assert_eq!(
            Value::Object(merged),
            json!({"status": {"code": 200, "message": "OK", "description": "custom"}})
        );
    }

    #[test]
    fn test_scalar_replaces_object_and_object_replaces_scalar() {
        let a = obj(json!({"x": {"y": 1}, "z": 3}));
        let b = obj(json!({"x": 5, "z": {"w": 1}}));
        let merged = merge_layers([&a, &b]);
        assert_eq!(Value::Object(merged), json!({"x": 5, "z": {"w": 1}}));
    }

    #[test]
    fn test_arrays_are_replaced() {
        let a = obj(json!({"tags": [1, 2, 3]}));
        let b = obj(json!({"tags": [9]}));
        let merged = merge_layers([&a, &b]);
        assert_eq!(Value::Object(merged), json!({"tags": [9]}));
    }

    #[test]
    fn test_null_overwrites() {
        let a = obj(json!({"error": "boom"}));
        let b = obj(json!({"error": null}));
        let merged = merge_layers([&a, &b]);
        assert_eq!(Value::Object(merged), json!({"error": null}));
    }

    #[test]
    fn test_no_layers_is_empty() {
        let merged = merge_layers(std::iter::empty::<&Map<String, Value>>());
        assert!(merged.is_empty());
    }

    proptest! {
        #[test]
        fn prop_last_flat_layer_wins(
            a in proptest::collection::btree_map("[a-e]", any::<i32>(), 0..5),
            b in proptest::collection::btree_map("[a-e]", any::<i32>(), 0..5),
        ) {
            let la: Map<String, Value> = a.iter().map(|(k, v)| (k.clone(), json!(v))).collect();
            let lb: Map<String, Value> = b.iter().map(|(k, v)| (k.clone(), json!(v))).collect();
            let merged = merge_layers([&la, &lb]);
            for (k, v) in &b {
                prop_assert_eq!(merged.get(k), Some(&json!(v)));
            }
            for (k, v) in &a {
                if !b.contains_key(k) {
                    prop_assert_eq!(merged.get(k), Some(&json!(v)));
                }
            }
            prop_assert_eq!(merged.len(), a.keys().chain(b.keys()).collect::<std::collections::BTreeSet<_>>().len());
        }
    }
}
