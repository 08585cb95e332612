// Path operations on a JSON tree.
//
// Empty objects and nulls are never kept in the tree: writing one removes the
// node, and parents left empty by a removal are pruned as well.

use serde_json::{Map, Value};

/// Value at `segments` below `node`, if present.
pub fn get<'a>(node: &'a Value, segments: &[&str]) -> Option<&'a Value> {
    segments
        .iter()
        .try_fold(node, |current, segment| current.as_object()?.get(*segment))
}

/// Value at `segments`, or `Null` when absent.
pub fn get_or_null(node: &Value, segments: &[&str]) -> Value {
    get(node, segments).cloned().unwrap_or(Value::Null)
}

/// Replace the value at `segments`. A null or empty value removes the node.
pub fn set(node: &mut Value, segments: &[&str], value: Value) {
    let value = prune(value);

    let Some((first, rest)) = segments.split_first() else {
        *node = value;
        return;
    };

    if value.is_null() {
        if let Value::Object(map) = node {
            if rest.is_empty() {
                map.remove(*first);
            } else if let Some(child) = map.get_mut(*first) {
                set(child, rest, Value::Null);
                if is_empty(child) {
                    map.remove(*first);
                }
            }
        }
        return;
    }

    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        let child = map.entry(first.to_string()).or_insert(Value::Null);
        set(child, rest, value);
    }
}

/// Set each field relative to `segments`. Field names may be nested paths.
pub fn merge(node: &mut Value, segments: &[&str], fields: Map<String, Value>) {
    for (field, value) in fields {
        let mut path: Vec<&str> = segments.to_vec();
        path.extend(field.split('/').filter(|part| !part.is_empty()));
        set(node, &path, value);
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn prune(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let pruned: Map<String, Value> = map
                .into_iter()
                .map(|(key, child)| (key, prune(child)))
                .filter(|(_, child)| !child.is_null())
                .collect();
            if pruned.is_empty() {
                Value::Null
            } else {
                Value::Object(pruned)
            }
        }
        other => other,
    }
}
