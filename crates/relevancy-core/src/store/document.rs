// ── JSON tree operations ──
//
// The store's data model is a JSON tree where `null` and empty objects do
// not exist: writing `null` deletes a node, and a parent left with no
// children disappears with it. These helpers apply `put` / `patch`
// semantics to a local copy of that tree.

use serde_json::{Map, Value};

/// Split a slash path (`/cases/boots`) into its non-empty segments.
pub(crate) fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Replace the node at `segments` with `data`. `null` removes it.
pub(crate) fn set_at(root: &mut Value, segments: &[&str], data: Value) {
    let data = prune(data);

    let Some((last, parents)) = segments.split_last() else {
        *root = data;
        return;
    };

    if data.is_null() {
        remove_at(root, segments);
        return;
    }

    let mut node = root;
    for segment in parents {
        node = ensure_object(node)
            .entry((*segment).to_owned())
            .or_insert(Value::Null);
    }
    ensure_object(node).insert((*last).to_owned(), data);
}

/// Merge each child of `data` into the node at `segments`.
///
/// Child keys may themselves be multi-segment paths (`"a/b"`).
pub(crate) fn merge_at(root: &mut Value, segments: &[&str], data: Value) {
    let Value::Object(children) = data else {
        set_at(root, segments, data);
        return;
    };

    for (key, value) in children {
        let mut target = segments.to_vec();
        target.extend(split_path(&key));
        set_at(root, &target, value);
    }
}

fn remove_at(node: &mut Value, segments: &[&str]) {
    let Some((first, rest)) = segments.split_first() else {
        *node = Value::Null;
        return;
    };
    let Some(map) = node.as_object_mut() else {
        return;
    };

    if rest.is_empty() {
        map.remove(*first);
    } else if let Some(child) = map.get_mut(*first) {
        remove_at(child, rest);
        if is_vacant(child) {
            map.remove(*first);
        }
    }

    if map.is_empty() {
        *node = Value::Null;
    }
}

/// Drop `null` children and empty objects, recursively.
fn prune(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let pruned: Map<String, Value> = map
                .into_iter()
                .map(|(k, v)| (k, prune(v)))
                .filter(|(_, v)| !is_vacant(v))
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

fn is_vacant(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn ensure_object(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just replaced with an object"),
    }
}
