//! Pure operations on a JSON value treated as a hierarchical store tree.
//!
//! The tree follows Firebase conventions: `null` and empty objects are
//! indistinguishable from absence, writing `null` deletes, and deleting the
//! last child of an object removes the object too.

use serde_json::{Map, Value};

use rook_types::{validate_key, StorePath, TypeError};

/// Strip `null` fields and empty objects, validating object keys.
///
/// Returns `Ok(None)` when nothing storable remains.
pub fn normalize(value: Value) -> Result<Option<Value>, TypeError> {
    match value {
        Value::Null => Ok(None),
        Value::Object(fields) => {
            let mut kept = Map::new();
            for (name, child) in fields {
                validate_key(&name)?;
                if let Some(child) = normalize(child)? {
                    kept.insert(name, child);
                }
            }
            if kept.is_empty() {
                Ok(None)
            } else {
                Ok(Some(Value::Object(kept)))
            }
        }
        other => Ok(Some(other)),
    }
}

/// The value at `path`, or `None` if absent.
pub fn get<'a>(root: &'a Value, path: &StorePath) -> Option<&'a Value> {
    let mut node = root;
    for segment in path.segments() {
        node = node.as_object()?.get(segment)?;
    }
    match node {
        Value::Null => None,
        Value::Object(fields) if fields.is_empty() => None,
        value => Some(value),
    }
}

/// Replace the value at `path`. Non-object nodes on the way are replaced
/// by objects; writing `null` deletes.
pub fn set(root: &mut Value, path: &StorePath, value: Value) -> Result<(), TypeError> {
    match normalize(value)? {
        Some(value) => set_at(root, path.segments(), value),
        None => {
            remove(root, path);
        }
    }
    Ok(())
}

/// Merge `fields` into the object at `path`, one child at a time.
///
/// All fields are validated before any is applied.
pub fn merge(
    root: &mut Value,
    path: &StorePath,
    fields: Map<String, Value>,
) -> Result<(), TypeError> {
    let mut changes = Vec::with_capacity(fields.len());
    for (name, value) in fields {
        validate_key(&name)?;
        changes.push((name, normalize(value)?));
    }

    for (name, value) in changes {
        let mut segments = path.segments().to_vec();
        segments.push(name);
        match value {
            Some(value) => set_at(root, &segments, value),
            None => {
                remove_at(root, &segments);
            }
        }
    }
    Ok(())
}

/// Remove the value at `path`, pruning ancestors left empty.
///
/// Returns the removed value, if there was one.
pub fn remove(root: &mut Value, path: &StorePath) -> Option<Value> {
    if path.is_root() {
        let previous = std::mem::replace(root, Value::Object(Map::new()));
        return normalize(previous).ok().flatten();
    }
    remove_at(root, path.segments())
}

fn set_at(node: &mut Value, segments: &[String], value: Value) {
    let Some((first, rest)) = segments.split_first() else {
        *node = value;
        return;
    };
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(fields) = node {
        let child = fields.entry(first.clone()).or_insert(Value::Null);
        set_at(child, rest, value);
    }
}

fn remove_at(node: &mut Value, segments: &[String]) -> Option<Value> {
    let Value::Object(fields) = node else {
        return None;
    };
    let (first, rest) = segments.split_first()?;
    if rest.is_empty() {
        return fields.remove(first);
    }

    let child = fields.get_mut(first)?;
    let removed = remove_at(child, rest);
    let now_empty = child.as_object().is_some_and(Map::is_empty);
    if now_empty {
        fields.remove(first);
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(p: &str) -> StorePath {
        StorePath::parse(p).unwrap()
    }

    fn empty() -> Value {
        Value::Object(Map::new())
    }

    #[test]
    fn set_creates_intermediate_objects() {
        let mut root = empty();
        set(&mut root, &path("users/alice"), json!({"name": "Alice"})).unwrap();
        assert_eq!(root, json!({"users": {"alice": {"name": "Alice"}}}));
        assert_eq!(get(&root, &path("users/alice/name")), Some(&json!("Alice")));
    }

    #[test]
    fn get_missing_is_none() {
        let root = json!({"users": {"alice": {"name": "Alice"}}});
        assert!(get(&root, &path("users/bob")).is_none());
        assert!(get(&root, &path("users/alice/name/deeper")).is_none());
        assert!(get(&empty(), &StorePath::root()).is_none());
    }

    #[test]
    fn set_null_deletes_and_prunes() {
        let mut root = empty();
        set(&mut root, &path("users/alice"), json!({"name": "Alice"})).unwrap();
        set(&mut root, &path("users/alice"), Value::Null).unwrap();
        assert_eq!(root, empty());
    }

    #[test]
    fn set_strips_null_fields() {
        let mut root = empty();
        set(&mut root, &path("u/1"), json!({"name": "A", "email": null})).unwrap();
        assert_eq!(get(&root, &path("u/1")), Some(&json!({"name": "A"})));
    }

    #[test]
    fn set_below_scalar_replaces_it() {
        let mut root = json!({"a": 5});
        set(&mut root, &path("a/b"), json!(1)).unwrap();
        assert_eq!(root, json!({"a": {"b": 1}}));
    }

    #[test]
    fn merge_keeps_unnamed_fields() {
        let mut root = json!({"u": {"1": {"name": "A", "rating": 3}}});
        let mut fields = Map::new();
        fields.insert("name".into(), json!("B"));
        merge(&mut root, &path("u/1"), fields).unwrap();
        assert_eq!(root, json!({"u": {"1": {"name": "B", "rating": 3}}}));
    }

    #[test]
    fn merge_null_removes_field() {
        let mut root = json!({"u": {"1": {"name": "A", "email": "a@x"}}});
        let mut fields = Map::new();
        fields.insert("email".into(), Value::Null);
        merge(&mut root, &path("u/1"), fields).unwrap();
        assert_eq!(root, json!({"u": {"1": {"name": "A"}}}));
    }

    #[test]
    fn remove_returns_previous_and_prunes() {
        let mut root = json!({"u": {"1": {"name": "A"}}, "l": {"x": {"n": 1}}});
        let removed = remove(&mut root, &path("u/1"));
        assert_eq!(removed, Some(json!({"name": "A"})));
        assert_eq!(root, json!({"l": {"x": {"n": 1}}}));
        assert_eq!(remove(&mut root, &path("u/1")), None);
    }

    #[test]
    fn remove_root_clears_everything() {
        let mut root = json!({"u": {"1": {"name": "A"}}});
        assert!(remove(&mut root, &StorePath::root()).is_some());
        assert_eq!(root, empty());
    }

    #[test]
    fn normalize_rejects_invalid_keys() {
        assert!(normalize(json!({"bad.key": 1})).is_err());
        assert_eq!(normalize(json!({"a": {"b": null}})).unwrap(), None);
    }
}
