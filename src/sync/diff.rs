//! Field-level diffing between two snapshots of one record

use super::types::FieldMap;

/// Fields present on both sides whose values differ.
///
/// Ordered by the local map's field order. Keys listed in `ignored` never
/// appear, and neither do keys present on only one side.
pub fn conflicting_fields<S: AsRef<str>>(
    local: &FieldMap,
    remote: &FieldMap,
    ignored: &[S],
) -> Vec<String> {
    local
        .iter()
        .filter(|(key, _)| !ignored.iter().any(|i| i.as_ref() == key.as_str()))
        .filter_map(|(key, local_value)| match remote.get(key) {
            // serde_json::Value equality is structural, and object equality
            // ignores key order
            Some(remote_value) if remote_value != local_value => Some(key.clone()),
            _ => None,
        })
        .collect()
}

/// Union of field names, local order first then remote-only keys
pub fn field_union<'a>(local: &'a FieldMap, remote: &'a FieldMap) -> Vec<&'a str> {
    local
        .keys()
        .chain(remote.keys().filter(|k| !local.contains_key(k.as_str())))
        .map(String::as_str)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    const METADATA: &[&str] = &["_id", "id", "version", "lastModified", "modifiedBy"];

    fn fields(value: Value) -> FieldMap {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_identical_content_has_no_conflicts() {
        let local = fields(json!({"text": "Hello", "version": 1, "lastModified": 1000}));
        let remote = fields(json!({"text": "Hello", "version": 2, "lastModified": 2000}));

        assert!(conflicting_fields(&local, &remote, METADATA).is_empty());
    }

    #[test]
    fn test_only_shared_differing_fields() {
        let local = fields(json!({"name": "Alice", "bio": "Local bio", "avatar": "local.jpg"}));
        let remote = fields(json!({"name": "Alice", "bio": "Remote bio", "status": "online"}));

        assert_eq!(conflicting_fields(&local, &remote, METADATA), vec!["bio"]);
    }

    #[test]
    fn test_deep_equality() {
        let local = fields(json!({"tags": ["a", "b"], "meta": {"x": 1, "y": [1, 2]}}));
        let remote = fields(json!({"meta": {"y": [1, 2], "x": 1}, "tags": ["a", "b"]}));
        assert!(conflicting_fields(&local, &remote, METADATA).is_empty());

        let reordered = fields(json!({"tags": ["b", "a"], "meta": {"x": 1, "y": [1, 2]}}));
        assert_eq!(conflicting_fields(&local, &reordered, METADATA), vec!["tags"]);
    }

    #[test]
    fn test_order_follows_local() {
        let local = fields(json!({"b": 1, "a": 1, "c": 1}));
        let remote = fields(json!({"c": 2, "a": 2, "b": 2}));

        assert_eq!(conflicting_fields(&local, &remote, METADATA), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_null_differs_from_value() {
        let local = fields(json!({"status": null}));
        let remote = fields(json!({"status": "online"}));

        assert_eq!(conflicting_fields(&local, &remote, METADATA), vec!["status"]);
    }

    #[test]
    fn test_field_union() {
        let local = fields(json!({"name": "Alice", "avatar": "local.jpg"}));
        let remote = fields(json!({"status": "online", "name": "Bob"}));

        assert_eq!(field_union(&local, &remote), vec!["name", "avatar", "status"]);
    }
}
