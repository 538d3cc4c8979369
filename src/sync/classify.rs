//! Conflict categorisation
//!
//! Infers a conflict's category from the field names of both snapshots.
//! First match wins:
//!
//! 1. `text` -> message
//! 2. `latitude` and `longitude` -> location
//! 3. `name` or `bio` -> profile
//! 4. anything else -> generic
//!
//! Producers that know their record kind should pass it explicitly through
//! `ConflictDetector::compare_versions_as` instead of relying on this.

use super::diff::field_union;
use super::types::{ConflictType, FieldMap};

/// Classify from the union of field names on both sides
pub fn classify(local: &FieldMap, remote: &FieldMap) -> ConflictType {
    let names = field_union(local, remote);
    let has = |field: &str| names.contains(&field);

    if has("text") {
        ConflictType::Message
    } else if has("latitude") && has("longitude") {
        ConflictType::Location
    } else if has("name") || has("bio") {
        ConflictType::Profile
    } else {
        ConflictType::Generic
    }
}

/// Only message conflicts need a human decision
pub fn is_auto_resolvable(conflict_type: ConflictType) -> bool {
    conflict_type != ConflictType::Message
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn fields(value: Value) -> FieldMap {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_precedence() {
        let empty = FieldMap::new();

        let message = fields(json!({"text": "hi", "name": "Alice", "latitude": 1, "longitude": 1}));
        assert_eq!(classify(&message, &empty), ConflictType::Message);

        let location = fields(json!({"latitude": 1, "longitude": 1, "name": "Home"}));
        assert_eq!(classify(&location, &empty), ConflictType::Location);

        let profile = fields(json!({"bio": "hello", "latitude": 1}));
        assert_eq!(classify(&profile, &empty), ConflictType::Profile);

        let status = fields(json!({"status": "online"}));
        assert_eq!(classify(&status, &empty), ConflictType::Generic);
    }

    #[test]
    fn test_uses_both_sides() {
        let local = fields(json!({"latitude": 1}));
        let remote = fields(json!({"longitude": 2}));

        assert_eq!(classify(&local, &remote), ConflictType::Location);
        assert_eq!(classify(&remote, &local), ConflictType::Location);
    }

    #[test]
    fn test_symmetric() {
        let local = fields(json!({"text": "a", "senderId": "user-1"}));
        let remote = fields(json!({"status": "sent"}));

        assert_eq!(classify(&local, &remote), classify(&remote, &local));
    }

    #[test]
    fn test_auto_resolvable_policy() {
        assert!(!is_auto_resolvable(ConflictType::Message));
        assert!(is_auto_resolvable(ConflictType::Location));
        assert!(is_auto_resolvable(ConflictType::Profile));
        assert!(is_auto_resolvable(ConflictType::Generic));
    }
}
