//! Snapshot construction
//!
//! Builds `VersionedData` from raw record content plus provenance.

use chrono::Utc;
use serde_json::Value;

use super::types::{FieldMap, Origin, VersionedData};

/// Key a record may use to carry its own version counter
pub const VERSION_FIELD: &str = "version";

/// Key a record may use to carry its own modification time (epoch ms)
pub const LAST_MODIFIED_FIELD: &str = "lastModified";

/// Build a snapshot, honoring `version`/`lastModified` carried in `data`.
///
/// Missing or non-numeric values fall back to version `1` and the current
/// time.
pub fn create_versioned_data(
    id: impl Into<String>,
    data: FieldMap,
    modified_by: impl Into<String>,
    origin: Origin,
) -> VersionedData {
    let version = data
        .get(VERSION_FIELD)
        .and_then(as_version)
        .filter(|v| *v > 0)
        .unwrap_or(1);

    let last_modified = data
        .get(LAST_MODIFIED_FIELD)
        .and_then(as_epoch_millis)
        .unwrap_or_else(|| Utc::now().timestamp_millis());

    VersionedData {
        id: id.into(),
        data,
        version,
        last_modified,
        modified_by: modified_by.into(),
        origin,
    }
}

impl VersionedData {
    /// Shorthand for [`create_versioned_data`]
    pub fn new(
        id: impl Into<String>,
        data: FieldMap,
        modified_by: impl Into<String>,
        origin: Origin,
    ) -> Self {
        create_versioned_data(id, data, modified_by, origin)
    }

    /// Local snapshot of `data`
    pub fn local(id: impl Into<String>, data: FieldMap, modified_by: impl Into<String>) -> Self {
        create_versioned_data(id, data, modified_by, Origin::Local)
    }

    /// Remote snapshot of `data`
    pub fn remote(id: impl Into<String>, data: FieldMap, modified_by: impl Into<String>) -> Self {
        create_versioned_data(id, data, modified_by, Origin::Remote)
    }
}

/// Integer version, also accepting whole floats such as `2.0`
fn as_version(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && *f >= 1.0 && *f <= u64::MAX as f64)
            .map(|f| f as u64)
    })
}

fn as_epoch_millis(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64))
        .filter(|ms| *ms > 0)
}
