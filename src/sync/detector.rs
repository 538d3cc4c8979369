//! Conflict detection
//!
//! Compares a local and a remote snapshot of the same record and, when at
//! least one shared field disagrees, registers a `ConflictInfo`.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::classify::{classify, is_auto_resolvable};
use super::diff::conflicting_fields;
use super::registry::ConflictRegistry;
use super::types::{ConflictInfo, ConflictType, VersionedData};
use crate::config::DEFAULT_METADATA_FIELDS;
use crate::error::{EngineError, Result};

/// Detects conflicts and records them in a registry
#[derive(Clone)]
pub struct ConflictDetector {
    registry: ConflictRegistry,
    /// Keys that never count as conflicting fields
    metadata_fields: Arc<[String]>,
}

impl ConflictDetector {
    /// Create a detector ignoring the default metadata keys
    pub fn new(registry: ConflictRegistry) -> Self {
        Self::with_metadata_fields(
            registry,
            DEFAULT_METADATA_FIELDS.iter().map(|f| f.to_string()).collect(),
        )
    }

    /// Create a detector ignoring a custom set of metadata keys
    pub fn with_metadata_fields(registry: ConflictRegistry, metadata_fields: Vec<String>) -> Self {
        Self {
            registry,
            metadata_fields: metadata_fields.into(),
        }
    }

    /// Compare two snapshots, inferring the conflict type from field names.
    ///
    /// Returns `Ok(None)` when every shared content field is equal, whatever
    /// the version metadata says.
    pub fn compare_versions(
        &self,
        local: &VersionedData,
        remote: &VersionedData,
    ) -> Result<Option<ConflictInfo>> {
        self.detect(local, remote, None)
    }

    /// Compare two snapshots whose category the producer already knows
    pub fn compare_versions_as(
        &self,
        local: &VersionedData,
        remote: &VersionedData,
        conflict_type: ConflictType,
    ) -> Result<Option<ConflictInfo>> {
        self.detect(local, remote, Some(conflict_type))
    }

    fn detect(
        &self,
        local: &VersionedData,
        remote: &VersionedData,
        explicit_type: Option<ConflictType>,
    ) -> Result<Option<ConflictInfo>> {
        if local.id != remote.id {
            tracing::warn!(
                local_id = %local.id,
                remote_id = %remote.id,
                "Refusing to compare snapshots of different records"
            );
            return Err(EngineError::IdMismatch {
                local: local.id.clone(),
                remote: remote.id.clone(),
            });
        }

        let fields = conflicting_fields(&local.data, &remote.data, &self.metadata_fields[..]);
        if fields.is_empty() {
            tracing::debug!(
                record_id = %local.id,
                local_version = local.version,
                remote_version = remote.version,
                "Snapshots agree, no conflict"
            );
            return Ok(None);
        }

        let conflict_type =
            explicit_type.unwrap_or_else(|| classify(&local.data, &remote.data));

        let conflict = ConflictInfo {
            id: local.id.clone(),
            detection_id: Uuid::new_v4(),
            conflict_type,
            local_version: local.clone(),
            remote_version: remote.clone(),
            conflict_fields: fields,
            auto_resolvable: is_auto_resolvable(conflict_type),
            detected_at: Utc::now(),
        };

        self.registry.register(conflict.clone());

        Ok(Some(conflict))
    }
}
