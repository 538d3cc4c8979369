//! Sync conflict data types
//!
//! Defines types for offline/online conflict handling including:
//! - Versioned record snapshots
//! - Detected conflicts and their categories
//! - Resolution strategies and results

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{EngineError, ResolutionError};

/// Open field map holding a record's content
pub type FieldMap = Map<String, Value>;

/// Where a snapshot came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Local,
    Remote,
}

/// A snapshot of one logical record at one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionedData {
    /// Stable identifier shared by local and remote copies
    pub id: String,
    /// Record content
    pub data: FieldMap,
    /// Version counter, informational only
    pub version: u64,
    /// Epoch milliseconds; the ordering signal for `latest-wins`
    pub last_modified: i64,
    /// Actor that produced this snapshot
    pub modified_by: String,
    pub origin: Origin,
}

/// Category of a conflict, driving the auto-resolution policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictType {
    Message,
    Location,
    Profile,
    Generic,
}

impl ConflictType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictType::Message => "message",
            ConflictType::Location => "location",
            ConflictType::Profile => "profile",
            ConflictType::Generic => "generic",
        }
    }
}

impl fmt::Display for ConflictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConflictType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "message" => Ok(ConflictType::Message),
            "location" => Ok(ConflictType::Location),
            "profile" => Ok(ConflictType::Profile),
            "generic" => Ok(ConflictType::Generic),
            _ => Err(EngineError::InvalidConflictType(s.to_string())),
        }
    }
}

/// A disagreement between a local and a remote snapshot of the same record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictInfo {
    /// Record id (same on both snapshots)
    pub id: String,
    /// Unique per detection; a re-detection for the same id gets a new one
    pub detection_id: Uuid,
    #[serde(rename = "type")]
    pub conflict_type: ConflictType,
    pub local_version: VersionedData,
    pub remote_version: VersionedData,
    /// Shared fields whose values differ, in local field order. Never empty.
    pub conflict_fields: Vec<String>,
    pub auto_resolvable: bool,
    pub detected_at: DateTime<Utc>,
}

/// How to resolve a conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionStrategy {
    /// Keep the local snapshot
    LocalWins,
    /// Keep the remote snapshot
    RemoteWins,
    /// Keep the snapshot with the greater `lastModified`
    LatestWins,
    /// Union of both sides, latest-wins per disagreeing field
    Merge,
    /// Caller-supplied value
    Manual,
}

impl ResolutionStrategy {
    pub const ALL: [ResolutionStrategy; 5] = [
        ResolutionStrategy::LocalWins,
        ResolutionStrategy::RemoteWins,
        ResolutionStrategy::LatestWins,
        ResolutionStrategy::Merge,
        ResolutionStrategy::Manual,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionStrategy::LocalWins => "local-wins",
            ResolutionStrategy::RemoteWins => "remote-wins",
            ResolutionStrategy::LatestWins => "latest-wins",
            ResolutionStrategy::Merge => "merge",
            ResolutionStrategy::Manual => "manual",
        }
    }
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResolutionStrategy {
    type Err = ResolutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "local-wins" => Ok(ResolutionStrategy::LocalWins),
            "remote-wins" => Ok(ResolutionStrategy::RemoteWins),
            "latest-wins" => Ok(ResolutionStrategy::LatestWins),
            "merge" => Ok(ResolutionStrategy::Merge),
            "manual" => Ok(ResolutionStrategy::Manual),
            _ => Err(ResolutionError::InvalidStrategy(s.to_string())),
        }
    }
}

/// Outcome of a resolution attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionResult {
    /// Record id the attempt targeted
    pub conflict_id: String,
    pub resolved: bool,
    /// Absent only when the strategy token could not be parsed
    pub strategy: Option<ResolutionStrategy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_data: Option<FieldMap>,
    pub resolved_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ResolutionError>,
}

impl ResolutionResult {
    /// Create a successful resolution result
    pub fn success(
        conflict_id: impl Into<String>,
        strategy: ResolutionStrategy,
        resolved_data: FieldMap,
    ) -> Self {
        Self {
            conflict_id: conflict_id.into(),
            resolved: true,
            strategy: Some(strategy),
            resolved_data: Some(resolved_data),
            resolved_at: Utc::now(),
            error: None,
        }
    }

    /// Create a failed resolution result
    pub fn failure(
        conflict_id: impl Into<String>,
        strategy: Option<ResolutionStrategy>,
        error: ResolutionError,
    ) -> Self {
        Self {
            conflict_id: conflict_id.into(),
            resolved: false,
            strategy,
            resolved_data: None,
            resolved_at: Utc::now(),
            error: Some(error),
        }
    }
}
