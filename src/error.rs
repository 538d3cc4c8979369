//! Error types for the conflict engine
//!
//! Two families live here:
//! - `ResolutionError`: recoverable resolution failures. These are carried
//!   inside a failed `ResolutionResult`, never returned as `Err`.
//! - `EngineError`: precondition and configuration failures.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Engine-wide result type
pub type Result<T> = std::result::Result<T, EngineError>;

/// Precondition and configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Snapshots describe different records: local '{local}', remote '{remote}'")]
    IdMismatch { local: String, remote: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown conflict type: {0}")]
    InvalidConflictType(String),
}

/// Why a resolution attempt did not produce a resolved value
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail")]
pub enum ResolutionError {
    /// The id is not (or no longer) pending
    #[error("Conflict not found: {0}")]
    ConflictNotFound(String),

    /// `manual` strategy requested without a payload
    #[error("Manual resolution required but no data provided for {0}")]
    MissingManualData(String),

    /// Strategy token outside the fixed set
    #[error("Unknown strategy: {0}")]
    InvalidStrategy(String),
}

impl ResolutionError {
    /// Short name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            ResolutionError::ConflictNotFound(_) => "ConflictNotFound",
            ResolutionError::MissingManualData(_) => "MissingManualData",
            ResolutionError::InvalidStrategy(_) => "InvalidStrategy",
        }
    }
}
