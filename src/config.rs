//! Configuration for the conflict engine

use serde::Deserialize;
use std::env;
use std::str::FromStr;

use crate::error::{EngineError, Result};

/// Default capacity of the conflict event channel
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Record keys that describe a snapshot rather than its content
pub const DEFAULT_METADATA_FIELDS: &[&str] = &["_id", "id", "version", "lastModified", "modifiedBy"];

/// Engine settings. Deserializes from camelCase JSON with every field
/// optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Which side wins when both snapshots share the same `lastModified`
    pub tie_break: TieBreak,
    /// Buffered events per broadcast subscriber before the oldest are dropped
    pub event_capacity: usize,
    /// Keys excluded from field diffing
    pub metadata_fields: Vec<String>,
}

/// Side that wins `latest-wins` on an exact timestamp tie
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TieBreak {
    #[default]
    Local,
    Remote,
}

impl FromStr for TieBreak {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(TieBreak::Local),
            "remote" => Ok(TieBreak::Remote),
            other => Err(EngineError::InvalidConfig(format!(
                "tie break must be 'local' or 'remote', got '{}'",
                other
            ))),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            tie_break: TieBreak::Local,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            metadata_fields: DEFAULT_METADATA_FIELDS
                .iter()
                .map(|f| f.to_string())
                .collect(),
        }
    }
}

impl EngineConfig {
    /// Load from `CONFLICT_*` environment variables, defaulting anything unset
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = EngineConfig::default();

        let tie_break = match lookup("CONFLICT_TIE_BREAK") {
            Some(value) => value.parse()?,
            None => defaults.tie_break,
        };

        let event_capacity = match lookup("CONFLICT_EVENT_CAPACITY") {
            Some(value) => value.trim().parse::<usize>().map_err(|e| {
                EngineError::InvalidConfig(format!("CONFLICT_EVENT_CAPACITY: {}", e))
            })?,
            None => defaults.event_capacity,
        };

        let metadata_fields = match lookup("CONFLICT_METADATA_FIELDS") {
            Some(value) => value
                .split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(String::from)
                .collect(),
            None => defaults.metadata_fields,
        };

        let config = EngineConfig {
            tie_break,
            event_capacity,
            metadata_fields,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the registry cannot run with
    pub fn validate(&self) -> Result<()> {
        // tokio's broadcast channel panics on zero capacity
        if self.event_capacity == 0 {
            return Err(EngineError::InvalidConfig(
                "event capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
