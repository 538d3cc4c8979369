//! Conflict Engine Library
//!
//! Detects and resolves disagreements between a client's offline edits and
//! the server's copy of the same record. Everything here is synchronous and
//! in-memory; fetching snapshots and persisting results belong to the caller.
//!
//! # Modules
//!
//! - `sync`: snapshots, diffing, classification, registry, resolution
//! - `engine`: one registry wired to all components
//! - `config`: engine settings, loadable from the environment
//! - `error`: error types

pub mod config;
pub mod engine;
pub mod error;
pub mod sync;

pub use config::{EngineConfig, TieBreak};
pub use engine::ConflictEngine;
pub use error::{EngineError, ResolutionError, Result};
pub use sync::{
    create_versioned_data, ConflictInfo, ConflictListener, ConflictRegistry, ConflictType,
    FieldMap, Origin, ResolutionResult, ResolutionStrategy, Subscription, VersionedData,
};
