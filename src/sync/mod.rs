//! Sync conflict module
//!
//! Provides:
//! - Versioned snapshots of records
//! - Field-level conflict detection
//! - A pending conflict registry with subscriptions
//! - Resolution strategies and an automatic sweep
//!
//! # Flow
//!
//! 1. The sync driver builds local and remote `VersionedData` snapshots
//! 2. `ConflictDetector::compare_versions` diffs them and registers a
//!    `ConflictInfo` if any shared field disagrees
//! 3. Registry subscribers are notified
//! 4. `AutoResolver` or a human-facing caller resolves it through
//!    `ConflictResolver`, which removes it from the registry
//!
//! # Conflict Resolution
//!
//! - Message conflicts wait for a human decision
//! - Everything else may be auto-resolved with latest-wins
//! - Equal timestamps resolve to the local side unless configured otherwise
//! - Merge keeps one-sided fields and applies latest-wins per disagreeing field

mod auto;
mod classify;
mod conflict;
mod detector;
mod diff;
mod registry;
mod snapshot;
mod types;

pub use auto::{AutoResolver, AUTO_STRATEGY};
pub use classify::{classify, is_auto_resolvable};
pub use conflict::{latest_side, ConflictResolver};
pub use detector::ConflictDetector;
pub use diff::{conflicting_fields, field_union};
pub use registry::{ConflictListener, ConflictRegistry, Subscription};
pub use snapshot::{create_versioned_data, LAST_MODIFIED_FIELD, VERSION_FIELD};
pub use types::{
    ConflictInfo, ConflictType, FieldMap, Origin, ResolutionResult, ResolutionStrategy,
    VersionedData,
};
