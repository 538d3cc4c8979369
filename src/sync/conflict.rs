//! Conflict resolution
//!
//! Applies one of five strategies to a pending conflict and removes it from
//! the registry on success. Failures come back as an unresolved
//! `ResolutionResult`, never as a panic or `Err`.

use serde_json::Value;

use super::registry::ConflictRegistry;
use super::types::{
    ConflictInfo, FieldMap, Origin, ResolutionResult, ResolutionStrategy, VersionedData,
};
use crate::config::TieBreak;
use crate::error::ResolutionError;

/// Resolves pending conflicts from a registry
#[derive(Clone)]
pub struct ConflictResolver {
    registry: ConflictRegistry,
    /// Side preferred when `lastModified` is equal
    tie_break: TieBreak,
}

impl ConflictResolver {
    /// Create a resolver where local wins timestamp ties
    pub fn new(registry: ConflictRegistry) -> Self {
        Self::with_tie_break(registry, TieBreak::Local)
    }

    pub fn with_tie_break(registry: ConflictRegistry, tie_break: TieBreak) -> Self {
        Self {
            registry,
            tie_break,
        }
    }

    /// Resolve the pending conflict for `id`.
    ///
    /// `manual_data` is required for [`ResolutionStrategy::Manual`] and
    /// ignored otherwise. Of two concurrent calls for one id, exactly one
    /// succeeds; the other reports `ConflictNotFound`.
    pub fn resolve_conflict(
        &self,
        id: &str,
        strategy: ResolutionStrategy,
        manual_data: Option<FieldMap>,
    ) -> ResolutionResult {
        // Validate before taking the entry so a bad call leaves it pending
        if strategy == ResolutionStrategy::Manual && manual_data.is_none() {
            let error = if self.registry.contains(id) {
                ResolutionError::MissingManualData(id.to_string())
            } else {
                ResolutionError::ConflictNotFound(id.to_string())
            };
            return self.failed(id, Some(strategy), error);
        }

        let Some(conflict) = self.registry.take(id) else {
            return self.failed(
                id,
                Some(strategy),
                ResolutionError::ConflictNotFound(id.to_string()),
            );
        };

        self.apply(conflict, strategy, manual_data)
    }

    /// Resolve the entry for `expected.id` only if it is still the same
    /// auto-resolvable detection. Returns `None`, leaving the registry
    /// untouched, when the entry was resolved or re-detected since.
    pub(crate) fn resolve_auto_resolvable(
        &self,
        expected: &ConflictInfo,
        strategy: ResolutionStrategy,
    ) -> Option<ResolutionResult> {
        let conflict = self.registry.take_if(&expected.id, |current| {
            current.detection_id == expected.detection_id && current.auto_resolvable
        })?;
        Some(self.apply(conflict, strategy, None))
    }

    fn apply(
        &self,
        conflict: ConflictInfo,
        strategy: ResolutionStrategy,
        manual_data: Option<FieldMap>,
    ) -> ResolutionResult {
        let id = conflict.id.clone();
        let resolved_data = match strategy {
            ResolutionStrategy::LocalWins => conflict.local_version.data,
            ResolutionStrategy::RemoteWins => conflict.remote_version.data,
            ResolutionStrategy::LatestWins => match self.winner(&conflict) {
                Origin::Local => conflict.local_version.data,
                Origin::Remote => conflict.remote_version.data,
            },
            ResolutionStrategy::Merge => self.merge(&conflict),
            // callers check for a payload before taking the entry
            ResolutionStrategy::Manual => manual_data.unwrap_or_default(),
        };

        tracing::info!(
            conflict_id = %id,
            strategy = %strategy,
            fields = resolved_data.len(),
            "Resolved conflict"
        );

        ResolutionResult::success(id, strategy, resolved_data)
    }

    /// Resolve from a strategy token such as `"latest-wins"`
    pub fn resolve_conflict_token(
        &self,
        id: &str,
        strategy: &str,
        manual_data: Option<FieldMap>,
    ) -> ResolutionResult {
        match strategy.parse::<ResolutionStrategy>() {
            Ok(strategy) => self.resolve_conflict(id, strategy, manual_data),
            Err(error) => self.failed(id, None, error),
        }
    }

    /// Resolve every pending conflict with one strategy
    pub fn resolve_all(&self, strategy: ResolutionStrategy) -> Vec<ResolutionResult> {
        self.registry
            .get_pending_conflicts()
            .iter()
            .map(|conflict| self.resolve_conflict(&conflict.id, strategy, None))
            .collect()
    }

    /// Side whose snapshot wins `latest-wins`
    pub fn winner(&self, conflict: &ConflictInfo) -> Origin {
        latest_side(&conflict.local_version, &conflict.remote_version, self.tie_break)
    }

    /// Union of both sides. Disagreeing keys take the `latest-wins` side,
    /// one-sided keys pass through.
    fn merge(&self, conflict: &ConflictInfo) -> FieldMap {
        let local = &conflict.local_version.data;
        let remote = &conflict.remote_version.data;
        let winner = self.winner(conflict);

        let mut merged = FieldMap::new();
        for (key, local_value) in local {
            let value = match remote.get(key) {
                Some(remote_value) if remote_value != local_value => {
                    pick(winner, local_value, remote_value)
                }
                _ => local_value,
            };
            merged.insert(key.clone(), value.clone());
        }
        for (key, remote_value) in remote {
            if !merged.contains_key(key) {
                merged.insert(key.clone(), remote_value.clone());
            }
        }

        tracing::debug!(
            conflict_id = %conflict.id,
            winner = ?winner,
            conflict_fields = ?conflict.conflict_fields,
            merged_fields = merged.len(),
            "Merged snapshots"
        );

        merged
    }

    fn failed(
        &self,
        id: &str,
        strategy: Option<ResolutionStrategy>,
        error: ResolutionError,
    ) -> ResolutionResult {
        tracing::warn!(conflict_id = %id, kind = error.kind(), "Conflict resolution failed: {}", error);
        ResolutionResult::failure(id, strategy, error)
    }
}

/// Strictly greater `lastModified` wins; ties go to `tie_break`
pub fn latest_side(local: &VersionedData, remote: &VersionedData, tie_break: TieBreak) -> Origin {
    use std::cmp::Ordering;

    match local.last_modified.cmp(&remote.last_modified) {
        Ordering::Greater => Origin::Local,
        Ordering::Less => Origin::Remote,
        Ordering::Equal => match tie_break {
            TieBreak::Local => Origin::Local,
            TieBreak::Remote => Origin::Remote,
        },
    }
}

fn pick<'a>(winner: Origin, local: &'a Value, remote: &'a Value) -> &'a Value {
    match winner {
        Origin::Local => local,
        Origin::Remote => remote,
    }
}
