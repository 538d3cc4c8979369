//! Automatic resolution sweep
//!
//! Resolves every pending conflict the policy marks auto-resolvable using
//! `latest-wins`. Merge is never chosen automatically. Everything else stays
//! in the registry for a human decision.

use super::conflict::ConflictResolver;
use super::registry::ConflictRegistry;
use super::types::{ConflictInfo, ResolutionResult, ResolutionStrategy};

/// Strategy applied by the automatic sweep
pub const AUTO_STRATEGY: ResolutionStrategy = ResolutionStrategy::LatestWins;

#[derive(Clone)]
pub struct AutoResolver {
    registry: ConflictRegistry,
    resolver: ConflictResolver,
}

impl AutoResolver {
    pub fn new(registry: ConflictRegistry, resolver: ConflictResolver) -> Self {
        Self { registry, resolver }
    }

    /// Resolve every auto-resolvable conflict pending at the start of the
    /// sweep. Returns the results actually produced, possibly none.
    pub fn auto_resolve_conflicts(&self) -> Vec<ResolutionResult> {
        self.sweep(&self.registry.get_pending_conflicts())
    }

    /// Resolve the eligible entries of `pending`. An entry re-detected or
    /// resolved elsewhere since the snapshot is skipped.
    fn sweep(&self, pending: &[ConflictInfo]) -> Vec<ResolutionResult> {
        let skipped = pending.iter().filter(|c| !c.auto_resolvable).count();
        let eligible = pending.len() - skipped;

        let results: Vec<ResolutionResult> = pending
            .iter()
            .filter(|c| c.auto_resolvable)
            .filter_map(|c| self.resolver.resolve_auto_resolvable(c, AUTO_STRATEGY))
            .collect();

        if eligible > 0 || skipped > 0 {
            tracing::info!(
                resolved = results.len(),
                superseded = eligible - results.len(),
                left_for_review = skipped,
                "Auto-resolution sweep finished"
            );
        }

        results
    }
}
