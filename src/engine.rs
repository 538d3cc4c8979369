//! Conflict engine state
//!
//! Owns one registry and wires the detector, resolver and auto-resolver to
//! it. Built once when the sync subsystem starts and shut down with it; every
//! component holds a handle to the same registry rather than a global.

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::sync::{
    AutoResolver, ConflictDetector, ConflictInfo, ConflictRegistry, ConflictResolver,
    ConflictType, FieldMap, ResolutionResult, ResolutionStrategy, VersionedData,
};

/// Shared conflict engine handle
#[derive(Clone)]
pub struct ConflictEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    config: EngineConfig,
    registry: ConflictRegistry,
    detector: ConflictDetector,
    resolver: ConflictResolver,
    auto: AutoResolver,
}

impl ConflictEngine {
    /// Create an engine from validated configuration
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let registry = ConflictRegistry::with_event_capacity(config.event_capacity);
        let detector =
            ConflictDetector::with_metadata_fields(registry.clone(), config.metadata_fields.clone());
        let resolver = ConflictResolver::with_tie_break(registry.clone(), config.tie_break);
        let auto = AutoResolver::new(registry.clone(), resolver.clone());

        tracing::debug!(
            tie_break = ?config.tie_break,
            event_capacity = config.event_capacity,
            "Conflict engine started"
        );

        Ok(Self {
            inner: Arc::new(EngineInner {
                config,
                registry,
                detector,
                resolver,
                auto,
            }),
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Get the pending conflict registry
    pub fn registry(&self) -> &ConflictRegistry {
        &self.inner.registry
    }

    pub fn detector(&self) -> &ConflictDetector {
        &self.inner.detector
    }

    pub fn resolver(&self) -> &ConflictResolver {
        &self.inner.resolver
    }

    pub fn auto_resolver(&self) -> &AutoResolver {
        &self.inner.auto
    }

    /// See [`ConflictDetector::compare_versions`]
    pub fn compare_versions(
        &self,
        local: &VersionedData,
        remote: &VersionedData,
    ) -> Result<Option<ConflictInfo>> {
        self.inner.detector.compare_versions(local, remote)
    }

    /// See [`ConflictDetector::compare_versions_as`]
    pub fn compare_versions_as(
        &self,
        local: &VersionedData,
        remote: &VersionedData,
        conflict_type: ConflictType,
    ) -> Result<Option<ConflictInfo>> {
        self.inner
            .detector
            .compare_versions_as(local, remote, conflict_type)
    }

    /// See [`ConflictResolver::resolve_conflict`]
    pub fn resolve_conflict(
        &self,
        id: &str,
        strategy: ResolutionStrategy,
        manual_data: Option<FieldMap>,
    ) -> ResolutionResult {
        self.inner.resolver.resolve_conflict(id, strategy, manual_data)
    }

    /// See [`ConflictResolver::resolve_conflict_token`]
    pub fn resolve_conflict_token(
        &self,
        id: &str,
        strategy: &str,
        manual_data: Option<FieldMap>,
    ) -> ResolutionResult {
        self.inner
            .resolver
            .resolve_conflict_token(id, strategy, manual_data)
    }

    /// See [`ConflictResolver::resolve_all`]
    pub fn resolve_all(&self, strategy: ResolutionStrategy) -> Vec<ResolutionResult> {
        self.inner.resolver.resolve_all(strategy)
    }

    /// See [`AutoResolver::auto_resolve_conflicts`]
    pub fn auto_resolve_conflicts(&self) -> Vec<ResolutionResult> {
        self.inner.auto.auto_resolve_conflicts()
    }

    /// Drop all pending state when the sync subsystem stops
    pub fn shutdown(&self) {
        let pending = self.inner.registry.len();
        if pending > 0 {
            tracing::warn!(pending = pending, "Shutting down with unresolved conflicts");
        }
        self.inner.registry.clear_conflicts();
        tracing::info!("Conflict engine shut down");
    }
}
