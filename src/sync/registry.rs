//! Pending conflict registry
//!
//! The single source of truth for conflicts awaiting resolution, keyed by
//! record id with at most one entry per id. Also owns subscriptions:
//! - `on_conflict`: synchronous listeners, called in subscription order
//! - `subscribe`: a broadcast event channel for async consumers
//!
//! # Thread Safety
//!
//! State sits behind a single `parking_lot::Mutex`. Every operation is a
//! short in-memory update. Listeners are invoked after the lock is released,
//! so they may call back into the registry.

use std::collections::{BTreeMap, HashMap};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::broadcast;

use super::types::{ConflictInfo, ConflictType};
use crate::config::DEFAULT_EVENT_CAPACITY;

/// Receives every newly registered conflict
pub trait ConflictListener: Send + Sync {
    fn on_conflict(&self, conflict: &ConflictInfo);
}

impl<F> ConflictListener for F
where
    F: Fn(&ConflictInfo) + Send + Sync,
{
    fn on_conflict(&self, conflict: &ConflictInfo) {
        self(conflict)
    }
}

/// Shared handle to the pending conflict set
#[derive(Clone)]
pub struct ConflictRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    state: Mutex<RegistryState>,
    events: broadcast::Sender<ConflictInfo>,
}

#[derive(Default)]
struct RegistryState {
    /// Pending conflicts with their insertion sequence
    pending: HashMap<String, (u64, ConflictInfo)>,
    /// Insertion order; a replaced entry keeps its original slot
    order: BTreeMap<u64, String>,
    next_seq: u64,
    listeners: Vec<(u64, Arc<dyn ConflictListener>)>,
    next_listener_id: u64,
}

impl RegistryState {
    fn insert(&mut self, conflict: ConflictInfo) {
        match self.pending.get_mut(&conflict.id) {
            Some((_, existing)) => *existing = conflict,
            None => {
                let seq = self.next_seq;
                self.next_seq += 1;
                self.order.insert(seq, conflict.id.clone());
                self.pending.insert(conflict.id.clone(), (seq, conflict));
            }
        }
    }

    fn take(&mut self, id: &str) -> Option<ConflictInfo> {
        let (seq, conflict) = self.pending.remove(id)?;
        self.order.remove(&seq);
        Some(conflict)
    }

    fn ordered(&self) -> impl Iterator<Item = &ConflictInfo> {
        self.order
            .values()
            .filter_map(|id| self.pending.get(id).map(|(_, conflict)| conflict))
    }
}

impl Default for ConflictRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConflictRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::with_event_capacity(DEFAULT_EVENT_CAPACITY)
    }

    /// Create an empty registry with a custom event channel capacity
    pub fn with_event_capacity(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(RegistryInner {
                state: Mutex::new(RegistryState::default()),
                events,
            }),
        }
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Insert or replace the entry for `conflict.id`, then notify subscribers
    pub(crate) fn register(&self, conflict: ConflictInfo) {
        let listeners: Vec<Arc<dyn ConflictListener>> = {
            let mut state = self.inner.state.lock();
            state.insert(conflict.clone());
            state.listeners.iter().map(|(_, l)| Arc::clone(l)).collect()
        };

        tracing::info!(
            conflict_id = %conflict.id,
            conflict_type = %conflict.conflict_type,
            fields = ?conflict.conflict_fields,
            auto_resolvable = conflict.auto_resolvable,
            "Registered conflict"
        );

        // Err only means nobody is listening on the channel
        let _ = self.inner.events.send(conflict.clone());

        for listener in listeners {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| listener.on_conflict(&conflict)));
            if outcome.is_err() {
                tracing::error!(conflict_id = %conflict.id, "Conflict listener panicked");
            }
        }
    }

    /// Atomically remove and return the entry for `id`
    pub(crate) fn take(&self, id: &str) -> Option<ConflictInfo> {
        self.inner.state.lock().take(id)
    }

    /// Atomically remove and return the entry for `id` if it still satisfies
    /// `predicate`. A non-matching entry is left in place.
    pub(crate) fn take_if<P>(&self, id: &str, predicate: P) -> Option<ConflictInfo>
    where
        P: FnOnce(&ConflictInfo) -> bool,
    {
        let mut state = self.inner.state.lock();
        let matches = state
            .pending
            .get(id)
            .is_some_and(|(_, conflict)| predicate(conflict));
        if matches {
            state.take(id)
        } else {
            None
        }
    }

    /// Remove the entry for `id`; absent ids are a no-op
    pub fn remove(&self, id: &str) {
        self.take(id);
    }

    /// Drop every pending conflict without notifying subscribers
    pub fn clear_conflicts(&self) {
        let mut state = self.inner.state.lock();
        let count = state.pending.len();
        state.pending.clear();
        state.order.clear();
        drop(state);

        tracing::info!(count = count, "Cleared pending conflicts");
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Snapshot of every pending conflict, in insertion order
    pub fn get_pending_conflicts(&self) -> Vec<ConflictInfo> {
        self.inner.state.lock().ordered().cloned().collect()
    }

    /// Snapshot of pending conflicts of one category
    pub fn get_conflicts_by_type(&self, conflict_type: ConflictType) -> Vec<ConflictInfo> {
        self.inner
            .state
            .lock()
            .ordered()
            .filter(|c| c.conflict_type == conflict_type)
            .cloned()
            .collect()
    }

    /// Get the pending conflict for `id`
    pub fn get(&self, id: &str) -> Option<ConflictInfo> {
        self.inner
            .state
            .lock()
            .pending
            .get(id)
            .map(|(_, conflict)| conflict.clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.state.lock().pending.contains_key(id)
    }

    /// Number of pending conflicts
    pub fn len(&self) -> usize {
        self.inner.state.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    /// Add a listener; the returned handle removes it again
    pub fn on_conflict<L>(&self, listener: L) -> Subscription
    where
        L: ConflictListener + 'static,
    {
        let listener: Arc<dyn ConflictListener> = Arc::new(listener);

        let mut state = self.inner.state.lock();
        let id = state.next_listener_id;
        state.next_listener_id += 1;
        state.listeners.push((id, listener));

        Subscription {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Receive registered conflicts over a broadcast channel.
    ///
    /// Slow receivers lose the oldest events (`RecvError::Lagged`);
    /// registration never waits on them.
    pub fn subscribe(&self) -> broadcast::Receiver<ConflictInfo> {
        self.inner.events.subscribe()
    }

    /// Number of active listeners
    pub fn listener_count(&self) -> usize {
        self.inner.state.lock().listeners.len()
    }
}

/// Handle returned by [`ConflictRegistry::on_conflict`]
#[must_use = "dropping the handle keeps the listener registered; call unsubscribe() to remove it"]
pub struct Subscription {
    id: u64,
    registry: Weak<RegistryInner>,
}

impl Subscription {
    /// Remove the listener. Safe to call more than once, and after the
    /// registry itself is gone.
    pub fn unsubscribe(&self) {
        if let Some(inner) = self.registry.upgrade() {
            inner.state.lock().listeners.retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::types::{FieldMap, Origin, VersionedData};
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    fn make_conflict(id: &str, conflict_type: ConflictType) -> ConflictInfo {
        let snapshot = |origin| VersionedData {
            id: id.to_string(),
            data: FieldMap::new(),
            version: 1,
            last_modified: 1000,
            modified_by: "user-1".to_string(),
            origin,
        };

        ConflictInfo {
            id: id.to_string(),
            detection_id: Uuid::new_v4(),
            conflict_type,
            local_version: snapshot(Origin::Local),
            remote_version: snapshot(Origin::Remote),
            conflict_fields: vec!["text".to_string()],
            auto_resolvable: conflict_type != ConflictType::Message,
            detected_at: Utc::now(),
        }
    }

    #[test]
    fn test_register_and_query() {
        let registry = ConflictRegistry::new();
        registry.register(make_conflict("msg-1", ConflictType::Message));
        registry.register(make_conflict("loc-1", ConflictType::Location));
        registry.register(make_conflict("msg-2", ConflictType::Message));

        let ids: Vec<String> = registry
            .get_pending_conflicts()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec!["msg-1", "loc-1", "msg-2"]);

        assert_eq!(registry.get_conflicts_by_type(ConflictType::Message).len(), 2);
        assert_eq!(registry.get_conflicts_by_type(ConflictType::Location).len(), 1);
        assert!(registry.get_conflicts_by_type(ConflictType::Profile).is_empty());
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_replacement_keeps_position() {
        let registry = ConflictRegistry::new();
        let first = make_conflict("msg-1", ConflictType::Message);
        registry.register(first.clone());
        registry.register(make_conflict("msg-2", ConflictType::Message));

        let replacement = make_conflict("msg-1", ConflictType::Message);
        registry.register(replacement.clone());

        let pending = registry.get_pending_conflicts();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].id, "msg-1");
        assert_eq!(pending[0].detection_id, replacement.detection_id);
        assert_ne!(pending[0].detection_id, first.detection_id);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let registry = ConflictRegistry::new();
        registry.register(make_conflict("msg-1", ConflictType::Message));

        registry.remove("msg-1");
        registry.remove("msg-1");
        registry.remove("never-registered");

        assert!(registry.is_empty());
        assert!(registry.take("msg-1").is_none());
    }

    #[test]
    fn test_take_if_checks_current_entry() {
        let registry = ConflictRegistry::new();
        let stale = make_conflict("rec-1", ConflictType::Location);
        registry.register(stale.clone());
        let current = make_conflict("rec-1", ConflictType::Message);
        registry.register(current.clone());

        assert!(registry
            .take_if("rec-1", |c| c.detection_id == stale.detection_id)
            .is_none());
        assert_eq!(registry.get("rec-1"), Some(current.clone()));

        let taken = registry.take_if("rec-1", |c| c.detection_id == current.detection_id);
        assert_eq!(taken, Some(current));
        assert!(registry.is_empty());
        assert!(registry.take_if("rec-1", |_| true).is_none());
    }

    #[test]
    fn test_listeners_in_order() {
        let registry = ConflictRegistry::new();
        let calls = Arc::new(Mutex::new(Vec::new()));

        let first_calls = Arc::clone(&calls);
        let _first = registry.on_conflict(move |c: &ConflictInfo| {
            first_calls.lock().push(format!("first:{}", c.id));
        });
        let second_calls = Arc::clone(&calls);
        let _second = registry.on_conflict(move |c: &ConflictInfo| {
            second_calls.lock().push(format!("second:{}", c.id));
        });

        registry.register(make_conflict("msg-1", ConflictType::Message));

        assert_eq!(*calls.lock(), vec!["first:msg-1", "second:msg-1"]);
    }

    #[test]
    fn test_unsubscribe() {
        let registry = ConflictRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&count);
        let subscription = registry.on_conflict(move |_: &ConflictInfo| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        registry.register(make_conflict("msg-1", ConflictType::Message));
        subscription.unsubscribe();
        subscription.unsubscribe();
        registry.register(make_conflict("msg-2", ConflictType::Message));

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(registry.listener_count(), 0);
    }

    #[test]
    fn test_clear_does_not_notify() {
        let registry = ConflictRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&count);
        let _subscription = registry.on_conflict(move |_: &ConflictInfo| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        registry.register(make_conflict("msg-1", ConflictType::Message));
        registry.register(make_conflict("msg-2", ConflictType::Message));
        registry.clear_conflicts();

        assert!(registry.get_pending_conflicts().is_empty());
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_panicking_listener_is_isolated() {
        let registry = ConflictRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));

        let _bad = registry.on_conflict(|_: &ConflictInfo| panic!("listener failure"));
        let counter = Arc::clone(&count);
        let _good = registry.on_conflict(move |_: &ConflictInfo| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        registry.register(make_conflict("msg-1", ConflictType::Message));

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(registry.contains("msg-1"));
    }

    #[test]
    fn test_listener_can_reenter() {
        let registry = ConflictRegistry::new();
        let seen = Arc::new(AtomicUsize::new(0));

        let handle = registry.clone();
        let seen_by_listener = Arc::clone(&seen);
        let _subscription = registry.on_conflict(move |c: &ConflictInfo| {
            // conflict is already visible when listeners run
            assert!(handle.contains(&c.id));
            seen_by_listener.store(handle.len(), Ordering::SeqCst);
        });

        registry.register(make_conflict("msg-1", ConflictType::Message));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_subscription_outlives_registry() {
        let registry = ConflictRegistry::new();
        let subscription = registry.on_conflict(|_: &ConflictInfo| {});
        drop(registry);
        subscription.unsubscribe();
    }

    #[tokio::test]
    async fn test_event_channel() {
        let registry = ConflictRegistry::with_event_capacity(4);
        let mut events = registry.subscribe();

        registry.register(make_conflict("loc-1", ConflictType::Location));

        let event = events.recv().await.unwrap();
        assert_eq!(event.id, "loc-1");
        assert_eq!(event.conflict_type, ConflictType::Location);
    }

    #[tokio::test]
    async fn test_event_channel_lag() {
        let registry = ConflictRegistry::with_event_capacity(1);
        let mut events = registry.subscribe();

        registry.register(make_conflict("msg-1", ConflictType::Message));
        registry.register(make_conflict("msg-2", ConflictType::Message));

        assert!(matches!(
            events.recv().await,
            Err(broadcast::error::RecvError::Lagged(1))
        ));
        assert_eq!(events.recv().await.unwrap().id, "msg-2");
    }
}
