//! Process-wide mutual exclusion between playback sessions
//!
//! Every mounted session registers a callback that silences it. Before a
//! session starts a source node it asks the coordinator to run every *other*
//! callback, so at most one session is ever audible. This is a cooperative
//! protocol: a session that starts sound without asking first breaks the
//! invariant and nothing detects it at runtime.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tracing::{debug, trace};

/// Callback that makes one session stop producing sound
pub type StopCallback = Arc<dyn Fn() + Send + Sync>;

/// Mutual-exclusion coordinator
///
/// Sessions receive an implementation by injection so tests can substitute
/// their own. None of the operations can fail; unknown ids are ignored so a
/// stale request racing an unmount is harmless.
pub trait PlaybackCoordinator: Send + Sync {
    /// Store (or overwrite) the stop callback for `id`
    fn register(&self, id: &str, stop: StopCallback);

    /// Remove the entry for `id` if present
    fn unregister(&self, id: &str);

    /// Synchronously stop every registered session except `id`
    fn request_exclusive_playback(&self, id: &str);
}

/// In-memory playback registry
#[derive(Default)]
pub struct PlaybackRegistry {
    entries: Mutex<HashMap<String, StopCallback>>,
}

static GLOBAL: OnceLock<Arc<PlaybackRegistry>> = OnceLock::new();

impl PlaybackRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide instance, created on first use
    pub fn global() -> Arc<PlaybackRegistry> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(PlaybackRegistry::new())))
    }

    /// Number of registered sessions
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether no session is registered
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Whether `id` currently has a stop callback
    pub fn is_registered(&self, id: &str) -> bool {
        self.entries.lock().contains_key(id)
    }
}

impl PlaybackCoordinator for PlaybackRegistry {
    fn register(&self, id: &str, stop: StopCallback) {
        let replaced = self.entries.lock().insert(id.to_string(), stop).is_some();
        debug!(identity = %id, replaced, "Registered playback session");
    }

    fn unregister(&self, id: &str) {
        if self.entries.lock().remove(id).is_some() {
            debug!(identity = %id, "Unregistered playback session");
        }
    }

    fn request_exclusive_playback(&self, id: &str) {
        // Callbacks run outside the lock so they may re-enter the registry
        let others: Vec<StopCallback> = self
            .entries
            .lock()
            .iter()
            .filter(|(key, _)| key.as_str() != id)
            .map(|(_, stop)| Arc::clone(stop))
            .collect();

        trace!(identity = %id, silenced = others.len(), "Exclusive playback requested");

        for stop in others {
            stop();
        }
    }
}

impl std::fmt::Debug for PlaybackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<String> = self.entries.lock().keys().cloned().collect();
        ids.sort();
        f.debug_struct("PlaybackRegistry").field("entries", &ids).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, StopCallback) {
        let count = Arc::new(AtomicUsize::new(0));
        let hits = Arc::clone(&count);
        (count, Arc::new(move || {
            hits.fetch_add(1, Ordering::SeqCst);
        }))
    }

    #[test]
    fn request_stops_everyone_but_the_caller() {
        let registry = PlaybackRegistry::new();
        let (a, stop_a) = counter();
        let (b, stop_b) = counter();
        let (c, stop_c) = counter();
        registry.register("a", stop_a);
        registry.register("b", stop_b);
        registry.register("c", stop_c);

        registry.request_exclusive_playback("b");

        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(b.load(Ordering::SeqCst), 0);
        assert_eq!(c.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn register_twice_keeps_latest_callback() {
        let registry = PlaybackRegistry::new();
        let (old, stop_old) = counter();
        let (new, stop_new) = counter();
        registry.register("a", stop_old);
        registry.register("a", stop_new);

        registry.request_exclusive_playback("other");

        assert_eq!(registry.len(), 1);
        assert_eq!(old.load(Ordering::SeqCst), 0);
        assert_eq!(new.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unknown_ids_are_ignored() {
        let registry = PlaybackRegistry::new();
        registry.unregister("ghost");
        registry.request_exclusive_playback("ghost");
        assert!(registry.is_empty());
    }

    #[test]
    fn unregistered_sessions_are_not_stopped() {
        let registry = PlaybackRegistry::new();
        let (a, stop_a) = counter();
        registry.register("a", stop_a);
        registry.unregister("a");

        registry.request_exclusive_playback("b");

        assert_eq!(a.load(Ordering::SeqCst), 0);
        assert!(!registry.is_registered("a"));
    }

    #[test]
    fn callbacks_may_reenter_the_registry() {
        let registry = Arc::new(PlaybackRegistry::new());
        let inner = Arc::clone(&registry);
        registry.register("a", Arc::new(move || inner.unregister("a")));

        registry.request_exclusive_playback("b");

        assert!(!registry.is_registered("a"));
    }

    #[test]
    fn global_is_shared() {
        let first = PlaybackRegistry::global();
        let second = PlaybackRegistry::global();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
