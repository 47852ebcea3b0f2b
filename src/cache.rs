//! Strategy caches for singleton objects, borg shared states and weak references.
//!
//! Singleton and borg caches are guarded by one re-entrant lock each. The lock
//! is held across the whole check-then-create-then-store sequence, so at most
//! one first construction happens per cache at a time; the same thread may
//! re-enter while assembling nested dependencies. This deliberately
//! serializes unrelated identifiers sharing a strategy.
//!
//! The weakref cache is a concurrent map and never holds a lock while an
//! object is being constructed.

use std::cell::RefCell;
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use indexmap::IndexMap;
use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

use crate::managed::{Instance, Managed, SharedState};

/// Cache keyed by component identifier, guarded by a re-entrant mutex.
///
/// # Examples
///
/// ```rust
/// use ferrous_assembler::cache::StrategyCache;
///
/// let cache: StrategyCache<u32> = StrategyCache::new();
/// {
///     let entries = cache.lock();
///     if entries.get("a").is_none() {
///         entries.set("a", 1);
///     }
///     // re-entering on the same thread does not block
///     assert_eq!(cache.lock().get("a"), Some(1));
/// }
/// assert_eq!(cache.keys(), vec!["a".to_string()]);
/// assert_eq!(cache.drain().len(), 1);
/// assert!(cache.keys().is_empty());
/// ```
pub struct StrategyCache<V> {
    entries: ReentrantMutex<RefCell<IndexMap<String, V>>>,
}

/// Exclusive access to a [`StrategyCache`] for a check-then-act sequence.
///
/// No borrow of the underlying map outlives a method call, so nested
/// assembly may lock the same cache again while a guard is alive.
pub struct CacheGuard<'a, V> {
    entries: ReentrantMutexGuard<'a, RefCell<IndexMap<String, V>>>,
}

impl<V: Clone> StrategyCache<V> {
    pub fn new() -> Self {
        Self {
            entries: ReentrantMutex::new(RefCell::new(IndexMap::new())),
        }
    }

    /// Acquires the cache lock. Blocks while another thread holds it.
    pub fn lock(&self) -> CacheGuard<'_, V> {
        CacheGuard {
            entries: self.entries.lock(),
        }
    }

    pub fn get(&self, id: &str) -> Option<V> {
        self.lock().get(id)
    }

    pub fn set(&self, id: &str, value: V) {
        self.lock().set(id, value)
    }

    /// Cached identifiers in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.lock().keys()
    }

    /// Removes every entry and returns them in insertion order.
    pub fn drain(&self) -> Vec<(String, V)> {
        self.lock().drain()
    }
}

impl<V: Clone> Default for StrategyCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> CacheGuard<'_, V> {
    pub fn get(&self, id: &str) -> Option<V> {
        self.entries.borrow().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.borrow().contains_key(id)
    }

    pub fn set(&self, id: &str, value: V) {
        self.entries.borrow_mut().insert(id.to_string(), value);
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.borrow().keys().cloned().collect()
    }

    pub fn drain(&self) -> Vec<(String, V)> {
        self.entries.borrow_mut().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

/// Cached state of one borg component: the object that was wired first and
/// the state record every later object aliases.
#[derive(Clone)]
pub struct BorgEntry {
    pub holder: Instance,
    pub state: SharedState,
}

/// Weakly held objects keyed by component identifier.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use ferrous_assembler::{Instance, Managed};
/// use ferrous_assembler::cache::WeakCache;
///
/// struct Session;
/// impl Managed for Session {}
///
/// let cache = WeakCache::new();
/// let session: Instance = Arc::new(Session);
/// cache.insert_live("session", session.clone());
/// assert!(cache.get("session").is_some());
///
/// drop(session);
/// assert!(cache.get("session").is_none());
/// ```
#[derive(Default)]
pub struct WeakCache {
    entries: DashMap<String, Weak<dyn Managed>>,
}

impl WeakCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The live object cached under `id`. A dead entry is dropped.
    pub fn get(&self, id: &str) -> Option<Instance> {
        let live = self.entries.get(id)?.upgrade();
        if live.is_none() {
            self.entries.remove_if(id, |_, weak| weak.strong_count() == 0);
        }
        live
    }

    /// Caches `candidate` unless another live object got there first, and
    /// returns whichever object is now cached.
    pub fn insert_live(&self, id: &str, candidate: Instance) -> Instance {
        let mut slot = self
            .entries
            .entry(id.to_string())
            .or_insert_with(|| Arc::downgrade(&candidate));
        match slot.upgrade() {
            Some(existing) => existing,
            None => {
                *slot = Arc::downgrade(&candidate);
                candidate
            }
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Removes every entry, live or dead.
    pub fn drain(&self) -> Vec<(String, Weak<dyn Managed>)> {
        let keys = self.keys();
        keys.into_iter()
            .filter_map(|key| self.entries.remove(&key))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
