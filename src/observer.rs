//! Diagnostic observers for assembly traceability.
//!
//! Observers see every assembly, eviction and warning. Hooks are called
//! synchronously on the assembling thread, so keep implementations cheap.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{DiError, Warning};
use crate::strategy::Strategy;

/// Observer trait for assembly events.
///
/// # Examples
///
/// ```
/// use ferrous_assembler::{AssemblyObserver, Strategy, Warning};
/// use std::sync::Mutex;
/// use std::time::Duration;
///
/// #[derive(Default)]
/// struct WarningCollector {
///     seen: Mutex<Vec<String>>,
/// }
///
/// impl AssemblyObserver for WarningCollector {
///     fn assembling(&self, _id: &str) {}
///
///     fn assembled(&self, _id: &str, _strategy: Strategy, _duration: Duration) {}
///
///     fn warning(&self, warning: &Warning) {
///         self.seen.lock().unwrap().push(warning.to_string());
///     }
/// }
/// ```
pub trait AssemblyObserver: Send + Sync {
    /// Called before an identifier is looked up and assembled.
    fn assembling(&self, id: &str);

    /// Called when an identifier was assembled, whether from cache or not.
    fn assembled(&self, id: &str, strategy: Strategy, duration: Duration);

    /// Called when a cached object or shared state was handed out.
    fn cache_hit(&self, id: &str, strategy: Strategy) {
        let _ = (id, strategy);
    }

    /// Called when assembling an identifier failed.
    fn failed(&self, id: &str, error: &DiError) {
        let _ = (id, error);
    }

    /// Called for every identifier removed by a `clear_*` call.
    fn evicted(&self, id: &str, strategy: Strategy) {
        let _ = (id, strategy);
    }

    /// Called for every condition reported through the warning channel.
    fn warning(&self, warning: &Warning) {
        let _ = warning;
    }
}

#[derive(Default, Clone)]
pub(crate) struct Observers {
    observers: Vec<Arc<dyn AssemblyObserver>>,
}

impl Observers {
    pub(crate) fn add(&mut self, observer: Arc<dyn AssemblyObserver>) {
        self.observers.push(observer);
    }

    #[inline]
    pub(crate) fn has_observers(&self) -> bool {
        !self.observers.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.observers.len()
    }

    #[inline]
    pub(crate) fn assembling(&self, id: &str) {
        for observer in &self.observers {
            observer.assembling(id);
        }
    }

    #[inline]
    pub(crate) fn assembled(&self, id: &str, strategy: Strategy, duration: Duration) {
        for observer in &self.observers {
            observer.assembled(id, strategy, duration);
        }
    }

    #[inline]
    pub(crate) fn cache_hit(&self, id: &str, strategy: Strategy) {
        for observer in &self.observers {
            observer.cache_hit(id, strategy);
        }
    }

    #[inline]
    pub(crate) fn failed(&self, id: &str, error: &DiError) {
        for observer in &self.observers {
            observer.failed(id, error);
        }
    }

    #[inline]
    pub(crate) fn evicted(&self, id: &str, strategy: Strategy) {
        for observer in &self.observers {
            observer.evicted(id, strategy);
        }
    }

    /// Logs the warning and forwards it to every observer.
    pub(crate) fn warning(&self, warning: Warning) {
        tracing::warn!("{warning}");
        for observer in &self.observers {
            observer.warning(&warning);
        }
    }
}

/// Observer that emits every event as a `tracing` event.
pub struct TracingObserver {
    label: &'static str,
}

impl TracingObserver {
    pub fn new() -> Self {
        Self {
            label: "ferrous_assembler",
        }
    }

    /// Tags every event with `label` in the `source` field.
    pub fn with_label(label: &'static str) -> Self {
        Self { label }
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl AssemblyObserver for TracingObserver {
    fn assembling(&self, id: &str) {
        tracing::debug!(source = self.label, id, "assembling");
    }

    fn assembled(&self, id: &str, strategy: Strategy, duration: Duration) {
        tracing::debug!(source = self.label, id, %strategy, ?duration, "assembled");
    }

    fn cache_hit(&self, id: &str, strategy: Strategy) {
        tracing::trace!(source = self.label, id, %strategy, "cache hit");
    }

    fn failed(&self, id: &str, error: &DiError) {
        tracing::error!(source = self.label, id, %error, "assembly failed");
    }

    fn evicted(&self, id: &str, strategy: Strategy) {
        tracing::info!(source = self.label, id, %strategy, "evicted");
    }
}

/// Observer that keeps counters of assembly activity.
pub struct MetricsObserver {
    assembly_count: AtomicU64,
    total_assembly_nanos: AtomicU64,
    cache_hits: AtomicU64,
    failures: AtomicU64,
    evictions: AtomicU64,
    warnings: AtomicU64,
}

impl MetricsObserver {
    pub fn new() -> Self {
        Self {
            assembly_count: AtomicU64::new(0),
            total_assembly_nanos: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            warnings: AtomicU64::new(0),
        }
    }

    pub fn assembly_count(&self) -> u64 {
        self.assembly_count.load(Ordering::Relaxed)
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    pub fn warnings(&self) -> u64 {
        self.warnings.load(Ordering::Relaxed)
    }

    pub fn total_assembly_time(&self) -> Duration {
        Duration::from_nanos(self.total_assembly_nanos.load(Ordering::Relaxed))
    }

    pub fn average_assembly_time(&self) -> Option<Duration> {
        let count = self.assembly_count();
        if count == 0 {
            return None;
        }
        Some(Duration::from_nanos(
            self.total_assembly_nanos.load(Ordering::Relaxed) / count,
        ))
    }

    pub fn reset(&self) {
        for counter in [
            &self.assembly_count,
            &self.total_assembly_nanos,
            &self.cache_hits,
            &self.failures,
            &self.evictions,
            &self.warnings,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl Default for MetricsObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl AssemblyObserver for MetricsObserver {
    fn assembling(&self, _id: &str) {}

    fn assembled(&self, _id: &str, _strategy: Strategy, duration: Duration) {
        self.assembly_count.fetch_add(1, Ordering::Relaxed);
        self.total_assembly_nanos
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
    }

    fn cache_hit(&self, _id: &str, _strategy: Strategy) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    fn failed(&self, _id: &str, _error: &DiError) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    fn evicted(&self, _id: &str, _strategy: Strategy) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    fn warning(&self, _warning: &Warning) {
        self.warnings.fetch_add(1, Ordering::Relaxed);
    }
}
