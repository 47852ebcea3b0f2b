//! The assembler: strategy dispatch, caching, eviction and warm-up.
//!
//! Singleton and borg components are created while holding their cache
//! lock. The borg path takes the singleton lock first, then the borg lock,
//! so the two re-entrant locks are always acquired in the same order.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;

use crate::cache::{BorgEntry, StrategyCache, WeakCache};
use crate::config::AssemblerConfig;
use crate::error::{BoxError, DiError, DiResult, Warning};
use crate::internal::StackGuard;
use crate::lifecycle::{dispatch, HookOutcome, LifecycleState};
use crate::loader::{Constructible, Loader};
use crate::managed::{downcast_instance, Instance, Managed};
use crate::observer::{AssemblyObserver, Observers};
use crate::registry::{EffectiveComponent, Registry};
use crate::resolver::Assemble;
use crate::strategy::{Strategy, UnknownStrategy};

mod create;

static NEXT_ASSEMBLER_ID: AtomicUsize = AtomicUsize::new(1);

/// Assembles objects from the definitions in a [`Registry`].
///
/// Cloning is cheap; clones share the registry and every cache.
///
/// # Thread Safety
///
/// Any number of threads may assemble concurrently. For one singleton or
/// borg identifier at most one first construction happens; other callers
/// wait for it and observe the stored result. Cycle detection is per thread,
/// so unrelated assemblies on other threads never look circular.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use ferrous_assembler::{
///     Assembler, Component, Declare, Managed, Reference, Registry, StaticLoader, Strategy,
/// };
///
/// struct Finder;
/// impl Managed for Finder {}
///
/// struct Lister {
///     finder: Arc<Finder>,
/// }
/// impl Managed for Lister {}
///
/// let mut loader = StaticLoader::new();
/// loader.register_fn("Finder", |_| Ok(Finder));
/// loader.register_fn("Lister", |args| {
///     let finder = args.required(0)?.downcast::<Finder>().ok_or("finder expected")?;
///     Ok(Lister { finder })
/// });
///
/// let mut registry = Registry::new("movies");
/// registry
///     .register(Component::new("finder").factory("Finder").strategy(Strategy::Singleton))
///     .unwrap();
/// registry
///     .register(Component::new("lister").factory("Lister").arg(Reference::to("finder")))
///     .unwrap();
///
/// let assembler = Assembler::new(registry, loader);
/// let first = assembler.assemble_as::<Lister>("lister").unwrap();
/// let second = assembler.assemble_as::<Lister>("lister").unwrap();
/// assert!(!Arc::ptr_eq(&first, &second));
/// assert!(Arc::ptr_eq(&first.finder, &second.finder));
/// assert_eq!(assembler.clear_singletons(), vec!["finder".to_string()]);
/// ```
#[derive(Clone)]
pub struct Assembler {
    inner: Arc<AssemblerInner>,
}

pub(crate) struct AssemblerInner {
    id: usize,
    registry: Registry,
    loader: Arc<dyn Loader>,
    config: AssemblerConfig,
    singletons: StrategyCache<Instance>,
    borgs: StrategyCache<BorgEntry>,
    weakrefs: WeakCache,
    definitions: RwLock<HashMap<String, Arc<EffectiveComponent>>>,
    observers: Observers,
}

/// Result of evicting one strategy cache.
#[derive(Debug, Default)]
pub struct Eviction {
    /// Identifiers that were cached when the eviction started, in cache order
    pub evicted: Vec<String>,
    /// Before-clear hooks that failed; eviction continued past each one
    pub failures: Vec<(String, BoxError)>,
}

/// Builder for an [`Assembler`] with configuration and observers.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use ferrous_assembler::{Assembler, MetricsObserver, Registry, StaticLoader};
/// use ferrous_assembler::config::AssemblerConfig;
///
/// let metrics = Arc::new(MetricsObserver::new());
/// let assembler = Assembler::builder(Registry::new("app"), StaticLoader::new())
///     .config(AssemblerConfig { max_depth: 64, ..AssemblerConfig::default() })
///     .observer(metrics.clone())
///     .build();
///
/// assert!(assembler.assemble("nothing").is_err());
/// assert_eq!(metrics.failures(), 1);
/// ```
pub struct AssemblerBuilder {
    registry: Registry,
    loader: Arc<dyn Loader>,
    config: AssemblerConfig,
    observers: Observers,
}

impl AssemblerBuilder {
    pub fn config(mut self, config: AssemblerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn AssemblyObserver>) -> Self {
        self.observers.add(observer);
        self
    }

    pub fn build(self) -> Assembler {
        let AssemblerBuilder {
            mut registry,
            loader,
            config,
            observers,
        } = self;
        registry.default_hooks(
            config.default_after_inject.as_deref(),
            config.default_before_clear.as_deref(),
        );
        tracing::debug!(
            registry = registry.id(),
            definitions = registry.len(),
            observers = observers.len(),
            "assembler built"
        );
        Assembler {
            inner: Arc::new(AssemblerInner {
                id: NEXT_ASSEMBLER_ID.fetch_add(1, Ordering::Relaxed),
                registry,
                loader,
                config,
                singletons: StrategyCache::new(),
                borgs: StrategyCache::new(),
                weakrefs: WeakCache::new(),
                definitions: RwLock::new(HashMap::new()),
                observers,
            }),
        }
    }
}

impl Assembler {
    /// Creates an assembler with the default configuration.
    pub fn new(registry: Registry, loader: impl Loader + 'static) -> Self {
        Self::builder(registry, loader).build()
    }

    pub fn builder(registry: Registry, loader: impl Loader + 'static) -> AssemblerBuilder {
        AssemblerBuilder {
            registry,
            loader: Arc::new(loader),
            config: AssemblerConfig::default(),
            observers: Observers::default(),
        }
    }

    #[inline]
    pub(crate) fn inner(&self) -> &AssemblerInner {
        &self.inner
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.inner.config
    }

    /// Whether `id` names a component. Templates are not assemblable, so
    /// this is `false` for them.
    pub fn contains(&self, id: &str) -> bool {
        self.inner.registry.get_component(id).is_some()
    }

    /// Assembles the component registered under `id` according to its strategy.
    ///
    /// # Errors
    ///
    /// - [`DiError::Circular`] if `id` is already being assembled on this thread
    /// - [`DiError::NotFound`] or [`DiError::NotConstructible`] for unknown ids and templates
    /// - [`DiError::UnknownStrategy`] if the component names no known strategy
    /// - any failure of loading, construction, wiring or the after-inject hook
    pub fn assemble(&self, id: &str) -> DiResult<Instance> {
        let observers = &self.inner.observers;
        if !observers.has_observers() {
            return self.assemble_with_strategy(id).map(|(instance, _)| instance);
        }

        let start = Instant::now();
        observers.assembling(id);
        match self.assemble_with_strategy(id) {
            Ok((instance, strategy)) => {
                observers.assembled(id, strategy, start.elapsed());
                Ok(instance)
            }
            Err(error) => {
                observers.failed(id, &error);
                Err(error)
            }
        }
    }

    /// Assembles `id` and downcasts the result to `T`.
    pub fn assemble_as<T: Managed>(&self, id: &str) -> DiResult<Arc<T>> {
        let instance = self.assemble(id)?;
        downcast_instance::<T>(&instance).ok_or_else(|| DiError::TypeMismatch {
            id: id.to_string(),
            expected: std::any::type_name::<T>(),
        })
    }

    fn assemble_with_strategy(&self, id: &str) -> DiResult<(Instance, Strategy)> {
        let inner = self.inner();
        let _guard = StackGuard::enter(inner.id, id, inner.config.max_depth)?;

        let definition = self.definition(id)?;
        let strategy: Strategy = definition
            .strategy
            .parse()
            .map_err(|UnknownStrategy(strategy)| DiError::UnknownStrategy {
                id: id.to_string(),
                strategy,
            })?;

        let instance = match strategy {
            Strategy::Prototype => self.create(&definition)?,
            Strategy::Singleton => self.singleton(&definition)?,
            Strategy::Borg => self.borg(&definition)?,
            Strategy::Weakref => self.weakref(&definition)?,
        };
        Ok((instance, strategy))
    }

    /// The merged definition of component `id`, memoized unless disabled.
    fn definition(&self, id: &str) -> DiResult<Arc<EffectiveComponent>> {
        let inner = self.inner();
        if !inner.config.memoize_definitions {
            return inner.registry.effective(id).map(Arc::new);
        }
        if let Some(found) = inner.definitions.read().get(id) {
            return Ok(found.clone());
        }
        let merged = Arc::new(inner.registry.effective(id)?);
        Ok(inner
            .definitions
            .write()
            .entry(id.to_string())
            .or_insert(merged)
            .clone())
    }

    fn singleton(&self, definition: &EffectiveComponent) -> DiResult<Instance> {
        let cache = self.inner.singletons.lock();
        if let Some(cached) = cache.get(&definition.id) {
            self.cache_hit(&definition.id, Strategy::Singleton);
            return Ok(cached);
        }
        let instance = self.create(definition)?;
        cache.set(&definition.id, instance.clone());
        Ok(instance)
    }

    fn borg(&self, definition: &EffectiveComponent) -> DiResult<Instance> {
        let _ordering = self.inner.singletons.lock();
        let cache = self.inner.borgs.lock();
        if let Some(entry) = cache.get(&definition.id) {
            let instance = self.fresh_borg(definition)?;
            if !instance.adopt_shared_state(entry.state) {
                return Err(DiError::NotBorgCapable(definition.id.clone()));
            }
            self.cache_hit(&definition.id, Strategy::Borg);
            return Ok(instance);
        }

        let instance = self.initialize(definition)?;
        let state = instance
            .shared_state()
            .ok_or_else(|| DiError::NotBorgCapable(definition.id.clone()))?;
        self.finish(definition, &instance)?;
        cache.set(
            &definition.id,
            BorgEntry {
                holder: instance.clone(),
                state,
            },
        );
        Ok(instance)
    }

    /// A new object for a borg component whose shared state already exists.
    /// It is neither wired nor hooked: it is about to adopt wired state.
    fn fresh_borg(&self, definition: &EffectiveComponent) -> DiResult<Instance> {
        match self.load(definition)? {
            Constructible::Factory(factory) => match factory.allocate() {
                Some(instance) => Ok(instance),
                None => self.construct(definition, factory.as_ref()),
            },
            Constructible::Object(object) => Ok(object),
        }
    }

    fn weakref(&self, definition: &EffectiveComponent) -> DiResult<Instance> {
        if let Some(live) = self.inner.weakrefs.get(&definition.id) {
            self.cache_hit(&definition.id, Strategy::Weakref);
            return Ok(live);
        }
        let instance = self.create(definition)?;
        Ok(self.inner.weakrefs.insert_live(&definition.id, instance))
    }

    fn cache_hit(&self, id: &str, strategy: Strategy) {
        tracing::debug!(id, %strategy, "cache hit");
        if self.inner.observers.has_observers() {
            self.inner.observers.cache_hit(id, strategy);
        }
    }

    pub(crate) fn warn(&self, warning: Warning) {
        self.inner.observers.warning(warning);
    }

    /// Evicts every singleton, running before-clear hooks. Returns the evicted ids.
    pub fn clear_singletons(&self) -> Vec<String> {
        self.evict(Strategy::Singleton).evicted
    }

    /// Evicts every borg shared state. Returns the evicted ids.
    pub fn clear_borgs(&self) -> Vec<String> {
        self.evict(Strategy::Borg).evicted
    }

    /// Drops every weak reference. Returns the ids whose objects were still alive.
    pub fn clear_weakrefs(&self) -> Vec<String> {
        self.evict(Strategy::Weakref).evicted
    }

    /// Empties the cache of `strategy` and runs the before-clear hook of
    /// every evicted object that is still alive.
    ///
    /// Weak entries whose object is already gone are removed but not
    /// reported in [`Eviction::evicted`].
    ///
    /// The cache is emptied first, so hooks run without holding its lock. A
    /// failing hook is logged and collected; the remaining hooks still run.
    /// Prototypes are never cached, so evicting them does nothing.
    pub fn evict(&self, strategy: Strategy) -> Eviction {
        let drained: Vec<(String, Option<Instance>)> = match strategy {
            Strategy::Prototype => Vec::new(),
            Strategy::Singleton => self
                .inner
                .singletons
                .drain()
                .into_iter()
                .map(|(id, instance)| (id, Some(instance)))
                .collect(),
            Strategy::Borg => self
                .inner
                .borgs
                .drain()
                .into_iter()
                .map(|(id, entry)| (id, Some(entry.holder)))
                .collect(),
            Strategy::Weakref => self
                .inner
                .weakrefs
                .drain()
                .into_iter()
                .map(|(id, weak)| (id, weak.upgrade()))
                .collect(),
        };

        let mut eviction = Eviction::default();
        for (id, instance) in drained {
            // only weak entries can be dead; they are dropped without being reported
            let Some(instance) = instance else {
                tracing::debug!(id = %id, "dropped dead weak reference");
                continue;
            };
            if let Err(failure) = self.before_clear(&id, &instance) {
                eviction.failures.push((id.clone(), failure));
            }
            self.inner.observers.evicted(&id, strategy);
            eviction.evicted.push(id);
        }
        tracing::info!(%strategy, evicted = eviction.evicted.len(), failures = eviction.failures.len(), "cache cleared");
        eviction
    }

    fn before_clear(&self, id: &str, instance: &Instance) -> Result<(), BoxError> {
        let definition = match self.definition(id) {
            Ok(definition) => definition,
            Err(error) => {
                tracing::debug!(id, %error, "no definition for evicted entry; skipping before_clear");
                return Ok(());
            }
        };
        let state = LifecycleState::BeforeClear;
        match dispatch(instance, definition.hook(state)) {
            HookOutcome::Undeclared => Ok(()),
            HookOutcome::Called(method) => {
                tracing::debug!(id, method = %method, "before_clear called");
                Ok(())
            }
            HookOutcome::Missing(method) => {
                self.warn(Warning::MissingHook {
                    id: id.to_string(),
                    state,
                    method,
                });
                Ok(())
            }
            HookOutcome::Failed(method, error) => {
                self.warn(Warning::EvictionHookFailed {
                    id: id.to_string(),
                    method,
                    message: error.to_string(),
                });
                Err(error)
            }
        }
    }

    /// Assembles every singleton component that is not cached yet.
    ///
    /// Returns the identifiers this call assembled, in registration order.
    /// Singletons that were created as dependencies of an earlier entry are
    /// already cached by the time they are reached and are not listed.
    pub fn init_singletons(&self) -> DiResult<Vec<String>> {
        let cache = self.inner.singletons.lock();
        self.warm_up(Strategy::Singleton, |id| cache.contains(id))
    }

    /// Assembles every borg component whose shared state does not exist yet.
    pub fn init_borgs(&self) -> DiResult<Vec<String>> {
        let _ordering = self.inner.singletons.lock();
        let cache = self.inner.borgs.lock();
        self.warm_up(Strategy::Borg, |id| cache.contains(id))
    }

    fn warm_up(&self, strategy: Strategy, cached: impl Fn(&str) -> bool) -> DiResult<Vec<String>> {
        let mut created = Vec::new();
        for component in self.inner.registry.iter_components(Some(strategy)) {
            let id = component.id();
            if cached(id) {
                continue;
            }
            self.assemble(id)?;
            created.push(id.to_string());
        }
        tracing::info!(%strategy, created = created.len(), "cache initialized");
        Ok(created)
    }

    #[cfg(feature = "diagnostics")]
    pub fn to_debug_string(&self) -> String {
        let mut s = String::new();
        s.push_str("=== Assembler Debug ===\n");
        s.push_str(&self.inner.registry.to_debug_string());
        s.push_str(&format!("Singletons: {:?}\n", self.inner.singletons.keys()));
        s.push_str(&format!("Borgs: {:?}\n", self.inner.borgs.keys()));
        s.push_str(&format!("Weakrefs: {:?}\n", self.inner.weakrefs.keys()));
        s.push_str(&format!(
            "Assembling on this thread: {:?}\n",
            crate::internal::stack::snapshot(self.inner.id)
        ));
        s
    }
}

impl Assemble for Assembler {
    fn assemble(&self, id: &str) -> DiResult<Instance> {
        Assembler::assemble(self, id)
    }
}

impl fmt::Debug for Assembler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Assembler")
            .field("registry", &self.inner.registry.id())
            .field("definitions", &self.inner.registry.len())
            .field("singletons", &self.inner.singletons.keys())
            .field("borgs", &self.inner.borgs.keys())
            .field("weakrefs", &self.inner.weakrefs.len())
            .finish()
    }
}
