//! Loader capability: turning factory specifications into constructibles.
//!
//! The assembler never knows how a specification string maps onto code. A
//! [`Loader`] supplied by the host answers that, returning either a
//! [`Factory`] to call or a ready-made object. [`StaticLoader`] is a
//! registry-backed implementation suitable for most applications.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{BoxError, DiError, DiResult};
use crate::managed::{Instance, Managed};
use crate::value::Arguments;

/// Something that creates objects from resolved arguments.
pub trait Factory: Send + Sync {
    /// Creates and initializes a new object.
    fn construct(&self, args: Arguments) -> Result<Instance, BoxError>;

    /// Creates an object without running initialization.
    ///
    /// Used for borg assembly once the shared state exists, since the state
    /// is replaced right after. Factories that cannot allocate uninitialized
    /// objects return `None`, and the assembler falls back to [`construct`](Self::construct).
    fn allocate(&self) -> Option<Instance> {
        None
    }

    /// A named member reachable from this factory (a nested factory or a
    /// ready-made object).
    fn member(&self, name: &str) -> Option<Constructible> {
        let _ = name;
        None
    }
}

/// What a specification (or a member path under it) loads to.
#[derive(Clone)]
pub enum Constructible {
    Factory(Arc<dyn Factory>),
    Object(Instance),
}

impl Constructible {
    /// Wraps a plain closure as a factory.
    pub fn factory<T, F>(f: F) -> Self
    where
        T: Managed,
        F: Fn(Arguments) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        Constructible::Factory(Arc::new(FnFactory::new(f)))
    }

    pub fn object<T: Managed>(value: T) -> Self {
        Constructible::Object(Arc::new(value))
    }

    /// Looks up the member `name` on the factory or object.
    pub fn member(&self, name: &str) -> Option<Constructible> {
        match self {
            Constructible::Factory(factory) => factory.member(name),
            Constructible::Object(object) => object.member(name),
        }
    }

    /// Walks a dotted member path such as `"Outer.create"`.
    pub fn walk(&self, spec: &str, path: &str) -> DiResult<Constructible> {
        let mut current = self.clone();
        for segment in path.split('.') {
            current = current.member(segment).ok_or_else(|| DiError::Specification {
                spec: spec.to_string(),
                reason: format!("no member {segment:?} along path {path:?}"),
            })?;
        }
        Ok(current)
    }
}

impl fmt::Debug for Constructible {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constructible::Factory(_) => f.write_str("Constructible::Factory(..)"),
            Constructible::Object(object) => {
                write!(f, "Constructible::Object({})", object.as_ref().type_name())
            }
        }
    }
}

/// Resolves factory specifications. Supplied by the host environment.
pub trait Loader: Send + Sync {
    /// Loads `spec`, failing with [`DiError::Specification`] if it names nothing.
    fn resolve(&self, spec: &str) -> DiResult<Constructible>;
}

impl<L: Loader + ?Sized> Loader for Arc<L> {
    fn resolve(&self, spec: &str) -> DiResult<Constructible> {
        (**self).resolve(spec)
    }
}

type ConstructFn = dyn Fn(Arguments) -> Result<Instance, BoxError> + Send + Sync;
type AllocateFn = dyn Fn() -> Instance + Send + Sync;

/// A [`Factory`] built from closures.
///
/// # Examples
///
/// ```rust
/// use ferrous_assembler::{Arguments, Constructible, Factory, FnFactory, Managed};
///
/// struct Finder;
/// impl Managed for Finder {}
///
/// let factory = FnFactory::new(|_args| Ok(Finder))
///     .with_allocate(|| Finder)
///     .with_member("default", Constructible::object(Finder));
///
/// assert!(factory.construct(Arguments::default()).is_ok());
/// assert!(factory.allocate().is_some());
/// assert!(factory.member("default").is_some());
/// ```
pub struct FnFactory {
    construct: Box<ConstructFn>,
    allocate: Option<Box<AllocateFn>>,
    members: HashMap<String, Constructible>,
}

impl FnFactory {
    pub fn new<T, F>(f: F) -> Self
    where
        T: Managed,
        F: Fn(Arguments) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        Self {
            construct: Box::new(move |args| f(args).map(|object| Arc::new(object) as Instance)),
            allocate: None,
            members: HashMap::new(),
        }
    }

    /// Supplies an uninitialized-object constructor for borg assembly.
    pub fn with_allocate<T, F>(mut self, f: F) -> Self
    where
        T: Managed,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.allocate = Some(Box::new(move || Arc::new(f()) as Instance));
        self
    }

    pub fn with_member(mut self, name: impl Into<String>, member: Constructible) -> Self {
        self.members.insert(name.into(), member);
        self
    }
}

impl Factory for FnFactory {
    fn construct(&self, args: Arguments) -> Result<Instance, BoxError> {
        (self.construct)(args)
    }

    fn allocate(&self) -> Option<Instance> {
        self.allocate.as_ref().map(|f| f())
    }

    fn member(&self, name: &str) -> Option<Constructible> {
        self.members.get(name).cloned()
    }
}

/// Loader backed by an explicit table of specifications.
///
/// A specification that is not registered verbatim is split at its last
/// dots: the longest registered prefix is loaded and the remainder walked as
/// a member path, so `"movies.Catalog.create"` finds the `create` member of a
/// registered `"movies.Catalog"`.
///
/// # Examples
///
/// ```rust
/// use ferrous_assembler::{Constructible, FnFactory, Loader, Managed, StaticLoader};
///
/// struct Catalog;
/// impl Managed for Catalog {}
///
/// let mut loader = StaticLoader::new();
/// loader.register(
///     "movies.Catalog",
///     Constructible::Factory(std::sync::Arc::new(
///         FnFactory::new(|_| Ok(Catalog)).with_member("EMPTY", Constructible::object(Catalog)),
///     )),
/// );
///
/// assert!(loader.resolve("movies.Catalog").is_ok());
/// assert!(loader.resolve("movies.Catalog.EMPTY").is_ok());
/// assert!(loader.resolve("movies.Missing").is_err());
/// ```
#[derive(Default, Clone)]
pub struct StaticLoader {
    entries: HashMap<String, Constructible>,
}

impl StaticLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) what `spec` loads to.
    pub fn register(&mut self, spec: impl Into<String>, constructible: Constructible) -> &mut Self {
        self.entries.insert(spec.into(), constructible);
        self
    }

    /// Registers a closure factory under `spec`.
    pub fn register_fn<T, F>(&mut self, spec: impl Into<String>, f: F) -> &mut Self
    where
        T: Managed,
        F: Fn(Arguments) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.register(spec, Constructible::factory(f))
    }

    /// Registers a ready-made object under `spec`.
    pub fn register_object(&mut self, spec: impl Into<String>, object: Instance) -> &mut Self {
        self.register(spec, Constructible::Object(object))
    }

    pub fn contains(&self, spec: &str) -> bool {
        self.entries.contains_key(spec)
    }
}

impl Loader for StaticLoader {
    fn resolve(&self, spec: &str) -> DiResult<Constructible> {
        if let Some(found) = self.entries.get(spec) {
            return Ok(found.clone());
        }
        let mut split = spec.len();
        while let Some(dot) = spec[..split].rfind('.') {
            if let Some(base) = self.entries.get(&spec[..dot]) {
                return base.walk(spec, &spec[dot + 1..]);
            }
            split = dot;
        }
        Err(DiError::Specification {
            spec: spec.to_string(),
            reason: "nothing is registered under this name".to_string(),
        })
    }
}

impl fmt::Debug for StaticLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut specs: Vec<&String> = self.entries.keys().collect();
        specs.sort();
        f.debug_struct("StaticLoader").field("specs", &specs).finish()
    }
}
