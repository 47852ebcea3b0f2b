//! Assembled objects and their wiring capabilities.
//!
//! Every object the assembler produces is shared as an [`Instance`]
//! (`Arc<dyn Managed>`). The [`Managed`] trait is the narrow interface the
//! assembler uses after construction: attribute wiring, lifecycle hooks and,
//! for borg components, a swappable shared-state container.

use std::any::Any;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

use crate::error::BoxError;
use crate::loader::Constructible;
use crate::value::Value;

/// Shared handle to an assembled object.
pub type Instance = Arc<dyn Managed>;

/// Type-erased shared-state record of a borg component.
pub type SharedState = Arc<dyn Any + Send + Sync>;

/// Upcasting support for managed objects.
///
/// Implemented for every `Any + Send + Sync` type; never implement it by hand.
pub trait AsAny: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
    fn type_name(&self) -> &'static str;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// Failure to wire a single attribute.
#[derive(Debug, Error)]
pub enum AttributeError {
    /// The object has no attribute or setter with that name
    #[error("object has no attribute or setter with this name")]
    NotFound,
    /// The attribute exists but refused the value
    #[error("{0}")]
    Rejected(String),
}

impl AttributeError {
    /// Rejection for a value of the wrong kind.
    pub fn expected(kind: &str, value: &Value) -> Self {
        AttributeError::Rejected(format!("expected {kind}, got {}", value.kind()))
    }
}

/// Capabilities of an object produced by the assembler.
///
/// All methods take `&self` because instances are shared; implementors use
/// interior mutability for wired state. Every method has a default, so a type
/// with no attributes, hooks or shared state needs only an empty `impl`.
///
/// # Examples
///
/// ```rust
/// use ferrous_assembler::{AttributeError, BoxError, Managed, Value};
/// use parking_lot::Mutex;
///
/// #[derive(Default)]
/// struct Lister {
///     title: Mutex<String>,
///     started: Mutex<bool>,
/// }
///
/// impl Managed for Lister {
///     fn set_attribute(&self, name: &str, value: Value) -> Result<(), AttributeError> {
///         match name {
///             "title" => {
///                 let title = value.as_str().ok_or_else(|| AttributeError::expected("str", &value))?;
///                 *self.title.lock() = title.to_string();
///                 Ok(())
///             }
///             _ => Err(AttributeError::NotFound),
///         }
///     }
///
///     fn call_lifecycle(&self, method: &str) -> Option<Result<(), BoxError>> {
///         match method {
///             "start" => {
///                 *self.started.lock() = true;
///                 Some(Ok(()))
///             }
///             _ => None,
///         }
///     }
/// }
///
/// let lister = Lister::default();
/// lister.set_attribute("title", "Films".into()).unwrap();
/// assert!(lister.set_attribute("missing", Value::None).is_err());
/// assert!(lister.call_lifecycle("start").is_some());
/// assert!(*lister.started.lock());
/// ```
pub trait Managed: AsAny {
    /// Assigns a field or feeds a setter. Called once per declared attribute,
    /// in declaration order.
    fn set_attribute(&self, name: &str, value: Value) -> Result<(), AttributeError> {
        let _ = (name, value);
        Err(AttributeError::NotFound)
    }

    /// Invokes the no-argument lifecycle method `method`.
    ///
    /// Returns `None` when the object has no such method.
    fn call_lifecycle(&self, method: &str) -> Option<Result<(), BoxError>> {
        let _ = method;
        None
    }

    /// The aliasable state record backing this object, if it has one.
    ///
    /// Objects returning `None` cannot be assembled with the borg strategy.
    fn shared_state(&self) -> Option<SharedState> {
        None
    }

    /// Replaces this object's state record with `state`.
    ///
    /// Returns `false` if the record is not of the type this object uses.
    fn adopt_shared_state(&self, state: SharedState) -> bool {
        let _ = state;
        false
    }

    /// A named member of this object, for member-access components.
    fn member(&self, name: &str) -> Option<Constructible> {
        let _ = name;
        None
    }
}

/// Retrieves the concrete type behind an instance.
pub fn downcast_instance<T: Any + Send + Sync>(instance: &Instance) -> Option<Arc<T>> {
    instance.clone().into_any().downcast::<T>().ok()
}

/// Swappable state container for borg-capable types.
///
/// The value lives in an inner shared record; [`share`](Self::share) hands the
/// record out and [`adopt`](Self::adopt) points this container at another
/// one. Two containers that adopted the same record observe each other's
/// writes.
///
/// # Examples
///
/// ```rust
/// use ferrous_assembler::BorgState;
///
/// let first = BorgState::new(vec![1]);
/// let second = BorgState::new(Vec::new());
/// assert!(second.adopt(first.share()));
///
/// first.with_mut(|items| items.push(2));
/// assert_eq!(second.with(|items| items.clone()), vec![1, 2]);
/// assert!(first.shares_with(&second));
/// ```
pub struct BorgState<T> {
    slot: RwLock<Arc<RwLock<T>>>,
}

impl<T: Send + Sync + 'static> BorgState<T> {
    pub fn new(value: T) -> Self {
        Self {
            slot: RwLock::new(Arc::new(RwLock::new(value))),
        }
    }

    fn record(&self) -> Arc<RwLock<T>> {
        self.slot.read().clone()
    }

    /// Runs `f` with read access to the current record.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let record = self.record();
        let guard: RwLockReadGuard<'_, T> = record.read();
        f(&guard)
    }

    /// Runs `f` with write access to the current record.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let record = self.record();
        let mut guard: RwLockWriteGuard<'_, T> = record.write();
        f(&mut guard)
    }

    /// The current record, type-erased for the borg cache.
    pub fn share(&self) -> SharedState {
        self.record()
    }

    /// Points this container at `state`. Fails if `state` holds another type.
    pub fn adopt(&self, state: SharedState) -> bool {
        match state.downcast::<RwLock<T>>() {
            Ok(record) => {
                *self.slot.write() = record;
                true
            }
            Err(_) => false,
        }
    }

    /// Whether both containers currently point at the same record.
    pub fn shares_with(&self, other: &BorgState<T>) -> bool {
        Arc::ptr_eq(&self.record(), &other.record())
    }
}

impl<T: Default + Send + Sync + 'static> Default for BorgState<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: std::fmt::Debug + Send + Sync + 'static> std::fmt::Debug for BorgState<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.with(|value| f.debug_tuple("BorgState").field(value).finish())
    }
}
