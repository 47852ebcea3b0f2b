//! Dependency values: literals, containers, references and deferred calls.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{BoxError, DiError, DiResult};
use crate::managed::{downcast_instance, Instance, Managed};
use crate::resolver::{resolve, Assemble};

/// A value a definition argument or attribute may hold.
///
/// Literals and containers are passed through resolution (containers are
/// rebuilt with every element resolved). [`Reference`], [`Evaluator`] and
/// [`Deferred`] are placeholders that resolution replaces with a concrete
/// value each time the owning component is assembled.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Ordered, mutable-in-spirit sequence; never hashable
    List(Vec<Value>),
    /// Fixed sequence; hashable when all of its elements are
    Tuple(Vec<Value>),
    /// Insertion-ordered mapping; keys are arbitrary values until resolved
    Map(Vec<(Value, Value)>),
    /// An assembled object
    Object(Instance),
    /// Any other shared Rust value; passed through resolution untouched
    Opaque(Arc<dyn Any + Send + Sync>),
    Reference(Reference),
    Evaluator(Evaluator),
    Deferred(Deferred),
}

impl Value {
    /// Wraps an arbitrary shared value that is not a managed object.
    pub fn opaque<T: Any + Send + Sync>(value: T) -> Self {
        Value::Opaque(Arc::new(value))
    }

    /// Wraps a managed object.
    pub fn object<T: Managed>(value: T) -> Self {
        Value::Object(Arc::new(value))
    }

    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Map(_) => "map",
            Value::Object(_) => "object",
            Value::Opaque(_) => "opaque",
            Value::Reference(_) => "reference",
            Value::Evaluator(_) => "evaluator",
            Value::Deferred(_) => "deferred",
        }
    }

    /// Whether this value still needs resolution before use.
    pub fn is_deferred(&self) -> bool {
        match self {
            Value::Reference(_) | Value::Evaluator(_) | Value::Deferred(_) => true,
            Value::List(items) | Value::Tuple(items) => items.iter().any(Value::is_deferred),
            Value::Map(entries) => entries
                .iter()
                .any(|(key, value)| key.is_deferred() || value.is_deferred()),
            _ => false,
        }
    }

    /// Whether this value may be used as a mapping key.
    ///
    /// Lists and maps are never hashable; tuples are hashable when every
    /// element is. Objects and opaque values hash by identity.
    pub fn is_hashable(&self) -> bool {
        match self {
            Value::List(_) | Value::Map(_) => false,
            Value::Tuple(items) => items.iter().all(Value::is_hashable),
            _ => true,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) | Value::Tuple(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Instance> {
        match self {
            Value::Object(instance) => Some(instance),
            _ => None,
        }
    }

    /// Looks up a mapping entry by key.
    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.as_map()?
            .iter()
            .find(|(candidate, _)| candidate == key)
            .map(|(_, value)| value)
    }

    /// Retrieves the concrete type behind an object or opaque value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ferrous_assembler::Value;
    ///
    /// let value = Value::opaque(vec![1u8, 2, 3]);
    /// let bytes = value.downcast::<Vec<u8>>().unwrap();
    /// assert_eq!(bytes.len(), 3);
    /// assert!(value.downcast::<String>().is_none());
    /// ```
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        match self {
            Value::Object(instance) => downcast_instance::<T>(instance),
            Value::Opaque(any) => any.clone().downcast::<T>().ok(),
            _ => None,
        }
    }

    /// Inserts into a key/value list with mapping semantics: an equal key
    /// keeps its position and takes the new value.
    pub(crate) fn insert_entry(entries: &mut Vec<(Value, Value)>, key: Value, value: Value) {
        match entries.iter_mut().find(|(candidate, _)| *candidate == key) {
            Some(slot) => slot.1 = value,
            None => entries.push((key, value)),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) | (Value::Tuple(a), Value::Tuple(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b)),
            (Value::Opaque(a), Value::Opaque(b)) => std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b)),
            (Value::Reference(a), Value::Reference(b)) => a == b,
            (Value::Evaluator(a), Value::Evaluator(b)) => Arc::ptr_eq(&a.target, &b.target),
            (Value::Deferred(a), Value::Deferred(b)) => Arc::ptr_eq(&a.call, &b.call),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::List(items) => f.debug_list().entries(items).finish(),
            Value::Tuple(items) => {
                let mut tuple = f.debug_tuple("");
                for item in items {
                    tuple.field(item);
                }
                tuple.finish()
            }
            Value::Map(entries) => f
                .debug_map()
                .entries(entries.iter().map(|(k, v)| (k, v)))
                .finish(),
            Value::Object(instance) => write!(f, "<{} @ {:p}>", instance.as_ref().type_name(), Arc::as_ptr(instance)),
            Value::Opaque(any) => write!(f, "<opaque @ {:p}>", Arc::as_ptr(any)),
            Value::Reference(reference) => write!(f, "{reference:?}"),
            Value::Evaluator(evaluator) => write!(f, "{evaluator:?}"),
            Value::Deferred(deferred) => write!(f, "{deferred:?}"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Instance> for Value {
    fn from(instance: Instance) -> Self {
        Value::Object(instance)
    }
}

impl From<Reference> for Value {
    fn from(reference: Reference) -> Self {
        Value::Reference(reference)
    }
}

impl From<Evaluator> for Value {
    fn from(evaluator: Evaluator) -> Self {
        Value::Evaluator(evaluator)
    }
}

impl From<Deferred> for Value {
    fn from(deferred: Deferred) -> Self {
        Value::Deferred(deferred)
    }
}

impl<K: Into<Value>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut entries = Vec::new();
        for (key, value) in iter {
            Value::insert_entry(&mut entries, key.into(), value.into());
        }
        Value::Map(entries)
    }
}

/// A lazy link to another component, assembled every time it is resolved.
///
/// # Examples
///
/// ```rust
/// use ferrous_assembler::{Reference, Value};
///
/// let finder = Reference::to("movies.finder");
/// assert_eq!(finder.id(), "movies.finder");
/// let value: Value = finder.into();
/// assert!(value.is_deferred());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference(String);

impl Reference {
    pub fn to(id: impl Into<String>) -> Self {
        Reference(id.into())
    }

    /// References the component registered under the type's full path.
    pub fn of<T: ?Sized>() -> Self {
        Reference(std::any::type_name::<T>().to_string())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ref:{}", self.0)
    }
}

/// Positional and keyword arguments handed to factories and evaluator targets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    pub positional: Vec<Value>,
    pub keywords: IndexMap<String, Value>,
}

impl Arguments {
    pub fn new(positional: Vec<Value>, keywords: IndexMap<String, Value>) -> Self {
        Self { positional, keywords }
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keywords.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.positional.get(index)
    }

    pub fn keyword(&self, name: &str) -> Option<&Value> {
        self.keywords.get(name)
    }

    /// Returns the positional argument at `index`, or an error naming it.
    pub fn required(&self, index: usize) -> Result<&Value, BoxError> {
        self.get(index)
            .ok_or_else(|| format!("missing positional argument {index}").into())
    }

    /// Returns the keyword argument `name`, or an error naming it.
    pub fn required_keyword(&self, name: &str) -> Result<&Value, BoxError> {
        self.keyword(name)
            .ok_or_else(|| format!("missing keyword argument {name:?}").into())
    }
}

type EvaluatorFn = dyn Fn(Arguments) -> Result<Value, BoxError> + Send + Sync;

/// A deferred call whose arguments may themselves be deferred.
///
/// The target is invoked with freshly resolved arguments on every resolution;
/// results are never cached.
///
/// # Examples
///
/// ```rust
/// use ferrous_assembler::{Assembler, Evaluator, Registry, StaticLoader, Value, resolve};
///
/// let joined = Evaluator::new("join", |args| {
///     let parts: Vec<&str> = args.positional.iter().filter_map(Value::as_str).collect();
///     Ok(Value::from(parts.join("-")))
/// })
/// .arg("a")
/// .arg("b");
///
/// let assembler = Assembler::new(Registry::new("ctx"), StaticLoader::new());
/// let value = resolve(&joined.into(), &assembler).unwrap();
/// assert_eq!(value.as_str(), Some("a-b"));
/// ```
#[derive(Clone)]
pub struct Evaluator {
    name: String,
    target: Arc<EvaluatorFn>,
    args: Vec<Value>,
    keywords: IndexMap<String, Value>,
}

impl Evaluator {
    pub fn new<F>(name: impl Into<String>, target: F) -> Self
    where
        F: Fn(Arguments) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            target: Arc::new(target),
            args: Vec::new(),
            keywords: IndexMap::new(),
        }
    }

    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn keyword(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keywords.insert(name.into(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn keywords(&self) -> &IndexMap<String, Value> {
        &self.keywords
    }

    /// Resolves every argument through `assembler`, then calls the target.
    pub fn evaluate(&self, assembler: &dyn Assemble) -> DiResult<Value> {
        let positional = self
            .args
            .iter()
            .map(|arg| resolve(arg, assembler))
            .collect::<DiResult<Vec<_>>>()?;
        let mut keywords = IndexMap::with_capacity(self.keywords.len());
        for (name, arg) in &self.keywords {
            keywords.insert(name.clone(), resolve(arg, assembler)?);
        }
        (self.target)(Arguments::new(positional, keywords)).map_err(|source| DiError::Evaluation {
            target: format!("evaluator {:?}", self.name),
            source,
        })
    }
}

impl fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Evaluator")
            .field("name", &self.name)
            .field("args", &self.args)
            .field("keywords", &self.keywords)
            .finish()
    }
}

type DeferredFn = dyn Fn() -> Result<Value, BoxError> + Send + Sync;

/// A plain deferred call taking no arguments, invoked on every resolution.
#[derive(Clone)]
pub struct Deferred {
    name: String,
    call: Arc<DeferredFn>,
}

impl Deferred {
    pub fn new<F>(call: F) -> Self
    where
        F: Fn() -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        Self::named("deferred call", call)
    }

    pub fn named<F>(name: impl Into<String>, call: F) -> Self
    where
        F: Fn() -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            call: Arc::new(call),
        }
    }

    pub fn call(&self) -> DiResult<Value> {
        (self.call)().map_err(|source| DiError::Evaluation {
            target: self.name.clone(),
            source,
        })
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Deferred({:?})", self.name)
    }
}
