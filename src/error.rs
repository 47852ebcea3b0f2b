//! Error and warning types for the assembler.

use std::fmt;

use thiserror::Error;

/// Boxed error produced by caller-supplied code (factories, evaluators, hooks).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Assembly errors
///
/// Represents every failure the assembler can surface while looking up,
/// constructing, wiring or evicting components. Failures raised by
/// caller-supplied code are carried as the error [`source`](std::error::Error::source).
///
/// # Examples
///
/// ```rust
/// use ferrous_assembler::{Assembler, DiError, Registry, StaticLoader};
///
/// let assembler = Assembler::new(Registry::new("app"), StaticLoader::new());
/// match assembler.assemble("missing") {
///     Err(DiError::NotFound(id)) => assert_eq!(id, "missing"),
///     _ => unreachable!(),
/// }
/// ```
///
/// ```rust
/// use ferrous_assembler::DiError;
///
/// let circular = DiError::Circular(vec!["a".into(), "b".into(), "a".into()]);
/// assert_eq!(circular.to_string(), "circular dependency detected: a > b > a");
/// ```
#[derive(Debug, Error)]
pub enum DiError {
    /// No definition is registered under the identifier
    #[error("component {0:?} is not defined")]
    NotFound(String),
    /// The identifier names a template, which can never be assembled
    #[error("{0:?} is a template and cannot be assembled")]
    NotConstructible(String),
    /// The identifier is already being assembled on this thread (includes path)
    #[error("circular dependency detected: {}", .0.join(" > "))]
    Circular(Vec<String>),
    /// The component declares a strategy name the assembler does not know
    #[error("component {id:?} uses unrecognized assembly strategy {strategy:?}")]
    UnknownStrategy { id: String, strategy: String },
    /// Borg requested for a factory whose objects have no swappable shared state
    #[error("component {0:?} cannot use the borg strategy: its objects expose no shared state")]
    NotBorgCapable(String),
    /// The loader could not turn the factory specification into something constructible
    #[error("factory specification {spec:?} is not resolvable: {reason}")]
    Specification { spec: String, reason: String },
    /// A factory failed while creating an object
    #[error("failed to initialize object of component {id:?}")]
    Construction {
        id: String,
        #[source]
        source: BoxError,
    },
    /// An evaluator target or deferred call failed
    #[error("failed to evaluate {target}")]
    Evaluation {
        target: String,
        #[source]
        source: BoxError,
    },
    /// A declared attribute could not be wired onto the object
    #[error("cannot wire attribute {attribute:?} of component {id:?}: {reason}")]
    AttributeWiring {
        id: String,
        attribute: String,
        reason: String,
    },
    /// An after-construction hook failed
    #[error("{state} hook {method:?} of component {id:?} failed")]
    LifecycleHook {
        id: String,
        state: crate::LifecycleState,
        method: String,
        #[source]
        source: BoxError,
    },
    /// A resolved mapping key cannot be hashed
    #[error("unhashable value used as a mapping key: {0}")]
    Unhashable(String),
    /// A definition with the same identifier is already registered
    #[error("definition {0:?} is already registered")]
    Duplicate(String),
    /// The template chain of a definition loops back on itself
    #[error("template chain of {id:?} loops: {}", .chain.join(" -> "))]
    ParentCycle { id: String, chain: Vec<String> },
    /// A typed retrieval found an object of another type
    #[error("component {id:?} is not a {expected}")]
    TypeMismatch { id: String, expected: &'static str },
    /// Maximum assembly depth exceeded
    #[error("max assembly depth {0} exceeded")]
    DepthExceeded(usize),
    /// Invalid configuration value
    #[error("configuration error: {0}")]
    Config(String),
}

impl DiError {
    pub(crate) fn construction(id: &str, source: impl Into<BoxError>) -> Self {
        DiError::Construction {
            id: id.to_string(),
            source: source.into(),
        }
    }
}

/// Result type for assembly operations
pub type DiResult<T> = Result<T, DiError>;

/// Non-fatal conditions reported through the warning channel.
///
/// Warnings are logged with `tracing::warn!` and forwarded to every registered
/// [`AssemblyObserver`](crate::AssemblyObserver).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A lifecycle hook name resolved, but the object has no such member
    MissingHook {
        id: String,
        state: crate::LifecycleState,
        method: String,
    },
    /// Attributes are wired onto an object obtained by member access, which may be shared
    MemberWiring { id: String, member: String },
    /// Constructor arguments declared for a member-access component are ignored
    MemberArguments { id: String, member: String },
    /// A pre-eviction hook failed; eviction continued
    EvictionHookFailed {
        id: String,
        method: String,
        message: String,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::MissingHook { id, state, method } => {
                write!(f, "{id:?} does not define {state} method {method:?}")
            }
            Warning::MemberWiring { id, member } => write!(
                f,
                "component {id:?} wires attributes onto member {member:?}; the object may be wired more than once"
            ),
            Warning::MemberArguments { id, member } => write!(
                f,
                "ignoring args and keywords for component {id:?} (uses member {member:?})"
            ),
            Warning::EvictionHookFailed { id, method, message } => {
                write!(f, "ignoring failure of before_clear {method:?} on {id:?}: {message}")
            }
        }
    }
}
