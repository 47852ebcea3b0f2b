//! Lifecycle hook lookup and dispatch.
//!
//! A hook name can be declared at three levels: the component itself, any
//! template in its parent chain, and the registry. The most specific
//! non-empty name wins. The name is resolved once, when the effective
//! definition is merged; objects are then asked to run it through
//! [`Managed::call_lifecycle`].

use std::fmt;

use crate::error::BoxError;
use crate::managed::Instance;

/// Points in an object's life at which a hook may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// After construction and attribute wiring
    AfterInject,
    /// Before a cached object is evicted
    BeforeClear,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::AfterInject => "after_inject",
            LifecycleState::BeforeClear => "before_clear",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Picks the first non-empty hook name, most specific level first.
///
/// # Examples
///
/// ```rust
/// use ferrous_assembler::lifecycle::first_declared;
///
/// let levels = [None, Some(""), Some("open"), Some("default")];
/// assert_eq!(first_declared(levels), Some("open".to_string()));
/// assert_eq!(first_declared([None, None]), None);
/// ```
pub fn first_declared<'a, I>(levels: I) -> Option<String>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    levels
        .into_iter()
        .flatten()
        .find(|name| !name.is_empty())
        .map(str::to_string)
}

/// What happened when a hook was dispatched.
#[derive(Debug)]
pub(crate) enum HookOutcome {
    /// No hook name applies
    Undeclared,
    /// The object does not define the resolved hook
    Missing(String),
    Called(String),
    Failed(String, BoxError),
}

/// Runs the resolved hook `method` on `instance`.
pub(crate) fn dispatch(instance: &Instance, method: Option<&str>) -> HookOutcome {
    let Some(method) = method else {
        return HookOutcome::Undeclared;
    };
    match instance.call_lifecycle(method) {
        None => HookOutcome::Missing(method.to_string()),
        Some(Ok(())) => HookOutcome::Called(method.to_string()),
        Some(Err(error)) => HookOutcome::Failed(method.to_string(), error),
    }
}
