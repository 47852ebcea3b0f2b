//! Assembly strategy definitions.

use std::fmt;
use std::str::FromStr;

/// Assembly strategies controlling instance identity and caching
///
/// # Strategy Characteristics
///
/// - **Prototype**: a new object on every assembly, never cached
/// - **Singleton**: one object per assembler until `clear_singletons`
/// - **Borg**: a new object on every assembly, all sharing one state record
/// - **Weakref**: the same object for as long as someone else holds it
///
/// Definitions store the strategy by name; the name is parsed when the
/// component is assembled, so an unknown name surfaces from `assemble`.
///
/// # Examples
///
/// ```rust
/// use ferrous_assembler::Strategy;
///
/// assert_eq!("borg".parse::<Strategy>(), Ok(Strategy::Borg));
/// assert!("flyweight".parse::<Strategy>().is_err());
/// assert_eq!(Strategy::Weakref.as_str(), "weakref");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Strategy {
    /// New object per assembly, never cached
    #[default]
    Prototype,
    /// Single object per assembler, cached until explicitly evicted
    Singleton,
    /// New object per assembly, internal state aliased to one cached record
    Borg,
    /// Cached through a weak handle; reclaimed once nobody else holds it
    Weakref,
}

impl Strategy {
    /// All strategies, in declaration order.
    pub const ALL: [Strategy; 4] = [
        Strategy::Prototype,
        Strategy::Singleton,
        Strategy::Borg,
        Strategy::Weakref,
    ];

    /// The canonical name used in definitions.
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Prototype => "prototype",
            Strategy::Singleton => "singleton",
            Strategy::Borg => "borg",
            Strategy::Weakref => "weakref",
        }
    }

    /// Whether objects of this strategy are held in a cache.
    pub fn is_cached(&self) -> bool {
        !matches!(self, Strategy::Prototype)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unrecognized strategy name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStrategy(pub String);

impl FromStr for Strategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Strategy::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == s)
            .ok_or_else(|| UnknownStrategy(s.to_string()))
    }
}

impl From<Strategy> for String {
    fn from(strategy: Strategy) -> Self {
        strategy.as_str().to_string()
    }
}
