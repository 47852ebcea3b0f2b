//! Template and component definitions.

use indexmap::IndexMap;

use crate::strategy::Strategy;
use crate::value::Value;

/// Reusable set of dependencies and lifecycle hook names.
///
/// Templates are never assembled themselves. Components (and other
/// templates) name one as their parent to inherit its arguments, attributes
/// and hooks.
///
/// # Examples
///
/// ```rust
/// use ferrous_assembler::{Declare, Template};
///
/// let base = Template::new("base-finder")
///     .keyword("encoding", "utf-8")
///     .attribute("cache", true)
///     .after_inject("open");
///
/// assert_eq!(base.id(), "base-finder");
/// assert_eq!(base.after_inject_name(), Some("open"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Template {
    pub(crate) id: String,
    pub(crate) parent_id: Option<String>,
    pub(crate) args: Vec<Value>,
    pub(crate) keywords: IndexMap<String, Value>,
    pub(crate) attributes: IndexMap<String, Value>,
    pub(crate) after_inject: Option<String>,
    pub(crate) before_clear: Option<String>,
}

impl Template {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn keywords(&self) -> &IndexMap<String, Value> {
        &self.keywords
    }

    pub fn attributes(&self) -> &IndexMap<String, Value> {
        &self.attributes
    }

    pub fn after_inject_name(&self) -> Option<&str> {
        self.after_inject.as_deref()
    }

    pub fn before_clear_name(&self) -> Option<&str> {
        self.before_clear.as_deref()
    }
}

/// How a component obtains its object from the loaded factory specification.
///
/// The three modes are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Creation {
    /// Call the loaded factory with the resolved arguments
    #[default]
    Construct,
    /// Walk a dotted member path from the loaded specification to a factory, then call it
    FactoryMember(String),
    /// Walk a dotted member path and use the object found there; nothing is constructed
    ///
    /// The member must be an object. An assembled value is always an
    /// [`Instance`](crate::managed::Instance), which cannot carry a factory, so a
    /// member that loads to a factory is rejected with a specification error
    /// instead of being injected uncalled. Expose the callable as a [`Managed`]
    /// object if it has to be injected.
    ///
    /// [`Managed`]: crate::managed::Managed
    DataMember(String),
}

impl Creation {
    /// The dotted member path, if any.
    pub fn member_path(&self) -> Option<&str> {
        match self {
            Creation::Construct => None,
            Creation::FactoryMember(path) | Creation::DataMember(path) => Some(path),
        }
    }
}

/// A template that can also be assembled.
///
/// The factory specification defaults to the component identifier, and the
/// strategy to `"prototype"`. The strategy is kept by name and only parsed
/// when the component is assembled.
///
/// # Examples
///
/// ```rust
/// use ferrous_assembler::{Component, Declare, Reference, Strategy};
///
/// let lister = Component::new("movies.lister")
///     .factory("movies::MovieLister")
///     .strategy(Strategy::Singleton)
///     .parent("base")
///     .arg(Reference::to("movies.finder"));
///
/// assert_eq!(lister.factory_spec(), "movies::MovieLister");
/// assert_eq!(lister.strategy_name(), "singleton");
/// assert_eq!(lister.parent_id(), Some("base"));
/// ```
#[derive(Debug, Clone)]
pub struct Component {
    pub(crate) template: Template,
    pub(crate) factory_spec: String,
    pub(crate) creation: Creation,
    pub(crate) strategy: String,
}

impl Component {
    pub fn new(id: impl Into<String>) -> Self {
        let template = Template::new(id);
        Self {
            factory_spec: template.id.clone(),
            template,
            creation: Creation::Construct,
            strategy: Strategy::Prototype.into(),
        }
    }

    /// Sets the specification handed to the loader.
    pub fn factory(mut self, spec: impl Into<String>) -> Self {
        self.factory_spec = spec.into();
        self
    }

    /// Creates objects through the factory found at `path` under the specification.
    pub fn factory_member(mut self, path: impl Into<String>) -> Self {
        self.creation = Creation::FactoryMember(path.into());
        self
    }

    /// Uses the object found at `path` under the specification as-is.
    pub fn data_member(mut self, path: impl Into<String>) -> Self {
        self.creation = Creation::DataMember(path.into());
        self
    }

    /// Sets the assembly strategy by value or by name.
    pub fn strategy(mut self, strategy: impl Into<String>) -> Self {
        self.strategy = strategy.into();
        self
    }

    pub fn factory_spec(&self) -> &str {
        &self.factory_spec
    }

    pub fn creation(&self) -> &Creation {
        &self.creation
    }

    pub fn strategy_name(&self) -> &str {
        &self.strategy
    }

    /// The template part of this component.
    pub fn template(&self) -> &Template {
        &self.template
    }
}

impl std::ops::Deref for Component {
    type Target = Template;

    fn deref(&self) -> &Template {
        &self.template
    }
}

/// A registry entry: either a template or a constructible component.
#[derive(Debug, Clone)]
pub enum Definition {
    Template(Template),
    Component(Component),
}

impl Definition {
    pub fn id(&self) -> &str {
        &self.template().id
    }

    /// The dependency and hook declarations shared by both kinds.
    pub fn template(&self) -> &Template {
        match self {
            Definition::Template(template) => template,
            Definition::Component(component) => &component.template,
        }
    }

    pub fn as_component(&self) -> Option<&Component> {
        match self {
            Definition::Component(component) => Some(component),
            Definition::Template(_) => None,
        }
    }

    pub fn is_component(&self) -> bool {
        matches!(self, Definition::Component(_))
    }
}

impl From<Template> for Definition {
    fn from(template: Template) -> Self {
        Definition::Template(template)
    }
}

impl From<Component> for Definition {
    fn from(component: Component) -> Self {
        Definition::Component(component)
    }
}

/// Declaration methods shared by [`Template`] and [`Component`].
pub trait Declare: Sized {
    #[doc(hidden)]
    fn declarations(&mut self) -> &mut Template;

    /// Inherits defaults from the template or component `parent_id`.
    fn parent(mut self, parent_id: impl Into<String>) -> Self {
        self.declarations().parent_id = Some(parent_id.into());
        self
    }

    /// Appends a positional constructor argument.
    fn arg(mut self, value: impl Into<Value>) -> Self {
        self.declarations().args.push(value.into());
        self
    }

    /// Sets a keyword constructor argument.
    fn keyword(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.declarations().keywords.insert(name.into(), value.into());
        self
    }

    /// Declares an attribute to wire after construction. Order is kept.
    fn attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.declarations().attributes.insert(name.into(), value.into());
        self
    }

    /// Names the method called once the object is constructed and wired.
    fn after_inject(mut self, method: impl Into<String>) -> Self {
        self.declarations().after_inject = Some(method.into());
        self
    }

    /// Names the method called before a cached object is evicted.
    fn before_clear(mut self, method: impl Into<String>) -> Self {
        self.declarations().before_clear = Some(method.into());
        self
    }
}

impl Declare for Template {
    fn declarations(&mut self) -> &mut Template {
        self
    }
}

impl Declare for Component {
    fn declarations(&mut self) -> &mut Template {
        &mut self.template
    }
}
