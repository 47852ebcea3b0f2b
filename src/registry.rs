//! Definition registry and template-chain merging.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::definition::{Component, Creation, Definition, Template};
use crate::error::{DiError, DiResult};
use crate::lifecycle::{first_declared, LifecycleState};
use crate::strategy::Strategy;
use crate::value::Value;

/// Maps identifiers to template and component definitions.
///
/// A registry also carries the least specific level of lifecycle hook names,
/// applied to every component that declares none of its own.
///
/// # Examples
///
/// ```rust
/// use ferrous_assembler::{Component, Registry, Strategy, Template};
///
/// let mut registry = Registry::new("movies").with_after_inject("init");
/// registry.register(Template::new("base")).unwrap();
/// registry.register(Component::new("lister").strategy(Strategy::Singleton)).unwrap();
///
/// assert!(registry.register(Template::new("base")).is_err());
/// assert!(registry.get("base").is_some());
/// assert!(registry.get_component("base").is_none());
/// assert_eq!(registry.iter_components(Some(Strategy::Singleton)).count(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Registry {
    id: String,
    definitions: IndexMap<String, Definition>,
    after_inject: Option<String>,
    before_clear: Option<String>,
}

/// A component with its template chain folded in.
///
/// Positional arguments of ancestors come first (most distant ancestor
/// first). Keyword arguments and attributes of more specific levels override
/// those of their ancestors; attribute order is first-declaration order.
#[derive(Debug, Clone)]
pub struct EffectiveComponent {
    pub id: String,
    pub factory_spec: String,
    pub creation: Creation,
    pub strategy: String,
    pub args: Vec<Value>,
    pub keywords: IndexMap<String, Value>,
    pub attributes: IndexMap<String, Value>,
    pub after_inject: Option<String>,
    pub before_clear: Option<String>,
}

impl EffectiveComponent {
    /// The resolved hook name for `state`.
    pub fn hook(&self, state: LifecycleState) -> Option<&str> {
        match state {
            LifecycleState::AfterInject => self.after_inject.as_deref(),
            LifecycleState::BeforeClear => self.before_clear.as_deref(),
        }
    }
}

impl Registry {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Sets the registry-wide after-construction hook name.
    pub fn with_after_inject(mut self, method: impl Into<String>) -> Self {
        self.after_inject = Some(method.into());
        self
    }

    /// Sets the registry-wide pre-eviction hook name.
    pub fn with_before_clear(mut self, method: impl Into<String>) -> Self {
        self.before_clear = Some(method.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn after_inject(&self) -> Option<&str> {
        self.after_inject.as_deref()
    }

    pub fn before_clear(&self) -> Option<&str> {
        self.before_clear.as_deref()
    }

    /// Fills registry-wide hook names that are still unset.
    pub(crate) fn default_hooks(&mut self, after_inject: Option<&str>, before_clear: Option<&str>) {
        if self.after_inject.is_none() {
            self.after_inject = after_inject.map(str::to_string);
        }
        if self.before_clear.is_none() {
            self.before_clear = before_clear.map(str::to_string);
        }
    }

    /// Adds a definition. Fails if the identifier is already registered.
    pub fn register(&mut self, definition: impl Into<Definition>) -> DiResult<()> {
        let definition = definition.into();
        if self.definitions.contains_key(definition.id()) {
            return Err(DiError::Duplicate(definition.id().to_string()));
        }
        self.definitions.insert(definition.id().to_string(), definition);
        Ok(())
    }

    /// Adds or replaces a definition, returning the one it displaced.
    pub fn replace(&mut self, definition: impl Into<Definition>) -> Option<Definition> {
        let definition = definition.into();
        self.definitions.insert(definition.id().to_string(), definition)
    }

    pub fn get(&self, id: &str) -> Option<&Definition> {
        self.definitions.get(id)
    }

    /// The component registered under `id`; `None` for templates.
    pub fn get_component(&self, id: &str) -> Option<&Component> {
        self.get(id).and_then(Definition::as_component)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.definitions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// All definitions in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Definition> {
        self.definitions.values()
    }

    /// Constructible definitions, optionally only those naming `strategy`.
    pub fn iter_components(&self, strategy: Option<Strategy>) -> impl Iterator<Item = &Component> {
        self.definitions
            .values()
            .filter_map(Definition::as_component)
            .filter(move |component| {
                strategy.map_or(true, |wanted| component.strategy_name() == wanted.as_str())
            })
    }

    /// The declarations of `template` followed by each ancestor's, most
    /// specific first. A parent identifier that is not registered ends the chain.
    pub fn chain<'a>(&'a self, template: &'a Template) -> DiResult<Vec<&'a Template>> {
        let mut chain = vec![template];
        let mut seen: HashSet<&str> = HashSet::from([template.id.as_str()]);
        let mut parent_id = template.parent_id.as_deref();
        while let Some(id) = parent_id {
            let Some(parent) = self.get(id).map(Definition::template) else {
                tracing::debug!(parent = id, child = %template.id, "parent definition not registered");
                break;
            };
            if !seen.insert(parent.id.as_str()) {
                let mut ids: Vec<String> = chain.iter().map(|t| t.id.clone()).collect();
                ids.push(parent.id.clone());
                return Err(DiError::ParentCycle {
                    id: template.id.clone(),
                    chain: ids,
                });
            }
            chain.push(parent);
            parent_id = parent.parent_id.as_deref();
        }
        Ok(chain)
    }

    /// Merges the component `id` with its template chain and the registry defaults.
    pub fn effective(&self, id: &str) -> DiResult<EffectiveComponent> {
        let component = match self.get(id) {
            None => return Err(DiError::NotFound(id.to_string())),
            Some(Definition::Template(_)) => return Err(DiError::NotConstructible(id.to_string())),
            Some(Definition::Component(component)) => component,
        };
        let chain = self.chain(&component.template)?;

        let mut args = Vec::new();
        let mut keywords = IndexMap::new();
        let mut attributes = IndexMap::new();
        for level in chain.iter().rev() {
            args.extend(level.args.iter().cloned());
            keywords.extend(level.keywords.iter().map(|(k, v)| (k.clone(), v.clone())));
            attributes.extend(level.attributes.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        let after_inject = first_declared(
            chain
                .iter()
                .map(|level| level.after_inject.as_deref())
                .chain([self.after_inject.as_deref()]),
        );
        let before_clear = first_declared(
            chain
                .iter()
                .map(|level| level.before_clear.as_deref())
                .chain([self.before_clear.as_deref()]),
        );

        Ok(EffectiveComponent {
            id: component.template.id.clone(),
            factory_spec: component.factory_spec.clone(),
            creation: component.creation.clone(),
            strategy: component.strategy.clone(),
            args,
            keywords,
            attributes,
            after_inject,
            before_clear,
        })
    }

    #[cfg(feature = "diagnostics")]
    pub fn to_debug_string(&self) -> String {
        let mut s = format!("=== Registry {:?} ===\n", self.id);
        for definition in self.iter() {
            match definition {
                Definition::Template(t) => {
                    s.push_str(&format!("  template {:?} parent={:?}\n", t.id, t.parent_id))
                }
                Definition::Component(c) => s.push_str(&format!(
                    "  component {:?} spec={:?} strategy={} parent={:?}\n",
                    c.id(),
                    c.factory_spec,
                    c.strategy,
                    c.parent_id()
                )),
            }
        }
        s
    }
}
