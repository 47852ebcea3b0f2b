//! Object construction: loading, argument resolution, wiring and the
//! after-inject hook.

use indexmap::IndexMap;

use crate::definition::Creation;
use crate::error::{DiError, DiResult, Warning};
use crate::lifecycle::{dispatch, HookOutcome, LifecycleState};
use crate::loader::{Constructible, Factory};
use crate::managed::Instance;
use crate::registry::EffectiveComponent;
use crate::resolver::resolve;
use crate::value::Arguments;

use super::Assembler;

impl Assembler {
    /// Initializes, wires and runs the after-inject hook.
    pub(crate) fn create(&self, definition: &EffectiveComponent) -> DiResult<Instance> {
        let instance = self.initialize(definition)?;
        self.finish(definition, &instance)?;
        Ok(instance)
    }

    /// Wires an initialized object and runs its after-inject hook.
    pub(crate) fn finish(&self, definition: &EffectiveComponent, instance: &Instance) -> DiResult<()> {
        self.wire(definition, instance)?;
        self.after_inject(definition, instance)?;
        tracing::info!(id = %definition.id, "constructed");
        Ok(())
    }

    /// What the factory specification (and member path, if any) loads to.
    pub(crate) fn load(&self, definition: &EffectiveComponent) -> DiResult<Constructible> {
        let base = self.inner().loader.resolve(&definition.factory_spec)?;
        match definition.creation.member_path() {
            Some(path) => base.walk(&definition.factory_spec, path),
            None => Ok(base),
        }
    }

    /// Creates the object without wiring it.
    pub(crate) fn initialize(&self, definition: &EffectiveComponent) -> DiResult<Instance> {
        let target = self.load(definition)?;
        match &definition.creation {
            Creation::Construct | Creation::FactoryMember(_) => {
                let factory = as_factory(definition, target)?;
                self.construct(definition, factory.as_ref())
            }
            Creation::DataMember(member) => {
                if !definition.args.is_empty() || !definition.keywords.is_empty() {
                    self.warn(Warning::MemberArguments {
                        id: definition.id.clone(),
                        member: member.clone(),
                    });
                }
                match target {
                    Constructible::Object(object) => Ok(object),
                    Constructible::Factory(_) => Err(DiError::Specification {
                        spec: format!("{}.{member}", definition.factory_spec),
                        reason: "member is a factory, not an object".to_string(),
                    }),
                }
            }
        }
    }

    /// Calls `factory` with the resolved constructor arguments.
    pub(crate) fn construct(&self, definition: &EffectiveComponent, factory: &dyn Factory) -> DiResult<Instance> {
        let args = self.arguments(definition)?;
        factory
            .construct(args)
            .map_err(|source| DiError::construction(&definition.id, source))
    }

    fn arguments(&self, definition: &EffectiveComponent) -> DiResult<Arguments> {
        let positional = definition
            .args
            .iter()
            .map(|arg| resolve(arg, self))
            .collect::<DiResult<Vec<_>>>()?;
        let mut keywords = IndexMap::with_capacity(definition.keywords.len());
        for (name, raw) in &definition.keywords {
            keywords.insert(name.clone(), resolve(raw, self)?);
        }
        Ok(Arguments::new(positional, keywords))
    }

    /// Resolves and sets each declared attribute in declaration order.
    fn wire(&self, definition: &EffectiveComponent, instance: &Instance) -> DiResult<()> {
        if definition.attributes.is_empty() {
            return Ok(());
        }
        if let Creation::DataMember(member) = &definition.creation {
            self.warn(Warning::MemberWiring {
                id: definition.id.clone(),
                member: member.clone(),
            });
        }
        for (name, raw) in &definition.attributes {
            let value = resolve(raw, self)?;
            instance
                .set_attribute(name, value)
                .map_err(|error| DiError::AttributeWiring {
                    id: definition.id.clone(),
                    attribute: name.clone(),
                    reason: error.to_string(),
                })?;
        }
        Ok(())
    }

    fn after_inject(&self, definition: &EffectiveComponent, instance: &Instance) -> DiResult<()> {
        let state = LifecycleState::AfterInject;
        match dispatch(instance, definition.hook(state)) {
            HookOutcome::Undeclared => Ok(()),
            HookOutcome::Called(method) => {
                tracing::debug!(id = %definition.id, method = %method, "after_inject called");
                Ok(())
            }
            HookOutcome::Missing(method) => {
                self.warn(Warning::MissingHook {
                    id: definition.id.clone(),
                    state,
                    method,
                });
                Ok(())
            }
            HookOutcome::Failed(method, source) => Err(DiError::LifecycleHook {
                id: definition.id.clone(),
                state,
                method,
                source,
            }),
        }
    }
}

pub(crate) fn as_factory(
    definition: &EffectiveComponent,
    target: Constructible,
) -> DiResult<std::sync::Arc<dyn Factory>> {
    match target {
        Constructible::Factory(factory) => Ok(factory),
        Constructible::Object(_) => Err(DiError::Specification {
            spec: match definition.creation.member_path() {
                Some(path) => format!("{}.{path}", definition.factory_spec),
                None => definition.factory_spec.clone(),
            },
            reason: "names an object, not a factory".to_string(),
        }),
    }
}
