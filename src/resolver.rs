//! Dependency resolution: raw definition values to concrete values.

use crate::error::{DiError, DiResult};
use crate::managed::Instance;
use crate::value::Value;

/// Object-safe assembly capability used during resolution.
///
/// [`Assembler`](crate::Assembler) is the production implementation; tests
/// and hosts may provide their own.
pub trait Assemble: Send + Sync {
    /// Assembles the component registered under `id`.
    fn assemble(&self, id: &str) -> DiResult<Instance>;
}

/// Resolves a raw dependency value into the value a factory or attribute receives.
///
/// - [`Reference`](crate::Reference): assembled through `assembler`
/// - [`Evaluator`](crate::Evaluator): arguments resolved, then the target is called
/// - [`Deferred`](crate::Deferred): called
/// - lists, tuples and maps: rebuilt with every element (and every mapping key) resolved
/// - anything else: returned unchanged
///
/// Nothing is cached here; every call resolves afresh. Mapping keys must
/// resolve to hashable values, otherwise [`DiError::Unhashable`] is returned.
///
/// # Examples
///
/// ```rust
/// use ferrous_assembler::{Assembler, Registry, StaticLoader, Value, resolve};
///
/// let assembler = Assembler::new(Registry::new("ctx"), StaticLoader::new());
/// let raw = Value::List(vec![Value::Int(1), Value::from("two")]);
/// assert_eq!(resolve(&raw, &assembler).unwrap(), raw);
/// ```
pub fn resolve(value: &Value, assembler: &dyn Assemble) -> DiResult<Value> {
    match value {
        Value::Reference(reference) => assembler.assemble(reference.id()).map(Value::Object),
        Value::Evaluator(evaluator) => evaluator.evaluate(assembler),
        Value::Deferred(deferred) => deferred.call(),
        Value::List(items) => resolve_all(items, assembler).map(Value::List),
        Value::Tuple(items) => resolve_all(items, assembler).map(Value::Tuple),
        Value::Map(entries) => {
            let mut resolved = Vec::with_capacity(entries.len());
            for (raw_key, raw_value) in entries {
                let key = resolve(raw_key, assembler)?;
                if !key.is_hashable() {
                    return Err(DiError::Unhashable(format!("{key:?}")));
                }
                let value = resolve(raw_value, assembler)?;
                Value::insert_entry(&mut resolved, key, value);
            }
            Ok(Value::Map(resolved))
        }
        other => Ok(other.clone()),
    }
}

fn resolve_all(items: &[Value], assembler: &dyn Assemble) -> DiResult<Vec<Value>> {
    items.iter().map(|item| resolve(item, assembler)).collect()
}
