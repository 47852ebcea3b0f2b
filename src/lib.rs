//! # ferrous-assembler
//!
//! Declarative object assembly for Rust: components are described in a
//! [`Registry`], and an [`Assembler`] builds them on request, wiring their
//! dependencies and managing their lifetimes.
//!
//! ## Features
//!
//! - **Assembly strategies**: prototype, singleton, borg (fresh identity, shared state) and weakref
//! - **References and evaluators**: dependencies resolved recursively through nested lists, tuples and maps
//! - **Templates**: reusable partial definitions merged along a parent chain
//! - **Lifecycle hooks**: after-inject and before-clear, resolved from component to registry default
//! - **Thread-safe**: per-strategy re-entrant caches and thread-local circular dependency detection
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use ferrous_assembler::{
//!     Assembler, Component, Declare, Managed, Reference, Registry, StaticLoader, Strategy,
//! };
//!
//! struct Y;
//! impl Managed for Y {}
//!
//! struct X {
//!     y: Arc<Y>,
//! }
//! impl Managed for X {}
//!
//! let mut loader = StaticLoader::new();
//! loader.register_fn("app.Y", |_| Ok(Y));
//! loader.register_fn("app.X", |args| {
//!     let y = args.required(0)?.downcast::<Y>().ok_or("expected a Y")?;
//!     Ok(X { y })
//! });
//!
//! let mut registry = Registry::new("app");
//! registry.register(Component::new("y").factory("app.Y")).unwrap();
//! registry
//!     .register(
//!         Component::new("x")
//!             .factory("app.X")
//!             .strategy(Strategy::Singleton)
//!             .arg(Reference::to("y")),
//!     )
//!     .unwrap();
//!
//! let assembler = Assembler::new(registry, loader);
//! let first = assembler.assemble_as::<X>("x").unwrap();
//! let second = assembler.assemble_as::<X>("x").unwrap();
//!
//! // The singleton is shared, and so is the prototype it captured.
//! assert!(Arc::ptr_eq(&first, &second));
//! assert!(Arc::ptr_eq(&first.y, &second.y));
//! ```
//!
//! ## Assembly Strategies
//!
//! - **Prototype**: a new object on every request
//! - **Singleton**: one object, cached until `clear_singletons`
//! - **Borg**: a new object every time, all aliasing one shared state until `clear_borgs`
//! - **Weakref**: the previous object while something else still holds it

// Module declarations
pub mod assembler;
pub mod cache;
pub mod config;
pub mod definition;
pub mod error;
pub mod lifecycle;
pub mod loader;
pub mod managed;
pub mod observer;
pub mod registry;
pub mod resolver;
pub mod strategy;
pub mod value;

// Internal modules
mod internal;

// Re-export core types
pub use assembler::{Assembler, AssemblerBuilder, Eviction};
pub use definition::{Component, Creation, Declare, Definition, Template};
pub use error::{BoxError, DiError, DiResult, Warning};
pub use lifecycle::LifecycleState;
pub use loader::{Constructible, Factory, FnFactory, Loader, StaticLoader};
pub use managed::{downcast_instance, AsAny, AttributeError, BorgState, Instance, Managed, SharedState};
pub use observer::{AssemblyObserver, MetricsObserver, TracingObserver};
pub use registry::{EffectiveComponent, Registry};
pub use resolver::{resolve, Assemble};
pub use strategy::{Strategy, UnknownStrategy};
pub use value::{Arguments, Deferred, Evaluator, Reference, Value};
