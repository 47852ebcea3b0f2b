use ferrous_assembler::{
    Assembler, AssemblyObserver, AttributeError, Component, Constructible, Declare, Deferred, DiError,
    Evaluator, FnFactory, Managed, Reference, Registry, StaticLoader, Strategy, Template, Value, Warning,
};
use parking_lot::Mutex;
use std::error::Error as _;
use std::sync::Arc;
use std::time::Duration;

/// Records constructor arguments and wired attributes.
#[derive(Default)]
struct Recorder {
    positional: Vec<Value>,
    keywords: Vec<(String, Value)>,
    wired: Mutex<Vec<(String, Value)>>,
}

impl Managed for Recorder {
    fn set_attribute(&self, name: &str, value: Value) -> Result<(), AttributeError> {
        match name {
            "rejects" => Err(AttributeError::expected("nothing", &value)),
            "missing" => Err(AttributeError::NotFound),
            _ => {
                self.wired.lock().push((name.to_string(), value));
                Ok(())
            }
        }
    }
}

fn recorder_loader() -> StaticLoader {
    let mut loader = StaticLoader::new();
    loader.register_fn("recorder", |args| {
        Ok(Recorder {
            positional: args.positional,
            keywords: args.keywords.into_iter().collect(),
            ..Recorder::default()
        })
    });
    loader
}

#[derive(Default)]
struct WarningLog(Mutex<Vec<Warning>>);

impl AssemblyObserver for WarningLog {
    fn assembling(&self, _id: &str) {}

    fn assembled(&self, _id: &str, _strategy: Strategy, _duration: Duration) {}

    fn warning(&self, warning: &Warning) {
        self.0.lock().push(warning.clone());
    }
}

#[test]
fn test_contains_is_false_for_templates() {
    let mut registry = Registry::new("ctx");
    registry.register(Template::new("base")).unwrap();
    registry.register(Component::new("recorder").parent("base")).unwrap();
    let assembler = Assembler::new(registry, recorder_loader());

    assert!(assembler.contains("recorder"));
    assert!(!assembler.contains("base"));
    assert!(!assembler.contains("unknown"));
}

#[test]
fn test_lookup_failures() {
    let mut registry = Registry::new("ctx");
    registry.register(Template::new("base")).unwrap();
    let assembler = Assembler::new(registry, recorder_loader());

    assert!(matches!(assembler.assemble("unknown").err(), Some(DiError::NotFound(id)) if id == "unknown"));
    assert!(matches!(assembler.assemble("base").err(), Some(DiError::NotConstructible(id)) if id == "base"));
}

#[test]
fn test_factory_spec_defaults_to_the_identifier() {
    let mut registry = Registry::new("ctx");
    registry.register(Component::new("recorder").arg(1).keyword("name", "x")).unwrap();
    let assembler = Assembler::new(registry, recorder_loader());

    let recorder = assembler.assemble_as::<Recorder>("recorder").unwrap();
    assert_eq!(recorder.positional, vec![Value::Int(1)]);
    assert_eq!(recorder.keywords, vec![("name".to_string(), Value::from("x"))]);
}

#[test]
fn test_attributes_are_wired_in_declaration_order() {
    let mut registry = Registry::new("ctx");
    registry
        .register(
            Component::new("recorder")
                .attribute("zeta", 1)
                .attribute("alpha", 2)
                .attribute("mid", Deferred::new(|| Ok(Value::from("late")))),
        )
        .unwrap();
    let assembler = Assembler::new(registry, recorder_loader());

    let recorder = assembler.assemble_as::<Recorder>("recorder").unwrap();
    let wired = recorder.wired.lock();
    let names: Vec<&str> = wired.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, ["zeta", "alpha", "mid"]);
    assert_eq!(wired[2].1, Value::from("late"));
}

#[test]
fn test_attribute_wiring_failures_name_the_attribute() {
    for attribute in ["rejects", "missing"] {
        let mut registry = Registry::new("ctx");
        registry
            .register(Component::new("recorder").attribute(attribute, true))
            .unwrap();
        let assembler = Assembler::new(registry, recorder_loader());

        match assembler.assemble("recorder").err() {
            Some(DiError::AttributeWiring { id, attribute: name, .. }) => {
                assert_eq!(id, "recorder");
                assert_eq!(name, attribute);
            }
            other => panic!("expected attribute wiring error, got {other:?}"),
        }
    }
}

#[test]
fn test_construction_failures_carry_their_cause() {
    let mut loader = StaticLoader::new();
    loader.register_fn("broken", |_| -> Result<Recorder, _> { Err("disk on fire".into()) });
    let mut registry = Registry::new("ctx");
    registry.register(Component::new("broken")).unwrap();
    let assembler = Assembler::new(registry, loader);

    let error = assembler.assemble("broken").err().unwrap();
    assert!(matches!(error, DiError::Construction { ref id, .. } if id == "broken"));
    assert_eq!(error.source().unwrap().to_string(), "disk on fire");
}

#[test]
fn test_unresolvable_specifications() {
    let mut registry = Registry::new("ctx");
    registry.register(Component::new("ghost").factory("nowhere.Ghost")).unwrap();
    let assembler = Assembler::new(registry, recorder_loader());

    match assembler.assemble("ghost").err() {
        Some(DiError::Specification { spec, .. }) => assert_eq!(spec, "nowhere.Ghost"),
        other => panic!("expected specification error, got {other:?}"),
    }
}

#[test]
fn test_factory_member_is_called_with_arguments() {
    let outer = FnFactory::new(|_| Ok(Recorder::default())).with_member(
        "create",
        Constructible::factory(|args| {
            Ok(Recorder {
                positional: args.positional,
                ..Recorder::default()
            })
        }),
    );
    let mut loader = StaticLoader::new();
    loader.register("pkg.Outer", Constructible::Factory(Arc::new(outer)));

    let mut registry = Registry::new("ctx");
    registry
        .register(
            Component::new("made")
                .factory("pkg.Outer")
                .factory_member("create")
                .arg("through member"),
        )
        .unwrap();
    let assembler = Assembler::new(registry, loader);

    let made = assembler.assemble_as::<Recorder>("made").unwrap();
    assert_eq!(made.positional, vec![Value::from("through member")]);
}

#[test]
fn test_data_member_ignores_arguments_and_warns() {
    let shared: Arc<Recorder> = Arc::new(Recorder::default());
    let outer = FnFactory::new(|_| Ok(Recorder::default()))
        .with_member("DEFAULT", Constructible::Object(shared.clone()));
    let mut loader = StaticLoader::new();
    loader.register("pkg.Outer", Constructible::Factory(Arc::new(outer)));

    let mut registry = Registry::new("ctx");
    registry
        .register(
            Component::new("default")
                .factory("pkg.Outer")
                .data_member("DEFAULT")
                .arg("ignored")
                .attribute("colour", "blue"),
        )
        .unwrap();

    let warnings = Arc::new(WarningLog::default());
    let assembler = Assembler::builder(registry, loader).observer(warnings.clone()).build();

    let first = assembler.assemble_as::<Recorder>("default").unwrap();
    assert!(Arc::ptr_eq(&first, &shared));
    assert!(first.positional.is_empty());
    assert_eq!(first.wired.lock().len(), 1);

    let seen = warnings.0.lock();
    assert!(seen.contains(&Warning::MemberArguments {
        id: "default".into(),
        member: "DEFAULT".into(),
    }));
    assert!(seen.contains(&Warning::MemberWiring {
        id: "default".into(),
        member: "DEFAULT".into(),
    }));
}

#[test]
fn test_objects_are_not_factories() {
    let mut loader = StaticLoader::new();
    loader.register_object("pkg.instance", Arc::new(Recorder::default()));
    let mut registry = Registry::new("ctx");
    registry.register(Component::new("bad").factory("pkg.instance")).unwrap();
    let assembler = Assembler::new(registry, loader);

    assert!(matches!(assembler.assemble("bad").err(), Some(DiError::Specification { .. })));
}

#[test]
fn test_data_member_must_be_an_object() {
    let outer = FnFactory::new(|_| Ok(Recorder::default()))
        .with_member("create", Constructible::factory(|_| Ok(Recorder::default())));
    let mut loader = StaticLoader::new();
    loader.register("pkg.Outer", Constructible::Factory(Arc::new(outer)));
    let mut registry = Registry::new("ctx");
    registry
        .register(Component::new("callable").factory("pkg.Outer").data_member("create"))
        .unwrap();
    let assembler = Assembler::new(registry, loader);

    match assembler.assemble("callable").err() {
        Some(DiError::Specification { spec, .. }) => assert_eq!(spec, "pkg.Outer.create"),
        other => panic!("expected specification error, got {other:?}"),
    }
}

#[test]
fn test_typed_retrieval_mismatch() {
    struct Other;
    impl Managed for Other {}

    let mut registry = Registry::new("ctx");
    registry.register(Component::new("recorder")).unwrap();
    let assembler = Assembler::new(registry, recorder_loader());

    match assembler.assemble_as::<Other>("recorder").err() {
        Some(DiError::TypeMismatch { id, expected }) => {
            assert_eq!(id, "recorder");
            assert!(expected.ends_with("Other"));
        }
        other => panic!("expected type mismatch, got {other:?}"),
    }
}

#[test]
fn test_evaluators_receive_resolved_arguments() {
    let mut registry = Registry::new("ctx");
    registry.register(Component::new("dep").factory("recorder").arg(7)).unwrap();
    registry
        .register(
            Component::new("recorder").arg(
                Evaluator::new("first_arg_of", |args| {
                    let dep = args.required(0)?.downcast::<Recorder>().ok_or("expected a recorder")?;
                    Ok(dep.positional[0].clone())
                })
                .arg(Reference::to("dep")),
            ),
        )
        .unwrap();
    let assembler = Assembler::new(registry, recorder_loader());

    let recorder = assembler.assemble_as::<Recorder>("recorder").unwrap();
    assert_eq!(recorder.positional, vec![Value::Int(7)]);
}

#[test]
fn test_failing_evaluators_surface_as_evaluation_errors() {
    let mut registry = Registry::new("ctx");
    registry
        .register(Component::new("recorder").keyword(
            "value",
            Evaluator::new("explode", |_| Err("boom".into())),
        ))
        .unwrap();
    let assembler = Assembler::new(registry, recorder_loader());

    match assembler.assemble("recorder").err() {
        Some(DiError::Evaluation { target, source }) => {
            assert!(target.contains("explode"));
            assert_eq!(source.to_string(), "boom");
        }
        other => panic!("expected evaluation error, got {other:?}"),
    }
}
