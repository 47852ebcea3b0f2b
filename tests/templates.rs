use ferrous_assembler::{
    Assembler, BoxError, Component, Declare, DiError, Managed, Registry, StaticLoader, Template, Value,
};
use parking_lot::Mutex;

#[derive(Default)]
struct Record {
    positional: Vec<Value>,
    keywords: Vec<(String, Value)>,
    attributes: Mutex<Vec<(String, Value)>>,
    hooks: Mutex<Vec<&'static str>>,
}

impl Managed for Record {
    fn set_attribute(&self, name: &str, value: Value) -> Result<(), ferrous_assembler::AttributeError> {
        self.attributes.lock().push((name.to_string(), value));
        Ok(())
    }

    fn call_lifecycle(&self, method: &str) -> Option<Result<(), BoxError>> {
        let name = match method {
            "template_init" => "template_init",
            "component_init" => "component_init",
            "registry_init" => "registry_init",
            _ => return None,
        };
        self.hooks.lock().push(name);
        Some(Ok(()))
    }
}

fn loader() -> StaticLoader {
    let mut loader = StaticLoader::new();
    loader.register_fn("Record", |args| {
        Ok(Record {
            positional: args.positional,
            keywords: args.keywords.into_iter().collect(),
            ..Record::default()
        })
    });
    loader
}

fn registry() -> Registry {
    let mut registry = Registry::new("ctx").with_after_inject("registry_init");
    registry
        .register(
            Template::new("base")
                .arg("base-arg")
                .keyword("colour", "red")
                .keyword("size", 1)
                .attribute("a", "base")
                .attribute("b", "base")
                .after_inject("template_init"),
        )
        .unwrap();
    registry
        .register(
            Component::new("child")
                .factory("Record")
                .parent("base")
                .arg("child-arg")
                .keyword("colour", "blue")
                .attribute("b", "child")
                .attribute("c", "child"),
        )
        .unwrap();
    registry
}

#[test]
fn test_component_inherits_from_its_template() {
    let assembler = Assembler::new(registry(), loader());
    let record = assembler.assemble_as::<Record>("child").unwrap();

    assert_eq!(record.positional, vec![Value::from("base-arg"), Value::from("child-arg")]);
    assert_eq!(
        record.keywords,
        vec![
            ("colour".to_string(), Value::from("blue")),
            ("size".to_string(), Value::Int(1)),
        ]
    );
    assert_eq!(
        *record.attributes.lock(),
        vec![
            ("a".to_string(), Value::from("base")),
            ("b".to_string(), Value::from("child")),
            ("c".to_string(), Value::from("child")),
        ]
    );
}

#[test]
fn test_hook_name_lookup_prefers_the_most_specific_level() {
    let mut registry = registry();
    registry
        .register(
            Component::new("own")
                .factory("Record")
                .parent("base")
                .after_inject("component_init"),
        )
        .unwrap();
    registry.register(Component::new("orphan").factory("Record")).unwrap();
    let assembler = Assembler::new(registry, loader());

    let child = assembler.assemble_as::<Record>("child").unwrap();
    assert_eq!(*child.hooks.lock(), vec!["template_init"]);

    let own = assembler.assemble_as::<Record>("own").unwrap();
    assert_eq!(*own.hooks.lock(), vec!["component_init"]);

    let orphan = assembler.assemble_as::<Record>("orphan").unwrap();
    assert_eq!(*orphan.hooks.lock(), vec!["registry_init"]);
}

#[test]
fn test_templates_cannot_be_assembled() {
    let assembler = Assembler::new(registry(), loader());
    assert!(matches!(assembler.assemble("base").err(), Some(DiError::NotConstructible(_))));
}

#[test]
fn test_parent_cycles_are_reported_instead_of_looping() {
    let mut registry = Registry::new("ctx");
    registry.register(Template::new("left").parent("right")).unwrap();
    registry.register(Template::new("right").parent("left")).unwrap();
    registry
        .register(Component::new("stuck").factory("Record").parent("left"))
        .unwrap();
    let assembler = Assembler::new(registry, loader());

    match assembler.assemble("stuck").err() {
        Some(DiError::ParentCycle { id, chain }) => {
            assert_eq!(id, "stuck");
            assert_eq!(chain, ["stuck", "left", "right", "left"]);
        }
        other => panic!("expected parent cycle, got {other:?}"),
    }
}

#[test]
fn test_registry_replace_before_building() {
    let mut registry = registry();
    registry.replace(Component::new("child").factory("Record").arg("replaced"));
    let assembler = Assembler::new(registry, loader());

    let record = assembler.assemble_as::<Record>("child").unwrap();
    assert_eq!(record.positional, vec![Value::from("replaced")]);
    assert_eq!(*record.hooks.lock(), vec!["registry_init"]);
}
