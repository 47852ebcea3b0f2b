use ferrous_assembler::config::AssemblerConfig;
use ferrous_assembler::{
    Assembler, AssemblyObserver, BoxError, Component, Declare, DiError, LifecycleState, Managed, MetricsObserver,
    Registry, StaticLoader, Strategy, TracingObserver, Warning,
};
use parking_lot::Mutex;
use std::error::Error as _;
use std::sync::Arc;
use std::time::Duration;

/// Shared journal of hook invocations, in call order.
type Journal = Arc<Mutex<Vec<String>>>;

struct Resource {
    name: String,
    journal: Journal,
}

impl Managed for Resource {
    fn call_lifecycle(&self, method: &str) -> Option<Result<(), BoxError>> {
        match method {
            "open" | "close" => {
                self.journal.lock().push(format!("{method} {}", self.name));
                Some(Ok(()))
            }
            "fail" => Some(Err(format!("{} refused", self.name).into())),
            _ => None,
        }
    }
}

fn loader(journal: &Journal) -> StaticLoader {
    let journal = journal.clone();
    let mut loader = StaticLoader::new();
    loader.register_fn("Resource", move |args| {
        Ok(Resource {
            name: args.required(0)?.as_str().ok_or("name must be a string")?.to_string(),
            journal: journal.clone(),
        })
    });
    loader
}

fn resource(id: &str, strategy: Strategy) -> Component {
    Component::new(id).factory("Resource").strategy(strategy).arg(id)
}

/// Routes this test's log output through the test harness.
fn capture_logs() -> tracing::subscriber::DefaultGuard {
    tracing::subscriber::set_default(
        tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter("ferrous_assembler=debug")
            .finish(),
    )
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
fn test_after_inject_runs_once_per_construction() {
    let journal = Journal::default();
    let mut registry = Registry::new("ctx");
    registry
        .register(resource("single", Strategy::Singleton).after_inject("open"))
        .unwrap();
    registry
        .register(resource("proto", Strategy::Prototype).after_inject("open"))
        .unwrap();
    let assembler = Assembler::new(registry, loader(&journal));

    for _ in 0..2 {
        assembler.assemble("single").unwrap();
        assembler.assemble("proto").unwrap();
    }
    assert_eq!(
        *journal.lock(),
        vec!["open single", "open proto", "open proto"]
    );
}

#[test]
fn test_borg_without_shared_state_fails_before_hooks() {
    let journal = Journal::default();
    let mut registry = Registry::new("ctx");
    registry
        .register(resource("borg", Strategy::Borg).after_inject("open"))
        .unwrap();
    let assembler = Assembler::new(registry, loader(&journal));

    assert!(matches!(assembler.assemble("borg").err(), Some(DiError::NotBorgCapable(_))));
    assert!(journal.lock().is_empty());
    assert!(assembler.clear_borgs().is_empty());
}

#[test]
fn test_missing_hooks_only_warn() {
    let _logs = capture_logs();
    let journal = Journal::default();
    let mut registry = Registry::new("ctx");
    registry
        .register(resource("quiet", Strategy::Singleton).after_inject("nonexistent"))
        .unwrap();
    let warnings = Arc::new(WarningLog::default());
    let assembler = Assembler::builder(registry, loader(&journal))
        .observer(warnings.clone())
        .observer(Arc::new(TracingObserver::new()))
        .build();

    assert!(assembler.assemble("quiet").is_ok());
    assert_eq!(
        *warnings.0.lock(),
        vec![Warning::MissingHook {
            id: "quiet".into(),
            state: LifecycleState::AfterInject,
            method: "nonexistent".into(),
        }]
    );
}

#[test]
fn test_after_inject_failure_propagates_and_is_not_cached() {
    let journal = Journal::default();
    let mut registry = Registry::new("ctx");
    registry
        .register(resource("fragile", Strategy::Singleton).after_inject("fail"))
        .unwrap();
    let assembler = Assembler::new(registry, loader(&journal));

    let error = assembler.assemble("fragile").err().unwrap();
    match &error {
        DiError::LifecycleHook { id, state, method, .. } => {
            assert_eq!(id, "fragile");
            assert_eq!(*state, LifecycleState::AfterInject);
            assert_eq!(method, "fail");
        }
        other => panic!("expected lifecycle hook error, got {other:?}"),
    }
    assert_eq!(error.source().unwrap().to_string(), "fragile refused");
    assert!(assembler.clear_singletons().is_empty());
}

#[test]
fn test_before_clear_runs_for_every_evicted_singleton() {
    let journal = Journal::default();
    let mut registry = Registry::new("ctx").with_before_clear("close");
    registry.register(resource("first", Strategy::Singleton)).unwrap();
    registry.register(resource("second", Strategy::Singleton)).unwrap();
    registry.register(resource("proto", Strategy::Prototype)).unwrap();
    let assembler = Assembler::new(registry, loader(&journal));

    assembler.assemble("second").unwrap();
    assembler.assemble("first").unwrap();
    assembler.assemble("proto").unwrap();

    assert_eq!(assembler.clear_singletons(), vec!["second".to_string(), "first".to_string()]);
    assert_eq!(*journal.lock(), vec!["close second", "close first"]);
    assert!(assembler.clear_singletons().is_empty());
    assert_eq!(journal.lock().len(), 2);
}

#[test]
fn test_eviction_continues_past_failing_hooks() {
    let _logs = capture_logs();
    let journal = Journal::default();
    let mut registry = Registry::new("ctx");
    registry
        .register(resource("bad", Strategy::Singleton).before_clear("fail"))
        .unwrap();
    registry
        .register(resource("good", Strategy::Singleton).before_clear("close"))
        .unwrap();
    let metrics = Arc::new(MetricsObserver::new());
    let assembler = Assembler::builder(registry, loader(&journal))
        .observer(metrics.clone())
        .build();
    assert_eq!(assembler.init_singletons().unwrap(), vec!["bad".to_string(), "good".to_string()]);

    let eviction = assembler.evict(Strategy::Singleton);
    assert_eq!(eviction.evicted, vec!["bad".to_string(), "good".to_string()]);
    assert_eq!(eviction.failures.len(), 1);
    assert_eq!(eviction.failures[0].0, "bad");
    assert_eq!(eviction.failures[0].1.to_string(), "bad refused");
    assert_eq!(*journal.lock(), vec!["close good"]);
    assert_eq!(metrics.evictions(), 2);
    assert_eq!(metrics.warnings(), 1);
}

#[test]
fn test_dead_weakrefs_are_dropped_without_hooks_or_report() {
    let journal = Journal::default();
    let mut registry = Registry::new("ctx");
    registry
        .register(resource("alive", Strategy::Weakref).before_clear("close"))
        .unwrap();
    registry
        .register(resource("gone", Strategy::Weakref).before_clear("close"))
        .unwrap();
    let assembler = Assembler::new(registry, loader(&journal));

    let _alive = assembler.assemble("alive").unwrap();
    drop(assembler.assemble("gone").unwrap());

    assert_eq!(assembler.clear_weakrefs(), vec!["alive".to_string()]);
    assert_eq!(*journal.lock(), vec!["close alive"]);
    assert!(assembler.clear_weakrefs().is_empty());
}

#[test]
fn test_dead_weakrefs_are_not_counted_as_evictions() {
    let journal = Journal::default();
    let mut registry = Registry::new("ctx");
    registry.register(resource("gone", Strategy::Weakref)).unwrap();
    let metrics = Arc::new(MetricsObserver::new());
    let assembler = Assembler::builder(registry, loader(&journal))
        .observer(metrics.clone())
        .build();

    drop(assembler.assemble("gone").unwrap());
    let eviction = assembler.evict(Strategy::Weakref);
    assert!(eviction.evicted.is_empty());
    assert!(eviction.failures.is_empty());
    assert_eq!(metrics.evictions(), 0);

    // the entry is gone, so the next assembly constructs afresh
    let _again = assembler.assemble("gone").unwrap();
    assert_eq!(assembler.clear_weakrefs(), vec!["gone".to_string()]);
}

#[test]
fn test_configured_default_hooks_fill_registry_gaps() {
    let journal = Journal::default();
    let mut registry = Registry::new("ctx").with_before_clear("close");
    registry.register(resource("res", Strategy::Singleton)).unwrap();
    let config = AssemblerConfig {
        default_after_inject: Some("open".into()),
        default_before_clear: Some("fail".into()),
        ..AssemblerConfig::default()
    };
    let assembler = Assembler::builder(registry, loader(&journal)).config(config).build();

    assert_eq!(assembler.registry().after_inject(), Some("open"));
    assert_eq!(assembler.registry().before_clear(), Some("close"));

    assembler.assemble("res").unwrap();
    assembler.clear_singletons();
    assert_eq!(*journal.lock(), vec!["open res", "close res"]);
}
