/// Concurrent access integration tests
///
/// These tests verify that one assembler shared between threads constructs
/// each singleton and borg state once, and that cycle detection never mixes
/// up the assembly stacks of different threads.

use ferrous_assembler::{
    Assembler, BorgState, Component, Declare, DiError, Managed, Reference, Registry, SharedState, StaticLoader,
    Strategy,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

const THREADS: usize = 8;

struct Slow {
    ticket: usize,
}
impl Managed for Slow {}

#[derive(Default)]
struct Tally {
    count: BorgState<usize>,
}

impl Managed for Tally {
    fn shared_state(&self) -> Option<SharedState> {
        Some(self.count.share())
    }

    fn adopt_shared_state(&self, state: SharedState) -> bool {
        self.count.adopt(state)
    }
}

fn slow_assembler(constructions: Arc<AtomicUsize>) -> Assembler {
    let mut loader = StaticLoader::new();
    let counter = constructions.clone();
    loader.register_fn("Slow", move |_| {
        let ticket = counter.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        Ok(Slow { ticket })
    });
    loader.register_fn("Tally", move |_| {
        constructions.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        Ok(Tally::default())
    });

    let mut registry = Registry::new("concurrent");
    registry
        .register(Component::new("singleton").factory("Slow").strategy(Strategy::Singleton))
        .unwrap();
    registry
        .register(Component::new("borg").factory("Tally").strategy(Strategy::Borg))
        .unwrap();
    Assembler::new(registry, loader)
}

#[test]
fn test_singleton_is_constructed_once_under_contention() {
    let constructions = Arc::new(AtomicUsize::new(0));
    let assembler = slow_assembler(constructions.clone());
    let barrier = Barrier::new(THREADS);

    let results: Vec<Arc<Slow>> = crossbeam_utils::thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let assembler = &assembler;
                let barrier = &barrier;
                s.spawn(move |_| {
                    barrier.wait();
                    assembler.assemble_as::<Slow>("singleton").unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
    .unwrap();

    assert_eq!(constructions.load(Ordering::SeqCst), 1);
    assert!(results.iter().all(|slow| Arc::ptr_eq(slow, &results[0])));
    assert_eq!(results[0].ticket, 0);
}

#[test]
fn test_borg_state_is_created_once_and_shared_by_all_threads() {
    let constructions = Arc::new(AtomicUsize::new(0));
    let assembler = slow_assembler(constructions.clone());
    let barrier = Barrier::new(THREADS);

    crossbeam_utils::thread::scope(|s| {
        for _ in 0..THREADS {
            let assembler = &assembler;
            let barrier = &barrier;
            s.spawn(move |_| {
                barrier.wait();
                let tally = assembler.assemble_as::<Tally>("borg").unwrap();
                tally.count.with_mut(|count| *count += 1);
            });
        }
    })
    .unwrap();

    // Tally's factory offers no allocate, so every hit constructs; only the state is shared
    assert_eq!(constructions.load(Ordering::SeqCst), THREADS);
    let observer = assembler.assemble_as::<Tally>("borg").unwrap();
    assert_eq!(observer.count.with(|count| *count), THREADS);
}

#[test]
fn test_no_false_cycles_across_threads() {
    // Every thread assembles the same chain at once. Stacks are per thread,
    // so seeing "a" in progress elsewhere must not be reported as a cycle.
    let mut loader = StaticLoader::new();
    loader.register_fn("Slow", |_| {
        thread::sleep(Duration::from_millis(5));
        Ok(Slow { ticket: 0 })
    });
    let mut registry = Registry::new("chain");
    registry
        .register(Component::new("a").factory("Slow").arg(Reference::to("b")))
        .unwrap();
    registry
        .register(Component::new("b").factory("Slow").arg(Reference::to("c")))
        .unwrap();
    registry.register(Component::new("c").factory("Slow")).unwrap();
    let assembler = Assembler::new(registry, loader);
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let assembler = assembler.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                (0..10).all(|_| assembler.assemble("a").is_ok())
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
}

#[test]
fn test_real_cycles_are_still_detected_on_every_thread() {
    let mut loader = StaticLoader::new();
    loader.register_fn("Slow", |_| Ok(Slow { ticket: 0 }));
    let mut registry = Registry::new("cycle");
    registry
        .register(Component::new("x").factory("Slow").arg(Reference::to("y")))
        .unwrap();
    registry
        .register(Component::new("y").factory("Slow").arg(Reference::to("x")))
        .unwrap();
    let assembler = Assembler::new(registry, loader);

    crossbeam_utils::thread::scope(|s| {
        for _ in 0..THREADS {
            let assembler = &assembler;
            s.spawn(move |_| match assembler.assemble("x").err() {
                Some(DiError::Circular(path)) => assert_eq!(path, ["x", "y", "x"]),
                other => panic!("expected circular dependency error, got {other:?}"),
            });
        }
    })
    .unwrap();
}

#[test]
fn test_eviction_while_assembling() {
    let constructions = Arc::new(AtomicUsize::new(0));
    let assembler = slow_assembler(constructions.clone());

    crossbeam_utils::thread::scope(|s| {
        let assembler = &assembler;
        s.spawn(move |_| {
            for _ in 0..5 {
                assembler.assemble("singleton").unwrap();
            }
        });
        s.spawn(move |_| {
            for _ in 0..5 {
                assembler.clear_singletons();
                thread::sleep(Duration::from_millis(5));
            }
        });
    })
    .unwrap();

    let constructed = constructions.load(Ordering::SeqCst);
    assert!((1..=5).contains(&constructed));
}
