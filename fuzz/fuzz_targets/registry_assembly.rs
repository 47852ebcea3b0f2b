#![no_main]

use libfuzzer_sys::fuzz_target;
use ferrous_assembler::{
    Assembler, BorgState, Component, Declare, DiError, Managed, Reference, Registry, SharedState, StaticLoader,
    Strategy, Template,
};

#[derive(Default)]
struct Node {
    state: BorgState<u8>,
}

impl Managed for Node {
    fn shared_state(&self) -> Option<SharedState> {
        Some(self.state.share())
    }

    fn adopt_shared_state(&self, state: SharedState) -> bool {
        self.state.adopt(state)
    }
}

const IDS: usize = 8;

// Every 4-byte chunk declares one definition: kind, strategy, parent, reference.
fuzz_target!(|data: &[u8]| {
    let mut loader = StaticLoader::new();
    loader.register_fn("Node", |_| Ok(Node::default()));

    let mut registry = Registry::new("fuzz");
    for (n, chunk) in data.chunks_exact(4).take(IDS).enumerate() {
        let id = format!("n{n}");
        let strategy = Strategy::ALL[chunk[1] as usize % Strategy::ALL.len()];
        let parent = format!("n{}", chunk[2] as usize % IDS);
        let target = format!("n{}", chunk[3] as usize % IDS);

        let registered = match chunk[0] % 4 {
            0 => registry.register(Template::new(id).parent(parent).arg(Reference::to(target))),
            1 => registry.register(Component::new(id).factory("Node").strategy(strategy)),
            2 => registry.register(
                Component::new(id)
                    .factory("Node")
                    .strategy(strategy)
                    .arg(Reference::to(target)),
            ),
            _ => registry.register(
                Component::new(id)
                    .factory("Node")
                    .strategy(strategy)
                    .parent(parent)
                    .attribute("next", Reference::to(target)),
            ),
        };
        assert!(registered.is_ok());
    }

    let assembler = Assembler::new(registry, loader);
    for n in 0..IDS {
        let id = format!("n{n}");
        match assembler.assemble(&id) {
            Ok(_) => assert!(assembler.contains(&id)),
            Err(DiError::Circular(path)) => {
                assert!(path.len() >= 2);
                assert_eq!(path.first(), path.last());
            }
            Err(_) => {}
        }
    }

    let _ = assembler.init_singletons();
    let _ = assembler.init_borgs();
    let _ = assembler.clear_singletons();
    let _ = assembler.clear_borgs();
    let _ = assembler.clear_weakrefs();
});
