#![no_main]

use libfuzzer_sys::fuzz_target;
use subgraph_core::{Container, GraphConfig, GraphSnapshot, NullSink};

// Arbitrary JSON must either be rejected or restore into a consistent graph.
fuzz_target!(|data: &[u8]| {
    let Ok(snapshot) = serde_json::from_slice::<GraphSnapshot>(data) else {
        return;
    };
    let container = Container::new(GraphConfig::default().with_identity_checks(false), NullSink);
    let objects: Vec<_> = snapshot.entries.iter().map(|_| container.track()).collect();
    let mut next = objects.iter();
    let _ = snapshot.restore(container.subscriptions(), |_| next.next().map(|t| t.id()));
    assert!(container.subscriptions().is_consistent());
});
