//! Property-based invariant tests for the subscription graph.
//!
//! 1. Arbitrary operation sequences agree with the reference model, with
//!    identity checks on or off; proxy reads never register anything
//! 2. Releasing every object leaves no registrations, edges or host entries
//! 3. Repeating a read never changes what a notify delivers
//! 4. After disposal a consumer is unreachable from every object
//! 5. A key-set consumer is reached exactly by its keys and unqualified writes
//! 6. Snapshots taken mid-sequence restore to the same registrations

use proptest::prelude::*;
use subgraph_core::{Container, GraphConfig, GraphSnapshot, NullSink, ObjectId};
use subgraph_harness::ops::{KEYS, SUBSCRIBER_POOL, key, subscriber};
use subgraph_harness::{Driver, Op, RecordingSink, check_and_shrink};

// ── Strategies ───────────────────────────────────────────────────────

fn arb_key() -> impl Strategy<Value = Option<u8>> {
    prop_oneof![
        1 => Just(None),
        4 => (0..KEYS.len() as u8).prop_map(Some),
    ]
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        2 => Just(Op::Track),
        1 => any::<u8>().prop_map(|slot| Op::Release { slot }),
        6 => (any::<u8>(), 0..SUBSCRIBER_POOL, arb_key())
            .prop_map(|(slot, sub, key)| Op::Add { slot, sub, key }),
        1 => (any::<u8>(), 0..SUBSCRIBER_POOL, arb_key())
            .prop_map(|(slot, sub, key)| Op::AddViaProxy { slot, sub, key }),
        3 => (any::<u8>(), arb_key()).prop_map(|(slot, key)| Op::Notify { slot, key }),
        1 => (0..SUBSCRIBER_POOL).prop_map(|sub| Op::Clear { sub }),
    ]
}

fn arb_ops(max: usize) -> impl Strategy<Value = Vec<Op>> {
    proptest::collection::vec(arb_op(), 0..=max)
}

// ═════════════════════════════════════════════════════════════════════
// 1-2. Model agreement and no residue
// ═════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn graph_agrees_with_model(ops in arb_ops(120)) {
        let config = GraphConfig::default().with_identity_checks(true);
        if let Err(failure) = check_and_shrink(&config, &ops) {
            prop_assert!(false, "{failure}");
        }
    }

    #[test]
    fn graph_agrees_with_model_unchecked(ops in arb_ops(120)) {
        let config = GraphConfig::default().with_identity_checks(false);
        if let Err(failure) = check_and_shrink(&config, &ops) {
            prop_assert!(false, "{failure}");
        }
    }

    #[test]
    fn releasing_everything_leaves_nothing(ops in arb_ops(60)) {
        let mut driver = Driver::default();
        prop_assert!(driver.run(&ops).is_ok());
        prop_assert!(driver.finish().is_ok());
    }
}

// ═════════════════════════════════════════════════════════════════════
// 3. Idempotent reads
// ═════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn repeated_reads_are_idempotent(
        reads in proptest::collection::vec((0..SUBSCRIBER_POOL, arb_key()), 1..=16),
        write in arb_key(),
    ) {
        let once = RecordingSink::new();
        let twice = RecordingSink::new();
        let a = Container::new(GraphConfig::default(), once.clone());
        let b = Container::new(GraphConfig::default(), twice.clone());
        let obj_a = a.track();
        let obj_b = b.track();
        let local_a = obj_a.local().unwrap();
        let local_b = obj_b.local().unwrap();

        for &(sub, k) in &reads {
            local_a.add_subscriber(subscriber(sub), key(k));
            local_b.add_subscriber(subscriber(sub), key(k));
            local_b.add_subscriber(subscriber(sub), key(k));
        }
        prop_assert_eq!(local_a.len(), local_b.len());
        prop_assert_eq!(
            a.subscriptions().stats().edges,
            b.subscriptions().stats().edges
        );

        local_a.notify(key(write));
        local_b.notify(key(write));
        prop_assert_eq!(once.take_sorted(), twice.take_sorted());
    }
}

// ═════════════════════════════════════════════════════════════════════
// 4. Disposal completeness
// ═════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn disposed_consumer_is_unreachable(
        objects in 1usize..=8,
        reads in proptest::collection::vec((any::<u8>(), 0..SUBSCRIBER_POOL, arb_key()), 0..=40),
        victim in 0..SUBSCRIBER_POOL,
    ) {
        let sink = RecordingSink::new();
        let container = Container::new(GraphConfig::default(), sink.clone());
        let tracked: Vec<_> = (0..objects).map(|_| container.track()).collect();
        for &(slot, sub, k) in &reads {
            let local = tracked[usize::from(slot) % objects].local().unwrap();
            local.add_subscriber(subscriber(sub), key(k));
        }

        let target = subscriber(victim);
        let expected = container.subscriptions().registrations_of(&target).len();
        prop_assert_eq!(container.subscriptions().clear_subscriber(&target), expected);
        prop_assert!(container.subscriptions().registrations_of(&target).is_empty());
        prop_assert!(container.subscriptions().is_consistent());

        for obj in &tracked {
            if let Some(local) = container.subscriptions().try_get_local(obj.id()) {
                prop_assert!(!local.contains(&target));
                local.notify(None);
            }
        }
        prop_assert!(sink.take().iter().all(|n| n.subscriber != target));
    }
}

// ═════════════════════════════════════════════════════════════════════
// 5. Key-set precision
// ═════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn key_set_consumer_sees_only_its_keys(
        read_keys in proptest::collection::btree_set(0..KEYS.len() as u8, 1..=KEYS.len()),
        write in arb_key(),
    ) {
        let sink = RecordingSink::new();
        let container = Container::new(GraphConfig::default(), sink.clone());
        let obj = container.track();
        let local = obj.local().unwrap();
        for &k in &read_keys {
            local.add_subscriber(subscriber(0), key(Some(k)));
        }

        let delivered = local.notify(key(write));
        let expected = match write {
            None => true,
            Some(k) => read_keys.iter().any(|&r| key(Some(r)) == key(Some(k))),
        };
        prop_assert_eq!(delivered, usize::from(expected));
        prop_assert_eq!(sink.len(), usize::from(expected));
    }
}

// ═════════════════════════════════════════════════════════════════════
// 6. Snapshot restore
// ═════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn snapshot_restores_registrations(
        objects in 1usize..=6,
        reads in proptest::collection::vec((any::<u8>(), 0..SUBSCRIBER_POOL, arb_key()), 0..=30),
    ) {
        let source = Container::new(GraphConfig::default(), NullSink);
        let tracked: Vec<_> = (0..objects).map(|_| source.track()).collect();
        for &(slot, sub, k) in &reads {
            let local = tracked[usize::from(slot) % objects].local().unwrap();
            local.add_subscriber(subscriber(sub), key(k));
        }
        let snapshot = source.subscriptions().snapshot();
        let json = serde_json::to_string(&snapshot).unwrap();
        let decoded: GraphSnapshot = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(&decoded, &snapshot);

        let target = Container::new(GraphConfig::default(), NullSink);
        let fresh: Vec<_> = (0..objects).map(|_| target.track()).collect();
        let position = |id: ObjectId| tracked.iter().position(|t| t.id() == id);
        let restored = decoded
            .restore(target.subscriptions(), |id| position(id).map(|i| fresh[i].id()))
            .unwrap();
        prop_assert_eq!(restored, snapshot.len());

        let source_stats = source.subscriptions().stats();
        let target_stats = target.subscriptions().stats();
        prop_assert_eq!(source_stats.edges, target_stats.edges);
        prop_assert_eq!(source_stats.registrations, target_stats.registrations);
        prop_assert!(target.subscriptions().is_consistent());
    }
}
