//! Benchmarks for registration, fan-out, and disposal.
//!
//! Run with: cargo bench -p subgraph-core -- graph

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

use subgraph_core::{Container, GraphConfig, HostId, NullSink, Subscriber, Tracked};

const KEYS: [&str; 8] = ["a", "b", "c", "d", "e", "f", "g", "h"];

fn container() -> Container {
    Container::new(GraphConfig::default().with_identity_checks(false), NullSink)
}

/// `objects` tracked objects, each read by `subs` hosts on one key.
fn populated(objects: usize, subs: u64) -> (Container, Vec<Tracked>) {
    let container = container();
    let tracked: Vec<Tracked> = (0..objects).map(|_| container.track()).collect();
    for (i, obj) in tracked.iter().enumerate() {
        let local = obj.local().unwrap();
        for s in 0..subs {
            local.add_subscriber(HostId(s), Some(KEYS[(i + s as usize) % KEYS.len()]));
        }
    }
    (container, tracked)
}

// ---------------------------------------------------------------------------
// 1. Registration
// ---------------------------------------------------------------------------

fn bench_register(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph/register");

    for subs in [10u64, 100, 1_000] {
        group.throughput(Throughput::Elements(subs));
        group.bench_with_input(BenchmarkId::new("keyed", subs), &subs, |b, &subs| {
            let container = container();
            let obj = container.track();
            let local = obj.local().unwrap();
            b.iter(|| {
                for s in 0..subs {
                    local.add_subscriber(HostId(s), Some(KEYS[s as usize % KEYS.len()]));
                }
                black_box(local.len())
            })
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// 2. Fan-out
// ---------------------------------------------------------------------------

fn bench_notify(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph/notify");

    for subs in [10u64, 100, 1_000] {
        let (_container, tracked) = populated(1, subs);
        let local = tracked[0].local().unwrap();
        group.throughput(Throughput::Elements(subs));

        group.bench_with_input(BenchmarkId::new("keyed", subs), &(), |b, _| {
            b.iter(|| black_box(local.notify(Some("a"))))
        });
        group.bench_with_input(BenchmarkId::new("unqualified", subs), &(), |b, _| {
            b.iter(|| black_box(local.notify(None)))
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// 3. Disposal
// ---------------------------------------------------------------------------

fn bench_clear(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph/clear");

    for objects in [100usize, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::new("host", objects), &objects, |b, &objects| {
            b.iter_batched(
                || populated(objects, 4),
                |(container, tracked)| {
                    let removed = container
                        .subscriptions()
                        .clear_subscriber(&Subscriber::from(HostId(0)));
                    black_box((removed, tracked.len()))
                },
                criterion::BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

criterion_group!(benches, bench_register, bench_notify, bench_clear);
criterion_main!(benches);
