//! Performance benchmarks for pool_core using Criterion.rs.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pool_core::config::MatchingConfig;
use pool_core::diagnostics::NullDiagnostics;
use pool_core::fleet::SequentialStopIds;
use pool_core::matching::MatchingEngine;
use pool_core::test_support::{random_requests, seeded_snapshot, FixedRouteProvider};

fn bench_find_match(c: &mut Criterion) {
    let scenarios = vec![
        ("small", 10, 5),
        ("medium", 50, 25),
        ("large", 200, 100),
    ];

    let router = FixedRouteProvider::at_kmh(40.0);
    let config = MatchingConfig::default();
    let requests = random_requests(7, 32);

    let mut group = c.benchmark_group("find_match");
    for (name, vehicles, trips) in scenarios {
        let snapshot = seeded_snapshot(42, vehicles, trips);
        group.bench_with_input(
            BenchmarkId::from_parameter(name),
            &snapshot,
            |b, snapshot| {
                let engine = MatchingEngine::new(&router, &config);
                let mut i = 0;
                b.iter(|| {
                    let request = &requests[i % requests.len()];
                    i += 1;
                    let mut ids = SequentialStopIds::starting_at(1_000_000);
                    black_box(engine.find_match(
                        request,
                        snapshot,
                        &mut ids,
                        &mut NullDiagnostics,
                    ));
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_find_match);
criterion_main!(benches);
