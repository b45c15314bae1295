use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use djamms_core::infrastructure::{CommandStore, LeaseStore};
use djamms_core::infrastructure_in_memory::InMemoryVenueStore;
use djamms_core::types::{Command, CommandKind};

fn bench_claim_release_cycle(c: &mut Criterion) {
    c.bench_function("lease_claim_release_cycle", |b| {
        b.iter(|| {
            let mut store = InMemoryVenueStore::new();
            store.acquire_or_confirm("v1", "d1", 15_000, 1000).unwrap();
            store.release("v1", "d1").unwrap();
        })
    });
}

fn bench_venue_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("venue_throughput");

    for venue_count in [10, 50, 100] {
        group.bench_with_input(
            BenchmarkId::new("venues", venue_count),
            &venue_count,
            |b, &count| {
                b.iter(|| {
                    let mut store = InMemoryVenueStore::new();

                    // Each venue gets its own master
                    for i in 0..count {
                        store
                            .acquire_or_confirm(
                                &format!("venue-{}", i),
                                &format!("device-{}", i),
                                15_000,
                                1000,
                            )
                            .unwrap();
                    }

                    // Every master renews once
                    for i in 0..count {
                        store
                            .renew(&format!("venue-{}", i), &format!("device-{}", i), 6000)
                            .unwrap();
                    }
                })
            },
        );
    }

    group.finish();
}

fn bench_command_queue(c: &mut Criterion) {
    let mut group = c.benchmark_group("command_queue");

    for command_count in [16, 128] {
        group.bench_with_input(
            BenchmarkId::new("issue_consume", command_count),
            &command_count,
            |b, &count| {
                b.iter(|| {
                    let mut store = InMemoryVenueStore::new();
                    store.acquire_or_confirm("v1", "d1", 15_000, 1000).unwrap();

                    for i in 0..count {
                        store
                            .append(Command::new(
                                "v1".to_string(),
                                CommandKind::Volume { level: (i % 100) as u8 },
                                "admin-1".to_string(),
                                1000 + i as u64,
                            ))
                            .unwrap();
                    }

                    for command in store.pending("v1").unwrap() {
                        store.mark_executed(&command.id, "d1", 2000).unwrap();
                    }
                })
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_claim_release_cycle,
    bench_venue_throughput,
    bench_command_queue
);
criterion_main!(benches);
