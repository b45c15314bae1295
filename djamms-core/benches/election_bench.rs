use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use djamms_core::election::ElectionEngine;
use djamms_core::types::{Lease, LeaseStatus};

// ─── Helpers ────────────────────────────────────────────────────────────────

fn make_lease(venue: &str, device: &str, status: LeaseStatus) -> Lease {
    let mut lease = Lease::new(
        format!("l_{}_{}", venue, device),
        venue.to_string(),
        device.to_string(),
        15_000,
        1000,
    );
    lease.status = status;
    lease
}

// ─── Benchmarks ─────────────────────────────────────────────────────────────

fn bench_decide_unclaimed(c: &mut Criterion) {
    c.bench_function("election_decide_unclaimed", |b| {
        b.iter(|| ElectionEngine::decide(black_box(None), black_box("d1"), black_box(5000)))
    });
}

fn bench_decide_contended(c: &mut Criterion) {
    let held = make_lease("v1", "d1", LeaseStatus::Active);
    c.bench_function("election_decide_contended", |b| {
        b.iter(|| ElectionEngine::decide(black_box(Some(&held)), black_box("d2"), black_box(5000)))
    });
}

fn bench_decide_reconfirm(c: &mut Criterion) {
    let held = make_lease("v1", "d1", LeaseStatus::Active);
    c.bench_function("election_decide_reconfirm", |b| {
        b.iter(|| ElectionEngine::decide(black_box(Some(&held)), black_box("d1"), black_box(5000)))
    });
}

fn bench_decide_by_staleness(c: &mut Criterion) {
    let mut group = c.benchmark_group("election_decide_staleness");

    for (name, status) in [
        ("expired", LeaseStatus::Expired),
        ("offline", LeaseStatus::Offline),
    ] {
        let held = make_lease("v1", "d1", status);
        group.bench_with_input(BenchmarkId::new("status", name), &held, |b, held| {
            b.iter(|| ElectionEngine::decide(black_box(Some(held)), black_box("d2"), black_box(5000)))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_decide_unclaimed,
    bench_decide_contended,
    bench_decide_reconfirm,
    bench_decide_by_staleness
);
criterion_main!(benches);
