// Quota enforcer benchmarks
//
// Key metrics measured:
// - Hot-path cost of an allowed check
// - Cost of a rejected check (minute window exhausted)
// - Check cost with many live users in the table
// - Full sweep over a table of expired counters
//
// Usage:
//   cargo bench --bench check_and_consume

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use dashboard_quota::quota::{ManualClock, QuotaEnforcer, QuotaLimits};
use std::hint::black_box;
use std::time::Duration;

fn bench_check_and_consume(c: &mut Criterion) {
    let generous = QuotaLimits::new(u32::MAX, u32::MAX).expect("valid limits");
    let tight = QuotaLimits::new(1, 1_000).expect("valid limits");

    c.bench_function("quota_check_allowed", |b| {
        let enforcer = QuotaEnforcer::new();
        b.iter(|| {
            black_box(enforcer.check_and_consume(
                black_box("u1"),
                black_box("email-ai-compose"),
                &generous,
            ))
        });
    });

    c.bench_function("quota_check_rejected", |b| {
        let enforcer = QuotaEnforcer::new();
        enforcer.check_and_consume("u1", "email-ai-compose", &tight);
        b.iter(|| {
            black_box(enforcer.check_and_consume(
                black_box("u1"),
                black_box("email-ai-compose"),
                &tight,
            ))
        });
    });

    let mut group = c.benchmark_group("quota_check_populated");
    for users in [100usize, 1_000, 10_000] {
        let enforcer = QuotaEnforcer::with_sweep_threshold(usize::MAX);
        let ids: Vec<String> = (0..users).map(|i| format!("user-{}", i)).collect();
        for id in &ids {
            enforcer.check_and_consume(id, "assistant-chat", &generous);
        }

        group.bench_with_input(BenchmarkId::from_parameter(users), &ids, |b, ids| {
            let mut next = 0usize;
            b.iter(|| {
                let id = &ids[next % ids.len()];
                next += 1;
                black_box(enforcer.check_and_consume(id, "assistant-chat", &generous))
            });
        });
    }
    group.finish();
}

fn bench_sweep(c: &mut Criterion) {
    let limits = QuotaLimits::new(10, 100).expect("valid limits");
    let mut group = c.benchmark_group("quota_sweep_expired");

    for users in [1_000usize, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(users), &users, |b, &users| {
            b.iter_batched(
                || {
                    let clock = ManualClock::new();
                    let enforcer = QuotaEnforcer::with_clock(clock.clone(), usize::MAX);
                    for i in 0..users {
                        enforcer.check_and_consume(&format!("user-{}", i), "assistant-chat", &limits);
                    }
                    clock.advance(Duration::from_secs(86_400));
                    (enforcer, clock)
                },
                |(enforcer, _clock)| black_box(enforcer.sweep_expired()),
                criterion::BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_check_and_consume, bench_sweep);
criterion_main!(benches);
