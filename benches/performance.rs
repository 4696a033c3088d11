//! Performance benchmarks for the subscription engine.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use propbus::{
    CallbackId, ClientId, HalResult, PropertyHal, PropertyKey, SampleValue, SubscribeOption,
    SubscriptionManager, Timestamp,
};

/// Hardware stand-in that accepts everything.
struct NoopHal;

impl PropertyHal for NoopHal {
    fn subscribe(&self, _: PropertyKey, _: f32, _: f32, _: bool) -> HalResult {
        Ok(())
    }

    fn unsubscribe(&self, _: PropertyKey) -> HalResult {
        Ok(())
    }

    fn update_sample_rate(&self, _: PropertyKey, _: f32) -> HalResult {
        Ok(())
    }
}

fn subscribed_engine(clients: u64, vur: bool) -> SubscriptionManager<NoopHal> {
    let engine = SubscriptionManager::new(NoopHal);
    for client in 0..clients {
        engine
            .subscribe(
                ClientId(client),
                CallbackId(client),
                &[SubscribeOption::continuous(
                    PropertyKey::global(1),
                    10.0,
                    0.1,
                    vur && client % 2 == 0,
                )],
                true,
            )
            .unwrap();
    }
    engine
}

/// Benchmark value fan-out with varying subscriber counts
fn bench_route_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("route_fanout");

    for subscriber_count in [1u64, 10, 100, 1000] {
        group.bench_with_input(
            BenchmarkId::new("subscribers", subscriber_count),
            &subscriber_count,
            |b, &count| {
                let engine = subscribed_engine(count, false);
                let mut t = 0i64;

                b.iter(|| {
                    t += 1;
                    let batch = vec![SampleValue::numeric(
                        PropertyKey::global(1),
                        Timestamp(t),
                        vec![t as f64],
                    )];
                    black_box(engine.route_updates(batch));
                });
            },
        );
    }

    group.finish();
}

/// Benchmark fan-out when half the clients use client-side suppression
fn bench_route_with_dedup(c: &mut Criterion) {
    let mut group = c.benchmark_group("route_with_dedup");

    for subscriber_count in [10u64, 100, 1000] {
        group.bench_with_input(
            BenchmarkId::new("subscribers", subscriber_count),
            &subscriber_count,
            |b, &count| {
                let engine = subscribed_engine(count, true);
                // A constant reading keeps the suppression path hot.
                let batch = vec![SampleValue::numeric(
                    PropertyKey::global(1),
                    Timestamp(1),
                    vec![55.0],
                )];

                b.iter(|| {
                    black_box(engine.route_updates(batch.clone()));
                });
            },
        );
    }

    group.finish();
}

/// Benchmark subscribe/unsubscribe churn with merge recomputation
fn bench_subscribe_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("subscribe_churn");

    for resident_clients in [10u64, 100] {
        group.bench_with_input(
            BenchmarkId::new("resident_clients", resident_clients),
            &resident_clients,
            |b, &count| {
                let engine = subscribed_engine(count, false);
                let churn_client = ClientId(count + 1);
                let mut rate = 1.0f32;

                b.iter(|| {
                    rate = if rate >= 100.0 { 1.0 } else { rate + 1.0 };
                    engine
                        .subscribe(
                            churn_client,
                            CallbackId(count + 1),
                            &[SubscribeOption::continuous(
                                PropertyKey::global(1),
                                rate,
                                0.1,
                                false,
                            )],
                            true,
                        )
                        .unwrap();
                    engine
                        .unsubscribe(churn_client, &[PropertyKey::global(1)])
                        .unwrap();
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_route_fanout,
    bench_route_with_dedup,
    bench_subscribe_churn
);
criterion_main!(benches);
