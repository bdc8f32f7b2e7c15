use std::{
    hint::black_box,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use herald::{messenger::ReferencePolicy, Messenger, StrongMessenger, Token, WeakMessenger};

struct Tick(u64);

#[derive(Default)]
struct Counter {
    total: AtomicU64,
}

fn populate<P: ReferencePolicy>(
    messenger: &Messenger<P>,
    recipients: usize,
) -> Vec<Arc<Counter>> {
    let counters: Vec<Arc<Counter>> = (0..recipients)
        .map(|_| Arc::new(Counter::default()))
        .collect();
    for counter in &counters {
        messenger
            .register(counter, |c: &Counter, tick: &Tick| {
                c.total.fetch_add(tick.0, Ordering::Relaxed);
                Ok(())
            })
            .unwrap();
    }
    counters
}

fn bench_send(c: &mut Criterion) {
    let mut group = c.benchmark_group("send");
    for recipients in [0usize, 1, 10, 100] {
        let strong = StrongMessenger::new();
        let _strong_counters = populate(&strong, recipients);
        group.bench_with_input(BenchmarkId::new("strong", recipients), &recipients, |b, _| {
            b.iter(|| strong.send(black_box(Tick(1))).unwrap())
        });

        let weak = WeakMessenger::new();
        let _weak_counters = populate(&weak, recipients);
        group.bench_with_input(BenchmarkId::new("weak", recipients), &recipients, |b, _| {
            b.iter(|| weak.send(black_box(Tick(1))).unwrap())
        });
    }
    group.finish();
}

fn bench_send_other_token(c: &mut Criterion) {
    // много получателей на соседних каналах
    let messenger = StrongMessenger::new();
    let counters: Vec<Arc<Counter>> = (0..100).map(|_| Arc::new(Counter::default())).collect();
    for (i, counter) in counters.iter().enumerate() {
        messenger
            .register_with_token(counter, Token::of(i as u32), |_: &Counter, _: &Tick| Ok(()))
            .unwrap();
    }
    let token = Token::of(7u32);
    c.bench_function("send_token_100_channels", |b| {
        b.iter(|| messenger.send_with_token(black_box(Tick(1)), &token).unwrap())
    });
}

fn bench_register_unregister(c: &mut Criterion) {
    let messenger = StrongMessenger::new();
    let _background = populate(&messenger, 100);
    let counter = Arc::new(Counter::default());
    c.bench_function("register_unregister", |b| {
        b.iter(|| {
            messenger
                .register(&counter, |_: &Counter, _: &Tick| Ok(()))
                .unwrap();
            black_box(messenger.unregister::<Tick>(&counter));
        })
    });
}

fn bench_cleanup_dead(c: &mut Criterion) {
    c.bench_function("weak_cleanup_100_dead", |b| {
        b.iter_batched(
            || {
                let messenger = WeakMessenger::new();
                drop(populate(&messenger, 100));
                messenger
            },
            |messenger| black_box(messenger.cleanup()),
            criterion::BatchSize::SmallInput,
        )
    });
}

criterion_group!(
    benches,
    bench_send,
    bench_send_other_token,
    bench_register_unregister,
    bench_cleanup_dead,
);
criterion_main!(benches);
