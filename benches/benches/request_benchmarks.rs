use std::{hint::black_box, sync::Arc};

use criterion::{criterion_group, criterion_main, Criterion};
use herald::{CollectionRequestMessage, RequestMessage, StrongMessenger};

struct Provider(u32);

fn bench_single_request(c: &mut Criterion) {
    let messenger = StrongMessenger::new();
    let provider = Arc::new(Provider(42));
    messenger
        .register(&provider, |p: &Provider, request: &RequestMessage<u32>| {
            request.reply(p.0)?;
            Ok(())
        })
        .unwrap();

    c.bench_function("request_single", |b| {
        b.iter(|| {
            let request = messenger.send(RequestMessage::<u32>::empty()).unwrap();
            black_box(request.response().unwrap())
        })
    });
}

fn bench_collection_request(c: &mut Criterion) {
    let messenger = StrongMessenger::new();
    let providers: Vec<Arc<Provider>> = (0..32).map(|i| Arc::new(Provider(i))).collect();
    for provider in &providers {
        messenger
            .register(
                provider,
                |p: &Provider, request: &CollectionRequestMessage<u32>| {
                    request.reply(p.0);
                    Ok(())
                },
            )
            .unwrap();
    }

    c.bench_function("request_collection_32", |b| {
        b.iter(|| {
            let request = messenger
                .send(CollectionRequestMessage::<u32>::empty())
                .unwrap();
            black_box(request.into_responses())
        })
    });
}

criterion_group!(benches, bench_single_request, bench_collection_request);
criterion_main!(benches);
