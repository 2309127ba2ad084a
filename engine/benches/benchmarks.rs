//! Performance benchmarks for shelf-engine

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use shelf_engine::{Bookmark, ChangeEvent, DeletedRow, Engine, PushPayload};

fn seed(count: u64) -> Vec<Bookmark> {
    (0..count)
        .rev()
        .map(|i| Bookmark::new(format!("b{i}"), "Title", "https://example.com", i * 10))
        .collect()
}

fn bench_engine_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_operations");

    group.bench_function("engine_new", |b| {
        b.iter(|| Engine::new(black_box(seed(100))))
    });

    group.bench_function("submit_and_confirm", |b| {
        let mut engine = Engine::new(seed(1000));
        let mut n = 0u64;

        b.iter(|| {
            n += 1;
            let submission = engine
                .submit_insert("New", "https://new.example", 1_000_000 + n)
                .unwrap();
            engine.apply(black_box(ChangeEvent::settled_insert(
                submission.pending,
                Ok(Bookmark::new(
                    format!("n{n}"),
                    "New",
                    "https://new.example",
                    1_000_000 + n,
                )),
            )))
        })
    });

    group.bench_function("duplicate_push", |b| {
        let mut engine = Engine::new(seed(1000));
        let event = ChangeEvent::pushed(PushPayload::Insert {
            record: Bookmark::new("b500", "Title", "https://example.com", 5000),
        });

        b.iter(|| engine.apply(black_box(event.clone())))
    });

    group.finish();
}

fn bench_collection_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("collection_sizes");

    for size in [100u64, 1_000, 10_000] {
        group.bench_with_input(
            BenchmarkId::new("push_insert_delete", size),
            &size,
            |b, &size| {
                let mut engine = Engine::new(seed(size));
                b.iter(|| {
                    engine.apply(ChangeEvent::pushed(PushPayload::Insert {
                        record: Bookmark::new("mid", "Mid", "https://mid.example", size * 5),
                    }));
                    engine.apply(ChangeEvent::pushed(PushPayload::Delete {
                        old: DeletedRow { id: "mid".into() },
                    }))
                })
            },
        );

        group.bench_with_input(
            BenchmarkId::new("delete_rollback", size),
            &size,
            |b, &size| {
                let mut engine = Engine::new(seed(size));
                let victim = format!("b{}", size / 2);
                b.iter(|| {
                    let submission = engine.submit_delete(&victim, 0).unwrap();
                    engine.apply(ChangeEvent::settled_delete(
                        submission.pending,
                        victim.clone(),
                        Err(shelf_engine::RemoteFailure::Timeout(10)),
                    ))
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_engine_operations, bench_collection_sizes);
criterion_main!(benches);
