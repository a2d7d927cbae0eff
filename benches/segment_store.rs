use criterion::{black_box, criterion_group, criterion_main, Criterion};
use scribe::store::SegmentStore;

fn insert_many(n: usize) {
    let mut store = SegmentStore::new();
    for i in 0..n {
        store.put_text(i, b"x").unwrap();
        store.commit();
    }
    black_box(store.flatten());
}

fn delete_many(n: usize) {
    let mut store = SegmentStore::new();
    store.put_text(0, &vec![b'a'; n]).unwrap();
    store.commit();
    for i in 0..n / 2 {
        store.delete_range(i, 1).unwrap();
    }
    store.commit();
    black_box(store.flatten());
}

fn bench_segment_store(c: &mut Criterion) {
    c.bench_function("insert_1000_sequential", |b| {
        b.iter(|| insert_many(black_box(1000)))
    });
    c.bench_function("delete_half_of_2000", |b| {
        b.iter(|| delete_many(black_box(2000)))
    });
}

criterion_group!(benches, bench_segment_store);
criterion_main!(benches);
