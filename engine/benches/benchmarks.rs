//! Performance benchmarks for twinsync-engine

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use twinsync_engine::{
    AttributeSchema, MemoryReplica, Record, RecordId, RecordSet, Replica, SideController,
    SharedState, StateStore, StoreSnapshot, SyncEngine, IMPORTANT, READ,
};

fn message(id: RecordId) -> Record {
    AttributeSchema::default().new_record(id, format!("{} body", id))
}

/// An engine that has already agreed on `size` records.
fn synced_engine(size: u64) -> SyncEngine<MemoryReplica, MemoryReplica> {
    let mut engine = SyncEngine::new(
        MemoryReplica::with_records("left", (0..size).map(message)),
        MemoryReplica::new("right"),
    );
    let _ = engine.run();
    engine
}

fn bench_compute_changes(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_changes");

    for size in [100u64, 1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::new("no_drift", size), size, |b, &size| {
            let engine = synced_engine(size);
            b.iter(|| engine.left().compute_changes())
        });

        group.bench_with_input(BenchmarkId::new("all_drift", size), size, |b, &size| {
            let mut engine = synced_engine(size);
            for id in 0..size {
                if let Some(record) = engine.left_mut().replica_mut().get_mut(id) {
                    let _ = record.mark(READ);
                }
            }
            b.iter(|| engine.left().compute_changes())
        });
    }

    group.finish();
}

fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge");

    for size in [100u64, 1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::new("half_overlap", size), size, |b, &size| {
            let changed = |id: RecordId, flag: &str| {
                let mut record = message(id);
                let reference = record.clone();
                let _ = record.mark(flag);
                let _ = record.learn_changes(&reference);
                record
            };
            let left: RecordSet = (0..size).map(|id| changed(id, READ)).collect();
            let right: RecordSet = (size / 2..size + size / 2)
                .map(|id| changed(id, if id % 2 == 0 { READ } else { IMPORTANT }))
                .collect();

            b.iter_batched(
                || (left.clone(), right.clone()),
                |(mut left, mut right)| left.merge_with(black_box(&mut right)),
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_round(c: &mut Criterion) {
    let mut group = c.benchmark_group("round");

    for size in [100u64, 1000].iter() {
        group.bench_with_input(BenchmarkId::new("first_sync", size), size, |b, &size| {
            b.iter_batched(
                || {
                    SyncEngine::new(
                        MemoryReplica::with_records("left", (0..size).map(message)),
                        MemoryReplica::with_records("right", (size..2 * size).map(message)),
                    )
                },
                |mut engine| engine.run(),
                BatchSize::SmallInput,
            )
        });

        group.bench_with_input(BenchmarkId::new("apply", size), size, |b, &size| {
            let incoming: RecordSet = (0..size)
                .map(|id| {
                    let mut record = message(id);
                    record.mark_new();
                    record
                })
                .collect();

            b.iter_batched(
                || SideController::new(MemoryReplica::new("left"), SharedState::default()),
                |mut side| {
                    let report = side.apply(black_box(&incoming));
                    (report, side.replica().search().len())
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");
    let schema = AttributeSchema::default();

    for size in [100u64, 1000].iter() {
        group.bench_with_input(BenchmarkId::new("export", size), size, |b, &size| {
            let engine = synced_engine(size);
            b.iter(|| engine.state().read().export_snapshot(&schema))
        });

        group.bench_with_input(BenchmarkId::new("import", size), size, |b, &size| {
            let json = synced_engine(size)
                .state()
                .read()
                .export_snapshot(&schema)
                .to_json()
                .unwrap_or_default();

            b.iter(|| {
                StoreSnapshot::from_json(black_box(&json))
                    .and_then(|snapshot| StateStore::from_snapshot(&snapshot, &schema))
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_compute_changes,
    bench_merge,
    bench_round,
    bench_snapshot,
);
criterion_main!(benches);
