use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use drivedupe::drive::{FileRecord, MemoryDrive};
use drivedupe::duplicates::{
    group_by_checksum, DuplicateFinder, KeepStrategy, ResolveRequest, ScanRequest, SelectionEngine,
};

// Every checksum appears `copies` times, spread over three folders
fn make_files(count: usize, copies: usize) -> Vec<FileRecord> {
    (0..count)
        .map(|i| {
            FileRecord::new(format!("id{i}"), format!("file_{}.txt", i % 97))
                .with_checksum(format!("{:032x}", i / copies))
                .with_size((i % 13) as u64 * 1024)
                .with_modified_time(format!("2023-01-{:02}T00:00:00Z", i % 28 + 1))
                .with_parent(format!("F{}", i % 3))
        })
        .collect()
}

// 1. Grouping Benchmarks
fn bench_grouping(c: &mut Criterion) {
    let mut group = c.benchmark_group("group_by_checksum");

    for count in [1_000, 10_000, 100_000] {
        let files = make_files(count, 4);
        group.bench_with_input(BenchmarkId::from_parameter(count), &files, |b, files| {
            b.iter(|| black_box(group_by_checksum(files.clone())))
        });
    }
    group.finish();
}

// 2. Selection Benchmarks
fn bench_selection(c: &mut Criterion) {
    let (groups, _) = group_by_checksum(make_files(10_000, 4));
    let mut group = c.benchmark_group("selection");

    for strategy in KeepStrategy::ALL {
        group.bench_function(strategy.as_str(), |b| {
            b.iter(|| {
                let mut engine = SelectionEngine::new(&groups);
                engine.apply_keep_strategy(strategy);
                black_box(engine.finish())
            })
        });
    }

    group.bench_function("oldest_plus_folder_override", |b| {
        b.iter(|| {
            let mut engine = SelectionEngine::new(&groups);
            engine.apply_keep_strategy(KeepStrategy::Oldest);
            engine.apply_folder_override("F1");
            black_box(engine.finish())
        })
    });
    group.finish();
}

// 3. End-to-end plan against the in-memory backend
fn bench_plan(c: &mut Criterion) {
    let drive = MemoryDrive::from_files(make_files(10_000, 4));
    let request = ResolveRequest::new(ScanRequest::default())
        .with_keep_strategy("largest")
        .with_dry_run(true);

    c.bench_function("plan_10k_files", |b| {
        b.iter(|| black_box(DuplicateFinder::new(&drive).plan(&request).unwrap()))
    });
}

criterion_group!(benches, bench_grouping, bench_selection, bench_plan);
criterion_main!(benches);
