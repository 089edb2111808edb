use chrono::{NaiveDateTime, TimeDelta};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use conseater::{
    queue::{QueueEntry, QueueSnapshot, Table, TableType},
    time_format::{format_duration, parse_timestamp},
};

fn now() -> NaiveDateTime {
    parse_timestamp("2024-06-01 12:00:00").unwrap()
}

/// Helper to build a snapshot with N waiting guests and a mix of tables
fn setup_snapshot(n_entries: usize, n_tables: usize, scheduled: bool) -> QueueSnapshot {
    let entries = (0..n_entries)
        .map(|i| QueueEntry {
            id: i as i64,
            name: format!("guest{}", i),
            phone: (i % 3 == 0).then(|| "555-0100".to_string()),
            added_at: now() - TimeDelta::minutes(i as i64),
        })
        .collect();

    let tables = (0..n_tables)
        .map(|i| Table {
            id: i as i64,
            table_type: "mahjong".to_string(),
            playing: !scheduled && i % 2 == 0,
            started: (!scheduled && i % 2 == 0).then(|| now() - TimeDelta::minutes(i as i64 * 7)),
            scheduled_start: scheduled.then(|| now() + TimeDelta::minutes(i as i64 * 15)),
        })
        .collect();

    QueueSnapshot::new(TableType::new("mahjong", 60, 4), entries, tables)
}

/// Benchmark estimation over immediate tables for growing queues
fn bench_estimate_rotation(c: &mut Criterion) {
    let mut group = c.benchmark_group("estimate_rotation");

    for n_entries in [10, 100, 1000] {
        let snapshot = setup_snapshot(n_entries, 8, false);
        group.bench_with_input(
            BenchmarkId::from_parameter(n_entries),
            &snapshot,
            |b, snapshot| {
                b.iter(|| snapshot.estimate(now()));
            },
        );
    }

    group.finish();
}

/// Benchmark estimation over scheduled tables (slot bookkeeping)
fn bench_estimate_scheduled(c: &mut Criterion) {
    let snapshot = setup_snapshot(200, 8, true);

    c.bench_function("estimate_scheduled_200", |b| {
        b.iter(|| snapshot.estimate(now()));
    });
}

/// Benchmark duration formatting
fn bench_format_duration(c: &mut Criterion) {
    c.bench_function("format_duration", |b| {
        b.iter(|| format_duration(std::hint::black_box(3725.0)));
    });
}

/// Benchmark building a snapshot (sorting and partitioning)
fn bench_snapshot_build(c: &mut Criterion) {
    c.bench_function("snapshot_build_1000", |b| {
        b.iter_batched(
            || (),
            |_| setup_snapshot(1000, 16, false),
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    estimation,
    bench_estimate_rotation,
    bench_estimate_scheduled,
    bench_snapshot_build,
);

criterion_group!(formatting, bench_format_duration);

criterion_main!(estimation, formatting);
