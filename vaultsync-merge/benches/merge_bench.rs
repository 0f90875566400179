//! Merge throughput on replicas of growing size.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use std::sync::Arc;
use vaultsync_merge::{MergeConfig, MergeMode, Merger};
use vaultsync_model::{Database, Entry, Group};
use vaultsync_types::{ManualClock, NodeId};

// =============================================================================
// Test Data Generation
// =============================================================================

/// A replica with `groups` groups of `per_group` entries each, and a copy
/// of it where every other entry was edited a second later.
fn diverged_pair(groups: usize, per_group: usize) -> (Database, Database) {
    let clock = Arc::new(ManualClock::at(2020, 1, 1, 0, 0, 0));
    let mut base = Database::with_clock(clock.clone());
    let root = base.root();
    let mut entries: Vec<NodeId> = Vec::with_capacity(groups * per_group);
    for g in 0..groups {
        let group = base
            .add_group(root, Group::new(format!("group {g}"), base.now()))
            .unwrap();
        for e in 0..per_group {
            let mut entry = Entry::new(base.now());
            entry.set_title(format!("entry {g}.{e}"));
            entries.push(base.add_entry(group, entry).unwrap());
        }
    }

    let mut source = base.clone();
    clock.advance_seconds(1);
    for id in entries.iter().step_by(2) {
        source.update_entry(*id, |e| e.set_password("rotated")).unwrap();
    }
    (source, base)
}

// =============================================================================
// Merge Benchmarks
// =============================================================================

fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge");

    for size in [10usize, 100, 1000] {
        let (source, target) = diverged_pair(size / 10, 10);
        group.throughput(Throughput::Elements(size as u64));

        for mode in [MergeMode::KeepNewer, MergeMode::Synchronize] {
            let config = MergeConfig::forced(mode);
            group.bench_with_input(
                BenchmarkId::new(format!("{mode:?}"), size),
                &size,
                |b, _| {
                    b.iter(|| {
                        let mut target = target.clone();
                        let report = Merger::new(&source, &mut target)
                            .with_config(&config)
                            .merge()
                            .unwrap();
                        black_box(report)
                    });
                },
            );
        }
    }

    group.finish();
}

fn bench_noop_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("noop_merge");

    for size in [100usize, 1000] {
        let (source, _) = diverged_pair(size / 10, 10);
        let mut target = source.clone();
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| black_box(Merger::new(&source, &mut target).merge().unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_merge, bench_noop_merge);
criterion_main!(benches);
