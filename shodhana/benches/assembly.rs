//! Assembly benchmarks
//!
//! - Multi-scan assembly over growing selections
//! - Single-scan re-projection (drag preview)
//! - Trajectory marker assembly
//!
//! Run with: `cargo bench`

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use std::f32::consts::TAU;

use shodhana::io::{MessageHeader, PoseRecord};
use shodhana::{MarkerStyle, Point3D, PointCloud3D, Pose2D, RigidTransform, TrajectoryStore};

// ============================================================================
// Test Fixtures
// ============================================================================

/// A 360-point ring scan, as a 2D lidar would produce in a round room.
fn ring_scan(n_points: usize) -> PointCloud3D {
    (0..n_points)
        .map(|i| {
            let angle = i as f32 * TAU / n_points as f32;
            let range = 3.0 + 0.5 * (angle * 3.0).sin();
            Point3D::planar(range * angle.cos(), range * angle.sin())
        })
        .collect()
}

/// A store of `n` poses along a gentle curve, each with its own scan.
fn store_with(n: usize) -> TrajectoryStore {
    let records: Vec<PoseRecord> = (0..n)
        .map(|i| PoseRecord {
            id: i as i64 * 2,
            timestamp: i as f64 * 0.2,
            weight: 1.0,
            gweight: 1.0,
            pose: Pose2D::new(i as f32 * 0.1, (i as f32 * 0.05).sin(), i as f32 * 0.01),
        })
        .collect();
    let scan = ring_scan(360);
    let scans = records.iter().map(|r| (r.id, scan.clone())).collect::<Vec<_>>();
    TrajectoryStore::from_parts(&records, scans)
}

// ============================================================================
// Benchmarks
// ============================================================================

fn bench_transformed_scans(c: &mut Criterion) {
    let store = store_with(500);
    let mut group = c.benchmark_group("transformed_scans");

    for selection in [1usize, 10, 100, 500] {
        let ids: Vec<i64> = (0..selection as i64).map(|i| i * 2).collect();
        group.throughput(Throughput::Elements((selection * 360) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(selection), &ids, |b, ids| {
            b.iter(|| store.transformed_scans(black_box(ids)))
        });
    }
    group.finish();
}

fn bench_reproject(c: &mut Criterion) {
    let store = store_with(10);
    let drag = RigidTransform::from_pose2d(&Pose2D::new(1.0, -0.5, 0.3));

    c.bench_function("reproject_scan_360", |b| {
        b.iter(|| store.reproject_scan(black_box(&drag), black_box(4)))
    });
}

fn bench_markers(c: &mut Criterion) {
    let store = store_with(2000);
    let style = MarkerStyle::default();

    c.bench_function("trajectory_markers_2000", |b| {
        b.iter(|| store.trajectory_markers(&style, MessageHeader::new("map", 0)))
    });
}

criterion_group!(benches, bench_transformed_scans, bench_reproject, bench_markers);
criterion_main!(benches);
