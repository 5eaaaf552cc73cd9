//! Benchmarks for mesh-volume operations.
//!
//! Run with: cargo bench -p mesh-volume

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use mesh_kernel::primitives::icosphere;
use mesh_volume::{IsoSurfaceParams, MetaElement, VoxelRemeshParams, splat_elements, voxel_remesh};
use nalgebra::Point3;

/// Elements marched along a straight line, like one dendrite segment.
fn chain(count: usize, radius: f64) -> Vec<MetaElement> {
    (0..count)
        .map(|i| MetaElement::new(Point3::new(i as f64 * 0.5 * radius, 0.0, 0.0), 1.614 * radius))
        .collect()
}

fn bench_splat(c: &mut Criterion) {
    let mut group = c.benchmark_group("Splat");
    group.sample_size(20);

    for count in [50, 200, 800] {
        let elements = chain(count, 1.0);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("chain", count), &elements, |b, elements| {
            b.iter(|| splat_elements(black_box(elements), &IsoSurfaceParams::default()))
        });
    }

    group.finish();
}

fn bench_iso_surface(c: &mut Criterion) {
    let mut group = c.benchmark_group("IsoSurface");
    group.sample_size(10);

    for count in [50, 200] {
        let elements = chain(count, 1.0);
        group.bench_with_input(BenchmarkId::new("chain", count), &elements, |b, elements| {
            b.iter(|| mesh_volume::IsoSurfaceBuilder::new(black_box(elements)).build())
        });
    }

    group.finish();
}

fn bench_remesh(c: &mut Criterion) {
    let mut group = c.benchmark_group("VoxelRemesh");
    group.sample_size(10);

    let mut proxy = icosphere(Point3::origin(), 2.0, 3);
    proxy.append(&icosphere(Point3::new(2.0, 0.0, 0.0), 1.5, 3));
    for voxel in [0.4, 0.2] {
        group.bench_with_input(BenchmarkId::new("two_spheres", voxel), &voxel, |b, &voxel| {
            b.iter(|| voxel_remesh(black_box(&proxy), &VoxelRemeshParams::with_voxel_size(voxel)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_splat, bench_iso_surface, bench_remesh);
criterion_main!(benches);
