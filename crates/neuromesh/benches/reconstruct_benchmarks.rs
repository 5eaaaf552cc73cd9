//! Benchmarks for neuron reconstruction.
//!
//! Run with: cargo bench -p neuromesh
//!
//! To compare against baseline:
//! 1. First run: cargo bench -p neuromesh -- --save-baseline main
//! 2. After changes: cargo bench -p neuromesh -- --baseline main

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use nalgebra::Point3;
use neuromesh::{
    MeshingTechnique, Morphology, ReconstructionContext, ReconstructionOptions, ResamplingMethod, Sample,
    SectionType, Soma, preprocess, reconstruct,
};

/// Soma with one basal dendrite that forks `depth` times and a straight axon.
fn neuron(depth: u32) -> Morphology {
    let mut morph = Morphology::new("bench", Soma::new(Point3::origin(), 3.0));
    let root = morph.add_arbor(
        "basal_0",
        SectionType::BasalDendrite,
        vec![Sample::at(0.0, 3.0, 0.0, 1.2), Sample::at(0.0, 10.0, 0.0, 1.0)],
    );
    let mut frontier = vec![(root, Point3::new(0.0, 10.0, 0.0), 1.0, 8.0)];
    for _ in 0..depth {
        let mut next = Vec::new();
        for (parent, tip, radius, spread) in frontier {
            for side in [-1.0, 1.0] {
                let end = Point3::new(tip.x + side * spread, tip.y + 6.0, tip.z);
                let child_radius = radius * 0.75;
                if let Ok(id) = morph.add_child(
                    parent,
                    vec![
                        Sample::new(tip, child_radius),
                        Sample::new(end, child_radius * 0.8),
                    ],
                ) {
                    next.push((id, end, child_radius * 0.8, spread * 0.6));
                }
            }
        }
        frontier = next;
    }
    morph.add_arbor(
        "axon",
        SectionType::Axon,
        (0..=10)
            .map(|i| Sample::at(0.0, -3.0 - 3.0 * i as f64, 0.0, 0.8))
            .collect(),
    );
    morph
}

fn options_for(technique: MeshingTechnique) -> ReconstructionOptions {
    match technique {
        MeshingTechnique::Meta => ReconstructionOptions::for_meta(),
        MeshingTechnique::Skinning => ReconstructionOptions::for_skinning(),
        MeshingTechnique::Union => ReconstructionOptions::for_union(),
        MeshingTechnique::Piecewise => ReconstructionOptions::for_piecewise(),
        MeshingTechnique::Voxelization => ReconstructionOptions::for_voxelization(),
    }
}

// =============================================================================
// Preprocessing
// =============================================================================

fn bench_preprocess(c: &mut Criterion) {
    let mut group = c.benchmark_group("Preprocess");

    for method in [
        ResamplingMethod::FixedStep,
        ResamplingMethod::Adaptive,
        ResamplingMethod::AdaptiveRelaxed,
    ] {
        let morph = neuron(4);
        group.throughput(Throughput::Elements(morph.sample_count() as u64));
        let options = ReconstructionOptions {
            resampling: method,
            resampling_step: 0.5,
            ..Default::default()
        };
        group.bench_with_input(
            BenchmarkId::new("resample", format!("{method:?}")),
            &morph,
            |b, morph| {
                b.iter(|| {
                    let mut m = morph.clone();
                    let mut ctx = ReconstructionContext::new(options.seed, None);
                    preprocess(black_box(&mut m), &options, &mut ctx);
                    m
                })
            },
        );
    }

    group.finish();
}

// =============================================================================
// Techniques
// =============================================================================

fn bench_techniques(c: &mut Criterion) {
    let mut group = c.benchmark_group("Reconstruct");
    group.sample_size(10);

    let morph = neuron(2);
    group.throughput(Throughput::Elements(morph.sections().len() as u64));
    for technique in [
        MeshingTechnique::Piecewise,
        MeshingTechnique::Skinning,
        MeshingTechnique::Union,
        MeshingTechnique::Meta,
        MeshingTechnique::Voxelization,
    ] {
        let options = options_for(technique);
        group.bench_with_input(
            BenchmarkId::new(format!("{technique:?}"), morph.sections().len()),
            &morph,
            |b, morph| b.iter(|| reconstruct(black_box(morph), black_box(&options))),
        );
    }

    group.finish();
}

fn bench_arbor_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("Arbor Scaling");
    group.sample_size(10);

    for depth in [1, 3, 5] {
        let morph = neuron(depth);
        let options = ReconstructionOptions::for_piecewise();
        group.throughput(Throughput::Elements(morph.sections().len() as u64));
        group.bench_with_input(
            BenchmarkId::new("piecewise", morph.sections().len()),
            &morph,
            |b, morph| b.iter(|| reconstruct(black_box(morph), black_box(&options))),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_preprocess, bench_techniques, bench_arbor_scaling);
criterion_main!(benches);
