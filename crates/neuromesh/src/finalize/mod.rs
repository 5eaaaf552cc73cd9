//! Post-processing of generated meshes into the final output.
//!
//! Steps run in a fixed order, each only when its option asks for it:
//! manifold repair, island removal for simulated somata, decimation,
//! rough-surface noise, re-centering and aggregation.

pub mod noise;

pub use noise::{apply_surface_noise, value_noise};

use hashbrown::HashMap;
use mesh_kernel::components::extract_faces;
use mesh_kernel::{
    DecimateParams, Mesh, RepairParams, SubdivideParams, compute_vertex_normals, decimate_mesh,
    remove_small_components, repair_mesh_with_config, subdivide_mesh,
};
use tracing::{debug, info};

use crate::context::ReconstructionContext;
use crate::mesh::{MeshPart, PartLabel, ReconstructedMesh};
use crate::options::{MeshingTechnique, OutputMode, ReconstructionOptions, SomaRepresentation, SurfaceRoughness};
use crate::skeleton::Morphology;

/// Weld tolerance when repairing meshes joined from separate pieces.
const JOINED_WELD_EPSILON: f64 = 1e-9;
/// Decimation and refinement applied after noise on unioned arbors.
const UNION_NOISE_DECIMATION_PASSES: usize = 2;
const UNION_NOISE_DECIMATION_RATIO: f64 = 0.5;
const UNION_NOISE_SUBDIVISIONS: usize = 1;
/// Islands below this share of a simulated surface are dropped.
const ISLAND_FACE_FRACTION: usize = 100;
const MIN_ISLAND_FACES: usize = 8;

/// Run every finishing step on the generated parts.
pub fn finalize(
    parts: Vec<MeshPart>,
    morph: &Morphology,
    options: &ReconstructionOptions,
    ctx: &mut ReconstructionContext,
) -> ReconstructedMesh {
    let mut parts: Vec<MeshPart> = parts.into_iter().filter(|p| !p.mesh.is_empty()).collect();

    if options.repair_manifold {
        let params = match options.technique {
            MeshingTechnique::Meta | MeshingTechnique::Voxelization => RepairParams::for_iso_surfaces(),
            _ => RepairParams::for_joined_pieces(JOINED_WELD_EPSILON),
        };
        for part in &mut parts {
            let report = repair_mesh_with_config(&mut part.mesh, &params);
            debug!(part = %part.name, ?report, "Repaired");
        }
    }

    if options.soma == SomaRepresentation::SoftBody {
        for part in parts
            .iter_mut()
            .filter(|p| matches!(p.label, PartLabel::Soma | PartLabel::Neuron))
        {
            let min_faces = (part.mesh.face_count() / ISLAND_FACE_FRACTION).max(MIN_ISLAND_FACES);
            let removed = remove_small_components(&mut part.mesh, min_faces);
            if removed > 0 {
                info!(part = %part.name, removed, "Removed soma islands");
            }
        }
    }

    if options.decimation_applies() {
        let params = DecimateParams::with_target_ratio(options.decimation_ratio);
        for part in &mut parts {
            part.mesh = decimate_mesh(&part.mesh, &params).mesh;
        }
    }

    if options.surface == SurfaceRoughness::Rough {
        roughen(&mut parts, options, ctx);
    }

    if options.center_at_soma {
        let offset = -morph.soma.centroid.coords;
        for part in &mut parts {
            part.mesh.translate(offset);
        }
    }

    let output = match options.output {
        OutputMode::Joined => join_parts(parts, &morph.label),
        OutputMode::PerPart => split_parts(parts),
    };
    ctx.stats.final_vertices = output.vertex_count();
    ctx.stats.final_faces = output.face_count();
    info!(
        parts = output.parts.len(),
        vertices = ctx.stats.final_vertices,
        faces = ctx.stats.final_faces,
        "Reconstruction finalized"
    );
    output
}

/// Noise on arbor surfaces, plus the re-tessellation unioned arbors need.
fn roughen(parts: &mut [MeshPart], options: &ReconstructionOptions, ctx: &mut ReconstructionContext) {
    let seed = ctx.rng.fork(2).next_u32();
    let amplitude = options.calibration.noise_amplitude;
    let frequency = options.calibration.noise_frequency;

    for part in parts.iter_mut() {
        let moved = if part.label.is_arbor() {
            apply_surface_noise(&mut part.mesh, amplitude, frequency, seed, |_| true)
        } else if part.label == PartLabel::Neuron {
            apply_surface_noise(&mut part.mesh, amplitude, frequency, seed, |v| {
                v.tag
                    .and_then(PartLabel::from_tag)
                    .is_some_and(PartLabel::is_arbor)
            })
        } else {
            0
        };
        if moved == 0 {
            continue;
        }
        debug!(part = %part.name, moved, "Surface noise applied");

        if options.technique == MeshingTechnique::Union && part.label.is_arbor() {
            let decimate = DecimateParams::with_target_ratio(UNION_NOISE_DECIMATION_RATIO);
            for _ in 0..UNION_NOISE_DECIMATION_PASSES {
                part.mesh = decimate_mesh(&part.mesh, &decimate).mesh;
            }
            part.mesh = subdivide_mesh(&part.mesh, &SubdivideParams::with_iterations(UNION_NOISE_SUBDIVISIONS)).mesh;
            compute_vertex_normals(&mut part.mesh);
        }
    }
}

/// One mesh whose vertices carry their part label as tag.
fn join_parts(parts: Vec<MeshPart>, name: &str) -> ReconstructedMesh {
    if parts.is_empty() {
        return ReconstructedMesh::default();
    }
    let mut joined = Mesh::new();
    for mut part in parts {
        let tag = part.label.tag();
        for v in part.mesh.vertices.iter_mut().filter(|v| v.tag.is_none()) {
            v.tag = Some(tag);
        }
        joined.append(&part.mesh);
    }
    ReconstructedMesh {
        parts: vec![MeshPart::new(PartLabel::Neuron, name, joined)],
    }
}

/// One mesh per part; multi-part surfaces are cut along their vertex tags.
fn split_parts(parts: Vec<MeshPart>) -> ReconstructedMesh {
    let mut out = Vec::with_capacity(parts.len());
    for part in parts {
        if part.label != PartLabel::Neuron {
            out.push(part);
            continue;
        }
        let mut by_label: HashMap<PartLabel, Vec<u32>> = HashMap::new();
        let mut order = Vec::new();
        for (fi, face) in part.mesh.faces.iter().enumerate() {
            let label = part.vertex_label(face[0] as usize);
            by_label
                .entry(label)
                .or_insert_with(|| {
                    order.push(label);
                    Vec::new()
                })
                .push(fi as u32);
        }
        for label in order {
            let faces = &by_label[&label];
            let name = format!("{}_{label:?}", part.name).to_lowercase();
            out.push(MeshPart::new(label, name, extract_faces(&part.mesh, faces)));
        }
    }
    ReconstructedMesh { parts: out }
}
