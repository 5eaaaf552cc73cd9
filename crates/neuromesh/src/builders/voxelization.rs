//! Voxel remeshing of a coarse proxy.
//!
//! The proxy (soma, arbor tubes, appendages) may overlap itself freely; the
//! voxel remesh turns it into one clean surface. Picking the voxel size is
//! most of the work: too coarse loses thin processes, too fine explodes the
//! grid.

use mesh_kernel::Mesh;
use mesh_volume::{VolumeError, VolumeRecoverySuggestion, VoxelRemeshBuilder, VoxelRemeshResult};
use nalgebra::Point3;
use tracing::{debug, info, warn};

use super::{Assembly, Technique};
use crate::context::ReconstructionContext;
use crate::error::NeuroResult;
use crate::generate::{GeneratedGeometry, TubeSet, appendage_tubes, articulated_arbor, build_soma, piecewise_arbor, record};
use crate::mesh::{MeshPart, PartLabel, VertexLabeler};
use crate::options::{MeshingTechnique, ReconstructionOptions, SpineSource, VoxelProxy};
use crate::skeleton::Morphology;

/// Retries with a coarser grid when the budget is exceeded.
const MAX_GRID_RETRIES: usize = 3;

/// Voxelization technique.
#[derive(Debug, Default)]
pub struct Voxelization;

/// Grid spacing for a proxy of the given morphology.
///
/// Spines need a fixed fine grid; otherwise the spacing follows the
/// thinnest radius left in the proxy.
pub fn proxy_voxel_size(morph: &Morphology, options: &ReconstructionOptions, smallest_radius: f64) -> f64 {
    let calibration = &options.calibration;
    if options.spines == SpineSource::Morphology && !morph.spines.is_empty() {
        calibration.spine_voxel_size
    } else {
        calibration.voxel_resolution_factor * smallest_radius.max(calibration.voxel_proxy_radius_floor)
    }
}

fn remesh_with_retries(proxy: &Mesh, voxel_size: f64, options: &ReconstructionOptions) -> NeuroResult<VoxelRemeshResult> {
    let mut voxel = voxel_size;
    let mut attempt = 0;
    loop {
        let result = VoxelRemeshBuilder::new(proxy)
            .voxel_size(voxel)
            .max_voxels(options.max_voxels)
            .repair(false)
            .build();
        match result {
            Err(e @ VolumeError::GridTooLarge { .. }) if attempt < MAX_GRID_RETRIES => {
                let VolumeRecoverySuggestion::IncreaseVoxelSize { suggested, .. } = e.recovery_suggestion() else {
                    return Err(e.into());
                };
                warn!(current = voxel, suggested, "Proxy grid over budget, coarsening");
                voxel = suggested;
                attempt += 1;
            }
            other => return Ok(other?),
        }
    }
}

impl Technique for Voxelization {
    const TECHNIQUE: MeshingTechnique = MeshingTechnique::Voxelization;

    fn generate(
        &mut self,
        morph: &mut Morphology,
        options: &ReconstructionOptions,
        ctx: &mut ReconstructionContext,
    ) -> NeuroResult<Assembly> {
        let floor = options.calibration.voxel_proxy_radius_floor;
        let mut proxy = Mesh::new();
        let mut sources: Vec<(Point3<f64>, f64, PartLabel)> = Vec::new();

        if let Some(soma) = build_soma(&morph.soma, options, ctx)? {
            proxy.append(&soma);
            sources.push((morph.soma.centroid, morph.soma.mean_radius * 1.5, PartLabel::Soma));
        }

        for arbor in 0..morph.arbors().len() {
            let set: Option<TubeSet> = match options.voxel_proxy {
                VoxelProxy::Piecewise => piecewise_arbor(morph, arbor, options, floor),
                VoxelProxy::Articulated => articulated_arbor(morph, arbor, options, floor),
            };
            let Some(set) = set else {
                ctx.advance();
                continue;
            };
            let label = PartLabel::for_section_type(morph.arbors()[arbor].kind);
            for id in &set.sections {
                for s in morph.section(*id).samples() {
                    let radius = s.radius.max(floor);
                    ctx.observe_radius(radius);
                    sources.push((s.point, radius * 2.0, label));
                }
            }
            proxy.append(&set.mesh);
            let sections = set.sections.clone();
            record(morph, ctx, arbor, &sections, GeneratedGeometry::Tubes(set));
        }

        for (label, tube) in appendage_tubes(morph, options, floor) {
            for v in &tube.vertices {
                sources.push((v.position, floor * 2.0, label));
            }
            proxy.append(&tube);
        }

        let mut assembly = Assembly::default();
        if proxy.is_empty() {
            return Ok(assembly);
        }

        // A soma-only proxy has no arbor radius to go by
        let smallest = if ctx.smallest_radius.is_finite() {
            ctx.smallest_radius
        } else {
            morph.soma.mean_radius
        };
        let voxel = proxy_voxel_size(morph, options, smallest);
        debug!(voxel, faces = proxy.face_count(), "Proxy assembled");
        let result = remesh_with_retries(&proxy, voxel, options)?;
        ctx.stats.voxel_size = Some(result.voxel_size);
        info!(
            voxel_size = result.voxel_size,
            proxy_components = result.components,
            faces = result.mesh.face_count(),
            "Proxy remeshed"
        );

        let mut mesh = result.mesh;
        VertexLabeler::new(sources).tag_mesh(&mut mesh);
        assembly
            .parts
            .push(MeshPart::new(PartLabel::Neuron, morph.label.clone(), mesh));
        Ok(assembly)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::{NeuronMeshBuilder, VoxelizationBuilder};
    use crate::skeleton::fixtures::forked;
    use crate::skeleton::{Sample, Spine};
    use approx::assert_relative_eq;

    #[test]
    fn test_voxel_size_heuristic() {
        let mut morph = forked();
        let options = ReconstructionOptions::for_voxelization();
        assert_relative_eq!(proxy_voxel_size(&morph, &options, 0.4), 0.3);
        // The proxy floor bounds the spacing from below
        assert_relative_eq!(proxy_voxel_size(&morph, &options, 0.1), 0.15);

        morph.spines.push(Spine {
            base: Sample::at(3.0, 1.0, 0.0, 0.1),
            tip: Sample::at(3.0, 2.0, 0.0, 0.2),
        });
        assert_relative_eq!(proxy_voxel_size(&morph, &options, 0.4), 0.3);
        let with_spines = ReconstructionOptions {
            spines: SpineSource::Morphology,
            ..options
        };
        assert_relative_eq!(proxy_voxel_size(&morph, &with_spines, 0.4), 0.05);
    }

    #[test]
    fn test_remesh_is_one_closed_surface() {
        for proxy in [VoxelProxy::Piecewise, VoxelProxy::Articulated] {
            let options = ReconstructionOptions {
                voxel_proxy: proxy,
                ..ReconstructionOptions::for_voxelization()
            };
            let mut builder = VoxelizationBuilder::new(&forked(), options);
            let mesh = builder.reconstruct().unwrap();
            assert_eq!(mesh.parts.len(), 1);
            let report = mesh.parts[0].mesh.validate();
            assert!(report.is_watertight(), "{proxy:?}");
            assert_eq!(report.component_count, 1, "{proxy:?}");
            assert!(builder.stats().voxel_size.is_some());
        }
    }

    #[test]
    fn test_grid_budget_is_recovered() {
        let options = ReconstructionOptions {
            max_voxels: 20_000,
            ..ReconstructionOptions::for_voxelization()
        };
        let requested = proxy_voxel_size(&forked(), &options, 0.3);
        let mut builder = VoxelizationBuilder::new(&forked(), options);
        builder.reconstruct().unwrap();
        assert!(builder.stats().voxel_size.unwrap() > requested);
    }
}
