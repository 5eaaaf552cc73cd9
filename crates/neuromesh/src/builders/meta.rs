//! Implicit-surface reconstruction.
//!
//! Soma, arbors and appendages share one meta-ball field, so the whole
//! neuron comes out as a single surface without stitching. Vertices are
//! tagged with the part of the strongest nearby element.

use mesh_kernel::{DecimateParams, SmoothParams, decimate_mesh, keep_largest_component, smooth_mesh};
use mesh_volume::IsoSurfaceBuilder;
use tracing::{debug, info};

use super::{Assembly, Technique};
use crate::context::ReconstructionContext;
use crate::error::{NeuroError, NeuroResult};
use crate::generate::{
    GeneratedGeometry, LabeledElements, appendage_elements, arbor_elements, build_soma, record,
    soma_elements,
};
use crate::mesh::{MeshPart, PartLabel};
use crate::options::{MeshingTechnique, ReconstructionOptions, SomaRepresentation};
use crate::skeleton::Morphology;

/// Meta-ball technique.
#[derive(Debug, Default)]
pub struct Meta;

impl Technique for Meta {
    const TECHNIQUE: MeshingTechnique = MeshingTechnique::Meta;

    fn generate(
        &mut self,
        morph: &mut Morphology,
        options: &ReconstructionOptions,
        ctx: &mut ReconstructionContext,
    ) -> NeuroResult<Assembly> {
        let mut assembly = Assembly::default();
        let mut field = LabeledElements::default();

        match options.soma {
            SomaRepresentation::MetaBall => {
                field.extend(soma_elements(&morph.soma, options), PartLabel::Soma);
            }
            SomaRepresentation::SoftBody => {
                if morph.soma.simulated_surface.is_none() {
                    return Err(NeuroError::SomaBuilderNotFound {
                        representation: SomaRepresentation::SoftBody,
                        reason: "the morphology carries no simulated soma surface".into(),
                    });
                }
                field.extend(soma_elements(&morph.soma, options), PartLabel::Soma);
            }
            SomaRepresentation::Sphere => assembly.soma = build_soma(&morph.soma, options, ctx)?,
            SomaRepresentation::Ignore => {}
        }

        for arbor in 0..morph.arbors().len() {
            let (elements, sections) = arbor_elements(morph, arbor, options, ctx);
            if elements.is_empty() {
                ctx.advance();
                continue;
            }
            let label = PartLabel::for_section_type(morph.arbors()[arbor].kind);
            let mut labeled = LabeledElements::default();
            labeled.extend(elements, label);
            field.extend(labeled.elements.iter().copied(), label);
            record(morph, ctx, arbor, &sections, GeneratedGeometry::Elements(labeled));
        }
        appendage_elements(morph, options, ctx, &mut field);

        ctx.stats.elements = field.len();
        if field.is_empty() {
            debug!("Meta field is empty");
            return Ok(assembly);
        }

        let result = IsoSurfaceBuilder::new(&field.elements)
            .iso_level(options.calibration.iso_level)
            .resolution_factor(options.calibration.resolution_factor)
            .max_voxels(options.max_voxels)
            .repair(false)
            .build()?;
        ctx.stats.voxel_size = Some(result.voxel_size);
        info!(
            elements = result.element_count,
            voxel_size = result.voxel_size,
            dims = ?result.dims,
            faces = result.mesh.face_count(),
            "Meta surface extracted"
        );

        let mut mesh = result.mesh;
        if options.soma == SomaRepresentation::SoftBody {
            let calibration = &options.calibration;
            let dropped = keep_largest_component(&mut mesh);
            mesh = decimate_mesh(
                &mesh,
                &DecimateParams::with_target_ratio(calibration.softbody_decimation_ratio),
            )
            .mesh;
            smooth_mesh(&mut mesh, &SmoothParams::taubin(calibration.softbody_smoothing_iterations));
            debug!(dropped, faces = mesh.face_count(), "Soft-body surface cleaned");
        }
        field.labeler().tag_mesh(&mut mesh);

        assembly
            .parts
            .push(MeshPart::new(PartLabel::Neuron, morph.label.clone(), mesh));
        Ok(assembly)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::{MetaBuilder, NeuronMeshBuilder};
    use crate::options::OutputMode;
    use crate::skeleton::fixtures::{forked, straight_dendrite};
    use crate::skeleton::Soma;
    use nalgebra::Point3;

    #[test]
    fn test_single_surface_with_soma() {
        let mut builder = MetaBuilder::new(&forked(), ReconstructionOptions::default());
        let mesh = builder.reconstruct().unwrap();
        assert_eq!(mesh.parts.len(), 1);
        let part = &mesh.parts[0];
        assert_eq!(part.mesh.components().component_count(), 1);
        assert!(part.mesh.validate().is_watertight());
        assert!(builder.stats().elements > 0);
        assert!(builder.stats().voxel_size.is_some());
        // Meta output has no separate soma, so nothing is stitched
        assert_eq!(builder.stats().stitched_junctions, 0);
    }

    #[test]
    fn test_vertices_tagged_by_part() {
        let options = ReconstructionOptions {
            output: OutputMode::PerPart,
            ..Default::default()
        };
        let mesh = MetaBuilder::new(&forked(), options).reconstruct().unwrap();
        assert!(mesh.part(PartLabel::Soma).is_some());
        assert!(mesh.part(PartLabel::BasalDendrite).is_some());
    }

    #[test]
    fn test_sphere_soma_is_separate_part() {
        let options = ReconstructionOptions {
            soma: SomaRepresentation::Sphere,
            output: OutputMode::PerPart,
            ..Default::default()
        };
        let mut builder = MetaBuilder::new(&straight_dendrite(Soma::new(Point3::new(-3.0, 0.0, 0.0), 2.5)), options);
        let mesh = builder.reconstruct().unwrap();
        let soma = mesh.part(PartLabel::Soma).unwrap();
        assert_eq!(soma.name, "soma");
        assert_eq!(builder.stats().stitched_junctions, 1);
    }
}
