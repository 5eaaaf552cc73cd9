//! Joined section tubes, the fastest technique.

use super::{Assembly, Technique};
use crate::context::ReconstructionContext;
use crate::error::NeuroResult;
use crate::generate::{GeneratedGeometry, build_soma, piecewise_arbor, record};
use crate::mesh::{MeshPart, PartLabel};
use crate::options::{MeshingTechnique, ReconstructionOptions};
use crate::skeleton::Morphology;

/// Piecewise technique.
#[derive(Debug, Default)]
pub struct Piecewise;

impl Technique for Piecewise {
    const TECHNIQUE: MeshingTechnique = MeshingTechnique::Piecewise;

    fn generate(
        &mut self,
        morph: &mut Morphology,
        options: &ReconstructionOptions,
        ctx: &mut ReconstructionContext,
    ) -> NeuroResult<Assembly> {
        let mut assembly = Assembly {
            soma: build_soma(&morph.soma, options, ctx)?,
            parts: Vec::new(),
        };
        for arbor in 0..morph.arbors().len() {
            let Some(set) = piecewise_arbor(morph, arbor, options, 0.0) else {
                ctx.advance();
                continue;
            };
            let info = &morph.arbors()[arbor];
            assembly.parts.push(MeshPart::new(
                PartLabel::for_section_type(info.kind),
                info.label.clone(),
                set.mesh.clone(),
            ));
            let sections = set.sections.clone();
            record(morph, ctx, arbor, &sections, GeneratedGeometry::Tubes(set));
        }
        assembly.push_appendages(morph, options, 0.0);
        Ok(assembly)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::{NeuronMeshBuilder, PiecewiseBuilder};
    use crate::options::{OutputMode, ResamplingMethod, SomaRepresentation};
    use crate::skeleton::fixtures::forked;
    use crate::skeleton::{Endfoot, Sample, SectionType, Soma};
    use nalgebra::Point3;

    #[test]
    fn test_arbor_and_soma_parts() {
        let options = ReconstructionOptions {
            output: OutputMode::PerPart,
            ..ReconstructionOptions::for_piecewise()
        };
        let mut builder = PiecewiseBuilder::new(&forked(), options);
        let mesh = builder.reconstruct().unwrap();
        assert_eq!(mesh.parts.len(), 2);
        assert_eq!(builder.stats().stitched_junctions, 1);
        assert_eq!(builder.stats().sections_generated, 4);
    }

    #[test]
    fn test_long_first_segment_is_stitched() {
        let mut morph = Morphology::new("long", Soma::new(Point3::origin(), 5.0));
        morph.add_arbor(
            "basal",
            SectionType::BasalDendrite,
            vec![Sample::at(5.0, 0.0, 0.0, 1.0), Sample::at(15.0, 0.0, 0.0, 1.0)],
        );
        let options = ReconstructionOptions {
            resampling: ResamplingMethod::None,
            ..ReconstructionOptions::for_piecewise()
        };
        let mut builder = PiecewiseBuilder::new(&morph, options);
        builder.reconstruct().unwrap();
        assert_eq!(builder.stats().stitched_junctions, 1);
    }

    #[test]
    fn test_endfeet_become_parts() {
        let mut morph = forked();
        morph.endfeet.push(Endfoot {
            samples: vec![Sample::at(0.0, 3.0, 0.0, 0.4), Sample::at(0.0, 9.0, 0.0, 0.4)],
        });
        let options = ReconstructionOptions {
            soma: SomaRepresentation::Ignore,
            output: OutputMode::PerPart,
            ..ReconstructionOptions::for_piecewise()
        };
        let mesh = PiecewiseBuilder::new(&morph, options).reconstruct().unwrap();
        let foot = mesh.part(PartLabel::Endfoot).unwrap();
        assert_eq!(foot.name, "endfoot_0");
        assert!(foot.mesh.validate().is_watertight());
    }
}
