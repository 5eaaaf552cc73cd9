//! Boolean-union reconstruction.
//!
//! Union output is not guaranteed to be a closed manifold. Each arbor's
//! validity is checked and the conjunction lands in
//! `ReconstructionStats::union_valid`; failed unions fall back to the joined
//! path tubes.

use tracing::warn;

use super::{Assembly, Technique};
use crate::context::ReconstructionContext;
use crate::error::NeuroResult;
use crate::generate::{GeneratedGeometry, build_soma, record, union_arbor};
use crate::mesh::{MeshPart, PartLabel};
use crate::options::{MeshingTechnique, ReconstructionOptions};
use crate::skeleton::Morphology;

/// Union-by-path technique.
#[derive(Debug, Default)]
pub struct Union;

impl Technique for Union {
    const TECHNIQUE: MeshingTechnique = MeshingTechnique::Union;

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

        let mut all_valid: Option<bool> = None;
        for arbor in 0..morph.arbors().len() {
            let Some(set) = union_arbor(morph, arbor, options, ctx) else {
                ctx.advance();
                continue;
            };
            let info = &morph.arbors()[arbor];
            let valid = set.union_valid.unwrap_or(false);
            if !valid {
                warn!(arbor = info.label.as_str(), "Unioned arbor is not a closed manifold");
            }
            all_valid = Some(all_valid.unwrap_or(true) && valid);
            assembly.parts.push(MeshPart::new(
                PartLabel::for_section_type(info.kind),
                info.label.clone(),
                set.mesh.clone(),
            ));
            let sections = set.sections.clone();
            record(morph, ctx, arbor, &sections, GeneratedGeometry::Tubes(set));
        }
        ctx.stats.union_valid = all_valid;

        assembly.push_appendages(morph, options, 0.0);
        Ok(assembly)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::{NeuronMeshBuilder, UnionBuilder};
    use crate::options::{OutputMode, SurfaceRoughness};
    use crate::skeleton::fixtures::forked;

    #[test]
    fn test_union_records_validity() {
        let mut builder = UnionBuilder::new(&forked(), ReconstructionOptions::for_union());
        let mesh = builder.reconstruct().unwrap();
        assert!(!mesh.is_empty());
        assert!(builder.stats().union_valid.is_some());
        assert_eq!(builder.diagnostics().union_failures, 0);
    }

    #[test]
    fn test_rough_union_only_touches_arbors() {
        let smooth = ReconstructionOptions {
            output: OutputMode::PerPart,
            ..ReconstructionOptions::for_union()
        };
        let rough = ReconstructionOptions {
            surface: SurfaceRoughness::Rough,
            ..smooth.clone()
        };
        let a = UnionBuilder::new(&forked(), smooth).reconstruct().unwrap();
        let b = UnionBuilder::new(&forked(), rough).reconstruct().unwrap();
        let arbor_a = a.part(PartLabel::BasalDendrite).unwrap();
        let arbor_b = b.part(PartLabel::BasalDendrite).unwrap();
        assert_ne!(arbor_a.mesh.vertices, arbor_b.mesh.vertices);
        assert_eq!(
            a.part(PartLabel::Soma).unwrap().mesh.vertices,
            b.part(PartLabel::Soma).unwrap().mesh.vertices
        );
    }
}
