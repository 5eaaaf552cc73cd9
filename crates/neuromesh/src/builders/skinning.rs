//! Skinned-arbor reconstruction on a separate soma.

use tracing::debug;

use super::{Assembly, Technique};
use crate::context::ReconstructionContext;
use crate::error::NeuroResult;
use crate::generate::{GeneratedGeometry, build_soma, record, skin_arbor};
use crate::mesh::{MeshPart, PartLabel};
use crate::options::{MeshingTechnique, ReconstructionOptions};
use crate::skeleton::{Morphology, SectionId};

/// Skinning technique.
#[derive(Debug, Default)]
pub struct Skinning;

impl Technique for Skinning {
    const TECHNIQUE: MeshingTechnique = MeshingTechnique::Skinning;

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
            let Some(graph) = skin_arbor(morph, arbor, options) else {
                debug!(arbor, "Nothing to skin");
                ctx.advance();
                continue;
            };
            let info = &morph.arbors()[arbor];
            let sections: Vec<SectionId> = morph
                .subtree_limited(info.root, options.max_branching_order(info.kind))
                .into_iter()
                .filter(|id| morph.section(*id).is_valid())
                .collect();
            for id in &sections {
                for s in morph.section(*id).samples() {
                    ctx.observe_radius(s.radius);
                }
            }
            assembly.parts.push(MeshPart::new(
                PartLabel::for_section_type(info.kind),
                info.label.clone(),
                graph.mesh.clone(),
            ));
            record(morph, ctx, arbor, &sections, GeneratedGeometry::Skinned(graph));
        }

        assembly.push_appendages(morph, options, 0.0);
        Ok(assembly)
    }
}
