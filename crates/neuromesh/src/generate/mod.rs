//! Primitive generators.
//!
//! Each generator turns the sections of one arbor into geometry:
//! - [`meta`]: implicit field elements
//! - [`skinning`]: one skinned tube network per arbor
//! - [`piecewise`]: joined section tubes or unioned path tubes
//! - [`articulated`]: a voxelization proxy of tubes and joint spheres
//!
//! Geometry is stored in the pass context and referenced from the sections
//! that produced it, so it lives exactly as long as the pass.

pub mod articulated;
pub mod meta;
pub mod paths;
pub mod piecewise;
pub mod skinning;
pub mod soma;
pub mod tube;

pub use articulated::articulated_arbor;
pub use meta::{LabeledElements, appendage_elements, arbor_elements, march_segment};
pub use paths::{arbor_paths, chain_samples, section_chains};
pub use piecewise::{TubeSet, appendage_tubes, piecewise_arbor, union_arbor};
pub use skinning::{SkinGraph, SkinNode, build_skin_graph, skin, skin_arbor};
pub use soma::{build_soma, soma_elements};
pub use tube::{TubeCaps, TubeProfile, sweep_tube};

use mesh_kernel::Mesh;

use crate::context::ReconstructionContext;
use crate::skeleton::{GeometryRef, Morphology, SectionId};

/// Intermediate product of a generator for one arbor.
#[derive(Debug)]
pub enum GeneratedGeometry {
    Elements(LabeledElements),
    Skinned(SkinGraph),
    Tubes(TubeSet),
}

impl GeneratedGeometry {
    /// Surface mesh, for generators that produce one directly.
    pub fn surface(&self) -> Option<&Mesh> {
        match self {
            GeneratedGeometry::Elements(_) => None,
            GeneratedGeometry::Skinned(graph) => Some(&graph.mesh),
            GeneratedGeometry::Tubes(set) => Some(&set.mesh),
        }
    }
}

/// Store arbor geometry in the pass and point its sections at it.
pub(crate) fn record(
    morph: &mut Morphology,
    ctx: &mut ReconstructionContext,
    arbor: usize,
    sections: &[SectionId],
    geometry: GeneratedGeometry,
) -> GeometryRef {
    let reference = ctx.push_geometry(arbor, geometry);
    for id in sections {
        morph.section_mut(*id).mesh_ref = Some(reference);
    }
    ctx.stats.arbors_generated += 1;
    ctx.stats.sections_generated += sections.len();
    ctx.advance();
    reference
}
