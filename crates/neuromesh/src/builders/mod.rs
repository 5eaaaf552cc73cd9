//! Builder orchestration.
//!
//! Every meshing technique runs the same five stages on its own deep copy
//! of the morphology: preprocess, classify, generate, stitch and finalize.
//! Techniques differ only in their generate step and in whether the soma
//! needs stitching. [`MeshBuilder`] owns the stage sequence; a [`Technique`]
//! supplies the variable parts.
//!
//! # Example
//!
//! ```
//! use nalgebra::Point3;
//! use neuromesh::{
//!     Morphology, NeuronMeshBuilder, PiecewiseBuilder, ReconstructionOptions, Sample,
//!     SectionType, Soma,
//! };
//!
//! let mut morph = Morphology::new("cell", Soma::new(Point3::origin(), 2.0));
//! morph.add_arbor(
//!     "dend",
//!     SectionType::BasalDendrite,
//!     vec![Sample::at(2.0, 0.0, 0.0, 0.5), Sample::at(10.0, 0.0, 0.0, 0.3)],
//! );
//!
//! let mut builder = PiecewiseBuilder::new(&morph, ReconstructionOptions::for_piecewise());
//! let mesh = builder.reconstruct().unwrap();
//! assert!(!mesh.is_empty());
//! assert!(builder.stats().stage("generate").is_some());
//! ```

mod meta;
mod piecewise;
mod skinning;
mod union;
mod voxelization;

pub use meta::Meta;
pub use piecewise::Piecewise;
pub use skinning::Skinning;
pub use union::Union;
pub use voxelization::Voxelization;

use mesh_kernel::{Mesh, SharedProgressTracker};
use tracing::{info, warn};

use crate::connectivity::classify;
use crate::context::{Diagnostics, ReconstructionContext, ReconstructionStats};
use crate::error::{NeuroError, NeuroResult};
use crate::finalize::finalize;
use crate::generate::appendage_tubes;
use crate::mesh::{MeshPart, PartLabel, ReconstructedMesh};
use crate::options::{MeshingTechnique, ReconstructionOptions};
use crate::preprocess::preprocess;
use crate::skeleton::Morphology;
use crate::stitch::stitch_soma;

/// Stages run by every builder, for progress accounting.
const STAGES: [&str; 5] = ["preprocess", "classify", "generate", "stitch", "finalize"];

pub type MetaBuilder = MeshBuilder<Meta>;
pub type SkinningBuilder = MeshBuilder<Skinning>;
pub type UnionBuilder = MeshBuilder<Union>;
pub type PiecewiseBuilder = MeshBuilder<Piecewise>;
pub type VoxelizationBuilder = MeshBuilder<Voxelization>;

/// Common contract of all reconstruction builders.
pub trait NeuronMeshBuilder {
    fn technique(&self) -> MeshingTechnique;

    /// Run one full reconstruction pass.
    ///
    /// Can be called repeatedly; each call starts from a clean pass state.
    fn reconstruct(&mut self) -> NeuroResult<ReconstructedMesh>;

    /// Statistics of the last pass.
    fn stats(&self) -> &ReconstructionStats;

    /// Problems recovered during the last pass.
    fn diagnostics(&self) -> &Diagnostics;

    /// The builder's own copy of the morphology, as left by the last pass.
    fn morphology(&self) -> &Morphology;
}

/// Generated meshes before stitching and finalization.
#[derive(Debug, Default)]
pub struct Assembly {
    pub soma: Option<Mesh>,
    pub parts: Vec<MeshPart>,
}

impl Assembly {
    pub fn is_empty(&self) -> bool {
        self.soma.as_ref().is_none_or(Mesh::is_empty) && self.parts.iter().all(|p| p.mesh.is_empty())
    }

    /// Soma first, then everything else in generation order.
    pub fn into_parts(self) -> Vec<MeshPart> {
        let mut parts = Vec::with_capacity(self.parts.len() + 1);
        if let Some(soma) = self.soma {
            parts.push(MeshPart::new(PartLabel::Soma, "soma", soma));
        }
        parts.extend(self.parts);
        parts
    }

    /// Add endfoot and spine tubes.
    pub(crate) fn push_appendages(&mut self, morph: &Morphology, options: &ReconstructionOptions, radius_floor: f64) {
        for (i, (label, mesh)) in appendage_tubes(morph, options, radius_floor).into_iter().enumerate() {
            let name = format!("{label:?}_{i}").to_lowercase();
            self.parts.push(MeshPart::new(label, name, mesh));
        }
    }
}

/// The technique-specific steps of a builder.
pub trait Technique {
    const TECHNIQUE: MeshingTechnique;

    /// Generate soma and arbor geometry on a preprocessed, classified
    /// morphology.
    fn generate(
        &mut self,
        morph: &mut Morphology,
        options: &ReconstructionOptions,
        ctx: &mut ReconstructionContext,
    ) -> NeuroResult<Assembly>;

    /// Repair soma-arbor junctions. By default a separate soma surface is
    /// stitched when arbors attach to it.
    fn stitch(
        &mut self,
        assembly: &mut Assembly,
        morph: &Morphology,
        options: &ReconstructionOptions,
        ctx: &mut ReconstructionContext,
    ) {
        if !options.attaches_to_soma() {
            return;
        }
        if let Some(soma) = assembly.soma.as_mut() {
            ctx.stats.stitched_junctions = stitch_soma(soma, morph, options);
        }
    }
}

/// Runs the stage sequence for one technique.
pub struct MeshBuilder<T> {
    morphology: Morphology,
    options: ReconstructionOptions,
    progress: Option<SharedProgressTracker>,
    stats: ReconstructionStats,
    diagnostics: Diagnostics,
    technique: T,
}

impl<T: Technique + Default> MeshBuilder<T> {
    /// Create a builder working on a deep copy of `morphology`.
    pub fn new(morphology: &Morphology, options: ReconstructionOptions) -> Self {
        Self {
            morphology: morphology.clone(),
            options,
            progress: None,
            stats: ReconstructionStats::default(),
            diagnostics: Diagnostics::default(),
            technique: T::default(),
        }
    }
}

impl<T> MeshBuilder<T> {
    /// Report stage and arbor completion to `tracker`.
    pub fn with_progress(mut self, tracker: SharedProgressTracker) -> Self {
        self.progress = Some(tracker);
        self
    }

    pub fn options(&self) -> &ReconstructionOptions {
        &self.options
    }
}

impl<T: Technique> MeshBuilder<T> {
    fn run(&mut self, ctx: &mut ReconstructionContext) -> NeuroResult<ReconstructedMesh> {
        let Self {
            morphology: morph,
            options,
            technique,
            ..
        } = self;

        for id in morph.sections().iter().map(|s| s.id).collect::<Vec<_>>() {
            morph.section_mut(id).mesh_ref = None;
        }

        ctx.stage(STAGES[0], |ctx| preprocess(morph, options, ctx));
        ctx.stage(STAGES[1], |_| classify(morph, options));
        let mut assembly = ctx.stage(STAGES[2], |ctx| technique.generate(morph, options, ctx))?;
        ctx.stage(STAGES[3], |ctx| technique.stitch(&mut assembly, morph, options, ctx));

        if assembly.is_empty() {
            return Err(NeuroError::EmptyMorphology {
                label: morph.label.clone(),
            });
        }
        let mesh = ctx.stage(STAGES[4], |ctx| finalize(assembly.into_parts(), morph, options, ctx));
        if mesh.is_empty() {
            return Err(NeuroError::EmptyMorphology {
                label: morph.label.clone(),
            });
        }
        Ok(mesh)
    }
}

impl<T: Technique> NeuronMeshBuilder for MeshBuilder<T> {
    fn technique(&self) -> MeshingTechnique {
        T::TECHNIQUE
    }

    fn reconstruct(&mut self) -> NeuroResult<ReconstructedMesh> {
        let mut ctx = ReconstructionContext::new(self.options.seed, self.progress.clone());
        ctx.stats.technique = Some(T::TECHNIQUE);
        ctx.expect_work((STAGES.len() + self.morphology.arbors().len()) as u64);
        info!(
            morphology = self.morphology.label.as_str(),
            technique = ?T::TECHNIQUE,
            arbors = self.morphology.arbors().len(),
            "Reconstruction started"
        );

        let result = self.run(&mut ctx);
        if let Err(e) = &result {
            warn!(error = %e, "Reconstruction failed");
        } else {
            info!(
                total_ms = ctx.stats.total_time().as_secs_f64() * 1000.0,
                warnings = ctx.diagnostics.warnings.len(),
                "Reconstruction complete"
            );
        }
        // Temporary geometry dies with the pass
        ctx.geometry.clear();
        self.stats = ctx.stats;
        self.diagnostics = ctx.diagnostics;
        result
    }

    fn stats(&self) -> &ReconstructionStats {
        &self.stats
    }

    fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    fn morphology(&self) -> &Morphology {
        &self.morphology
    }
}

/// Builder for the technique selected in `options`.
pub fn builder_for(morphology: &Morphology, options: ReconstructionOptions) -> Box<dyn NeuronMeshBuilder> {
    match options.technique {
        MeshingTechnique::Meta => Box::new(MetaBuilder::new(morphology, options)),
        MeshingTechnique::Skinning => Box::new(SkinningBuilder::new(morphology, options)),
        MeshingTechnique::Union => Box::new(UnionBuilder::new(morphology, options)),
        MeshingTechnique::Piecewise => Box::new(PiecewiseBuilder::new(morphology, options)),
        MeshingTechnique::Voxelization => Box::new(VoxelizationBuilder::new(morphology, options)),
    }
}

/// Reconstruct `morphology` with the technique selected in `options`.
pub fn reconstruct(morphology: &Morphology, options: &ReconstructionOptions) -> NeuroResult<ReconstructedMesh> {
    builder_for(morphology, options.clone()).reconstruct()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NeuroErrorCode;
    use crate::options::SomaRepresentation;
    use crate::skeleton::Soma;
    use crate::skeleton::fixtures::forked;
    use mesh_kernel::progress::shared_tracker;
    use nalgebra::Point3;

    #[test]
    fn test_builder_for_dispatches() {
        let morph = forked();
        for technique in [
            MeshingTechnique::Meta,
            MeshingTechnique::Skinning,
            MeshingTechnique::Union,
            MeshingTechnique::Piecewise,
            MeshingTechnique::Voxelization,
        ] {
            let builder = builder_for(
                &morph,
                ReconstructionOptions {
                    technique,
                    ..Default::default()
                },
            );
            assert_eq!(builder.technique(), technique);
        }
    }

    #[test]
    fn test_caller_morphology_untouched() {
        let morph = forked();
        let before: Vec<_> = morph.sections().iter().map(|s| s.samples().to_vec()).collect();
        let mut builder = PiecewiseBuilder::new(&morph, ReconstructionOptions::for_piecewise());
        builder.reconstruct().unwrap();
        let after: Vec<_> = morph.sections().iter().map(|s| s.samples().to_vec()).collect();
        assert_eq!(before, after);
        assert!(morph.sections().iter().all(|s| s.mesh_ref.is_none()));
        assert!(builder.morphology().sections().iter().any(|s| s.mesh_ref.is_some()));
    }

    #[test]
    fn test_stages_timed_and_progress_complete() {
        let tracker = shared_tracker(0);
        let mut builder =
            PiecewiseBuilder::new(&forked(), ReconstructionOptions::for_piecewise()).with_progress(tracker.clone());
        builder.reconstruct().unwrap();
        for stage in STAGES {
            assert!(builder.stats().stage(stage).is_some(), "{stage}");
        }
        assert_eq!(builder.stats().technique, Some(MeshingTechnique::Piecewise));
        assert_eq!(tracker.current(), tracker.total());
    }

    #[test]
    fn test_empty_morphology_fails() {
        let morph = Morphology::new("nothing", Soma::new(Point3::origin(), 1.0));
        let options = ReconstructionOptions {
            soma: SomaRepresentation::Ignore,
            ..ReconstructionOptions::for_piecewise()
        };
        let err = reconstruct(&morph, &options).unwrap_err();
        assert_eq!(err.code(), NeuroErrorCode::EmptyMorphology);
    }

    #[test]
    fn test_soma_only_morphology() {
        let morph = Morphology::new("soma", Soma::new(Point3::origin(), 3.0));
        let mesh = reconstruct(&morph, &ReconstructionOptions::for_union()).unwrap();
        assert_eq!(mesh.parts.len(), 1);
        assert!(mesh.parts[0].mesh.validate().is_watertight());
    }

    #[test]
    fn test_missing_softbody_surface_is_fatal() {
        let options = ReconstructionOptions {
            soma: SomaRepresentation::SoftBody,
            ..ReconstructionOptions::for_skinning()
        };
        let err = reconstruct(&forked(), &options).unwrap_err();
        assert_eq!(err.code(), NeuroErrorCode::SomaBuilderNotFound);
    }

    #[test]
    fn test_reconstruct_twice_is_stable() {
        let mut builder = PiecewiseBuilder::new(&forked(), ReconstructionOptions::for_piecewise());
        let first = builder.reconstruct().unwrap();
        let second = builder.reconstruct().unwrap();
        assert_eq!(first.vertex_count(), second.vertex_count());
        assert_eq!(first.face_count(), second.face_count());
    }
}
