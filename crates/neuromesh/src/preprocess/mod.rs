//! Skeleton preprocessing.
//!
//! Steps run in a fixed order because each relies on the previous ones:
//!
//! 1. Root samples inside the soma are removed
//! 2. Sections are resampled with the selected policy
//! 3. Radii are raised to the floor
//! 4. The style transform is applied
//! 5. Branches are labeled primary or secondary
//! 6. Samples get their arbor-wide indices
//!
//! Running it again with unchanged options does nothing.

mod indexing;
mod labeling;
mod radius;
mod resample;
mod style;
mod trim;

pub use indexing::assign_arbor_indices;
pub use labeling::{label_branches, ordered_children};
pub use radius::apply_radius_floor;
pub use resample::{AdaptiveMode, resample_adaptive, resample_fixed_step, resample_samples};
pub use style::apply_style;
pub use trim::remove_internal_samples;

pub(crate) use style::orthonormal_pair;

use tracing::{debug, info};

use crate::context::ReconstructionContext;
use crate::options::{ReconstructionOptions, SomaRepresentation};
use crate::skeleton::{Morphology, SectionId};

/// Prepare a morphology for geometry generation, in place.
pub fn preprocess(morph: &mut Morphology, options: &ReconstructionOptions, ctx: &mut ReconstructionContext) {
    let fingerprint = options.fingerprint();
    if morph.preprocessed_with == Some(fingerprint) {
        debug!("Morphology already preprocessed with these options");
        return;
    }

    if options.soma != SomaRepresentation::Ignore {
        let trimmed = remove_internal_samples(morph);
        ctx.diagnostics.trimmed_samples += trimmed;
    }

    let ids: Vec<SectionId> = morph.sections().iter().map(|s| s.id).collect();
    for &id in &ids {
        let resampled = resample_samples(morph.section(id).samples(), options.resampling, options.resampling_step);
        morph.set_samples(id, resampled);
    }

    apply_radius_floor(morph, options.radius_floor, &mut ctx.diagnostics);
    let mut style_rng = ctx.rng.fork(1);
    apply_style(morph, options, &mut style_rng);
    label_branches(morph, &mut ctx.diagnostics);
    assign_arbor_indices(morph);

    for &id in &ids {
        if !morph.section(id).is_valid() {
            ctx.diagnostics.skip_section(id, "fewer than two samples");
        }
    }

    morph.preprocessed_with = Some(fingerprint);
    info!(
        sections = ids.len(),
        samples = morph.sample_count(),
        clamped = ctx.diagnostics.radius_clamps,
        trimmed = ctx.diagnostics.trimmed_samples,
        "Skeleton preprocessed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{ArborStyle, ResamplingMethod};
    use crate::skeleton::fixtures::forked;

    #[test]
    fn test_preprocess_is_idempotent() {
        let options = ReconstructionOptions {
            resampling: ResamplingMethod::Adaptive,
            arbor_style: ArborStyle::Zigzag,
            ..Default::default()
        };
        let mut morph = forked();
        let mut ctx = ReconstructionContext::new(options.seed, None);
        preprocess(&mut morph, &options, &mut ctx);
        let once: Vec<_> = morph.sections().iter().map(|s| s.samples().to_vec()).collect();
        preprocess(&mut morph, &options, &mut ctx);
        let twice: Vec<_> = morph.sections().iter().map(|s| s.samples().to_vec()).collect();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_invariants_after_preprocess() {
        let options = ReconstructionOptions::for_meta();
        let mut morph = forked();
        let mut ctx = ReconstructionContext::new(0, None);
        preprocess(&mut morph, &options, &mut ctx);
        assert!(morph.validate().is_ok());
        for section in morph.sections() {
            assert!(section.samples().len() >= 2);
            assert!(section.samples().iter().all(|s| s.radius >= options.radius_floor));
            assert!(section.samples().iter().all(|s| s.arbor_index.is_some()));
        }
    }

    #[test]
    fn test_ignore_soma_skips_trimming() {
        let options = ReconstructionOptions {
            soma: SomaRepresentation::Ignore,
            resampling: ResamplingMethod::None,
            ..Default::default()
        };
        let mut morph = forked();
        morph.soma.smallest_radius = 3.0;
        let mut ctx = ReconstructionContext::new(0, None);
        preprocess(&mut morph, &options, &mut ctx);
        assert_eq!(ctx.diagnostics.trimmed_samples, 0);
        assert_eq!(morph.section(SectionId(0)).samples()[0].point.x, 2.0);
    }
}
