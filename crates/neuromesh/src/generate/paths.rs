//! Decomposition of an arbor into chains of sections.
//!
//! A chain starts at the root or at a secondary branch and continues
//! through primary children until a leaf. Every section belongs to exactly
//! one chain, so chains never duplicate geometry; secondary chains start at
//! the branch point they share with their parent.

use crate::connectivity::{AnchorStyle, anchor_points};
use crate::options::ReconstructionOptions;
use crate::preprocess::ordered_children;
use crate::skeleton::{Morphology, Sample, SectionId};

/// Chains of the subtree below `root`, down to `max_order`.
///
/// The chain containing `root` comes first. Invalid sections end a chain.
pub fn section_chains(morph: &Morphology, root: SectionId, max_order: u32) -> Vec<Vec<SectionId>> {
    let mut chains = Vec::new();
    let mut starts = vec![root];
    while let Some(start) = starts.pop() {
        let mut chain = Vec::new();
        let mut current = Some(start);
        while let Some(id) = current.take() {
            let section = morph.section(id);
            if section.branching_order > max_order || !section.is_valid() {
                break;
            }
            chain.push(id);
            let mut children = ordered_children(morph, id).into_iter();
            let primary = children.next();
            // Secondary branches are visited after the whole chain, in order
            let secondary: Vec<SectionId> = children.collect();
            starts.extend(secondary.into_iter().rev());
            current = primary;
        }
        if !chain.is_empty() {
            chains.push(chain);
        }
    }
    chains
}

/// Samples of a chain with the shared first sample of each continuation
/// removed.
pub fn chain_samples(morph: &Morphology, chain: &[SectionId]) -> Vec<Sample> {
    let mut samples: Vec<Sample> = Vec::new();
    for (i, id) in chain.iter().enumerate() {
        let skip = usize::from(i > 0);
        samples.extend(morph.section(*id).samples().iter().skip(skip).copied());
    }
    samples
}

/// One poly-line per chain of an arbor, with the path anchors prepended to
/// the root chain.
///
/// Anchors take the radius of the first sample they lead into.
pub fn arbor_paths(morph: &Morphology, arbor: usize, options: &ReconstructionOptions) -> Vec<Vec<Sample>> {
    let Some(info) = morph.arbor(arbor) else {
        return Vec::new();
    };
    let chains = section_chains(morph, info.root, options.max_branching_order(info.kind));
    let mut paths: Vec<Vec<Sample>> = chains.iter().map(|c| chain_samples(morph, c)).collect();
    if let Some(first) = paths.first_mut() {
        prepend_anchors(first, &anchor_points(morph, arbor, options, AnchorStyle::Path));
    }
    paths
}

/// Insert anchor samples in front of `samples`.
pub(crate) fn prepend_anchors(samples: &mut Vec<Sample>, anchors: &[nalgebra::Point3<f64>]) {
    let Some(radius) = samples.first().map(|s| s.radius) else {
        return;
    };
    let anchored: Vec<Sample> = anchors.iter().map(|p| Sample::new(*p, radius)).collect();
    samples.splice(0..0, anchored);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Diagnostics;
    use crate::options::SomaRepresentation;
    use crate::preprocess::{assign_arbor_indices, label_branches};
    use crate::skeleton::fixtures::forked;

    fn labeled() -> Morphology {
        let mut morph = forked();
        label_branches(&mut morph, &mut Diagnostics::default());
        morph
    }

    #[test]
    fn test_every_section_once() {
        let morph = labeled();
        let chains = section_chains(&morph, SectionId(0), u32::MAX);
        let mut seen: Vec<SectionId> = chains.iter().flatten().copied().collect();
        seen.sort();
        assert_eq!(seen, morph.subtree(SectionId(0)));
        assert_eq!(chains[0][0], SectionId(0));
        assert_eq!(chains.len(), 2);
    }

    #[test]
    fn test_paths_share_only_branch_points() {
        let mut morph = labeled();
        let counts = assign_arbor_indices(&mut morph);
        let options = ReconstructionOptions {
            soma: SomaRepresentation::Ignore,
            ..Default::default()
        };
        let paths = arbor_paths(&morph, 0, &options);
        let total: usize = paths.iter().map(Vec::len).sum();
        assert_eq!(total - (paths.len() - 1), counts[0]);
    }

    #[test]
    fn test_order_limit_cuts_chains() {
        let morph = labeled();
        let chains = section_chains(&morph, SectionId(0), 0);
        assert_eq!(chains, vec![vec![SectionId(0)]]);
    }

    #[test]
    fn test_anchor_prepended() {
        let mut samples = vec![Sample::at(1.0, 0.0, 0.0, 0.7)];
        prepend_anchors(&mut samples, &[nalgebra::Point3::origin()]);
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].radius, 0.7);
        assert_eq!(samples[0].point, nalgebra::Point3::origin());
    }
}
