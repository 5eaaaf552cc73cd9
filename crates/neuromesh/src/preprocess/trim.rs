//! Removal of root samples buried in the soma.

use tracing::debug;

use crate::skeleton::{Morphology, Sample, SectionId};

/// Drop root samples within `smallest_radius` of the soma centroid.
///
/// Only root sections are trimmed. Removal stops once two samples remain.
/// Returns the number of samples removed.
pub fn remove_internal_samples(morph: &mut Morphology) -> usize {
    let soma = morph.soma.clone();
    if soma.smallest_radius <= 0.0 {
        return 0;
    }
    let roots: Vec<SectionId> = morph.arbors().iter().map(|a| a.root).collect();
    let mut removed = 0;
    for root in roots {
        let samples = morph.section(root).samples();
        let mut remaining = samples.len();
        let mut kept: Vec<Sample> = Vec::with_capacity(remaining);
        for s in samples {
            if remaining > 2 && soma.contains(&s.point) {
                remaining -= 1;
                continue;
            }
            kept.push(*s);
        }
        let dropped = samples.len() - kept.len();
        if dropped > 0 {
            debug!(section = root.0, dropped, "Trimmed samples inside the soma");
            removed += dropped;
            morph.set_samples(root, kept);
        }
    }
    removed
}
