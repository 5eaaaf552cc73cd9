use crate::skeleton::{Morphology, SectionId};

/// Number every sample of every arbor in one depth-first walk.
///
/// The root's first sample gets 0. The first sample of any other section
/// reuses its parent's last index, so branch points are not duplicated.
/// Returns the number of distinct indices per arbor.
pub fn assign_arbor_indices(morph: &mut Morphology) -> Vec<usize> {
    let mut counts = Vec::with_capacity(morph.arbors().len());
    for arbor in 0..morph.arbors().len() {
        let mut next = 0usize;
        for id in morph.arbor_sections(arbor) {
            let inherited = parent_last_index(morph, id);
            let section = morph.section_mut(id);
            for (i, s) in section.samples_mut().iter_mut().enumerate() {
                s.arbor_index = match (i, inherited) {
                    (0, Some(shared)) => Some(shared),
                    _ => {
                        next += 1;
                        Some(next - 1)
                    }
                };
            }
        }
        counts.push(next);
    }
    counts
}

fn parent_last_index(morph: &Morphology, id: SectionId) -> Option<usize> {
    let parent = morph.section(id).parent?;
    morph.section(parent).last()?.arbor_index
}
