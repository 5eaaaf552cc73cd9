use hashbrown::HashSet;
use nalgebra::Point3;

use super::sample::Sample;
use super::section::{Section, SectionId, SectionType};
use super::soma::Soma;
use crate::error::{NeuroError, NeuroResult};

/// One neurite tree rooted at the soma.
#[derive(Debug, Clone, PartialEq)]
pub struct Arbor {
    pub label: String,
    pub tag: u32,
    pub kind: SectionType,
    pub root: SectionId,
}

/// Astrocyte endfoot, a poly-line with radii.
#[derive(Debug, Clone, PartialEq)]
pub struct Endfoot {
    pub samples: Vec<Sample>,
}

/// Dendritic spine approximated as a capsule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spine {
    pub base: Sample,
    pub tip: Sample,
}

/// A neuron skeleton: one soma and any number of arbors.
///
/// Sections live in an arena indexed by [`SectionId`]. Branching orders are
/// set on insertion and always equal the depth below the arbor root.
#[derive(Debug, Clone, Default)]
pub struct Morphology {
    pub label: String,
    pub soma: Soma,
    sections: Vec<Section>,
    arbors: Vec<Arbor>,
    pub endfeet: Vec<Endfoot>,
    pub spines: Vec<Spine>,
    /// Options fingerprint of the last preprocessing pass.
    pub(crate) preprocessed_with: Option<u64>,
}

impl Morphology {
    pub fn new(label: impl Into<String>, soma: Soma) -> Self {
        Self {
            label: label.into(),
            soma,
            ..Default::default()
        }
    }

    /// Add a root section as a new arbor.
    pub fn add_arbor(&mut self, label: impl Into<String>, kind: SectionType, samples: Vec<Sample>) -> SectionId {
        let id = SectionId(self.sections.len());
        let arbor = self.arbors.len();
        self.sections.push(Section::new(id, arbor, kind, samples));
        self.arbors.push(Arbor {
            label: label.into(),
            tag: kind.swc_tag(),
            kind,
            root: id,
        });
        self.preprocessed_with = None;
        id
    }

    /// Add a child section below `parent`.
    pub fn add_child(&mut self, parent: SectionId, samples: Vec<Sample>) -> NeuroResult<SectionId> {
        let (arbor, kind, order) = match self.sections.get(parent.0) {
            Some(p) => (p.arbor, p.kind, p.branching_order + 1),
            None => {
                return Err(NeuroError::InvalidSkeleton {
                    details: format!("parent section {} does not exist", parent.0),
                });
            }
        };
        let id = SectionId(self.sections.len());
        let mut section = Section::new(id, arbor, kind, samples);
        section.parent = Some(parent);
        section.branching_order = order;
        self.sections.push(section);
        self.sections[parent.0].children.push(id);
        self.preprocessed_with = None;
        Ok(id)
    }

    pub fn arbors(&self) -> &[Arbor] {
        &self.arbors
    }

    pub fn arbor(&self, index: usize) -> Option<&Arbor> {
        self.arbors.get(index)
    }

    pub fn axons(&self) -> impl Iterator<Item = &Arbor> {
        self.arbors.iter().filter(|a| a.kind == SectionType::Axon)
    }

    pub fn basal_dendrites(&self) -> impl Iterator<Item = &Arbor> {
        self.arbors.iter().filter(|a| a.kind == SectionType::BasalDendrite)
    }

    pub fn apical_dendrites(&self) -> impl Iterator<Item = &Arbor> {
        self.arbors.iter().filter(|a| a.kind == SectionType::ApicalDendrite)
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, id: SectionId) -> &Section {
        &self.sections[id.0]
    }

    pub fn section_mut(&mut self, id: SectionId) -> &mut Section {
        &mut self.sections[id.0]
    }

    pub fn get_section(&self, id: SectionId) -> Option<&Section> {
        self.sections.get(id.0)
    }

    pub(crate) fn sections_mut(&mut self) -> impl Iterator<Item = &mut Section> {
        self.sections.iter_mut()
    }

    /// Replace a section's samples and drop cached path lengths below it.
    pub fn set_samples(&mut self, id: SectionId, samples: Vec<Sample>) {
        self.sections[id.0].set_samples(samples);
        for below in self.subtree(id) {
            self.sections[below.0].path_length.set(None);
        }
    }

    /// Sections below and including `root` in depth-first pre-order.
    ///
    /// Uses an explicit stack so deep trees cannot overflow.
    pub fn subtree(&self, root: SectionId) -> Vec<SectionId> {
        self.subtree_limited(root, u32::MAX)
    }

    /// Pre-order walk that stops below `max_order`.
    pub fn subtree_limited(&self, root: SectionId, max_order: u32) -> Vec<SectionId> {
        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(section) = self.sections.get(id.0) else {
                continue;
            };
            if section.branching_order > max_order {
                continue;
            }
            order.push(id);
            stack.extend(section.children.iter().rev().copied());
        }
        order
    }

    /// All sections of one arbor.
    pub fn arbor_sections(&self, arbor: usize) -> Vec<SectionId> {
        self.arbors
            .get(arbor)
            .map(|a| self.subtree(a.root))
            .unwrap_or_default()
    }

    /// Length from the arbor root to the end of `id`.
    pub fn path_length(&self, id: SectionId) -> f64 {
        // Collect uncached ancestors first, then fill top-down
        let mut chain = Vec::new();
        let mut cursor = Some(id);
        let mut base = 0.0;
        while let Some(cur) = cursor {
            let section = &self.sections[cur.0];
            if let Some(cached) = section.path_length.get() {
                base = cached;
                break;
            }
            chain.push(cur);
            cursor = section.parent;
        }
        for cur in chain.into_iter().rev() {
            let section = &self.sections[cur.0];
            base += section.length();
            section.path_length.set(Some(base));
        }
        base
    }

    /// Samples of all sections, counted per section.
    pub fn sample_count(&self) -> usize {
        self.sections.iter().map(|s| s.samples().len()).sum()
    }

    /// Sample count of one arbor.
    pub fn arbor_sample_count(&self, arbor: usize) -> usize {
        self.arbor_sections(arbor)
            .into_iter()
            .map(|id| self.section(id).samples().len())
            .sum()
    }

    /// Whether anything can be reconstructed.
    pub fn is_empty(&self) -> bool {
        self.arbors.is_empty() && self.soma.mean_radius <= 0.0 && self.soma.simulated_surface.is_none()
    }

    /// Root sample nearest to the soma for each arbor.
    pub fn root_points(&self) -> Vec<Option<Point3<f64>>> {
        self.arbors
            .iter()
            .map(|a| self.section(a.root).first().map(|s| s.point))
            .collect()
    }

    /// Check the structural invariants.
    ///
    /// Parent and children links must agree, every section must hang below
    /// exactly one arbor root, branching orders must grow by one per level
    /// and every section must have at least two samples.
    pub fn validate(&self) -> NeuroResult<()> {
        let fail = |details: String| Err(NeuroError::InvalidSkeleton { details });
        let mut seen = HashSet::with_capacity(self.sections.len());
        for (arbor_index, arbor) in self.arbors.iter().enumerate() {
            if self.sections.get(arbor.root.0).is_none_or(|s| s.parent.is_some()) {
                return fail(format!("arbor `{}` root is not a root section", arbor.label));
            }
            for id in self.subtree(arbor.root) {
                if !seen.insert(id) {
                    return fail(format!("section {} reachable twice", id.0));
                }
                let section = &self.sections[id.0];
                if section.arbor != arbor_index {
                    return fail(format!("section {} belongs to arbor {} but hangs below {}", id.0, section.arbor, arbor_index));
                }
                if section.samples().len() < 2 {
                    return fail(format!("section {} has {} samples", id.0, section.samples().len()));
                }
                match section.parent {
                    None if section.branching_order != 0 => {
                        return fail(format!("root section {} has order {}", id.0, section.branching_order));
                    }
                    Some(parent) => {
                        let p = &self.sections[parent.0];
                        if !p.children.contains(&id) {
                            return fail(format!("section {} missing from parent {}", id.0, parent.0));
                        }
                        if section.branching_order != p.branching_order + 1 {
                            return fail(format!(
                                "section {} has order {} below parent order {}",
                                id.0, section.branching_order, p.branching_order
                            ));
                        }
                    }
                    None => {}
                }
                for child in &section.children {
                    if self.sections.get(child.0).and_then(|c| c.parent) != Some(id) {
                        return fail(format!("child {} does not point back to {}", child.0, id.0));
                    }
                }
            }
        }
        if seen.len() != self.sections.len() {
            return fail(format!(
                "{} sections unreachable from any arbor",
                self.sections.len() - seen.len()
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::fixtures::forked;
    use approx::assert_relative_eq;

    #[test]
    fn test_orders_and_walk() {
        let morph = forked();
        assert!(morph.validate().is_ok());
        let order: Vec<usize> = morph.subtree(SectionId(0)).into_iter().map(|s| s.0).collect();
        assert_eq!(order, vec![0, 1, 2, 3]);
        assert_eq!(morph.section(SectionId(3)).branching_order, 2);
        assert_eq!(morph.subtree_limited(SectionId(0), 1).len(), 3);
        assert_eq!(morph.basal_dendrites().count(), 1);
        assert_eq!(morph.arbor_sample_count(0), 8);
    }

    #[test]
    fn test_path_length_cached_and_invalidated() {
        let mut morph = forked();
        assert_relative_eq!(morph.path_length(SectionId(3)), 13.0);
        morph.set_samples(SectionId(0), vec![Sample::at(0.0, 0.0, 0.0, 1.0), Sample::at(6.0, 0.0, 0.0, 1.0)]);
        assert_relative_eq!(morph.path_length(SectionId(3)), 15.0);
    }

    #[test]
    fn test_validate_catches_broken_links() {
        let mut morph = forked();
        morph.section_mut(SectionId(2)).children.clear();
        assert!(morph.validate().is_err());

        let mut morph = forked();
        morph.section_mut(SectionId(1)).branching_order = 5;
        let err = morph.validate().unwrap_err();
        assert_eq!(err.code().as_str(), "NEURO-1003");
    }

    #[test]
    fn test_add_child_rejects_unknown_parent() {
        let mut morph = forked();
        assert!(morph.add_child(SectionId(99), Vec::new()).is_err());
    }
}
