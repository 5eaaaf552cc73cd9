use std::cell::Cell;

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use super::sample::{Sample, polyline_length};

/// Index of a section in its morphology's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectionId(pub usize);

/// Index into the geometry produced during one reconstruction pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GeometryRef(pub usize);

/// Neurite type of a section and of the arbor it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionType {
    Axon,
    BasalDendrite,
    ApicalDendrite,
    #[default]
    Undetermined,
}

impl SectionType {
    /// SWC structure identifier.
    pub fn swc_tag(self) -> u32 {
        match self {
            SectionType::Axon => 2,
            SectionType::BasalDendrite => 3,
            SectionType::ApicalDendrite => 4,
            SectionType::Undetermined => 0,
        }
    }
}

/// An unbranched polyline between two branch points, a root or a leaf.
///
/// `parent` is a plain index and never owns anything; `children` is the
/// owning relation. Lengths are cached and dropped whenever the samples are
/// touched through [`Section::samples_mut`] or [`Section::set_samples`].
#[derive(Debug, Clone)]
pub struct Section {
    pub id: SectionId,
    /// Index of the owning arbor.
    pub arbor: usize,
    samples: Vec<Sample>,
    pub parent: Option<SectionId>,
    pub children: Vec<SectionId>,
    pub kind: SectionType,
    pub branching_order: u32,
    pub connected_to_soma: bool,
    pub far_from_soma: bool,
    /// Continuation of the parent rather than a new branch.
    pub is_primary: bool,
    /// Geometry generated for this section in the current pass.
    pub mesh_ref: Option<GeometryRef>,
    length: Cell<Option<f64>>,
    pub(crate) path_length: Cell<Option<f64>>,
}

impl Section {
    pub(crate) fn new(id: SectionId, arbor: usize, kind: SectionType, samples: Vec<Sample>) -> Self {
        let mut section = Self {
            id,
            arbor,
            samples: Vec::new(),
            parent: None,
            children: Vec::new(),
            kind,
            branching_order: 0,
            connected_to_soma: false,
            far_from_soma: false,
            is_primary: true,
            mesh_ref: None,
            length: Cell::new(None),
            path_length: Cell::new(None),
        };
        section.set_samples(samples);
        section
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Mutable access; cached lengths are invalidated.
    pub fn samples_mut(&mut self) -> &mut Vec<Sample> {
        self.invalidate();
        &mut self.samples
    }

    /// Replace the samples and renumber them.
    pub fn set_samples(&mut self, samples: Vec<Sample>) {
        self.samples = samples;
        for (i, s) in self.samples.iter_mut().enumerate() {
            s.index = i;
        }
        self.invalidate();
    }

    fn invalidate(&self) {
        self.length.set(None);
        self.path_length.set(None);
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Enough samples to produce geometry.
    pub fn is_valid(&self) -> bool {
        self.samples.len() >= 2
    }

    pub fn first(&self) -> Option<&Sample> {
        self.samples.first()
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.last()
    }

    pub fn length(&self) -> f64 {
        if let Some(length) = self.length.get() {
            return length;
        }
        let length = polyline_length(&self.samples);
        self.length.set(Some(length));
        length
    }

    /// Direction of the first non-degenerate segment.
    pub fn initial_direction(&self) -> Option<Vector3<f64>> {
        let first = self.samples.first()?.point;
        self.samples[1..]
            .iter()
            .find_map(|s| (s.point - first).try_normalize(1e-9))
    }

    /// Direction of the last non-degenerate segment.
    pub fn final_direction(&self) -> Option<Vector3<f64>> {
        let last = self.samples.last()?.point;
        self.samples
            .iter()
            .rev()
            .skip(1)
            .find_map(|s| (last - s.point).try_normalize(1e-9))
    }

    pub fn points(&self) -> impl Iterator<Item = Point3<f64>> + '_ {
        self.samples.iter().map(|s| s.point)
    }

    pub fn min_radius(&self) -> f64 {
        self.samples.iter().map(|s| s.radius).fold(f64::INFINITY, f64::min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn straight() -> Section {
        Section::new(
            SectionId(0),
            0,
            SectionType::Axon,
            vec![
                Sample::at(0.0, 0.0, 0.0, 1.0),
                Sample::at(0.0, 0.0, 0.0, 1.0),
                Sample::at(3.0, 4.0, 0.0, 1.0),
            ],
        )
    }

    #[test]
    fn test_length_cache_invalidated() {
        let mut section = straight();
        assert_relative_eq!(section.length(), 5.0);
        section.samples_mut().push(Sample::at(3.0, 4.0, 12.0, 1.0));
        assert_relative_eq!(section.length(), 17.0);
    }

    #[test]
    fn test_directions_skip_duplicates() {
        let section = straight();
        let d = section.initial_direction().unwrap();
        assert_relative_eq!(d, Vector3::new(0.6, 0.8, 0.0), epsilon = 1e-12);
        assert_relative_eq!(section.final_direction().unwrap(), d, epsilon = 1e-12);
    }

    #[test]
    fn test_set_samples_renumbers() {
        let mut section = straight();
        section.set_samples(vec![Sample::at(1.0, 0.0, 0.0, 1.0), Sample::at(2.0, 0.0, 0.0, 1.0)]);
        assert_eq!(section.samples()[1].index, 1);
        assert!(section.is_valid());
        section.set_samples(vec![Sample::at(1.0, 0.0, 0.0, 1.0)]);
        assert!(!section.is_valid());
        assert!(section.initial_direction().is_none());
    }
}
