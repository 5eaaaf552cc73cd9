//! Counts and extents of a skeleton.

use nalgebra::Point3;

use super::morphology::Morphology;

/// Summary of one arbor.
#[derive(Debug, Clone, PartialEq)]
pub struct ArborStats {
    pub label: String,
    pub sections: usize,
    pub samples: usize,
    pub total_length: f64,
    pub max_branching_order: u32,
}

/// Summary of a whole morphology.
#[derive(Debug, Clone, PartialEq)]
pub struct MorphologyStats {
    pub arbors: Vec<ArborStats>,
    pub sections: usize,
    pub samples: usize,
    pub total_length: f64,
    pub max_branching_order: u32,
    /// Box around all sample spheres and the soma.
    pub bounds: Option<(Point3<f64>, Point3<f64>)>,
}

impl Morphology {
    pub fn arbor_stats(&self, arbor: usize) -> Option<ArborStats> {
        let label = self.arbor(arbor)?.label.clone();
        let sections = self.arbor_sections(arbor);
        let mut stats = ArborStats {
            label,
            sections: sections.len(),
            samples: 0,
            total_length: 0.0,
            max_branching_order: 0,
        };
        for id in sections {
            let section = self.section(id);
            stats.samples += section.samples().len();
            stats.total_length += section.length();
            stats.max_branching_order = stats.max_branching_order.max(section.branching_order);
        }
        Some(stats)
    }

    pub fn stats(&self) -> MorphologyStats {
        let arbors: Vec<ArborStats> = (0..self.arbors().len())
            .filter_map(|i| self.arbor_stats(i))
            .collect();
        MorphologyStats {
            sections: arbors.iter().map(|a| a.sections).sum(),
            samples: arbors.iter().map(|a| a.samples).sum(),
            total_length: arbors.iter().map(|a| a.total_length).sum(),
            max_branching_order: arbors.iter().map(|a| a.max_branching_order).max().unwrap_or(0),
            bounds: self.bounds(),
            arbors,
        }
    }

    pub fn bounds(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let mut bounds: Option<(Point3<f64>, Point3<f64>)> = None;
        let mut grow = |p: Point3<f64>, r: f64| {
            let (min, max) = bounds.get_or_insert((p, p));
            for axis in 0..3 {
                min[axis] = min[axis].min(p[axis] - r);
                max[axis] = max[axis].max(p[axis] + r);
            }
        };
        if self.soma.mean_radius > 0.0 {
            grow(self.soma.centroid, self.soma.mean_radius);
        }
        for section in self.sections() {
            for s in section.samples() {
                grow(s.point, s.radius);
            }
        }
        bounds
    }
}

#[cfg(test)]
mod tests {
    use crate::skeleton::fixtures::forked;
    use approx::assert_relative_eq;

    #[test]
    fn test_fork_stats() {
        let stats = forked().stats();
        assert_eq!(stats.sections, 4);
        assert_eq!(stats.samples, 8);
        assert_eq!(stats.max_branching_order, 2);
        assert_relative_eq!(stats.total_length, 4.0 + 5.0 + 5.0 + 4.0);
        let (min, max) = stats.bounds.unwrap();
        assert_relative_eq!(min.x, -2.0);
        assert_relative_eq!(max.x, 9.5);
    }
}
