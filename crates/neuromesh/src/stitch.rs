//! Soma-arbor junction repair.
//!
//! For every soma-connected arbor the soma vertices around the root's
//! bridging point are pulled out towards the disc where the root starts,
//! then smoothed among themselves. The rest of the soma is left untouched.
//! Arbor meshes are not modified; they are appended to the soma when the
//! output is aggregated.

use mesh_kernel::{Mesh, SmoothParams, smooth_vertex_set};
use nalgebra::{Point3, Vector3};
use tracing::{debug, info};

use crate::connectivity::bridging_point;
use crate::options::ReconstructionOptions;
use crate::skeleton::{Connectivity, Morphology};

/// Laplacian step of the junction smoothing.
const JUNCTION_SMOOTHING_FACTOR: f64 = 0.5;

/// Soma region selected for one arbor.
#[derive(Debug, Clone, PartialEq)]
pub struct Junction {
    pub arbor: usize,
    pub bridging: Point3<f64>,
    /// First sample of the root.
    pub root_start: Point3<f64>,
    pub direction: Vector3<f64>,
    pub radius: f64,
    /// Soma vertices within reach of the bridging point.
    pub vertices: Vec<u32>,
}

impl Junction {
    /// Selection radius around the bridging point.
    pub fn reach(&self, options: &ReconstructionOptions) -> f64 {
        options.calibration.stitch_radius_factor * self.radius
    }

    /// Where `p` moves when fully pulled: its projection onto the root's
    /// start plane, kept inside the start disc.
    fn target(&self, p: &Point3<f64>) -> Point3<f64> {
        let offset = p - self.root_start;
        let in_plane = offset - self.direction * offset.dot(&self.direction);
        let norm = in_plane.norm();
        if norm > self.radius {
            self.root_start + in_plane * (self.radius / norm)
        } else {
            self.root_start + in_plane
        }
    }
}

/// Select the junction region of every soma-connected arbor.
pub fn find_junctions(soma_mesh: &Mesh, morph: &Morphology, options: &ReconstructionOptions) -> Vec<Junction> {
    let centroid = morph.soma.centroid;
    let mut junctions = Vec::new();
    for (arbor, info) in morph.arbors().iter().enumerate() {
        if morph.soma.connectivity(arbor) != Some(Connectivity::Connected) {
            continue;
        }
        let root = morph.section(info.root);
        let (Some(first), Some(bridging)) = (
            root.first(),
            bridging_point(root, options.calibration.bridging_fraction),
        ) else {
            continue;
        };
        let Some(direction) = root.initial_direction() else {
            continue;
        };
        let mut junction = Junction {
            arbor,
            bridging,
            root_start: first.point,
            direction,
            radius: first.radius,
            vertices: Vec::new(),
        };
        let reach = junction.reach(options);
        junction.vertices = soma_mesh
            .vertices
            .iter()
            .enumerate()
            .filter(|(_, v)| {
                (v.position - bridging).norm() <= reach && (v.position - centroid).dot(&direction) >= 0.0
            })
            .map(|(i, _)| i as u32)
            .collect();
        if !junction.vertices.is_empty() {
            junctions.push(junction);
        }
    }
    junctions
}

/// Pull and smooth the junction regions of `soma_mesh`.
///
/// Returns the number of junctions repaired.
pub fn stitch_soma(soma_mesh: &mut Mesh, morph: &Morphology, options: &ReconstructionOptions) -> usize {
    let junctions = find_junctions(soma_mesh, morph, options);
    let smoothing = SmoothParams::laplacian(
        options.calibration.stitch_smoothing_iterations,
        JUNCTION_SMOOTHING_FACTOR,
    );
    for junction in &junctions {
        let reach = junction.reach(options);
        for &v in &junction.vertices {
            let p = soma_mesh.vertices[v as usize].position;
            let weight = (1.0 - (p - junction.bridging).norm() / reach).clamp(0.0, 1.0);
            let target = junction.target(&p);
            soma_mesh.vertices[v as usize].position = p + (target - p) * weight;
        }
        smooth_vertex_set(soma_mesh, &junction.vertices, &smoothing);
        debug!(
            arbor = junction.arbor,
            vertices = junction.vertices.len(),
            "Junction stitched"
        );
    }
    if !junctions.is_empty() {
        info!(junctions = junctions.len(), "Arbors stitched to soma");
    }
    junctions.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::classify;
    use crate::skeleton::{Sample, SectionType, Soma};
    use mesh_kernel::primitives::icosphere;

    fn morph_with_root(start: [f64; 3], end: [f64; 3]) -> Morphology {
        morph_with_soma(2.0, start, end)
    }

    fn morph_with_soma(soma_radius: f64, start: [f64; 3], end: [f64; 3]) -> Morphology {
        let mut morph = Morphology::new("s", Soma::new(Point3::origin(), soma_radius));
        morph.add_arbor(
            "basal",
            SectionType::BasalDendrite,
            vec![Sample::new(Point3::from(start), 0.8), Sample::new(Point3::from(end), 0.8)],
        );
        classify(&mut morph, &ReconstructionOptions::default());
        morph
    }

    #[test]
    fn test_junction_selects_facing_vertices() {
        let morph = morph_with_root([2.0, 0.0, 0.0], [3.0, 0.0, 0.0]);
        let soma = icosphere(Point3::origin(), 2.0, 3);
        let junctions = find_junctions(&soma, &morph, &ReconstructionOptions::default());
        assert_eq!(junctions.len(), 1);
        let j = &junctions[0];
        assert!((j.bridging.x - 1.25).abs() < 1e-12);
        assert!(j.vertices.iter().all(|v| soma.vertices[*v as usize].position.x >= 0.0));
    }

    #[test]
    fn test_stitch_bulges_towards_root_only() {
        let morph = morph_with_root([2.0, 0.0, 0.0], [3.0, 0.0, 0.0]);
        let options = ReconstructionOptions::default();
        let original = icosphere(Point3::origin(), 2.0, 3);
        let selected = find_junctions(&original, &morph, &options).remove(0).vertices;
        let mut soma = original.clone();
        assert_eq!(stitch_soma(&mut soma, &morph, &options), 1);
        assert!(soma.validate().is_watertight());
        // The selected region moves out towards the root start
        let spread = |m: &Mesh| -> f64 {
            selected
                .iter()
                .map(|v| (m.vertices[*v as usize].position - Point3::new(2.0, 0.0, 0.0)).norm())
                .sum()
        };
        assert!(spread(&soma) < spread(&original));
        for (a, b) in soma.vertices.iter().zip(&original.vertices) {
            if b.position.x < 0.0 {
                assert_eq!(a.position, b.position);
            }
        }
    }

    #[test]
    fn test_long_first_segment_is_stitched() {
        // First segment twice as long as the soma radius
        let morph = morph_with_soma(5.0, [5.0, 0.0, 0.0], [15.0, 0.0, 0.0]);
        let options = ReconstructionOptions::default();
        let mut soma = icosphere(Point3::origin(), 5.0, 3);
        let junctions = find_junctions(&soma, &morph, &options);
        assert_eq!(junctions.len(), 1);
        assert!((junctions[0].bridging.x - 4.25).abs() < 1e-12);
        assert_eq!(stitch_soma(&mut soma, &morph, &options), 1);
        assert!(soma.validate().is_watertight());
    }

    #[test]
    fn test_far_root_is_not_stitched() {
        let morph = morph_with_root([40.0, 0.0, 0.0], [45.0, 0.0, 0.0]);
        let mut soma = icosphere(Point3::origin(), 2.0, 3);
        assert_eq!(stitch_soma(&mut soma, &morph, &ReconstructionOptions::default()), 0);
    }
}
