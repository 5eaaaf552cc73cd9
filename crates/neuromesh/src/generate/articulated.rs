//! Articulated proxy: a sphere at every joint and an independent capped
//! tube per section. Cheap, self-overlapping and only meant to be
//! voxelized.

use mesh_kernel::Mesh;
use mesh_kernel::primitives::icosphere;

use super::paths::prepend_anchors;
use super::piecewise::TubeSet;
use super::tube::{TubeCaps, TubeProfile, sweep_tube};
use crate::connectivity::{AnchorStyle, anchor_points};
use crate::options::ReconstructionOptions;
use crate::skeleton::{Morphology, Sample};

/// Joint spheres are coarse; the voxel grid hides their facets.
const JOINT_SUBDIVISIONS: u32 = 1;

/// Articulated proxy of one arbor with radii raised to `radius_floor`.
pub fn articulated_arbor(morph: &Morphology, arbor: usize, options: &ReconstructionOptions, radius_floor: f64) -> Option<TubeSet> {
    let info = morph.arbor(arbor)?;
    let profile = TubeProfile::new(options.bevel_sides);
    let anchors = anchor_points(morph, arbor, options, AnchorStyle::Tube);
    let mut set = TubeSet::default();

    for id in morph.subtree_limited(info.root, options.max_branching_order(info.kind)) {
        let section = morph.section(id);
        if !section.is_valid() {
            continue;
        }
        let mut samples: Vec<Sample> = section
            .samples()
            .iter()
            .map(|s| Sample {
                radius: s.radius.max(radius_floor),
                ..*s
            })
            .collect();
        if id == info.root {
            prepend_anchors(&mut samples, &anchors);
        }
        let tube = sweep_tube(&samples, &profile, TubeCaps::BOTH);
        if tube.is_empty() {
            continue;
        }
        set.tubes.push(tube);
        // Joints at both ends; interior samples are covered by the tube
        for joint in [samples.first(), samples.last()].into_iter().flatten() {
            set.tubes.push(icosphere(joint.point, joint.radius, JOINT_SUBDIVISIONS));
        }
        set.sections.push(id);
    }
    if set.tubes.is_empty() {
        return None;
    }
    set.mesh = Mesh::join(&set.tubes);
    Some(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::SomaRepresentation;
    use crate::skeleton::fixtures::forked;

    #[test]
    fn test_tubes_and_joints() {
        let morph = forked();
        let options = ReconstructionOptions {
            soma: SomaRepresentation::Ignore,
            ..Default::default()
        };
        let set = articulated_arbor(&morph, 0, &options, 0.2).unwrap();
        assert_eq!(set.sections.len(), 4);
        // One tube and two joint spheres per section
        assert_eq!(set.tubes.len(), 12);
        assert_eq!(set.mesh.components().component_count(), 12);
        assert!(set.tubes.iter().all(|t| t.validate().is_closed_solid()));
    }
}
