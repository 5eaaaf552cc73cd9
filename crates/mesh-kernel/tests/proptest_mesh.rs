//! Property-based tests for kernel invariants.
//!
//! Run with: cargo test -p mesh-kernel -- proptest

use mesh_kernel::primitives::icosphere;
use mesh_kernel::{DecimateParams, Mesh, RepairParams, Vertex};
use nalgebra::{Point3, Vector3};
use proptest::prelude::*;

// =============================================================================
// Strategies
// =============================================================================

fn arb_vertex() -> impl Strategy<Value = Vertex> {
    prop::array::uniform3(-50.0..50.0f64).prop_map(|[x, y, z]| Vertex::from_coords(x, y, z))
}

/// Triangle soup with valid indices, possibly degenerate or non-manifold.
fn arb_soup() -> impl Strategy<Value = Mesh> {
    (3usize..40).prop_flat_map(|n| {
        let vertices = prop::collection::vec(arb_vertex(), n);
        let faces = prop::collection::vec(prop::array::uniform3(0..n as u32), 1..60);
        (vertices, faces).prop_map(|(vertices, faces)| Mesh { vertices, faces })
    })
}

fn arb_sphere() -> impl Strategy<Value = Mesh> {
    (
        prop::array::uniform3(-20.0..20.0f64),
        0.1..10.0f64,
        0u32..3,
    )
        .prop_map(|([x, y, z], r, level)| icosphere(Point3::new(x, y, z), r, level))
}

// =============================================================================
// Repair invariants
// =============================================================================

proptest! {
    #[test]
    fn proptest_repair_never_adds_faces(mesh in arb_soup()) {
        let before = mesh.face_count();
        let mut m = mesh.clone();
        m.repair_with_config(&RepairParams::default());
        prop_assert!(m.face_count() <= before);
    }

    #[test]
    fn proptest_repair_leaves_valid_indices(mesh in arb_soup()) {
        let mut m = mesh.clone();
        m.repair_with_config(&RepairParams::default());
        prop_assert!(mesh_kernel::validate::validate_indices(&m).is_ok());
        prop_assert_eq!(m.validate().non_manifold_edge_count, 0);
    }

    #[test]
    fn proptest_repair_is_idempotent(mesh in arb_soup()) {
        let mut once = mesh.clone();
        once.repair_with_config(&RepairParams::default());
        let mut twice = once.clone();
        let report = twice.repair_with_config(&RepairParams::default());
        prop_assert_eq!(report.degenerates_removed, 0);
        prop_assert_eq!(report.duplicate_faces_removed, 0);
        prop_assert_eq!(twice.face_count(), once.face_count());
    }
}

// =============================================================================
// Closed-surface invariants
// =============================================================================

proptest! {
    #[test]
    fn proptest_translation_preserves_volume(
        mesh in arb_sphere(),
        offset in prop::array::uniform3(-100.0..100.0f64),
    ) {
        let mut moved = mesh.clone();
        moved.translate(Vector3::new(offset[0], offset[1], offset[2]));
        let a = mesh.signed_volume();
        let b = moved.signed_volume();
        prop_assert!((a - b).abs() <= 1e-6 * a.abs().max(1.0));
    }

    #[test]
    fn proptest_decimation_keeps_sphere_closed(mesh in arb_sphere(), ratio in 0.2..1.0f64) {
        let result = mesh_kernel::decimate_mesh(&mesh, &DecimateParams::with_target_ratio(ratio));
        let report = result.mesh.validate();
        prop_assert!(report.is_watertight());
        prop_assert!(report.is_manifold());
        prop_assert!(result.final_triangles <= mesh.face_count());
    }

    #[test]
    fn proptest_bounds_contain_all_vertices(mesh in arb_sphere()) {
        let (min, max) = mesh.bounds().unwrap();
        for v in &mesh.vertices {
            for i in 0..3 {
                prop_assert!(v.position[i] >= min[i] && v.position[i] <= max[i]);
            }
        }
    }
}
