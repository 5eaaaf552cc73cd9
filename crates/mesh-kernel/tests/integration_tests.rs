//! End-to-end tests chaining kernel operations the way surface generators do.

use mesh_kernel::primitives::{axis_box, icosphere};
use mesh_kernel::{
    DecimateParams, HoleFillMethod, Mesh, RepairParams, SmoothParams, SubdivideParams,
    UnionParams, Vertex,
};
use nalgebra::Point3;

/// Two spheres sharing a seam of duplicated vertices, like independently
/// generated pieces that are later joined.
fn duplicated_seam() -> Mesh {
    let a = icosphere(Point3::origin(), 1.0, 2);
    Mesh::join([&a, &a.clone()])
}

#[test]
fn test_repair_collapses_duplicated_geometry() {
    let mut mesh = duplicated_seam();
    let report = mesh.repair_with_config(&RepairParams::for_joined_pieces(1e-6));

    assert_eq!(report.vertices_welded, 162);
    assert_eq!(report.duplicate_faces_removed, 320);
    assert!(mesh.validate().is_closed_solid());
    assert_eq!(mesh.vertex_count(), 162);
}

#[test]
fn test_decimate_then_subdivide_round_trip_stays_closed() {
    let sphere = icosphere(Point3::origin(), 3.0, 3);
    let coarse = sphere.decimate(&DecimateParams::with_target_ratio(0.2));
    let fine = coarse.subdivide(&SubdivideParams::default());

    let report = fine.validate();
    assert!(report.is_closed_solid());
    assert_eq!(report.euler_characteristic, 2);
    assert_eq!(fine.face_count(), coarse.face_count() * 4);
}

#[test]
fn test_cut_smooth_and_reclose() {
    // Open a cap, smooth with the rim pinned, then close it again
    let mut mesh = icosphere(Point3::origin(), 1.0, 2);
    mesh.faces.retain(|f| !f.contains(&0));
    let rim_before: Vec<Point3<f64>> = mesh.vertices.iter().map(|v| v.position).collect();

    mesh.smooth(&SmoothParams::laplacian(2, 0.3));
    let loops = mesh_kernel::detect_holes(&mesh).unwrap();
    assert_eq!(loops.len(), 1);
    for &v in &loops[0].vertices {
        assert_eq!(mesh.vertices[v as usize].position, rim_before[v as usize]);
    }

    mesh_kernel::fill_holes(&mut mesh, 64, HoleFillMethod::CentroidFan).unwrap();
    mesh_kernel::repair::remove_unreferenced_vertices(&mut mesh);
    assert!(mesh.validate().is_closed_solid());
}

#[test]
fn test_union_of_chain_then_repair() {
    let operands: Vec<Mesh> = (0..3)
        .map(|i| icosphere(Point3::new(i as f64 * 1.5, 0.0, 0.0), 1.0, 2))
        .collect();
    let mut result = mesh_kernel::union_all(&operands, &UnionParams::default())
        .unwrap()
        .mesh;
    result.repair_with_config(&RepairParams::default());

    let report = result.validate();
    assert!(report.is_manifold());
    assert!(!report.is_inside_out());
    let extent = result.extent();
    assert!(extent.x > 4.9 && extent.x < 5.1);
}

#[test]
fn test_island_removal_keeps_main_body() {
    let mut mesh = icosphere(Point3::origin(), 5.0, 3);
    let speck = axis_box(Point3::new(10.0, 0.0, 0.0), Point3::new(10.1, 0.1, 0.1));
    mesh.append(&speck);

    assert_eq!(mesh.components().component_count(), 2);
    assert_eq!(mesh_kernel::keep_largest_component(&mut mesh), 1);
    assert_eq!(mesh.face_count(), 1280);
    assert!(mesh.vertices.iter().all(|v| v.position.x < 6.0));
}

#[test]
fn test_tags_survive_processing() {
    let mut mesh = icosphere(Point3::origin(), 1.0, 2);
    mesh.set_tag(7);
    mesh.vertices.push(Vertex::tagged(Point3::new(9.0, 9.0, 9.0), 3));

    mesh.repair_with_config(&RepairParams::default());
    let decimated = mesh.decimate(&DecimateParams::with_target_ratio(0.5));
    let subdivided = decimated.subdivide(&SubdivideParams::default());

    assert!(subdivided.vertices.iter().all(|v| v.tag == Some(7)));
}
