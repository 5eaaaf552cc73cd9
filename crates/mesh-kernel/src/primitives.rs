//! Closed primitive meshes used as building blocks and test fixtures.

use hashbrown::HashMap;
use nalgebra::{Point3, Vector3};

use crate::{Mesh, Vertex};

const ICOSAHEDRON_FACES: [[u32; 3]; 20] = [
    [0, 11, 5],
    [0, 5, 1],
    [0, 1, 7],
    [0, 7, 10],
    [0, 10, 11],
    [1, 5, 9],
    [5, 11, 4],
    [11, 10, 2],
    [10, 7, 6],
    [7, 1, 8],
    [3, 9, 4],
    [3, 4, 2],
    [3, 2, 6],
    [3, 6, 8],
    [3, 8, 9],
    [4, 9, 5],
    [2, 4, 11],
    [6, 2, 10],
    [8, 6, 7],
    [9, 8, 1],
];

/// Unit-radius icosphere directions, subdivided `subdivisions` times.
fn unit_icosphere(subdivisions: u32) -> (Vec<Vector3<f64>>, Vec<[u32; 3]>) {
    let t = (1.0 + 5.0_f64.sqrt()) / 2.0;
    let mut dirs: Vec<Vector3<f64>> = [
        (-1.0, t, 0.0),
        (1.0, t, 0.0),
        (-1.0, -t, 0.0),
        (1.0, -t, 0.0),
        (0.0, -1.0, t),
        (0.0, 1.0, t),
        (0.0, -1.0, -t),
        (0.0, 1.0, -t),
        (t, 0.0, -1.0),
        (t, 0.0, 1.0),
        (-t, 0.0, -1.0),
        (-t, 0.0, 1.0),
    ]
    .iter()
    .map(|&(x, y, z)| Vector3::new(x, y, z).normalize())
    .collect();
    let mut faces = ICOSAHEDRON_FACES.to_vec();

    for _ in 0..subdivisions {
        let mut midpoints: HashMap<(u32, u32), u32> = HashMap::new();
        let mut midpoint = |a: u32, b: u32, dirs: &mut Vec<Vector3<f64>>| -> u32 {
            let key = if a < b { (a, b) } else { (b, a) };
            *midpoints.entry(key).or_insert_with(|| {
                dirs.push((dirs[a as usize] + dirs[b as usize]).normalize());
                (dirs.len() - 1) as u32
            })
        };

        let mut next = Vec::with_capacity(faces.len() * 4);
        for [a, b, c] in faces {
            let ab = midpoint(a, b, &mut dirs);
            let bc = midpoint(b, c, &mut dirs);
            let ca = midpoint(c, a, &mut dirs);
            next.extend([[a, ab, ca], [b, bc, ab], [c, ca, bc], [ab, bc, ca]]);
        }
        faces = next;
    }

    (dirs, faces)
}

/// Closed icosphere with outward winding and unit normals.
///
/// Subdivision level 0 is the icosahedron (12 vertices, 20 faces); each level
/// multiplies the face count by four.
pub fn icosphere(center: Point3<f64>, radius: f64, subdivisions: u32) -> Mesh {
    let (dirs, faces) = unit_icosphere(subdivisions);
    let mut mesh = Mesh::with_capacity(dirs.len(), faces.len());
    for dir in dirs {
        mesh.vertices.push(Vertex {
            normal: Some(dir),
            ..Vertex::new(center + dir * radius)
        });
    }
    mesh.faces = faces;
    mesh
}

/// Closed axis-aligned box with outward winding.
pub fn axis_box(min: Point3<f64>, max: Point3<f64>) -> Mesh {
    let mut mesh = Mesh::with_capacity(8, 12);
    for i in 0..8u32 {
        let x = if i & 1 == 0 { min.x } else { max.x };
        let y = if i & 2 == 0 { min.y } else { max.y };
        let z = if i & 4 == 0 { min.z } else { max.z };
        mesh.vertices.push(Vertex::from_coords(x, y, z));
    }
    mesh.faces = vec![
        // -z, +z
        [0, 2, 3],
        [0, 3, 1],
        [4, 5, 7],
        [4, 7, 6],
        // -y, +y
        [0, 1, 5],
        [0, 5, 4],
        [2, 6, 7],
        [2, 7, 3],
        // -x, +x
        [0, 4, 6],
        [0, 6, 2],
        [1, 3, 7],
        [1, 7, 5],
    ];
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adjacency::MeshAdjacency;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_icosahedron_counts() {
        let mesh = icosphere(Point3::origin(), 1.0, 0);
        assert_eq!(mesh.vertex_count(), 12);
        assert_eq!(mesh.face_count(), 20);
        assert!(MeshAdjacency::build(&mesh.faces).is_watertight());
        assert!(mesh.signed_volume() > 0.0);
    }

    #[test]
    fn test_icosphere_converges_to_sphere_volume() {
        let mesh = icosphere(Point3::new(1.0, 2.0, 3.0), 2.0, 3);
        assert_eq!(mesh.face_count(), 20 * 64);
        assert_eq!(mesh.vertex_count(), 642);
        let exact = 4.0 / 3.0 * PI * 8.0;
        assert_relative_eq!(mesh.signed_volume(), exact, max_relative = 0.02);
        for v in &mesh.vertices {
            assert_relative_eq!((v.position - Point3::new(1.0, 2.0, 3.0)).norm(), 2.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_axis_box_is_closed_and_outward() {
        let mesh = axis_box(Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 3.0, 4.0));
        assert!(MeshAdjacency::build(&mesh.faces).is_watertight());
        assert_relative_eq!(mesh.signed_volume(), 24.0, epsilon = 1e-12);
    }
}
