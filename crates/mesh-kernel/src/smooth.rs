//! Laplacian smoothing, optionally restricted to a vertex subset.

use hashbrown::HashSet;
use nalgebra::{Point3, Vector3};
use tracing::debug;

use crate::Mesh;
use crate::adjacency::MeshAdjacency;

/// Smoothing parameters.
#[derive(Debug, Clone)]
#[cfg_attr(
    feature = "pipeline-config",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct SmoothParams {
    /// Number of passes. Default: 1
    pub iterations: u32,
    /// Fraction of the way each vertex moves to its neighbour centroid. Default: 0.5
    pub factor: f64,
    /// Keep boundary vertices fixed. Default: true
    pub pin_boundary: bool,
    /// Taubin inflation step applied after each pass (negative, e.g. -0.53).
    /// `None` gives plain Laplacian smoothing, which shrinks closed surfaces.
    pub taubin_mu: Option<f64>,
}

impl Default for SmoothParams {
    fn default() -> Self {
        Self {
            iterations: 1,
            factor: 0.5,
            pin_boundary: true,
            taubin_mu: None,
        }
    }
}

impl SmoothParams {
    /// Plain Laplacian smoothing.
    pub fn laplacian(iterations: u32, factor: f64) -> Self {
        Self {
            iterations,
            factor,
            ..Default::default()
        }
    }

    /// Volume-preserving Taubin smoothing.
    pub fn taubin(iterations: u32) -> Self {
        Self {
            iterations,
            factor: 0.5,
            taubin_mu: Some(-0.53),
            ..Default::default()
        }
    }
}

/// One Jacobi-style pass over `movable`, writing into `positions`.
fn relax(
    positions: &mut [Point3<f64>],
    rings: &[Vec<u32>],
    movable: &[u32],
    factor: f64,
) {
    let snapshot: Vec<Point3<f64>> = movable.iter().map(|&v| positions[v as usize]).collect();
    let mut updates = Vec::with_capacity(movable.len());

    for (&v, current) in movable.iter().zip(&snapshot) {
        let ring = &rings[v as usize];
        if ring.is_empty() {
            continue;
        }
        let centroid = ring
            .iter()
            .fold(Vector3::zeros(), |acc, &n| acc + positions[n as usize].coords)
            / ring.len() as f64;
        updates.push((v, current + (centroid - current.coords) * factor));
    }

    for (v, p) in updates {
        positions[v as usize] = p;
    }
}

fn one_rings(mesh: &Mesh, adjacency: &MeshAdjacency) -> Vec<Vec<u32>> {
    (0..mesh.vertices.len() as u32)
        .map(|v| adjacency.vertex_neighbors(&mesh.faces, v))
        .collect()
}

fn run(mesh: &mut Mesh, movable: Vec<u32>, params: &SmoothParams, adjacency: &MeshAdjacency) {
    if movable.is_empty() || params.iterations == 0 || params.factor <= 0.0 {
        return;
    }
    let rings = one_rings(mesh, adjacency);
    let mut positions: Vec<Point3<f64>> = mesh.vertices.iter().map(|v| v.position).collect();

    for _ in 0..params.iterations {
        relax(&mut positions, &rings, &movable, params.factor);
        if let Some(mu) = params.taubin_mu {
            relax(&mut positions, &rings, &movable, mu);
        }
    }

    for (vertex, p) in mesh.vertices.iter_mut().zip(positions) {
        vertex.position = p;
    }
    debug!(
        vertices = movable.len(),
        iterations = params.iterations,
        "Smoothed vertices"
    );
}

/// Smooth every vertex of the mesh.
pub fn smooth_mesh(mesh: &mut Mesh, params: &SmoothParams) {
    let adjacency = MeshAdjacency::build(&mesh.faces);
    let pinned = if params.pin_boundary {
        adjacency.boundary_vertices()
    } else {
        HashSet::new()
    };
    let movable: Vec<u32> = (0..mesh.vertices.len() as u32)
        .filter(|v| !pinned.contains(v))
        .collect();
    run(mesh, movable, params, &adjacency);
}

/// Smooth only the given vertices; all others act as fixed anchors.
pub fn smooth_vertex_set(mesh: &mut Mesh, vertices: &[u32], params: &SmoothParams) {
    let adjacency = MeshAdjacency::build(&mesh.faces);
    let pinned = if params.pin_boundary {
        adjacency.boundary_vertices()
    } else {
        HashSet::new()
    };
    let mut movable: Vec<u32> = vertices
        .iter()
        .copied()
        .filter(|&v| (v as usize) < mesh.vertices.len() && !pinned.contains(&v))
        .collect();
    movable.sort_unstable();
    movable.dedup();
    run(mesh, movable, params, &adjacency);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Vertex;
    use crate::primitives::icosphere;
    use approx::assert_relative_eq;

    fn bumpy_grid() -> Mesh {
        // 3x3 grid with the centre raised; the rim is a boundary
        let mut mesh = Mesh::new();
        for y in 0..3 {
            for x in 0..3 {
                let z = if x == 1 && y == 1 { 1.0 } else { 0.0 };
                mesh.vertices.push(Vertex::from_coords(x as f64, y as f64, z));
            }
        }
        for y in 0..2u32 {
            for x in 0..2u32 {
                let i = y * 3 + x;
                mesh.faces.push([i, i + 1, i + 4]);
                mesh.faces.push([i, i + 4, i + 3]);
            }
        }
        mesh
    }

    #[test]
    fn test_boundary_pinned() {
        let mut mesh = bumpy_grid();
        let before = mesh.clone();
        smooth_mesh(&mut mesh, &SmoothParams::laplacian(3, 0.5));

        assert!(mesh.vertices[4].position.z < 0.2);
        for i in [0, 1, 2, 3, 5, 6, 7, 8] {
            assert_eq!(mesh.vertices[i].position, before.vertices[i].position);
        }
    }

    #[test]
    fn test_subset_only_moves_listed_vertices() {
        let mut mesh = icosphere(Point3::origin(), 1.0, 2);
        let before = mesh.clone();
        smooth_vertex_set(&mut mesh, &[0, 1], &SmoothParams::laplacian(1, 1.0));

        assert_ne!(mesh.vertices[0].position, before.vertices[0].position);
        for i in 2..mesh.vertex_count() {
            assert_eq!(mesh.vertices[i].position, before.vertices[i].position);
        }
    }

    #[test]
    fn test_taubin_shrinks_less_than_laplacian() {
        let sphere = icosphere(Point3::origin(), 1.0, 2);
        let mut lap = sphere.clone();
        let mut tau = sphere.clone();
        smooth_mesh(&mut lap, &SmoothParams::laplacian(10, 0.5));
        smooth_mesh(&mut tau, &SmoothParams::taubin(10));

        let v0 = sphere.signed_volume();
        assert!((v0 - tau.signed_volume()).abs() < (v0 - lap.signed_volume()).abs());
        assert_relative_eq!(tau.signed_volume(), v0, max_relative = 0.1);
    }
}
