//! Loop subdivision.
//!
//! Every face is split into four; old vertices are repositioned with the
//! Warren weights and new edge vertices use the 3/8-1/8 stencil. Boundary
//! edges and vertices follow the cubic B-spline rules so open meshes keep
//! their outline.

use hashbrown::HashMap;
use nalgebra::{Point3, Vector3};
use tracing::debug;

use crate::adjacency::{MeshAdjacency, edge_key};
use crate::{Mesh, Vertex};

/// Subdivision parameters.
#[derive(Debug, Clone)]
#[cfg_attr(
    feature = "pipeline-config",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct SubdivideParams {
    /// Number of passes; each quadruples the face count. Default: 1
    pub iterations: usize,
    /// Apply boundary stencils instead of leaving boundaries linear. Default: true
    pub smooth_boundary: bool,
}

impl Default for SubdivideParams {
    fn default() -> Self {
        Self {
            iterations: 1,
            smooth_boundary: true,
        }
    }
}

impl SubdivideParams {
    /// Subdivide `iterations` times.
    pub fn with_iterations(iterations: usize) -> Self {
        Self {
            iterations,
            ..Default::default()
        }
    }
}

/// Outcome of subdivision.
#[derive(Debug)]
pub struct SubdivideResult {
    pub mesh: Mesh,
    pub original_triangles: usize,
    pub final_triangles: usize,
}

/// Warren's simplification of the Loop vertex weight.
fn loop_beta(valence: usize) -> f64 {
    if valence == 3 {
        3.0 / 16.0
    } else {
        3.0 / (8.0 * valence as f64)
    }
}

fn mix(points: &[(f64, Point3<f64>)]) -> Point3<f64> {
    Point3::from(
        points
            .iter()
            .fold(Vector3::zeros(), |acc, (w, p)| acc + p.coords * *w),
    )
}

fn subdivide_once(mesh: &Mesh, smooth_boundary: bool) -> Mesh {
    let adjacency = MeshAdjacency::build(&mesh.faces);
    let pos = |v: u32| mesh.vertices[v as usize].position;

    // Boundary neighbours of each boundary vertex
    let mut boundary_ring: HashMap<u32, Vec<u32>> = HashMap::new();
    for (a, b) in adjacency.boundary_edges() {
        boundary_ring.entry(a).or_default().push(b);
        boundary_ring.entry(b).or_default().push(a);
    }

    let mut out = Mesh::with_capacity(
        mesh.vertices.len() + adjacency.edge_count(),
        mesh.faces.len() * 4,
    );

    for (v, vertex) in mesh.vertices.iter().enumerate() {
        let v = v as u32;
        let position = match boundary_ring.get(&v) {
            Some(ring) if smooth_boundary && ring.len() == 2 => mix(&[
                (0.75, pos(v)),
                (0.125, pos(ring[0])),
                (0.125, pos(ring[1])),
            ]),
            Some(_) => pos(v),
            None => {
                let ring = adjacency.vertex_neighbors(&mesh.faces, v);
                if ring.is_empty() {
                    pos(v)
                } else {
                    let beta = loop_beta(ring.len());
                    let mut weights = vec![(1.0 - beta * ring.len() as f64, pos(v))];
                    weights.extend(ring.iter().map(|&n| (beta, pos(n))));
                    mix(&weights)
                }
            }
        };
        out.vertices.push(Vertex {
            position,
            normal: None,
            ..vertex.clone()
        });
    }

    // One new vertex per edge, in sorted edge order for determinism
    let mut edges: Vec<((u32, u32), &Vec<u32>)> = adjacency
        .edge_to_faces
        .iter()
        .map(|(&e, f)| (e, f))
        .collect();
    edges.sort_unstable_by_key(|(e, _)| *e);

    let mut edge_vertex: HashMap<(u32, u32), u32> = HashMap::with_capacity(edges.len());
    for ((a, b), faces) in edges {
        let position = if faces.len() == 2 {
            let opposite = |f: u32| {
                mesh.faces[f as usize]
                    .iter()
                    .copied()
                    .find(|&x| x != a && x != b)
                    .unwrap_or(a)
            };
            mix(&[
                (0.375, pos(a)),
                (0.375, pos(b)),
                (0.125, pos(opposite(faces[0]))),
                (0.125, pos(opposite(faces[1]))),
            ])
        } else {
            mix(&[(0.5, pos(a)), (0.5, pos(b))])
        };
        // Midpoint vertices inherit the tag of the first endpoint
        let tag = mesh.vertices[a as usize].tag;
        edge_vertex.insert((a, b), out.vertices.len() as u32);
        out.vertices.push(Vertex {
            tag,
            ..Vertex::new(position)
        });
    }

    for &[a, b, c] in &mesh.faces {
        let ab = edge_vertex[&edge_key(a, b)];
        let bc = edge_vertex[&edge_key(b, c)];
        let ca = edge_vertex[&edge_key(c, a)];
        out.faces
            .extend([[a, ab, ca], [b, bc, ab], [c, ca, bc], [ab, bc, ca]]);
    }

    out
}

/// Apply Loop subdivision.
pub fn subdivide_mesh(mesh: &Mesh, params: &SubdivideParams) -> SubdivideResult {
    let mut current = mesh.clone();
    for _ in 0..params.iterations {
        if current.faces.is_empty() {
            break;
        }
        current = subdivide_once(&current, params.smooth_boundary);
    }

    debug!(
        before = mesh.face_count(),
        after = current.face_count(),
        iterations = params.iterations,
        "Loop subdivision"
    );

    SubdivideResult {
        original_triangles: mesh.face_count(),
        final_triangles: current.face_count(),
        mesh: current,
    }
}
