//! Boundary loop detection and hole closing.
//!
//! Loops are traced along directed boundary half-edges, so every loop knows
//! the winding of the faces around it and patches come out consistently
//! oriented with the surrounding surface.

use hashbrown::{HashMap, HashSet};
use nalgebra::{Point3, Vector3};
use tracing::{debug, warn};

use crate::error::{KernelError, KernelResult};
use crate::{Mesh, Vertex};

/// A closed chain of boundary vertices.
///
/// Consecutive vertices `(v[i], v[i+1])` are half-edges of existing faces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryLoop {
    pub vertices: Vec<u32>,
}

impl BoundaryLoop {
    /// Number of edges in the loop.
    pub fn edge_count(&self) -> usize {
        self.vertices.len()
    }

    /// Mean of the loop vertex positions.
    pub fn centroid(&self, mesh: &Mesh) -> Point3<f64> {
        let sum = self
            .vertices
            .iter()
            .fold(Vector3::zeros(), |acc, &v| acc + mesh.vertices[v as usize].position.coords);
        Point3::from(sum / self.vertices.len().max(1) as f64)
    }
}

/// How a hole is triangulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "pipeline-config",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum HoleFillMethod {
    /// Fan around a new vertex at the loop centroid.
    #[default]
    CentroidFan,
    /// Ear clipping over the loop vertices, no new vertices.
    EarClip,
}

/// Find all boundary loops.
///
/// Returns an error if a boundary vertex has more than one outgoing boundary
/// half-edge, which makes the loops ambiguous.
pub fn detect_holes(mesh: &Mesh) -> KernelResult<Vec<BoundaryLoop>> {
    let mut half_edges: HashSet<(u32, u32)> = HashSet::with_capacity(mesh.faces.len() * 3);
    for &[a, b, c] in &mesh.faces {
        half_edges.extend([(a, b), (b, c), (c, a)]);
    }

    // Boundary half-edges, keyed by start vertex
    let mut next: HashMap<u32, u32> = HashMap::new();
    let mut starts: Vec<u32> = Vec::new();
    for &(a, b) in &half_edges {
        if half_edges.contains(&(b, a)) {
            continue;
        }
        if next.insert(a, b).is_some() {
            return Err(KernelError::HoleFillFailed {
                details: format!("vertex {a} has several outgoing boundary edges"),
            });
        }
        starts.push(a);
    }
    starts.sort_unstable();

    let mut visited: HashSet<u32> = HashSet::new();
    let mut loops = Vec::new();
    for start in starts {
        if visited.contains(&start) {
            continue;
        }
        let mut vertices = vec![start];
        visited.insert(start);
        let mut current = start;
        loop {
            let Some(&n) = next.get(&current) else {
                return Err(KernelError::HoleFillFailed {
                    details: format!("boundary chain through vertex {current} is not closed"),
                });
            };
            if n == start {
                break;
            }
            if !visited.insert(n) {
                return Err(KernelError::HoleFillFailed {
                    details: format!("boundary chain revisits vertex {n}"),
                });
            }
            vertices.push(n);
            current = n;
        }
        loops.push(BoundaryLoop { vertices });
    }

    debug!(loops = loops.len(), "Detected boundary loops");
    Ok(loops)
}

fn fill_fan(mesh: &mut Mesh, boundary: &BoundaryLoop) {
    let centroid = boundary.centroid(mesh);
    // The fan centre takes its labels from the first boundary vertex
    let first = &mesh.vertices[boundary.vertices[0] as usize];
    let (tag, uv) = (first.tag, first.uv);
    let c = mesh.vertices.len() as u32;
    mesh.vertices.push(Vertex {
        tag,
        uv,
        ..Vertex::new(centroid)
    });
    let n = boundary.vertices.len();
    for i in 0..n {
        let a = boundary.vertices[i];
        let b = boundary.vertices[(i + 1) % n];
        mesh.faces.push([b, a, c]);
    }
}

/// Newell normal of a polygon.
fn polygon_normal(points: &[Point3<f64>]) -> Vector3<f64> {
    let mut n = Vector3::zeros();
    for i in 0..points.len() {
        let p = points[i];
        let q = points[(i + 1) % points.len()];
        n.x += (p.y - q.y) * (p.z + q.z);
        n.y += (p.z - q.z) * (p.x + q.x);
        n.z += (p.x - q.x) * (p.y + q.y);
    }
    n
}

fn fill_ear_clip(mesh: &mut Mesh, boundary: &BoundaryLoop) {
    // Patch winding is the reverse of the boundary half-edges
    let mut ring: Vec<u32> = boundary.vertices.iter().rev().copied().collect();
    let points: Vec<Point3<f64>> = ring.iter().map(|&v| mesh.vertices[v as usize].position).collect();
    let normal = polygon_normal(&points);
    if normal.norm_squared() < 1e-24 {
        fill_fan(mesh, boundary);
        return;
    }

    let pos = |v: u32, mesh: &Mesh| mesh.vertices[v as usize].position;
    let mut patch = Vec::with_capacity(ring.len());
    let mut guard = 0;
    while ring.len() > 3 {
        let n = ring.len();
        let mut clipped = false;
        for i in 0..n {
            let (a, b, c) = (ring[(i + n - 1) % n], ring[i], ring[(i + 1) % n]);
            let (pa, pb, pc) = (pos(a, mesh), pos(b, mesh), pos(c, mesh));
            if (pb - pa).cross(&(pc - pb)).dot(&normal) <= 0.0 {
                continue;
            }
            let contains_other = ring.iter().any(|&v| {
                v != a && v != b && v != c && point_in_triangle(&pos(v, mesh), &pa, &pb, &pc, &normal)
            });
            if contains_other {
                continue;
            }
            patch.push([a, b, c]);
            ring.remove(i);
            clipped = true;
            break;
        }
        guard += 1;
        if !clipped || guard > boundary.vertices.len() * 2 {
            warn!(remaining = ring.len(), "Ear clipping stalled, falling back to fan");
            fill_fan(mesh, boundary);
            return;
        }
    }
    patch.push([ring[0], ring[1], ring[2]]);
    mesh.faces.extend(patch);
}

fn point_in_triangle(
    p: &Point3<f64>,
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
    normal: &Vector3<f64>,
) -> bool {
    let side = |u: &Point3<f64>, v: &Point3<f64>| (v - u).cross(&(p - u)).dot(normal) >= 0.0;
    side(a, b) && side(b, c) && side(c, a)
}

/// Close one boundary loop.
pub fn fill_hole(mesh: &mut Mesh, boundary: &BoundaryLoop, method: HoleFillMethod) {
    match boundary.vertices.len() {
        0..=2 => {}
        3 => {
            let v = &boundary.vertices;
            mesh.faces.push([v[2], v[1], v[0]]);
        }
        _ => match method {
            HoleFillMethod::CentroidFan => fill_fan(mesh, boundary),
            HoleFillMethod::EarClip => fill_ear_clip(mesh, boundary),
        },
    }
}

/// Close every hole with at most `max_edges` edges.
///
/// Returns the number of holes closed.
pub fn fill_holes(mesh: &mut Mesh, max_edges: usize, method: HoleFillMethod) -> KernelResult<usize> {
    let loops = detect_holes(mesh)?;
    let mut filled = 0;
    for boundary in loops.iter().filter(|l| l.edge_count() <= max_edges) {
        fill_hole(mesh, boundary, method);
        filled += 1;
    }
    let skipped = loops.len() - filled;
    if skipped > 0 {
        warn!(skipped, max_edges, "Left holes larger than the limit open");
    }
    debug!(filled, "Closed holes");
    Ok(filled)
}
