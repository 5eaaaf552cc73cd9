//! Mesh simplification by edge collapse with quadric error metrics.
//!
//! Each vertex carries the sum of the plane quadrics of its incident faces.
//! Edges are collapsed cheapest-first from a lazily invalidated min-heap; a
//! collapse is accepted only when it keeps the surface manifold and does not
//! flip any surviving face.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use hashbrown::HashSet;
use nalgebra::{Matrix4, Point3, Vector3, Vector4};
use tracing::{debug, info};

use crate::adjacency::MeshAdjacency;
use crate::{Mesh, Vertex};

/// Parameters for mesh decimation.
#[derive(Debug, Clone)]
#[cfg_attr(
    feature = "pipeline-config",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct DecimateParams {
    /// Target face count. Overrides `target_ratio` when set.
    pub target_triangles: Option<usize>,
    /// Fraction of faces to keep, in `(0, 1]`. Default: 0.5
    pub target_ratio: f64,
    /// Never move vertices on boundary edges. Default: true
    pub preserve_boundary: bool,
    /// Reject collapses whose quadric error exceeds this.
    pub max_error: Option<f64>,
}

impl Default for DecimateParams {
    fn default() -> Self {
        Self {
            target_triangles: None,
            target_ratio: 0.5,
            preserve_boundary: true,
            max_error: None,
        }
    }
}

impl DecimateParams {
    /// Keep a fraction of the faces.
    pub fn with_target_ratio(ratio: f64) -> Self {
        Self {
            target_ratio: ratio.clamp(0.0, 1.0),
            ..Default::default()
        }
    }

    /// Reduce to a face count.
    pub fn with_target_triangles(count: usize) -> Self {
        Self {
            target_triangles: Some(count),
            ..Default::default()
        }
    }

    fn target_for(&self, face_count: usize) -> usize {
        // A closed surface cannot go below a tetrahedron
        self.target_triangles
            .unwrap_or_else(|| (face_count as f64 * self.target_ratio).ceil() as usize)
            .max(4)
    }
}

/// Outcome of a decimation run.
#[derive(Debug, Clone)]
pub struct DecimateResult {
    /// The simplified mesh.
    pub mesh: Mesh,
    /// Face count before.
    pub original_triangles: usize,
    /// Face count after.
    pub final_triangles: usize,
    /// Edge collapses applied.
    pub collapses_performed: usize,
    /// Candidates rejected by the manifold or flip checks.
    pub collapses_rejected: usize,
}

impl DecimateResult {
    /// Achieved face ratio.
    pub fn reduction_ratio(&self) -> f64 {
        if self.original_triangles == 0 {
            1.0
        } else {
            self.final_triangles as f64 / self.original_triangles as f64
        }
    }
}

fn plane_quadric(normal: &Vector3<f64>, point: &Point3<f64>) -> Matrix4<f64> {
    let p = Vector4::new(normal.x, normal.y, normal.z, -normal.dot(&point.coords));
    p * p.transpose()
}

fn quadric_error(q: &Matrix4<f64>, p: &Point3<f64>) -> f64 {
    let h = Vector4::new(p.x, p.y, p.z, 1.0);
    h.dot(&(q * h)).max(0.0)
}

fn quadric_minimizer(q: &Matrix4<f64>) -> Option<Point3<f64>> {
    let mut m = *q;
    m.set_row(3, &Vector4::new(0.0, 0.0, 0.0, 1.0).transpose());
    if m.determinant().abs() < 1e-12 {
        return None;
    }
    let inv = m.try_inverse()?;
    Some(Point3::new(inv[(0, 3)], inv[(1, 3)], inv[(2, 3)]))
}

#[derive(Debug, Clone)]
struct Candidate {
    cost: f64,
    v1: u32,
    v2: u32,
    stamp1: u32,
    stamp2: u32,
    target: Point3<f64>,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cost.total_cmp(&other.cost) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so BinaryHeap pops the cheapest collapse
        other.cost.total_cmp(&self.cost)
    }
}

/// Mutable working state of one decimation run.
struct Collapser {
    positions: Vec<Point3<f64>>,
    quadrics: Vec<Matrix4<f64>>,
    stamps: Vec<u32>,
    alive: Vec<bool>,
    locked: Vec<bool>,
    faces: Vec<[u32; 3]>,
    face_alive: Vec<bool>,
    vertex_faces: Vec<Vec<u32>>,
    active_faces: usize,
}

impl Collapser {
    fn new(mesh: &Mesh, preserve_boundary: bool) -> Self {
        let n = mesh.vertices.len();
        let mut quadrics = vec![Matrix4::zeros(); n];
        let mut vertex_faces: Vec<Vec<u32>> = vec![Vec::new(); n];

        for (fi, face) in mesh.faces.iter().enumerate() {
            for &v in face {
                vertex_faces[v as usize].push(fi as u32);
            }
            let Some(tri) = mesh.triangle(fi) else {
                continue;
            };
            // Area weighting keeps slivers from dominating
            let Some(normal) = tri.normal() else {
                continue;
            };
            let q = plane_quadric(&normal, &tri.v0) * tri.area();
            for &v in face {
                quadrics[v as usize] += q;
            }
        }

        let mut locked = vec![false; n];
        if preserve_boundary {
            for v in MeshAdjacency::build(&mesh.faces).boundary_vertices() {
                locked[v as usize] = true;
            }
        }

        Self {
            positions: mesh.vertices.iter().map(|v| v.position).collect(),
            quadrics,
            stamps: vec![0; n],
            alive: vec![true; n],
            locked,
            faces: mesh.faces.clone(),
            face_alive: vec![true; mesh.faces.len()],
            vertex_faces,
            active_faces: mesh.faces.len(),
        }
    }

    fn live_faces(&self, v: u32) -> impl Iterator<Item = u32> + '_ {
        self.vertex_faces[v as usize]
            .iter()
            .copied()
            .filter(|&f| self.face_alive[f as usize])
    }

    fn neighbors(&self, v: u32) -> HashSet<u32> {
        self.live_faces(v)
            .flat_map(|f| self.faces[f as usize])
            .filter(|&o| o != v)
            .collect()
    }

    fn candidate(&self, v1: u32, v2: u32) -> Option<Candidate> {
        if self.locked[v1 as usize] || self.locked[v2 as usize] {
            return None;
        }
        let q = self.quadrics[v1 as usize] + self.quadrics[v2 as usize];
        let p1 = self.positions[v1 as usize];
        let p2 = self.positions[v2 as usize];
        let midpoint = Point3::from((p1.coords + p2.coords) * 0.5);

        let target = quadric_minimizer(&q)
            // Stay near the edge; a far minimizer means an ill-conditioned quadric
            .filter(|p| (p - midpoint).norm() <= (p2 - p1).norm() * 2.0)
            .unwrap_or_else(|| {
                [p1, p2, midpoint]
                    .into_iter()
                    .min_by(|a, b| quadric_error(&q, a).total_cmp(&quadric_error(&q, b)))
                    .unwrap_or(midpoint)
            });

        Some(Candidate {
            cost: quadric_error(&q, &target),
            v1,
            v2,
            stamp1: self.stamps[v1 as usize],
            stamp2: self.stamps[v2 as usize],
            target,
        })
    }

    fn is_stale(&self, c: &Candidate) -> bool {
        !self.alive[c.v1 as usize]
            || !self.alive[c.v2 as usize]
            || self.stamps[c.v1 as usize] != c.stamp1
            || self.stamps[c.v2 as usize] != c.stamp2
    }

    /// Link condition plus a normal-flip test on the surviving faces.
    fn can_collapse(&self, v1: u32, v2: u32, target: &Point3<f64>) -> bool {
        let shared: Vec<u32> = self
            .live_faces(v1)
            .filter(|&f| self.faces[f as usize].contains(&v2))
            .collect();
        if shared.len() != 2 {
            return false;
        }
        let n1 = self.neighbors(v1);
        let n2 = self.neighbors(v2);
        if n1.intersection(&n2).count() != 2 {
            return false;
        }

        for v in [v1, v2] {
            for f in self.live_faces(v) {
                if shared.contains(&f) {
                    continue;
                }
                let face = self.faces[f as usize];
                let before = face.map(|i| self.positions[i as usize]);
                let after = face.map(|i| {
                    if i == v1 || i == v2 {
                        *target
                    } else {
                        self.positions[i as usize]
                    }
                });
                let n_before = (before[1] - before[0]).cross(&(before[2] - before[0]));
                let n_after = (after[1] - after[0]).cross(&(after[2] - after[0]));
                if n_after.norm_squared() < 1e-24 || n_before.dot(&n_after) <= 0.0 {
                    return false;
                }
            }
        }
        true
    }

    fn collapse(&mut self, v1: u32, v2: u32, target: Point3<f64>) {
        self.positions[v1 as usize] = target;
        let q2 = self.quadrics[v2 as usize];
        self.quadrics[v1 as usize] += q2;
        self.alive[v2 as usize] = false;

        let moved: Vec<u32> = self.live_faces(v2).collect();
        for f in moved {
            let face = &mut self.faces[f as usize];
            if face.contains(&v1) {
                self.face_alive[f as usize] = false;
                self.active_faces -= 1;
            } else {
                for idx in face.iter_mut() {
                    if *idx == v2 {
                        *idx = v1;
                    }
                }
                self.vertex_faces[v1 as usize].push(f);
            }
        }
        self.vertex_faces[v2 as usize].clear();
        self.stamps[v1 as usize] += 1;
        self.stamps[v2 as usize] += 1;
    }

    fn into_mesh(self, source: &Mesh) -> Mesh {
        let mut remap = vec![u32::MAX; self.positions.len()];
        let mut out = Mesh::with_capacity(self.positions.len(), self.active_faces);

        for (fi, face) in self.faces.iter().enumerate() {
            if !self.face_alive[fi] {
                continue;
            }
            let mut mapped = [0u32; 3];
            for (slot, &v) in mapped.iter_mut().zip(face) {
                if remap[v as usize] == u32::MAX {
                    remap[v as usize] = out.vertices.len() as u32;
                    let original = &source.vertices[v as usize];
                    out.vertices.push(Vertex {
                        position: self.positions[v as usize],
                        normal: None,
                        ..original.clone()
                    });
                }
                *slot = remap[v as usize];
            }
            out.faces.push(mapped);
        }
        out
    }
}

/// Decimate a mesh with quadric error metrics.
///
/// Faces adjacent to a collapsed edge disappear in pairs, so the result may
/// stay slightly above the target when no further collapse is legal.
///
/// # Example
/// ```
/// use mesh_kernel::primitives::icosphere;
/// use mesh_kernel::{DecimateParams, decimate_mesh};
/// use nalgebra::Point3;
///
/// let sphere = icosphere(Point3::origin(), 1.0, 3);
/// let result = decimate_mesh(&sphere, &DecimateParams::with_target_ratio(0.25));
/// assert!(result.final_triangles < sphere.face_count());
/// ```
pub fn decimate_mesh(mesh: &Mesh, params: &DecimateParams) -> DecimateResult {
    let original = mesh.face_count();
    let target = params.target_for(original);
    if original <= target {
        return DecimateResult {
            mesh: mesh.clone(),
            original_triangles: original,
            final_triangles: original,
            collapses_performed: 0,
            collapses_rejected: 0,
        };
    }

    let mut state = Collapser::new(mesh, params.preserve_boundary);
    let mut heap: BinaryHeap<Candidate> = BinaryHeap::with_capacity(original * 3 / 2);
    for &(a, b) in MeshAdjacency::build(&mesh.faces).edge_to_faces.keys() {
        if let Some(c) = state.candidate(a, b) {
            heap.push(c);
        }
    }

    let mut performed = 0;
    let mut rejected = 0;

    while state.active_faces > target {
        let Some(c) = heap.pop() else {
            break;
        };
        if state.is_stale(&c) {
            continue;
        }
        if let Some(max_error) = params.max_error
            && c.cost > max_error
        {
            break;
        }
        if !state.can_collapse(c.v1, c.v2, &c.target) {
            rejected += 1;
            continue;
        }

        state.collapse(c.v1, c.v2, c.target);
        performed += 1;

        for n in state.neighbors(c.v1) {
            if let Some(next) = state.candidate(c.v1, n) {
                heap.push(next);
            }
        }
    }

    let final_triangles = state.active_faces;
    debug!(performed, rejected, "Edge collapse finished");
    info!(
        before = original,
        after = final_triangles,
        target,
        "Decimated mesh"
    );

    DecimateResult {
        mesh: state.into_mesh(mesh),
        original_triangles: original,
        final_triangles,
        collapses_performed: performed,
        collapses_rejected: rejected,
    }
}
