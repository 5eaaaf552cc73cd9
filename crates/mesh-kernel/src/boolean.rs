//! Approximate mesh union by face classification.
//!
//! Faces of each operand whose centroid lies inside any other operand are
//! discarded and the survivors are welded. Faces that straddle another
//! surface are not split, so the seam along intersection curves can stay
//! open; callers that need a closed result validate and repair afterwards.

use nalgebra::{Point3, Vector3};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::error::{KernelError, KernelResult};
use crate::repair::{fix_non_manifold_edges, remove_unreferenced_vertices, weld_vertices};
use crate::Mesh;

/// Parameters for union operations.
#[derive(Debug, Clone)]
#[cfg_attr(
    feature = "pipeline-config",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct UnionParams {
    /// Vertices closer than this are merged after the union. Default: 1e-8
    pub weld_tolerance: f64,
    /// Remove excess faces on edges shared by more than two faces. Default: true
    pub fix_non_manifold: bool,
}

impl Default for UnionParams {
    fn default() -> Self {
        Self {
            weld_tolerance: 1e-8,
            fix_non_manifold: true,
        }
    }
}

/// Outcome of a union.
#[derive(Debug, Clone)]
pub struct UnionResult {
    pub mesh: Mesh,
    /// Input faces kept in the result.
    pub faces_kept: usize,
    /// Input faces found inside another operand.
    pub faces_discarded: usize,
    /// Faces removed by the non-manifold cleanup.
    pub non_manifold_fixed: usize,
}

#[derive(Debug, Clone, Copy)]
struct Aabb {
    min: Point3<f64>,
    max: Point3<f64>,
}

impl Aabb {
    fn of(mesh: &Mesh) -> Option<Self> {
        mesh.bounds().map(|(min, max)| Self { min, max })
    }

    fn contains(&self, p: &Point3<f64>) -> bool {
        (0..3).all(|i| p[i] >= self.min[i] && p[i] <= self.max[i])
    }

    fn overlaps(&self, other: &Aabb) -> bool {
        (0..3).all(|i| self.min[i] <= other.max[i] && self.max[i] >= other.min[i])
    }
}

/// Möller-Trumbore; returns true for a hit in front of the origin.
fn ray_hits_triangle(
    origin: &Point3<f64>,
    dir: &Vector3<f64>,
    v0: &Point3<f64>,
    v1: &Point3<f64>,
    v2: &Point3<f64>,
) -> bool {
    const EPS: f64 = 1e-12;
    let e1 = v1 - v0;
    let e2 = v2 - v0;
    let h = dir.cross(&e2);
    let a = e1.dot(&h);
    if a.abs() < EPS {
        return false;
    }
    let f = 1.0 / a;
    let s = origin - v0;
    let u = f * s.dot(&h);
    if !(0.0..=1.0).contains(&u) {
        return false;
    }
    let q = s.cross(&e1);
    let v = f * dir.dot(&q);
    if v < 0.0 || u + v > 1.0 {
        return false;
    }
    f * e2.dot(&q) > EPS
}

// Off-axis directions so rays rarely graze edges of axis-aligned geometry
const RAY_DIRECTIONS: [[f64; 3]; 3] = [
    [0.9187, 0.3124, 0.2412],
    [-0.2751, 0.9013, 0.3347],
    [0.1932, -0.3381, 0.9211],
];

/// Point-in-closed-mesh test by majority vote over three ray parities.
pub fn is_point_inside(point: &Point3<f64>, mesh: &Mesh) -> bool {
    let votes = RAY_DIRECTIONS
        .iter()
        .filter(|d| {
            let dir = Vector3::new(d[0], d[1], d[2]);
            let hits = mesh
                .triangles()
                .filter(|t| ray_hits_triangle(point, &dir, &t.v0, &t.v1, &t.v2))
                .count();
            hits % 2 == 1
        })
        .count();
    votes >= 2
}

/// Union of two closed meshes.
pub fn union(a: &Mesh, b: &Mesh, params: &UnionParams) -> KernelResult<UnionResult> {
    union_all(&[a.clone(), b.clone()], params)
}

/// Union of any number of closed meshes in one pass.
///
/// Operands whose bounding boxes overlap nothing are passed through intact.
pub fn union_all(meshes: &[Mesh], params: &UnionParams) -> KernelResult<UnionResult> {
    if let Some(i) = meshes.iter().position(Mesh::is_empty) {
        return Err(KernelError::BooleanFailed {
            operation: "union".into(),
            details: format!("operand {i} is empty"),
        });
    }
    if meshes.is_empty() {
        return Err(KernelError::empty("union needs at least one operand"));
    }

    let boxes: Vec<Aabb> = meshes.iter().filter_map(Aabb::of).collect();

    // For each operand, the face mask of survivors
    let masks: Vec<Vec<bool>> = meshes
        .par_iter()
        .enumerate()
        .map(|(i, mesh)| {
            let others: Vec<usize> = (0..meshes.len())
                .filter(|&j| j != i && boxes[i].overlaps(&boxes[j]))
                .collect();
            mesh.triangles()
                .map(|tri| {
                    let c = tri.centroid();
                    !others
                        .iter()
                        .any(|&j| boxes[j].contains(&c) && is_point_inside(&c, &meshes[j]))
                })
                .collect()
        })
        .collect();

    let mut result = Mesh::new();
    let mut kept = 0;
    let mut discarded = 0;
    for (mesh, mask) in meshes.iter().zip(&masks) {
        let offset = result.vertices.len() as u32;
        result.vertices.extend(mesh.vertices.iter().cloned());
        for (face, &keep) in mesh.faces.iter().zip(mask) {
            if keep {
                result.faces.push(face.map(|v| v + offset));
                kept += 1;
            } else {
                discarded += 1;
            }
        }
    }

    weld_vertices(&mut result, params.weld_tolerance);
    let non_manifold_fixed = if params.fix_non_manifold {
        fix_non_manifold_edges(&mut result)
    } else {
        0
    };
    remove_unreferenced_vertices(&mut result);

    debug!(operands = meshes.len(), kept, discarded, "Union classification");
    info!(
        operands = meshes.len(),
        faces = result.face_count(),
        "Union complete"
    );

    Ok(UnionResult {
        mesh: result,
        faces_kept: kept,
        faces_discarded: discarded,
        non_manifold_fixed,
    })
}
