//! Swept tubes.
//!
//! A tube is a ring of `sides` vertices per sample, oriented by
//! rotation-minimising frames so the rings do not twist along the path.
//! Quads between rings are split into two outward-facing triangles and the
//! ends are closed with fans around a centre vertex when requested.

use mesh_kernel::{Mesh, Vertex};
use nalgebra::{Point3, Vector3};

use crate::preprocess::orthonormal_pair;
use crate::skeleton::Sample;

/// Radii below this are raised so rings never collapse to a point.
const MIN_TUBE_RADIUS: f64 = 1e-6;

/// Regular polygon used as the tube cross-section.
#[derive(Debug, Clone)]
pub struct TubeProfile {
    ring: Vec<(f64, f64)>,
}

impl TubeProfile {
    pub fn new(sides: usize) -> Self {
        let sides = sides.max(3);
        let ring = (0..sides)
            .map(|k| {
                let angle = std::f64::consts::TAU * k as f64 / sides as f64;
                (angle.cos(), angle.sin())
            })
            .collect();
        Self { ring }
    }

    pub fn sides(&self) -> usize {
        self.ring.len()
    }
}

/// Which ends of a tube are closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TubeCaps {
    pub start: bool,
    pub end: bool,
}

impl TubeCaps {
    pub const BOTH: TubeCaps = TubeCaps { start: true, end: true };
    pub const NONE: TubeCaps = TubeCaps { start: false, end: false };

    pub fn both(enabled: bool) -> Self {
        if enabled { Self::BOTH } else { Self::NONE }
    }
}

/// Consecutive samples closer than this are merged before sweeping.
const DUPLICATE_DISTANCE: f64 = 1e-9;

/// Sweep `profile` along `path`.
///
/// Returns an empty mesh when fewer than two distinct points remain.
pub fn sweep_tube(path: &[Sample], profile: &TubeProfile, caps: TubeCaps) -> Mesh {
    let mut samples: Vec<Sample> = Vec::with_capacity(path.len());
    for s in path {
        match samples.last() {
            Some(prev) if prev.distance(s) <= DUPLICATE_DISTANCE => {}
            _ => samples.push(*s),
        }
    }
    let n = samples.len();
    if n < 2 {
        return Mesh::new();
    }

    let tangents = tangents(&samples);
    let normals = rotation_minimising_normals(&samples, &tangents);
    let sides = profile.sides();

    let mut arc = Vec::with_capacity(n);
    let mut walked = 0.0;
    for (i, s) in samples.iter().enumerate() {
        if i > 0 {
            walked += samples[i - 1].distance(s);
        }
        arc.push(walked);
    }
    let total = walked.max(f64::EPSILON);

    let mut mesh = Mesh::with_capacity(n * sides + 2, 2 * sides * n);
    for (i, s) in samples.iter().enumerate() {
        let normal = normals[i];
        let binormal = tangents[i].cross(&normal);
        let radius = s.radius.max(MIN_TUBE_RADIUS);
        for (k, (c, sn)) in profile.ring.iter().enumerate() {
            let position = s.point + (normal * *c + binormal * *sn) * radius;
            mesh.vertices.push(Vertex {
                uv: Some([k as f64 / sides as f64, arc[i] / total]),
                ..Vertex::new(position)
            });
        }
    }

    let ring = |i: usize, k: usize| (i * sides + k % sides) as u32;
    for i in 0..n - 1 {
        for k in 0..sides {
            let a = ring(i, k);
            let b = ring(i, k + 1);
            let c = ring(i + 1, k + 1);
            let d = ring(i + 1, k);
            mesh.faces.push([a, b, c]);
            mesh.faces.push([a, c, d]);
        }
    }

    if caps.start {
        let center = push_center(&mut mesh, samples[0].point, 0.0);
        for k in 0..sides {
            mesh.faces.push([center, ring(0, k + 1), ring(0, k)]);
        }
    }
    if caps.end {
        let center = push_center(&mut mesh, samples[n - 1].point, 1.0);
        for k in 0..sides {
            mesh.faces.push([center, ring(n - 1, k), ring(n - 1, k + 1)]);
        }
    }
    mesh
}

fn push_center(mesh: &mut Mesh, point: Point3<f64>, v: f64) -> u32 {
    mesh.vertices.push(Vertex {
        uv: Some([0.5, v]),
        ..Vertex::new(point)
    });
    (mesh.vertices.len() - 1) as u32
}

/// Unit tangents: central differences inside, one-sided at the ends.
fn tangents(samples: &[Sample]) -> Vec<Vector3<f64>> {
    let n = samples.len();
    (0..n)
        .map(|i| {
            let prev = samples[i.saturating_sub(1)].point;
            let next = samples[(i + 1).min(n - 1)].point;
            (next - prev)
                .try_normalize(1e-12)
                .or_else(|| (samples[n - 1].point - samples[0].point).try_normalize(1e-12))
                .unwrap_or_else(Vector3::z)
        })
        .collect()
}

/// Frame normals by the double reflection method.
fn rotation_minimising_normals(samples: &[Sample], tangents: &[Vector3<f64>]) -> Vec<Vector3<f64>> {
    let mut normals = Vec::with_capacity(samples.len());
    normals.push(orthonormal_pair(&tangents[0]).0);
    for i in 0..samples.len() - 1 {
        let r = normals[i];
        let v1 = samples[i + 1].point - samples[i].point;
        let c1 = v1.norm_squared();
        let (r_l, t_l) = if c1 > 1e-18 {
            (
                r - v1 * (2.0 / c1 * v1.dot(&r)),
                tangents[i] - v1 * (2.0 / c1 * v1.dot(&tangents[i])),
            )
        } else {
            (r, tangents[i])
        };
        let v2 = tangents[i + 1] - t_l;
        let c2 = v2.norm_squared();
        let next = if c2 > 1e-18 {
            r_l - v2 * (2.0 / c2 * v2.dot(&r_l))
        } else {
            r_l
        };
        // Re-orthogonalise against drift
        let t = tangents[i + 1];
        let next = (next - t * t.dot(&next))
            .try_normalize(1e-12)
            .unwrap_or_else(|| orthonormal_pair(&t).0);
        normals.push(next);
    }
    normals
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use mesh_kernel::validate_mesh;

    fn bent_path() -> Vec<Sample> {
        vec![
            Sample::at(0.0, 0.0, 0.0, 1.0),
            Sample::at(5.0, 0.0, 0.0, 1.0),
            Sample::at(5.0, 0.0, 0.0, 1.0),
            Sample::at(8.0, 3.0, 0.0, 0.8),
            Sample::at(8.0, 8.0, 1.0, 0.5),
        ]
    }

    #[test]
    fn test_capped_tube_is_closed() {
        let mesh = sweep_tube(&bent_path(), &TubeProfile::new(8), TubeCaps::BOTH);
        assert_eq!(mesh.vertex_count(), 4 * 8 + 2);
        let report = validate_mesh(&mesh);
        assert!(report.is_watertight());
        assert!(report.is_manifold());
        assert_eq!(report.euler_characteristic, 2);
        assert!(mesh.signed_volume() > 0.0);
    }

    #[test]
    fn test_straight_tube_volume() {
        let path = [Sample::at(0.0, 0.0, 0.0, 1.0), Sample::at(0.0, 0.0, 10.0, 1.0)];
        let mesh = sweep_tube(&path, &TubeProfile::new(64), TubeCaps::BOTH);
        // Inscribed 64-gon prism, close to a cylinder
        assert_relative_eq!(mesh.volume(), std::f64::consts::PI * 10.0, max_relative = 0.01);
    }

    #[test]
    fn test_uncapped_tube_has_two_loops() {
        let mesh = sweep_tube(&bent_path(), &TubeProfile::new(6), TubeCaps::NONE);
        let loops = mesh_kernel::detect_holes(&mesh).unwrap();
        assert_eq!(loops.len(), 2);
        assert!(loops.iter().all(|l| l.edge_count() == 6));
    }

    #[test]
    fn test_degenerate_path_is_empty() {
        let p = Sample::at(1.0, 1.0, 1.0, 1.0);
        assert!(sweep_tube(&[p, p], &TubeProfile::new(8), TubeCaps::BOTH).is_empty());
    }

    #[test]
    fn test_rings_stay_round() {
        let path = bent_path();
        let mesh = sweep_tube(&path, &TubeProfile::new(8), TubeCaps::NONE);
        // Last ring vertices all at the last radius from the last sample
        for v in &mesh.vertices[3 * 8..4 * 8] {
            assert_relative_eq!((v.position - path[4].point).norm(), 0.5, epsilon = 1e-9);
        }
    }
}
