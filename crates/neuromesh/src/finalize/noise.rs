//! Procedural surface noise for rough membranes.

use mesh_kernel::{Mesh, Vertex, compute_vertex_normals};
use nalgebra::Point3;

use crate::rng::mix32;

/// Smooth value noise in `[-1, 1]`: hashed lattice values blended with a
/// quintic fade.
pub fn value_noise(p: &Point3<f64>, seed: u32) -> f64 {
    let cell = p.map(f64::floor);
    let frac = p - cell;
    let fade = frac.map(|t| t * t * t * (t * (t * 6.0 - 15.0) + 10.0));
    let base = [cell.x as i64, cell.y as i64, cell.z as i64];

    let corner = |dx: i64, dy: i64, dz: i64| -> f64 {
        let h = mix32(
            (base[0] + dx) as u32 ^ mix32((base[1] + dy) as u32 ^ mix32((base[2] + dz) as u32 ^ seed)),
        );
        h as f64 / u32::MAX as f64 * 2.0 - 1.0
    };
    let lerp = |a: f64, b: f64, t: f64| a + (b - a) * t;

    let x00 = lerp(corner(0, 0, 0), corner(1, 0, 0), fade.x);
    let x10 = lerp(corner(0, 1, 0), corner(1, 1, 0), fade.x);
    let x01 = lerp(corner(0, 0, 1), corner(1, 0, 1), fade.x);
    let x11 = lerp(corner(0, 1, 1), corner(1, 1, 1), fade.x);
    lerp(lerp(x00, x10, fade.y), lerp(x01, x11, fade.y), fade.z)
}

/// Displace the selected vertices along their normals.
///
/// Returns the number of vertices moved.
pub fn apply_surface_noise(
    mesh: &mut Mesh,
    amplitude: f64,
    frequency: f64,
    seed: u32,
    selected: impl Fn(&Vertex) -> bool,
) -> usize {
    if amplitude == 0.0 || mesh.is_empty() {
        return 0;
    }
    if mesh.vertices.iter().any(|v| v.normal.is_none()) {
        compute_vertex_normals(mesh);
    }
    let mut moved = 0;
    for v in mesh.vertices.iter_mut().filter(|v| selected(v)) {
        let Some(normal) = v.normal else {
            continue;
        };
        let offset = amplitude * value_noise(&(v.position * frequency), seed);
        v.position += normal * offset;
        moved += 1;
    }
    if moved > 0 {
        compute_vertex_normals(mesh);
    }
    moved
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_kernel::primitives::icosphere;

    #[test]
    fn test_noise_range_and_determinism() {
        for i in 0..200 {
            let p = Point3::new(i as f64 * 0.37, -(i as f64) * 0.11, i as f64 * 0.05);
            let n = value_noise(&p, 7);
            assert!((-1.0..=1.0).contains(&n));
            assert_eq!(n, value_noise(&p, 7));
        }
    }

    #[test]
    fn test_noise_is_continuous() {
        let p = Point3::new(1.3, 2.7, -0.4);
        let q = p + nalgebra::Vector3::new(1e-6, 0.0, 0.0);
        assert!((value_noise(&p, 1) - value_noise(&q, 1)).abs() < 1e-4);
    }

    #[test]
    fn test_displacement_bounded_by_amplitude() {
        let original = icosphere(Point3::origin(), 2.0, 2);
        let mut mesh = original.clone();
        let moved = apply_surface_noise(&mut mesh, 0.1, 2.0, 3, |_| true);
        assert_eq!(moved, mesh.vertex_count());
        let mut changed = false;
        for (a, b) in mesh.vertices.iter().zip(&original.vertices) {
            let d = (a.position - b.position).norm();
            assert!(d <= 0.1 + 1e-12);
            changed |= d > 1e-6;
        }
        assert!(changed);
    }

    #[test]
    fn test_selection_filter() {
        let mut mesh = icosphere(Point3::origin(), 1.0, 1);
        mesh.vertices[0].tag = Some(2);
        let moved = apply_surface_noise(&mut mesh, 0.1, 1.0, 0, |v| v.tag == Some(2));
        assert_eq!(moved, 1);
    }
}
