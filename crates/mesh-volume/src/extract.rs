//! Surface extraction from scalar grids using Surface Nets.

use fast_surface_nets::ndshape::RuntimeShape;
use fast_surface_nets::{SurfaceNetsBuffer, surface_nets};
use mesh_kernel::{Mesh, Vertex, orient_outward};
use tracing::{debug, info};

use crate::error::{VolumeError, VolumeResult};
use crate::grid::{OUTSIDE, ScalarGrid};

/// Extract the zero level set of a grid.
///
/// The grid is padded by one voxel of outside values so surfaces touching
/// the grid border still close. Vertices land in world coordinates and
/// every closed component is oriented outward.
pub fn extract_isosurface(grid: &ScalarGrid) -> VolumeResult<Mesh> {
    info!(dims = ?grid.dims, "Extracting isosurface");

    let [nx, ny, nz] = grid.dims;
    let padded = [nx + 2, ny + 2, nz + 2];
    let mut values = vec![OUTSIDE; padded[0] * padded[1] * padded[2]];
    for z in 0..nz {
        for y in 0..ny {
            let src = grid.linearize(0, y, z);
            let dst = 1 + (y + 1) * padded[0] + (z + 1) * padded[0] * padded[1];
            values[dst..dst + nx].copy_from_slice(&grid.values[src..src + nx]);
        }
    }

    let shape = RuntimeShape::<u32, 3>::new([padded[0] as u32, padded[1] as u32, padded[2] as u32]);
    let mut buffer = SurfaceNetsBuffer::default();
    surface_nets(
        &values,
        &shape,
        [0, 0, 0],
        [
            padded[0] as u32 - 1,
            padded[1] as u32 - 1,
            padded[2] as u32 - 1,
        ],
        &mut buffer,
    );

    if buffer.positions.is_empty() || buffer.indices.len() < 3 {
        return Err(VolumeError::EmptyIsosurface);
    }

    debug!(
        positions = buffer.positions.len(),
        indices = buffer.indices.len(),
        "Surface nets complete"
    );

    // Padded sample p sits at the center of grid voxel p - 1
    let to_world = |p: f32, origin: f64| origin + (p as f64 - 0.5) * grid.voxel_size;
    let mut mesh = Mesh::with_capacity(buffer.positions.len(), buffer.indices.len() / 3);
    mesh.vertices.extend(buffer.positions.iter().map(|p| {
        Vertex::from_coords(
            to_world(p[0], grid.origin.x),
            to_world(p[1], grid.origin.y),
            to_world(p[2], grid.origin.z),
        )
    }));
    mesh.faces.extend(
        buffer
            .indices
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]]),
    );

    let flipped = orient_outward(&mut mesh);
    info!(
        vertices = mesh.vertex_count(),
        faces = mesh.face_count(),
        flipped,
        "Isosurface mesh created"
    );

    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    fn sphere_grid(radius: f64, voxel: f64) -> ScalarGrid {
        let min = Point3::new(-radius, -radius, -radius);
        let max = Point3::new(radius, radius, radius);
        let mut grid = ScalarGrid::from_bounds(min, max, voxel, 2.0 * voxel, 1_000_000).unwrap();
        for idx in 0..grid.total_voxels() {
            let [x, y, z] = grid.delinearize(idx);
            grid.values[idx] = (grid.voxel_center(x, y, z).coords.norm() - radius) as f32;
        }
        grid
    }

    #[test]
    fn test_sphere_extraction_is_closed_and_outward() {
        let mesh = extract_isosurface(&sphere_grid(3.0, 0.5)).unwrap();
        let report = mesh.validate();
        assert!(report.is_watertight());
        assert_eq!(report.component_count, 1);
        assert!(mesh.signed_volume() > 0.0);

        let (min, max) = mesh.bounds().unwrap();
        assert_relative_eq!(max.x, 3.0, epsilon = 0.25);
        assert_relative_eq!(min.z, -3.0, epsilon = 0.25);
    }

    #[test]
    fn test_empty_grid_is_an_error() {
        let grid =
            ScalarGrid::from_bounds(Point3::origin(), Point3::new(2.0, 2.0, 2.0), 1.0, 0.0, 100)
                .unwrap();
        let err = extract_isosurface(&grid).unwrap_err();
        assert_eq!(err.code().as_str(), "VOLUME-3001");
    }
}
