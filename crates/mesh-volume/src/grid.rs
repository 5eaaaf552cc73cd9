//! Regular scalar grids sampled at voxel centers.

use mesh_kernel::Mesh;
use nalgebra::Point3;
use tracing::{debug, info};

use crate::error::{VolumeError, VolumeResult};

/// Value written to voxels no source has touched. Positive means outside.
pub const OUTSIDE: f32 = 1000.0;

/// A dense scalar grid. Negative values are inside the surface.
#[derive(Debug, Clone)]
pub struct ScalarGrid {
    /// Grid dimensions [x, y, z].
    pub dims: [usize; 3],
    /// Min corner of voxel (0, 0, 0) in world coordinates.
    pub origin: Point3<f64>,
    /// Edge length of one voxel.
    pub voxel_size: f64,
    /// Values in x-fastest order.
    pub values: Vec<f32>,
}

impl ScalarGrid {
    /// Grid covering `[min, max]` plus `padding` on every side.
    ///
    /// The origin snaps to a multiple of `voxel_size`, so two grids built
    /// with the same voxel size share one lattice.
    pub fn from_bounds(
        min: Point3<f64>,
        max: Point3<f64>,
        voxel_size: f64,
        padding: f64,
        max_voxels: usize,
    ) -> VolumeResult<Self> {
        if !(voxel_size.is_finite() && voxel_size > 0.0) {
            return Err(VolumeError::invalid(
                "voxel_size",
                format!("must be finite and positive, got {voxel_size}"),
            ));
        }
        let snap = |v: f64| (v / voxel_size).floor() * voxel_size;
        let origin = Point3::new(
            snap(min.x - padding),
            snap(min.y - padding),
            snap(min.z - padding),
        );
        let extent = Point3::new(max.x + padding, max.y + padding, max.z + padding) - origin;
        let dims = [
            ((extent.x / voxel_size).ceil() as usize).max(1),
            ((extent.y / voxel_size).ceil() as usize).max(1),
            ((extent.z / voxel_size).ceil() as usize).max(1),
        ];

        let total = dims[0].saturating_mul(dims[1]).saturating_mul(dims[2]);
        if total > max_voxels {
            return Err(VolumeError::GridTooLarge {
                dims,
                total,
                max: max_voxels,
                voxel_size,
            });
        }

        debug!(dims = ?dims, total, voxel_size, "Creating scalar grid");

        Ok(Self {
            dims,
            origin,
            voxel_size,
            values: vec![OUTSIDE; total],
        })
    }

    /// Grid sized to a mesh's bounds.
    pub fn from_mesh_bounds(
        mesh: &Mesh,
        voxel_size: f64,
        padding: f64,
        max_voxels: usize,
    ) -> VolumeResult<Self> {
        let (min, max) = mesh
            .bounds()
            .ok_or_else(|| VolumeError::empty("mesh has no vertices"))?;
        Self::from_bounds(min, max, voxel_size, padding, max_voxels)
    }

    /// Total number of voxels in the grid.
    #[inline]
    pub fn total_voxels(&self) -> usize {
        self.dims[0] * self.dims[1] * self.dims[2]
    }

    /// Convert 3D grid coordinates to linear index.
    #[inline]
    pub fn linearize(&self, x: usize, y: usize, z: usize) -> usize {
        x + y * self.dims[0] + z * self.dims[0] * self.dims[1]
    }

    /// Convert linear index to 3D grid coordinates.
    #[inline]
    pub fn delinearize(&self, idx: usize) -> [usize; 3] {
        let slice = self.dims[0] * self.dims[1];
        let z = idx / slice;
        let rem = idx % slice;
        [rem % self.dims[0], rem / self.dims[0], z]
    }

    /// World position of a voxel center.
    #[inline]
    pub fn voxel_center(&self, x: usize, y: usize, z: usize) -> Point3<f64> {
        Point3::new(
            self.origin.x + (x as f64 + 0.5) * self.voxel_size,
            self.origin.y + (y as f64 + 0.5) * self.voxel_size,
            self.origin.z + (z as f64 + 0.5) * self.voxel_size,
        )
    }

    /// Max corner of the grid in world coordinates.
    pub fn max_corner(&self) -> Point3<f64> {
        Point3::new(
            self.origin.x + self.dims[0] as f64 * self.voxel_size,
            self.origin.y + self.dims[1] as f64 * self.voxel_size,
            self.origin.z + self.dims[2] as f64 * self.voxel_size,
        )
    }

    /// Lattice offset of `other` inside this grid, if it lies on the same lattice.
    fn lattice_offset(&self, other: &ScalarGrid) -> Option<[i64; 3]> {
        if (self.voxel_size - other.voxel_size).abs() > 1e-9 * self.voxel_size {
            return None;
        }
        let delta = other.origin - self.origin;
        let mut offset = [0i64; 3];
        for axis in 0..3 {
            let steps = delta[axis] / self.voxel_size;
            let rounded = steps.round();
            if (steps - rounded).abs() > 1e-6 {
                return None;
            }
            offset[axis] = rounded as i64;
        }
        Some(offset)
    }

    /// Fold another grid on the same lattice into this one with `min`.
    ///
    /// Voxels of `other` outside this grid are ignored. Returns false and
    /// leaves this grid unchanged when the lattices differ.
    pub fn min_merge(&mut self, other: &ScalarGrid) -> bool {
        let Some(offset) = self.lattice_offset(other) else {
            return false;
        };
        for z in 0..other.dims[2] {
            let gz = z as i64 + offset[2];
            if gz < 0 || gz >= self.dims[2] as i64 {
                continue;
            }
            for y in 0..other.dims[1] {
                let gy = y as i64 + offset[1];
                if gy < 0 || gy >= self.dims[1] as i64 {
                    continue;
                }
                for x in 0..other.dims[0] {
                    let gx = x as i64 + offset[0];
                    if gx < 0 || gx >= self.dims[0] as i64 {
                        continue;
                    }
                    let dst = self.linearize(gx as usize, gy as usize, gz as usize);
                    let src = other.linearize(x, y, z);
                    self.values[dst] = self.values[dst].min(other.values[src]);
                }
            }
        }
        true
    }

    /// Number of voxels with a negative value.
    pub fn inside_count(&self) -> usize {
        self.values.iter().filter(|v| **v < 0.0).count()
    }

    /// Sample signed distances to a closed mesh at every voxel center.
    pub fn compute_mesh_sdf(&mut self, mesh: &Mesh) {
        use mesh_to_sdf::{Grid, SignMethod, Topology, generate_grid_sdf};

        info!(
            vertices = mesh.vertices.len(),
            faces = mesh.faces.len(),
            dims = ?self.dims,
            "Computing mesh SDF"
        );

        let vertices: Vec<[f32; 3]> = mesh
            .vertices
            .iter()
            .map(|v| {
                [
                    v.position.x as f32,
                    v.position.y as f32,
                    v.position.z as f32,
                ]
            })
            .collect();
        let indices: Vec<u32> = mesh.faces.iter().flat_map(|f| f.iter().copied()).collect();

        let max = self.max_corner();
        let grid = Grid::from_bounding_box(
            &[
                self.origin.x as f32,
                self.origin.y as f32,
                self.origin.z as f32,
            ],
            &[max.x as f32, max.y as f32, max.z as f32],
            self.dims,
        );

        let sdf = generate_grid_sdf(
            &vertices,
            Topology::TriangleList(Some(&indices)),
            &grid,
            SignMethod::Raycast,
        );

        // mesh_to_sdf orders cells z-fastest
        for z in 0..self.dims[2] {
            for y in 0..self.dims[1] {
                for x in 0..self.dims[0] {
                    let dst = self.linearize(x, y, z);
                    self.values[dst] = sdf[grid.get_cell_idx(&[x, y, z])];
                }
            }
        }

        debug!(inside = self.inside_count(), "Mesh SDF computed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_bounds_snaps_to_lattice() {
        let grid = ScalarGrid::from_bounds(
            Point3::new(0.3, 0.3, 0.3),
            Point3::new(1.7, 1.7, 1.7),
            0.5,
            0.0,
            1_000,
        )
        .unwrap();
        assert_relative_eq!(grid.origin.x, 0.0);
        assert_eq!(grid.dims, [4, 4, 4]);
        assert!(grid.values.iter().all(|v| *v == OUTSIDE));
    }

    #[test]
    fn test_linearize_roundtrip_and_centers() {
        let grid = ScalarGrid::from_bounds(
            Point3::origin(),
            Point3::new(3.0, 2.0, 1.0),
            1.0,
            0.0,
            1_000,
        )
        .unwrap();
        let idx = grid.linearize(2, 1, 0);
        assert_eq!(grid.delinearize(idx), [2, 1, 0]);
        assert_relative_eq!(grid.voxel_center(0, 0, 0).x, 0.5);
    }

    #[test]
    fn test_grid_too_large() {
        let err = ScalarGrid::from_bounds(
            Point3::origin(),
            Point3::new(100.0, 100.0, 100.0),
            0.1,
            0.0,
            1_000_000,
        )
        .unwrap_err();
        assert_eq!(err.code().as_str(), "VOLUME-2001");
    }

    #[test]
    fn test_invalid_voxel_size() {
        let err =
            ScalarGrid::from_bounds(Point3::origin(), Point3::origin(), 0.0, 1.0, 10).unwrap_err();
        assert_eq!(err.code().as_str(), "VOLUME-1002");
    }

    #[test]
    fn test_min_merge_on_shared_lattice() {
        let mut big = ScalarGrid::from_bounds(
            Point3::origin(),
            Point3::new(4.0, 4.0, 4.0),
            1.0,
            0.0,
            1_000,
        )
        .unwrap();
        let mut small = ScalarGrid::from_bounds(
            Point3::new(1.0, 1.0, 1.0),
            Point3::new(2.0, 2.0, 2.0),
            1.0,
            0.0,
            1_000,
        )
        .unwrap();
        small.values.fill(-1.0);
        assert!(big.min_merge(&small));
        assert_eq!(big.inside_count(), 1);
        assert_eq!(big.values[big.linearize(1, 1, 1)], -1.0);
    }

    #[test]
    fn test_mesh_sdf_sign() {
        let mesh = mesh_kernel::primitives::axis_box(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(4.0, 4.0, 4.0),
        );
        let mut grid = ScalarGrid::from_mesh_bounds(&mesh, 1.0, 1.0, 10_000).unwrap();
        grid.compute_mesh_sdf(&mesh);
        let center = grid.linearize(3, 3, 3);
        assert!(grid.values[center] < 0.0);
        assert!(grid.values[0] > 0.0);
    }
}
