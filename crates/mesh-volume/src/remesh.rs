//! Voxel remeshing of proxy meshes.
//!
//! A proxy built from overlapping closed pieces has no single inside/outside
//! parity, so each connected component gets its own signed distance field on
//! a sub-grid aligned with the global lattice, and the global field is the
//! pointwise minimum. The zero level set of that field is the union surface.

use mesh_kernel::{Mesh, RepairParams, repair_mesh_with_config, split_into_components};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::error::{VolumeError, VolumeResult};
use crate::extract::extract_isosurface;
use crate::grid::ScalarGrid;

/// Parameters for voxel remeshing.
#[derive(Debug, Clone)]
#[cfg_attr(
    feature = "pipeline-config",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct VoxelRemeshParams {
    /// Voxel edge length. Default: 0.5
    pub voxel_size: f64,
    /// Padding around each component, in voxels. Default: 2
    pub padding_voxels: usize,
    /// Voxel budget of the global grid. Default: 16M
    pub max_voxels: usize,
    /// Repair the extracted surface. Default: true
    pub repair: bool,
}

impl Default for VoxelRemeshParams {
    fn default() -> Self {
        Self {
            voxel_size: 0.5,
            padding_voxels: 2,
            max_voxels: 16_000_000,
            repair: true,
        }
    }
}

impl VoxelRemeshParams {
    /// Params with a voxel size.
    pub fn with_voxel_size(voxel_size: f64) -> Self {
        Self {
            voxel_size,
            ..Default::default()
        }
    }
}

/// Outcome of a voxel remesh.
#[derive(Debug, Clone)]
pub struct VoxelRemeshResult {
    pub mesh: Mesh,
    /// Voxel size actually used.
    pub voxel_size: f64,
    /// Dimensions of the global grid.
    pub dims: [usize; 3],
    /// Number of proxy components that were voxelized.
    pub components: usize,
}

/// Resample a closed (possibly self-overlapping) mesh through a voxel grid.
pub fn voxel_remesh(proxy: &Mesh, params: &VoxelRemeshParams) -> VolumeResult<VoxelRemeshResult> {
    if proxy.is_empty() {
        return Err(VolumeError::empty("proxy mesh has no faces"));
    }
    let voxel = params.voxel_size;
    let padding = params.padding_voxels as f64 * voxel;
    let mut grid = ScalarGrid::from_mesh_bounds(proxy, voxel, padding, params.max_voxels)?;

    let pieces = split_into_components(proxy);
    info!(
        components = pieces.len(),
        dims = ?grid.dims,
        voxel_size = voxel,
        "Voxel remeshing proxy"
    );

    let fields: Vec<ScalarGrid> = pieces
        .par_iter()
        .map(|piece| {
            let mut sub = ScalarGrid::from_mesh_bounds(piece, voxel, padding, params.max_voxels)?;
            sub.compute_mesh_sdf(piece);
            Ok(sub)
        })
        .collect::<VolumeResult<_>>()?;

    for field in &fields {
        if !grid.min_merge(field) {
            warn!("Component grid is off the global lattice, skipping it");
        }
    }
    drop(fields);

    let mut mesh = extract_isosurface(&grid)?;
    if params.repair {
        repair_mesh_with_config(&mut mesh, &RepairParams::for_iso_surfaces());
    }

    info!(
        vertices = mesh.vertex_count(),
        faces = mesh.face_count(),
        "Voxel remesh complete"
    );

    Ok(VoxelRemeshResult {
        mesh,
        voxel_size: voxel,
        dims: grid.dims,
        components: pieces.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use mesh_kernel::primitives::{axis_box, icosphere};
    use nalgebra::Point3;

    #[test]
    fn test_overlapping_pieces_become_one_surface() {
        let mut proxy = axis_box(Point3::new(0.0, -1.0, -1.0), Point3::new(6.0, 1.0, 1.0));
        proxy.append(&icosphere(Point3::new(6.0, 0.0, 0.0), 1.8, 2));

        let result = voxel_remesh(&proxy, &VoxelRemeshParams::with_voxel_size(0.25)).unwrap();
        assert_eq!(result.components, 2);

        let report = result.mesh.validate();
        assert!(report.is_watertight());
        assert_eq!(report.component_count, 1);
        assert!(result.mesh.signed_volume() > 0.0);

        let (min, max) = result.mesh.bounds().unwrap();
        assert_relative_eq!(min.x, 0.0, epsilon = 0.3);
        assert_relative_eq!(max.x, 7.8, epsilon = 0.3);
    }

    #[test]
    fn test_disjoint_pieces_stay_apart() {
        let mut proxy = icosphere(Point3::origin(), 1.0, 2);
        proxy.append(&icosphere(Point3::new(5.0, 0.0, 0.0), 1.0, 2));
        let result = voxel_remesh(&proxy, &VoxelRemeshParams::with_voxel_size(0.2)).unwrap();
        assert_eq!(result.mesh.components().component_count(), 2);
    }

    #[test]
    fn test_empty_proxy() {
        let err = voxel_remesh(&Mesh::new(), &VoxelRemeshParams::default()).unwrap_err();
        assert_eq!(err.code().as_str(), "VOLUME-1001");
    }
}
