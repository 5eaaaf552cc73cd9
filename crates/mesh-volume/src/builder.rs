//! Fluent builders for iso-surfacing and voxel remeshing.
//!
//! # Example
//!
//! ```
//! use mesh_volume::{IsoSurfaceBuilder, MetaElement};
//! use nalgebra::Point3;
//!
//! let elements = [
//!     MetaElement::new(Point3::origin(), 2.0),
//!     MetaElement::new(Point3::new(1.5, 0.0, 0.0), 2.0),
//! ];
//! let result = IsoSurfaceBuilder::new(&elements)
//!     .voxel_size(0.25)
//!     .build()
//!     .unwrap();
//! assert!(result.mesh.validate().is_watertight());
//! ```

use mesh_kernel::{Mesh, RepairParams, repair_mesh_with_config};
use tracing::debug;

use crate::error::VolumeResult;
use crate::extract::extract_isosurface;
use crate::field::{IsoSurfaceParams, MetaElement, splat_elements};
use crate::remesh::{VoxelRemeshParams, VoxelRemeshResult, voxel_remesh};

/// Result of [`IsoSurfaceBuilder::build`].
#[derive(Debug, Clone)]
pub struct IsoSurfaceResult {
    pub mesh: Mesh,
    /// Voxel size actually used, after the budget check.
    pub voxel_size: f64,
    pub dims: [usize; 3],
    pub element_count: usize,
}

/// Builder for a meta-ball surface.
pub struct IsoSurfaceBuilder<'a> {
    elements: &'a [MetaElement],
    params: IsoSurfaceParams,
    repair: bool,
}

impl<'a> IsoSurfaceBuilder<'a> {
    /// Start from a set of field elements with default parameters.
    pub fn new(elements: &'a [MetaElement]) -> Self {
        Self {
            elements,
            params: IsoSurfaceParams::default(),
            repair: true,
        }
    }

    /// Replace all field parameters.
    pub fn params(mut self, params: IsoSurfaceParams) -> Self {
        self.params = params;
        self
    }

    /// Field value on the surface.
    pub fn iso_level(mut self, level: f64) -> Self {
        self.params.iso_level = level;
        self
    }

    /// Use a fixed voxel size instead of deriving it from the element radii.
    pub fn voxel_size(mut self, size: f64) -> Self {
        self.params.voxel_size = Some(size);
        self
    }

    /// Voxel size relative to the smallest element radius.
    pub fn resolution_factor(mut self, factor: f64) -> Self {
        self.params.voxel_size = None;
        self.params.resolution_factor = factor;
        self
    }

    pub fn max_voxels(mut self, max: usize) -> Self {
        self.params.max_voxels = max;
        self
    }

    /// Run kernel repair on the extracted surface.
    pub fn repair(mut self, enable: bool) -> Self {
        self.repair = enable;
        self
    }

    /// Evaluate the field and extract its surface.
    pub fn build(self) -> VolumeResult<IsoSurfaceResult> {
        let grid = splat_elements(self.elements, &self.params)?;
        let mut mesh = extract_isosurface(&grid)?;
        if self.repair {
            let report = repair_mesh_with_config(&mut mesh, &RepairParams::for_iso_surfaces());
            debug!(?report, "Iso-surface repaired");
        }
        Ok(IsoSurfaceResult {
            mesh,
            voxel_size: grid.voxel_size,
            dims: grid.dims,
            element_count: self.elements.len(),
        })
    }
}

/// Builder for voxel remeshing of a proxy mesh.
pub struct VoxelRemeshBuilder<'a> {
    mesh: &'a Mesh,
    params: VoxelRemeshParams,
}

impl<'a> VoxelRemeshBuilder<'a> {
    pub fn new(mesh: &'a Mesh) -> Self {
        Self {
            mesh,
            params: VoxelRemeshParams::default(),
        }
    }

    pub fn voxel_size(mut self, size: f64) -> Self {
        self.params.voxel_size = size;
        self
    }

    /// Padding around each proxy component, in voxels.
    pub fn padding_voxels(mut self, voxels: usize) -> Self {
        self.params.padding_voxels = voxels;
        self
    }

    pub fn max_voxels(mut self, max: usize) -> Self {
        self.params.max_voxels = max;
        self
    }

    pub fn repair(mut self, enable: bool) -> Self {
        self.params.repair = enable;
        self
    }

    pub fn build(self) -> VolumeResult<VoxelRemeshResult> {
        voxel_remesh(self.mesh, &self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use mesh_kernel::primitives::icosphere;
    use nalgebra::Point3;

    #[test]
    fn test_iso_builder_chaining() {
        let elements = [MetaElement::new(Point3::origin(), 1.0)];
        let builder = IsoSurfaceBuilder::new(&elements)
            .iso_level(0.3)
            .resolution_factor(0.25)
            .max_voxels(1_000)
            .repair(false);
        assert_relative_eq!(builder.params.iso_level, 0.3);
        assert_eq!(builder.params.voxel_size, None);
        assert_eq!(builder.params.max_voxels, 1_000);
        assert!(!builder.repair);
    }

    #[test]
    fn test_single_element_radius() {
        // (1 - d²/R²)³ = 0.54 at d = R * sqrt(1 - 0.54^(1/3))
        let elements = [MetaElement::new(Point3::origin(), 4.0)];
        let result = IsoSurfaceBuilder::new(&elements)
            .voxel_size(0.2)
            .build()
            .unwrap();
        let expected = 4.0 * (1.0 - 0.54f64.cbrt()).sqrt();
        let (_, max) = result.mesh.bounds().unwrap();
        assert_relative_eq!(max.x, expected, epsilon = 0.2);
        assert!(result.mesh.validate().is_closed_solid());
    }

    #[test]
    fn test_remesh_builder() {
        let sphere = icosphere(Point3::origin(), 2.0, 3);
        let result = VoxelRemeshBuilder::new(&sphere)
            .voxel_size(0.25)
            .padding_voxels(3)
            .build()
            .unwrap();
        assert_relative_eq!(result.mesh.volume(), sphere.volume(), max_relative = 0.1);
    }
}
