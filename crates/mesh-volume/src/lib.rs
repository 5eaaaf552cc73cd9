//! Scalar fields and iso-surfaces for generated meshes.
//!
//! - **Meta-ball fields**: [`MetaElement`]s are splatted into a
//!   [`ScalarGrid`] with the Wyvill kernel
//! - **Extraction**: Surface Nets over any grid whose inside is negative
//! - **Voxel remeshing**: resample overlapping closed pieces into one
//!   surface through per-component signed distance fields
//!
//! # Quick Start
//!
//! ```
//! use mesh_volume::{IsoSurfaceBuilder, MetaElement};
//! use nalgebra::Point3;
//!
//! // A short chain of elements
//! let elements: Vec<MetaElement> = (0..8)
//!     .map(|i| MetaElement::new(Point3::new(i as f64 * 0.5, 0.0, 0.0), 1.6))
//!     .collect();
//!
//! let result = IsoSurfaceBuilder::new(&elements).build().unwrap();
//! assert_eq!(result.mesh.components().component_count(), 1);
//! ```
//!
//! Grids use `f32` values; geometry stays `f64` like the rest of the kernel.

mod builder;
mod error;
mod extract;
mod field;
mod grid;
mod remesh;

pub use error::{VolumeError, VolumeErrorCode, VolumeRecoverySuggestion, VolumeResult};

pub use builder::{IsoSurfaceBuilder, IsoSurfaceResult, VoxelRemeshBuilder};
pub use extract::extract_isosurface;
pub use field::{
    DEFAULT_ISO_LEVEL, IsoSurfaceParams, MetaElement, choose_voxel_size, elements_bounds,
    field_value, sphere_field_radius, splat_elements,
};
pub use grid::{OUTSIDE, ScalarGrid};
pub use remesh::{VoxelRemeshParams, VoxelRemeshResult, voxel_remesh};
