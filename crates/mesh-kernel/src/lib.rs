//! Triangle mesh kernel for generated surfaces.
//!
//! Indexed triangle meshes with the processing steps a surface generator
//! needs after it has produced raw geometry:
//!
//! - **Repair**: degenerate and duplicate removal, welding, non-manifold
//!   edge and vertex fixes, outward orientation
//! - **Topology**: adjacency, connected components, boundary loops, hole closing
//! - **Simplification and refinement**: QEM decimation, Loop subdivision,
//!   Laplacian and Taubin smoothing
//! - **Union**: classification-based union of closed operands
//! - **Validation**: watertightness, manifoldness, components, Euler characteristic
//!
//! # Units and winding
//!
//! The kernel is unit-agnostic. Faces wind counter-clockwise seen from
//! outside, so a closed outward mesh has positive signed volume.
//!
//! # Quick Start
//!
//! ```
//! use mesh_kernel::primitives::icosphere;
//! use mesh_kernel::{DecimateParams, RepairParams};
//! use nalgebra::Point3;
//!
//! let mut mesh = icosphere(Point3::origin(), 2.0, 3);
//! mesh.repair_with_config(&RepairParams::default());
//! let simplified = mesh.decimate(&DecimateParams::with_target_ratio(0.5));
//!
//! let report = simplified.validate();
//! assert!(report.is_closed_solid());
//! assert_eq!(report.component_count, 1);
//! ```
//!
//! # Logging
//!
//! All operations emit `tracing` events; see [`tracing_ext`].

mod error;
mod types;

pub mod adjacency;
pub mod boolean;
pub mod components;
pub mod decimate;
pub mod holes;
pub mod primitives;
pub mod progress;
pub mod repair;
pub mod smooth;
pub mod subdivide;
pub mod tracing_ext;
pub mod validate;

pub use error::{ErrorCode, KernelError, KernelResult, RecoverySuggestion};
pub use types::{Mesh, Triangle, Vertex};

pub use adjacency::MeshAdjacency;
pub use boolean::{UnionParams, UnionResult, is_point_inside, union, union_all};
pub use components::{
    ComponentAnalysis, find_connected_components, keep_largest_component,
    remove_small_components, split_into_components,
};
pub use decimate::{DecimateParams, DecimateResult, decimate_mesh};
pub use holes::{BoundaryLoop, HoleFillMethod, detect_holes, fill_hole, fill_holes};
pub use progress::{ProgressTracker, SharedProgressTracker, shared_tracker};
pub use repair::{
    RepairParams, RepairReport, compute_vertex_normals, orient_outward, repair_mesh_with_config,
    weld_vertices,
};
pub use smooth::{SmoothParams, smooth_mesh, smooth_vertex_set};
pub use subdivide::{SubdivideParams, SubdivideResult, subdivide_mesh};
pub use tracing_ext::OperationTimer;
pub use validate::{MeshReport, validate_mesh};

// Convenience methods on Mesh
impl Mesh {
    /// Validate the mesh and return a report.
    pub fn validate(&self) -> MeshReport {
        validate::validate_mesh(self)
    }

    /// Repair with custom parameters.
    pub fn repair_with_config(&mut self, params: &RepairParams) -> RepairReport {
        repair::repair_mesh_with_config(self, params)
    }

    /// Decimated copy of the mesh.
    pub fn decimate(&self, params: &DecimateParams) -> Mesh {
        decimate::decimate_mesh(self, params).mesh
    }

    /// Loop-subdivided copy of the mesh.
    pub fn subdivide(&self, params: &SubdivideParams) -> Mesh {
        subdivide::subdivide_mesh(self, params).mesh
    }

    /// Smooth in place.
    pub fn smooth(&mut self, params: &SmoothParams) {
        smooth::smooth_mesh(self, params)
    }

    /// Connected component analysis.
    pub fn components(&self) -> ComponentAnalysis {
        components::find_connected_components(self)
    }
}
