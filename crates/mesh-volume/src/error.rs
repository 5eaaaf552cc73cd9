//! Error types for volumetric operations.
//!
//! Codes follow the pattern `VOLUME-XXXX`:
//! - 1xxx = Input validation errors
//! - 2xxx = Grid and field computation errors
//! - 3xxx = Surface extraction errors

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias for volume operations.
pub type VolumeResult<T> = Result<T, VolumeError>;

/// Machine-readable error codes for volume operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VolumeErrorCode {
    /// VOLUME-1001: Nothing to voxelize
    EmptyInput = 1001,
    /// VOLUME-1002: Invalid parameters
    InvalidParams = 1002,
    /// VOLUME-2001: Grid exceeds the voxel budget
    GridTooLarge = 2001,
    /// VOLUME-3001: Extraction produced no surface
    EmptyIsosurface = 3001,
    /// VOLUME-3002: Kernel post-processing failed
    KernelFailed = 3002,
}

impl VolumeErrorCode {
    /// Returns the error code as a string in the format `VOLUME-XXXX`.
    pub fn as_str(&self) -> &'static str {
        match self {
            VolumeErrorCode::EmptyInput => "VOLUME-1001",
            VolumeErrorCode::InvalidParams => "VOLUME-1002",
            VolumeErrorCode::GridTooLarge => "VOLUME-2001",
            VolumeErrorCode::EmptyIsosurface => "VOLUME-3001",
            VolumeErrorCode::KernelFailed => "VOLUME-3002",
        }
    }
}

impl std::fmt::Display for VolumeErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Recovery suggestions for volume errors.
#[derive(Debug, Clone, PartialEq)]
pub enum VolumeRecoverySuggestion {
    /// Use a coarser voxel size.
    IncreaseVoxelSize { current: f64, suggested: f64 },
    /// Lower the iso level or enlarge the field radii.
    AdjustIsoLevel,
    /// Check the input geometry.
    CheckInput,
    /// No specific suggestion.
    None,
}

impl std::fmt::Display for VolumeRecoverySuggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VolumeRecoverySuggestion::IncreaseVoxelSize { current, suggested } => {
                write!(f, "Increase voxel size from {current:.4} to {suggested:.4}")
            }
            VolumeRecoverySuggestion::AdjustIsoLevel => {
                write!(f, "Lower the iso level or increase element radii")
            }
            VolumeRecoverySuggestion::CheckInput => {
                write!(f, "Check that the input geometry is non-empty and closed")
            }
            VolumeRecoverySuggestion::None => write!(f, "No specific suggestion available"),
        }
    }
}

/// Errors that can occur during volumetric operations.
#[derive(Debug, Error, Diagnostic)]
pub enum VolumeError {
    /// No elements or an empty mesh.
    #[error("nothing to voxelize: {details}")]
    #[diagnostic(
        code(volume::input::empty),
        help("Provide at least one field element or a mesh with faces.")
    )]
    EmptyInput { details: String },

    /// Invalid parameters.
    #[error("invalid parameter `{name}`: {details}")]
    #[diagnostic(
        code(volume::params::invalid),
        help("Voxel sizes and radii must be finite and positive.")
    )]
    InvalidParams { name: String, details: String },

    /// Grid would exceed the voxel budget.
    #[error("grid too large: {dims:?} = {total} voxels exceeds limit of {max}")]
    #[diagnostic(
        code(volume::grid::too_large),
        help("Use a coarser voxel size or raise max_voxels.")
    )]
    GridTooLarge {
        dims: [usize; 3],
        total: usize,
        max: usize,
        voxel_size: f64,
    },

    /// Extraction found no sign change.
    #[error("iso-surface extraction produced an empty mesh")]
    #[diagnostic(
        code(volume::isosurface::empty),
        help("The field never crosses the iso level inside the grid.")
    )]
    EmptyIsosurface,

    /// Kernel post-processing failed.
    #[error("mesh kernel operation failed: {0}")]
    #[diagnostic(code(volume::kernel::error))]
    Kernel(#[from] mesh_kernel::KernelError),
}

impl VolumeError {
    /// Returns the machine-readable error code.
    pub fn code(&self) -> VolumeErrorCode {
        match self {
            VolumeError::EmptyInput { .. } => VolumeErrorCode::EmptyInput,
            VolumeError::InvalidParams { .. } => VolumeErrorCode::InvalidParams,
            VolumeError::GridTooLarge { .. } => VolumeErrorCode::GridTooLarge,
            VolumeError::EmptyIsosurface => VolumeErrorCode::EmptyIsosurface,
            VolumeError::Kernel(_) => VolumeErrorCode::KernelFailed,
        }
    }

    /// Returns a recovery suggestion for this error.
    pub fn recovery_suggestion(&self) -> VolumeRecoverySuggestion {
        match self {
            VolumeError::GridTooLarge {
                total,
                max,
                voxel_size,
                ..
            } => {
                let scale = (*total as f64 / *max as f64).cbrt();
                VolumeRecoverySuggestion::IncreaseVoxelSize {
                    current: *voxel_size,
                    suggested: voxel_size * scale * 1.05,
                }
            }
            VolumeError::EmptyIsosurface => VolumeRecoverySuggestion::AdjustIsoLevel,
            VolumeError::EmptyInput { .. } | VolumeError::Kernel(_) => {
                VolumeRecoverySuggestion::CheckInput
            }
            VolumeError::InvalidParams { .. } => VolumeRecoverySuggestion::None,
        }
    }

    /// Create an empty input error.
    pub fn empty(details: impl Into<String>) -> Self {
        VolumeError::EmptyInput {
            details: details.into(),
        }
    }

    /// Create an invalid parameter error.
    pub fn invalid(name: impl Into<String>, details: impl Into<String>) -> Self {
        VolumeError::InvalidParams {
            name: name.into(),
            details: details.into(),
        }
    }
}
