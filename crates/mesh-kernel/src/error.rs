//! Error types for kernel operations with rich diagnostics.
//!
//! Each error has a machine-readable code in the format `KERNEL-XXXX`:
//! - `KERNEL-1xxx`: Input validation errors (empty or malformed meshes)
//! - `KERNEL-2xxx`: Operation errors (boolean, hole closing)
//!
//! Most kernel operations are total: they return statistics rather than
//! failing. Errors are reserved for inputs that make an operation meaningless.

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias for kernel operations.
pub type KernelResult<T> = Result<T, KernelError>;

/// Machine-readable error codes for kernel operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// KERNEL-1001: Mesh has no vertices or faces
    EmptyMesh = 1001,
    /// KERNEL-1002: Face references invalid vertex index
    InvalidVertexIndex = 1002,
    /// KERNEL-1003: Invalid mesh topology
    InvalidTopology = 1003,

    /// KERNEL-2001: Boolean operation failed
    BooleanFailed = 2001,
    /// KERNEL-2003: Hole closing failed
    HoleFillFailed = 2003,
}

impl ErrorCode {
    /// Returns the error code as a string in the format `KERNEL-XXXX`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::EmptyMesh => "KERNEL-1001",
            ErrorCode::InvalidVertexIndex => "KERNEL-1002",
            ErrorCode::InvalidTopology => "KERNEL-1003",
            ErrorCode::BooleanFailed => "KERNEL-2001",
            ErrorCode::HoleFillFailed => "KERNEL-2003",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Recovery suggestions for kernel errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoverySuggestion {
    /// Run repair operations before retrying.
    RunRepair { operations: Vec<String> },
    /// Check how the input mesh was produced.
    CheckSourceMesh { checks: Vec<String> },
    /// No automatic recovery available.
    None,
}

impl std::fmt::Display for RecoverySuggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecoverySuggestion::RunRepair { operations } => {
                write!(f, "Run repair operations: {}", operations.join(", "))
            }
            RecoverySuggestion::CheckSourceMesh { checks } => {
                write!(f, "Check the source mesh for: {}", checks.join(", "))
            }
            RecoverySuggestion::None => write!(f, "No automatic recovery available"),
        }
    }
}

/// Errors that can occur during kernel operations.
#[derive(Debug, Error, Diagnostic)]
pub enum KernelError {
    /// Empty mesh (no vertices or faces).
    #[error("mesh is empty: {details}")]
    #[diagnostic(
        code(kernel::validation::empty),
        help("The operation needs at least one vertex and one face.")
    )]
    EmptyMesh { details: String },

    /// Invalid vertex index in face data.
    #[error(
        "invalid vertex index: face {face_index} references vertex {vertex_index}, but mesh only has {vertex_count} vertices"
    )]
    #[diagnostic(
        code(kernel::validation::vertex_index),
        help("Faces must only reference existing vertices.")
    )]
    InvalidVertexIndex {
        face_index: usize,
        vertex_index: u32,
        vertex_count: usize,
    },

    /// Invalid mesh topology.
    #[error("invalid mesh topology: {details}")]
    #[diagnostic(
        code(kernel::validation::topology),
        help("Run the manifold repair pass before this operation.")
    )]
    InvalidTopology { details: String },

    /// Boolean operation failed.
    #[error("boolean {operation} failed: {details}")]
    #[diagnostic(
        code(kernel::boolean::failed),
        help("Ensure both operands are closed and non-degenerate.")
    )]
    BooleanFailed { operation: String, details: String },

    /// Hole closing failed.
    #[error("hole closing failed: {details}")]
    #[diagnostic(
        code(kernel::repair::hole_fill),
        help("The boundary loop may be self-intersecting or too large.")
    )]
    HoleFillFailed { details: String },
}

impl KernelError {
    /// Returns the machine-readable error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            KernelError::EmptyMesh { .. } => ErrorCode::EmptyMesh,
            KernelError::InvalidVertexIndex { .. } => ErrorCode::InvalidVertexIndex,
            KernelError::InvalidTopology { .. } => ErrorCode::InvalidTopology,
            KernelError::BooleanFailed { .. } => ErrorCode::BooleanFailed,
            KernelError::HoleFillFailed { .. } => ErrorCode::HoleFillFailed,
        }
    }

    /// Returns a recovery suggestion for this error.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self {
            KernelError::EmptyMesh { .. } => RecoverySuggestion::CheckSourceMesh {
                checks: vec!["generator produced geometry".into()],
            },
            KernelError::InvalidVertexIndex { .. } => RecoverySuggestion::RunRepair {
                operations: vec!["validate".into(), "remove_invalid_faces".into()],
            },
            KernelError::InvalidTopology { .. } => RecoverySuggestion::RunRepair {
                operations: vec!["fix_non_manifold_edges".into(), "weld_vertices".into()],
            },
            KernelError::BooleanFailed { .. } => RecoverySuggestion::RunRepair {
                operations: vec!["repair both meshes".into(), "close end caps".into()],
            },
            KernelError::HoleFillFailed { .. } => RecoverySuggestion::None,
        }
    }

    /// Create an empty mesh error.
    pub fn empty(details: impl Into<String>) -> Self {
        KernelError::EmptyMesh {
            details: details.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = KernelError::empty("union operand");
        assert_eq!(err.code(), ErrorCode::EmptyMesh);
        assert_eq!(err.code().as_str(), "KERNEL-1001");
        assert!(err.to_string().contains("union operand"));
    }

    #[test]
    fn test_recovery_suggestion_display() {
        let err = KernelError::BooleanFailed {
            operation: "union".into(),
            details: "open operand".into(),
        };
        assert_eq!(err.code().as_str(), "KERNEL-2001");
        let suggestion = err.recovery_suggestion().to_string();
        assert!(suggestion.contains("close end caps"));
    }
}
