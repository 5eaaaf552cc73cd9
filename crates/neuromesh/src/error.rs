//! Error types for reconstruction.
//!
//! Codes follow the pattern `NEURO-XXXX`:
//! - 1xxx = Input errors (morphology, options)
//! - 2xxx = Missing builders
//! - 3xxx = Configuration files
//! - 4xxx = Geometry kernel failures
//!
//! Most problems during reconstruction are recovered locally and recorded in
//! [`Diagnostics`](crate::Diagnostics); only the cases below abort a pass.

use miette::Diagnostic;
use thiserror::Error;

use crate::options::SomaRepresentation;

/// Result type alias for reconstruction.
pub type NeuroResult<T> = Result<T, NeuroError>;

/// Machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NeuroErrorCode {
    /// NEURO-1001: Nothing to reconstruct
    EmptyMorphology = 1001,
    /// NEURO-1002: Options out of range
    InvalidOptions = 1002,
    /// NEURO-1003: Skeleton violates structural invariants
    InvalidSkeleton = 1003,
    /// NEURO-2001: No builder for the requested soma representation
    SomaBuilderNotFound = 2001,
    /// NEURO-3001: Configuration could not be parsed or written
    Config = 3001,
    /// NEURO-3002: Configuration file I/O
    Io = 3002,
    /// NEURO-4001: Mesh kernel failure
    Kernel = 4001,
    /// NEURO-4002: Volume kernel failure
    Volume = 4002,
}

impl NeuroErrorCode {
    /// Returns the error code as a string in the format `NEURO-XXXX`.
    pub fn as_str(&self) -> &'static str {
        match self {
            NeuroErrorCode::EmptyMorphology => "NEURO-1001",
            NeuroErrorCode::InvalidOptions => "NEURO-1002",
            NeuroErrorCode::InvalidSkeleton => "NEURO-1003",
            NeuroErrorCode::SomaBuilderNotFound => "NEURO-2001",
            NeuroErrorCode::Config => "NEURO-3001",
            NeuroErrorCode::Io => "NEURO-3002",
            NeuroErrorCode::Kernel => "NEURO-4001",
            NeuroErrorCode::Volume => "NEURO-4002",
        }
    }
}

impl std::fmt::Display for NeuroErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Recovery suggestions for reconstruction errors.
#[derive(Debug, Clone, PartialEq)]
pub enum NeuroRecoverySuggestion {
    /// Pick another soma representation.
    UseSomaRepresentation(SomaRepresentation),
    /// Fix the named option.
    FixOption { name: String },
    /// Check the morphology reader output.
    CheckMorphology,
    /// Follow the wrapped kernel error's suggestion.
    SeeKernelError(String),
    /// No automatic recovery available.
    None,
}

impl std::fmt::Display for NeuroRecoverySuggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NeuroRecoverySuggestion::UseSomaRepresentation(rep) => {
                write!(f, "Use the {rep:?} soma representation instead")
            }
            NeuroRecoverySuggestion::FixOption { name } => write!(f, "Fix option `{name}`"),
            NeuroRecoverySuggestion::CheckMorphology => {
                write!(f, "Check that the morphology has a soma or at least one arbor")
            }
            NeuroRecoverySuggestion::SeeKernelError(s) => write!(f, "{s}"),
            NeuroRecoverySuggestion::None => write!(f, "No automatic recovery available"),
        }
    }
}

/// Errors that abort a reconstruction pass.
#[derive(Debug, Error, Diagnostic)]
pub enum NeuroError {
    /// Nothing to reconstruct.
    #[error("morphology `{label}` has no reconstructable geometry")]
    #[diagnostic(
        code(neuro::input::empty),
        help("Every arbor was invalid or excluded and the soma is ignored.")
    )]
    EmptyMorphology { label: String },

    /// Options out of range (raised by the caller-side validator only).
    #[error("invalid option `{name}`: {details}")]
    #[diagnostic(code(neuro::options::invalid))]
    InvalidOptions { name: String, details: String },

    /// Structural invariant violated.
    #[error("invalid skeleton: {details}")]
    #[diagnostic(
        code(neuro::input::skeleton),
        help("Parent and children links must agree and branching orders must grow by one.")
    )]
    InvalidSkeleton { details: String },

    /// The requested soma representation has no builder for this morphology.
    #[error("no soma builder for {representation:?}: {reason}")]
    #[diagnostic(
        code(neuro::soma::not_found),
        help("A simulated soma surface must be supplied with the morphology.")
    )]
    SomaBuilderNotFound {
        representation: SomaRepresentation,
        reason: String,
    },

    /// Configuration could not be parsed or written.
    #[error("{format} configuration error: {details}")]
    #[diagnostic(code(neuro::config::parse))]
    Config { format: &'static str, details: String },

    /// Configuration file I/O.
    #[error("configuration I/O failed: {0}")]
    #[diagnostic(code(neuro::config::io))]
    Io(#[from] std::io::Error),

    /// Mesh kernel failure.
    #[error(transparent)]
    #[diagnostic(code(neuro::kernel))]
    Kernel(#[from] mesh_kernel::KernelError),

    /// Volume kernel failure.
    #[error(transparent)]
    #[diagnostic(code(neuro::volume))]
    Volume(#[from] mesh_volume::VolumeError),
}

impl NeuroError {
    /// Returns the machine-readable error code.
    pub fn code(&self) -> NeuroErrorCode {
        match self {
            NeuroError::EmptyMorphology { .. } => NeuroErrorCode::EmptyMorphology,
            NeuroError::InvalidOptions { .. } => NeuroErrorCode::InvalidOptions,
            NeuroError::InvalidSkeleton { .. } => NeuroErrorCode::InvalidSkeleton,
            NeuroError::SomaBuilderNotFound { .. } => NeuroErrorCode::SomaBuilderNotFound,
            NeuroError::Config { .. } => NeuroErrorCode::Config,
            NeuroError::Io(_) => NeuroErrorCode::Io,
            NeuroError::Kernel(_) => NeuroErrorCode::Kernel,
            NeuroError::Volume(_) => NeuroErrorCode::Volume,
        }
    }

    /// Returns a recovery suggestion for this error.
    pub fn recovery_suggestion(&self) -> NeuroRecoverySuggestion {
        match self {
            NeuroError::SomaBuilderNotFound { .. } => {
                NeuroRecoverySuggestion::UseSomaRepresentation(SomaRepresentation::MetaBall)
            }
            NeuroError::InvalidOptions { name, .. } => {
                NeuroRecoverySuggestion::FixOption { name: name.clone() }
            }
            NeuroError::EmptyMorphology { .. } | NeuroError::InvalidSkeleton { .. } => {
                NeuroRecoverySuggestion::CheckMorphology
            }
            NeuroError::Kernel(e) => {
                NeuroRecoverySuggestion::SeeKernelError(e.recovery_suggestion().to_string())
            }
            NeuroError::Volume(e) => {
                NeuroRecoverySuggestion::SeeKernelError(e.recovery_suggestion().to_string())
            }
            NeuroError::Config { .. } | NeuroError::Io(_) => NeuroRecoverySuggestion::None,
        }
    }

    /// Create an invalid option error.
    pub fn invalid_option(name: impl Into<String>, details: impl Into<String>) -> Self {
        NeuroError::InvalidOptions {
            name: name.into(),
            details: details.into(),
        }
    }
}
