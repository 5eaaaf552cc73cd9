//! Surface meshes from neuronal morphology skeletons.
//!
//! A morphology is a soma plus arbors of sections, each section a polyline
//! of samples with radii. A builder turns it into triangle meshes with one
//! of five techniques:
//!
//! - **Meta**: one implicit meta-ball surface for the whole neuron
//! - **Skinning**: a skinned tube network per arbor on a separate soma
//! - **Union**: boolean union of root-to-leaf path tubes
//! - **Piecewise**: joined per-section tubes, fast and not watertight
//! - **Voxelization**: a voxel remesh of a cheap self-overlapping proxy
//!
//! Every builder runs the same stages on its own copy of the morphology:
//! preprocess (trim, resample, radius floor, style, labeling), classify
//! roots against the soma, generate, stitch arbors to the soma, finalize.
//!
//! # Quick Start
//!
//! ```
//! use nalgebra::Point3;
//! use neuromesh::{Morphology, ReconstructionOptions, Sample, SectionType, Soma, reconstruct};
//!
//! let mut morph = Morphology::new("cell", Soma::new(Point3::origin(), 3.0));
//! morph.add_arbor(
//!     "axon",
//!     SectionType::Axon,
//!     vec![Sample::at(3.0, 0.0, 0.0, 0.8), Sample::at(15.0, 0.0, 0.0, 0.4)],
//! );
//!
//! let mesh = reconstruct(&morph, &ReconstructionOptions::for_piecewise()).unwrap();
//! assert_eq!(mesh.parts.len(), 1);
//! ```
//!
//! # Errors
//!
//! Only a missing soma surface, an empty morphology and kernel failures
//! abort a pass. Everything else is recovered locally and recorded in
//! [`Diagnostics`].
//!
//! # Logging
//!
//! All stages emit `tracing` events and spans; install a subscriber to see
//! them.

mod error;

pub mod builders;
pub mod connectivity;
pub mod context;
pub mod finalize;
pub mod generate;
pub mod mesh;
pub mod options;
pub mod preprocess;
pub mod rng;
pub mod skeleton;
pub mod stitch;

pub use error::{NeuroError, NeuroErrorCode, NeuroRecoverySuggestion, NeuroResult};

pub use builders::{
    Assembly, MeshBuilder, MetaBuilder, NeuronMeshBuilder, PiecewiseBuilder, SkinningBuilder,
    Technique, UnionBuilder, VoxelizationBuilder, builder_for, reconstruct,
};
pub use connectivity::{AnchorStyle, anchor_points, bridging_point, classify, classify_root};
pub use context::{Diagnostics, ReconstructionContext, ReconstructionStats, StageTiming};
pub use finalize::finalize;
pub use generate::GeneratedGeometry;
pub use mesh::{MeshPart, PartLabel, ReconstructedMesh};
pub use options::{
    ArborStyle, Calibration, MeshingTechnique, OutputMode, ReconstructionOptions, ResamplingMethod,
    RootPolicy, SomaConnection, SomaRepresentation, SpineSource, SurfaceRoughness, VoxelProxy,
};
pub use preprocess::preprocess;
pub use rng::SeededRng;
pub use skeleton::{
    Arbor, ArborStats, Connectivity, Endfoot, GeometryRef, Morphology, MorphologyStats, Sample,
    Section, SectionId, SectionType, Soma, Spine,
};
pub use stitch::stitch_soma;

pub use mesh_kernel::{Mesh, Vertex};
