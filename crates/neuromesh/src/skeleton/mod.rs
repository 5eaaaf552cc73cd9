//! Skeleton model: samples, sections, arbors, soma and the morphology arena.

mod morphology;
mod sample;
mod section;
mod soma;
mod stats;

pub use morphology::{Arbor, Endfoot, Morphology, Spine};
pub use sample::{Sample, polyline_length};
pub use section::{GeometryRef, Section, SectionId, SectionType};
pub use soma::{Connectivity, Soma};
pub use stats::{ArborStats, MorphologyStats};
