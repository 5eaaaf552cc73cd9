//! Per-pass state threaded through every stage.

use std::time::Duration;

use mesh_kernel::{OperationTimer, SharedProgressTracker};
use tracing::{trace, warn};

use crate::generate::GeneratedGeometry;
use crate::options::MeshingTechnique;
use crate::rng::SeededRng;
use crate::skeleton::{GeometryRef, SectionId};

/// Problems recovered locally during one pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    /// Sections left without geometry, mostly for having fewer than two samples.
    pub skipped_sections: Vec<SectionId>,
    /// Segments shorter than the minimum length.
    pub degenerate_segments: usize,
    pub radius_clamps: usize,
    /// Sum of all radius increases made by the floor.
    pub radius_clamp_delta: f64,
    /// Branch labels decided by radius because the angle was undefined.
    pub labeling_fallbacks: usize,
    /// Samples removed inside the soma.
    pub trimmed_samples: usize,
    pub union_failures: usize,
    pub warnings: Vec<String>,
}

impl Diagnostics {
    pub fn is_clean(&self) -> bool {
        *self == Diagnostics::default()
    }

    pub(crate) fn skip_section(&mut self, id: SectionId, reason: &str) {
        if !self.skipped_sections.contains(&id) {
            warn!(section = id.0, reason, "Section skipped");
            self.skipped_sections.push(id);
        }
    }

    pub(crate) fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{message}");
        self.warnings.push(message);
    }
}

/// Wall time of one stage.
#[derive(Debug, Clone, PartialEq)]
pub struct StageTiming {
    pub stage: &'static str,
    pub duration: Duration,
}

/// Statistics of the last `reconstruct` call of a builder.
#[derive(Debug, Clone, Default)]
pub struct ReconstructionStats {
    pub technique: Option<MeshingTechnique>,
    pub stage_timings: Vec<StageTiming>,
    pub arbors_generated: usize,
    pub sections_generated: usize,
    /// Meta elements in the implicit field.
    pub elements: usize,
    /// Grid spacing used by implicit and voxel surfaces.
    pub voxel_size: Option<f64>,
    /// Whether every unioned arbor came out watertight.
    pub union_valid: Option<bool>,
    pub stitched_junctions: usize,
    pub final_vertices: usize,
    pub final_faces: usize,
}

impl ReconstructionStats {
    pub fn total_time(&self) -> Duration {
        self.stage_timings.iter().map(|t| t.duration).sum()
    }

    pub fn stage(&self, name: &str) -> Option<Duration> {
        self.stage_timings
            .iter()
            .find(|t| t.stage == name)
            .map(|t| t.duration)
    }
}

/// Geometry generated for one arbor.
#[derive(Debug)]
pub struct ArborGeometry {
    pub arbor: usize,
    pub geometry: GeneratedGeometry,
}

/// Mutable state of one reconstruction pass.
///
/// Created at the start of `reconstruct` and dropped at its end, together
/// with every temporary mesh it owns.
pub struct ReconstructionContext {
    /// Smallest radius seen by a generator so far.
    pub smallest_radius: f64,
    pub diagnostics: Diagnostics,
    pub rng: SeededRng,
    pub stats: ReconstructionStats,
    pub geometry: Vec<ArborGeometry>,
    progress: Option<SharedProgressTracker>,
}

impl ReconstructionContext {
    pub fn new(seed: u64, progress: Option<SharedProgressTracker>) -> Self {
        Self {
            smallest_radius: f64::INFINITY,
            diagnostics: Diagnostics::default(),
            rng: SeededRng::new(seed),
            stats: ReconstructionStats::default(),
            geometry: Vec::new(),
            progress,
        }
    }

    /// Lower the smallest-radius accumulator.
    pub fn observe_radius(&mut self, radius: f64) {
        if radius > 0.0 && radius < self.smallest_radius {
            self.smallest_radius = radius;
        }
    }

    /// Store arbor geometry and return its reference.
    pub fn push_geometry(&mut self, arbor: usize, geometry: GeneratedGeometry) -> GeometryRef {
        self.geometry.push(ArborGeometry { arbor, geometry });
        GeometryRef(self.geometry.len() - 1)
    }

    /// Run one stage under a timer and record its duration.
    pub fn stage<T>(&mut self, name: &'static str, f: impl FnOnce(&mut Self) -> T) -> T {
        let timer = OperationTimer::new(name);
        let out = f(self);
        let duration = timer.finish();
        self.stats.stage_timings.push(StageTiming { stage: name, duration });
        self.advance();
        out
    }

    /// Announce extra work units to the progress tracker.
    pub fn expect_work(&self, units: u64) {
        if let Some(progress) = &self.progress {
            progress.add_total(units);
        }
    }

    /// Mark one unit of work done.
    pub fn advance(&self) {
        if let Some(progress) = &self.progress {
            progress.increment();
            trace!(fraction = progress.fraction(), "Progress");
        }
    }
}
