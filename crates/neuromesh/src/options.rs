//! Reconstruction options.
//!
//! A flat, immutable per-run configuration. Every field has a default, so a
//! TOML file only needs the fields it changes:
//!
//! ```toml
//! technique = "union"
//! decimation_ratio = 0.5
//!
//! [calibration]
//! stitch_smoothing_iterations = 8
//! ```
//!
//! The core never validates ranges. Out-of-range values follow fixed
//! conventions, e.g. a decimation ratio outside `(0.01, 1.0)` means
//! no decimation. [`ReconstructionOptions::validate`] is for callers.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{NeuroError, NeuroResult};
use crate::skeleton::SectionType;

/// How arbor geometry is generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeshingTechnique {
    /// Implicit surface over meta elements.
    #[default]
    Meta,
    /// One extruded skin per arbor.
    Skinning,
    /// Boolean union of root-to-leaf path tubes.
    Union,
    /// Joined per-section tubes.
    Piecewise,
    /// Voxel remesh of a coarse proxy.
    Voxelization,
}

/// Sample resampling policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResamplingMethod {
    None,
    /// Samples exactly `resampling_step` apart.
    FixedStep,
    /// Segments capped at one radius; contained samples removed.
    Adaptive,
    /// Like `Adaptive` with the sum of both radii as the threshold.
    #[default]
    AdaptiveRelaxed,
    /// Like `Adaptive` with overlapping neighbour spheres.
    AdaptivePacked,
}

/// How the soma is represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SomaRepresentation {
    /// No soma geometry.
    Ignore,
    /// Sphere of the mean soma radius.
    Sphere,
    /// Implicit surface from the centroid and profile points.
    #[default]
    MetaBall,
    /// Caller-supplied simulated surface.
    SoftBody,
}

/// Surface finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceRoughness {
    #[default]
    Smooth,
    /// Procedural noise on arbor surfaces.
    Rough,
}

/// Whether arbors attach to the soma surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SomaConnection {
    #[default]
    Connected,
    Disconnected,
}

/// Treatment of roots classified far from the soma.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootPolicy {
    /// Far roots float free.
    #[default]
    Default,
    /// Far roots are extruded to the origin.
    AllConnected,
}

/// Skeleton style transform, applied after radius repair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArborStyle {
    #[default]
    Original,
    /// Radius falls linearly towards each tip.
    Tapered,
    /// Interior samples jitter orthogonally to the section.
    Zigzag,
    /// All samples projected onto the soma's dominant plane.
    Planar,
    /// Sections reduced to their first and last sample.
    Straight,
}

/// Where spine geometry comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpineSource {
    #[default]
    None,
    /// Spines carried by the morphology.
    Morphology,
}

/// Proxy used before voxel remeshing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoxelProxy {
    #[default]
    Piecewise,
    /// Spheres at joints plus per-section tubes.
    Articulated,
}

/// Output aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// One mesh with per-vertex part tags.
    #[default]
    Joined,
    /// One mesh per part.
    PerPart,
}

/// Empirically tuned constants.
///
/// The defaults reproduce reference output; change them only together with
/// a visual or metric regression check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    /// Field radius over nominal radius for meta elements.
    pub meta_scale: f64,
    /// Radius factor for the first element of each segment.
    pub first_element_factor: f64,
    /// Marching step over local radius.
    pub meta_step_factor: f64,
    /// Segments shorter than this are skipped by the meta generator.
    pub min_segment_length: f64,
    /// Radii are clamped to at least this fraction of the segment length.
    pub min_radius_fraction: f64,
    /// Iso level of the meta field.
    pub iso_level: f64,
    /// Meta voxel size over the smallest field radius.
    pub resolution_factor: f64,
    /// Bridging point offset along the root direction, inward.
    pub bridging_fraction: f64,
    /// Roots within `smallest_radius * connection_tolerance` are connected.
    pub connection_tolerance: f64,
    /// Stitch selection radius over the first sample radius.
    pub stitch_radius_factor: f64,
    /// Restricted smoothing passes at each junction.
    pub stitch_smoothing_iterations: u32,
    /// Radius floor of voxelization proxies.
    pub voxel_proxy_radius_floor: f64,
    /// Voxel size over the smallest trimmed radius.
    pub voxel_resolution_factor: f64,
    /// Voxel size when spines are present.
    pub spine_voxel_size: f64,
    /// Face ratio kept when decimating a soft-body meta surface.
    pub softbody_decimation_ratio: f64,
    /// Smoothing passes on a soft-body meta surface.
    pub softbody_smoothing_iterations: u32,
    /// Rough-surface displacement, in length units.
    pub noise_amplitude: f64,
    /// Rough-surface noise frequency, in cycles per length unit.
    pub noise_frequency: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            meta_scale: 1.575 * 1.025,
            first_element_factor: 0.9,
            meta_step_factor: 0.5,
            min_segment_length: 1e-3,
            min_radius_fraction: 1e-3,
            iso_level: mesh_volume::DEFAULT_ISO_LEVEL,
            resolution_factor: 0.5,
            bridging_fraction: 0.75,
            connection_tolerance: 1.5,
            stitch_radius_factor: 2.0,
            stitch_smoothing_iterations: 5,
            voxel_proxy_radius_floor: 0.2,
            voxel_resolution_factor: 0.75,
            spine_voxel_size: 0.05,
            softbody_decimation_ratio: 0.5,
            softbody_smoothing_iterations: 5,
            noise_amplitude: 0.15,
            noise_frequency: 0.5,
        }
    }
}

/// Options for one reconstruction pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconstructionOptions {
    pub technique: MeshingTechnique,
    pub resampling: ResamplingMethod,
    /// Step of `ResamplingMethod::FixedStep`.
    pub resampling_step: f64,
    /// Deepest branching order generated for axons.
    pub axon_branching_order: u32,
    pub basal_branching_order: u32,
    pub apical_branching_order: u32,
    pub soma: SomaRepresentation,
    pub surface: SurfaceRoughness,
    /// Applied only when strictly inside `(0.01, 1.0)`.
    pub decimation_ratio: f64,
    pub soma_connection: SomaConnection,
    pub root_policy: RootPolicy,
    /// Sides of the tube cross-section polygon.
    pub bevel_sides: usize,
    /// Close tube ends.
    pub caps: bool,
    pub arbor_style: ArborStyle,
    /// Tip radius over root radius for `ArborStyle::Tapered`.
    pub taper_fraction: f64,
    /// Zigzag offset over local radius.
    pub zigzag_amplitude: f64,
    pub spines: SpineSource,
    pub voxel_proxy: VoxelProxy,
    pub output: OutputMode,
    /// Run manifold repair in the finalizer.
    pub repair_manifold: bool,
    /// Translate the result so the soma centroid is at the origin.
    pub center_at_soma: bool,
    /// Smallest allowed sample radius.
    pub radius_floor: f64,
    pub seed: u64,
    /// Voxel budget of any grid.
    pub max_voxels: usize,
    pub calibration: Calibration,
}

impl Default for ReconstructionOptions {
    fn default() -> Self {
        Self {
            technique: MeshingTechnique::Meta,
            resampling: ResamplingMethod::AdaptiveRelaxed,
            resampling_step: 1.0,
            axon_branching_order: 5,
            basal_branching_order: u32::MAX,
            apical_branching_order: u32::MAX,
            soma: SomaRepresentation::MetaBall,
            surface: SurfaceRoughness::Smooth,
            decimation_ratio: 1.0,
            soma_connection: SomaConnection::Connected,
            root_policy: RootPolicy::Default,
            bevel_sides: 8,
            caps: true,
            arbor_style: ArborStyle::Original,
            taper_fraction: 0.2,
            zigzag_amplitude: 0.5,
            spines: SpineSource::None,
            voxel_proxy: VoxelProxy::Piecewise,
            output: OutputMode::Joined,
            repair_manifold: true,
            center_at_soma: false,
            radius_floor: 0.1,
            seed: 0,
            max_voxels: 32_000_000,
            calibration: Calibration::default(),
        }
    }
}

impl ReconstructionOptions {
    /// Implicit-surface reconstruction with packed resampling.
    pub fn for_meta() -> Self {
        Self {
            technique: MeshingTechnique::Meta,
            resampling: ResamplingMethod::AdaptivePacked,
            ..Self::default()
        }
    }

    /// Skinned arbors on a meta-ball soma.
    pub fn for_skinning() -> Self {
        Self {
            technique: MeshingTechnique::Skinning,
            resampling: ResamplingMethod::AdaptiveRelaxed,
            ..Self::default()
        }
    }

    /// Path tubes merged by boolean union.
    pub fn for_union() -> Self {
        Self {
            technique: MeshingTechnique::Union,
            resampling: ResamplingMethod::AdaptiveRelaxed,
            soma: SomaRepresentation::Sphere,
            ..Self::default()
        }
    }

    /// Fast joined section tubes.
    pub fn for_piecewise() -> Self {
        Self {
            technique: MeshingTechnique::Piecewise,
            resampling: ResamplingMethod::AdaptiveRelaxed,
            soma: SomaRepresentation::Sphere,
            ..Self::default()
        }
    }

    /// Voxel remesh of a piecewise proxy.
    pub fn for_voxelization() -> Self {
        Self {
            technique: MeshingTechnique::Voxelization,
            resampling: ResamplingMethod::AdaptiveRelaxed,
            soma: SomaRepresentation::Sphere,
            ..Self::default()
        }
    }

    /// Deepest branching order generated for arbors of `kind`.
    pub fn max_branching_order(&self, kind: SectionType) -> u32 {
        match kind {
            SectionType::Axon => self.axon_branching_order,
            SectionType::ApicalDendrite => self.apical_branching_order,
            SectionType::BasalDendrite | SectionType::Undetermined => self.basal_branching_order,
        }
    }

    /// Decimation is a no-op unless the ratio lies strictly inside `(0.01, 1.0)`.
    pub fn decimation_applies(&self) -> bool {
        self.decimation_ratio > 0.01 && self.decimation_ratio < 1.0
    }

    /// Whether arbors should be attached to a soma at all.
    pub fn attaches_to_soma(&self) -> bool {
        self.soma_connection == SomaConnection::Connected && self.soma != SomaRepresentation::Ignore
    }

    /// Caller-side range check. The reconstruction core never calls this.
    pub fn validate(&self) -> NeuroResult<()> {
        let positive = [
            ("resampling_step", self.resampling_step),
            ("radius_floor", self.radius_floor),
            ("calibration.meta_scale", self.calibration.meta_scale),
            ("calibration.resolution_factor", self.calibration.resolution_factor),
            ("calibration.voxel_resolution_factor", self.calibration.voxel_resolution_factor),
            ("calibration.spine_voxel_size", self.calibration.spine_voxel_size),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(NeuroError::invalid_option(
                    name,
                    format!("must be finite and positive, got {value}"),
                ));
            }
        }
        if self.bevel_sides < 3 {
            return Err(NeuroError::invalid_option(
                "bevel_sides",
                format!("a cross-section needs at least 3 sides, got {}", self.bevel_sides),
            ));
        }
        if !(0.0..=1.0).contains(&self.taper_fraction) {
            return Err(NeuroError::invalid_option(
                "taper_fraction",
                format!("must lie in [0, 1], got {}", self.taper_fraction),
            ));
        }
        if !(0.0..1.0).contains(&self.calibration.iso_level) {
            return Err(NeuroError::invalid_option(
                "calibration.iso_level",
                format!("must lie in [0, 1), got {}", self.calibration.iso_level),
            ));
        }
        Ok(())
    }

    /// Parse a TOML document.
    pub fn from_toml(text: &str) -> NeuroResult<Self> {
        toml::from_str(text).map_err(|e| NeuroError::Config {
            format: "TOML",
            details: e.to_string(),
        })
    }

    /// Load a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> NeuroResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Serialize to TOML.
    pub fn to_toml(&self) -> NeuroResult<String> {
        toml::to_string_pretty(self).map_err(|e| NeuroError::Config {
            format: "TOML",
            details: e.to_string(),
        })
    }

    /// Write a TOML file.
    pub fn save_toml(&self, path: impl AsRef<Path>) -> NeuroResult<()> {
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Parse a JSON document.
    pub fn from_json(text: &str) -> NeuroResult<Self> {
        serde_json::from_str(text).map_err(|e| NeuroError::Config {
            format: "JSON",
            details: e.to_string(),
        })
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> NeuroResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| NeuroError::Config {
            format: "JSON",
            details: e.to_string(),
        })
    }

    /// Stable fingerprint of the options, used to make preprocessing idempotent.
    pub fn fingerprint(&self) -> u64 {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        // Serialization cannot fail for this type; an empty string still hashes
        self.to_json().unwrap_or_default().hash(&mut hasher);
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults() {
        let options = ReconstructionOptions::default();
        assert_eq!(options.technique, MeshingTechnique::Meta);
        assert_relative_eq!(options.calibration.meta_scale, 1.614375);
        assert_relative_eq!(options.calibration.bridging_fraction, 0.75);
        assert!(!options.decimation_applies());
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let options = ReconstructionOptions::from_toml(
            r#"
            technique = "union"
            decimation_ratio = 0.5

            [calibration]
            stitch_smoothing_iterations = 8
            "#,
        )
        .unwrap();
        assert_eq!(options.technique, MeshingTechnique::Union);
        assert!(options.decimation_applies());
        assert_eq!(options.calibration.stitch_smoothing_iterations, 8);
        assert_relative_eq!(options.calibration.iso_level, 0.54);
        assert_eq!(options.bevel_sides, 8);
    }

    #[test]
    fn test_toml_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.toml");
        let options = ReconstructionOptions {
            arbor_style: ArborStyle::Zigzag,
            seed: 99,
            ..ReconstructionOptions::for_skinning()
        };
        options.save_toml(&path).unwrap();
        assert_eq!(ReconstructionOptions::from_toml_file(&path).unwrap(), options);
    }

    #[test]
    fn test_json_roundtrip() {
        let options = ReconstructionOptions::for_voxelization();
        let json = options.to_json().unwrap();
        assert!(json.contains("\"voxelization\""));
        assert_eq!(ReconstructionOptions::from_json(&json).unwrap(), options);
    }

    #[test]
    fn test_bad_config_reports_format() {
        let err = ReconstructionOptions::from_toml("technique = 3").unwrap_err();
        assert_eq!(err.code().as_str(), "NEURO-3001");
        assert!(err.to_string().starts_with("TOML"));
    }

    #[test]
    fn test_validate_rejects_bad_ranges() {
        let options = ReconstructionOptions {
            bevel_sides: 2,
            ..Default::default()
        };
        assert_eq!(options.validate().unwrap_err().code().as_str(), "NEURO-1002");
    }

    #[test]
    fn test_decimation_window() {
        for (ratio, applies) in [(0.01, false), (1.0, false), (1.5, false), (-0.1, false), (0.5, true)] {
            let options = ReconstructionOptions {
                decimation_ratio: ratio,
                ..Default::default()
            };
            assert_eq!(options.decimation_applies(), applies, "ratio {ratio}");
        }
    }

    #[test]
    fn test_fingerprint_tracks_changes() {
        let a = ReconstructionOptions::default();
        let b = ReconstructionOptions {
            seed: 1,
            ..Default::default()
        };
        assert_eq!(a.fingerprint(), ReconstructionOptions::default().fingerprint());
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_presets_resample_relaxed() {
        for options in [
            ReconstructionOptions::for_skinning(),
            ReconstructionOptions::for_union(),
            ReconstructionOptions::for_piecewise(),
            ReconstructionOptions::for_voxelization(),
        ] {
            assert_eq!(options.resampling, ResamplingMethod::AdaptiveRelaxed, "{:?}", options.technique);
        }
    }
}
