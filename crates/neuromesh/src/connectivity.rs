//! Soma connectivity of arbor roots.
//!
//! Every root is classified once per pass:
//! - **connected** when its first sample lies within
//!   `smallest_radius * connection_tolerance` of the soma centroid
//! - **bridged** when the straight way from the first sample to the soma
//!   runs through another arbor's first segment
//! - **far from soma** otherwise
//!
//! Generators read the result through [`anchor_points`] to decide which
//! synthetic samples start an arbor; the stitcher reads it to pick the
//! junctions it repairs.

use nalgebra::Point3;
use tracing::debug;

use crate::options::{ReconstructionOptions, RootPolicy};
use crate::skeleton::{Connectivity, Morphology, Section, SectionId};

/// Synthetic start point of a root: the first sample pushed back by
/// `fraction` units against the unit direction of the first segment.
///
/// `None` for roots with fewer than two samples or a zero-length first
/// segment.
pub fn bridging_point(section: &Section, fraction: f64) -> Option<Point3<f64>> {
    let samples = section.samples();
    let p0 = samples.first()?.point;
    let p1 = samples.get(1)?.point;
    let direction = (p1 - p0).try_normalize(1e-12)?;
    Some(p0 - direction * fraction)
}

/// Where a bridged root enters the soma: on the ray from the centroid
/// towards the first sample, `fraction` units inside the smallest radius.
fn soma_entry_point(morph: &Morphology, section: &Section, fraction: f64) -> Option<Point3<f64>> {
    let soma = &morph.soma;
    let p0 = section.first()?.point;
    let outward = (p0 - soma.centroid).try_normalize(1e-12)?;
    Some(soma.centroid + outward * (soma.smallest_radius - fraction).max(0.0))
}

/// Closest distance between segments `a0-a1` and `b0-b1`, with the
/// parameter of the closest point on the first segment.
pub(crate) fn segment_distance(
    a0: &Point3<f64>,
    a1: &Point3<f64>,
    b0: &Point3<f64>,
    b1: &Point3<f64>,
) -> (f64, f64) {
    let d1 = a1 - a0;
    let d2 = b1 - b0;
    let r = a0 - b0;
    let a = d1.norm_squared();
    let e = d2.norm_squared();
    let f = d2.dot(&r);
    let eps = 1e-12;

    let (s, t) = if a <= eps && e <= eps {
        (0.0, 0.0)
    } else if a <= eps {
        (0.0, (f / e).clamp(0.0, 1.0))
    } else {
        let c = d1.dot(&r);
        if e <= eps {
            ((-c / a).clamp(0.0, 1.0), 0.0)
        } else {
            let b = d1.dot(&d2);
            let denom = a * e - b * b;
            let mut s = if denom > eps {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let mut t = (b * s + f) / e;
            if t < 0.0 {
                t = 0.0;
                s = (-c / a).clamp(0.0, 1.0);
            } else if t > 1.0 {
                t = 1.0;
                s = ((b - c) / a).clamp(0.0, 1.0);
            }
            (s, t)
        }
    };
    let pa = a0 + d1 * s;
    let pb = b0 + d2 * t;
    ((pa - pb).norm(), s)
}

/// Classify one arbor root without touching the morphology.
pub fn classify_root(morph: &Morphology, arbor: usize, options: &ReconstructionOptions) -> Connectivity {
    let soma = &morph.soma;
    let Some(root) = morph.arbor(arbor).map(|a| morph.section(a.root)) else {
        return Connectivity::FarFromSoma;
    };
    let Some(p0) = root.first().map(|s| s.point) else {
        return Connectivity::FarFromSoma;
    };
    let distance = (p0 - soma.centroid).norm();
    if distance <= soma.smallest_radius * options.calibration.connection_tolerance {
        return Connectivity::Connected;
    }

    // Portion of the way to the centroid that lies outside the soma sphere
    let reach = (1.0 - soma.smallest_radius / distance).clamp(0.0, 1.0);
    let entry = p0 + (soma.centroid - p0) * reach;
    for (other_index, other) in morph.arbors().iter().enumerate() {
        if other_index == arbor {
            continue;
        }
        let samples = morph.section(other.root).samples();
        let (Some(q0), Some(q1)) = (samples.first(), samples.get(1)) else {
            continue;
        };
        let (gap, _) = segment_distance(&p0, &entry, &q0.point, &q1.point);
        if gap <= q0.radius.max(q1.radius) {
            return Connectivity::Bridged;
        }
    }
    Connectivity::FarFromSoma
}

/// Classify every root, store the result on the soma and set the root flags.
pub fn classify(morph: &mut Morphology, options: &ReconstructionOptions) -> Vec<Connectivity> {
    let result: Vec<Connectivity> = (0..morph.arbors().len())
        .map(|i| classify_root(morph, i, options))
        .collect();
    let roots: Vec<SectionId> = morph.arbors().iter().map(|a| a.root).collect();
    for (root, connectivity) in roots.into_iter().zip(&result) {
        let section = morph.section_mut(root);
        section.connected_to_soma = *connectivity == Connectivity::Connected;
        section.far_from_soma = *connectivity == Connectivity::FarFromSoma;
    }
    debug!(
        connected = result.iter().filter(|c| **c == Connectivity::Connected).count(),
        bridged = result.iter().filter(|c| **c == Connectivity::Bridged).count(),
        far = result.iter().filter(|c| **c == Connectivity::FarFromSoma).count(),
        "Roots classified"
    );
    morph.soma.arbor_connectivity = result.clone();
    result
}

/// Which family of generator asks for anchors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorStyle {
    /// Skin graphs start at the soma centroid when connected.
    Skin,
    /// Swept tubes and implicit fields.
    Tube,
    /// Root-to-leaf paths merged by boolean union.
    Path,
}

/// Synthetic points prepended to an arbor root, in order.
///
/// - Skin: connected roots get `[centroid, bridging]`, bridged roots
///   `[bridging]`.
/// - Tube: connected roots get `[bridging]`, bridged roots start at their
///   entry point just inside the soma surface.
/// - Path: like Tube, except that bridged roots start at the coordinate
///   origin.
/// - Far roots get nothing, or the origin under `RootPolicy::AllConnected`.
///
/// Nothing is prepended when arbors are not attached to a soma.
pub fn anchor_points(
    morph: &Morphology,
    arbor: usize,
    options: &ReconstructionOptions,
    style: AnchorStyle,
) -> Vec<Point3<f64>> {
    if !options.attaches_to_soma() {
        return Vec::new();
    }
    let Some(root) = morph.arbor(arbor).map(|a| morph.section(a.root)) else {
        return Vec::new();
    };
    let connectivity = morph
        .soma
        .connectivity(arbor)
        .unwrap_or_else(|| classify_root(morph, arbor, options));
    let bridging = bridging_point(root, options.calibration.bridging_fraction);
    match (connectivity, style) {
        (Connectivity::Connected, AnchorStyle::Skin) => {
            let mut points = vec![morph.soma.centroid];
            points.extend(bridging);
            points
        }
        (Connectivity::Connected, AnchorStyle::Tube | AnchorStyle::Path) => bridging.into_iter().collect(),
        (Connectivity::Bridged, AnchorStyle::Skin) => bridging.into_iter().collect(),
        (Connectivity::Bridged, AnchorStyle::Tube) => {
            soma_entry_point(morph, root, options.calibration.bridging_fraction)
                .into_iter()
                .collect()
        }
        (Connectivity::Bridged, AnchorStyle::Path) => vec![Point3::origin()],
        (Connectivity::FarFromSoma, _) => match options.root_policy {
            RootPolicy::AllConnected => vec![Point3::origin()],
            RootPolicy::Default => Vec::new(),
        },
    }
}
