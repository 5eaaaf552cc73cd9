//! Meta elements marched along sections.
//!
//! Every segment is walked from its first to its second sample in steps of
//! half the local radius, so thin segments get proportionally more
//! elements. Field radii are the interpolated sample radius times the
//! calibrated scale.

use mesh_volume::MetaElement;
use nalgebra::Point3;
use tracing::debug;

use crate::connectivity::{AnchorStyle, anchor_points};
use crate::context::ReconstructionContext;
use crate::mesh::{PartLabel, VertexLabeler};
use crate::options::{Calibration, ReconstructionOptions, SpineSource};
use crate::skeleton::{Morphology, Sample, SectionId};

/// Elements with the part each one belongs to.
#[derive(Debug, Clone, Default)]
pub struct LabeledElements {
    pub elements: Vec<MetaElement>,
    pub labels: Vec<PartLabel>,
}

impl LabeledElements {
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn push(&mut self, element: MetaElement, label: PartLabel) {
        self.elements.push(element);
        self.labels.push(label);
    }

    pub fn extend(&mut self, elements: impl IntoIterator<Item = MetaElement>, label: PartLabel) {
        for e in elements {
            self.push(e, label);
        }
    }

    /// Smallest field radius.
    pub fn smallest_radius(&self) -> Option<f64> {
        self.elements.iter().map(|e| e.radius).reduce(f64::min)
    }

    pub(crate) fn labeler(&self) -> VertexLabeler {
        VertexLabeler::new(
            self.elements
                .iter()
                .zip(&self.labels)
                .map(|(e, l)| (e.center, e.radius, *l))
                .collect(),
        )
    }
}

/// March one segment, appending its elements to `out`.
///
/// Returns the number of elements emitted, or `None` when the segment is
/// shorter than the minimum length and was skipped.
pub fn march_segment(a: &Sample, b: &Sample, calibration: &Calibration, out: &mut Vec<MetaElement>) -> Option<usize> {
    let length = a.distance(b);
    if length < calibration.min_segment_length {
        return None;
    }
    let floor = calibration.min_radius_fraction * length;
    let r1 = a.radius.max(floor);
    let r2 = b.radius.max(floor);
    let direction = (b.point - a.point) / length;

    let before = out.len();
    let mut t = 0.0;
    while t < length {
        let r = r1 + (r2 - r1) * t / length;
        let softening = if out.len() == before {
            calibration.first_element_factor
        } else {
            1.0
        };
        out.push(MetaElement::new(
            a.point + direction * t,
            calibration.meta_scale * r * softening,
        ));
        t += calibration.meta_step_factor * r;
    }
    Some(out.len() - before)
}

/// Element closing the end of a leaf section.
fn tip_element(tip: &Sample, calibration: &Calibration) -> MetaElement {
    MetaElement::new(tip.point, calibration.meta_scale * tip.radius)
}

/// Elements of one arbor, down to the branching-order limit of its type.
///
/// Roots with an anchor get an extra segment from the anchor to their first
/// sample. Returns the elements and the sections that produced them.
pub fn arbor_elements(
    morph: &Morphology,
    arbor: usize,
    options: &ReconstructionOptions,
    ctx: &mut ReconstructionContext,
) -> (Vec<MetaElement>, Vec<SectionId>) {
    let calibration = &options.calibration;
    let Some(info) = morph.arbor(arbor) else {
        return (Vec::new(), Vec::new());
    };
    let max_order = options.max_branching_order(info.kind);
    let mut elements = Vec::new();
    let mut produced = Vec::new();

    let root = morph.section(info.root);
    if let (Some(anchor), Some(first)) = (
        anchor_points(morph, arbor, options, AnchorStyle::Tube).last(),
        root.first(),
    ) {
        let start = Sample::new(*anchor, first.radius);
        if march_segment(&start, first, calibration, &mut elements).is_none() {
            ctx.diagnostics.degenerate_segments += 1;
        }
    }

    for id in morph.subtree_limited(info.root, max_order) {
        let section = morph.section(id);
        if !section.is_valid() {
            ctx.diagnostics.skip_section(id, "fewer than two samples");
            continue;
        }
        let before = elements.len();
        for pair in section.samples().windows(2) {
            if march_segment(&pair[0], &pair[1], calibration, &mut elements).is_none() {
                ctx.diagnostics.degenerate_segments += 1;
            }
        }
        let truncated = section
            .children
            .iter()
            .all(|c| morph.section(*c).branching_order > max_order);
        if section.is_leaf() || truncated {
            if let Some(tip) = section.last() {
                elements.push(tip_element(tip, calibration));
            }
        }
        if elements.len() > before {
            produced.push(id);
        }
    }

    for e in &elements {
        ctx.observe_radius(e.radius);
    }
    debug!(
        arbor = info.label.as_str(),
        elements = elements.len(),
        sections = produced.len(),
        "Arbor elements generated"
    );
    (elements, produced)
}

/// Elements of endfeet and, when enabled, spines.
pub fn appendage_elements(
    morph: &Morphology,
    options: &ReconstructionOptions,
    ctx: &mut ReconstructionContext,
    out: &mut LabeledElements,
) {
    let calibration = &options.calibration;
    let mut buffer = Vec::new();
    for foot in &morph.endfeet {
        buffer.clear();
        for pair in foot.samples.windows(2) {
            if march_segment(&pair[0], &pair[1], calibration, &mut buffer).is_none() {
                ctx.diagnostics.degenerate_segments += 1;
            }
        }
        if let Some(tip) = foot.samples.last() {
            buffer.push(tip_element(tip, calibration));
        }
        out.extend(buffer.iter().copied(), PartLabel::Endfoot);
    }
    if options.spines == SpineSource::Morphology {
        for spine in &morph.spines {
            buffer.clear();
            if march_segment(&spine.base, &spine.tip, calibration, &mut buffer).is_none() {
                ctx.diagnostics.degenerate_segments += 1;
            }
            buffer.push(tip_element(&spine.tip, calibration));
            out.extend(buffer.iter().copied(), PartLabel::Spine);
        }
    }
    for e in &out.elements {
        ctx.observe_radius(e.radius);
    }
}

/// Element halfway between `center` and `surface_point`, sized so that on
/// its own it reaches `surface_point`.
pub(crate) fn half_ray_element(center: &Point3<f64>, surface_point: &Point3<f64>, iso_level: f64) -> Option<MetaElement> {
    let half = (surface_point - center) * 0.5;
    let reach = half.norm();
    (reach > 0.0).then(|| {
        MetaElement::new(
            center + half,
            mesh_volume::sphere_field_radius(reach, iso_level),
        )
    })
}
