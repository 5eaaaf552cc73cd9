//! Tube generators: joined section tubes and unioned path tubes.

use mesh_kernel::{HoleFillMethod, Mesh, UnionParams, fill_holes, union_all, validate_mesh};
use tracing::{debug, warn};

use super::paths::{arbor_paths, prepend_anchors, section_chains};
use super::tube::{TubeCaps, TubeProfile, sweep_tube};
use crate::connectivity::{AnchorStyle, anchor_points};
use crate::context::ReconstructionContext;
use crate::mesh::PartLabel;
use crate::options::{ReconstructionOptions, ResamplingMethod, SpineSource};
use crate::preprocess::resample_samples;
use crate::skeleton::{Morphology, Sample, SectionId};

/// Tubes of one arbor and the surface made from them.
#[derive(Debug, Clone, Default)]
pub struct TubeSet {
    pub sections: Vec<SectionId>,
    /// Individual tubes, kept until the pass ends.
    pub tubes: Vec<Mesh>,
    pub mesh: Mesh,
    /// Whether a boolean union produced `mesh` as a closed manifold.
    pub union_valid: Option<bool>,
}

fn floored(samples: &[Sample], floor: f64) -> Vec<Sample> {
    samples
        .iter()
        .map(|s| Sample {
            radius: s.radius.max(floor),
            ..*s
        })
        .collect()
}

/// One uncapped tube per section, joined into one arbor mesh whose open
/// ends are then closed when caps are enabled.
///
/// Radii below `radius_floor` are raised for the sweep only.
pub fn piecewise_arbor(morph: &Morphology, arbor: usize, options: &ReconstructionOptions, radius_floor: f64) -> Option<TubeSet> {
    let info = morph.arbor(arbor)?;
    let profile = TubeProfile::new(options.bevel_sides);
    let anchors = anchor_points(morph, arbor, options, AnchorStyle::Tube);

    let mut set = TubeSet::default();
    for id in section_chains(morph, info.root, options.max_branching_order(info.kind))
        .into_iter()
        .flatten()
    {
        let mut samples = floored(morph.section(id).samples(), radius_floor);
        if id == info.root {
            prepend_anchors(&mut samples, &anchors);
        }
        let tube = sweep_tube(&samples, &profile, TubeCaps::NONE);
        if !tube.is_empty() {
            set.sections.push(id);
            set.tubes.push(tube);
        }
    }
    if set.tubes.is_empty() {
        return None;
    }

    set.mesh = Mesh::join(&set.tubes);
    if options.caps {
        match fill_holes(&mut set.mesh, usize::MAX, HoleFillMethod::CentroidFan) {
            Ok(closed) => debug!(arbor, closed, "Closed section ends"),
            Err(e) => warn!(arbor, error = %e, "Section ends left open"),
        }
    }
    Some(set)
}

/// Capped tubes along every path of an arbor, merged by boolean union.
///
/// A union that fails or is not a closed manifold is not fatal: a failure
/// falls back to the joined tubes and is counted in the diagnostics, and
/// the validity is recorded on the set.
pub fn union_arbor(
    morph: &Morphology,
    arbor: usize,
    options: &ReconstructionOptions,
    ctx: &mut ReconstructionContext,
) -> Option<TubeSet> {
    let info = morph.arbor(arbor)?;
    let profile = TubeProfile::new(options.bevel_sides);
    let tubes: Vec<Mesh> = arbor_paths(morph, arbor, options)
        .iter()
        .map(|path| {
            let path = resample_samples(path, ResamplingMethod::AdaptiveRelaxed, options.resampling_step);
            sweep_tube(&path, &profile, TubeCaps::BOTH)
        })
        .filter(|tube| !tube.is_empty())
        .collect();
    if tubes.is_empty() {
        return None;
    }
    let sections = morph.subtree_limited(info.root, options.max_branching_order(info.kind));

    let (mesh, valid) = match union_all(&tubes, &UnionParams::default()) {
        Ok(result) => {
            let report = validate_mesh(&result.mesh);
            let valid = report.is_watertight() && report.is_manifold();
            if !valid {
                warn!(
                    arbor,
                    boundary_edges = report.boundary_edge_count,
                    non_manifold_edges = report.non_manifold_edge_count,
                    "Union is not a closed manifold"
                );
            }
            (result.mesh, valid)
        }
        Err(e) => {
            ctx.diagnostics.union_failures += 1;
            ctx.diagnostics
                .warn(format!("Union of arbor {arbor} failed, keeping joined tubes: {e}"));
            (Mesh::join(&tubes), false)
        }
    };
    Some(TubeSet {
        sections,
        tubes,
        mesh,
        union_valid: Some(valid),
    })
}

/// Capped tubes for endfeet and, when enabled, spines.
pub fn appendage_tubes(morph: &Morphology, options: &ReconstructionOptions, radius_floor: f64) -> Vec<(PartLabel, Mesh)> {
    let profile = TubeProfile::new(options.bevel_sides);
    let mut out: Vec<(PartLabel, Mesh)> = morph
        .endfeet
        .iter()
        .map(|foot| {
            (
                PartLabel::Endfoot,
                sweep_tube(&floored(&foot.samples, radius_floor), &profile, TubeCaps::BOTH),
            )
        })
        .collect();
    if options.spines == SpineSource::Morphology {
        out.extend(morph.spines.iter().map(|spine| {
            (
                PartLabel::Spine,
                sweep_tube(&floored(&[spine.base, spine.tip], radius_floor), &profile, TubeCaps::BOTH),
            )
        }));
    }
    out.retain(|(_, mesh)| !mesh.is_empty());
    out
}
