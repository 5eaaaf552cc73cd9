//! Primary and secondary branch labels.

use crate::context::Diagnostics;
use crate::skeleton::{Morphology, SectionId};

/// Label every child section as the primary continuation of its parent or
/// as a secondary branch.
///
/// Among siblings, the child whose initial direction deviates least from
/// the parent's final direction is primary. When any of those directions is
/// undefined, the child whose first radius is closest to the parent's last
/// radius is primary instead. Root sections are always primary.
pub fn label_branches(morph: &mut Morphology, diagnostics: &mut Diagnostics) {
    let parents: Vec<SectionId> = morph
        .sections()
        .iter()
        .filter(|s| !s.children.is_empty())
        .map(|s| s.id)
        .collect();
    for root in morph.arbors().iter().map(|a| a.root).collect::<Vec<_>>() {
        morph.section_mut(root).is_primary = true;
    }

    for parent_id in parents {
        let parent = morph.section(parent_id);
        let children = parent.children.clone();
        if let [only] = children[..] {
            morph.section_mut(only).is_primary = true;
            continue;
        }
        let by_angle = parent.final_direction().and_then(|axis| {
            children
                .iter()
                .map(|c| {
                    morph
                        .section(*c)
                        .initial_direction()
                        .map(|d| (*c, axis.dot(&d).clamp(-1.0, 1.0).acos()))
                })
                .collect::<Option<Vec<_>>>()
        });
        let primary = match by_angle {
            Some(angles) => angles
                .into_iter()
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(id, _)| id),
            None => {
                diagnostics.labeling_fallbacks += 1;
                let target = parent.last().map(|s| s.radius).unwrap_or(0.0);
                children
                    .iter()
                    .min_by(|a, b| {
                        radius_gap(morph, **a, target).total_cmp(&radius_gap(morph, **b, target))
                    })
                    .copied()
            }
        };
        for child in children {
            morph.section_mut(child).is_primary = Some(child) == primary;
        }
    }
}

fn radius_gap(morph: &Morphology, id: SectionId, target: f64) -> f64 {
    morph
        .section(id)
        .first()
        .map(|s| (s.radius - target).abs())
        .unwrap_or(f64::INFINITY)
}

/// Children of `id` with the primary one first.
pub fn ordered_children(morph: &Morphology, id: SectionId) -> Vec<SectionId> {
    let mut children = morph.section(id).children.clone();
    children.sort_by_key(|c| !morph.section(*c).is_primary);
    children
}
