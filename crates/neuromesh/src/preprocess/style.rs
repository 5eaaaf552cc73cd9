//! Skeleton style transforms.

use hashbrown::HashMap;
use nalgebra::{Matrix3, Point3, SymmetricEigen, Vector3};

use crate::options::{ArborStyle, ReconstructionOptions};
use crate::rng::SeededRng;
use crate::skeleton::{Morphology, Sample, SectionId};

/// Apply the selected style to every section.
pub fn apply_style(morph: &mut Morphology, options: &ReconstructionOptions, rng: &mut SeededRng) {
    match options.arbor_style {
        ArborStyle::Original => {}
        ArborStyle::Tapered => taper(morph, options.taper_fraction),
        ArborStyle::Zigzag => zigzag(morph, options.zigzag_amplitude, rng),
        ArborStyle::Planar => planar(morph),
        ArborStyle::Straight => straighten(morph),
    }
}

/// Radius falls linearly from the root value to `fraction` of it at every tip.
///
/// A sample at path distance `d` from the root whose longest way down to a
/// tip is `m` gets `t = d / (d + m)`.
fn taper(morph: &mut Morphology, fraction: f64) {
    for arbor in 0..morph.arbors().len() {
        let sections = morph.arbor_sections(arbor);
        let Some(root_radius) = sections
            .first()
            .and_then(|id| morph.section(*id).first())
            .map(|s| s.radius)
        else {
            continue;
        };

        // Longest distance from each section's end down to a tip, bottom-up
        let mut below: HashMap<SectionId, f64> = HashMap::with_capacity(sections.len());
        for id in sections.iter().rev() {
            let section = morph.section(*id);
            let longest = section
                .children
                .iter()
                .map(|c| below.get(c).copied().unwrap_or(0.0) + morph.section(*c).length())
                .fold(0.0, f64::max);
            below.insert(*id, longest);
        }

        for id in sections {
            let start = morph.path_length(id) - morph.section(id).length();
            let tail = below.get(&id).copied().unwrap_or(0.0);
            let samples = morph.section(id).samples();
            let total = samples
                .windows(2)
                .map(|w| w[0].distance(&w[1]))
                .sum::<f64>();
            let mut walked = 0.0;
            let mut tapered = Vec::with_capacity(samples.len());
            for (i, s) in samples.iter().enumerate() {
                if i > 0 {
                    walked += s.distance(&samples[i - 1]);
                }
                let d = start + walked;
                let m = tail + (total - walked);
                let t = if d + m > 0.0 { d / (d + m) } else { 0.0 };
                let mut s = *s;
                s.radius = root_radius * (1.0 - t * (1.0 - fraction));
                tapered.push(s);
            }
            morph.set_samples(id, tapered);
        }
    }
}

/// Interior samples move orthogonally to their section by up to
/// `amplitude * radius`.
fn zigzag(morph: &mut Morphology, amplitude: f64, rng: &mut SeededRng) {
    let ids: Vec<SectionId> = morph.sections().iter().map(|s| s.id).collect();
    for id in ids {
        let Some(axis) = morph.section(id).initial_direction() else {
            continue;
        };
        let (u, v) = orthonormal_pair(&axis);
        let mut samples: Vec<Sample> = morph.section(id).samples().to_vec();
        let n = samples.len();
        for s in samples.iter_mut().take(n.saturating_sub(1)).skip(1) {
            let angle = rng.range(0.0, std::f64::consts::TAU);
            let offset = rng.symmetric(amplitude) * s.radius;
            s.point += (u * angle.cos() + v * angle.sin()) * offset;
        }
        morph.set_samples(id, samples);
    }
}

/// Project every sample onto the plane through the soma centroid whose
/// normal is the least-spread principal axis of all samples.
fn planar(morph: &mut Morphology) {
    let points: Vec<Point3<f64>> = morph
        .sections()
        .iter()
        .flat_map(|s| s.points())
        .collect();
    let Some(normal) = least_spread_axis(&points) else {
        return;
    };
    let origin = morph.soma.centroid;
    let ids: Vec<SectionId> = morph.sections().iter().map(|s| s.id).collect();
    for id in ids {
        let samples = morph
            .section(id)
            .samples()
            .iter()
            .map(|s| {
                let mut s = *s;
                s.point -= normal * (s.point - origin).dot(&normal);
                s
            })
            .collect();
        morph.set_samples(id, samples);
    }
}

/// First and last sample only.
fn straighten(morph: &mut Morphology) {
    let ids: Vec<SectionId> = morph.sections().iter().map(|s| s.id).collect();
    for id in ids {
        let samples = morph.section(id).samples();
        if samples.len() > 2 {
            let ends = vec![samples[0], samples[samples.len() - 1]];
            morph.set_samples(id, ends);
        }
    }
}

/// Eigenvector of the smallest covariance eigenvalue.
pub(crate) fn least_spread_axis(points: &[Point3<f64>]) -> Option<Vector3<f64>> {
    if points.len() < 3 {
        return None;
    }
    let mean = points.iter().fold(Vector3::zeros(), |acc, p| acc + p.coords) / points.len() as f64;
    let covariance = points.iter().fold(Matrix3::zeros(), |acc, p| {
        let d = p.coords - mean;
        acc + d * d.transpose()
    });
    let eigen = SymmetricEigen::new(covariance);
    let (index, _) = eigen
        .eigenvalues
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))?;
    eigen.eigenvectors.column(index).into_owned().try_normalize(1e-12)
}

/// Two unit vectors orthogonal to `axis` and to each other.
pub(crate) fn orthonormal_pair(axis: &Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
    let helper = if axis.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    let u = axis.cross(&helper).normalize();
    let v = axis.cross(&u).normalize();
    (u, v)
}
