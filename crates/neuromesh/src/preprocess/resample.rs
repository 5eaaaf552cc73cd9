//! Section resampling.
//!
//! All policies keep the first and the last sample of a section untouched,
//! so a child section still starts where its parent ends.

use crate::options::ResamplingMethod;
use crate::skeleton::{Sample, polyline_length};

/// Threshold rule of the adaptive policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdaptiveMode {
    /// Drop below `r_i`, segments capped at `r_i`.
    Adaptive,
    /// Drop below `r_i + r_(i+1)`, segments capped at the same sum.
    Relaxed,
    /// Drop below `r_i`, segments capped at `r_i / 2` so neighbours overlap.
    Packed,
}

impl AdaptiveMode {
    fn drop_threshold(self, a: &Sample, b: &Sample) -> f64 {
        match self {
            AdaptiveMode::Adaptive | AdaptiveMode::Packed => a.radius,
            AdaptiveMode::Relaxed => a.radius + b.radius,
        }
    }

    fn step(self, a: &Sample, b: &Sample) -> f64 {
        match self {
            AdaptiveMode::Adaptive => a.radius,
            AdaptiveMode::Relaxed => a.radius + b.radius,
            AdaptiveMode::Packed => 0.5 * a.radius,
        }
    }
}

/// Shortest inserted step; keeps zero-radius samples from looping forever.
const MIN_STEP: f64 = 1e-3;

const EXIT_TOLERANCE: f64 = 1e-9;

/// Resample one section with `method`.
pub fn resample_samples(samples: &[Sample], method: ResamplingMethod, step: f64) -> Vec<Sample> {
    match method {
        ResamplingMethod::None => samples.to_vec(),
        ResamplingMethod::FixedStep => resample_fixed_step(samples, step),
        ResamplingMethod::Adaptive => resample_adaptive(samples, AdaptiveMode::Adaptive),
        ResamplingMethod::AdaptiveRelaxed => resample_adaptive(samples, AdaptiveMode::Relaxed),
        ResamplingMethod::AdaptivePacked => resample_adaptive(samples, AdaptiveMode::Packed),
    }
}

/// Samples exactly `step` apart, measured point to point.
///
/// Each new sample is where the polyline leaves the sphere of radius `step`
/// around the previous one. The terminal sample is always kept, so the last
/// gap may be shorter. A section shorter than one step is returned unchanged.
pub fn resample_fixed_step(samples: &[Sample], step: f64) -> Vec<Sample> {
    if samples.len() < 2 || !(step.is_finite() && step > 0.0) {
        return samples.to_vec();
    }
    let length = polyline_length(samples);
    if length <= f64::EPSILON {
        return vec![samples[0], samples[samples.len() - 1]];
    }
    if length < step {
        return samples.to_vec();
    }

    let last = samples[samples.len() - 1];
    let mut out = vec![samples[0]];
    let mut current = samples[0];
    let mut segment = 0;
    let mut t_min = 0.0;
    let max_points = (length / step).ceil() as usize * 2 + samples.len() + 8;

    while out.len() < max_points {
        if current.distance(&last) <= step * (1.0 + 1e-9) {
            break;
        }
        let mut next = None;
        while segment + 1 < samples.len() {
            let a = &samples[segment];
            let b = &samples[segment + 1];
            if let Some(t) = sphere_exit(a, b, &current, step).filter(|t| *t >= t_min) {
                next = Some(a.lerp(b, t));
                t_min = t;
                break;
            }
            segment += 1;
            t_min = 0.0;
        }
        match next {
            Some(s) => {
                out.push(s);
                current = s;
            }
            None => break,
        }
    }
    out.push(last);
    out
}

/// Larger parameter where segment `a-b` crosses the sphere around `center`.
fn sphere_exit(a: &Sample, b: &Sample, center: &Sample, radius: f64) -> Option<f64> {
    let d = b.point - a.point;
    let f = a.point - center.point;
    let qa = d.norm_squared();
    if qa <= f64::EPSILON {
        return None;
    }
    let qb = 2.0 * f.dot(&d);
    let qc = f.norm_squared() - radius * radius;
    let disc = qb * qb - 4.0 * qa * qc;
    if disc < 0.0 {
        return None;
    }
    let t = (-qb + disc.sqrt()) / (2.0 * qa);
    // Exits landing on a segment end may round just past it
    (-EXIT_TOLERANCE..=1.0 + EXIT_TOLERANCE)
        .contains(&t)
        .then(|| t.clamp(0.0, 1.0))
}

/// Pairwise adaptive resampling.
///
/// Walking from the first sample, a sample closer to the previous kept one
/// than the drop threshold is removed, unless it is the terminal sample.
/// Longer gaps get samples inserted along the segment direction every
/// `step`, with radius the average of both neighbours.
pub fn resample_adaptive(samples: &[Sample], mode: AdaptiveMode) -> Vec<Sample> {
    if samples.len() < 2 {
        return samples.to_vec();
    }
    let last_index = samples.len() - 1;
    let mut out = vec![samples[0]];
    for (j, next) in samples.iter().enumerate().skip(1) {
        let mut current = out[out.len() - 1];
        let gap = current.distance(next);
        if gap < mode.drop_threshold(&current, next) {
            if j == last_index {
                out.push(*next);
            }
            continue;
        }
        let mut remaining = gap;
        loop {
            let step = mode.step(&current, next).max(MIN_STEP);
            if remaining <= step {
                break;
            }
            let direction = (next.point - current.point) / remaining;
            let inserted = Sample::new(
                current.point + direction * step,
                0.5 * (current.radius + next.radius),
            );
            out.push(inserted);
            current = inserted;
            remaining -= step;
        }
        out.push(*next);
    }
    out
}
