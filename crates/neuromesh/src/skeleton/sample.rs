use nalgebra::Point3;

/// One point along a section.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub point: Point3<f64>,
    /// Radius at `point`, never negative.
    pub radius: f64,
    /// Position within the owning section.
    pub index: usize,
    /// Index shared across the whole arbor, assigned during preprocessing.
    ///
    /// The first sample of a non-root section reuses its parent's last
    /// index, so an arbor with `n` distinct points uses `0..n`.
    pub arbor_index: Option<usize>,
}

impl Sample {
    pub fn new(point: Point3<f64>, radius: f64) -> Self {
        Self {
            point,
            radius: radius.max(0.0),
            index: 0,
            arbor_index: None,
        }
    }

    /// Shorthand for tests and readers.
    pub fn at(x: f64, y: f64, z: f64, radius: f64) -> Self {
        Self::new(Point3::new(x, y, z), radius)
    }

    pub fn distance(&self, other: &Sample) -> f64 {
        (other.point - self.point).norm()
    }

    /// Sample a fraction `t` of the way to `other`, radius interpolated.
    pub fn lerp(&self, other: &Sample, t: f64) -> Sample {
        Sample::new(
            self.point + (other.point - self.point) * t,
            self.radius + (other.radius - self.radius) * t,
        )
    }
}

/// Total length of a polyline of samples.
pub fn polyline_length(samples: &[Sample]) -> f64 {
    samples.windows(2).map(|w| w[0].distance(&w[1])).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_negative_radius_clamped() {
        assert_eq!(Sample::at(0.0, 0.0, 0.0, -1.0).radius, 0.0);
    }

    #[test]
    fn test_lerp_and_length() {
        let a = Sample::at(0.0, 0.0, 0.0, 1.0);
        let b = Sample::at(4.0, 0.0, 0.0, 0.2);
        let m = a.lerp(&b, 0.5);
        assert_relative_eq!(m.point.x, 2.0);
        assert_relative_eq!(m.radius, 0.6);
        assert_relative_eq!(polyline_length(&[a, m, b]), 4.0);
    }
}
