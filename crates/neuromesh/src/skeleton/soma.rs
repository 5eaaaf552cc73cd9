use mesh_kernel::Mesh;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// How an arbor root relates to the soma.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    /// Root starts at the soma surface.
    Connected,
    /// Root reaches the soma only through another arbor's root; it is
    /// redirected to start from a bridging point.
    Bridged,
    /// Root is too far away and floats free.
    FarFromSoma,
}

/// Cell body.
#[derive(Debug, Clone, Default)]
pub struct Soma {
    pub centroid: Point3<f64>,
    pub smallest_radius: f64,
    pub mean_radius: f64,
    /// Contour or surface points from the reader, if any.
    pub profile_points: Vec<Point3<f64>>,
    /// Surface produced by an external simulation.
    pub simulated_surface: Option<Mesh>,
    /// One entry per arbor, filled by the connectivity classifier.
    pub arbor_connectivity: Vec<Connectivity>,
}

impl Soma {
    /// Spherical soma.
    pub fn new(centroid: Point3<f64>, radius: f64) -> Self {
        Self {
            centroid,
            smallest_radius: radius,
            mean_radius: radius,
            ..Default::default()
        }
    }

    /// Radii estimated from profile points around `centroid`.
    pub fn from_profile(centroid: Point3<f64>, profile_points: Vec<Point3<f64>>) -> Self {
        let distances: Vec<f64> = profile_points.iter().map(|p| (p - centroid).norm()).collect();
        let (smallest_radius, mean_radius) = if distances.is_empty() {
            (0.0, 0.0)
        } else {
            (
                distances.iter().copied().fold(f64::INFINITY, f64::min),
                distances.iter().sum::<f64>() / distances.len() as f64,
            )
        };
        Self {
            centroid,
            smallest_radius,
            mean_radius,
            profile_points,
            ..Default::default()
        }
    }

    /// Attach a simulated surface.
    pub fn with_simulated_surface(mut self, surface: Mesh) -> Self {
        self.simulated_surface = Some(surface);
        self
    }

    pub fn connectivity(&self, arbor: usize) -> Option<Connectivity> {
        self.arbor_connectivity.get(arbor).copied()
    }

    pub fn contains(&self, p: &Point3<f64>) -> bool {
        (p - self.centroid).norm() <= self.smallest_radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_profile() {
        let soma = Soma::from_profile(
            Point3::origin(),
            vec![
                Point3::new(4.0, 0.0, 0.0),
                Point3::new(0.0, 6.0, 0.0),
                Point3::new(0.0, 0.0, -5.0),
            ],
        );
        assert_relative_eq!(soma.smallest_radius, 4.0);
        assert_relative_eq!(soma.mean_radius, 5.0);
        assert!(soma.contains(&Point3::new(3.9, 0.0, 0.0)));
    }

    #[test]
    fn test_empty_profile() {
        let soma = Soma::from_profile(Point3::origin(), Vec::new());
        assert_eq!(soma.mean_radius, 0.0);
    }
}
