//! Meta-ball fields.
//!
//! Each element contributes the Wyvill kernel `(1 - d²/R²)³` inside its
//! field radius `R`. The surface is the set where the summed field equals
//! the iso level; grid values store `iso - F` so the inside is negative,
//! like a signed distance.

use nalgebra::Point3;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::error::{VolumeError, VolumeResult};
use crate::grid::ScalarGrid;

/// Default iso level.
///
/// A chain of elements spaced at half their nominal radius with field
/// radius `1.614 r` has a cross-section of radius `r` at this level.
pub const DEFAULT_ISO_LEVEL: f64 = 0.54;

/// One implicit-surface source.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "pipeline-config",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct MetaElement {
    pub center: Point3<f64>,
    /// Field radius; the kernel is zero beyond it.
    pub radius: f64,
}

impl MetaElement {
    pub fn new(center: Point3<f64>, radius: f64) -> Self {
        Self { center, radius }
    }

    /// Kernel value at `p`.
    #[inline]
    pub fn value_at(&self, p: &Point3<f64>) -> f64 {
        let r2 = self.radius * self.radius;
        let d2 = (p - self.center).norm_squared();
        if d2 >= r2 {
            0.0
        } else {
            let t = 1.0 - d2 / r2;
            t * t * t
        }
    }
}

/// Parameters for meta-ball iso-surfacing.
#[derive(Debug, Clone)]
#[cfg_attr(
    feature = "pipeline-config",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct IsoSurfaceParams {
    /// Field value on the surface. Default: 0.54
    pub iso_level: f64,
    /// Explicit voxel size. When `None`, `resolution_factor` times the
    /// smallest element radius is used.
    pub voxel_size: Option<f64>,
    /// Voxel size relative to the smallest element radius. Default: 0.5
    pub resolution_factor: f64,
    /// Voxel budget. The voxel size grows until the grid fits. Default: 16M
    pub max_voxels: usize,
}

impl Default for IsoSurfaceParams {
    fn default() -> Self {
        Self {
            iso_level: DEFAULT_ISO_LEVEL,
            voxel_size: None,
            resolution_factor: 0.5,
            max_voxels: 16_000_000,
        }
    }
}

impl IsoSurfaceParams {
    /// Params with a fixed voxel size.
    pub fn with_voxel_size(voxel_size: f64) -> Self {
        Self {
            voxel_size: Some(voxel_size),
            ..Self::default()
        }
    }
}

/// Field radius of a lone element whose surface has radius `surface_radius`.
pub fn sphere_field_radius(surface_radius: f64, iso_level: f64) -> f64 {
    surface_radius / (1.0 - iso_level.cbrt()).sqrt()
}

/// Summed field of all elements at `p`, by brute force.
pub fn field_value(elements: &[MetaElement], p: &Point3<f64>) -> f64 {
    elements.iter().map(|e| e.value_at(p)).sum()
}

/// Bounding box of all element spheres.
pub fn elements_bounds(elements: &[MetaElement]) -> Option<(Point3<f64>, Point3<f64>)> {
    let first = elements.first()?;
    let mut min = first.center;
    let mut max = first.center;
    for e in elements {
        for axis in 0..3 {
            min[axis] = min[axis].min(e.center[axis] - e.radius);
            max[axis] = max[axis].max(e.center[axis] + e.radius);
        }
    }
    Some((min, max))
}

/// Voxel size for a set of elements, grown until the grid fits the budget.
pub fn choose_voxel_size(elements: &[MetaElement], params: &IsoSurfaceParams) -> VolumeResult<f64> {
    let (min, max) = elements_bounds(elements).ok_or_else(|| VolumeError::empty("no elements"))?;
    let mut voxel = match params.voxel_size {
        Some(v) => v,
        None => {
            let smallest = elements
                .iter()
                .map(|e| e.radius)
                .fold(f64::INFINITY, f64::min);
            smallest * params.resolution_factor
        }
    };
    if !(voxel.is_finite() && voxel > 0.0) {
        return Err(VolumeError::invalid(
            "voxel_size",
            format!("must be finite and positive, got {voxel}"),
        ));
    }

    // Padding and lattice snapping add up to six voxels per axis
    let extent = max - min;
    let count = |v: f64| {
        (0..3)
            .map(|a| (extent[a] / v).ceil() + 6.0)
            .product::<f64>()
    };
    let budget = params.max_voxels as f64;
    let requested = voxel;
    while count(voxel) > budget {
        voxel *= (count(voxel) / budget).cbrt().max(1.02);
    }
    if voxel > requested {
        debug!(
            requested,
            grown = voxel,
            "Voxel size enlarged to fit the voxel budget"
        );
    }
    Ok(voxel)
}

/// Sample `iso - F` for all elements into a grid sized to them.
///
/// Slices along z are evaluated in parallel; each slice only visits the
/// elements whose sphere crosses it.
pub fn splat_elements(elements: &[MetaElement], params: &IsoSurfaceParams) -> VolumeResult<ScalarGrid> {
    if elements.is_empty() {
        return Err(VolumeError::empty("no meta elements"));
    }
    if let Some(bad) = elements
        .iter()
        .find(|e| !(e.radius.is_finite() && e.radius > 0.0))
    {
        return Err(VolumeError::invalid(
            "radius",
            format!("element at {:?} has radius {}", bad.center, bad.radius),
        ));
    }

    let voxel = choose_voxel_size(elements, params)?;
    let (min, max) = elements_bounds(elements).ok_or_else(|| VolumeError::empty("no elements"))?;
    let mut grid = ScalarGrid::from_bounds(min, max, voxel, 2.0 * voxel, params.max_voxels)?;

    info!(
        elements = elements.len(),
        dims = ?grid.dims,
        voxel_size = voxel,
        "Splatting meta elements"
    );

    // Element buckets per z slice
    let [nx, ny, nz] = grid.dims;
    let mut buckets: Vec<Vec<u32>> = vec![Vec::new(); nz];
    let index_range = |lo: f64, hi: f64, origin: f64, n: usize| {
        let a = ((lo - origin) / voxel - 0.5).floor().max(0.0) as usize;
        let b = (((hi - origin) / voxel - 0.5).ceil().max(0.0) as usize).min(n.saturating_sub(1));
        (a, b)
    };
    for (i, e) in elements.iter().enumerate() {
        let (z0, z1) = index_range(e.center.z - e.radius, e.center.z + e.radius, grid.origin.z, nz);
        for bucket in &mut buckets[z0..=z1] {
            bucket.push(i as u32);
        }
    }

    let iso = params.iso_level as f32;
    let origin = grid.origin;
    grid.values
        .par_chunks_mut(nx * ny)
        .enumerate()
        .for_each(|(z, slice)| {
            let mut field = vec![0.0f64; nx * ny];
            let pz = origin.z + (z as f64 + 0.5) * voxel;
            for &ei in &buckets[z] {
                let e = &elements[ei as usize];
                let dz = pz - e.center.z;
                let r2 = e.radius * e.radius;
                let rem = r2 - dz * dz;
                if rem <= 0.0 {
                    continue;
                }
                let disc = rem.sqrt();
                let (x0, x1) = index_range(e.center.x - disc, e.center.x + disc, origin.x, nx);
                let (y0, y1) = index_range(e.center.y - disc, e.center.y + disc, origin.y, ny);
                for y in y0..=y1 {
                    let dy = origin.y + (y as f64 + 0.5) * voxel - e.center.y;
                    for x in x0..=x1 {
                        let dx = origin.x + (x as f64 + 0.5) * voxel - e.center.x;
                        let d2 = dx * dx + dy * dy + dz * dz;
                        if d2 < r2 {
                            let t = 1.0 - d2 / r2;
                            field[x + y * nx] += t * t * t;
                        }
                    }
                }
            }
            for (value, f) in slice.iter_mut().zip(&field) {
                *value = iso - *f as f32;
            }
        });

    debug!(inside = grid.inside_count(), "Field evaluated");
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_kernel_profile() {
        let e = MetaElement::new(Point3::origin(), 2.0);
        assert_relative_eq!(e.value_at(&Point3::origin()), 1.0);
        assert_relative_eq!(e.value_at(&Point3::new(2.0, 0.0, 0.0)), 0.0);
        assert_relative_eq!(e.value_at(&Point3::new(1.0, 0.0, 0.0)), 0.421875);
    }

    #[test]
    fn test_sphere_field_radius_inverts_kernel() {
        let big = sphere_field_radius(2.0, DEFAULT_ISO_LEVEL);
        let e = MetaElement::new(Point3::origin(), big);
        assert_relative_eq!(
            e.value_at(&Point3::new(2.0, 0.0, 0.0)),
            DEFAULT_ISO_LEVEL,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_splat_matches_brute_force() {
        let elements = vec![
            MetaElement::new(Point3::origin(), 1.5),
            MetaElement::new(Point3::new(1.0, 0.5, 0.0), 1.0),
        ];
        let params = IsoSurfaceParams::with_voxel_size(0.25);
        let grid = splat_elements(&elements, &params).unwrap();
        for idx in (0..grid.total_voxels()).step_by(37) {
            let [x, y, z] = grid.delinearize(idx);
            let p = grid.voxel_center(x, y, z);
            let expected = params.iso_level - field_value(&elements, &p);
            assert_relative_eq!(grid.values[idx] as f64, expected, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_voxel_size_follows_smallest_radius() {
        let elements = vec![
            MetaElement::new(Point3::origin(), 4.0),
            MetaElement::new(Point3::new(3.0, 0.0, 0.0), 1.0),
        ];
        let v = choose_voxel_size(&elements, &IsoSurfaceParams::default()).unwrap();
        assert_relative_eq!(v, 0.5);
    }

    #[test]
    fn test_voxel_budget_grows_voxels() {
        let elements = vec![
            MetaElement::new(Point3::origin(), 1.0),
            MetaElement::new(Point3::new(100.0, 0.0, 0.0), 1.0),
        ];
        let params = IsoSurfaceParams {
            max_voxels: 20_000,
            ..Default::default()
        };
        let v = choose_voxel_size(&elements, &params).unwrap();
        assert!(v > 0.5);
        let grid = splat_elements(&elements, &params).unwrap();
        assert!(grid.total_voxels() <= 20_000);
    }

    #[test]
    fn test_empty_and_invalid_elements() {
        assert!(splat_elements(&[], &IsoSurfaceParams::default()).is_err());
        let bad = [MetaElement::new(Point3::origin(), 0.0)];
        let err = splat_elements(&bad, &IsoSurfaceParams::default()).unwrap_err();
        assert_eq!(err.code().as_str(), "VOLUME-1002");
    }
}
