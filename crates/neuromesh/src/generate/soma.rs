//! Soma surfaces.

use mesh_kernel::Mesh;
use mesh_kernel::primitives::icosphere;
use mesh_volume::{IsoSurfaceBuilder, MetaElement, sphere_field_radius};
use tracing::debug;

use super::meta::half_ray_element;
use crate::context::ReconstructionContext;
use crate::error::{NeuroError, NeuroResult};
use crate::options::{ReconstructionOptions, SomaRepresentation};
use crate::skeleton::Soma;

/// Icosphere subdivision level of spherical somata.
const SPHERE_SUBDIVISIONS: u32 = 3;

/// Grid cells across one soma radius for a standalone meta-ball soma.
const SOMA_VOXELS_PER_RADIUS: f64 = 10.0;

/// Simulated surfaces contribute at most this many vertices to a field.
const MAX_SURFACE_ELEMENTS: usize = 512;

/// Field elements of a soma.
///
/// The centroid element alone reproduces a sphere of the mean radius.
/// Profile points, or the vertices of a simulated surface for soft-body
/// somata, each add an element halfway out that reaches them exactly.
pub fn soma_elements(soma: &Soma, options: &ReconstructionOptions) -> Vec<MetaElement> {
    let iso = options.calibration.iso_level;
    let mut elements = Vec::new();
    if soma.mean_radius > 0.0 {
        elements.push(MetaElement::new(
            soma.centroid,
            sphere_field_radius(soma.mean_radius, iso),
        ));
    }
    let surface_points: Vec<_> = match (&soma.simulated_surface, options.soma) {
        (Some(surface), SomaRepresentation::SoftBody) => {
            let stride = surface.vertices.len().div_ceil(MAX_SURFACE_ELEMENTS).max(1);
            surface.vertices.iter().step_by(stride).map(|v| v.position).collect()
        }
        _ => soma.profile_points.clone(),
    };
    elements.extend(
        surface_points
            .iter()
            .filter_map(|p| half_ray_element(&soma.centroid, p, iso)),
    );
    elements
}

/// Build the soma surface for the selected representation.
///
/// Returns `None` for [`SomaRepresentation::Ignore`] and for somata without
/// a radius. A soft-body soma without a simulated surface is an error.
pub fn build_soma(soma: &Soma, options: &ReconstructionOptions, ctx: &mut ReconstructionContext) -> NeuroResult<Option<Mesh>> {
    let mesh = match options.soma {
        SomaRepresentation::Ignore => return Ok(None),
        SomaRepresentation::SoftBody => match &soma.simulated_surface {
            Some(surface) if !surface.is_empty() => surface.clone(),
            _ => {
                return Err(NeuroError::SomaBuilderNotFound {
                    representation: SomaRepresentation::SoftBody,
                    reason: "the morphology carries no simulated soma surface".into(),
                });
            }
        },
        _ if soma.mean_radius <= 0.0 => {
            ctx.diagnostics.warn("Soma has no radius; no soma surface was built");
            return Ok(None);
        }
        SomaRepresentation::Sphere => icosphere(soma.centroid, soma.mean_radius, SPHERE_SUBDIVISIONS),
        SomaRepresentation::MetaBall => {
            let elements = soma_elements(soma, options);
            IsoSurfaceBuilder::new(&elements)
                .iso_level(options.calibration.iso_level)
                .voxel_size(soma.mean_radius / SOMA_VOXELS_PER_RADIUS)
                .max_voxels(options.max_voxels)
                .build()?
                .mesh
        }
    };
    debug!(
        representation = ?options.soma,
        vertices = mesh.vertex_count(),
        faces = mesh.face_count(),
        "Soma built"
    );
    Ok(Some(mesh))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use mesh_volume::field_value;
    use nalgebra::Point3;

    fn options(soma: SomaRepresentation) -> ReconstructionOptions {
        ReconstructionOptions {
            soma,
            ..Default::default()
        }
    }

    #[test]
    fn test_ignore_builds_nothing() {
        let mut ctx = ReconstructionContext::new(0, None);
        let soma = Soma::new(Point3::origin(), 3.0);
        assert!(build_soma(&soma, &options(SomaRepresentation::Ignore), &mut ctx).unwrap().is_none());
    }

    #[test]
    fn test_sphere_soma() {
        let mut ctx = ReconstructionContext::new(0, None);
        let soma = Soma::new(Point3::new(1.0, 2.0, 3.0), 3.0);
        let mesh = build_soma(&soma, &options(SomaRepresentation::Sphere), &mut ctx)
            .unwrap()
            .unwrap();
        assert!(mesh.validate().is_closed_solid());
        for v in &mesh.vertices {
            assert_relative_eq!((v.position - soma.centroid).norm(), 3.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_meta_ball_soma_is_closed() {
        let mut ctx = ReconstructionContext::new(0, None);
        let soma = Soma::new(Point3::origin(), 2.0);
        let mesh = build_soma(&soma, &options(SomaRepresentation::MetaBall), &mut ctx)
            .unwrap()
            .unwrap();
        let report = mesh.validate();
        assert!(report.is_watertight());
        assert_eq!(report.component_count, 1);
        let (min, max) = mesh.bounds().unwrap();
        assert_relative_eq!(max.x - min.x, 4.0, max_relative = 0.1);
    }

    #[test]
    fn test_profile_elements_reach_points() {
        let profile = vec![Point3::new(4.0, 0.0, 0.0), Point3::new(0.0, 2.0, 0.0)];
        let soma = Soma::from_profile(Point3::origin(), profile.clone());
        let elements = soma_elements(&soma, &options(SomaRepresentation::MetaBall));
        assert_eq!(elements.len(), 3);
        // The far profile point sits on or inside the surface
        assert!(field_value(&elements, &profile[0]) >= 0.54 - 1e-9);
    }

    #[test]
    fn test_soft_body_without_surface_fails() {
        let mut ctx = ReconstructionContext::new(0, None);
        let soma = Soma::new(Point3::origin(), 2.0);
        let err = build_soma(&soma, &options(SomaRepresentation::SoftBody), &mut ctx).unwrap_err();
        assert!(matches!(err, NeuroError::SomaBuilderNotFound { .. }));

        let surface = icosphere(Point3::origin(), 2.0, 2);
        let soma = soma.with_simulated_surface(surface.clone());
        let mesh = build_soma(&soma, &options(SomaRepresentation::SoftBody), &mut ctx)
            .unwrap()
            .unwrap();
        assert_eq!(mesh.face_count(), surface.face_count());
    }

    #[test]
    fn test_zero_radius_soma_warns() {
        let mut ctx = ReconstructionContext::new(0, None);
        let soma = Soma::new(Point3::origin(), 0.0);
        assert!(build_soma(&soma, &options(SomaRepresentation::Sphere), &mut ctx).unwrap().is_none());
        assert_eq!(ctx.diagnostics.warnings.len(), 1);
    }
}
