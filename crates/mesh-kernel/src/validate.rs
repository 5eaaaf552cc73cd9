//! Mesh validation and reporting.

use nalgebra::Point3;
use tracing::{info, warn};

use crate::Mesh;
use crate::adjacency::MeshAdjacency;
use crate::components::find_connected_components;
use crate::error::{KernelError, KernelResult};

/// Topology and geometry summary of a mesh.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "pipeline-config",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct MeshReport {
    pub vertex_count: usize,
    pub face_count: usize,
    pub edge_count: usize,
    /// Edges with one adjacent face.
    pub boundary_edge_count: usize,
    /// Edges with more than two adjacent faces.
    pub non_manifold_edge_count: usize,
    pub component_count: usize,
    /// `V - E + F`, counting only referenced vertices. 2 per closed genus-0 component.
    pub euler_characteristic: i64,
    pub bounds: Option<(Point3<f64>, Point3<f64>)>,
    pub signed_volume: f64,
    pub surface_area: f64,
}

impl MeshReport {
    /// No boundary edges.
    pub fn is_watertight(&self) -> bool {
        self.boundary_edge_count == 0 && self.face_count > 0
    }

    /// No edge shared by more than two faces.
    pub fn is_manifold(&self) -> bool {
        self.non_manifold_edge_count == 0
    }

    /// Negative signed volume.
    pub fn is_inside_out(&self) -> bool {
        self.signed_volume < 0.0
    }

    /// Watertight, manifold and outward-facing.
    pub fn is_closed_solid(&self) -> bool {
        self.is_watertight() && self.is_manifold() && !self.is_inside_out()
    }

    /// Genus of a single closed component, if that is what the mesh is.
    pub fn genus(&self) -> Option<i64> {
        (self.component_count == 1 && self.is_watertight())
            .then(|| (2 - self.euler_characteristic) / 2)
    }
}

impl std::fmt::Display for MeshReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Mesh Report:")?;
        writeln!(f, "  Vertices: {}", self.vertex_count)?;
        writeln!(f, "  Faces: {}", self.face_count)?;
        writeln!(f, "  Components: {}", self.component_count)?;
        if let Some((min, max)) = &self.bounds {
            let d = max - min;
            writeln!(f, "  Dimensions: {:.2} x {:.2} x {:.2}", d.x, d.y, d.z)?;
        }
        writeln!(f, "  Surface Area: {:.3}", self.surface_area)?;
        writeln!(f, "  Signed Volume: {:.3}", self.signed_volume)?;
        writeln!(
            f,
            "  Watertight: {} (boundary edges: {})",
            if self.is_watertight() { "yes" } else { "NO" },
            self.boundary_edge_count
        )?;
        writeln!(
            f,
            "  Manifold: {} (non-manifold edges: {})",
            if self.is_manifold() { "yes" } else { "NO" },
            self.non_manifold_edge_count
        )?;
        write!(f, "  Euler characteristic: {}", self.euler_characteristic)
    }
}

/// Build a report for a mesh.
pub fn validate_mesh(mesh: &Mesh) -> MeshReport {
    let adjacency = MeshAdjacency::build(&mesh.faces);
    let referenced = adjacency.vertex_to_faces.len() as i64;
    let edges = adjacency.edge_count();

    MeshReport {
        vertex_count: mesh.vertex_count(),
        face_count: mesh.face_count(),
        edge_count: edges,
        boundary_edge_count: adjacency.boundary_edge_count(),
        non_manifold_edge_count: adjacency.non_manifold_edge_count(),
        component_count: find_connected_components(mesh).component_count(),
        euler_characteristic: referenced - edges as i64 + mesh.face_count() as i64,
        bounds: mesh.bounds(),
        signed_volume: mesh.signed_volume(),
        surface_area: mesh.surface_area(),
    }
}

/// Log a report at info level, with warnings for topology defects.
pub fn log_validation(report: &MeshReport) {
    info!(
        vertices = report.vertex_count,
        faces = report.face_count,
        components = report.component_count,
        euler = report.euler_characteristic,
        "Mesh validation"
    );
    if !report.is_watertight() {
        warn!(boundary_edges = report.boundary_edge_count, "Mesh is not watertight");
    }
    if !report.is_manifold() {
        warn!(
            non_manifold_edges = report.non_manifold_edge_count,
            "Mesh has non-manifold edges"
        );
    }
    if report.is_inside_out() {
        warn!(signed_volume = report.signed_volume, "Mesh is inside-out");
    }
}

/// Check that every face index is in range and no face repeats a vertex.
pub fn validate_indices(mesh: &Mesh) -> KernelResult<()> {
    let n = mesh.vertices.len();
    for (fi, face) in mesh.faces.iter().enumerate() {
        if let Some(&bad) = face.iter().find(|&&v| v as usize >= n) {
            return Err(KernelError::InvalidVertexIndex {
                face_index: fi,
                vertex_index: bad,
                vertex_count: n,
            });
        }
        if face[0] == face[1] || face[1] == face[2] || face[0] == face[2] {
            return Err(KernelError::InvalidTopology {
                details: format!("face {fi} repeats a vertex: {face:?}"),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Vertex;
    use crate::primitives::{axis_box, icosphere};

    #[test]
    fn test_sphere_report() {
        let report = validate_mesh(&icosphere(Point3::origin(), 1.0, 2));
        assert!(report.is_closed_solid());
        assert_eq!(report.component_count, 1);
        assert_eq!(report.euler_characteristic, 2);
        assert_eq!(report.genus(), Some(0));
        assert!(report.to_string().contains("Watertight: yes"));
    }

    #[test]
    fn test_two_boxes_have_euler_four() {
        let mut mesh = axis_box(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
        mesh.append(&axis_box(Point3::new(3.0, 0.0, 0.0), Point3::new(4.0, 1.0, 1.0)));
        let report = validate_mesh(&mesh);
        assert_eq!(report.component_count, 2);
        assert_eq!(report.euler_characteristic, 4);
        assert_eq!(report.genus(), None);
    }

    #[test]
    fn test_open_mesh_not_watertight() {
        let mut mesh = icosphere(Point3::origin(), 1.0, 1);
        mesh.faces.pop();
        let report = validate_mesh(&mesh);
        assert!(!report.is_watertight());
        assert_eq!(report.boundary_edge_count, 3);
    }

    #[test]
    fn test_validate_indices() {
        let mut mesh = Mesh::new();
        mesh.vertices.push(Vertex::from_coords(0.0, 0.0, 0.0));
        mesh.faces.push([0, 0, 1]);
        let err = validate_indices(&mesh).unwrap_err();
        assert_eq!(err.code().as_str(), "KERNEL-1002");
    }
}
