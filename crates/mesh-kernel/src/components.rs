//! Connected component analysis.
//!
//! Two faces belong to the same component when they share an edge. Generated
//! neuron meshes are expected to be a single component once stitched, so the
//! analysis doubles as a cheap connectivity check.

use std::cmp::Reverse;

use tracing::{debug, info};

use crate::adjacency::MeshAdjacency;
use crate::types::Mesh;

/// Face partition of a mesh into edge-connected components.
#[derive(Debug, Clone, Default)]
pub struct ComponentAnalysis {
    /// Face indices per component, largest first.
    pub components: Vec<Vec<u32>>,
}

impl ComponentAnalysis {
    /// Number of components.
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// True for exactly one component.
    pub fn is_connected(&self) -> bool {
        self.components.len() == 1
    }

    /// Face indices of the largest component.
    pub fn largest_component(&self) -> &[u32] {
        self.components.first().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Face counts per component, largest first.
    pub fn sizes(&self) -> Vec<usize> {
        self.components.iter().map(Vec::len).collect()
    }
}

impl std::fmt::Display for ComponentAnalysis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} component(s)", self.component_count())?;
        if self.component_count() > 1 {
            write!(f, " with face counts {:?}", self.sizes())?;
        }
        Ok(())
    }
}

/// Partition faces into edge-connected components.
///
/// Faces on a non-manifold edge are all considered connected.
///
/// # Example
/// ```
/// use mesh_kernel::{Mesh, Vertex};
/// use mesh_kernel::components::find_connected_components;
///
/// let mut mesh = Mesh::new();
/// mesh.vertices.push(Vertex::from_coords(0.0, 0.0, 0.0));
/// mesh.vertices.push(Vertex::from_coords(1.0, 0.0, 0.0));
/// mesh.vertices.push(Vertex::from_coords(0.0, 1.0, 0.0));
/// mesh.vertices.push(Vertex::from_coords(10.0, 0.0, 0.0));
/// mesh.vertices.push(Vertex::from_coords(11.0, 0.0, 0.0));
/// mesh.vertices.push(Vertex::from_coords(10.0, 1.0, 0.0));
/// mesh.faces.push([0, 1, 2]);
/// mesh.faces.push([3, 4, 5]);
///
/// assert_eq!(find_connected_components(&mesh).component_count(), 2);
/// ```
pub fn find_connected_components(mesh: &Mesh) -> ComponentAnalysis {
    let face_count = mesh.faces.len();
    if face_count == 0 {
        return ComponentAnalysis::default();
    }

    let adjacency = MeshAdjacency::build(&mesh.faces);
    let mut face_neighbors: Vec<Vec<u32>> = vec![Vec::new(); face_count];
    for faces in adjacency.edge_to_faces.values() {
        for (i, &a) in faces.iter().enumerate() {
            for &b in &faces[i + 1..] {
                face_neighbors[a as usize].push(b);
                face_neighbors[b as usize].push(a);
            }
        }
    }

    let mut visited = vec![false; face_count];
    let mut components: Vec<Vec<u32>> = Vec::new();

    for start in 0..face_count {
        if visited[start] {
            continue;
        }
        visited[start] = true;
        let mut component = Vec::new();
        let mut stack = vec![start as u32];

        while let Some(fi) = stack.pop() {
            component.push(fi);
            for &n in &face_neighbors[fi as usize] {
                if !visited[n as usize] {
                    visited[n as usize] = true;
                    stack.push(n);
                }
            }
        }
        component.sort_unstable();
        components.push(component);
    }

    // Stable on ties so that output order follows face order
    components.sort_by_key(|c| Reverse(c.len()));

    debug!(components = components.len(), faces = face_count, "Component analysis");
    ComponentAnalysis { components }
}

/// Build a standalone mesh from a subset of faces.
///
/// Vertices keep their relative order and all attributes.
pub fn extract_faces(mesh: &Mesh, faces: &[u32]) -> Mesh {
    let mut remap = vec![u32::MAX; mesh.vertices.len()];
    for &fi in faces {
        for &v in &mesh.faces[fi as usize] {
            remap[v as usize] = 0;
        }
    }

    let mut out = Mesh::with_capacity(faces.len(), faces.len());
    for (old, slot) in remap.iter_mut().enumerate() {
        if *slot == 0 {
            *slot = out.vertices.len() as u32;
            out.vertices.push(mesh.vertices[old].clone());
        }
    }

    let mut sorted: Vec<u32> = faces.to_vec();
    sorted.sort_unstable();
    out.faces = sorted
        .iter()
        .map(|&fi| {
            let [a, b, c] = mesh.faces[fi as usize];
            [remap[a as usize], remap[b as usize], remap[c as usize]]
        })
        .collect();
    out
}

/// Split a mesh into one mesh per component, largest first.
pub fn split_into_components(mesh: &Mesh) -> Vec<Mesh> {
    let analysis = find_connected_components(mesh);
    if analysis.component_count() <= 1 {
        return vec![mesh.clone()];
    }
    analysis
        .components
        .iter()
        .map(|faces| extract_faces(mesh, faces))
        .collect()
}

/// Keep only the largest component. Returns how many were dropped.
pub fn keep_largest_component(mesh: &mut Mesh) -> usize {
    let analysis = find_connected_components(mesh);
    if analysis.component_count() <= 1 {
        return 0;
    }

    let dropped = analysis.component_count() - 1;
    info!(
        kept_faces = analysis.largest_component().len(),
        dropped, "Removing islands"
    );
    *mesh = extract_faces(mesh, analysis.largest_component());
    dropped
}

/// Drop components with fewer than `min_faces` faces.
///
/// Returns how many components were removed. The mesh may end up empty.
pub fn remove_small_components(mesh: &mut Mesh, min_faces: usize) -> usize {
    let analysis = find_connected_components(mesh);
    let kept: Vec<u32> = analysis
        .components
        .iter()
        .filter(|c| c.len() >= min_faces)
        .flatten()
        .copied()
        .collect();
    let removed = analysis
        .components
        .iter()
        .filter(|c| c.len() < min_faces)
        .count();

    if removed > 0 {
        info!(removed, min_faces, "Removing small components");
        *mesh = extract_faces(mesh, &kept);
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Vertex;

    fn triangle_at(mesh: &mut Mesh, x: f64) {
        let base = mesh.vertices.len() as u32;
        mesh.vertices.push(Vertex::from_coords(x, 0.0, 0.0));
        mesh.vertices.push(Vertex::from_coords(x + 1.0, 0.0, 0.0));
        mesh.vertices.push(Vertex::from_coords(x, 1.0, 0.0));
        mesh.faces.push([base, base + 1, base + 2]);
    }

    fn three_components() -> Mesh {
        let mut mesh = Mesh::new();
        // A quad made of two triangles sharing an edge
        mesh.vertices.push(Vertex::from_coords(0.0, 0.0, 0.0));
        mesh.vertices.push(Vertex::from_coords(1.0, 0.0, 0.0));
        mesh.vertices.push(Vertex::from_coords(0.5, 1.0, 0.0));
        mesh.vertices.push(Vertex::from_coords(1.5, 1.0, 0.0));
        mesh.faces.push([0, 1, 2]);
        mesh.faces.push([1, 3, 2]);
        triangle_at(&mut mesh, 10.0);
        triangle_at(&mut mesh, 20.0);
        mesh
    }

    #[test]
    fn test_empty_mesh_has_no_components() {
        let analysis = find_connected_components(&Mesh::new());
        assert_eq!(analysis.component_count(), 0);
        assert!(!analysis.is_connected());
    }

    #[test]
    fn test_components_sorted_largest_first() {
        let analysis = find_connected_components(&three_components());
        assert_eq!(analysis.sizes(), vec![2, 1, 1]);
        assert_eq!(analysis.largest_component(), &[0, 1]);
        assert!(analysis.to_string().contains("3 component(s)"));
    }

    #[test]
    fn test_split_produces_valid_meshes() {
        let parts = split_into_components(&three_components());
        assert_eq!(parts.len(), 3);
        for part in &parts {
            let n = part.vertex_count() as u32;
            assert!(part.faces.iter().flatten().all(|&v| v < n));
        }
        assert_eq!(parts[0].vertex_count(), 4);
        assert_eq!(parts[2].vertices[0].position.x, 20.0);
    }

    #[test]
    fn test_keep_largest() {
        let mut mesh = three_components();
        assert_eq!(keep_largest_component(&mut mesh), 2);
        assert_eq!(mesh.face_count(), 2);
        assert_eq!(mesh.vertex_count(), 4);
    }

    #[test]
    fn test_remove_small_components() {
        let mut mesh = three_components();
        assert_eq!(remove_small_components(&mut mesh, 1), 0);
        assert_eq!(remove_small_components(&mut mesh, 2), 2);
        assert_eq!(mesh.face_count(), 2);
        assert_eq!(remove_small_components(&mut mesh, 10), 1);
        assert!(mesh.is_empty());
    }
}
