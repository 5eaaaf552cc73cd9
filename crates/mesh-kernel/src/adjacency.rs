//! Edge and vertex adjacency for indexed triangle meshes.

use hashbrown::{HashMap, HashSet};

/// Normalize an undirected edge so the smaller index comes first.
#[inline]
pub fn edge_key(a: u32, b: u32) -> (u32, u32) {
    if a < b { (a, b) } else { (b, a) }
}

/// Edge-to-face and vertex-to-face incidence of a face list.
#[derive(Debug, Clone, Default)]
pub struct MeshAdjacency {
    /// Undirected edge -> faces using it.
    pub edge_to_faces: HashMap<(u32, u32), Vec<u32>>,
    /// Vertex -> faces using it.
    pub vertex_to_faces: HashMap<u32, Vec<u32>>,
}

impl MeshAdjacency {
    /// Build adjacency from face indices.
    pub fn build(faces: &[[u32; 3]]) -> Self {
        let mut edge_to_faces: HashMap<(u32, u32), Vec<u32>> =
            HashMap::with_capacity(faces.len() * 3 / 2);
        let mut vertex_to_faces: HashMap<u32, Vec<u32>> = HashMap::with_capacity(faces.len() / 2);

        for (fi, face) in faces.iter().enumerate() {
            let fi = fi as u32;
            for i in 0..3 {
                let a = face[i];
                let b = face[(i + 1) % 3];
                edge_to_faces.entry(edge_key(a, b)).or_default().push(fi);
                vertex_to_faces.entry(a).or_default().push(fi);
            }
        }

        Self {
            edge_to_faces,
            vertex_to_faces,
        }
    }

    /// Edges used by exactly one face.
    pub fn boundary_edges(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.edge_to_faces
            .iter()
            .filter(|(_, faces)| faces.len() == 1)
            .map(|(&edge, _)| edge)
    }

    /// Edges used by more than two faces.
    pub fn non_manifold_edges(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.edge_to_faces
            .iter()
            .filter(|(_, faces)| faces.len() > 2)
            .map(|(&edge, _)| edge)
    }

    /// Number of boundary edges.
    pub fn boundary_edge_count(&self) -> usize {
        self.boundary_edges().count()
    }

    /// Number of non-manifold edges.
    pub fn non_manifold_edge_count(&self) -> usize {
        self.non_manifold_edges().count()
    }

    /// Number of distinct undirected edges.
    pub fn edge_count(&self) -> usize {
        self.edge_to_faces.len()
    }

    /// True when no edge is shared by more than two faces.
    pub fn is_manifold(&self) -> bool {
        self.non_manifold_edge_count() == 0
    }

    /// True when manifold and without boundary edges.
    pub fn is_watertight(&self) -> bool {
        self.is_manifold() && self.boundary_edge_count() == 0
    }

    /// Vertices lying on at least one boundary edge.
    pub fn boundary_vertices(&self) -> HashSet<u32> {
        self.boundary_edges().flat_map(|(a, b)| [a, b]).collect()
    }

    /// One-ring neighbours of a vertex, in no particular order.
    pub fn vertex_neighbors(&self, faces: &[[u32; 3]], v: u32) -> Vec<u32> {
        let mut neighbors: Vec<u32> = Vec::new();
        if let Some(incident) = self.vertex_to_faces.get(&v) {
            for &fi in incident {
                for &other in &faces[fi as usize] {
                    if other != v && !neighbors.contains(&other) {
                        neighbors.push(other);
                    }
                }
            }
        }
        neighbors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_triangle_is_open() {
        let adj = MeshAdjacency::build(&[[0, 1, 2]]);
        assert_eq!(adj.boundary_edge_count(), 3);
        assert!(adj.is_manifold());
        assert!(!adj.is_watertight());
        assert_eq!(adj.boundary_vertices().len(), 3);
    }

    #[test]
    fn test_tetrahedron_is_watertight() {
        let faces = [[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]];
        let adj = MeshAdjacency::build(&faces);
        assert_eq!(adj.edge_count(), 6);
        assert!(adj.is_watertight());

        let mut ring = adj.vertex_neighbors(&faces, 0);
        ring.sort_unstable();
        assert_eq!(ring, vec![1, 2, 3]);
    }

    #[test]
    fn test_fin_is_non_manifold() {
        let faces = [[0, 1, 2], [1, 0, 3], [0, 1, 4]];
        let adj = MeshAdjacency::build(&faces);
        assert_eq!(adj.non_manifold_edge_count(), 1);
        assert!(!adj.is_manifold());
    }
}
