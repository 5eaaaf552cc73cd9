//! Core mesh data types.

use nalgebra::{Point3, Vector3};

/// A vertex in the mesh with optional computed attributes.
///
/// The kernel is unit-agnostic; neuronal morphologies are usually in microns.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    /// 3D position.
    pub position: Point3<f64>,

    /// Unit normal vector, computed from adjacent faces.
    pub normal: Option<Vector3<f64>>,

    /// Texture coordinate, normalized to the unit square when present.
    pub uv: Option<[f64; 2]>,

    /// Application-specific tag (e.g., the part a vertex was generated for).
    pub tag: Option<u32>,
}

impl Vertex {
    /// Create a new vertex with only position set.
    #[inline]
    pub fn new(position: Point3<f64>) -> Self {
        Self {
            position,
            normal: None,
            uv: None,
            tag: None,
        }
    }

    /// Create a vertex from raw coordinates.
    #[inline]
    pub fn from_coords(x: f64, y: f64, z: f64) -> Self {
        Self::new(Point3::new(x, y, z))
    }

    /// Create a vertex with a tag.
    #[inline]
    pub fn tagged(position: Point3<f64>, tag: u32) -> Self {
        Self {
            tag: Some(tag),
            ..Self::new(position)
        }
    }
}

/// A triangle mesh with indexed vertices and faces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// Vertex data.
    pub vertices: Vec<Vertex>,

    /// Triangle faces as indices into the vertex array.
    /// Each face is [v0, v1, v2] with counter-clockwise winding seen from outside.
    pub faces: Vec<[u32; 3]>,
}

impl Mesh {
    /// Create a new empty mesh.
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            faces: Vec::new(),
        }
    }

    /// Create a mesh with pre-allocated capacity.
    pub fn with_capacity(vertex_count: usize, face_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_count),
            faces: Vec::with_capacity(face_count),
        }
    }

    /// Number of vertices in the mesh.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of faces (triangles) in the mesh.
    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Check if mesh is empty (no vertices or faces).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    /// Push a vertex and return its index.
    #[inline]
    pub fn add_vertex(&mut self, position: Point3<f64>) -> u32 {
        let idx = self.vertices.len() as u32;
        self.vertices.push(Vertex::new(position));
        idx
    }

    /// Compute the axis-aligned bounding box.
    /// Returns (min_corner, max_corner) or None if mesh is empty.
    pub fn bounds(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = self.vertices.first()?;
        let mut min = first.position;
        let mut max = first.position;

        for vertex in &self.vertices[1..] {
            let p = &vertex.position;
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
        }

        Some((min, max))
    }

    /// Extent of the bounding box along each axis.
    pub fn extent(&self) -> Vector3<f64> {
        self.bounds()
            .map(|(min, max)| max - min)
            .unwrap_or_else(Vector3::zeros)
    }

    /// Mean of all vertex positions.
    pub fn centroid(&self) -> Option<Point3<f64>> {
        if self.vertices.is_empty() {
            return None;
        }
        let sum = self
            .vertices
            .iter()
            .fold(Vector3::zeros(), |acc, v| acc + v.position.coords);
        Some(Point3::from(sum / self.vertices.len() as f64))
    }

    /// Iterate over triangles, yielding Triangle structs with actual vertex data.
    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        self.faces.iter().map(|&[i0, i1, i2]| Triangle {
            v0: self.vertices[i0 as usize].position,
            v1: self.vertices[i1 as usize].position,
            v2: self.vertices[i2 as usize].position,
        })
    }

    /// Get a specific triangle by face index.
    pub fn triangle(&self, face_idx: usize) -> Option<Triangle> {
        self.faces.get(face_idx).map(|&[i0, i1, i2]| Triangle {
            v0: self.vertices[i0 as usize].position,
            v1: self.vertices[i1 as usize].position,
            v2: self.vertices[i2 as usize].position,
        })
    }

    /// Translate mesh by the given vector.
    pub fn translate(&mut self, offset: Vector3<f64>) {
        for vertex in &mut self.vertices {
            vertex.position += offset;
        }
    }

    /// Scale mesh uniformly around the origin.
    pub fn scale(&mut self, factor: f64) {
        for vertex in &mut self.vertices {
            vertex.position.coords *= factor;
        }
    }

    /// Flip the winding of every face.
    pub fn flip_faces(&mut self) {
        for face in &mut self.faces {
            face.swap(1, 2);
        }
        for vertex in &mut self.vertices {
            if let Some(n) = vertex.normal.as_mut() {
                *n = -*n;
            }
        }
    }

    /// Append another mesh, offsetting its face indices.
    ///
    /// Returns the index of the first appended vertex. No welding happens.
    pub fn append(&mut self, other: &Mesh) -> u32 {
        let offset = self.vertices.len() as u32;
        self.vertices.extend(other.vertices.iter().cloned());
        self.faces.extend(
            other
                .faces
                .iter()
                .map(|f| [f[0] + offset, f[1] + offset, f[2] + offset]),
        );
        offset
    }

    /// Join several meshes into one without welding.
    pub fn join<'a>(meshes: impl IntoIterator<Item = &'a Mesh>) -> Mesh {
        let mut joined = Mesh::new();
        for mesh in meshes {
            joined.append(mesh);
        }
        joined
    }

    /// Set the tag of every vertex.
    pub fn set_tag(&mut self, tag: u32) {
        for vertex in &mut self.vertices {
            vertex.tag = Some(tag);
        }
    }

    /// Compute the signed volume of the mesh.
    ///
    /// Uses the divergence theorem: the sum of signed tetrahedra formed by each
    /// face and the origin. Positive for closed meshes with outward normals,
    /// negative for inside-out meshes, meaningless for open meshes.
    pub fn signed_volume(&self) -> f64 {
        let volume: f64 = self
            .triangles()
            .map(|tri| tri.v0.coords.dot(&tri.v1.coords.cross(&tri.v2.coords)))
            .sum();
        volume / 6.0
    }

    /// Absolute enclosed volume (closed meshes only).
    #[inline]
    pub fn volume(&self) -> f64 {
        self.signed_volume().abs()
    }

    /// Check if the mesh appears to be inside-out (inverted normals).
    #[inline]
    pub fn is_inside_out(&self) -> bool {
        self.signed_volume() < 0.0
    }

    /// Compute the total surface area of the mesh.
    pub fn surface_area(&self) -> f64 {
        self.triangles().map(|tri| tri.area()).sum()
    }

    /// Average edge length over all face edges.
    pub fn mean_edge_length(&self) -> f64 {
        if self.faces.is_empty() {
            return 0.0;
        }
        let total: f64 = self
            .triangles()
            .map(|tri| tri.edge_lengths().iter().sum::<f64>())
            .sum();
        total / (self.faces.len() * 3) as f64
    }
}

/// A triangle with concrete vertex positions.
///
/// Winding is counter-clockwise when viewed from the front.
#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    pub v0: Point3<f64>,
    pub v1: Point3<f64>,
    pub v2: Point3<f64>,
}

impl Triangle {
    /// Create a new triangle from three points.
    #[inline]
    pub fn new(v0: Point3<f64>, v1: Point3<f64>, v2: Point3<f64>) -> Self {
        Self { v0, v1, v2 }
    }

    /// Compute the (unnormalized) face normal via cross product.
    /// Its length is twice the triangle area.
    #[inline]
    pub fn normal_unnormalized(&self) -> Vector3<f64> {
        let e1 = self.v1 - self.v0;
        let e2 = self.v2 - self.v0;
        e1.cross(&e2)
    }

    /// Compute the unit face normal.
    /// Returns None for degenerate triangles (zero area).
    pub fn normal(&self) -> Option<Vector3<f64>> {
        let n = self.normal_unnormalized();
        let len_sq = n.norm_squared();
        if len_sq > f64::EPSILON {
            Some(n / len_sq.sqrt())
        } else {
            None
        }
    }

    /// Compute the area of the triangle.
    #[inline]
    pub fn area(&self) -> f64 {
        self.normal_unnormalized().norm() * 0.5
    }

    /// Compute the centroid.
    #[inline]
    pub fn centroid(&self) -> Point3<f64> {
        Point3::from((self.v0.coords + self.v1.coords + self.v2.coords) / 3.0)
    }

    /// Lengths of the three edges: [len01, len12, len20].
    #[inline]
    pub fn edge_lengths(&self) -> [f64; 3] {
        [
            (self.v1 - self.v0).norm(),
            (self.v2 - self.v1).norm(),
            (self.v0 - self.v2).norm(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_tetrahedron() -> Mesh {
        let mut mesh = Mesh::new();
        mesh.vertices.push(Vertex::from_coords(0.0, 0.0, 0.0));
        mesh.vertices.push(Vertex::from_coords(1.0, 0.0, 0.0));
        mesh.vertices.push(Vertex::from_coords(0.0, 1.0, 0.0));
        mesh.vertices.push(Vertex::from_coords(0.0, 0.0, 1.0));
        mesh.faces.push([0, 2, 1]);
        mesh.faces.push([0, 1, 3]);
        mesh.faces.push([0, 3, 2]);
        mesh.faces.push([1, 2, 3]);
        mesh
    }

    #[test]
    fn test_bounds_and_extent() {
        let mesh = unit_tetrahedron();
        let (min, max) = mesh.bounds().unwrap();
        assert_eq!(min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(max, Point3::new(1.0, 1.0, 1.0));
        assert_relative_eq!(mesh.extent().x, 1.0);
        assert!(Mesh::new().bounds().is_none());
    }

    #[test]
    fn test_signed_volume_and_flip() {
        let mut mesh = unit_tetrahedron();
        assert_relative_eq!(mesh.signed_volume(), 1.0 / 6.0, epsilon = 1e-12);
        mesh.flip_faces();
        assert!(mesh.is_inside_out());
        assert_relative_eq!(mesh.volume(), 1.0 / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_append_offsets_indices() {
        let a = unit_tetrahedron();
        let mut b = unit_tetrahedron();
        b.translate(Vector3::new(5.0, 0.0, 0.0));

        let joined = Mesh::join([&a, &b]);
        assert_eq!(joined.vertex_count(), 8);
        assert_eq!(joined.face_count(), 8);
        assert_eq!(joined.faces[4], [4, 6, 5]);
    }

    #[test]
    fn test_triangle_area() {
        let tri = Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
        );
        assert_relative_eq!(tri.area(), 2.0);
        assert_relative_eq!(tri.normal().unwrap().z, 1.0);
    }
}
