//! Mesh repair operations: degenerate removal, welding, manifold cleanup, compaction.

use hashbrown::{HashMap, HashSet};
use nalgebra::{Point3, Vector3};
use tracing::{debug, info, warn};

use crate::adjacency::{MeshAdjacency, edge_key};
use crate::components::find_connected_components;
use crate::{Mesh, Triangle};

/// Configuration parameters for mesh repair operations.
///
/// All thresholds are in the same units as the mesh coordinates.
#[derive(Debug, Clone)]
#[cfg_attr(
    feature = "pipeline-config",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct RepairParams {
    /// Distance threshold for vertex welding.
    ///
    /// Default: `1e-6`
    pub weld_epsilon: f64,

    /// Triangles with area below this are removed.
    ///
    /// Default: `1e-12`
    pub degenerate_area_threshold: f64,

    /// Remove faces so that no edge is shared by more than two faces.
    ///
    /// Default: `true`
    pub fix_non_manifold_edges: bool,

    /// Split vertices whose incident faces form more than one fan.
    ///
    /// Default: `true`
    pub fix_non_manifold_vertices: bool,

    /// Flip closed components whose signed volume is negative.
    ///
    /// Default: `true`
    pub orient_outward: bool,

    /// Remove vertices that no face references.
    ///
    /// Default: `true`
    pub remove_unreferenced: bool,

    /// Recompute area-weighted vertex normals at the end.
    ///
    /// Default: `true`
    pub compute_normals: bool,
}

impl Default for RepairParams {
    fn default() -> Self {
        Self {
            weld_epsilon: 1e-6,
            degenerate_area_threshold: 1e-12,
            fix_non_manifold_edges: true,
            fix_non_manifold_vertices: true,
            orient_outward: true,
            remove_unreferenced: true,
            compute_normals: true,
        }
    }
}

impl RepairParams {
    /// Params for meshes extracted from implicit fields.
    ///
    /// Iso-surfaces never share coincident vertices, so welding is skipped.
    pub fn for_iso_surfaces() -> Self {
        Self {
            weld_epsilon: 0.0,
            ..Default::default()
        }
    }

    /// Params for meshes joined from independently generated pieces.
    pub fn for_joined_pieces(weld_epsilon: f64) -> Self {
        Self {
            weld_epsilon,
            orient_outward: false,
            ..Default::default()
        }
    }
}

/// Counts of what a repair pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairReport {
    pub degenerates_removed: usize,
    pub vertices_welded: usize,
    pub duplicate_faces_removed: usize,
    pub non_manifold_faces_removed: usize,
    pub non_manifold_vertices_split: usize,
    pub components_flipped: usize,
    pub unreferenced_removed: usize,
}

impl RepairReport {
    /// True when the pass changed nothing.
    pub fn is_clean(&self) -> bool {
        *self == RepairReport::default()
    }
}

/// Remove triangles with area below threshold or with repeated indices.
///
/// Returns the number of triangles removed.
pub fn remove_degenerate_triangles(mesh: &mut Mesh, area_threshold: f64) -> usize {
    let original_count = mesh.faces.len();

    mesh.faces.retain(|&[i0, i1, i2]| {
        if i0 == i1 || i1 == i2 || i0 == i2 {
            return false;
        }
        let tri = Triangle::new(
            mesh.vertices[i0 as usize].position,
            mesh.vertices[i1 as usize].position,
            mesh.vertices[i2 as usize].position,
        );
        tri.area() >= area_threshold
    });

    let removed = original_count - mesh.faces.len();
    if removed > 0 {
        debug!(removed, area_threshold, "Removed degenerate triangles");
    }
    removed
}

/// Weld vertices that are within epsilon distance of each other.
///
/// Uses spatial hashing. Returns the number of vertices merged.
pub fn weld_vertices(mesh: &mut Mesh, epsilon: f64) -> usize {
    let original_count = mesh.vertices.len();
    if original_count == 0 || epsilon <= 0.0 {
        return 0;
    }

    let cell_size = epsilon * 2.0;

    let mut spatial_hash: HashMap<(i64, i64, i64), Vec<u32>> = HashMap::new();
    for (idx, vertex) in mesh.vertices.iter().enumerate() {
        let cell = pos_to_cell(&vertex.position, cell_size);
        spatial_hash.entry(cell).or_default().push(idx as u32);
    }

    // Each vertex maps to the smallest index in its cluster
    let mut vertex_remap: Vec<u32> = (0..mesh.vertices.len() as u32).collect();
    let mut merged_count = 0;

    for (idx, vertex) in mesh.vertices.iter().enumerate() {
        let idx = idx as u32;
        if vertex_remap[idx as usize] != idx {
            continue;
        }

        let cell = pos_to_cell(&vertex.position, cell_size);
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(candidates) = spatial_hash.get(&(cell.0 + dx, cell.1 + dy, cell.2 + dz))
                    else {
                        continue;
                    };
                    for &other_idx in candidates {
                        if other_idx <= idx || vertex_remap[other_idx as usize] != other_idx {
                            continue;
                        }
                        let other_pos = &mesh.vertices[other_idx as usize].position;
                        if (vertex.position - other_pos).norm() < epsilon {
                            vertex_remap[other_idx as usize] = idx;
                            merged_count += 1;
                        }
                    }
                }
            }
        }
    }

    if merged_count == 0 {
        return 0;
    }

    for face in &mut mesh.faces {
        for idx in face.iter_mut() {
            *idx = vertex_remap[*idx as usize];
        }
    }
    mesh.faces
        .retain(|&[i0, i1, i2]| i0 != i1 && i1 != i2 && i0 != i2);

    debug!(
        merged = merged_count,
        epsilon,
        before = original_count,
        "Welded vertices"
    );

    merged_count
}

/// Remove unreferenced vertices and compact the vertex array.
///
/// Returns the number of vertices removed.
pub fn remove_unreferenced_vertices(mesh: &mut Mesh) -> usize {
    let original_count = mesh.vertices.len();

    let mut referenced = vec![false; original_count];
    for face in &mesh.faces {
        for &vi in face {
            referenced[vi as usize] = true;
        }
    }

    if referenced.iter().all(|&r| r) {
        return 0;
    }

    let mut remap = vec![u32::MAX; original_count];
    let mut new_vertices = Vec::with_capacity(original_count);
    for (old_idx, vertex) in mesh.vertices.iter().enumerate() {
        if referenced[old_idx] {
            remap[old_idx] = new_vertices.len() as u32;
            new_vertices.push(vertex.clone());
        }
    }

    for face in &mut mesh.faces {
        for idx in face.iter_mut() {
            *idx = remap[*idx as usize];
        }
    }

    let removed = original_count - new_vertices.len();
    mesh.vertices = new_vertices;
    if removed > 0 {
        debug!(removed, "Removed unreferenced vertices");
    }
    removed
}

/// Compute vertex normals as area-weighted average of adjacent face normals.
pub fn compute_vertex_normals(mesh: &mut Mesh) {
    let mut normal_accum: Vec<Vector3<f64>> = vec![Vector3::zeros(); mesh.vertices.len()];

    for face in &mesh.faces {
        let tri = Triangle::new(
            mesh.vertices[face[0] as usize].position,
            mesh.vertices[face[1] as usize].position,
            mesh.vertices[face[2] as usize].position,
        );
        // Unnormalized normal has length 2*area, which gives the area weighting
        let weighted_normal = tri.normal_unnormalized();
        for &vi in face {
            normal_accum[vi as usize] += weighted_normal;
        }
    }

    for (vertex, accum) in mesh.vertices.iter_mut().zip(normal_accum) {
        let len_sq = accum.norm_squared();
        vertex.normal = (len_sq > f64::EPSILON).then(|| accum / len_sq.sqrt());
    }
}

fn pos_to_cell(pos: &Point3<f64>, cell_size: f64) -> (i64, i64, i64) {
    (
        (pos.x / cell_size).floor() as i64,
        (pos.y / cell_size).floor() as i64,
        (pos.z / cell_size).floor() as i64,
    )
}

/// Remove faces that use the same three vertices as an earlier face,
/// regardless of winding.
///
/// Returns the number of duplicate faces removed.
pub fn remove_duplicate_faces(mesh: &mut Mesh) -> usize {
    let original_count = mesh.faces.len();
    let mut seen: HashSet<[u32; 3]> = HashSet::with_capacity(original_count);

    mesh.faces.retain(|face| {
        let mut key = *face;
        key.sort_unstable();
        seen.insert(key)
    });

    let removed = original_count - mesh.faces.len();
    if removed > 0 {
        debug!(removed, "Removed duplicate faces");
    }
    removed
}

/// Fix non-manifold edges by removing excess faces.
///
/// For each edge shared by more than two faces, the two largest faces are
/// kept and the rest are removed. Returns the number of faces removed.
pub fn fix_non_manifold_edges(mesh: &mut Mesh) -> usize {
    let adjacency = MeshAdjacency::build(&mesh.faces);
    let mut faces_to_remove: HashSet<u32> = HashSet::new();
    let mut nm_edges = 0;

    for faces_with_edge in adjacency.edge_to_faces.values() {
        if faces_with_edge.len() <= 2 {
            continue;
        }
        nm_edges += 1;

        let mut by_area: Vec<(u32, f64)> = faces_with_edge
            .iter()
            .filter(|fi| !faces_to_remove.contains(*fi))
            .map(|&fi| {
                let area = mesh.triangle(fi as usize).map(|t| t.area()).unwrap_or(0.0);
                (fi, area)
            })
            .collect();
        if by_area.len() <= 2 {
            continue;
        }
        by_area.sort_by(|a, b| b.1.total_cmp(&a.1));
        faces_to_remove.extend(by_area.iter().skip(2).map(|(fi, _)| *fi));
    }

    if faces_to_remove.is_empty() {
        return 0;
    }

    let removed_count = faces_to_remove.len();
    let mut idx = 0u32;
    mesh.faces.retain(|_| {
        let keep = !faces_to_remove.contains(&idx);
        idx += 1;
        keep
    });

    info!(
        edges = nm_edges,
        faces_removed = removed_count,
        "Fixed non-manifold edges"
    );
    removed_count
}

/// Split non-manifold ("bowtie") vertices.
///
/// A vertex whose incident faces form several edge-connected fans is
/// duplicated once per extra fan. Returns the number of vertices added.
pub fn fix_non_manifold_vertices(mesh: &mut Mesh) -> usize {
    let adjacency = MeshAdjacency::build(&mesh.faces);
    let mut added = 0;

    let mut vertices: Vec<u32> = adjacency.vertex_to_faces.keys().copied().collect();
    vertices.sort_unstable();

    for v in vertices {
        let incident = &adjacency.vertex_to_faces[&v];
        if incident.len() < 2 {
            continue;
        }

        // Group incident faces into fans connected through edges at v
        let mut fan_of: HashMap<u32, usize> = HashMap::new();
        let mut fan_count = 0;
        for &start in incident {
            if fan_of.contains_key(&start) {
                continue;
            }
            let mut stack = vec![start];
            fan_of.insert(start, fan_count);
            while let Some(fi) = stack.pop() {
                for &other in &mesh.faces[fi as usize] {
                    if other == v {
                        continue;
                    }
                    let Some(sharing) = adjacency.edge_to_faces.get(&edge_key(v, other)) else {
                        continue;
                    };
                    for &nf in sharing {
                        if !fan_of.contains_key(&nf) {
                            fan_of.insert(nf, fan_count);
                            stack.push(nf);
                        }
                    }
                }
            }
            fan_count += 1;
        }

        if fan_count < 2 {
            continue;
        }

        let mut copies: Vec<u32> = vec![v];
        for _ in 1..fan_count {
            let copy = mesh.vertices[v as usize].clone();
            copies.push(mesh.vertices.len() as u32);
            mesh.vertices.push(copy);
            added += 1;
        }
        for &fi in incident {
            let fan = fan_of[&fi];
            if fan == 0 {
                continue;
            }
            for idx in mesh.faces[fi as usize].iter_mut() {
                if *idx == v {
                    *idx = copies[fan];
                }
            }
        }
    }

    if added > 0 {
        info!(added, "Split non-manifold vertices");
    }
    added
}

/// Flip every closed component whose signed volume is negative.
///
/// Returns the number of components flipped.
pub fn orient_outward(mesh: &mut Mesh) -> usize {
    let analysis = find_connected_components(mesh);
    let mut flipped = 0;

    for component in &analysis.components {
        let volume: f64 = component
            .iter()
            .filter_map(|&fi| mesh.triangle(fi as usize))
            .map(|t| t.v0.coords.dot(&t.v1.coords.cross(&t.v2.coords)))
            .sum();
        if volume < 0.0 {
            for &fi in component {
                mesh.faces[fi as usize].swap(1, 2);
            }
            flipped += 1;
        }
    }

    if flipped > 0 {
        debug!(flipped, "Flipped inside-out components");
    }
    flipped
}

/// Run the repair pipeline with configurable parameters.
///
/// Steps:
/// 1. Remove degenerate triangles
/// 2. Weld nearby vertices
/// 3. Remove duplicate faces
/// 4. Fix non-manifold edges (optional)
/// 5. Split non-manifold vertices (optional)
/// 6. Orient closed components outward (optional)
/// 7. Remove unreferenced vertices (optional)
/// 8. Compute vertex normals (optional)
pub fn repair_mesh_with_config(mesh: &mut Mesh, params: &RepairParams) -> RepairReport {
    let mut report = RepairReport::default();

    if mesh.faces.is_empty() {
        warn!("Mesh has no faces, skipping repair");
        return report;
    }

    let initial_verts = mesh.vertex_count();
    let initial_faces = mesh.face_count();

    report.degenerates_removed =
        remove_degenerate_triangles(mesh, params.degenerate_area_threshold);
    report.vertices_welded = weld_vertices(mesh, params.weld_epsilon);
    report.duplicate_faces_removed = remove_duplicate_faces(mesh);

    if params.fix_non_manifold_edges {
        report.non_manifold_faces_removed = fix_non_manifold_edges(mesh);
    }
    if params.fix_non_manifold_vertices {
        report.non_manifold_vertices_split = fix_non_manifold_vertices(mesh);
    }
    if params.orient_outward {
        report.components_flipped = orient_outward(mesh);
    }
    if params.remove_unreferenced {
        report.unreferenced_removed = remove_unreferenced_vertices(mesh);
    }
    if params.compute_normals {
        compute_vertex_normals(mesh);
    }

    info!(
        "Repair complete: {} verts → {}, {} faces → {}",
        initial_verts,
        mesh.vertex_count(),
        initial_faces,
        mesh.face_count()
    );

    report
}
