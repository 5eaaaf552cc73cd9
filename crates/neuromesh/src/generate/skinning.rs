//! Skinned arbors.
//!
//! An arbor becomes a skin graph: one node per distinct sample, numbered
//! like the arbor-wide sample indices, plus the auxiliary anchor nodes in
//! front. The skin operator then sweeps one tube along every chain of the
//! graph, so a whole arbor is skinned in a single pass.

use hashbrown::{HashMap, HashSet};
use mesh_kernel::repair::remove_unreferenced_vertices;
use mesh_kernel::{
    HoleFillMethod, Mesh, SmoothParams, compute_vertex_normals, detect_holes, fill_hole,
    smooth_mesh,
};
use nalgebra::Point3;
use tracing::{debug, warn};

use super::paths::section_chains;
use super::tube::{TubeCaps, TubeProfile, sweep_tube};
use crate::connectivity::{AnchorStyle, anchor_points};
use crate::options::ReconstructionOptions;
use crate::skeleton::{Connectivity, Morphology, Sample, SectionId};

/// Taubin passes applied to a skinned arbor.
const SKIN_SMOOTHING_ITERATIONS: u32 = 3;

/// A joint of the skin graph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkinNode {
    pub position: Point3<f64>,
    pub radius: f64,
}

/// Arbor skeleton as a vertex graph with radii, and its skinned surface.
#[derive(Debug, Clone, Default)]
pub struct SkinGraph {
    pub arbor: usize,
    pub nodes: Vec<SkinNode>,
    pub edges: Vec<[u32; 2]>,
    /// Auxiliary anchor nodes at the front of `nodes`.
    pub auxiliary: usize,
    /// Node chains, each swept into one tube.
    pub chains: Vec<Vec<u32>>,
    /// Anchor whose cap is reopened and closed around smoothing.
    pub anchor: Option<Point3<f64>>,
    pub mesh: Mesh,
}

impl SkinGraph {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn add_node(&mut self, position: Point3<f64>) -> u32 {
        self.nodes.push(SkinNode { position, radius: 0.0 });
        (self.nodes.len() - 1) as u32
    }

    fn chain_samples(&self, chain: &[u32]) -> Vec<Sample> {
        chain
            .iter()
            .map(|&n| {
                let node = self.nodes[n as usize];
                Sample::new(node.position, node.radius)
            })
            .collect()
    }
}

/// Build the skin graph of one arbor. Returns `None` when no section of the
/// arbor can be skinned.
pub fn build_skin_graph(morph: &Morphology, arbor: usize, options: &ReconstructionOptions) -> Option<SkinGraph> {
    let info = morph.arbor(arbor)?;
    let chains = section_chains(morph, info.root, options.max_branching_order(info.kind));
    if chains.is_empty() {
        return None;
    }
    let included: HashSet<SectionId> = chains.iter().flatten().copied().collect();
    let order: Vec<SectionId> = morph
        .subtree(info.root)
        .into_iter()
        .filter(|id| included.contains(id))
        .collect();

    let anchors = anchor_points(morph, arbor, options, AnchorStyle::Skin);
    let mut graph = SkinGraph {
        arbor,
        auxiliary: anchors.len(),
        ..Default::default()
    };
    for p in &anchors {
        graph.add_node(*p);
    }
    if morph.soma.connectivity(arbor) == Some(Connectivity::Connected) && anchors.len() == 2 {
        graph.anchor = anchors.first().copied();
    }

    // Topology, in the same depth-first order as the arbor indices
    let mut by_index: HashMap<usize, u32> = HashMap::new();
    let mut section_nodes: HashMap<SectionId, Vec<u32>> = HashMap::new();
    for &id in &order {
        let section = morph.section(id);
        let inherited = section
            .parent
            .and_then(|p| section_nodes.get(&p))
            .and_then(|nodes| nodes.last().copied());
        let mut nodes = Vec::with_capacity(section.samples().len());
        for (i, s) in section.samples().iter().enumerate() {
            let node = match (i, inherited, s.arbor_index) {
                (0, Some(shared), _) => shared,
                (_, _, Some(index)) => match by_index.get(&index) {
                    Some(&n) => n,
                    None => {
                        let n = graph.add_node(s.point);
                        by_index.insert(index, n);
                        n
                    }
                },
                _ => graph.add_node(s.point),
            };
            if let Some(&prev) = nodes.last() {
                if prev != node {
                    graph.edges.push([prev, node]);
                }
            }
            nodes.push(node);
        }
        section_nodes.insert(id, nodes);
    }

    // Radii, skipping the shared first sample of non-root sections
    for &id in &order {
        let section = morph.section(id);
        let skip = usize::from(!section.is_root());
        for (s, n) in section.samples().iter().zip(&section_nodes[&id]).skip(skip) {
            graph.nodes[*n as usize].radius = s.radius;
        }
    }

    let root_nodes = &section_nodes[&info.root];
    if let Some(&first) = root_nodes.first() {
        let radius = graph.nodes[first as usize].radius;
        for aux in 0..graph.auxiliary {
            graph.nodes[aux].radius = radius;
            let next = if aux + 1 < graph.auxiliary { aux as u32 + 1 } else { first };
            graph.edges.push([aux as u32, next]);
        }
    }

    for (c, chain) in chains.iter().enumerate() {
        let mut nodes: Vec<u32> = if c == 0 {
            (0..graph.auxiliary as u32).collect()
        } else {
            Vec::new()
        };
        for (i, id) in chain.iter().enumerate() {
            let skip = usize::from(i > 0);
            nodes.extend(section_nodes[id].iter().skip(skip));
        }
        graph.chains.push(nodes);
    }
    Some(graph)
}

/// Sweep a capped tube along every chain and join them.
pub fn skin(graph: &SkinGraph, profile: &TubeProfile) -> Mesh {
    let tubes: Vec<Mesh> = graph
        .chains
        .iter()
        .map(|chain| sweep_tube(&graph.chain_samples(chain), profile, TubeCaps::BOTH))
        .collect();
    Mesh::join(&tubes)
}

/// Skin one arbor and post-process its surface.
///
/// A soma-connected arbor has its anchor cap removed before smoothing and
/// closed again afterwards, so the smoothing cannot fold the junction.
pub fn skin_arbor(morph: &Morphology, arbor: usize, options: &ReconstructionOptions) -> Option<SkinGraph> {
    let mut graph = build_skin_graph(morph, arbor, options)?;
    let mut mesh = skin(&graph, &TubeProfile::new(options.bevel_sides));
    let smoothing = SmoothParams::taubin(SKIN_SMOOTHING_ITERATIONS);

    match graph.anchor {
        Some(anchor) => {
            open_nearest_cap(&mut mesh, &anchor);
            smooth_mesh(&mut mesh, &smoothing);
            close_nearest_loop(&mut mesh, &anchor);
            remove_unreferenced_vertices(&mut mesh);
        }
        None => smooth_mesh(&mut mesh, &smoothing),
    }
    compute_vertex_normals(&mut mesh);
    normalize_uvs(&mut mesh);

    debug!(
        arbor,
        nodes = graph.node_count(),
        chains = graph.chains.len(),
        faces = mesh.face_count(),
        "Arbor skinned"
    );
    graph.mesh = mesh;
    Some(graph)
}

/// Remove every face around the vertex nearest `anchor`.
fn open_nearest_cap(mesh: &mut Mesh, anchor: &Point3<f64>) {
    let nearest = mesh
        .vertices
        .iter()
        .enumerate()
        .min_by(|a, b| {
            (a.1.position - anchor)
                .norm_squared()
                .total_cmp(&(b.1.position - anchor).norm_squared())
        })
        .map(|(i, _)| i as u32);
    if let Some(v) = nearest {
        mesh.faces.retain(|f| !f.contains(&v));
    }
}

/// Close the boundary loop whose centroid is nearest `anchor`.
fn close_nearest_loop(mesh: &mut Mesh, anchor: &Point3<f64>) {
    let loops = match detect_holes(mesh) {
        Ok(loops) => loops,
        Err(e) => {
            warn!(error = %e, "Could not trace the opened anchor cap");
            return;
        }
    };
    let nearest = loops.iter().min_by(|a, b| {
        (a.centroid(mesh) - anchor)
            .norm_squared()
            .total_cmp(&(b.centroid(mesh) - anchor).norm_squared())
    });
    if let Some(boundary) = nearest.cloned() {
        fill_hole(mesh, &boundary, HoleFillMethod::CentroidFan);
    }
}

/// Rescale texture coordinates to the unit square.
pub(crate) fn normalize_uvs(mesh: &mut Mesh) {
    let mut min = [f64::INFINITY; 2];
    let mut max = [f64::NEG_INFINITY; 2];
    for uv in mesh.vertices.iter().filter_map(|v| v.uv) {
        for axis in 0..2 {
            min[axis] = min[axis].min(uv[axis]);
            max[axis] = max[axis].max(uv[axis]);
        }
    }
    if !min[0].is_finite() {
        return;
    }
    let span = [(max[0] - min[0]).max(f64::EPSILON), (max[1] - min[1]).max(f64::EPSILON)];
    for v in &mut mesh.vertices {
        v.uv = v.uv.map(|uv| [(uv[0] - min[0]) / span[0], (uv[1] - min[1]) / span[1]]);
    }
}
