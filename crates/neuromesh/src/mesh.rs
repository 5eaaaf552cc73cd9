//! Reconstruction output.

use hashbrown::HashMap;
use mesh_kernel::{Mesh, MeshReport, validate_mesh};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::skeleton::SectionType;

/// Part label carried by output meshes and, in joined output, by every
/// vertex through `Vertex::tag`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartLabel {
    Soma,
    Axon,
    BasalDendrite,
    ApicalDendrite,
    Endfoot,
    Spine,
    /// A surface spanning several parts; vertex tags tell them apart.
    Neuron,
}

impl PartLabel {
    pub const ALL: [PartLabel; 7] = [
        PartLabel::Soma,
        PartLabel::Axon,
        PartLabel::BasalDendrite,
        PartLabel::ApicalDendrite,
        PartLabel::Endfoot,
        PartLabel::Spine,
        PartLabel::Neuron,
    ];

    pub fn tag(self) -> u32 {
        match self {
            PartLabel::Soma => 1,
            PartLabel::Axon => 2,
            PartLabel::BasalDendrite => 3,
            PartLabel::ApicalDendrite => 4,
            PartLabel::Endfoot => 5,
            PartLabel::Spine => 6,
            PartLabel::Neuron => 0,
        }
    }

    pub fn from_tag(tag: u32) -> Option<PartLabel> {
        PartLabel::ALL.into_iter().find(|l| l.tag() == tag)
    }

    /// Label of arbor geometry. Undetermined neurites render as basal.
    pub fn for_section_type(kind: SectionType) -> PartLabel {
        match kind {
            SectionType::Axon => PartLabel::Axon,
            SectionType::ApicalDendrite => PartLabel::ApicalDendrite,
            SectionType::BasalDendrite | SectionType::Undetermined => PartLabel::BasalDendrite,
        }
    }

    /// Neurite surfaces, the target of rough-surface noise.
    pub fn is_arbor(self) -> bool {
        matches!(
            self,
            PartLabel::Axon | PartLabel::BasalDendrite | PartLabel::ApicalDendrite
        )
    }
}

/// One labeled mesh.
#[derive(Debug, Clone)]
pub struct MeshPart {
    pub label: PartLabel,
    pub name: String,
    pub mesh: Mesh,
}

impl MeshPart {
    pub fn new(label: PartLabel, name: impl Into<String>, mesh: Mesh) -> Self {
        Self {
            label,
            name: name.into(),
            mesh,
        }
    }

    /// Label of vertex `v`, from its tag or the part label.
    pub fn vertex_label(&self, v: usize) -> PartLabel {
        self.mesh
            .vertices
            .get(v)
            .and_then(|vx| vx.tag)
            .and_then(PartLabel::from_tag)
            .filter(|l| *l != PartLabel::Neuron)
            .unwrap_or(self.label)
    }
}

/// Final meshes of one reconstruction.
#[derive(Debug, Clone, Default)]
pub struct ReconstructedMesh {
    pub parts: Vec<MeshPart>,
}

impl ReconstructedMesh {
    pub fn part(&self, label: PartLabel) -> Option<&MeshPart> {
        self.parts.iter().find(|p| p.label == label)
    }

    pub fn vertex_count(&self) -> usize {
        self.parts.iter().map(|p| p.mesh.vertex_count()).sum()
    }

    pub fn face_count(&self) -> usize {
        self.parts.iter().map(|p| p.mesh.face_count()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.iter().all(|p| p.mesh.is_empty())
    }

    /// All parts in one mesh, tags preserved.
    pub fn joined(&self) -> Mesh {
        Mesh::join(self.parts.iter().map(|p| &p.mesh))
    }

    pub fn bounds(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        self.joined().bounds()
    }

    /// Kernel validation report per part.
    pub fn report(&self) -> Vec<(PartLabel, MeshReport)> {
        self.parts
            .iter()
            .map(|p| (p.label, validate_mesh(&p.mesh)))
            .collect()
    }
}

/// Labels mesh vertices from weighted source points.
///
/// Each source has a position, an influence radius and a label. A query
/// returns the label whose source has the largest `1 - d²/r²`, or the
/// nearest source when no radius reaches the point.
pub(crate) struct VertexLabeler {
    cell: f64,
    grid: HashMap<(i64, i64, i64), Vec<u32>>,
    sources: Vec<(Point3<f64>, f64, PartLabel)>,
}

impl VertexLabeler {
    pub(crate) fn new(sources: Vec<(Point3<f64>, f64, PartLabel)>) -> Self {
        let cell = sources
            .iter()
            .map(|s| s.1)
            .fold(0.0f64, f64::max)
            .max(1e-6);
        let mut grid: HashMap<(i64, i64, i64), Vec<u32>> = HashMap::new();
        for (i, (p, _, _)) in sources.iter().enumerate() {
            grid.entry(Self::key(p, cell)).or_default().push(i as u32);
        }
        Self { cell, grid, sources }
    }

    fn key(p: &Point3<f64>, cell: f64) -> (i64, i64, i64) {
        (
            (p.x / cell).floor() as i64,
            (p.y / cell).floor() as i64,
            (p.z / cell).floor() as i64,
        )
    }

    pub(crate) fn label(&self, p: &Point3<f64>) -> Option<PartLabel> {
        let (kx, ky, kz) = Self::key(p, self.cell);
        let mut best: Option<(f64, PartLabel)> = None;
        for dz in -1..=1 {
            for dy in -1..=1 {
                for dx in -1..=1 {
                    let Some(bucket) = self.grid.get(&(kx + dx, ky + dy, kz + dz)) else {
                        continue;
                    };
                    for &i in bucket {
                        let (c, r, label) = self.sources[i as usize];
                        let w = 1.0 - (p - c).norm_squared() / (r * r).max(1e-12);
                        if best.is_none_or(|(bw, _)| w > bw) {
                            best = Some((w, label));
                        }
                    }
                }
            }
        }
        best.map(|(_, l)| l).or_else(|| self.nearest(p))
    }

    fn nearest(&self, p: &Point3<f64>) -> Option<PartLabel> {
        self.sources
            .iter()
            .min_by(|a, b| (p - a.0).norm_squared().total_cmp(&(p - b.0).norm_squared()))
            .map(|s| s.2)
    }

    /// Tag every vertex of `mesh`.
    pub(crate) fn tag_mesh(&self, mesh: &mut Mesh) {
        for v in &mut mesh.vertices {
            if let Some(label) = self.label(&v.position) {
                v.tag = Some(label.tag());
            }
        }
    }
}
