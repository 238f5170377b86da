//! Mesh objects and their geometry tables.

use serde::{Deserialize, Serialize};

use super::{ActionSamples, SoundDef, Transform};
use crate::error::{ExportError, Result};

/// A triangulated mesh object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeshObject {
    pub name: String,
    /// Geometry id shared between instanced meshes. Defaults to the mesh name;
    /// two meshes with the same `data_name` share one set of buffers.
    #[serde(default)]
    pub data_name: Option<String>,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub transform: Transform,
    #[serde(default)]
    pub layer: i32,
    #[serde(default = "super::default_true")]
    pub visible: bool,
    #[serde(default = "super::default_true")]
    pub enabled: bool,
    /// Use face normals; every corner becomes a unique vertex.
    #[serde(default)]
    pub flat_shading: bool,
    #[serde(default)]
    pub check_collisions: bool,
    #[serde(default)]
    pub receive_shadows: bool,
    #[serde(default)]
    pub cast_shadows: bool,
    #[serde(default)]
    pub freeze_world_matrix: bool,
    #[serde(default)]
    pub billboard: bool,
    /// Material names, in slot order, resolved against the document's library.
    #[serde(default)]
    pub material_slots: Vec<String>,
    #[serde(default)]
    pub physics: Option<PhysicsBody>,
    #[serde(default)]
    pub skin: Option<Skin>,
    #[serde(default)]
    pub sound: Option<SoundDef>,
    pub geometry: Geometry,
    #[serde(default)]
    pub actions: Vec<ActionSamples>,
    #[serde(default)]
    pub auto_animate: bool,
}

impl MeshObject {
    /// The geometry id used for instancing.
    pub fn data_name(&self) -> &str {
        self.data_name.as_deref().unwrap_or(&self.name)
    }
}

/// Shared vertex pool plus triangle faces.
///
/// Positions and normals are vertex-indexed; UVs and colors are face-indexed
/// corner tables, because one topological vertex can carry different values
/// depending on which face visits it. That mismatch is what makes welding
/// necessary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Geometry {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub faces: Vec<Face>,
    /// Primary UV set, one `[corner; 3]` entry per face.
    #[serde(default)]
    pub uv: Option<Vec<[[f32; 2]; 3]>>,
    /// Secondary UV set (lightmaps etc.).
    #[serde(default)]
    pub uv2: Option<Vec<[[f32; 2]; 3]>>,
    /// Vertex colors, one RGB triple per face corner.
    #[serde(default)]
    pub colors: Option<Vec<[[f32; 3]; 3]>>,
}

impl Geometry {
    /// Cross-check table lengths and index bounds.
    pub fn validate(&self, mesh_name: &str) -> Result<()> {
        let bad = |what: &str| {
            Err(ExportError::InvalidDocument(format!(
                "mesh '{mesh_name}': {what}"
            )))
        };

        if self.normals.len() != self.positions.len() {
            return bad("normals table length differs from positions");
        }
        for table in [&self.uv, &self.uv2].into_iter().flatten() {
            if table.len() != self.faces.len() {
                return bad("UV table length differs from face count");
            }
        }
        if let Some(colors) = &self.colors {
            if colors.len() != self.faces.len() {
                return bad("color table length differs from face count");
            }
        }
        for face in &self.faces {
            if face.vertices.iter().any(|&v| v as usize >= self.positions.len()) {
                return bad("face references vertex outside the position pool");
            }
        }
        Ok(())
    }
}

/// One triangle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Face {
    /// Indices into the shared position/normal pool.
    pub vertices: [u32; 3],
    /// Face normal, used when flat shading. Computed from the corner positions
    /// when absent.
    #[serde(default)]
    pub normal: Option<[f32; 3]>,
    #[serde(default)]
    pub material_index: u32,
}

/// Rigid-body settings for a mesh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhysicsBody {
    pub shape: ImpostorShape,
    #[serde(default = "default_mass")]
    pub mass: f32,
    #[serde(default = "default_friction")]
    pub friction: f32,
    #[serde(default)]
    pub restitution: f32,
}

fn default_mass() -> f32 {
    1.0
}

fn default_friction() -> f32 {
    0.5
}

/// Collision impostor shapes understood by the runtime's physics engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpostorShape {
    Sphere,
    Box,
    Mesh,
    Capsule,
    Cone,
    Cylinder,
    ConvexHull,
}

impl ImpostorShape {
    /// Numeric impostor code in the scene file.
    pub fn code(self) -> u32 {
        match self {
            ImpostorShape::Sphere => 1,
            ImpostorShape::Box => 2,
            ImpostorShape::Mesh => 4,
            ImpostorShape::Capsule => 5,
            ImpostorShape::Cone => 6,
            ImpostorShape::Cylinder => 7,
            ImpostorShape::ConvexHull => 8,
        }
    }
}

/// Binding of a mesh to an armature.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Skin {
    /// Name of the armature in the document.
    pub armature: String,
    /// Cap on bone influences per vertex, clamped to `1..=8` at export time.
    #[serde(default = "default_max_influencers")]
    pub max_influencers: u32,
    pub vertex_groups: Vec<VertexGroup>,
}

fn default_max_influencers() -> u32 {
    8
}

/// Weighted vertex memberships of one deform group. The group name must match
/// a bone name to contribute influences.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VertexGroup {
    pub name: String,
    pub weights: Vec<GroupWeight>,
}

/// One (vertex, weight) membership.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GroupWeight {
    pub vertex: u32,
    pub weight: f32,
}
