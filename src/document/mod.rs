//! The input scene document.
//!
//! This is the explicit stand-in for a live host scene graph: every attribute
//! the exporter needs (face-indexed UV/color tables, vertex groups, pre-sampled
//! bone poses, camera constraints) is plain data. Documents can be built in
//! memory or deserialized from JSON / a ZIP bundle via [`loader`].

pub mod armature;
pub mod camera;
pub mod loader;
pub mod material;
pub mod mesh;

pub use armature::{Armature, BoneDef, PoseAction};
pub use camera::{CameraKind, CameraObject, LightKind, LightObject, RigMode, ShadowKind, ShadowSettings};
pub use loader::{LoadedDocument, TextureStore};
pub use material::{CoordinatesMode, MaterialDef, TextureDef, TextureSlot, WrapMode};
pub use mesh::{Face, Geometry, GroupWeight, ImpostorShape, MeshObject, PhysicsBody, Skin, VertexGroup};

use glam::Mat4;
use serde::{Deserialize, Serialize};

use crate::error::{ExportError, Result};

/// A complete scene as supplied by the host editor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneDocument {
    #[serde(default)]
    pub name: String,
    /// Sampling rate the animation tracks were captured at.
    #[serde(default = "default_fps")]
    pub frames_per_second: u32,
    /// Last frame of the host timeline; seeds auto-animate bounds.
    #[serde(default = "default_frame_end")]
    pub frame_end: i32,
    #[serde(default)]
    pub world: Option<World>,
    #[serde(default = "default_gravity")]
    pub gravity: [f32; 3],
    /// Name of the camera the runtime should activate first.
    #[serde(default)]
    pub active_camera: Option<String>,
    /// Scene-level background sound.
    #[serde(default)]
    pub sound: Option<SoundDef>,
    #[serde(default)]
    pub materials: Vec<MaterialDef>,
    #[serde(default)]
    pub armatures: Vec<Armature>,
    #[serde(default)]
    pub meshes: Vec<MeshObject>,
    #[serde(default)]
    pub empties: Vec<Empty>,
    #[serde(default)]
    pub cameras: Vec<CameraObject>,
    #[serde(default)]
    pub lights: Vec<LightObject>,
}

impl SceneDocument {
    /// Look up a material definition by slot name.
    pub fn material(&self, name: &str) -> Option<&MaterialDef> {
        self.materials.iter().find(|m| m.name == name)
    }

    /// Look up an armature by name.
    pub fn armature(&self, name: &str) -> Option<&Armature> {
        self.armatures.iter().find(|a| a.name == name)
    }

    /// Structural checks that do not depend on export settings.
    pub fn validate(&self) -> Result<()> {
        for mesh in &self.meshes {
            mesh.geometry.validate(&mesh.name)?;
            for slot in &mesh.material_slots {
                if self.material(slot).is_none() {
                    return Err(ExportError::InvalidDocument(format!(
                        "mesh '{}' references unknown material '{slot}'",
                        mesh.name
                    )));
                }
            }
            if let Some(skin) = &mesh.skin {
                if self.armature(&skin.armature).is_none() {
                    return Err(ExportError::InvalidDocument(format!(
                        "mesh '{}' is skinned to unknown armature '{}'",
                        mesh.name, skin.armature
                    )));
                }
            }
        }
        Ok(())
    }
}

fn default_fps() -> u32 {
    24
}

fn default_frame_end() -> i32 {
    250
}

fn default_gravity() -> [f32; 3] {
    [0.0, 0.0, -9.81]
}

/// World / environment settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct World {
    #[serde(default = "default_clear_color")]
    pub clear_color: [f32; 3],
    #[serde(default = "default_ambient_color")]
    pub ambient_color: [f32; 3],
    #[serde(default)]
    pub fog: Option<Fog>,
}

impl Default for World {
    fn default() -> Self {
        Self {
            clear_color: default_clear_color(),
            ambient_color: default_ambient_color(),
            fog: None,
        }
    }
}

fn default_clear_color() -> [f32; 3] {
    [0.0, 0.0, 0.0]
}

fn default_ambient_color() -> [f32; 3] {
    [0.2, 0.2, 0.3]
}

/// Fog settings, present only when the scene uses fog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fog {
    pub mode: FogMode,
    pub color: [f32; 3],
    #[serde(default)]
    pub start: f32,
    #[serde(default)]
    pub end: f32,
    #[serde(default = "default_fog_density")]
    pub density: f32,
}

fn default_fog_density() -> f32 {
    0.3
}

/// Fog falloff curves understood by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FogMode {
    Exp,
    Exp2,
    Linear,
}

impl FogMode {
    /// Numeric code in the scene file.
    pub fn code(self) -> u32 {
        match self {
            FogMode::Exp => 1,
            FogMode::Exp2 => 2,
            FogMode::Linear => 3,
        }
    }
}

/// Position / rotation / scaling of an object, in host coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transform {
    #[serde(default)]
    pub position: [f32; 3],
    #[serde(default)]
    pub rotation: Rotation,
    #[serde(default = "default_scaling")]
    pub scaling: [f32; 3],
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            rotation: Rotation::default(),
            scaling: default_scaling(),
        }
    }
}

fn default_scaling() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

/// Rotation in the object's preferred mode; three components are XYZ Euler
/// angles, four are a quaternion (x, y, z, w).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Rotation {
    Euler([f32; 3]),
    Quaternion([f32; 4]),
}

impl Default for Rotation {
    fn default() -> Self {
        Rotation::Euler([0.0; 3])
    }
}

/// An empty / locator object, exported as a zero-geometry node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Empty {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub transform: Transform,
    #[serde(default)]
    pub actions: Vec<ActionSamples>,
    #[serde(default)]
    pub auto_animate: bool,
}

/// A sound attached to the scene or to a mesh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoundDef {
    pub file: String,
    #[serde(default = "default_true")]
    pub autoplay: bool,
    #[serde(default = "default_true")]
    pub looping: bool,
    /// Spatial cutoff; only meaningful for mesh-attached sounds.
    #[serde(default)]
    pub max_distance: Option<f32>,
}

pub(crate) fn default_true() -> bool {
    true
}

/// Transform values of one action, pre-sampled at its keyframes.
///
/// The host samples each animated property at every keyframe of the action;
/// the exporter concatenates actions into tracks, offsetting frames per range.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionSamples {
    pub name: String,
    pub frames: Vec<i32>,
    #[serde(default)]
    pub position: Option<Vec<[f32; 3]>>,
    #[serde(default)]
    pub rotation: Option<Vec<[f32; 3]>>,
    #[serde(default)]
    pub rotation_quaternion: Option<Vec<[f32; 4]>>,
    #[serde(default)]
    pub scaling: Option<Vec<[f32; 3]>>,
}

impl ActionSamples {
    /// True when at least one property carries values.
    pub fn has_data(&self) -> bool {
        self.position.is_some()
            || self.rotation.is_some()
            || self.rotation_quaternion.is_some()
            || self.scaling.is_some()
    }
}

/// Convert a row-major nested matrix (the document layout) to a [`Mat4`].
pub fn mat4_from_rows(rows: &[[f32; 4]; 4]) -> Mat4 {
    Mat4::from_cols_array_2d(rows).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_untagged() {
        let euler: Rotation = serde_json::from_str("[0.1, 0.2, 0.3]").unwrap();
        assert!(matches!(euler, Rotation::Euler(_)));

        let quat: Rotation = serde_json::from_str("[0.0, 0.0, 0.0, 1.0]").unwrap();
        assert!(matches!(quat, Rotation::Quaternion(_)));
    }

    #[test]
    fn test_mat4_from_rows_translation() {
        // row-major translation matrix: last column holds the offset
        let rows = [
            [1.0, 0.0, 0.0, 5.0],
            [0.0, 1.0, 0.0, 6.0],
            [0.0, 0.0, 1.0, 7.0],
            [0.0, 0.0, 0.0, 1.0],
        ];
        let m = mat4_from_rows(&rows);
        assert_eq!(m.w_axis.truncate(), glam::Vec3::new(5.0, 6.0, 7.0));
    }

    #[test]
    fn test_minimal_document_parses() {
        let doc: SceneDocument = serde_json::from_str(r#"{"name": "lab"}"#).unwrap();
        assert_eq!(doc.frames_per_second, 24);
        assert_eq!(doc.gravity, [0.0, 0.0, -9.81]);
        assert!(doc.meshes.is_empty());
    }
}
