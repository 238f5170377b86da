//! Material and texture definitions.

use serde::{Deserialize, Serialize};

/// A standard material definition, referenced from mesh material slots by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialDef {
    pub name: String,
    /// Overrides the run-wide namespace prefix for this material's id, so
    /// materials can be shared across scene files.
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub ambient: [f32; 3],
    #[serde(default = "default_diffuse")]
    pub diffuse: [f32; 3],
    #[serde(default)]
    pub specular: [f32; 3],
    #[serde(default)]
    pub emissive: [f32; 3],
    #[serde(default = "default_specular_power")]
    pub specular_power: f32,
    #[serde(default = "default_alpha")]
    pub alpha: f32,
    #[serde(default = "super::default_true")]
    pub backface_culling: bool,
    #[serde(default)]
    pub check_ready_only_once: bool,
    #[serde(default = "default_max_lights")]
    pub max_simultaneous_lights: u32,
    #[serde(default)]
    pub textures: Vec<TextureDef>,
}

fn default_diffuse() -> [f32; 3] {
    [0.8, 0.8, 0.8]
}

fn default_specular_power() -> f32 {
    64.0
}

fn default_alpha() -> f32 {
    1.0
}

fn default_max_lights() -> u32 {
    4
}

/// An image texture bound to one material slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextureDef {
    pub slot: TextureSlot,
    /// Image file, resolved against the document's texture store.
    pub file: String,
    #[serde(default = "default_level")]
    pub level: f32,
    /// Overrides alpha detection; probed from the image when absent.
    #[serde(default)]
    pub has_alpha: Option<bool>,
    /// Which UV set the texture maps with (0 or 1).
    #[serde(default)]
    pub coordinates_index: u32,
    #[serde(default)]
    pub coordinates_mode: CoordinatesMode,
    #[serde(default)]
    pub u_offset: f32,
    #[serde(default)]
    pub v_offset: f32,
    #[serde(default = "default_level")]
    pub u_scale: f32,
    #[serde(default = "default_level")]
    pub v_scale: f32,
    #[serde(default)]
    pub u_ang: f32,
    #[serde(default)]
    pub v_ang: f32,
    #[serde(default)]
    pub w_ang: f32,
    #[serde(default)]
    pub wrap_u: WrapMode,
    #[serde(default)]
    pub wrap_v: WrapMode,
}

fn default_level() -> f32 {
    1.0
}

/// Material slots a texture can occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureSlot {
    Diffuse,
    Ambient,
    Opacity,
    Emissive,
    Bump,
    Specular,
    Reflection,
}

impl TextureSlot {
    /// Field name in the material's scene-file entry.
    pub fn field_name(self) -> &'static str {
        match self {
            TextureSlot::Diffuse => "diffuseTexture",
            TextureSlot::Ambient => "ambientTexture",
            TextureSlot::Opacity => "opacityTexture",
            TextureSlot::Emissive => "emissiveTexture",
            TextureSlot::Bump => "bumpTexture",
            TextureSlot::Specular => "specularTexture",
            TextureSlot::Reflection => "reflectionTexture",
        }
    }
}

/// How texture coordinates are generated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinatesMode {
    #[default]
    Explicit,
    Spherical,
    Cubic,
}

impl CoordinatesMode {
    /// Numeric mode code in the scene file.
    pub fn code(self) -> u32 {
        match self {
            CoordinatesMode::Explicit => 0,
            CoordinatesMode::Spherical => 1,
            CoordinatesMode::Cubic => 3,
        }
    }
}

/// Texture addressing outside `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WrapMode {
    Clamp,
    #[default]
    Wrap,
    Mirror,
}

impl WrapMode {
    /// Numeric address-mode code in the scene file.
    pub fn code(self) -> u32 {
        match self {
            WrapMode::Clamp => 0,
            WrapMode::Wrap => 1,
            WrapMode::Mirror => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_material_defaults() {
        let mat: MaterialDef = serde_json::from_str(r#"{"name": "Steel"}"#).unwrap();
        assert_eq!(mat.diffuse, [0.8, 0.8, 0.8]);
        assert_eq!(mat.alpha, 1.0);
        assert!(mat.backface_culling);
        assert!(mat.textures.is_empty());
    }

    #[test]
    fn test_texture_slot_field_names() {
        assert_eq!(TextureSlot::Diffuse.field_name(), "diffuseTexture");
        assert_eq!(TextureSlot::Bump.field_name(), "bumpTexture");
    }

    #[test]
    fn test_wrap_mode_codes() {
        assert_eq!(WrapMode::Clamp.code(), 0);
        assert_eq!(WrapMode::Wrap.code(), 1);
        assert_eq!(WrapMode::Mirror.code(), 2);
    }
}
