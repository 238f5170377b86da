//! Camera and light objects.

use serde::{Deserialize, Serialize};

use super::{ActionSamples, Rotation};

/// A camera object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraObject {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub position: [f32; 3],
    #[serde(default)]
    pub rotation: Rotation,
    #[serde(default)]
    pub kind: CameraKind,
    /// Vertical field of view, radians.
    #[serde(default = "default_fov")]
    pub fov: f32,
    #[serde(default = "default_clip_start")]
    pub clip_start: f32,
    #[serde(default = "default_clip_end")]
    pub clip_end: f32,
    #[serde(default)]
    pub check_collisions: bool,
    #[serde(default)]
    pub apply_gravity: bool,
    #[serde(default = "default_ellipsoid")]
    pub ellipsoid: [f32; 3],
    #[serde(default)]
    pub rig: RigMode,
    #[serde(default = "default_interaxial")]
    pub interaxial_distance: f32,
    /// Object this camera tracks; mandatory for arc-rotate and follow cameras.
    #[serde(default)]
    pub locked_target: Option<String>,
    #[serde(default)]
    pub actions: Vec<ActionSamples>,
    #[serde(default)]
    pub auto_animate: bool,
}

fn default_fov() -> f32 {
    0.8
}

fn default_clip_start() -> f32 {
    0.1
}

fn default_clip_end() -> f32 {
    100.0
}

fn default_ellipsoid() -> [f32; 3] {
    [0.2, 0.9, 0.2]
}

fn default_interaxial() -> f32 {
    0.0637
}

/// Camera behaviors understood by the runtime's scene loader.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraKind {
    #[default]
    Free,
    ArcRotate,
    Follow,
    Touch,
    Gamepad,
    DeviceOrientation,
    VirtualJoysticks,
    VrDeviceOrientationFree,
    WebVrFree,
}

impl CameraKind {
    /// Type string in the scene file.
    pub fn type_name(self) -> &'static str {
        match self {
            CameraKind::Free => "FreeCamera",
            CameraKind::ArcRotate => "ArcRotateCamera",
            CameraKind::Follow => "FollowCamera",
            CameraKind::Touch => "TouchCamera",
            CameraKind::Gamepad => "GamepadCamera",
            CameraKind::DeviceOrientation => "DeviceOrientationCamera",
            CameraKind::VirtualJoysticks => "VirtualJoysticksCamera",
            CameraKind::VrDeviceOrientationFree => "VRDeviceOrientationFreeCamera",
            CameraKind::WebVrFree => "WebVRFreeCamera",
        }
    }

    /// Arc-rotate and follow cameras cannot function without a locked target.
    pub fn requires_target(self) -> bool {
        matches!(self, CameraKind::ArcRotate | CameraKind::Follow)
    }
}

/// Stereoscopic / VR rig modes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RigMode {
    #[default]
    None,
    StereoscopicAnaglyph,
    StereoscopicSideBySideParallel,
    StereoscopicSideBySideCrosseyed,
    StereoscopicOverUnder,
    Vr,
}

impl RigMode {
    /// Numeric rig code in the scene file.
    pub fn code(self) -> u32 {
        match self {
            RigMode::None => 0,
            RigMode::StereoscopicAnaglyph => 10,
            RigMode::StereoscopicSideBySideParallel => 11,
            RigMode::StereoscopicSideBySideCrosseyed => 12,
            RigMode::StereoscopicOverUnder => 13,
            RigMode::Vr => 20,
        }
    }
}

/// A light object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightObject {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub kind: LightKind,
    #[serde(default)]
    pub position: [f32; 3],
    /// Pointing direction; required for directional, spot, and hemispheric
    /// lights.
    #[serde(default)]
    pub direction: Option<[f32; 3]>,
    /// Spot cone angle, radians.
    #[serde(default)]
    pub angle: Option<f32>,
    /// Spot falloff exponent.
    #[serde(default)]
    pub exponent: Option<f32>,
    /// Influence cutoff distance for point and spot lights.
    #[serde(default)]
    pub range: Option<f32>,
    #[serde(default = "default_intensity")]
    pub intensity: f32,
    #[serde(default = "default_light_color")]
    pub color: [f32; 3],
    /// Contributes to diffuse shading.
    #[serde(default = "super::default_true")]
    pub use_diffuse: bool,
    /// Contributes to specular shading.
    #[serde(default = "super::default_true")]
    pub use_specular: bool,
    #[serde(default)]
    pub layer: i32,
    /// Restrict the light to meshes on its own layer.
    #[serde(default)]
    pub only_own_layer: bool,
    #[serde(default)]
    pub shadow: Option<ShadowSettings>,
    #[serde(default)]
    pub actions: Vec<ActionSamples>,
    #[serde(default)]
    pub auto_animate: bool,
}

fn default_intensity() -> f32 {
    1.0
}

fn default_light_color() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

/// Light categories in the scene format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightKind {
    #[default]
    Point,
    Directional,
    Spot,
    Hemispheric,
}

impl LightKind {
    /// Numeric type code in the scene file.
    pub fn code(self) -> u32 {
        match self {
            LightKind::Point => 0,
            LightKind::Directional => 1,
            LightKind::Spot => 2,
            LightKind::Hemispheric => 3,
        }
    }
}

/// Shadow-map settings on a light.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShadowSettings {
    #[serde(default)]
    pub kind: ShadowKind,
    #[serde(default = "default_map_size")]
    pub map_size: u32,
    #[serde(default = "default_bias")]
    pub bias: f32,
    /// Blur-variance only.
    #[serde(default = "default_blur_scale")]
    pub blur_scale: u32,
    /// Blur-variance only.
    #[serde(default)]
    pub blur_box_offset: u32,
}

fn default_map_size() -> u32 {
    512
}

fn default_bias() -> f32 {
    0.000_05
}

fn default_blur_scale() -> u32 {
    2
}

/// Shadow sampling strategies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShadowKind {
    #[default]
    Standard,
    Poisson,
    Variance,
    BlurVariance,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_kind_targets() {
        assert!(CameraKind::ArcRotate.requires_target());
        assert!(CameraKind::Follow.requires_target());
        assert!(!CameraKind::Free.requires_target());
    }

    #[test]
    fn test_light_kind_codes() {
        assert_eq!(LightKind::Point.code(), 0);
        assert_eq!(LightKind::Hemispheric.code(), 3);
    }

    #[test]
    fn test_camera_defaults() {
        let cam: CameraObject = serde_json::from_str(r#"{"name": "view"}"#).unwrap();
        assert_eq!(cam.kind, CameraKind::Free);
        assert_eq!(cam.ellipsoid, [0.2, 0.9, 0.2]);
        assert_eq!(cam.rig.code(), 0);
    }
}
