//! Scene-level environment properties.

use glam::Vec3;

use crate::document::{Fog, SceneDocument, World};
use crate::export::json::JsonWriter;

/// Exported environment block: the scalar properties at the top of the scene
/// file.
#[derive(Debug, Clone)]
pub struct ExportWorld {
    pub clear_color: [f32; 3],
    pub ambient_color: [f32; 3],
    pub gravity: Vec3,
    pub fog: Option<Fog>,
}

impl ExportWorld {
    pub fn build(doc: &SceneDocument) -> Self {
        let world = doc.world.clone().unwrap_or_else(World::default);
        Self {
            clear_color: world.clear_color,
            ambient_color: world.ambient_color,
            gravity: Vec3::from_array(doc.gravity),
            fog: world.fog,
        }
    }

    /// Writes into the already-open top-level object.
    pub fn write(&self, w: &mut JsonWriter, needs_physics: bool) {
        w.prop_bool("autoClear", true);
        w.prop_color("clearColor", self.clear_color);
        w.prop_color("ambientColor", self.ambient_color);
        w.prop_vector("gravity", self.gravity);

        if needs_physics {
            w.prop_bool("physicsEnabled", true);
        }

        if let Some(fog) = &self.fog {
            w.prop_int("fogMode", fog.mode.code() as i64);
            w.prop_color("fogColor", fog.color);
            w.prop_f("fogStart", fog.start);
            w.prop_f("fogEnd", fog.end);
            w.prop_f("fogDensity", fog.density);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::FogMode;

    #[test]
    fn test_defaults_without_world() {
        let doc = SceneDocument::default();
        let world = ExportWorld::build(&doc);
        assert_eq!(world.ambient_color, [0.2, 0.2, 0.3]);
        assert!(world.fog.is_none());
    }

    #[test]
    fn test_write_with_fog() {
        let doc: SceneDocument = serde_json::from_str(
            r#"{
                "world": {
                    "fog": {"mode": "linear", "color": [0.5, 0.5, 0.5], "start": 5.0, "end": 40.0}
                }
            }"#,
        )
        .unwrap();
        let world = ExportWorld::build(&doc);
        assert_eq!(world.fog.as_ref().unwrap().mode, FogMode::Linear);

        let mut w = JsonWriter::new();
        w.begin_object();
        world.write(&mut w, true);
        w.end_object();
        let out = w.finish();
        assert!(out.contains(r#""fogMode":3"#));
        assert!(out.contains(r#""physicsEnabled":true"#));
        // gravity is axis-swapped: (0, -9.81, 0) after the Y/Z swap
        assert!(out.contains(r#""gravity":[0,-9.81,0]"#));
    }
}
