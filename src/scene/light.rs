//! Light and shadow-generator conversion.

use glam::Vec3;

use super::animation::{build_object_animation, Channels, ObjectAnimation};
use crate::document::{LightKind, LightObject, ShadowKind, ShadowSettings};
use crate::export::json::JsonWriter;
use crate::log::ExportLog;

const BLACK: [f32; 3] = [0.0, 0.0, 0.0];

/// An exported light.
#[derive(Debug, Clone)]
pub struct ExportLight {
    pub name: String,
    pub parent_id: Option<String>,
    pub kind: LightKind,
    pub position: Option<Vec3>,
    pub direction: Option<Vec3>,
    pub angle: Option<f32>,
    pub exponent: Option<f32>,
    pub ground_color: Option<[f32; 3]>,
    pub range: Option<f32>,
    pub intensity: f32,
    pub diffuse: [f32; 3],
    pub specular: [f32; 3],
    pub included_only_meshes: Vec<String>,
    pub animation: Option<ObjectAnimation>,
}

impl ExportLight {
    /// Convert one light. `nodes` supplies (name, layer) pairs of every mesh
    /// and node, for layer-restricted lights.
    pub fn build(
        doc: &LightObject,
        nodes: &[(String, i32)],
        frames_per_second: u32,
        scene_frame_end: i32,
        log: &mut ExportLog,
    ) -> Self {
        log.log(0, &format!("processing begun of light ({:?}):  {}", doc.kind, doc.name));

        let direction = doc.direction.map(Vec3::from_array);
        let (position, direction, angle, exponent, ground_color, range) = match doc.kind {
            LightKind::Point => (
                Some(Vec3::from_array(doc.position)),
                None,
                None,
                None,
                None,
                doc.range,
            ),
            LightKind::Directional => (
                Some(Vec3::from_array(doc.position)),
                direction,
                None,
                None,
                None,
                None,
            ),
            LightKind::Spot => (
                Some(Vec3::from_array(doc.position)),
                direction,
                doc.angle,
                doc.exponent,
                None,
                doc.range,
            ),
            // the scene format treats hemi direction as the up axis; lamps
            // point down it
            LightKind::Hemispheric => (
                None,
                direction.map(|d| -d),
                None,
                None,
                Some(BLACK),
                None,
            ),
        };

        let included_only_meshes = if doc.only_own_layer {
            nodes
                .iter()
                .filter(|(_, layer)| *layer == doc.layer)
                .map(|(name, _)| name.clone())
                .collect()
        } else {
            Vec::new()
        };

        let animation = build_object_animation(
            &doc.actions,
            &crate::document::Rotation::default(),
            Channels::LIGHT,
            false,
            0.0,
            frames_per_second,
            doc.auto_animate,
            scene_frame_end,
        );

        Self {
            name: doc.name.clone(),
            parent_id: doc.parent.clone(),
            kind: doc.kind,
            position,
            direction,
            angle,
            exponent,
            ground_color,
            range,
            intensity: doc.intensity,
            diffuse: if doc.use_diffuse { doc.color } else { BLACK },
            specular: if doc.use_specular { doc.color } else { BLACK },
            included_only_meshes,
            animation,
        }
    }

    pub fn write(&self, w: &mut JsonWriter) {
        w.begin_object();
        w.prop_string("name", &self.name);
        w.prop_string("id", &self.name);
        w.prop_f("type", self.kind.code() as f32);

        if let Some(parent_id) = &self.parent_id {
            w.prop_string("parentId", parent_id);
        }
        if let Some(position) = self.position {
            w.prop_vector("position", position);
        }
        if let Some(direction) = self.direction {
            w.prop_vector("direction", direction);
        }
        if let Some(angle) = self.angle {
            w.prop_f("angle", angle);
        }
        if let Some(exponent) = self.exponent {
            w.prop_f("exponent", exponent);
        }
        if let Some(ground_color) = self.ground_color {
            w.prop_color("groundColor", ground_color);
        }
        if let Some(range) = self.range {
            w.prop_f("range", range);
        }

        w.prop_f("intensity", self.intensity);
        w.prop_color("diffuse", self.diffuse);
        w.prop_color("specular", self.specular);

        if !self.included_only_meshes.is_empty() {
            w.key("includedOnlyMeshesIds");
            w.begin_array();
            for name in &self.included_only_meshes {
                w.value_string(name);
            }
            w.end_array();
        }

        if let Some(animation) = &self.animation {
            animation.write(w);
        }
        w.end_object();
    }
}

/// An exported shadow generator: one per shadow-casting light.
#[derive(Debug, Clone)]
pub struct ShadowGenerator {
    pub light_id: String,
    pub map_size: u32,
    pub bias: f32,
    pub kind: ShadowKind,
    pub blur_scale: u32,
    pub blur_box_offset: u32,
    /// Names of every shadow-casting mesh in the scene.
    pub render_list: Vec<String>,
}

impl ShadowGenerator {
    /// Build from a light's shadow settings; only directional and spot lights
    /// qualify, which the caller enforces.
    pub fn build(light: &LightObject, settings: &ShadowSettings, casters: Vec<String>, log: &mut ExportLog) -> Self {
        log.log(0, &format!("processing begun of shadows for light:  {}", light.name));
        Self {
            light_id: light.name.clone(),
            map_size: settings.map_size,
            bias: settings.bias,
            kind: settings.kind,
            blur_scale: settings.blur_scale,
            blur_box_offset: settings.blur_box_offset,
            render_list: casters,
        }
    }

    pub fn write(&self, w: &mut JsonWriter) {
        w.begin_object();
        w.prop_int("mapSize", self.map_size as i64);
        w.prop_string("lightId", &self.light_id);
        w.prop_f("bias", self.bias);

        match self.kind {
            ShadowKind::Variance => w.prop_bool("useVarianceShadowMap", true),
            ShadowKind::Poisson => w.prop_bool("usePoissonSampling", true),
            ShadowKind::BlurVariance => {
                w.prop_bool("useBlurVarianceShadowMap", true);
                w.prop_int("blurScale", self.blur_scale as i64);
                w.prop_int("blurBoxOffset", self.blur_box_offset as i64);
            }
            ShadowKind::Standard => {}
        }

        w.key("renderList");
        w.begin_array();
        for caster in &self.render_list {
            w.value_string(caster);
        }
        w.end_array();
        w.end_object();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn light(kind: &str) -> LightObject {
        serde_json::from_value(serde_json::json!({
            "name": "lamp",
            "kind": kind,
            "position": [1.0, 2.0, 3.0],
            "direction": [0.0, 0.0, -1.0],
            "angle": 0.5,
            "exponent": 1.2,
        }))
        .unwrap()
    }

    #[test]
    fn test_point_light_has_no_direction() {
        let l = ExportLight::build(&light("point"), &[], 24, 100, &mut ExportLog::discard());
        assert!(l.direction.is_none());
        assert!(l.position.is_some());
    }

    #[test]
    fn test_hemispheric_direction_flipped() {
        let l = ExportLight::build(&light("hemispheric"), &[], 24, 100, &mut ExportLog::discard());
        assert_eq!(l.direction.unwrap(), Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(l.ground_color, Some([0.0, 0.0, 0.0]));
        assert!(l.position.is_none());
    }

    #[test]
    fn test_disabled_specular_goes_black() {
        let mut doc = light("point");
        doc.color = [1.0, 0.5, 0.25];
        doc.use_specular = false;
        let l = ExportLight::build(&doc, &[], 24, 100, &mut ExportLog::discard());
        assert_eq!(l.diffuse, [1.0, 0.5, 0.25]);
        assert_eq!(l.specular, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_layer_restriction() {
        let mut doc = light("spot");
        doc.only_own_layer = true;
        doc.layer = 2;
        let nodes = vec![
            ("floor".to_string(), 2),
            ("sky".to_string(), 0),
            ("wall".to_string(), 2),
        ];
        let l = ExportLight::build(&doc, &nodes, 24, 100, &mut ExportLog::discard());
        assert_eq!(l.included_only_meshes, vec!["floor", "wall"]);
    }

    #[test]
    fn test_shadow_generator_flags() {
        let doc = light("directional");
        let settings = ShadowSettings {
            kind: ShadowKind::BlurVariance,
            map_size: 1024,
            bias: 0.0001,
            blur_scale: 2,
            blur_box_offset: 1,
        };
        let generator = ShadowGenerator::build(
            &doc,
            &settings,
            vec!["hero".to_string()],
            &mut ExportLog::discard(),
        );

        let mut w = JsonWriter::new();
        generator.write(&mut w);
        let out = w.finish();
        assert!(out.contains(r#""useBlurVarianceShadowMap":true"#));
        assert!(out.contains(r#""blurScale":2"#));
        assert!(out.contains(r#""renderList":["hero"]"#));
    }
}
