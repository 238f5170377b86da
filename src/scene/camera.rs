//! Camera conversion.

use std::f32::consts::FRAC_PI_2;

use glam::{Quat, Vec3};

use super::animation::{build_object_animation, Channels, ObjectAnimation};
use crate::document::{CameraKind, CameraObject, Rotation};
use crate::export::json::JsonWriter;
use crate::log::ExportLog;

/// An exported camera.
#[derive(Debug, Clone)]
pub struct ExportCamera {
    pub name: String,
    pub parent_id: Option<String>,
    pub kind: CameraKind,
    pub position: Vec3,
    /// Euler rotation after the exporter's view-orientation remap.
    pub rotation: Vec3,
    pub fov: f32,
    pub min_z: f32,
    pub max_z: f32,
    pub speed: f32,
    pub inertia: f32,
    pub check_collisions: bool,
    pub apply_gravity: bool,
    pub ellipsoid: [f32; 3],
    pub rig_mode: u32,
    pub interaxial_distance: f32,
    pub locked_target_id: Option<String>,
    /// Derived follow-camera parameters: (height, distance, rotation).
    pub follow: Option<(f32, f32, f32)>,
    /// Derived arc-rotate parameters: (alpha, beta, radius).
    pub arc_rotate: Option<(f32, f32, f32)>,
    pub animation: Option<ObjectAnimation>,
}

impl ExportCamera {
    /// Convert one camera. Returns `None` when a camera kind that requires a
    /// locked target has none; the camera is skipped with a warning rather
    /// than emitting an entry the runtime cannot construct.
    pub fn build(
        doc: &CameraObject,
        frames_per_second: u32,
        scene_frame_end: i32,
        log: &mut ExportLog,
    ) -> Option<Self> {
        log.log(0, &format!(
            "processing begun of camera ({}):  {}",
            doc.kind.type_name(),
            doc.name
        ));

        if doc.kind.requires_target() && doc.locked_target.is_none() {
            log.warn(2, "Camera type with mandatory target specified, but no target to track set.  Ignored");
            return None;
        }

        // camera rotation is remapped into view orientation: pitch flipped a
        // quarter turn, yaw negated
        let eul = match &doc.rotation {
            Rotation::Euler(e) => Vec3::from_array(*e),
            Rotation::Quaternion(q) => {
                let (x, y, z) = Quat::from_array(*q).to_euler(glam::EulerRot::XYZ);
                Vec3::new(x, y, z)
            }
        };
        let rotation = Vec3::new(-eul.x + FRAC_PI_2, eul.y, -eul.z);

        let animation = build_object_animation(
            &doc.actions,
            &doc.rotation,
            Channels::CAMERA,
            true,
            FRAC_PI_2,
            frames_per_second,
            doc.auto_animate,
            scene_frame_end,
        );

        Some(Self {
            name: doc.name.clone(),
            parent_id: doc.parent.clone(),
            kind: doc.kind,
            position: Vec3::from_array(doc.position),
            rotation,
            fov: doc.fov,
            min_z: doc.clip_start,
            max_z: doc.clip_end,
            speed: 1.0,
            inertia: 0.9,
            check_collisions: doc.check_collisions,
            apply_gravity: doc.apply_gravity,
            ellipsoid: doc.ellipsoid,
            rig_mode: doc.rig.code(),
            interaxial_distance: doc.interaxial_distance,
            locked_target_id: doc.locked_target.clone(),
            follow: None,
            arc_rotate: None,
            animation,
        })
    }

    /// Derive follow / arc-rotate parameters from the tracked object's
    /// position, once all meshes and nodes are built. An unknown target falls
    /// back to a fixed 3-unit offset on each axis.
    pub fn update_for_target(&mut self, targets: &[(String, Vec3)]) {
        let Some(target_id) = &self.locked_target_id else {
            return;
        };

        let apart = match targets.iter().find(|(name, _)| name == target_id) {
            Some((_, target_position)) => self.position - *target_position,
            None => Vec3::splat(3.0),
        };

        let distance = apart.length();
        let alpha = apart.y.atan2(apart.x);
        let beta = apart.y.atan2(apart.z);

        match self.kind {
            CameraKind::Follow => {
                self.follow = Some((apart.z, distance, 90.0 + alpha.to_degrees()));
            }
            CameraKind::ArcRotate => {
                self.arc_rotate = Some((alpha, beta, distance));
            }
            _ => {}
        }
    }

    pub fn write(&self, w: &mut JsonWriter) {
        w.begin_object();
        w.prop_string("name", &self.name);
        w.prop_string("id", &self.name);
        w.prop_vector("position", self.position);
        w.prop_vector("rotation", self.rotation);
        w.prop_f("fov", self.fov);
        w.prop_f("minZ", self.min_z);
        w.prop_f("maxZ", self.max_z);
        w.prop_f("speed", self.speed);
        w.prop_f("inertia", self.inertia);
        w.prop_bool("checkCollisions", self.check_collisions);
        w.prop_bool("applyGravity", self.apply_gravity);
        w.key("ellipsoid");
        w.begin_array();
        for v in self.ellipsoid {
            w.value_f(v);
        }
        w.end_array();

        // the rig is always written, even when none: a VR camera can carry a
        // non-default rig
        w.prop_int("cameraRigMode", self.rig_mode as i64);
        w.prop_f("interaxial_distance", self.interaxial_distance);
        w.prop_string("type", self.kind.type_name());

        if let Some(parent_id) = &self.parent_id {
            w.prop_string("parentId", parent_id);
        }

        if let Some((height, distance, rotation)) = self.follow {
            w.prop_f("heightOffset", height);
            w.prop_f("radius", distance);
            w.prop_f("rotationOffset", rotation);
        } else if let Some((alpha, beta, radius)) = self.arc_rotate {
            w.prop_f("alpha", alpha);
            w.prop_f("beta", beta);
            w.prop_f("radius", radius);
        }

        if let Some(target_id) = &self.locked_target_id {
            w.prop_string("lockedTargetId", target_id);
        }

        if let Some(animation) = &self.animation {
            animation.write(w);
        }
        w.end_object();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera(kind: &str, target: Option<&str>) -> CameraObject {
        serde_json::from_value(serde_json::json!({
            "name": "view",
            "kind": kind,
            "position": [0.0, 3.0, 4.0],
            "locked_target": target,
        }))
        .unwrap()
    }

    #[test]
    fn test_mandatory_target_missing_skips_camera() {
        let mut log = ExportLog::discard();
        assert!(ExportCamera::build(&camera("arc_rotate", None), 24, 100, &mut log).is_none());
        assert_eq!(log.warning_count(), 1);
        assert!(ExportCamera::build(&camera("free", None), 24, 100, &mut log).is_some());
    }

    #[test]
    fn test_rotation_remap() {
        let doc: CameraObject = serde_json::from_value(serde_json::json!({
            "name": "view",
            "rotation": [0.2, 0.4, 0.6],
        }))
        .unwrap();
        let cam = ExportCamera::build(&doc, 24, 100, &mut ExportLog::discard()).unwrap();
        assert!((cam.rotation.x - (-0.2 + FRAC_PI_2)).abs() < 1e-6);
        assert!((cam.rotation.y - 0.4).abs() < 1e-6);
        assert!((cam.rotation.z - (-0.6)).abs() < 1e-6);
    }

    #[test]
    fn test_arc_rotate_derivation() {
        let mut cam = ExportCamera::build(
            &camera("arc_rotate", Some("hero")),
            24,
            100,
            &mut ExportLog::discard(),
        )
        .unwrap();
        cam.update_for_target(&[("hero".to_string(), Vec3::new(0.0, 0.0, 0.0))]);
        let (_alpha, _beta, radius) = cam.arc_rotate.unwrap();
        assert!((radius - 5.0).abs() < 1e-5); // 3-4-5 triangle
    }

    #[test]
    fn test_unknown_target_uses_default_offset() {
        let mut cam = ExportCamera::build(
            &camera("follow", Some("ghost")),
            24,
            100,
            &mut ExportLog::discard(),
        )
        .unwrap();
        cam.update_for_target(&[]);
        let (height, distance, _rotation) = cam.follow.unwrap();
        assert_eq!(height, 3.0);
        assert!((distance - 3.0_f32 * 3.0_f32.sqrt()).abs() < 1e-5);
    }
}
