//! Skeleton conversion.
//!
//! Bones arrive in armature space; the scene format wants each bone's matrix
//! relative to its parent, expressed in the runtime's coordinate system. The
//! conversion wraps both sides in the axis system matrix so the Y/Z handedness
//! flip cancels through the hierarchy.

use std::collections::HashMap;
use std::f32::consts::FRAC_PI_2;

use glam::{Mat4, Vec3};

use super::animation::{next_starting_frame, AnimationRange, KeyValue, Track, TrackKind};
use crate::document::{mat4_from_rows, Armature, BoneDef};
use crate::error::{ExportError, Result};
use crate::export::json::JsonWriter;
use crate::log::ExportLog;
use crate::types::same_mat4;

/// Axis conversion applied around every bone matrix: mirror Z, then rotate
/// -90 degrees about X.
fn system_matrix() -> Mat4 {
    Mat4::from_scale(Vec3::new(1.0, 1.0, -1.0)) * Mat4::from_rotation_x(-FRAC_PI_2)
}

/// Convert an armature-space bone matrix to parent space under the system
/// matrix. Root bones keep the full conversion.
fn bone_matrix(world: Mat4, bone: Mat4, parent: Option<Mat4>) -> Mat4 {
    let sys = system_matrix();
    match parent {
        Some(parent) => (sys * world * parent).inverse() * (sys * world * bone),
        None => sys * world * bone,
    }
}

/// Bones whose names mark them as IK helpers, skipped on request.
fn is_ik_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.contains(".ik") || lower.contains("ik.")
}

/// One exported bone.
#[derive(Debug, Clone)]
pub struct ExportBone {
    pub name: String,
    pub index: u32,
    /// Pose matrix in parent space.
    pub matrix: Mat4,
    /// Rest matrix in parent space.
    pub rest: Mat4,
    /// -1 for root bones.
    pub parent_index: i32,
    pub length: f32,
    /// Matrix track over the sampled actions, when the armature is animated.
    pub animation: Option<Track>,
}

/// An exported skeleton.
#[derive(Debug, Clone)]
pub struct ExportSkeleton {
    pub name: String,
    pub id: u32,
    pub bones: Vec<ExportBone>,
    /// Extent of the rest pose, for runtime bounding.
    pub dimensions: Vec3,
    pub ranges: Vec<AnimationRange>,
}

impl ExportSkeleton {
    /// Convert one armature. Bone order follows the document; IK bones are
    /// dropped when `ignore_ik_bones` is set, remapping the indices below them.
    pub fn build(
        doc: &Armature,
        id: u32,
        ignore_ik_bones: bool,
        frames_per_second: u32,
        log: &mut ExportLog,
    ) -> Result<Self> {
        log.log(1, &format!("processing begun of skeleton:  {}, id:  {id}", doc.name));

        let world = mat4_from_rows(&doc.world_matrix);
        let animated = !doc.actions.is_empty();

        let mut bones = Vec::new();
        for bone in &doc.bones {
            if ignore_ik_bones && is_ik_name(&bone.name) {
                log.log(2, &format!("Ignoring IK bone:  {}", bone.name));
                continue;
            }

            let index = bones.len() as u32;
            log.log(2, &format!("processing begun of bone:  {}, index:  {index}", bone.name));

            let parent_def = Self::parent_def(doc, bone)?;
            let parent_index = match &bone.parent {
                Some(parent_name) => {
                    bones
                        .iter()
                        .position(|b: &ExportBone| &b.name == parent_name)
                        .ok_or_else(|| ExportError::BoneNotFound(parent_name.clone()))?
                        as i32
                }
                None => -1,
            };

            let matrix = bone_matrix(
                world,
                mat4_from_rows(&bone.pose_matrix),
                parent_def.map(|p| mat4_from_rows(&p.pose_matrix)),
            );
            let rest = bone_matrix(
                world,
                mat4_from_rows(&bone.rest_matrix),
                parent_def.map(|p| mat4_from_rows(&p.rest_matrix)),
            );

            bones.push(ExportBone {
                name: bone.name.clone(),
                index,
                matrix,
                rest,
                parent_index,
                length: bone.length,
                animation: animated.then(|| {
                    Track::new(TrackKind::Matrix, "anim", "_matrix", frames_per_second)
                }),
            });
        }

        let mut skeleton = Self {
            name: doc.name.clone(),
            id,
            bones,
            dimensions: rest_dimensions(doc),
            ranges: Vec::new(),
        };

        if animated {
            skeleton.append_actions(doc, world, log)?;
        }

        Ok(skeleton)
    }

    fn parent_def<'a>(doc: &'a Armature, bone: &BoneDef) -> Result<Option<&'a BoneDef>> {
        match &bone.parent {
            None => Ok(None),
            Some(parent_name) => doc
                .bones
                .iter()
                .find(|b| &b.name == parent_name)
                .map(Some)
                .ok_or_else(|| ExportError::BoneNotFound(parent_name.clone())),
        }
    }

    /// Sample each action into the bones' matrix tracks, deduplicating keys
    /// that repeat the previous pose except at range boundaries.
    fn append_actions(&mut self, doc: &Armature, world: Mat4, log: &mut ExportLog) -> Result<()> {
        let mut frame_offset = 0;

        for action in &doc.actions {
            if action.frames.is_empty() {
                continue;
            }
            if action.poses.len() != action.frames.len() {
                return Err(ExportError::InvalidDocument(format!(
                    "armature '{}' action '{}': {} pose snapshots for {} frames",
                    doc.name,
                    action.name,
                    action.poses.len(),
                    action.frames.len()
                )));
            }

            let frame_start = next_starting_frame(frame_offset);
            let frame_end = frame_start + action.frames.last().copied().unwrap_or(0);
            log.log(2, &format!(
                "processing action {}:  in[{} - {}], out[{frame_start} - {frame_end}]",
                action.name,
                action.frames.first().copied().unwrap_or(0),
                action.frames.last().copied().unwrap_or(0),
            ));

            let n_frames = action.frames.len();
            let mut previous: Vec<Option<Mat4>> = vec![None; self.bones.len()];

            for (idx, frame) in action.frames.iter().enumerate() {
                let snapshot = &action.poses[idx];
                let out_frame = frame_start + frame;
                let first_or_last = idx == 0 || idx == n_frames - 1;

                for (slot, bone) in self.bones.iter_mut().enumerate() {
                    let def = doc
                        .bones
                        .iter()
                        .find(|b| b.name == bone.name)
                        .ok_or_else(|| ExportError::BoneNotFound(bone.name.clone()))?;

                    let pose = snapshot_pose(snapshot, def);
                    let parent_pose = match &def.parent {
                        Some(parent_name) => {
                            let parent = doc
                                .bones
                                .iter()
                                .find(|b| &b.name == parent_name)
                                .ok_or_else(|| ExportError::BoneNotFound(parent_name.clone()))?;
                            Some(snapshot_pose(snapshot, parent))
                        }
                        None => None,
                    };
                    let matrix = bone_matrix(world, pose, parent_pose);

                    let changed = previous[slot].map_or(true, |prev| !same_mat4(&matrix, &prev));
                    if first_or_last || changed {
                        if let Some(track) = &mut bone.animation {
                            track.push_key(out_frame, KeyValue::Matrix(matrix));
                        }
                        previous[slot] = Some(matrix);
                    }
                }
            }

            self.ranges.push(AnimationRange {
                name: action.name.clone(),
                frame_start,
                frame_end,
            });
            frame_offset = frame_end;
        }

        Ok(())
    }

    /// Index of a bone by name, after IK skipping.
    pub fn bone_index(&self, name: &str) -> Option<u32> {
        self.bones.iter().find(|b| b.name == name).map(|b| b.index)
    }

    pub fn write(&self, w: &mut JsonWriter) {
        w.begin_object();
        w.prop_string("name", &self.name);
        w.prop_int("id", self.id as i64);
        w.prop_vector("dimensionsAtRest", self.dimensions);

        w.key("bones");
        w.begin_array();
        for bone in &self.bones {
            w.newline();
            w.begin_object();
            w.prop_string("name", &bone.name);
            w.prop_int("index", bone.index as i64);
            w.prop_matrix("matrix", &bone.matrix);
            w.prop_matrix("rest", &bone.rest);
            w.prop_int("parentBoneIndex", bone.parent_index as i64);
            w.prop_f("length", bone.length);
            if let Some(track) = &bone.animation {
                w.newline();
                w.key("animation");
                track.write(w);
            }
            w.end_object();
        }
        w.end_array();

        if !self.ranges.is_empty() {
            w.newline();
            w.key("ranges");
            w.begin_array();
            for range in &self.ranges {
                range.write(w);
            }
            w.end_array();
        }
        w.end_object();
    }
}

fn snapshot_pose(snapshot: &HashMap<String, [[f32; 4]; 4]>, bone: &BoneDef) -> Mat4 {
    snapshot
        .get(&bone.name)
        .map(mat4_from_rows)
        .unwrap_or_else(|| mat4_from_rows(&bone.pose_matrix))
}

/// Extent of the rest pose over all kept bone heads and tails. The document's
/// own dimensions are not trusted; they may include IK bones.
fn rest_dimensions(doc: &Armature) -> Vec3 {
    let mut lowest = Vec3::splat(10_000.0);
    let mut highest = Vec3::splat(-10_000.0);

    for bone in &doc.bones {
        for point in [bone.rest_head, bone.rest_tail] {
            let p = Vec3::from_array(point);
            lowest = lowest.min(p);
            highest = highest.max(p);
        }
    }

    highest - lowest
}
