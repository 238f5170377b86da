//! Keyed animation tracks and action ranges.
//!
//! The document carries pre-sampled values per action; this module
//! concatenates actions into runtime tracks, packing each action's frames
//! behind the previous one with a gap rounded up to a multiple of 10.

use glam::{Mat4, Quat, Vec3};

use crate::document::{ActionSamples, Rotation};
use crate::export::json::JsonWriter;

/// Loop behavior code: restart the track when it ends.
pub const LOOP_MODE_CYCLE: u32 = 1;

/// Value arity of a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Vector3,
    Quaternion,
    Matrix,
}

impl TrackKind {
    /// Numeric data-type code in the scene file.
    pub fn code(self) -> u32 {
        match self {
            TrackKind::Vector3 => 1,
            TrackKind::Quaternion => 2,
            TrackKind::Matrix => 3,
        }
    }
}

/// One key value.
#[derive(Debug, Clone, Copy)]
pub enum KeyValue {
    Vector(Vec3),
    Quaternion(Quat),
    Matrix(Mat4),
}

/// A keyed track targeting one property of a scene object or bone.
#[derive(Debug, Clone)]
pub struct Track {
    pub kind: TrackKind,
    pub frames_per_second: u32,
    pub name: String,
    /// Property the runtime applies the keys to.
    pub property: String,
    pub frames: Vec<i32>,
    pub values: Vec<KeyValue>,
}

impl Track {
    pub fn new(kind: TrackKind, name: &str, property: &str, frames_per_second: u32) -> Self {
        Self {
            kind,
            frames_per_second,
            name: name.to_string(),
            property: property.to_string(),
            frames: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn push_key(&mut self, frame: i32, value: KeyValue) {
        self.frames.push(frame);
        self.values.push(value);
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn first_frame(&self) -> i32 {
        self.frames.first().copied().unwrap_or(-1)
    }

    pub fn last_frame(&self) -> i32 {
        self.frames.last().copied().unwrap_or(-1)
    }

    pub fn write(&self, w: &mut JsonWriter) {
        w.begin_object();
        w.prop_int("dataType", self.kind.code() as i64);
        w.prop_int("framePerSecond", self.frames_per_second as i64);
        w.key("keys");
        w.begin_array();
        for (frame, value) in self.frames.iter().zip(&self.values) {
            w.newline();
            w.begin_object();
            w.prop_int("frame", *frame as i64);
            match value {
                KeyValue::Vector(v) => w.prop_vector("values", *v),
                KeyValue::Quaternion(q) => w.prop_quaternion("values", *q),
                KeyValue::Matrix(m) => w.prop_matrix("values", m),
            }
            w.end_object();
        }
        w.end_array();
        w.prop_int("loopBehavior", LOOP_MODE_CYCLE as i64);
        w.prop_string("name", &self.name);
        w.prop_string("property", &self.property);
        w.end_object();
    }
}

/// The output frame span one action occupies after concatenation.
#[derive(Debug, Clone)]
pub struct AnimationRange {
    pub name: String,
    pub frame_start: i32,
    pub frame_end: i32,
}

impl AnimationRange {
    pub fn write(&self, w: &mut JsonWriter) {
        w.begin_object();
        w.prop_string("name", &self.name);
        w.prop_int("from", self.frame_start as i64);
        w.prop_int("to", self.frame_end as i64);
        w.end_object();
    }
}

/// First output frame for an action following `frame_offset`: a gap of at
/// least 5 frames, landing on a multiple of 10.
pub fn next_starting_frame(frame_offset: i32) -> i32 {
    if frame_offset == 0 {
        return 0;
    }
    let padded = frame_offset + 4;
    padded + 10 - padded % 10
}

/// Scale a vector component-wise, with an extra offset on x. Euler rotations
/// are negated this way on export.
pub fn scale_vector(v: Vec3, mult: f32, x_offset: f32) -> Vec3 {
    Vec3::new(v.x * mult + x_offset, v.y * mult, v.z * mult)
}

/// Post-rotate a quaternion about X by `angle`.
pub fn post_rotate_quaternion(q: Quat, angle: f32) -> Quat {
    Quat::from_mat3(&(glam::Mat3::from_quat(q) * glam::Mat3::from_rotation_x(angle)))
}

/// The animation block of one scene object: its tracks, the ranges they were
/// assembled from, and optional auto-start bounds.
#[derive(Debug, Clone, Default)]
pub struct ObjectAnimation {
    pub tracks: Vec<Track>,
    pub ranges: Vec<AnimationRange>,
    pub auto_animate: Option<(i32, i32)>,
}

impl ObjectAnimation {
    pub fn write(&self, w: &mut JsonWriter) {
        w.newline();
        w.key("animations");
        w.begin_array();
        for track in &self.tracks {
            track.write(w);
        }
        w.end_array();

        w.key("ranges");
        w.begin_array();
        for range in &self.ranges {
            range.write(w);
        }
        w.end_array();

        if let Some((from, to)) = self.auto_animate {
            w.prop_bool("autoAnimate", true);
            w.prop_int("autoAnimateFrom", from as i64);
            w.prop_int("autoAnimateTo", to as i64);
            w.prop_bool("autoAnimateLoop", true);
        }
    }
}

/// Which transform channels an object type animates.
#[derive(Debug, Clone, Copy)]
pub struct Channels {
    pub rotation: bool,
    pub position: bool,
    pub scaling: bool,
}

impl Channels {
    pub const ALL: Channels = Channels {
        rotation: true,
        position: true,
        scaling: true,
    };
    /// Cameras do not animate scaling.
    pub const CAMERA: Channels = Channels {
        rotation: true,
        position: true,
        scaling: false,
    };
    /// Lights only animate position.
    pub const LIGHT: Channels = Channels {
        rotation: false,
        position: true,
        scaling: false,
    };
}

/// Assemble the animation block of one object from its sampled actions.
///
/// `rotation_to_euler` converts quaternion samples to negated Euler tracks
/// (cameras); `x_offset_rotation` is added to the rotation track's x channel.
/// Returns `None` when no action carries data.
#[allow(clippy::too_many_arguments)]
pub fn build_object_animation(
    actions: &[ActionSamples],
    object_rotation: &Rotation,
    channels: Channels,
    rotation_to_euler: bool,
    x_offset_rotation: f32,
    frames_per_second: u32,
    auto_animate: bool,
    scene_frame_end: i32,
) -> Option<ObjectAnimation> {
    if actions.iter().all(|a| !a.has_data()) {
        return None;
    }

    let quaternion_mode = matches!(object_rotation, Rotation::Quaternion(_));
    let mut rotation_track = if quaternion_mode && !rotation_to_euler {
        Track::new(
            TrackKind::Quaternion,
            "rotationQuaternion animation",
            "rotationQuaternion",
            frames_per_second,
        )
    } else {
        Track::new(TrackKind::Vector3, "rotation animation", "rotation", frames_per_second)
    };
    let mut position_track =
        Track::new(TrackKind::Vector3, "position animation", "position", frames_per_second);
    let mut scaling_track =
        Track::new(TrackKind::Vector3, "scaling animation", "scaling", frames_per_second);

    let mut ranges = Vec::new();
    let mut frame_offset = 0;

    for action in actions {
        if action.frames.is_empty() || !action.has_data() {
            continue;
        }

        let frame_start = next_starting_frame(frame_offset);
        let out_frames: Vec<i32> = action.frames.iter().map(|f| frame_start + f).collect();

        for (idx, out_frame) in out_frames.iter().enumerate() {
            if channels.rotation {
                // samples are read in the object's rotation mode, matching the
                // track type chosen above
                if quaternion_mode {
                    if let Some(values) = &action.rotation_quaternion {
                        let q = Quat::from_array(values[idx]);
                        if rotation_to_euler {
                            let (ex, ey, ez) = q.to_euler(glam::EulerRot::XYZ);
                            let v = scale_vector(Vec3::new(ex, ey, ez), -1.0, x_offset_rotation);
                            rotation_track.push_key(*out_frame, KeyValue::Vector(v));
                        } else {
                            let q = post_rotate_quaternion(q, x_offset_rotation);
                            rotation_track.push_key(*out_frame, KeyValue::Quaternion(q));
                        }
                    }
                } else if let Some(values) = &action.rotation {
                    let v = scale_vector(Vec3::from_array(values[idx]), -1.0, x_offset_rotation);
                    rotation_track.push_key(*out_frame, KeyValue::Vector(v));
                }
            }
            if channels.position {
                if let Some(values) = &action.position {
                    position_track.push_key(*out_frame, KeyValue::Vector(Vec3::from_array(values[idx])));
                }
            }
            if channels.scaling {
                if let Some(values) = &action.scaling {
                    scaling_track.push_key(*out_frame, KeyValue::Vector(Vec3::from_array(values[idx])));
                }
            }
        }

        let frame_end = *out_frames.last().unwrap_or(&frame_start);
        ranges.push(AnimationRange {
            name: action.name.clone(),
            frame_start,
            frame_end,
        });
        frame_offset = frame_end;
    }

    let mut tracks = Vec::new();
    for track in [rotation_track, position_track, scaling_track] {
        if !track.is_empty() {
            tracks.push(track);
        }
    }
    if tracks.is_empty() {
        return None;
    }

    let auto_animate = auto_animate.then(|| {
        let mut from = scene_frame_end;
        let mut to = 0;
        for track in &tracks {
            from = from.min(track.first_frame());
            to = to.max(track.last_frame());
        }
        (from, to)
    });

    Some(ObjectAnimation {
        tracks,
        ranges,
        auto_animate,
    })
}
