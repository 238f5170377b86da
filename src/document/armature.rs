//! Armatures: bone hierarchies with pre-sampled pose animation.
//!
//! The host samples bone poses itself (it owns the animation system); the
//! document carries one armature-space matrix per bone per keyframe, so the
//! exporter never has to drive a frame pointer.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A bone hierarchy, with optional sampled actions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Armature {
    pub name: String,
    /// World matrix of the armature object, row-major.
    #[serde(default = "identity_rows")]
    pub world_matrix: [[f32; 4]; 4],
    /// Bones in host order; parents must precede their children.
    pub bones: Vec<BoneDef>,
    #[serde(default)]
    pub actions: Vec<PoseAction>,
}

/// One bone of an armature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoneDef {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub length: f32,
    /// Current pose matrix in armature space, row-major.
    #[serde(default = "identity_rows")]
    pub pose_matrix: [[f32; 4]; 4],
    /// Rest (edit) matrix in armature space, row-major.
    #[serde(default = "identity_rows")]
    pub rest_matrix: [[f32; 4]; 4],
    pub rest_head: [f32; 3],
    pub rest_tail: [f32; 3],
}

/// One action's worth of sampled poses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoseAction {
    pub name: String,
    pub frames: Vec<i32>,
    /// One snapshot per frame: bone name to armature-space pose matrix
    /// (row-major). Bones missing from a snapshot hold their document pose.
    pub poses: Vec<HashMap<String, [[f32; 4]; 4]>>,
}

fn identity_rows() -> [[f32; 4]; 4] {
    [
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_armature_defaults() {
        let arm: Armature = serde_json::from_str(
            r#"{
                "name": "rig",
                "bones": [
                    {"name": "root", "rest_head": [0, 0, 0], "rest_tail": [0, 1, 0]}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(arm.bones.len(), 1);
        assert_eq!(arm.world_matrix[0][0], 1.0);
        assert!(arm.actions.is_empty());
    }
}
