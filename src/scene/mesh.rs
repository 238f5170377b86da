//! Mesh chunk building: welding, sub-mesh partitioning, skinning, instances.
//!
//! One document mesh normally becomes one chunk. When welding would push past
//! the vertex ceiling, traversal halts at the offending face and the walk
//! creates follow-up chunks parented to the first, resuming where the previous
//! chunk stopped.

use glam::{Quat, Vec2, Vec3};

use super::animation::{build_object_animation, Channels, ObjectAnimation};
use super::armature::ExportSkeleton;
use super::skinning::{pack_bone_indices, to_fixed_influencers, InfluenceStats};
use super::welder::{Corner, VertexWelder};
use super::{ExportConfig, ExportContext};
use crate::document::{Empty, Geometry, MeshObject, Rotation, SceneDocument};
use crate::error::Result;
use crate::export::json::{format_f, JsonWriter};
use crate::types::{MAX_VERTEX_ELEMENTS, MAX_VERTEX_ELEMENTS_32BIT};

/// Billboard mode codes in the scene format.
const BILLBOARDMODE_NONE: u32 = 0;
const BILLBOARDMODE_ALL: u32 = 7;

/// Where a follow-up chunk resumes traversal after an overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkResume {
    pub material_index: u32,
    pub face_start: usize,
}

/// A contiguous slice of one chunk's buffers, all faces on one material slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubMesh {
    pub material_index: u32,
    pub vertices_start: u32,
    pub index_start: u32,
    pub vertices_count: u32,
    pub index_count: u32,
}

impl SubMesh {
    pub fn write(&self, w: &mut JsonWriter) {
        w.begin_object();
        w.prop_int("materialIndex", self.material_index as i64);
        w.prop_int("verticesStart", self.vertices_start as i64);
        w.prop_int("verticesCount", self.vertices_count as i64);
        w.prop_int("indexStart", self.index_start as i64);
        w.prop_int("indexCount", self.index_count as i64);
        w.end_object();
    }
}

/// Rotation of an exported object, preserving the source mode.
#[derive(Debug, Clone, Copy)]
pub enum RotationValue {
    Euler(Vec3),
    Quaternion(Quat),
}

impl RotationValue {
    /// Euler rotations are sign-flipped for the runtime's convention;
    /// quaternions are handled by the writer's component swap instead.
    pub fn from_doc(rotation: &Rotation) -> Self {
        match rotation {
            Rotation::Euler(e) => RotationValue::Euler(-Vec3::from_array(*e)),
            Rotation::Quaternion(q) => RotationValue::Quaternion(Quat::from_array(*q)),
        }
    }

    pub fn write(&self, w: &mut JsonWriter) {
        match self {
            RotationValue::Euler(e) => w.prop_vector("rotation", *e),
            RotationValue::Quaternion(q) => w.prop_quaternion("rotationQuaternion", *q),
        }
    }

    pub fn is_quaternion(&self) -> bool {
        matches!(self, RotationValue::Quaternion(_))
    }
}

/// A lightweight copy of a mesh sharing a previously built mesh's buffers.
#[derive(Debug, Clone)]
pub struct MeshInstance {
    pub name: String,
    pub position: Vec3,
    pub rotation: RotationValue,
    pub scaling: Vec3,
    pub freeze_world_matrix: bool,
}

impl MeshInstance {
    /// Build an instance record from a document mesh, matching the rotation
    /// mode of the source mesh it attaches to.
    pub fn from_doc(mesh: &MeshObject, source_uses_quaternion: bool) -> Self {
        let rotation = match (&mesh.transform.rotation, source_uses_quaternion) {
            (Rotation::Euler(e), true) => {
                RotationValue::Quaternion(euler_to_quat(Vec3::from_array(*e)))
            }
            (Rotation::Quaternion(q), false) => {
                let (x, y, z) = Quat::from_array(*q).to_euler(glam::EulerRot::XYZ);
                RotationValue::Euler(-Vec3::new(x, y, z))
            }
            _ => RotationValue::from_doc(&mesh.transform.rotation),
        };
        Self {
            name: mesh.name.clone(),
            position: Vec3::from_array(mesh.transform.position),
            rotation,
            scaling: Vec3::from_array(mesh.transform.scaling),
            freeze_world_matrix: mesh.freeze_world_matrix,
        }
    }

    pub fn write(&self, w: &mut JsonWriter) {
        w.begin_object();
        w.prop_string("name", &self.name);
        w.prop_vector("position", self.position);
        self.rotation.write(w);
        w.prop_vector("scaling", self.scaling);
        w.prop_bool("freezeWorldMatrix", self.freeze_world_matrix);
        w.end_object();
    }
}

fn euler_to_quat(e: Vec3) -> Quat {
    Quat::from_euler(glam::EulerRot::XYZ, e.x, e.y, e.z)
}

/// One exported mesh chunk.
#[derive(Debug, Clone)]
pub struct ExportMesh {
    pub name: String,
    /// Geometry id instances attach by.
    pub data_name: String,
    pub parent_id: Option<String>,
    pub material_id: Option<String>,
    pub billboard_mode: u32,
    pub position: Vec3,
    pub rotation: RotationValue,
    pub scaling: Vec3,
    pub is_visible: bool,
    pub is_enabled: bool,
    pub check_collisions: bool,
    pub receive_shadows: bool,
    pub cast_shadows: bool,
    pub freeze_world_matrix: bool,
    pub layer: i32,
    pub has_unapplied_transforms: bool,
    /// (impostor code, mass, friction, restitution)
    pub physics: Option<(u32, f32, f32, f32)>,
    pub skeleton_id: Option<u32>,
    pub num_bone_influencers: Option<u32>,

    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<f32>,
    pub uvs2: Vec<f32>,
    pub colors: Vec<f32>,
    pub skeleton_weights: Vec<f32>,
    pub skeleton_indices: Vec<i64>,
    pub skeleton_weights_extra: Vec<f32>,
    pub skeleton_indices_extra: Vec<i64>,
    pub indices: Vec<u32>,
    pub sub_meshes: Vec<SubMesh>,

    pub animation: Option<ObjectAnimation>,
    pub instances: Vec<MeshInstance>,
    /// Set when traversal halted at the vertex ceiling; the walk resumes in a
    /// new chunk from here.
    pub resume: Option<ChunkResume>,
}

impl ExportMesh {
    /// Build one chunk of a document mesh.
    ///
    /// `name_suffix` distinguishes follow-up chunks; `forced_parent` parents
    /// them to the first chunk with an identity transform.
    pub fn build(
        mesh: &MeshObject,
        doc: &SceneDocument,
        resume_from: Option<ChunkResume>,
        forced_parent: Option<&str>,
        name_suffix: &str,
        skeletons: &[ExportSkeleton],
        cfg: &ExportConfig,
        ctx: &mut ExportContext,
    ) -> Result<ExportMesh> {
        let name = format!("{}{}", mesh.name, name_suffix);
        ctx.log.log(0, &format!("processing begun of mesh:  {name}"));

        let flat_shading = cfg.flat_shade_scene || mesh.flat_shading;
        let geometry = &mesh.geometry;

        // skeleton binding
        let skeleton = mesh
            .skin
            .as_ref()
            .and_then(|skin| skeletons.iter().find(|s| s.name == skin.armature));
        let has_skeleton = skeleton.is_some();

        // transform: follow-up chunks sit at their parent's origin
        let (position, rotation, scaling) = if forced_parent.is_none() {
            (
                Vec3::from_array(mesh.transform.position),
                RotationValue::from_doc(&mesh.transform.rotation),
                Vec3::from_array(mesh.transform.scaling),
            )
        } else {
            (Vec3::ZERO, RotationValue::Euler(Vec3::ZERO), Vec3::ONE)
        };

        let has_unapplied_transforms = {
            let t = &mesh.transform;
            let rotated = match &t.rotation {
                Rotation::Euler(e) => *e != [0.0; 3],
                Rotation::Quaternion(q) => q[0] != 0.0 || q[1] != 0.0 || q[2] != 0.0 || q[3] != 1.0,
            };
            t.scaling != [1.0, 1.0, 1.0] || rotated
        };

        // parent and instancing id
        let (data_name, parent_id) = match forced_parent {
            None => {
                let parent_id = mesh
                    .parent
                    .clone()
                    .filter(|p| doc.armature(p).is_none());
                (mesh.data_name().to_string(), parent_id)
            }
            Some(parent) => (name.clone(), Some(parent.to_string())),
        };

        // physics
        let physics = mesh.physics.as_ref().map(|body| {
            let mass = if body.mass < 0.005 { 0.0 } else { body.mass };
            (body.shape.code(), mass, body.friction, body.restitution)
        });

        // materials: one slot binds directly, several go through a
        // multi-material and lift the chunk ceiling to 32-bit indices
        let mut max_vertices = MAX_VERTEX_ELEMENTS;
        let mut material_id = None;
        match mesh.material_slots.len() {
            0 => ctx.log.warn(2, "No materials have been assigned: "),
            1 => {
                material_id = Some(ctx.get_or_register_material(&mesh.material_slots[0], doc, geometry)?);
            }
            _ => {
                let mut names = Vec::with_capacity(mesh.material_slots.len());
                for slot in &mesh.material_slots {
                    names.push(ctx.get_or_register_material(slot, doc, geometry)?);
                }
                material_id = Some(ctx.register_multi_material(names));
                max_vertices = MAX_VERTEX_ELEMENTS_32BIT;
            }
        }

        // raw bone influences per source vertex
        let (per_vertex_weights, per_vertex_indices) = match (mesh.skin.as_ref(), skeleton) {
            (Some(skin), Some(skeleton)) => {
                let mut weights = vec![Vec::new(); geometry.positions.len()];
                let mut indices = vec![Vec::new(); geometry.positions.len()];
                for group in &skin.vertex_groups {
                    // groups that match no bone deform nothing
                    if let Some(bone_index) = skeleton.bone_index(&group.name) {
                        for member in &group.weights {
                            weights[member.vertex as usize].push(member.weight);
                            indices[member.vertex as usize].push(bone_index);
                        }
                    }
                }
                (weights, indices)
            }
            _ => (Vec::new(), Vec::new()),
        };

        // weld faces in material order
        let materials_count = mesh.material_slots.len().max(1) as u32;
        let resume_from = resume_from.unwrap_or(ChunkResume {
            material_index: 0,
            face_start: 0,
        });
        let mut welder = VertexWelder::new(max_vertices, flat_shading, geometry.positions.len());
        let mut sub_meshes = Vec::new();
        let mut resume = None;

        for material_index in 0..materials_count {
            if resume.is_some() {
                break;
            }
            let vertices_start = welder.vertex_count();
            let index_start = welder.index_count();

            // materials fully emitted by earlier chunks keep an empty range,
            // so ranges stay positional by slot
            if material_index >= resume_from.material_index {
                let face_start = if material_index == resume_from.material_index {
                    resume_from.face_start
                } else {
                    0
                };

                for face_index in face_start..geometry.faces.len() {
                    let face = &geometry.faces[face_index];
                    if face.material_index != material_index {
                        continue;
                    }
                    if welder.face_would_overflow() {
                        resume = Some(ChunkResume {
                            material_index,
                            face_start: face_index,
                        });
                        break;
                    }

                    for corner_index in 0..3 {
                        let v = face.vertices[corner_index] as usize;
                        let normal = if flat_shading {
                            face_normal(face.normal, face, geometry)
                        } else {
                            Vec3::from_array(geometry.normals[v])
                        };

                        let corner = Corner {
                            source_vertex: v,
                            position: Vec3::from_array(geometry.positions[v]),
                            normal,
                            uv: geometry
                                .uv
                                .as_ref()
                                .map(|t| Vec2::from_array(t[face_index][corner_index])),
                            uv2: geometry
                                .uv2
                                .as_ref()
                                .map(|t| Vec2::from_array(t[face_index][corner_index])),
                            color: geometry.colors.as_ref().map(|t| t[face_index][corner_index]),
                            weights: has_skeleton.then(|| per_vertex_weights[v].as_slice()),
                            bone_indices: has_skeleton.then(|| per_vertex_indices[v].as_slice()),
                        };
                        welder.add_corner(corner, vertices_start);
                    }
                }
            }

            sub_meshes.push(SubMesh {
                material_index,
                vertices_start,
                index_start,
                vertices_count: welder.vertex_count() - vertices_start,
                index_count: welder.index_count() - index_start,
            });
        }

        if welder.vertex_count() as usize > MAX_VERTEX_ELEMENTS {
            ctx.log.warn(2, "Due to multi-materials & this mesh's size, 32bit indices must be used.  This may not run on all hardware.");
        }

        ctx.log.log(2, &format!("num positions      :  {}", welder.positions.len()));
        ctx.log.log(2, &format!("num normals        :  {}", welder.normals.len()));
        ctx.log.log(2, &format!("num uvs            :  {}", welder.uvs.len()));
        ctx.log.log(2, &format!("num uvs2           :  {}", welder.uvs2.len()));
        ctx.log.log(2, &format!("num colors         :  {}", welder.colors.len()));
        ctx.log.log(2, &format!("num indices        :  {}", welder.indices.len()));

        // fix skinning to width and optionally compress indices
        let mut skeleton_weights = Vec::new();
        let mut skeleton_indices = Vec::new();
        let mut skeleton_weights_extra = Vec::new();
        let mut skeleton_indices_extra = Vec::new();
        let mut num_bone_influencers = None;

        if has_skeleton {
            let mut stats = InfluenceStats::default();
            for raw in &welder.raw_weights {
                stats.record(raw.len());
            }

            ctx.log.log(2, "Skeleton stats:  ");
            let fixed = to_fixed_influencers(
                &welder.raw_weights,
                &welder.raw_bone_indices,
                mesh.skin.as_ref().map_or(8, |s| s.max_influencers),
                stats.highest_observed,
            );
            if fixed.clamped {
                ctx.log.warn(3, "Maximum # of influencers invalid, set to 8");
            }
            if fixed.truncated_count > 0 {
                ctx.log.warn(3, &format!(
                    "Maximum # of influencers exceeded for {} vertices, extras ignored",
                    fixed.truncated_count
                ));
            }

            skeleton_weights = fixed.weights;
            skeleton_weights_extra = fixed.weights_extra.unwrap_or_default();
            if cfg.compress_matrix_indices {
                skeleton_indices = pack_bone_indices(&fixed.indices)
                    .into_iter()
                    .map(i64::from)
                    .collect();
                skeleton_indices_extra = fixed
                    .indices_extra
                    .map(|extra| pack_bone_indices(&extra).into_iter().map(i64::from).collect())
                    .unwrap_or_default();
            } else {
                skeleton_indices = fixed.indices.into_iter().map(i64::from).collect();
                skeleton_indices_extra = fixed
                    .indices_extra
                    .map(|extra| extra.into_iter().map(i64::from).collect())
                    .unwrap_or_default();
            }
            num_bone_influencers = Some(fixed.num_influencers);

            let average = if welder.positions.is_empty() {
                0.0
            } else {
                stats.total_influencers as f32 / welder.positions.len() as f32
            };
            ctx.log.log(3, &format!("Total Influencers:  {}", stats.total_influencers));
            ctx.log.log(3, &format!("Avg # of influencers per vertex:  {}", format_f(average)));
            ctx.log.log(3, &format!(
                "Highest # of influencers observed:  {}, num vertices with this:  {}",
                stats.highest_observed,
                stats.vertices_at_highest()
            ));
            ctx.log.log(3, &format!("exported as {} influencers", fixed.num_influencers));
        }

        let zero_area = welder.count_zero_area_faces();
        if zero_area > 0 {
            ctx.log.warn(2, &format!("# of 0 area faces found:  {zero_area}"));
        }

        let animation = build_object_animation(
            &mesh.actions,
            &mesh.transform.rotation,
            Channels::ALL,
            false,
            0.0,
            doc.frames_per_second,
            mesh.auto_animate,
            doc.frame_end,
        );

        Ok(ExportMesh {
            name,
            data_name,
            parent_id,
            material_id,
            billboard_mode: if mesh.billboard {
                BILLBOARDMODE_ALL
            } else {
                BILLBOARDMODE_NONE
            },
            position,
            rotation,
            scaling,
            is_visible: mesh.visible,
            is_enabled: mesh.enabled,
            check_collisions: mesh.check_collisions,
            receive_shadows: mesh.receive_shadows,
            cast_shadows: mesh.cast_shadows,
            freeze_world_matrix: mesh.freeze_world_matrix,
            layer: mesh.layer,
            has_unapplied_transforms,
            physics,
            skeleton_id: skeleton.map(|s| s.id),
            num_bone_influencers,
            positions: std::mem::take(&mut welder.positions),
            normals: std::mem::take(&mut welder.normals),
            uvs: std::mem::take(&mut welder.uvs),
            uvs2: std::mem::take(&mut welder.uvs2),
            colors: std::mem::take(&mut welder.colors),
            skeleton_weights,
            skeleton_indices,
            skeleton_weights_extra,
            skeleton_indices_extra,
            indices: std::mem::take(&mut welder.indices),
            sub_meshes,
            animation,
            instances: Vec::new(),
            resume,
        })
    }

    pub fn is_skinned(&self) -> bool {
        !self.skeleton_weights.is_empty()
    }

    pub fn write(&self, w: &mut JsonWriter) {
        w.begin_object();
        w.prop_string("name", &self.name);
        w.prop_string("id", &self.name);
        if let Some(parent_id) = &self.parent_id {
            w.prop_string("parentId", parent_id);
        }
        if let Some(material_id) = &self.material_id {
            w.prop_string("materialId", material_id);
        }
        w.prop_int("billboardMode", self.billboard_mode as i64);
        w.prop_vector("position", self.position);
        self.rotation.write(w);
        w.prop_vector("scaling", self.scaling);
        w.prop_bool("isVisible", self.is_visible);
        w.prop_bool("freezeWorldMatrix", self.freeze_world_matrix);
        w.prop_bool("isEnabled", self.is_enabled);
        w.prop_bool("checkCollisions", self.check_collisions);
        w.prop_bool("receiveShadows", self.receive_shadows);

        if let Some((impostor, mass, friction, restitution)) = self.physics {
            w.prop_int("physicsImpostor", impostor as i64);
            w.prop_f("physicsMass", mass);
            w.prop_f("physicsFriction", friction);
            w.prop_f("physicsRestitution", restitution);
        }

        if let Some(skeleton_id) = self.skeleton_id {
            w.prop_int("skeletonId", skeleton_id as i64);
            w.prop_int(
                "numBoneInfluencers",
                self.num_bone_influencers.unwrap_or(0) as i64,
            );
        }

        w.newline();
        w.prop_vector_array("positions", &self.positions);
        w.newline();
        w.prop_vector_array("normals", &self.normals);

        if !self.uvs.is_empty() {
            w.newline();
            w.prop_array_f("uvs", &self.uvs);
        }
        if !self.uvs2.is_empty() {
            w.newline();
            w.prop_array_f("uvs2", &self.uvs2);
        }
        if !self.colors.is_empty() {
            w.newline();
            w.prop_array_f("colors", &self.colors);
        }
        if self.is_skinned() {
            w.newline();
            w.prop_array_f("matricesWeights", &self.skeleton_weights);
            w.newline();
            w.prop_array_int("matricesIndices", &self.skeleton_indices);
        }
        if !self.skeleton_weights_extra.is_empty() {
            w.newline();
            w.prop_array_f("matricesWeightsExtra", &self.skeleton_weights_extra);
            w.newline();
            w.prop_array_int("matricesIndicesExtra", &self.skeleton_indices_extra);
        }

        w.newline();
        let indices: Vec<i64> = self.indices.iter().map(|&i| i as i64).collect();
        w.prop_array_int("indices", &indices);

        w.newline();
        w.key("subMeshes");
        w.begin_array();
        for sub_mesh in &self.sub_meshes {
            sub_mesh.write(w);
        }
        w.end_array();

        if let Some(animation) = &self.animation {
            animation.write(w);
        }

        w.newline();
        w.key("instances");
        w.begin_array();
        for instance in &self.instances {
            instance.write(w);
        }
        w.end_array();
        w.end_object();
    }
}

/// A zero-geometry locator exported into the meshes array.
#[derive(Debug, Clone)]
pub struct ExportNode {
    pub name: String,
    pub parent_id: Option<String>,
    pub position: Vec3,
    pub rotation: RotationValue,
    pub scaling: Vec3,
    pub layer: i32,
    pub animation: Option<ObjectAnimation>,
}

impl ExportNode {
    pub fn build(empty: &Empty, doc: &SceneDocument, ctx: &mut ExportContext) -> Self {
        ctx.log.log(0, &format!("processing begun of node:  {}", empty.name));
        Self {
            name: empty.name.clone(),
            parent_id: empty.parent.clone().filter(|p| doc.armature(p).is_none()),
            position: Vec3::from_array(empty.transform.position),
            rotation: RotationValue::from_doc(&empty.transform.rotation),
            scaling: Vec3::from_array(empty.transform.scaling),
            layer: 0,
            animation: build_object_animation(
                &empty.actions,
                &empty.transform.rotation,
                Channels::ALL,
                false,
                0.0,
                doc.frames_per_second,
                empty.auto_animate,
                doc.frame_end,
            ),
        }
    }

    pub fn write(&self, w: &mut JsonWriter) {
        w.begin_object();
        w.prop_string("name", &self.name);
        w.prop_string("id", &self.name);
        if let Some(parent_id) = &self.parent_id {
            w.prop_string("parentId", parent_id);
        }
        w.prop_vector("position", self.position);
        self.rotation.write(w);
        w.prop_vector("scaling", self.scaling);
        w.prop_bool("isVisible", false);
        w.prop_bool("isEnabled", true);
        w.prop_bool("checkCollisions", false);
        w.prop_int("billboardMode", BILLBOARDMODE_NONE as i64);
        w.prop_bool("receiveShadows", false);
        if let Some(animation) = &self.animation {
            animation.write(w);
        }
        w.end_object();
    }
}

/// Face normal for flat shading, computed from the corner positions when the
/// document does not supply one.
fn face_normal(supplied: Option<[f32; 3]>, face: &crate::document::Face, geometry: &Geometry) -> Vec3 {
    if let Some(n) = supplied {
        return Vec3::from_array(n);
    }
    let a = Vec3::from_array(geometry.positions[face.vertices[0] as usize]);
    let b = Vec3::from_array(geometry.positions[face.vertices[1] as usize]);
    let c = Vec3::from_array(geometry.positions[face.vertices[2] as usize]);
    (b - a).cross(c - a).normalize_or_zero()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::TextureStore;
    use crate::log::ExportLog;

    fn quad_doc(material_slots: serde_json::Value, face_materials: [u32; 2]) -> SceneDocument {
        serde_json::from_value(serde_json::json!({
            "materials": [{"name": "A"}, {"name": "B"}],
            "meshes": [{
                "name": "Quad",
                "material_slots": material_slots,
                "geometry": {
                    "positions": [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
                    "normals": [[0.0, 0.0, 1.0], [0.0, 0.0, 1.0], [0.0, 0.0, 1.0], [0.0, 0.0, 1.0]],
                    "faces": [
                        {"vertices": [0, 1, 2], "material_index": face_materials[0]},
                        {"vertices": [0, 2, 3], "material_index": face_materials[1]}
                    ],
                    "uv": [
                        [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]],
                        [[0.0, 0.0], [1.0, 1.0], [0.0, 1.0]]
                    ]
                }
            }]
        }))
        .unwrap()
    }

    fn build_single(doc: &SceneDocument, skeletons: &[ExportSkeleton]) -> (ExportMesh, u32) {
        let mut log = ExportLog::discard();
        let store = TextureStore::Empty;
        let mut ctx = ExportContext {
            namespace: "test".to_string(),
            log: &mut log,
            materials: Vec::new(),
            multi_materials: Vec::new(),
            textures: Vec::new(),
            needs_physics: false,
            store: &store,
        };
        let mesh = ExportMesh::build(
            &doc.meshes[0],
            doc,
            None,
            None,
            "",
            skeletons,
            &ExportConfig::default(),
            &mut ctx,
        )
        .unwrap();
        drop(ctx);
        (mesh, log.warning_count())
    }

    #[test]
    fn test_quad_welds_to_four_vertices() {
        let doc = quad_doc(serde_json::json!(["A"]), [0, 0]);
        let (mesh, _) = build_single(&doc, &[]);

        assert_eq!(mesh.positions.len(), 4);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(
            mesh.sub_meshes,
            vec![SubMesh {
                material_index: 0,
                vertices_start: 0,
                index_start: 0,
                vertices_count: 4,
                index_count: 6,
            }]
        );
        assert_eq!(mesh.material_id.as_deref(), Some("test.A"));
        assert!(mesh.resume.is_none());
    }

    #[test]
    fn test_every_index_within_bounds() {
        let doc = quad_doc(serde_json::json!(["A"]), [0, 0]);
        let (mesh, _) = build_single(&doc, &[]);
        let count = mesh.positions.len() as u32;
        assert!(mesh.indices.iter().all(|&i| i < count));
    }

    #[test]
    fn test_empty_material_range_still_emitted() {
        // both faces on slot 1: slot 0 keeps a positional, empty range
        let doc = quad_doc(serde_json::json!(["A", "B"]), [1, 1]);
        let (mesh, _) = build_single(&doc, &[]);

        assert_eq!(mesh.sub_meshes.len(), 2);
        assert_eq!(mesh.sub_meshes[0].material_index, 0);
        assert_eq!(mesh.sub_meshes[0].vertices_count, 0);
        assert_eq!(mesh.sub_meshes[0].index_count, 0);
        assert_eq!(mesh.sub_meshes[1].material_index, 1);
        assert_eq!(mesh.sub_meshes[1].vertices_count, 4);
        assert_eq!(mesh.sub_meshes[1].index_count, 6);
        assert_eq!(mesh.material_id.as_deref(), Some("test.Multimaterial#0"));
    }

    #[test]
    fn test_multi_material_ranges_do_not_overlap() {
        let doc = quad_doc(serde_json::json!(["A", "B"]), [0, 1]);
        let (mesh, _) = build_single(&doc, &[]);

        let a = &mesh.sub_meshes[0];
        let b = &mesh.sub_meshes[1];
        assert_eq!(a.index_start + a.index_count, b.index_start);
        assert_eq!(a.vertices_start + a.vertices_count, b.vertices_start);
        // the shared corners cannot weld across the sub-mesh boundary
        assert_eq!(mesh.positions.len(), 6);
    }

    #[test]
    fn test_no_material_slots_warns() {
        let doc = quad_doc(serde_json::json!([]), [0, 0]);
        let (mesh, warnings) = build_single(&doc, &[]);
        assert!(mesh.material_id.is_none());
        assert_eq!(warnings, 1);
        // still one range for the implicit slot
        assert_eq!(mesh.sub_meshes.len(), 1);
    }

    fn skinned_doc() -> SceneDocument {
        let identity = [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ];
        serde_json::from_value(serde_json::json!({
            "materials": [{"name": "A"}],
            "armatures": [{
                "name": "rig",
                "bones": [
                    {"name": "root", "pose_matrix": identity, "rest_matrix": identity,
                     "rest_head": [0.0, 0.0, 0.0], "rest_tail": [0.0, 1.0, 0.0]},
                    {"name": "tip", "parent": "root", "pose_matrix": identity, "rest_matrix": identity,
                     "rest_head": [0.0, 1.0, 0.0], "rest_tail": [0.0, 2.0, 0.0]}
                ]
            }],
            "meshes": [{
                "name": "Arm",
                "material_slots": ["A"],
                "skin": {
                    "armature": "rig",
                    "max_influencers": 4,
                    "vertex_groups": [
                        {"name": "root", "weights": [
                            {"vertex": 0, "weight": 0.7}, {"vertex": 1, "weight": 1.0}, {"vertex": 2, "weight": 1.0}
                        ]},
                        {"name": "tip", "weights": [{"vertex": 0, "weight": 0.3}]}
                    ]
                },
                "geometry": {
                    "positions": [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
                    "normals": [[0.0, 0.0, 1.0], [0.0, 0.0, 1.0], [0.0, 0.0, 1.0]],
                    "faces": [{"vertices": [0, 1, 2]}]
                }
            }]
        }))
        .unwrap()
    }

    #[test]
    fn test_skinned_mesh_buffers() {
        let doc = skinned_doc();
        let skeleton = ExportSkeleton::build(
            &doc.armatures[0],
            0,
            false,
            24,
            &mut ExportLog::discard(),
        )
        .unwrap();
        let (mesh, _) = build_single(&doc, &[skeleton]);

        assert_eq!(mesh.skeleton_id, Some(0));
        assert_eq!(mesh.num_bone_influencers, Some(2));
        // 4 weights per welded vertex
        assert_eq!(mesh.skeleton_weights.len(), 4 * mesh.positions.len());
        // compressed: one packed value per vertex; vertex 0 is root(0) + tip(1)
        assert_eq!(mesh.skeleton_indices.len(), mesh.positions.len());
        assert_eq!(mesh.skeleton_indices[0], 0 | 1 << 8);
        assert_eq!(mesh.skeleton_weights[0..4], [0.7, 0.3, 0.0, 0.0]);
        assert!(mesh.is_skinned());
    }

    #[test]
    fn test_mesh_write_parses_as_json() {
        let doc = quad_doc(serde_json::json!(["A"]), [0, 0]);
        let (mesh, _) = build_single(&doc, &[]);

        let mut w = JsonWriter::new();
        mesh.write(&mut w);
        let value: serde_json::Value = serde_json::from_str(&w.finish()).unwrap();

        assert_eq!(value["name"], "Quad");
        assert_eq!(value["positions"].as_array().unwrap().len(), 12);
        assert_eq!(value["indices"].as_array().unwrap().len(), 6);
        assert_eq!(value["subMeshes"][0]["verticesCount"], 4);
        assert_eq!(value["instances"].as_array().unwrap().len(), 0);
        // the second vertex (1, 0, 0) is written Y/Z swapped as x, z, y
        assert_eq!(value["positions"][3], 1.0);
        assert_eq!(value["positions"][4], 0.0);
    }
}
