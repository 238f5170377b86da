//! Conversion of a scene document into export records.
//!
//! [`Exporter`] walks the document the way the runtime wants it assembled:
//! skeletons first (meshes need bone indices), then meshes and nodes with
//! oversized meshes split into chunks, then cameras (which derive parameters
//! from their targets), then lights and shadow generators.

pub mod animation;
pub mod armature;
pub mod camera;
pub mod light;
pub mod material;
pub mod mesh;
pub mod skinning;
pub mod welder;
pub mod world;

pub use armature::{ExportBone, ExportSkeleton};
pub use camera::ExportCamera;
pub use light::{ExportLight, ShadowGenerator};
pub use material::{ExportMaterial, MultiMaterial, TextureOutput};
pub use mesh::{ChunkResume, ExportMesh, ExportNode, MeshInstance, SubMesh};
pub use world::ExportWorld;

use glam::Vec3;

use crate::document::{Geometry, LightKind, SceneDocument, SoundDef, TextureStore};
use crate::error::{ExportError, Result};
use crate::export::json::JsonWriter;
use crate::log::ExportLog;

/// Export-run settings.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Flat-shade every mesh, regardless of per-mesh flags.
    pub flat_shade_scene: bool,
    /// Skip bones whose names mark them as IK helpers.
    pub ignore_ik_bones: bool,
    /// Pack 4 bone indices per 32-bit value in skinning buffers.
    pub compress_matrix_indices: bool,
    /// Subdirectory (next to the scene file) texture images are written to.
    /// Empty writes them alongside the scene file.
    pub texture_dir: String,
    /// Namespace prefix for material ids; derived from the output file name
    /// when unset.
    pub namespace: Option<String>,
    /// Restrict the export to meshes on these layers.
    pub selected_layers: Option<Vec<i32>>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            flat_shade_scene: false,
            ignore_ik_bones: false,
            compress_matrix_indices: true,
            texture_dir: "textures".to_string(),
            namespace: None,
            selected_layers: None,
        }
    }
}

impl ExportConfig {
    /// Flat-shade the whole scene.
    pub fn with_flat_shading(mut self) -> Self {
        self.flat_shade_scene = true;
        self
    }

    /// Use a fixed material namespace instead of the output file name.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    fn layer_selected(&self, layer: i32) -> bool {
        match &self.selected_layers {
            Some(layers) => layers.contains(&layer),
            None => true,
        }
    }
}

/// Run-wide mutable state, threaded explicitly through the build: the log,
/// the material registry, staged texture files, and scene-level flags.
pub struct ExportContext<'a> {
    pub namespace: String,
    pub log: &'a mut ExportLog,
    pub materials: Vec<ExportMaterial>,
    pub multi_materials: Vec<MultiMaterial>,
    pub textures: Vec<TextureOutput>,
    pub needs_physics: bool,
    store: &'a TextureStore,
}

impl ExportContext<'_> {
    /// Resolve a material slot to its namespaced id, converting the material
    /// on first use and reusing the registry entry afterwards.
    pub fn get_or_register_material(
        &mut self,
        slot: &str,
        doc: &SceneDocument,
        geometry: &Geometry,
    ) -> Result<String> {
        let def = doc
            .material(slot)
            .ok_or_else(|| ExportError::InvalidDocument(format!("unknown material '{slot}'")))?;
        let namespace = def.namespace.as_deref().unwrap_or(&self.namespace);
        let full_name = format!("{namespace}.{}", def.name);

        if self.materials.iter().any(|m| m.name == full_name) {
            self.log
                .log(2, &format!("registered as also a user of material:  {slot}"));
        } else {
            let material = ExportMaterial::build(
                def,
                &self.namespace,
                geometry.uv.is_some(),
                geometry.uv2.is_some(),
                self.store,
                &mut self.textures,
                self.log,
            );
            self.materials.push(material);
        }
        Ok(full_name)
    }

    /// Register a multi-material over already-registered member ids.
    pub fn register_multi_material(&mut self, materials: Vec<String>) -> String {
        let multi = MultiMaterial::new(materials, self.multi_materials.len(), &self.namespace);
        let name = multi.name.clone();
        self.multi_materials.push(multi);
        name
    }
}

/// A mesh chunk or a node, kept in document order in the meshes array.
#[derive(Debug, Clone)]
pub enum SceneNode {
    Mesh(ExportMesh),
    Node(ExportNode),
}

impl SceneNode {
    pub fn name(&self) -> &str {
        match self {
            SceneNode::Mesh(m) => &m.name,
            SceneNode::Node(n) => &n.name,
        }
    }

    pub fn position(&self) -> Vec3 {
        match self {
            SceneNode::Mesh(m) => m.position,
            SceneNode::Node(n) => n.position,
        }
    }

    pub fn layer(&self) -> i32 {
        match self {
            SceneNode::Mesh(m) => m.layer,
            SceneNode::Node(n) => n.layer,
        }
    }

    pub fn cast_shadows(&self) -> bool {
        match self {
            SceneNode::Mesh(m) => m.cast_shadows,
            SceneNode::Node(_) => false,
        }
    }

    pub fn write(&self, w: &mut JsonWriter) {
        match self {
            SceneNode::Mesh(m) => m.write(w),
            SceneNode::Node(n) => n.write(w),
        }
    }
}

/// A sound entry, scene-level or attached to a mesh.
#[derive(Debug, Clone)]
pub struct ExportSound {
    pub file: String,
    pub autoplay: bool,
    pub looping: bool,
    pub max_distance: Option<f32>,
    pub connected_mesh_id: Option<String>,
}

impl ExportSound {
    fn scene_level(def: &SoundDef) -> Self {
        Self {
            file: def.file.clone(),
            autoplay: def.autoplay,
            looping: def.looping,
            max_distance: None,
            connected_mesh_id: None,
        }
    }

    fn attached(def: &SoundDef, mesh_name: &str) -> Self {
        Self {
            file: def.file.clone(),
            autoplay: def.autoplay,
            looping: def.looping,
            max_distance: def.max_distance,
            connected_mesh_id: Some(mesh_name.to_string()),
        }
    }

    pub fn write(&self, w: &mut JsonWriter) {
        w.begin_object();
        w.prop_string("name", &self.file);
        w.prop_bool("autoplay", self.autoplay);
        w.prop_bool("loop", self.looping);
        if let Some(max_distance) = self.max_distance {
            w.prop_f("maxDistance", max_distance);
        }
        if let Some(mesh_id) = &self.connected_mesh_id {
            w.prop_string("connectedMeshId", mesh_id);
        }
        w.end_object();
    }
}

/// Everything the serializer needs to write one scene file plus its textures.
#[derive(Debug)]
pub struct ExportedScene {
    /// File name recorded in the producer block.
    pub file_name: String,
    pub world: ExportWorld,
    pub needs_physics: bool,
    pub materials: Vec<ExportMaterial>,
    pub multi_materials: Vec<MultiMaterial>,
    pub skeletons: Vec<ExportSkeleton>,
    pub nodes: Vec<SceneNode>,
    pub cameras: Vec<ExportCamera>,
    pub active_camera: Option<String>,
    pub lights: Vec<ExportLight>,
    pub shadow_generators: Vec<ShadowGenerator>,
    pub sounds: Vec<ExportSound>,
    /// Texture files staged for writing next to the scene file.
    pub textures: Vec<TextureOutput>,
}

impl ExportedScene {
    /// Serialize to the scene JSON text.
    pub fn to_json(&self) -> String {
        crate::export::scene_to_json(self)
    }
}

/// The scene exporter.
pub struct Exporter<'a> {
    doc: &'a SceneDocument,
    store: &'a TextureStore,
    config: ExportConfig,
}

impl<'a> Exporter<'a> {
    /// Create an exporter with default configuration.
    pub fn new(doc: &'a SceneDocument, store: &'a TextureStore) -> Self {
        Self {
            doc,
            store,
            config: ExportConfig::default(),
        }
    }

    /// Create an exporter with custom configuration.
    pub fn with_config(doc: &'a SceneDocument, store: &'a TextureStore, config: ExportConfig) -> Self {
        Self { doc, store, config }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Run the conversion. `file_name` seeds the producer block and the
    /// default material namespace.
    pub fn export(&self, file_name: &str, log: &mut ExportLog) -> Result<ExportedScene> {
        let doc = self.doc;
        doc.validate()?;

        log.log(0, "========= Conversion from scene document =========");
        log.log(1, "Scene settings used:");
        log.log(2, &format!("flat shading entire scene:  {}", self.config.flat_shade_scene));
        log.log(2, &format!("ignore IK bones:  {}", self.config.ignore_ik_bones));
        log.log(2, &format!("texture directory:  {}", self.config.texture_dir));

        let namespace = self
            .config
            .namespace
            .clone()
            .unwrap_or_else(|| crate::types::namespace_of_path(std::path::Path::new(file_name)));

        let mut ctx = ExportContext {
            namespace,
            log,
            materials: Vec::new(),
            multi_materials: Vec::new(),
            textures: Vec::new(),
            needs_physics: false,
            store: self.store,
        };

        // skeletons first, so meshes can map bone names to indices
        let mut skeletons = Vec::new();
        for (index, armature) in doc.armatures.iter().enumerate() {
            skeletons.push(ExportSkeleton::build(
                armature,
                index as u32,
                self.config.ignore_ik_bones,
                doc.frames_per_second,
                ctx.log,
            )?);
        }

        let active_camera = match &doc.active_camera {
            Some(name) => Some(name.clone()),
            None => {
                if !doc.cameras.is_empty() {
                    ctx.log.warn(1, "No active camera has been assigned");
                }
                None
            }
        };

        let mut sounds = Vec::new();
        if let Some(sound) = &doc.sound {
            sounds.push(ExportSound::scene_level(sound));
        }

        // meshes, with instancing and overflow chunking
        let mut nodes: Vec<SceneNode> = Vec::new();
        for mesh_doc in &doc.meshes {
            if !self.config.layer_selected(mesh_doc.layer) {
                continue;
            }

            // a mesh sharing an earlier mesh's geometry becomes an instance of
            // it; buffers are reused by reference, never recomputed
            let source = nodes.iter_mut().find_map(|node| match node {
                SceneNode::Mesh(m) if m.data_name == mesh_doc.data_name() => Some(m),
                _ => None,
            });
            if let Some(source) = source {
                let instance = MeshInstance::from_doc(mesh_doc, source.rotation.is_quaternion());
                ctx.log.log(2, &format!(
                    "mesh is an instance of :  {}.  Processing halted.",
                    source.name
                ));
                source.instances.push(instance);
                continue;
            }

            let mut resume: Option<ChunkResume> = None;
            let mut forced_parent: Option<String> = None;
            let mut chunk_number = 0u32;

            loop {
                let suffix = if chunk_number == 0 {
                    String::new()
                } else {
                    chunk_number.to_string()
                };
                let chunk = ExportMesh::build(
                    mesh_doc,
                    doc,
                    resume,
                    forced_parent.as_deref(),
                    &suffix,
                    &skeletons,
                    &self.config,
                    &mut ctx,
                )?;

                if chunk.has_unapplied_transforms && chunk.is_skinned() {
                    let message = format!(
                        "Mesh: {} has un-applied transformations.  This will never work for a mesh with an armature.  Export cancelled",
                        chunk.name
                    );
                    ctx.log.log(0, &message);
                    return Err(ExportError::UnappliedTransforms(chunk.name));
                }

                if chunk.physics.is_some() {
                    ctx.needs_physics = true;
                }
                if chunk_number == 0 {
                    if let Some(sound) = &mesh_doc.sound {
                        sounds.push(ExportSound::attached(sound, &mesh_doc.name));
                    }
                }

                let next = chunk.resume;
                nodes.push(SceneNode::Mesh(chunk));

                match next {
                    None => break,
                    Some(next) => {
                        if forced_parent.is_none() {
                            forced_parent = Some(mesh_doc.name.clone());
                            ctx.log.warn(1, &format!(
                                "The following mesh has exceeded the maximum # of vertex elements & will be broken into multiple meshes: {}",
                                mesh_doc.name
                            ));
                        }
                        resume = Some(next);
                        chunk_number += 1;
                    }
                }
            }
        }

        for empty in &doc.empties {
            let node = ExportNode::build(empty, doc, &mut ctx);
            nodes.push(SceneNode::Node(node));
        }

        // cameras: skipped when a mandatory target is missing, then fed the
        // built node positions for follow / arc-rotate derivation
        let targets: Vec<(String, Vec3)> = nodes
            .iter()
            .map(|n| (n.name().to_string(), n.position()))
            .collect();
        let mut cameras = Vec::new();
        for camera_doc in &doc.cameras {
            if let Some(mut camera) =
                ExportCamera::build(camera_doc, doc.frames_per_second, doc.frame_end, ctx.log)
            {
                camera.update_for_target(&targets);
                cameras.push(camera);
            }
        }

        // lights and shadow generators, with the completed node list
        let node_layers: Vec<(String, i32)> = nodes
            .iter()
            .map(|n| (n.name().to_string(), n.layer()))
            .collect();
        let casters: Vec<String> = nodes
            .iter()
            .filter(|n| n.cast_shadows())
            .map(|n| n.name().to_string())
            .collect();

        let mut lights = Vec::new();
        let mut shadow_generators = Vec::new();
        for light_doc in &doc.lights {
            lights.push(ExportLight::build(
                light_doc,
                &node_layers,
                doc.frames_per_second,
                doc.frame_end,
                ctx.log,
            ));
            if let Some(shadow) = &light_doc.shadow {
                if matches!(light_doc.kind, LightKind::Directional | LightKind::Spot) {
                    shadow_generators.push(ShadowGenerator::build(
                        light_doc,
                        shadow,
                        casters.clone(),
                        ctx.log,
                    ));
                } else {
                    ctx.log.warn(1, &format!(
                        "Only directional (sun) and spot types of light are valid for shadows thus ignored: {}",
                        light_doc.name
                    ));
                }
            }
        }

        Ok(ExportedScene {
            file_name: file_name.to_string(),
            world: ExportWorld::build(doc),
            needs_physics: ctx.needs_physics,
            materials: ctx.materials,
            multi_materials: ctx.multi_materials,
            skeletons,
            nodes,
            cameras,
            active_camera,
            lights,
            shadow_generators,
            sounds,
            textures: ctx.textures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Face, MeshObject};
    use crate::types::MAX_VERTEX_ELEMENTS;

    fn export(doc: &SceneDocument) -> ExportedScene {
        let store = TextureStore::Empty;
        let mut log = ExportLog::discard();
        Exporter::new(doc, &store).export("test.scene", &mut log).unwrap()
    }

    /// A mesh too large for one chunk: flat shading makes every corner unique,
    /// so `faces` triangles weld to `3 * faces` vertices.
    fn oversized_mesh(faces: usize) -> MeshObject {
        let mut mesh: MeshObject = serde_json::from_value(serde_json::json!({
            "name": "Big",
            "flat_shading": true,
            "geometry": {
                "positions": [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
                "normals": [[0.0, 0.0, 1.0], [0.0, 0.0, 1.0], [0.0, 0.0, 1.0]],
                "faces": []
            }
        }))
        .unwrap();
        mesh.geometry.faces = (0..faces)
            .map(|_| Face {
                vertices: [0, 1, 2],
                normal: Some([0.0, 0.0, 1.0]),
                material_index: 0,
            })
            .collect();
        mesh
    }

    #[test]
    fn test_oversized_mesh_splits_into_chunks() {
        // 21_846 faces * 3 corners = 65_538 flat-shaded vertices: one over
        let faces = MAX_VERTEX_ELEMENTS / 3 + 1;
        let mut doc = SceneDocument::default();
        doc.meshes.push(oversized_mesh(faces));

        let scene = export(&doc);
        assert_eq!(scene.nodes.len(), 2);

        let (first, second) = match (&scene.nodes[0], &scene.nodes[1]) {
            (SceneNode::Mesh(a), SceneNode::Mesh(b)) => (a, b),
            _ => panic!("expected two mesh chunks"),
        };

        assert_eq!(first.name, "Big");
        assert_eq!(second.name, "Big1");
        assert_eq!(second.parent_id.as_deref(), Some("Big"));

        // no chunk exceeds the ceiling, and together they cover every face
        assert!(first.positions.len() <= MAX_VERTEX_ELEMENTS);
        assert!(second.positions.len() <= MAX_VERTEX_ELEMENTS);
        assert_eq!(first.indices.len() + second.indices.len(), faces * 3);
        assert_eq!(first.positions.len(), MAX_VERTEX_ELEMENTS);
        assert_eq!(second.positions.len(), 3);

        // follow-up chunks sit at the parent's origin
        assert_eq!(second.position, Vec3::ZERO);
    }

    #[test]
    fn test_shared_geometry_becomes_instance() {
        let doc: SceneDocument = serde_json::from_value(serde_json::json!({
            "meshes": [
                {
                    "name": "Tree",
                    "data_name": "TreeData",
                    "geometry": {
                        "positions": [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
                        "normals": [[0.0, 0.0, 1.0], [0.0, 0.0, 1.0], [0.0, 0.0, 1.0]],
                        "faces": [{"vertices": [0, 1, 2]}]
                    }
                },
                {
                    "name": "Tree.001",
                    "data_name": "TreeData",
                    "transform": {"position": [5.0, 0.0, 0.0]},
                    "geometry": {
                        "positions": [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
                        "normals": [[0.0, 0.0, 1.0], [0.0, 0.0, 1.0], [0.0, 0.0, 1.0]],
                        "faces": [{"vertices": [0, 1, 2]}]
                    }
                }
            ]
        }))
        .unwrap();

        let scene = export(&doc);
        assert_eq!(scene.nodes.len(), 1);
        let SceneNode::Mesh(mesh) = &scene.nodes[0] else {
            panic!("expected a mesh");
        };
        assert_eq!(mesh.instances.len(), 1);
        assert_eq!(mesh.instances[0].name, "Tree.001");
        assert_eq!(mesh.instances[0].position, Vec3::new(5.0, 0.0, 0.0));
    }

    #[test]
    fn test_skinned_mesh_with_unapplied_transforms_aborts() {
        let identity = [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ];
        let doc: SceneDocument = serde_json::from_value(serde_json::json!({
            "armatures": [{
                "name": "rig",
                "bones": [{"name": "root", "pose_matrix": identity, "rest_matrix": identity,
                           "rest_head": [0.0, 0.0, 0.0], "rest_tail": [0.0, 1.0, 0.0]}]
            }],
            "meshes": [{
                "name": "Arm",
                "transform": {"scaling": [2.0, 1.0, 1.0]},
                "skin": {"armature": "rig", "vertex_groups": [
                    {"name": "root", "weights": [
                        {"vertex": 0, "weight": 1.0}, {"vertex": 1, "weight": 1.0}, {"vertex": 2, "weight": 1.0}
                    ]}
                ]},
                "geometry": {
                    "positions": [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
                    "normals": [[0.0, 0.0, 1.0], [0.0, 0.0, 1.0], [0.0, 0.0, 1.0]],
                    "faces": [{"vertices": [0, 1, 2]}]
                }
            }]
        }))
        .unwrap();

        let store = TextureStore::Empty;
        let mut log = ExportLog::discard();
        let result = Exporter::new(&doc, &store).export("test.scene", &mut log);
        assert!(matches!(result, Err(ExportError::UnappliedTransforms(_))));
    }

    #[test]
    fn test_layer_filter_skips_meshes() {
        let mut doc = SceneDocument::default();
        let mut mesh = oversized_mesh(1);
        mesh.layer = 3;
        doc.meshes.push(mesh);

        let store = TextureStore::Empty;
        let mut log = ExportLog::discard();
        let config = ExportConfig {
            selected_layers: Some(vec![0]),
            ..Default::default()
        };
        let scene = Exporter::with_config(&doc, &store, config)
            .export("test.scene", &mut log)
            .unwrap();
        assert!(scene.nodes.is_empty());
    }

    #[test]
    fn test_physics_flag_and_sounds_collected() {
        let doc: SceneDocument = serde_json::from_value(serde_json::json!({
            "sound": {"file": "ambience.mp3"},
            "meshes": [{
                "name": "Crate",
                "physics": {"shape": "box", "mass": 0.001},
                "sound": {"file": "creak.wav", "max_distance": 12.0},
                "geometry": {
                    "positions": [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
                    "normals": [[0.0, 0.0, 1.0], [0.0, 0.0, 1.0], [0.0, 0.0, 1.0]],
                    "faces": [{"vertices": [0, 1, 2]}]
                }
            }]
        }))
        .unwrap();

        let scene = export(&doc);
        assert!(scene.needs_physics);
        assert_eq!(scene.sounds.len(), 2);
        assert_eq!(scene.sounds[1].connected_mesh_id.as_deref(), Some("Crate"));

        let SceneNode::Mesh(mesh) = &scene.nodes[0] else {
            panic!("expected a mesh");
        };
        // mass below the epsilon clamps to zero
        assert_eq!(mesh.physics, Some((2, 0.0, 0.5, 0.0)));
    }
}
