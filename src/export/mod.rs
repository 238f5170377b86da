//! Scene-file assembly and output.

pub mod json;

use std::path::Path;

use json::JsonWriter;

use crate::error::Result;
use crate::scene::ExportedScene;

/// Serialize an exported scene to the scene JSON text.
///
/// Top-level order is fixed: producer block, environment scalars, then the
/// object arrays. Arrays are always present (runtime loaders index them
/// unconditionally), except `sounds`, which is written only when used.
pub fn scene_to_json(scene: &ExportedScene) -> String {
    let mut w = JsonWriter::new();
    w.begin_object();

    w.key("producer");
    w.begin_object();
    w.prop_string("name", env!("CARGO_PKG_NAME"));
    w.prop_string("version", env!("CARGO_PKG_VERSION"));
    w.prop_string("exporter_version", env!("CARGO_PKG_VERSION"));
    w.prop_string("file", &scene.file_name);
    w.end_object();
    w.newline();

    scene.world.write(&mut w, scene.needs_physics);

    w.newline();
    w.key("materials");
    w.begin_array();
    for material in &scene.materials {
        w.newline();
        material.write(&mut w);
    }
    w.end_array();

    w.newline();
    w.key("multiMaterials");
    w.begin_array();
    for multi in &scene.multi_materials {
        multi.write(&mut w);
    }
    w.end_array();

    w.newline();
    w.key("skeletons");
    w.begin_array();
    for skeleton in &scene.skeletons {
        skeleton.write(&mut w);
    }
    w.end_array();

    w.newline();
    w.key("meshes");
    w.begin_array();
    for node in &scene.nodes {
        node.write(&mut w);
    }
    w.end_array();

    w.newline();
    w.key("cameras");
    w.begin_array();
    for camera in &scene.cameras {
        camera.write(&mut w);
    }
    w.end_array();
    if let Some(active_camera) = &scene.active_camera {
        w.prop_string("activeCamera", active_camera);
    }

    w.newline();
    w.key("lights");
    w.begin_array();
    for light in &scene.lights {
        light.write(&mut w);
    }
    w.end_array();

    w.newline();
    w.key("shadowGenerators");
    w.begin_array();
    for generator in &scene.shadow_generators {
        generator.write(&mut w);
    }
    w.end_array();

    if !scene.sounds.is_empty() {
        w.newline();
        w.key("sounds");
        w.begin_array();
        for sound in &scene.sounds {
            sound.write(&mut w);
        }
        w.end_array();
    }

    w.newline();
    w.end_object();
    w.finish()
}

/// Write the scene file and its staged textures.
///
/// Textures land in `texture_dir` next to the scene file (created on demand),
/// or alongside it when the directory name is empty.
pub fn write_scene_files(scene: &ExportedScene, scene_path: &Path, texture_dir: &str) -> Result<()> {
    std::fs::write(scene_path, scene_to_json(scene))?;

    if scene.textures.is_empty() {
        return Ok(());
    }

    let parent = scene_path.parent().unwrap_or(Path::new("."));
    let texture_root = if texture_dir.is_empty() {
        parent.to_path_buf()
    } else {
        parent.join(texture_dir)
    };
    std::fs::create_dir_all(&texture_root)?;

    for texture in &scene.textures {
        std::fs::write(texture_root.join(&texture.file_name), &texture.bytes)?;
    }
    Ok(())
}
