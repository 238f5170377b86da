//! # Scene Exporter
//!
//! A Rust library for serializing 3D scene documents to a JSON scene file
//! consumed by WebGL runtimes.
//!
//! ## Overview
//!
//! The input is an explicit scene document: meshes with face-indexed UV and
//! color tables, armatures with pre-sampled bone poses, cameras, lights, and
//! a material library. The exporter welds face corners into deduplicated
//! vertex buffers, partitions indices into per-material sub-mesh ranges,
//! packs bone influences into fixed-width buffers, and writes a scene file
//! with textures and a per-run log alongside.
//!
//! ## Quick Start
//!
//! ```ignore
//! use scene_exporter::{load_from_path, ExportConfig, Exporter, ExportLog};
//!
//! // Load a document (JSON file, directory, or ZIP bundle)
//! let loaded = load_from_path("scene.json")?;
//!
//! // Convert it
//! let mut log = ExportLog::create("out/level.log".as_ref())?;
//! let exporter = Exporter::new(&loaded.scene, &loaded.textures);
//! let scene = exporter.export("level.scene", &mut log)?;
//!
//! // Write the scene file plus textures
//! scene_exporter::export::write_scene_files(&scene, "out/level.scene".as_ref(), "textures")?;
//! ```
//!
//! For the common case, [`export_file`] does all of the above in one call.

pub mod document;
pub mod error;
pub mod export;
pub mod log;
pub mod scene;
pub mod types;

use std::path::Path;

// Re-export main types for convenience
pub use document::loader::{load_from_bytes, load_from_path, LoadedDocument, TextureStore};
pub use document::SceneDocument;
pub use error::{ExportError, Result};
pub use log::ExportLog;
pub use scene::{ExportConfig, ExportedScene, Exporter};

/// Export a document file to `output`, writing the scene file, its textures,
/// and a `.log` file alongside. Returns the run's warning count.
pub fn export_file<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    config: ExportConfig,
) -> Result<u32> {
    let loaded = document::loader::load_from_path(input)?;
    export_document(&loaded.scene, &loaded.textures, output.as_ref(), config)
}

/// Export an in-memory document to `output`.
///
/// Failures are recorded in the log file before propagating; a failed run
/// makes no guarantee about the output file.
pub fn export_document(
    doc: &SceneDocument,
    store: &TextureStore,
    output: &Path,
    config: ExportConfig,
) -> Result<u32> {
    let mut log = ExportLog::create(&output.with_extension("log"))?;

    let file_name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let exporter = Exporter::with_config(doc, store, config);
    let result = exporter.export(&file_name, &mut log).and_then(|scene| {
        log.log(0, "========= Writing of scene file started =========");
        export::write_scene_files(&scene, output, &exporter.config().texture_dir)?;
        log.log(0, "========= Writing of scene file completed =========");
        Ok(())
    });

    match result {
        Ok(()) => {
            let warnings = log.warning_count();
            log.close();
            Ok(warnings)
        }
        Err(err) => {
            log.error(&err);
            log.close();
            Err(err)
        }
    }
}
