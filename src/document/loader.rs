//! Scene document loading from JSON files, directories, and ZIP bundles.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use super::SceneDocument;
use crate::error::{ExportError, Result};

/// Name of the document entry inside a bundle or directory.
const DOCUMENT_ENTRY: &str = "scene.json";

/// A loaded document plus the store its textures resolve against.
#[derive(Debug)]
pub struct LoadedDocument {
    pub scene: SceneDocument,
    pub textures: TextureStore,
}

/// Where material texture files are read from.
#[derive(Debug)]
pub enum TextureStore {
    /// Files on disk, relative to a root directory.
    Directory(PathBuf),
    /// Entries of a ZIP bundle, keyed by path within the archive.
    Bundle(HashMap<String, Vec<u8>>),
    /// No textures available; every lookup fails.
    Empty,
}

impl TextureStore {
    /// Read the raw bytes of a texture file.
    pub fn read(&self, file: &str) -> Result<Vec<u8>> {
        match self {
            TextureStore::Directory(root) => {
                let path = root.join(file);
                if !path.is_file() {
                    return Err(ExportError::TextureNotFound(file.to_string()));
                }
                Ok(std::fs::read(path)?)
            }
            TextureStore::Bundle(entries) => entries
                .get(file)
                .cloned()
                .ok_or_else(|| ExportError::TextureNotFound(file.to_string())),
            TextureStore::Empty => Err(ExportError::TextureNotFound(file.to_string())),
        }
    }
}

/// Load a scene document from a file path.
///
/// Supports a bare `.json` document (textures resolve next to it), a directory
/// containing `scene.json`, or a ZIP bundle with `scene.json` at its root.
pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<LoadedDocument> {
    let path = path.as_ref();

    if path.is_dir() {
        let doc_path = path.join(DOCUMENT_ENTRY);
        if !doc_path.is_file() {
            return Err(ExportError::InvalidDocument(format!(
                "no {DOCUMENT_ENTRY} in directory {}",
                path.display()
            )));
        }
        let scene = parse_document(&std::fs::read(doc_path)?)?;
        return Ok(LoadedDocument {
            scene,
            textures: TextureStore::Directory(path.to_path_buf()),
        });
    }

    if path.extension().is_some_and(|ext| ext == "json") {
        let scene = parse_document(&std::fs::read(path)?)?;
        let root = path.parent().unwrap_or(Path::new(".")).to_path_buf();
        return Ok(LoadedDocument {
            scene,
            textures: TextureStore::Directory(root),
        });
    }

    let data = std::fs::read(path)?;
    load_from_bytes(&data)
}

/// Load a scene bundle from ZIP bytes.
///
/// The archive must contain `scene.json`; every other file becomes a texture
/// entry addressed by its archive path.
pub fn load_from_bytes(data: &[u8]) -> Result<LoadedDocument> {
    let cursor = std::io::Cursor::new(data);
    let mut archive = zip::ZipArchive::new(cursor)?;

    let mut scene = None;
    let mut entries = HashMap::new();

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        if file.is_dir() {
            continue;
        }
        let name = file.name().to_string();

        let mut contents = Vec::new();
        file.read_to_end(&mut contents)?;

        if name == DOCUMENT_ENTRY {
            scene = Some(parse_document(&contents)?);
        } else {
            entries.insert(name, contents);
        }
    }

    let scene = scene.ok_or_else(|| {
        ExportError::InvalidDocument(format!("bundle has no {DOCUMENT_ENTRY} entry"))
    })?;

    Ok(LoadedDocument {
        scene,
        textures: TextureStore::Bundle(entries),
    })
}

fn parse_document(bytes: &[u8]) -> Result<SceneDocument> {
    let scene: SceneDocument = serde_json::from_slice(bytes)?;
    scene.validate()?;
    Ok(scene)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lab.json");
        std::fs::write(&path, r#"{"name": "lab"}"#).unwrap();

        let loaded = load_from_path(&path).unwrap();
        assert_eq!(loaded.scene.name, "lab");
        assert!(matches!(loaded.textures, TextureStore::Directory(_)));
    }

    #[test]
    fn test_load_bundle() {
        let mut buf = Vec::new();
        {
            let mut writer = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            let options = zip::write::SimpleFileOptions::default();
            writer.start_file("scene.json", options).unwrap();
            writer.write_all(br#"{"name": "bundled"}"#).unwrap();
            writer.start_file("textures/brick.png", options).unwrap();
            writer.write_all(&[1, 2, 3]).unwrap();
            writer.finish().unwrap();
        }

        let loaded = load_from_bytes(&buf).unwrap();
        assert_eq!(loaded.scene.name, "bundled");
        assert_eq!(loaded.textures.read("textures/brick.png").unwrap(), vec![1, 2, 3]);
        assert!(loaded.textures.read("missing.png").is_err());
    }

    #[test]
    fn test_bundle_without_document() {
        let mut buf = Vec::new();
        {
            let mut writer = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            let options = zip::write::SimpleFileOptions::default();
            writer.start_file("readme.txt", options).unwrap();
            writer.write_all(b"nothing here").unwrap();
            writer.finish().unwrap();
        }
        assert!(load_from_bytes(&buf).is_err());
    }
}
