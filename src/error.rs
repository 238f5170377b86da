//! Error types for the scene exporter.

use thiserror::Error;

/// Result type alias using ExportError.
pub type Result<T> = std::result::Result<T, ExportError>;

/// Main error type for scene export operations.
#[derive(Error, Debug)]
pub enum ExportError {
    /// Failed to read or parse a ZIP bundle.
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Failed to parse JSON data.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Failed to read or process an image.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid scene document structure.
    #[error("Invalid scene document: {0}")]
    InvalidDocument(String),

    /// A texture file referenced by a material could not be found.
    #[error("Texture not found: {0}")]
    TextureNotFound(String),

    /// A vertex group or pose references a bone the skeleton does not have.
    #[error("Bone not found in skeleton: {0}")]
    BoneNotFound(String),

    /// A skinned mesh carries un-applied rotation or scaling.
    #[error("mesh '{0}' has un-applied transformations; this will never work with an armature")]
    UnappliedTransforms(String),

    /// Failed to write the scene file or its side files.
    #[error("Export error: {0}")]
    Export(String),
}
