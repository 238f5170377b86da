//! Shared types and comparisons used throughout the library.

use glam::{Mat4, Vec2, Vec3};

/// Vertex-count ceiling for a single mesh chunk with 16-bit indices.
pub const MAX_VERTEX_ELEMENTS: usize = 65_535;
/// Vertex-count ceiling when 32-bit indices are in play (multi-material meshes).
pub const MAX_VERTEX_ELEMENTS_32BIT: usize = 16_777_216;

/// Decimal places all floats are rounded to, both when comparing attributes
/// and when writing the scene file. Comparing at the same precision as the
/// output avoids near-duplicate vertices produced by float noise.
pub const FLOAT_PRECISION: u32 = 4;

const QUANTIZE_SCALE: f64 = 10_000.0; // 10^FLOAT_PRECISION

/// Round a float to the shared output precision, as an integer key.
/// `-0.0` and `0.0` quantize identically.
#[inline]
pub fn quantize(v: f32) -> i64 {
    (v as f64 * QUANTIZE_SCALE).round() as i64
}

/// Equality at output precision.
#[inline]
pub fn same_f32(a: f32, b: f32) -> bool {
    quantize(a) == quantize(b)
}

/// Component-wise equality at output precision.
pub fn same_vec2(a: Vec2, b: Vec2) -> bool {
    same_f32(a.x, b.x) && same_f32(a.y, b.y)
}

/// Component-wise equality at output precision.
pub fn same_vec3(a: Vec3, b: Vec3) -> bool {
    same_f32(a.x, b.x) && same_f32(a.y, b.y) && same_f32(a.z, b.z)
}

/// Element-wise slice equality at output precision. Differing lengths never compare equal.
pub fn same_slice(a: &[f32], b: &[f32]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| same_f32(*x, *y))
}

/// Element-wise matrix equality at output precision.
pub fn same_mat4(a: &Mat4, b: &Mat4) -> bool {
    same_slice(&a.to_cols_array(), &b.to_cols_array())
}

/// Sanitize a name into a legal identifier for namespacing material ids.
///
/// Leading digits are moved to a `_`-prefixed suffix so that truncation cannot
/// collide names like `01.R` and `02.R`; any other character outside
/// `[A-Za-z0-9_]` becomes `_`.
pub fn legal_identifier(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut prefix = String::new();

    for ch in input.chars() {
        if out.is_empty() {
            if ch.is_ascii_digit() {
                prefix.push(ch);
                continue;
            } else if !ch.is_ascii_alphabetic() {
                continue;
            }
        }

        if ch.is_ascii_alphanumeric() || ch == '_' {
            out.push(ch);
        } else {
            out.push('_');
        }
    }

    if !prefix.is_empty() {
        out.push('_');
        out.push_str(&prefix);
    }
    out
}

/// Derive the default namespace from an output path: its file stem, sanitized.
pub fn namespace_of_path(path: &std::path::Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    legal_identifier(&stem)
}
