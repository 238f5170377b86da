//! Fixed-precision JSON emission.
//!
//! The scene file is written as text rather than through a generic JSON value
//! tree: every float is rounded to [`FLOAT_PRECISION`](crate::types::FLOAT_PRECISION)
//! decimals with trailing zeros stripped, vectors are axis-swapped for the
//! runtime's coordinate convention, and long buffers are wrapped to keep the
//! output diffable.

use glam::{Mat4, Quat, Vec3};
use std::fmt::Write;

/// Elements per line in large numeric arrays.
const VERTEX_OUTPUT_PER_LINE: usize = 50;

/// Format a float at the shared output precision: 4 decimals, trailing zeros
/// and a bare trailing `.` stripped, `-0` normalized to `0`.
pub fn format_f(v: f32) -> String {
    let mut s = format!("{v:.4}");
    if s.contains('.') {
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
    }
    if s == "-0" {
        s.truncate(0);
        s.push('0');
    }
    s
}

/// A comma-tracking JSON text writer.
///
/// Nesting is tracked so properties and elements separate themselves; callers
/// just emit keys and values in order.
pub struct JsonWriter {
    out: String,
    need_comma: Vec<bool>,
    pending_value: bool,
}

impl JsonWriter {
    pub fn new() -> Self {
        Self {
            out: String::new(),
            need_comma: Vec::new(),
            pending_value: false,
        }
    }

    /// Consume the writer, returning the emitted text.
    pub fn finish(self) -> String {
        self.out
    }

    fn sep(&mut self) {
        if self.pending_value {
            self.pending_value = false;
            return;
        }
        if let Some(top) = self.need_comma.last_mut() {
            if *top {
                self.out.push(',');
            }
            *top = true;
        }
    }

    /// Insert a raw newline between entries, for readability of long arrays.
    pub fn newline(&mut self) {
        self.out.push('\n');
    }

    pub fn begin_object(&mut self) {
        self.sep();
        self.out.push('{');
        self.need_comma.push(false);
    }

    pub fn end_object(&mut self) {
        self.need_comma.pop();
        self.out.push('}');
    }

    pub fn begin_array(&mut self) {
        self.sep();
        self.out.push('[');
        self.need_comma.push(false);
    }

    pub fn end_array(&mut self) {
        self.need_comma.pop();
        self.out.push(']');
    }

    /// Emit a property key; the next value attaches to it.
    pub fn key(&mut self, name: &str) {
        self.sep();
        let _ = write!(self.out, "\"{name}\":");
        self.pending_value = true;
    }

    pub fn value_string(&mut self, value: &str) {
        self.sep();
        self.out.push('"');
        for ch in value.chars() {
            match ch {
                '"' => self.out.push_str("\\\""),
                '\\' => self.out.push_str("\\\\"),
                '\n' => self.out.push_str("\\n"),
                '\t' => self.out.push_str("\\t"),
                c if (c as u32) < 0x20 => {
                    let _ = write!(self.out, "\\u{:04x}", c as u32);
                }
                c => self.out.push(c),
            }
        }
        self.out.push('"');
    }

    pub fn value_f(&mut self, value: f32) {
        self.sep();
        self.out.push_str(&format_f(value));
    }

    pub fn value_int(&mut self, value: i64) {
        self.sep();
        let _ = write!(self.out, "{value}");
    }

    pub fn value_bool(&mut self, value: bool) {
        self.sep();
        self.out.push_str(if value { "true" } else { "false" });
    }

    // property helpers, mirroring the record writers

    pub fn prop_string(&mut self, name: &str, value: &str) {
        self.key(name);
        self.value_string(value);
    }

    pub fn prop_f(&mut self, name: &str, value: f32) {
        self.key(name);
        self.value_f(value);
    }

    pub fn prop_int(&mut self, name: &str, value: i64) {
        self.key(name);
        self.value_int(value);
    }

    pub fn prop_bool(&mut self, name: &str, value: bool) {
        self.key(name);
        self.value_bool(value);
    }

    /// RGB color triple, no axis handling.
    pub fn prop_color(&mut self, name: &str, color: [f32; 3]) {
        self.key(name);
        self.begin_array();
        for c in color {
            self.value_f(c);
        }
        self.end_array();
    }

    /// A position/direction/scale vector, Y/Z swapped for the runtime's
    /// coordinate convention.
    pub fn prop_vector(&mut self, name: &str, v: Vec3) {
        self.key(name);
        self.begin_array();
        self.value_f(v.x);
        self.value_f(v.z);
        self.value_f(v.y);
        self.end_array();
    }

    /// A rotation quaternion, Y/Z swapped with w negated.
    pub fn prop_quaternion(&mut self, name: &str, q: Quat) {
        self.key(name);
        self.begin_array();
        self.value_f(q.x);
        self.value_f(q.z);
        self.value_f(q.y);
        self.value_f(-q.w);
        self.end_array();
    }

    /// A 4x4 matrix, flattened column-major.
    pub fn prop_matrix(&mut self, name: &str, m: &Mat4) {
        self.key(name);
        self.begin_array();
        for v in m.to_cols_array() {
            self.value_f(v);
        }
        self.end_array();
    }

    /// A flat float buffer, wrapped every [`VERTEX_OUTPUT_PER_LINE`] elements.
    pub fn prop_array_f(&mut self, name: &str, values: &[f32]) {
        self.key(name);
        self.begin_array();
        for (i, v) in values.iter().enumerate() {
            if i > 0 && i % VERTEX_OUTPUT_PER_LINE == 0 {
                self.newline();
            }
            self.value_f(*v);
        }
        self.end_array();
    }

    /// A flat integer buffer, wrapped like [`Self::prop_array_f`].
    pub fn prop_array_int(&mut self, name: &str, values: &[i64]) {
        self.key(name);
        self.begin_array();
        for (i, v) in values.iter().enumerate() {
            if i > 0 && i % VERTEX_OUTPUT_PER_LINE == 0 {
                self.newline();
            }
            self.value_int(*v);
        }
        self.end_array();
    }

    /// A vector buffer, flattened with the Y/Z swap applied per element.
    pub fn prop_vector_array(&mut self, name: &str, values: &[Vec3]) {
        self.key(name);
        self.begin_array();
        for (i, v) in values.iter().enumerate() {
            if i > 0 && (i * 3) % VERTEX_OUTPUT_PER_LINE < 3 {
                self.newline();
            }
            self.value_f(v.x);
            self.value_f(v.z);
            self.value_f(v.y);
        }
        self.end_array();
    }
}

impl Default for JsonWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_f() {
        assert_eq!(format_f(1.0), "1");
        assert_eq!(format_f(0.5), "0.5");
        assert_eq!(format_f(0.123456), "0.1235");
        assert_eq!(format_f(-0.00001), "0");
        assert_eq!(format_f(-2.5), "-2.5");
    }

    #[test]
    fn test_format_f_matches_quantize() {
        // the textual rounding and the numeric comparison must agree
        for v in [0.12344_f32, 0.12346, -0.00004, 3.14159, -7.5] {
            let shown: f32 = format_f(v).parse().unwrap();
            assert_eq!(crate::types::quantize(shown), crate::types::quantize(v));
        }
    }

    #[test]
    fn test_object_separators() {
        let mut w = JsonWriter::new();
        w.begin_object();
        w.prop_string("name", "box");
        w.prop_int("count", 3);
        w.prop_bool("visible", true);
        w.end_object();
        assert_eq!(w.finish(), r#"{"name":"box","count":3,"visible":true}"#);
    }

    #[test]
    fn test_vector_axis_swap() {
        let mut w = JsonWriter::new();
        w.begin_object();
        w.prop_vector("position", Vec3::new(1.0, 2.0, 3.0));
        w.end_object();
        assert_eq!(w.finish(), r#"{"position":[1,3,2]}"#);
    }

    #[test]
    fn test_quaternion_swap_and_negate() {
        let mut w = JsonWriter::new();
        w.begin_object();
        w.prop_quaternion("rotationQuaternion", Quat::from_xyzw(0.1, 0.2, 0.3, 0.9));
        w.end_object();
        assert_eq!(
            w.finish(),
            r#"{"rotationQuaternion":[0.1,0.3,0.2,-0.9]}"#
        );
    }

    #[test]
    fn test_string_escaping() {
        let mut w = JsonWriter::new();
        w.begin_object();
        w.prop_string("name", "a\"b\\c");
        w.end_object();
        assert_eq!(w.finish(), r#"{"name":"a\"b\\c"}"#);
    }

    #[test]
    fn test_nested_arrays() {
        let mut w = JsonWriter::new();
        w.begin_object();
        w.key("subMeshes");
        w.begin_array();
        for i in 0..2 {
            w.begin_object();
            w.prop_int("materialIndex", i);
            w.end_object();
        }
        w.end_array();
        w.end_object();
        assert_eq!(
            w.finish(),
            r#"{"subMeshes":[{"materialIndex":0},{"materialIndex":1}]}"#
        );
    }
}
