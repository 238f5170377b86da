//! Vertex welding.
//!
//! Source geometry indexes positions and normals per vertex but carries UVs
//! and colors per face corner, so the same topological vertex may need several
//! output vertices. The welder walks face corners in traversal order, reusing
//! an output vertex only when every present attribute matches at output
//! precision AND the match lies inside the current sub-mesh range.

use glam::{Vec2, Vec3};

use crate::types::{same_f32, same_slice, same_vec2, same_vec3};

/// One face corner's attributes, as fed to the welder.
#[derive(Debug, Clone, Copy)]
pub struct Corner<'a> {
    /// Index into the source position pool.
    pub source_vertex: usize,
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Option<Vec2>,
    pub uv2: Option<Vec2>,
    pub color: Option<[f32; 3]>,
    /// Raw bone influences of the source vertex, weights parallel to indices.
    pub weights: Option<&'a [f32]>,
    pub bone_indices: Option<&'a [u32]>,
}

/// A previously emitted vertex, remembered per source vertex.
struct Candidate {
    index: u32,
    normal: Vec3,
    uv: Option<Vec2>,
    uv2: Option<Vec2>,
    color: Option<[f32; 3]>,
    weights: Option<Vec<f32>>,
    bone_indices: Option<Vec<u32>>,
}

impl Candidate {
    fn matches(&self, corner: &Corner) -> bool {
        if !same_vec3(self.normal, corner.normal) {
            return false;
        }
        if let (Some(a), Some(b)) = (self.uv, corner.uv) {
            if !same_vec2(a, b) {
                return false;
            }
        }
        if let (Some(a), Some(b)) = (self.uv2, corner.uv2) {
            if !same_vec2(a, b) {
                return false;
            }
        }
        if let (Some(a), Some(b)) = (self.color, corner.color) {
            if !(same_f32(a[0], b[0]) && same_f32(a[1], b[1]) && same_f32(a[2], b[2])) {
                return false;
            }
        }
        if let (Some(a), Some(b)) = (&self.weights, corner.weights) {
            if !same_slice(a, b) {
                return false;
            }
        }
        if let (Some(a), Some(b)) = (&self.bone_indices, corner.bone_indices) {
            if a.len() != b.len() || a.iter().zip(b.iter()).any(|(x, y)| x != y) {
                return false;
            }
        }
        true
    }
}

/// Deduplicates face corners into output buffers, up to a vertex ceiling.
pub struct VertexWelder {
    max_vertices: usize,
    /// Face normals are used verbatim, so corners sharing a source vertex can
    /// never weld across faces; the candidate scan is skipped entirely.
    flat_shading: bool,
    candidates: Vec<Vec<Candidate>>,

    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    /// Flat u,v pairs; populated only when the mesh has a UV set.
    pub uvs: Vec<f32>,
    pub uvs2: Vec<f32>,
    /// Flat r,g,b,a quads; alpha is always 1.
    pub colors: Vec<f32>,
    /// Raw per-vertex bone influences, fixed to width later.
    pub raw_weights: Vec<Vec<f32>>,
    pub raw_bone_indices: Vec<Vec<u32>>,
    pub indices: Vec<u32>,
}

impl VertexWelder {
    pub fn new(max_vertices: usize, flat_shading: bool, source_vertex_count: usize) -> Self {
        let mut candidates = Vec::with_capacity(source_vertex_count);
        candidates.resize_with(source_vertex_count, Vec::new);
        Self {
            max_vertices,
            flat_shading,
            candidates,
            positions: Vec::new(),
            normals: Vec::new(),
            uvs: Vec::new(),
            uvs2: Vec::new(),
            colors: Vec::new(),
            raw_weights: Vec::new(),
            raw_bone_indices: Vec::new(),
            indices: Vec::new(),
        }
    }

    pub fn vertex_count(&self) -> u32 {
        self.positions.len() as u32
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    /// True when welding another full face could exceed the vertex ceiling.
    /// Checked per face, before its corners are added.
    pub fn face_would_overflow(&self) -> bool {
        self.positions.len() + 3 > self.max_vertices
    }

    /// Resolve one corner to an output vertex and append its index.
    ///
    /// A candidate from an earlier sub-mesh (welded index below
    /// `sub_mesh_vertices_start`) is never reused, even on an attribute match:
    /// each sub-mesh range must stay self-contained. The boundary test is an
    /// additional criterion inside the scan, so later candidates are still
    /// considered.
    pub fn add_corner(&mut self, corner: Corner, sub_mesh_vertices_start: u32) -> u32 {
        let mut resolved = None;

        if !self.flat_shading {
            for candidate in &self.candidates[corner.source_vertex] {
                if candidate.matches(&corner) && candidate.index >= sub_mesh_vertices_start {
                    resolved = Some(candidate.index);
                    break;
                }
            }
        }

        let index = match resolved {
            Some(index) => index,
            None => self.push_vertex(&corner),
        };

        self.indices.push(index);
        index
    }

    fn push_vertex(&mut self, corner: &Corner) -> u32 {
        let index = self.positions.len() as u32;

        self.positions.push(corner.position);
        self.normals.push(corner.normal);
        if let Some(uv) = corner.uv {
            self.uvs.extend_from_slice(&[uv.x, uv.y]);
        }
        if let Some(uv2) = corner.uv2 {
            self.uvs2.extend_from_slice(&[uv2.x, uv2.y]);
        }
        if let Some(color) = corner.color {
            self.colors.extend_from_slice(&[color[0], color[1], color[2], 1.0]);
        }
        if let Some(weights) = corner.weights {
            self.raw_weights.push(weights.to_vec());
        }
        if let Some(bone_indices) = corner.bone_indices {
            self.raw_bone_indices.push(bone_indices.to_vec());
        }

        self.candidates[corner.source_vertex].push(Candidate {
            index,
            normal: corner.normal,
            uv: corner.uv,
            uv2: corner.uv2,
            color: corner.color,
            weights: corner.weights.map(<[f32]>::to_vec),
            bone_indices: corner.bone_indices.map(<[u32]>::to_vec),
        });

        index
    }

    /// Count faces whose resolved corners contain duplicate positions at
    /// output precision. Such faces are reported, not removed.
    pub fn count_zero_area_faces(&self) -> usize {
        let mut count = 0;
        for face in self.indices.chunks_exact(3) {
            let p1 = self.positions[face[0] as usize];
            let p2 = self.positions[face[1] as usize];
            let p3 = self.positions[face[2] as usize];
            if same_vec3(p1, p2) || same_vec3(p1, p3) || same_vec3(p2, p3) {
                count += 1;
            }
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corner(source: usize, pos: [f32; 3], uv: [f32; 2]) -> Corner<'static> {
        Corner {
            source_vertex: source,
            position: Vec3::from_array(pos),
            normal: Vec3::Z,
            uv: Some(Vec2::from_array(uv)),
            uv2: None,
            color: None,
            weights: None,
            bone_indices: None,
        }
    }

    #[test]
    fn test_reuse_on_identical_attributes() {
        let mut welder = VertexWelder::new(100, false, 4);
        let a = welder.add_corner(corner(0, [0.0; 3], [0.0, 0.0]), 0);
        let b = welder.add_corner(corner(0, [0.0; 3], [0.0, 0.0]), 0);
        assert_eq!(a, b);
        assert_eq!(welder.vertex_count(), 1);
        assert_eq!(welder.indices, vec![0, 0]);
    }

    #[test]
    fn test_split_on_differing_uv() {
        let mut welder = VertexWelder::new(100, false, 4);
        let a = welder.add_corner(corner(0, [0.0; 3], [0.0, 0.0]), 0);
        let b = welder.add_corner(corner(0, [0.0; 3], [0.5, 0.0]), 0);
        assert_ne!(a, b);
        assert_eq!(welder.vertex_count(), 2);
    }

    #[test]
    fn test_quantized_comparison_ignores_noise() {
        let mut welder = VertexWelder::new(100, false, 4);
        let a = welder.add_corner(corner(0, [0.0; 3], [0.12344, 0.0]), 0);
        // differs only past the 4th decimal place
        let b = welder.add_corner(corner(0, [0.0; 3], [0.12341, 0.0]), 0);
        assert_eq!(a, b);
    }

    #[test]
    fn test_flat_shading_never_welds() {
        let mut welder = VertexWelder::new(100, true, 4);
        let a = welder.add_corner(corner(0, [0.0; 3], [0.0, 0.0]), 0);
        let b = welder.add_corner(corner(0, [0.0; 3], [0.0, 0.0]), 0);
        assert_ne!(a, b);
        assert_eq!(welder.vertex_count(), 2);
    }

    #[test]
    fn test_sub_mesh_boundary_blocks_reuse() {
        let mut welder = VertexWelder::new(100, false, 4);
        let a = welder.add_corner(corner(0, [0.0; 3], [0.0, 0.0]), 0);
        // same attributes, but the current sub-mesh starts past the candidate
        let b = welder.add_corner(corner(0, [0.0; 3], [0.0, 0.0]), a + 1);
        assert_ne!(a, b);
        // back in a range that includes the original, the first match wins
        let c = welder.add_corner(corner(0, [0.0; 3], [0.0, 0.0]), 0);
        assert_eq!(c, a);
    }

    #[test]
    fn test_determinism() {
        let feed = |welder: &mut VertexWelder| {
            for i in 0..4 {
                let f = i as f32;
                welder.add_corner(corner(i % 2, [f, 0.0, 0.0], [f * 0.1, 0.0]), 0);
            }
        };
        let mut first = VertexWelder::new(100, false, 4);
        let mut second = VertexWelder::new(100, false, 4);
        feed(&mut first);
        feed(&mut second);
        assert_eq!(first.indices, second.indices);
        assert_eq!(first.positions, second.positions);
    }

    #[test]
    fn test_overflow_reports_before_face() {
        let mut welder = VertexWelder::new(4, true, 8);
        assert!(!welder.face_would_overflow());
        for v in 0..3 {
            welder.add_corner(corner(v, [v as f32, 0.0, 0.0], [0.0, 0.0]), 0);
        }
        // 3 + 3 > 4: the next face must go to a new chunk
        assert!(welder.face_would_overflow());
    }

    #[test]
    fn test_zero_area_counted_not_removed() {
        let mut welder = VertexWelder::new(100, false, 4);
        // two corners of the face share one position
        welder.add_corner(corner(0, [0.0; 3], [0.0, 0.0]), 0);
        welder.add_corner(corner(1, [0.0; 3], [0.1, 0.0]), 0);
        welder.add_corner(corner(2, [1.0, 0.0, 0.0], [0.2, 0.0]), 0);
        assert_eq!(welder.count_zero_area_faces(), 1);
        assert_eq!(welder.indices.len(), 3);
    }
}
