//! Bone-influence packing.
//!
//! Raw influences arrive as arbitrary-length (weight, bone) lists per welded
//! vertex. The runtime wants fixed-width buffers: 4 slots per vertex, plus a
//! second set of 4 when up to 8 influencers are in use, with bone indices
//! optionally compressed 4-per-u32.

/// Influence histogram gathered while welding, reported to the log.
#[derive(Debug, Default, Clone)]
pub struct InfluenceStats {
    pub total_influencers: usize,
    pub highest_observed: u32,
    /// Count of vertices by influence count; slot 0 collects everything past 8.
    pub influence_counts: [usize; 9],
}

impl InfluenceStats {
    /// Record one freshly welded vertex with `n` raw influences.
    pub fn record(&mut self, n: usize) {
        self.total_influencers += n;
        if n <= 8 {
            self.influence_counts[n] += 1;
        } else {
            self.influence_counts[0] += 1;
        }
        self.highest_observed = self.highest_observed.max(n as u32);
    }

    /// Vertex count at the highest observed influence count.
    pub fn vertices_at_highest(&self) -> usize {
        let slot = if self.highest_observed < 9 {
            self.highest_observed as usize
        } else {
            0
        };
        self.influence_counts[slot]
    }
}

/// Fixed-width skinning buffers for one mesh chunk.
#[derive(Debug, Default)]
pub struct FixedInfluences {
    /// Effective influencer width, `min(configured, highest observed)`.
    pub num_influencers: u32,
    /// True when the configured maximum was outside `[1, 8]` and reset to 8.
    pub clamped: bool,
    /// Vertices that had more influences than the width allows.
    pub truncated_count: usize,
    pub weights: Vec<f32>,
    pub indices: Vec<u32>,
    pub weights_extra: Option<Vec<f32>>,
    pub indices_extra: Option<Vec<u32>>,
}

/// Fix raw per-vertex influences to the configured width.
///
/// Vertices over the width keep their highest-weight influences; missing slots
/// are padded with weight 0.0 / bone 0.
pub fn to_fixed_influencers(
    weights_per_vertex: &[Vec<f32>],
    indices_per_vertex: &[Vec<u32>],
    max_influencers: u32,
    highest_observed: u32,
) -> FixedInfluences {
    let mut out = FixedInfluences::default();

    let mut max_influencers = max_influencers;
    if !(1..=8).contains(&max_influencers) {
        max_influencers = 8;
        out.clamped = true;
    }

    out.num_influencers = max_influencers.min(highest_observed);
    let need_extras = out.num_influencers > 4;

    let mut weights_extra = Vec::new();
    let mut indices_extra = Vec::new();

    for (weights, indices) in weights_per_vertex.iter().zip(indices_per_vertex) {
        let n = weights.len();
        let mut weights = weights.clone();
        let mut indices = indices.clone();

        if n as u32 > out.num_influencers {
            out.truncated_count += 1;
            sort_by_descending_influence(&mut weights, &mut indices);
        }

        for j in 0..4 {
            out.weights.push(if n > j { weights[j] } else { 0.0 });
            out.indices.push(if n > j { indices[j] } else { 0 });
        }
        if need_extras {
            for j in 4..8 {
                weights_extra.push(if n > j { weights[j] } else { 0.0 });
                indices_extra.push(if n > j { indices[j] } else { 0 });
            }
        }
    }

    if need_extras {
        out.weights_extra = Some(weights_extra);
        out.indices_extra = Some(indices_extra);
    }

    out
}

/// Sort parallel weight/index arrays by descending weight. A bubble pass is
/// plenty at 8 entries; stability beyond weight order is not required.
fn sort_by_descending_influence(weights: &mut [f32], indices: &mut [u32]) {
    let mut sorted = false;
    while !sorted {
        sorted = true;
        for i in 1..weights.len() {
            if weights[i - 1] < weights[i] {
                weights.swap(i - 1, i);
                indices.swap(i - 1, i);
                sorted = false;
            }
        }
    }
}

/// Pack each group of 4 bone indices into one u32: slot 0 in bits 0-7,
/// slot 1 in bits 8-15, slot 2 in bits 16-23, slot 3 in bits 24-31.
/// Assumes [`to_fixed_influencers`] ran, so the length is a multiple of 4.
pub fn pack_bone_indices(indices: &[u32]) -> Vec<u32> {
    indices
        .chunks_exact(4)
        .map(|group| group[0] | group[1] << 8 | group[2] << 16 | group[3] << 24)
        .collect()
}
