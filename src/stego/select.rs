use std::cmp;

use num_traits::clamp;
use sha2::{Digest, Sha256};

use crate::mpeg::FrameRecord;

/// Bits kept clear at each end of a frame's main-data region. The head
/// margin keeps carriers away from side-info locality, the tail margin away
/// from the next frame header.
pub const START_MARGIN: u64 = 16;
pub const END_MARGIN: u64 = 16;

/// Domain-separation prefix of the position-ranking digest. This string is
/// part of the embedded-stream wire contract: changing it orphans every
/// payload written by an earlier build.
const RANK_DOMAIN: &[u8] = b"mp3lsbsteg/pos-rank/v1";

/// Computes the per-frame loudness threshold for the gain mask: frame mean
/// `global_gain` values sorted ascending, picked at the given percentile.
/// `None` (or no frames) disables the mask.
pub fn gain_threshold(records: &[FrameRecord], percentile: Option<f64>) -> Option<f64> {
    let p = percentile?;
    if records.is_empty() {
        return None;
    }
    let mut values: Vec<f64> = records.iter().map(|r| r.mean_global_gain()).collect();
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(cmp::Ordering::Equal));
    let p = clamp(p, 0.0, 1.0);
    let index = (p * (values.len() - 1) as f64) as usize;
    Some(values[index])
}

/// Derives the carrier stride and starting offset for one frame from
/// SHA-256(frame_index_be32 || key). The stride is forced odd in 17..=41 so
/// consecutive carriers never fall into a trivial byte-aligned cycle.
fn stride_and_offset(key: Option<&str>, frame_index: u32) -> (u64, u64) {
    let mut hasher = Sha256::new();
    hasher.update(frame_index.to_be_bytes());
    if let Some(k) = key {
        hasher.update(k.as_bytes());
    }
    let digest = hasher.finalize();

    let mut stride = 17 + (digest[0] % 25) as u64;
    if stride % 2 == 0 {
        stride += 1;
    }
    let offset = digest[1] as u64 % stride;
    (stride, offset)
}

/// Deterministic per-position rank. Lower score = earlier pick. Without a
/// key the natural file order is kept by scoring a position with itself.
fn position_score(key: Option<&str>, frame_index: u64, pos: u64) -> u64 {
    let key = match key {
        Some(k) => k,
        None => return pos,
    };
    let mut hasher = Sha256::new();
    hasher.update(RANK_DOMAIN);
    hasher.update(key.as_bytes());
    hasher.update(frame_index.to_be_bytes());
    hasher.update(pos.to_be_bytes());
    let digest = hasher.finalize();

    let mut word = [0u8; 8];
    word.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(word)
}

/// Content-independent carrier positions inside `[start_bit, end_bit)`:
/// walk forward from the PRF-chosen offset in PRF-chosen strides, stopping
/// after `max_take` hits.
fn deterministic_positions(
    start_bit: u64,
    end_bit: u64,
    key: Option<&str>,
    frame_index: usize,
    max_take: u64,
) -> Vec<u64> {
    if end_bit <= start_bit {
        return Vec::new();
    }
    let (stride, offset) = stride_and_offset(key, frame_index as u32);

    let mut out = Vec::new();
    let mut p = start_bit + offset;
    while p < end_bit {
        out.push(p);
        if out.len() as u64 >= max_take {
            break;
        }
        p += stride;
    }
    out
}

/// Builds the ranked carrier positions (absolute file bits) for one frame.
///
/// Selection depends only on the frame index, the frame's geometry, the key
/// and the gain mask -- never on main-data content -- so embed and extract
/// replay the identical sequence even though embedding mutates the main
/// data in between.
pub fn select_positions(
    record: &FrameRecord,
    frame_index: usize,
    fraction: f64,
    bits_per_frame: Option<u8>,
    key: Option<&str>,
    min_gain: Option<f64>,
) -> Vec<u64> {
    if let Some(min_gain) = min_gain {
        if record.mean_global_gain() < min_gain {
            return Vec::new();
        }
    }

    let eff_start = record.file_main_start_bit() + START_MARGIN;
    let eff_end = cmp::max(
        eff_start,
        record.file_main_end_bit().saturating_sub(END_MARGIN),
    );
    if eff_end <= eff_start {
        return Vec::new();
    }

    // pacing: roughly one carrier per 20 window bits, scaled by `fraction`,
    // clamped by the per-frame cap
    let span = eff_end - eff_start;
    let mut want = cmp::max(1, span / 20);
    if fraction < 1.0 {
        want = cmp::max(1, (want as f64 * fraction + 1e-9) as u64);
    }
    if let Some(cap) = bits_per_frame {
        want = cmp::min(want, cap as u64);
    }

    let positions = deterministic_positions(eff_start, eff_end, key, frame_index, want);

    // The stride walk emits strictly increasing positions, so there are no
    // duplicates to collapse; ranking is a pure reorder.
    let mut scored: Vec<(u64, u64)> = positions
        .into_iter()
        .map(|p| (position_score(key, frame_index as u64, p), p))
        .collect();
    scored.sort_by_key(|&(score, _)| score);
    if let Some(cap) = bits_per_frame {
        scored.truncate(cap as usize);
    }

    scored.into_iter().map(|(_, p)| p).collect()
}
