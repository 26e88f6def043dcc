//! The `validate` module cross-checks the parsed side-info geometry against
//! the reservoir map. Useful when qualifying a new carrier source: a clean
//! report means the granule windows line up exactly with the declared
//! part2+3 lengths and the reservoir arithmetic resolves where it should.

use tracing::warn;

use crate::mpeg::{frame_records, ReservoirMap};
use crate::Result;

/// Summary of the window/reservoir consistency pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowReport {
    /// audio frames walked
    pub frames: usize,
    /// granule/channel windows inspected
    pub granule_windows: usize,
    /// windows whose span disagrees with `part2_3_length`
    pub length_mismatches: usize,
    /// adjacent windows that overlap within a frame
    pub overlaps: usize,
    /// non-empty windows whose start has no file location (back-references
    /// running off the front of the reservoir)
    pub unresolved_starts: usize,
}

impl WindowReport {
    /// Unresolved starts are expected near the stream head; mismatches and
    /// overlaps are not.
    pub fn is_clean(&self) -> bool {
        self.length_mismatches == 0 && self.overlaps == 0
    }
}

/// Walks every audio frame and checks its granule windows.
pub fn check_windows(blob: &[u8]) -> Result<WindowReport> {
    let records = frame_records(blob)?;
    let map = ReservoirMap::build(&records);

    let mut report = WindowReport::default();
    report.frames = records.len();

    for (index, record) in records.iter().enumerate() {
        let mut flat: Vec<(i64, i64)> = Vec::new();
        for g in 0..record.header.num_granules() {
            for ch in 0..record.header.num_channels() {
                let (start, end) = record.windows[g][ch];
                let length = record.side_info.granules[g].channels[ch].part2_3_length as i64;

                report.granule_windows += 1;
                if end - start != length {
                    report.length_mismatches += 1;
                    warn!(
                        frame = index,
                        granule = g,
                        channel = ch,
                        window = end - start,
                        part2_3_length = length,
                        "window length mismatch"
                    );
                }
                if end > start && map.file_bit(start).is_none() {
                    report.unresolved_starts += 1;
                }
                flat.push((start, end));
            }
        }

        for pair in flat.windows(2) {
            if pair[1].0 < pair[0].1 {
                report.overlaps += 1;
                warn!(frame = index, "granule windows overlap");
            }
        }
    }

    Ok(report)
}
