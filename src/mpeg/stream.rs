use std::cmp;

use bitflags::bitflags;
use tracing::debug;

use crate::Result;

use super::frame::{parse_frame_header, read_side_info};
use super::types::{FrameHeader, SideInfo};

bitflags! {
    /// Flag byte of an ID3v2 tag header.
    struct Id3v2Flags: u8 {
        const UNSYNCHRONISATION = 0x80;
        const EXTENDED_HEADER   = 0x40;
        const EXPERIMENTAL      = 0x20;
        const FOOTER_PRESENT    = 0x10;
    }
}

fn synchsafe_to_u32(b: &[u8]) -> u32 {
    ((b[0] & 0x7F) as u32) << 21
        | ((b[1] & 0x7F) as u32) << 14
        | ((b[2] & 0x7F) as u32) << 7
        | (b[3] & 0x7F) as u32
}

/// Returns the byte length of a leading ID3v2 tag, or 0 if there is none.
pub fn skip_id3v2(data: &[u8]) -> usize {
    if data.len() < 10 || &data[0..3] != b"ID3" {
        return 0;
    }
    let flags = Id3v2Flags::from_bits_truncate(data[5]);
    let size = synchsafe_to_u32(&data[6..10]) as usize;
    let footer = if flags.contains(Id3v2Flags::FOOTER_PRESENT) {
        10
    } else {
        0
    };
    10 + size + footer
}

/// Collects (offset, header) for every parseable frame. A byte run that does
/// not parse as a header, or whose computed length is shorter than 5 bytes or
/// overruns the buffer, is treated as a mis-sync: advance one byte and retry.
fn scan_raw(data: &[u8]) -> Vec<(usize, FrameHeader)> {
    let mut frames = Vec::new();
    let mut i = skip_id3v2(data);
    while i + 4 <= data.len() {
        match parse_frame_header(&data[i..]) {
            Some(header) if header.frame_size >= 5 && i + header.frame_size <= data.len() => {
                i += header.frame_size;
                frames.push((i - header.frame_size, header));
            }
            _ => i += 1,
        }
    }
    frames
}

/// A Xing/Info/VBRI informational frame carries no audio and is dropped so
/// that frame indices line up with the audio packet list.
fn looks_like_vbr_header(data: &[u8], offset: usize, header: &FrameHeader) -> bool {
    let body = offset + header.main_data_offset();
    let end = cmp::min(offset + header.frame_size, body + 128);
    if body >= end {
        return false;
    }
    data[body..end]
        .windows(4)
        .any(|w| w == b"Xing" || w == b"Info" || w == b"VBRI")
}

/// One audio frame together with the side-info geometry the embedder needs.
pub struct FrameRecord {
    /// byte offset of the frame header in the blob
    pub offset: usize,
    /// full frame length in bytes
    pub size: usize,
    pub header: FrameHeader,
    pub side_info: SideInfo,
    /// per-(granule, channel) part2+3 bit windows in reservoir coordinates.
    /// Starts can be negative when `main_data_begin` points before the first
    /// contributing frame.
    pub windows: [[(i64, i64); 2]; 2],
    /// main-data bits this frame contributes to the reservoir
    pub available_main_bits: u64,
}

impl FrameRecord {
    /// Absolute file bit where this frame's main-data region starts.
    pub fn file_main_start_bit(&self) -> u64 {
        ((self.offset + self.header.main_data_offset()) * 8) as u64
    }

    /// Absolute file bit just past this frame's main-data region.
    pub fn file_main_end_bit(&self) -> u64 {
        self.file_main_start_bit() + self.available_main_bits
    }

    /// Arithmetic mean of `global_gain` across granules and channels.
    pub fn mean_global_gain(&self) -> f64 {
        let mut sum = 0u32;
        let mut count = 0u32;
        for g in 0..self.header.num_granules() {
            for ch in 0..self.header.num_channels() {
                sum += self.side_info.granules[g].channels[ch].global_gain as u32;
                count += 1;
            }
        }
        sum as f64 / cmp::max(1, count) as f64
    }
}

/// Lists (offset, size) for every audio frame, ID3v2 skipped and any leading
/// VBR informational frame dropped.
pub fn frame_positions(data: &[u8]) -> Vec<(usize, usize)> {
    let mut frames = scan_raw(data);
    if let Some((offset, header)) = frames.first() {
        if looks_like_vbr_header(data, *offset, header) {
            frames.remove(0);
        }
    }
    frames
        .into_iter()
        .map(|(offset, header)| (offset, header.frame_size))
        .collect()
}

/// Parses every audio frame into a [`FrameRecord`], tracking the running
/// reservoir so each granule window lands at its reservoir coordinates.
///
/// Side-info that cannot be read where a frame header was already accepted
/// is a hard error. Frames whose side-info overhead exceeds the frame length
/// contribute nothing and are dropped, like the VBR header frame.
pub fn frame_records(blob: &[u8]) -> Result<Vec<FrameRecord>> {
    let mut raw = scan_raw(blob);
    if let Some((offset, header)) = raw.first() {
        if looks_like_vbr_header(blob, *offset, header) {
            raw.remove(0);
        }
    }

    let mut records = Vec::with_capacity(raw.len());
    let mut reservoir_end: i64 = 0;

    for (offset, header) in raw {
        let side_info = read_side_info(blob, offset, &header)?;

        let total_bits = header.frame_size * 8;
        let overhead_bits = header.main_data_offset() * 8;
        if total_bits < overhead_bits {
            continue;
        }
        let available_main_bits = (total_bits - overhead_bits) as u64;

        let mut windows = [[(0i64, 0i64); 2]; 2];
        let mut read_ptr = reservoir_end - side_info.main_data_begin as i64 * 8;
        for (g, window_row) in windows.iter_mut().enumerate().take(header.num_granules()) {
            for (ch, window) in window_row.iter_mut().enumerate().take(header.num_channels()) {
                let len = side_info.granules[g].channels[ch].part2_3_length as i64;
                *window = (read_ptr, read_ptr + len);
                read_ptr += len;
            }
        }
        reservoir_end += available_main_bits as i64;

        records.push(FrameRecord {
            offset,
            size: header.frame_size,
            header,
            side_info,
            windows,
            available_main_bits,
        });
    }

    debug!(frames = records.len(), "scanned audio frames");
    Ok(records)
}

/// One reservoir segment: the main-data bits a single frame contributes,
/// located at `file_start_bit` in the blob.
#[derive(Debug, Clone, Copy)]
pub struct ReservoirSegment {
    pub res_start: i64,
    pub res_end: i64,
    pub file_start_bit: u64,
}

/// Maps logical bit-reservoir coordinates onto absolute file bits.
///
/// The reservoir is the concatenation of each frame's main-data bits in
/// file order; a granule window expressed in reservoir coordinates resolves
/// to file bits through the segment that contains it.
pub struct ReservoirMap {
    segments: Vec<ReservoirSegment>,
}

impl ReservoirMap {
    pub fn build(records: &[FrameRecord]) -> ReservoirMap {
        let mut segments = Vec::with_capacity(records.len());
        let mut res_cursor: i64 = 0;
        for record in records {
            if record.available_main_bits == 0 {
                continue;
            }
            segments.push(ReservoirSegment {
                res_start: res_cursor,
                res_end: res_cursor + record.available_main_bits as i64,
                file_start_bit: record.file_main_start_bit(),
            });
            res_cursor += record.available_main_bits as i64;
        }
        ReservoirMap { segments }
    }

    /// Resolves a reservoir bit to its absolute file bit. Bits before the
    /// first segment (negative back-references) or past the last one have
    /// no file location.
    pub fn file_bit(&self, res_bit: i64) -> Option<u64> {
        let i = self.segments.partition_point(|s| s.res_start <= res_bit);
        if i == 0 {
            return None;
        }
        let segment = self.segments[i - 1];
        if res_bit >= segment.res_end {
            return None;
        }
        Some(segment.file_start_bit + (res_bit - segment.res_start) as u64)
    }

    pub fn segments(&self) -> &[ReservoirSegment] {
        &self.segments
    }
}
