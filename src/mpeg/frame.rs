use crate::io::BitReader;
use crate::{errors, Result};

use super::types::*;

/// Bit-rate lookup table for MPEG version 1 layer 1.
static BIT_RATES_MPEG1_L1: [u32; 15] = [
    0, 32_000, 64_000, 96_000, 128_000, 160_000, 192_000, 224_000, 256_000, 288_000, 320_000,
    352_000, 384_000, 416_000, 448_000,
];

/// Bit-rate lookup table for MPEG version 1 layer 2.
static BIT_RATES_MPEG1_L2: [u32; 15] = [
    0, 32_000, 48_000, 56_000, 64_000, 80_000, 96_000, 112_000, 128_000, 160_000, 192_000,
    224_000, 256_000, 320_000, 384_000,
];

/// Bit-rate lookup table for MPEG version 1 layer 3.
static BIT_RATES_MPEG1_L3: [u32; 15] = [
    0, 32_000, 40_000, 48_000, 56_000, 64_000, 80_000, 96_000, 112_000, 128_000, 160_000, 192_000,
    224_000, 256_000, 320_000,
];

/// Bit-rate lookup table for MPEG version 2 & 2.5 layer 1.
static BIT_RATES_MPEG2_L1: [u32; 15] = [
    0, 32_000, 48_000, 56_000, 64_000, 80_000, 96_000, 112_000, 128_000, 144_000, 160_000,
    176_000, 192_000, 224_000, 256_000,
];

/// Bit-rate lookup table for MPEG version 2 & 2.5 layers 2 and 3.
static BIT_RATES_MPEG2_L23: [u32; 15] = [
    0, 8_000, 16_000, 24_000, 32_000, 40_000, 48_000, 56_000, 64_000, 80_000, 96_000, 112_000,
    128_000, 144_000, 160_000,
];

/// Mp3 header is as follows [4 bytes]:
///
/// AAAAAAAA AAABBCCD EEEEFFGH IIJJKLMM
///
/// A => sync bits [should be all 1]  | H => private bit
/// B => mpeg version                 | I => channel mode
/// C => layer                        | J => mode extension
/// D => is crc present               | K => copyright
/// E => bit rate                     | L => original
/// F => sampling rate                | M => emphasis while encoding
///
/// Returns `None` for anything that is not a syntactically valid header;
/// during stream discovery that is a recoverable mis-sync, not an error.
pub fn parse_frame_header(b: &[u8]) -> Option<FrameHeader> {
    if b.len() < 4 {
        return None;
    }
    if b[0] != 0xFF || (b[1] & 0xE0) != 0xE0 {
        return None;
    }

    let version = match (b[1] >> 3) & 0x03 {
        0b00 => MpegVersion::Mpeg2p5,
        0b10 => MpegVersion::Mpeg2,
        0b11 => MpegVersion::Mpeg1,
        _ => return None,
    };

    let layer = match (b[1] >> 1) & 0x03 {
        0b01 => MpegLayer::LayerIII,
        0b10 => MpegLayer::LayerII,
        0b11 => MpegLayer::LayerI,
        _ => return None,
    };

    let has_crc = (b[1] & 0x01) == 0;

    // free-format (0) and reserved (15) bit rates are both rejected
    let bitrate_index = ((b[2] >> 4) & 0x0F) as usize;
    if bitrate_index == 0 || bitrate_index == 15 {
        return None;
    }
    let bitrate = match (version, layer) {
        (MpegVersion::Mpeg1, MpegLayer::LayerI) => BIT_RATES_MPEG1_L1[bitrate_index],
        (MpegVersion::Mpeg1, MpegLayer::LayerII) => BIT_RATES_MPEG1_L2[bitrate_index],
        (MpegVersion::Mpeg1, MpegLayer::LayerIII) => BIT_RATES_MPEG1_L3[bitrate_index],
        (_, MpegLayer::LayerI) => BIT_RATES_MPEG2_L1[bitrate_index],
        (_, _) => BIT_RATES_MPEG2_L23[bitrate_index],
    };

    let sample_rate = match ((b[2] >> 2) & 0x03, version) {
        (0b00, MpegVersion::Mpeg1) => 44_100,
        (0b01, MpegVersion::Mpeg1) => 48_000,
        (0b10, MpegVersion::Mpeg1) => 32_000,
        (0b00, MpegVersion::Mpeg2) => 22_050,
        (0b01, MpegVersion::Mpeg2) => 24_000,
        (0b10, MpegVersion::Mpeg2) => 16_000,
        (0b00, MpegVersion::Mpeg2p5) => 11_025,
        (0b01, MpegVersion::Mpeg2p5) => 12_000,
        (0b10, MpegVersion::Mpeg2p5) => 8_000,
        _ => return None,
    };

    let has_padding = (b[2] >> 1) & 0x01 == 1;

    let channel_mode = match (b[3] >> 6) & 0x03 {
        0b00 => ChannelMode::Stereo,
        0b01 => ChannelMode::JointStereo,
        0b10 => ChannelMode::DualMono,
        _ => ChannelMode::Mono,
    };

    // full frame length, header bytes included
    let pad = if has_padding { 1 } else { 0 };
    let frame_size = match layer {
        MpegLayer::LayerI => ((12 * bitrate / sample_rate + pad) * 4) as usize,
        _ => {
            let factor = match version {
                MpegVersion::Mpeg1 => 144,
                _ => 72,
            };
            (factor * bitrate / sample_rate + pad) as usize
        }
    };

    Some(FrameHeader {
        version,
        layer,
        bitrate,
        sample_rate,
        channel_mode,
        has_crc,
        has_padding,
        frame_size,
    })
}

fn read_granule_channel_side_info(
    br: &mut BitReader,
    is_mpeg1: bool,
    gc: &mut GranuleChannel,
) -> Result<()> {
    gc.part2_3_length = br.read_bits(12)? as u16;
    gc.big_values = br.read_bits(9)? as u16;
    gc.global_gain = br.read_bits(8)? as u8;
    gc.scalefac_compress = if is_mpeg1 {
        br.read_bits(4)
    } else {
        br.read_bits(9)
    }? as u16;

    gc.window_switching = br.read_bit()?;
    if gc.window_switching {
        let block_type_enc = br.read_bits(2)?;
        let is_mixed = br.read_bit()?;

        gc.block_type = match block_type_enc {
            // Long block types are not allowed with window switching.
            0b00 => return errors::parse_error("invalid block type with window switching"),
            0b01 => BlockType::Start,
            0b10 => BlockType::Short { is_mixed },
            0b11 => BlockType::End,
            _ => unreachable!(),
        };
        // only the first two region tables are transmitted
        for i in 0..2 {
            gc.table_select[i] = br.read_bits(5)? as u8;
        }
        for i in 0..3 {
            gc.subblock_gain[i] = br.read_bits(3)? as u8;
        }
        // region counts are implicit for switched blocks; nothing downstream
        // reads them, so they stay zero
    } else {
        // If window switching is not used, the block type is always Long.
        gc.block_type = BlockType::Long;

        for i in 0..3 {
            gc.table_select[i] = br.read_bits(5)? as u8;
        }

        gc.region0_count = br.read_bits(4)? as u8;
        gc.region1_count = br.read_bits(3)? as u8;
    }

    gc.preflag = if is_mpeg1 { br.read_bit()? } else { false };
    gc.scalefac_scale = br.read_bit()?;
    gc.count1table_select = br.read_bit()?;

    Ok(())
}

/// Reads the side-info block of the frame starting at byte `offset`.
///
/// The reader runs over the whole blob so that a truncated final frame
/// surfaces as a parse error rather than an index panic.
pub fn read_side_info(blob: &[u8], offset: usize, header: &FrameHeader) -> Result<SideInfo> {
    let mut side_info: SideInfo = Default::default();
    let start_bit = ((offset + 4 + header.crc_len()) * 8) as u64;
    let mut br = BitReader::at(blob, start_bit);

    let num_channels = header.num_channels();
    let is_mpeg1 = header.version == MpegVersion::Mpeg1;

    if is_mpeg1 {
        side_info.main_data_begin = br.read_bits(9)? as u16;
        // skip private bits
        if num_channels == 1 {
            br.skip_bits(5)?;
        } else {
            br.skip_bits(3)?;
        }

        // read scfsi
        for scfsi in &mut side_info.scfsi[..num_channels] {
            for band in scfsi.iter_mut() {
                *band = br.read_bit()?;
            }
        }
    } else {
        side_info.main_data_begin = br.read_bits(8)? as u16;
        if num_channels == 1 {
            br.skip_bits(1)?;
        } else {
            br.skip_bits(2)?;
        }
    }

    for granule in &mut side_info.granules[..header.num_granules()] {
        for gc in &mut granule.channels[..num_channels] {
            read_granule_channel_side_info(&mut br, is_mpeg1, gc)?;
        }
    }

    Ok(side_info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::BitWriter;

    // 128 kbit/s, 44.1 kHz, mono, no CRC, no padding
    const MONO_HEADER: [u8; 4] = [0xFF, 0xFB, 0x90, 0xC0];

    #[test]
    fn parses_mpeg1_layer3_header() {
        let h = parse_frame_header(&MONO_HEADER).unwrap();
        assert_eq!(h.version, MpegVersion::Mpeg1);
        assert_eq!(h.layer, MpegLayer::LayerIII);
        assert_eq!(h.bitrate, 128_000);
        assert_eq!(h.sample_rate, 44_100);
        assert_eq!(h.channel_mode, ChannelMode::Mono);
        assert!(!h.has_crc);
        assert!(!h.has_padding);
        assert_eq!(h.frame_size, 417);
        assert_eq!(h.side_info_len(), 17);
        assert_eq!(h.num_granules(), 2);
        assert_eq!(h.main_data_offset(), 21);
    }

    #[test]
    fn padding_extends_frame_by_one_byte() {
        let padded = [0xFF, 0xFB, 0x92, 0xC0];
        assert_eq!(parse_frame_header(&padded).unwrap().frame_size, 418);
    }

    #[test]
    fn stereo_sizes() {
        let stereo = [0xFF, 0xFB, 0x90, 0x00];
        let h = parse_frame_header(&stereo).unwrap();
        assert_eq!(h.channel_mode, ChannelMode::Stereo);
        assert_eq!(h.num_channels(), 2);
        assert_eq!(h.side_info_len(), 32);
        // frame length does not depend on the channel mode
        assert_eq!(h.frame_size, 417);
    }

    #[test]
    fn crc_flag_is_inverted_protection_bit() {
        let with_crc = [0xFF, 0xFA, 0x90, 0xC0];
        let h = parse_frame_header(&with_crc).unwrap();
        assert!(h.has_crc);
        assert_eq!(h.crc_len(), 2);
        assert_eq!(h.main_data_offset(), 23);
    }

    #[test]
    fn rejects_invalid_headers() {
        // bad sync
        assert!(parse_frame_header(&[0xFF, 0x1B, 0x90, 0xC0]).is_none());
        // reserved version
        assert!(parse_frame_header(&[0xFF, 0xEB, 0x90, 0xC0]).is_none());
        // reserved layer
        assert!(parse_frame_header(&[0xFF, 0xF9, 0x90, 0xC0]).is_none());
        // free-format and reserved bit rates
        assert!(parse_frame_header(&[0xFF, 0xFB, 0x00, 0xC0]).is_none());
        assert!(parse_frame_header(&[0xFF, 0xFB, 0xF0, 0xC0]).is_none());
        // reserved sample rate
        assert!(parse_frame_header(&[0xFF, 0xFB, 0x9C, 0xC0]).is_none());
        // short slice
        assert!(parse_frame_header(&[0xFF, 0xFB, 0x90]).is_none());
    }

    #[test]
    fn mpeg2_uses_smaller_factor() {
        // MPEG-2, layer 3, 64 kbit/s (index 8), 22.05 kHz, mono
        let h = parse_frame_header(&[0xFF, 0xF3, 0x80, 0xC0]).unwrap();
        assert_eq!(h.version, MpegVersion::Mpeg2);
        assert_eq!(h.bitrate, 64_000);
        assert_eq!(h.sample_rate, 22_050);
        assert_eq!(h.frame_size, 72 * 64_000 / 22_050);
        assert_eq!(h.side_info_len(), 9);
        assert_eq!(h.num_granules(), 1);
    }

    fn put_bits(buf: &mut [u8], cursor: &mut u64, value: u32, n: u32) {
        let mut bw = BitWriter::new(buf);
        for k in (0..n).rev() {
            bw.set_bit(*cursor, (value >> k) & 1 == 1).unwrap();
            *cursor += 1;
        }
    }

    #[test]
    fn side_info_roundtrips_through_parser() {
        let header = parse_frame_header(&MONO_HEADER).unwrap();
        let mut frame = vec![0u8; header.frame_size];
        frame[..4].copy_from_slice(&MONO_HEADER);

        let mut cursor = 32u64;
        put_bits(&mut frame, &mut cursor, 5, 9); // main_data_begin
        put_bits(&mut frame, &mut cursor, 0, 5); // private bits
        put_bits(&mut frame, &mut cursor, 0b1010, 4); // scfsi
        for gain in &[170u32, 176] {
            put_bits(&mut frame, &mut cursor, 789, 12); // part2_3_length
            put_bits(&mut frame, &mut cursor, 94, 9); // big_values
            put_bits(&mut frame, &mut cursor, *gain, 8); // global_gain
            put_bits(&mut frame, &mut cursor, 9, 4); // scalefac_compress
            put_bits(&mut frame, &mut cursor, 0, 1); // window_switching
            put_bits(&mut frame, &mut cursor, 1, 5); // table_select[0]
            put_bits(&mut frame, &mut cursor, 2, 5); // table_select[1]
            put_bits(&mut frame, &mut cursor, 3, 5); // table_select[2]
            put_bits(&mut frame, &mut cursor, 6, 4); // region0_count
            put_bits(&mut frame, &mut cursor, 4, 3); // region1_count
            put_bits(&mut frame, &mut cursor, 1, 1); // preflag
            put_bits(&mut frame, &mut cursor, 0, 1); // scalefac_scale
            put_bits(&mut frame, &mut cursor, 1, 1); // count1table_select
        }
        assert_eq!(cursor, 32 + 136);

        let si = read_side_info(&frame, 0, &header).unwrap();
        assert_eq!(si.main_data_begin, 5);
        assert_eq!(si.scfsi[0], [true, false, true, false]);

        let g0 = &si.granules[0].channels[0];
        assert_eq!(g0.part2_3_length, 789);
        assert_eq!(g0.big_values, 94);
        assert_eq!(g0.global_gain, 170);
        assert_eq!(g0.scalefac_compress, 9);
        assert!(!g0.window_switching);
        assert_eq!(g0.block_type, BlockType::Long);
        assert_eq!(g0.table_select, [1, 2, 3]);
        assert_eq!(g0.region0_count, 6);
        assert_eq!(g0.region1_count, 4);
        assert!(g0.preflag);
        assert!(!g0.scalefac_scale);
        assert!(g0.count1table_select);

        let g1 = &si.granules[1].channels[0];
        assert_eq!(g1.global_gain, 176);
    }

    #[test]
    fn truncated_side_info_is_a_parse_error() {
        // a frame header at the very end of the buffer with no room for the
        // side-info block behind it
        let mut blob = vec![0u8; 8];
        blob[..4].copy_from_slice(&MONO_HEADER);
        let header = parse_frame_header(&MONO_HEADER).unwrap();
        assert!(read_side_info(&blob, 0, &header).is_err());
    }
}
