//! Hand-built CBR carriers for unit tests: MPEG-1 layer III, 128 kbit/s,
//! 44.1 kHz, mono, no CRC, 417-byte frames.

use crate::io::BitWriter;

pub const MONO_HEADER: [u8; 4] = [0xFF, 0xFB, 0x90, 0xC0];
pub const FRAME_SIZE: usize = 417;

/// Writes `value` as `n` bits MSB-first at `*cursor`, advancing it.
pub fn put_bits(buf: &mut [u8], cursor: &mut u64, value: u32, n: u32) {
    let mut bw = BitWriter::new(buf);
    for k in (0..n).rev() {
        bw.set_bit(*cursor, (value >> k) & 1 == 1).unwrap();
        *cursor += 1;
    }
}

/// Builds one frame with the given side-info knobs and a fixed non-zero
/// main-data filler (chosen so the body never matches a VBR tag marker).
pub fn mono_frame(main_data_begin: u32, part2_3: [u32; 2], gain: u32) -> Vec<u8> {
    let mut frame = vec![0u8; FRAME_SIZE];
    frame[..4].copy_from_slice(&MONO_HEADER);

    let mut cursor = 32u64;
    put_bits(&mut frame, &mut cursor, main_data_begin, 9);
    put_bits(&mut frame, &mut cursor, 0, 5 + 4); // private bits + scfsi
    for length in &part2_3 {
        put_bits(&mut frame, &mut cursor, *length, 12); // part2_3_length
        put_bits(&mut frame, &mut cursor, 0, 9); // big_values
        put_bits(&mut frame, &mut cursor, gain, 8); // global_gain
        put_bits(&mut frame, &mut cursor, 0, 4); // scalefac_compress
        put_bits(&mut frame, &mut cursor, 0, 1); // window_switching
        put_bits(&mut frame, &mut cursor, 0, 15); // table_select
        put_bits(&mut frame, &mut cursor, 0, 4 + 3); // region counts
        put_bits(&mut frame, &mut cursor, 0, 3); // preflag, scale, count1
    }
    debug_assert_eq!(cursor, 32 + 136);

    for (i, b) in frame.iter_mut().enumerate().skip(21) {
        *b = (i * 31 + 7) as u8;
    }
    frame
}

/// Concatenates one frame per entry in `gains`.
pub fn carrier(gains: &[u8]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(gains.len() * FRAME_SIZE);
    for gain in gains {
        blob.extend(mono_frame(0, [800, 600], *gain as u32));
    }
    blob
}
