use std::collections::HashSet;
use std::fs;
use std::path::Path;

use tracing::{debug, trace};

use crate::io::{BitReader, BitWriter, Bits};
use crate::mpeg::frame_records;
use crate::{Error, Result};

use super::payload::{self, HEADER_SIZE};
use super::select::{gain_threshold, select_positions};
use super::StegoOptions;

/// What a walk does with each accepted carrier position. Capacity counts,
/// embed writes a payload bit, extract reads one back; everything else --
/// frame order, masking, ranking, global dedup -- is shared, which is what
/// keeps the three operations replaying the same position sequence.
trait PositionSink {
    /// Handles one carrier position. Returning `false` ends the walk early.
    fn accept(&mut self, pos: u64) -> Result<bool>;
}

struct CountSink {
    bits: u64,
}

impl PositionSink for CountSink {
    fn accept(&mut self, _pos: u64) -> Result<bool> {
        self.bits += 1;
        Ok(true)
    }
}

struct EmbedSink<'a> {
    writer: BitWriter<'a>,
    bits: Bits<'a>,
    written: u64,
}

impl<'a> PositionSink for EmbedSink<'a> {
    fn accept(&mut self, pos: u64) -> Result<bool> {
        match self.bits.next() {
            Some(bit) => {
                self.writer.set_bit(pos, bit)?;
                self.written += 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

struct ExtractSink<'a> {
    reader: BitReader<'a>,
    bytes: Vec<u8>,
    acc: u8,
    filled: u8,
    total_bytes: Option<usize>,
    ext: String,
}

impl<'a> ExtractSink<'a> {
    fn new(blob: &'a [u8]) -> ExtractSink<'a> {
        ExtractSink {
            reader: BitReader::new(blob),
            bytes: Vec::new(),
            acc: 0,
            filled: 0,
            total_bytes: None,
            ext: String::new(),
        }
    }
}

impl<'a> PositionSink for ExtractSink<'a> {
    fn accept(&mut self, pos: u64) -> Result<bool> {
        self.reader.seek(pos);
        let bit = self.reader.read_bit()?;
        self.acc = (self.acc << 1) | bit as u8;
        self.filled += 1;
        if self.filled < 8 {
            return Ok(true);
        }
        self.bytes.push(self.acc);
        self.acc = 0;
        self.filled = 0;

        // the transport header is complete after exactly 16 bytes; a bad
        // magic fails right here, not at the end of the walk
        if self.total_bytes.is_none() && self.bytes.len() == HEADER_SIZE {
            let header = payload::parse_payload_header(&self.bytes);
            if !header.magic_ok {
                return Err(Error::MagicNotFound);
            }
            self.total_bytes = Some(header.total_bytes);
            self.ext = header.ext;
        }
        if let Some(total) = self.total_bytes {
            if self.bytes.len() >= total {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Drives one full pass over the carrier: scan frames, compute the gain
/// mask, select ranked positions per frame, deduplicate globally, and hand
/// each surviving position to the sink in order.
fn walk_positions<S: PositionSink>(blob: &[u8], opts: &StegoOptions, sink: &mut S) -> Result<()> {
    let records = frame_records(blob)?;
    let min_gain = gain_threshold(&records, opts.mask());
    let key = opts.key();
    let mut used: HashSet<u64> = HashSet::new();

    for (frame_index, record) in records.iter().enumerate() {
        if let Some(max_frames) = opts.max_frames {
            if frame_index >= max_frames {
                break;
            }
        }

        let positions = select_positions(
            record,
            frame_index,
            opts.fraction,
            opts.bits_per_frame,
            key,
            min_gain,
        );
        if positions.is_empty() {
            continue;
        }
        trace!(
            frame = frame_index,
            carriers = positions.len(),
            "selected carrier positions"
        );

        for pos in positions {
            if !used.insert(pos) {
                continue;
            }
            if !sink.accept(pos)? {
                return Ok(());
            }
        }
    }
    Ok(())
}

/// Counts the carrier bits the walker would visit with these options.
///
/// Two calls with the same carrier and options return the same number; the
/// count is what [`embed_bytes`] checks the wrapped payload against.
pub fn estimate_capacity(mp3: &[u8], opts: &StegoOptions) -> Result<u64> {
    opts.validate()?;
    let mut sink = CountSink { bits: 0 };
    walk_positions(mp3, opts, &mut sink)?;
    debug!(capacity_bits = sink.bits, "estimated carrier capacity");
    Ok(sink.bits)
}

/// Capacity in caller-friendly units.
#[derive(Debug, Clone, Copy)]
pub struct CapacityReport {
    pub capacity_bits: u64,
    pub capacity_bytes: u64,
    /// fixed cost of the transport header
    pub header_size_bytes: u64,
    /// bytes left for the payload body once the header is paid for
    pub usable_payload_bytes: u64,
}

pub fn capacity_report(mp3: &[u8], opts: &StegoOptions) -> Result<CapacityReport> {
    let capacity_bits = estimate_capacity(mp3, opts)?;
    let capacity_bytes = capacity_bits / 8;
    Ok(CapacityReport {
        capacity_bits,
        capacity_bytes,
        header_size_bytes: HEADER_SIZE as u64,
        usable_payload_bytes: capacity_bytes.saturating_sub(HEADER_SIZE as u64),
    })
}

/// Embeds `payload` into a copy of `mp3` and returns the modified bytes.
///
/// The payload is wrapped with the transport header (deriving the extension
/// field from `payload_name`), optionally XOR-obfuscated with the key, and
/// streamed MSB-first into the selected carrier bits. Frame headers, CRC
/// words and side-info blocks are never touched, so the result stays a
/// valid stream with the same frame list as the input.
pub fn embed_bytes(
    mp3: &[u8],
    payload: &[u8],
    payload_name: Option<&str>,
    opts: &StegoOptions,
) -> Result<Vec<u8>> {
    opts.validate()?;

    let ext = payload::extension_from_name(payload_name);
    payload::validate_extension(&ext)?;
    let mut wrapped = payload::wrap_payload(payload, &ext)?;

    // only the body is obfuscated; the header stays plaintext so extraction
    // can size the read before knowing whether the key is right
    if opts.vigenere {
        let tail = payload::vigenere_xor(&wrapped[HEADER_SIZE..], opts.key());
        wrapped.truncate(HEADER_SIZE);
        wrapped.extend_from_slice(&tail);
    }

    let need_bits = wrapped.len() as u64 * 8;
    let capacity_bits = estimate_capacity(mp3, opts)?;
    if need_bits > capacity_bits {
        return Err(Error::InsufficientCapacity {
            need_bits,
            capacity_bits,
        });
    }

    let mut out = mp3.to_vec();
    let written = {
        let mut sink = EmbedSink {
            writer: BitWriter::new(&mut out),
            bits: Bits::new(&wrapped),
            written: 0,
        };
        walk_positions(mp3, opts, &mut sink)?;
        sink.written
    };

    if written < need_bits {
        return Err(Error::UnexpectedEarlyStop {
            written_bits: written,
            need_bits,
        });
    }
    debug!(written_bits = written, "embedded payload");
    Ok(out)
}

/// Recovers a payload embedded with the same options (including the key).
///
/// Returns the payload body and the extension recorded at embed time. The
/// walk stops as soon as the length from the transport header is satisfied.
pub fn extract_bytes(mp3: &[u8], opts: &StegoOptions) -> Result<(Vec<u8>, String)> {
    opts.validate()?;

    let mut sink = ExtractSink::new(mp3);
    walk_positions(mp3, opts, &mut sink)?;

    let total_bytes = match sink.total_bytes {
        Some(t) => t,
        None => return Err(Error::IncompletePayload),
    };
    if sink.bytes.len() < total_bytes {
        return Err(Error::IncompletePayload);
    }

    let body = &sink.bytes[HEADER_SIZE..total_bytes];
    let body = if opts.vigenere {
        payload::vigenere_xor(body, opts.key())
    } else {
        body.to_vec()
    };
    debug!(payload_bytes = body.len(), ext = %sink.ext, "extracted payload");
    Ok((body, sink.ext))
}

/// [`embed_bytes`] between files.
pub fn embed_file<P, Q>(
    input: P,
    output: Q,
    payload: &[u8],
    payload_name: Option<&str>,
    opts: &StegoOptions,
) -> Result<()>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let carrier = fs::read(input)?;
    let stego = embed_bytes(&carrier, payload, payload_name, opts)?;
    fs::write(output, stego)?;
    Ok(())
}

/// [`extract_bytes`] from a file.
pub fn extract_file<P: AsRef<Path>>(input: P, opts: &StegoOptions) -> Result<(Vec<u8>, String)> {
    let stego = fs::read(input)?;
    extract_bytes(&stego, opts)
}

/// [`estimate_capacity`] of a file.
pub fn capacity_file<P: AsRef<Path>>(input: P, opts: &StegoOptions) -> Result<u64> {
    let carrier = fs::read(input)?;
    estimate_capacity(&carrier, opts)
}
