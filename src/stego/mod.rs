//! The `stego` module is the embedding engine: payload framing, carrier
//! selection, and the embed/extract/capacity walkers.

mod engine;
mod payload;
mod select;

use crate::{errors, Result};

pub use engine::{
    capacity_file, capacity_report, embed_bytes, embed_file, estimate_capacity, extract_bytes,
    extract_file, CapacityReport,
};
pub use payload::{
    extension_from_name, parse_payload_header, validate_extension, vigenere_xor, wrap_payload,
    PayloadHeader, HEADER_SIZE, MAGIC,
};
pub use select::{gain_threshold, select_positions, END_MARGIN, START_MARGIN};

/// Embedding/extraction parameters. Extraction must run with the exact
/// options the embed ran with; they are as much a part of the secret as the
/// key itself.
#[derive(Debug, Clone)]
pub struct StegoOptions {
    /// upper bound on carrier bits per frame, 1..=8. `None` leaves the
    /// per-frame count to the selector's pacing.
    pub bits_per_frame: Option<u8>,
    /// fraction of the paced carrier count actually used, in (0, 1]
    pub fraction: f64,
    /// seed for carrier selection and ranking; also the Vigenère key
    pub key: Option<String>,
    /// XOR-obfuscate the payload body with the key
    pub vigenere: bool,
    /// loudness percentile below which frames carry nothing; negative or
    /// `None` disables the mask
    pub mask_percentile: Option<f64>,
    /// hard cutoff on the number of frames walked
    pub max_frames: Option<usize>,
}

impl Default for StegoOptions {
    fn default() -> Self {
        StegoOptions {
            bits_per_frame: None,
            fraction: 1.0,
            key: None,
            vigenere: false,
            mask_percentile: Some(0.60),
            max_frames: None,
        }
    }
}

impl StegoOptions {
    fn validate(&self) -> Result<()> {
        if !(self.fraction > 0.0 && self.fraction <= 1.0) {
            return errors::invalid_input(format!(
                "fraction must be in (0, 1], got {}",
                self.fraction
            ));
        }
        if let Some(bits) = self.bits_per_frame {
            if bits < 1 || bits > 8 {
                return errors::invalid_input(format!(
                    "bits_per_frame must be between 1 and 8, got {}",
                    bits
                ));
            }
        }
        Ok(())
    }

    /// The key, with an empty string normalised away.
    fn key(&self) -> Option<&str> {
        match self.key {
            Some(ref k) if !k.is_empty() => Some(k),
            _ => None,
        }
    }

    /// The mask percentile, with the negative "disabled" sentinel
    /// normalised away.
    fn mask(&self) -> Option<f64> {
        self.mask_percentile.filter(|p| *p >= 0.0)
    }
}
