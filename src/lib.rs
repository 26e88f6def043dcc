//! `mp3stash` hides arbitrary byte payloads inside MPEG layer III audio
//! streams by rewriting selected bits of the main-data region, and recovers
//! them later from the modified file.
//!
//! The embedder never touches frame headers, CRC words or side-info blocks,
//! so the output stays a standards-parsable bitstream with the same frame
//! boundaries as the input. Carrier bit positions are derived from a
//! key-seeded PRF over the frame geometry, which makes the selection
//! independent of the (mutated) main-data content and lets extraction replay
//! it exactly.
//!
//! # Example
//!
//! ```no_run
//! use mp3stash::stego::{self, StegoOptions};
//!
//! fn main() -> mp3stash::Result<()> {
//!     let carrier = std::fs::read("track.mp3")?;
//!     let mut opts = StegoOptions::default();
//!     opts.bits_per_frame = Some(4);
//!     opts.key = Some("secret".to_string());
//!
//!     let stego = stego::embed_bytes(&carrier, b"hello", Some("note.txt"), &opts)?;
//!     let (payload, ext) = stego::extract_bytes(&stego, &opts)?;
//!     assert_eq!(payload, b"hello");
//!     assert_eq!(ext, "txt");
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod io;
pub mod mpeg;
pub mod stego;
pub mod validate;

#[cfg(test)]
pub(crate) mod testutil;

pub use errors::Error;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;
