//! The `errors` module defines the common error types.

use std::error;
use std::fmt;
use std::io;

use super::Result;

/// `Error` provides an enumeration of all possible errors reported by mp3stash.
#[derive(Debug)]
pub enum Error {
    /// An IO error occurred while reading or writing a file.
    IoError(io::Error),
    /// The stream contained malformed data and could not be parsed.
    ParseError(&'static str),
    /// A caller-supplied parameter was rejected before any work started.
    InvalidInput(String),
    /// The carrier cannot hold the wrapped payload.
    InsufficientCapacity { need_bits: u64, capacity_bits: u64 },
    /// The first 16 recovered bytes do not start with the payload magic.
    MagicNotFound,
    /// The frame walk ended before the expected payload bits were collected.
    IncompletePayload,
    /// The frame walk ended with payload bits still unwritten even though the
    /// capacity precheck passed.
    UnexpectedEarlyStop { written_bits: u64, need_bits: u64 },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::IoError(ref err) => err.fmt(f),
            Error::ParseError(ref msg) => write!(f, "Malformed stream encountered: {}", msg),
            Error::InvalidInput(ref msg) => write!(f, "Invalid input: {}", msg),
            Error::InsufficientCapacity {
                need_bits,
                capacity_bits,
            } => write!(
                f,
                "Insufficient capacity: need {} bits (~{} bytes), available {} bits (~{} bytes)",
                need_bits,
                need_bits / 8,
                capacity_bits,
                capacity_bits / 8
            ),
            Error::MagicNotFound => write!(f, "Magic header not found; no MP3S payload present"),
            Error::IncompletePayload => {
                write!(f, "Incomplete MP3S payload: not enough embedded bits found")
            }
            Error::UnexpectedEarlyStop {
                written_bits,
                need_bits,
            } => write!(
                f,
                "Unexpected early stop: wrote {}/{} bits",
                written_bits, need_bits
            ),
        }
    }
}

impl error::Error for Error {
    fn cause(&self) -> Option<&dyn error::Error> {
        match *self {
            Error::IoError(ref err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::IoError(err)
    }
}

/// function to create a malformed-stream error.
pub fn parse_error<T>(desc: &'static str) -> Result<T> {
    Err(Error::ParseError(desc))
}

/// function to create an invalid-input error.
pub fn invalid_input<T>(desc: String) -> Result<T> {
    Err(Error::InvalidInput(desc))
}
