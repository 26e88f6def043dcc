//! The `mpeg` module parses just enough of an MPEG audio stream to embed
//! into it: frame headers, side-info blocks, and the bit-reservoir layout.
//! Main data is never decoded.

mod frame;
mod stream;
mod types;

pub use frame::{parse_frame_header, read_side_info};
pub use stream::{
    frame_positions, frame_records, skip_id3v2, FrameRecord, ReservoirMap, ReservoirSegment,
};
pub use types::{
    BlockType, ChannelMode, FrameHeader, Granule, GranuleChannel, MpegLayer, MpegVersion, SideInfo,
};
