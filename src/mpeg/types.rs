/// The MPEG audio version.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum MpegVersion {
    /// Version 2.5
    Mpeg2p5,
    /// Version 2
    Mpeg2,
    /// Version 1
    Mpeg1,
}

/// The MPEG audio layer.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum MpegLayer {
    LayerI,
    LayerII,
    LayerIII,
}

/// The channel mode.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ChannelMode {
    /// Single mono audio channel.
    Mono,
    /// Dual mono audio channels.
    DualMono,
    /// Stereo channels.
    Stereo,
    /// Joint stereo encoded channels (decodes to stereo).
    JointStereo,
}

#[derive(Copy, Clone, Debug)]
pub struct FrameHeader {
    pub version: MpegVersion,
    pub layer: MpegLayer,
    // number of bits per second
    pub bitrate: u32,
    // number of decoded samples per second
    pub sample_rate: u32,
    pub channel_mode: ChannelMode,
    pub has_crc: bool,
    pub has_padding: bool,
    // full frame length [in bytes], header included
    pub frame_size: usize,
}

impl FrameHeader {
    pub fn num_channels(&self) -> usize {
        if self.channel_mode == ChannelMode::Mono {
            1
        } else {
            2
        }
    }

    pub fn num_granules(&self) -> usize {
        if self.version == MpegVersion::Mpeg1 {
            2
        } else {
            1
        }
    }

    /// Side-info block length in bytes for this version/channel combination.
    pub fn side_info_len(&self) -> usize {
        if self.channel_mode == ChannelMode::Mono && self.version != MpegVersion::Mpeg1 {
            9
        } else if self.channel_mode != ChannelMode::Mono && self.version == MpegVersion::Mpeg1 {
            32
        } else {
            17
        }
    }

    /// CRC word length in bytes (0 or 2).
    pub fn crc_len(&self) -> usize {
        if self.has_crc {
            2
        } else {
            0
        }
    }

    /// Byte offset of the main-data region from the frame start.
    pub fn main_data_offset(&self) -> usize {
        4 + self.crc_len() + self.side_info_len()
    }
}

#[derive(Default)]
pub struct SideInfo {
    /// gives the backward offset in bytes at which this frame's main data
    /// starts inside the bit reservoir. Zero means the main data follows
    /// the side info directly.
    pub main_data_begin: u16,
    /// determines whether the same scale factors are transferred for both
    /// granules or not. MPEG-1 only.
    pub scfsi: [[bool; 4]; 2],
    /// granules; MPEG-2/2.5 frames only populate the first one
    pub granules: [Granule; 2],
}

#[derive(Default)]
pub struct Granule {
    /// Each granule side info contains info about each channel
    pub channels: [GranuleChannel; 2],
}

pub struct GranuleChannel {
    /// number of bits for scalefactors [part2] and huffman data [part3]
    pub part2_3_length: u16,
    /// number of (x, y) sample pairs coded with the big-value tables
    pub big_values: u16,
    /// Logarithmic quantization step size. Used here as a per-granule
    /// loudness proxy for the embedding mask.
    pub global_gain: u8,
    /// number of bits used for the transmission of scalefactors
    pub scalefac_compress: u16,
    /// a non-Long block type is signalled by the window switching flag
    pub window_switching: bool,
    /// type of window used for the particular granule
    pub block_type: BlockType,
    /// The Huffman table to use for decoding region[0..3] of big_values.
    pub table_select: [u8; 3],
    /// Used when `BlockType` is Short; gain offset from global_gain for
    /// each short block.
    pub subblock_gain: [u8; 3],
    /// The number of scale factor bands in region0 of big_values.
    pub region0_count: u8,
    /// The number of scale factor bands in region1 of big_values.
    pub region1_count: u8,
    /// Indicates if pre-emphasis should be added to each scale factor band.
    pub preflag: bool,
    /// A 0.5x (false) or 1x (true) multiplier for scale factors.
    pub scalefac_scale: bool,
    /// determines which of the two count1 huffman tables applies
    pub count1table_select: bool,
}

impl Default for GranuleChannel {
    fn default() -> Self {
        GranuleChannel {
            part2_3_length: 0,
            big_values: 0,
            global_gain: 0,
            scalefac_compress: 0,
            window_switching: false,
            block_type: BlockType::Long,
            table_select: [0; 3],
            subblock_gain: [0; 3],
            region0_count: 0,
            region1_count: 0,
            preflag: false,
            scalefac_scale: false,
            count1table_select: false,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BlockType {
    Long,
    Start,
    /// if is_mixed is true the two lowest sub-bands are transformed using a
    /// normal window and the remaining sub-bands use the short window
    Short {
        is_mixed: bool,
    },
    End,
}
