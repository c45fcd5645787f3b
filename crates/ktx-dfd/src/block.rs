//! Wire layout of the Data Format Descriptor region.
//!
//! The region starts with a `u32` total size, followed by one or more
//! descriptor blocks. Each block opens with an 8-byte header whose first
//! word packs a 17-bit vendor id and a 15-bit descriptor type. The first
//! block of a well-formed KTX2 file is the Khronos Basic block: a 16-byte
//! fixed part plus 16-byte sample descriptors.
//!
//! All bit-packed words are decoded explicitly with shifts and masks; no
//! struct layout tricks.

use crate::enums::{ChannelQualifiers, ColorModel, ColorPrimaries, DataFormatFlags, TransferFunction};
use byteorder::{ByteOrder, LittleEndian};
use ktx_core::{TextureError, TextureResult};
use tracing::debug;

/// Parsing cap: blocks per DFD region.
pub const MAX_BLOCKS: usize = 10;
/// Parsing cap: samples per basic block.
pub const MAX_SAMPLES: usize = 16;

/// 8-byte descriptor block header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    /// 17-bit vendor id; 0 is Khronos.
    pub vendor_id: u32,
    /// 15-bit descriptor type; 0 is the basic block.
    pub descriptor_type: u32,
    /// Version of the descriptor block layout.
    pub version: u16,
}

impl BlockHeader {
    /// Wire length of the block header.
    pub const LENGTH: usize = 8;

    /// Header of the Khronos Basic Data Format Descriptor block.
    pub const BASIC: Self = Self {
        vendor_id: 0,
        descriptor_type: 0,
        version: 2,
    };

    /// Decodes a header and the block size from the first 8 bytes.
    pub fn parse(bytes: &[u8; Self::LENGTH]) -> (Self, usize) {
        let word = LittleEndian::read_u32(&bytes[0..4]);
        let header = Self {
            vendor_id: word & 0x1FFFF,
            descriptor_type: word >> 17,
            version: LittleEndian::read_u16(&bytes[4..6]),
        };
        let block_size = LittleEndian::read_u16(&bytes[6..8]) as usize;
        (header, block_size)
    }

    /// Encodes the header with the given total block size.
    pub fn to_bytes(self, block_size: u16) -> [u8; Self::LENGTH] {
        let mut out = [0u8; Self::LENGTH];
        let word = (self.vendor_id & 0x1FFFF) | (self.descriptor_type << 17);
        LittleEndian::write_u32(&mut out[0..4], word);
        LittleEndian::write_u16(&mut out[4..6], self.version);
        LittleEndian::write_u16(&mut out[6..8], block_size);
        out
    }
}

/// One 16-byte sample descriptor of a basic block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    /// Starting bit of the sample within the texel block.
    pub bit_offset: u16,
    /// Length in bits (1..=256; the wire stores length minus one).
    pub bit_length: u16,
    /// Channel identifier, meaning depends on the color model.
    pub channel_type: u8,
    /// Channel qualifiers (upper nibble of the channel byte).
    pub qualifiers: ChannelQualifiers,
    /// Sample positions along up to four axes, in block-relative units.
    pub positions: [u8; 4],
    /// Lower bound of the encoded range.
    pub lower: u32,
    /// Upper bound of the encoded range.
    pub upper: u32,
}

impl Sample {
    /// Wire length of a sample descriptor.
    pub const LENGTH: usize = 16;

    /// Decodes a sample from its 16 wire bytes.
    pub fn parse(bytes: &[u8; Self::LENGTH]) -> Self {
        let word = LittleEndian::read_u32(&bytes[0..4]);
        Self {
            bit_offset: (word & 0xFFFF) as u16,
            bit_length: ((word >> 16) & 0xFF) as u16 + 1,
            channel_type: ((word >> 24) & 0xF) as u8,
            qualifiers: ChannelQualifiers::from_bits_truncate((word >> 28) as u8),
            positions: [bytes[4], bytes[5], bytes[6], bytes[7]],
            lower: LittleEndian::read_u32(&bytes[8..12]),
            upper: LittleEndian::read_u32(&bytes[12..16]),
        }
    }

    /// Encodes the sample to its 16 wire bytes.
    pub fn to_bytes(self) -> [u8; Self::LENGTH] {
        let mut out = [0u8; Self::LENGTH];
        let word = self.bit_offset as u32
            | ((self.bit_length as u32 - 1) & 0xFF) << 16
            | (self.channel_type as u32 & 0xF) << 24
            | (self.qualifiers.bits() as u32) << 28;
        LittleEndian::write_u32(&mut out[0..4], word);
        out[4..8].copy_from_slice(&self.positions);
        LittleEndian::write_u32(&mut out[8..12], self.lower);
        LittleEndian::write_u32(&mut out[12..16], self.upper);
        out
    }
}

/// The Khronos Basic Data Format Descriptor block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicBlock {
    /// Color model the samples are expressed in.
    pub color_model: ColorModel,
    /// Color primaries.
    pub color_primaries: ColorPrimaries,
    /// Transfer function.
    pub transfer_function: TransferFunction,
    /// Alpha handling flags.
    pub flags: DataFormatFlags,
    /// Texel block dimensions in pixels (the wire stores each minus one).
    pub texel_block_dimensions: [u32; 4],
    /// Bytes per plane, planes 0..8.
    pub bytes_planes: [u8; 8],
    /// Sample descriptors.
    pub samples: Vec<Sample>,
}

impl BasicBlock {
    /// Fixed wire length before the samples: block header plus the 16-byte
    /// basic payload header.
    pub const HEADER_LENGTH: usize = BlockHeader::LENGTH + 16;

    /// Total wire size of this block.
    pub fn block_size(&self) -> usize {
        Self::HEADER_LENGTH + self.samples.len() * Sample::LENGTH
    }

    fn parse_payload(payload: &[u8], notes: &mut Vec<ParseNote>, block_index: usize) -> Self {
        let mut block = Self {
            color_model: ColorModel(payload[0]),
            color_primaries: ColorPrimaries(payload[1]),
            transfer_function: TransferFunction(payload[2]),
            flags: DataFormatFlags::from_bits_truncate(payload[3]),
            texel_block_dimensions: [
                payload[4] as u32 + 1,
                payload[5] as u32 + 1,
                payload[6] as u32 + 1,
                payload[7] as u32 + 1,
            ],
            bytes_planes: payload[8..16].try_into().expect("eight plane bytes"),
            samples: Vec::new(),
        };

        let sample_bytes = &payload[16..];
        let sample_count = sample_bytes.len() / Sample::LENGTH;
        let kept = sample_count.min(MAX_SAMPLES);
        if sample_count > MAX_SAMPLES {
            notes.push(ParseNote::TooManySamples {
                block_index,
                count: sample_count,
            });
        }
        for i in 0..kept {
            let chunk: &[u8; Sample::LENGTH] = sample_bytes
                [i * Sample::LENGTH..(i + 1) * Sample::LENGTH]
                .try_into()
                .expect("sample chunk");
            block.samples.push(Sample::parse(chunk));
        }
        block
    }

    fn payload_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(16 + self.samples.len() * Sample::LENGTH);
        out.push(self.color_model.0);
        out.push(self.color_primaries.0);
        out.push(self.transfer_function.0);
        out.push(self.flags.bits());
        for dim in self.texel_block_dimensions {
            out.push((dim.max(1) - 1) as u8);
        }
        out.extend_from_slice(&self.bytes_planes);
        for sample in &self.samples {
            out.extend_from_slice(&sample.to_bytes());
        }
        out
    }
}

/// Body of a descriptor block: the decoded basic block, or raw bytes for
/// vendor blocks the engine passes through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockBody {
    /// A decoded Khronos basic block.
    Basic(BasicBlock),
    /// An unrecognized block carried verbatim.
    Raw(Vec<u8>),
}

/// A descriptor block: header plus body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorBlock {
    /// Block header.
    pub header: BlockHeader,
    /// Block body.
    pub body: BlockBody,
}

impl DescriptorBlock {
    fn block_size(&self) -> usize {
        match &self.body {
            BlockBody::Basic(basic) => basic.block_size(),
            BlockBody::Raw(raw) => BlockHeader::LENGTH + raw.len(),
        }
    }
}

/// Non-fatal observations made while parsing a DFD region.
///
/// The texture reader logs these; the validator maps them to issues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseNote {
    /// Leading total-size word disagrees with the region length.
    TotalSizeMismatch {
        /// Size declared in the region's first word.
        declared: u32,
        /// Actual region length handed to the parser.
        region: u64,
    },
    /// More than [`MAX_BLOCKS`] blocks; the excess was skipped.
    TooManyBlocks {
        /// Number of blocks encountered before parsing stopped.
        count: usize,
    },
    /// A basic block declared more than [`MAX_SAMPLES`] samples.
    TooManySamples {
        /// Index of the offending block.
        block_index: usize,
        /// Declared sample count.
        count: usize,
    },
    /// A basic block's size is below 24 or not `24 + 16·n`.
    BasicSizeInvalid {
        /// Index of the offending block.
        block_index: usize,
        /// Declared block size.
        size: usize,
    },
    /// A block's declared size runs past the end of the region; parsing
    /// stopped at the previous block boundary.
    BlockTruncated {
        /// Index of the offending block.
        block_index: usize,
    },
    /// The first block is not the Khronos basic block.
    BasicNotFirst,
    /// Bytes remained after the last whole block.
    TrailingBytes {
        /// Number of leftover bytes.
        len: usize,
    },
}

/// A parsed Data Format Descriptor: the ordered block list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFormatDescriptor {
    /// Descriptor blocks in wire order.
    pub blocks: Vec<DescriptorBlock>,
}

impl DataFormatDescriptor {
    /// Wraps a single basic block into a descriptor.
    pub fn from_basic(basic: BasicBlock) -> Self {
        Self {
            blocks: vec![DescriptorBlock {
                header: BlockHeader::BASIC,
                body: BlockBody::Basic(basic),
            }],
        }
    }

    /// The basic block, if the descriptor leads with one.
    pub fn basic(&self) -> Option<&BasicBlock> {
        match self.blocks.first() {
            Some(DescriptorBlock {
                body: BlockBody::Basic(basic),
                ..
            }) => Some(basic),
            _ => None,
        }
    }

    /// Total on-wire size including the leading size word.
    pub fn total_size(&self) -> u32 {
        let blocks: usize = self.blocks.iter().map(DescriptorBlock::block_size).sum();
        (4 + blocks) as u32
    }

    /// Parses a DFD region (starting at its total-size word).
    ///
    /// Malformed pieces do not abort the walk: the parser skips to the next
    /// block boundary and records a [`ParseNote`]. Only a region too short
    /// to carry the size word is an error.
    pub fn parse(region: &[u8]) -> TextureResult<(Self, Vec<ParseNote>)> {
        if region.len() < 4 {
            return Err(TextureError::InvalidDfd(format!(
                "region is {} bytes, too short for the total-size word",
                region.len()
            )));
        }
        let mut notes = Vec::new();
        let declared = LittleEndian::read_u32(&region[0..4]);
        if declared as u64 != region.len() as u64 {
            notes.push(ParseNote::TotalSizeMismatch {
                declared,
                region: region.len() as u64,
            });
        }

        let mut blocks = Vec::new();
        let mut rest = &region[4..];
        let mut index = 0usize;
        while rest.len() >= BlockHeader::LENGTH {
            if blocks.len() == MAX_BLOCKS {
                notes.push(ParseNote::TooManyBlocks {
                    count: blocks.len() + count_remaining_blocks(rest),
                });
                break;
            }
            let header_bytes: &[u8; BlockHeader::LENGTH] =
                rest[..BlockHeader::LENGTH].try_into().expect("block header");
            let (header, block_size) = BlockHeader::parse(header_bytes);
            if block_size < BlockHeader::LENGTH || block_size > rest.len() {
                notes.push(ParseNote::BlockTruncated { block_index: index });
                break;
            }
            let payload = &rest[BlockHeader::LENGTH..block_size];

            let is_basic = header.vendor_id == BlockHeader::BASIC.vendor_id
                && header.descriptor_type == BlockHeader::BASIC.descriptor_type;
            let body = if is_basic {
                if block_size < BasicBlock::HEADER_LENGTH
                    || (block_size - BasicBlock::HEADER_LENGTH) % Sample::LENGTH != 0
                {
                    notes.push(ParseNote::BasicSizeInvalid {
                        block_index: index,
                        size: block_size,
                    });
                    BlockBody::Raw(payload.to_vec())
                } else {
                    BlockBody::Basic(BasicBlock::parse_payload(payload, &mut notes, index))
                }
            } else {
                debug!(
                    vendor = header.vendor_id,
                    descriptor_type = header.descriptor_type,
                    "carrying unrecognized descriptor block verbatim"
                );
                BlockBody::Raw(payload.to_vec())
            };
            blocks.push(DescriptorBlock { header, body });

            rest = &rest[block_size..];
            index += 1;
        }
        if !rest.is_empty() && blocks.len() < MAX_BLOCKS {
            notes.push(ParseNote::TrailingBytes { len: rest.len() });
        }

        match blocks.first() {
            Some(DescriptorBlock {
                body: BlockBody::Basic(_),
                ..
            }) => {}
            _ => notes.push(ParseNote::BasicNotFirst),
        }

        Ok((Self { blocks }, notes))
    }

    /// Serializes the descriptor, leading size word included.
    pub fn to_bytes(&self) -> Vec<u8> {
        let total = self.total_size();
        let mut out = Vec::with_capacity(total as usize);
        out.extend_from_slice(&total.to_le_bytes());
        for block in &self.blocks {
            let size = block.block_size() as u16;
            out.extend_from_slice(&block.header.to_bytes(size));
            match &block.body {
                BlockBody::Basic(basic) => out.extend_from_slice(&basic.payload_bytes()),
                BlockBody::Raw(raw) => out.extend_from_slice(raw),
            }
        }
        out
    }
}

fn count_remaining_blocks(mut rest: &[u8]) -> usize {
    let mut count = 0;
    while rest.len() >= BlockHeader::LENGTH {
        let header_bytes: &[u8; BlockHeader::LENGTH] =
            rest[..BlockHeader::LENGTH].try_into().expect("block header");
        let (_, block_size) = BlockHeader::parse(header_bytes);
        if block_size < BlockHeader::LENGTH || block_size > rest.len() {
            break;
        }
        rest = &rest[block_size..];
        count += 1;
    }
    count
}
