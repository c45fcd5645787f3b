//! The level index and per-level size arithmetic.
//!
//! The index sits right after the header: `24 · max(1, levelCount)` bytes
//! of `(byteOffset, byteLength, uncompressedByteLength)` triples. Level 0
//! is the largest image but is stored *last* in the file; offsets therefore
//! decrease with increasing level number while lengths never increase.

use crate::header::{Header, SupercompressionScheme};
use byteorder::{ByteOrder, LittleEndian};
use ktx_core::align::lcm4;
use ktx_core::VkFormat;

/// One 24-byte level index entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LevelIndexEntry {
    /// Offset of the level payload from the start of the file.
    pub byte_offset: u64,
    /// Stored (possibly supercompressed) payload length.
    pub byte_length: u64,
    /// Payload length after supercompression is undone; equal to
    /// `byte_length` when the scheme is none, zero for BasisLZ.
    pub uncompressed_byte_length: u64,
}

impl LevelIndexEntry {
    /// Wire length of an entry.
    pub const LENGTH: usize = 24;

    /// Decodes an entry.
    pub fn parse(bytes: &[u8; Self::LENGTH]) -> Self {
        Self {
            byte_offset: LittleEndian::read_u64(&bytes[0..8]),
            byte_length: LittleEndian::read_u64(&bytes[8..16]),
            uncompressed_byte_length: LittleEndian::read_u64(&bytes[16..24]),
        }
    }

    /// Encodes an entry.
    pub fn to_bytes(self) -> [u8; Self::LENGTH] {
        let mut out = [0u8; Self::LENGTH];
        LittleEndian::write_u64(&mut out[0..8], self.byte_offset);
        LittleEndian::write_u64(&mut out[8..16], self.byte_length);
        LittleEndian::write_u64(&mut out[16..24], self.uncompressed_byte_length);
        out
    }
}

/// Decodes the whole index from its wire bytes.
///
/// `bytes` must be exactly `count * 24` long; the reader guarantees this.
pub fn parse_level_index(bytes: &[u8], count: u32) -> Vec<LevelIndexEntry> {
    debug_assert_eq!(bytes.len(), count as usize * LevelIndexEntry::LENGTH);
    bytes
        .chunks_exact(LevelIndexEntry::LENGTH)
        .map(|chunk| LevelIndexEntry::parse(chunk.try_into().expect("24-byte entry")))
        .collect()
}

/// Texel block size in bytes for sizing and alignment, taking the DFD's
/// plane byte as the authority when the format cannot be sized by the
/// registry (`UNDEFINED` payloads).
pub fn texel_block_size(format: VkFormat, dfd_plane0: u8) -> u32 {
    format
        .block_size_bytes()
        .unwrap_or(u32::from(dfd_plane0))
        .max(1)
}

/// Required alignment for a level payload offset.
///
/// `lcm(texel_block_size, 4)` without supercompression, byte-aligned with.
pub fn required_level_alignment(
    scheme: SupercompressionScheme,
    texel_block_size: u32,
) -> u64 {
    if scheme.is_supercompressed() {
        1
    } else {
        lcm4(texel_block_size) as u64
    }
}

/// Size in bytes of a single image (one face of one layer of one depth
/// slice) at `level`, or `None` when the format cannot be sized.
pub fn image_size(header: &Header, format: VkFormat, level: u32) -> Option<u64> {
    let (width, height, _) = header.level_extent(level);
    let [bw, bh, _] = format.block_dimensions();
    let blocks_x = width.div_ceil(bw) as u64;
    let blocks_y = height.div_ceil(bh) as u64;
    Some(blocks_x * blocks_y * format.block_size_bytes()? as u64)
}

/// Total payload bytes of a level: every layer, face and depth slice.
pub fn level_payload_size(header: &Header, format: VkFormat, level: u32) -> Option<u64> {
    let (_, _, depth) = header.level_extent(level);
    let [_, _, bd] = format.block_dimensions();
    let slices = depth.div_ceil(bd) as u64;
    Some(
        image_size(header, format, level)?
            * slices
            * header.layer_count_effective() as u64
            * header.face_count.max(1) as u64,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::SectionIndex;

    fn header_2d(width: u32, height: u32, levels: u32) -> Header {
        Header {
            vk_format: VkFormat::R8G8B8A8_UNORM,
            type_size: 1,
            pixel_width: width,
            pixel_height: height,
            pixel_depth: 0,
            layer_count: 0,
            face_count: 1,
            level_count: levels,
            supercompression: SupercompressionScheme::None,
            index: SectionIndex::default(),
        }
    }

    #[test]
    fn entry_round_trip() {
        let entry = LevelIndexEntry {
            byte_offset: 0x1_0000_0000,
            byte_length: 4096,
            uncompressed_byte_length: 16384,
        };
        assert_eq!(LevelIndexEntry::parse(&entry.to_bytes()), entry);
    }

    #[test]
    fn index_parse() {
        let entries = [
            LevelIndexEntry {
                byte_offset: 512,
                byte_length: 64,
                uncompressed_byte_length: 64,
            },
            LevelIndexEntry {
                byte_offset: 256,
                byte_length: 16,
                uncompressed_byte_length: 16,
            },
        ];
        let mut bytes = Vec::new();
        for e in entries {
            bytes.extend_from_slice(&e.to_bytes());
        }
        assert_eq!(parse_level_index(&bytes, 2), entries);
    }

    #[test]
    fn uncompressed_sizes() {
        let header = header_2d(4, 4, 3);
        assert_eq!(image_size(&header, header.vk_format, 0), Some(64));
        assert_eq!(image_size(&header, header.vk_format, 1), Some(16));
        assert_eq!(image_size(&header, header.vk_format, 2), Some(4));
        assert_eq!(level_payload_size(&header, header.vk_format, 0), Some(64));
    }

    #[test]
    fn block_compressed_rounds_up_to_whole_blocks() {
        let mut header = header_2d(10, 6, 1);
        header.vk_format = VkFormat::BC1_RGB_UNORM_BLOCK;
        // 3x2 blocks of 8 bytes
        assert_eq!(image_size(&header, header.vk_format, 0), Some(48));
    }

    #[test]
    fn cube_array_multiplies_images() {
        let mut header = header_2d(8, 8, 1);
        header.face_count = 6;
        header.layer_count = 3;
        assert_eq!(
            level_payload_size(&header, header.vk_format, 0),
            Some(8 * 8 * 4 * 6 * 3)
        );
    }

    #[test]
    fn alignment_rules() {
        assert_eq!(
            required_level_alignment(SupercompressionScheme::None, 4),
            4
        );
        assert_eq!(
            required_level_alignment(SupercompressionScheme::None, 3),
            12
        );
        assert_eq!(
            required_level_alignment(SupercompressionScheme::Zstandard, 16),
            1
        );
        assert_eq!(
            required_level_alignment(SupercompressionScheme::BasisLz, 1),
            1
        );
    }

    #[test]
    fn texel_block_size_falls_back_to_dfd() {
        assert_eq!(texel_block_size(VkFormat::R8G8B8A8_UNORM, 0), 4);
        assert_eq!(texel_block_size(VkFormat::UNDEFINED, 16), 16);
        assert_eq!(texel_block_size(VkFormat::UNDEFINED, 0), 1);
    }
}
