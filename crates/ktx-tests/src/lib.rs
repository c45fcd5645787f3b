//! Fixture builders for KTX2 integration tests.
//!
//! [`RawFile`] assembles a container byte-for-byte from raw regions, with
//! the same layout rules the production writer follows. Unlike the writer
//! it takes regions verbatim, so tests can assemble files that are
//! deliberately wrong in exactly one place.

use byteorder::{ByteOrder, LittleEndian};
use ktx_container::{BasisLzGlobalData, ImageDesc, Texture, KTX2_IDENTIFIER};
use ktx_core::align::align_up;
use ktx_core::VkFormat;
use ktx_dfd::{etc1s_basic_block, uastc_rgba_basic_block, DataFormatDescriptor};

/// One level payload for [`RawFile`]: stored bytes plus the value to put
/// in `uncompressedByteLength`.
#[derive(Debug, Clone)]
pub struct RawLevel {
    /// Stored payload bytes.
    pub data: Vec<u8>,
    /// Value written to the index's `uncompressedByteLength`.
    pub uncompressed: u64,
}

/// A container assembled from raw parts.
#[derive(Debug, Clone)]
pub struct RawFile {
    /// Header `vkFormat`.
    pub vk_format: u32,
    /// Header `typeSize`.
    pub type_size: u32,
    /// Header `pixelWidth`.
    pub width: u32,
    /// Header `pixelHeight`.
    pub height: u32,
    /// Header `pixelDepth`.
    pub depth: u32,
    /// Header `layerCount`.
    pub layer_count: u32,
    /// Header `faceCount`.
    pub face_count: u32,
    /// Header `levelCount`.
    pub level_count: u32,
    /// Header `supercompressionScheme`.
    pub scheme: u32,
    /// The DFD region, total-size word included.
    pub dfd: Vec<u8>,
    /// The KVD region, or empty.
    pub kvd: Vec<u8>,
    /// The SGD region, or empty.
    pub sgd: Vec<u8>,
    /// Level payloads, level 0 first.
    pub levels: Vec<RawLevel>,
    /// Alignment applied to level payload offsets.
    pub level_alignment: u64,
}

impl RawFile {
    /// Assembles the file.
    pub fn build(&self) -> Vec<u8> {
        let level_count = self.levels.len().max(1);
        let index_offset = 80usize;
        let dfd_offset = index_offset + level_count * 24;

        let mut cursor = (dfd_offset + self.dfd.len()) as u64;
        let kvd_offset = if self.kvd.is_empty() {
            0
        } else {
            cursor = align_up(cursor, 4);
            let offset = cursor;
            cursor += self.kvd.len() as u64;
            offset
        };
        let sgd_offset = if self.sgd.is_empty() {
            0
        } else {
            cursor = align_up(cursor, 8);
            let offset = cursor;
            cursor += self.sgd.len() as u64;
            offset
        };

        let mut level_offsets = vec![0u64; self.levels.len()];
        for number in (0..self.levels.len()).rev() {
            cursor = align_up(cursor, self.level_alignment);
            level_offsets[number] = cursor;
            cursor += self.levels[number].data.len() as u64;
        }
        let total = cursor as usize;

        let mut out = vec![0u8; total];
        out[0..12].copy_from_slice(&KTX2_IDENTIFIER);
        LittleEndian::write_u32(&mut out[12..16], self.vk_format);
        LittleEndian::write_u32(&mut out[16..20], self.type_size);
        LittleEndian::write_u32(&mut out[20..24], self.width);
        LittleEndian::write_u32(&mut out[24..28], self.height);
        LittleEndian::write_u32(&mut out[28..32], self.depth);
        LittleEndian::write_u32(&mut out[32..36], self.layer_count);
        LittleEndian::write_u32(&mut out[36..40], self.face_count);
        LittleEndian::write_u32(&mut out[40..44], self.level_count);
        LittleEndian::write_u32(&mut out[44..48], self.scheme);
        LittleEndian::write_u32(&mut out[48..52], dfd_offset as u32);
        LittleEndian::write_u32(&mut out[52..56], self.dfd.len() as u32);
        LittleEndian::write_u32(&mut out[56..60], kvd_offset as u32);
        LittleEndian::write_u32(&mut out[60..64], self.kvd.len() as u32);
        LittleEndian::write_u64(&mut out[64..72], sgd_offset);
        LittleEndian::write_u64(&mut out[72..80], self.sgd.len() as u64);

        for (number, level) in self.levels.iter().enumerate() {
            let entry = index_offset + number * 24;
            LittleEndian::write_u64(&mut out[entry..entry + 8], level_offsets[number]);
            LittleEndian::write_u64(
                &mut out[entry + 8..entry + 16],
                level.data.len() as u64,
            );
            LittleEndian::write_u64(&mut out[entry + 16..entry + 24], level.uncompressed);
        }

        out[dfd_offset..dfd_offset + self.dfd.len()].copy_from_slice(&self.dfd);
        if !self.kvd.is_empty() {
            let offset = kvd_offset as usize;
            out[offset..offset + self.kvd.len()].copy_from_slice(&self.kvd);
        }
        if !self.sgd.is_empty() {
            let offset = sgd_offset as usize;
            out[offset..offset + self.sgd.len()].copy_from_slice(&self.sgd);
        }
        for (number, level) in self.levels.iter().enumerate() {
            let offset = level_offsets[number] as usize;
            out[offset..offset + level.data.len()].copy_from_slice(&level.data);
        }
        out
    }
}

/// Serializes one key/value entry, padded to four bytes.
pub fn kv_entry(key: &str, value: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let length = (key.len() + 1 + value.len()) as u32;
    out.extend_from_slice(&length.to_le_bytes());
    out.extend_from_slice(key.as_bytes());
    out.push(0);
    out.extend_from_slice(value);
    while out.len() % 4 != 0 {
        out.push(0);
    }
    out
}

/// A minimal valid file: 1x1 `R8G8B8A8_UNORM`, one level, no metadata.
pub fn minimal_rgba8() -> Vec<u8> {
    let mut texture = Texture::new(VkFormat::R8G8B8A8_UNORM, 1, 1, 0, 0, 1, 1).unwrap();
    texture.levels[0].data = Some(vec![0x10, 0x20, 0x30, 0x40]);
    texture.to_bytes().unwrap()
}

/// A mipmapped BC1 texture whose level alignment is 8, leaving a real
/// padding gap between the metadata and the first payload.
pub fn bc1_4x4() -> Vec<u8> {
    let mut texture = Texture::new(VkFormat::BC1_RGB_UNORM_BLOCK, 4, 4, 0, 0, 1, 1).unwrap();
    texture.levels[0].data = Some(vec![0x5A; 8]);
    texture.to_bytes().unwrap()
}

/// A 1x1 RGBA8 file whose single level is Zstandard-compressed.
///
/// `uncompressed` lets tests lie about the decoded size.
pub fn zstd_rgba8(uncompressed: u64) -> Vec<u8> {
    let raw = vec![1u8, 2, 3, 4];
    let compressed = zstd::bulk::compress(&raw, 3).unwrap();
    let mut basic = ktx_dfd::create_basic_block(VkFormat::R8G8B8A8_UNORM).unwrap();
    basic.bytes_planes = [0; 8]; // unsized while supercompressed
    RawFile {
        vk_format: VkFormat::R8G8B8A8_UNORM.0,
        type_size: 1,
        width: 1,
        height: 1,
        depth: 0,
        layer_count: 0,
        face_count: 1,
        level_count: 1,
        scheme: 2, // Zstandard
        dfd: DataFormatDescriptor::from_basic(basic).to_bytes(),
        kvd: Vec::new(),
        sgd: Vec::new(),
        levels: vec![RawLevel {
            data: compressed,
            uncompressed,
        }],
        level_alignment: 1,
    }
    .build()
}

/// Bytes of one ETC1S image: a 10-byte RGB slice and a 6-byte alpha slice.
pub const ETC1S_IMAGE_BYTES: usize = 16;
const ETC1S_RGB_BYTES: u32 = 10;
const ETC1S_ALPHA_BYTES: u32 = 6;

/// A BasisLZ cube map: 4x4, six faces, one level, RGB+alpha slices.
pub fn basis_cubemap_4x4() -> Vec<u8> {
    let faces = 6u32;
    let image_descs: Vec<ImageDesc> = (0..faces)
        .map(|face| ImageDesc {
            image_flags: 0,
            rgb_slice_byte_offset: face * ETC1S_IMAGE_BYTES as u32,
            rgb_slice_byte_length: ETC1S_RGB_BYTES,
            alpha_slice_byte_offset: face * ETC1S_IMAGE_BYTES as u32 + ETC1S_RGB_BYTES,
            alpha_slice_byte_length: ETC1S_ALPHA_BYTES,
        })
        .collect();
    let sgd = BasisLzGlobalData {
        endpoint_count: 4,
        selector_count: 4,
        image_descs,
        endpoints: vec![0xE0; 32],
        selectors: vec![0xE1; 16],
        tables: vec![0xE2; 8],
        extended: Vec::new(),
    };
    let level_data = vec![0xC3; faces as usize * ETC1S_IMAGE_BYTES];

    RawFile {
        vk_format: 0, // VK_FORMAT_UNDEFINED
        type_size: 1,
        width: 4,
        height: 4,
        depth: 0,
        layer_count: 0,
        face_count: faces,
        level_count: 1,
        scheme: 1, // BasisLZ
        dfd: DataFormatDescriptor::from_basic(etc1s_basic_block(true, false)).to_bytes(),
        kvd: Vec::new(),
        sgd: sgd.to_bytes(),
        levels: vec![RawLevel {
            data: level_data,
            uncompressed: 0,
        }],
        level_alignment: 1,
    }
    .build()
}

/// A Zstandard-wrapped UASTC 4x4 texture, the glTF-profile happy path.
pub fn uastc_zstd_4x4() -> Vec<u8> {
    let block = vec![0x7Fu8; 16]; // one 4x4 UASTC block
    let compressed = zstd::bulk::compress(&block, 3).unwrap();
    RawFile {
        vk_format: 0,
        type_size: 1,
        width: 4,
        height: 4,
        depth: 0,
        layer_count: 0,
        face_count: 1,
        level_count: 1,
        scheme: 2, // Zstandard
        dfd: DataFormatDescriptor::from_basic(uastc_rgba_basic_block(false, true)).to_bytes(),
        kvd: Vec::new(),
        sgd: Vec::new(),
        levels: vec![RawLevel {
            data: compressed,
            uncompressed: 16,
        }],
        level_alignment: 1,
    }
    .build()
}

/// Overwrites a little-endian `u32` field inside a file image.
pub fn patch_u32(bytes: &mut [u8], offset: usize, value: u32) {
    LittleEndian::write_u32(&mut bytes[offset..offset + 4], value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ktx_container::Texture;

    #[test]
    fn raw_builder_matches_production_writer_for_the_minimal_file() {
        let from_writer = minimal_rgba8();
        let texture = Texture::from_bytes(&from_writer).unwrap();
        let raw = RawFile {
            vk_format: texture.vk_format.0,
            type_size: texture.type_size,
            width: texture.pixel_width,
            height: texture.pixel_height,
            depth: texture.pixel_depth,
            layer_count: texture.layer_count,
            face_count: texture.face_count,
            level_count: texture.level_count,
            scheme: 0,
            dfd: texture.dfd.to_bytes(),
            kvd: Vec::new(),
            sgd: Vec::new(),
            levels: vec![RawLevel {
                data: texture.level_data(0).unwrap().to_vec(),
                uncompressed: 4,
            }],
            level_alignment: 4,
        }
        .build();
        assert_eq!(raw, from_writer);
    }
}
