//! The fixed 80-byte KTX2 file header and section index.

use byteorder::{ByteOrder, LittleEndian};
use ktx_core::{TextureError, TextureResult, VkFormat};
use std::fmt;

/// The 12-byte KTX 2.0 identifier: `«KTX 20»\r\n\x1A\n`.
pub const KTX2_IDENTIFIER: [u8; 12] = [
    0xAB, 0x4B, 0x54, 0x58, 0x20, 0x32, 0x30, 0xBB, 0x0D, 0x0A, 0x1A, 0x0A,
];

/// The KTX 1.1 identifier, recognized only to produce a precise rejection.
pub const KTX1_IDENTIFIER: [u8; 12] = [
    0xAB, 0x4B, 0x54, 0x58, 0x20, 0x31, 0x31, 0xBB, 0x0D, 0x0A, 0x1A, 0x0A,
];

/// What the first 12 bytes of a stream turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identification {
    /// A KTX 2.0 file.
    Ktx2,
    /// A KTX 1.x file.
    Ktx1,
    /// KTX-shaped bytes whose version digits are byte-swapped, the
    /// signature of an endian-confused writer.
    SwappedEndian,
    /// Not a KTX file at all.
    Foreign,
}

/// Classifies an identifier without committing to a parse.
pub fn identify(magic: &[u8; 12]) -> Identification {
    if *magic == KTX2_IDENTIFIER {
        return Identification::Ktx2;
    }
    if *magic == KTX1_IDENTIFIER {
        return Identification::Ktx1;
    }
    let mut swapped = KTX2_IDENTIFIER;
    swapped.swap(5, 6);
    if *magic == swapped {
        return Identification::SwappedEndian;
    }
    Identification::Foreign
}

/// Supercompression scheme declared in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupercompressionScheme {
    /// Payloads are stored raw.
    None,
    /// BasisLZ / ETC1S: codebook data lives in the SGD region.
    BasisLz,
    /// Zstandard-compressed level payloads.
    Zstandard,
    /// ZLIB-compressed level payloads.
    Zlib,
    /// ZLIB stream variant; validated and decoded like [`Self::Zlib`].
    ZlibStream,
    /// A value in the reserved range `[5, 0x7FFFFFFF]`.
    Reserved(u32),
    /// A vendor value at or above `0x80000000`.
    Vendor(u32),
}

impl SupercompressionScheme {
    /// Decodes the wire value.
    pub fn from_u32(value: u32) -> Self {
        match value {
            0 => Self::None,
            1 => Self::BasisLz,
            2 => Self::Zstandard,
            3 => Self::Zlib,
            4 => Self::ZlibStream,
            5..=0x7FFF_FFFF => Self::Reserved(value),
            _ => Self::Vendor(value),
        }
    }

    /// Encodes to the wire value.
    pub fn to_u32(self) -> u32 {
        match self {
            Self::None => 0,
            Self::BasisLz => 1,
            Self::Zstandard => 2,
            Self::Zlib => 3,
            Self::ZlibStream => 4,
            Self::Reserved(v) | Self::Vendor(v) => v,
        }
    }

    /// True when level payloads are stored transformed.
    pub fn is_supercompressed(self) -> bool {
        self != Self::None
    }

    /// True when the scheme requires supercompression global data.
    pub fn requires_sgd(self) -> bool {
        self == Self::BasisLz
    }

    /// Human name for messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::BasisLz => "BasisLZ",
            Self::Zstandard => "Zstandard",
            Self::Zlib => "ZLIB",
            Self::ZlibStream => "ZLIB-stream",
            Self::Reserved(_) => "reserved",
            Self::Vendor(_) => "vendor",
        }
    }
}

impl fmt::Display for SupercompressionScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reserved(v) | Self::Vendor(v) => write!(f, "{} ({v})", self.name()),
            _ => f.write_str(self.name()),
        }
    }
}

/// Byte offsets and lengths of the DFD, KVD and SGD regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SectionIndex {
    /// Offset of the DFD region from the start of the file.
    pub dfd_byte_offset: u32,
    /// Length of the DFD region.
    pub dfd_byte_length: u32,
    /// Offset of the key/value data region.
    pub kvd_byte_offset: u32,
    /// Length of the key/value data region.
    pub kvd_byte_length: u32,
    /// Offset of the supercompression global data.
    pub sgd_byte_offset: u64,
    /// Length of the supercompression global data.
    pub sgd_byte_length: u64,
}

/// The fixed KTX2 file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Declared pixel format; `UNDEFINED` for Basis payloads.
    pub vk_format: VkFormat,
    /// Byte size of the scalar channel type; 1 for block-compressed and
    /// supercompressed payloads.
    pub type_size: u32,
    /// Base level width in pixels, always non-zero in a valid file.
    pub pixel_width: u32,
    /// Base level height; zero for 1D textures.
    pub pixel_height: u32,
    /// Base level depth; zero for 1D and 2D textures.
    pub pixel_depth: u32,
    /// Array layer count; zero means "not an array".
    pub layer_count: u32,
    /// Face count: 1, or 6 for cube maps.
    pub face_count: u32,
    /// Mip level count; zero requests runtime mip generation.
    pub level_count: u32,
    /// Supercompression scheme.
    pub supercompression: SupercompressionScheme,
    /// Region index.
    pub index: SectionIndex,
}

impl Header {
    /// Wire length of the header.
    pub const LENGTH: usize = 80;

    /// Wire length of one level index entry.
    pub const LEVEL_INDEX_ENTRY_LENGTH: usize = 24;

    /// Decodes the header. Only the identifier is judged here; field
    /// semantics are the business of the reader and the validator.
    pub fn parse(bytes: &[u8; Self::LENGTH]) -> TextureResult<Self> {
        let magic: &[u8; 12] = bytes[0..12].try_into().expect("twelve magic bytes");
        match identify(magic) {
            Identification::Ktx2 => {}
            Identification::Ktx1 => return Err(TextureError::Ktx1),
            Identification::SwappedEndian | Identification::Foreign => {
                return Err(TextureError::NotKtx2)
            }
        }

        Ok(Self {
            vk_format: VkFormat(LittleEndian::read_u32(&bytes[12..16])),
            type_size: LittleEndian::read_u32(&bytes[16..20]),
            pixel_width: LittleEndian::read_u32(&bytes[20..24]),
            pixel_height: LittleEndian::read_u32(&bytes[24..28]),
            pixel_depth: LittleEndian::read_u32(&bytes[28..32]),
            layer_count: LittleEndian::read_u32(&bytes[32..36]),
            face_count: LittleEndian::read_u32(&bytes[36..40]),
            level_count: LittleEndian::read_u32(&bytes[40..44]),
            supercompression: SupercompressionScheme::from_u32(LittleEndian::read_u32(
                &bytes[44..48],
            )),
            index: SectionIndex {
                dfd_byte_offset: LittleEndian::read_u32(&bytes[48..52]),
                dfd_byte_length: LittleEndian::read_u32(&bytes[52..56]),
                kvd_byte_offset: LittleEndian::read_u32(&bytes[56..60]),
                kvd_byte_length: LittleEndian::read_u32(&bytes[60..64]),
                sgd_byte_offset: LittleEndian::read_u64(&bytes[64..72]),
                sgd_byte_length: LittleEndian::read_u64(&bytes[72..80]),
            },
        })
    }

    /// Encodes the header to its 80 wire bytes.
    pub fn to_bytes(&self) -> [u8; Self::LENGTH] {
        let mut out = [0u8; Self::LENGTH];
        out[0..12].copy_from_slice(&KTX2_IDENTIFIER);
        LittleEndian::write_u32(&mut out[12..16], self.vk_format.0);
        LittleEndian::write_u32(&mut out[16..20], self.type_size);
        LittleEndian::write_u32(&mut out[20..24], self.pixel_width);
        LittleEndian::write_u32(&mut out[24..28], self.pixel_height);
        LittleEndian::write_u32(&mut out[28..32], self.pixel_depth);
        LittleEndian::write_u32(&mut out[32..36], self.layer_count);
        LittleEndian::write_u32(&mut out[36..40], self.face_count);
        LittleEndian::write_u32(&mut out[40..44], self.level_count);
        LittleEndian::write_u32(&mut out[44..48], self.supercompression.to_u32());
        LittleEndian::write_u32(&mut out[48..52], self.index.dfd_byte_offset);
        LittleEndian::write_u32(&mut out[52..56], self.index.dfd_byte_length);
        LittleEndian::write_u32(&mut out[56..60], self.index.kvd_byte_offset);
        LittleEndian::write_u32(&mut out[60..64], self.index.kvd_byte_length);
        LittleEndian::write_u64(&mut out[64..72], self.index.sgd_byte_offset);
        LittleEndian::write_u64(&mut out[72..80], self.index.sgd_byte_length);
        out
    }

    /// Levels actually present: zero in the header means one stored level.
    pub fn level_count_effective(&self) -> u32 {
        self.level_count.max(1)
    }

    /// Layers actually present: zero means a non-array with one layer.
    pub fn layer_count_effective(&self) -> u32 {
        self.layer_count.max(1)
    }

    /// 1, 2 or 3, derived from which dimensions are non-zero.
    pub fn dimension_count(&self) -> u32 {
        if self.pixel_depth > 0 {
            3
        } else if self.pixel_height > 0 {
            2
        } else {
            1
        }
    }

    /// True for cube maps.
    pub fn is_cubemap(&self) -> bool {
        self.face_count == 6
    }

    /// Extent of a mip level, each axis clamped to 1.
    pub fn level_extent(&self, level: u32) -> (u32, u32, u32) {
        (
            (self.pixel_width >> level).max(1),
            (self.pixel_height >> level).max(1),
            (self.pixel_depth >> level).max(1),
        )
    }

    /// Number of images (layer x face x depth slice) in a level.
    pub fn images_per_level(&self, level: u32) -> u32 {
        let (_, _, depth) = self.level_extent(level);
        self.layer_count_effective() * self.face_count.max(1) * depth
    }

    /// Largest level count the base extent supports.
    pub fn max_level_count(&self) -> u32 {
        let largest = self
            .pixel_width
            .max(self.pixel_height.max(1))
            .max(self.pixel_depth.max(1));
        32 - largest.leading_zeros()
    }

    /// Offset of the first byte after the level index.
    pub fn past_level_index(&self) -> u64 {
        Self::LENGTH as u64
            + self.level_count_effective() as u64 * Self::LEVEL_INDEX_ENTRY_LENGTH as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> Header {
        Header {
            vk_format: VkFormat::R8G8B8A8_UNORM,
            type_size: 1,
            pixel_width: 256,
            pixel_height: 128,
            pixel_depth: 0,
            layer_count: 0,
            face_count: 1,
            level_count: 9,
            supercompression: SupercompressionScheme::None,
            index: SectionIndex {
                dfd_byte_offset: 296,
                dfd_byte_length: 92,
                kvd_byte_offset: 388,
                kvd_byte_length: 60,
                sgd_byte_offset: 0,
                sgd_byte_length: 0,
            },
        }
    }

    #[test]
    fn header_round_trip() {
        let header = sample_header();
        let bytes = header.to_bytes();
        let parsed = Header::parse(&bytes).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn identifier_variants() {
        assert_eq!(identify(&KTX2_IDENTIFIER), Identification::Ktx2);
        assert_eq!(identify(&KTX1_IDENTIFIER), Identification::Ktx1);

        let mut swapped = KTX2_IDENTIFIER;
        swapped.swap(5, 6);
        assert_eq!(identify(&swapped), Identification::SwappedEndian);

        let png = *b"\x89PNG\r\n\x1a\n\0\0\0\0";
        assert_eq!(identify(&png), Identification::Foreign);
    }

    #[test]
    fn parse_rejects_foreign_and_ktx1() {
        let mut bytes = sample_header().to_bytes();
        bytes[0..12].copy_from_slice(&KTX1_IDENTIFIER);
        assert!(matches!(Header::parse(&bytes).unwrap_err(), TextureError::Ktx1));

        bytes[0..12].copy_from_slice(b"not a ktx2!!");
        assert!(matches!(
            Header::parse(&bytes).unwrap_err(),
            TextureError::NotKtx2
        ));
    }

    #[test]
    fn scheme_wire_values() {
        assert_eq!(SupercompressionScheme::from_u32(0), SupercompressionScheme::None);
        assert_eq!(SupercompressionScheme::from_u32(1), SupercompressionScheme::BasisLz);
        assert_eq!(SupercompressionScheme::from_u32(2), SupercompressionScheme::Zstandard);
        assert_eq!(SupercompressionScheme::from_u32(3), SupercompressionScheme::Zlib);
        assert_eq!(SupercompressionScheme::from_u32(4), SupercompressionScheme::ZlibStream);
        assert!(matches!(
            SupercompressionScheme::from_u32(17),
            SupercompressionScheme::Reserved(17)
        ));
        assert!(matches!(
            SupercompressionScheme::from_u32(0x8000_0001),
            SupercompressionScheme::Vendor(_)
        ));
        for value in [0u32, 1, 2, 3, 4, 17, 0x8000_0001] {
            assert_eq!(SupercompressionScheme::from_u32(value).to_u32(), value);
        }
    }

    #[test]
    fn geometry_helpers() {
        let header = sample_header();
        assert_eq!(header.dimension_count(), 2);
        assert_eq!(header.level_extent(0), (256, 128, 1));
        assert_eq!(header.level_extent(8), (1, 1, 1));
        assert_eq!(header.max_level_count(), 9);
        assert_eq!(header.images_per_level(0), 1);
        assert_eq!(header.past_level_index(), 80 + 9 * 24);

        let mut cube = header;
        cube.face_count = 6;
        cube.layer_count = 2;
        assert!(cube.is_cubemap());
        assert_eq!(cube.images_per_level(0), 12);
    }
}
