//! BasisLZ supercompression global data.
//!
//! The SGD region of a BasisLZ file carries the shared ETC1S codebooks and
//! one 20-byte descriptor per image (level x layer x face x depth slice),
//! in the same order the images appear in the file. The four codebook
//! blobs follow the descriptors; their lengths must sum to the region
//! length exactly.

use bitflags::bitflags;
use byteorder::{ByteOrder, LittleEndian};
use ktx_core::{TextureError, TextureResult};

bitflags! {
    /// Per-image flags of a BasisLZ image descriptor.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ImageFlags: u32 {
        /// The image is a P-frame predicted from the previous image.
        const P_FRAME = 1 << 1;
    }
}

/// One 20-byte BasisLZ image descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImageDesc {
    /// Raw flags word; only [`ImageFlags::P_FRAME`] is defined.
    pub image_flags: u32,
    /// Offset of the RGB slice within the level payload.
    pub rgb_slice_byte_offset: u32,
    /// Length of the RGB slice; never zero in a valid file.
    pub rgb_slice_byte_length: u32,
    /// Offset of the alpha slice, when the format carries alpha.
    pub alpha_slice_byte_offset: u32,
    /// Length of the alpha slice; zero when there is none.
    pub alpha_slice_byte_length: u32,
}

impl ImageDesc {
    /// Wire length of a descriptor.
    pub const LENGTH: usize = 20;

    /// Decodes a descriptor.
    pub fn parse(bytes: &[u8; Self::LENGTH]) -> Self {
        Self {
            image_flags: LittleEndian::read_u32(&bytes[0..4]),
            rgb_slice_byte_offset: LittleEndian::read_u32(&bytes[4..8]),
            rgb_slice_byte_length: LittleEndian::read_u32(&bytes[8..12]),
            alpha_slice_byte_offset: LittleEndian::read_u32(&bytes[12..16]),
            alpha_slice_byte_length: LittleEndian::read_u32(&bytes[16..20]),
        }
    }

    /// Encodes a descriptor.
    pub fn to_bytes(self) -> [u8; Self::LENGTH] {
        let mut out = [0u8; Self::LENGTH];
        LittleEndian::write_u32(&mut out[0..4], self.image_flags);
        LittleEndian::write_u32(&mut out[4..8], self.rgb_slice_byte_offset);
        LittleEndian::write_u32(&mut out[8..12], self.rgb_slice_byte_length);
        LittleEndian::write_u32(&mut out[12..16], self.alpha_slice_byte_offset);
        LittleEndian::write_u32(&mut out[16..20], self.alpha_slice_byte_length);
        out
    }

    /// True when the flags word sets the P-frame bit.
    pub fn is_p_frame(self) -> bool {
        ImageFlags::from_bits_truncate(self.image_flags).contains(ImageFlags::P_FRAME)
    }

    /// Flag bits outside the defined set.
    pub fn undefined_flag_bits(self) -> u32 {
        self.image_flags & !ImageFlags::all().bits()
    }
}

/// Parsed BasisLZ global data.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BasisLzGlobalData {
    /// Number of endpoints in the endpoint codebook.
    pub endpoint_count: u16,
    /// Number of selectors in the selector codebook.
    pub selector_count: u16,
    /// Image descriptors, one per image in file order.
    pub image_descs: Vec<ImageDesc>,
    /// Endpoint codebook bytes.
    pub endpoints: Vec<u8>,
    /// Selector codebook bytes.
    pub selectors: Vec<u8>,
    /// Huffman table bytes.
    pub tables: Vec<u8>,
    /// Extended data bytes.
    pub extended: Vec<u8>,
}

impl BasisLzGlobalData {
    /// Wire length of the global header.
    pub const HEADER_LENGTH: usize = 20;

    /// Parses an SGD region for a file with `image_count` images.
    ///
    /// The blob lengths declared in the header must sum, together with the
    /// header and descriptors, to the region length exactly.
    pub fn parse(region: &[u8], image_count: u32) -> TextureResult<Self> {
        if region.len() < Self::HEADER_LENGTH {
            return Err(TextureError::InvalidSgd(format!(
                "region is {} bytes, shorter than the 20-byte global header",
                region.len()
            )));
        }
        let endpoint_count = LittleEndian::read_u16(&region[0..2]);
        let selector_count = LittleEndian::read_u16(&region[2..4]);
        let endpoints_len = LittleEndian::read_u32(&region[4..8]) as usize;
        let selectors_len = LittleEndian::read_u32(&region[8..12]) as usize;
        let tables_len = LittleEndian::read_u32(&region[12..16]) as usize;
        let extended_len = LittleEndian::read_u32(&region[16..20]) as usize;

        let descs_len = image_count as usize * ImageDesc::LENGTH;
        let expected =
            Self::HEADER_LENGTH + descs_len + endpoints_len + selectors_len + tables_len + extended_len;
        if expected != region.len() {
            return Err(TextureError::InvalidSgd(format!(
                "declared sizes sum to {expected} bytes but the region is {} bytes",
                region.len()
            )));
        }

        let mut image_descs = Vec::with_capacity(image_count as usize);
        let mut offset = Self::HEADER_LENGTH;
        for _ in 0..image_count {
            let chunk: &[u8; ImageDesc::LENGTH] = region[offset..offset + ImageDesc::LENGTH]
                .try_into()
                .expect("20-byte descriptor");
            image_descs.push(ImageDesc::parse(chunk));
            offset += ImageDesc::LENGTH;
        }

        let endpoints = region[offset..offset + endpoints_len].to_vec();
        offset += endpoints_len;
        let selectors = region[offset..offset + selectors_len].to_vec();
        offset += selectors_len;
        let tables = region[offset..offset + tables_len].to_vec();
        offset += tables_len;
        let extended = region[offset..offset + extended_len].to_vec();

        Ok(Self {
            endpoint_count,
            selector_count,
            image_descs,
            endpoints,
            selectors,
            tables,
            extended,
        })
    }

    /// Serializes the global data.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            Self::HEADER_LENGTH
                + self.image_descs.len() * ImageDesc::LENGTH
                + self.endpoints.len()
                + self.selectors.len()
                + self.tables.len()
                + self.extended.len(),
        );
        out.extend_from_slice(&self.endpoint_count.to_le_bytes());
        out.extend_from_slice(&self.selector_count.to_le_bytes());
        out.extend_from_slice(&(self.endpoints.len() as u32).to_le_bytes());
        out.extend_from_slice(&(self.selectors.len() as u32).to_le_bytes());
        out.extend_from_slice(&(self.tables.len() as u32).to_le_bytes());
        out.extend_from_slice(&(self.extended.len() as u32).to_le_bytes());
        for desc in &self.image_descs {
            out.extend_from_slice(&desc.to_bytes());
        }
        out.extend_from_slice(&self.endpoints);
        out.extend_from_slice(&self.selectors);
        out.extend_from_slice(&self.tables);
        out.extend_from_slice(&self.extended);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BasisLzGlobalData {
        BasisLzGlobalData {
            endpoint_count: 32,
            selector_count: 16,
            image_descs: vec![
                ImageDesc {
                    image_flags: 0,
                    rgb_slice_byte_offset: 0,
                    rgb_slice_byte_length: 40,
                    alpha_slice_byte_offset: 40,
                    alpha_slice_byte_length: 24,
                },
                ImageDesc {
                    image_flags: ImageFlags::P_FRAME.bits(),
                    rgb_slice_byte_offset: 0,
                    rgb_slice_byte_length: 12,
                    alpha_slice_byte_offset: 0,
                    alpha_slice_byte_length: 0,
                },
            ],
            endpoints: vec![1; 48],
            selectors: vec![2; 24],
            tables: vec![3; 10],
            extended: Vec::new(),
        }
    }

    #[test]
    fn round_trip() {
        let sgd = sample();
        let bytes = sgd.to_bytes();
        let parsed = BasisLzGlobalData::parse(&bytes, 2).unwrap();
        assert_eq!(parsed, sgd);
    }

    #[test]
    fn size_sum_must_be_exact() {
        let sgd = sample();
        let mut bytes = sgd.to_bytes();
        bytes.push(0); // one stray byte
        assert!(matches!(
            BasisLzGlobalData::parse(&bytes, 2).unwrap_err(),
            TextureError::InvalidSgd(_)
        ));
    }

    #[test]
    fn too_short_for_header() {
        assert!(matches!(
            BasisLzGlobalData::parse(&[0u8; 10], 0).unwrap_err(),
            TextureError::InvalidSgd(_)
        ));
    }

    #[test]
    fn image_flag_helpers() {
        let sgd = sample();
        assert!(!sgd.image_descs[0].is_p_frame());
        assert!(sgd.image_descs[1].is_p_frame());
        let mut bad = sgd.image_descs[0];
        bad.image_flags = 0x05;
        assert_eq!(bad.undefined_flag_bits(), 0x05);
    }
}
