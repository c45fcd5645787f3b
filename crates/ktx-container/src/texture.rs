//! The in-memory texture object.
//!
//! A [`Texture`] is the fully decoded form of a KTX2 container: header
//! fields, parsed DFD, ordered metadata, optional SGD blob and the level
//! payloads. It is immutable from the engine's point of view except for
//! the two sanctioned mutations: [`Texture::decompress`] and
//! [`Texture::transcode`], which rewrite format and level data in place.

use crate::header::{Header, SectionIndex, SupercompressionScheme};
use crate::level::{texel_block_size, LevelIndexEntry};
use crate::metadata::{
    self, keys, AnimData, AstcDecodeMode, KeyValueData, Orientation,
};
use crate::sgd::BasisLzGlobalData;
use crate::supercompression::{
    basis_transcoder, codec_for, CodecError, Etc1sImage, TranscodeTarget,
};
use ktx_core::{TextureError, TextureResult, VkFormat};
use ktx_dfd::{create_dfd, ColorModel, DataFormatDescriptor, TransferFunction};
use tracing::debug;

/// One mip level: its index triple plus the payload, when loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Level {
    /// The wire triple. Offsets are recomputed on write.
    pub index: LevelIndexEntry,
    /// Payload bytes; `None` while a deferred reader has not loaded them.
    pub data: Option<Vec<u8>>,
}

/// A decoded KTX2 texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Texture {
    /// Declared pixel format.
    pub vk_format: VkFormat,
    /// Scalar type size from the header.
    pub type_size: u32,
    /// Base width, non-zero.
    pub pixel_width: u32,
    /// Base height; zero for 1D.
    pub pixel_height: u32,
    /// Base depth; zero for 1D/2D.
    pub pixel_depth: u32,
    /// Array layers; zero means non-array.
    pub layer_count: u32,
    /// 1 or 6.
    pub face_count: u32,
    /// Stored level count; zero requests runtime mip generation.
    pub level_count: u32,
    /// Supercompression scheme of the payloads.
    pub supercompression: SupercompressionScheme,
    /// Parsed data format descriptor.
    pub dfd: DataFormatDescriptor,
    /// Ordered key/value metadata.
    pub kv: KeyValueData,
    /// Raw supercompression global data, when the scheme has one.
    pub sgd: Option<Vec<u8>>,
    /// Levels, index 0 = largest mip.
    pub levels: Vec<Level>,
}

/// One (level, face) visit of [`Texture::level_faces`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelFace<'a> {
    /// Mip level number.
    pub level: u32,
    /// Face number, `0..face_count`.
    pub face: u32,
    /// Level width in pixels.
    pub width: u32,
    /// Level height in pixels.
    pub height: u32,
    /// Level depth in pixels.
    pub depth: u32,
    /// Raw layer count from the header (zero means non-array).
    pub layer_count: u32,
    /// Bytes of one face, all depth slices included.
    pub face_size: u64,
    /// Face bytes of layer 0; `None` when the payload is supercompressed
    /// or not loaded.
    pub data: Option<&'a [u8]>,
}

impl Texture {
    /// Creates an empty texture with a synthesized DFD and unloaded levels.
    ///
    /// `format` must be sizeable by the registry; use the public fields
    /// directly for `UNDEFINED`-format textures.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        format: VkFormat,
        width: u32,
        height: u32,
        depth: u32,
        layer_count: u32,
        face_count: u32,
        level_count: u32,
    ) -> TextureResult<Self> {
        if width == 0 {
            return Err(TextureError::InvalidHeader {
                field: "pixelWidth",
                reason: "must be non-zero".to_owned(),
            });
        }
        let dfd = create_dfd(format).ok_or_else(|| {
            TextureError::Unsupported(format!("cannot synthesize a DFD for {format}"))
        })?;
        let stored_levels = level_count.max(1) as usize;
        Ok(Self {
            vk_format: format,
            type_size: format.type_size(),
            pixel_width: width,
            pixel_height: height,
            pixel_depth: depth,
            layer_count,
            face_count,
            level_count,
            supercompression: SupercompressionScheme::None,
            dfd,
            kv: KeyValueData::new(),
            sgd: None,
            levels: vec![
                Level {
                    index: LevelIndexEntry::default(),
                    data: None,
                };
                stored_levels
            ],
        })
    }

    /// The header this texture would be written with. Region offsets are
    /// the writer's business and are zeroed here.
    pub fn header(&self) -> Header {
        Header {
            vk_format: self.vk_format,
            type_size: self.type_size,
            pixel_width: self.pixel_width,
            pixel_height: self.pixel_height,
            pixel_depth: self.pixel_depth,
            layer_count: self.layer_count,
            face_count: self.face_count,
            level_count: self.level_count,
            supercompression: self.supercompression,
            index: SectionIndex::default(),
        }
    }

    /// Levels actually stored.
    pub fn level_count_effective(&self) -> u32 {
        self.level_count.max(1)
    }

    /// Layers actually stored.
    pub fn layer_count_effective(&self) -> u32 {
        self.layer_count.max(1)
    }

    /// 1, 2 or 3.
    pub fn dimension_count(&self) -> u32 {
        self.header().dimension_count()
    }

    /// True for cube maps.
    pub fn is_cubemap(&self) -> bool {
        self.face_count == 6
    }

    /// Extent of a level, clamped to 1 per axis.
    pub fn level_extent(&self, level: u32) -> (u32, u32, u32) {
        self.header().level_extent(level)
    }

    /// Total images across all levels, the BasisLZ image-descriptor count.
    pub fn image_count(&self) -> u32 {
        let header = self.header();
        (0..self.level_count_effective())
            .map(|level| header.images_per_level(level))
            .sum()
    }

    /// Texel block size in bytes, from the registry or the DFD.
    pub fn texel_block_size(&self) -> u32 {
        let plane0 = self
            .dfd
            .basic()
            .map(|b| b.bytes_planes[0])
            .unwrap_or(0);
        texel_block_size(self.vk_format, plane0)
    }

    /// Loaded payload of a level.
    pub fn level_data(&self, level: u32) -> Option<&[u8]> {
        self.levels.get(level as usize)?.data.as_deref()
    }

    /// Parses the BasisLZ global data, when present.
    pub fn basis_lz_global_data(&self) -> TextureResult<Option<BasisLzGlobalData>> {
        match &self.sgd {
            Some(raw) => Ok(Some(BasisLzGlobalData::parse(raw, self.image_count())?)),
            None => Ok(None),
        }
    }

    /// Typed `KTXorientation`, when the key is present.
    pub fn orientation(&self) -> Option<Result<Orientation, String>> {
        self.kv
            .get(keys::ORIENTATION)
            .map(|v| metadata::parse_orientation(v, self.dimension_count()))
    }

    /// Typed `KTXswizzle`, when the key is present.
    pub fn swizzle(&self) -> Option<Result<[u8; 4], String>> {
        self.kv.get(keys::SWIZZLE).map(metadata::parse_swizzle)
    }

    /// Typed `KTXanimData`, when the key is present.
    pub fn anim_data(&self) -> Option<Result<AnimData, String>> {
        self.kv.get(keys::ANIM_DATA).map(metadata::parse_anim_data)
    }

    /// Typed `KTXastcDecodeMode`, when the key is present.
    pub fn astc_decode_mode(&self) -> Option<Result<AstcDecodeMode, String>> {
        self.kv
            .get(keys::ASTC_DECODE_MODE)
            .map(metadata::parse_astc_decode_mode)
    }

    /// Iterates (level, face) pairs in upload order: decreasing mip level
    /// number (the order levels are stored in the file), faces ascending.
    pub fn level_faces(&self) -> impl Iterator<Item = LevelFace<'_>> {
        let face_count = self.face_count.max(1);
        let layers = self.layer_count_effective() as u64;
        let supercompressed = self.supercompression.is_supercompressed();
        (0..self.level_count_effective())
            .rev()
            .flat_map(move |level| (0..face_count).map(move |face| (level, face)))
            .map(move |(level, face)| {
                let (width, height, depth) = self.level_extent(level);
                let entry = self.levels[level as usize].index;
                let face_size = entry.uncompressed_byte_length.max(entry.byte_length)
                    / (layers * face_count as u64).max(1);
                let data = if supercompressed {
                    None
                } else {
                    self.level_data(level).and_then(|bytes| {
                        let start = (face as u64 * face_size) as usize;
                        let end = start + face_size as usize;
                        bytes.get(start..end)
                    })
                };
                LevelFace {
                    level,
                    face,
                    width,
                    height,
                    depth,
                    layer_count: self.layer_count,
                    face_size,
                    data,
                }
            })
    }

    fn map_codec_error(level: u32, err: CodecError) -> TextureError {
        match err {
            CodecError::LengthMismatch { expected, actual } => {
                TextureError::DecodedLengthMismatch {
                    level,
                    expected,
                    actual,
                }
            }
            CodecError::Checksum => TextureError::DecodedChecksumFailed { level },
            CodecError::Backend(message) => TextureError::Backend(message),
        }
    }

    /// Inflates Zstandard/ZLIB level payloads in place.
    ///
    /// After return the scheme is [`SupercompressionScheme::None`], the
    /// level index reflects the inflated sizes and, for UASTC payloads,
    /// `bytesPlane0` is restored to 16.
    pub fn decompress(&mut self) -> TextureResult<()> {
        let codec = match codec_for(self.supercompression) {
            Some(codec) => codec,
            None if self.supercompression == SupercompressionScheme::None => return Ok(()),
            None => {
                return Err(TextureError::Unsupported(format!(
                    "cannot decompress scheme {}",
                    self.supercompression
                )))
            }
        };

        for (number, level) in self.levels.iter_mut().enumerate() {
            let data = level.data.as_ref().ok_or(TextureError::InvalidOperation(
                "level data not loaded; read the texture eagerly first",
            ))?;
            let out = codec
                .decode(data, level.index.uncompressed_byte_length)
                .map_err(|e| Self::map_codec_error(number as u32, e))?;
            level.index.byte_length = out.len() as u64;
            level.index.uncompressed_byte_length = out.len() as u64;
            level.data = Some(out);
        }
        self.supercompression = SupercompressionScheme::None;

        // a no-longer-supercompressed payload is sized again
        let plane0 = self.vk_format.block_size_bytes().unwrap_or_else(|| {
            match self.dfd.basic().map(|b| b.color_model) {
                Some(ColorModel::UASTC) => 16,
                _ => 0,
            }
        });
        if let Some(ktx_dfd::BlockBody::Basic(basic)) =
            self.dfd.blocks.first_mut().map(|b| &mut b.body)
        {
            basic.bytes_planes[0] = plane0.min(255) as u8;
        }
        Ok(())
    }

    fn is_srgb_transfer(&self) -> bool {
        self.dfd
            .basic()
            .map(|b| b.transfer_function == TransferFunction::SRGB)
            .unwrap_or(false)
    }

    /// Transcodes a Basis-encoded texture to a GPU-native format in place.
    ///
    /// ETC1S (BasisLZ) accepts [`TranscodeTarget::Etc2Rgba`]; UASTC accepts
    /// [`TranscodeTarget::AstcRgba`]. Requires a registered backend.
    pub fn transcode(&mut self, target: TranscodeTarget) -> TextureResult<()> {
        let model = self
            .dfd
            .basic()
            .map(|b| b.color_model)
            .ok_or(TextureError::InvalidOperation(
                "texture has no basic descriptor block",
            ))?;
        match (model, target) {
            (ColorModel::ETC1S, TranscodeTarget::Etc2Rgba) => self.transcode_etc1s(target),
            (ColorModel::UASTC, TranscodeTarget::AstcRgba) => self.transcode_uastc(target),
            _ => Err(TextureError::TranscodeFailed(format!(
                "no transcode path from {model:?} to {target:?}"
            ))),
        }
    }

    fn transcode_etc1s(&mut self, target: TranscodeTarget) -> TextureResult<()> {
        let backend = basis_transcoder().ok_or(TextureError::LibraryNotLinked {
            scheme: "BasisLZ",
        })?;
        let global = self
            .basis_lz_global_data()?
            .ok_or_else(|| TextureError::InvalidSgd("BasisLZ texture has no SGD".to_owned()))?;

        let header = self.header();
        let srgb = self.is_srgb_transfer();
        let mut decoded_levels = Vec::with_capacity(self.levels.len());
        // image descriptors are ordered level 0 first, matching image
        // numbering across the file
        let mut image_base = 0usize;
        for (number, level) in self.levels.iter().enumerate() {
            let level = level.data.as_ref().ok_or(TextureError::InvalidOperation(
                "level data not loaded; read the texture eagerly first",
            ))?;
            let count = header.images_per_level(number as u32) as usize;
            let (width, height, _) = header.level_extent(number as u32);
            let descs = global
                .image_descs
                .get(image_base..image_base + count)
                .ok_or_else(|| {
                    TextureError::InvalidSgd(format!(
                        "SGD carries {} image descriptors, need {}",
                        global.image_descs.len(),
                        image_base + count
                    ))
                })?;
            let images: Vec<Etc1sImage<'_>> = descs
                .iter()
                .map(|desc| Etc1sImage {
                    desc,
                    width,
                    height,
                })
                .collect();
            let out = backend
                .transcode_etc1s_level(&global, level, &images, target)
                .map_err(|e| Self::map_codec_error(number as u32, e))?;
            decoded_levels.push(out);
            image_base += count;
        }

        let new_format = if srgb {
            VkFormat::ETC2_R8G8B8A8_SRGB_BLOCK
        } else {
            VkFormat::ETC2_R8G8B8A8_UNORM_BLOCK
        };
        self.replace_payloads(new_format, decoded_levels);
        debug!(format = %new_format, "transcoded BasisLZ texture");
        Ok(())
    }

    fn transcode_uastc(&mut self, target: TranscodeTarget) -> TextureResult<()> {
        let backend = basis_transcoder().ok_or(TextureError::LibraryNotLinked {
            scheme: "UASTC",
        })?;
        // UASTC blocks are often wrapped in Zstandard; unwrap first.
        if codec_for(self.supercompression).is_some() {
            self.decompress()?;
        }
        let header = self.header();
        let srgb = self.is_srgb_transfer();
        let mut decoded_levels = Vec::with_capacity(self.levels.len());
        for (number, level) in self.levels.iter().enumerate() {
            let data = level.data.as_ref().ok_or(TextureError::InvalidOperation(
                "level data not loaded; read the texture eagerly first",
            ))?;
            let (width, height, _) = header.level_extent(number as u32);
            let out = backend
                .transcode_uastc_level(
                    data,
                    width,
                    height,
                    header.images_per_level(number as u32),
                    target,
                )
                .map_err(|e| Self::map_codec_error(number as u32, e))?;
            decoded_levels.push(out);
        }

        let new_format = if srgb {
            VkFormat::ASTC_4X4_SRGB_BLOCK
        } else {
            VkFormat::ASTC_4X4_UNORM_BLOCK
        };
        self.replace_payloads(new_format, decoded_levels);
        debug!(format = %new_format, "transcoded UASTC texture");
        Ok(())
    }

    fn replace_payloads(&mut self, new_format: VkFormat, payloads: Vec<Vec<u8>>) {
        self.vk_format = new_format;
        self.type_size = new_format.type_size();
        self.supercompression = SupercompressionScheme::None;
        self.sgd = None;
        if let Some(dfd) = create_dfd(new_format) {
            self.dfd = dfd;
        }
        for (level, data) in self.levels.iter_mut().zip(payloads) {
            level.index.byte_length = data.len() as u64;
            level.index.uncompressed_byte_length = data.len() as u64;
            level.data = Some(data);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgba_2x2_with_mips() -> Texture {
        let mut texture = Texture::new(VkFormat::R8G8B8A8_UNORM, 2, 2, 0, 0, 1, 2).unwrap();
        texture.levels[0].data = Some(vec![0xAA; 16]);
        texture.levels[0].index.byte_length = 16;
        texture.levels[0].index.uncompressed_byte_length = 16;
        texture.levels[1].data = Some(vec![0xBB; 4]);
        texture.levels[1].index.byte_length = 4;
        texture.levels[1].index.uncompressed_byte_length = 4;
        texture
    }

    #[test]
    fn new_synthesizes_dfd_and_sizes() {
        let texture = rgba_2x2_with_mips();
        assert_eq!(texture.type_size, 1);
        assert_eq!(texture.texel_block_size(), 4);
        assert_eq!(texture.dfd.basic().unwrap().samples.len(), 4);
        assert_eq!(texture.image_count(), 2);
    }

    #[test]
    fn new_rejects_zero_width_and_undefined() {
        assert!(Texture::new(VkFormat::R8_UNORM, 0, 1, 0, 0, 1, 1).is_err());
        assert!(Texture::new(VkFormat::UNDEFINED, 4, 4, 0, 0, 1, 1).is_err());
    }

    #[test]
    fn level_faces_order_and_slicing() {
        let texture = rgba_2x2_with_mips();
        let visits: Vec<_> = texture.level_faces().collect();
        // smallest level first, matching file storage order
        assert_eq!(visits.len(), 2);
        assert_eq!(visits[0].level, 1);
        assert_eq!(visits[0].width, 1);
        assert_eq!(visits[0].face_size, 4);
        assert_eq!(visits[0].data, Some(&[0xBB; 4][..]));
        assert_eq!(visits[1].level, 0);
        assert_eq!(visits[1].data, Some(&[0xAA; 16][..]));
    }

    #[test]
    fn cube_faces_slice_per_face() {
        let mut texture = Texture::new(VkFormat::R8_UNORM, 2, 2, 0, 0, 6, 1).unwrap();
        let payload: Vec<u8> = (0..24).collect();
        texture.levels[0].index.byte_length = 24;
        texture.levels[0].index.uncompressed_byte_length = 24;
        texture.levels[0].data = Some(payload);
        let visits: Vec<_> = texture.level_faces().collect();
        assert_eq!(visits.len(), 6);
        assert_eq!(visits[2].face, 2);
        assert_eq!(visits[2].face_size, 4);
        assert_eq!(visits[2].data, Some(&[8, 9, 10, 11][..]));
    }

    #[test]
    fn decompress_zstd_restores_raw_payloads() {
        let raw = vec![7u8; 64];
        let compressed = zstd::bulk::compress(&raw, 3).unwrap();
        let mut texture = Texture::new(VkFormat::R8G8B8A8_UNORM, 4, 4, 0, 0, 1, 1).unwrap();
        texture.supercompression = SupercompressionScheme::Zstandard;
        // supercompressed payloads are unsized at the descriptor level
        if let Some(ktx_dfd::BlockBody::Basic(basic)) =
            texture.dfd.blocks.first_mut().map(|b| &mut b.body)
        {
            basic.bytes_planes = [0; 8];
        }
        texture.levels[0].index.byte_length = compressed.len() as u64;
        texture.levels[0].index.uncompressed_byte_length = raw.len() as u64;
        texture.levels[0].data = Some(compressed);

        texture.decompress().unwrap();
        assert_eq!(texture.supercompression, SupercompressionScheme::None);
        assert_eq!(texture.level_data(0), Some(&raw[..]));
        assert_eq!(texture.levels[0].index.byte_length, 64);
        assert_eq!(texture.dfd.basic().unwrap().bytes_planes[0], 4);
    }

    #[test]
    fn decompress_detects_length_lie() {
        let raw = vec![7u8; 64];
        let compressed = zstd::bulk::compress(&raw, 3).unwrap();
        let mut texture = Texture::new(VkFormat::R8G8B8A8_UNORM, 4, 4, 0, 0, 1, 1).unwrap();
        texture.supercompression = SupercompressionScheme::Zstandard;
        texture.levels[0].index.byte_length = compressed.len() as u64;
        texture.levels[0].index.uncompressed_byte_length = 128; // lie
        texture.levels[0].data = Some(compressed);

        let err = texture.decompress().unwrap_err();
        assert!(matches!(
            err,
            TextureError::DecodedLengthMismatch { level: 0, .. } | TextureError::Backend(_)
        ));
    }

    #[test]
    fn typed_metadata_accessors() {
        let mut texture = rgba_2x2_with_mips();
        assert!(texture.orientation().is_none());
        texture.kv.set(keys::ORIENTATION, b"rd".to_vec());
        texture.kv.set(keys::SWIZZLE, b"bgra\0".to_vec());
        assert!(texture.orientation().unwrap().is_ok());
        assert_eq!(texture.swizzle().unwrap().unwrap(), *b"bgra");
    }

    #[test]
    fn transcode_requires_matching_model() {
        let mut texture = rgba_2x2_with_mips();
        let err = texture.transcode(TranscodeTarget::Etc2Rgba).unwrap_err();
        assert!(matches!(err, TextureError::TranscodeFailed(_)));
    }
}
