//! Canonical DFD synthesis from a Vulkan format.
//!
//! Given a non-`UNDEFINED` format the engine can size, this module builds
//! the basic descriptor block a conformant writer would emit: color model,
//! primaries, transfer function, texel block dimensions, plane bytes and
//! the full sample list. The validator compares this expectation against
//! the descriptor actually present in the file.
//!
//! Range conventions (`lower`/`upper`):
//! - UNORM, SRGB, UINT: `0 ..= 2^bits - 1` (saturating at `u32::MAX`)
//! - SNORM, SINT: `-(2^(bits-1) - 1)` sign-extended `..= 2^(bits-1) - 1`
//! - SFLOAT: bit patterns of `-1.0` and `1.0`
//! - UFLOAT: `0` and the bit pattern of `1.0`
//! - block-compressed samples use the full 32-bit range for UNORM

use crate::block::{BasicBlock, DataFormatDescriptor, Sample};
use crate::enums::{
    channel_etc1s, channel_rgbsda, channel_uastc, channel_yuvsda, ChannelQualifiers, ColorModel,
    ColorPrimaries, DataFormatFlags, TransferFunction,
};
use ktx_core::VkFormat;

const F32_ONE: u32 = 0x3F80_0000;
const F32_MINUS_ONE: u32 = 0xBF80_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Suffix {
    Unorm,
    Snorm,
    Uint,
    Sint,
    Srgb,
    Sfloat,
    Ufloat,
}

fn suffix_of(format: VkFormat) -> Option<Suffix> {
    let name = format.name()?;
    // USCALED/SSCALED are prohibited in KTX2 and never synthesized.
    if name.contains("_USCALED") || name.contains("_SSCALED") {
        return None;
    }
    Some(if name.contains("_SRGB") {
        Suffix::Srgb
    } else if name.contains("_UNORM") {
        Suffix::Unorm
    } else if name.contains("_SNORM") {
        Suffix::Snorm
    } else if name.contains("_UFLOAT") {
        Suffix::Ufloat
    } else if name.contains("_SFLOAT") {
        Suffix::Sfloat
    } else if name.contains("_UINT") {
        Suffix::Uint
    } else if name.contains("_SINT") {
        Suffix::Sint
    } else {
        return None;
    })
}

fn bounds(suffix: Suffix, bits: u16) -> (u32, u32) {
    match suffix {
        Suffix::Unorm | Suffix::Srgb | Suffix::Uint => {
            let upper = if bits >= 32 {
                u32::MAX
            } else {
                (1u32 << bits) - 1
            };
            (0, upper)
        }
        Suffix::Snorm | Suffix::Sint => {
            let upper = if bits >= 32 {
                i32::MAX as u32
            } else {
                (1u32 << (bits - 1)) - 1
            };
            let lower = (upper as i32).wrapping_neg() as u32;
            (lower, upper)
        }
        Suffix::Sfloat => (F32_MINUS_ONE, F32_ONE),
        Suffix::Ufloat => (0, F32_ONE),
    }
}

fn qualifiers(suffix: Suffix, channel: u8) -> ChannelQualifiers {
    let mut q = match suffix {
        Suffix::Unorm | Suffix::Uint => ChannelQualifiers::empty(),
        Suffix::Srgb => ChannelQualifiers::empty(),
        Suffix::Snorm | Suffix::Sint => ChannelQualifiers::SIGNED,
        Suffix::Sfloat => ChannelQualifiers::FLOAT | ChannelQualifiers::SIGNED,
        Suffix::Ufloat => ChannelQualifiers::FLOAT,
    };
    // In an sRGB block, alpha stays linear.
    if suffix == Suffix::Srgb && channel == channel_rgbsda::ALPHA {
        q |= ChannelQualifiers::LINEAR;
    }
    q
}

fn sample(channel: u8, bit_offset: u16, bits: u16, suffix: Suffix) -> Sample {
    let (lower, upper) = bounds(suffix, bits);
    Sample {
        bit_offset,
        bit_length: bits,
        channel_type: channel,
        qualifiers: qualifiers(suffix, channel),
        positions: [0; 4],
        lower,
        upper,
    }
}

/// Uniform-width channel lists for the unpacked uncompressed formats,
/// in memory order.
fn unpacked_layout(format: VkFormat) -> Option<(&'static [u8], u16)> {
    use channel_rgbsda::*;
    const R: &[u8] = &[RED];
    const RG: &[u8] = &[RED, GREEN];
    const RGB: &[u8] = &[RED, GREEN, BLUE];
    const BGR: &[u8] = &[BLUE, GREEN, RED];
    const RGBA: &[u8] = &[RED, GREEN, BLUE, ALPHA];
    const BGRA: &[u8] = &[BLUE, GREEN, RED, ALPHA];
    const D: &[u8] = &[DEPTH];
    const S: &[u8] = &[STENCIL];

    Some(match format.0 {
        9..=15 => (R, 8),
        16..=22 => (RG, 8),
        23..=29 => (RGB, 8),
        30..=36 => (BGR, 8),
        37..=43 => (RGBA, 8),
        44..=50 => (BGRA, 8),
        70..=76 => (R, 16),
        77..=83 => (RG, 16),
        84..=90 => (RGB, 16),
        91..=97 => (RGBA, 16),
        98..=100 => (R, 32),
        101..=103 => (RG, 32),
        104..=106 => (RGB, 32),
        107..=109 => (RGBA, 32),
        110..=112 => (R, 64),
        113..=115 => (RG, 64),
        116..=118 => (RGB, 64),
        119..=121 => (RGBA, 64),
        124 => (D, 16),
        126 => (D, 32),
        127 => (S, 8),
        _ => return None,
    })
}

/// Channel lists for the packed formats, lowest bits first.
fn packed_layout(format: VkFormat) -> Option<Vec<(u8, u16)>> {
    use channel_rgbsda::*;
    Some(match format {
        VkFormat::R4G4_UNORM_PACK8 => vec![(GREEN, 4), (RED, 4)],
        VkFormat::R4G4B4A4_UNORM_PACK16 => vec![(ALPHA, 4), (BLUE, 4), (GREEN, 4), (RED, 4)],
        VkFormat::B4G4R4A4_UNORM_PACK16 => vec![(ALPHA, 4), (RED, 4), (GREEN, 4), (BLUE, 4)],
        VkFormat::A4R4G4B4_UNORM_PACK16 => vec![(BLUE, 4), (GREEN, 4), (RED, 4), (ALPHA, 4)],
        VkFormat::A4B4G4R4_UNORM_PACK16 => vec![(RED, 4), (GREEN, 4), (BLUE, 4), (ALPHA, 4)],
        VkFormat::R5G6B5_UNORM_PACK16 => vec![(BLUE, 5), (GREEN, 6), (RED, 5)],
        VkFormat::B5G6R5_UNORM_PACK16 => vec![(RED, 5), (GREEN, 6), (BLUE, 5)],
        VkFormat::R5G5B5A1_UNORM_PACK16 => vec![(ALPHA, 1), (BLUE, 5), (GREEN, 5), (RED, 5)],
        VkFormat::B5G5R5A1_UNORM_PACK16 => vec![(ALPHA, 1), (RED, 5), (GREEN, 5), (BLUE, 5)],
        VkFormat::A1R5G5B5_UNORM_PACK16 => vec![(BLUE, 5), (GREEN, 5), (RED, 5), (ALPHA, 1)],
        VkFormat::A2R10G10B10_UNORM_PACK32
        | VkFormat::A2R10G10B10_SNORM_PACK32
        | VkFormat::A2R10G10B10_UINT_PACK32
        | VkFormat::A2R10G10B10_SINT_PACK32 => {
            vec![(BLUE, 10), (GREEN, 10), (RED, 10), (ALPHA, 2)]
        }
        VkFormat::A2B10G10R10_UNORM_PACK32
        | VkFormat::A2B10G10R10_SNORM_PACK32
        | VkFormat::A2B10G10R10_UINT_PACK32
        | VkFormat::A2B10G10R10_SINT_PACK32 => {
            vec![(RED, 10), (GREEN, 10), (BLUE, 10), (ALPHA, 2)]
        }
        VkFormat::B10G11R11_UFLOAT_PACK32 => vec![(RED, 11), (GREEN, 11), (BLUE, 10)],
        _ => return None,
    })
}

fn color_primaries_for(format: VkFormat) -> ColorPrimaries {
    if format.is_depth() || format.is_stencil() {
        ColorPrimaries::UNSPECIFIED
    } else {
        ColorPrimaries::BT709
    }
}

fn base_block(format: VkFormat, model: ColorModel, transfer: TransferFunction) -> BasicBlock {
    let dims = format.block_dimensions();
    let plane0 = format.block_size_bytes().unwrap_or(0).min(255) as u8;
    BasicBlock {
        color_model: model,
        color_primaries: color_primaries_for(format),
        transfer_function: transfer,
        flags: DataFormatFlags::ALPHA_STRAIGHT,
        texel_block_dimensions: [dims[0], dims[1], dims[2], 1],
        bytes_planes: [plane0, 0, 0, 0, 0, 0, 0, 0],
        samples: Vec::new(),
    }
}

fn transfer_for(suffix: Suffix) -> TransferFunction {
    if suffix == Suffix::Srgb {
        TransferFunction::SRGB
    } else {
        TransferFunction::LINEAR
    }
}

fn block_compressed_dfd(format: VkFormat, suffix: Suffix) -> Option<BasicBlock> {
    use ktx_core::VkFormat as F;
    let transfer = transfer_for(suffix);

    // (model, samples as (channel, offset, bits))
    let (model, layout): (ColorModel, Vec<(u8, u16, u16)>) = match format {
        F::BC1_RGB_UNORM_BLOCK | F::BC1_RGB_SRGB_BLOCK => (ColorModel::BC1A, vec![(0, 0, 64)]),
        F::BC1_RGBA_UNORM_BLOCK | F::BC1_RGBA_SRGB_BLOCK => (ColorModel::BC1A, vec![(1, 0, 64)]),
        F::BC2_UNORM_BLOCK | F::BC2_SRGB_BLOCK => (
            ColorModel::BC2,
            vec![(channel_rgbsda::ALPHA, 0, 64), (0, 64, 64)],
        ),
        F::BC3_UNORM_BLOCK | F::BC3_SRGB_BLOCK => (
            ColorModel::BC3,
            vec![(channel_rgbsda::ALPHA, 0, 64), (0, 64, 64)],
        ),
        F::BC4_UNORM_BLOCK | F::BC4_SNORM_BLOCK => (ColorModel::BC4, vec![(0, 0, 64)]),
        F::BC5_UNORM_BLOCK | F::BC5_SNORM_BLOCK => {
            (ColorModel::BC5, vec![(0, 0, 64), (1, 64, 64)])
        }
        F::BC6H_UFLOAT_BLOCK | F::BC6H_SFLOAT_BLOCK => (ColorModel::BC6H, vec![(0, 0, 128)]),
        F::BC7_UNORM_BLOCK | F::BC7_SRGB_BLOCK => (ColorModel::BC7, vec![(0, 0, 128)]),
        F::ETC2_R8G8B8_UNORM_BLOCK
        | F::ETC2_R8G8B8_SRGB_BLOCK
        | F::ETC2_R8G8B8A1_UNORM_BLOCK
        | F::ETC2_R8G8B8A1_SRGB_BLOCK => (ColorModel::ETC2, vec![(2, 0, 64)]),
        F::ETC2_R8G8B8A8_UNORM_BLOCK | F::ETC2_R8G8B8A8_SRGB_BLOCK => (
            ColorModel::ETC2,
            vec![(channel_rgbsda::ALPHA, 0, 64), (2, 64, 64)],
        ),
        F::EAC_R11_UNORM_BLOCK | F::EAC_R11_SNORM_BLOCK => (ColorModel::ETC2, vec![(0, 0, 64)]),
        F::EAC_R11G11_UNORM_BLOCK | F::EAC_R11G11_SNORM_BLOCK => {
            (ColorModel::ETC2, vec![(0, 0, 64), (1, 64, 64)])
        }
        _ if format.is_astc_ldr() => (ColorModel::ASTC, vec![(0, 0, 128)]),
        _ if format.is_block_compressed() => (ColorModel::ASTC, vec![(0, 0, 128)]), // ASTC HDR
        _ => return None,
    };

    let mut block = base_block(format, model, transfer);
    for (channel, offset, bits) in layout {
        let (lower, upper) = match suffix {
            Suffix::Unorm | Suffix::Srgb => (0, u32::MAX),
            Suffix::Snorm => (0x8000_0001, 0x7FFF_FFFF),
            Suffix::Sfloat => (F32_MINUS_ONE, F32_ONE),
            Suffix::Ufloat => (0, F32_ONE),
            Suffix::Uint | Suffix::Sint => return None,
        };
        let mut q = match suffix {
            Suffix::Snorm => ChannelQualifiers::SIGNED,
            Suffix::Sfloat => ChannelQualifiers::FLOAT | ChannelQualifiers::SIGNED,
            Suffix::Ufloat => ChannelQualifiers::FLOAT,
            _ => ChannelQualifiers::empty(),
        };
        if suffix == Suffix::Srgb && channel == channel_rgbsda::ALPHA {
            q |= ChannelQualifiers::LINEAR;
        }
        block.samples.push(Sample {
            bit_offset: offset,
            bit_length: bits,
            channel_type: channel,
            qualifiers: q,
            positions: [0; 4],
            lower,
            upper,
        });
    }
    Some(block)
}

fn depth_stencil_dfd(format: VkFormat) -> Option<BasicBlock> {
    use channel_rgbsda::{DEPTH, STENCIL};
    let mut block = base_block(format, ColorModel::RGBSDA, TransferFunction::LINEAR);
    match format {
        VkFormat::X8_D24_UNORM_PACK32 => {
            block.samples.push(sample(DEPTH, 0, 24, Suffix::Unorm));
        }
        VkFormat::D16_UNORM_S8_UINT => {
            block.samples.push(sample(DEPTH, 0, 16, Suffix::Unorm));
            block.samples.push(sample(STENCIL, 16, 8, Suffix::Uint));
        }
        VkFormat::D24_UNORM_S8_UINT => {
            block.samples.push(sample(DEPTH, 0, 24, Suffix::Unorm));
            block.samples.push(sample(STENCIL, 24, 8, Suffix::Uint));
        }
        VkFormat::D32_SFLOAT_S8_UINT => {
            block.samples.push(sample(DEPTH, 0, 32, Suffix::Sfloat));
            block.samples.push(sample(STENCIL, 32, 8, Suffix::Uint));
        }
        _ => return None,
    }
    Some(block)
}

fn shared_exponent_dfd(format: VkFormat) -> BasicBlock {
    use channel_rgbsda::{BLUE, GREEN, RED};
    // E5B9G9R9: three 9-bit mantissas sharing one 5-bit exponent. Each
    // channel gets a mantissa sample and an exponent-qualified sample
    // aliasing the exponent bits.
    let mut block = base_block(format, ColorModel::RGBSDA, TransferFunction::LINEAR);
    for (channel, offset) in [(RED, 0u16), (GREEN, 9), (BLUE, 18)] {
        block.samples.push(Sample {
            bit_offset: offset,
            bit_length: 9,
            channel_type: channel,
            qualifiers: ChannelQualifiers::empty(),
            positions: [0; 4],
            lower: 0,
            upper: 8448,
        });
        block.samples.push(Sample {
            bit_offset: 27,
            bit_length: 5,
            channel_type: channel,
            qualifiers: ChannelQualifiers::EXPONENT,
            positions: [0; 4],
            lower: 15,
            upper: 31,
        });
    }
    block
}

fn subsampled_422_dfd(format: VkFormat) -> Option<BasicBlock> {
    use channel_yuvsda::{CB, CR, Y};
    // Single-plane 4:2:2: a 2x1 texel block with two luma samples and one
    // chroma pair centered between them. The X positions are expressed in
    // eighth-pixel units of the block.
    let bits: u16 = match format {
        VkFormat::G8B8G8R8_422_UNORM | VkFormat::B8G8R8G8_422_UNORM => 8,
        VkFormat::G16B16G16R16_422_UNORM | VkFormat::B16G16R16G16_422_UNORM => 16,
        _ => return None,
    };
    // (channel, position_x) in memory order
    let order: [(u8, u8); 4] = match format {
        VkFormat::G8B8G8R8_422_UNORM | VkFormat::G16B16G16R16_422_UNORM => {
            [(Y, 0), (CB, 64), (Y, 128), (CR, 64)]
        }
        VkFormat::B8G8R8G8_422_UNORM | VkFormat::B16G16R16G16_422_UNORM => {
            [(CB, 64), (Y, 0), (CR, 64), (Y, 128)]
        }
        _ => return None,
    };
    let mut block = base_block(format, ColorModel::YUVSDA, TransferFunction::LINEAR);
    let mut offset = 0u16;
    let mut seen_y = false;
    for (channel, pos_x) in order {
        // the second luma sample sits one pixel to the right
        let pos = if channel == Y {
            let p = if seen_y { 128 } else { 0 };
            seen_y = true;
            p
        } else {
            pos_x
        };
        block.samples.push(Sample {
            bit_offset: offset,
            bit_length: bits,
            channel_type: channel,
            qualifiers: ChannelQualifiers::empty(),
            positions: [pos, 0, 0, 0],
            lower: 0,
            upper: (1u32 << bits) - 1,
        });
        offset += bits;
    }
    Some(block)
}

/// Builds the canonical basic block for `format`.
///
/// Returns `None` for `UNDEFINED`, prohibited, unknown, and
/// chroma-packed `X6`/`X4` formats the engine does not synthesize.
pub fn create_basic_block(format: VkFormat) -> Option<BasicBlock> {
    if format == VkFormat::UNDEFINED || format.is_prohibited() {
        return None;
    }
    if format == VkFormat::E5B9G9R9_UFLOAT_PACK32 {
        return Some(shared_exponent_dfd(format));
    }
    if format.is_422() {
        return subsampled_422_dfd(format);
    }
    let suffix = suffix_of(format)?;
    if format.is_block_compressed() {
        return block_compressed_dfd(format, suffix);
    }
    if matches!(
        format,
        VkFormat::X8_D24_UNORM_PACK32
            | VkFormat::D16_UNORM_S8_UINT
            | VkFormat::D24_UNORM_S8_UINT
            | VkFormat::D32_SFLOAT_S8_UINT
    ) {
        return depth_stencil_dfd(format);
    }
    if let Some(layout) = packed_layout(format) {
        let mut block = base_block(format, ColorModel::RGBSDA, transfer_for(suffix));
        let mut offset = 0u16;
        for (channel, bits) in layout {
            block.samples.push(sample(channel, offset, bits, suffix));
            offset += bits;
        }
        return Some(block);
    }
    if let Some((channels, bits)) = unpacked_layout(format) {
        let mut block = base_block(format, ColorModel::RGBSDA, transfer_for(suffix));
        let mut offset = 0u16;
        for &channel in channels {
            block.samples.push(sample(channel, offset, bits, suffix));
            offset += bits;
        }
        return Some(block);
    }
    None
}

/// Builds the full descriptor (basic block only) for `format`.
pub fn create_dfd(format: VkFormat) -> Option<DataFormatDescriptor> {
    create_basic_block(format).map(DataFormatDescriptor::from_basic)
}

/// Canonical basic block for BasisLZ/ETC1S payloads.
///
/// `plane0` is zero because the payload is supercompressed and therefore
/// unsized at the descriptor level.
pub fn etc1s_basic_block(has_alpha: bool, srgb: bool) -> BasicBlock {
    let transfer = if srgb {
        TransferFunction::SRGB
    } else {
        TransferFunction::LINEAR
    };
    let mut samples = vec![Sample {
        bit_offset: 0,
        bit_length: 64,
        channel_type: channel_etc1s::RGB,
        qualifiers: ChannelQualifiers::empty(),
        positions: [0; 4],
        lower: 0,
        upper: u32::MAX,
    }];
    if has_alpha {
        samples.push(Sample {
            bit_offset: 64,
            bit_length: 64,
            channel_type: channel_etc1s::AAA,
            qualifiers: if srgb {
                ChannelQualifiers::LINEAR
            } else {
                ChannelQualifiers::empty()
            },
            positions: [0; 4],
            lower: 0,
            upper: u32::MAX,
        });
    }
    BasicBlock {
        color_model: ColorModel::ETC1S,
        color_primaries: ColorPrimaries::BT709,
        transfer_function: transfer,
        flags: DataFormatFlags::ALPHA_STRAIGHT,
        texel_block_dimensions: [4, 4, 1, 1],
        bytes_planes: [0; 8],
        samples,
    }
}

/// Canonical basic block for UASTC payloads.
///
/// `supercompressed` controls `bytesPlane0`: zero once a supercompression
/// scheme wraps the payload, 16 for plain UASTC blocks.
pub fn uastc_basic_block(channel: u8, srgb: bool, supercompressed: bool) -> BasicBlock {
    let transfer = if srgb {
        TransferFunction::SRGB
    } else {
        TransferFunction::LINEAR
    };
    BasicBlock {
        color_model: ColorModel::UASTC,
        color_primaries: ColorPrimaries::BT709,
        transfer_function: transfer,
        flags: DataFormatFlags::ALPHA_STRAIGHT,
        texel_block_dimensions: [4, 4, 1, 1],
        bytes_planes: [if supercompressed { 0 } else { 16 }, 0, 0, 0, 0, 0, 0, 0],
        samples: vec![Sample {
            bit_offset: 0,
            bit_length: 128,
            channel_type: channel,
            qualifiers: ChannelQualifiers::empty(),
            positions: [0; 4],
            lower: 0,
            upper: u32::MAX,
        }],
    }
}

/// UASTC with all four channels, the common default.
pub fn uastc_rgba_basic_block(srgb: bool, supercompressed: bool) -> BasicBlock {
    uastc_basic_block(channel_uastc::RGBA, srgb, supercompressed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::channel_rgbsda::*;

    #[test]
    fn rgba8_layout() {
        let block = create_basic_block(VkFormat::R8G8B8A8_UNORM).unwrap();
        assert_eq!(block.color_model, ColorModel::RGBSDA);
        assert_eq!(block.transfer_function, TransferFunction::LINEAR);
        assert_eq!(block.texel_block_dimensions, [1, 1, 1, 1]);
        assert_eq!(block.bytes_planes[0], 4);
        assert_eq!(block.samples.len(), 4);
        let expected = [(RED, 0u16), (GREEN, 8), (BLUE, 16), (ALPHA, 24)];
        for (sample, (channel, offset)) in block.samples.iter().zip(expected) {
            assert_eq!(sample.channel_type, channel);
            assert_eq!(sample.bit_offset, offset);
            assert_eq!(sample.bit_length, 8);
            assert_eq!(sample.lower, 0);
            assert_eq!(sample.upper, 255);
        }
    }

    #[test]
    fn srgb_alpha_is_linear() {
        let block = create_basic_block(VkFormat::R8G8B8A8_SRGB).unwrap();
        assert_eq!(block.transfer_function, TransferFunction::SRGB);
        assert!(block.samples[3].qualifiers.contains(ChannelQualifiers::LINEAR));
        assert!(!block.samples[0].qualifiers.contains(ChannelQualifiers::LINEAR));
    }

    #[test]
    fn snorm_bounds_sign_extend() {
        let block = create_basic_block(VkFormat::R8_SNORM).unwrap();
        let s = block.samples[0];
        assert_eq!(s.upper, 127);
        assert_eq!(s.lower as i32, -127);
        assert!(s.qualifiers.contains(ChannelQualifiers::SIGNED));
    }

    #[test]
    fn float_bounds() {
        let block = create_basic_block(VkFormat::R16G16B16A16_SFLOAT).unwrap();
        for s in &block.samples {
            assert_eq!(s.lower, 0xBF80_0000);
            assert_eq!(s.upper, 0x3F80_0000);
            assert!(s.qualifiers.contains(ChannelQualifiers::FLOAT));
        }
    }

    #[test]
    fn packed_rgb565_is_lsb_first() {
        let block = create_basic_block(VkFormat::R5G6B5_UNORM_PACK16).unwrap();
        assert_eq!(block.samples.len(), 3);
        assert_eq!(block.samples[0].channel_type, BLUE);
        assert_eq!(block.samples[0].bit_offset, 0);
        assert_eq!(block.samples[0].bit_length, 5);
        assert_eq!(block.samples[1].channel_type, GREEN);
        assert_eq!(block.samples[1].bit_offset, 5);
        assert_eq!(block.samples[1].bit_length, 6);
        assert_eq!(block.samples[2].channel_type, RED);
        assert_eq!(block.samples[2].bit_offset, 11);
    }

    #[test]
    fn bc7_block() {
        let block = create_basic_block(VkFormat::BC7_SRGB_BLOCK).unwrap();
        assert_eq!(block.color_model, ColorModel::BC7);
        assert_eq!(block.texel_block_dimensions, [4, 4, 1, 1]);
        assert_eq!(block.bytes_planes[0], 16);
        assert_eq!(block.samples.len(), 1);
        assert_eq!(block.samples[0].bit_length, 128);
    }

    #[test]
    fn etc2_rgba8_has_alpha_sample_first() {
        let block = create_basic_block(VkFormat::ETC2_R8G8B8A8_UNORM_BLOCK).unwrap();
        assert_eq!(block.samples.len(), 2);
        assert_eq!(block.samples[0].channel_type, ALPHA);
        assert_eq!(block.samples[0].bit_offset, 0);
        assert_eq!(block.samples[1].bit_offset, 64);
    }

    #[test]
    fn depth_stencil_packing() {
        let block = create_basic_block(VkFormat::D24_UNORM_S8_UINT).unwrap();
        assert_eq!(block.samples.len(), 2);
        assert_eq!(block.samples[0].channel_type, DEPTH);
        assert_eq!(block.samples[0].bit_length, 24);
        assert_eq!(block.samples[1].channel_type, STENCIL);
        assert_eq!(block.samples[1].bit_offset, 24);
    }

    #[test]
    fn shared_exponent_has_six_samples() {
        let block = create_basic_block(VkFormat::E5B9G9R9_UFLOAT_PACK32).unwrap();
        assert_eq!(block.samples.len(), 6);
        let exponents: Vec<_> = block
            .samples
            .iter()
            .filter(|s| s.qualifiers.contains(ChannelQualifiers::EXPONENT))
            .collect();
        assert_eq!(exponents.len(), 3);
        for e in exponents {
            assert_eq!(e.bit_offset, 27);
            assert_eq!(e.bit_length, 5);
        }
    }

    #[test]
    fn subsampled_422() {
        let block = create_basic_block(VkFormat::G8B8G8R8_422_UNORM).unwrap();
        assert_eq!(block.color_model, ColorModel::YUVSDA);
        assert_eq!(block.texel_block_dimensions, [2, 1, 1, 1]);
        assert_eq!(block.samples.len(), 4);
        // two luma samples at pixel positions 0 and 1
        let luma: Vec<_> = block
            .samples
            .iter()
            .filter(|s| s.channel_type == channel_yuvsda::Y)
            .collect();
        assert_eq!(luma.len(), 2);
        assert_eq!(luma[0].positions[0], 0);
        assert_eq!(luma[1].positions[0], 128);
    }

    #[test]
    fn no_synthesis_for_undefined_or_prohibited() {
        assert!(create_basic_block(VkFormat::UNDEFINED).is_none());
        assert!(create_basic_block(VkFormat::R8_USCALED).is_none());
        assert!(create_basic_block(VkFormat::A8B8G8R8_UNORM_PACK32).is_none());
        assert!(create_basic_block(VkFormat(1_000_123_456)).is_none());
    }

    #[test]
    fn etc1s_template() {
        let rgb = etc1s_basic_block(false, false);
        assert_eq!(rgb.samples.len(), 1);
        assert_eq!(rgb.bytes_planes, [0; 8]);
        let rgba = etc1s_basic_block(true, true);
        assert_eq!(rgba.samples.len(), 2);
        assert_eq!(rgba.samples[1].bit_offset, 64);
        assert_eq!(rgba.samples[1].channel_type, channel_etc1s::AAA);
        assert!(rgba.samples[1].qualifiers.contains(ChannelQualifiers::LINEAR));
    }

    #[test]
    fn uastc_template() {
        let block = uastc_rgba_basic_block(true, false);
        assert_eq!(block.samples.len(), 1);
        assert_eq!(block.samples[0].bit_length, 128);
        assert_eq!(block.bytes_planes[0], 16);
        let sc = uastc_rgba_basic_block(false, true);
        assert_eq!(sc.bytes_planes[0], 0);
    }
}
