//! Template checks for payloads whose declared format is
//! `VK_FORMAT_UNDEFINED`.
//!
//! Such payloads are self-described by their basic block, but the two Basis
//! encodings each pin the block down to a fixed shape: ETC1S (BasisLZ) and
//! UASTC. The checks below verify the shape without assuming anything about
//! the payload bytes themselves.

use crate::block::BasicBlock;
use crate::enums::{channel_etc1s, channel_uastc, ColorModel};

/// One violation of a scheme template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateViolation {
    /// Texel block is not 4x4x1x1.
    BlockDimensions {
        /// Actual dimensions.
        actual: [u32; 4],
    },
    /// Plane byte table does not match the scheme.
    BytesPlanes {
        /// Actual planes.
        actual: [u8; 8],
    },
    /// Sample count outside what the scheme allows.
    SampleCount {
        /// Actual count.
        actual: usize,
    },
    /// A sample sits at the wrong bit offset.
    SampleBitOffset {
        /// Sample index.
        index: usize,
        /// Actual offset.
        actual: u16,
    },
    /// A sample has the wrong bit length.
    SampleBitLength {
        /// Sample index.
        index: usize,
        /// Actual length.
        actual: u16,
    },
    /// A sample uses a channel the scheme does not define.
    SampleChannel {
        /// Sample index.
        index: usize,
        /// Actual channel id.
        actual: u8,
    },
    /// A sample's lower/upper range is not the full scheme range.
    SampleRange {
        /// Sample index.
        index: usize,
    },
}

const BASIS_BLOCK: [u32; 4] = [4, 4, 1, 1];

/// Checks an ETC1S (BasisLZ) basic block.
///
/// One 64-bit RGB slice sample, optionally followed by a 64-bit alpha
/// slice sample at bit offset 64. BasisLZ payloads are always
/// supercompressed, so every plane byte must be zero.
pub fn check_etc1s(block: &BasicBlock) -> Vec<TemplateViolation> {
    debug_assert_eq!(block.color_model, ColorModel::ETC1S);
    let mut out = Vec::new();

    if block.texel_block_dimensions != BASIS_BLOCK {
        out.push(TemplateViolation::BlockDimensions {
            actual: block.texel_block_dimensions,
        });
    }
    if block.bytes_planes != [0; 8] {
        out.push(TemplateViolation::BytesPlanes {
            actual: block.bytes_planes,
        });
    }
    if block.samples.is_empty() || block.samples.len() > 2 {
        out.push(TemplateViolation::SampleCount {
            actual: block.samples.len(),
        });
    }

    for (index, sample) in block.samples.iter().take(2).enumerate() {
        let want_offset = (index as u16) * 64;
        if sample.bit_offset != want_offset {
            out.push(TemplateViolation::SampleBitOffset {
                index,
                actual: sample.bit_offset,
            });
        }
        if sample.bit_length != 64 {
            out.push(TemplateViolation::SampleBitLength {
                index,
                actual: sample.bit_length,
            });
        }
        let allowed: &[u8] = if index == 0 {
            &[
                channel_etc1s::RGB,
                channel_etc1s::RRR,
                channel_etc1s::GGG,
            ]
        } else {
            &[channel_etc1s::AAA, channel_etc1s::GGG]
        };
        if !allowed.contains(&sample.channel_type) {
            out.push(TemplateViolation::SampleChannel {
                index,
                actual: sample.channel_type,
            });
        }
        if sample.lower != 0 || sample.upper != u32::MAX {
            out.push(TemplateViolation::SampleRange { index });
        }
    }

    out
}

/// Checks a UASTC basic block.
///
/// A single 128-bit sample. `bytesPlane0` is 16 for plain UASTC and zero
/// once a supercompression scheme wraps the payload.
pub fn check_uastc(block: &BasicBlock, supercompressed: bool) -> Vec<TemplateViolation> {
    debug_assert_eq!(block.color_model, ColorModel::UASTC);
    let mut out = Vec::new();

    if block.texel_block_dimensions != BASIS_BLOCK {
        out.push(TemplateViolation::BlockDimensions {
            actual: block.texel_block_dimensions,
        });
    }
    let want_plane0 = if supercompressed { 0 } else { 16 };
    let want_planes = {
        let mut planes = [0u8; 8];
        planes[0] = want_plane0;
        planes
    };
    if block.bytes_planes != want_planes {
        out.push(TemplateViolation::BytesPlanes {
            actual: block.bytes_planes,
        });
    }
    if block.samples.len() != 1 {
        out.push(TemplateViolation::SampleCount {
            actual: block.samples.len(),
        });
    }

    if let Some(sample) = block.samples.first() {
        if sample.bit_offset != 0 {
            out.push(TemplateViolation::SampleBitOffset {
                index: 0,
                actual: sample.bit_offset,
            });
        }
        if sample.bit_length != 128 {
            out.push(TemplateViolation::SampleBitLength {
                index: 0,
                actual: sample.bit_length,
            });
        }
        let allowed = [
            channel_uastc::RGB,
            channel_uastc::RGBA,
            channel_uastc::RRR,
            channel_uastc::RRRG,
            channel_uastc::RG,
        ];
        if !allowed.contains(&sample.channel_type) {
            out.push(TemplateViolation::SampleChannel {
                index: 0,
                actual: sample.channel_type,
            });
        }
        if sample.lower != 0 || sample.upper != u32::MAX {
            out.push(TemplateViolation::SampleRange { index: 0 });
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthesize::{etc1s_basic_block, uastc_rgba_basic_block};

    #[test]
    fn canonical_etc1s_passes() {
        assert!(check_etc1s(&etc1s_basic_block(false, false)).is_empty());
        assert!(check_etc1s(&etc1s_basic_block(true, true)).is_empty());
    }

    #[test]
    fn canonical_uastc_passes() {
        assert!(check_uastc(&uastc_rgba_basic_block(false, false), false).is_empty());
        assert!(check_uastc(&uastc_rgba_basic_block(true, true), true).is_empty());
    }

    #[test]
    fn etc1s_rejects_wrong_block_and_offsets() {
        let mut block = etc1s_basic_block(true, false);
        block.texel_block_dimensions = [8, 8, 1, 1];
        block.samples[1].bit_offset = 32;
        let violations = check_etc1s(&block);
        assert!(violations
            .iter()
            .any(|v| matches!(v, TemplateViolation::BlockDimensions { .. })));
        assert!(violations
            .iter()
            .any(|v| matches!(v, TemplateViolation::SampleBitOffset { index: 1, actual: 32 })));
    }

    #[test]
    fn uastc_plane_byte_tracks_supercompression() {
        let plain = uastc_rgba_basic_block(false, false);
        // a supercompressed file must zero the plane byte
        let violations = check_uastc(&plain, true);
        assert!(violations
            .iter()
            .any(|v| matches!(v, TemplateViolation::BytesPlanes { .. })));
    }

    #[test]
    fn uastc_rejects_extra_samples() {
        let mut block = uastc_rgba_basic_block(false, false);
        let extra = block.samples[0];
        block.samples.push(extra);
        let violations = check_uastc(&block, false);
        assert!(violations
            .iter()
            .any(|v| matches!(v, TemplateViolation::SampleCount { actual: 2 })));
    }
}
