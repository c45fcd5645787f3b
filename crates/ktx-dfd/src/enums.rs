//! Khronos Data Format enumerations and flag types.
//!
//! Values follow the Khronos Data Format Specification. The open-ended
//! enumerations are newtypes over their wire integer so unrecognized values
//! survive a parse/serialize round trip.

use bitflags::bitflags;
use std::fmt;

/// Color model of a basic descriptor block.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ColorModel(pub u8);

#[allow(missing_docs)]
impl ColorModel {
    pub const UNSPECIFIED: Self = Self(0);
    pub const RGBSDA: Self = Self(1);
    pub const YUVSDA: Self = Self(2);
    pub const YIQSDA: Self = Self(3);
    pub const LABSDA: Self = Self(4);
    pub const CMYKA: Self = Self(5);
    pub const XYZW: Self = Self(6);
    pub const HSVA_ANG: Self = Self(7);
    pub const HSLA_ANG: Self = Self(8);
    pub const HSVA_HEX: Self = Self(9);
    pub const HSLA_HEX: Self = Self(10);
    pub const YCGCOA: Self = Self(11);
    pub const YCCBCCRC: Self = Self(12);
    pub const ICTCP: Self = Self(13);
    pub const CIEXYZ: Self = Self(14);
    pub const CIEXYY: Self = Self(15);
    pub const BC1A: Self = Self(128);
    pub const BC2: Self = Self(129);
    pub const BC3: Self = Self(130);
    pub const BC4: Self = Self(131);
    pub const BC5: Self = Self(132);
    pub const BC6H: Self = Self(133);
    pub const BC7: Self = Self(134);
    pub const ETC1: Self = Self(160);
    pub const ETC2: Self = Self(161);
    pub const ASTC: Self = Self(162);
    pub const ETC1S: Self = Self(163);
    pub const PVRTC: Self = Self(164);
    pub const PVRTC2: Self = Self(165);
    pub const UASTC: Self = Self(166);
}

impl ColorModel {
    /// Stable name for messages, or `None` for unassigned values.
    pub fn name(self) -> Option<&'static str> {
        Some(match self {
            Self::UNSPECIFIED => "UNSPECIFIED",
            Self::RGBSDA => "RGBSDA",
            Self::YUVSDA => "YUVSDA",
            Self::YIQSDA => "YIQSDA",
            Self::LABSDA => "LABSDA",
            Self::CMYKA => "CMYKA",
            Self::XYZW => "XYZW",
            Self::HSVA_ANG => "HSVA_ANG",
            Self::HSLA_ANG => "HSLA_ANG",
            Self::HSVA_HEX => "HSVA_HEX",
            Self::HSLA_HEX => "HSLA_HEX",
            Self::YCGCOA => "YCGCOA",
            Self::YCCBCCRC => "YCCBCCRC",
            Self::ICTCP => "ICTCP",
            Self::CIEXYZ => "CIEXYZ",
            Self::CIEXYY => "CIEXYY",
            Self::BC1A => "BC1A",
            Self::BC2 => "BC2",
            Self::BC3 => "BC3",
            Self::BC4 => "BC4",
            Self::BC5 => "BC5",
            Self::BC6H => "BC6H",
            Self::BC7 => "BC7",
            Self::ETC1 => "ETC1",
            Self::ETC2 => "ETC2",
            Self::ASTC => "ASTC",
            Self::ETC1S => "ETC1S",
            Self::PVRTC => "PVRTC",
            Self::PVRTC2 => "PVRTC2",
            Self::UASTC => "UASTC",
            _ => return None,
        })
    }

    /// True for the block-compressed models (BC, ETC, ASTC families).
    pub fn is_block_compressed(self) -> bool {
        self.0 >= 128
    }
}

impl fmt::Debug for ColorModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "ColorModel({})", self.0),
        }
    }
}

/// Color primaries of a basic descriptor block.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ColorPrimaries(pub u8);

#[allow(missing_docs)]
impl ColorPrimaries {
    pub const UNSPECIFIED: Self = Self(0);
    pub const BT709: Self = Self(1);
    pub const BT601_EBU: Self = Self(2);
    pub const BT601_SMPTE: Self = Self(3);
    pub const BT2020: Self = Self(4);
    pub const CIEXYZ: Self = Self(5);
    pub const ACES: Self = Self(6);
    pub const ACESCC: Self = Self(7);
    pub const NTSC1953: Self = Self(8);
    pub const PAL525: Self = Self(9);
    pub const DISPLAYP3: Self = Self(10);
    pub const ADOBERGB: Self = Self(11);
}

impl ColorPrimaries {
    /// Highest assigned value; anything above it is invalid on the wire.
    pub const MAX_ASSIGNED: u8 = 11;
}

impl fmt::Debug for ColorPrimaries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            Self::UNSPECIFIED => "UNSPECIFIED",
            Self::BT709 => "BT709",
            Self::BT601_EBU => "BT601_EBU",
            Self::BT601_SMPTE => "BT601_SMPTE",
            Self::BT2020 => "BT2020",
            Self::CIEXYZ => "CIEXYZ",
            Self::ACES => "ACES",
            Self::ACESCC => "ACESCC",
            Self::NTSC1953 => "NTSC1953",
            Self::PAL525 => "PAL525",
            Self::DISPLAYP3 => "DISPLAYP3",
            Self::ADOBERGB => "ADOBERGB",
            _ => return write!(f, "ColorPrimaries({})", self.0),
        };
        f.write_str(name)
    }
}

/// Transfer function of a basic descriptor block.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct TransferFunction(pub u8);

#[allow(missing_docs)]
impl TransferFunction {
    pub const UNSPECIFIED: Self = Self(0);
    pub const LINEAR: Self = Self(1);
    pub const SRGB: Self = Self(2);
    pub const ITU: Self = Self(3);
    pub const NTSC: Self = Self(4);
    pub const SLOG: Self = Self(5);
    pub const SLOG2: Self = Self(6);
    pub const BT1886: Self = Self(7);
    pub const HLG_OETF: Self = Self(8);
    pub const HLG_EOTF: Self = Self(9);
    pub const PQ_EOTF: Self = Self(10);
    pub const PQ_OETF: Self = Self(11);
    pub const DCIP3: Self = Self(12);
    pub const PAL_OETF: Self = Self(13);
    pub const PAL625_EOTF: Self = Self(14);
    pub const ST240: Self = Self(15);
    pub const ACESCC: Self = Self(16);
    pub const ACESCCT: Self = Self(17);
    pub const ADOBERGB: Self = Self(18);
}

impl fmt::Debug for TransferFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            Self::UNSPECIFIED => "UNSPECIFIED",
            Self::LINEAR => "LINEAR",
            Self::SRGB => "SRGB",
            Self::ITU => "ITU",
            Self::NTSC => "NTSC",
            Self::SLOG => "SLOG",
            Self::SLOG2 => "SLOG2",
            Self::BT1886 => "BT1886",
            Self::HLG_OETF => "HLG_OETF",
            Self::HLG_EOTF => "HLG_EOTF",
            Self::PQ_EOTF => "PQ_EOTF",
            Self::PQ_OETF => "PQ_OETF",
            Self::DCIP3 => "DCIP3",
            Self::PAL_OETF => "PAL_OETF",
            Self::PAL625_EOTF => "PAL625_EOTF",
            Self::ST240 => "ST240",
            Self::ACESCC => "ACESCC",
            Self::ACESCCT => "ACESCCT",
            Self::ADOBERGB => "ADOBERGB",
            _ => return write!(f, "TransferFunction({})", self.0),
        };
        f.write_str(name)
    }
}

bitflags! {
    /// Flags byte of a basic descriptor block.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DataFormatFlags: u8 {
        /// Alpha is premultiplied into the color channels.
        const ALPHA_PREMULTIPLIED = 1 << 0;
    }
}

impl DataFormatFlags {
    /// Straight (non-premultiplied) alpha: the all-clear flags value.
    pub const ALPHA_STRAIGHT: Self = Self::empty();
}

bitflags! {
    /// Per-sample channel qualifiers (upper nibble of the channel byte).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ChannelQualifiers: u8 {
        /// Sample is linear even though the block transfer function is not.
        const LINEAR = 1 << 0;
        /// Sample is a shared exponent.
        const EXPONENT = 1 << 1;
        /// Sample is signed.
        const SIGNED = 1 << 2;
        /// Sample is floating point.
        const FLOAT = 1 << 3;
    }
}

/// RGBSDA channel identifiers.
#[allow(missing_docs)]
pub mod channel_rgbsda {
    pub const RED: u8 = 0;
    pub const GREEN: u8 = 1;
    pub const BLUE: u8 = 2;
    pub const STENCIL: u8 = 13;
    pub const DEPTH: u8 = 14;
    pub const ALPHA: u8 = 15;
}

/// YUVSDA channel identifiers, used by the 4:2:2 formats.
#[allow(missing_docs)]
pub mod channel_yuvsda {
    pub const Y: u8 = 0;
    pub const CB: u8 = 1;
    pub const CR: u8 = 2;
    pub const ALPHA: u8 = 15;
}

/// ETC1S channel identifiers.
#[allow(missing_docs)]
pub mod channel_etc1s {
    pub const RGB: u8 = 0;
    pub const RRR: u8 = 3;
    pub const GGG: u8 = 4;
    pub const AAA: u8 = 15;
}

/// UASTC channel identifiers.
#[allow(missing_docs)]
pub mod channel_uastc {
    pub const RGB: u8 = 0;
    pub const RGBA: u8 = 3;
    pub const RRR: u8 = 4;
    pub const RRRG: u8 = 5;
    pub const RG: u8 = 6;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_names() {
        assert_eq!(ColorModel::RGBSDA.name(), Some("RGBSDA"));
        assert_eq!(ColorModel::UASTC.name(), Some("UASTC"));
        assert_eq!(ColorModel(99).name(), None);
        assert!(ColorModel::ETC1S.is_block_compressed());
        assert!(!ColorModel::RGBSDA.is_block_compressed());
    }

    #[test]
    fn qualifier_bits_match_wire_nibble() {
        let q = ChannelQualifiers::FLOAT | ChannelQualifiers::SIGNED;
        assert_eq!(q.bits(), 0b1100);
        assert_eq!(ChannelQualifiers::LINEAR.bits(), 0b0001);
        assert_eq!(ChannelQualifiers::EXPONENT.bits(), 0b0010);
    }
}
