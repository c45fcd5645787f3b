//! The issue taxonomy.
//!
//! Every problem the validator can report has a stable four-digit
//! identifier, grouped by area:
//!
//! | Range | Area |
//! |-------|------|
//! | 1000  | I/O |
//! | 2000  | File identification |
//! | 3000  | Header semantics and region index |
//! | 4000  | Level index |
//! | 5000  | Validator infrastructure and the glTF profile rulebook |
//! | 6000  | Data format descriptor |
//! | 7000  | Key/value metadata |
//! | 8000  | Supercompression global data |
//! | 9000  | System |
//!
//! Identifiers never change meaning between releases; new issues take new
//! numbers.

use serde::Serialize;
use std::fmt;

/// How bad an issue is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Advisory; the file is still valid.
    Warning,
    /// The file violates the specification.
    Error,
    /// The run cannot continue past this point.
    Fatal,
}

impl Severity {
    /// Lowercase name used in reports.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Fatal => "fatal",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A catalogued issue: identifier, grade and message template.
#[derive(Debug, PartialEq, Eq)]
pub struct IssueCode {
    /// Stable four-digit identifier.
    pub id: u16,
    /// Grade.
    pub severity: Severity,
    /// Short PascalCase name.
    pub name: &'static str,
    /// Human message, the same for every occurrence.
    pub message: &'static str,
}

/// One reported occurrence of an issue.
#[derive(Debug)]
pub struct Issue {
    /// The catalogue entry.
    pub code: &'static IssueCode,
    /// Occurrence details with positions and values filled in.
    pub details: String,
}

impl Issue {
    /// Identifier shorthand.
    pub fn id(&self) -> u16 {
        self.code.id
    }

    /// Severity shorthand.
    pub fn severity(&self) -> Severity {
        self.code.severity
    }
}

macro_rules! issue_codes {
    ($($const_name:ident = ($id:literal, $severity:ident, $name:literal, $message:literal);)*) => {
        $(
            #[doc = $message]
            pub const $const_name: IssueCode = IssueCode {
                id: $id,
                severity: Severity::$severity,
                name: $name,
                message: $message,
            };
        )*

        /// Every catalogued issue, for documentation tooling.
        pub const ALL: &[&IssueCode] = &[$(&$const_name,)*];
    };
}

/// The catalogue.
pub mod codes {
    use super::{IssueCode, Severity};

    issue_codes! {
        // 1000: I/O
        OPEN_FAILED = (1001, Fatal, "OpenFailed", "The file could not be opened.");
        SEEK_FAILED = (1002, Fatal, "SeekFailed", "A seek on the input stream failed.");
        UNEXPECTED_EOF = (1003, Fatal, "UnexpectedEof", "The file ends before the region being read.");
        READ_FAILED = (1004, Fatal, "ReadFailed", "Reading from the input stream failed.");
        WRITE_FAILED = (1005, Error, "WriteFailed", "Writing to the output stream failed.");

        // 2000: identification
        NOT_KTX2 = (2001, Fatal, "NotKtx2", "The file does not start with the KTX 2.0 identifier.");
        KTX1_FILE = (2002, Fatal, "Ktx1File", "The file is KTX 1.x; only KTX 2.0 is validated.");
        BAD_BYTE_ORDER = (2003, Fatal, "BadByteOrderMark", "The identifier's version digits are byte-swapped.");

        // 3000: header
        PROHIBITED_FORMAT = (3001, Error, "ProhibitedFormat", "vkFormat is an enumerant KTX2 prohibits.");
        INVALID_FORMAT = (3002, Error, "InvalidFormat", "vkFormat is not a VkFormat enumerant.");
        UNKNOWN_FORMAT = (3003, Warning, "UnknownFormat", "vkFormat lies in a Vulkan extension range this validator does not know.");
        WIDTH_ZERO = (3004, Error, "WidthZero", "pixelWidth must be non-zero.");
        CUBE_NOT_SQUARE = (3005, Error, "CubeNotSquare", "Cube maps require pixelWidth equal to pixelHeight.");
        DEPTH_WITHOUT_HEIGHT = (3006, Error, "DepthWithoutHeight", "pixelDepth is set but pixelHeight is zero.");
        CUBE_WITH_DEPTH = (3007, Error, "CubeWithDepth", "Cube maps must not have pixelDepth.");
        INVALID_FACE_COUNT = (3008, Error, "InvalidFaceCount", "faceCount must be 1 or 6.");
        TYPE_SIZE_MISMATCH = (3009, Error, "TypeSizeMismatch", "typeSize disagrees with the declared vkFormat.");
        TYPE_SIZE_NOT_ONE = (3010, Error, "TypeSizeNotOne", "typeSize must be 1 for block-compressed and supercompressed payloads.");
        TOO_MANY_LEVELS = (3011, Error, "TooManyLevels", "levelCount exceeds what the base extent supports.");
        BLOCK_COMPRESSED_NO_LEVELS = (3012, Error, "BlockCompressedNoLevels", "levelCount of zero requests mip generation, impossible for block-compressed formats.");
        VENDOR_SUPERCOMPRESSION = (3013, Warning, "VendorSupercompression", "supercompressionScheme is a vendor value.");
        INVALID_SUPERCOMPRESSION = (3014, Error, "InvalidSupercompression", "supercompressionScheme is a reserved value.");
        THREE_D_ARRAY = (3015, Warning, "ThreeDArray", "3D array textures are legal but rarely intended.");
        UNDEFINED_TYPE_SIZE = (3016, Error, "UndefinedFormatTypeSize", "typeSize must be 1 when vkFormat is VK_FORMAT_UNDEFINED.");
        DFD_OFFSET_INVALID = (3020, Error, "DfdOffsetInvalid", "The DFD region does not sit where the index says or is misaligned.");
        KVD_OFFSET_INVALID = (3021, Error, "KvdOffsetInvalid", "The key/value region offset is invalid or misaligned.");
        SGD_OFFSET_INVALID = (3022, Error, "SgdOffsetInvalid", "The supercompression global data offset is invalid.");
        DFD_MISSING = (3023, Error, "DfdMissing", "The container carries no data format descriptor.");
        SGD_MISALIGNED = (3024, Error, "SgdMisaligned", "The supercompression global data must start on an 8-byte boundary.");

        // 4000: level index
        LEVEL_OFFSET_MISALIGNED = (4001, Error, "LevelOffsetMisaligned", "A level payload does not start at its required alignment.");
        LEVEL_OUT_OF_ORDER = (4002, Error, "LevelOutOfOrder", "Level index entries are not ordered smallest mip first.");
        LEVEL_LENGTH_WRONG = (4003, Error, "LevelLengthWrong", "A level's byteLength disagrees with the computed image sizes.");
        LEVEL_UNCOMPRESSED_WRONG = (4004, Error, "LevelUncompressedLengthWrong", "A level's uncompressedByteLength disagrees with its byteLength.");
        BASIS_LZ_LENGTH_NOT_ZERO = (4005, Error, "BasisLzLengthNotZero", "BasisLZ levels must record an uncompressedByteLength of zero.");
        UNCOMPRESSED_NOT_MULTIPLE = (4006, Error, "UncompressedNotMultiple", "uncompressedByteLength is not a multiple of the per-image granularity.");
        FIRST_LEVEL_OFFSET_WRONG = (4007, Error, "FirstLevelOffsetWrong", "The first level payload does not follow the metadata regions at the required alignment.");
        DECODED_LENGTH_MISMATCH = (4008, Error, "DecodedLengthMismatch", "A level payload decoded to a length other than uncompressedByteLength.");
        DECODED_CHECKSUM_WRONG = (4009, Error, "DecodedChecksumWrong", "A level payload failed its checksum while decoding.");
        LEVEL_BEYOND_EOF = (4010, Error, "LevelBeyondEof", "A level payload extends past the end of the file.");

        // 5000: infrastructure and profile rulebooks
        EXPECTED_DFD_FAILED = (5001, Error, "ExpectedDfdFailed", "No reference DFD could be synthesized for the declared vkFormat.");
        CREATE_FAILED = (5002, Error, "CreateFailed", "The container could not be materialized into a texture object.");
        TRANSCODE_FAILED = (5003, Error, "TranscodeFailed", "Transcoding the texture failed.");
        DECOMPRESS_FAILED = (5004, Error, "DecompressFailed", "A supercompression backend reported a failure.");
        GLTF_SCHEME = (5101, Error, "GltfBasisuScheme", "KHR_texture_basisu requires BasisLZ or Zstandard supercompression.");
        GLTF_NOT_2D = (5102, Error, "GltfBasisuNot2d", "KHR_texture_basisu textures must be plain 2D.");
        GLTF_DIMENSIONS = (5103, Error, "GltfBasisuDimensions", "KHR_texture_basisu dimensions must be multiples of four.");
        GLTF_MIPS = (5104, Error, "GltfBasisuMips", "KHR_texture_basisu requires one level or a full mip pyramid.");
        GLTF_ORIENTATION = (5105, Error, "GltfBasisuOrientation", "KHR_texture_basisu requires orientation \"rd\".");
        GLTF_SWIZZLE = (5106, Error, "GltfBasisuSwizzle", "KHR_texture_basisu requires swizzle \"rgba\".");
        GLTF_MODEL = (5107, Error, "GltfBasisuModel", "KHR_texture_basisu requires the ETC1S or UASTC color model.");
        GLTF_PRIMARIES = (5108, Error, "GltfBasisuPrimaries", "KHR_texture_basisu restricts color primaries to BT709 or unspecified.");
        GLTF_TRANSFER = (5109, Error, "GltfBasisuTransfer", "KHR_texture_basisu restricts the transfer function to linear or sRGB.");

        // 6000: data format descriptor
        DFD_TOTAL_SIZE = (6001, Error, "DfdTotalSizeMismatch", "dfdTotalSize disagrees with the region length.");
        BASIC_BLOCK_MISSING = (6002, Error, "BasicBlockMissing", "The first descriptor block is not the Khronos basic block.");
        BASIC_BLOCK_SIZE = (6003, Error, "BasicBlockSizeInvalid", "A basic block's size is below 24 or not 24 plus a multiple of 16.");
        TOO_MANY_BLOCKS = (6004, Warning, "TooManyBlocks", "More than ten descriptor blocks; the excess was skipped.");
        TOO_MANY_SAMPLES = (6005, Warning, "TooManySamples", "More than sixteen samples in a basic block; the excess was skipped.");
        SAMPLE_COUNT_MISMATCH = (6006, Error, "SampleCountMismatch", "The sample count disagrees with the declared vkFormat.");
        BIT_OFFSET_MISMATCH = (6007, Error, "BitOffsetMismatch", "A sample's bitOffset disagrees with the declared vkFormat.");
        BIT_LENGTH_MISMATCH = (6008, Error, "BitLengthMismatch", "A sample's bitLength disagrees with the declared vkFormat.");
        CHANNEL_TYPE_MISMATCH = (6009, Error, "ChannelTypeMismatch", "A sample's channel disagrees with the declared vkFormat.");
        QUALIFIER_MISMATCH = (6010, Error, "QualifierMismatch", "A sample's qualifiers disagree with the declared vkFormat.");
        SAMPLE_POSITION_MISMATCH = (6011, Error, "SamplePositionMismatch", "A sample's position disagrees with the declared vkFormat.");
        LOWER_MISMATCH = (6012, Error, "LowerMismatch", "A sample's sampleLower disagrees with the declared vkFormat.");
        UPPER_MISMATCH = (6013, Error, "UpperMismatch", "A sample's sampleUpper disagrees with the declared vkFormat.");
        COLOR_MODEL_MISMATCH = (6014, Error, "ColorModelMismatch", "The color model disagrees with the declared vkFormat.");
        TRANSFER_MISMATCH = (6015, Error, "TransferMismatch", "The transfer function disagrees with the declared vkFormat.");
        PRIMARIES_INVALID = (6016, Error, "PrimariesInvalid", "colorPrimaries is not an assigned value.");
        BLOCK_DIMENSION_MISMATCH = (6017, Error, "BlockDimensionMismatch", "The texel block dimensions disagree with the declared vkFormat.");
        BYTES_PLANES_MISMATCH = (6018, Error, "BytesPlanesMismatch", "The plane byte table disagrees with the declared vkFormat and scheme.");
        UASTC_TEMPLATE = (6019, Error, "UastcTemplateMismatch", "The basic block does not match the UASTC template.");
        ETC1S_TEMPLATE = (6020, Error, "Etc1sTemplateMismatch", "The basic block does not match the ETC1S template.");
        UNDEFINED_FORMAT_SAMPLES = (6021, Error, "UndefinedFormatSamples", "A VK_FORMAT_UNDEFINED payload carries no usable sample description.");
        MULTIPLANE_FORBIDDEN = (6022, Error, "MultiplaneForbidden", "More than one plane byte is set; multi-plane layouts are prohibited.");

        // 7000: metadata
        KV_ENTRY_MALFORMED = (7001, Error, "EntryMalformed", "A key/value entry's length field is zero, truncated or overruns the region.");
        KV_KEY_MISSING_NUL = (7002, Error, "KeyMissingNul", "A key/value entry has no NUL between key and value.");
        KV_KEY_NOT_UTF8 = (7003, Error, "KeyNotUtf8", "A metadata key is not valid UTF-8.");
        KV_KEY_HAS_BOM = (7004, Error, "KeyHasBom", "A metadata key starts with a byte order mark.");
        KV_KEY_EMPTY = (7005, Error, "KeyEmpty", "A metadata key is empty.");
        KV_UNKNOWN_RESERVED = (7006, Error, "UnknownReservedKey", "An unrecognized key uses the reserved KTX prefix.");
        KV_CUSTOM_KEY = (7007, Warning, "CustomKey", "A key outside the KTX namespace; carried but not understood.");
        KV_TOO_MANY = (7008, Warning, "TooManyEntries", "More than one hundred key/value entries; the rest were not examined.");
        PADDING_NOT_ZERO = (7011, Error, "PaddingNotZero", "A padding byte is not zero.");
        KV_OUT_OF_ORDER = (7012, Error, "OutOfOrder", "Metadata keys are not sorted by byte value.");
        KV_DUPLICATE = (7013, Error, "DuplicateKey", "A metadata key appears more than once.");
        ORIENTATION_INVALID = (7020, Error, "OrientationInvalid", "KTXorientation does not match the texture's dimensionality.");
        CUBEMAP_INCOMPLETE_INVALID = (7021, Error, "CubemapIncompleteInvalid", "KTXcubemapIncomplete is malformed or inconsistent with layerCount.");
        SWIZZLE_INVALID = (7022, Error, "SwizzleInvalid", "KTXswizzle is not four of rgba01 plus a NUL.");
        WRITER_REQUIRED = (7023, Error, "WriterRequired", "KTXwriterScParams is present without KTXwriter.");
        WRITER_INVALID = (7024, Error, "WriterInvalid", "KTXwriter is not NUL-terminated UTF-8.");
        GL_FORMAT_INVALID = (7025, Error, "GlFormatInvalid", "KTXglFormat is malformed or used with a defined vkFormat.");
        DXGI_FORMAT_INVALID = (7026, Error, "DxgiFormatInvalid", "KTXdxgiFormat__ is malformed or used with a defined vkFormat.");
        METAL_FORMAT_INVALID = (7027, Error, "MetalFormatInvalid", "KTXmetalPixelFormat is malformed or used with a defined vkFormat.");
        ASTC_DECODE_MODE_INVALID = (7028, Error, "AstcDecodeModeInvalid", "KTXastcDecodeMode is malformed or inapplicable to this texture.");
        ANIM_DATA_INVALID = (7029, Error, "AnimDataInvalid", "KTXanimData is malformed or the texture is not an array.");
        ANIM_DATA_INCOMPATIBLE = (7030, Error, "AnimDataIncompatible", "KTXanimData cannot be combined with KTXcubemapIncomplete.");

        // 8000: supercompression global data
        SGD_MISSING = (8001, Error, "SgdMissing", "The scheme requires supercompression global data but none is present.");
        SGD_UNEXPECTED = (8002, Error, "SgdUnexpected", "The scheme forbids supercompression global data but some is present.");
        SGD_TOO_SMALL = (8003, Error, "SgdTooSmall", "The supercompression global data is shorter than its header.");
        SGD_SIZE_MISMATCH = (8004, Error, "SgdSizeMismatch", "The declared SGD section sizes do not sum to sgdByteLength.");
        IMAGE_FLAGS_INVALID = (8005, Error, "ImageFlagsInvalid", "An image descriptor sets flag bits other than the P-frame bit.");
        P_FRAME_NO_ANIM_DATA = (8006, Error, "PFrameWithoutAnimData", "A P-frame image requires KTXanimData.");
        RGB_SLICE_EMPTY = (8007, Error, "RgbSliceEmpty", "An image descriptor's rgbSliceByteLength is zero.");
        SLICE_OUT_OF_BOUNDS = (8008, Error, "SliceOutOfBounds", "An image slice extends past its level payload.");
        ALPHA_SLICE_INCONSISTENT = (8009, Error, "AlphaSliceInconsistent", "Alpha slice presence disagrees with the descriptor's sample count.");

        // 9000: system
        ALLOCATION_FAILED = (9001, Fatal, "AllocationFailed", "An allocation required by validation was rejected.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_grouped() {
        let mut seen = std::collections::BTreeSet::new();
        for code in codes::ALL {
            assert!(seen.insert(code.id), "duplicate issue id {}", code.id);
            assert!((1000..10000).contains(&code.id));
        }
    }

    #[test]
    fn spec_pinned_identifiers() {
        assert_eq!(codes::PROHIBITED_FORMAT.id, 3001);
        assert_eq!(codes::UNCOMPRESSED_NOT_MULTIPLE.id, 4006);
        assert_eq!(codes::DECODED_LENGTH_MISMATCH.id, 4008);
        assert_eq!(codes::PADDING_NOT_ZERO.id, 7011);
        assert_eq!(codes::KV_OUT_OF_ORDER.id, 7012);
        assert_eq!(codes::KV_DUPLICATE.id, 7013);
    }

    #[test]
    fn severity_strings() {
        assert_eq!(Severity::Warning.as_str(), "warning");
        assert_eq!(Severity::Fatal.to_string(), "fatal");
        assert_eq!(codes::UNKNOWN_FORMAT.severity, Severity::Warning);
        assert_eq!(codes::NOT_KTX2.severity, Severity::Fatal);
    }
}
