//! The staged validation pipeline.
//!
//! Stages run in a fixed order so the issue stream is deterministic:
//! identification, header semantics, region index, expected-DFD synthesis,
//! DFD, level index (which needs the DFD for alignment), key/value data,
//! SGD, region paddings, and finally a create/decode smoke test. A fatal
//! issue unwinds the run; everything else accumulates.

use crate::gltf;
use crate::issue::{codes, Issue, IssueCode, Severity};
use crate::report::ValidationReport;
use ktx_container::metadata::{
    self, keys, CubemapIncomplete, RawEntryWalker, WalkError, BOM,
};
use ktx_container::{
    codec_for, identify, level_payload_size, parse_level_index, required_level_alignment,
    texel_block_size, Header, Identification, LevelIndexEntry, LoadMode, MemStream,
    SupercompressionScheme, TextureReader, TranscodeTarget,
};
use ktx_core::align::align_up;
use ktx_core::{FormatClass, TextureError, VkFormat};
use ktx_dfd::{
    check_etc1s, check_uastc, compare_blocks, create_basic_block, BasicBlock, ColorModel,
    ColorPrimaries, DataFormatDescriptor, Divergence, ParseNote, SampleField,
};
use std::path::Path;
use tracing::debug;

/// Validation switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidateOptions {
    /// Count warnings as errors when judging validity.
    pub warnings_as_errors: bool,
    /// Apply the glTF `KHR_texture_basisu` profile rulebook as well.
    pub gltf_basisu: bool,
}

/// The KTX2 validator.
#[derive(Debug, Clone, Copy, Default)]
pub struct Validator {
    options: ValidateOptions,
}

impl Validator {
    /// Validator with the given options.
    pub fn new(options: ValidateOptions) -> Self {
        Self { options }
    }

    /// Validates a file on disk.
    pub fn validate_file<P: AsRef<Path>>(&self, path: P) -> ValidationReport {
        let mut report = ValidationReport::new(self.options.warnings_as_errors);
        match std::fs::read(path.as_ref()) {
            Ok(data) => {
                Context {
                    data: &data,
                    options: self.options,
                    report: &mut report,
                }
                .run();
            }
            Err(source) => report.push(Issue {
                code: &codes::OPEN_FAILED,
                details: format!("{}: {source}", path.as_ref().display()),
            }),
        }
        report
    }

    /// Validates an in-memory file image.
    pub fn validate_bytes(&self, data: &[u8]) -> ValidationReport {
        let mut report = ValidationReport::new(self.options.warnings_as_errors);
        Context {
            data,
            options: self.options,
            report: &mut report,
        }
        .run();
        report
    }
}

/// Collected facts about the metadata, consumed by later stages.
#[derive(Debug, Default)]
pub(crate) struct KvdFacts {
    pub writer: bool,
    pub sc_params: bool,
    pub anim_data: bool,
    pub cubemap_incomplete: Option<CubemapIncomplete>,
    pub orientation: Option<Vec<u8>>,
    pub swizzle: Option<Vec<u8>>,
}

struct Context<'a, 'r> {
    data: &'a [u8],
    options: ValidateOptions,
    report: &'r mut ValidationReport,
}

impl Context<'_, '_> {
    fn add(&mut self, code: &'static IssueCode, details: String) {
        self.report.push(Issue { code, details });
    }

    fn run(mut self) {
        let Some(header) = self.stage_identify() else {
            return;
        };
        self.stage_header_semantics(&header);
        self.stage_region_index(&header);
        let expected = self.stage_expected_dfd(&header);
        let dfd = self.stage_dfd(&header, expected.as_ref());
        let Some(entries) = self.stage_level_index(&header, dfd.as_ref()) else {
            return;
        };
        let facts = self.stage_kvd(&header, dfd.as_ref());
        self.stage_sgd(&header, dfd.as_ref(), &entries, &facts);
        self.stage_paddings(&header, &entries);
        // the smoke test re-parses with the strict reader; a header already
        // reported as broken would only echo those findings as 5002
        let header_broken = self.report.issues().iter().any(|issue| {
            (2000..4000).contains(&issue.id()) && issue.severity() >= Severity::Error
        });
        if !header_broken {
            self.stage_create_and_decode(&header);
        }
        if self.options.gltf_basisu {
            gltf::run(
                &header,
                dfd.as_ref(),
                &facts,
                self.report,
            );
        }
        debug!(
            errors = self.report.error_count(),
            warnings = self.report.warning_count(),
            "validation finished"
        );
    }

    fn stage_identify(&mut self) -> Option<Header> {
        if self.data.len() < Header::LENGTH {
            self.add(
                &codes::UNEXPECTED_EOF,
                format!(
                    "the file is {} bytes, shorter than the {}-byte header",
                    self.data.len(),
                    Header::LENGTH
                ),
            );
            return None;
        }
        let magic: &[u8; 12] = self.data[0..12].try_into().expect("twelve bytes");
        match identify(magic) {
            Identification::Ktx2 => {}
            Identification::Ktx1 => {
                self.add(&codes::KTX1_FILE, format!("identifier {magic:02X?}"));
                return None;
            }
            Identification::SwappedEndian => {
                self.add(&codes::BAD_BYTE_ORDER, format!("identifier {magic:02X?}"));
                return None;
            }
            Identification::Foreign => {
                self.add(&codes::NOT_KTX2, format!("identifier {magic:02X?}"));
                return None;
            }
        }
        let header_bytes: &[u8; Header::LENGTH] =
            self.data[..Header::LENGTH].try_into().expect("80 bytes");
        Header::parse(header_bytes).ok()
    }

    fn stage_header_semantics(&mut self, header: &Header) {
        let format = header.vk_format;
        match format.classify() {
            FormatClass::Known => {}
            FormatClass::Prohibited => {
                self.add(&codes::PROHIBITED_FORMAT, format!("vkFormat is {format}"))
            }
            FormatClass::Unknown => {
                self.add(&codes::INVALID_FORMAT, format!("vkFormat is {}", format.0))
            }
            FormatClass::ReservedExtension => {
                self.add(&codes::UNKNOWN_FORMAT, format!("vkFormat is {}", format.0))
            }
        }

        if header.pixel_width == 0 {
            self.add(&codes::WIDTH_ZERO, "pixelWidth is 0".to_owned());
        }
        if !matches!(header.face_count, 1 | 6) {
            self.add(
                &codes::INVALID_FACE_COUNT,
                format!("faceCount is {}", header.face_count),
            );
        }
        if header.is_cubemap() {
            if header.pixel_width != header.pixel_height {
                self.add(
                    &codes::CUBE_NOT_SQUARE,
                    format!("{}x{}", header.pixel_width, header.pixel_height),
                );
            }
            if header.pixel_depth != 0 {
                self.add(
                    &codes::CUBE_WITH_DEPTH,
                    format!("pixelDepth is {}", header.pixel_depth),
                );
            }
        }
        if header.pixel_depth > 0 && header.pixel_height == 0 {
            self.add(
                &codes::DEPTH_WITHOUT_HEIGHT,
                format!("pixelDepth is {} with pixelHeight 0", header.pixel_depth),
            );
        }
        if header.pixel_depth > 0 && header.layer_count > 0 {
            self.add(
                &codes::THREE_D_ARRAY,
                format!(
                    "pixelDepth {} with layerCount {}",
                    header.pixel_depth, header.layer_count
                ),
            );
        }

        if format == VkFormat::UNDEFINED {
            if header.type_size != 1 {
                self.add(
                    &codes::UNDEFINED_TYPE_SIZE,
                    format!("typeSize is {}", header.type_size),
                );
            }
        } else if format.classify() == FormatClass::Known {
            let expected = format.type_size();
            if header.type_size != expected {
                if format.is_block_compressed() {
                    self.add(
                        &codes::TYPE_SIZE_NOT_ONE,
                        format!("typeSize is {} for {format}", header.type_size),
                    );
                } else {
                    self.add(
                        &codes::TYPE_SIZE_MISMATCH,
                        format!(
                            "typeSize is {}, {format} requires {expected}",
                            header.type_size
                        ),
                    );
                }
            }
            if format.is_block_compressed() && header.level_count == 0 {
                self.add(
                    &codes::BLOCK_COMPRESSED_NO_LEVELS,
                    format!("levelCount is 0 for {format}"),
                );
            }
        }

        if header.level_count > header.max_level_count() {
            self.add(
                &codes::TOO_MANY_LEVELS,
                format!(
                    "levelCount is {}, the base extent supports {}",
                    header.level_count,
                    header.max_level_count()
                ),
            );
        }

        match header.supercompression {
            SupercompressionScheme::Reserved(value) => self.add(
                &codes::INVALID_SUPERCOMPRESSION,
                format!("supercompressionScheme is {value}"),
            ),
            SupercompressionScheme::Vendor(value) => self.add(
                &codes::VENDOR_SUPERCOMPRESSION,
                format!("supercompressionScheme is {value:#010X}"),
            ),
            _ => {}
        }
    }

    fn stage_region_index(&mut self, header: &Header) {
        let file_size = self.data.len() as u64;
        let expected_dfd = header.past_level_index();

        if header.index.dfd_byte_length == 0 {
            self.add(&codes::DFD_MISSING, "dfdByteLength is 0".to_owned());
        } else {
            if header.index.dfd_byte_offset as u64 != expected_dfd {
                self.add(
                    &codes::DFD_OFFSET_INVALID,
                    format!(
                        "dfdByteOffset is {}, expected {expected_dfd}",
                        header.index.dfd_byte_offset
                    ),
                );
            }
            let end = header.index.dfd_byte_offset as u64 + header.index.dfd_byte_length as u64;
            if end > file_size {
                self.add(
                    &codes::DFD_OFFSET_INVALID,
                    format!("the DFD region ends at {end}, past the {file_size}-byte file"),
                );
            }
        }

        if header.index.kvd_byte_length > 0 {
            let offset = header.index.kvd_byte_offset as u64;
            let end = offset + header.index.kvd_byte_length as u64;
            if offset % 4 != 0 {
                self.add(
                    &codes::KVD_OFFSET_INVALID,
                    format!("kvdByteOffset {offset} is not 4-byte aligned"),
                );
            }
            if end > file_size {
                self.add(
                    &codes::KVD_OFFSET_INVALID,
                    format!("the key/value region ends at {end}, past the {file_size}-byte file"),
                );
            }
        }

        if header.index.sgd_byte_length > 0 {
            let offset = header.index.sgd_byte_offset;
            if offset % 8 != 0 {
                self.add(
                    &codes::SGD_MISALIGNED,
                    format!("sgdByteOffset {offset} is not 8-byte aligned"),
                );
            }
            match offset.checked_add(header.index.sgd_byte_length) {
                Some(end) if end <= file_size => {}
                _ => self.add(
                    &codes::SGD_OFFSET_INVALID,
                    format!(
                        "the SGD region spans {offset}+{}, past the {file_size}-byte file",
                        header.index.sgd_byte_length
                    ),
                ),
            }
        }
    }

    fn stage_expected_dfd(&mut self, header: &Header) -> Option<BasicBlock> {
        if header.vk_format == VkFormat::UNDEFINED
            || header.vk_format.classify() != FormatClass::Known
        {
            return None;
        }
        match create_basic_block(header.vk_format) {
            Some(mut block) => {
                // supercompressed payloads are unsized at the plane level
                if header.supercompression.is_supercompressed() {
                    block.bytes_planes = [0; 8];
                }
                Some(block)
            }
            None => {
                self.add(
                    &codes::EXPECTED_DFD_FAILED,
                    format!("no reference layout for {}", header.vk_format),
                );
                None
            }
        }
    }

    fn dfd_region(&self, header: &Header) -> Option<&[u8]> {
        let offset = header.index.dfd_byte_offset as usize;
        let length = header.index.dfd_byte_length as usize;
        if length == 0 {
            return None;
        }
        self.data.get(offset..offset + length)
    }

    fn stage_dfd(
        &mut self,
        header: &Header,
        expected: Option<&BasicBlock>,
    ) -> Option<DataFormatDescriptor> {
        let region = self.dfd_region(header)?.to_vec();
        let (dfd, notes) = match DataFormatDescriptor::parse(&region) {
            Ok(parsed) => parsed,
            Err(e) => {
                self.add(&codes::DFD_TOTAL_SIZE, e.to_string());
                return None;
            }
        };
        for note in notes {
            match note {
                ParseNote::TotalSizeMismatch { declared, region } => self.add(
                    &codes::DFD_TOTAL_SIZE,
                    format!("dfdTotalSize is {declared}, the region is {region} bytes"),
                ),
                ParseNote::TrailingBytes { len } => self.add(
                    &codes::DFD_TOTAL_SIZE,
                    format!("{len} bytes remain after the last whole block"),
                ),
                ParseNote::TooManyBlocks { count } => self.add(
                    &codes::TOO_MANY_BLOCKS,
                    format!("{count} blocks declared"),
                ),
                ParseNote::TooManySamples { block_index, count } => self.add(
                    &codes::TOO_MANY_SAMPLES,
                    format!("block {block_index} declares {count} samples"),
                ),
                ParseNote::BasicSizeInvalid { block_index, size } => self.add(
                    &codes::BASIC_BLOCK_SIZE,
                    format!("block {block_index} declares {size} bytes"),
                ),
                ParseNote::BlockTruncated { block_index } => self.add(
                    &codes::BASIC_BLOCK_SIZE,
                    format!("block {block_index} runs past the end of the region"),
                ),
                ParseNote::BasicNotFirst => self.add(
                    &codes::BASIC_BLOCK_MISSING,
                    "the basic block must come first".to_owned(),
                ),
            }
        }

        if let Some(basic) = dfd.basic() {
            if basic.color_primaries.0 > ColorPrimaries::MAX_ASSIGNED {
                self.add(
                    &codes::PRIMARIES_INVALID,
                    format!("colorPrimaries is {}", basic.color_primaries.0),
                );
            }
            if basic.bytes_planes[1..].iter().any(|&b| b != 0) {
                self.add(
                    &codes::MULTIPLANE_FORBIDDEN,
                    format!("bytesPlanes are {:?}", basic.bytes_planes),
                );
            }

            if let Some(expected) = expected {
                self.compare_dfd(expected, basic, header.vk_format.is_422());
            }

            if header.vk_format == VkFormat::UNDEFINED {
                self.interpret_undefined(header, basic);
            }
        }

        Some(dfd)
    }

    fn compare_dfd(&mut self, expected: &BasicBlock, actual: &BasicBlock, is_422: bool) {
        for divergence in compare_blocks(expected, actual, is_422) {
            match divergence {
                Divergence::ColorModel { expected, actual } => self.add(
                    &codes::COLOR_MODEL_MISMATCH,
                    format!("colorModel is {actual}, expected {expected}"),
                ),
                Divergence::TransferFunction { expected, actual } => self.add(
                    &codes::TRANSFER_MISMATCH,
                    format!("transferFunction is {actual}, expected {expected}"),
                ),
                Divergence::BlockDimensions { expected, actual } => self.add(
                    &codes::BLOCK_DIMENSION_MISMATCH,
                    format!("texel block is {actual:?}, expected {expected:?}"),
                ),
                Divergence::BytesPlanes { expected, actual } => self.add(
                    &codes::BYTES_PLANES_MISMATCH,
                    format!("bytesPlanes are {actual:?}, expected {expected:?}"),
                ),
                Divergence::SampleCount { expected, actual } => self.add(
                    &codes::SAMPLE_COUNT_MISMATCH,
                    format!("{actual} samples, expected {expected}"),
                ),
                Divergence::Sample {
                    index,
                    field,
                    expected,
                    actual,
                } => {
                    let (code, field_name): (&'static IssueCode, &str) = match field {
                        SampleField::BitOffset => (&codes::BIT_OFFSET_MISMATCH, "bitOffset"),
                        SampleField::BitLength => (&codes::BIT_LENGTH_MISMATCH, "bitLength"),
                        SampleField::ChannelType => {
                            (&codes::CHANNEL_TYPE_MISMATCH, "channelType")
                        }
                        SampleField::Qualifiers => (&codes::QUALIFIER_MISMATCH, "qualifiers"),
                        SampleField::Position(_) => {
                            (&codes::SAMPLE_POSITION_MISMATCH, "samplePosition")
                        }
                        SampleField::Lower => (&codes::LOWER_MISMATCH, "sampleLower"),
                        SampleField::Upper => (&codes::UPPER_MISMATCH, "sampleUpper"),
                    };
                    let axis = match field {
                        SampleField::Position(axis) => format!("[{axis}]"),
                        _ => String::new(),
                    };
                    self.add(
                        code,
                        format!(
                            "sample {index} {field_name}{axis} is {actual}, expected {expected}"
                        ),
                    );
                }
            }
        }
    }

    fn interpret_undefined(&mut self, header: &Header, basic: &BasicBlock) {
        match basic.color_model {
            ColorModel::ETC1S => {
                for violation in check_etc1s(basic) {
                    self.add(&codes::ETC1S_TEMPLATE, format!("{violation:?}"));
                }
            }
            ColorModel::UASTC => {
                let supercompressed = header.supercompression.is_supercompressed();
                for violation in check_uastc(basic, supercompressed) {
                    self.add(&codes::UASTC_TEMPLATE, format!("{violation:?}"));
                }
            }
            _ => {
                if basic.samples.is_empty() {
                    self.add(
                        &codes::UNDEFINED_FORMAT_SAMPLES,
                        format!(
                            "color model {:?} with no samples",
                            basic.color_model
                        ),
                    );
                }
            }
        }
    }

    fn stage_level_index(
        &mut self,
        header: &Header,
        dfd: Option<&DataFormatDescriptor>,
    ) -> Option<Vec<LevelIndexEntry>> {
        let count = header.level_count_effective();
        let end = Header::LENGTH + count as usize * LevelIndexEntry::LENGTH;
        let Some(bytes) = self.data.get(Header::LENGTH..end) else {
            self.add(
                &codes::UNEXPECTED_EOF,
                format!(
                    "the level index needs {} bytes, the file has {}",
                    end,
                    self.data.len()
                ),
            );
            return None;
        };
        let entries = parse_level_index(bytes, count);

        let plane0 = dfd
            .and_then(|d| d.basic())
            .map(|b| b.bytes_planes[0])
            .unwrap_or(0);
        let block_size = texel_block_size(header.vk_format, plane0);
        let alignment = required_level_alignment(header.supercompression, block_size);
        let scheme = header.supercompression;
        let file_size = self.data.len() as u64;
        let granularity =
            header.face_count.max(1) as u64 * header.layer_count_effective() as u64;

        for (number, entry) in entries.iter().enumerate() {
            let level = number as u32;
            if entry.byte_offset % alignment != 0 {
                self.add(
                    &codes::LEVEL_OFFSET_MISALIGNED,
                    format!(
                        "level {level} starts at {}, alignment requires a multiple of {alignment}",
                        entry.byte_offset
                    ),
                );
            }
            match entry.byte_offset.checked_add(entry.byte_length) {
                Some(end) if end <= file_size => {}
                _ => self.add(
                    &codes::LEVEL_BEYOND_EOF,
                    format!(
                        "level {level} spans {}+{}, past the {file_size}-byte file",
                        entry.byte_offset, entry.byte_length
                    ),
                ),
            }

            match scheme {
                SupercompressionScheme::None => {
                    if let Some(expected) =
                        level_payload_size(header, header.vk_format, level)
                    {
                        if entry.byte_length != expected {
                            self.add(
                                &codes::LEVEL_LENGTH_WRONG,
                                format!(
                                    "level {level} byteLength is {}, computed {expected}",
                                    entry.byte_length
                                ),
                            );
                        }
                    }
                    if entry.uncompressed_byte_length != entry.byte_length {
                        self.add(
                            &codes::LEVEL_UNCOMPRESSED_WRONG,
                            format!(
                                "level {level} uncompressedByteLength is {}, byteLength is {}",
                                entry.uncompressed_byte_length, entry.byte_length
                            ),
                        );
                    }
                }
                SupercompressionScheme::BasisLz => {
                    if entry.uncompressed_byte_length != 0 {
                        self.add(
                            &codes::BASIS_LZ_LENGTH_NOT_ZERO,
                            format!(
                                "level {level} uncompressedByteLength is {}",
                                entry.uncompressed_byte_length
                            ),
                        );
                    }
                }
                _ => {
                    if let Some(expected) = level_payload_size(header, header.vk_format, level) {
                        if entry.uncompressed_byte_length != expected {
                            self.add(
                                &codes::UNCOMPRESSED_NOT_MULTIPLE,
                                format!(
                                    "level {level} uncompressedByteLength is {}, computed {expected}",
                                    entry.uncompressed_byte_length
                                ),
                            );
                        }
                    } else if granularity > 0
                        && entry.uncompressed_byte_length % granularity != 0
                    {
                        self.add(
                            &codes::UNCOMPRESSED_NOT_MULTIPLE,
                            format!(
                                "level {level} uncompressedByteLength {} is not a multiple of {granularity}",
                                entry.uncompressed_byte_length
                            ),
                        );
                    }
                }
            }
        }

        for window in entries.windows(2) {
            let (larger, smaller) = (window[0], window[1]);
            if smaller.byte_offset >= larger.byte_offset {
                self.add(
                    &codes::LEVEL_OUT_OF_ORDER,
                    format!(
                        "byteOffset {} does not decrease after {}",
                        smaller.byte_offset, larger.byte_offset
                    ),
                );
            }
            if smaller.byte_length > larger.byte_length {
                self.add(
                    &codes::LEVEL_OUT_OF_ORDER,
                    format!(
                        "byteLength {} grows after {}",
                        smaller.byte_length, larger.byte_length
                    ),
                );
            }
        }

        if let Some(first) = entries.last() {
            let metadata_end = self.metadata_end(header);
            let expected = align_up(metadata_end, alignment);
            if first.byte_offset != expected {
                self.add(
                    &codes::FIRST_LEVEL_OFFSET_WRONG,
                    format!(
                        "the first payload starts at {}, expected {expected}",
                        first.byte_offset
                    ),
                );
            }
        }

        Some(entries)
    }

    fn metadata_end(&self, header: &Header) -> u64 {
        let mut end = header.past_level_index();
        if header.index.dfd_byte_length > 0 {
            end = end.max(
                header.index.dfd_byte_offset as u64 + header.index.dfd_byte_length as u64,
            );
        }
        if header.index.kvd_byte_length > 0 {
            end = end.max(
                header.index.kvd_byte_offset as u64 + header.index.kvd_byte_length as u64,
            );
        }
        if header.index.sgd_byte_length > 0 {
            end = end.max(header.index.sgd_byte_offset + header.index.sgd_byte_length);
        }
        end
    }

    fn stage_kvd(&mut self, header: &Header, dfd: Option<&DataFormatDescriptor>) -> KvdFacts {
        let mut facts = KvdFacts::default();
        let offset = header.index.kvd_byte_offset as usize;
        let length = header.index.kvd_byte_length as usize;
        if length == 0 {
            return facts;
        }
        let Some(region) = self.data.get(offset..offset + length) else {
            return facts; // bounds already reported by the region-index stage
        };
        let region = region.to_vec();

        let mut previous_key: Option<Vec<u8>> = None;
        let mut seen: Vec<Vec<u8>> = Vec::new();
        for item in RawEntryWalker::new(&region) {
            let entry = match item {
                Ok(entry) => entry,
                Err(WalkError::TooManyEntries) => {
                    self.add(
                        &codes::KV_TOO_MANY,
                        format!("stopped after {} entries", metadata::MAX_ENTRIES),
                    );
                    break;
                }
                Err(err) => {
                    self.add(&codes::KV_ENTRY_MALFORMED, format!("{err:?}"));
                    break;
                }
            };
            let absolute = offset as u64 + entry.offset;

            for (i, &byte) in entry.padding.iter().enumerate() {
                if byte != 0 {
                    self.add(
                        &codes::PADDING_NOT_ZERO,
                        format!(
                            "byte at offset {} is {byte:#04X} in the padding of the \
                             key/value entry at {absolute}",
                            absolute + 4 + entry.declared_length as u64 + i as u64
                        ),
                    );
                }
            }

            if !entry.has_nul {
                self.add(
                    &codes::KV_KEY_MISSING_NUL,
                    format!("entry at offset {absolute}"),
                );
                continue;
            }
            if entry.key_bytes.is_empty() {
                self.add(&codes::KV_KEY_EMPTY, format!("entry at offset {absolute}"));
                continue;
            }
            if entry.key_bytes.starts_with(&BOM) {
                self.add(
                    &codes::KV_KEY_HAS_BOM,
                    format!("entry at offset {absolute}"),
                );
            }
            let Ok(key) = std::str::from_utf8(entry.key_bytes) else {
                self.add(
                    &codes::KV_KEY_NOT_UTF8,
                    format!("entry at offset {absolute}: {:02X?}", entry.key_bytes),
                );
                continue;
            };

            if let Some(previous) = &previous_key {
                if entry.key_bytes < previous.as_slice() {
                    self.add(
                        &codes::KV_OUT_OF_ORDER,
                        format!("key {key:?} sorts before its predecessor"),
                    );
                }
            }
            previous_key = Some(entry.key_bytes.to_vec());

            if seen.iter().any(|k| k == entry.key_bytes) {
                self.add(&codes::KV_DUPLICATE, format!("key {key:?}"));
                continue;
            }
            seen.push(entry.key_bytes.to_vec());

            self.check_known_key(header, dfd, key, entry.value, &mut facts);
        }

        if facts.sc_params && !facts.writer {
            self.add(
                &codes::WRITER_REQUIRED,
                "KTXwriterScParams is present without KTXwriter".to_owned(),
            );
        }
        if let Some(incomplete) = facts.cubemap_incomplete {
            let layers = header.layer_count_effective();
            let faces = incomplete.face_count();
            if faces > 0 && layers % faces != 0 {
                self.add(
                    &codes::CUBEMAP_INCOMPLETE_INVALID,
                    format!("layerCount {layers} is not divisible by the {faces} marked faces"),
                );
            }
            if facts.anim_data {
                self.add(
                    &codes::ANIM_DATA_INCOMPATIBLE,
                    "KTXanimData and KTXcubemapIncomplete are both present".to_owned(),
                );
            }
        }
        facts
    }

    fn check_known_key(
        &mut self,
        header: &Header,
        dfd: Option<&DataFormatDescriptor>,
        key: &str,
        value: &[u8],
        facts: &mut KvdFacts,
    ) {
        let model = dfd.and_then(|d| d.basic()).map(|b| b.color_model);
        match key {
            keys::ORIENTATION => {
                match metadata::parse_orientation(value, header.dimension_count()) {
                    Ok(_) => facts.orientation = Some(value.to_vec()),
                    Err(reason) => self.add(&codes::ORIENTATION_INVALID, reason),
                }
            }
            keys::CUBEMAP_INCOMPLETE => match metadata::parse_cubemap_incomplete(value) {
                Ok(incomplete) => facts.cubemap_incomplete = Some(incomplete),
                Err(reason) => self.add(&codes::CUBEMAP_INCOMPLETE_INVALID, reason),
            },
            keys::SWIZZLE => match metadata::parse_swizzle(value) {
                Ok(_) => facts.swizzle = Some(value.to_vec()),
                Err(reason) => self.add(&codes::SWIZZLE_INVALID, reason),
            },
            keys::WRITER => match metadata::parse_writer(value) {
                Ok(_) => facts.writer = true,
                Err(reason) => self.add(&codes::WRITER_INVALID, reason),
            },
            keys::WRITER_SC_PARAMS => match metadata::parse_writer(value) {
                Ok(_) => facts.sc_params = true,
                Err(reason) => {
                    facts.sc_params = true;
                    self.add(&codes::WRITER_INVALID, format!("KTXwriterScParams: {reason}"));
                }
            },
            keys::GL_FORMAT => {
                if let Err(reason) = metadata::parse_gl_format(value) {
                    self.add(&codes::GL_FORMAT_INVALID, reason);
                } else if header.vk_format != VkFormat::UNDEFINED {
                    self.add(
                        &codes::GL_FORMAT_INVALID,
                        format!("present with vkFormat {}", header.vk_format),
                    );
                } else if header.supercompression == SupercompressionScheme::BasisLz {
                    self.add(
                        &codes::GL_FORMAT_INVALID,
                        "present on a BasisLZ-compressed payload".to_owned(),
                    );
                }
            }
            keys::DXGI_FORMAT => {
                if let Err(reason) = metadata::parse_u32_format(value) {
                    self.add(&codes::DXGI_FORMAT_INVALID, reason);
                } else if header.vk_format != VkFormat::UNDEFINED {
                    self.add(
                        &codes::DXGI_FORMAT_INVALID,
                        format!("present with vkFormat {}", header.vk_format),
                    );
                }
            }
            keys::METAL_PIXEL_FORMAT => {
                if let Err(reason) = metadata::parse_u32_format(value) {
                    self.add(&codes::METAL_FORMAT_INVALID, reason);
                } else if header.vk_format != VkFormat::UNDEFINED {
                    self.add(
                        &codes::METAL_FORMAT_INVALID,
                        format!("present with vkFormat {}", header.vk_format),
                    );
                }
            }
            keys::ASTC_DECODE_MODE => match metadata::parse_astc_decode_mode(value) {
                Ok(mode) => {
                    if model != Some(ColorModel::ASTC) {
                        self.add(
                            &codes::ASTC_DECODE_MODE_INVALID,
                            format!("color model is {model:?}, not ASTC"),
                        );
                    } else if mode == metadata::AstcDecodeMode::Unorm8
                        && header.vk_format != VkFormat::UNDEFINED
                        && !header.vk_format.is_astc_ldr()
                    {
                        self.add(
                            &codes::ASTC_DECODE_MODE_INVALID,
                            format!("unorm8 with the HDR format {}", header.vk_format),
                        );
                    }
                }
                Err(reason) => self.add(&codes::ASTC_DECODE_MODE_INVALID, reason),
            },
            keys::ANIM_DATA => match metadata::parse_anim_data(value) {
                Ok(_) => {
                    facts.anim_data = true;
                    if header.layer_count == 0 {
                        self.add(
                            &codes::ANIM_DATA_INVALID,
                            "present on a non-array texture".to_owned(),
                        );
                    }
                }
                Err(reason) => self.add(&codes::ANIM_DATA_INVALID, reason),
            },
            other if keys::is_reserved(other) => {
                self.add(&codes::KV_UNKNOWN_RESERVED, format!("key {other:?}"));
            }
            other => {
                self.add(&codes::KV_CUSTOM_KEY, format!("key {other:?}"));
            }
        }
    }

    fn stage_sgd(
        &mut self,
        header: &Header,
        dfd: Option<&DataFormatDescriptor>,
        entries: &[LevelIndexEntry],
        facts: &KvdFacts,
    ) {
        let present = header.index.sgd_byte_length > 0;
        match header.supercompression {
            SupercompressionScheme::BasisLz if !present => {
                self.add(
                    &codes::SGD_MISSING,
                    "BasisLZ requires supercompression global data".to_owned(),
                );
                return;
            }
            SupercompressionScheme::None
            | SupercompressionScheme::Zstandard
            | SupercompressionScheme::Zlib
            | SupercompressionScheme::ZlibStream
                if present =>
            {
                self.add(
                    &codes::SGD_UNEXPECTED,
                    format!(
                        "scheme {} with sgdByteLength {}",
                        header.supercompression, header.index.sgd_byte_length
                    ),
                );
                return;
            }
            SupercompressionScheme::BasisLz => {}
            _ => return,
        }

        let offset = header.index.sgd_byte_offset as usize;
        let length = header.index.sgd_byte_length as usize;
        let Some(region) = self.data.get(offset..offset + length) else {
            return; // bounds already reported
        };
        if region.len() < ktx_container::BasisLzGlobalData::HEADER_LENGTH {
            self.add(
                &codes::SGD_TOO_SMALL,
                format!("{} bytes", region.len()),
            );
            return;
        }

        let image_count: u32 = (0..header.level_count_effective())
            .map(|level| header.images_per_level(level))
            .sum();
        let global = match ktx_container::BasisLzGlobalData::parse(region, image_count) {
            Ok(global) => global,
            Err(e) => {
                self.add(&codes::SGD_SIZE_MISMATCH, e.to_string());
                return;
            }
        };

        let has_alpha = dfd
            .and_then(|d| d.basic())
            .map(|b| b.samples.len() == 2)
            .unwrap_or(false);

        // image descriptors are grouped by level, level 0 first
        let mut image = 0usize;
        for level in 0..header.level_count_effective() {
            let level_length = entries
                .get(level as usize)
                .map(|e| e.byte_length)
                .unwrap_or(0);
            for _ in 0..header.images_per_level(level) {
                let Some(desc) = global.image_descs.get(image) else {
                    break;
                };
                if desc.undefined_flag_bits() != 0 {
                    self.add(
                        &codes::IMAGE_FLAGS_INVALID,
                        format!(
                            "image {image} sets flags {:#010X}",
                            desc.image_flags
                        ),
                    );
                }
                if desc.is_p_frame() && !facts.anim_data {
                    self.add(
                        &codes::P_FRAME_NO_ANIM_DATA,
                        format!("image {image} is a P-frame"),
                    );
                }
                if desc.rgb_slice_byte_length == 0 {
                    self.add(
                        &codes::RGB_SLICE_EMPTY,
                        format!("image {image}"),
                    );
                }
                let rgb_end =
                    desc.rgb_slice_byte_offset as u64 + desc.rgb_slice_byte_length as u64;
                if rgb_end > level_length {
                    self.add(
                        &codes::SLICE_OUT_OF_BOUNDS,
                        format!(
                            "image {image} RGB slice ends at {rgb_end}, level {level} is \
                             {level_length} bytes"
                        ),
                    );
                }
                let alpha_end = desc.alpha_slice_byte_offset as u64
                    + desc.alpha_slice_byte_length as u64;
                if desc.alpha_slice_byte_length > 0 && alpha_end > level_length {
                    self.add(
                        &codes::SLICE_OUT_OF_BOUNDS,
                        format!(
                            "image {image} alpha slice ends at {alpha_end}, level {level} is \
                             {level_length} bytes"
                        ),
                    );
                }
                if (desc.alpha_slice_byte_length > 0) != has_alpha {
                    self.add(
                        &codes::ALPHA_SLICE_INCONSISTENT,
                        format!(
                            "image {image} alpha slice is {} but the descriptor declares {} sample(s)",
                            desc.alpha_slice_byte_length,
                            if has_alpha { 2 } else { 1 }
                        ),
                    );
                }
                image += 1;
            }
        }
    }

    fn stage_paddings(&mut self, header: &Header, entries: &[LevelIndexEntry]) {
        let mut regions: Vec<(u64, &str)> = Vec::new();
        if header.index.kvd_byte_length > 0 {
            regions.push((header.index.kvd_byte_offset as u64, "the key/value data"));
        }
        if header.index.sgd_byte_length > 0 {
            regions.push((header.index.sgd_byte_offset, "the supercompression global data"));
        }
        // levels in storage order
        let mut level_starts: Vec<(u64, String)> = entries
            .iter()
            .enumerate()
            .map(|(number, e)| (e.byte_offset, format!("the level {number} payload")))
            .collect();
        level_starts.sort_by_key(|(offset, _)| *offset);

        let mut cursor = header.past_level_index();
        if header.index.dfd_byte_length > 0 {
            cursor = cursor
                .max(header.index.dfd_byte_offset as u64 + header.index.dfd_byte_length as u64);
        }
        for (start, name) in regions
            .into_iter()
            .map(|(o, n)| (o, n.to_owned()))
            .chain(level_starts)
        {
            if start < cursor {
                continue; // overlapping regions already reported
            }
            self.check_zero_gap(cursor, start, &name);
            cursor = start;
            // advance past the region body
            cursor += self.region_length_at(header, entries, start);
        }
    }

    fn region_length_at(
        &self,
        header: &Header,
        entries: &[LevelIndexEntry],
        start: u64,
    ) -> u64 {
        if header.index.kvd_byte_length > 0 && start == header.index.kvd_byte_offset as u64 {
            return header.index.kvd_byte_length as u64;
        }
        if header.index.sgd_byte_length > 0 && start == header.index.sgd_byte_offset {
            return header.index.sgd_byte_length;
        }
        entries
            .iter()
            .find(|e| e.byte_offset == start)
            .map(|e| e.byte_length)
            .unwrap_or(0)
    }

    fn check_zero_gap(&mut self, from: u64, to: u64, before: &str) {
        let Some(gap) = self.data.get(from as usize..to as usize) else {
            return;
        };
        for (i, &byte) in gap.iter().enumerate() {
            if byte != 0 {
                self.add(
                    &codes::PADDING_NOT_ZERO,
                    format!(
                        "byte at offset {} is {byte:#04X} in the padding before {before}",
                        from + i as u64
                    ),
                );
                break; // one report per gap keeps the stream readable
            }
        }
    }

    fn stage_create_and_decode(&mut self, header: &Header) {
        let reader = match TextureReader::new(MemStream::from_slice(self.data)) {
            Ok(reader) => reader,
            Err(e) => {
                self.add(&codes::CREATE_FAILED, e.to_string());
                return;
            }
        };

        if codec_for(header.supercompression).is_some() {
            let mut reader = reader;
            for level in 0..header.level_count_effective() {
                match reader.read_level_decoded(level) {
                    Ok(_) => {}
                    Err(TextureError::DecodedLengthMismatch {
                        level,
                        expected,
                        actual,
                    }) => self.add(
                        &codes::DECODED_LENGTH_MISMATCH,
                        format!("level {level} decoded to {actual} bytes, expected {expected}"),
                    ),
                    Err(TextureError::DecodedChecksumFailed { level }) => self.add(
                        &codes::DECODED_CHECKSUM_WRONG,
                        format!("level {level}"),
                    ),
                    Err(e) => self.add(&codes::DECOMPRESS_FAILED, e.to_string()),
                }
            }
            return;
        }

        if header.supercompression == SupercompressionScheme::BasisLz
            && ktx_container::basis_transcoder().is_some()
        {
            match reader.into_texture(LoadMode::Eager) {
                Ok(mut texture) => {
                    if let Err(e) = texture.transcode(TranscodeTarget::Etc2Rgba) {
                        self.add(&codes::TRANSCODE_FAILED, e.to_string());
                    }
                }
                Err(e) => self.add(&codes::CREATE_FAILED, e.to_string()),
            }
        }
    }
}
