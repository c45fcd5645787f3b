//! Reading KTX2 containers from a stream.
//!
//! [`TextureReader`] parses everything up to the level payloads on
//! construction and leaves the payloads to the caller: read them one at a
//! time ([`TextureReader::read_level`]), drain them in storage order
//! ([`TextureReader::levels`]), or materialize the whole file into a
//! [`Texture`] ([`TextureReader::into_texture`]).
//!
//! Construction is strict: a header that breaks a structural rule is an
//! error here. The validator in `ktx-validate` runs the same stages
//! leniently and reports graded issues instead.

use crate::header::{Header, SupercompressionScheme};
use crate::level::{parse_level_index, LevelIndexEntry};
use crate::metadata::{KeyValueData, MetadataNote};
use crate::stream::{FileStream, KtxStream, MemStream};
use crate::supercompression::codec_for;
use crate::texture::{Level, Texture};
use ktx_core::{FormatClass, TextureError, TextureResult, VkFormat};
use ktx_dfd::DataFormatDescriptor;
use std::path::Path;
use tracing::{debug, warn};

/// Whether level payloads are read during construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadMode {
    /// Read every level payload up front.
    #[default]
    Eager,
    /// Leave payloads on the stream until asked for.
    Deferred,
}

/// A non-fatal oddity observed while decoding.
///
/// The decode API returns a single error for anything unrecoverable;
/// everything the parser worked around is collected here for tools that
/// want the full stream without running the validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadDiagnostic {
    /// A data format descriptor observation.
    Dfd(ktx_dfd::ParseNote),
    /// A key/value data observation.
    Metadata(MetadataNote),
}

/// A parsed container with its stream still attached.
pub struct TextureReader<S: KtxStream> {
    stream: S,
    header: Header,
    level_index: Vec<LevelIndexEntry>,
    dfd: DataFormatDescriptor,
    kv: KeyValueData,
    sgd: Option<Vec<u8>>,
    diagnostics: Vec<ReadDiagnostic>,
}

impl<S: KtxStream> TextureReader<S> {
    /// Parses header, level index, DFD, KVD and SGD from `stream`.
    pub fn new(mut stream: S) -> TextureResult<Self> {
        let file_size = stream.size()?;

        let mut header_bytes = [0u8; Header::LENGTH];
        stream.set_position(0)?;
        stream.read_exact_bytes(&mut header_bytes)?;
        let header = Header::parse(&header_bytes)?;
        check_header(&header)?;

        let level_count = header.level_count_effective();
        let mut index_bytes =
            vec![0u8; level_count as usize * Header::LEVEL_INDEX_ENTRY_LENGTH];
        stream.read_exact_bytes(&mut index_bytes)?;
        let level_index = parse_level_index(&index_bytes, level_count);
        for (number, entry) in level_index.iter().enumerate() {
            let end = entry.byte_offset.checked_add(entry.byte_length);
            match end {
                Some(end) if end <= file_size => {}
                _ => {
                    return Err(TextureError::InvalidLevelIndex(format!(
                        "level {number} spans {}..{:?}, beyond the {file_size}-byte file",
                        entry.byte_offset,
                        entry.byte_offset.checked_add(entry.byte_length),
                    )))
                }
            }
        }

        let mut diagnostics = Vec::new();
        let dfd = read_dfd(&mut stream, &header, file_size, &mut diagnostics)?;
        let kv = read_kvd(&mut stream, &header, file_size, &mut diagnostics)?;
        let sgd = read_sgd(&mut stream, &header, file_size)?;

        debug!(
            format = %header.vk_format,
            levels = level_count,
            scheme = %header.supercompression,
            "parsed container"
        );
        Ok(Self {
            stream,
            header,
            level_index,
            dfd,
            kv,
            sgd,
            diagnostics,
        })
    }

    /// Non-fatal oddities the parser worked around.
    pub fn diagnostics(&self) -> &[ReadDiagnostic] {
        &self.diagnostics
    }

    /// The parsed header.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// The level index in level order (0 = largest).
    pub fn level_index(&self) -> &[LevelIndexEntry] {
        &self.level_index
    }

    /// The parsed data format descriptor.
    pub fn dfd(&self) -> &DataFormatDescriptor {
        &self.dfd
    }

    /// The parsed key/value metadata.
    pub fn key_value_data(&self) -> &KeyValueData {
        &self.kv
    }

    /// The raw supercompression global data, if present.
    pub fn sgd(&self) -> Option<&[u8]> {
        self.sgd.as_deref()
    }

    /// Reads one level's stored payload (still supercompressed when the
    /// scheme says so).
    pub fn read_level(&mut self, level: u32) -> TextureResult<Vec<u8>> {
        let entry = *self
            .level_index
            .get(level as usize)
            .ok_or(TextureError::InvalidOperation("level number out of range"))?;
        let mut data = vec![0u8; entry.byte_length as usize];
        self.stream.set_position(entry.byte_offset)?;
        self.stream.read_exact_bytes(&mut data)?;
        Ok(data)
    }

    /// Reads one level and undoes Zstandard/ZLIB supercompression,
    /// verifying the decoded length against the level index.
    pub fn read_level_decoded(&mut self, level: u32) -> TextureResult<Vec<u8>> {
        let data = self.read_level(level)?;
        let entry = self.level_index[level as usize];
        match codec_for(self.header.supercompression) {
            Some(codec) => codec
                .decode(&data, entry.uncompressed_byte_length)
                .map_err(|e| match e {
                    crate::supercompression::CodecError::LengthMismatch { expected, actual } => {
                        TextureError::DecodedLengthMismatch {
                            level,
                            expected,
                            actual,
                        }
                    }
                    crate::supercompression::CodecError::Checksum => {
                        TextureError::DecodedChecksumFailed { level }
                    }
                    crate::supercompression::CodecError::Backend(message) => {
                        TextureError::Backend(message)
                    }
                }),
            None => Ok(data),
        }
    }

    /// Drains level payloads lazily in storage order: the smallest mip
    /// (highest level number) sits first in the file.
    pub fn levels(&mut self) -> LevelDrain<'_, S> {
        let next = self.level_index.len() as u32;
        LevelDrain { reader: self, next }
    }

    /// Materializes the texture. [`LoadMode::Deferred`] leaves every
    /// level's `data` unset; the index triples are still populated.
    pub fn into_texture(mut self, load: LoadMode) -> TextureResult<Texture> {
        let mut levels = Vec::with_capacity(self.level_index.len());
        for (number, entry) in self.level_index.clone().iter().enumerate() {
            let data = match load {
                LoadMode::Eager => Some(self.read_level(number as u32)?),
                LoadMode::Deferred => None,
            };
            levels.push(Level {
                index: *entry,
                data,
            });
        }
        Ok(Texture {
            vk_format: self.header.vk_format,
            type_size: self.header.type_size,
            pixel_width: self.header.pixel_width,
            pixel_height: self.header.pixel_height,
            pixel_depth: self.header.pixel_depth,
            layer_count: self.header.layer_count,
            face_count: self.header.face_count,
            level_count: self.header.level_count,
            supercompression: self.header.supercompression,
            dfd: self.dfd,
            kv: self.kv,
            sgd: self.sgd,
            levels,
        })
    }
}

/// Iterator handed out by [`TextureReader::levels`].
pub struct LevelDrain<'a, S: KtxStream> {
    reader: &'a mut TextureReader<S>,
    next: u32,
}

impl<S: KtxStream> Iterator for LevelDrain<'_, S> {
    type Item = TextureResult<(u32, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next == 0 {
            return None;
        }
        self.next -= 1;
        let level = self.next;
        Some(self.reader.read_level(level).map(|data| (level, data)))
    }
}

impl Texture {
    /// Reads a texture from a file, loading all level data.
    pub fn from_file<P: AsRef<Path>>(path: P) -> TextureResult<Self> {
        TextureReader::new(FileStream::open(path)?)?.into_texture(LoadMode::Eager)
    }

    /// Reads a texture from a byte buffer, loading all level data.
    pub fn from_bytes(data: &[u8]) -> TextureResult<Self> {
        TextureReader::new(MemStream::from_slice(data))?.into_texture(LoadMode::Eager)
    }

    /// Reads a texture from any stream.
    pub fn from_stream<S: KtxStream>(stream: S, load: LoadMode) -> TextureResult<Self> {
        TextureReader::new(stream)?.into_texture(load)
    }
}

fn check_header(header: &Header) -> TextureResult<()> {
    if header.pixel_width == 0 {
        return Err(TextureError::InvalidHeader {
            field: "pixelWidth",
            reason: "must be non-zero".to_owned(),
        });
    }
    if !matches!(header.face_count, 1 | 6) {
        return Err(TextureError::InvalidHeader {
            field: "faceCount",
            reason: format!("must be 1 or 6, got {}", header.face_count),
        });
    }
    if header.is_cubemap() {
        if header.pixel_width != header.pixel_height {
            return Err(TextureError::InvalidHeader {
                field: "pixelHeight",
                reason: format!(
                    "cube maps must be square, got {}x{}",
                    header.pixel_width, header.pixel_height
                ),
            });
        }
        if header.pixel_depth != 0 {
            return Err(TextureError::InvalidHeader {
                field: "pixelDepth",
                reason: "cube maps must be 2D".to_owned(),
            });
        }
    }
    if header.pixel_depth > 0 && header.pixel_height == 0 {
        return Err(TextureError::InvalidHeader {
            field: "pixelDepth",
            reason: "3D textures require a height".to_owned(),
        });
    }
    if header.level_count > header.max_level_count() {
        return Err(TextureError::InvalidHeader {
            field: "levelCount",
            reason: format!(
                "{} levels, but the base extent supports at most {}",
                header.level_count,
                header.max_level_count()
            ),
        });
    }
    match header.vk_format.classify() {
        FormatClass::Known => {}
        FormatClass::Prohibited => {
            return Err(TextureError::InvalidHeader {
                field: "vkFormat",
                reason: format!("{} is prohibited in KTX2", header.vk_format),
            })
        }
        FormatClass::ReservedExtension => {
            warn!(format = %header.vk_format, "unrecognized extension format");
        }
        FormatClass::Unknown => {
            return Err(TextureError::InvalidHeader {
                field: "vkFormat",
                reason: format!("{} is not a VkFormat", header.vk_format),
            })
        }
    }
    if header.vk_format != VkFormat::UNDEFINED {
        let expected = header.vk_format.type_size();
        if header.type_size != expected {
            return Err(TextureError::InvalidHeader {
                field: "typeSize",
                reason: format!("expected {expected} for {}, got {}", header.vk_format, header.type_size),
            });
        }
    } else if header.type_size != 1 {
        return Err(TextureError::InvalidHeader {
            field: "typeSize",
            reason: format!("must be 1 for VK_FORMAT_UNDEFINED, got {}", header.type_size),
        });
    }
    if matches!(header.supercompression, SupercompressionScheme::Reserved(_)) {
        return Err(TextureError::InvalidHeader {
            field: "supercompressionScheme",
            reason: format!("{} is reserved", header.supercompression),
        });
    }
    Ok(())
}

fn read_dfd<S: KtxStream>(
    stream: &mut S,
    header: &Header,
    file_size: u64,
    diagnostics: &mut Vec<ReadDiagnostic>,
) -> TextureResult<DataFormatDescriptor> {
    let offset = header.index.dfd_byte_offset as u64;
    let length = header.index.dfd_byte_length as u64;
    if length == 0 {
        return Err(TextureError::InvalidDfd(
            "container has no data format descriptor".to_owned(),
        ));
    }
    if offset + length > file_size {
        return Err(TextureError::InvalidDfd(format!(
            "region {offset}..{} is beyond the {file_size}-byte file",
            offset + length
        )));
    }
    let mut region = vec![0u8; length as usize];
    stream.set_position(offset)?;
    stream.read_exact_bytes(&mut region)?;
    let (dfd, notes) = DataFormatDescriptor::parse(&region)?;
    for note in notes {
        warn!(?note, "data format descriptor oddity");
        diagnostics.push(ReadDiagnostic::Dfd(note));
    }
    Ok(dfd)
}

fn read_kvd<S: KtxStream>(
    stream: &mut S,
    header: &Header,
    file_size: u64,
    diagnostics: &mut Vec<ReadDiagnostic>,
) -> TextureResult<KeyValueData> {
    let offset = header.index.kvd_byte_offset as u64;
    let length = header.index.kvd_byte_length as u64;
    if length == 0 {
        return Ok(KeyValueData::new());
    }
    if offset + length > file_size {
        return Err(TextureError::InvalidMetadata(format!(
            "region {offset}..{} is beyond the {file_size}-byte file",
            offset + length
        )));
    }
    let mut region = vec![0u8; length as usize];
    stream.set_position(offset)?;
    stream.read_exact_bytes(&mut region)?;
    let (kv, notes) = KeyValueData::from_bytes(&region);
    for note in notes {
        warn!(?note, "key/value data oddity");
        diagnostics.push(ReadDiagnostic::Metadata(note));
    }
    Ok(kv)
}

fn read_sgd<S: KtxStream>(
    stream: &mut S,
    header: &Header,
    file_size: u64,
) -> TextureResult<Option<Vec<u8>>> {
    let offset = header.index.sgd_byte_offset;
    let length = header.index.sgd_byte_length;
    if length == 0 {
        return Ok(None);
    }
    let end = offset.checked_add(length).filter(|&end| end <= file_size);
    if end.is_none() {
        return Err(TextureError::InvalidSgd(format!(
            "region {offset}..{:?} is beyond the {file_size}-byte file",
            offset.checked_add(length)
        )));
    }
    let mut region = vec![0u8; length as usize];
    stream.set_position(offset)?;
    stream.read_exact_bytes(&mut region)?;
    Ok(Some(region))
}
