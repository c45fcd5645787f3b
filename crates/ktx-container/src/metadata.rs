//! Key/value metadata: the generic store, the raw wire walk, and typed
//! parsers for the reserved `KTX*` keys.
//!
//! On the wire each entry is `u32 keyAndValueByteLength`, a UTF-8 key, a
//! NUL, the value bytes, and 0-3 zero bytes padding the entry to four.
//! Keys must be unique and sorted by byte value.
//!
//! Two access layers:
//! - [`RawEntryWalker`]: a faithful byte-level walk that surfaces every
//!   wire defect (for the validator)
//! - [`KeyValueData`]: an ordered store that survives malformed input by
//!   skipping bad entries (for the reader)

use byteorder::{ByteOrder, LittleEndian};
use std::collections::BTreeMap;
use tracing::warn;

/// Walk cap: entries examined before the walker gives up.
pub const MAX_ENTRIES: usize = 100;

/// UTF-8 byte order mark, banned from keys.
pub const BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// One entry as it sits on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEntry<'a> {
    /// Offset of the entry's length word from the start of the region.
    pub offset: u64,
    /// The `keyAndValueByteLength` field.
    pub declared_length: u32,
    /// Key bytes, excluding the NUL terminator.
    pub key_bytes: &'a [u8],
    /// False when no NUL was found inside the entry.
    pub has_nul: bool,
    /// Value bytes following the key's NUL.
    pub value: &'a [u8],
    /// The 0-3 padding bytes after the value.
    pub padding: &'a [u8],
}

/// A wire defect that stops the walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkError {
    /// Fewer than four bytes remained where a length word was expected.
    TruncatedLength {
        /// Offset of the dangling bytes.
        offset: u64,
        /// How many bytes remained.
        remaining: u64,
    },
    /// An entry declared length zero.
    ZeroLength {
        /// Offset of the entry.
        offset: u64,
    },
    /// An entry's declared length runs past the end of the region.
    EntryTooLarge {
        /// Offset of the entry.
        offset: u64,
        /// Declared length.
        declared: u32,
        /// Bytes actually remaining.
        remaining: u64,
    },
    /// More than [`MAX_ENTRIES`] entries; the rest were not examined.
    TooManyEntries,
}

/// Iterator over the raw entries of a KVD region.
///
/// Yields `Ok` entries until the region is exhausted or a [`WalkError`]
/// ends the walk; the error is yielded once, then the iterator fuses.
pub struct RawEntryWalker<'a> {
    data: &'a [u8],
    offset: usize,
    yielded: usize,
    done: bool,
}

impl<'a> RawEntryWalker<'a> {
    /// Walks `region`, the exact KVD byte range from the file.
    pub fn new(region: &'a [u8]) -> Self {
        Self {
            data: region,
            offset: 0,
            yielded: 0,
            done: false,
        }
    }
}

impl<'a> Iterator for RawEntryWalker<'a> {
    type Item = Result<RawEntry<'a>, WalkError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let remaining = self.data.len() - self.offset;
        if remaining == 0 {
            self.done = true;
            return None;
        }
        if remaining < 4 {
            self.done = true;
            return Some(Err(WalkError::TruncatedLength {
                offset: self.offset as u64,
                remaining: remaining as u64,
            }));
        }
        if self.yielded == MAX_ENTRIES {
            self.done = true;
            return Some(Err(WalkError::TooManyEntries));
        }

        let entry_offset = self.offset;
        let declared = LittleEndian::read_u32(&self.data[entry_offset..entry_offset + 4]);
        if declared == 0 {
            self.done = true;
            return Some(Err(WalkError::ZeroLength {
                offset: entry_offset as u64,
            }));
        }
        let body_start = entry_offset + 4;
        let body_remaining = self.data.len() - body_start;
        if declared as usize > body_remaining {
            self.done = true;
            return Some(Err(WalkError::EntryTooLarge {
                offset: entry_offset as u64,
                declared,
                remaining: body_remaining as u64,
            }));
        }

        let body = &self.data[body_start..body_start + declared as usize];
        let (key_bytes, has_nul, value) = match body.iter().position(|&b| b == 0) {
            Some(nul) => (&body[..nul], true, &body[nul + 1..]),
            None => (body, false, &body[body.len()..]),
        };

        let body_end = body_start + declared as usize;
        let padded_end = body_end
            .checked_add(3)
            .map(|v| (v / 4) * 4)
            .unwrap_or(body_end)
            .min(self.data.len());
        let padding = &self.data[body_end..padded_end];

        self.offset = padded_end;
        self.yielded += 1;
        Some(Ok(RawEntry {
            offset: entry_offset as u64,
            declared_length: declared,
            key_bytes,
            has_nul,
            value,
            padding,
        }))
    }
}

/// Lenient-parse observations, logged by the reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataNote {
    /// The walk stopped early.
    Walk(WalkError),
    /// An entry had no NUL between key and value; skipped.
    MissingNul {
        /// Offset of the entry.
        offset: u64,
    },
    /// A key was not valid UTF-8; skipped.
    InvalidUtf8 {
        /// Offset of the entry.
        offset: u64,
    },
    /// A key appeared more than once; the first occurrence wins.
    Duplicate {
        /// The repeated key.
        key: String,
    },
}

/// Ordered key/value store with canonical byte-wise key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyValueData {
    entries: BTreeMap<String, Vec<u8>>,
}

impl KeyValueData {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entries are present.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts or replaces an entry.
    pub fn set(&mut self, key: impl Into<String>, value: Vec<u8>) {
        self.entries.insert(key.into(), value);
    }

    /// Looks up a value.
    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    /// Removes an entry, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<Vec<u8>> {
        self.entries.remove(key)
    }

    /// Iterates entries in canonical (byte-sorted) key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Parses a KVD region, skipping malformed entries.
    pub fn from_bytes(region: &[u8]) -> (Self, Vec<MetadataNote>) {
        let mut kv = Self::new();
        let mut notes = Vec::new();
        for item in RawEntryWalker::new(region) {
            match item {
                Ok(entry) => {
                    if !entry.has_nul {
                        notes.push(MetadataNote::MissingNul {
                            offset: entry.offset,
                        });
                        continue;
                    }
                    let key = match std::str::from_utf8(entry.key_bytes) {
                        Ok(key) => key,
                        Err(_) => {
                            notes.push(MetadataNote::InvalidUtf8 {
                                offset: entry.offset,
                            });
                            continue;
                        }
                    };
                    if kv.entries.contains_key(key) {
                        notes.push(MetadataNote::Duplicate {
                            key: key.to_owned(),
                        });
                        continue;
                    }
                    kv.entries.insert(key.to_owned(), entry.value.to_vec());
                }
                Err(err) => {
                    warn!(?err, "key/value walk ended early");
                    notes.push(MetadataNote::Walk(err));
                    break;
                }
            }
        }
        (kv, notes)
    }

    /// Serializes in canonical order, every entry padded to four bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for (key, value) in &self.entries {
            let length = (key.len() + 1 + value.len()) as u32;
            out.extend_from_slice(&length.to_le_bytes());
            out.extend_from_slice(key.as_bytes());
            out.push(0);
            out.extend_from_slice(value);
            while out.len() % 4 != 0 {
                out.push(0);
            }
        }
        out
    }
}

/// Reserved key names and their typed parsers.
pub mod keys {
    /// Logical orientation of the image axes.
    pub const ORIENTATION: &str = "KTXorientation";
    /// Cube maps stored with fewer than six faces.
    pub const CUBEMAP_INCOMPLETE: &str = "KTXcubemapIncomplete";
    /// Channel swizzle to apply at sampling time.
    pub const SWIZZLE: &str = "KTXswizzle";
    /// Name/version of the tool that wrote the file.
    pub const WRITER: &str = "KTXwriter";
    /// Supercompression parameters the writer used.
    pub const WRITER_SC_PARAMS: &str = "KTXwriterScParams";
    /// OpenGL upload hints for undefined-format payloads.
    pub const GL_FORMAT: &str = "KTXglFormat";
    /// DXGI format hint for undefined-format payloads.
    pub const DXGI_FORMAT: &str = "KTXdxgiFormat__";
    /// Metal pixel format hint for undefined-format payloads.
    pub const METAL_PIXEL_FORMAT: &str = "KTXmetalPixelFormat";
    /// Requested ASTC decode precision.
    pub const ASTC_DECODE_MODE: &str = "KTXastcDecodeMode";
    /// Animation timing for array textures used as frame sequences.
    pub const ANIM_DATA: &str = "KTXanimData";

    /// All keys with typed schemas, in canonical order.
    pub const KNOWN: &[&str] = &[
        ANIM_DATA,
        ASTC_DECODE_MODE,
        CUBEMAP_INCOMPLETE,
        DXGI_FORMAT,
        GL_FORMAT,
        METAL_PIXEL_FORMAT,
        ORIENTATION,
        SWIZZLE,
        WRITER,
        WRITER_SC_PARAMS,
    ];

    /// True when the key sits in the reserved namespace.
    pub fn is_reserved(key: &str) -> bool {
        key.starts_with("KTX") || key.starts_with("ktx")
    }

    /// True when the key has a typed schema.
    pub fn is_known(key: &str) -> bool {
        KNOWN.contains(&key)
    }
}

/// Direction of one image axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisOrientation {
    /// +X right.
    Right,
    /// +X left.
    Left,
    /// +Y down.
    Down,
    /// +Y up.
    Up,
    /// +Z out of the screen.
    Out,
    /// +Z into the screen.
    In,
}

/// Parsed `KTXorientation` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Orientation {
    /// One entry per dimension of the texture.
    pub axes: Vec<AxisOrientation>,
}

/// Parses `KTXorientation` for a texture of `dimension_count` dimensions.
///
/// The value is the orientation characters, optionally NUL-terminated.
pub fn parse_orientation(value: &[u8], dimension_count: u32) -> Result<Orientation, String> {
    let value = value.strip_suffix(&[0]).unwrap_or(value);
    let text = std::str::from_utf8(value).map_err(|_| "value is not UTF-8".to_owned())?;
    if text.len() != dimension_count as usize {
        return Err(format!(
            "length {} does not match dimensionality {}",
            text.len(),
            dimension_count
        ));
    }
    let mut axes = Vec::with_capacity(text.len());
    for (index, ch) in text.chars().enumerate() {
        let axis = match (index, ch) {
            (0, 'r') => AxisOrientation::Right,
            (0, 'l') => AxisOrientation::Left,
            (1, 'd') => AxisOrientation::Down,
            (1, 'u') => AxisOrientation::Up,
            (2, 'o') => AxisOrientation::Out,
            (2, 'i') => AxisOrientation::In,
            _ => {
                return Err(format!(
                    "character {ch:?} is not valid for axis {index}"
                ))
            }
        };
        axes.push(axis);
    }
    Ok(Orientation { axes })
}

/// Parsed `KTXcubemapIncomplete` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CubemapIncomplete {
    /// Low six bits mark which of the +X,-X,+Y,-Y,+Z,-Z faces are present.
    pub faces: u8,
}

impl CubemapIncomplete {
    /// Number of faces present.
    pub fn face_count(self) -> u32 {
        (self.faces & 0x3F).count_ones()
    }
}

/// Parses `KTXcubemapIncomplete`.
pub fn parse_cubemap_incomplete(value: &[u8]) -> Result<CubemapIncomplete, String> {
    if value.len() != 1 {
        return Err(format!("value is {} bytes, expected 1", value.len()));
    }
    let faces = value[0];
    if faces & !0x3F != 0 {
        return Err(format!("bits above the low six are set: {faces:#04x}"));
    }
    if faces & 0x3F == 0 {
        return Err("no faces marked present".to_owned());
    }
    Ok(CubemapIncomplete { faces })
}

/// Parses `KTXswizzle`: exactly four of `rgba01` plus a NUL.
pub fn parse_swizzle(value: &[u8]) -> Result<[u8; 4], String> {
    if value.len() != 5 || value[4] != 0 {
        return Err(format!(
            "value must be 5 bytes ending in NUL, got {} bytes",
            value.len()
        ));
    }
    let mut out = [0u8; 4];
    for (i, &b) in value[..4].iter().enumerate() {
        if !matches!(b, b'r' | b'g' | b'b' | b'a' | b'0' | b'1') {
            return Err(format!("byte {i} is {b:#04x}, not one of rgba01"));
        }
        out[i] = b;
    }
    Ok(out)
}

/// Parses `KTXwriter` / `KTXwriterScParams`: NUL-terminated UTF-8.
pub fn parse_writer(value: &[u8]) -> Result<&str, String> {
    let stripped = value
        .strip_suffix(&[0])
        .ok_or_else(|| "value is not NUL-terminated".to_owned())?;
    std::str::from_utf8(stripped).map_err(|_| "value is not UTF-8".to_owned())
}

/// Parsed `KTXglFormat` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlFormatInfo {
    /// `glInternalformat`.
    pub internal_format: u32,
    /// `glFormat`; zero for compressed uploads.
    pub format: u32,
    /// `glType`; zero for compressed uploads.
    pub type_: u32,
}

/// Parses `KTXglFormat`: three little-endian `u32`s.
pub fn parse_gl_format(value: &[u8]) -> Result<GlFormatInfo, String> {
    if value.len() != 12 {
        return Err(format!("value is {} bytes, expected 12", value.len()));
    }
    Ok(GlFormatInfo {
        internal_format: LittleEndian::read_u32(&value[0..4]),
        format: LittleEndian::read_u32(&value[4..8]),
        type_: LittleEndian::read_u32(&value[8..12]),
    })
}

/// Parses the 4-byte `KTXdxgiFormat__` / `KTXmetalPixelFormat` values.
pub fn parse_u32_format(value: &[u8]) -> Result<u32, String> {
    if value.len() != 4 {
        return Err(format!("value is {} bytes, expected 4", value.len()));
    }
    Ok(LittleEndian::read_u32(value))
}

/// Requested ASTC decode precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AstcDecodeMode {
    /// Decode to RGB9E5 shared exponent.
    Rgb9e5,
    /// Decode to 8-bit UNORM; LDR profiles only.
    Unorm8,
}

/// Parses `KTXastcDecodeMode`.
pub fn parse_astc_decode_mode(value: &[u8]) -> Result<AstcDecodeMode, String> {
    let text = parse_writer(value)?;
    match text {
        "rgb9e5" => Ok(AstcDecodeMode::Rgb9e5),
        "unorm8" => Ok(AstcDecodeMode::Unorm8),
        other => Err(format!("unknown decode mode {other:?}")),
    }
}

/// Parsed `KTXanimData` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimData {
    /// Frame duration numerator.
    pub duration: u32,
    /// Timescale in units per second.
    pub timescale: u32,
    /// Loop count; zero loops forever.
    pub loop_count: u32,
}

/// Parses `KTXanimData`: three little-endian `u32`s.
pub fn parse_anim_data(value: &[u8]) -> Result<AnimData, String> {
    if value.len() != 12 {
        return Err(format!("value is {} bytes, expected 12", value.len()));
    }
    Ok(AnimData {
        duration: LittleEndian::read_u32(&value[0..4]),
        timescale: LittleEndian::read_u32(&value[4..8]),
        loop_count: LittleEndian::read_u32(&value[8..12]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_bytes(key: &str, value: &[u8]) -> Vec<u8> {
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

    #[test]
    fn store_round_trip_is_sorted() {
        let mut kv = KeyValueData::new();
        kv.set("zebra", b"z".to_vec());
        kv.set("KTXwriter", b"test 1.0\0".to_vec());
        kv.set("alpha", b"a".to_vec());

        let bytes = kv.to_bytes();
        assert_eq!(bytes.len() % 4, 0);
        let (parsed, notes) = KeyValueData::from_bytes(&bytes);
        assert!(notes.is_empty());
        assert_eq!(parsed, kv);

        let order: Vec<&str> = parsed.iter().map(|(k, _)| k).collect();
        assert_eq!(order, vec!["KTXwriter", "alpha", "zebra"]);
    }

    #[test]
    fn walker_reports_offsets_and_padding() {
        let mut region = entry_bytes("ab", b"xyz");
        region.extend_from_slice(&entry_bytes("cd", b"1"));
        let entries: Vec<_> = RawEntryWalker::new(&region)
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].offset, 0);
        assert_eq!(entries[0].key_bytes, b"ab");
        assert_eq!(entries[0].value, b"xyz");
        assert_eq!(entries[0].padding.len(), 2);
        assert_eq!(entries[1].offset, 12);
    }

    #[test]
    fn walker_flags_oversized_entry() {
        let mut region = Vec::new();
        region.extend_from_slice(&100u32.to_le_bytes());
        region.extend_from_slice(b"k\0v");
        let result: Vec<_> = RawEntryWalker::new(&region).collect();
        assert_eq!(result.len(), 1);
        assert!(matches!(
            result[0],
            Err(WalkError::EntryTooLarge {
                offset: 0,
                declared: 100,
                ..
            })
        ));
    }

    #[test]
    fn walker_flags_dangling_bytes() {
        let mut region = entry_bytes("k", b"v");
        region.extend_from_slice(&[1, 2]);
        let result: Vec<_> = RawEntryWalker::new(&region).collect();
        assert!(matches!(
            result.last().unwrap(),
            Err(WalkError::TruncatedLength { remaining: 2, .. })
        ));
    }

    #[test]
    fn lenient_parse_skips_bad_entries_and_keeps_first_duplicate() {
        let mut region = entry_bytes("dup", b"first");
        // entry with no NUL
        region.extend_from_slice(&4u32.to_le_bytes());
        region.extend_from_slice(b"nonl");
        region.extend_from_slice(&entry_bytes("dup", b"second"));
        let (kv, notes) = KeyValueData::from_bytes(&region);
        assert_eq!(kv.get("dup"), Some(&b"first"[..]));
        assert!(notes.iter().any(|n| matches!(n, MetadataNote::MissingNul { .. })));
        assert!(notes
            .iter()
            .any(|n| matches!(n, MetadataNote::Duplicate { key } if key == "dup")));
    }

    #[test]
    fn orientation_parsing() {
        let o = parse_orientation(b"rd", 2).unwrap();
        assert_eq!(
            o.axes,
            vec![AxisOrientation::Right, AxisOrientation::Down]
        );
        // trailing NUL tolerated
        assert!(parse_orientation(b"rdi\0", 3).is_ok());
        assert!(parse_orientation(b"rd", 3).is_err());
        assert!(parse_orientation(b"xd", 2).is_err());
        assert!(parse_orientation(b"ru", 2).is_ok());
    }

    #[test]
    fn swizzle_parsing() {
        assert_eq!(parse_swizzle(b"rgba\0").unwrap(), *b"rgba");
        assert_eq!(parse_swizzle(b"bgr1\0").unwrap(), *b"bgr1");
        assert!(parse_swizzle(b"rgba").is_err());
        assert!(parse_swizzle(b"rgbx\0").is_err());
    }

    #[test]
    fn cubemap_incomplete_parsing() {
        assert_eq!(parse_cubemap_incomplete(&[0b11_1111]).unwrap().face_count(), 6);
        assert_eq!(parse_cubemap_incomplete(&[0b00_0101]).unwrap().face_count(), 2);
        assert!(parse_cubemap_incomplete(&[0]).is_err());
        assert!(parse_cubemap_incomplete(&[0x40]).is_err());
        assert!(parse_cubemap_incomplete(&[1, 2]).is_err());
    }

    #[test]
    fn writer_and_astc_mode_parsing() {
        assert_eq!(parse_writer(b"toolkit 2.1\0").unwrap(), "toolkit 2.1");
        assert!(parse_writer(b"no terminator").is_err());
        assert_eq!(
            parse_astc_decode_mode(b"rgb9e5\0").unwrap(),
            AstcDecodeMode::Rgb9e5
        );
        assert_eq!(
            parse_astc_decode_mode(b"unorm8\0").unwrap(),
            AstcDecodeMode::Unorm8
        );
        assert!(parse_astc_decode_mode(b"float16\0").is_err());
    }

    #[test]
    fn binary_value_parsing() {
        let mut gl = Vec::new();
        gl.extend_from_slice(&0x8058u32.to_le_bytes()); // GL_RGBA8
        gl.extend_from_slice(&0x1908u32.to_le_bytes()); // GL_RGBA
        gl.extend_from_slice(&0x1401u32.to_le_bytes()); // GL_UNSIGNED_BYTE
        let info = parse_gl_format(&gl).unwrap();
        assert_eq!(info.internal_format, 0x8058);

        assert_eq!(parse_u32_format(&28u32.to_le_bytes()).unwrap(), 28);
        assert!(parse_u32_format(&[1, 2]).is_err());

        let anim = parse_anim_data(&{
            let mut v = Vec::new();
            v.extend_from_slice(&1u32.to_le_bytes());
            v.extend_from_slice(&30u32.to_le_bytes());
            v.extend_from_slice(&0u32.to_le_bytes());
            v
        })
        .unwrap();
        assert_eq!(anim.timescale, 30);
    }

    #[test]
    fn reserved_key_classification() {
        assert!(keys::is_reserved("KTXorientation"));
        assert!(keys::is_reserved("ktxVendorThing"));
        assert!(!keys::is_reserved("MyTool.settings"));
        assert!(keys::is_known("KTXswizzle"));
        assert!(!keys::is_known("KTXmadeUp"));
    }
}
