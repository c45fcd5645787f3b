//! Writing a [`Texture`] back to the wire.
//!
//! The writer owns all layout decisions: region offsets that satisfy the
//! format's alignment rules, level payloads emitted smallest mip first,
//! and zero bytes in every padding. Reading back what was written yields
//! the same texture, with metadata keys in canonical order.

use crate::header::{Header, SectionIndex, SupercompressionScheme};
use crate::level::{required_level_alignment, LevelIndexEntry};
use crate::stream::{KtxStream, MemStream};
use crate::texture::Texture;
use ktx_core::align::align_up;
use ktx_core::{TextureError, TextureResult};
use tracing::debug;

/// Computed layout of an outgoing file.
struct Layout {
    index: SectionIndex,
    level_entries: Vec<LevelIndexEntry>,
    total_size: u64,
}

impl Texture {
    fn compute_layout(&self, dfd_bytes: &[u8], kvd_bytes: &[u8]) -> TextureResult<Layout> {
        let level_count = self.level_count_effective() as usize;
        if self.levels.len() != level_count {
            return Err(TextureError::InvalidOperation(
                "level array length disagrees with the header level count",
            ));
        }

        let mut cursor = Header::LENGTH as u64
            + level_count as u64 * Header::LEVEL_INDEX_ENTRY_LENGTH as u64;

        let dfd_byte_offset = cursor as u32;
        let dfd_byte_length = dfd_bytes.len() as u32;
        cursor += dfd_bytes.len() as u64;

        let (kvd_byte_offset, kvd_byte_length) = if kvd_bytes.is_empty() {
            (0, 0)
        } else {
            cursor = align_up(cursor, 4);
            let offset = cursor as u32;
            cursor += kvd_bytes.len() as u64;
            (offset, kvd_bytes.len() as u32)
        };

        let (sgd_byte_offset, sgd_byte_length) = match &self.sgd {
            Some(sgd) if !sgd.is_empty() => {
                cursor = align_up(cursor, 8);
                let offset = cursor;
                cursor += sgd.len() as u64;
                (offset, sgd.len() as u64)
            }
            _ => (0, 0),
        };

        let alignment =
            required_level_alignment(self.supercompression, self.texel_block_size());
        let mut level_entries = vec![LevelIndexEntry::default(); level_count];
        // smallest mip first on the wire
        for number in (0..level_count).rev() {
            let level = &self.levels[number];
            let data = level.data.as_ref().ok_or(TextureError::InvalidOperation(
                "cannot write a texture with unloaded level data",
            ))?;
            cursor = align_up(cursor, alignment);
            let uncompressed = if self.supercompression == SupercompressionScheme::None {
                data.len() as u64
            } else {
                level.index.uncompressed_byte_length
            };
            level_entries[number] = LevelIndexEntry {
                byte_offset: cursor,
                byte_length: data.len() as u64,
                uncompressed_byte_length: uncompressed,
            };
            cursor += data.len() as u64;
        }

        Ok(Layout {
            index: SectionIndex {
                dfd_byte_offset,
                dfd_byte_length,
                kvd_byte_offset,
                kvd_byte_length,
                sgd_byte_offset,
                sgd_byte_length,
            },
            level_entries,
            total_size: cursor,
        })
    }

    /// Writes the container to `stream`.
    ///
    /// Every level must have its data loaded; deferred textures need their
    /// payloads read back first.
    pub fn write_to<S: KtxStream>(&self, stream: &mut S) -> TextureResult<()> {
        let dfd_bytes = self.dfd.to_bytes();
        let kvd_bytes = self.kv.to_bytes();
        let layout = self.compute_layout(&dfd_bytes, &kvd_bytes)?;

        let mut header = self.header();
        header.index = layout.index;
        stream.write_all_bytes(&header.to_bytes())?;
        for entry in &layout.level_entries {
            stream.write_all_bytes(&entry.to_bytes())?;
        }
        stream.write_all_bytes(&dfd_bytes)?;

        let mut position = Header::LENGTH as u64
            + layout.level_entries.len() as u64 * Header::LEVEL_INDEX_ENTRY_LENGTH as u64
            + dfd_bytes.len() as u64;

        if !kvd_bytes.is_empty() {
            position = pad_to(stream, position, layout.index.kvd_byte_offset as u64)?;
            stream.write_all_bytes(&kvd_bytes)?;
            position += kvd_bytes.len() as u64;
        }
        if let Some(sgd) = self.sgd.as_ref().filter(|sgd| !sgd.is_empty()) {
            position = pad_to(stream, position, layout.index.sgd_byte_offset)?;
            stream.write_all_bytes(sgd)?;
            position += sgd.len() as u64;
        }

        for number in (0..layout.level_entries.len()).rev() {
            let entry = &layout.level_entries[number];
            position = pad_to(stream, position, entry.byte_offset)?;
            let data = self.levels[number]
                .data
                .as_ref()
                .expect("checked in compute_layout");
            stream.write_all_bytes(data)?;
            position += data.len() as u64;
        }

        debug_assert_eq!(position, layout.total_size);
        debug!(bytes = layout.total_size, "wrote container");
        Ok(())
    }

    /// Serializes the container into a byte vector.
    pub fn to_bytes(&self) -> TextureResult<Vec<u8>> {
        let mut stream = MemStream::new();
        self.write_to(&mut stream)?;
        Ok(stream.into_inner())
    }
}

fn pad_to<S: KtxStream>(stream: &mut S, position: u64, target: u64) -> TextureResult<u64> {
    debug_assert!(target >= position);
    let padding = (target - position) as usize;
    if padding > 0 {
        stream.write_all_bytes(&vec![0u8; padding])?;
    }
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::KTX2_IDENTIFIER;
    use crate::metadata::keys;
    use crate::reader::{LoadMode, TextureReader};
    use crate::stream::FileStream;
    use ktx_core::VkFormat;

    fn rgba8_1x1() -> Texture {
        let mut texture = Texture::new(VkFormat::R8G8B8A8_UNORM, 1, 1, 0, 0, 1, 1).unwrap();
        texture.levels[0].data = Some(vec![1, 2, 3, 4]);
        texture.levels[0].index.byte_length = 4;
        texture.levels[0].index.uncompressed_byte_length = 4;
        texture
    }

    #[test]
    fn minimal_file_layout() {
        let texture = rgba8_1x1();
        let bytes = texture.to_bytes().unwrap();

        assert_eq!(&bytes[0..12], &KTX2_IDENTIFIER);
        // header + one index entry, then the DFD (RGBA8: 4 + 24 + 4*16)
        let header_bytes: &[u8; Header::LENGTH] = bytes[..80].try_into().unwrap();
        let header = Header::parse(header_bytes).unwrap();
        assert_eq!(header.index.dfd_byte_offset, 104);
        assert_eq!(header.index.dfd_byte_length, 92);
        // no metadata, no sgd
        assert_eq!(header.index.kvd_byte_offset, 0);
        assert_eq!(header.index.sgd_byte_length, 0);
        // payload starts right after, already 4-aligned
        assert_eq!(bytes.len(), 196 + 4);
        assert_eq!(&bytes[196..], &[1, 2, 3, 4]);
    }

    #[test]
    fn round_trip_preserves_texture() {
        let mut texture = rgba8_1x1();
        texture.kv.set(keys::WRITER, b"ktx-container tests\0".to_vec());
        texture.kv.set(keys::ORIENTATION, b"rd".to_vec());

        let bytes = texture.to_bytes().unwrap();
        let reread = Texture::from_bytes(&bytes).unwrap();

        assert_eq!(reread.vk_format, texture.vk_format);
        assert_eq!(reread.dfd, texture.dfd);
        assert_eq!(reread.kv, texture.kv);
        assert_eq!(reread.level_data(0), texture.level_data(0));

        // byte-identical on a second pass: the writer is canonical
        let again = reread.to_bytes().unwrap();
        assert_eq!(again, bytes);
    }

    #[test]
    fn mip_levels_are_stored_smallest_first() {
        let mut texture = Texture::new(VkFormat::R8G8B8A8_UNORM, 4, 4, 0, 0, 1, 3).unwrap();
        for (number, size) in [(0u32, 64usize), (1, 16), (2, 4)] {
            texture.levels[number as usize].data = Some(vec![number as u8; size]);
        }
        let bytes = texture.to_bytes().unwrap();
        let header_bytes: &[u8; Header::LENGTH] = bytes[..80].try_into().unwrap();
        let header = Header::parse(header_bytes).unwrap();
        assert_eq!(header.level_count, 3);

        let reader = TextureReader::new(MemStream::from_slice(&bytes)).unwrap();
        let index = reader.level_index();
        // offsets decrease with level number, lengths never increase
        assert!(index[0].byte_offset > index[1].byte_offset);
        assert!(index[1].byte_offset > index[2].byte_offset);
        assert!(index[0].byte_length >= index[1].byte_length);
        // every offset is aligned for a 4-byte texel block
        for entry in index {
            assert_eq!(entry.byte_offset % 4, 0);
        }
    }

    #[test]
    fn kvd_region_is_aligned_and_padded() {
        let mut texture = rgba8_1x1();
        texture.kv.set("a", b"x".to_vec()); // 4 + 2 + 1 = 7 bytes, pads to 8
        let bytes = texture.to_bytes().unwrap();
        let header_bytes: &[u8; Header::LENGTH] = bytes[..80].try_into().unwrap();
        let header = Header::parse(header_bytes).unwrap();
        assert_eq!(header.index.kvd_byte_offset % 4, 0);
        assert_eq!(header.index.kvd_byte_length % 4, 0);
    }

    #[test]
    fn deferred_texture_refuses_to_write() {
        let mut texture = rgba8_1x1();
        texture.levels[0].data = None;
        assert!(matches!(
            texture.to_bytes().unwrap_err(),
            TextureError::InvalidOperation(_)
        ));
    }

    #[test]
    fn file_stream_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.ktx2");
        let texture = rgba8_1x1();
        {
            let mut stream = FileStream::create(&path).unwrap();
            texture.write_to(&mut stream).unwrap();
        }
        let reread = Texture::from_file(&path).unwrap();
        assert_eq!(reread.level_data(0), Some(&[1, 2, 3, 4][..]));
    }

    #[test]
    fn deferred_read_leaves_payloads_unloaded() {
        let texture = rgba8_1x1();
        let bytes = texture.to_bytes().unwrap();
        let reader = TextureReader::new(MemStream::from_slice(&bytes)).unwrap();
        let deferred = reader.into_texture(LoadMode::Deferred).unwrap();
        assert!(deferred.level_data(0).is_none());
        assert_eq!(deferred.levels[0].index.byte_length, 4);
    }

    #[test]
    fn level_drain_yields_storage_order() {
        let mut texture = Texture::new(VkFormat::R8G8B8A8_UNORM, 2, 2, 0, 0, 1, 2).unwrap();
        texture.levels[0].data = Some(vec![0xAA; 16]);
        texture.levels[1].data = Some(vec![0xBB; 4]);
        let bytes = texture.to_bytes().unwrap();

        let mut reader = TextureReader::new(MemStream::from_slice(&bytes)).unwrap();
        let drained: Vec<_> = reader.levels().collect::<TextureResult<_>>().unwrap();
        assert_eq!(drained[0].0, 1);
        assert_eq!(drained[0].1, vec![0xBB; 4]);
        assert_eq!(drained[1].0, 0);
        assert_eq!(drained[1].1.len(), 16);
    }
}
