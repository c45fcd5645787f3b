//! Round-trip and accounting properties over written containers.

use ktx_container::{Header, LoadMode, MemStream, SupercompressionScheme, Texture, TextureReader};
use ktx_core::VkFormat;
use ktx_tests::{minimal_rgba8, uastc_zstd_4x4, RawFile, RawLevel};
use ktx_validate::{ValidateOptions, Validator};
use std::io::Write;

fn mipmapped_rgba8() -> Texture {
    let mut texture = Texture::new(VkFormat::R8G8B8A8_UNORM, 8, 8, 0, 0, 1, 4).unwrap();
    for (level, pixels) in [(0u32, 8 * 8), (1, 4 * 4), (2, 2 * 2), (3, 1)] {
        texture.levels[level as usize].data = Some(vec![level as u8 + 1; pixels * 4]);
    }
    texture
}

#[test]
fn encode_decode_is_identity_including_metadata() {
    let mut texture = mipmapped_rgba8();
    texture.kv.set("KTXwriter", b"ktx-tests 0.1\0".to_vec());
    texture.kv.set("KTXorientation", b"rd".to_vec());
    texture.kv.set("custom.tag", b"\x01\x02\x03".to_vec());

    let bytes = texture.to_bytes().unwrap();
    let reread = Texture::from_bytes(&bytes).unwrap();

    assert_eq!(reread.vk_format, texture.vk_format);
    assert_eq!(reread.level_count, texture.level_count);
    assert_eq!(reread.dfd, texture.dfd);
    assert_eq!(reread.kv, texture.kv);
    for level in 0..4 {
        assert_eq!(reread.level_data(level), texture.level_data(level));
    }

    // writing again reproduces the same bytes
    assert_eq!(reread.to_bytes().unwrap(), bytes);
}

#[test]
fn written_files_validate_clean() {
    let texture = mipmapped_rgba8();
    let report = Validator::new(ValidateOptions::default())
        .validate_bytes(&texture.to_bytes().unwrap());
    assert!(
        report.issues().is_empty(),
        "unexpected issues: {}",
        report.to_text()
    );
}

#[test]
fn file_size_accounting() {
    let bytes = mipmapped_rgba8().to_bytes().unwrap();
    let header_bytes: &[u8; Header::LENGTH] = bytes[..Header::LENGTH].try_into().unwrap();
    let header = Header::parse(header_bytes).unwrap();
    let reader = TextureReader::new(MemStream::from_slice(&bytes)).unwrap();
    let index = reader.level_index();

    // level 0 is stored last and closes the file
    assert_eq!(
        index[0].byte_offset + index[0].byte_length,
        bytes.len() as u64
    );

    // every byte is header, index, region, payload or bounded padding
    let regions = Header::LENGTH as u64
        + 4 * Header::LEVEL_INDEX_ENTRY_LENGTH as u64
        + header.index.dfd_byte_length as u64
        + header.index.kvd_byte_length as u64
        + header.index.sgd_byte_length;
    let payloads: u64 = index.iter().map(|e| e.byte_length).sum();
    let padding = bytes.len() as u64 - regions - payloads;
    assert!(padding < 4 * 4, "padding {padding} exceeds alignment slack");
}

#[test]
fn level_index_is_monotonic() {
    let bytes = mipmapped_rgba8().to_bytes().unwrap();
    let reader = TextureReader::new(MemStream::from_slice(&bytes)).unwrap();
    let index = reader.level_index();
    for window in index.windows(2) {
        assert!(window[1].byte_offset < window[0].byte_offset);
        assert!(window[1].byte_length <= window[0].byte_length);
    }
}

#[test]
fn validation_is_deterministic() {
    let mut bytes = minimal_rgba8();
    bytes[12] = 53; // prohibited format, one error
    let validator = Validator::new(ValidateOptions::default());
    let first = validator.validate_bytes(&bytes).to_text();
    let second = validator.validate_bytes(&bytes).to_text();
    assert_eq!(first, second);
}

#[test]
fn zlib_scheme_round_trips_through_decompress() {
    let raw = vec![9u8; 64];
    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::fast());
    encoder.write_all(&raw).unwrap();
    let compressed = encoder.finish().unwrap();

    let mut basic = ktx_dfd::create_basic_block(VkFormat::R8G8B8A8_UNORM).unwrap();
    basic.bytes_planes = [0; 8];
    let bytes = RawFile {
        vk_format: VkFormat::R8G8B8A8_UNORM.0,
        type_size: 1,
        width: 4,
        height: 4,
        depth: 0,
        layer_count: 0,
        face_count: 1,
        level_count: 1,
        scheme: 3, // ZLIB
        dfd: ktx_dfd::DataFormatDescriptor::from_basic(basic).to_bytes(),
        kvd: Vec::new(),
        sgd: Vec::new(),
        levels: vec![RawLevel {
            data: compressed,
            uncompressed: 64,
        }],
        level_alignment: 1,
    }
    .build();

    let report = Validator::new(ValidateOptions::default()).validate_bytes(&bytes);
    assert!(
        report.issues().is_empty(),
        "unexpected issues: {}",
        report.to_text()
    );

    let mut texture = Texture::from_bytes(&bytes).unwrap();
    assert_eq!(texture.supercompression, SupercompressionScheme::Zlib);
    texture.decompress().unwrap();
    assert_eq!(texture.level_data(0), Some(&raw[..]));
}

#[test]
fn gltf_profile_accepts_uastc_and_rejects_plain_rgba() {
    let validator = Validator::new(ValidateOptions {
        warnings_as_errors: false,
        gltf_basisu: true,
    });

    let report = validator.validate_bytes(&uastc_zstd_4x4());
    assert!(
        report.issues().is_empty(),
        "unexpected issues: {}",
        report.to_text()
    );

    let report = validator.validate_bytes(&minimal_rgba8());
    let ids: Vec<u16> = report.issues().iter().map(|i| i.id()).collect();
    assert!(ids.contains(&5101), "{}", report.to_text()); // scheme
    assert!(ids.contains(&5103), "{}", report.to_text()); // 1x1 dimensions
    assert!(ids.contains(&5107), "{}", report.to_text()); // RGBSDA model
}

#[test]
fn deferred_reader_drains_levels_on_demand() {
    let bytes = mipmapped_rgba8().to_bytes().unwrap();
    let mut reader = TextureReader::new(MemStream::from_slice(&bytes)).unwrap();
    let mut seen = Vec::new();
    for item in reader.levels() {
        let (level, data) = item.unwrap();
        seen.push((level, data.len()));
    }
    // storage order: smallest mip first
    assert_eq!(seen, vec![(3, 4), (2, 16), (1, 64), (0, 256)]);

    let texture = reader.into_texture(LoadMode::Deferred).unwrap();
    assert!(texture.level_data(0).is_none());
}
