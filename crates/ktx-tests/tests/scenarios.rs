//! End-to-end validator scenarios over crafted containers.

use ktx_container::{
    register_basis_transcoder, BasisLzGlobalData, BasisTranscoder, CodecError, Etc1sImage,
    Texture, TranscodeTarget,
};
use ktx_core::VkFormat;
use ktx_tests::{
    basis_cubemap_4x4, bc1_4x4, kv_entry, minimal_rgba8, patch_u32, zstd_rgba8, RawFile,
    RawLevel, ETC1S_IMAGE_BYTES,
};
use ktx_validate::{ValidateOptions, Validator};

/// A backend that emits correctly-sized zero blocks, enough to exercise
/// the control plane without a real Basis kernel.
struct StubTranscoder;

impl BasisTranscoder for StubTranscoder {
    fn transcode_etc1s_level(
        &self,
        _global: &BasisLzGlobalData,
        _level_data: &[u8],
        images: &[Etc1sImage<'_>],
        _target: TranscodeTarget,
    ) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::new();
        for image in images {
            let blocks = image.width.div_ceil(4) * image.height.div_ceil(4);
            out.extend(std::iter::repeat_n(0u8, blocks as usize * 16));
        }
        Ok(out)
    }

    fn transcode_uastc_level(
        &self,
        level_data: &[u8],
        _width: u32,
        _height: u32,
        _image_count: u32,
        _target: TranscodeTarget,
    ) -> Result<Vec<u8>, CodecError> {
        Ok(level_data.to_vec())
    }

    fn decode_astc_level(
        &self,
        _level_data: &[u8],
        width: u32,
        height: u32,
        image_count: u32,
        _block_dimensions: [u32; 3],
    ) -> Result<Vec<u8>, CodecError> {
        Ok(vec![0; (width * height * 4 * image_count) as usize])
    }
}

fn install_stub_backend() {
    register_basis_transcoder(Box::new(StubTranscoder));
}

fn validate(bytes: &[u8]) -> ktx_validate::ValidationReport {
    Validator::new(ValidateOptions::default()).validate_bytes(bytes)
}

fn ids(report: &ktx_validate::ValidationReport) -> Vec<u16> {
    report.issues().iter().map(|i| i.id()).collect()
}

#[test]
fn minimal_rgba8_is_clean() {
    let report = validate(&minimal_rgba8());
    assert!(
        report.issues().is_empty(),
        "unexpected issues: {}",
        report.to_text()
    );
    assert_eq!(report.exit_code(), 0);
}

#[test]
fn prohibited_format_reports_3001() {
    let mut bytes = minimal_rgba8();
    // swap in a banned enumerant
    patch_u32(&mut bytes, 12, VkFormat::A8B8G8R8_USCALED_PACK32.0);
    let report = validate(&bytes);
    assert_eq!(ids(&report), vec![3001], "{}", report.to_text());
    assert_eq!(report.exit_code(), 2);

    let json: serde_json::Value = serde_json::from_str(&report.to_json()).unwrap();
    assert_eq!(json["valid"], false);
    assert_eq!(json["messages"][0]["id"], 3001);
}

#[test]
fn basis_cubemap_is_clean_and_transcodes() {
    install_stub_backend();
    let bytes = basis_cubemap_4x4();

    let report = validate(&bytes);
    assert!(
        report.issues().is_empty(),
        "unexpected issues: {}",
        report.to_text()
    );

    let mut texture = Texture::from_bytes(&bytes).unwrap();
    assert_eq!(texture.image_count(), 6);
    let global = texture.basis_lz_global_data().unwrap().unwrap();
    assert_eq!(global.image_descs.len(), 6);
    assert_eq!(
        global.image_descs[0].rgb_slice_byte_length as usize + 6,
        ETC1S_IMAGE_BYTES
    );

    texture.transcode(TranscodeTarget::Etc2Rgba).unwrap();
    assert_eq!(texture.vk_format, VkFormat::ETC2_R8G8B8A8_UNORM_BLOCK);
    assert_eq!(texture.sgd, None);
    // six faces of one 4x4 block each
    assert_eq!(texture.level_data(0).unwrap().len(), 6 * 16);
}

#[test]
fn unordered_metadata_reports_7012() {
    let mut anim = Vec::new();
    anim.extend_from_slice(&1u32.to_le_bytes());
    anim.extend_from_slice(&30u32.to_le_bytes());
    anim.extend_from_slice(&0u32.to_le_bytes());

    // "KTXanimData" sorts before "KTXorientation"; writing it second is
    // an ordering violation
    let mut kvd = kv_entry("KTXorientation", b"rd");
    kvd.extend_from_slice(&kv_entry("KTXanimData", &anim));

    let texture = {
        let mut t = Texture::new(VkFormat::R8G8B8A8_UNORM, 4, 4, 0, 2, 1, 1).unwrap();
        t.levels[0].data = Some(vec![0u8; 4 * 4 * 4 * 2]);
        t
    };
    let file = RawFile {
        vk_format: texture.vk_format.0,
        type_size: 1,
        width: 4,
        height: 4,
        depth: 0,
        layer_count: 2,
        face_count: 1,
        level_count: 1,
        scheme: 0,
        dfd: texture.dfd.to_bytes(),
        kvd,
        sgd: Vec::new(),
        levels: vec![RawLevel {
            data: vec![0u8; 4 * 4 * 4 * 2],
            uncompressed: (4 * 4 * 4 * 2) as u64,
        }],
        level_alignment: 4,
    }
    .build();

    let report = validate(&file);
    assert_eq!(ids(&report), vec![7012], "{}", report.to_text());
    assert_eq!(report.exit_code(), 2);
}

#[test]
fn zstd_length_lie_reports_4006_and_4008() {
    // uncompressedByteLength claims 5, the computed level size is 4 and
    // the payload inflates to 4
    let report = validate(&zstd_rgba8(5));
    let ids = ids(&report);
    assert!(ids.contains(&4006), "{}", report.to_text());
    assert!(ids.contains(&4008), "{}", report.to_text());
    assert_eq!(report.exit_code(), 2);
}

#[test]
fn zstd_with_honest_lengths_is_clean() {
    let report = validate(&zstd_rgba8(4));
    assert!(
        report.issues().is_empty(),
        "unexpected issues: {}",
        report.to_text()
    );
}

#[test]
fn nonzero_padding_reports_7011_with_the_byte() {
    let mut bytes = bc1_4x4();
    // BC1 aligns level payloads to 8; the DFD ends at 148 and the payload
    // starts at 152, leaving a real padding gap
    bytes[150] = 0xFF;
    let report = validate(&bytes);
    assert_eq!(ids(&report), vec![7011], "{}", report.to_text());
    let details = &report.issues()[0].details;
    assert!(details.contains("offset 150"), "details: {details}");
    assert!(details.contains("0xFF"), "details: {details}");
    assert_eq!(report.exit_code(), 2);
}

#[test]
fn warnings_promote_to_errors_on_request() {
    let mut bytes = minimal_rgba8();
    // an unassigned extension format: warning 3003 by default
    patch_u32(&mut bytes, 12, 1_000_999_000);
    patch_u32(&mut bytes, 16, 1); // typeSize unknowable, leave 1

    let relaxed = validate(&bytes);
    assert!(relaxed.issues().iter().any(|i| i.id() == 3003));

    let strict = Validator::new(ValidateOptions {
        warnings_as_errors: true,
        gltf_basisu: false,
    })
    .validate_bytes(&bytes);
    assert_eq!(strict.exit_code(), 2);
}

#[test]
fn truncated_file_is_fatal() {
    let bytes = minimal_rgba8();
    let report = validate(&bytes[..40]);
    assert_eq!(ids(&report), vec![1003]);
    assert!(report.has_fatal());
}

#[test]
fn foreign_and_ktx1_magics() {
    let report = validate(b"\x89PNG\r\n\x1a\n twelve bytes of not ktx at all................");
    assert_eq!(ids(&report), vec![2001]);

    let mut bytes = minimal_rgba8();
    bytes[5] = 0x31; // "20" -> "10"
    bytes[6] = 0x31;
    let report = validate(&bytes);
    assert_eq!(ids(&report), vec![2002]);

    let mut bytes = minimal_rgba8();
    bytes.swap(5, 6); // "20" -> "02"
    let report = validate(&bytes);
    assert_eq!(ids(&report), vec![2003]);
}
