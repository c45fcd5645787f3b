//! The glTF `KHR_texture_basisu` profile rulebook.
//!
//! A second, stricter set of rules applied on request: glTF engines accept
//! only a narrow slice of KTX2, so a file can be conformant and still
//! unusable as a glTF texture. Rules here only add issues; the base
//! rulebook has already run.

use crate::issue::{codes, Issue};
use crate::report::ValidationReport;
use crate::validator::KvdFacts;
use ktx_container::{Header, SupercompressionScheme};
use ktx_dfd::{ColorModel, ColorPrimaries, DataFormatDescriptor, TransferFunction};

pub(crate) fn run(
    header: &Header,
    dfd: Option<&DataFormatDescriptor>,
    facts: &KvdFacts,
    report: &mut ValidationReport,
) {
    let mut add = |code, details: String| report.push(Issue { code, details });

    if !matches!(
        header.supercompression,
        SupercompressionScheme::BasisLz | SupercompressionScheme::Zstandard
    ) {
        add(
            &codes::GLTF_SCHEME,
            format!("scheme is {}", header.supercompression),
        );
    }

    if header.pixel_depth > 0 || header.face_count != 1 || header.layer_count > 0 {
        add(
            &codes::GLTF_NOT_2D,
            format!(
                "depth {}, faces {}, layers {}",
                header.pixel_depth, header.face_count, header.layer_count
            ),
        );
    }

    if header.pixel_width % 4 != 0 || header.pixel_height % 4 != 0 {
        add(
            &codes::GLTF_DIMENSIONS,
            format!("{}x{}", header.pixel_width, header.pixel_height),
        );
    }

    let full_pyramid = header.max_level_count();
    if header.level_count != 1 && header.level_count != full_pyramid {
        add(
            &codes::GLTF_MIPS,
            format!(
                "levelCount is {}, expected 1 or {full_pyramid}",
                header.level_count
            ),
        );
    }

    if let Some(orientation) = &facts.orientation {
        let stripped = orientation.strip_suffix(&[0]).unwrap_or(orientation);
        if stripped != b"rd" {
            add(
                &codes::GLTF_ORIENTATION,
                format!("KTXorientation is {:?}", String::from_utf8_lossy(stripped)),
            );
        }
    }
    if let Some(swizzle) = &facts.swizzle {
        if swizzle.as_slice() != b"rgba\0" {
            add(
                &codes::GLTF_SWIZZLE,
                format!("KTXswizzle is {:?}", String::from_utf8_lossy(swizzle)),
            );
        }
    }

    if let Some(basic) = dfd.and_then(|d| d.basic()) {
        if !matches!(basic.color_model, ColorModel::ETC1S | ColorModel::UASTC) {
            add(
                &codes::GLTF_MODEL,
                format!("color model is {:?}", basic.color_model),
            );
        }
        if !matches!(
            basic.color_primaries,
            ColorPrimaries::BT709 | ColorPrimaries::UNSPECIFIED
        ) {
            add(
                &codes::GLTF_PRIMARIES,
                format!("colorPrimaries is {:?}", basic.color_primaries),
            );
        }
        if !matches!(
            basic.transfer_function,
            TransferFunction::LINEAR | TransferFunction::SRGB
        ) {
            add(
                &codes::GLTF_TRANSFER,
                format!("transferFunction is {:?}", basic.transfer_function),
            );
        }
    }
}
