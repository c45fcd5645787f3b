//! Supercompression dispatch.
//!
//! A uniform decode interface keyed by scheme: the built-in codecs inflate
//! Zstandard and ZLIB level payloads, while the Basis-family transforms
//! (BasisLZ/ETC1S transcode, UASTC transcode, ASTC decode) are supplied by
//! an external backend registered at startup. The registry is initialized
//! lazily and at most once; registering twice is a no-op.

use crate::header::SupercompressionScheme;
use crate::sgd::{BasisLzGlobalData, ImageDesc};
use std::io::Read;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::debug;

/// Failure of a payload decode.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Decoded byte count differs from the level index.
    #[error("decoded length {actual} does not match the expected {expected}")]
    LengthMismatch {
        /// Length recorded in the level index.
        expected: u64,
        /// Length the codec produced.
        actual: u64,
    },
    /// The payload failed its integrity check.
    #[error("payload failed its checksum")]
    Checksum,
    /// Any other backend-reported failure.
    #[error("{0}")]
    Backend(String),
}

/// A codec that inflates one level payload.
pub trait PayloadCodec: Send + Sync {
    /// Scheme name for messages.
    fn scheme_name(&self) -> &'static str;

    /// Decodes `input`, returning exactly `expected_len` bytes or an error.
    fn decode(&self, input: &[u8], expected_len: u64) -> Result<Vec<u8>, CodecError>;
}

/// Zstandard payload codec.
pub struct ZstdCodec;

impl PayloadCodec for ZstdCodec {
    fn scheme_name(&self) -> &'static str {
        "Zstandard"
    }

    fn decode(&self, input: &[u8], expected_len: u64) -> Result<Vec<u8>, CodecError> {
        let out = zstd::bulk::decompress(input, expected_len as usize).map_err(|e| {
            // zstd reports content-checksum failures through the error string
            let message = e.to_string();
            if message.contains("checksum") {
                CodecError::Checksum
            } else {
                CodecError::Backend(message)
            }
        })?;
        if out.len() as u64 != expected_len {
            return Err(CodecError::LengthMismatch {
                expected: expected_len,
                actual: out.len() as u64,
            });
        }
        Ok(out)
    }
}

/// ZLIB payload codec; also serves the ZLIB-stream scheme.
pub struct ZlibCodec;

impl PayloadCodec for ZlibCodec {
    fn scheme_name(&self) -> &'static str {
        "ZLIB"
    }

    fn decode(&self, input: &[u8], expected_len: u64) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::with_capacity(expected_len as usize);
        let mut decoder = flate2::read::ZlibDecoder::new(input);
        // read one byte past the expectation so an oversized payload is
        // caught as a length mismatch instead of silently truncated
        decoder
            .by_ref()
            .take(expected_len + 1)
            .read_to_end(&mut out)
            .map_err(|e| {
                let message = e.to_string();
                if message.contains("checksum") || message.contains("corrupt") {
                    CodecError::Checksum
                } else {
                    CodecError::Backend(message)
                }
            })?;
        if out.len() as u64 != expected_len {
            return Err(CodecError::LengthMismatch {
                expected: expected_len,
                actual: out.len() as u64,
            });
        }
        Ok(out)
    }
}

static ZSTD: ZstdCodec = ZstdCodec;
static ZLIB: ZlibCodec = ZlibCodec;

/// The inflating codec for a scheme.
///
/// `None` for schemes with no per-level inflate step: raw payloads,
/// BasisLZ (a transcode, not an inflate), and reserved/vendor values.
pub fn codec_for(scheme: SupercompressionScheme) -> Option<&'static dyn PayloadCodec> {
    match scheme {
        SupercompressionScheme::Zstandard => Some(&ZSTD),
        SupercompressionScheme::Zlib | SupercompressionScheme::ZlibStream => Some(&ZLIB),
        _ => None,
    }
}

/// Transcode destination picked by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscodeTarget {
    /// ETC1S payloads become `ETC2_R8G8B8A8`.
    Etc2Rgba,
    /// UASTC payloads become `ASTC_4x4`.
    AstcRgba,
}

/// One image of an ETC1S level, paired with its slice descriptor.
#[derive(Debug, Clone, Copy)]
pub struct Etc1sImage<'a> {
    /// Slice locations within the level payload.
    pub desc: &'a ImageDesc,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
}

/// External Basis-family backend.
///
/// The engine is the control plane only: it verifies SGD structure, slices
/// level payloads, and checks decoded lengths. The actual kernels live
/// behind this trait and are registered by the embedding application.
pub trait BasisTranscoder: Send + Sync {
    /// Transcodes every image of one BasisLZ/ETC1S level.
    fn transcode_etc1s_level(
        &self,
        global: &BasisLzGlobalData,
        level_data: &[u8],
        images: &[Etc1sImage<'_>],
        target: TranscodeTarget,
    ) -> Result<Vec<u8>, CodecError>;

    /// Transcodes one UASTC level.
    fn transcode_uastc_level(
        &self,
        level_data: &[u8],
        width: u32,
        height: u32,
        image_count: u32,
        target: TranscodeTarget,
    ) -> Result<Vec<u8>, CodecError>;

    /// Decodes one ASTC level to `R8G8B8A8`.
    fn decode_astc_level(
        &self,
        level_data: &[u8],
        width: u32,
        height: u32,
        image_count: u32,
        block_dimensions: [u32; 3],
    ) -> Result<Vec<u8>, CodecError>;
}

static BASIS_BACKEND: OnceLock<Box<dyn BasisTranscoder>> = OnceLock::new();

/// Registers the Basis backend. The first registration wins; repeat calls
/// are no-ops and return `false`.
pub fn register_basis_transcoder(backend: Box<dyn BasisTranscoder>) -> bool {
    let installed = BASIS_BACKEND.set(backend).is_ok();
    if installed {
        debug!("basis transcoder backend registered");
    }
    installed
}

/// The registered Basis backend, if any.
pub fn basis_transcoder() -> Option<&'static dyn BasisTranscoder> {
    BASIS_BACKEND.get().map(Box::as_ref)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn zstd_round_trip_and_length_check() {
        let payload: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
        let compressed = zstd::bulk::compress(&payload, 3).unwrap();

        let out = ZstdCodec
            .decode(&compressed, payload.len() as u64)
            .unwrap();
        assert_eq!(out, payload);

        let err = ZstdCodec
            .decode(&compressed, payload.len() as u64 + 8)
            .unwrap_err();
        assert!(matches!(err, CodecError::LengthMismatch { .. } | CodecError::Backend(_)));
    }

    #[test]
    fn zlib_round_trip_and_length_check() {
        let payload = b"the quick brown fox jumps over the lazy dog".repeat(32);
        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(&payload).unwrap();
        let compressed = encoder.finish().unwrap();

        let out = ZlibCodec.decode(&compressed, payload.len() as u64).unwrap();
        assert_eq!(out, payload);

        let err = ZlibCodec
            .decode(&compressed, payload.len() as u64 - 1)
            .unwrap_err();
        assert!(matches!(err, CodecError::LengthMismatch { .. }));
    }

    #[test]
    fn zlib_rejects_garbage() {
        assert!(ZlibCodec.decode(b"definitely not zlib", 8).is_err());
    }

    #[test]
    fn codec_dispatch() {
        assert!(codec_for(SupercompressionScheme::Zstandard).is_some());
        assert!(codec_for(SupercompressionScheme::Zlib).is_some());
        assert!(codec_for(SupercompressionScheme::ZlibStream).is_some());
        assert!(codec_for(SupercompressionScheme::None).is_none());
        assert!(codec_for(SupercompressionScheme::BasisLz).is_none());
        assert!(codec_for(SupercompressionScheme::Vendor(0x8000_0000)).is_none());
    }

    struct NullBackend;

    impl BasisTranscoder for NullBackend {
        fn transcode_etc1s_level(
            &self,
            _global: &BasisLzGlobalData,
            _level_data: &[u8],
            _images: &[Etc1sImage<'_>],
            _target: TranscodeTarget,
        ) -> Result<Vec<u8>, CodecError> {
            Ok(Vec::new())
        }

        fn transcode_uastc_level(
            &self,
            _level_data: &[u8],
            _width: u32,
            _height: u32,
            _image_count: u32,
            _target: TranscodeTarget,
        ) -> Result<Vec<u8>, CodecError> {
            Ok(Vec::new())
        }

        fn decode_astc_level(
            &self,
            _level_data: &[u8],
            _width: u32,
            _height: u32,
            _image_count: u32,
            _block_dimensions: [u32; 3],
        ) -> Result<Vec<u8>, CodecError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn registry_is_idempotent() {
        let first = register_basis_transcoder(Box::new(NullBackend));
        let second = register_basis_transcoder(Box::new(NullBackend));
        // exactly one registration takes effect, regardless of test order
        assert!(first || basis_transcoder().is_some());
        assert!(!second || !first);
        assert!(basis_transcoder().is_some());
    }
}
