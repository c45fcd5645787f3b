//! Error types for the KTX2 container engine.
//!
//! A single closed enum covers every failure the engine can report through
//! its public API. Validation tooling works with a richer issue stream (see
//! the `ktx-validate` crate); the decode API collapses non-fatal problems
//! into one of these variants.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Container engine error.
#[derive(Debug, Error)]
pub enum TextureError {
    /// The target file could not be opened.
    #[error("failed to open {path}: {source}")]
    OpenFailed {
        /// Path that failed to open.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// A seek requested a position past the end of the stream.
    ///
    /// Seeking past the end is an error, not EOF: region offsets in a
    /// well-formed container always land inside the file.
    #[error("seek to offset {offset} is beyond the end of the stream ({size} bytes)")]
    SeekOutOfBounds {
        /// Requested absolute offset.
        offset: u64,
        /// Total stream size.
        size: u64,
    },

    /// The stream ended before a full read completed.
    #[error("unexpected end of data at offset {offset} (needed {needed} more bytes)")]
    UnexpectedEof {
        /// Position at which the short read happened.
        offset: u64,
        /// Bytes still required.
        needed: u64,
    },

    /// Writing to the output stream failed.
    #[error("write failed: {0}")]
    WriteFailed(io::Error),

    /// Other I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input does not carry the KTX 2.0 identifier.
    #[error("not a KTX2 file")]
    NotKtx2,

    /// The input is a KTX 1.0 file; only KTX 2.0 is handled here.
    #[error("file uses the KTX 1.0 identifier; only KTX 2.0 is supported")]
    Ktx1,

    /// A header field breaks a structural rule of the format.
    #[error("invalid header: {field}: {reason}")]
    InvalidHeader {
        /// Offending header field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// The level index breaks an ordering, alignment or length rule.
    #[error("invalid level index: {0}")]
    InvalidLevelIndex(String),

    /// The data format descriptor region is malformed.
    #[error("invalid data format descriptor: {0}")]
    InvalidDfd(String),

    /// The key/value data region is malformed.
    #[error("invalid key/value data: {0}")]
    InvalidMetadata(String),

    /// The supercompression global data is malformed.
    #[error("invalid supercompression global data: {0}")]
    InvalidSgd(String),

    /// A decoded level payload did not match the recorded length.
    #[error(
        "level {level}: decoded length {actual} does not match the \
         uncompressed length {expected} recorded in the level index"
    )]
    DecodedLengthMismatch {
        /// Mip level.
        level: u32,
        /// Length recorded in the level index.
        expected: u64,
        /// Length actually produced by the decoder.
        actual: u64,
    },

    /// A decoded level payload failed its integrity check.
    #[error("level {level}: decoded payload failed its checksum")]
    DecodedChecksumFailed {
        /// Mip level.
        level: u32,
    },

    /// A supercompression backend reported a failure of its own.
    #[error("supercompression backend error: {0}")]
    Backend(String),

    /// The required codec backend is not linked into this build.
    #[error("{scheme} support is not linked into this build")]
    LibraryNotLinked {
        /// Human name of the missing backend.
        scheme: &'static str,
    },

    /// Transcoding to the requested target format failed.
    #[error("transcode failed: {0}")]
    TranscodeFailed(String),

    /// The operation is not allowed in the object's current state.
    #[error("operation not allowed in the current state: {0}")]
    InvalidOperation(&'static str),

    /// A requested feature is outside what this engine implements.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// A size computation overflowed or an allocation was implausibly large.
    #[error("allocation of {requested} bytes rejected: {reason}")]
    AllocationFailed {
        /// Requested byte count.
        requested: u64,
        /// Why it was rejected.
        reason: &'static str,
    },
}

/// Result alias used across the engine.
pub type TextureResult<T> = Result<T, TextureError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_strings_are_stable() {
        let e = TextureError::SeekOutOfBounds {
            offset: 200,
            size: 100,
        };
        assert_eq!(
            e.to_string(),
            "seek to offset 200 is beyond the end of the stream (100 bytes)"
        );

        let e = TextureError::NotKtx2;
        assert_eq!(e.to_string(), "not a KTX2 file");

        let e = TextureError::LibraryNotLinked { scheme: "BasisLZ" };
        assert_eq!(e.to_string(), "BasisLZ support is not linked into this build");
    }

    #[test]
    fn io_error_converts() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let e: TextureError = io_err.into();
        assert!(matches!(e, TextureError::Io(_)));
    }
}
