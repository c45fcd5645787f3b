//! # ktx-container
//!
//! The KTX2 container codec: byte streams, the binary layout, metadata,
//! supercompression dispatch and the in-memory texture object.
//!
//! # Architecture
//!
//! ```text
//! +-----------+     +---------------+     +-----------+
//! | KtxStream | --> | TextureReader | --> |  Texture  |
//! +-----------+     +---------------+     +-----------+
//!   file/mem/custom   header, index,        levels, kv,
//!                     dfd, kvd, sgd         transcode,
//!                                           write_to
//! ```
//!
//! Reading is two-phase: [`TextureReader::new`] parses everything up to
//! the level payloads, then the caller decides between eager and deferred
//! payload loading. Writing is a single pass that recomputes every region
//! offset and zero-fills padding.
//!
//! # Quick Start
//!
//! ```no_run
//! use ktx_container::Texture;
//!
//! let texture = Texture::from_file("albedo.ktx2")?;
//! for face in texture.level_faces() {
//!     println!("level {} face {}: {}x{}", face.level, face.face, face.width, face.height);
//! }
//! # Ok::<(), ktx_core::TextureError>(())
//! ```
//!
//! # Supercompression
//!
//! Zstandard and ZLIB payloads decode through built-in codecs
//! ([`Texture::decompress`]). The Basis-family transforms are external:
//! register a [`BasisTranscoder`] backend once at startup, then call
//! [`Texture::transcode`].

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod header;
mod level;
mod reader;
mod sgd;
mod stream;
mod texture;
mod writer;

pub mod metadata;
pub mod supercompression;

pub use header::{
    identify, Header, Identification, SectionIndex, SupercompressionScheme, KTX1_IDENTIFIER,
    KTX2_IDENTIFIER,
};
pub use level::{
    image_size, level_payload_size, parse_level_index, required_level_alignment,
    texel_block_size, LevelIndexEntry,
};
pub use metadata::KeyValueData;
pub use reader::{LevelDrain, LoadMode, ReadDiagnostic, TextureReader};
pub use sgd::{BasisLzGlobalData, ImageDesc, ImageFlags};
pub use stream::{CustomStream, FileStream, KtxStream, MemStream};
pub use supercompression::{
    basis_transcoder, codec_for, register_basis_transcoder, BasisTranscoder, CodecError,
    Etc1sImage, PayloadCodec, TranscodeTarget,
};
pub use texture::{Level, LevelFace, Texture};
