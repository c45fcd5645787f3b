//! # ktx-dfd
//!
//! Data Format Descriptor engine for the KTX2 container.
//!
//! A KTX2 file carries two descriptions of its texel layout: the Vulkan
//! format enumerant in the header and a self-describing Data Format
//! Descriptor. This crate covers everything the engine does with the
//! latter:
//!
//! - **Synthesis** ([`create_dfd`]): build the canonical descriptor a
//!   conformant writer would emit for a given format
//! - **Parsing** ([`DataFormatDescriptor::parse`]): walk the descriptor
//!   region block by block, with hard caps on block and sample counts
//! - **Comparison** ([`compare_blocks`]): diff a file's basic block against
//!   the synthesized expectation, one divergence per defect
//! - **Interpretation** ([`check_etc1s`], [`check_uastc`]): verify the
//!   fixed block shapes required of `VK_FORMAT_UNDEFINED` Basis payloads
//!
//! Bit-packed wire words are decoded with explicit shifts and masks; the
//! in-memory types store real values (dimensions, bit lengths) rather than
//! the wire's biased encodings.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod block;
mod compare;
mod enums;
mod interpret;
mod synthesize;

pub use block::{
    BasicBlock, BlockBody, BlockHeader, DataFormatDescriptor, DescriptorBlock, ParseNote, Sample,
    MAX_BLOCKS, MAX_SAMPLES,
};
pub use compare::{compare_blocks, Divergence, SampleField};
pub use enums::{
    channel_etc1s, channel_rgbsda, channel_uastc, channel_yuvsda, ChannelQualifiers, ColorModel,
    ColorPrimaries, DataFormatFlags, TransferFunction,
};
pub use interpret::{check_etc1s, check_uastc, TemplateViolation};
pub use synthesize::{
    create_basic_block, create_dfd, etc1s_basic_block, uastc_basic_block, uastc_rgba_basic_block,
};
