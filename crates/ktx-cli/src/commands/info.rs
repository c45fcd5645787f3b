//! Info command: print the container layout of one or more files.

use crate::InfoArgs;
use anyhow::{Context, Result};
use ktx_container::{LoadMode, FileStream, TextureReader};

pub fn run(args: InfoArgs) -> Result<()> {
    for (number, path) in args.input.iter().enumerate() {
        let file_size = std::fs::metadata(path)
            .with_context(|| format!("cannot stat {}", path.display()))?
            .len();
        let stream = FileStream::open(path)
            .with_context(|| format!("cannot open {}", path.display()))?;
        let reader = TextureReader::new(stream)
            .with_context(|| format!("cannot parse {}", path.display()))?;
        let header = *reader.header();

        println!("{}", path.display());
        println!("  Format:      {}", header.vk_format);
        println!(
            "  Extent:      {}x{}x{}",
            header.pixel_width,
            header.pixel_height.max(1),
            header.pixel_depth.max(1)
        );
        println!("  Dimensions:  {}D", header.dimension_count());
        println!("  Levels:      {}", header.level_count_effective());
        println!("  Layers:      {}", header.layer_count_effective());
        println!("  Faces:       {}", header.face_count);
        println!("  Scheme:      {}", header.supercompression);
        println!("  Type size:   {}", header.type_size);
        println!("  File size:   {file_size} bytes");

        if let Some(basic) = reader.dfd().basic() {
            println!(
                "  DFD:         model {:?}, transfer {:?}, block {}x{}, {} sample(s)",
                basic.color_model,
                basic.transfer_function,
                basic.texel_block_dimensions[0],
                basic.texel_block_dimensions[1],
                basic.samples.len()
            );
        }

        let kv = reader.key_value_data();
        if !kv.is_empty() {
            println!("  Metadata:");
            for (key, value) in kv.iter() {
                println!("    {key} ({} bytes)", value.len());
            }
        }

        println!("  Level index:");
        for (level, entry) in reader.level_index().iter().enumerate() {
            println!(
                "    level {level}: offset {}, {} bytes, {} uncompressed",
                entry.byte_offset, entry.byte_length, entry.uncompressed_byte_length
            );
        }

        let texture = reader.into_texture(LoadMode::Deferred)?;
        if let Some(Ok(orientation)) = texture.orientation() {
            println!("  Orientation: {:?}", orientation.axes);
        }

        if number + 1 < args.input.len() {
            println!();
        }
    }
    Ok(())
}
