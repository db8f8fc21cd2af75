use std::io::Read;

use super::HeaderParser;
use crate::error::Result;
use crate::io::HeaderReader;
use crate::types::{ColorSpace, ImageDescriptor, ImageFormat};

pub const GIF87A: &[u8; 6] = b"GIF87a";
pub const GIF89A: &[u8; 6] = b"GIF89a";

/// Reads the logical screen descriptor.
#[derive(Debug, Clone, Copy, Default)]
pub struct GifParser;

impl GifParser {
    #[inline]
    pub const fn new() -> Self {
        Self
    }
}

impl HeaderParser for GifParser {
    fn format(&self) -> ImageFormat {
        ImageFormat::Gif
    }

    fn parse<R: Read>(&self, reader: &mut HeaderReader<R>) -> Result<ImageDescriptor> {
        let header: [u8; 6] = reader.read_array()?;
        if &header != GIF87A && &header != GIF89A {
            return Err(reader.malformed("unknown GIF version"));
        }

        let width = reader.read_u16_le()?;
        let height = reader.read_u16_le()?;
        let packed = reader.read_u8()?;
        let bits = (packed & 0x07) + 1;

        ImageDescriptor::builder(ImageFormat::Gif)
            .dimensions(f64::from(width), f64::from(height))
            .bits_per_component(bits)
            .components(1)
            .color_space(ColorSpace::Indexed)
            .build(reader.source_id())
    }
}
