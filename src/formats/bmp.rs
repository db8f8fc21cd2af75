use std::io::Read;

use super::HeaderParser;
use crate::error::{ImageError, Result};
use crate::io::HeaderReader;
use crate::types::{ColorSpace, ImageDescriptor, ImageFormat, ppm_to_dpi};

pub const BMP_MAGIC: [u8; 2] = *b"BM";

const FILE_HEADER_REST: u64 = 12;
const CORE_HEADER_LEN: u32 = 12;
const OS2_MIN_HEADER_LEN: u32 = 16;
const INFO_HEADER_LEN: u32 = 40;

#[derive(Debug, Clone, Copy, Default)]
pub struct BmpParser;

impl BmpParser {
    #[inline]
    pub const fn new() -> Self {
        Self
    }
}

impl HeaderParser for BmpParser {
    fn format(&self) -> ImageFormat {
        ImageFormat::Bmp
    }

    fn parse<R: Read>(&self, reader: &mut HeaderReader<R>) -> Result<ImageDescriptor> {
        let magic: [u8; 2] = reader.read_array()?;
        if magic != BMP_MAGIC {
            return Err(reader.malformed("missing BM signature"));
        }
        // file size, reserved words, pixel data offset
        reader.skip(FILE_HEADER_REST)?;

        let header_len = reader.read_u32_le()?;
        let (width, height, bit_count, resolution) = match header_len {
            CORE_HEADER_LEN => {
                let width = i64::from(reader.read_u16_le()?);
                let height = i64::from(reader.read_u16_le()?);
                reader.skip(2)?;
                (width, height, reader.read_u16_le()?, (0, 0))
            }
            len if len >= OS2_MIN_HEADER_LEN => {
                let width = i64::from(reader.read_i32_le()?);
                let height = i64::from(reader.read_i32_le()?);
                reader.skip(2)?;
                let bit_count = reader.read_u16_le()?;
                let resolution = if len >= INFO_HEADER_LEN {
                    // compression, image size
                    reader.skip(8)?;
                    let x = reader.read_i32_le()?.max(0) as u32;
                    let y = reader.read_i32_le()?.max(0) as u32;
                    (ppm_to_dpi(x), ppm_to_dpi(y))
                } else {
                    (0, 0)
                };
                (width, height, bit_count, resolution)
            }
            len => return Err(reader.malformed(format!("unknown BMP header size {len}"))),
        };

        let (bits, components, color_space) = match bit_count {
            1 | 2 | 4 | 8 => (bit_count as u8, 1, ColorSpace::Indexed),
            16 | 24 => (8, 3, ColorSpace::Rgb),
            32 => (8, 4, ColorSpace::Rgb),
            other => {
                return Err(ImageError::UnsupportedBitDepth {
                    source_id: reader.source_id().to_string(),
                    bits: other.min(u16::from(u8::MAX)) as u8,
                });
            }
        };

        // negative height marks a top-down bitmap
        ImageDescriptor::builder(ImageFormat::Bmp)
            .dimensions(width as f64, height.abs() as f64)
            .bits_per_component(bits)
            .components(components)
            .color_space(color_space)
            .dpi(resolution.0, resolution.1)
            .build(reader.source_id())
    }
}
