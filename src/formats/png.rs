use flate2::read::ZlibDecoder;
use std::io::Read;
use tracing::debug;

use super::HeaderParser;
use crate::error::{ImageError, Result};
use crate::icc;
use crate::io::HeaderReader;
use crate::types::{ColorSpace, ImageDescriptor, ImageFormat, ppm_to_dpi};

pub const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

const IHDR_LEN: u32 = 13;
const PHYS_UNIT_METRE: u8 = 1;
const MAX_PROFILE_NAME_LEN: usize = 79;
const MAX_INFLATED_PROFILE: u64 = 16 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkType {
    Ihdr,
    Idat,
    Iend,
    Iccp,
    Phys,
    Other([u8; 4]),
}

impl ChunkType {
    pub fn from_bytes(bytes: &[u8; 4]) -> Self {
        match bytes {
            b"IHDR" => Self::Ihdr,
            b"IDAT" => Self::Idat,
            b"IEND" => Self::Iend,
            b"iCCP" => Self::Iccp,
            b"pHYs" => Self::Phys,
            _ => Self::Other(*bytes),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IhdrData {
    pub width: u32,
    pub height: u32,
    pub bit_depth: u8,
    pub color_type: u8,
}

impl IhdrData {
    pub fn from_bytes(data: &[u8; 13]) -> Self {
        Self {
            width: u32::from_be_bytes([data[0], data[1], data[2], data[3]]),
            height: u32::from_be_bytes([data[4], data[5], data[6], data[7]]),
            bit_depth: data[8],
            color_type: data[9],
        }
    }

    /// Channel count and color space for the color type.
    pub fn layout(&self) -> Option<(u16, ColorSpace)> {
        match self.color_type {
            0 => Some((1, ColorSpace::Gray)),
            2 => Some((3, ColorSpace::Rgb)),
            3 => Some((1, ColorSpace::Indexed)),
            4 => Some((2, ColorSpace::Gray)),
            6 => Some((4, ColorSpace::Rgb)),
            _ => None,
        }
    }

    pub fn has_valid_bit_depth(&self) -> bool {
        match self.color_type {
            0 => matches!(self.bit_depth, 1 | 2 | 4 | 8 | 16),
            3 => matches!(self.bit_depth, 1 | 2 | 4 | 8),
            2 | 4 | 6 => matches!(self.bit_depth, 8 | 16),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PngParser {
    extract_icc_profile: bool,
}

impl PngParser {
    #[inline]
    pub const fn new(extract_icc_profile: bool) -> Self {
        Self {
            extract_icc_profile,
        }
    }

    fn read_chunk_header<R: Read>(&self, reader: &mut HeaderReader<R>) -> Result<(u32, ChunkType)> {
        let len = reader.read_u32_be()?;
        let kind: [u8; 4] = reader.read_array()?;
        Ok((len, ChunkType::from_bytes(&kind)))
    }

    fn read_ihdr<R: Read>(&self, reader: &mut HeaderReader<R>) -> Result<IhdrData> {
        let (len, kind) = self.read_chunk_header(reader)?;
        if kind != ChunkType::Ihdr || len != IHDR_LEN {
            return Err(reader.malformed("first PNG chunk is not a 13-byte IHDR"));
        }

        let payload: [u8; 13] = reader.read_array()?;
        let stored = reader.read_u32_be()?;
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(b"IHDR");
        hasher.update(&payload);
        if hasher.finalize() != stored {
            return Err(reader.malformed("IHDR CRC mismatch"));
        }

        Ok(IhdrData::from_bytes(&payload))
    }
}

impl HeaderParser for PngParser {
    fn format(&self) -> ImageFormat {
        ImageFormat::Png
    }

    fn parse<R: Read>(&self, reader: &mut HeaderReader<R>) -> Result<ImageDescriptor> {
        let signature: [u8; 8] = reader.read_array()?;
        if signature != PNG_SIGNATURE {
            return Err(reader.malformed("missing PNG signature"));
        }

        let ihdr = self.read_ihdr(reader)?;
        let Some((components, color_space)) = ihdr.layout() else {
            return Err(reader.malformed(format!("invalid PNG color type {}", ihdr.color_type)));
        };
        if !ihdr.has_valid_bit_depth() {
            return Err(ImageError::UnsupportedBitDepth {
                source_id: reader.source_id().to_string(),
                bits: ihdr.bit_depth,
            });
        }

        let mut dpi = (0, 0);
        let mut icc_profile = None;

        loop {
            let (len, kind) = self.read_chunk_header(reader)?;
            match kind {
                ChunkType::Idat | ChunkType::Iend => break,
                ChunkType::Phys => {
                    let payload = reader.read_vec(len as usize)?;
                    reader.skip(4)?;
                    if payload.len() >= 9 && payload[8] == PHYS_UNIT_METRE {
                        let x = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]);
                        let y = u32::from_be_bytes([payload[4], payload[5], payload[6], payload[7]]);
                        dpi = (ppm_to_dpi(x), ppm_to_dpi(y));
                    }
                }
                ChunkType::Iccp if self.extract_icc_profile => {
                    let payload = reader.read_vec(len as usize)?;
                    reader.skip(4)?;
                    icc_profile = inflate_profile(&payload);
                }
                _ => reader.skip(u64::from(len) + 4)?,
            }
        }

        ImageDescriptor::builder(ImageFormat::Png)
            .dimensions(f64::from(ihdr.width), f64::from(ihdr.height))
            .bits_per_component(ihdr.bit_depth)
            .components(components)
            .color_space(color_space)
            .dpi(dpi.0, dpi.1)
            .icc_profile(icc_profile)
            .build(reader.source_id())
    }
}

/// Decodes an `iCCP` payload: a Latin-1 name, a NUL, the compression method
/// and the zlib stream.
fn inflate_profile(payload: &[u8]) -> Option<Vec<u8>> {
    let name_end = memchr::memchr(0, payload)?;
    if name_end == 0 || name_end > MAX_PROFILE_NAME_LEN {
        debug!("iCCP chunk with invalid profile name");
        return None;
    }
    if *payload.get(name_end + 1)? != 0 {
        debug!("iCCP chunk with unknown compression method");
        return None;
    }

    let mut profile = Vec::new();
    let decoder = ZlibDecoder::new(&payload[name_end + 2..]);
    if let Err(e) = decoder.take(MAX_INFLATED_PROFILE).read_to_end(&mut profile) {
        debug!(error = %e, "iCCP profile failed to inflate");
        return None;
    }
    icc::reconcile(profile)
}
