//! TIFF header parsing.
//!
//! IFD entries point at arbitrary offsets, so the stream is buffered (up to
//! the decode's byte limit) and the first IFD is read out of memory.

use std::io::Read;

use super::HeaderParser;
use crate::error::Result;
use crate::io::HeaderReader;
use crate::types::{CM_PER_INCH, ColorSpace, FormatDetails, ImageDescriptor, ImageFormat, TiffDetails};

pub const TIFF_LITTLE_ENDIAN: [u8; 4] = [b'I', b'I', 0x2A, 0x00];
pub const TIFF_BIG_ENDIAN: [u8; 4] = [b'M', b'M', 0x00, 0x2A];

const TAG_IMAGE_WIDTH: u16 = 256;
const TAG_IMAGE_LENGTH: u16 = 257;
const TAG_BITS_PER_SAMPLE: u16 = 258;
const TAG_COMPRESSION: u16 = 259;
const TAG_PHOTOMETRIC: u16 = 262;
const TAG_SAMPLES_PER_PIXEL: u16 = 277;
const TAG_X_RESOLUTION: u16 = 282;
const TAG_Y_RESOLUTION: u16 = 283;
const TAG_RESOLUTION_UNIT: u16 = 296;

const TYPE_SHORT: u16 = 3;
const TYPE_LONG: u16 = 4;
const TYPE_RATIONAL: u16 = 5;

const RESOLUTION_UNIT_INCH: u32 = 2;
const RESOLUTION_UNIT_CM: u32 = 3;

const IFD_ENTRY_LEN: usize = 12;

struct TiffView<'a> {
    data: &'a [u8],
    little_endian: bool,
}

#[derive(Debug, Clone, Copy)]
struct IfdEntry {
    tag: u16,
    field_type: u16,
    count: u32,
    /// Offset of the 4-byte value/offset field.
    value_pos: usize,
}

impl TiffView<'_> {
    fn u16_at(&self, pos: usize) -> Option<u16> {
        let b = self.data.get(pos..pos + 2)?;
        Some(if self.little_endian {
            u16::from_le_bytes([b[0], b[1]])
        } else {
            u16::from_be_bytes([b[0], b[1]])
        })
    }

    fn u32_at(&self, pos: usize) -> Option<u32> {
        let b = self.data.get(pos..pos + 4)?;
        let bytes = [b[0], b[1], b[2], b[3]];
        Some(if self.little_endian {
            u32::from_le_bytes(bytes)
        } else {
            u32::from_be_bytes(bytes)
        })
    }

    fn entries(&self, ifd: usize) -> Option<Vec<IfdEntry>> {
        let count = self.u16_at(ifd)? as usize;
        (0..count)
            .map(|i| {
                let pos = ifd + 2 + i * IFD_ENTRY_LEN;
                Some(IfdEntry {
                    tag: self.u16_at(pos)?,
                    field_type: self.u16_at(pos + 2)?,
                    count: self.u32_at(pos + 4)?,
                    value_pos: pos + 8,
                })
            })
            .collect()
    }

    /// First value of a SHORT or LONG field.
    fn integer(&self, entry: &IfdEntry) -> Option<u32> {
        if entry.count == 0 {
            return None;
        }
        match entry.field_type {
            TYPE_SHORT if entry.count <= 2 => self.u16_at(entry.value_pos).map(u32::from),
            TYPE_SHORT => self.u16_at(self.u32_at(entry.value_pos)? as usize).map(u32::from),
            TYPE_LONG if entry.count == 1 => self.u32_at(entry.value_pos),
            TYPE_LONG => self.u32_at(self.u32_at(entry.value_pos)? as usize),
            _ => None,
        }
    }

    fn rational(&self, entry: &IfdEntry) -> Option<f64> {
        if entry.field_type != TYPE_RATIONAL || entry.count == 0 {
            return None;
        }
        let offset = self.u32_at(entry.value_pos)? as usize;
        let numerator = self.u32_at(offset)?;
        let denominator = self.u32_at(offset + 4)?;
        (denominator != 0).then(|| f64::from(numerator) / f64::from(denominator))
    }
}

#[derive(Debug, Default)]
struct Fields {
    width: Option<u32>,
    height: Option<u32>,
    bits_per_sample: Option<u32>,
    compression: Option<u32>,
    photometric: Option<u32>,
    samples_per_pixel: Option<u32>,
    x_resolution: Option<f64>,
    y_resolution: Option<f64>,
    resolution_unit: Option<u32>,
}

fn resolution_to_dpi(value: Option<f64>, unit: u32) -> u32 {
    let Some(value) = value.filter(|v| v.is_finite() && *v > 0.0) else {
        return 0;
    };
    match unit {
        RESOLUTION_UNIT_INCH => (value + 0.5) as u32,
        RESOLUTION_UNIT_CM => (value * CM_PER_INCH + 0.5) as u32,
        _ => 0,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TiffParser;

impl TiffParser {
    #[inline]
    pub const fn new() -> Self {
        Self
    }
}

impl HeaderParser for TiffParser {
    fn format(&self) -> ImageFormat {
        ImageFormat::Tiff
    }

    fn parse<R: Read>(&self, reader: &mut HeaderReader<R>) -> Result<ImageDescriptor> {
        let data = reader.read_remaining()?;
        let little_endian = match data.get(..4) {
            Some(head) if head == TIFF_LITTLE_ENDIAN => true,
            Some(head) if head == TIFF_BIG_ENDIAN => false,
            Some(_) => return Err(reader.malformed("bad TIFF byte order mark")),
            None => return Err(reader.premature_end()),
        };
        let view = TiffView {
            data: &data,
            little_endian,
        };

        let ifd = view.u32_at(4).ok_or_else(|| reader.premature_end())? as usize;
        let entries = view.entries(ifd).ok_or_else(|| reader.premature_end())?;

        let mut fields = Fields::default();
        for entry in &entries {
            match entry.tag {
                TAG_IMAGE_WIDTH => fields.width = view.integer(entry),
                TAG_IMAGE_LENGTH => fields.height = view.integer(entry),
                TAG_BITS_PER_SAMPLE => fields.bits_per_sample = view.integer(entry),
                TAG_COMPRESSION => fields.compression = view.integer(entry),
                TAG_PHOTOMETRIC => fields.photometric = view.integer(entry),
                TAG_SAMPLES_PER_PIXEL => fields.samples_per_pixel = view.integer(entry),
                TAG_X_RESOLUTION => fields.x_resolution = view.rational(entry),
                TAG_Y_RESOLUTION => fields.y_resolution = view.rational(entry),
                TAG_RESOLUTION_UNIT => fields.resolution_unit = view.integer(entry),
                _ => {}
            }
        }

        let (Some(width), Some(height)) = (fields.width, fields.height) else {
            return Err(reader.malformed("first IFD lacks image dimensions"));
        };

        let samples = fields.samples_per_pixel.unwrap_or(1).min(u32::from(u16::MAX)) as u16;
        let color_space = match fields.photometric {
            Some(0 | 1) => ColorSpace::Gray,
            Some(2) => ColorSpace::Rgb,
            Some(3) => ColorSpace::Indexed,
            Some(5) => ColorSpace::Cmyk,
            _ => ColorSpace::from_components(samples),
        };
        let unit = fields.resolution_unit.unwrap_or(RESOLUTION_UNIT_INCH);
        let bits = fields.bits_per_sample.unwrap_or(1).min(u32::from(u8::MAX)) as u8;

        ImageDescriptor::builder(ImageFormat::Tiff)
            .dimensions(f64::from(width), f64::from(height))
            .bits_per_component(bits)
            .components(samples)
            .color_space(color_space)
            .dpi(
                resolution_to_dpi(fields.x_resolution, unit),
                resolution_to_dpi(fields.y_resolution, unit),
            )
            .details(FormatDetails::Tiff(TiffDetails {
                little_endian,
                compression: fields.compression.unwrap_or(1).min(u32::from(u16::MAX)) as u16,
            }))
            .build(reader.source_id())
    }
}
