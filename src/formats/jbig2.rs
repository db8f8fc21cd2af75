//! JBIG2 file header parsing (ITU T.88 Annex D).

use std::io::Read;
use tracing::trace;

use super::HeaderParser;
use crate::error::{ImageError, Result};
use crate::io::HeaderReader;
use crate::types::{ColorSpace, FormatDetails, ImageDescriptor, ImageFormat, Jbig2Details, ppm_to_dpi};

pub const JBIG2_FILE_ID: [u8; 8] = [0x97, 0x4A, 0x42, 0x32, 0x0D, 0x0A, 0x1A, 0x0A];

const FLAG_SEQUENTIAL: u8 = 0x01;
const FLAG_UNKNOWN_PAGE_COUNT: u8 = 0x02;

const SEGMENT_PAGE_INFORMATION: u8 = 48;
const SEGMENT_END_OF_FILE: u8 = 51;
const SEGMENT_TYPE_MASK: u8 = 0x3F;
const SEGMENT_LONG_PAGE_ASSOCIATION: u8 = 0x40;

const UNKNOWN_LENGTH: u32 = 0xFFFF_FFFF;
const UNKNOWN_HEIGHT: u32 = 0xFFFF_FFFF;
const PAGE_INFO_MIN_LEN: u32 = 19;
const LONG_FORM_REFERENCES: u8 = 7;

#[derive(Debug, Clone, Copy)]
struct SegmentHeader {
    number: u32,
    kind: u8,
    data_length: u32,
}

struct PageInfo {
    width: u32,
    height: u32,
    x_resolution: u32,
    y_resolution: u32,
}

fn read_segment_header<R: Read>(reader: &mut HeaderReader<R>) -> Result<SegmentHeader> {
    let number = reader.read_u32_be()?;
    let flags = reader.read_u8()?;
    let kind = flags & SEGMENT_TYPE_MASK;

    let first = reader.read_u8()?;
    let short_count = first >> 5;
    let referred = match short_count {
        LONG_FORM_REFERENCES => {
            let rest: [u8; 3] = reader.read_array()?;
            let count = u32::from_be_bytes([first, rest[0], rest[1], rest[2]]) & 0x1FFF_FFFF;
            // retention flags: one bit per referred segment plus one for this one
            reader.skip((u64::from(count) + 8) / 8)?;
            count
        }
        5 | 6 => {
            return Err(reader.malformed(format!(
                "segment {number}: invalid referred-to segment count {short_count}"
            )));
        }
        n => u32::from(n),
    };

    let reference_size: u64 = match number {
        0..=256 => 1,
        257..=65536 => 2,
        _ => 4,
    };
    reader.skip(u64::from(referred) * reference_size)?;

    if flags & SEGMENT_LONG_PAGE_ASSOCIATION != 0 {
        reader.skip(4)?;
    } else {
        reader.skip(1)?;
    }
    let data_length = reader.read_u32_be()?;

    trace!(number, kind, data_length, "JBIG2 segment");
    Ok(SegmentHeader {
        number,
        kind,
        data_length,
    })
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Jbig2Parser;

impl Jbig2Parser {
    #[inline]
    pub const fn new() -> Self {
        Self
    }

    fn read_page_info<R: Read>(&self, reader: &mut HeaderReader<R>, segment: SegmentHeader) -> Result<PageInfo> {
        if segment.data_length < PAGE_INFO_MIN_LEN {
            return Err(reader.malformed(format!(
                "page information segment {} too short",
                segment.number
            )));
        }

        Ok(PageInfo {
            width: reader.read_u32_be()?,
            height: reader.read_u32_be()?,
            x_resolution: reader.read_u32_be()?,
            y_resolution: reader.read_u32_be()?,
        })
    }

    fn skip_data<R: Read>(&self, reader: &mut HeaderReader<R>, segment: SegmentHeader) -> Result<()> {
        if segment.data_length == UNKNOWN_LENGTH {
            return Err(ImageError::UnsupportedFeature {
                source_id: reader.source_id().to_string(),
                feature: format!("segment {} of unknown length before page information", segment.number),
            });
        }
        reader.skip(u64::from(segment.data_length))
    }

    fn sequential_page<R: Read>(&self, reader: &mut HeaderReader<R>) -> Result<PageInfo> {
        loop {
            let segment = read_segment_header(reader)?;
            match segment.kind {
                SEGMENT_PAGE_INFORMATION => return self.read_page_info(reader, segment),
                SEGMENT_END_OF_FILE => break,
                _ => self.skip_data(reader, segment)?,
            }
        }
        Err(reader.malformed("no page information segment"))
    }

    /// Random-access files list every segment header first, then the data
    /// parts in the same order.
    fn random_access_page<R: Read>(&self, reader: &mut HeaderReader<R>) -> Result<PageInfo> {
        let mut preceding = Vec::new();
        let mut page_segment = None;

        loop {
            let segment = read_segment_header(reader)?;
            if segment.kind == SEGMENT_END_OF_FILE {
                break;
            }
            if page_segment.is_none() {
                if segment.kind == SEGMENT_PAGE_INFORMATION {
                    page_segment = Some(segment);
                } else {
                    preceding.push(segment);
                }
            }
        }

        let Some(page_segment) = page_segment else {
            return Err(reader.malformed("no page information segment"));
        };
        for segment in preceding {
            self.skip_data(reader, segment)?;
        }
        self.read_page_info(reader, page_segment)
    }
}

impl HeaderParser for Jbig2Parser {
    fn format(&self) -> ImageFormat {
        ImageFormat::Jbig2
    }

    fn parse<R: Read>(&self, reader: &mut HeaderReader<R>) -> Result<ImageDescriptor> {
        let id: [u8; 8] = reader.read_array()?;
        if id != JBIG2_FILE_ID {
            return Err(reader.malformed("missing JBIG2 file header"));
        }

        let flags = reader.read_u8()?;
        let sequential = flags & FLAG_SEQUENTIAL != 0;
        let page_count = if flags & FLAG_UNKNOWN_PAGE_COUNT == 0 {
            Some(reader.read_u32_be()?)
        } else {
            None
        };

        let page = if sequential {
            self.sequential_page(reader)?
        } else {
            self.random_access_page(reader)?
        };

        if page.height == UNKNOWN_HEIGHT {
            return Err(ImageError::UnsupportedFeature {
                source_id: reader.source_id().to_string(),
                feature: "striped page of unknown height".to_string(),
            });
        }

        ImageDescriptor::builder(ImageFormat::Jbig2)
            .dimensions(f64::from(page.width), f64::from(page.height))
            .bits_per_component(1)
            .components(1)
            .color_space(ColorSpace::Gray)
            .dpi(ppm_to_dpi(page.x_resolution), ppm_to_dpi(page.y_resolution))
            .details(FormatDetails::Jbig2(Jbig2Details {
                sequential,
                page_count,
            }))
            .build(reader.source_id())
    }
}
