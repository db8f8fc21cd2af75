use memchr::memmem;
use std::io::Read;
use tracing::{debug, trace};

use super::HeaderParser;
use crate::error::{ImageError, Result};
use crate::icc::SegmentedProfile;
use crate::io::HeaderReader;
use crate::types::{FormatDetails, ImageDescriptor, ImageFormat, dpcm_to_dpi};

pub const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];

pub const M_APP0: u8 = 0xE0;
pub const M_APP2: u8 = 0xE2;
pub const M_APPD: u8 = 0xED;
pub const M_APPE: u8 = 0xEE;

const JFIF_ID: &[u8; 5] = b"JFIF\0";
const JFIF_MIN_LEN: u16 = 16;
const ADOBE_ID: &[u8; 5] = b"Adobe";
const ADOBE_MIN_LEN: usize = 12;

/// Photoshop image resource `8BIM` with id 0x03ED (ResolutionInfo).
const PS_8BIM_RESOLUTION: [u8; 6] = [0x38, 0x42, 0x49, 0x4D, 0x03, 0xED];
const PS_RESOLUTION_INFO_LEN: u32 = 16;

const SUPPORTED_PRECISION: u8 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    /// Baseline, extended sequential and progressive Huffman frames.
    Frame,
    /// Lossless, hierarchical and arithmetic coded frames.
    Unsupported,
    /// Markers without a length field.
    Standalone,
    /// Everything else: a length-prefixed segment to skip.
    Segment,
}

#[inline]
pub const fn marker_kind(marker: u8) -> MarkerKind {
    match marker {
        0xC0..=0xC2 => MarkerKind::Frame,
        0xC3 | 0xC5..=0xCB | 0xCD..=0xCF => MarkerKind::Unsupported,
        0xD0..=0xD8 | 0x01 => MarkerKind::Standalone,
        _ => MarkerKind::Segment,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FrameHeader {
    width: u16,
    height: u16,
    components: u8,
}

/// Metadata picked up from APPn segments ahead of the frame header.
#[derive(Debug, Default)]
struct AppSegments {
    dpi_x: u32,
    dpi_y: u32,
    inverted: bool,
    icc: SegmentedProfile,
}

impl AppSegments {
    /// Resolution from a later segment only fills axes still unknown.
    fn merge_dpi(&mut self, x: Option<u32>, y: Option<u32>) {
        for (current, candidate, axis) in [(&mut self.dpi_x, x, "x"), (&mut self.dpi_y, y, "y")] {
            let Some(value) = candidate else { continue };
            if *current == 0 {
                *current = value;
            } else if *current != value {
                debug!(axis, kept = *current, ignored = value, "conflicting JPEG resolution");
            }
        }
    }
}

/// JFIF/JPEG marker walker. Stops at the first frame header.
#[derive(Debug, Clone, Copy)]
pub struct JpegParser {
    extract_icc_profile: bool,
}

impl JpegParser {
    #[inline]
    pub const fn new(extract_icc_profile: bool) -> Self {
        Self {
            extract_icc_profile,
        }
    }

    fn read_frame<R: Read>(&self, reader: &mut HeaderReader<R>) -> Result<FrameHeader> {
        reader.skip(2)?;
        let precision = reader.read_u8()?;
        if precision != SUPPORTED_PRECISION {
            return Err(ImageError::UnsupportedBitDepth {
                source_id: reader.source_id().to_string(),
                bits: precision,
            });
        }

        let height = reader.read_u16_be()?;
        let width = reader.read_u16_be()?;
        let components = reader.read_u8()?;

        Ok(FrameHeader {
            width,
            height,
            components,
        })
    }

    fn read_jfif<R: Read>(&self, reader: &mut HeaderReader<R>, app: &mut AppSegments) -> Result<()> {
        let len = reader.read_u16_be()?;
        if len < JFIF_MIN_LEN {
            return reader.skip(u64::from(len.saturating_sub(2)));
        }

        let remaining = u64::from(len) - 2;
        let id: [u8; 5] = reader.read_array()?;
        if &id != JFIF_ID {
            trace!("APP0 segment without JFIF identifier skipped");
            return reader.skip(remaining - JFIF_ID.len() as u64);
        }

        reader.skip(2)?;
        let units = reader.read_u8()?;
        let dx = u32::from(reader.read_u16_be()?);
        let dy = u32::from(reader.read_u16_be()?);
        match units {
            1 => {
                app.dpi_x = dx;
                app.dpi_y = dy;
            }
            2 => {
                app.dpi_x = dpcm_to_dpi(dx);
                app.dpi_y = dpcm_to_dpi(dy);
            }
            _ => {}
        }

        reader.skip(remaining - JFIF_ID.len() as u64 - 7)
    }

    fn read_payload<R: Read>(&self, reader: &mut HeaderReader<R>) -> Result<Vec<u8>> {
        let len = reader.read_u16_be()?.saturating_sub(2);
        reader.read_vec(len as usize)
    }
}

impl HeaderParser for JpegParser {
    fn format(&self) -> ImageFormat {
        ImageFormat::Jpeg
    }

    fn parse<R: Read>(&self, reader: &mut HeaderReader<R>) -> Result<ImageDescriptor> {
        let soi: [u8; 2] = reader.read_array()?;
        if soi != JPEG_SOI {
            return Err(reader.malformed("not a valid JPEG file"));
        }

        let mut app = AppSegments::default();
        let mut first_marker = true;

        let frame = loop {
            if reader.read_u8()? != 0xFF {
                continue;
            }

            let mut marker = reader.read_u8()?;
            while marker == 0xFF {
                marker = reader.read_u8()?;
            }
            trace!(marker = format_args!("0x{marker:02X}"), offset = reader.position() - 2);

            let is_first = std::mem::replace(&mut first_marker, false);
            match marker {
                M_APP0 if is_first => {
                    self.read_jfif(reader, &mut app)?;
                    continue;
                }
                M_APPE => {
                    let payload = self.read_payload(reader)?;
                    if payload.len() >= ADOBE_MIN_LEN && payload.starts_with(ADOBE_ID) {
                        app.inverted = true;
                    }
                    continue;
                }
                M_APP2 => {
                    let payload = self.read_payload(reader)?;
                    app.icc.add(payload);
                    continue;
                }
                M_APPD => {
                    let payload = self.read_payload(reader)?;
                    if let Some((x, y)) = photoshop_resolution(&payload) {
                        app.merge_dpi(x, y);
                    }
                    continue;
                }
                _ => {}
            }

            match marker_kind(marker) {
                MarkerKind::Frame => break self.read_frame(reader)?,
                MarkerKind::Unsupported => {
                    return Err(ImageError::UnsupportedJpegVariant {
                        source_id: reader.source_id().to_string(),
                        marker,
                    });
                }
                MarkerKind::Standalone => {}
                MarkerKind::Segment => {
                    let len = reader.read_u16_be()?;
                    reader.skip(u64::from(len.saturating_sub(2)))?;
                }
            }
        };

        let icc_profile = if self.extract_icc_profile {
            app.icc.assemble()
        } else {
            None
        };

        ImageDescriptor::builder(ImageFormat::Jpeg)
            .dimensions(f64::from(frame.width), f64::from(frame.height))
            .bits_per_component(SUPPORTED_PRECISION)
            .components(u16::from(frame.components))
            .dpi(app.dpi_x, app.dpi_y)
            .icc_profile(icc_profile)
            .inverted(app.inverted)
            .details(FormatDetails::Plain)
            .build(reader.source_id())
    }
}

/// Extracts the horizontal and vertical resolution from a Photoshop APPD
/// payload. Only axes with a known unit (1 = inch, 2 = cm) are returned.
pub fn photoshop_resolution(payload: &[u8]) -> Option<(Option<u32>, Option<u32>)> {
    let mut pos = memmem::find(payload, &PS_8BIM_RESOLUTION)? + PS_8BIM_RESOLUTION.len();

    // Pascal string name, padded to even length including the length byte.
    let name_len = *payload.get(pos)? as usize + 1;
    pos += name_len + name_len % 2;

    let size = payload.get(pos..pos + 4)?;
    let size = u32::from_be_bytes([size[0], size[1], size[2], size[3]]);
    if size != PS_RESOLUTION_INFO_LEN {
        trace!(size, "unexpected Photoshop resolution block size");
        return None;
    }
    pos += 4;

    let field = |offset: usize| {
        payload
            .get(pos + offset..pos + offset + 2)
            .map(|b| u32::from(u16::from_be_bytes([b[0], b[1]])))
    };
    let dx = field(0)?;
    let unit_x = field(4)?;
    let dy = field(8)?;
    let unit_y = field(12)?;

    let to_dpi = |value: u32, unit: u32| match unit {
        1 => Some(value),
        2 => Some(dpcm_to_dpi(value)),
        _ => None,
    };

    Some((to_dpi(dx, unit_x), to_dpi(dy, unit_y)))
}
