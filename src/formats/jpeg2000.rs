//! JPEG 2000 header parsing: raw J2K codestreams and JP2 box containers.

use std::fmt;
use std::io::Read;
use tracing::{debug, trace};

use super::HeaderParser;
use crate::error::{ImageError, Result};
use crate::icc;
use crate::io::HeaderReader;
use crate::types::{ColorSpace, ColorSpec, FormatDetails, ImageDescriptor, ImageFormat, Jpeg2000Details};

/// SOC followed by SIZ, the start of every raw codestream.
pub const J2K_SOC_SIZ: u32 = 0xFF4F_FF51;
/// Length of the JP2 signature box, its first four bytes.
pub const JP2_SIGNATURE_BOX_LEN: u32 = 0x0000_000C;
pub const JP2_MAGIC: u32 = 0x0D0A_870A;

const BOX_HEADER_LEN: u32 = 8;
const IHDR_BODY_LEN: u32 = 14;
const CODESTREAM_BITS: u8 = 8;
const BPC_VARIES: u8 = 0xFF;

const ENUMCS_CMYK: u32 = 12;
const ENUMCS_SRGB: u32 = 16;
const ENUMCS_GREYSCALE: u32 = 17;
const ENUMCS_SYCC: u32 = 18;

/// Four character box type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoxType(pub u32);

impl BoxType {
    pub const SIGNATURE: Self = Self::from_bytes(*b"jP  ");
    pub const FILE_TYPE: Self = Self::from_bytes(*b"ftyp");
    pub const HEADER: Self = Self::from_bytes(*b"jp2h");
    pub const IMAGE_HEADER: Self = Self::from_bytes(*b"ihdr");
    pub const BITS_PER_COMPONENT: Self = Self::from_bytes(*b"bpcc");
    pub const COLOR_SPEC: Self = Self::from_bytes(*b"colr");
    pub const CODESTREAM: Self = Self::from_bytes(*b"jp2c");

    #[inline]
    pub const fn from_bytes(bytes: [u8; 4]) -> Self {
        Self(u32::from_be_bytes(bytes))
    }

    #[inline]
    pub const fn to_bytes(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for BoxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.to_bytes();
        if bytes.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
            write!(f, "'{}'", String::from_utf8_lossy(&bytes))
        } else {
            write!(f, "0x{:08X}", self.0)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BoxLength {
    /// Body length, header excluded.
    Body(u32),
    /// Length field 0: the box runs to the end of its container.
    ToEnd,
}

#[derive(Debug, Clone, Copy)]
struct BoxHeader {
    box_type: BoxType,
    length: BoxLength,
}

fn read_box_header<R: Read>(reader: &mut HeaderReader<R>) -> Result<BoxHeader> {
    let length = reader.read_u32_be()?;
    let box_type = BoxType(reader.read_u32_be()?);

    let length = match length {
        0 => BoxLength::ToEnd,
        1 => {
            return Err(ImageError::UnsupportedBoxLength {
                source_id: reader.source_id().to_string(),
                box_type,
                length,
            });
        }
        n if n < BOX_HEADER_LEN => {
            return Err(reader.malformed(format!("{box_type} box length {n} is shorter than its header")));
        }
        n => BoxLength::Body(n - BOX_HEADER_LEN),
    };

    trace!(%box_type, ?length, offset = reader.position() - 8, "JP2 box");
    Ok(BoxHeader { box_type, length })
}

fn expect_box(reader: &HeaderReader<impl Read>, header: &BoxHeader, expected: BoxType) -> Result<()> {
    if header.box_type != expected {
        return Err(ImageError::UnexpectedBox {
            source_id: reader.source_id().to_string(),
            expected,
            found: header.box_type,
        });
    }
    Ok(())
}

fn missing_header(reader: &HeaderReader<impl Read>) -> ImageError {
    ImageError::MissingJp2Header {
        source_id: reader.source_id().to_string(),
    }
}

/// A length-0 top-level box runs to end of file, so no `jp2h` can follow it.
fn header_unreachable(reader: &HeaderReader<impl Read>, header: &BoxHeader) -> ImageError {
    debug!(
        source = reader.source_id(),
        box_type = %header.box_type,
        "zero length box leaves no room for the JP2 header"
    );
    missing_header(reader)
}

struct ImageHeader {
    width: u32,
    height: u32,
    components: u16,
    bpc: u8,
}

#[derive(Debug, Clone, Copy)]
pub struct Jpeg2000Parser {
    extract_icc_profile: bool,
}

impl Jpeg2000Parser {
    #[inline]
    pub const fn new(extract_icc_profile: bool) -> Self {
        Self {
            extract_icc_profile,
        }
    }

    fn parse_codestream<R: Read>(&self, reader: &mut HeaderReader<R>) -> Result<ImageDescriptor> {
        // Lsiz and Rsiz
        reader.skip(4)?;
        let x1 = reader.read_u32_be()?;
        let y1 = reader.read_u32_be()?;
        let x0 = reader.read_u32_be()?;
        let y0 = reader.read_u32_be()?;
        // Tile size and tile offsets
        reader.skip(16)?;
        let components = reader.read_u16_be()?;

        ImageDescriptor::builder(ImageFormat::Jpeg2000)
            .dimensions(f64::from(x1) - f64::from(x0), f64::from(y1) - f64::from(y0))
            .bits_per_component(CODESTREAM_BITS)
            .components(components)
            .details(FormatDetails::Jpeg2000(Jpeg2000Details {
                is_jp2: false,
                codestream_components: Some(components),
                ..Default::default()
            }))
            .build(reader.source_id())
    }

    fn parse_container<R: Read>(&self, reader: &mut HeaderReader<R>) -> Result<ImageDescriptor> {
        let signature = BoxHeader {
            box_type: BoxType(reader.read_u32_be()?),
            length: BoxLength::Body(4),
        };
        expect_box(reader, &signature, BoxType::SIGNATURE)?;
        if reader.read_u32_be()? != JP2_MAGIC {
            return Err(reader.malformed("bad JP2 signature payload"));
        }

        let file_type = read_box_header(reader)?;
        expect_box(reader, &file_type, BoxType::FILE_TYPE)?;
        match file_type.length {
            BoxLength::Body(len) => reader.skip(u64::from(len))?,
            BoxLength::ToEnd => return Err(header_unreachable(reader, &file_type)),
        }

        let header_box = loop {
            let header = read_box_header(reader)?;
            if header.box_type == BoxType::HEADER {
                break header;
            }
            if header.box_type == BoxType::CODESTREAM {
                return Err(missing_header(reader));
            }
            match header.length {
                BoxLength::Body(len) => reader.skip(u64::from(len))?,
                BoxLength::ToEnd => return Err(header_unreachable(reader, &header)),
            }
        };
        let header_end = match header_box.length {
            BoxLength::Body(len) => Some(reader.position() + u64::from(len)),
            BoxLength::ToEnd => None,
        };

        let ihdr = self.read_image_header(reader)?;
        let details = self.read_header_boxes(reader, header_end)?;

        let bits_per_component = match ihdr.bpc {
            BPC_VARIES => details
                .bpcc
                .as_deref()
                .and_then(<[u8]>::first)
                .map_or(CODESTREAM_BITS, |b| (b & 0x7F) + 1),
            bpc => (bpc & 0x7F) + 1,
        };

        let color_space = details
            .color_specs
            .iter()
            .find_map(|spec| match spec.enumerated? {
                ENUMCS_SRGB | ENUMCS_SYCC => Some(ColorSpace::Rgb),
                ENUMCS_GREYSCALE => Some(ColorSpace::Gray),
                ENUMCS_CMYK => Some(ColorSpace::Cmyk),
                _ => None,
            })
            .unwrap_or(ColorSpace::from_components(ihdr.components));

        let icc_profile = if self.extract_icc_profile {
            details
                .color_specs
                .iter()
                .filter(|spec| matches!(spec.method, 2 | 3))
                .find_map(|spec| spec.profile.clone().and_then(icc::reconcile))
        } else {
            None
        };

        ImageDescriptor::builder(ImageFormat::Jpeg2000)
            .dimensions(f64::from(ihdr.width), f64::from(ihdr.height))
            .bits_per_component(bits_per_component)
            .components(ihdr.components)
            .color_space(color_space)
            .icc_profile(icc_profile)
            .details(FormatDetails::Jpeg2000(details))
            .build(reader.source_id())
    }

    fn read_image_header<R: Read>(&self, reader: &mut HeaderReader<R>) -> Result<ImageHeader> {
        let header = read_box_header(reader)?;
        expect_box(reader, &header, BoxType::IMAGE_HEADER)?;
        let extra = match header.length {
            BoxLength::Body(len) if len >= IHDR_BODY_LEN => len - IHDR_BODY_LEN,
            _ => return Err(reader.malformed("image header box too short")),
        };

        let height = reader.read_u32_be()?;
        let width = reader.read_u32_be()?;
        let components = reader.read_u16_be()?;
        let bpc = reader.read_u8()?;
        // Compression type, unknown colorspace flag, IPR flag
        reader.skip(3)?;
        reader.skip(u64::from(extra))?;

        Ok(ImageHeader {
            width,
            height,
            components,
            bpc,
        })
    }

    /// Walks the sub-boxes that follow `ihdr` inside `jp2h`.
    fn read_header_boxes<R: Read>(
        &self,
        reader: &mut HeaderReader<R>,
        end: Option<u64>,
    ) -> Result<Jpeg2000Details> {
        let mut details = Jpeg2000Details {
            is_jp2: true,
            ..Default::default()
        };

        loop {
            let done = match end {
                Some(end) => reader.position() >= end,
                None => reader.is_eof()?,
            };
            if done {
                break;
            }

            let header = read_box_header(reader)?;
            let BoxLength::Body(len) = header.length else {
                trace!(box_type = %header.box_type, "zero length box ends the JP2 header");
                break;
            };

            match header.box_type {
                BoxType::BITS_PER_COMPONENT => details.bpcc = Some(reader.read_vec(len as usize)?),
                BoxType::COLOR_SPEC => details.color_specs.push(read_color_spec(reader, len)?),
                _ => reader.skip(u64::from(len))?,
            }
        }

        Ok(details)
    }
}

fn read_color_spec<R: Read>(reader: &mut HeaderReader<R>, len: u32) -> Result<ColorSpec> {
    if len < 3 {
        return Err(reader.malformed("colour specification box too short"));
    }

    let method = reader.read_u8()?;
    let precedence = reader.read_u8()?;
    let approximation = reader.read_u8()?;
    let mut remaining = len - 3;

    let mut spec = ColorSpec {
        method,
        precedence,
        approximation,
        enumerated: None,
        profile: None,
    };

    if method == 1 {
        if remaining < 4 {
            return Err(reader.malformed("enumerated colour specification box too short"));
        }
        spec.enumerated = Some(reader.read_u32_be()?);
        remaining -= 4;
        reader.skip(u64::from(remaining))?;
    } else if remaining > 0 {
        spec.profile = Some(reader.read_vec(remaining as usize)?);
    }

    Ok(spec)
}

impl HeaderParser for Jpeg2000Parser {
    fn format(&self) -> ImageFormat {
        ImageFormat::Jpeg2000
    }

    fn parse<R: Read>(&self, reader: &mut HeaderReader<R>) -> Result<ImageDescriptor> {
        match reader.read_u32_be()? {
            JP2_SIGNATURE_BOX_LEN => self.parse_container(reader),
            J2K_SOC_SIZ => self.parse_codestream(reader),
            _ => Err(reader.malformed("not a valid JPEG 2000 file")),
        }
    }
}
