use std::io::Read;

use super::HeaderParser;
use crate::error::{ImageError, Result};
use crate::io::HeaderReader;
use crate::types::{BoundingBox, FormatDetails, ImageDescriptor, ImageFormat, WMF_DPI, WmfDetails};

/// Aldus placeable metafile key, stored little endian.
pub const PLACEABLE_KEY: u32 = 0x9AC6_CDD7;

const POINTS_PER_INCH: f64 = 72.0;

/// Reads the placeable metafile header. Replaying the records is left to the
/// metafile renderer.
#[derive(Debug, Clone, Copy, Default)]
pub struct WmfParser;

impl WmfParser {
    #[inline]
    pub const fn new() -> Self {
        Self
    }
}

impl HeaderParser for WmfParser {
    fn format(&self) -> ImageFormat {
        ImageFormat::Wmf
    }

    fn parse<R: Read>(&self, reader: &mut HeaderReader<R>) -> Result<ImageDescriptor> {
        if reader.read_u32_le()? != PLACEABLE_KEY {
            return Err(ImageError::NotAPlaceableMetafile {
                source_id: reader.source_id().to_string(),
            });
        }

        // hmf handle, always zero on disk
        reader.skip(2)?;
        let bounding_box = BoundingBox {
            left: reader.read_i16_le()?,
            top: reader.read_i16_le()?,
            right: reader.read_i16_le()?,
            bottom: reader.read_i16_le()?,
        };
        let units_per_inch = reader.read_u16_le()?;
        if units_per_inch == 0 {
            return Err(ImageError::InvalidScaleFactor {
                source_id: reader.source_id().to_string(),
            });
        }

        let inch = f64::from(units_per_inch);
        let width = (f64::from(bounding_box.right) - f64::from(bounding_box.left)) / inch * POINTS_PER_INCH;
        let height = (f64::from(bounding_box.bottom) - f64::from(bounding_box.top)) / inch * POINTS_PER_INCH;

        ImageDescriptor::builder(ImageFormat::Wmf)
            .dimensions(width, height)
            .dpi(WMF_DPI, WMF_DPI)
            .details(FormatDetails::Wmf(WmfDetails {
                bounding_box,
                units_per_inch,
            }))
            .build(reader.source_id())
    }
}
