use serde::Serialize;
use std::fmt;

use crate::error::{ImageError, Result};

pub const DEFAULT_DPI: u32 = 0;
pub const WMF_DPI: u32 = 72;

pub(crate) const CM_PER_INCH: f64 = 2.54;
const METRES_PER_INCH: f64 = 0.0254;

/// Image container formats the sniffer can tell apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ImageFormat {
    Jpeg,
    Jpeg2000,
    Wmf,
    Jbig2,
    Png,
    Gif,
    Bmp,
    Tiff,
    None,
}

impl ImageFormat {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Jpeg => "JPEG",
            Self::Jpeg2000 => "JPEG2000",
            Self::Wmf => "WMF",
            Self::Jbig2 => "JBIG2",
            Self::Png => "PNG",
            Self::Gif => "GIF",
            Self::Bmp => "BMP",
            Self::Tiff => "TIFF",
            Self::None => "None",
        }
    }

    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Jpeg2000 => "jp2",
            Self::Wmf => "wmf",
            Self::Jbig2 => "jb2",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
            Self::Tiff => "tif",
            Self::None => "bin",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ColorSpace {
    Gray,
    Rgb,
    Cmyk,
    Indexed,
    Unknown,
}

impl ColorSpace {
    /// Color space implied by a plain component count.
    pub const fn from_components(components: u16) -> Self {
        match components {
            1 => Self::Gray,
            3 => Self::Rgb,
            4 => Self::Cmyk,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for ColorSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Gray => "Gray",
            Self::Rgb => "RGB",
            Self::Cmyk => "CMYK",
            Self::Indexed => "Indexed",
            Self::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// Converts dots per centimetre to dots per inch, rounding half up.
#[inline]
pub fn dpcm_to_dpi(value: u32) -> u32 {
    (value as f64 * CM_PER_INCH + 0.5) as u32
}

/// Converts pixels per metre to dots per inch, rounding half up.
#[inline]
pub fn ppm_to_dpi(value: u32) -> u32 {
    (value as f64 * METRES_PER_INCH + 0.5) as u32
}

/// A JP2 `colr` box.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColorSpec {
    pub method: u8,
    pub precedence: u8,
    pub approximation: u8,
    /// EnumCS value, present when `method == 1`.
    pub enumerated: Option<u32>,
    #[serde(skip)]
    pub profile: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Jpeg2000Details {
    pub is_jp2: bool,
    pub color_specs: Vec<ColorSpec>,
    /// Raw `bpcc` payload, one byte per component.
    pub bpcc: Option<Vec<u8>>,
    /// Csiz from a raw codestream's SIZ marker.
    pub codestream_components: Option<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub left: i16,
    pub top: i16,
    pub right: i16,
    pub bottom: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WmfDetails {
    pub bounding_box: BoundingBox,
    pub units_per_inch: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Jbig2Details {
    pub sequential: bool,
    pub page_count: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TiffDetails {
    pub little_endian: bool,
    pub compression: u16,
}

impl TiffDetails {
    /// CCITT Group 3/4 fax encodings.
    pub const fn is_ccitt(&self) -> bool {
        matches!(self.compression, 2 | 3 | 4)
    }
}

/// Format specific header facts that do not fit the common fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub enum FormatDetails {
    #[default]
    Plain,
    Jpeg2000(Jpeg2000Details),
    Wmf(WmfDetails),
    Jbig2(Jbig2Details),
    Tiff(TiffDetails),
}

/// Header metadata of one image, as handed to page layout.
///
/// Built once per decode and never mutated afterwards. It does not hold the
/// encoded bytes: the caller keeps those.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageDescriptor {
    format: ImageFormat,
    width: f64,
    height: f64,
    bits_per_component: u8,
    components: u16,
    color_space: ColorSpace,
    dpi_x: u32,
    dpi_y: u32,
    #[serde(skip)]
    icc_profile: Option<Vec<u8>>,
    inverted: bool,
    details: FormatDetails,
}

impl ImageDescriptor {
    pub(crate) fn builder(format: ImageFormat) -> DescriptorBuilder {
        DescriptorBuilder {
            format,
            width: 0.0,
            height: 0.0,
            bits_per_component: 8,
            components: 0,
            color_space: ColorSpace::Unknown,
            dpi_x: DEFAULT_DPI,
            dpi_y: DEFAULT_DPI,
            icc_profile: None,
            inverted: false,
            details: FormatDetails::Plain,
        }
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Width in pixels, or in points for WMF.
    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn bits_per_component(&self) -> u8 {
        self.bits_per_component
    }

    pub fn components(&self) -> u16 {
        self.components
    }

    pub fn color_space(&self) -> ColorSpace {
        self.color_space
    }

    /// Horizontal resolution, 0 when the header does not declare one.
    pub fn dpi_x(&self) -> u32 {
        self.dpi_x
    }

    pub fn dpi_y(&self) -> u32 {
        self.dpi_y
    }

    pub fn icc_profile(&self) -> Option<&[u8]> {
        self.icc_profile.as_deref()
    }

    /// Adobe APPE marker present: CMYK samples are stored inverted.
    pub fn is_inverted(&self) -> bool {
        self.inverted
    }

    pub fn details(&self) -> &FormatDetails {
        &self.details
    }

    /// Size in points at the declared resolution, falling back to 72 DPI.
    pub fn size_in_points(&self) -> (f64, f64) {
        let scale = |extent: f64, dpi: u32| {
            if dpi == 0 {
                extent
            } else {
                extent * 72.0 / dpi as f64
            }
        };
        (scale(self.width, self.dpi_x), scale(self.height, self.dpi_y))
    }
}

pub(crate) struct DescriptorBuilder {
    format: ImageFormat,
    width: f64,
    height: f64,
    bits_per_component: u8,
    components: u16,
    color_space: ColorSpace,
    dpi_x: u32,
    dpi_y: u32,
    icc_profile: Option<Vec<u8>>,
    inverted: bool,
    details: FormatDetails,
}

impl DescriptorBuilder {
    pub fn dimensions(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn bits_per_component(mut self, bits: u8) -> Self {
        self.bits_per_component = bits;
        self
    }

    /// Sets the component count and the color space it implies.
    pub fn components(mut self, components: u16) -> Self {
        self.components = components;
        self.color_space = ColorSpace::from_components(components);
        self
    }

    pub fn color_space(mut self, color_space: ColorSpace) -> Self {
        self.color_space = color_space;
        self
    }

    pub fn dpi(mut self, dpi_x: u32, dpi_y: u32) -> Self {
        self.dpi_x = dpi_x;
        self.dpi_y = dpi_y;
        self
    }

    pub fn icc_profile(mut self, profile: Option<Vec<u8>>) -> Self {
        self.icc_profile = profile;
        self
    }

    pub fn inverted(mut self, inverted: bool) -> Self {
        self.inverted = inverted;
        self
    }

    pub fn details(mut self, details: FormatDetails) -> Self {
        self.details = details;
        self
    }

    /// Finishes the descriptor, refusing anything without a positive area.
    pub fn build(self, source_id: &str) -> Result<ImageDescriptor> {
        if !(self.width > 0.0 && self.height > 0.0) {
            return Err(ImageError::InvalidDimensions {
                source_id: source_id.to_string(),
                width: self.width,
                height: self.height,
            });
        }

        Ok(ImageDescriptor {
            format: self.format,
            width: self.width,
            height: self.height,
            bits_per_component: self.bits_per_component,
            components: self.components,
            color_space: self.color_space,
            dpi_x: self.dpi_x,
            dpi_y: self.dpi_y,
            icc_profile: self.icc_profile,
            inverted: self.inverted,
            details: self.details,
        })
    }
}
