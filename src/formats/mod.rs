//! Per-format header parsers and the dispatch from a sniffed format to one
//! of them.

pub mod bmp;
pub mod gif;
pub mod jbig2;
pub mod jpeg;
pub mod jpeg2000;
pub mod png;
pub mod sniff;
pub mod tiff;
pub mod wmf;

use std::io::Read;

use crate::error::{ImageError, Result};
use crate::io::HeaderReader;
use crate::options::DecodeOptions;
use crate::types::{ImageDescriptor, ImageFormat};

pub use bmp::BmpParser;
pub use gif::GifParser;
pub use jbig2::Jbig2Parser;
pub use jpeg::JpegParser;
pub use jpeg2000::Jpeg2000Parser;
pub use png::PngParser;
pub use tiff::TiffParser;
pub use wmf::WmfParser;

/// A parser for one container format.
///
/// Parsers read the stream from byte 0 and stop as soon as the descriptor
/// is known; they never look at pixel data.
pub trait HeaderParser {
    /// The format this parser produces descriptors for.
    fn format(&self) -> ImageFormat;

    fn parse<R: Read>(&self, reader: &mut HeaderReader<R>) -> Result<ImageDescriptor>;
}

/// Runs the parser registered for `format`.
pub fn parse_as<R: Read>(
    format: ImageFormat,
    reader: &mut HeaderReader<R>,
    options: &DecodeOptions,
) -> Result<ImageDescriptor> {
    let icc = options.extract_icc_profile;
    match format {
        ImageFormat::Jpeg => JpegParser::new(icc).parse(reader),
        ImageFormat::Jpeg2000 => Jpeg2000Parser::new(icc).parse(reader),
        ImageFormat::Wmf => WmfParser::new().parse(reader),
        ImageFormat::Jbig2 => Jbig2Parser::new().parse(reader),
        ImageFormat::Png => PngParser::new(icc).parse(reader),
        ImageFormat::Gif => GifParser::new().parse(reader),
        ImageFormat::Bmp => BmpParser::new().parse(reader),
        ImageFormat::Tiff => TiffParser::new().parse(reader),
        ImageFormat::None => Err(ImageError::UnrecognizedFormat {
            source_id: reader.source_id().to_string(),
        }),
    }
}
