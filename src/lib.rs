//! Image container sniffing and header parsing for PDF page layout.
//!
//! The crate identifies an image by its leading bytes and reads just enough
//! of its header to describe it: dimensions, bit depth, color space,
//! resolution, an embedded ICC profile and the Adobe inversion flag. Pixel
//! data is never decoded.
//!
//! ```no_run
//! let descriptor = imghdr::decode_path("scan.jpg")?;
//! println!("{}x{} {}", descriptor.width(), descriptor.height(), descriptor.color_space());
//! # Ok::<(), imghdr::ImageError>(())
//! ```

pub mod error;
pub mod formats;
pub mod icc;
pub mod io;
pub mod options;
pub mod types;

use std::io::{Cursor, Read};
use std::path::Path;
use tracing::debug;

pub use error::{ImageError, Result};
pub use formats::HeaderParser;
pub use formats::sniff::sniff_bytes;
pub use io::{BYTE_ARRAY_ID, HeaderReader, ImageSource};
pub use options::DecodeOptions;
pub use types::{
    BoundingBox, ColorSpace, ColorSpec, FormatDetails, ImageDescriptor, ImageFormat, Jbig2Details,
    Jpeg2000Details, TiffDetails, WmfDetails,
};

/// Sniffs and parses image sources with a fixed set of options.
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    options: DecodeOptions,
}

impl Decoder {
    pub fn new(options: DecodeOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// Opens `source`, sniffs its format and parses the header. The stream
    /// is closed before this returns.
    pub fn decode(&self, source: &ImageSource) -> Result<ImageDescriptor> {
        let stream = source.open(&self.options)?;
        self.decode_reader(stream, &source.id())
    }

    /// Decodes an already open stream. `source_id` only labels errors and
    /// log lines.
    pub fn decode_reader<R: Read>(&self, reader: R, source_id: &str) -> Result<ImageDescriptor> {
        let limit = self.options.max_header_bytes.max(formats::sniff::SNIFF_LEN as u64);
        let bounded = reader.take(limit);
        let (format, replayed) = formats::sniff::sniff_stream(bounded, source_id)?;

        let mut reader = HeaderReader::new(replayed, source_id);
        let descriptor = formats::parse_as(format, &mut reader, &self.options)?;
        debug!(
            source = source_id,
            %format,
            width = descriptor.width(),
            height = descriptor.height(),
            bytes_read = reader.position(),
            "parsed image header"
        );
        Ok(descriptor)
    }

    /// Returns the format of `source` without parsing its header.
    pub fn sniff(&self, source: &ImageSource) -> Result<ImageFormat> {
        let stream = source.open(&self.options)?;
        let (format, _) = formats::sniff::sniff_stream(stream, &source.id())?;
        Ok(format)
    }
}

/// Decodes `source` with default options.
pub fn decode(source: &ImageSource) -> Result<ImageDescriptor> {
    Decoder::default().decode(source)
}

pub fn decode_with(source: &ImageSource, options: &DecodeOptions) -> Result<ImageDescriptor> {
    Decoder::new(options.clone()).decode(source)
}

/// Decodes an in-memory image. Errors carry the id `"byte array"`.
pub fn decode_bytes(data: &[u8]) -> Result<ImageDescriptor> {
    Decoder::default().decode_reader(Cursor::new(data), BYTE_ARRAY_ID)
}

pub fn decode_path(path: impl AsRef<Path>) -> Result<ImageDescriptor> {
    decode(&ImageSource::path(path.as_ref()))
}

/// Returns the format of `source` without parsing its header.
pub fn sniff(source: &ImageSource) -> Result<ImageFormat> {
    Decoder::default().sniff(source)
}
