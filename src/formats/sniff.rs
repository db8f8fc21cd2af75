//! Magic number sniffing.
//!
//! At most [`SNIFF_LEN`] bytes are peeked off the stream. They are handed
//! back ahead of the rest of the stream so the selected parser reads the
//! image from byte 0.

use std::io::{self, Chain, Cursor, Read};
use tracing::debug;

use super::bmp::BMP_MAGIC;
use super::jbig2::JBIG2_FILE_ID;
use super::png::PNG_SIGNATURE;
use super::tiff::{TIFF_BIG_ENDIAN, TIFF_LITTLE_ENDIAN};
use crate::error::{ImageError, Result};
use crate::types::ImageFormat;

pub const SNIFF_LEN: usize = 8;

/// Stream with the sniffed head replayed in front of it.
pub type Replayed<R> = Chain<Cursor<Vec<u8>>, R>;

#[derive(Debug, Clone, Copy)]
struct Signature {
    format: ImageFormat,
    magic: &'static [u8],
}

const fn sig(format: ImageFormat, magic: &'static [u8]) -> Signature {
    Signature { format, magic }
}

/// Checked in order, first match wins.
const SIGNATURES: [Signature; 10] = [
    sig(ImageFormat::Gif, b"GIF8"),
    sig(ImageFormat::Jpeg, &[0xFF, 0xD8]),
    sig(ImageFormat::Jpeg2000, &[0x00, 0x00, 0x00, 0x0C]),
    sig(ImageFormat::Jpeg2000, &[0xFF, 0x4F, 0xFF, 0x51]),
    sig(ImageFormat::Png, &PNG_SIGNATURE),
    sig(ImageFormat::Wmf, &[0xD7, 0xCD]),
    sig(ImageFormat::Bmp, &BMP_MAGIC),
    sig(ImageFormat::Tiff, &TIFF_BIG_ENDIAN),
    sig(ImageFormat::Tiff, &TIFF_LITTLE_ENDIAN),
    sig(ImageFormat::Jbig2, &JBIG2_FILE_ID),
];

/// Identifies the container from its leading bytes.
pub fn sniff_bytes(head: &[u8]) -> Option<ImageFormat> {
    let head = &head[..head.len().min(SNIFF_LEN)];
    SIGNATURES
        .iter()
        .find(|s| head.starts_with(s.magic))
        .map(|s| s.format)
}

/// Reads up to [`SNIFF_LEN`] bytes, stopping early only at end of stream.
fn peek<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut head = Vec::with_capacity(SNIFF_LEN);
    reader.take(SNIFF_LEN as u64).read_to_end(&mut head)?;
    Ok(head)
}

/// Sniffs `reader` and returns the format together with a stream that
/// yields every byte of the original, the peeked ones included.
pub fn sniff_stream<R: Read>(mut reader: R, source_id: &str) -> Result<(ImageFormat, Replayed<R>)> {
    let head = peek(&mut reader).map_err(|error| ImageError::SourceRead {
        source_id: source_id.to_string(),
        error,
    })?;

    let Some(format) = sniff_bytes(&head) else {
        debug!(source = source_id, head = ?head, "no known image signature");
        return Err(ImageError::UnrecognizedFormat {
            source_id: source_id.to_string(),
        });
    };
    debug!(source = source_id, %format, "sniffed image format");

    Ok((format, Cursor::new(head).chain(reader)))
}
