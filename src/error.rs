use std::io;
use thiserror::Error;

use crate::formats::jpeg2000::BoxType;

/// Errors raised while opening, sniffing or parsing an image header.
///
/// Every variant names the source it came from so diagnostics can point at
/// the offending file, URL or buffer.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("I/O error reading {source_id}: {error}")]
    SourceRead {
        source_id: String,
        #[source]
        error: io::Error,
    },

    #[error("{source_id} is not a recognized image format")]
    UnrecognizedFormat { source_id: String },

    #[error("{source_id}: malformed header: {reason}")]
    MalformedHeader { source_id: String, reason: String },

    #[error("{source_id} is not a valid placeable windows metafile")]
    NotAPlaceableMetafile { source_id: String },

    #[error("{source_id}: no JP2 header box before the codestream or end of file")]
    MissingJp2Header { source_id: String },

    #[error("{source_id}: expected {expected} box, found {found}")]
    UnexpectedBox {
        source_id: String,
        expected: BoxType,
        found: BoxType,
    },

    #[error("{source_id}: unsupported box length {length} for {box_type} box")]
    UnsupportedBoxLength {
        source_id: String,
        box_type: BoxType,
        length: u32,
    },

    #[error("{source_id}: units-per-inch scale factor is zero")]
    InvalidScaleFactor { source_id: String },

    #[error("{source_id}: invalid image dimensions {width}x{height}")]
    InvalidDimensions {
        source_id: String,
        width: f64,
        height: f64,
    },

    #[error("{source_id}: unsupported JPEG marker 0x{marker:02X}")]
    UnsupportedJpegVariant { source_id: String, marker: u8 },

    #[error("{source_id}: unsupported bit depth {bits}")]
    UnsupportedBitDepth { source_id: String, bits: u8 },

    #[error("{source_id}: unsupported feature: {feature}")]
    UnsupportedFeature { source_id: String, feature: String },

    #[error("{source_id}: premature end of stream")]
    PrematureEndOfStream { source_id: String },
}

impl ImageError {
    /// Maps a stream error onto the taxonomy: EOF is structural, anything
    /// else is a source failure.
    pub fn from_io(source_id: &str, error: io::Error) -> Self {
        if error.kind() == io::ErrorKind::UnexpectedEof {
            Self::PrematureEndOfStream {
                source_id: source_id.to_string(),
            }
        } else {
            Self::SourceRead {
                source_id: source_id.to_string(),
                error,
            }
        }
    }

    pub fn source_id(&self) -> &str {
        match self {
            Self::SourceRead { source_id, .. }
            | Self::UnrecognizedFormat { source_id }
            | Self::MalformedHeader { source_id, .. }
            | Self::NotAPlaceableMetafile { source_id }
            | Self::MissingJp2Header { source_id }
            | Self::UnexpectedBox { source_id, .. }
            | Self::UnsupportedBoxLength { source_id, .. }
            | Self::InvalidScaleFactor { source_id }
            | Self::InvalidDimensions { source_id, .. }
            | Self::UnsupportedJpegVariant { source_id, .. }
            | Self::UnsupportedBitDepth { source_id, .. }
            | Self::UnsupportedFeature { source_id, .. }
            | Self::PrematureEndOfStream { source_id } => source_id,
        }
    }

    /// True for inputs that were recognized but use an encoding this crate
    /// does not handle, as opposed to broken or foreign inputs.
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedJpegVariant { .. }
                | Self::UnsupportedBitDepth { .. }
                | Self::UnsupportedBoxLength { .. }
                | Self::UnsupportedFeature { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ImageError>;
