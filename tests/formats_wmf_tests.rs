use std::io::Cursor;

use imghdr::formats::wmf::{PLACEABLE_KEY, WmfParser};
use imghdr::{BoundingBox, FormatDetails, HeaderParser, HeaderReader, ImageError, ImageFormat, decode_bytes};

fn placeable(left: i16, top: i16, right: i16, bottom: i16, inch: u16) -> Vec<u8> {
    let mut data = PLACEABLE_KEY.to_le_bytes().to_vec();
    data.extend_from_slice(&[0, 0]);
    for value in [left, top, right, bottom] {
        data.extend_from_slice(&value.to_le_bytes());
    }
    data.extend_from_slice(&inch.to_le_bytes());
    // reserved, checksum
    data.extend_from_slice(&[0; 6]);
    data
}

#[test]
fn test_one_inch_square() {
    let data = placeable(0, 0, 1440, 1440, 1440);

    let descriptor = decode_bytes(&data).unwrap();
    assert_eq!(descriptor.format(), ImageFormat::Wmf);
    assert_eq!(descriptor.width(), 72.0);
    assert_eq!(descriptor.height(), 72.0);
    assert_eq!((descriptor.dpi_x(), descriptor.dpi_y()), (72, 72));
}

#[test]
fn test_fractional_points_and_offset_origin() {
    let data = placeable(-100, 200, 476, 1160, 576);

    let descriptor = decode_bytes(&data).unwrap();
    assert_eq!(descriptor.width(), 72.0);
    assert_eq!(descriptor.height(), 120.0);

    let FormatDetails::Wmf(details) = descriptor.details() else {
        panic!("expected WMF details");
    };
    assert_eq!(
        details.bounding_box,
        BoundingBox {
            left: -100,
            top: 200,
            right: 476,
            bottom: 1160,
        }
    );
    assert_eq!(details.units_per_inch, 576);
}

#[test]
fn test_non_integer_extent_keeps_precision() {
    let data = placeable(0, 0, 100, 50, 1000);
    let descriptor = decode_bytes(&data).unwrap();
    assert!((descriptor.width() - 7.2).abs() < 1e-9);
    assert!((descriptor.height() - 3.6).abs() < 1e-9);
}

#[test]
fn test_zero_scale_factor() {
    let data = placeable(0, 0, 1440, 1440, 0);
    let err = decode_bytes(&data).unwrap_err();
    assert!(matches!(err, ImageError::InvalidScaleFactor { .. }));
}

#[test]
fn test_inverted_bounding_box() {
    let data = placeable(1440, 0, 0, 1440, 1440);
    let err = decode_bytes(&data).unwrap_err();
    assert!(matches!(err, ImageError::InvalidDimensions { .. }));
}

#[test]
fn test_wrong_key_is_not_placeable() {
    let mut data = placeable(0, 0, 10, 10, 1440);
    data[2] = 0x00;
    let mut reader = HeaderReader::new(Cursor::new(data), "plain.wmf");
    let err = WmfParser::new().parse(&mut reader).unwrap_err();
    assert!(matches!(err, ImageError::NotAPlaceableMetafile { .. }));
    assert_eq!(err.source_id(), "plain.wmf");
}

#[test]
fn test_truncated_header() {
    let data = placeable(0, 0, 1440, 1440, 1440);
    let err = decode_bytes(&data[..10]).unwrap_err();
    assert!(matches!(err, ImageError::PrematureEndOfStream { .. }));
}
