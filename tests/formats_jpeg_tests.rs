use std::io::Cursor;

use imghdr::formats::jpeg::JpegParser;
use imghdr::{
    ColorSpace, DecodeOptions, Decoder, FormatDetails, HeaderParser, HeaderReader, ImageError,
    ImageFormat, decode_bytes,
};

fn segment(marker: u8, payload: &[u8]) -> Vec<u8> {
    let mut seg = vec![0xFF, marker];
    seg.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
    seg.extend_from_slice(payload);
    seg
}

fn jfif(units: u8, dx: u16, dy: u16) -> Vec<u8> {
    let mut payload = b"JFIF\0\x01\x01".to_vec();
    payload.push(units);
    payload.extend_from_slice(&dx.to_be_bytes());
    payload.extend_from_slice(&dy.to_be_bytes());
    payload.extend_from_slice(&[0, 0]);
    segment(0xE0, &payload)
}

fn frame(marker: u8, precision: u8, height: u16, width: u16, components: u8) -> Vec<u8> {
    let mut payload = vec![precision];
    payload.extend_from_slice(&height.to_be_bytes());
    payload.extend_from_slice(&width.to_be_bytes());
    payload.push(components);
    for id in 1..=components {
        payload.extend_from_slice(&[id, 0x11, 0x00]);
    }
    segment(marker, &payload)
}

fn quant_table() -> Vec<u8> {
    let mut payload = vec![0x00];
    payload.extend_from_slice(&[1u8; 64]);
    segment(0xDB, &payload)
}

fn jpeg(parts: &[Vec<u8>]) -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8];
    for part in parts {
        data.extend_from_slice(part);
    }
    data.extend_from_slice(&[0xFF, 0xD9]);
    data
}

fn fake_icc(len: usize) -> Vec<u8> {
    let mut profile: Vec<u8> = (0..len).map(|i| (i * 7 % 256) as u8).collect();
    profile[..4].copy_from_slice(&(len as u32).to_be_bytes());
    profile
}

fn icc_segment(order: u8, count: u8, chunk: &[u8]) -> Vec<u8> {
    let mut payload = b"ICC_PROFILE\0".to_vec();
    payload.extend_from_slice(&[order, count]);
    payload.extend_from_slice(chunk);
    segment(0xE2, &payload)
}

fn photoshop_resolution(dpi: u16) -> Vec<u8> {
    let mut payload = b"Photoshop 3.0\0".to_vec();
    payload.extend_from_slice(&[0x38, 0x42, 0x49, 0x4D, 0x03, 0xED, 0x00, 0x00]);
    payload.extend_from_slice(&16u32.to_be_bytes());
    for _ in 0..2 {
        payload.extend_from_slice(&dpi.to_be_bytes());
        payload.extend_from_slice(&[0x00, 0x00, 0x00, 0x01, 0x00, 0x01]);
    }
    segment(0xED, &payload)
}

#[test]
fn test_baseline_rgb() {
    let data = jpeg(&[jfif(1, 72, 72), quant_table(), frame(0xC0, 8, 2, 2, 3)]);

    let descriptor = decode_bytes(&data).unwrap();
    assert_eq!(descriptor.format(), ImageFormat::Jpeg);
    assert_eq!(descriptor.width(), 2.0);
    assert_eq!(descriptor.height(), 2.0);
    assert_eq!(descriptor.bits_per_component(), 8);
    assert_eq!(descriptor.components(), 3);
    assert_eq!(descriptor.color_space(), ColorSpace::Rgb);
    assert_eq!((descriptor.dpi_x(), descriptor.dpi_y()), (72, 72));
    assert!(descriptor.icc_profile().is_none());
    assert!(!descriptor.is_inverted());
    assert_eq!(descriptor.details(), &FormatDetails::Plain);
}

#[test]
fn test_baseline_rgb_without_app0() {
    let data = jpeg(&[frame(0xC0, 8, 2, 2, 3)]);

    let descriptor = decode_bytes(&data).unwrap();
    assert_eq!(descriptor.format(), ImageFormat::Jpeg);
    assert_eq!((descriptor.width(), descriptor.height()), (2.0, 2.0));
    assert_eq!(descriptor.bits_per_component(), 8);
    assert_eq!(descriptor.components(), 3);
    assert_eq!(descriptor.color_space(), ColorSpace::Rgb);
    assert_eq!((descriptor.dpi_x(), descriptor.dpi_y()), (0, 0));
    assert!(descriptor.icc_profile().is_none());
    assert!(!descriptor.is_inverted());
}

#[test]
fn test_gray_and_progressive_frames() {
    let data = jpeg(&[frame(0xC2, 8, 480, 640, 1)]);
    let descriptor = decode_bytes(&data).unwrap();
    assert_eq!((descriptor.width(), descriptor.height()), (640.0, 480.0));
    assert_eq!(descriptor.color_space(), ColorSpace::Gray);
    assert_eq!((descriptor.dpi_x(), descriptor.dpi_y()), (0, 0));
}

#[test]
fn test_jfif_dots_per_cm() {
    let data = jpeg(&[jfif(2, 118, 28), frame(0xC0, 8, 10, 10, 3)]);
    let descriptor = decode_bytes(&data).unwrap();
    assert_eq!((descriptor.dpi_x(), descriptor.dpi_y()), (300, 71));
}

#[test]
fn test_app0_after_other_marker_is_ignored() {
    let data = jpeg(&[quant_table(), jfif(1, 300, 300), frame(0xC0, 8, 10, 10, 3)]);
    let descriptor = decode_bytes(&data).unwrap();
    assert_eq!((descriptor.dpi_x(), descriptor.dpi_y()), (0, 0));
}

#[test]
fn test_non_jfif_app0_is_skipped() {
    let mut payload = b"JFXX\0".to_vec();
    payload.extend_from_slice(&[0x10; 12]);
    let data = jpeg(&[segment(0xE0, &payload), frame(0xC0, 8, 3, 4, 3)]);
    let descriptor = decode_bytes(&data).unwrap();
    assert_eq!((descriptor.width(), descriptor.height()), (4.0, 3.0));
    assert_eq!(descriptor.dpi_x(), 0);
}

#[test]
fn test_adobe_marker_sets_inverted() {
    let mut adobe = b"Adobe".to_vec();
    adobe.extend_from_slice(&[0x00, 0x64, 0x80, 0x00, 0x00, 0x00, 0x00, 0x02]);
    let data = jpeg(&[segment(0xEE, &adobe), frame(0xC0, 8, 8, 8, 4)]);

    let descriptor = decode_bytes(&data).unwrap();
    assert!(descriptor.is_inverted());
    assert_eq!(descriptor.color_space(), ColorSpace::Cmyk);
}

#[test]
fn test_short_adobe_marker_is_ignored() {
    let data = jpeg(&[segment(0xEE, b"Adobe"), frame(0xC0, 8, 8, 8, 4)]);
    assert!(!decode_bytes(&data).unwrap().is_inverted());
}

#[test]
fn test_photoshop_resolution() {
    let data = jpeg(&[photoshop_resolution(300), frame(0xC0, 8, 10, 10, 3)]);
    let descriptor = decode_bytes(&data).unwrap();
    assert_eq!((descriptor.dpi_x(), descriptor.dpi_y()), (300, 300));
}

#[test]
fn test_jfif_resolution_wins_over_photoshop() {
    let data = jpeg(&[jfif(1, 96, 96), photoshop_resolution(300), frame(0xC0, 8, 10, 10, 3)]);
    let descriptor = decode_bytes(&data).unwrap();
    assert_eq!((descriptor.dpi_x(), descriptor.dpi_y()), (96, 96));
}

#[test]
fn test_icc_segments_out_of_order() {
    let profile = fake_icc(300);
    let data = jpeg(&[
        icc_segment(2, 3, &profile[100..200]),
        icc_segment(3, 3, &profile[200..]),
        icc_segment(1, 3, &profile[..100]),
        frame(0xC0, 8, 2, 2, 3),
    ]);

    let descriptor = decode_bytes(&data).unwrap();
    assert_eq!(descriptor.icc_profile(), Some(&profile[..]));
}

#[test]
fn test_icc_missing_segment_drops_profile() {
    let profile = fake_icc(300);
    let data = jpeg(&[
        icc_segment(1, 3, &profile[..100]),
        icc_segment(3, 3, &profile[200..]),
        frame(0xC0, 8, 2, 2, 3),
    ]);

    let descriptor = decode_bytes(&data).unwrap();
    assert!(descriptor.icc_profile().is_none());
    assert_eq!(descriptor.width(), 2.0);
}

#[test]
fn test_icc_disagreeing_counts_drop_profile() {
    let profile = fake_icc(200);
    let data = jpeg(&[
        icc_segment(1, 2, &profile[..100]),
        icc_segment(2, 3, &profile[100..]),
        frame(0xC0, 8, 2, 2, 3),
    ]);
    assert!(decode_bytes(&data).unwrap().icc_profile().is_none());
}

#[test]
fn test_icc_declared_size_mismatch_drops_profile() {
    let mut profile = fake_icc(200);
    profile[..4].copy_from_slice(&500u32.to_be_bytes());
    let data = jpeg(&[icc_segment(1, 1, &profile), frame(0xC0, 8, 2, 2, 3)]);
    assert!(decode_bytes(&data).unwrap().icc_profile().is_none());
}

#[test]
fn test_icc_extraction_can_be_disabled() {
    let profile = fake_icc(150);
    let data = jpeg(&[icc_segment(1, 1, &profile), frame(0xC0, 8, 2, 2, 3)]);

    let decoder = Decoder::new(DecodeOptions::new().without_icc_profile());
    let descriptor = decoder.decode_reader(Cursor::new(&data), "no-icc.jpg").unwrap();
    assert!(descriptor.icc_profile().is_none());
    assert!(decode_bytes(&data).unwrap().icc_profile().is_some());
}

#[test]
fn test_fill_bytes_and_restart_markers() {
    let mut data = vec![0xFF, 0xD8, 0xFF, 0xFF, 0xFF, 0xD0, 0x00, 0x12];
    data.extend_from_slice(&frame(0xC1, 8, 5, 6, 3));
    let descriptor = decode_bytes(&data).unwrap();
    assert_eq!((descriptor.width(), descriptor.height()), (6.0, 5.0));
}

#[test]
fn test_lossless_frame_is_unsupported() {
    let data = jpeg(&[frame(0xC3, 8, 2, 2, 3)]);
    let err = decode_bytes(&data).unwrap_err();
    assert!(matches!(err, ImageError::UnsupportedJpegVariant { marker: 0xC3, .. }));
    assert!(err.is_unsupported());
}

#[test]
fn test_twelve_bit_precision_is_unsupported() {
    let data = jpeg(&[frame(0xC1, 12, 2, 2, 3)]);
    let err = decode_bytes(&data).unwrap_err();
    assert!(matches!(err, ImageError::UnsupportedBitDepth { bits: 12, .. }));
}

#[test]
fn test_truncated_before_frame() {
    let mut data = jpeg(&[jfif(1, 72, 72), frame(0xC0, 8, 2, 2, 3)]);
    data.truncate(12);
    let err = decode_bytes(&data).unwrap_err();
    assert!(matches!(err, ImageError::PrematureEndOfStream { .. }));
    assert_eq!(err.source_id(), "byte array");
}

#[test]
fn test_zero_width_is_invalid() {
    let data = jpeg(&[frame(0xC0, 8, 2, 0, 3)]);
    let err = decode_bytes(&data).unwrap_err();
    assert!(matches!(err, ImageError::InvalidDimensions { .. }));
}

#[test]
fn test_parser_requires_soi() {
    let mut reader = HeaderReader::new(Cursor::new(vec![0xFF, 0xD9, 0x00, 0x00]), "eoi.jpg");
    let err = JpegParser::new(true).parse(&mut reader).unwrap_err();
    assert!(matches!(err, ImageError::MalformedHeader { .. }));
    assert_eq!(err.source_id(), "eoi.jpg");
}
