use std::io::Cursor;

use imghdr::formats::jpeg::JpegParser;
use imghdr::formats::sniff::{SNIFF_LEN, sniff_stream};
use imghdr::formats::wmf::{PLACEABLE_KEY, WmfParser};
use imghdr::{HeaderParser, HeaderReader, ImageError, ImageFormat, ImageSource, decode_bytes, sniff, sniff_bytes};

fn tiny_jpeg() -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8, 0xFF, 0xC0, 0x00, 0x11, 0x08, 0x00, 0x02, 0x00, 0x03, 0x03];
    data.extend_from_slice(&[1, 0x11, 0, 2, 0x11, 0, 3, 0x11, 0]);
    data.extend_from_slice(&[0xFF, 0xD9]);
    data
}

fn tiny_wmf() -> Vec<u8> {
    let mut data = PLACEABLE_KEY.to_le_bytes().to_vec();
    data.extend_from_slice(&[0, 0]);
    for value in [0i16, 0, 720, 360] {
        data.extend_from_slice(&value.to_le_bytes());
    }
    data.extend_from_slice(&1440u16.to_le_bytes());
    data.extend_from_slice(&[0; 6]);
    data
}

#[test]
fn test_two_random_bytes_are_unrecognized() {
    let err = decode_bytes(&[0x13, 0x37]).unwrap_err();
    assert!(matches!(err, ImageError::UnrecognizedFormat { .. }));
    assert_eq!(err.source_id(), "byte array");
}

#[test]
fn test_empty_input_is_unrecognized() {
    let err = decode_bytes(&[]).unwrap_err();
    assert!(matches!(err, ImageError::UnrecognizedFormat { .. }));
}

#[test]
fn test_sniff_does_not_parse() {
    // valid signature, garbage after it
    let source = ImageSource::bytes(vec![0xFF, 0xD8, 0x00]);
    assert_eq!(sniff(&source).unwrap(), ImageFormat::Jpeg);
    assert!(decode_bytes(&[0xFF, 0xD8, 0x00]).is_err());
}

#[test]
fn test_sniff_bytes_ignores_bytes_past_the_window() {
    let mut data = vec![0u8; SNIFF_LEN];
    data.extend_from_slice(b"GIF89a");
    assert_eq!(sniff_bytes(&data), None);
}

#[test]
fn test_replayed_stream_parses_like_the_raw_bytes() {
    for (data, format) in [(tiny_jpeg(), ImageFormat::Jpeg), (tiny_wmf(), ImageFormat::Wmf)] {
        let (sniffed, replayed) = sniff_stream(Cursor::new(data.clone()), "replay").unwrap();
        assert_eq!(sniffed, format);

        let mut through_sniffer = HeaderReader::new(replayed, "replay");
        let mut direct = HeaderReader::new(Cursor::new(data), "replay");
        let (a, b) = match format {
            ImageFormat::Jpeg => {
                let parser = JpegParser::new(true);
                (parser.parse(&mut through_sniffer), parser.parse(&mut direct))
            }
            _ => {
                let parser = WmfParser::new();
                (parser.parse(&mut through_sniffer), parser.parse(&mut direct))
            }
        };
        assert_eq!(a.unwrap(), b.unwrap());
    }
}

#[test]
fn test_wmf_points_through_decode() {
    let descriptor = decode_bytes(&tiny_wmf()).unwrap();
    assert_eq!((descriptor.width(), descriptor.height()), (36.0, 18.0));
}

#[test]
fn test_jpeg_through_decode() {
    let descriptor = decode_bytes(&tiny_jpeg()).unwrap();
    assert_eq!((descriptor.width(), descriptor.height()), (3.0, 2.0));
}
