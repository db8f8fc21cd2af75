//! Header parsing benchmarks
//!
//! Measures sniff + parse on synthetic headers, with and without a large
//! segmented ICC profile in front of the JPEG frame header.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use imghdr::{DecodeOptions, Decoder, decode_bytes};
use std::io::Cursor;

fn segment(marker: u8, payload: &[u8]) -> Vec<u8> {
    let mut seg = vec![0xFF, marker];
    seg.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
    seg.extend_from_slice(payload);
    seg
}

fn jpeg_with_icc(profile_len: usize) -> Vec<u8> {
    let mut profile = vec![0x11; profile_len];
    profile[..4].copy_from_slice(&(profile_len as u32).to_be_bytes());

    let chunks: Vec<&[u8]> = profile.chunks(60_000).collect();
    let mut data = vec![0xFF, 0xD8];
    for (index, chunk) in chunks.iter().enumerate() {
        let mut payload = b"ICC_PROFILE\0".to_vec();
        payload.extend_from_slice(&[(index + 1) as u8, chunks.len() as u8]);
        payload.extend_from_slice(chunk);
        data.extend(segment(0xE2, &payload));
    }
    data.extend(segment(0xC0, &[8, 0x04, 0x00, 0x03, 0x00, 3, 1, 0x11, 0, 2, 0x11, 0, 3, 0x11, 0]));
    data
}

fn placeable_wmf() -> Vec<u8> {
    let mut data = vec![0xD7, 0xCD, 0xC6, 0x9A, 0, 0];
    for value in [0i16, 0, 8640, 11520] {
        data.extend_from_slice(&value.to_le_bytes());
    }
    data.extend_from_slice(&1440u16.to_le_bytes());
    data.extend_from_slice(&[0; 6]);
    data
}

fn bench_jpeg(c: &mut Criterion) {
    let mut group = c.benchmark_group("jpeg_header");
    for profile_len in [128usize, 4_096, 500_000] {
        let data = jpeg_with_icc(profile_len);
        group.bench_with_input(BenchmarkId::new("decode", profile_len), &data, |b, data| {
            b.iter(|| decode_bytes(black_box(data)));
        });
    }

    let data = jpeg_with_icc(500_000);
    let decoder = Decoder::new(DecodeOptions::new().without_icc_profile());
    group.bench_function("decode_without_icc", |b| {
        b.iter(|| decoder.decode_reader(Cursor::new(black_box(&data)), "bench.jpg"));
    });
    group.finish();
}

fn bench_wmf(c: &mut Criterion) {
    let data = placeable_wmf();
    c.bench_function("wmf_header", |b| {
        b.iter(|| decode_bytes(black_box(&data)));
    });
}

criterion_group!(benches, bench_jpeg, bench_wmf);
criterion_main!(benches);
