use criterion::{black_box, criterion_group, criterion_main, Criterion};
use exif_restore::tags::{map_sidecar, Sidecar};
use exif_restore::MediaKind;
use image::{ImageFormat, RgbImage};
use std::path::Path;

const SIDECAR: &[u8] = br#"{
    "title": "IMG_01.jpg",
    "description": "Beach",
    "creationTime": {"timestamp": "1700000000", "formatted": "Nov 14, 2023, 10:13:20 PM UTC"},
    "geoData": {"latitude": 10.5, "longitude": 20.25, "altitude": 0.0}
}"#;

fn bench_mapping(c: &mut Criterion) {
    let path = Path::new("IMG_01.jpg.json");

    c.bench_function("parse sidecar", |b| {
        b.iter(|| Sidecar::from_slice(path, black_box(SIDECAR)).unwrap())
    });

    let sidecar = Sidecar::from_slice(path, SIDECAR).unwrap();
    c.bench_function("map video tags", |b| {
        b.iter(|| map_sidecar(black_box(&sidecar), MediaKind::Video))
    });
}

fn bench_sniff(c: &mut Criterion) {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("IMG_01.jpg");
    RgbImage::new(64, 64)
        .save_with_format(&path, ImageFormat::Png)
        .unwrap();

    c.bench_function("sniff extension", |b| {
        b.iter(|| exif_restore::sniff::sniff_extension(black_box(&path)).unwrap())
    });
}

criterion_group!(benches, bench_mapping, bench_sniff);
criterion_main!(benches);
