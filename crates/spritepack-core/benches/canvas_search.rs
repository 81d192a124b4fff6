use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use image::{DynamicImage, Rgba, RgbaImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use spritepack_core::canvas::RectCanvasPacker;
use spritepack_core::prelude::*;
use std::hint::black_box;

fn generate_footprints(count: usize, min_size: u32, max_size: u32) -> Vec<(u32, u32)> {
    let mut rng = StdRng::seed_from_u64(count as u64);
    (0..count)
        .map(|_| {
            (
                rng.gen_range(min_size..=max_size),
                rng.gen_range(min_size..=max_size),
            )
        })
        .collect()
}

fn generate_sprites(count: usize) -> Vec<InputImage> {
    let mut rng = StdRng::seed_from_u64(7);
    (0..count)
        .map(|i| {
            let w = rng.gen_range(8..=48);
            let h = rng.gen_range(8..=48);
            let mut img = RgbaImage::new(w + 8, h + 8);
            for y in 4..h + 4 {
                for x in 4..w + 4 {
                    img.put_pixel(x, y, Rgba([i as u8, (i >> 8) as u8, 90, 255]));
                }
            }
            InputImage::new(format!("sprite_{i}"), DynamicImage::ImageRgba8(img))
        })
        .collect()
}

fn bench_canvas_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("canvas_search");
    let cancel = CancelToken::new();

    for count in [50, 100, 200] {
        let footprints = generate_footprints(count, 16, 64);
        group.throughput(Throughput::Elements(count as u64));

        for (label, cfg) in [
            ("free", AtlasConfig::default()),
            ("pow2", AtlasConfig::builder().pow2(true).build()),
            ("squared", AtlasConfig::builder().force_squared(true).build()),
        ] {
            group.bench_with_input(BenchmarkId::new(label, count), &footprints, |b, fp| {
                b.iter(|| {
                    let mut packer = RectCanvasPacker::new(&cfg, &cancel);
                    black_box(packer.search(fp))
                });
            });
        }
    }

    group.finish();
}

fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate");
    group.sample_size(20);

    let sprites = generate_sprites(100);
    group.bench_function("rect_100", |b| {
        b.iter(|| {
            let mut job = AtlasJob::from_images(sprites.clone(), AtlasConfig::default())
                .expect("valid job");
            black_box(job.generate())
        });
    });

    let poly_cfg = AtlasConfig::builder()
        .algorithm(PackAlgorithm::Polygon)
        .polygon_mode(true, 2.0)
        .build();
    let few = generate_sprites(20);
    group.bench_function("polygon_20", |b| {
        b.iter(|| {
            let mut job =
                AtlasJob::from_images(few.clone(), poly_cfg.clone()).expect("valid job");
            black_box(job.generate())
        });
    });

    group.finish();
}

criterion_group!(benches, bench_canvas_search, bench_generate);
criterion_main!(benches);
