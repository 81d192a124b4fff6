use image::{DynamicImage, Rgba, RgbaImage};
use spritepack_core::model::Rect;
use spritepack_core::prelude::*;

/// 12x36 image with an 8x32 gradient block at (4, 2).
fn tall_sprite() -> RgbaImage {
    let mut img = RgbaImage::new(12, 36);
    for v in 0..32 {
        for u in 0..8 {
            img.put_pixel(4 + u, 2 + v, Rgba([(u * 30) as u8, (v * 7) as u8, 100, 255]));
        }
    }
    img
}

fn job() -> AtlasJob {
    let wide = RgbaImage::from_pixel(32, 24, Rgba([10, 200, 10, 255]));
    let inputs = vec![
        InputImage::new("wide", DynamicImage::ImageRgba8(wide)),
        InputImage::new("tall", DynamicImage::ImageRgba8(tall_sprite())),
    ];
    let cfg = AtlasConfig::builder()
        .sprite_border(0)
        .max_texture_size(32)
        .build();
    AtlasJob::from_images(inputs, cfg).expect("valid job")
}

#[test]
fn rotated_frame_swaps_dimensions() {
    let mut job = job();
    assert_eq!(job.generate(), Outcome::Success);
    let frames = job.sprite_frames().expect("frames");

    let tall = &frames["tall"];
    assert!(tall.rotated, "the tall sprite only fits rotated");
    assert_eq!((tall.frame.w, tall.frame.h), (32, 8));
    assert_eq!(tall.source_color_rect, Rect::new(4, 2, 8, 32));
    assert_eq!(tall.source_size, (12, 36));
    // offset is measured in unrotated space
    assert_eq!(tall.offset, (2, 0));

    assert!(!frames["wide"].rotated);
    assert_eq!(job.image().expect("image").dimensions(), (32, 32));
}

#[test]
fn rotated_pixels_reconstruct_the_source() {
    let mut job = job();
    assert_eq!(job.generate(), Outcome::Success);
    let atlas = job.image().expect("image");
    let f = &job.sprite_frames().expect("frames")["tall"];
    let src = tall_sprite();
    let r = f.source_color_rect;

    for v in 0..r.h {
        for u in 0..r.w {
            // 90° clockwise: source column u becomes atlas row u
            let ax = f.frame.x + (r.h - 1 - v);
            let ay = f.frame.y + u;
            assert_eq!(
                atlas.get_pixel(ax, ay),
                src.get_pixel(r.x + u, r.y + v),
                "source ({u},{v})"
            );
        }
    }
}

#[test]
fn rotation_disabled_reports_size_limit() {
    let wide = RgbaImage::from_pixel(32, 24, Rgba([10, 200, 10, 255]));
    let inputs = vec![
        InputImage::new("wide", DynamicImage::ImageRgba8(wide)),
        InputImage::new("tall", DynamicImage::ImageRgba8(tall_sprite())),
    ];
    let cfg = AtlasConfig::builder()
        .sprite_border(0)
        .max_texture_size(32)
        .rotate_sprites(false)
        .build();
    let mut job = AtlasJob::from_images(inputs, cfg).expect("valid job");
    assert_eq!(job.generate(), Outcome::SizeLimitExceeded);
}
