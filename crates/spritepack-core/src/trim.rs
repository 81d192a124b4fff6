use crate::model::Rect;
use image::RgbaImage;

/// Computes the tight bounds of pixels with `alpha >= threshold`.
///
/// The result keeps the parity of the original image on both axes: when the trimmed
/// width (height) parity differs, the rect grows by one pixel on the left (top) edge,
/// or on the right (bottom) edge when already at zero. This keeps the center offset
/// between trimmed and original content integral.
///
/// `threshold == 0` disables trimming and returns the full image rect. An image with no
/// pixel above the threshold falls back to a 2x2 rect at the origin, shrunk to 1 on odd
/// axes so parity and containment still hold.
pub fn compute_trim_rect(rgba: &RgbaImage, threshold: u8) -> Rect {
    let (w, h) = rgba.dimensions();
    if threshold == 0 || w == 0 || h == 0 {
        return Rect::new(0, 0, w, h);
    }

    let mut left = u32::MAX;
    let mut right = 0u32;
    let mut top = u32::MAX;
    let mut bottom = 0u32;
    for y in 0..h {
        let mut row_filled = false;
        for x in 0..w {
            if rgba.get_pixel(x, y)[3] >= threshold {
                row_filled = true;
                left = left.min(x);
                right = right.max(x);
            }
        }
        if row_filled {
            top = top.min(y);
            bottom = y;
        }
    }

    if left == u32::MAX {
        return fallback_rect(w, h);
    }

    if (right - left + 1) % 2 != w % 2 {
        if left > 0 {
            left -= 1;
        } else {
            right += 1;
        }
    }
    if (bottom - top + 1) % 2 != h % 2 {
        if top > 0 {
            top -= 1;
        } else {
            bottom += 1;
        }
    }
    Rect::new(left, top, right - left + 1, bottom - top + 1)
}

fn fallback_rect(w: u32, h: u32) -> Rect {
    let side = |extent: u32| if extent % 2 == 0 { 2 } else { 1 };
    Rect::new(0, 0, side(w), side(h))
}

/// Copies `rect` out of `rgba` into a new buffer.
pub fn crop(rgba: &RgbaImage, rect: Rect) -> RgbaImage {
    image::imageops::crop_imm(rgba, rect.x, rect.y, rect.w, rect.h).to_image()
}
