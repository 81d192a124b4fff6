use crate::model::{Point, Rect, Triangles};
use image::RgbaImage;

/// Blit a sub-rectangle from `src` into `canvas` at destination (dx, dy),
/// optionally rotated 90° clockwise.
///
/// With `rotated`, destination pixel `(xx, yy)` samples source
/// `(src_rect.x + yy, src_rect.y + src_rect.h - 1 - xx)`. Pixels falling outside the
/// canvas are clipped.
pub fn blit_rgba(src: &RgbaImage, canvas: &mut RgbaImage, dx: u32, dy: u32, src_rect: Rect, rotated: bool) {
    let (cw, ch) = canvas.dimensions();
    let Rect { x: sx, y: sy, w: sw, h: sh } = src_rect;
    // destination (rendered) size differs when rotated
    let (rw, rh) = if rotated { (sh, sw) } else { (sw, sh) };

    for yy in 0..rh {
        for xx in 0..rw {
            let (ix, iy) = if rotated {
                (sx + yy, sy + (sh - 1 - xx))
            } else {
                (sx + xx, sy + yy)
            };
            if dx + xx < cw && dy + yy < ch {
                let px = *src.get_pixel(ix, iy);
                canvas.put_pixel(dx + xx, dy + yy, px);
            }
        }
    }
}

/// Copies only the pixels of `src_rect` whose centers lie inside `mesh`
/// (mesh coordinates are local to `src_rect`). Never rotates.
pub fn blit_masked(src: &RgbaImage, canvas: &mut RgbaImage, dx: u32, dy: u32, src_rect: Rect, mesh: &Triangles) {
    let (cw, ch) = canvas.dimensions();
    let tris: Vec<[Point; 3]> = mesh.triangles().collect();
    for yy in 0..src_rect.h {
        for xx in 0..src_rect.w {
            if dx + xx >= cw || dy + yy >= ch {
                continue;
            }
            let c = Point::new(xx as f32 + 0.5, yy as f32 + 0.5);
            if tris.iter().any(|t| point_in_triangle(c, t)) {
                let px = *src.get_pixel(src_rect.x + xx, src_rect.y + yy);
                canvas.put_pixel(dx + xx, dy + yy, px);
            }
        }
    }
}

/// Inclusive of edges, either winding.
fn point_in_triangle(p: Point, t: &[Point; 3]) -> bool {
    let cross = |a: Point, b: Point| (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
    let d1 = cross(t[0], t[1]);
    let d2 = cross(t[1], t[2]);
    let d3 = cross(t[2], t[0]);
    let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(has_neg && has_pos)
}
