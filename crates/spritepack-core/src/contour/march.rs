use crate::model::{Point, Rect};
use image::RgbaImage;
use std::collections::HashSet;
use tracing::warn;

/// Owned scratch copy of an image's alpha channel.
///
/// Contours are erased from the mask between traces; the decoded image is never touched.
#[derive(Debug, Clone)]
pub struct AlphaMask {
    width: u32,
    height: u32,
    alpha: Vec<u8>,
}

impl AlphaMask {
    pub fn from_image(image: &RgbaImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            alpha: image.pixels().map(|p| p[3]).collect(),
        }
    }

    pub fn alpha(&self, x: u32, y: u32) -> u8 {
        self.alpha[(y * self.width + x) as usize]
    }

    pub fn clear(&mut self, x: u32, y: u32) {
        if x < self.width && y < self.height {
            self.alpha[(y * self.width + x) as usize] = 0;
        }
    }

    /// Clears every pixel of `rect` whose center is inside `poly` or within `pen / 2`
    /// of its outline. `poly` is local to `rect`.
    pub fn erase_polygon(&mut self, rect: Rect, poly: &[Point], pen: f32) {
        if poly.is_empty() {
            return;
        }
        let half = pen * 0.5;
        let (mut min_x, mut min_y) = (f32::MAX, f32::MAX);
        let (mut max_x, mut max_y) = (f32::MIN, f32::MIN);
        for p in poly {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        let x0 = (min_x - half).floor().max(0.0) as u32;
        let y0 = (min_y - half).floor().max(0.0) as u32;
        let x1 = ((max_x + half).ceil().max(0.0) as u32).min(rect.w);
        let y1 = ((max_y + half).ceil().max(0.0) as u32).min(rect.h);
        for ly in y0..y1 {
            for lx in x0..x1 {
                let c = Point::new(lx as f32 + 0.5, ly as f32 + 0.5);
                if super::offset::point_in_polygon(c, poly) || near_outline(c, poly, half) {
                    self.clear(rect.x + lx, rect.y + ly);
                }
            }
        }
    }
}

fn near_outline(c: Point, poly: &[Point], dist: f32) -> bool {
    let n = poly.len();
    (0..n).any(|i| super::simplify::segment_distance(c, poly[i], poly[(i + 1) % n]) <= dist)
}

/// Row-major scan of `rect` for the first pixel with `alpha > threshold`.
pub fn find_first_opaque(mask: &AlphaMask, rect: Rect, threshold: u8) -> Option<(u32, u32)> {
    for y in rect.y..rect.y + rect.h {
        for x in rect.x..rect.x + rect.w {
            if mask.alpha(x, y) > threshold {
                return Some((x, y));
            }
        }
    }
    None
}

/// Traces the outline of the first opaque blob in `rect`.
/// Returns the start pixel and the outline points (local to `rect`).
pub fn trace(mask: &AlphaMask, rect: Rect, threshold: u8) -> Option<((u32, u32), Vec<Point>)> {
    let start = find_first_opaque(mask, rect, threshold)?;
    Some((start, march_squares(mask, rect, start, threshold)))
}

fn filled(mask: &AlphaMask, rect: Rect, x: i64, y: i64, threshold: u8) -> bool {
    x >= rect.x as i64
        && y >= rect.y as i64
        && x < (rect.x + rect.w) as i64
        && y < (rect.y + rect.h) as i64
        && mask.alpha(x as u32, y as u32) > threshold
}

/// Bit mask of the 2x2 pixel neighborhood whose shared corner is `(x, y)`:
/// ```text
/// +---+---+
/// | 1 | 2 |
/// +---+---+
/// | 4 | 8 |  <- pixel (x, y)
/// +---+---+
/// ```
/// Pixels outside `rect` count as transparent.
pub fn square_value(mask: &AlphaMask, rect: Rect, x: i64, y: i64, threshold: u8) -> u8 {
    let mut sv = 0;
    if filled(mask, rect, x - 1, y - 1, threshold) {
        sv |= 1;
    }
    if filled(mask, rect, x, y - 1, threshold) {
        sv |= 2;
    }
    if filled(mask, rect, x - 1, y, threshold) {
        sv |= 4;
    }
    if filled(mask, rect, x, y, threshold) {
        sv |= 8;
    }
    sv
}

/// Walks pixel corners around the blob containing `start` until it returns to `start`.
///
/// Consecutive steps in the same direction collapse into one point. The saddle cases
/// 9 and 6 go up/right on the first visit of a corner and down/left on the next one;
/// the visited set lives only for this trace.
pub fn march_squares(mask: &AlphaMask, rect: Rect, start: (u32, u32), threshold: u8) -> Vec<Point> {
    let (sx, sy) = (start.0 as i64, start.1 as i64);
    let (mut cx, mut cy) = (sx, sy);
    let mut prev = (0i64, 0i64);
    let mut visited9: HashSet<(i64, i64)> = HashSet::new();
    let mut visited6: HashSet<(i64, i64)> = HashSet::new();
    let mut points: Vec<Point> = Vec::new();
    let max_steps = 4 * (rect.w as usize + 2) * (rect.h as usize + 2);
    let mut steps = 0usize;

    loop {
        let step = match square_value(mask, rect, cx, cy, threshold) {
            1 | 5 | 13 => (0, -1),
            8 | 10 | 11 => (0, 1),
            4 | 12 | 14 => (-1, 0),
            2 | 3 | 7 => (1, 0),
            9 => {
                if visited9.remove(&(cx, cy)) {
                    (0, 1)
                } else {
                    visited9.insert((cx, cy));
                    (0, -1)
                }
            }
            6 => {
                if visited6.remove(&(cx, cy)) {
                    (-1, 0)
                } else {
                    visited6.insert((cx, cy));
                    (1, 0)
                }
            }
            sv => {
                warn!(sv, points = points.len(), "marching squares hit an empty or full square");
                return points;
            }
        };
        cx += step.0;
        cy += step.1;
        let p = Point::new((cx - rect.x as i64) as f32, (cy - rect.y as i64) as f32);
        if step == prev && !points.is_empty() {
            let last = points.len() - 1;
            points[last] = p;
        } else {
            points.push(p);
        }
        prev = step;
        steps += 1;
        if cx == sx && cy == sy {
            break;
        }
        if steps > max_steps {
            warn!(steps, "contour did not close");
            break;
        }
    }
    points
}
