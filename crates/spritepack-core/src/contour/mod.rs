//! Outline extraction for polygon mode.
//!
//! Per trimmed sprite: trace opaque blobs with marching squares, simplify each outline
//! (Ramer–Douglas–Peucker), inflate it by `epsilon` and clamp it to the sprite, merge
//! outlines whose convex hulls touch, then triangulate every remaining simple polygon.

use crate::model::{Point, Rect, Triangles};
use image::RgbaImage;
use tracing::{debug, warn};

pub mod march;
pub mod offset;
pub mod simplify;
pub mod triangulate;

use march::AlphaMask;

/// Pen width (pixels) used when erasing a found outline from the scratch mask.
const ERASE_PEN: f32 = 2.0;

/// Outlines found in one sprite.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Simple polygons (simplified, inflated, merged), local to the trim rect.
    pub polygons: Vec<Vec<Point>>,
    /// Raw marching-squares points of every accepted trace.
    pub raw_points: Vec<Point>,
}

/// Builds the triangle mesh covering the opaque content of `rect` inside `image`.
///
/// Vertices are local to `rect`. Returns an empty mesh when no outline with at least
/// 3 points survives; the caller decides what to do with such items.
pub fn generate_triangles(image: &RgbaImage, rect: Rect, epsilon: f32, threshold: u8) -> Triangles {
    let extraction = extract_polygons(image, rect, epsilon, threshold);
    if extraction.polygons.is_empty() {
        warn!(?rect, "no polygon outline found");
        return Triangles::default();
    }

    let mut triangles = Triangles::default();
    for outline in &extraction.polygons {
        let tri = triangulate::triangulate(outline);
        if tri.is_empty() {
            debug!(points = outline.len(), "outline produced no triangles");
        } else {
            triangles.add(&tri);
        }
    }
    triangles.debug_points = extraction.raw_points;
    triangles
}

/// Traces every opaque blob of `rect` and returns the final simple polygons.
pub fn extract_polygons(image: &RgbaImage, rect: Rect, epsilon: f32, threshold: u8) -> Extraction {
    if rect.w == 0 || rect.h == 0 {
        return Extraction::default();
    }
    let size = (rect.w, rect.h);

    // First pass: only find the dominant outline, so a small island that happens to come
    // first in scan order never leads the extraction.
    let mut scratch = AlphaMask::from_image(image);
    let mut dominant: Option<((u32, u32), Vec<Point>)> = None;
    let mut dominant_area = 0.0f64;
    while let Some((start, raw)) = march::trace(&scratch, rect, threshold) {
        let outline = process(&raw, size, epsilon);
        erase(&mut scratch, rect, start, &outline, &raw);
        if outline.len() >= 3 {
            let area = offset::polygon_area(&outline);
            if area > dominant_area {
                dominant_area = area;
                dominant = Some((start, raw));
            }
        }
    }
    let Some((start, raw)) = dominant else {
        return Extraction::default();
    };

    // Second pass on fresh pixels, starting with the dominant outline.
    let mut scratch = AlphaMask::from_image(image);
    let mut extraction = Extraction::default();
    let mut next = Some((start, raw));
    while let Some((start, raw)) = next {
        let outline = process(&raw, size, epsilon);
        erase(&mut scratch, rect, start, &outline, &raw);
        if outline.len() >= 3 {
            extraction.polygons.push(outline);
            extraction.raw_points.extend_from_slice(&raw);
        } else {
            debug!(points = raw.len(), "outline dropped after simplification");
        }
        next = march::trace(&scratch, rect, threshold);
    }

    extraction.polygons = offset::merge_polygons(extraction.polygons);
    extraction
}

fn process(raw: &[Point], size: (u32, u32), epsilon: f32) -> Vec<Point> {
    let mut outline = raw.to_vec();
    if outline.len() >= 9 {
        outline = simplify::reduce(&outline, size, epsilon);
    }
    if outline.len() >= 3 {
        outline = offset::expand(&outline, size, epsilon);
    }
    outline
}

fn erase(scratch: &mut AlphaMask, rect: Rect, start: (u32, u32), outline: &[Point], raw: &[Point]) {
    let shape = if outline.len() >= 3 { outline } else { raw };
    scratch.erase_polygon(rect, shape, ERASE_PEN);
    // guarantees progress even when the shape missed its own start pixel
    scratch.clear(start.0, start.1);
}
