use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Axis-aligned rectangle (pixels). `x,y` is top-left; `w,h` are sizes.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }
    /// Inclusive right edge coordinate (`x + w - 1`).
    pub fn right(&self) -> u32 {
        self.x + self.w.saturating_sub(1)
    }
    /// Inclusive bottom edge coordinate (`y + h - 1`).
    pub fn bottom(&self) -> u32 {
        self.y + self.h.saturating_sub(1)
    }
    /// Returns true if `r` is fully inside `self` (inclusive edges).
    pub fn contains(&self, r: &Rect) -> bool {
        r.x >= self.x && r.y >= self.y && r.right() <= self.right() && r.bottom() <= self.bottom()
    }
    /// True if the two rectangles share at least one pixel.
    pub fn intersects(&self, r: &Rect) -> bool {
        self.w > 0
            && self.h > 0
            && r.w > 0
            && r.h > 0
            && self.x < r.x + r.w
            && r.x < self.x + self.w
            && self.y < r.y + r.h
            && r.y < self.y + self.h
    }
    pub fn area(&self) -> u64 {
        self.w as u64 * self.h as u64
    }
}

/// 2D point in floating-point pixel space (mesh vertices, polygon offsets).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Triangle mesh local to a sprite's trimmed content.
///
/// `indices.len()` is always a multiple of 3 and every index is `< verts.len()`.
/// `debug_points` holds the raw outline points the mesh was built from.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Triangles {
    pub verts: Vec<Point>,
    pub indices: Vec<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub debug_points: Vec<Point>,
}

impl Triangles {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Appends `other`, rebasing its indices onto this vertex list.
    pub fn add(&mut self, other: &Triangles) {
        let base = self.verts.len() as u32;
        self.verts.extend_from_slice(&other.verts);
        self.indices.extend(other.indices.iter().map(|i| i + base));
        self.debug_points.extend_from_slice(&other.debug_points);
    }

    /// Iterates the triangles as vertex triples.
    pub fn triangles(&self) -> impl Iterator<Item = [Point; 3]> + '_ {
        self.indices.chunks_exact(3).map(|t| {
            [
                self.verts[t[0] as usize],
                self.verts[t[1] as usize],
                self.verts[t[2] as usize],
            ]
        })
    }

    /// Bounding box `(min, max)` of all vertices, `None` for an empty mesh.
    pub fn bounds(&self) -> Option<(Point, Point)> {
        let first = *self.verts.first()?;
        let mut min = first;
        let mut max = first;
        for v in &self.verts {
            min.x = min.x.min(v.x);
            min.y = min.y.min(v.y);
            max.x = max.x.max(v.x);
            max.y = max.y.max(v.y);
        }
        Some((min, max))
    }
}

/// Placement metadata for one logical sprite name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpriteFrame {
    /// Placed rectangle within the atlas (post-rotation width/height, sprite border excluded).
    pub frame: Rect,
    /// Center delta between trimmed content and original image (y axis up).
    pub offset: (i32, i32),
    /// True if the content was rotated 90° clockwise when placed.
    pub rotated: bool,
    /// Trim rectangle within the original image.
    pub source_color_rect: Rect,
    /// Original (untrimmed) image size.
    pub source_size: (u32, u32),
    /// Mesh in trimmed-local coordinates; empty in rect mode.
    #[serde(default)]
    pub triangles: Triangles,
}

/// Result of a `generate()` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    /// No canvas within `max_texture_size` could hold the content.
    SizeLimitExceeded,
    /// Cancelled through the job's `CancelToken`.
    Aborted,
    /// Every source was skipped; nothing to pack.
    Empty,
}

impl Outcome {
    pub fn is_success(self) -> bool {
        matches!(self, Outcome::Success)
    }
}

/// Composed atlas plus metadata. Read-only once returned.
#[derive(Debug, Clone)]
pub struct AtlasResult {
    pub image: RgbaImage,
    pub frames: BTreeMap<String, SpriteFrame>,
    /// Canonical name -> names pixel-identical to it.
    pub aliases: BTreeMap<String, Vec<String>>,
    /// Names that could not be placed (polygon mode only).
    pub dropped: Vec<String>,
}

impl AtlasResult {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Computes packing statistics for this atlas.
    pub fn stats(&self) -> AtlasStats {
        // aliases of a dropped canonical have no frame
        let alias_names = self
            .aliases
            .values()
            .flatten()
            .filter(|name| self.frames.contains_key(name.as_str()))
            .count();
        let mut used_frame_area = 0u64;
        let mut num_rotated = 0;
        let mut num_trimmed = 0;
        for (name, f) in &self.frames {
            if self.is_alias(name) {
                continue;
            }
            used_frame_area += f.frame.area();
            if f.rotated {
                num_rotated += 1;
            }
            if (f.source_color_rect.w, f.source_color_rect.h) != f.source_size {
                num_trimmed += 1;
            }
        }
        let atlas_area = self.width() as u64 * self.height() as u64;
        let occupancy = if atlas_area > 0 {
            used_frame_area as f64 / atlas_area as f64
        } else {
            0.0
        };
        AtlasStats {
            width: self.width(),
            height: self.height(),
            num_frames: self.frames.len(),
            num_packed: self.frames.len().saturating_sub(alias_names),
            num_aliases: alias_names,
            num_rotated,
            num_trimmed,
            num_dropped: self.dropped.len(),
            atlas_area,
            used_frame_area,
            occupancy,
        }
    }

    fn is_alias(&self, name: &str) -> bool {
        self.aliases.values().any(|v| v.iter().any(|a| a == name))
    }
}

/// Statistics about atlas packing efficiency.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AtlasStats {
    pub width: u32,
    pub height: u32,
    /// Every logical name in the frame map, aliases included.
    pub num_frames: usize,
    /// Frames that own pixels in the atlas.
    pub num_packed: usize,
    pub num_aliases: usize,
    pub num_rotated: usize,
    pub num_trimmed: usize,
    pub num_dropped: usize,
    pub atlas_area: u64,
    /// Sum of packed frame areas (aliases excluded).
    pub used_frame_area: u64,
    /// used_frame_area / atlas_area (0.0 to 1.0). Higher is better.
    pub occupancy: f64,
}

impl AtlasStats {
    /// Returns a human-readable summary of the statistics.
    pub fn summary(&self) -> String {
        format!(
            "Size: {}x{}, Frames: {} ({} packed, {} aliases), Occupancy: {:.2}%, Rotated: {}, Trimmed: {}, Dropped: {}",
            self.width,
            self.height,
            self.num_frames,
            self.num_packed,
            self.num_aliases,
            self.occupancy * 100.0,
            self.num_rotated,
            self.num_trimmed,
            self.num_dropped,
        )
    }

    /// Returns wasted space in pixels.
    pub fn wasted_area(&self) -> u64 {
        self.atlas_area.saturating_sub(self.used_frame_area)
    }
}
