//! Polygon-mode placement.
//!
//! Items are placed one by one at grid-sampled offsets. A candidate offset is rejected
//! when any of its triangles overlaps a triangle of an already placed item; among the
//! accepted offsets the one giving the smallest overall bounding box wins.

use crate::cancel::{CancelToken, Cancelled};
use crate::canvas::next_pow2;
use crate::config::AtlasConfig;
use crate::model::{Point, Triangles};
use tracing::{debug, warn};

/// Projections closer than this count as touching, not overlapping.
const TOUCH_EPSILON: f32 = 1e-4;

/// One item to place: its trimmed size and its mesh (local to the trimmed content).
#[derive(Debug, Clone, Copy)]
pub struct PolyItem<'a> {
    pub size: (u32, u32),
    pub mesh: &'a Triangles,
}

/// Result of a polygon placement run.
#[derive(Debug, Clone)]
pub struct PolyPlan {
    /// Atlas size, texture border included.
    pub width: u32,
    pub height: u32,
    /// Indexed like the input items. `None` marks a dropped item. Offsets exclude the
    /// texture border.
    pub offsets: Vec<Option<(u32, u32)>>,
}

#[derive(Debug, Clone, Copy)]
struct Aabb {
    min: Point,
    max: Point,
}

impl Aabb {
    fn of(points: &[Point]) -> Self {
        let mut min = Point::new(f32::MAX, f32::MAX);
        let mut max = Point::new(f32::MIN, f32::MIN);
        for p in points {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        Self { min, max }
    }

    fn translated(&self, dx: f32, dy: f32) -> Self {
        Self {
            min: Point::new(self.min.x + dx, self.min.y + dy),
            max: Point::new(self.max.x + dx, self.max.y + dy),
        }
    }

    fn overlaps(&self, o: &Aabb) -> bool {
        self.min.x < o.max.x - TOUCH_EPSILON
            && o.min.x < self.max.x - TOUCH_EPSILON
            && self.min.y < o.max.y - TOUCH_EPSILON
            && o.min.y < self.max.y - TOUCH_EPSILON
    }
}

/// Triangles of one mesh with their boxes, in mesh-local coordinates.
struct Shape {
    tris: Vec<[Point; 3]>,
    boxes: Vec<Aabb>,
    bounds: Aabb,
}

impl Shape {
    fn new(mesh: &Triangles) -> Self {
        let tris: Vec<[Point; 3]> = mesh.triangles().collect();
        let boxes: Vec<Aabb> = tris.iter().map(|t| Aabb::of(t)).collect();
        let bounds = Aabb::of(&mesh.verts);
        Self { tris, boxes, bounds }
    }
}

/// Meshes placed so far, stored in placement space.
#[derive(Default)]
pub struct PlacedSet {
    tris: Vec<[Point; 3]>,
    boxes: Vec<Aabb>,
    items: Vec<(Aabb, std::ops::Range<usize>)>,
    /// Far corner of the union of the placed trimmed rects.
    extent: (u32, u32),
}

impl PlacedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// `(width, height)` of the union of everything placed, measured from the origin.
    pub fn extent(&self) -> (u32, u32) {
        self.extent
    }

    /// Finds the best collision-free grid offset for `item` keeping the union within
    /// `limit`, scanning rows top to bottom. Ties keep the first offset found.
    pub fn try_place(&self, item: &PolyItem<'_>, step: u32, limit: (u32, u32)) -> Option<(u32, u32)> {
        let shape = Shape::new(item.mesh);
        self.try_place_shape(&shape, item.size, step, limit)
    }

    fn try_place_shape(
        &self,
        shape: &Shape,
        size: (u32, u32),
        step: u32,
        limit: (u32, u32),
    ) -> Option<(u32, u32)> {
        if size.0 > limit.0 || size.1 > limit.1 {
            return None;
        }
        let step = step.max(1);
        let x_end = (self.extent.0 + step + size.0).min(limit.0 - size.0);
        let y_end = (self.extent.1 + step + size.1).min(limit.1 - size.1);

        let mut best: Option<((u32, u32), u64)> = None;
        for y in (0..=y_end).step_by(step as usize) {
            for x in (0..=x_end).step_by(step as usize) {
                let score = (self.extent.0.max(x + size.0)) as u64 * (self.extent.1.max(y + size.1)) as u64;
                if best.is_some_and(|(_, s)| score >= s) {
                    continue;
                }
                if !self.collides(shape, x as f32, y as f32) {
                    best = Some(((x, y), score));
                }
            }
        }
        best.map(|(offset, _)| offset)
    }

    fn collides(&self, shape: &Shape, dx: f32, dy: f32) -> bool {
        let bounds = shape.bounds.translated(dx, dy);
        for (item_box, range) in &self.items {
            if !item_box.overlaps(&bounds) {
                continue;
            }
            for (t, tb) in shape.tris.iter().zip(&shape.boxes) {
                let tb = tb.translated(dx, dy);
                if !tb.overlaps(item_box) {
                    continue;
                }
                let moved = t.map(|p| Point::new(p.x + dx, p.y + dy));
                for i in range.clone() {
                    if self.boxes[i].overlaps(&tb) && triangles_overlap(&moved, &self.tris[i]) {
                        return true;
                    }
                }
            }
        }
        false
    }

    fn insert_shape(&mut self, shape: &Shape, size: (u32, u32), offset: (u32, u32)) {
        let (dx, dy) = (offset.0 as f32, offset.1 as f32);
        let start = self.tris.len();
        for (t, b) in shape.tris.iter().zip(&shape.boxes) {
            self.tris.push(t.map(|p| Point::new(p.x + dx, p.y + dy)));
            self.boxes.push(b.translated(dx, dy));
        }
        self.items.push((shape.bounds.translated(dx, dy), start..self.tris.len()));
        self.extent = (
            self.extent.0.max(offset.0 + size.0),
            self.extent.1.max(offset.1 + size.1),
        );
    }

    /// Records `item` at `offset`.
    pub fn insert(&mut self, item: &PolyItem<'_>, offset: (u32, u32)) {
        self.insert_shape(&Shape::new(item.mesh), item.size, offset);
    }
}

/// Places triangle meshes by grid search.
pub struct PolygonCanvasPacker<'a> {
    cfg: &'a AtlasConfig,
    cancel: &'a CancelToken,
}

impl<'a> PolygonCanvasPacker<'a> {
    pub fn new(cfg: &'a AtlasConfig, cancel: &'a CancelToken) -> Self {
        Self { cfg, cancel }
    }

    /// Places `items` in descending mesh-bounds area. Items with no triangles or no
    /// valid offset are dropped with a warning.
    ///
    /// Returns `Ok(None)` when nothing could be placed or the rounded atlas size
    /// exceeds `max_texture_size`.
    pub fn pack(&self, items: &[PolyItem<'_>]) -> Result<Option<PolyPlan>, Cancelled> {
        let border = self.cfg.texture_border.saturating_mul(2);
        let inner = self.cfg.max_texture_size.saturating_sub(border);
        let limit = (inner, inner);

        let shapes: Vec<Shape> = items.iter().map(|it| Shape::new(it.mesh)).collect();
        let mut order: Vec<usize> = (0..items.len()).collect();
        order.sort_by(|&a, &b| {
            let area = |s: &Shape| {
                if s.tris.is_empty() {
                    0.0
                } else {
                    (s.bounds.max.x - s.bounds.min.x) * (s.bounds.max.y - s.bounds.min.y)
                }
            };
            area(&shapes[b])
                .partial_cmp(&area(&shapes[a]))
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut placed = PlacedSet::new();
        let mut offsets = vec![None; items.len()];
        for &i in &order {
            if self.cancel.is_cancelled() {
                debug!(placed = placed.items.len(), "polygon placement cancelled");
                return Err(Cancelled);
            }
            let item = &items[i];
            if shapes[i].tris.is_empty() {
                warn!(item = i, "item has no triangles, dropping it");
                continue;
            }
            match placed.try_place_shape(&shapes[i], item.size, self.cfg.polygon_step, limit) {
                Some(offset) => {
                    debug!(item = i, x = offset.0, y = offset.1, "polygon placed");
                    placed.insert_shape(&shapes[i], item.size, offset);
                    offsets[i] = Some(offset);
                }
                None => warn!(item = i, "no free offset for polygon, dropping it"),
            }
        }

        if placed.is_empty() {
            return Ok(None);
        }
        let (mut w, mut h) = placed.extent();
        w += border;
        h += border;
        if self.cfg.pow2 {
            w = next_pow2(w);
            h = next_pow2(h);
        }
        if self.cfg.force_squared {
            w = w.max(h);
            h = w;
        }
        if w > self.cfg.max_texture_size || h > self.cfg.max_texture_size {
            debug!(w, h, "rounded polygon atlas exceeds the size limit");
            return Ok(None);
        }
        Ok(Some(PolyPlan {
            width: w,
            height: h,
            offsets,
        }))
    }
}

/// Separating-axis test on the six edge normals. Triangles that only share an edge or
/// a vertex do not overlap.
pub fn triangles_overlap(a: &[Point; 3], b: &[Point; 3]) -> bool {
    !(has_separating_edge(a, b) || has_separating_edge(b, a))
}

fn has_separating_edge(a: &[Point; 3], b: &[Point; 3]) -> bool {
    for i in 0..3 {
        let (p, q) = (a[i], a[(i + 1) % 3]);
        let axis = (q.y - p.y, p.x - q.x);
        if axis.0 == 0.0 && axis.1 == 0.0 {
            continue;
        }
        let (a_min, a_max) = project(a, axis);
        let (b_min, b_max) = project(b, axis);
        let len = (axis.0 * axis.0 + axis.1 * axis.1).sqrt();
        let eps = TOUCH_EPSILON * len;
        if a_max <= b_min + eps || b_max <= a_min + eps {
            return true;
        }
    }
    false
}

fn project(t: &[Point; 3], axis: (f32, f32)) -> (f32, f32) {
    let mut lo = f32::MAX;
    let mut hi = f32::MIN;
    for p in t {
        let d = p.x * axis.0 + p.y * axis.1;
        lo = lo.min(d);
        hi = hi.max(d);
    }
    (lo, hi)
}
