use crate::model::Point;
use geo::{Area, BooleanOps, ConvexHull, Coord, Intersects, LineString, MultiPolygon, Polygon};
use tracing::debug;

/// Output coordinates are snapped to this many steps per pixel.
const PRECISION: f64 = 10.0;
/// Corners whose miter would reach further than this many offsets get beveled.
const MITER_LIMIT: f32 = 2.0;

/// Shoelace area; the sign follows the winding.
pub fn signed_area(points: &[Point]) -> f64 {
    let n = points.len();
    let mut acc = 0.0f64;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        acc += a.x as f64 * b.y as f64 - b.x as f64 * a.y as f64;
    }
    acc * 0.5
}

pub fn polygon_area(points: &[Point]) -> f64 {
    signed_area(points).abs()
}

/// Even-odd ray cast.
pub fn point_in_polygon(p: Point, poly: &[Point]) -> bool {
    let n = poly.len();
    let mut inside = false;
    let mut j = n.wrapping_sub(1);
    for i in 0..n {
        let (a, b) = (poly[i], poly[j]);
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

pub fn to_geo(points: &[Point]) -> Polygon<f64> {
    let ring: Vec<Coord<f64>> = points
        .iter()
        .map(|p| Coord {
            x: p.x as f64,
            y: p.y as f64,
        })
        .collect();
    Polygon::new(LineString::from(ring), vec![])
}

/// Exterior ring of `poly` without the closing point, snapped to `PRECISION`.
pub fn from_geo(poly: &Polygon<f64>) -> Vec<Point> {
    let coords = &poly.exterior().0;
    let n = match (coords.first(), coords.last()) {
        (Some(f), Some(l)) if coords.len() > 1 && f == l => coords.len() - 1,
        _ => coords.len(),
    };
    coords[..n]
        .iter()
        .map(|c| {
            Point::new(
                ((c.x * PRECISION).round() / PRECISION) as f32,
                ((c.y * PRECISION).round() / PRECISION) as f32,
            )
        })
        .collect()
}

fn largest(mp: MultiPolygon<f64>) -> Option<Polygon<f64>> {
    mp.0.into_iter().max_by(|a, b| {
        a.unsigned_area()
            .partial_cmp(&b.unsigned_area())
            .unwrap_or(std::cmp::Ordering::Equal)
    })
}

fn dedup_ring(points: &[Point]) -> Vec<Point> {
    let mut out: Vec<Point> = Vec::with_capacity(points.len());
    for &p in points {
        if out.last() != Some(&p) {
            out.push(p);
        }
    }
    while out.len() > 1 && out.first() == out.last() {
        out.pop();
    }
    out
}

/// Offsets a closed ring outward by `delta` with miter joins (beveled past `MITER_LIMIT`).
pub fn miter_offset(points: &[Point], delta: f32) -> Vec<Point> {
    let n = points.len();
    let outward_sign = if signed_area(points) > 0.0 { 1.0 } else { -1.0 };
    let normal = |a: Point, b: Point| -> (f32, f32) {
        let (dx, dy) = (b.x - a.x, b.y - a.y);
        let len = (dx * dx + dy * dy).sqrt().max(f32::EPSILON);
        (outward_sign * dy / len, -outward_sign * dx / len)
    };
    let mut out = Vec::with_capacity(n + n / 2);
    for i in 0..n {
        let prev = points[(i + n - 1) % n];
        let cur = points[i];
        let next = points[(i + 1) % n];
        let n1 = normal(prev, cur);
        let n2 = normal(cur, next);
        let (mx, my) = (n1.0 + n2.0, n1.1 + n2.1);
        let m2 = mx * mx + my * my;
        // |n1 + n2| == 2 cos(half angle)
        let cos_half = m2.sqrt() * 0.5;
        if cos_half * MITER_LIMIT < 1.0 {
            out.push(Point::new(cur.x + n1.0 * delta, cur.y + n1.1 * delta));
            out.push(Point::new(cur.x + n2.0 * delta, cur.y + n2.1 * delta));
        } else {
            let k = 2.0 * delta / m2;
            out.push(Point::new(cur.x + mx * k, cur.y + my * k));
        }
    }
    out
}

/// Inflates a simplified outline by `epsilon`, clamps it to the `size` rectangle at the
/// origin and resolves self-overlap into one simple polygon (the largest piece).
pub fn expand(points: &[Point], size: (u32, u32), epsilon: f32) -> Vec<Point> {
    let ring = dedup_ring(points);
    if ring.len() < 3 {
        debug!(epsilon, "cannot expand an outline with less than 3 points");
        return Vec::new();
    }
    let offset = if epsilon > 0.0 {
        miter_offset(&ring, epsilon)
    } else {
        ring
    };
    let clamp = geo::Rect::new(
        Coord { x: 0.0, y: 0.0 },
        Coord {
            x: size.0 as f64,
            y: size.1 as f64,
        },
    )
    .to_polygon();
    match largest(to_geo(&offset).intersection(&clamp)) {
        Some(poly) => dedup_ring(&from_geo(&poly)),
        None => {
            debug!("offset outline vanished after clamping");
            Vec::new()
        }
    }
}

/// Unions two outlines. Disjoint union pieces are covered by their convex hull.
pub fn union(a: &[Point], b: &[Point]) -> Vec<Point> {
    let merged = to_geo(a).union(&to_geo(b));
    let poly = if merged.0.len() > 1 {
        merged.convex_hull()
    } else {
        match largest(merged) {
            Some(p) => p,
            None => return a.to_vec(),
        }
    };
    dedup_ring(&from_geo(&poly))
}

/// Greedily merges outlines whose convex hulls intersect until no pair does.
pub fn merge_polygons(mut polys: Vec<Vec<Point>>) -> Vec<Vec<Point>> {
    loop {
        let mut merged = None;
        'search: for i in 0..polys.len() {
            let hull_i = to_geo(&polys[i]).convex_hull();
            for j in i + 1..polys.len() {
                if hull_i.intersects(&to_geo(&polys[j]).convex_hull()) {
                    merged = Some((i, j));
                    break 'search;
                }
            }
        }
        let Some((i, j)) = merged else {
            return polys;
        };
        let other = polys.remove(j);
        let joined = union(&polys[i], &other);
        if joined.len() >= 3 {
            polys[i] = joined;
        }
    }
}
