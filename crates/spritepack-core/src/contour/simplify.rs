use crate::model::Point;
use tracing::debug;

/// Distance from `p` to the infinite line through `a` and `b`
/// (distance to `a` when the two coincide).
pub fn perpendicular_distance(p: Point, a: Point, b: Point) -> f32 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len = (dx * dx + dy * dy).sqrt();
    if len == 0.0 {
        return ((p.x - a.x).powi(2) + (p.y - a.y).powi(2)).sqrt();
    }
    (dy * p.x - dx * p.y + b.x * a.y - b.y * a.x).abs() / len
}

/// Distance from `p` to the segment `a..b`.
pub fn segment_distance(p: Point, a: Point, b: Point) -> f32 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len2 = dx * dx + dy * dy;
    let t = if len2 == 0.0 {
        0.0
    } else {
        (((p.x - a.x) * dx + (p.y - a.y) * dy) / len2).clamp(0.0, 1.0)
    };
    let (qx, qy) = (a.x + t * dx, a.y + t * dy);
    ((p.x - qx).powi(2) + (p.y - qy).powi(2)).sqrt()
}

/// Ramer–Douglas–Peucker over an open polyline; endpoints are always kept.
pub fn rdp(points: &[Point], epsilon: f32) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let first = points[0];
    let last = points[points.len() - 1];
    let mut index = 0;
    let mut dist = 0.0f32;
    for (i, p) in points.iter().enumerate().take(points.len() - 1).skip(1) {
        let d = perpendicular_distance(*p, first, last);
        if d > dist {
            dist = d;
            index = i;
        }
    }
    if dist > epsilon {
        let mut left = rdp(&points[..=index], epsilon);
        let right = rdp(&points[index..], epsilon);
        left.extend_from_slice(&right[1..]);
        left
    } else {
        vec![first, last]
    }
}

/// Simplifies a traced outline with `epsilon` clamped to `[0, min(w, h) / 2]`.
///
/// Outlines under 3 points are rejected (empty result); outlines under 9 points are
/// returned unchanged.
pub fn reduce(points: &[Point], size: (u32, u32), epsilon: f32) -> Vec<Point> {
    if points.len() < 3 {
        debug!(epsilon, "cannot reduce an outline with less than 3 points");
        return Vec::new();
    }
    if points.len() < 9 {
        return points.to_vec();
    }
    let max_ep = size.0.min(size.1) as f32 / 2.0;
    let ep = epsilon.clamp(0.0, max_ep);
    let mut result = rdp(points, ep);

    // the outline is closed: fold a last point that landed next to the first one
    if let (Some(&first), Some(&last)) = (result.first(), result.last()) {
        let manhattan = (last.x - first.x).abs() + (last.y - first.y).abs();
        if result.len() > 3 && last.y > first.y && manhattan < ep * 0.5 {
            result[0].y = last.y;
            result.pop();
        }
    }
    result
}
