use crate::model::{Point, Triangles};
use spade::{ConstrainedDelaunayTriangulation, Point2, Triangulation};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Constrained Delaunay triangulation of one simple polygon.
///
/// Every outline edge is inserted as a constraint; faces whose centroid falls outside
/// the outline are discarded. Coincident vertices share one index.
pub fn triangulate(points: &[Point]) -> Triangles {
    if points.len() < 3 {
        debug!("cannot triangulate with less than 3 points");
        return Triangles::default();
    }

    let mut cdt = ConstrainedDelaunayTriangulation::<Point2<f64>>::new();
    let mut handles = Vec::with_capacity(points.len());
    for p in points {
        match cdt.insert(Point2::new(p.x as f64, p.y as f64)) {
            Ok(h) => handles.push(h),
            Err(e) => {
                warn!(error = ?e, "vertex rejected by triangulation");
                return Triangles::default();
            }
        }
    }
    for i in 0..handles.len() {
        let (a, b) = (handles[i], handles[(i + 1) % handles.len()]);
        if a != b && cdt.can_add_constraint(a, b) {
            cdt.add_constraint(a, b);
        }
    }

    let mut tris = Triangles::default();
    let mut lookup: HashMap<(u32, u32), u32> = HashMap::new();
    for face in cdt.inner_faces() {
        let corners = face.vertices().map(|v| {
            let pos = v.position();
            Point::new(pos.x as f32, pos.y as f32)
        });
        let centroid = Point::new(
            (corners[0].x + corners[1].x + corners[2].x) / 3.0,
            (corners[0].y + corners[1].y + corners[2].y) / 3.0,
        );
        if !super::offset::point_in_polygon(centroid, points) {
            continue;
        }
        for c in corners {
            // + 0.0 folds -0.0 into 0.0
            let key = ((c.x + 0.0).to_bits(), (c.y + 0.0).to_bits());
            let idx = *lookup.entry(key).or_insert_with(|| {
                tris.verts.push(c);
                (tris.verts.len() - 1) as u32
            });
            tris.indices.push(idx);
        }
    }
    tris
}
