use image::{Rgba, RgbaImage};
use spritepack_core::contour::{self, offset, simplify, triangulate};
use spritepack_core::model::{Point, Rect, Triangles};
use spritepack_core::trim::compute_trim_rect;

fn blocks(w: u32, h: u32, rects: &[Rect]) -> RgbaImage {
    let mut img = RgbaImage::new(w, h);
    for r in rects {
        for y in r.y..r.y + r.h {
            for x in r.x..r.x + r.w {
                img.put_pixel(x, y, Rgba([255, 255, 255, 255]));
            }
        }
    }
    img
}

fn mesh_area(t: &Triangles) -> f64 {
    t.triangles()
        .map(|[a, b, c]| {
            (((b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y)) as f64 / 2.0).abs()
        })
        .sum()
}

fn assert_valid(t: &Triangles) {
    assert_eq!(t.indices.len() % 3, 0);
    assert!(t.indices.iter().all(|&i| (i as usize) < t.verts.len()));
}

#[test]
fn square_becomes_two_triangles_covering_it() {
    let img = blocks(20, 20, &[Rect::new(5, 5, 10, 10)]);
    let rect = compute_trim_rect(&img, 1);
    assert_eq!(rect, Rect::new(5, 5, 10, 10));

    let mesh = contour::generate_triangles(&img, rect, 2.0, 1);
    assert_valid(&mesh);
    assert!(mesh.triangle_count() >= 2);
    assert!((mesh_area(&mesh) - 100.0).abs() < 0.5, "area {}", mesh_area(&mesh));
    for v in &mesh.verts {
        assert!((0.0..=10.0).contains(&v.x) && (0.0..=10.0).contains(&v.y), "{v:?}");
    }
    assert!(!mesh.debug_points.is_empty());
}

#[test]
fn far_apart_blobs_stay_separate() {
    let img = blocks(40, 20, &[Rect::new(2, 2, 6, 6), Rect::new(30, 10, 6, 6)]);
    let rect = compute_trim_rect(&img, 1);
    assert_eq!(rect, Rect::new(2, 2, 34, 14));

    let found = contour::extract_polygons(&img, rect, 1.0, 1);
    assert_eq!(found.polygons.len(), 2);

    let mesh = contour::generate_triangles(&img, rect, 1.0, 1);
    assert_valid(&mesh);
    assert!(mesh.triangle_count() >= 4);
    assert!((mesh_area(&mesh) - 98.0).abs() < 1.0, "area {}", mesh_area(&mesh));
}

#[test]
fn nearby_blobs_merge_into_one_outline() {
    let img = blocks(14, 6, &[Rect::new(0, 0, 6, 6), Rect::new(7, 0, 6, 6)]);
    let rect = compute_trim_rect(&img, 1);
    let found = contour::extract_polygons(&img, rect, 2.0, 1);
    assert_eq!(found.polygons.len(), 1);
}

#[test]
fn diagonal_pixels_terminate_with_a_valid_mesh() {
    let mut img = RgbaImage::new(4, 4);
    for i in 0..4 {
        img.put_pixel(i, i, Rgba([0, 0, 0, 255]));
    }
    let rect = Rect::new(0, 0, 4, 4);
    let mesh = contour::generate_triangles(&img, rect, 1.0, 1);
    assert_valid(&mesh);
    assert!(!mesh.is_empty());
}

#[test]
fn transparent_content_yields_empty_mesh() {
    let img = RgbaImage::new(16, 16);
    let rect = compute_trim_rect(&img, 1);
    let mesh = contour::generate_triangles(&img, rect, 2.0, 1);
    assert!(mesh.is_empty());
    assert!(mesh.verts.is_empty());
}

#[test]
fn concave_polygon_triangulates_inside_only() {
    let l_shape = [
        Point::new(0.0, 0.0),
        Point::new(4.0, 0.0),
        Point::new(4.0, 1.0),
        Point::new(1.0, 1.0),
        Point::new(1.0, 4.0),
        Point::new(0.0, 4.0),
    ];
    let mesh = triangulate::triangulate(&l_shape);
    assert_valid(&mesh);
    assert_eq!(mesh.triangle_count(), 4);
    assert!((mesh_area(&mesh) - 7.0).abs() < 1e-4);
    assert_eq!(mesh.verts.len(), 6, "coincident corners share one vertex");
}

#[test]
fn degenerate_outline_does_not_triangulate() {
    let two = [Point::new(0.0, 0.0), Point::new(3.0, 3.0)];
    assert!(triangulate::triangulate(&two).is_empty());
}

#[test]
fn reduce_keeps_short_outlines_and_drops_collinear_points() {
    let short: Vec<Point> = (0..5).map(|i| Point::new(i as f32, 0.0)).collect();
    assert_eq!(simplify::reduce(&short, (10, 10), 1.0), short);

    let mut line: Vec<Point> = (0..=10).map(|i| Point::new(i as f32, 0.0)).collect();
    line.extend((1..=10).map(|i| Point::new(10.0, i as f32)));
    let reduced = simplify::reduce(&line, (20, 20), 0.5);
    assert_eq!(
        reduced,
        vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(10.0, 10.0)]
    );

    assert!(simplify::reduce(&line[..2], (20, 20), 0.5).is_empty());
}

#[test]
fn expand_is_clamped_to_the_sprite() {
    let square = [
        Point::new(2.0, 2.0),
        Point::new(6.0, 2.0),
        Point::new(6.0, 6.0),
        Point::new(2.0, 6.0),
    ];
    let grown = offset::expand(&square, (8, 8), 1.0);
    assert!((offset::polygon_area(&grown) - 36.0).abs() < 1e-3);

    let clamped = offset::expand(&square, (8, 8), 4.0);
    assert!((offset::polygon_area(&clamped) - 64.0).abs() < 1e-3);
    for p in &clamped {
        assert!((0.0..=8.0).contains(&p.x) && (0.0..=8.0).contains(&p.y));
    }
}
