use image::{DynamicImage, Rgba, RgbaImage};
use spritepack_core::model::{Point, Triangles};
use spritepack_core::polypack::{PlacedSet, PolyItem, triangles_overlap};
use spritepack_core::prelude::*;

/// Opaque lower-left triangle (x <= y) of a `size` square.
fn wedge(size: u32, tint: u8) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_fn(size, size, |x, y| {
        if x <= y {
            Rgba([tint, 80, 160, 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    }))
}

fn square(size: u32, tint: u8) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(size, size, Rgba([tint, 10, 10, 255])))
}

fn polygon_cfg() -> AtlasConfigBuilder {
    AtlasConfig::builder()
        .algorithm(PackAlgorithm::Polygon)
        .polygon_mode(true, 1.0)
        .sprite_border(0)
}

fn placed_triangles(f: &SpriteFrame) -> Vec<[Point; 3]> {
    let (dx, dy) = (f.frame.x as f32, f.frame.y as f32);
    f.triangles
        .triangles()
        .map(|t| t.map(|p| Point::new(p.x + dx, p.y + dy)))
        .collect()
}

fn tri(a: (f32, f32), b: (f32, f32), c: (f32, f32)) -> [Point; 3] {
    [Point::new(a.0, a.1), Point::new(b.0, b.1), Point::new(c.0, c.1)]
}

#[test]
fn triangle_overlap_cases() {
    let base = tri((0.0, 0.0), (4.0, 0.0), (0.0, 4.0));
    assert!(triangles_overlap(&base, &tri((1.0, 1.0), (5.0, 1.0), (1.0, 5.0))));
    assert!(!triangles_overlap(&base, &tri((10.0, 10.0), (12.0, 10.0), (10.0, 12.0))));
    // shared hypotenuse only touches
    assert!(!triangles_overlap(&base, &tri((4.0, 0.0), (4.0, 4.0), (0.0, 4.0))));
    // containment
    assert!(triangles_overlap(&base, &tri((0.5, 0.5), (1.0, 0.5), (0.5, 1.0))));
}

#[test]
fn placed_set_rejects_overlapping_offsets() {
    let mut mesh = Triangles::default();
    mesh.verts = vec![
        Point::new(0.0, 0.0),
        Point::new(10.0, 0.0),
        Point::new(10.0, 10.0),
        Point::new(0.0, 10.0),
    ];
    mesh.indices = vec![0, 1, 2, 0, 2, 3];
    let item = PolyItem {
        size: (10, 10),
        mesh: &mesh,
    };

    let mut set = PlacedSet::new();
    assert_eq!(set.try_place(&item, 5, (100, 100)), Some((0, 0)));
    set.insert(&item, (0, 0));
    let next = set.try_place(&item, 5, (100, 100)).expect("room left");
    assert!(next.0 >= 10 || next.1 >= 10, "{next:?} overlaps the first square");
    assert_eq!(set.try_place(&item, 5, (10, 10)), None);
}

#[test]
fn wedges_pack_without_overlapping_triangles() {
    let inputs = vec![
        InputImage::new("w1", wedge(32, 10)),
        InputImage::new("w2", wedge(32, 20)),
        InputImage::new("w3", wedge(24, 30)),
    ];
    let mut job = AtlasJob::from_images(inputs, polygon_cfg().build()).expect("valid job");
    assert_eq!(job.generate(), Outcome::Success);

    let (aw, ah) = job.image().expect("image").dimensions();
    let frames: Vec<&SpriteFrame> = job.sprite_frames().expect("frames").values().collect();
    assert_eq!(frames.len(), 3);
    for f in &frames {
        assert!(!f.rotated);
        assert!(!f.triangles.is_empty());
        assert!(f.frame.x + f.frame.w <= aw && f.frame.y + f.frame.h <= ah);
    }
    for i in 0..frames.len() {
        for j in i + 1..frames.len() {
            let (a, b) = (placed_triangles(frames[i]), placed_triangles(frames[j]));
            for ta in &a {
                for tb in &b {
                    assert!(!triangles_overlap(ta, tb), "frames {i} and {j} overlap");
                }
            }
        }
    }
}

#[test]
fn polygon_atlas_respects_texture_border() {
    let cfg = polygon_cfg().texture_border(4).build();
    let mut job = AtlasJob::from_images(vec![InputImage::new("w", wedge(16, 1))], cfg)
        .expect("valid job");
    assert_eq!(job.generate(), Outcome::Success);
    let f = &job.sprite_frames().expect("frames")["w"];
    assert_eq!((f.frame.x, f.frame.y), (4, 4));
    assert_eq!(job.image().expect("image").dimensions(), (24, 24));
}

#[test]
fn unplaceable_items_are_dropped() {
    let inputs = vec![
        InputImage::new("a", square(32, 1)),
        InputImage::new("b", square(32, 2)),
    ];
    let cfg = polygon_cfg().max_texture_size(40).build();
    let mut job = AtlasJob::from_images(inputs, cfg).expect("valid job");
    assert_eq!(job.generate(), Outcome::Success);

    let result = job.result().expect("result");
    assert_eq!(result.dropped, vec!["b".to_string()]);
    assert!(result.frames.contains_key("a"));
    assert!(!result.frames.contains_key("b"));
}

#[test]
fn nothing_placeable_exceeds_the_limit() {
    let cfg = polygon_cfg().max_texture_size(16).build();
    let mut job = AtlasJob::from_images(vec![InputImage::new("a", square(32, 1))], cfg)
        .expect("valid job");
    assert_eq!(job.generate(), Outcome::SizeLimitExceeded);
    assert!(job.image().is_none());
}

#[test]
fn polygon_mode_with_rect_algorithm_carries_meshes() {
    let cfg = AtlasConfig::builder().polygon_mode(true, 1.0).build();
    let mut job = AtlasJob::from_images(vec![InputImage::new("w", wedge(20, 5))], cfg)
        .expect("valid job");
    assert_eq!(job.generate(), Outcome::Success);
    let f = &job.sprite_frames().expect("frames")["w"];
    assert!(!f.triangles.is_empty());
}

#[test]
fn aliases_share_the_canonical_mesh() {
    let inputs = vec![
        InputImage::new("a", wedge(20, 9)),
        InputImage::new("b", wedge(20, 9)),
    ];
    let mut job = AtlasJob::from_images(inputs, polygon_cfg().build()).expect("valid job");
    assert_eq!(job.generate(), Outcome::Success);
    let frames = job.sprite_frames().expect("frames");
    assert_eq!(frames["a"].triangles, frames["b"].triangles);
    assert_eq!(frames["a"].frame, frames["b"].frame);
}

#[test]
fn sprite_border_does_not_pad_polygon_placement() {
    let run = |sb: u32| {
        let cfg = polygon_cfg().sprite_border(sb).build();
        let inputs = vec![
            InputImage::new("a", wedge(16, 1)),
            InputImage::new("b", wedge(16, 2)),
        ];
        let mut job = AtlasJob::from_images(inputs, cfg).expect("valid job");
        assert_eq!(job.generate(), Outcome::Success);
        let frames = job.sprite_frames().expect("frames").clone();
        (job.image().expect("image").dimensions(), frames)
    };
    let (dims0, frames0) = run(0);
    let (dims4, frames4) = run(4);
    assert_eq!(dims0, dims4);
    for (name, f) in &frames0 {
        assert_eq!(f.frame, frames4[name].frame, "{name}");
    }
}
