use image::{DynamicImage, Rgba, RgbaImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use spritepack_core::canvas::{CanvasPlan, Probe, RectCanvasPacker, Stage};
use spritepack_core::prelude::*;

fn solid(w: u32, h: u32, c: [u8; 4]) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba(c)))
}

fn random_footprints(seed: u64, n: usize) -> Vec<(u32, u32)> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| (rng.gen_range(2..64), rng.gen_range(2..64)))
        .collect()
}

fn search(cfg: &AtlasConfig, footprints: &[(u32, u32)]) -> (Option<CanvasPlan>, Vec<Probe>) {
    let cancel = CancelToken::new();
    let mut packer = RectCanvasPacker::new(cfg, &cancel);
    let plan = packer.search(footprints).expect("not cancelled");
    (plan, packer.probes().to_vec())
}

#[test]
fn three_squares_fit_a_compact_atlas() {
    let inputs = vec![
        InputImage::new("red", solid(64, 64, [255, 0, 0, 255])),
        InputImage::new("green", solid(64, 64, [0, 255, 0, 255])),
        InputImage::new("blue", solid(64, 64, [0, 0, 255, 255])),
    ];
    let cfg = AtlasConfig::builder().sprite_border(2).texture_border(0).build();
    let mut job = AtlasJob::from_images(inputs, cfg).expect("valid job");
    assert_eq!(job.generate(), Outcome::Success);

    let frames = job.sprite_frames().expect("frames");
    assert_eq!(frames.len(), 3);
    assert!(job.identical_frames().is_empty());
    for f in frames.values() {
        assert_eq!((f.frame.w, f.frame.h), (64, 64));
    }
    let (w, h) = job.image().expect("image").dimensions();
    assert!(w * h <= 2 * 198 * 66, "atlas {w}x{h} too large");
    assert!(w >= 66 && h >= 66);
}

#[test]
fn size_limit_is_reported() {
    let inputs = vec![
        InputImage::new("a", solid(64, 64, [255, 0, 0, 255])),
        InputImage::new("b", solid(64, 64, [0, 0, 255, 255])),
    ];
    let cfg = AtlasConfig::builder()
        .sprite_border(2)
        .max_texture_size(16)
        .build();
    let mut job = AtlasJob::from_images(inputs, cfg).expect("valid job");
    assert_eq!(job.generate(), Outcome::SizeLimitExceeded);
    assert!(job.image().is_none());
    assert!(job.sprite_frames().is_none());
}

#[test]
fn growth_never_probes_a_smaller_area() {
    let footprints = random_footprints(3, 50);
    let (plan, probes) = search(&AtlasConfig::default(), &footprints);
    assert!(plan.is_some());

    let grow: Vec<&Probe> = probes.iter().filter(|p| p.stage == Stage::Grow).collect();
    assert!(!grow.is_empty());
    for pair in grow.windows(2) {
        assert!(!pair[0].fits, "growth stops at the first fit");
        let a0 = pair[0].width as u64 * pair[0].height as u64;
        let a1 = pair[1].width as u64 * pair[1].height as u64;
        assert!(a1 >= a0, "growth shrank from {a0} to {a1}");
    }
    assert!(grow.last().is_some_and(|p| p.fits));
}

#[test]
fn shrinking_never_grows_a_dimension() {
    for seed in 0..5 {
        let footprints = random_footprints(seed, 30);
        let (plan, probes) = search(&AtlasConfig::default(), &footprints);
        let plan = plan.expect("fits in 8192");

        let grown = probes
            .iter()
            .rev()
            .find(|p| p.stage == Stage::Grow)
            .expect("growth probe");
        let (mut w, mut h) = (grown.width, grown.height);
        for p in probes.iter().filter(|p| p.stage != Stage::Grow) {
            match p.stage {
                Stage::ShrinkWidth => {
                    assert!(p.width < w && p.height == h, "{p:?} after {w}x{h}");
                    if p.fits {
                        w = p.width;
                    }
                }
                Stage::ShrinkHeight => {
                    assert!(p.height < h && p.width == w, "{p:?} after {w}x{h}");
                    if p.fits {
                        h = p.height;
                    }
                }
                Stage::Grow => unreachable!(),
            }
        }
        assert_eq!((plan.width, plan.height), (w, h));
    }
}

#[test]
fn placements_stay_inside_the_plan() {
    let footprints = random_footprints(11, 40);
    let cfg = AtlasConfig::builder().texture_border(3).build();
    let (plan, _) = search(&cfg, &footprints);
    let plan = plan.expect("fits");
    assert_eq!(plan.placements.len(), footprints.len());
    for (p, &(w, h)) in plan.placements.iter().zip(&footprints) {
        let (pw, ph) = if p.rotated { (h, w) } else { (w, h) };
        assert_eq!((p.rect.w, p.rect.h), (pw, ph));
        assert!(p.rect.x + p.rect.w + 6 <= plan.width);
        assert!(p.rect.y + p.rect.h + 6 <= plan.height);
    }
}

#[test]
fn pow2_probes_only_powers_of_two() {
    let footprints = random_footprints(5, 25);
    let cfg = AtlasConfig::builder().pow2(true).build();
    let (plan, probes) = search(&cfg, &footprints);
    let plan = plan.expect("fits");
    for p in &probes {
        assert!(p.width.is_power_of_two() && p.height.is_power_of_two(), "{p:?}");
    }
    assert!(plan.width.is_power_of_two() && plan.height.is_power_of_two());
}

#[test]
fn squared_probes_keep_width_equal_height() {
    let footprints = random_footprints(9, 25);
    let cfg = AtlasConfig::builder().force_squared(true).build();
    let (plan, probes) = search(&cfg, &footprints);
    let plan = plan.expect("fits");
    assert!(probes.iter().all(|p| p.width == p.height));
    assert_eq!(plan.width, plan.height);
}

#[test]
fn single_footprint_at_the_limit_fits_exactly() {
    let cfg = AtlasConfig::builder().max_texture_size(64).build();
    let (plan, _) = search(&cfg, &[(64, 64)]);
    let plan = plan.expect("exact fit");
    assert_eq!((plan.width, plan.height), (64, 64));

    let (plan, probes) = search(&cfg, &[(65, 64)]);
    assert!(plan.is_none());
    assert!(probes.iter().all(|p| !p.fits));
}

#[test]
fn long_strip_shrinks_to_its_footprint() {
    // footprint 400x5: the height ends far below the shrink step
    let inputs = vec![InputImage::new("strip", solid(399, 4, [30, 60, 90, 255]))];
    let mut job = AtlasJob::from_images(inputs, AtlasConfig::default()).expect("valid job");
    assert_eq!(job.generate(), Outcome::Success);
    assert_eq!(job.image().expect("image").dimensions(), (400, 5));
    let f = &job.sprite_frames().expect("frames")["strip"];
    assert_eq!((f.frame.w, f.frame.h), (399, 4));
}

#[test]
fn shrink_keeps_halving_when_the_step_exceeds_the_side() {
    for footprint in [(400, 10), (641, 5), (800, 5)] {
        let (plan, probes) = search(&AtlasConfig::default(), &[footprint]);
        let plan = plan.expect("fits");
        assert_eq!((plan.width, plan.height), footprint, "{footprint:?}");
        let last = probes.last().expect("probes");
        assert!(!last.fits, "search ends on a failed step-1 probe");
    }
}
