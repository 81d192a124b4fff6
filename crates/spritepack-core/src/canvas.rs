//! Canvas size search for rect mode.
//!
//! One guillotine pass per probe: grow a square guess until everything fits, then
//! shrink the width and the height back down while it still fits.

use crate::cancel::{CancelToken, Cancelled};
use crate::config::AtlasConfig;
use crate::packer::{Packer, Placement, guillotine::GuillotinePacker};
use tracing::debug;

/// Which loop of the search issued a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Grow,
    ShrinkWidth,
    ShrinkHeight,
}

/// One packing attempt at a given atlas size (texture border included).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Probe {
    pub stage: Stage,
    pub width: u32,
    pub height: u32,
    pub fits: bool,
}

/// Winning atlas size and the placement of every footprint.
#[derive(Debug, Clone)]
pub struct CanvasPlan {
    pub width: u32,
    pub height: u32,
    /// Indexed like the footprints passed to `search`; positions exclude the texture border.
    pub placements: Vec<Placement>,
}

/// Searches a near-minimal canvas that holds every footprint.
pub struct RectCanvasPacker<'a> {
    cfg: &'a AtlasConfig,
    cancel: &'a CancelToken,
    probes: Vec<Probe>,
}

impl<'a> RectCanvasPacker<'a> {
    pub fn new(cfg: &'a AtlasConfig, cancel: &'a CancelToken) -> Self {
        Self {
            cfg,
            cancel,
            probes: Vec::new(),
        }
    }

    /// Every probe issued so far, in order.
    pub fn probes(&self) -> &[Probe] {
        &self.probes
    }

    /// Runs the three-stage search over `footprints` (`(w, h)` incl. sprite border).
    ///
    /// Returns `Ok(None)` when nothing up to `max_texture_size` holds the footprints.
    pub fn search(&mut self, footprints: &[(u32, u32)]) -> Result<Option<CanvasPlan>, Cancelled> {
        let order = placement_order(footprints);
        let max = self.max_side();

        let volume: f64 = footprints
            .iter()
            .map(|&(w, h)| w as f64 * h as f64 * 1.02)
            .sum();
        let mut side = (volume.sqrt() as u32).clamp(1, max);
        if self.cfg.pow2 {
            side = next_pow2(side).min(max);
        }
        let (mut w, mut h) = (side, side);
        debug!(w, h, items = footprints.len(), "initial canvas guess");

        // growth
        let step = ((w + h) / 20).max(1);
        let mut grow_width = true;
        let mut best = loop {
            if let Some(found) = self.probe(Stage::Grow, w, h, footprints, &order)? {
                break found;
            }
            if w == max && h == max {
                debug!(max, "canvas search reached the size limit");
                return Ok(None);
            }
            if self.cfg.force_squared {
                w = self.grow(w, step, max);
                h = w;
            } else if grow_width {
                w = self.grow(w, step, max);
            } else {
                h = self.grow(h, step, max);
            }
            grow_width = !grow_width;
        };

        // width shrink (both axes when squared)
        let squared = self.cfg.force_squared;
        let mut step = ((w + h) / 20).max(1);
        loop {
            // a step that would empty the axis counts as a failed probe
            let attempt = match self.shrink(w, step) {
                Some(nw) => {
                    let nh = if squared { nw } else { h };
                    self.probe(Stage::ShrinkWidth, nw, nh, footprints, &order)?
                        .map(|found| (nw, nh, found))
                }
                None => None,
            };
            match attempt {
                Some((nw, nh, found)) => {
                    (w, h) = (nw, nh);
                    best = found;
                }
                None if !self.cfg.pow2 && step > 1 => step /= 2,
                None => break,
            }
        }

        // height shrink
        if !squared {
            let mut step = ((w + h) / 20).max(1);
            loop {
                let attempt = match self.shrink(h, step) {
                    Some(nh) => self
                        .probe(Stage::ShrinkHeight, w, nh, footprints, &order)?
                        .map(|found| (nh, found)),
                    None => None,
                };
                match attempt {
                    Some((nh, found)) => {
                        h = nh;
                        best = found;
                    }
                    None if !self.cfg.pow2 && step > 1 => step /= 2,
                    None => break,
                }
            }
        }

        debug!(w, h, probes = self.probes.len(), "canvas size found");
        Ok(Some(CanvasPlan {
            width: w,
            height: h,
            placements: best,
        }))
    }

    /// Largest usable side; power-of-two mode never exceeds the largest power of two
    /// within the limit.
    fn max_side(&self) -> u32 {
        let max = self.cfg.max_texture_size.max(1);
        if self.cfg.pow2 { prev_pow2(max) } else { max }
    }

    fn grow(&self, v: u32, step: u32, max: u32) -> u32 {
        let next = if self.cfg.pow2 {
            v.saturating_mul(2)
        } else {
            v.saturating_add(step)
        };
        next.min(max)
    }

    fn shrink(&self, v: u32, step: u32) -> Option<u32> {
        if self.cfg.pow2 {
            (v > 2).then(|| v / 2)
        } else {
            (v > step).then(|| v - step)
        }
    }

    fn probe(
        &mut self,
        stage: Stage,
        w: u32,
        h: u32,
        footprints: &[(u32, u32)],
        order: &[usize],
    ) -> Result<Option<Vec<Placement>>, Cancelled> {
        if self.cancel.is_cancelled() {
            debug!(?stage, w, h, "canvas search cancelled");
            return Err(Cancelled);
        }
        let found = try_place(self.cfg, w, h, footprints, order);
        debug!(?stage, w, h, fits = found.is_some(), "canvas probe");
        self.probes.push(Probe {
            stage,
            width: w,
            height: h,
            fits: found.is_some(),
        });
        Ok(found)
    }
}

/// Descending footprint area; ties keep input order.
fn placement_order(footprints: &[(u32, u32)]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..footprints.len()).collect();
    order.sort_by_key(|&i| {
        let (w, h) = footprints[i];
        std::cmp::Reverse(w as u64 * h as u64)
    });
    order
}

/// Places every footprint into a `w x h` atlas (minus the texture border on each side).
fn try_place(
    cfg: &AtlasConfig,
    w: u32,
    h: u32,
    footprints: &[(u32, u32)],
    order: &[usize],
) -> Option<Vec<Placement>> {
    let border = cfg.texture_border.saturating_mul(2);
    if w <= border || h <= border {
        return None;
    }
    let mut packer = GuillotinePacker::new(
        w - border,
        h - border,
        cfg.rotate_sprites,
        cfg.choice,
        cfg.split,
    );
    let mut placements = vec![None; footprints.len()];
    for &i in order {
        let (fw, fh) = footprints[i];
        placements[i] = Some(packer.pack(fw, fh)?);
    }
    placements.into_iter().collect()
}

pub fn next_pow2(v: u32) -> u32 {
    if v <= 1 { 1 } else { v.checked_next_power_of_two().unwrap_or(1 << 31) }
}

fn prev_pow2(v: u32) -> u32 {
    if v == 0 { 1 } else { 1 << (31 - v.leading_zeros()) }
}
