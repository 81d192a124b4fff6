use crate::arena::{ImageArena, PackItem};
use crate::model::Rect;
use image::RgbaImage;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Verdict for a candidate item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dedup {
    Unique,
    /// Pixel-identical to the accepted item at this index.
    AliasOf(usize),
}

/// Finds pixel-identical trimmed content among accepted items.
///
/// Candidates are compared byte-for-byte against every accepted item with the same
/// trimmed size. Linear per size bucket; sprite sheets stay in the low thousands.
#[derive(Debug, Default)]
pub struct DuplicateIndex {
    by_size: HashMap<(u32, u32), Vec<usize>>,
    aliases: BTreeMap<String, Vec<String>>,
    skipped: usize,
}

impl DuplicateIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks `candidate` against `accepted` (the items kept so far, in order).
    ///
    /// A unique candidate is expected to be pushed onto `accepted` by the caller right
    /// after this returns; its index is recorded as `accepted.len()`. A duplicate is
    /// recorded under the canonical item's alias group.
    pub fn check(&mut self, arena: &ImageArena, accepted: &[PackItem], candidate: &PackItem) -> Dedup {
        let key = (candidate.trim_rect.w, candidate.trim_rect.h);
        let bucket = self.by_size.entry(key).or_default();
        let cand_img = arena.get(candidate.handle);
        for &idx in bucket.iter() {
            let other = &accepted[idx];
            if same_pixels(arena.get(other.handle), other.trim_rect, cand_img, candidate.trim_rect) {
                debug!(name = %candidate.name, canonical = %other.name, "identical sprite");
                self.aliases
                    .entry(other.name.clone())
                    .or_default()
                    .push(candidate.name.clone());
                self.skipped += 1;
                return Dedup::AliasOf(idx);
            }
        }
        bucket.push(accepted.len());
        Dedup::Unique
    }

    /// Canonical name -> alias names, in insertion order.
    pub fn aliases(&self) -> &BTreeMap<String, Vec<String>> {
        &self.aliases
    }

    pub fn into_aliases(self) -> BTreeMap<String, Vec<String>> {
        self.aliases
    }

    /// Number of candidates recorded as aliases.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

/// Exact RGBA comparison of two equally sized sub-rectangles.
pub fn same_pixels(a: &RgbaImage, ra: Rect, b: &RgbaImage, rb: Rect) -> bool {
    if ra.w != rb.w || ra.h != rb.h {
        return false;
    }
    let row_bytes = ra.w as usize * 4;
    let (aw, bw) = (a.width() as usize, b.width() as usize);
    let (araw, braw) = (a.as_raw(), b.as_raw());
    (0..ra.h as usize).all(|y| {
        let ao = ((ra.y as usize + y) * aw + ra.x as usize) * 4;
        let bo = ((rb.y as usize + y) * bw + rb.x as usize) * 4;
        araw[ao..ao + row_bytes] == braw[bo..bo + row_bytes]
    })
}
