//! Rasterizes placements into the atlas image and derives sprite frames.

use crate::arena::{ImageArena, PackItem};
use crate::canvas::CanvasPlan;
use crate::compositing::{blit_masked, blit_rgba};
use crate::config::AtlasConfig;
use crate::model::{Rect, SpriteFrame};
use crate::polypack::PolyPlan;
use image::RgbaImage;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Center delta between the trimmed content and its original image, y axis up.
///
/// Always measured in unrotated space. Exact when the trim rect keeps the original
/// parity on both axes.
pub fn sprite_offset(trim: Rect, source_size: (u32, u32)) -> (i32, i32) {
    let (iw, ih) = (source_size.0 as i64, source_size.1 as i64);
    let x = (2 * trim.x as i64 + trim.w as i64 - iw) / 2;
    let y = (ih - 2 * trim.y as i64 - trim.h as i64) / 2;
    (x as i32, y as i32)
}

/// Frame map and image produced by one compose pass.
pub struct Composition {
    pub image: RgbaImage,
    pub frames: BTreeMap<String, SpriteFrame>,
    /// Canonical names left out of the atlas.
    pub dropped: Vec<String>,
}

pub struct AtlasComposer<'a> {
    cfg: &'a AtlasConfig,
    arena: &'a ImageArena,
}

impl<'a> AtlasComposer<'a> {
    pub fn new(cfg: &'a AtlasConfig, arena: &'a ImageArena) -> Self {
        Self { cfg, arena }
    }

    /// Draws every rect placement at `placement + texture_border`.
    pub fn compose_rect(&self, items: &[PackItem], plan: &CanvasPlan) -> Composition {
        let tb = self.cfg.texture_border;
        let sb = self.cfg.sprite_border;
        let mut image = RgbaImage::new(plan.width, plan.height);
        let mut frames = BTreeMap::new();
        for (item, placement) in items.iter().zip(&plan.placements) {
            let (x, y) = (placement.rect.x + tb, placement.rect.y + tb);
            blit_rgba(
                self.arena.get(item.handle),
                &mut image,
                x,
                y,
                item.trim_rect,
                placement.rotated,
            );
            let frame = Rect::new(
                x,
                y,
                placement.rect.w.saturating_sub(sb),
                placement.rect.h.saturating_sub(sb),
            );
            frames.insert(
                item.name.clone(),
                SpriteFrame {
                    frame,
                    offset: sprite_offset(item.trim_rect, item.source_size),
                    rotated: placement.rotated,
                    source_color_rect: item.trim_rect,
                    source_size: item.source_size,
                    triangles: item.triangles.clone(),
                },
            );
        }
        debug!(w = plan.width, h = plan.height, frames = frames.len(), "rect atlas composed");
        Composition {
            image,
            frames,
            dropped: Vec::new(),
        }
    }

    /// Draws every placed mesh, copying only the pixels the mesh covers.
    pub fn compose_polygon(&self, items: &[PackItem], plan: &PolyPlan) -> Composition {
        let tb = self.cfg.texture_border;
        let mut image = RgbaImage::new(plan.width, plan.height);
        let mut frames = BTreeMap::new();
        let mut dropped = Vec::new();
        for (item, offset) in items.iter().zip(&plan.offsets) {
            let Some((ox, oy)) = *offset else {
                dropped.push(item.name.clone());
                continue;
            };
            let (x, y) = (ox + tb, oy + tb);
            blit_masked(
                self.arena.get(item.handle),
                &mut image,
                x,
                y,
                item.trim_rect,
                &item.triangles,
            );
            frames.insert(
                item.name.clone(),
                SpriteFrame {
                    frame: Rect::new(x, y, item.trim_rect.w, item.trim_rect.h),
                    offset: sprite_offset(item.trim_rect, item.source_size),
                    rotated: false,
                    source_color_rect: item.trim_rect,
                    source_size: item.source_size,
                    triangles: item.triangles.clone(),
                },
            );
        }
        if !dropped.is_empty() {
            warn!(count = dropped.len(), "sprites left out of the polygon atlas");
        }
        debug!(w = plan.width, h = plan.height, frames = frames.len(), "polygon atlas composed");
        Composition {
            image,
            frames,
            dropped,
        }
    }

    /// Gives every alias a copy of its canonical frame, with offset, source size and
    /// color rect taken from the alias's own image. Aliases of dropped items are
    /// dropped too.
    pub fn propagate_aliases(
        &self,
        comp: &mut Composition,
        aliases: &BTreeMap<String, Vec<String>>,
        alias_items: &BTreeMap<String, PackItem>,
    ) {
        for (canonical, names) in aliases {
            let Some(base) = comp.frames.get(canonical).cloned() else {
                comp.dropped.extend(names.iter().cloned());
                continue;
            };
            for name in names {
                let mut frame = base.clone();
                if let Some(item) = alias_items.get(name) {
                    frame.offset = sprite_offset(item.trim_rect, item.source_size);
                    frame.source_size = item.source_size;
                    frame.source_color_rect = item.trim_rect;
                }
                comp.frames.insert(name.clone(), frame);
            }
        }
    }
}
