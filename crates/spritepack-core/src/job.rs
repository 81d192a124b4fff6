//! The `AtlasJob` facade: one configuration, one atlas.

use crate::arena::{ImageArena, InputImage, PackItem, SourceEntry};
use crate::cancel::{CancelToken, Cancelled};
use crate::canvas::RectCanvasPacker;
use crate::compose::{AtlasComposer, Composition};
use crate::config::AtlasConfig;
use crate::contour;
use crate::dedup::{Dedup, DuplicateIndex};
use crate::error::{AtlasError, Result};
use crate::model::{AtlasResult, Outcome, Rect, SpriteFrame};
use crate::polypack::{PolyItem, PolygonCanvasPacker};
use crate::trim::compute_trim_rect;
use image::{DynamicImage, ImageReader, RgbaImage, imageops::FilterType};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

enum Inputs {
    Files(Vec<SourceEntry>),
    Memory(Vec<InputImage>),
}

/// Everything the packers need, built fresh for every `generate()` call.
struct Prepared {
    arena: ImageArena,
    items: Vec<PackItem>,
    alias_items: BTreeMap<String, PackItem>,
    aliases: BTreeMap<String, Vec<String>>,
}

/// Packs one set of sources with one configuration.
///
/// ```ignore
/// use spritepack_core::prelude::*;
/// let sources = vec![SourceEntry::new("hero.png", "hero")];
/// let mut job = AtlasJob::new(sources, AtlasConfig::default())?;
/// if job.generate().is_success() {
///     let frames = job.sprite_frames().unwrap();
/// }
/// ```
pub struct AtlasJob {
    cfg: AtlasConfig,
    inputs: Inputs,
    cancel: CancelToken,
    aliases: BTreeMap<String, Vec<String>>,
    result: Option<AtlasResult>,
}

impl AtlasJob {
    /// Job over files on disk; they are decoded inside `generate()`.
    pub fn new(sources: Vec<SourceEntry>, cfg: AtlasConfig) -> Result<Self> {
        if sources.is_empty() {
            return Err(AtlasError::Empty);
        }
        Self::build(Inputs::Files(sources), cfg)
    }

    /// Job over already decoded images.
    pub fn from_images(images: Vec<InputImage>, cfg: AtlasConfig) -> Result<Self> {
        if images.is_empty() {
            return Err(AtlasError::Empty);
        }
        Self::build(Inputs::Memory(images), cfg)
    }

    fn build(inputs: Inputs, cfg: AtlasConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            inputs,
            cancel: CancelToken::new(),
            aliases: BTreeMap::new(),
            result: None,
        })
    }

    /// Replaces the job's cancellation token.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// A clone of the token `generate()` polls.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &AtlasConfig {
        &self.cfg
    }

    /// Runs trim, dedup, placement and composition.
    ///
    /// Any earlier result is discarded first; on anything but `Success` no image is kept.
    #[instrument(skip_all)]
    pub fn generate(&mut self) -> Outcome {
        self.result = None;
        self.aliases.clear();

        let prepared = self.prepare();
        self.aliases = prepared.aliases.clone();
        if prepared.items.is_empty() {
            warn!("no usable sprite among the sources");
            return Outcome::Empty;
        }
        if self.cancel.is_cancelled() {
            return Outcome::Aborted;
        }

        let composer = AtlasComposer::new(&self.cfg, &prepared.arena);
        let composed = if self.cfg.packs_polygons() {
            self.pack_polygons(&composer, &prepared.items)
        } else {
            self.pack_rects(&composer, &prepared.items)
        };
        let mut comp = match composed {
            Ok(Some(comp)) => comp,
            Ok(None) => {
                warn!(max = self.cfg.max_texture_size, "sprites do not fit the size limit");
                return Outcome::SizeLimitExceeded;
            }
            Err(Cancelled) => {
                info!("atlas generation aborted");
                return Outcome::Aborted;
            }
        };
        composer.propagate_aliases(&mut comp, &prepared.aliases, &prepared.alias_items);

        let result = AtlasResult {
            image: comp.image,
            frames: comp.frames,
            aliases: prepared.aliases,
            dropped: comp.dropped,
        };
        info!("{}", result.stats().summary());
        self.result = Some(result);
        Outcome::Success
    }

    fn pack_rects(
        &self,
        composer: &AtlasComposer<'_>,
        items: &[PackItem],
    ) -> std::result::Result<Option<Composition>, Cancelled> {
        let sb = self.cfg.sprite_border;
        let footprints: Vec<(u32, u32)> = items
            .iter()
            .map(|it| (it.trim_rect.w + sb, it.trim_rect.h + sb))
            .collect();
        let mut packer = RectCanvasPacker::new(&self.cfg, &self.cancel);
        let plan = packer.search(&footprints)?;
        Ok(plan.map(|plan| composer.compose_rect(items, &plan)))
    }

    fn pack_polygons(
        &self,
        composer: &AtlasComposer<'_>,
        items: &[PackItem],
    ) -> std::result::Result<Option<Composition>, Cancelled> {
        let poly_items: Vec<PolyItem<'_>> = items
            .iter()
            .map(|it| PolyItem {
                size: (it.trim_rect.w, it.trim_rect.h),
                mesh: &it.triangles,
            })
            .collect();
        let packer = PolygonCanvasPacker::new(&self.cfg, &self.cancel);
        let plan = packer.pack(&poly_items)?;
        Ok(plan.map(|plan| composer.compose_polygon(items, &plan)))
    }

    fn prepare(&self) -> Prepared {
        let mut arena = ImageArena::new();
        let mut dedup = DuplicateIndex::new();
        let mut items: Vec<PackItem> = Vec::new();
        let mut alias_items = BTreeMap::new();
        let mut seen: HashSet<String> = HashSet::new();

        let decoded: Box<dyn Iterator<Item = (String, Option<DynamicImage>)> + '_> = match &self.inputs {
            Inputs::Files(sources) => Box::new(sources.iter().map(|src| {
                let image = match load_image(src) {
                    Ok(img) => Some(img),
                    Err(e) => {
                        warn!(path = ?src.path, error = %e, "skipping unreadable image");
                        None
                    }
                };
                (src.name.clone(), image)
            })),
            Inputs::Memory(images) => Box::new(
                images
                    .iter()
                    .map(|inp| (inp.key.clone(), Some(inp.image.clone()))),
            ),
        };

        for (name, image) in decoded {
            let Some(image) = image else { continue };
            if !seen.insert(name.clone()) {
                warn!(%name, "duplicate logical name, skipping");
                continue;
            }
            let rgba = scale_image(image, self.cfg.scale);
            let (w, h) = rgba.dimensions();
            if w == 0 || h == 0 {
                warn!(%name, "skipping zero-size image");
                continue;
            }
            let trim_rect = if self.cfg.trim_enabled() {
                compute_trim_rect(&rgba, self.cfg.trim_threshold)
            } else {
                Rect::new(0, 0, w, h)
            };
            let handle = arena.insert(rgba);
            let item = PackItem::new(name, handle, trim_rect, (w, h));
            match dedup.check(&arena, &items, &item) {
                Dedup::AliasOf(_) => {
                    alias_items.insert(item.name.clone(), item);
                }
                Dedup::Unique => items.push(item),
            }
        }
        if dedup.skipped() > 0 {
            debug!(skipped = dedup.skipped(), "identical sprites folded into aliases");
        }

        if self.cfg.extracts_polygons() {
            for item in &mut items {
                item.triangles = contour::generate_triangles(
                    arena.get(item.handle),
                    item.trim_rect,
                    self.cfg.epsilon,
                    self.cfg.trim_threshold,
                );
            }
        }

        Prepared {
            arena,
            items,
            alias_items,
            aliases: dedup.into_aliases(),
        }
    }

    /// The composed atlas after a successful `generate()`.
    pub fn image(&self) -> Option<&RgbaImage> {
        self.result.as_ref().map(|r| &r.image)
    }

    /// Every logical name (aliases included) mapped to its frame.
    pub fn sprite_frames(&self) -> Option<&BTreeMap<String, SpriteFrame>> {
        self.result.as_ref().map(|r| &r.frames)
    }

    /// Canonical name -> pixel-identical names, from the last `generate()` call.
    pub fn identical_frames(&self) -> &BTreeMap<String, Vec<String>> {
        &self.aliases
    }

    pub fn result(&self) -> Option<&AtlasResult> {
        self.result.as_ref()
    }

    pub fn into_result(self) -> Option<AtlasResult> {
        self.result
    }
}

fn load_image(src: &SourceEntry) -> Result<DynamicImage> {
    Ok(ImageReader::open(&src.path)?.with_guessed_format()?.decode()?)
}

/// Resizes to `ceil(w * scale) x ceil(h * scale)`; a scale of 1 only converts.
fn scale_image(image: DynamicImage, scale: f32) -> RgbaImage {
    if scale == 1.0 {
        return image.to_rgba8();
    }
    let w = (image.width() as f64 * scale as f64).ceil() as u32;
    let h = (image.height() as f64 * scale as f64).ceil() as u32;
    image.resize_exact(w, h, FilterType::Triangle).to_rgba8()
}

/// One scaling variant's outcome.
#[derive(Debug)]
pub struct VariantResult {
    pub config: AtlasConfig,
    pub outcome: Outcome,
    pub result: Option<AtlasResult>,
}

/// Packs the same images once per config. Every variant is an independent job sharing
/// only the cancellation token; with the `parallel` feature they run concurrently.
pub fn run_variants(
    images: &[InputImage],
    configs: &[AtlasConfig],
    cancel: &CancelToken,
) -> Vec<Result<VariantResult>> {
    let run = |cfg: &AtlasConfig| -> Result<VariantResult> {
        let mut job = AtlasJob::from_images(images.to_vec(), cfg.clone())?.with_cancel(cancel.clone());
        let outcome = job.generate();
        Ok(VariantResult {
            config: cfg.clone(),
            outcome,
            result: job.into_result(),
        })
    };

    #[cfg(feature = "parallel")]
    {
        configs.par_iter().map(run).collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        configs.iter().map(run).collect()
    }
}
