use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Packing configuration for one atlas job (one scaling variant).
/// Key notes:
///   - `algorithm` selects rect or polygon placement; polygon placement only runs when
///     `polygon_mode` is also enabled, otherwise rect placement is used
///   - `trim_threshold == 0` disables trimming (and with it contour extraction)
///   - `choice`/`split` tune the free-rect packer used inside each canvas probe
///     Top-level placement algorithms.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PackAlgorithm {
    /// Axis-aligned rectangles with canvas size search.
    Rect,
    /// Triangle meshes placed by grid search with overlap rejection.
    Polygon,
}

impl FromStr for PackAlgorithm {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rect" => Ok(Self::Rect),
            "polygon" | "poly" => Ok(Self::Polygon),
            _ => Err(()),
        }
    }
}

/// Guillotine free-rect choice heuristics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GuillotineChoice {
    BestAreaFit,
    BestShortSideFit,
    BestLongSideFit,
    WorstAreaFit,
    WorstShortSideFit,
    WorstLongSideFit,
}

impl FromStr for GuillotineChoice {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "baf" | "bestareafit" => Ok(Self::BestAreaFit),
            "bssf" | "bestshortsidefit" => Ok(Self::BestShortSideFit),
            "blsf" | "bestlongsidefit" => Ok(Self::BestLongSideFit),
            "waf" | "worstareafit" => Ok(Self::WorstAreaFit),
            "wssf" | "worstshortsidefit" => Ok(Self::WorstShortSideFit),
            "wlsf" | "worstlongsidefit" => Ok(Self::WorstLongSideFit),
            _ => Err(()),
        }
    }
}

/// Guillotine split axis heuristics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GuillotineSplit {
    SplitShorterLeftoverAxis,
    SplitLongerLeftoverAxis,
    SplitMinimizeArea,
    SplitMaximizeArea,
    SplitShorterAxis,
    SplitLongerAxis,
}

impl FromStr for GuillotineSplit {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "slas" | "splitshorterleftoveraxis" => Ok(Self::SplitShorterLeftoverAxis),
            "llas" | "splitlongerleftoveraxis" => Ok(Self::SplitLongerLeftoverAxis),
            "minas" | "splitminimizearea" => Ok(Self::SplitMinimizeArea),
            "maxas" | "splitmaximizearea" => Ok(Self::SplitMaximizeArea),
            "sas" | "splitshorteraxis" => Ok(Self::SplitShorterAxis),
            "las" | "splitlongeraxis" => Ok(Self::SplitLongerAxis),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AtlasConfig {
    /// Pixels of empty margin around the whole atlas.
    pub texture_border: u32,
    /// Pixels reserved to the right of and below every sprite. Rect placement only;
    /// polygon placement keeps meshes apart through their `epsilon` inflation.
    pub sprite_border: u32,
    /// Minimum alpha counted as content when trimming (1..=255). 0 disables trimming.
    pub trim_threshold: u8,

    #[serde(default = "default_algorithm")]
    pub algorithm: PackAlgorithm,
    /// Extract triangle meshes for every sprite (requires trimming).
    #[serde(default)]
    pub polygon_mode: bool,
    /// Simplification/offset distance in pixels for polygon extraction.
    #[serde(default = "default_epsilon")]
    pub epsilon: f32,
    /// Grid stride (pixels) of the polygon placement search.
    #[serde(default = "default_polygon_step")]
    pub polygon_step: u32,

    /// Round every canvas dimension up to a power of two.
    pub pow2: bool,
    /// Keep width == height during the canvas search.
    pub force_squared: bool,
    /// Largest allowed atlas side in pixels.
    pub max_texture_size: u32,
    /// Allow 90° rotation when only the rotated footprint fits.
    pub rotate_sprites: bool,
    /// Uniform scale applied to every decoded image before trimming.
    pub scale: f32,

    #[serde(default = "default_choice")]
    pub choice: GuillotineChoice,
    #[serde(default = "default_split")]
    pub split: GuillotineSplit,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            texture_border: 0,
            sprite_border: 1,
            trim_threshold: 1,
            algorithm: default_algorithm(),
            polygon_mode: false,
            epsilon: default_epsilon(),
            polygon_step: default_polygon_step(),
            pow2: false,
            force_squared: false,
            max_texture_size: 8192,
            rotate_sprites: true,
            scale: 1.0,
            choice: default_choice(),
            split: default_split(),
        }
    }
}

impl AtlasConfig {
    /// Validates the configuration parameters.
    ///
    /// Returns an error if:
    /// - `max_texture_size` is zero or leaves no room inside the texture border
    /// - `scale` is not a positive finite number
    /// - `epsilon` is negative or not finite, or `polygon_step` is zero
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::AtlasError;

        if self.max_texture_size == 0 {
            return Err(AtlasError::InvalidDimensions {
                width: self.max_texture_size,
                height: self.max_texture_size,
            });
        }

        let total_border = self.texture_border.saturating_mul(2);
        if total_border >= self.max_texture_size {
            return Err(AtlasError::InvalidConfig(format!(
                "texture_border ({}) * 2 exceeds max_texture_size ({})",
                self.texture_border, self.max_texture_size
            )));
        }

        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(AtlasError::InvalidConfig(format!(
                "scale must be a positive number, got {}",
                self.scale
            )));
        }

        if !(self.epsilon.is_finite() && self.epsilon >= 0.0) {
            return Err(AtlasError::InvalidConfig(format!(
                "epsilon must be a non-negative number, got {}",
                self.epsilon
            )));
        }

        if self.polygon_step == 0 {
            return Err(AtlasError::InvalidConfig(
                "polygon_step must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// True when trimming (and therefore contour extraction) runs.
    pub fn trim_enabled(&self) -> bool {
        self.trim_threshold > 0
    }

    /// True when meshes are extracted for every sprite.
    pub fn extracts_polygons(&self) -> bool {
        self.polygon_mode && self.trim_enabled()
    }

    /// True when the polygon placement path is taken.
    pub fn packs_polygons(&self) -> bool {
        self.algorithm == PackAlgorithm::Polygon && self.extracts_polygons()
    }
}

fn default_algorithm() -> PackAlgorithm {
    PackAlgorithm::Rect
}
fn default_epsilon() -> f32 {
    2.0
}
fn default_polygon_step() -> u32 {
    5
}
fn default_choice() -> GuillotineChoice {
    GuillotineChoice::BestAreaFit
}
fn default_split() -> GuillotineSplit {
    GuillotineSplit::SplitShorterLeftoverAxis
}

/// Builder for `AtlasConfig` for ergonomic construction.
#[derive(Debug, Default, Clone)]
pub struct AtlasConfigBuilder {
    cfg: AtlasConfig,
}

impl AtlasConfigBuilder {
    pub fn new() -> Self {
        Self {
            cfg: AtlasConfig::default(),
        }
    }
    pub fn texture_border(mut self, v: u32) -> Self {
        self.cfg.texture_border = v;
        self
    }
    pub fn sprite_border(mut self, v: u32) -> Self {
        self.cfg.sprite_border = v;
        self
    }
    pub fn trim_threshold(mut self, v: u8) -> Self {
        self.cfg.trim_threshold = v;
        self
    }
    pub fn algorithm(mut self, v: PackAlgorithm) -> Self {
        self.cfg.algorithm = v;
        self
    }
    /// Enables mesh extraction with the given simplification distance.
    pub fn polygon_mode(mut self, enable: bool, epsilon: f32) -> Self {
        self.cfg.polygon_mode = enable;
        self.cfg.epsilon = epsilon;
        self
    }
    pub fn polygon_step(mut self, v: u32) -> Self {
        self.cfg.polygon_step = v;
        self
    }
    pub fn pow2(mut self, v: bool) -> Self {
        self.cfg.pow2 = v;
        self
    }
    pub fn force_squared(mut self, v: bool) -> Self {
        self.cfg.force_squared = v;
        self
    }
    pub fn max_texture_size(mut self, v: u32) -> Self {
        self.cfg.max_texture_size = v;
        self
    }
    pub fn rotate_sprites(mut self, v: bool) -> Self {
        self.cfg.rotate_sprites = v;
        self
    }
    pub fn scale(mut self, v: f32) -> Self {
        self.cfg.scale = v;
        self
    }
    pub fn choice(mut self, v: GuillotineChoice) -> Self {
        self.cfg.choice = v;
        self
    }
    pub fn split(mut self, v: GuillotineSplit) -> Self {
        self.cfg.split = v;
        self
    }
    pub fn build(self) -> AtlasConfig {
        self.cfg
    }
}

impl AtlasConfig {
    /// Create a fluent builder for `AtlasConfig`.
    pub fn builder() -> AtlasConfigBuilder {
        AtlasConfigBuilder::new()
    }
}
