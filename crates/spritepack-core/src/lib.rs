//! Core library for packing sprites into a single texture atlas.
//!
//! - Trimming: tight alpha bounds that keep the original width/height parity
//! - Dedup: pixel-identical sprites are packed once and published under every name
//! - Rect mode: guillotine placement inside a searched near-minimal canvas
//! - Polygon mode: traced, simplified and triangulated outlines placed by grid search
//! - `AtlasJob` runs one configuration; `run_variants` runs several (in parallel with
//!   the `parallel` feature)
//!
//! Quick example:
//! ```ignore
//! use spritepack_core::prelude::*;
//! # fn main() -> anyhow::Result<()> {
//! let sources = vec![SourceEntry::new("a.png", "a"), SourceEntry::new("b.png", "b")];
//! let cfg = AtlasConfig::builder().sprite_border(2).max_texture_size(2048).build();
//! let mut job = AtlasJob::new(sources, cfg)?;
//! match job.generate() {
//!     Outcome::Success => println!("{:?}", job.image().map(|i| i.dimensions())),
//!     other => println!("no atlas: {other:?}"),
//! }
//! # Ok(()) }
//! ```

pub mod arena;
pub mod cancel;
pub mod canvas;
pub mod compose;
pub mod compositing;
pub mod config;
pub mod contour;
pub mod dedup;
pub mod error;
pub mod job;
pub mod model;
pub mod packer;
pub mod polypack;
pub mod trim;

pub use arena::*;
pub use cancel::*;
pub use config::*;
pub use error::*;
pub use job::*;
pub use model::*;

/// Convenience prelude for common types and functions.
/// Importing `spritepack_core::prelude::*` brings the primary APIs into scope.
pub mod prelude {
    pub use crate::arena::{InputImage, SourceEntry};
    pub use crate::cancel::CancelToken;
    pub use crate::config::{
        AtlasConfig, AtlasConfigBuilder, GuillotineChoice, GuillotineSplit, PackAlgorithm,
    };
    pub use crate::error::{AtlasError, Result};
    pub use crate::job::{AtlasJob, VariantResult, run_variants};
    pub use crate::model::{AtlasResult, AtlasStats, Outcome, Point, Rect, SpriteFrame, Triangles};
}
