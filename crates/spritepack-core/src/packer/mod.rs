use crate::model::Rect;

pub mod guillotine;

/// Where a footprint landed inside a canvas.
///
/// `rect` carries the post-rotation size: a rotated `(w, h)` footprint occupies `(h, w)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub rect: Rect,
    pub rotated: bool,
}

/// A packer places footprints into one fixed-size canvas.
///
/// Implementations must ensure no overlaps and keep every placement inside the canvas.
/// `pack` returns `None` if the footprint cannot be placed in the remaining space.
pub trait Packer {
    fn can_pack(&self, w: u32, h: u32) -> bool;
    fn pack(&mut self, w: u32, h: u32) -> Option<Placement>;
}
