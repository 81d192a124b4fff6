use crate::model::{Rect, Triangles};
use image::{DynamicImage, RgbaImage};
use std::path::PathBuf;

/// A source file and the logical name its frame is published under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    pub path: PathBuf,
    pub name: String,
}

impl SourceEntry {
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
        }
    }
}

/// In-memory image to pack (logical name + decoded image).
#[derive(Clone)]
pub struct InputImage {
    pub key: String,
    pub image: DynamicImage,
}

impl InputImage {
    pub fn new(key: impl Into<String>, image: impl Into<DynamicImage>) -> Self {
        Self {
            key: key.into(),
            image: image.into(),
        }
    }
}

/// Index of a decoded image inside an `ImageArena`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageHandle(usize);

impl ImageHandle {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Owns every decoded RGBA buffer of a job. Items refer to buffers by handle.
#[derive(Debug, Default)]
pub struct ImageArena {
    images: Vec<RgbaImage>,
}

impl ImageArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, image: RgbaImage) -> ImageHandle {
        self.images.push(image);
        ImageHandle(self.images.len() - 1)
    }

    pub fn get(&self, handle: ImageHandle) -> &RgbaImage {
        &self.images[handle.0]
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// One sprite queued for packing.
#[derive(Debug, Clone)]
pub struct PackItem {
    pub name: String,
    pub handle: ImageHandle,
    /// Tight alpha bounds inside the original image (parity-adjusted).
    pub trim_rect: Rect,
    /// Original image size.
    pub source_size: (u32, u32),
    /// Mesh local to `trim_rect`; empty unless polygon extraction ran.
    pub triangles: Triangles,
}

impl PackItem {
    pub fn new(name: String, handle: ImageHandle, trim_rect: Rect, source_size: (u32, u32)) -> Self {
        Self {
            name,
            handle,
            trim_rect,
            source_size,
            triangles: Triangles::default(),
        }
    }
}
