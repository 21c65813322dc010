use std::sync::Arc;

use crate::cancel::CancellationToken;
use crate::error::{LoadError, RenderError};

/// Page dimensions in points. At scale 1.0 this is the page's natural size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    /// US Letter, used when an engine cannot report a page's bounds.
    pub const FALLBACK: PageSize = PageSize {
        width: 612.0,
        height: 792.0,
    };

    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn scaled(self, scale: f64) -> Self {
        Self {
            width: self.width * scale,
            height: self.height * scale,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// A rasterised page: tightly packed RGB8 samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    pub pixels: Arc<[u8]>,
}

impl Bitmap {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels: pixels.into(),
        }
    }

    pub fn byte_len(&self) -> usize {
        self.pixels.len()
    }
}

/// An opened, paginated document. Page numbers are 1-based.
pub trait PageSource {
    fn page_count(&self) -> u32;

    fn page_size(&self, page: u32) -> anyhow::Result<PageSize>;

    /// Rasterise `page` at `scale`. Implementations check `cancel` before
    /// returning a result and return `RenderError::Cancelled` once it is set.
    fn render(
        &self,
        page: u32,
        scale: f64,
        cancel: &CancellationToken,
    ) -> Result<Bitmap, RenderError>;
}

/// Opens documents by path. Any engine with this shape can back the viewer.
pub trait DocumentEngine {
    fn open(&self, path: &str) -> Result<Box<dyn PageSource>, LoadError>;

    /// Size of the raw document in bytes, if the engine can tell cheaply.
    fn byte_size(&self, path: &str) -> Option<u64> {
        std::fs::metadata(path).ok().map(|meta| meta.len())
    }
}
