pub mod cache;
pub mod cancel;
pub mod config;
pub mod engine;
pub mod error;
pub mod fragment;
pub mod library;
pub mod loader;
pub mod mupdf_engine;
pub mod text;
pub mod viewer;
pub mod visibility;
pub mod zoom;

#[cfg(test)]
mod testing;

use std::path::Path;

use anyhow::{Context, Result};

pub use cancel::CancellationToken;
pub use config::Config;
pub use engine::{Bitmap, DocumentEngine, PageSize, PageSource};
pub use error::{LoadError, RenderError};
pub use fragment::ViewFragment;
pub use mupdf_engine::MupdfEngine;
pub use viewer::{NavKey, Pagination, SlotContent, SlotId, Viewer, ViewerStatus, WheelAction};
pub use zoom::{ContainerSize, DisplayMode, ZoomMode};

/// Write an RGB bitmap as a PNG file.
pub fn save_bitmap_png(bitmap: &Bitmap, path: &Path) -> Result<()> {
    let image = image::RgbImage::from_raw(bitmap.width, bitmap.height, bitmap.pixels.to_vec())
        .with_context(|| {
            format!(
                "bitmap {}x{} has {} bytes, not RGB8",
                bitmap.width,
                bitmap.height,
                bitmap.byte_len()
            )
        })?;
    image
        .save(path)
        .with_context(|| format!("writing {}", path.display()))?;
    log::info!("Wrote {}", path.display());
    Ok(())
}
