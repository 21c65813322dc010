use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use mupdf::{Colorspace, Matrix};

use crate::cancel::CancellationToken;
use crate::engine::{Bitmap, DocumentEngine, PageSize, PageSource};
use crate::error::{LoadError, RenderError};

/// Opens PDF (and the other formats MuPDF understands) from the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct MupdfEngine;

impl DocumentEngine for MupdfEngine {
    fn open(&self, path: &str) -> Result<Box<dyn PageSource>, LoadError> {
        if !Path::new(path).is_file() {
            return Err(LoadError::Unreachable {
                path: path.to_string(),
                reason: "no such file".into(),
            });
        }

        let doc = mupdf::Document::open(path).map_err(|e| LoadError::Invalid {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        let page_count = doc.page_count().map_err(|e| LoadError::Invalid {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        if page_count <= 0 {
            return Err(LoadError::Empty {
                path: path.to_string(),
            });
        }

        log::info!("MuPDF opened {} ({} page(s))", path, page_count);
        Ok(Box::new(MupdfDocument {
            doc,
            page_count: page_count as u32,
            sizes: RefCell::new(HashMap::new()),
        }))
    }
}

struct MupdfDocument {
    doc: mupdf::Document,
    page_count: u32,
    sizes: RefCell<HashMap<u32, PageSize>>,
}

impl MupdfDocument {
    fn load(&self, page: u32) -> Result<mupdf::Page> {
        Ok(self.doc.load_page(page as i32 - 1)?)
    }

    fn rasterise(&self, page: u32, scale: f64, cancel: &CancellationToken) -> Result<Bitmap> {
        let page_ref = self.load(page)?;
        let scale_f = scale as f32;
        let pixmap = page_ref.to_pixmap(
            &Matrix::new_scale(scale_f, scale_f),
            &Colorspace::device_rgb(),
            false,
            true,
        )?;
        // Superseded while rasterising: drop the pixmap.
        if cancel.is_cancelled() {
            anyhow::bail!(CancelledMarker);
        }
        Ok(Bitmap::new(
            pixmap.width(),
            pixmap.height(),
            pixmap.samples().to_vec(),
        ))
    }
}

#[derive(Debug)]
struct CancelledMarker;

impl std::fmt::Display for CancelledMarker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cancelled")
    }
}

impl std::error::Error for CancelledMarker {}

impl PageSource for MupdfDocument {
    fn page_count(&self) -> u32 {
        self.page_count
    }

    fn page_size(&self, page: u32) -> Result<PageSize> {
        if let Some(size) = self.sizes.borrow().get(&page) {
            return Ok(*size);
        }
        let bounds = self.load(page)?.bounds()?;
        let size = PageSize::new(
            (bounds.x1 - bounds.x0) as f64,
            (bounds.y1 - bounds.y0) as f64,
        );
        self.sizes.borrow_mut().insert(page, size);
        Ok(size)
    }

    fn render(
        &self,
        page: u32,
        scale: f64,
        cancel: &CancellationToken,
    ) -> Result<Bitmap, RenderError> {
        cancel.check()?;
        self.rasterise(page, scale, cancel).map_err(|e| {
            if e.is::<CancelledMarker>() {
                RenderError::Cancelled
            } else {
                RenderError::failed(page, e)
            }
        })
    }
}
