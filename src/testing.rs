//! In-memory engine for unit tests.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::cancel::CancellationToken;
use crate::engine::{Bitmap, DocumentEngine, PageSize, PageSource};
use crate::error::{LoadError, RenderError};

#[derive(Debug, Clone)]
pub struct FakeSpec {
    pub pages: u32,
    pub size: PageSize,
    pub failing_pages: Vec<u32>,
    pub bytes: Option<u64>,
}

impl FakeSpec {
    pub fn pages(pages: u32) -> Self {
        Self {
            pages,
            size: PageSize::new(368.0, 500.0),
            failing_pages: Vec::new(),
            bytes: Some(4096),
        }
    }
}

#[derive(Debug, Default)]
pub struct FakeLog {
    pub opens: Vec<String>,
    pub renders: Vec<(u32, f64)>,
}

#[derive(Clone, Default)]
pub struct FakeEngine {
    docs: HashMap<String, FakeSpec>,
    pub log: Rc<RefCell<FakeLog>>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(self, path: &str, pages: u32) -> Self {
        self.with_spec(path, FakeSpec::pages(pages))
    }

    pub fn with_spec(mut self, path: &str, spec: FakeSpec) -> Self {
        self.docs.insert(path.to_string(), spec);
        self
    }

    pub fn open_count(&self) -> usize {
        self.log.borrow().opens.len()
    }

    pub fn render_count(&self) -> usize {
        self.log.borrow().renders.len()
    }

    pub fn rendered_pages(&self) -> Vec<u32> {
        self.log.borrow().renders.iter().map(|(page, _)| *page).collect()
    }
}

impl DocumentEngine for FakeEngine {
    fn open(&self, path: &str) -> Result<Box<dyn PageSource>, LoadError> {
        self.log.borrow_mut().opens.push(path.to_string());
        let spec = self.docs.get(path).ok_or_else(|| LoadError::Unreachable {
            path: path.to_string(),
            reason: "404".into(),
        })?;
        if spec.pages == 0 {
            return Err(LoadError::Empty {
                path: path.to_string(),
            });
        }
        Ok(Box::new(FakeDocument {
            spec: spec.clone(),
            log: Rc::clone(&self.log),
        }))
    }

    fn byte_size(&self, path: &str) -> Option<u64> {
        self.docs.get(path).and_then(|spec| spec.bytes)
    }
}

struct FakeDocument {
    spec: FakeSpec,
    log: Rc<RefCell<FakeLog>>,
}

impl PageSource for FakeDocument {
    fn page_count(&self) -> u32 {
        self.spec.pages
    }

    fn page_size(&self, _page: u32) -> anyhow::Result<PageSize> {
        Ok(self.spec.size)
    }

    fn render(
        &self,
        page: u32,
        scale: f64,
        cancel: &CancellationToken,
    ) -> Result<Bitmap, RenderError> {
        cancel.check()?;
        self.log.borrow_mut().renders.push((page, scale));
        if self.spec.failing_pages.contains(&page) {
            return Err(RenderError::failed(page, "corrupt content stream"));
        }
        let size = self.spec.size.scaled(scale);
        let width = size.width.ceil().max(1.0) as u32;
        let height = size.height.ceil().max(1.0) as u32;
        Ok(Bitmap::new(width, height, vec![255; 3]))
    }
}
