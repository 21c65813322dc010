use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use leafview::{
    Bitmap, CancellationToken, Config, ContainerSize, DocumentEngine, LoadError, PageSize,
    PageSource, RenderError, Viewer,
};

/// Page-count-only documents at 368x500 points. Counts every render.
#[derive(Clone, Default)]
pub struct CountingEngine {
    docs: HashMap<String, u32>,
    pub renders: Rc<RefCell<Vec<(u32, f64)>>>,
}

impl CountingEngine {
    pub fn with(path: &str, pages: u32) -> Self {
        let mut engine = Self::default();
        engine.docs.insert(path.to_string(), pages);
        engine
    }

    pub fn render_count(&self) -> usize {
        self.renders.borrow().len()
    }
}

impl DocumentEngine for CountingEngine {
    fn open(&self, path: &str) -> Result<Box<dyn PageSource>, LoadError> {
        let pages = *self.docs.get(path).ok_or_else(|| LoadError::Unreachable {
            path: path.to_string(),
            reason: "not found".into(),
        })?;
        Ok(Box::new(CountingDocument {
            pages,
            renders: Rc::clone(&self.renders),
        }))
    }

    fn byte_size(&self, _path: &str) -> Option<u64> {
        None
    }
}

struct CountingDocument {
    pages: u32,
    renders: Rc<RefCell<Vec<(u32, f64)>>>,
}

impl PageSource for CountingDocument {
    fn page_count(&self) -> u32 {
        self.pages
    }

    fn page_size(&self, _page: u32) -> anyhow::Result<PageSize> {
        Ok(PageSize::new(368.0, 500.0))
    }

    fn render(
        &self,
        page: u32,
        scale: f64,
        cancel: &CancellationToken,
    ) -> Result<Bitmap, RenderError> {
        cancel.check()?;
        self.renders.borrow_mut().push((page, scale));
        Ok(Bitmap::new(1, 1, vec![0, 0, 0]))
    }
}

pub fn viewer(engine: &CountingEngine) -> Viewer {
    let mut viewer = Viewer::new(Box::new(engine.clone()), Config::default());
    viewer.set_container(ContainerSize::new(800.0, 600.0));
    viewer
}
