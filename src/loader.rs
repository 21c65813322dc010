use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::cancel::CancellationToken;
use crate::engine::{Bitmap, DocumentEngine, PageSize, PageSource};
use crate::error::{LoadError, RenderError};

static NEXT_DOCUMENT_ID: AtomicU64 = AtomicU64::new(1);

pub type DocumentId = u64;

fn next_document_id() -> DocumentId {
    NEXT_DOCUMENT_ID.fetch_add(1, Ordering::Relaxed)
}

/// An opened document. Lives for the rest of the session once loaded.
pub struct Document {
    id: DocumentId,
    path: String,
    page_count: u32,
    byte_size: Option<u64>,
    source: Box<dyn PageSource>,
}

pub type DocumentHandle = Rc<Document>;

impl Document {
    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn byte_size(&self) -> Option<u64> {
        self.byte_size
    }

    pub fn clamp_page(&self, page: i64) -> u32 {
        page.clamp(1, self.page_count as i64) as u32
    }

    /// Natural page size, or US Letter when the engine cannot report bounds.
    pub fn page_size(&self, page: u32) -> PageSize {
        let page = self.clamp_page(page as i64);
        match self.source.page_size(page) {
            Ok(size) if size.is_valid() => size,
            Ok(size) => {
                log::warn!(
                    "Page {} of {} reported bogus size {}x{}",
                    page,
                    self.path,
                    size.width,
                    size.height
                );
                PageSize::FALLBACK
            }
            Err(e) => {
                log::warn!("Failed to read bounds of page {} in {}: {}", page, self.path, e);
                PageSize::FALLBACK
            }
        }
    }

    pub fn page_geometry(&self, page: u32, scale: f64) -> PageSize {
        self.page_size(page).scaled(scale)
    }

    pub fn render(
        &self,
        page: u32,
        scale: f64,
        cancel: &CancellationToken,
    ) -> Result<Bitmap, RenderError> {
        self.source.render(page, scale, cancel)
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("page_count", &self.page_count)
            .field("byte_size", &self.byte_size)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentMetadata {
    pub page_count: u32,
    pub byte_size: Option<u64>,
}

/// Page counts and file sizes per document path.
#[derive(Debug, Default)]
pub struct MetadataCache {
    entries: HashMap<String, DocumentMetadata>,
}

impl MetadataCache {
    pub fn get(&self, path: &str) -> Option<DocumentMetadata> {
        self.entries.get(path).copied()
    }

    pub fn insert(&mut self, path: &str, metadata: DocumentMetadata) {
        self.entries.insert(path.to_string(), metadata);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Opens documents through an engine and keeps every handle for the session.
pub struct DocumentLoader {
    engine: Box<dyn DocumentEngine>,
    handles: HashMap<String, DocumentHandle>,
    metadata: MetadataCache,
}

impl DocumentLoader {
    pub fn new(engine: Box<dyn DocumentEngine>) -> Self {
        Self {
            engine,
            handles: HashMap::new(),
            metadata: MetadataCache::default(),
        }
    }

    /// Opening the same path twice returns the same handle without touching
    /// the engine again.
    pub fn open(&mut self, path: &str) -> Result<DocumentHandle, LoadError> {
        if let Some(handle) = self.handles.get(path) {
            log::debug!("Reusing handle {} for {}", handle.id, path);
            return Ok(Rc::clone(handle));
        }

        let source = self.engine.open(path)?;
        let page_count = source.page_count();
        if page_count == 0 {
            return Err(LoadError::Empty {
                path: path.to_string(),
            });
        }
        let byte_size = self.engine.byte_size(path);

        let handle = Rc::new(Document {
            id: next_document_id(),
            path: path.to_string(),
            page_count,
            byte_size,
            source,
        });
        self.metadata.insert(
            path,
            DocumentMetadata {
                page_count,
                byte_size,
            },
        );
        self.handles.insert(path.to_string(), Rc::clone(&handle));
        log::info!("Opened {} ({} page(s))", path, page_count);
        Ok(handle)
    }

    pub fn is_loaded(&self, path: &str) -> bool {
        self.handles.contains_key(path)
    }

    /// Cached metadata for `path`, opening the document if it has not been
    /// seen yet. Failures are logged and yield `None`.
    pub fn metadata(&mut self, path: &str) -> Option<DocumentMetadata> {
        if let Some(metadata) = self.metadata.get(path) {
            return Some(metadata);
        }
        match self.open(path) {
            Ok(_) => self.metadata.get(path),
            Err(e) => {
                log::debug!("No metadata for {}: {}", path, e);
                None
            }
        }
    }

    pub fn metadata_cache(&self) -> &MetadataCache {
        &self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeEngine, FakeSpec};

    #[test]
    fn test_open_is_idempotent() {
        let engine = FakeEngine::new().with_document("poems.pdf", 10);
        let mut loader = DocumentLoader::new(Box::new(engine.clone()));

        let first = loader.open("poems.pdf").unwrap();
        let second = loader.open("poems.pdf").unwrap();

        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(engine.open_count(), 1);
        assert_eq!(first.page_count(), 10);
    }

    #[test]
    fn test_open_populates_metadata() {
        let engine = FakeEngine::new().with_document("essay.pdf", 3);
        let mut loader = DocumentLoader::new(Box::new(engine));
        assert!(loader.metadata_cache().is_empty());
        loader.open("essay.pdf").unwrap();
        loader.open("essay.pdf").unwrap();

        assert_eq!(loader.metadata_cache().len(), 1);
        assert_eq!(
            loader.metadata_cache().get("essay.pdf"),
            Some(DocumentMetadata {
                page_count: 3,
                byte_size: Some(4096),
            })
        );
    }

    #[test]
    fn test_unreachable_document_is_not_cached() {
        let engine = FakeEngine::new();
        let mut loader = DocumentLoader::new(Box::new(engine.clone()));

        let err = loader.open("missing.pdf").unwrap_err();
        assert!(matches!(err, LoadError::Unreachable { .. }));
        assert!(!loader.is_loaded("missing.pdf"));

        loader.open("missing.pdf").unwrap_err();
        assert_eq!(engine.open_count(), 2);
    }

    #[test]
    fn test_metadata_failure_is_silent() {
        let mut loader = DocumentLoader::new(Box::new(FakeEngine::new()));
        assert_eq!(loader.metadata("nowhere.pdf"), None);
        assert!(loader.metadata_cache().is_empty());
    }

    #[test]
    fn test_empty_document_is_rejected() {
        let engine = FakeEngine::new().with_spec("blank.pdf", FakeSpec::pages(0));
        let mut loader = DocumentLoader::new(Box::new(engine));
        assert!(matches!(
            loader.open("blank.pdf"),
            Err(LoadError::Empty { .. })
        ));
    }

    #[test]
    fn test_geometry_scales_natural_size() {
        let engine = FakeEngine::new().with_document("a.pdf", 2);
        let mut loader = DocumentLoader::new(Box::new(engine));
        let doc = loader.open("a.pdf").unwrap();

        assert_eq!(doc.page_geometry(1, 0.5), PageSize::new(184.0, 250.0));
        assert_eq!(doc.clamp_page(0), 1);
        assert_eq!(doc.clamp_page(99), 2);
    }
}
