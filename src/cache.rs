use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;

use crate::cancel::CancellationToken;
use crate::engine::Bitmap;
use crate::error::RenderError;
use crate::loader::DocumentId;

const FALLBACK_CAPACITY: NonZeroUsize = match NonZeroUsize::new(64) {
    Some(capacity) => capacity,
    None => unreachable!(),
};

/// Identifies one rasterisation. Scale is kept to three decimal places so
/// floating point noise from fit calculations does not multiply entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderKey {
    pub document: DocumentId,
    pub page: u32,
    pub scale_milli: u32,
}

impl RenderKey {
    pub fn new(document: DocumentId, page: u32, scale: f64) -> Self {
        Self {
            document,
            page,
            scale_milli: (scale * 1000.0).round().max(0.0) as u32,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
    pub bytes: usize,
}

/// Rendered page bitmaps, bounded by entry count and total bytes.
pub struct PageRenderCache {
    cache: LruCache<RenderKey, Arc<Bitmap>>,
    max_bytes: usize,
    current_bytes: usize,
    stats: CacheStats,
}

impl PageRenderCache {
    pub fn new(max_entries: usize, max_bytes: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(FALLBACK_CAPACITY);
        Self {
            cache: LruCache::new(capacity),
            max_bytes,
            current_bytes: 0,
            stats: CacheStats::default(),
        }
    }

    pub fn get(&mut self, key: &RenderKey) -> Option<Arc<Bitmap>> {
        match self.cache.get(key) {
            Some(bitmap) => {
                self.stats.hits += 1;
                Some(Arc::clone(bitmap))
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    pub fn contains(&self, key: &RenderKey) -> bool {
        self.cache.contains(key)
    }

    /// Returns `false` when the bitmap is too large to keep.
    pub fn insert(&mut self, key: RenderKey, bitmap: Arc<Bitmap>) -> bool {
        let size = bitmap.byte_len();
        if size > self.max_bytes / 2 {
            log::debug!(
                "Not caching page {} at scale {}/1000: {} bytes exceeds budget",
                key.page,
                key.scale_milli,
                size
            );
            return false;
        }

        if let Some(existing) = self.cache.pop(&key) {
            self.current_bytes = self.current_bytes.saturating_sub(existing.byte_len());
        }

        while self.current_bytes + size > self.max_bytes && !self.cache.is_empty() {
            self.evict_lru();
        }
        if self.cache.len() == self.cache.cap().get() {
            self.evict_lru();
        }

        self.current_bytes += size;
        self.cache.put(key, bitmap);
        self.stats.entries = self.cache.len();
        self.stats.bytes = self.current_bytes;
        true
    }

    fn evict_lru(&mut self) {
        if let Some((_, evicted)) = self.cache.pop_lru() {
            self.current_bytes = self.current_bytes.saturating_sub(evicted.byte_len());
            self.stats.evictions += 1;
        }
    }

    /// Serve `key` from the cache or call `render`. A result produced after
    /// `cancel` fired is discarded and reported as cancelled.
    pub fn get_or_render<F>(
        &mut self,
        key: RenderKey,
        cancel: &CancellationToken,
        render: F,
    ) -> Result<Arc<Bitmap>, RenderError>
    where
        F: FnOnce(&CancellationToken) -> Result<Bitmap, RenderError>,
    {
        if let Some(hit) = self.get(&key) {
            return Ok(hit);
        }

        let bitmap = render(cancel)?;
        cancel.check()?;

        let bitmap = Arc::new(bitmap);
        self.insert(key, Arc::clone(&bitmap));
        Ok(bitmap)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn memory_usage(&self) -> usize {
        self.current_bytes
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}
