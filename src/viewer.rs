//! The modal document viewer: one open document, its view state, and the
//! render requests needed to put it on screen.
//!
//! All time-dependent behaviour takes `now` explicitly. The host calls
//! [`Viewer::process_renders`] to run queued renders and [`Viewer::tick`] to
//! fire the resize debounce and settle programmatic scrolls.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use crate::cache::{CacheStats, PageRenderCache, RenderKey};
use crate::cancel::CancellationToken;
use crate::config::Config;
use crate::engine::{Bitmap, DocumentEngine, PageSize};
use crate::error::{LoadError, RenderError};
use crate::fragment::ViewFragment;
use crate::loader::{DocumentHandle, DocumentId, DocumentLoader};
use crate::visibility::{ViewportRect, VisibilityTracker};
use crate::zoom::{compute_scale, step_scale, ContainerSize, DisplayMode, ZoomMode};

/// First page of the spread containing `page`. Page 1 stands alone; every
/// other spread starts on an even page.
pub fn spread_start(page: u32) -> u32 {
    if page <= 1 {
        1
    } else {
        page - page % 2
    }
}

pub fn spread_pages(page: u32, page_count: u32) -> Vec<u32> {
    let start = spread_start(page);
    if start == 1 {
        return vec![1];
    }
    if start < page_count {
        vec![start, start + 1]
    } else {
        vec![start]
    }
}

pub fn next_spread_start(page: u32, page_count: u32) -> Option<u32> {
    let start = spread_start(page);
    if start == 1 {
        return (page_count >= 2).then_some(2);
    }
    (start + 2 <= page_count).then_some(start + 2)
}

pub fn previous_spread_start(page: u32) -> Option<u32> {
    match spread_start(page) {
        1 => None,
        2 => Some(1),
        start => Some(start - 2),
    }
}

/// The single mutable description of what is on screen. Only [`Viewer`]
/// methods change it.
#[derive(Debug, Clone)]
pub struct ViewState {
    document: Option<DocumentHandle>,
    page: u32,
    display_mode: DisplayMode,
    scale: f64,
    zoom_mode: ZoomMode,
}

impl ViewState {
    pub fn document(&self) -> Option<&DocumentHandle> {
        self.document.as_ref()
    }

    /// 1-based; meaningless while no document is loaded.
    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_count(&self) -> u32 {
        self.document.as_ref().map(|d| d.page_count()).unwrap_or(0)
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.display_mode
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn zoom_mode(&self) -> ZoomMode {
        self.zoom_mode
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewerStatus {
    Closed,
    Ready,
    /// The open failed; the message is shown in the pane until retry or close.
    Failed(LoadError),
}

/// A drawing surface. Spread slots are reused across page turns; scroll
/// placeholders belong to one page each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SlotId {
    Spread(u8),
    Placeholder(u32),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SlotContent {
    /// Sized but not requested yet.
    Empty,
    Pending,
    Ready(Arc<Bitmap>),
    /// Render failed; the slot shows a fault marker.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageSlot {
    pub page: u32,
    pub size: PageSize,
    pub content: SlotContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RenderTicket {
    generation: u64,
    slot: SlotId,
}

#[derive(Debug)]
struct RenderJob {
    ticket: RenderTicket,
    document: DocumentId,
    page: u32,
    scale: f64,
    token: CancellationToken,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub page_count: u32,
    pub can_previous: bool,
    pub can_next: bool,
    /// Pages currently laid side by side (one entry outside double mode).
    pub spread: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavKey {
    Next,
    Previous,
    First,
    Last,
    ZoomIn,
    ZoomOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelAction {
    /// Scroll mode: the column moved natively.
    Scrolled,
    /// A page turn happened.
    Turned,
    /// Within the throttle window of the previous turn.
    Throttled,
    /// No page to turn to, or no document.
    Ignored,
}

pub struct Viewer {
    config: Config,
    loader: DocumentLoader,
    cache: PageRenderCache,
    state: ViewState,
    status: ViewerStatus,
    container: ContainerSize,
    scroll_top: f64,
    tracker: VisibilityTracker,
    slots: BTreeMap<SlotId, PageSlot>,
    queue: VecDeque<RenderJob>,
    active: Option<CancellationToken>,
    generation: u64,
    last_wheel_turn: Option<Instant>,
    resize_due: Option<Instant>,
}

impl Viewer {
    pub fn new(engine: Box<dyn DocumentEngine>, config: Config) -> Self {
        let cache = PageRenderCache::new(config.render_cache_entries, config.render_cache_bytes);
        let tracker = VisibilityTracker::new(config.lazy_render_margin);
        let state = ViewState {
            document: None,
            page: 1,
            display_mode: config.default_display_mode,
            scale: 1.0,
            zoom_mode: config.default_zoom_mode,
        };
        Self {
            config,
            loader: DocumentLoader::new(engine),
            cache,
            state,
            status: ViewerStatus::Closed,
            container: ContainerSize::new(1280.0, 800.0),
            scroll_top: 0.0,
            tracker,
            slots: BTreeMap::new(),
            queue: VecDeque::new(),
            active: None,
            generation: 0,
            last_wheel_turn: None,
            resize_due: None,
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn status(&self) -> &ViewerStatus {
        &self.status
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Size the pane without scheduling a re-fit. For initial layout only;
    /// live resizes go through [`Viewer::on_resize`].
    pub fn set_container(&mut self, container: ContainerSize) {
        self.container = container;
    }

    pub fn scroll_top(&self) -> f64 {
        self.scroll_top
    }

    pub fn viewport(&self) -> ViewportRect {
        ViewportRect::new(self.scroll_top, self.container.height)
    }

    pub fn slot(&self, id: SlotId) -> Option<&PageSlot> {
        self.slots.get(&id)
    }

    pub fn slots(&self) -> impl Iterator<Item = (&SlotId, &PageSlot)> {
        self.slots.iter()
    }

    /// Number of queued renders that have not been cancelled.
    pub fn pending_renders(&self) -> usize {
        self.queue
            .iter()
            .filter(|job| !job.token.is_cancelled())
            .count()
    }

    // --- lifecycle ---

    pub fn open(&mut self, path: &str, now: Instant) -> Result<(), LoadError> {
        self.open_at(path, 1, now)
    }

    /// Open `path` showing `page` (clamped) in the current display mode.
    pub fn open_at(&mut self, path: &str, page: u32, now: Instant) -> Result<(), LoadError> {
        self.cancel_all();
        self.slots.clear();
        self.tracker.clear();

        let doc = match self.loader.open(path) {
            Ok(doc) => doc,
            Err(e) => {
                log::warn!("Failed to open {}: {}", path, e);
                self.state.document = None;
                self.status = ViewerStatus::Failed(e.clone());
                return Err(e);
            }
        };

        self.state.page = doc.clamp_page(page as i64);
        self.state.document = Some(doc);
        self.status = ViewerStatus::Ready;
        self.scroll_top = 0.0;
        self.refresh_scale();
        log::info!(
            "Showing {} at page {} ({} mode, scale {:.3})",
            path,
            self.state.page,
            self.state.display_mode,
            self.state.scale
        );
        self.rebuild(now, self.config.open_settle());
        Ok(())
    }

    /// Reopen the document, mode and page a deep link names.
    pub fn open_fragment(&mut self, fragment: &ViewFragment, now: Instant) -> Result<(), LoadError> {
        self.state.display_mode = fragment.mode;
        self.open_at(&fragment.document_id, fragment.page, now)
    }

    pub fn fragment(&self) -> Option<ViewFragment> {
        let doc = self.state.document.as_ref()?;
        Some(ViewFragment::new(
            doc.path(),
            self.state.page,
            self.state.display_mode,
        ))
    }

    /// Close the modal. Loaded handles stay cached for the session.
    pub fn close(&mut self) {
        self.cancel_all();
        self.slots.clear();
        self.tracker.clear();
        self.state.document = None;
        self.status = ViewerStatus::Closed;
        self.resize_due = None;
    }

    // --- display mode ---

    /// Returns `false` when `mode` is already showing.
    pub fn set_display_mode(&mut self, mode: DisplayMode, now: Instant) -> bool {
        if self.state.document.is_none() {
            let changed = self.state.display_mode != mode;
            self.state.display_mode = mode;
            return changed;
        }
        if self.state.display_mode == mode {
            return false;
        }

        self.reconcile_from_scroll();
        self.cancel_all();
        log::info!(
            "Display mode {} -> {} at page {}",
            self.state.display_mode,
            mode,
            self.state.page
        );
        self.state.display_mode = mode;
        self.refresh_scale();
        self.rebuild(now, self.config.open_settle());
        true
    }

    // --- navigation ---

    pub fn next_page(&mut self, now: Instant) -> bool {
        self.reconcile_from_scroll();
        match self.next_target() {
            Some(target) => self.go_to(target, now),
            None => false,
        }
    }

    pub fn previous_page(&mut self, now: Instant) -> bool {
        self.reconcile_from_scroll();
        match self.previous_target() {
            Some(target) => self.go_to(target, now),
            None => false,
        }
    }

    /// Clamp `page` into the document and go there. Returns `false` when the
    /// clamped page is already current.
    pub fn jump_to_page(&mut self, page: i64, now: Instant) -> bool {
        self.reconcile_from_scroll();
        let Some(doc) = self.state.document.as_ref() else {
            return false;
        };
        let target = doc.clamp_page(page);
        if target == self.state.page {
            return false;
        }
        self.go_to(target, now)
    }

    pub fn zoom_in(&mut self, now: Instant) -> bool {
        self.step_zoom(1, now)
    }

    pub fn zoom_out(&mut self, now: Instant) -> bool {
        self.step_zoom(-1, now)
    }

    /// Switch to manual zoom at `scale`, kept within the manual bounds.
    pub fn set_scale(&mut self, scale: f64, now: Instant) -> bool {
        self.reconcile_from_scroll();
        let scale = scale.clamp(self.config.min_manual_scale, self.config.max_manual_scale);
        self.state.zoom_mode = ZoomMode::Manual;
        if scale == self.state.scale {
            return false;
        }
        self.state.scale = scale;
        if self.state.document.is_some() {
            self.cancel_all();
            self.rebuild(now, self.config.open_settle());
        }
        true
    }

    /// Returns `true` when the scale changed and the view was re-rendered.
    pub fn set_zoom_mode(&mut self, mode: ZoomMode, now: Instant) -> bool {
        self.reconcile_from_scroll();
        self.state.zoom_mode = mode;
        let before = self.state.scale;
        self.refresh_scale();
        if self.state.document.is_none() || before == self.state.scale {
            return false;
        }
        self.cancel_all();
        self.rebuild(now, self.config.open_settle());
        true
    }

    pub fn on_key(&mut self, key: NavKey, now: Instant) -> bool {
        match key {
            NavKey::Next => self.next_page(now),
            NavKey::Previous => self.previous_page(now),
            NavKey::First => self.jump_to_page(1, now),
            NavKey::Last => self.jump_to_page(i64::from(self.state.page_count()), now),
            NavKey::ZoomIn => self.zoom_in(now),
            NavKey::ZoomOut => self.zoom_out(now),
        }
    }

    /// Positive `delta_y` is downward / forward.
    pub fn on_wheel(&mut self, delta_y: f64, now: Instant) -> WheelAction {
        if self.state.document.is_none() {
            return WheelAction::Ignored;
        }
        if self.state.display_mode == DisplayMode::Scroll {
            self.scroll_to(self.scroll_top + delta_y, now);
            return WheelAction::Scrolled;
        }
        if delta_y == 0.0 {
            return WheelAction::Ignored;
        }
        if let Some(last) = self.last_wheel_turn {
            if now.saturating_duration_since(last) < self.config.wheel_throttle() {
                return WheelAction::Throttled;
            }
        }

        let turned = if delta_y > 0.0 {
            self.next_page(now)
        } else {
            self.previous_page(now)
        };
        if turned {
            self.last_wheel_turn = Some(now);
            WheelAction::Turned
        } else {
            WheelAction::Ignored
        }
    }

    pub fn pagination(&self) -> Pagination {
        let page_count = self.state.page_count();
        let spread = match (self.state.display_mode, page_count) {
            (_, 0) => Vec::new(),
            (DisplayMode::Double, count) => spread_pages(self.state.page, count),
            _ => vec![self.state.page],
        };
        Pagination {
            page: self.state.page,
            page_count,
            can_previous: self.previous_target().is_some(),
            can_next: self.next_target().is_some(),
            spread,
        }
    }

    // --- scrolling, resizing, time ---

    /// User scroll in scroll mode. Ignored in other modes.
    pub fn scroll_to(&mut self, offset: f64, now: Instant) {
        if self.state.display_mode != DisplayMode::Scroll || self.state.document.is_none() {
            return;
        }
        self.scroll_top = offset.clamp(0.0, self.max_scroll());
        self.on_scroll(now);
    }

    /// Record the new pane size; the re-fit happens once resizes stop for
    /// the debounce interval.
    pub fn on_resize(&mut self, width: f64, height: f64, now: Instant) {
        self.container = ContainerSize::new(width, height);
        self.resize_due = Some(now + self.config.resize_debounce());
    }

    pub fn tick(&mut self, now: Instant) {
        if let Some(due) = self.resize_due {
            if now >= due {
                self.resize_due = None;
                self.apply_resize(now);
            }
        }
        if self.state.display_mode == DisplayMode::Scroll && self.tracker.settle_expired(now) {
            self.on_scroll(now);
        }
    }

    /// Run up to `budget` queued renders. Returns how many jobs were taken
    /// off the queue, including cancelled and stale ones.
    pub fn process_renders(&mut self, budget: usize) -> usize {
        let mut taken = 0;
        while taken < budget {
            let Some(job) = self.queue.pop_front() else {
                break;
            };
            taken += 1;
            self.run_job(job);
        }
        taken
    }

    /// Run every queued render.
    pub fn process_all_renders(&mut self) -> usize {
        self.process_renders(usize::MAX)
    }

    // --- internals ---

    fn run_job(&mut self, job: RenderJob) {
        if job.token.is_cancelled() {
            log::debug!("Skipping superseded render of page {}", job.page);
            return;
        }
        let Some(doc) = self.state.document.clone() else {
            return;
        };
        if doc.id() != job.document {
            return;
        }

        let key = RenderKey::new(doc.id(), job.page, job.scale);
        let result = self.cache.get_or_render(key, &job.token, |cancel| {
            doc.render(job.page, job.scale, cancel)
        });

        // The view may have moved on while the render ran.
        if job.ticket.generation != self.generation {
            log::debug!("Dropping stale render of page {}", job.page);
            return;
        }
        let Some(slot) = self.slots.get_mut(&job.ticket.slot) else {
            return;
        };
        if slot.page != job.page {
            return;
        }

        match result {
            Ok(bitmap) => slot.content = SlotContent::Ready(bitmap),
            Err(RenderError::Cancelled) => {
                log::debug!("Render of page {} cancelled", job.page);
            }
            Err(e) => {
                log::error!("{}", e);
                slot.content = SlotContent::Failed(e.to_string());
                // Retried when the placeholder is next in range.
                if let SlotId::Placeholder(page) = job.ticket.slot {
                    self.tracker.forget_request(page);
                }
            }
        }
    }

    fn next_target(&self) -> Option<u32> {
        let count = self.state.page_count();
        if count == 0 {
            return None;
        }
        match self.state.display_mode {
            DisplayMode::Double => next_spread_start(self.state.page, count),
            DisplayMode::Single | DisplayMode::Scroll => {
                (self.state.page < count).then_some(self.state.page + 1)
            }
        }
    }

    fn previous_target(&self) -> Option<u32> {
        if self.state.document.is_none() {
            return None;
        }
        match self.state.display_mode {
            DisplayMode::Double => previous_spread_start(self.state.page),
            DisplayMode::Single | DisplayMode::Scroll => {
                (self.state.page > 1).then(|| self.state.page - 1)
            }
        }
    }

    fn go_to(&mut self, target: u32, now: Instant) -> bool {
        let Some(doc) = self.state.document.clone() else {
            return false;
        };
        let previous = self.state.page;
        self.state.page = doc.clamp_page(i64::from(target));

        match self.state.display_mode {
            DisplayMode::Scroll => {
                self.scroll_top = self.tracker.page_top(self.state.page).unwrap_or(0.0);
                self.tracker.begin_programmatic_scroll(
                    self.state.page,
                    now,
                    self.config.jump_settle(),
                );
                self.request_visible_renders(&doc);
            }
            DisplayMode::Double
                if spread_start(previous) == spread_start(self.state.page)
                    && !self.slots.is_empty() => {}
            DisplayMode::Single | DisplayMode::Double => {
                self.cancel_all();
                self.rebuild(now, self.config.open_settle());
            }
        }
        true
    }

    fn step_zoom(&mut self, direction: i32, now: Instant) -> bool {
        self.reconcile_from_scroll();
        if self.state.document.is_none() {
            return false;
        }
        let scale = step_scale(
            self.state.scale,
            direction,
            self.config.zoom_step,
            self.config.min_manual_scale,
            self.config.max_manual_scale,
        );
        if scale == self.state.scale {
            return false;
        }
        self.state.zoom_mode = ZoomMode::Manual;
        self.state.scale = scale;
        self.cancel_all();
        self.rebuild(now, self.config.open_settle());
        true
    }

    fn refresh_scale(&mut self) {
        let Some(doc) = self.state.document.as_ref() else {
            return;
        };
        self.state.scale = compute_scale(
            doc.page_size(self.state.page),
            self.state.display_mode,
            self.state.zoom_mode,
            self.container,
            self.state.scale,
            self.config.fit_options(),
        );
    }

    fn apply_resize(&mut self, now: Instant) {
        if self.state.document.is_none() {
            return;
        }
        if self.state.zoom_mode == ZoomMode::Manual {
            if self.state.display_mode == DisplayMode::Scroll {
                self.on_scroll(now);
            }
            return;
        }

        self.reconcile_from_scroll();
        let before = self.state.scale;
        self.refresh_scale();
        if before != self.state.scale {
            log::debug!("Resize re-fit scale {:.3} -> {:.3}", before, self.state.scale);
            self.cancel_all();
            self.rebuild(now, self.config.open_settle());
        } else if self.state.display_mode == DisplayMode::Scroll {
            self.on_scroll(now);
        }
    }

    /// In scroll mode, adopt the page the tracker last saw as most visible.
    fn reconcile_from_scroll(&mut self) {
        if self.state.display_mode != DisplayMode::Scroll {
            return;
        }
        let (Some(doc), Some(page)) = (
            self.state.document.as_ref(),
            self.tracker.last_most_visible(),
        ) else {
            return;
        };
        self.state.page = doc.clamp_page(i64::from(page));
    }

    fn on_scroll(&mut self, now: Instant) {
        let Some(doc) = self.state.document.clone() else {
            return;
        };
        self.request_visible_renders(&doc);
        let viewport = self.viewport();
        if let Some(page) = self.tracker.observe(viewport, now) {
            self.state.page = doc.clamp_page(i64::from(page));
        }
    }

    fn max_scroll(&self) -> f64 {
        let last_top = self
            .tracker
            .page_top(self.state.page_count())
            .unwrap_or(0.0);
        (self.tracker.total_height() - self.container.height).max(last_top)
    }

    fn cancel_all(&mut self) {
        if let Some(token) = self.active.take() {
            token.cancel();
        }
        for job in &self.queue {
            job.token.cancel();
        }
    }

    /// Throw away every slot and lay the view out again for the current mode.
    fn rebuild(&mut self, now: Instant, settle: std::time::Duration) {
        let Some(doc) = self.state.document.clone() else {
            return;
        };
        self.generation += 1;
        self.slots.clear();
        self.tracker.clear();

        let page = self.state.page;
        match self.state.display_mode {
            DisplayMode::Single | DisplayMode::Double => {
                let token = CancellationToken::new();
                self.active = Some(token.clone());
                let pages = if self.state.display_mode == DisplayMode::Double {
                    spread_pages(page, doc.page_count())
                } else {
                    vec![page]
                };
                for (index, page) in pages.into_iter().enumerate() {
                    self.enqueue(SlotId::Spread(index as u8), page, &doc, token.clone());
                }
            }
            DisplayMode::Scroll => {
                let sizes: Vec<PageSize> = (1..=doc.page_count())
                    .map(|p| doc.page_geometry(p, self.state.scale))
                    .collect();
                let heights: Vec<f64> = sizes.iter().map(|s| s.height).collect();
                self.tracker.layout(&heights, self.config.scroll_page_gap);
                for (index, size) in sizes.into_iter().enumerate() {
                    let page = index as u32 + 1;
                    self.slots.insert(
                        SlotId::Placeholder(page),
                        PageSlot {
                            page,
                            size,
                            content: SlotContent::Empty,
                        },
                    );
                }
                self.scroll_top = self.tracker.page_top(page).unwrap_or(0.0);
                self.tracker.begin_programmatic_scroll(page, now, settle);
                self.request_visible_renders(&doc);
            }
        }
    }

    fn request_visible_renders(&mut self, doc: &DocumentHandle) {
        let viewport = self.viewport();
        for page in self.tracker.pages_to_render(viewport) {
            // Placeholders render independently and never cancel each other.
            self.enqueue(SlotId::Placeholder(page), page, doc, CancellationToken::new());
        }
    }

    fn enqueue(&mut self, slot: SlotId, page: u32, doc: &DocumentHandle, token: CancellationToken) {
        let scale = self.state.scale;
        self.slots.insert(
            slot,
            PageSlot {
                page,
                size: doc.page_geometry(page, scale),
                content: SlotContent::Pending,
            },
        );
        self.queue.push_back(RenderJob {
            ticket: RenderTicket {
                generation: self.generation,
                slot,
            },
            document: doc.id(),
            page,
            scale,
            token,
        });
    }
}
