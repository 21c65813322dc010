//! Placeholder layout and visibility bookkeeping for continuous scroll mode.
//!
//! One tracker answers both questions the scroll view asks on every scroll
//! event: which placeholders are close enough to the viewport to render now,
//! and which page currently dominates the viewport.

use std::collections::HashSet;
use std::time::{Duration, Instant};

/// A reserved, correctly sized slot for one page in the scroll column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placeholder {
    pub page: u32,
    pub top: f64,
    pub height: f64,
}

impl Placeholder {
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Vertical overlap with `[top, bottom)`, zero when disjoint.
    pub fn overlap(&self, top: f64, bottom: f64) -> f64 {
        (self.bottom().min(bottom) - self.top.max(top)).max(0.0)
    }
}

/// The visible part of the scroll column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportRect {
    pub top: f64,
    pub height: f64,
}

impl ViewportRect {
    pub fn new(top: f64, height: f64) -> Self {
        Self { top, height }
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

/// Page with the largest vertical overlap with `viewport`. Ties go to the
/// placeholder encountered first. `None` when nothing overlaps.
pub fn most_visible_page(placeholders: &[Placeholder], viewport: ViewportRect) -> Option<u32> {
    let mut best: Option<(u32, f64)> = None;
    for placeholder in placeholders {
        let overlap = placeholder.overlap(viewport.top, viewport.bottom());
        if overlap <= 0.0 {
            continue;
        }
        match best {
            Some((_, best_overlap)) if overlap <= best_overlap => {}
            _ => best = Some((placeholder.page, overlap)),
        }
    }
    best.map(|(page, _)| page)
}

#[derive(Debug)]
pub struct VisibilityTracker {
    placeholders: Vec<Placeholder>,
    requested: HashSet<u32>,
    margin: f64,
    last_most_visible: Option<u32>,
    suppressed_until: Option<Instant>,
}

impl VisibilityTracker {
    pub fn new(margin: f64) -> Self {
        Self {
            placeholders: Vec::new(),
            requested: HashSet::new(),
            margin,
            last_most_visible: None,
            suppressed_until: None,
        }
    }

    /// Stack one placeholder per page, `heights[0]` being page 1. Forgets
    /// which pages were already requested.
    pub fn layout(&mut self, heights: &[f64], gap: f64) {
        let mut cursor = 0.0;
        self.placeholders = heights
            .iter()
            .enumerate()
            .map(|(index, &height)| {
                let placeholder = Placeholder {
                    page: index as u32 + 1,
                    top: cursor,
                    height,
                };
                cursor += height + gap;
                placeholder
            })
            .collect();
        self.requested.clear();
    }

    pub fn clear(&mut self) {
        self.placeholders.clear();
        self.requested.clear();
        self.last_most_visible = None;
        self.suppressed_until = None;
    }

    pub fn placeholders(&self) -> &[Placeholder] {
        &self.placeholders
    }

    pub fn page_top(&self, page: u32) -> Option<f64> {
        self.placeholder(page).map(|p| p.top)
    }

    pub fn placeholder(&self, page: u32) -> Option<&Placeholder> {
        page.checked_sub(1)
            .and_then(|index| self.placeholders.get(index as usize))
    }

    pub fn total_height(&self) -> f64 {
        self.placeholders.last().map(|p| p.bottom()).unwrap_or(0.0)
    }

    /// Pages within the lazy-render margin of `viewport` that have not been
    /// requested yet. Returned pages are marked requested.
    pub fn pages_to_render(&mut self, viewport: ViewportRect) -> Vec<u32> {
        let top = viewport.top - self.margin;
        let bottom = viewport.bottom() + self.margin;
        let mut pages = Vec::new();
        for placeholder in &self.placeholders {
            if placeholder.bottom() < top || placeholder.top > bottom {
                continue;
            }
            if self.requested.insert(placeholder.page) {
                pages.push(placeholder.page);
            }
        }
        pages
    }

    /// Let `page` be handed out by `pages_to_render` again.
    pub fn forget_request(&mut self, page: u32) {
        self.requested.remove(&page);
    }

    /// Recompute the most visible page unless a programmatic scroll is
    /// settling. Returns the new page when one was observed.
    pub fn observe(&mut self, viewport: ViewportRect, now: Instant) -> Option<u32> {
        if self.is_suppressed(now) {
            log::debug!("Ignoring visibility update during programmatic scroll");
            return None;
        }
        self.suppressed_until = None;
        let page = most_visible_page(&self.placeholders, viewport)?;
        self.last_most_visible = Some(page);
        Some(page)
    }

    /// Mark a programmatic scroll to `target`. Visibility updates are ignored
    /// until `settle` has elapsed.
    pub fn begin_programmatic_scroll(&mut self, target: u32, now: Instant, settle: Duration) {
        self.last_most_visible = Some(target);
        self.suppressed_until = Some(now + settle);
    }

    pub fn is_suppressed(&self, now: Instant) -> bool {
        self.suppressed_until.is_some_and(|until| now < until)
    }

    /// Whether a programmatic scroll flag exists that has now expired.
    pub fn settle_expired(&self, now: Instant) -> bool {
        self.suppressed_until.is_some_and(|until| now >= until)
    }

    pub fn last_most_visible(&self) -> Option<u32> {
        self.last_most_visible
    }
}
