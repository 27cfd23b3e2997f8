//! Imperative viewer instance
//!
//! A viewer is bound to one container pair for its whole life, holds zero
//! or one document, and reports page/scale changes through its
//! [`EventEmitter`]. [`PagedViewer`] is the built-in implementation used by
//! every engine unless it supplies its own.

use log::{debug, warn};

use super::cache::{CacheKey, PageBoxCache};
use super::engine::Document;
use super::events::{EngineEvent, EventEmitter};
use super::surface::ContainerPair;
use super::types::{PageBox, PagingMode, SCALE_EPSILON, is_valid_scale, scale_differs_by};
use super::zoom::{page_at_offset, page_offset, total_height};

/// Vertical gap between pages in continuous mode, in pixels at any scale
pub const PAGE_GAP: f32 = 10.0;

pub const DEFAULT_BOX_CACHE_SIZE: usize = 256;

/// Construction-time choices for a viewer instance
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewerOptions {
    pub mode: PagingMode,
    pub page_box_cache_size: usize,
    /// Scale writes closer than this to the current scale are ignored
    pub scale_epsilon: f32,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            mode: PagingMode::default(),
            page_box_cache_size: DEFAULT_BOX_CACHE_SIZE,
            scale_epsilon: SCALE_EPSILON,
        }
    }
}

/// Operations the controller performs on a viewer instance
pub trait Viewer {
    fn mode(&self) -> PagingMode;

    /// Replace the shown document. `None` detaches the current one.
    fn set_document(&mut self, document: Option<Document>);

    fn has_document(&self) -> bool;

    fn pages_count(&self) -> usize;

    /// 1-indexed, 0 while no document is attached
    fn current_page(&self) -> usize;

    fn set_current_page(&mut self, page: usize);

    fn current_scale(&self) -> f32;

    fn set_current_scale(&mut self, scale: f32);

    /// User scroll by `delta` pixels
    fn scroll_by(&mut self, _delta: f32) {}
}

pub struct PagedViewer {
    containers: ContainerPair,
    mode: PagingMode,
    emitter: EventEmitter,
    document: Option<Document>,
    boxes: PageBoxCache,
    current_page: usize,
    scale: f32,
    scale_epsilon: f32,
    scroll_offset: f32,
}

impl PagedViewer {
    #[must_use]
    pub fn new(containers: ContainerPair, mode: PagingMode, emitter: EventEmitter) -> Self {
        let options = ViewerOptions {
            mode,
            ..ViewerOptions::default()
        };
        Self::with_options(containers, options, emitter)
    }

    #[must_use]
    pub fn with_options(
        containers: ContainerPair,
        options: ViewerOptions,
        emitter: EventEmitter,
    ) -> Self {
        Self {
            containers,
            mode: options.mode,
            emitter,
            document: None,
            boxes: PageBoxCache::new(options.page_box_cache_size),
            current_page: 0,
            scale: 1.0,
            scale_epsilon: options.scale_epsilon,
            scroll_offset: 0.0,
        }
    }

    /// Current scroll position in pixels (continuous mode)
    #[must_use]
    pub fn scroll_offset(&self) -> f32 {
        self.scroll_offset
    }

    /// Unscaled box of a 1-indexed page
    fn base_box(&mut self, page: usize) -> Option<PageBox> {
        let document = self.document.as_ref()?;
        let key = CacheKey::new(page, 1.0);
        if let Some(page_box) = self.boxes.get(&key) {
            return Some(page_box);
        }
        match document.page_box(page, 1.0) {
            Ok(page_box) => {
                self.boxes.insert(key, page_box);
                Some(page_box)
            }
            Err(e) => {
                warn!("Failed to measure page {page}: {e}");
                None
            }
        }
    }

    fn scaled_heights(&mut self) -> Vec<f32> {
        let count = self.pages_count();
        let scale = self.scale;
        (1..=count)
            .map(|page| self.base_box(page).map_or(0.0, |b| b.height * scale))
            .collect()
    }

    fn sync_offset_to_page(&mut self) {
        if self.mode == PagingMode::Continuous {
            let heights = self.scaled_heights();
            self.scroll_offset = page_offset(self.current_page, &heights, PAGE_GAP);
        }
    }
}

impl Viewer for PagedViewer {
    fn mode(&self) -> PagingMode {
        self.mode
    }

    fn set_document(&mut self, document: Option<Document>) {
        self.document = None;
        self.boxes.invalidate_all();
        self.current_page = 0;
        self.scroll_offset = 0.0;

        let Some(document) = document else {
            debug!("Viewer detached document");
            return;
        };

        let count = document.page_count();
        self.document = Some(document);
        self.current_page = usize::from(count > 0);
        self.emitter.emit(EngineEvent::PagesInit);

        for page in 1..=count {
            let _ = self.base_box(page);
        }
        debug!("Viewer ({}) laid out {count} pages", self.mode.as_str());
        self.emitter.emit(EngineEvent::PagesLoaded(count));
    }

    fn has_document(&self) -> bool {
        self.document.is_some()
    }

    fn pages_count(&self) -> usize {
        self.document.as_ref().map_or(0, Document::page_count)
    }

    fn current_page(&self) -> usize {
        self.current_page
    }

    fn set_current_page(&mut self, page: usize) {
        let count = self.pages_count();
        if page == 0 || page > count || page == self.current_page {
            return;
        }
        self.current_page = page;
        self.sync_offset_to_page();
        self.emitter.emit(EngineEvent::PageChanging(page));
    }

    fn current_scale(&self) -> f32 {
        self.scale
    }

    fn set_current_scale(&mut self, scale: f32) {
        if self.document.is_none()
            || !is_valid_scale(scale)
            || !scale_differs_by(scale, self.scale, self.scale_epsilon)
        {
            return;
        }
        self.scale = scale;
        self.sync_offset_to_page();
        self.emitter.emit(EngineEvent::ScaleChanging(scale));
    }

    fn scroll_by(&mut self, delta: f32) {
        if self.document.is_none() || !delta.is_finite() {
            return;
        }

        match self.mode {
            PagingMode::Continuous => {
                let heights = self.scaled_heights();
                let viewport = self
                    .containers
                    .viewport_size()
                    .map_or(0.0, |size| size.height);
                let max_offset = (total_height(&heights, PAGE_GAP) - viewport).max(0.0);
                self.scroll_offset = (self.scroll_offset + delta).clamp(0.0, max_offset);

                let page = page_at_offset(self.scroll_offset, &heights, PAGE_GAP);
                if page != self.current_page {
                    self.current_page = page;
                    self.emitter.emit(EngineEvent::PageChanging(page));
                }
            }
            PagingMode::SinglePage => {
                let current = self.current_page;
                let height = self.base_box(current).map_or(0.0, |b| b.height * self.scale);
                if height <= 0.0 {
                    return;
                }
                if delta >= height {
                    self.set_current_page(current + 1);
                } else if delta <= -height && current > 1 {
                    self.set_current_page(current - 1);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::pdf::engine::{DocumentHandle, EngineError};
    use crate::pdf::events::{EventBus, EventKind};
    use crate::pdf::surface::{FixedSurface, Size};

    struct Uniform {
        pages: usize,
    }

    impl DocumentHandle for Uniform {
        fn page_count(&self) -> usize {
            self.pages
        }

        fn page_box(&self, page: usize, scale: f32) -> Result<PageBox, EngineError> {
            if page == 0 || page > self.pages {
                return Err(EngineError::PageOutOfRange {
                    page,
                    count: self.pages,
                });
            }
            Ok(PageBox::new(100.0, 200.0).scaled(scale))
        }

        fn destroy(&self) {}
    }

    fn setup(mode: PagingMode, pages: usize) -> (EventBus, PagedViewer) {
        let mut bus = EventBus::new();
        for kind in EventKind::ALL {
            let _ = bus.on(kind);
        }
        let surface = Arc::new(FixedSurface::new(Some(Size::new(300.0, 250.0))));
        let containers = ContainerPair::new(surface.clone(), surface);
        let mut viewer = PagedViewer::new(containers, mode, bus.emitter());
        viewer.set_document(Some(Document::new(Box::new(Uniform { pages }))));
        (bus, viewer)
    }

    #[test]
    fn set_document_emits_init_then_loaded() {
        let (bus, viewer) = setup(PagingMode::SinglePage, 3);
        assert_eq!(
            bus.drain(),
            vec![EngineEvent::PagesInit, EngineEvent::PagesLoaded(3)]
        );
        assert_eq!(viewer.current_page(), 1);
    }

    #[test]
    fn out_of_range_and_unchanged_pages_ignored() {
        let (bus, mut viewer) = setup(PagingMode::SinglePage, 3);
        bus.drain();

        viewer.set_current_page(0);
        viewer.set_current_page(4);
        viewer.set_current_page(1);
        assert!(bus.drain().is_empty());

        viewer.set_current_page(2);
        assert_eq!(bus.drain(), vec![EngineEvent::PageChanging(2)]);
    }

    #[test]
    fn scale_within_tolerance_is_ignored() {
        let (bus, mut viewer) = setup(PagingMode::SinglePage, 1);
        bus.drain();

        viewer.set_current_scale(1.0005);
        viewer.set_current_scale(f32::NAN);
        assert!(bus.drain().is_empty());

        viewer.set_current_scale(2.0);
        assert_eq!(bus.drain(), vec![EngineEvent::ScaleChanging(2.0)]);
    }

    #[test]
    fn configured_tolerance_applies_to_scale_writes() {
        let mut bus = EventBus::new();
        let _ = bus.on(EventKind::ScaleChanging);
        let surface = Arc::new(FixedSurface::new(Some(Size::new(300.0, 250.0))));
        let options = ViewerOptions {
            scale_epsilon: 0.0001,
            ..ViewerOptions::default()
        };
        let containers = ContainerPair::new(surface.clone(), surface);
        let mut viewer = PagedViewer::with_options(containers, options, bus.emitter());
        viewer.set_document(Some(Document::new(Box::new(Uniform { pages: 1 }))));

        viewer.set_current_scale(1.0005);
        assert_eq!(bus.drain(), vec![EngineEvent::ScaleChanging(1.0005)]);
    }

    #[test]
    fn continuous_scroll_changes_page() {
        let (bus, mut viewer) = setup(PagingMode::Continuous, 3);
        bus.drain();

        viewer.scroll_by(215.0);
        assert_eq!(viewer.current_page(), 2);
        assert_eq!(bus.drain(), vec![EngineEvent::PageChanging(2)]);

        // 3 pages of 200 + 2 gaps - 250 viewport
        viewer.scroll_by(10_000.0);
        assert_eq!(viewer.scroll_offset(), 370.0);
    }

    #[test]
    fn continuous_page_jump_scrolls_to_page_top() {
        let (_bus, mut viewer) = setup(PagingMode::Continuous, 3);
        viewer.set_current_page(3);
        assert_eq!(viewer.scroll_offset(), 420.0);

        viewer.set_current_scale(0.5);
        assert_eq!(viewer.scroll_offset(), 220.0);
    }

    #[test]
    fn single_page_scroll_flips_pages() {
        let (bus, mut viewer) = setup(PagingMode::SinglePage, 2);
        bus.drain();

        viewer.scroll_by(50.0);
        assert_eq!(viewer.current_page(), 1);

        viewer.scroll_by(200.0);
        assert_eq!(viewer.current_page(), 2);

        viewer.scroll_by(-200.0);
        assert_eq!(viewer.current_page(), 1);
        assert_eq!(
            bus.drain(),
            vec![EngineEvent::PageChanging(2), EngineEvent::PageChanging(1)]
        );
    }

    #[test]
    fn detaching_clears_state() {
        let (_bus, mut viewer) = setup(PagingMode::SinglePage, 2);
        viewer.set_document(None);
        assert!(!viewer.has_document());
        assert_eq!(viewer.pages_count(), 0);
        assert_eq!(viewer.current_page(), 0);
    }
}
