//! Engine implementations
//!
//! Both engines measure every page while parsing and keep only the
//! geometry, so the resulting handle is plain data and can cross threads.

#[cfg(feature = "lopdf")]
mod lopdf;
#[cfg(feature = "mupdf")]
mod mupdf;

use std::sync::Arc;

use log::debug;

use super::engine::{DocumentHandle, EngineError, RenderEngine};
use super::types::PageBox;

#[cfg(feature = "lopdf")]
pub use self::lopdf::LopdfEngine;
#[cfg(feature = "mupdf")]
pub use self::mupdf::MupdfEngine;

/// US Letter in points, used when a page declares no usable box
pub const LETTER: PageBox = PageBox::new(612.0, 792.0);

/// Document handle holding per-page boxes at scale 1
#[derive(Debug)]
pub struct PageGeometry {
    engine: &'static str,
    boxes: Vec<PageBox>,
}

impl PageGeometry {
    #[must_use]
    pub fn new(engine: &'static str, boxes: Vec<PageBox>) -> Self {
        Self { engine, boxes }
    }
}

impl DocumentHandle for PageGeometry {
    fn page_count(&self) -> usize {
        self.boxes.len()
    }

    fn page_box(&self, page: usize, scale: f32) -> Result<PageBox, EngineError> {
        page.checked_sub(1)
            .and_then(|idx| self.boxes.get(idx))
            .map(|page_box| page_box.scaled(scale))
            .ok_or(EngineError::PageOutOfRange {
                page,
                count: self.boxes.len(),
            })
    }

    fn destroy(&self) {
        debug!("{}: released {} page boxes", self.engine, self.boxes.len());
    }
}

/// Engine picked by enabled features, preferring MuPDF
#[must_use]
pub fn default_engine() -> Option<Arc<dyn RenderEngine>> {
    #[cfg(feature = "mupdf")]
    {
        return Some(Arc::new(MupdfEngine::new()));
    }

    #[cfg(all(feature = "lopdf", not(feature = "mupdf")))]
    {
        return Some(Arc::new(LopdfEngine::new()));
    }

    #[allow(unreachable_code)]
    None
}
