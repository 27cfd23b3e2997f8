//! MuPDF-backed engine

use mupdf::Document as MuDocument;

use super::{LETTER, PageGeometry};
use crate::pdf::engine::{DocumentHandle, EngineError, RenderEngine};
use crate::pdf::types::PageBox;

impl From<mupdf::error::Error> for EngineError {
    fn from(e: mupdf::error::Error) -> Self {
        EngineError::Parse(e.to_string())
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct MupdfEngine;

impl MupdfEngine {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl RenderEngine for MupdfEngine {
    fn name(&self) -> &'static str {
        "mupdf"
    }

    // MuPDF documents are not Send, so geometry is read here and the
    // document dropped before returning
    fn parse(&self, bytes: &[u8]) -> Result<Box<dyn DocumentHandle>, EngineError> {
        let doc = MuDocument::from_bytes(bytes, "application/pdf")?;
        let page_count = doc.page_count()?;
        if page_count <= 0 {
            return Err(EngineError::Parse("document has no pages".to_string()));
        }

        let mut boxes = Vec::with_capacity(page_count as usize);
        for idx in 0..page_count {
            let page = doc.load_page(idx)?;
            let bounds = page.bounds()?;
            let page_box = PageBox::new(bounds.x1 - bounds.x0, bounds.y1 - bounds.y0);
            boxes.push(if page_box.is_usable() { page_box } else { LETTER });
        }

        Ok(Box::new(PageGeometry::new(self.name(), boxes)))
    }
}
