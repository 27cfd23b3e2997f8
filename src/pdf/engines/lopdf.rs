//! Pure-Rust engine backed by `lopdf`

use lopdf::{Dictionary, Document as PdfDocument, Object};

use super::{LETTER, PageGeometry};
use crate::pdf::engine::{DocumentHandle, EngineError, RenderEngine};
use crate::pdf::types::PageBox;

/// Limit on `/Parent` hops when resolving inherited attributes
const MAX_INHERIT_DEPTH: usize = 32;

#[derive(Clone, Copy, Debug, Default)]
pub struct LopdfEngine;

impl LopdfEngine {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl RenderEngine for LopdfEngine {
    fn name(&self) -> &'static str {
        "lopdf"
    }

    fn parse(&self, bytes: &[u8]) -> Result<Box<dyn DocumentHandle>, EngineError> {
        let document =
            PdfDocument::load_mem(bytes).map_err(|e| EngineError::Parse(e.to_string()))?;

        let pages = document.get_pages();
        if pages.is_empty() {
            return Err(EngineError::Parse("document has no pages".to_string()));
        }

        let boxes = pages
            .values()
            .map(|&page_id| {
                document
                    .get_dictionary(page_id)
                    .map_or(LETTER, |page| page_box(&document, page))
            })
            .collect();

        Ok(Box::new(PageGeometry::new(self.name(), boxes)))
    }
}

/// Visible box of a page at scale 1, rotation applied
fn page_box(document: &PdfDocument, page: &Dictionary) -> PageBox {
    let declared = inherited(document, page, b"MediaBox")
        .and_then(|obj| rect_size(document, obj))
        .or_else(|| inherited(document, page, b"CropBox").and_then(|obj| rect_size(document, obj)))
        .unwrap_or(LETTER);

    let rotate = inherited(document, page, b"Rotate")
        .map(|obj| resolve(document, obj))
        .and_then(|obj| match obj {
            Object::Integer(i) => Some(*i),
            _ => None,
        })
        .unwrap_or(0);

    if rotate.rem_euclid(180) == 90 {
        declared.rotated()
    } else {
        declared
    }
}

/// Look up `key` on the page or the nearest ancestor defining it
fn inherited<'a>(document: &'a PdfDocument, page: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    let mut node = page;
    for _ in 0..MAX_INHERIT_DEPTH {
        if let Ok(value) = node.get(key) {
            return Some(value);
        }
        let parent = match node.get(b"Parent") {
            Ok(Object::Reference(id)) => document.get_dictionary(*id).ok()?,
            _ => return None,
        };
        node = parent;
    }
    None
}

fn resolve<'a>(document: &'a PdfDocument, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => document.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

fn rect_size(document: &PdfDocument, obj: &Object) -> Option<PageBox> {
    let Object::Array(values) = resolve(document, obj) else {
        return None;
    };
    if values.len() < 4 {
        return None;
    }

    let mut coords = [0.0f32; 4];
    for (slot, value) in coords.iter_mut().zip(values) {
        *slot = object_to_float(resolve(document, value))?;
    }
    let [x1, y1, x2, y2] = coords;
    let page_box = PageBox::new((x2 - x1).abs(), (y2 - y1).abs());
    page_box.is_usable().then_some(page_box)
}

#[allow(clippy::cast_precision_loss, clippy::unnecessary_cast)]
fn object_to_float(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(f) => Some(*f as f32),
        _ => None,
    }
}
