//! Rendering engine collaborator contract
//!
//! The engine parses bytes into a [`DocumentHandle`] and builds the
//! imperative [`Viewer`] bound to a container pair. Everything in this
//! crate talks to PDF content only through these traits.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::events::EventEmitter;
use super::surface::ContainerPair;
use super::types::{PageBox, RenderedPage};
use super::viewer::{PagedViewer, Viewer, ViewerOptions};

/// Errors raised by an engine implementation
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("document could not be parsed: {0}")]
    Parse(String),

    #[error("page {page} is out of range (document has {count} pages)")]
    PageOutOfRange { page: usize, count: usize },

    #[error("document handle was already destroyed")]
    Destroyed,
}

/// Parsed document as exposed by an engine
pub trait DocumentHandle: Send + Sync {
    /// Number of pages
    fn page_count(&self) -> usize;

    /// Box of a 1-indexed page at the given scale
    fn page_box(&self, page: usize, scale: f32) -> Result<PageBox, EngineError>;

    /// Render a 1-indexed page at `scale`. Engines that only know page
    /// geometry lay the page out without producing pixels.
    fn render_page(&self, page: usize, scale: f32) -> Result<RenderedPage, EngineError> {
        Ok(RenderedPage {
            page,
            scale,
            size: self.page_box(page, scale)?,
        })
    }

    /// Release engine resources. Called exactly once by [`Document`].
    fn destroy(&self);
}

/// The external PDF engine
pub trait RenderEngine: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Parse raw bytes into a document handle
    fn parse(&self, bytes: &[u8]) -> Result<Box<dyn DocumentHandle>, EngineError>;

    /// Build the viewer instance for a mounted container pair
    fn create_viewer(
        &self,
        containers: &ContainerPair,
        options: ViewerOptions,
        emitter: EventEmitter,
    ) -> Box<dyn Viewer> {
        Box::new(PagedViewer::with_options(containers.clone(), options, emitter))
    }
}

struct DocumentInner {
    handle: Box<dyn DocumentHandle>,
    destroyed: AtomicBool,
}

impl DocumentInner {
    fn release(&self) {
        if !self.destroyed.swap(true, Ordering::AcqRel) {
            self.handle.destroy();
        }
    }
}

impl Drop for DocumentInner {
    fn drop(&mut self) {
        self.release();
    }
}

/// Shared owner of a [`DocumentHandle`].
///
/// The handle is destroyed on the first explicit [`Document::destroy`] or,
/// failing that, when the last clone is dropped. Queries on a destroyed
/// document fail with [`EngineError::Destroyed`].
#[derive(Clone)]
pub struct Document {
    inner: Arc<DocumentInner>,
}

impl Document {
    #[must_use]
    pub fn new(handle: Box<dyn DocumentHandle>) -> Self {
        Self {
            inner: Arc::new(DocumentInner {
                handle,
                destroyed: AtomicBool::new(false),
            }),
        }
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        if self.is_destroyed() {
            0
        } else {
            self.inner.handle.page_count()
        }
    }

    pub fn page_box(&self, page: usize, scale: f32) -> Result<PageBox, EngineError> {
        if self.is_destroyed() {
            return Err(EngineError::Destroyed);
        }
        self.inner.handle.page_box(page, scale)
    }

    pub fn render_page(&self, page: usize, scale: f32) -> Result<RenderedPage, EngineError> {
        if self.is_destroyed() {
            return Err(EngineError::Destroyed);
        }
        self.inner.handle.render_page(page, scale)
    }

    /// Destroy the underlying handle now, for every clone
    pub fn destroy(&self) {
        self.inner.release();
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::Acquire)
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("destroyed", &self.is_destroyed())
            .finish_non_exhaustive()
    }
}
