//! Host surfaces the viewer is bound to

use std::sync::{Arc, Mutex, PoisonError};

/// Measured size of a host surface in pixels
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// A host element that can report its rendered size
pub trait Surface: Send + Sync {
    /// Current client size, `None` while layout has not settled
    fn client_size(&self) -> Option<Size>;
}

/// Outer scroll region plus the inner element pages are laid into
#[derive(Clone)]
pub struct ContainerPair {
    pub scroll: Arc<dyn Surface>,
    pub content: Arc<dyn Surface>,
}

impl ContainerPair {
    pub fn new(scroll: Arc<dyn Surface>, content: Arc<dyn Surface>) -> Self {
        Self { scroll, content }
    }

    /// Size of the scroll region, which bounds what the user sees
    #[must_use]
    pub fn viewport_size(&self) -> Option<Size> {
        self.scroll.client_size()
    }
}

/// Surface whose size is set by the host
#[derive(Clone, Default)]
pub struct FixedSurface {
    size: Arc<Mutex<Option<Size>>>,
}

impl FixedSurface {
    #[must_use]
    pub fn new(size: Option<Size>) -> Self {
        Self {
            size: Arc::new(Mutex::new(size)),
        }
    }

    pub fn set_size(&self, size: Option<Size>) {
        *self.size.lock().unwrap_or_else(PoisonError::into_inner) = size;
    }
}

impl Surface for FixedSurface {
    fn client_size(&self) -> Option<Size> {
        *self.size.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
