//! Core types shared by the loader, viewer and synchronizer

/// Tolerance for scale comparisons
pub const SCALE_EPSILON: f32 = 0.001;

/// Width and height of a page (or surface) in CSS-like pixels
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageBox {
    pub width: f32,
    pub height: f32,
}

impl PageBox {
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Box of the same page at a different scale
    #[must_use]
    pub fn scaled(self, scale: f32) -> Self {
        Self::new(self.width * scale, self.height * scale)
    }

    /// Swap axes (for pages rotated by 90 or 270 degrees)
    #[must_use]
    pub fn rotated(self) -> Self {
        Self::new(self.height, self.width)
    }

    /// Length along one axis
    #[must_use]
    pub fn along(self, axis: FitAxis) -> f32 {
        match axis {
            FitAxis::Height => self.height,
            FitAxis::Width => self.width,
        }
    }

    /// True when both sides are finite and positive
    #[must_use]
    pub fn is_usable(self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Output of rendering one page at one scale
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderedPage {
    /// 1-indexed
    pub page: usize,
    pub scale: f32,
    /// Laid-out size at `scale`
    pub size: PageBox,
}

/// Paging behavior of a viewer, fixed at construction
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PagingMode {
    /// One page visible at a time
    #[default]
    SinglePage,
    /// All pages stacked vertically in one scroll region
    Continuous,
}

impl PagingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PagingMode::SinglePage => "single",
            PagingMode::Continuous => "continuous",
        }
    }
}

/// Axis a fit computation targets
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FitAxis {
    Height,
    Width,
}

/// Page and scale the caller wants the viewer to show
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DesiredState {
    /// 1-indexed, may be out of range of the current document
    pub page: usize,
    pub scale: f32,
}

impl Default for DesiredState {
    fn default() -> Self {
        Self {
            page: 1,
            scale: 1.0,
        }
    }
}

/// Last state reported by the viewer
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ObservedState {
    pub page_count: usize,
    /// 1-indexed, 0 only while no document is shown
    pub current_page: usize,
    pub current_scale: f32,
}

impl Default for ObservedState {
    fn default() -> Self {
        Self {
            page_count: 0,
            current_page: 0,
            current_scale: 1.0,
        }
    }
}

/// Clamp a requested 1-indexed page into `[1, page_count]`.
///
/// Returns `None` when there are no pages, so callers can skip the write.
#[must_use]
pub fn clamp_page(page: usize, page_count: usize) -> Option<usize> {
    if page_count == 0 {
        None
    } else {
        Some(page.clamp(1, page_count))
    }
}

/// True when two scales differ by more than `epsilon`
#[must_use]
pub fn scale_differs_by(a: f32, b: f32, epsilon: f32) -> bool {
    (a - b).abs() > epsilon
}

/// A scale the viewer can use: finite and positive
#[must_use]
pub fn is_valid_scale(scale: f32) -> bool {
    scale.is_finite() && scale > 0.0
}
