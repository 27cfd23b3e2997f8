//! Zoom stepping and scroll geometry
//!
//! Scale limits used by the toolbar, plus the offset math the continuous
//! viewer uses to map between scroll position and page number.

/// Scale bounds and step used by zoom buttons
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoomLimits {
    pub min: f32,
    pub max: f32,
    pub step: f32,
    pub default: f32,
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self {
            min: Zoom::MIN_SCALE,
            max: Zoom::MAX_SCALE,
            step: Zoom::SCALE_STEP,
            default: Zoom::DEFAULT_SCALE,
        }
    }
}

/// Committed zoom factor with bounded stepping
#[derive(Clone, Copy, Debug)]
pub struct Zoom {
    /// Current zoom factor (1.0 = 100%)
    factor: f32,
    limits: ZoomLimits,
}

impl Default for Zoom {
    fn default() -> Self {
        Self::new(ZoomLimits::default())
    }
}

impl Zoom {
    /// Scale a freshly opened viewer starts at
    pub const DEFAULT_SCALE: f32 = 1.25;
    /// Lowest scale reachable with the zoom buttons
    pub const MIN_SCALE: f32 = 0.5;
    /// Highest scale reachable with the zoom buttons
    pub const MAX_SCALE: f32 = 3.0;
    /// Additive step per button press
    pub const SCALE_STEP: f32 = 0.25;
    /// Bounds of the free-text percentage input
    pub const MIN_PERCENT: f32 = 10.0;
    pub const MAX_PERCENT: f32 = 400.0;

    #[must_use]
    pub fn new(limits: ZoomLimits) -> Self {
        Self {
            factor: limits.default,
            limits,
        }
    }

    #[must_use]
    pub fn factor(&self) -> f32 {
        self.factor
    }

    #[must_use]
    pub fn limits(&self) -> ZoomLimits {
        self.limits
    }

    /// Set the factor directly. Non-finite or non-positive values are ignored.
    ///
    /// Values outside the button range are accepted: fit results and typed
    /// percentages may legitimately land there.
    pub fn set(&mut self, factor: f32) -> bool {
        if !factor.is_finite() || factor <= 0.0 {
            return false;
        }
        self.factor = factor;
        true
    }

    pub fn step_in(&mut self) {
        self.factor = (self.factor + self.limits.step).min(self.limits.max);
    }

    pub fn step_out(&mut self) {
        self.factor = (self.factor - self.limits.step).max(self.limits.min);
    }

    pub fn reset(&mut self) {
        self.factor = self.limits.default;
    }

    #[must_use]
    pub fn can_step_in(&self) -> bool {
        self.factor < self.limits.max
    }

    #[must_use]
    pub fn can_step_out(&self) -> bool {
        self.factor > self.limits.min
    }

    /// Factor rendered as a rounded percentage
    #[must_use]
    pub fn percent(&self) -> i64 {
        to_percent(self.factor)
    }
}

/// Round a scale factor to an integer percentage
#[must_use]
pub fn to_percent(factor: f32) -> i64 {
    (f64::from(factor) * 100.0).round() as i64
}

/// Clamp a typed percentage into the accepted input range
#[must_use]
pub fn clamp_percent(percent: f32) -> f32 {
    percent.clamp(Zoom::MIN_PERCENT, Zoom::MAX_PERCENT)
}

/// Scroll offset at which a 1-indexed page starts in a continuous layout
#[must_use]
pub fn page_offset(page: usize, page_heights: &[f32], gap: f32) -> f32 {
    page_heights
        .iter()
        .take(page.saturating_sub(1))
        .map(|h| h + gap)
        .sum()
}

/// Total scrollable height of a continuous layout
#[must_use]
pub fn total_height(page_heights: &[f32], gap: f32) -> f32 {
    let pages: f32 = page_heights.iter().map(|h| h + gap).sum();
    (pages - gap).max(0.0)
}

/// 1-indexed page whose extent contains the given offset
#[must_use]
pub fn page_at_offset(offset: f32, page_heights: &[f32], gap: f32) -> usize {
    let mut start = 0.0;
    for (idx, height) in page_heights.iter().enumerate() {
        let end = start + height + gap;
        if offset < end {
            return idx + 1;
        }
        start = end;
    }
    page_heights.len().max(1)
}
