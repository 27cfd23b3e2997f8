//! Plain configuration consumed by the controller and shell

use log::warn;

use super::fit::{FALLBACK_FRACTION, FIT_MAX_SCALE, FIT_MIN_SCALE, FIT_PADDING};
use super::types::{PagingMode, SCALE_EPSILON};
use super::viewer::{DEFAULT_BOX_CACHE_SIZE, ViewerOptions};
use super::zoom::ZoomLimits;

/// Default size of the loader worker pool
pub const DEFAULT_LOADER_WORKERS: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewerConfig {
    pub paging_mode: PagingMode,
    pub zoom: ZoomLimits,
    pub scale_epsilon: f32,
    pub fit_padding: f32,
    pub fit_min_scale: f32,
    pub fit_max_scale: f32,
    /// Share of the window used when the container cannot be measured
    pub fallback_fraction: f32,
    pub loader_workers: usize,
    pub page_box_cache_size: usize,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            paging_mode: PagingMode::default(),
            zoom: ZoomLimits::default(),
            scale_epsilon: SCALE_EPSILON,
            fit_padding: FIT_PADDING,
            fit_min_scale: FIT_MIN_SCALE,
            fit_max_scale: FIT_MAX_SCALE,
            fallback_fraction: FALLBACK_FRACTION,
            loader_workers: DEFAULT_LOADER_WORKERS,
            page_box_cache_size: DEFAULT_BOX_CACHE_SIZE,
        }
    }
}

impl ViewerConfig {
    #[must_use]
    pub fn with_mode(mut self, mode: PagingMode) -> Self {
        self.paging_mode = mode;
        self
    }

    #[must_use]
    pub fn viewer_options(&self) -> ViewerOptions {
        ViewerOptions {
            mode: self.paging_mode,
            page_box_cache_size: self.page_box_cache_size,
            scale_epsilon: self.scale_epsilon,
        }
    }

    /// Replace unusable values with defaults: non-positive or non-finite
    /// scales, inverted ranges, an empty worker pool.
    #[must_use]
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();

        let mut min = positive(self.zoom.min, defaults.zoom.min);
        let mut max = positive(self.zoom.max, defaults.zoom.max);
        if min > max {
            warn!("min_scale {min} exceeds max_scale {max}, using defaults");
            min = defaults.zoom.min;
            max = defaults.zoom.max;
        }

        let mut fit_min = positive(self.fit_min_scale, defaults.fit_min_scale);
        let mut fit_max = positive(self.fit_max_scale, defaults.fit_max_scale);
        if fit_min > fit_max {
            warn!("fit_min_scale {fit_min} exceeds fit_max_scale {fit_max}, using defaults");
            fit_min = defaults.fit_min_scale;
            fit_max = defaults.fit_max_scale;
        }

        let fallback_fraction = if self.fallback_fraction > 0.0 && self.fallback_fraction <= 1.0 {
            self.fallback_fraction
        } else {
            defaults.fallback_fraction
        };

        Self {
            paging_mode: self.paging_mode,
            zoom: ZoomLimits {
                min,
                max,
                step: positive(self.zoom.step, defaults.zoom.step),
                default: positive(self.zoom.default, defaults.zoom.default).clamp(min, max),
            },
            scale_epsilon: positive(self.scale_epsilon, defaults.scale_epsilon),
            fit_padding: if self.fit_padding.is_finite() && self.fit_padding >= 0.0 {
                self.fit_padding
            } else {
                defaults.fit_padding
            },
            fit_min_scale: fit_min,
            fit_max_scale: fit_max,
            fallback_fraction,
            loader_workers: self.loader_workers.max(1),
            page_box_cache_size: self.page_box_cache_size.max(1),
        }
    }
}

fn positive(value: f32, fallback: f32) -> f32 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        fallback
    }
}
