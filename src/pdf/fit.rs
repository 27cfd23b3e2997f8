//! Fit-to-height / fit-to-width scale computation

use super::request::FitParams;
use super::surface::Size;
use super::types::{FitAxis, PageBox, is_valid_scale};

/// Space kept free around a fitted page, in pixels
pub const FIT_PADDING: f32 = 16.0;
/// Smallest scale a fit may produce
pub const FIT_MIN_SCALE: f32 = 0.1;
/// Largest scale a fit may produce
pub const FIT_MAX_SCALE: f32 = 4.0;
/// Share of the window used when the container has no size yet
pub const FALLBACK_FRACTION: f32 = 0.8;

/// Scale at which `intrinsic` (length at scale 1) fills `available` minus
/// padding, clamped to `[min_scale, max_scale]`.
///
/// `None` when either length is zero, negative or not finite, or when the
/// bounds do not form a usable range.
#[must_use]
pub fn fit_scale(
    intrinsic: f32,
    available: f32,
    padding: f32,
    min_scale: f32,
    max_scale: f32,
) -> Option<f32> {
    if !intrinsic.is_finite() || intrinsic <= 0.0 || !available.is_finite() || available <= 0.0 {
        return None;
    }
    if !is_valid_scale(min_scale) || !is_valid_scale(max_scale) || min_scale > max_scale {
        return None;
    }
    let scale = ((available - padding) / intrinsic).clamp(min_scale, max_scale);
    is_valid_scale(scale).then_some(scale)
}

/// Length available along `axis`: the container's own size, else a share
/// of the window, else nothing.
#[must_use]
pub fn available_length(
    container: Option<Size>,
    window: Option<Size>,
    fallback_fraction: f32,
    axis: FitAxis,
) -> Option<f32> {
    let along = |size: Size| match axis {
        FitAxis::Height => size.height,
        FitAxis::Width => size.width,
    };

    let measured = container.map(along).filter(|v| v.is_finite() && *v > 0.0);
    measured.or_else(|| {
        window
            .map(|size| along(size) * fallback_fraction)
            .filter(|v| v.is_finite() && *v > 0.0)
    })
}

/// Fit for a measured page box using captured parameters
#[must_use]
pub fn compute(params: &FitParams, intrinsic: PageBox) -> Option<f32> {
    let available = params.available?;
    fit_scale(
        intrinsic.along(params.axis),
        available,
        params.padding,
        params.min_scale,
        params.max_scale,
    )
}
