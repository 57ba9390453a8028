//! Page height estimation.
//!
//! Heights are derived from the best proportions known for a page:
//! loaded measurements first, upstream intrinsic metadata second, and a
//! fixed portrait aspect ratio when nothing is known yet.

use image::{DynamicImage, GenericImageView};

use crate::page::{MeasuredDimensions, PageDescriptor};

/// Height-to-width ratio assumed for pages with no known proportions.
pub const DEFAULT_ASPECT_RATIO: f64 = 1.5;

/// Estimate the rendered height of a page at `container_width`.
pub fn estimate(
    descriptor: &PageDescriptor,
    measured: &MeasuredDimensions,
    container_width: f64,
) -> f64 {
    if let Some(dims) = measured.get(&descriptor.id).filter(|d| d.loaded)
        && let Some(ratio) = aspect_ratio(dims.width, dims.height)
    {
        return ratio * container_width;
    }
    if let (Some(width), Some(height)) = (descriptor.intrinsic_width, descriptor.intrinsic_height)
        && let Some(ratio) = aspect_ratio(width, height)
    {
        return ratio * container_width;
    }
    DEFAULT_ASPECT_RATIO * container_width
}

fn aspect_ratio(width: f64, height: f64) -> Option<f64> {
    if width.is_finite() && height.is_finite() && width > 0.0 && height >= 0.0 {
        Some(height / width)
    } else {
        None
    }
}

/// Measures the real rendered height of a mounted page.
///
/// Returns `None` when the handle cannot be measured yet; callers keep the
/// current estimate in that case.
pub trait SizeOracle<H> {
    fn measure(&self, handle: &H, container_width: f64) -> Option<f64>;
}

/// Measures decoded images scaled to fit the container width.
#[derive(Debug, Clone, Copy, Default)]
pub struct FitWidthOracle;

impl SizeOracle<DynamicImage> for FitWidthOracle {
    fn measure(&self, handle: &DynamicImage, container_width: f64) -> Option<f64> {
        let (width, height) = handle.dimensions();
        aspect_ratio(f64::from(width), f64::from(height)).map(|ratio| ratio * container_width)
    }
}
