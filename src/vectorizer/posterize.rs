//! Luminance banding for the posterized tracer.
//!
//! The luminance range below the background is cut into `steps` equal bands. Each band
//! becomes one traced layer covering every pixel darker than its upper bound, painted
//! black at an opacity chosen so that the layers stacked so far reproduce the band's
//! mean darkness.

use image::GrayImage;
use imageproc::stats::histogram;

/// One luminance band, with the darkness its layer should reproduce.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LuminanceBand {
    /// Pixels with luminance strictly below this value belong to the band's layer.
    pub upper: u8,
    /// `1 - mean_luminance / 255` over the band's own pixels, 0 for an empty band.
    pub intensity: f64,
}

/// Split the luminance of `image` into `steps` bands, lightest first.
pub fn luminance_bands(image: &GrayImage, steps: u8) -> Vec<LuminanceBand> {
    let steps = u32::from(steps.max(1));
    let counts = &histogram(image).channels[0];
    let bound = |j: u32| -> usize {
        let value = (256.0 * f64::from(j) / f64::from(steps + 1)).round();
        (value as usize).min(255)
    };

    (0..steps)
        .rev()
        .map(|j| {
            let (lower, upper) = (bound(j), bound(j + 1));
            let (mut total, mut weighted) = (0u64, 0u64);
            for (lum, &count) in counts.iter().enumerate().take(upper).skip(lower) {
                total += u64::from(count);
                weighted += u64::from(count) * lum as u64;
            }
            let intensity = if total == 0 {
                0.0
            } else {
                1.0 - (weighted as f64 / total as f64) / 255.0
            };
            LuminanceBand {
                upper: upper as u8,
                intensity,
            }
        })
        .collect()
}

/// Per-layer `fill-opacity` values for bands given lightest first.
///
/// A layer's opacity is picked so that, composited over the layers before it, the
/// stack reaches the band's intensity. Values are rounded to three decimals and
/// clamped to `[0, 1]`; empty bands get 0 and leave the stack unchanged.
pub fn layer_opacities(intensities: &[f64]) -> Vec<f64> {
    let mut stacked = 0.0f64;
    intensities
        .iter()
        .map(|&intensity| {
            if intensity == 0.0 {
                return 0.0;
            }
            let opacity = if stacked == 0.0 || intensity == 1.0 {
                intensity
            } else {
                (stacked - intensity) / (stacked - 1.0)
            };
            let opacity = ((opacity * 1000.0).round() / 1000.0).clamp(0.0, 1.0);
            stacked += (1.0 - stacked) * opacity;
            opacity
        })
        .collect()
}
