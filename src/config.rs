use std::fmt;

use image::imageops::FilterType;
use serde::Serialize;

use crate::optimize::OptimizeOptions;
use crate::vectorizer::vtracer::TraceOptions;

/// Which of the two pipelines a batch runs through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColorMode {
    /// Posterized trace followed by opacity resolution and color recovery.
    Color,
    /// Binary trace only.
    BlackAndWhite,
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ColorMode::Color => "color",
            ColorMode::BlackAndWhite => "black-and-white",
        })
    }
}

/// Options for decoding and resizing the uploaded image.
#[derive(Debug, Clone)]
pub struct NormalizeSettings {
    /// Longest side of the normalized raster; smaller images are never enlarged.
    pub max_dimension: u32,
    /// Filter used when shrinking the input.
    pub resize_filter: FilterType,
}

impl Default for NormalizeSettings {
    fn default() -> Self {
        Self {
            max_dimension: 1000,
            resize_filter: FilterType::Lanczos3,
        }
    }
}

/// Options controlling how luminance is split into traced layers.
#[derive(Debug, Clone)]
pub struct PosterizeOptions {
    /// Number of stacked layers in color mode.
    pub steps: u8,
    /// Luminance at or below which a pixel is foreground in black-and-white mode.
    pub binary_threshold: u8,
}

impl Default for PosterizeOptions {
    fn default() -> Self {
        Self {
            steps: 4,
            binary_threshold: 128,
        }
    }
}

/// How the cohort of an opacity value is chosen when folding stacked layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CohortOrder {
    /// Every value with a smaller or equal opacity.
    #[default]
    ByOpacity,
    /// Every value emitted at or before it in the document.
    DocumentOrder,
}

#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    pub cohort_order: CohortOrder,
}

#[derive(Debug, Clone)]
pub struct ColorizeOptions {
    /// Palette size requested from the quantizer for each bucket.
    pub palette_size: usize,
}

impl Default for ColorizeOptions {
    fn default() -> Self {
        Self { palette_size: 5 }
    }
}

/// Everything a single file's pipeline needs.
#[derive(Debug, Clone, Default)]
pub struct PipelineSettings {
    pub normalize: NormalizeSettings,
    pub trace: TraceOptions,
    pub posterize: PosterizeOptions,
    pub resolve: ResolveOptions,
    pub colorize: ColorizeOptions,
    pub optimize: OptimizeOptions,
}
