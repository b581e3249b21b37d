//! Raster to vector conversion that keeps the photo's colors.
//!
//! Color mode traces stacked grayscale layers, resolves their opacities into solid
//! grays and recovers a photo color for each gray. Black-and-white mode traces a
//! single threshold.

pub mod classify;
pub mod color;
pub mod colorize;
pub mod config;
pub mod error;
pub mod markup;
pub mod normalize;
pub mod optimize;
pub mod pipeline;
pub mod quantize;
pub mod resolve;
pub mod sample;
pub mod vectorizer;

pub use classify::NearestColor;
pub use color::{Rgb, Rgba, blend_over_white, combine_opacity, hex_to_rgb, hexify};
pub use colorize::{ColorBucket, colorize};
pub use config::{
    CohortOrder, ColorMode, ColorizeOptions, NormalizeSettings, PipelineSettings,
    PosterizeOptions, ResolveOptions,
};
pub use error::{VectorizeError, VectorizeResult};
pub use markup::SvgDocument;
pub use normalize::{MediaType, NormalizedRaster, normalize};
pub use optimize::{OptimizeOptions, optimize_svg};
pub use pipeline::{
    ALGORITHM, BatchReport, FileFailure, FileOutcome, ProcessedResult, Stage, Tonetrace,
    UploadedFile,
};
pub use quantize::{dominant_color, quantize};
pub use resolve::{OpacityLevel, resolve_opacity_stack};
pub use sample::{PixelGrid, sample_markup, sample_raster};
pub use vectorizer::RasterTracer;
pub use vectorizer::vtracer::{BinaryTracer, PosterizeTracer, TraceOptions};
